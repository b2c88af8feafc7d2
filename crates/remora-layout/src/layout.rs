//! Node sizing, branch direction assignment, and placement.

use remora_core::{ChartOptions, Direction, SlotKind, SymbolKind};
use tracing::trace;

use crate::graph::{NodeId, RenderGraph, slot_order};
use crate::text::{TextMeasurer, TextStyle, wrap_to_width};

/// Per-node attribute lookup context.
fn attrs<'a>(graph: &'a RenderGraph, id: NodeId) -> (Option<&'a str>, Option<&'a str>) {
    let node = &graph.nodes[id];
    (
        Some(node.kind.as_token()),
        Some(node.flow_state.as_deref().unwrap_or("future")),
    )
}

fn attr_f64(graph: &RenderGraph, id: NodeId, options: &ChartOptions, name: &str, fallback: f64) -> f64 {
    let (kind, state) = attrs(graph, id);
    options.attr_f64(name, kind, state).unwrap_or(fallback)
}

/// Measures every label and derives box sizes, then centers the boxes on a shared axis so the
/// widest node defines the column. The entry node's position is final after this pass.
pub fn size_nodes(graph: &mut RenderGraph, options: &ChartOptions, measurer: &dyn TextMeasurer) {
    for id in 0..graph.nodes.len() {
        let margin = attr_f64(graph, id, options, "text-margin", 10.0);
        let style = TextStyle {
            font_size: attr_f64(graph, id, options, "font-size", 14.0),
            ..TextStyle::default()
        };

        let node = &graph.nodes[id];
        // The per-symbol param overrides the attribute chain.
        let max_width = node
            .params
            .get("maxWidth")
            .and_then(|w| w.parse::<f64>().ok())
            .or_else(|| {
                let (kind, state) = attrs(graph, id);
                options.attr_f64("maxWidth", kind, state)
            });
        let label = match max_width {
            Some(max_width) if max_width > 0.0 => {
                wrap_to_width(&node.label, max_width, &style, measurer)
            }
            _ => node.label.clone(),
        };
        let text = measurer.measure(&label, &style);

        let node = &mut graph.nodes[id];
        node.label = label;
        let (width, height) = match node.kind {
            SymbolKind::Subroutine => (text.width + 4.0 * margin, text.height + 2.0 * margin),
            SymbolKind::InputOutput => {
                node.anchor_inset = margin;
                (text.width + 4.0 * margin, text.height + 2.0 * margin)
            }
            SymbolKind::Condition => {
                let width = (text.width + 3.0 * margin) * 1.5;
                let height = ((text.height + 2.0 * margin) * 1.5).max(width * 0.5);
                (width, height)
            }
            _ => (text.width + 2.0 * margin, text.height + 2.0 * margin),
        };
        node.size = remora_core::geom::size(width, height);
    }

    let max_width = graph.nodes.iter().map(|n| n.width()).fold(0.0, f64::max);
    let max_height = graph.nodes.iter().map(|n| n.height()).fold(0.0, f64::max);
    let base_x = options.f64("x").unwrap_or(0.0);
    let base_y = options.f64("y").unwrap_or(0.0);
    let line_width = options.f64("line-width").unwrap_or(3.0);
    for node in &mut graph.nodes {
        node.origin = remora_core::geom::point(
            base_x + (max_width - node.width()) / 2.0 + line_width,
            base_y + (max_height - node.height()) / 2.0 + line_width,
        );
    }
    graph.nodes[graph.entry].positioned = true;
}

/// Assigns one concrete outgoing direction per branch edge.
///
/// Hints from the source text win; unhinted branches get defaults that read top-to-bottom,
/// yes-then-right. The assignment happens exactly once, before placement, so routing and
/// placement agree on which side each line leaves from.
pub fn resolve_directions(graph: &mut RenderGraph) {
    for node in &mut graph.nodes {
        match node.kind {
            SymbolKind::Condition => {
                let yes_hint = node.edge_on(SlotKind::Yes).and_then(|e| e.hint);
                let no_hint = node.edge_on(SlotKind::No).and_then(|e| e.hint);
                // An explicit direction on one arm flips the other arm's default so the two
                // never leave from the same side.
                let yes = yes_hint.unwrap_or(if no_hint == Some(Direction::Bottom) {
                    Direction::Right
                } else {
                    Direction::Bottom
                });
                let no = no_hint.unwrap_or(if yes == Direction::Right {
                    Direction::Bottom
                } else {
                    Direction::Right
                });
                for edge in &mut node.out {
                    edge.resolved = Some(match edge.slot {
                        SlotKind::Yes => yes,
                        _ => no,
                    });
                }
            }
            SymbolKind::ParallelSplit => {
                let (p1, p2, p3) = parallel_directions(
                    node.edge_on(SlotKind::Path1).and_then(|e| e.hint),
                    node.edge_on(SlotKind::Path2).and_then(|e| e.hint),
                    node.edge_on(SlotKind::Path3).and_then(|e| e.hint),
                );
                for edge in &mut node.out {
                    edge.resolved = Some(match edge.slot {
                        SlotKind::Path1 => p1,
                        SlotKind::Path2 => p2,
                        _ => p3,
                    });
                }
            }
            _ => {
                for edge in &mut node.out {
                    edge.resolved = edge.hint;
                }
            }
        }
    }
}

fn parallel_directions(
    p1: Option<Direction>,
    p2: Option<Direction>,
    p3: Option<Direction>,
) -> (Direction, Direction, Direction) {
    use Direction::{Bottom, Left, Right, Top};
    let hinted = [p1, p2, p3].iter().flatten().count();
    if hinted == 1 {
        // A single hint pins its own path and rotates the siblings around it.
        if let Some(d) = p1 {
            return match d {
                Right => (Right, Bottom, Top),
                Top => (Top, Right, Bottom),
                Left => (Left, Right, Bottom),
                Bottom => (Bottom, Right, Top),
            };
        }
        if let Some(d) = p2 {
            return match d {
                Right => (Bottom, Right, Top),
                Left => (Bottom, Left, Right),
                _ => (Right, Bottom, Top),
            };
        }
        if let Some(d) = p3 {
            return match d {
                Right => (Bottom, Top, Right),
                Left => (Bottom, Right, Left),
                _ => (Right, Bottom, Top),
            };
        }
    }
    (
        p1.unwrap_or(Bottom),
        p2.unwrap_or(Right),
        p3.unwrap_or(Top),
    )
}

/// Walks the graph from the entry node and pins every reachable node's final position.
///
/// A node is positioned by the first predecessor that reaches it; later arrivals route a line
/// to wherever it already sits.
pub fn place_nodes(graph: &mut RenderGraph, options: &ChartOptions) {
    place_from(graph, graph.entry, options);
}

fn place_from(graph: &mut RenderGraph, source: NodeId, options: &ChartOptions) {
    let line_length = attr_f64(graph, source, options, "line-length", 50.0);

    for &slot in slot_order(graph.nodes[source].kind) {
        let Some(edge) = graph.nodes[source].edge_on(slot) else {
            continue;
        };
        let target = edge.to;
        let direction = edge.resolved.unwrap_or(Direction::Bottom);
        if graph.nodes[target].positioned {
            continue;
        }

        let src = &graph.nodes[source];
        let succ = &graph.nodes[target];
        let origin = match direction {
            Direction::Bottom => remora_core::geom::point(
                src.bottom_anchor().x - succ.width() / 2.0,
                src.origin.y + src.height() + line_length,
            ),
            Direction::Right => remora_core::geom::point(
                src.origin.x + src.width() + line_length,
                src.right_anchor().y - succ.height() / 2.0,
            ),
            Direction::Left => remora_core::geom::point(
                src.origin.x - succ.width() - line_length,
                src.left_anchor().y - succ.height() / 2.0,
            ),
            Direction::Top => remora_core::geom::point(
                src.top_anchor().x - succ.width(),
                src.origin.y - succ.height() - line_length,
            ),
        };

        {
            let succ = &mut graph.nodes[target];
            succ.origin = origin;
            succ.positioned = true;
        }
        if matches!(direction, Direction::Right | Direction::Left) {
            shift_clear(graph, source, target, line_length);
        }
        trace!(
            key = %graph.nodes[target].key,
            x = graph.nodes[target].origin.x,
            y = graph.nodes[target].origin.y,
            "placed node"
        );
        place_from(graph, target, options);
    }
}

/// Pushes a sideways-placed node right until no positioned node sits in the column below it.
/// Terminal nodes stay put so the diagram keeps a stable exit column.
fn shift_clear(graph: &mut RenderGraph, source: NodeId, moved: NodeId, line_length: f64) {
    if graph.nodes[moved].kind == SymbolKind::End {
        return;
    }
    if graph.nodes[source]
        .params
        .get("align-next")
        .is_some_and(|v| v == "no")
    {
        return;
    }

    loop {
        let moved_center = graph.nodes[moved].center();
        let half_width = graph.nodes[moved].width() / 2.0;
        let blocker = graph.nodes.iter().enumerate().find(|(id, node)| {
            *id != moved
                && node.positioned
                && node.center().y > moved_center.y
                && (node.center().x - moved_center.x).abs() <= half_width
        });
        let Some((_, blocker)) = blocker else {
            break;
        };
        let new_x = blocker.origin.x + blocker.width() + line_length;
        graph.nodes[moved].origin.x = new_x;
    }
}
