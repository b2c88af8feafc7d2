//! Orthogonal line routing between positioned nodes.
//!
//! Each edge is routed by a case ladder keyed on the resolved direction and the relative
//! position of the two boxes. Parallel lines sharing a node side are stacked 10 units apart,
//! and a routed line that crosses an earlier one gets a small hop curve spliced in at the
//! crossing so the two read as passing over, not joining.

use remora_core::{ChartOptions, Direction, SlotKind};
use tracing::debug;

use crate::graph::{NodeId, OutEdge, RenderGraph, slot_order};
use crate::model::{LineLabel, PathSegment, RoutedLine, TextAnchor};

/// Side spacing between stacked parallel lines.
const STACK_GAP: f64 = 10.0;

pub struct RoutedLines {
    pub lines: Vec<RoutedLine>,
    /// Leftmost source-side anchor seen while routing; pulls the viewport left.
    pub min_x_from_symbols: f64,
    /// Rightmost x any routed line reaches past the boxes.
    pub max_x_from_line: f64,
}

/// Per-node routing state: how many lines already leave or arrive on each side.
#[derive(Debug, Default, Clone)]
struct Sides {
    top: usize,
    bottom: usize,
    left: usize,
    right: usize,
    /// Set when a line has arrived on this node's left side; loop-backs leaving the bottom
    /// of such a node swing wide so they clear the incoming line.
    left_end: bool,
}

pub fn route_lines(graph: &RenderGraph, options: &ChartOptions) -> RoutedLines {
    let mut sides = vec![Sides::default(); graph.nodes.len()];
    let mut routed = RoutedLines {
        lines: Vec::new(),
        min_x_from_symbols: 0.0,
        max_x_from_line: 0.0,
    };
    // Vertex chains of already-routed lines, for crossing detection.
    let mut chains: Vec<Vec<(f64, f64)>> = Vec::new();

    for source in 0..graph.nodes.len() {
        for &slot in slot_order(graph.nodes[source].kind) {
            let Some(edge) = graph.nodes[source].edge_on(slot) else {
                continue;
            };
            let Some(course) = plot_course(graph, &mut sides, source, edge, options) else {
                continue;
            };

            let line_width = attr_f64(graph, source, options, "line-width", 3.0);
            let mut segments: Vec<PathSegment> = course
                .points
                .iter()
                .map(|&(x, y)| PathSegment::Line { x, y })
                .collect();
            splice_bypasses(course.start, &mut segments, &chains, line_width);

            let label = line_label(graph, source, slot, edge, &course, options);
            let style = graph.nodes[source].line_style.get(&graph.nodes[edge.to].key).cloned();

            chains.push(vertex_chain(course.start, &segments));
            routed.lines.push(RoutedLine {
                from: source,
                to: edge.to,
                start_x: course.start.0,
                start_y: course.start.1,
                segments,
                label,
                style,
            });

            let source_left = graph.nodes[source].left_anchor().x;
            if routed.min_x_from_symbols > source_left {
                routed.min_x_from_symbols = source_left;
            }
            if routed.max_x_from_line == 0.0 || course.max_x > routed.max_x_from_line {
                routed.max_x_from_line = course.max_x;
            }
        }
    }

    debug!(lines = routed.lines.len(), "routed chart lines");
    routed
}

struct Course {
    start: (f64, f64),
    points: Vec<(f64, f64)>,
    max_x: f64,
}

fn attr_f64(graph: &RenderGraph, id: NodeId, options: &ChartOptions, name: &str, fallback: f64) -> f64 {
    let node = &graph.nodes[id];
    options
        .attr_f64(
            name,
            Some(node.kind.as_token()),
            Some(node.flow_state.as_deref().unwrap_or("future")),
        )
        .unwrap_or(fallback)
}

fn attr_string(graph: &RenderGraph, id: NodeId, options: &ChartOptions, name: &str) -> Option<String> {
    let node = &graph.nodes[id];
    options
        .attr_str(
            name,
            Some(node.kind.as_token()),
            Some(node.flow_state.as_deref().unwrap_or("future")),
        )
        .map(str::to_string)
}

/// Picks the route shape for one edge and bumps the side counters it uses.
///
/// Returns `None` when no case applies, e.g. two boxes whose centers coincide; such an edge
/// stays logically present but draws nothing.
#[allow(clippy::too_many_lines)]
fn plot_course(
    graph: &RenderGraph,
    sides: &mut [Sides],
    source: NodeId,
    edge: &OutEdge,
    options: &ChartOptions,
) -> Option<Course> {
    let target = edge.to;
    let dir = edge.resolved;
    let s = &graph.nodes[source];
    let t = &graph.nodes[target];

    let center = s.center();
    let (x, y) = (center.x, center.y);
    let right = s.right_anchor();
    let bottom = s.bottom_anchor();
    let top = s.top_anchor();
    let left = s.left_anchor();

    let t_center = t.center();
    let (sym_x, sym_y) = (t_center.x, t_center.y);
    let sym_top = t.top_anchor();
    let sym_right = t.right_anchor();
    let sym_left = t.left_anchor();

    let same_col = x == sym_x;
    let same_line = y == sym_y;
    let is_under = y < sym_y;
    let is_upper = y > sym_y || source == target;
    let is_left = x > sym_x;
    let is_right = x < sym_x;

    let line_length = attr_f64(graph, source, options, "line-length", 50.0);

    let unhinted_or = |d: Direction| dir.is_none() || dir == Some(d);

    let course;
    if unhinted_or(Direction::Bottom) && same_col && is_under {
        let off = stack_offset(sides[target].top, sides[source].bottom);
        let points = if off == 0.0 {
            vec![(sym_top.x, sym_top.y)]
        } else {
            vec![(sym_top.x, sym_top.y - off), (sym_top.x, sym_top.y)]
        };
        sides[source].bottom += 1;
        sides[target].top += 1;
        course = Course {
            start: (bottom.x, bottom.y),
            points,
            max_x: bottom.x,
        };
    } else if unhinted_or(Direction::Right) && same_line && is_right {
        let off = stack_offset(sides[target].left, sides[source].right);
        let points = if off == 0.0 {
            vec![(sym_left.x, sym_left.y)]
        } else {
            vec![
                (right.x, right.y - off),
                (right.x, sym_left.y - off),
                (sym_left.x, sym_left.y - off),
                (sym_left.x, sym_left.y),
            ]
        };
        sides[source].right += 1;
        sides[target].left += 1;
        sides[target].left_end = true;
        course = Course {
            start: (right.x, right.y),
            points,
            max_x: sym_left.x,
        };
    } else if unhinted_or(Direction::Left) && same_line && is_left {
        let off = stack_offset(sides[target].right, sides[source].left);
        let points = if off == 0.0 {
            vec![(sym_right.x, sym_right.y)]
        } else {
            vec![
                (left.x, left.y - off),
                (left.x, sym_right.y - off),
                (sym_right.x, sym_right.y - off),
                (sym_right.x, sym_right.y),
            ]
        };
        sides[source].left += 1;
        sides[target].right += 1;
        course = Course {
            start: (left.x, left.y),
            points,
            max_x: sym_right.x,
        };
    } else if unhinted_or(Direction::Right) && same_col && (is_upper || is_under) {
        let off = stack_offset(sides[target].top, sides[source].right);
        sides[source].right += 1;
        sides[target].top += 1;
        course = Course {
            start: (right.x, right.y),
            points: vec![
                (right.x + line_length / 2.0, right.y - off),
                (right.x + line_length / 2.0, sym_top.y - line_length / 2.0 - off),
                (sym_top.x, sym_top.y - line_length / 2.0 - off),
                (sym_top.x, sym_top.y),
            ],
            max_x: right.x + line_length / 2.0,
        };
    } else if unhinted_or(Direction::Bottom) && is_left {
        let off = stack_offset(sides[target].top, sides[source].bottom);
        let swing_x = bottom.x + (bottom.x - sym_top.x) / 2.0;
        let points = if sides[source].left_end && is_upper {
            vec![
                (bottom.x, bottom.y + line_length / 2.0 - off),
                (swing_x, bottom.y + line_length / 2.0 - off),
                (swing_x, sym_top.y - line_length / 2.0 - off),
                (sym_top.x, sym_top.y - line_length / 2.0 - off),
                (sym_top.x, sym_top.y),
            ]
        } else {
            vec![
                (bottom.x, sym_top.y - line_length / 2.0 - off),
                (sym_top.x, sym_top.y - line_length / 2.0 - off),
                (sym_top.x, sym_top.y),
            ]
        };
        sides[source].bottom += 1;
        sides[target].top += 1;
        course = Course {
            start: (bottom.x, bottom.y),
            points,
            max_x: swing_x,
        };
    } else if unhinted_or(Direction::Bottom) && is_right && is_under {
        let off = stack_offset(sides[target].top, sides[source].bottom);
        sides[source].bottom += 1;
        sides[target].top += 1;
        course = Course {
            start: (bottom.x, bottom.y),
            points: vec![
                (bottom.x, sym_top.y - line_length / 2.0 - off),
                (sym_top.x, sym_top.y - line_length / 2.0 - off),
                (sym_top.x, sym_top.y),
            ],
            max_x: bottom.x.max(sym_top.x),
        };
    } else if unhinted_or(Direction::Bottom) && is_right {
        let off = stack_offset(sides[target].top, sides[source].bottom);
        let swing_x = bottom.x + (bottom.x - sym_top.x) / 2.0;
        sides[source].bottom += 1;
        sides[target].top += 1;
        course = Course {
            start: (bottom.x, bottom.y),
            points: vec![
                (bottom.x, bottom.y + line_length / 2.0 - off),
                (swing_x, bottom.y + line_length / 2.0 - off),
                (swing_x, sym_top.y - line_length / 2.0 - off),
                (sym_top.x, sym_top.y - line_length / 2.0 - off),
                (sym_top.x, sym_top.y),
            ],
            max_x: swing_x,
        };
    } else if dir == Some(Direction::Right) && is_left {
        let off = stack_offset(sides[target].top, sides[source].right);
        sides[source].right += 1;
        sides[target].top += 1;
        course = Course {
            start: (right.x, right.y),
            points: vec![
                (right.x + line_length / 2.0, right.y),
                (right.x + line_length / 2.0, sym_top.y - line_length / 2.0 - off),
                (sym_top.x, sym_top.y - line_length / 2.0 - off),
                (sym_top.x, sym_top.y),
            ],
            max_x: right.x + line_length / 2.0,
        };
    } else if dir == Some(Direction::Right) && is_right {
        let off = stack_offset(sides[target].top, sides[source].right);
        sides[source].right += 1;
        sides[target].top += 1;
        course = Course {
            start: (right.x, right.y),
            points: vec![
                (sym_top.x, right.y - off),
                (sym_top.x, sym_top.y - off),
            ],
            max_x: right.x + line_length / 2.0,
        };
    } else if dir == Some(Direction::Bottom) && same_col && is_upper {
        let off = stack_offset(sides[target].top, sides[source].bottom);
        sides[source].bottom += 1;
        sides[target].top += 1;
        course = Course {
            start: (bottom.x, bottom.y),
            points: vec![
                (bottom.x, bottom.y + line_length / 2.0 - off),
                (right.x + line_length / 2.0, bottom.y + line_length / 2.0 - off),
                (right.x + line_length / 2.0, sym_top.y - line_length / 2.0 - off),
                (sym_top.x, sym_top.y - line_length / 2.0 - off),
                (sym_top.x, sym_top.y),
            ],
            max_x: bottom.x + line_length / 2.0,
        };
    } else if dir == Some(Direction::Left) && same_col && is_upper {
        let swing_x = if sym_left.x < left.x {
            sym_left.x - line_length / 2.0
        } else {
            left.x - line_length / 2.0
        };
        let off = stack_offset(sides[target].top, sides[source].left);
        sides[source].left += 1;
        sides[target].top += 1;
        course = Course {
            start: (left.x, left.y),
            points: vec![
                (swing_x, left.y - off),
                (swing_x, sym_top.y - line_length / 2.0 - off),
                (sym_top.x, sym_top.y - line_length / 2.0 - off),
                (sym_top.x, sym_top.y),
            ],
            max_x: left.x,
        };
    } else if dir == Some(Direction::Left) {
        let off = stack_offset(sides[target].top, sides[source].left);
        let swing_x = sym_top.x + (left.x - sym_top.x) / 2.0;
        sides[source].left += 1;
        sides[target].top += 1;
        course = Course {
            start: (left.x, left.y),
            points: vec![
                (swing_x, left.y),
                (swing_x, sym_top.y - line_length / 2.0 - off),
                (sym_top.x, sym_top.y - line_length / 2.0 - off),
                (sym_top.x, sym_top.y),
            ],
            max_x: left.x,
        };
    } else if dir == Some(Direction::Top) {
        let off = stack_offset(sides[target].top, sides[source].top);
        sides[source].top += 1;
        sides[target].top += 1;
        course = Course {
            start: (top.x, top.y),
            points: vec![
                (top.x, sym_top.y - line_length / 2.0 - off),
                (sym_top.x, sym_top.y - line_length / 2.0 - off),
                (sym_top.x, sym_top.y),
            ],
            max_x: top.x,
        };
    } else {
        return None;
    }

    Some(course)
}

fn stack_offset(a: usize, b: usize) -> f64 {
    a.max(b) as f64 * STACK_GAP
}

fn line_label(
    graph: &RenderGraph,
    source: NodeId,
    slot: SlotKind,
    edge: &OutEdge,
    course: &Course,
    options: &ChartOptions,
) -> Option<LineLabel> {
    let text = match slot {
        SlotKind::Yes => edge
            .annotation
            .clone()
            .or_else(|| attr_string(graph, source, options, "yes-text"))
            .unwrap_or_else(|| "Yes".to_string()),
        SlotKind::No => edge
            .annotation
            .clone()
            .or_else(|| attr_string(graph, source, options, "no-text"))
            .unwrap_or_else(|| "No".to_string()),
        SlotKind::Next => edge
            .annotation
            .clone()
            .or_else(|| attr_string(graph, source, options, "arrow-text"))
            .unwrap_or_default(),
        _ => edge.annotation.clone().unwrap_or_default(),
    };
    if text.is_empty() {
        return None;
    }

    let margin = attr_f64(graph, source, options, "text-margin", 10.0);
    let (from_x, from_y) = course.start;
    let &(to_x, to_y) = course.points.first()?;

    let mut x = from_x;
    let mut y = from_y;
    let mut anchor = TextAnchor::Start;
    if from_y == to_y {
        if from_x > to_x {
            x -= margin / 2.0;
            anchor = TextAnchor::End;
        } else {
            x += margin / 2.0;
        }
        y -= margin;
    } else {
        x += margin / 2.0;
        y += margin;
        if from_y > to_y {
            y -= margin * 2.0;
        }
    }

    Some(LineLabel { text, x, y, anchor })
}

fn segment_end(segment: &PathSegment) -> (f64, f64) {
    match *segment {
        PathSegment::Line { x, y } | PathSegment::Curve { x, y, .. } => (x, y),
    }
}

fn vertex_chain(start: (f64, f64), segments: &[PathSegment]) -> Vec<(f64, f64)> {
    let mut chain = Vec::with_capacity(segments.len() + 1);
    chain.push(start);
    chain.extend(segments.iter().map(segment_end));
    chain
}

/// Splices a hop over every crossing between the freshly routed line and earlier ones.
///
/// The hop replaces the crossing point with a short lead-in and a small half-circle curve
/// scaled by the stroke width, in the travel direction of the crossing segment.
pub fn splice_bypasses(
    start: (f64, f64),
    segments: &mut Vec<PathSegment>,
    existing: &[Vec<(f64, f64)>],
    line_width: f64,
) {
    for chain in existing {
        for window in chain.windows(2) {
            let (a, b) = (window[0], window[1]);
            let mut i = 0;
            while i < segments.len() {
                let from = if i == 0 {
                    start
                } else {
                    segment_end(&segments[i - 1])
                };
                let to = segment_end(&segments[i]);
                let Some(hit) = crossing(a, b, from, to) else {
                    i += 1;
                    continue;
                };

                let (lead, hop) = bypass_segments(from, to, hit, line_width);
                segments.insert(i, lead);
                segments.insert(i + 1, hop);
                i += 3;
            }
        }
    }
}

fn bypass_segments(
    from: (f64, f64),
    to: (f64, f64),
    hit: (f64, f64),
    line_width: f64,
) -> (PathSegment, PathSegment) {
    let short = line_width * 2.0;
    let wide = line_width * 4.0;
    if from.1 == to.1 {
        // Horizontal travel: hop bulges upward.
        if from.0 > to.0 {
            (
                PathSegment::Line { x: hit.0 + short, y: from.1 },
                PathSegment::Curve {
                    c1x: hit.0 + short,
                    c1y: from.1,
                    c2x: hit.0,
                    c2y: from.1 - wide,
                    x: hit.0 - short,
                    y: from.1,
                },
            )
        } else {
            (
                PathSegment::Line { x: hit.0 - short, y: from.1 },
                PathSegment::Curve {
                    c1x: hit.0 - short,
                    c1y: from.1,
                    c2x: hit.0,
                    c2y: from.1 - wide,
                    x: hit.0 + short,
                    y: from.1,
                },
            )
        }
    } else if from.1 > to.1 {
        // Vertical travel upward: hop bulges to the right.
        (
            PathSegment::Line { x: from.0, y: hit.1 + short },
            PathSegment::Curve {
                c1x: from.0,
                c1y: hit.1 + short,
                c2x: from.0 + wide,
                c2y: hit.1,
                x: from.0,
                y: hit.1 - short,
            },
        )
    } else {
        (
            PathSegment::Line { x: from.0, y: hit.1 - short },
            PathSegment::Curve {
                c1x: from.0,
                c1y: hit.1 - short,
                c2x: from.0 + wide,
                c2y: hit.1,
                x: from.0,
                y: hit.1 + short,
            },
        )
    }
}

/// Parametric segment intersection; endpoints touching do not count as a crossing.
fn crossing(
    a_from: (f64, f64),
    a_to: (f64, f64),
    b_from: (f64, f64),
    b_to: (f64, f64),
) -> Option<(f64, f64)> {
    let denominator = (b_to.1 - b_from.1) * (a_to.0 - a_from.0)
        - (b_to.0 - b_from.0) * (a_to.1 - a_from.1);
    if denominator == 0.0 {
        return None;
    }

    let y_distance = a_from.1 - b_from.1;
    let x_distance = a_from.0 - b_from.0;
    let t = ((b_to.0 - b_from.0) * y_distance - (b_to.1 - b_from.1) * x_distance) / denominator;
    let u = ((a_to.0 - a_from.0) * y_distance - (a_to.1 - a_from.1) * x_distance) / denominator;

    if t > 0.0 && t < 1.0 && u > 0.0 && u < 1.0 {
        Some((
            a_from.0 + t * (a_to.0 - a_from.0),
            a_from.1 + t * (a_to.1 - a_from.1),
        ))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::build_render_graph;
    use crate::text::DeterministicTextMeasurer;
    use remora_core::parse;

    fn routed(dsl: &str) -> (RenderGraph, RoutedLines) {
        let model = parse(dsl).unwrap();
        let mut graph = build_render_graph(&model).unwrap();
        let options = ChartOptions::default();
        crate::layout::size_nodes(&mut graph, &options, &DeterministicTextMeasurer::default());
        crate::layout::resolve_directions(&mut graph);
        crate::layout::place_nodes(&mut graph, &options);
        let lines = route_lines(&graph, &options);
        (graph, lines)
    }

    #[test]
    fn straight_drop_between_stacked_nodes() {
        let (graph, routed) = routed("a=>start\nb=>end\na->b");
        assert_eq!(routed.lines.len(), 1);
        let line = &routed.lines[0];
        let a = &graph.nodes[line.from];
        let b = &graph.nodes[line.to];
        assert_eq!(line.start_x, a.bottom_anchor().x);
        assert_eq!(line.start_y, a.bottom_anchor().y);
        assert_eq!(line.segments.len(), 1);
        let (end_x, end_y) = segment_end(&line.segments[0]);
        assert_eq!(end_x, b.top_anchor().x);
        assert_eq!(end_y, b.top_anchor().y);
    }

    #[test]
    fn condition_arms_carry_default_labels() {
        let (_, routed) = routed("c=>condition\ny=>operation\nn=>operation\nc(yes)->y\nc(no)->n");
        let labels: Vec<_> = routed
            .lines
            .iter()
            .filter_map(|l| l.label.as_ref().map(|lab| lab.text.clone()))
            .collect();
        assert_eq!(labels, vec!["yes".to_string(), "no".to_string()]);
    }

    #[test]
    fn annotation_overrides_the_arm_label() {
        let (_, routed) =
            routed("c=>condition\ny=>operation\nn=>operation\nc(yes@Sure)->y\nc(no)->n");
        assert_eq!(routed.lines[0].label.as_ref().unwrap().text, "Sure");
    }

    #[test]
    fn plain_arrows_are_unlabeled_by_default() {
        let (_, routed) = routed("a=>start\nb=>end\na->b");
        assert!(routed.lines[0].label.is_none());
    }

    #[test]
    fn second_arrival_on_a_top_side_is_stacked_apart() {
        // y and n re-converge on e; the second incoming line gets a 10 unit approach offset.
        let (graph, routed) = routed(
            "c=>condition\ny=>operation\nn=>operation\ne=>end\n\
             c(yes)->y\nc(no)->n\ny->e\nn->e",
        );
        let e = graph.nodes.iter().position(|n| n.key == "e").unwrap();
        let incoming: Vec<_> = routed.lines.iter().filter(|l| l.to == e).collect();
        assert_eq!(incoming.len(), 2);
        assert_eq!(incoming[0].segments.len(), 1);
        // The later line approaches through an offset waypoint instead of a straight run.
        assert!(incoming[1].segments.len() > 1);
    }

    #[test]
    fn line_style_attaches_to_the_matching_line() {
        let (graph, routed) =
            routed("a=>start\nb=>end\na->b\na@>b({\"stroke\":\"red\"})");
        let line = &routed.lines[0];
        assert_eq!(graph.nodes[line.from].key, "a");
        assert_eq!(
            line.style.as_ref().and_then(|s| s.get("stroke")).and_then(|v| v.as_str()),
            Some("red")
        );
    }

    #[test]
    fn crossing_lines_get_a_hop_spliced_in() {
        let existing = vec![vec![(0.0, -10.0), (0.0, 10.0)]];
        let mut segments = vec![PathSegment::Line { x: 10.0, y: 0.0 }];
        splice_bypasses((-10.0, 0.0), &mut segments, &existing, 3.0);

        assert_eq!(segments.len(), 3);
        assert!(matches!(segments[0], PathSegment::Line { x, y } if x == -6.0 && y == 0.0));
        match segments[1] {
            PathSegment::Curve { c2x, c2y, x, y, .. } => {
                assert_eq!((c2x, c2y), (0.0, -12.0));
                assert_eq!((x, y), (6.0, 0.0));
            }
            PathSegment::Line { .. } => panic!("expected a curve hop"),
        }
        assert!(matches!(segments[2], PathSegment::Line { x, y } if x == 10.0 && y == 0.0));
    }

    #[test]
    fn touching_endpoints_are_not_a_crossing() {
        assert!(crossing((0.0, 0.0), (10.0, 0.0), (10.0, 0.0), (10.0, 10.0)).is_none());
        assert!(crossing((0.0, 0.0), (10.0, 0.0), (0.0, 5.0), (10.0, 5.0)).is_none());
    }

    #[test]
    fn crossing_reports_the_intersection_point() {
        let hit = crossing((0.0, 0.0), (10.0, 0.0), (5.0, -5.0), (5.0, 5.0)).unwrap();
        assert_eq!(hit, (5.0, 0.0));
    }
}
