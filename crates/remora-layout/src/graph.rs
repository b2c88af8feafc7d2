//! Render-graph construction: one renderable node per distinct symbol key.
//!
//! The walk starts at the chart's entry symbol and memoizes nodes by key, so re-converging
//! branches and cycles resolve to the same node instead of recursing forever. A node whose
//! outgoing wiring is already complete (`path_resolved`) is never re-entered.

use indexmap::IndexMap;
use remora_core::geom::{Point, Size, point, size};
use remora_core::{ChartModel, Direction, SlotKind, SymbolDefinition, SymbolKind};
use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::{Error, Result};

pub type NodeId = usize;

/// An outgoing connection wired during the walk.
///
/// `hint` is the author's requested direction, immutable from parse. The direction the layout
/// engine actually picks lands in `resolved`, set exactly once by direction assignment.
#[derive(Debug, Clone)]
pub struct OutEdge {
    pub slot: SlotKind,
    pub to: NodeId,
    pub hint: Option<Direction>,
    pub annotation: Option<String>,
    pub resolved: Option<Direction>,
}

/// The positioned counterpart of a symbol definition.
#[derive(Debug, Clone)]
pub struct RenderNode {
    pub key: String,
    pub kind: SymbolKind,
    pub label: String,
    pub link: Option<String>,
    pub target: Option<String>,
    pub click_handler: Option<String>,
    pub flow_state: Option<String>,
    pub params: IndexMap<String, String>,
    pub line_style: IndexMap<String, Value>,
    pub out: Vec<OutEdge>,
    /// True once every slot leaving this node has been wired; re-entry stops here.
    pub path_resolved: bool,

    /// Device-independent size, set by the sizing pass.
    pub size: Size,
    /// Top-left corner, mutable until `positioned` flips.
    pub origin: Point,
    /// Set exactly once; the first predecessor to place a node wins.
    pub positioned: bool,
    /// Left/right anchors sit inset from the box edge for slanted shapes.
    pub anchor_inset: f64,
}

impl RenderNode {
    pub fn width(&self) -> f64 {
        self.size.width
    }

    pub fn height(&self) -> f64 {
        self.size.height
    }

    pub fn center(&self) -> Point {
        point(
            self.origin.x + self.size.width / 2.0,
            self.origin.y + self.size.height / 2.0,
        )
    }

    pub fn top_anchor(&self) -> Point {
        point(self.origin.x + self.size.width / 2.0, self.origin.y)
    }

    pub fn bottom_anchor(&self) -> Point {
        point(
            self.origin.x + self.size.width / 2.0,
            self.origin.y + self.size.height,
        )
    }

    pub fn left_anchor(&self) -> Point {
        point(
            self.origin.x + self.anchor_inset,
            self.origin.y + self.size.height / 2.0,
        )
    }

    pub fn right_anchor(&self) -> Point {
        point(
            self.origin.x + self.size.width - self.anchor_inset,
            self.origin.y + self.size.height / 2.0,
        )
    }

    pub fn edge_on(&self, slot: SlotKind) -> Option<&OutEdge> {
        self.out.iter().find(|e| e.slot == slot)
    }
}

#[derive(Debug)]
pub struct RenderGraph {
    pub nodes: Vec<RenderNode>,
    pub entry: NodeId,
}

/// Walk order for a node's outgoing slots; also the layout recursion order.
pub fn slot_order(kind: SymbolKind) -> &'static [SlotKind] {
    match kind {
        SymbolKind::Condition => &[SlotKind::Yes, SlotKind::No],
        SymbolKind::ParallelSplit => &[SlotKind::Path1, SlotKind::Path2, SlotKind::Path3],
        _ => &[SlotKind::Next],
    }
}

pub fn build_render_graph(model: &ChartModel) -> Result<RenderGraph> {
    let entry_def = model.entry_symbol().ok_or(Error::MissingEntry)?;

    let mut builder = Builder {
        model,
        nodes: Vec::new(),
        by_key: FxHashMap::default(),
    };
    let entry = builder.construct(entry_def, None)?;
    Ok(RenderGraph {
        nodes: builder.nodes,
        entry,
    })
}

struct Wire {
    from: NodeId,
    slot: SlotKind,
    hint: Option<Direction>,
    annotation: Option<String>,
}

struct Builder<'a> {
    model: &'a ChartModel,
    nodes: Vec<RenderNode>,
    by_key: FxHashMap<String, NodeId>,
}

impl Builder<'_> {
    fn construct(&mut self, def: &SymbolDefinition, wire: Option<Wire>) -> Result<NodeId> {
        let fresh = !self.by_key.contains_key(&def.key);
        let id = self.materialize(def)?;

        if let Some(wire) = wire {
            if !self.nodes[wire.from].path_resolved {
                self.wire(wire, id);
            }
        }

        // A fully wired node was already expanded by an earlier visit; a memoized node is
        // mid-expansion further up the stack. Either way, stop descending.
        if self.nodes[id].path_resolved || !fresh {
            return Ok(id);
        }

        for &slot in slot_order(self.nodes[id].kind) {
            let Some(edge) = def.edge(slot) else {
                continue;
            };
            let Some(target_def) = self.model.symbols.get(&edge.target) else {
                continue;
            };
            self.construct(
                target_def,
                Some(Wire {
                    from: id,
                    slot,
                    hint: edge.direction,
                    annotation: edge.annotation.clone(),
                }),
            )?;
        }

        Ok(id)
    }

    fn materialize(&mut self, def: &SymbolDefinition) -> Result<NodeId> {
        if let Some(&id) = self.by_key.get(&def.key) {
            return Ok(id);
        }

        let kind = SymbolKind::from_token(&def.kind).ok_or_else(|| Error::UnknownSymbolKind {
            kind: def.kind.clone(),
        })?;

        let label = def.text.clone().unwrap_or_else(|| default_label(kind));
        let id = self.nodes.len();
        self.nodes.push(RenderNode {
            key: def.key.clone(),
            kind,
            label,
            link: def.link.clone(),
            target: def.target.clone(),
            click_handler: def.click_handler.clone(),
            flow_state: def.flow_state.clone(),
            params: def.params.clone(),
            line_style: def.line_style.clone(),
            out: Vec::new(),
            path_resolved: false,
            size: size(0.0, 0.0),
            origin: point(0.0, 0.0),
            positioned: false,
            anchor_inset: 0.0,
        });
        self.by_key.insert(def.key.clone(), id);
        Ok(id)
    }

    fn wire(&mut self, wire: Wire, to: NodeId) {
        let from = &mut self.nodes[wire.from];
        if from.edge_on(wire.slot).is_some() {
            return;
        }
        from.out.push(OutEdge {
            slot: wire.slot,
            to,
            hint: wire.hint,
            annotation: wire.annotation,
            resolved: None,
        });

        // `path_resolved` flips once the node's outgoing wiring is complete: immediately for a
        // plain successor, and once the sibling slot(s) are wired for branching kinds.
        from.path_resolved = match from.kind {
            SymbolKind::Condition => {
                from.edge_on(SlotKind::Yes).is_some() && from.edge_on(SlotKind::No).is_some()
            }
            SymbolKind::ParallelSplit => match wire.slot {
                SlotKind::Path1 => from.edge_on(SlotKind::Path2).is_some(),
                SlotKind::Path2 => from.edge_on(SlotKind::Path3).is_some(),
                SlotKind::Path3 => from.edge_on(SlotKind::Path1).is_some(),
                _ => from.path_resolved,
            },
            _ => true,
        };
    }
}

fn default_label(kind: SymbolKind) -> String {
    match kind {
        SymbolKind::Start => "Start".to_string(),
        SymbolKind::End => "End".to_string(),
        _ => String::new(),
    }
}
