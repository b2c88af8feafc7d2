//! Serializable layout output consumed by drawing backends.

use remora_core::{ChartOptions, SymbolKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::graph::RenderGraph;
use crate::route::RoutedLines;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeLayout {
    pub key: String,
    pub kind: SymbolKind,
    pub label: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub flow_state: String,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub click_handler: Option<String>,
}

/// One leg of a routed polyline; all coordinates are absolute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PathSegment {
    Line {
        x: f64,
        y: f64,
    },
    Curve {
        c1x: f64,
        c1y: f64,
        c2x: f64,
        c2y: f64,
        x: f64,
        y: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAnchor {
    Start,
    End,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineLabel {
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub anchor: TextAnchor,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutedLine {
    /// Index into [`Diagram::nodes`] of the source node.
    pub from: usize,
    pub to: usize,
    pub start_x: f64,
    pub start_y: f64,
    pub segments: Vec<PathSegment>,
    #[serde(default)]
    pub label: Option<LineLabel>,
    /// Raw per-line style overrides, passed through to the backend untouched.
    #[serde(default)]
    pub style: Option<Value>,
}

impl RoutedLine {
    /// Every coordinate the line touches, control points included.
    fn coords(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        std::iter::once((self.start_x, self.start_y)).chain(self.segments.iter().flat_map(|s| {
            match *s {
                PathSegment::Line { x, y } => vec![(x, y)],
                PathSegment::Curve {
                    c1x,
                    c1y,
                    c2x,
                    c2y,
                    x,
                    y,
                } => vec![(c1x, c1y), (c2x, c2y), (x, y)],
            }
        }))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanvasBounds {
    pub min_x: f64,
    pub min_y: f64,
    pub width: f64,
    pub height: f64,
    /// Surface size after the scale option is applied.
    pub canvas_width: f64,
    pub canvas_height: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagram {
    pub nodes: Vec<NodeLayout>,
    /// Index of the entry node in `nodes`.
    pub entry: usize,
    pub lines: Vec<RoutedLine>,
    pub bounds: CanvasBounds,
    /// The effective draw options the layout was computed with.
    pub options: Value,
}

impl Diagram {
    pub(crate) fn assemble(
        graph: &RenderGraph,
        routed: RoutedLines,
        options: &ChartOptions,
    ) -> Self {
        let nodes = graph
            .nodes
            .iter()
            .map(|node| NodeLayout {
                key: node.key.clone(),
                kind: node.kind,
                label: node.label.clone(),
                x: node.origin.x,
                y: node.origin.y,
                width: node.width(),
                height: node.height(),
                flow_state: node
                    .flow_state
                    .clone()
                    .unwrap_or_else(|| "future".to_string()),
                link: node.link.clone(),
                target: node.target.clone(),
                click_handler: node.click_handler.clone(),
            })
            .collect::<Vec<_>>();

        let bounds = compute_bounds(&nodes, &routed, options);
        Self {
            nodes,
            entry: graph.entry,
            lines: routed.lines,
            bounds,
            options: options.as_value().clone(),
        }
    }

    pub fn node_by_key(&self, key: &str) -> Option<&NodeLayout> {
        self.nodes.iter().find(|n| n.key == key)
    }
}

fn compute_bounds(nodes: &[NodeLayout], routed: &RoutedLines, options: &ChartOptions) -> CanvasBounds {
    let mut min_x = 0.0f64;
    let mut min_y = 0.0f64;
    let mut max_x = routed.max_x_from_line;
    let mut max_y = 0.0f64;

    for node in nodes {
        min_x = min_x.min(node.x);
        max_x = max_x.max(node.x + node.width);
        max_y = max_y.max(node.y + node.height);
    }

    for line in &routed.lines {
        for (x, y) in line.coords() {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
    }

    if routed.min_x_from_symbols < min_x {
        min_x = routed.min_x_from_symbols;
    }

    let line_width = options.f64("line-width").unwrap_or(3.0);
    let scale = options.f64("scale").unwrap_or(1.0);
    if min_x < 0.0 {
        min_x -= line_width;
    }
    if min_y < 0.0 {
        min_y -= line_width;
    }

    let width = max_x + line_width - min_x;
    let height = max_y + line_width - min_y;
    CanvasBounds {
        min_x,
        min_y,
        width,
        height,
        canvas_width: width * scale,
        canvas_height: height * scale,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LayoutOptions;
    use remora_core::parse;
    use serde_json::json;

    fn diagram_for(dsl: &str, user_options: Value) -> Diagram {
        let model = parse(dsl).unwrap();
        let options = ChartOptions::merged(&user_options);
        crate::layout_chart(&model, &options, &LayoutOptions::default()).unwrap()
    }

    #[test]
    fn two_stacked_nodes_span_both_boxes_and_the_gap() {
        let diagram = diagram_for("st=>start\ne=>end\nst->e", json!({}));
        let st = diagram.node_by_key("st").unwrap();
        let e = diagram.node_by_key("e").unwrap();
        let line_width = 3.0;
        let expected_min =
            st.height + e.height + 50.0 + 2.0 * line_width;
        assert!(diagram.bounds.height >= expected_min - 1e-9);
        assert_eq!(diagram.bounds.canvas_height, diagram.bounds.height);
    }

    #[test]
    fn scale_multiplies_only_the_canvas_size() {
        let plain = diagram_for("st=>start\ne=>end\nst->e", json!({}));
        let scaled = diagram_for("st=>start\ne=>end\nst->e", json!({"scale": 2.0}));
        assert_eq!(scaled.bounds.width, plain.bounds.width);
        assert_eq!(scaled.bounds.canvas_width, plain.bounds.width * 2.0);
        assert_eq!(scaled.bounds.canvas_height, plain.bounds.height * 2.0);
    }

    #[test]
    fn entry_points_at_the_start_node() {
        let diagram = diagram_for("a=>operation\nb=>end\na->b", json!({}));
        assert_eq!(diagram.nodes[diagram.entry].key, "a");
    }

    #[test]
    fn flow_state_defaults_to_future_in_the_output() {
        let diagram = diagram_for(
            "a=>operation: work|approved\nb=>end\na->b",
            json!({}),
        );
        assert_eq!(diagram.node_by_key("a").unwrap().flow_state, "approved");
        assert_eq!(diagram.node_by_key("b").unwrap().flow_state, "future");
    }

    #[test]
    fn link_metadata_passes_through() {
        let diagram = diagram_for(
            "a=>operation: docs:>https://example.com[blank]\nb=>end\na->b",
            json!({}),
        );
        let a = diagram.node_by_key("a").unwrap();
        assert_eq!(a.link.as_deref(), Some("https://example.com"));
        assert_eq!(a.target.as_deref(), Some("blank"));
    }

    #[test]
    fn diagram_serializes_to_json_and_back() {
        let diagram = diagram_for("st=>start\nop=>operation: go\ne=>end\nst->op->e", json!({}));
        let text = serde_json::to_string(&diagram).unwrap();
        let back: Diagram = serde_json::from_str(&text).unwrap();
        assert_eq!(back.nodes.len(), diagram.nodes.len());
        assert_eq!(back.lines.len(), diagram.lines.len());
        assert_eq!(back.bounds.width, diagram.bounds.width);
    }
}
