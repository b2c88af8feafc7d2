#![forbid(unsafe_code)]

//! `remora` compiles a small flowchart DSL into fully laid out, routed diagrams without
//! touching a canvas.
//!
//! The pipeline lives in two crates re-exported here: `remora-core` parses source text into a
//! chart model, `remora-layout` turns that model into positioned boxes and routed polylines.
//! Drawing is a trait seam ([`surface::DrawingSurface`]); any backend that can measure text
//! and paint paths can display the result.
//!
//! ```
//! let diagram = remora::render_chart(
//!     "st=>start\ne=>end\nst->e",
//!     &serde_json::json!({"line-length": 60.0}),
//! )?;
//! assert_eq!(diagram.nodes.len(), 2);
//! # Ok::<(), remora::RenderError>(())
//! ```

pub use remora_core::*;

pub use remora_layout::model::{
    CanvasBounds, Diagram, LineLabel, NodeLayout, PathSegment, RoutedLine, TextAnchor,
};
pub use remora_layout::text::{DeterministicTextMeasurer, TextMeasurer, TextMetrics, TextStyle};
pub use remora_layout::{LayoutOptions, layout_chart, layout_chart_with_measurer, surface};

use remora_layout::surface::{DrawingSurface, SurfaceMeasurer};
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error(transparent)]
    Parse(#[from] remora_core::Error),
    #[error(transparent)]
    Layout(#[from] remora_layout::Error),
}

pub type RenderResult<T> = std::result::Result<T, RenderError>;

/// Parses and lays out a chart in one call, using the deterministic text measurer.
///
/// `user_options` is deep-merged over the defaults; pass `Value::Null` or an empty object to
/// keep them as-is.
pub fn render_chart(text: &str, user_options: &Value) -> RenderResult<Diagram> {
    let model = remora_core::parse(text)?;
    let options = ChartOptions::merged(user_options);
    Ok(layout_chart(&model, &options, &LayoutOptions::default())?)
}

/// A parsed chart plus its draw options, ready to be drawn any number of times.
pub struct Chart {
    model: ChartModel,
    options: ChartOptions,
    diagram: Option<Diagram>,
}

impl Chart {
    pub fn parse(text: &str, user_options: &Value) -> RenderResult<Self> {
        Ok(Self {
            model: remora_core::parse(text)?,
            options: ChartOptions::merged(user_options),
            diagram: None,
        })
    }

    pub fn model(&self) -> &ChartModel {
        &self.model
    }

    pub fn options(&self) -> &ChartOptions {
        &self.options
    }

    /// The diagram from the most recent [`Chart::draw`], if any.
    pub fn diagram(&self) -> Option<&Diagram> {
        self.diagram.as_ref()
    }

    /// Overrides one option under its dotted path, e.g. `symbols.condition.line-length`.
    pub fn set_option(&mut self, dotted_path: &str, value: Value) {
        self.options.set_value(dotted_path, value);
    }

    /// Lays the chart out against the surface's own text metrics and paints it.
    ///
    /// Drawing again replaces the previously computed diagram; the surface decides what to do
    /// with anything it painted earlier.
    pub fn draw<S: DrawingSurface>(&mut self, surface: &mut S) -> RenderResult<&Diagram> {
        let diagram =
            layout_chart_with_measurer(&self.model, &self.options, &SurfaceMeasurer(surface))?;

        for node in &diagram.nodes {
            surface.draw_shape(node);
        }
        for line in &diagram.lines {
            let handle = surface.draw_polyline(line);
            if let Some(style) = &line.style {
                surface.set_style(&handle, style);
            }
        }
        let b = &diagram.bounds;
        surface.set_canvas_size(b.canvas_width, b.canvas_height);
        surface.set_viewport(b.min_x, b.min_y, b.width, b.height);

        Ok(self.diagram.insert(diagram))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use remora_layout::surface::BoundingBox;
    use serde_json::json;

    #[derive(Default)]
    struct RecordingSurface {
        shapes: Vec<String>,
        lines: usize,
        styled: usize,
        viewport: Option<(f64, f64, f64, f64)>,
        canvas: Option<(f64, f64)>,
    }

    impl DrawingSurface for RecordingSurface {
        type ShapeHandle = usize;
        type LineHandle = usize;

        fn measure_text(&self, text: &str, style: &TextStyle) -> TextMetrics {
            DeterministicTextMeasurer::default().measure(text, style)
        }

        fn draw_shape(&mut self, node: &NodeLayout) -> usize {
            self.shapes.push(node.key.clone());
            self.shapes.len() - 1
        }

        fn draw_polyline(&mut self, _line: &RoutedLine) -> usize {
            self.lines += 1;
            self.lines - 1
        }

        fn bounding_box(&self, _shape: &usize) -> BoundingBox {
            BoundingBox {
                x: 0.0,
                y: 0.0,
                width: 0.0,
                height: 0.0,
            }
        }

        fn set_style(&mut self, _line: &usize, _style: &Value) {
            self.styled += 1;
        }

        fn set_viewport(&mut self, min_x: f64, min_y: f64, width: f64, height: f64) {
            self.viewport = Some((min_x, min_y, width, height));
        }

        fn set_canvas_size(&mut self, width: f64, height: f64) {
            self.canvas = Some((width, height));
        }
    }

    #[test]
    fn render_chart_runs_the_whole_pipeline() {
        let diagram = render_chart("st=>start\ne=>end\nst->e", &json!({})).unwrap();
        assert_eq!(diagram.nodes.len(), 2);
        assert_eq!(diagram.lines.len(), 1);
    }

    #[test]
    fn parse_errors_surface_as_render_errors() {
        let err = render_chart(
            "a=>operation\nb=>end\na->b\na@>b(not json)",
            &json!({}),
        )
        .unwrap_err();
        assert!(matches!(err, RenderError::Parse(_)));
    }

    #[test]
    fn unknown_kind_surfaces_as_layout_error() {
        let err = render_chart("a=>widget\nb=>end\na->b", &json!({})).unwrap_err();
        assert!(matches!(err, RenderError::Layout(_)));
    }

    #[test]
    fn draw_pushes_everything_to_the_surface() {
        let mut chart = Chart::parse(
            "a=>start\nb=>end\na->b\na@>b({\"stroke\":\"red\"})",
            &json!({}),
        )
        .unwrap();
        let mut surface = RecordingSurface::default();
        let diagram = chart.draw(&mut surface).unwrap();

        assert_eq!(diagram.nodes.len(), 2);
        assert_eq!(surface.shapes, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(surface.lines, 1);
        assert_eq!(surface.styled, 1);
        let (_, _, width, height) = surface.viewport.unwrap();
        assert_eq!(surface.canvas.unwrap(), (width, height));
    }

    #[test]
    fn drawing_twice_replaces_the_diagram() {
        let mut chart = Chart::parse("a=>start\nb=>end\na->b", &json!({})).unwrap();
        let mut surface = RecordingSurface::default();
        chart.draw(&mut surface).unwrap();
        chart.set_option("line-length", json!(200.0));
        let second = chart.draw(&mut surface).unwrap();

        let a = second.node_by_key("a").unwrap();
        let b = second.node_by_key("b").unwrap();
        assert!((b.y - (a.y + a.height) - 200.0).abs() < 1e-6);
        assert_eq!(surface.shapes.len(), 4);
    }
}
