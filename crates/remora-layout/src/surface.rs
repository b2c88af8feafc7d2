//! Backend seam: anything that can measure text and paint shapes can render a diagram.

use serde_json::Value;

use crate::model::{NodeLayout, RoutedLine};
use crate::text::{TextMeasurer, TextMetrics, TextStyle};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// A drawing backend.
///
/// The layout engine never calls this directly; a renderer walks a finished
/// [`crate::model::Diagram`] and pushes its nodes and lines through here. Handles are opaque
/// to the caller and only flow back into the surface's own methods.
pub trait DrawingSurface {
    type ShapeHandle;
    type LineHandle;

    fn measure_text(&self, text: &str, style: &TextStyle) -> TextMetrics;

    fn draw_shape(&mut self, node: &NodeLayout) -> Self::ShapeHandle;

    fn draw_polyline(&mut self, line: &RoutedLine) -> Self::LineHandle;

    fn bounding_box(&self, shape: &Self::ShapeHandle) -> BoundingBox;

    /// Applies raw style overrides to an already drawn line.
    fn set_style(&mut self, line: &Self::LineHandle, style: &Value);

    fn set_viewport(&mut self, min_x: f64, min_y: f64, width: f64, height: f64);

    fn set_canvas_size(&mut self, width: f64, height: f64);
}

/// Adapts a surface's text measurement to the [`TextMeasurer`] seam the layout engine wants,
/// so layout and drawing agree on text extents.
pub struct SurfaceMeasurer<'a, S: DrawingSurface>(pub &'a S);

impl<S: DrawingSurface> TextMeasurer for SurfaceMeasurer<'_, S> {
    fn measure(&self, text: &str, style: &TextStyle) -> TextMetrics {
        self.0.measure_text(text, style)
    }
}
