#![forbid(unsafe_code)]

//! Headless layout + line routing for the remora flowchart DSL.
//!
//! The pipeline is strictly forward and synchronous:
//! chart model → render graph → sized graph → positioned graph → routed lines → bounds.
//! Drawing is someone else's job: the engine only needs a [`text::TextMeasurer`] and emits a
//! [`model::Diagram`] that a [`surface::DrawingSurface`] implementation can paint.

pub mod graph;
pub mod layout;
pub mod model;
pub mod route;
pub mod surface;
pub mod text;

use remora_core::{ChartModel, ChartOptions};
use std::sync::Arc;

use crate::text::{DeterministicTextMeasurer, TextMeasurer};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A symbol definition used a kind token outside the closed set. The whole render aborts.
    #[error("unknown symbol kind: {kind}")]
    UnknownSymbolKind { kind: String },
    /// The chart has no flow statements, so there is no entry symbol to walk from.
    #[error("chart has no entry symbol (no flow statement registered an edge)")]
    MissingEntry,
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Clone)]
pub struct LayoutOptions {
    pub text_measurer: Arc<dyn TextMeasurer + Send + Sync>,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            text_measurer: Arc::new(DeterministicTextMeasurer::default()),
        }
    }
}

/// Runs the full layout pipeline for one chart.
///
/// Each call builds a fresh render graph; nothing is shared across diagrams.
pub fn layout_chart(
    model: &ChartModel,
    options: &ChartOptions,
    layout_options: &LayoutOptions,
) -> Result<model::Diagram> {
    layout_chart_with_measurer(model, options, layout_options.text_measurer.as_ref())
}

/// Variant taking a borrowed measurer, for callers whose measurer lives on a drawing surface.
pub fn layout_chart_with_measurer(
    model: &ChartModel,
    options: &ChartOptions,
    measurer: &dyn TextMeasurer,
) -> Result<model::Diagram> {
    let mut graph = graph::build_render_graph(model)?;
    layout::size_nodes(&mut graph, options, measurer);
    layout::resolve_directions(&mut graph);
    layout::place_nodes(&mut graph, options);
    let routed = route::route_lines(&graph, options);
    Ok(model::Diagram::assemble(&graph, routed, options))
}
