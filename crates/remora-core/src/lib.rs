#![forbid(unsafe_code)]

//! Flowchart DSL parser + chart model (headless).
//!
//! This crate turns the compact textual flowchart grammar into a [`ChartModel`]: symbol
//! definitions plus the directed, slot-tagged edges between them. It knows nothing about
//! geometry; layout and line routing live in `remora-layout`.

pub mod error;
pub mod geom;
pub mod lexer;
pub mod model;
pub mod options;
pub mod parser;

pub use error::{Error, Result};
pub use model::{ChartModel, Direction, Edge, SlotKind, SymbolDefinition, SymbolKind};
pub use options::ChartOptions;
pub use parser::parse;
