//! The chart model: symbol definitions plus the directed edges between them.
//!
//! This is pure data with no geometry. Layout-time concepts (node sizes, positions, routed
//! lines) live in `remora-layout`; the model only records what the DSL said.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// The closed set of renderable symbol kinds.
///
/// The parser keeps the kind as the raw token (see [`SymbolDefinition::kind`]); resolution to
/// this enum happens at render-graph build time so an unknown kind fails the render, not the
/// parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Start,
    End,
    Operation,
    #[serde(rename = "inputoutput")]
    InputOutput,
    Subroutine,
    Condition,
    #[serde(rename = "parallel")]
    ParallelSplit,
}

impl SymbolKind {
    pub fn from_token(token: &str) -> Option<Self> {
        Some(match token {
            "start" => Self::Start,
            "end" => Self::End,
            "operation" => Self::Operation,
            "inputoutput" => Self::InputOutput,
            "subroutine" => Self::Subroutine,
            "condition" => Self::Condition,
            "parallel" => Self::ParallelSplit,
            _ => return None,
        })
    }

    pub fn as_token(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::End => "end",
            Self::Operation => "operation",
            Self::InputOutput => "inputoutput",
            Self::Subroutine => "subroutine",
            Self::Condition => "condition",
            Self::ParallelSplit => "parallel",
        }
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_token())
    }
}

/// A named outgoing connection point on a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotKind {
    Next,
    Yes,
    No,
    Path1,
    Path2,
    Path3,
}

impl SlotKind {
    /// Slot tokens as they appear inside a flow statement's parentheses. `true`/`false` have
    /// already been normalized to `yes`/`no` by the parser.
    pub fn from_token(token: &str) -> Option<Self> {
        Some(match token {
            "next" => Self::Next,
            "yes" => Self::Yes,
            "no" => Self::No,
            "path1" => Self::Path1,
            "path2" => Self::Path2,
            "path3" => Self::Path3,
            _ => return None,
        })
    }

    pub fn as_token(&self) -> &'static str {
        match self {
            Self::Next => "next",
            Self::Yes => "yes",
            Self::No => "no",
            Self::Path1 => "path1",
            Self::Path2 => "path2",
            Self::Path3 => "path3",
        }
    }
}

/// A compass-like placement preference attached to an edge by the author.
///
/// This is the *requested* direction. The resolved direction is computed once by the layout
/// engine and lives on the render graph, never here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Top,
    Right,
    Bottom,
    Left,
}

impl Direction {
    pub fn from_token(token: &str) -> Option<Self> {
        Some(match token {
            "top" => Self::Top,
            "right" => Self::Right,
            "bottom" => Self::Bottom,
            "left" => Self::Left,
            _ => return None,
        })
    }

    pub fn as_token(&self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Right => "right",
            Self::Bottom => "bottom",
            Self::Left => "left",
        }
    }
}

/// A directed relation from one symbol to another, stored on the source symbol under its slot.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    /// Key of the target symbol.
    pub target: String,
    /// Placement preference from the flow statement, if any.
    pub direction: Option<Direction>,
    /// Per-edge label override (`@text` in the flow statement).
    pub annotation: Option<String>,
}

/// One DSL-declared symbol. Immutable once parsed, except that later flow and line-style
/// statements register edges and style overrides on it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SymbolDefinition {
    pub key: String,
    /// Raw kind token as written (e.g. `"condition"`). See [`SymbolKind::from_token`].
    pub kind: String,
    pub text: Option<String>,
    pub link: Option<String>,
    /// `[target]` suffix of a link.
    pub target: Option<String>,
    /// Named style bucket (`label|flowstate`).
    pub flow_state: Option<String>,
    /// External click handler name (`:$handler`). Never interpreted by the engine.
    pub click_handler: Option<String>,
    /// Free-form `name=value` pairs from the parenthesized parameter list.
    pub params: IndexMap<String, String>,
    /// Parsed per-successor line style overrides, keyed by target symbol key.
    pub line_style: IndexMap<String, Value>,
    /// Outgoing edges, at most one per slot.
    pub edges: IndexMap<SlotKind, Edge>,
}

impl SymbolDefinition {
    pub fn edge(&self, slot: SlotKind) -> Option<&Edge> {
        self.edges.get(&slot)
    }
}

/// The mapping from symbol key to definition plus the overall entry symbol.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartModel {
    /// Definition order is preserved; it drives canonical re-serialization.
    pub symbols: IndexMap<String, SymbolDefinition>,
    /// Key of the first symbol observed with an outgoing edge. Set once, never changed.
    pub entry: Option<String>,
}

impl ChartModel {
    pub fn entry_symbol(&self) -> Option<&SymbolDefinition> {
        self.symbols.get(self.entry.as_deref()?)
    }

    /// Canonical re-serialization back to DSL text.
    ///
    /// Parsing the returned text yields an equal `ChartModel`. Flow statements for the entry
    /// symbol are emitted first so entry discovery lands on the same symbol.
    pub fn to_dsl(&self) -> String {
        let mut out = String::new();

        for symbol in self.symbols.values() {
            out.push_str(&serialize_definition(symbol));
            out.push('\n');
        }

        let entry_first = self
            .entry
            .iter()
            .chain(self.symbols.keys().filter(|k| self.entry.as_ref() != Some(k)));
        for key in entry_first {
            let Some(symbol) = self.symbols.get(key) else {
                continue;
            };
            for (slot, edge) in &symbol.edges {
                out.push_str(&serialize_flow(symbol, *slot, edge));
                out.push('\n');
            }
        }

        for symbol in self.symbols.values() {
            for (target, style) in &symbol.line_style {
                out.push_str(&format!("{}@>{}({})\n", symbol.key, target, style));
            }
        }

        out
    }
}

fn serialize_definition(symbol: &SymbolDefinition) -> String {
    let mut line = symbol.key.clone();

    if !symbol.params.is_empty() {
        let params = symbol
            .params
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(",");
        line.push('(');
        line.push_str(&params);
        line.push(')');
    }

    line.push_str("=>");
    line.push_str(&symbol.kind);

    if symbol.text.is_some() || symbol.flow_state.is_some() {
        line.push_str(": ");
        if let Some(text) = &symbol.text {
            // Escape embedded newlines so the lexer reassembles them.
            line.push_str(&text.replace('\n', "\\\n"));
        }
        if let Some(state) = &symbol.flow_state {
            line.push('|');
            line.push_str(state);
        }
    }

    if let Some(handler) = &symbol.click_handler {
        line.push_str(":$");
        line.push_str(handler);
    } else if let Some(link) = &symbol.link {
        line.push_str(":>");
        line.push_str(link);
        if let Some(target) = &symbol.target {
            line.push('[');
            line.push_str(target);
            line.push(']');
        }
    }

    line
}

fn serialize_flow(symbol: &SymbolDefinition, slot: SlotKind, edge: &Edge) -> String {
    let mut qualifier = String::new();
    match (slot, edge.direction) {
        (SlotKind::Next, None) => {}
        (SlotKind::Next, Some(dir)) => qualifier.push_str(dir.as_token()),
        (slot, None) => qualifier.push_str(slot.as_token()),
        (slot, Some(dir)) => {
            qualifier.push_str(slot.as_token());
            qualifier.push(',');
            qualifier.push_str(dir.as_token());
        }
    }
    if let Some(annotation) = &edge.annotation {
        let at = format!("@{annotation}");
        match qualifier.find(',') {
            Some(idx) => qualifier.insert_str(idx, &at),
            None if qualifier.is_empty() => {
                qualifier.push_str(slot.as_token());
                qualifier.push_str(&at);
            }
            None => qualifier.push_str(&at),
        }
    }

    if qualifier.is_empty() {
        format!("{}->{}", symbol.key, edge.target)
    } else {
        format!("{}({})->{}", symbol.key, qualifier, edge.target)
    }
}
