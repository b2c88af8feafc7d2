//! Statement parser: classifies logical lines and mutates a [`ChartModel`] in place.
//!
//! A line is matched against the first marker it contains, in this precedence: `=>`
//! (definition), `->` (flow), `@>` (line style). The grammar is deliberately loose:
//! unresolvable key references are silent no-ops, matching the format's long-standing
//! behavior. The one hard failure is a malformed line-style JSON payload.

use crate::error::{Error, Result};
use crate::lexer::logical_lines;
use crate::model::{ChartModel, Direction, Edge, SlotKind, SymbolDefinition};

/// Parses the full DSL text into a chart model.
pub fn parse(input: &str) -> Result<ChartModel> {
    let mut chart = ChartModel::default();

    for line in logical_lines(input.trim()) {
        let line = line.trim();
        if line.contains("=>") {
            parse_definition(line, &mut chart);
        } else if line.contains("->") {
            parse_flow(line, &mut chart);
        } else if line.contains("@>") {
            parse_line_style(line, &mut chart)?;
        }
    }

    Ok(chart)
}

/// Content of the first parenthesized group, if both delimiters are present.
fn paren_content(text: &str) -> Option<&str> {
    let start = text.find('(')? + 1;
    let end = text.find(')')?;
    (start <= end).then(|| &text[start..end])
}

/// Symbol key of a flow/line-style reference: the text before the parameter list, or the
/// whole reference when there is none.
fn reference_key(text: &str) -> &str {
    match text.find('(') {
        Some(idx) if text.contains(')') => &text[..idx],
        _ => text,
    }
}

fn parse_definition(line: &str, chart: &mut ChartModel) {
    let mut parts = line.split("=>");
    let left = parts.next().unwrap_or_default();
    // Anything after a second `=>` is dropped, like the reference grammar.
    let mut kind = parts.next().unwrap_or_default().to_string();

    let mut symbol = SymbolDefinition {
        key: strip_paren_group(left),
        ..Default::default()
    };

    if let Some(params) = paren_group_content(left) {
        for entry in params.split(',') {
            let mut kv = entry.splitn(2, '=');
            if let (Some(name), Some(value)) = (kv.next(), kv.next()) {
                symbol.params.insert(name.to_string(), value.to_string());
            }
        }
    }

    let mut text: Option<String> = None;
    if let Some((head, rest)) = kind.split_once(": ") {
        let head = head.to_string();
        text = Some(rest.to_string());
        kind = head;
    }

    // Checked in order: inline click handler, then hyperlink. At most one applies.
    if let Some(t) = text.as_ref().and_then(|t| t.split_once(":$").map(owned_pair)) {
        text = Some(t.0);
        symbol.click_handler = Some(t.1);
    } else if let Some((head, handler)) = kind.split_once(":$").map(owned_pair) {
        kind = head;
        symbol.click_handler = Some(handler);
    } else if let Some(t) = text.as_ref().and_then(|t| t.split_once(":>").map(owned_pair)) {
        text = Some(t.0);
        symbol.link = Some(t.1);
    } else if let Some((head, link)) = kind.split_once(":>").map(owned_pair) {
        kind = head;
        symbol.link = Some(link);
    }

    // Rare malformed input: a newline embedded in the kind token truncates it.
    if let Some((head, _)) = kind.split_once('\n') {
        kind = head.to_string();
    }

    if let Some(link) = symbol.link.take() {
        match (link.find('['), link.find(']')) {
            (Some(start), Some(end)) if start < end => {
                symbol.target = Some(link[start + 1..end].to_string());
                symbol.link = Some(link[..start].to_string());
            }
            _ => symbol.link = Some(link),
        }
    }

    // A trailing `|state` segment of the label selects a flow-state style bucket.
    if let Some(t) = &text {
        if let Some((label, state)) = t.rsplit_once('|') {
            symbol.flow_state = Some(state.trim().to_string());
            text = Some(label.to_string());
        }
    }

    symbol.kind = kind;
    symbol.text = text;
    chart.symbols.insert(symbol.key.clone(), symbol);
}

fn owned_pair((a, b): (&str, &str)) -> (String, String) {
    (a.to_string(), b.to_string())
}

fn strip_paren_group(text: &str) -> String {
    match (text.find('('), text.rfind(')')) {
        (Some(start), Some(end)) if start < end => {
            format!("{}{}", &text[..start], &text[end + 1..])
        }
        _ => text.to_string(),
    }
}

/// Greedy variant used for parameter lists: first `(` to last `)`.
fn paren_group_content(text: &str) -> Option<&str> {
    let start = text.find('(')? + 1;
    let end = text.rfind(')')?;
    (start <= end).then(|| &text[start..end])
}

/// The qualifier in a flow hop's parentheses: slot, direction hint and annotation.
#[derive(Debug, Default)]
struct HopQualifier {
    slot: Option<SlotKind>,
    direction: Option<Direction>,
    annotation: Option<String>,
    /// An unrecognized slot token makes the hop a no-op instead of guessing.
    malformed: bool,
}

fn parse_hop_qualifier(reference: &str) -> HopQualifier {
    let mut qualifier = HopQualifier::default();
    let Some(content) = paren_content(reference) else {
        return qualifier;
    };

    let (slot_part, direction_part) = match content.split_once(',') {
        Some((s, d)) => (s, Some(d.trim())),
        None => (content, None),
    };

    // `@text` after the slot token annotates the single next edge only.
    let (mut slot_token, annotation) = match slot_part.split_once('@') {
        Some((token, ann)) if !ann.is_empty() => (token, Some(ann.to_string())),
        _ => (slot_part, None),
    };
    qualifier.annotation = annotation;

    // `true`/`false` alias `yes`/`no`.
    slot_token = match slot_token {
        "true" => "yes",
        "false" => "no",
        other => other,
    };

    match direction_part {
        Some(direction) => {
            qualifier.slot = SlotKind::from_token(slot_token);
            qualifier.direction = Direction::from_token(direction);
            qualifier.malformed = qualifier.slot.is_none();
        }
        None => {
            // A lone token is a slot name when it parses as one, otherwise a direction
            // hint on the generic `next` slot.
            if let Some(slot) = SlotKind::from_token(slot_token) {
                qualifier.slot = Some(slot);
            } else if let Some(direction) = Direction::from_token(slot_token) {
                qualifier.slot = Some(SlotKind::Next);
                qualifier.direction = Some(direction);
            } else {
                qualifier.malformed = true;
            }
        }
    }

    if qualifier.slot.is_none() && !qualifier.malformed {
        qualifier.slot = Some(SlotKind::Next);
    }
    qualifier
}

fn parse_flow(line: &str, chart: &mut ChartModel) {
    let references: Vec<&str> = line.split("->").collect();

    for pair in references.windows(2) {
        let (source_ref, target_ref) = (pair[0], pair[1]);
        let qualifier = parse_hop_qualifier(source_ref);
        if qualifier.malformed {
            continue;
        }

        let source_key = reference_key(source_ref).to_string();
        let target_key = reference_key(target_ref).to_string();
        if !chart.symbols.contains_key(&target_key) {
            continue;
        }
        let Some(source) = chart.symbols.get_mut(&source_key) else {
            continue;
        };

        let slot = qualifier.slot.unwrap_or(SlotKind::Next);
        source.edges.insert(
            slot,
            Edge {
                target: target_key,
                direction: qualifier.direction,
                annotation: qualifier.annotation,
            },
        );

        // The entry symbol is the first one observed with an outgoing edge.
        if chart.entry.is_none() {
            chart.entry = Some(source_key);
        }
    }
}

fn parse_line_style(line: &str, chart: &mut ChartModel) -> Result<()> {
    let references: Vec<&str> = line.split("@>").collect();

    for pair in references.windows(2) {
        let source_key = reference_key(pair[0]).to_string();
        let target_key = reference_key(pair[1]).to_string();
        if !chart.symbols.contains_key(&source_key) || !chart.symbols.contains_key(&target_key) {
            continue;
        }

        let payload = paren_content(pair[1]).unwrap_or("{}");
        let style: serde_json::Value =
            serde_json::from_str(payload).map_err(|err| Error::StyleParse {
                source_key: source_key.clone(),
                target_key: target_key.clone(),
                message: err.to_string(),
            })?;

        if let Some(source) = chart.symbols.get_mut(&source_key) {
            source.line_style.insert(target_key, style);
        }
    }

    Ok(())
}
