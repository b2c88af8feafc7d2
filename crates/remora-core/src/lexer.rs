//! Splits raw DSL text into logical statement lines.
//!
//! Two continuation rules apply, in order:
//! - a `\n` immediately preceded by a backslash does not end the line; the escape is dropped
//!   and the newline is kept as a literal `\n` inside the label text,
//! - a physical line containing none of the statement markers (`=>`, `->`, `@>`) is folded
//!   into the previous logical line (labels may span lines without an explicit escape).

const STATEMENT_MARKERS: [&str; 3] = ["=>", "->", "@>"];

/// Splits `input` into logical statement lines.
///
/// Malformed input never fails here; statements that remain malformed surface as no-ops in
/// the parser.
pub fn logical_lines(input: &str) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    let mut prev_break = 0usize;
    let mut prev_char: Option<char> = None;

    for (idx, ch) in input.char_indices() {
        if ch == '\n' && prev_char != Some('\\') {
            lines.push(unescape_newlines(&input[prev_break..idx]));
            prev_break = idx + 1;
        }
        prev_char = Some(ch);
    }

    if prev_break < input.len() {
        lines.push(unescape_newlines(&input[prev_break..]));
    }

    // Fold marker-less physical lines into their predecessor.
    let mut idx = 1;
    while idx < lines.len() {
        let current = &lines[idx];
        if STATEMENT_MARKERS.iter().any(|m| current.contains(m)) {
            idx += 1;
        } else {
            let folded = lines.remove(idx);
            lines[idx - 1].push('\n');
            lines[idx - 1].push_str(&folded);
        }
    }

    lines
}

fn unescape_newlines(line: &str) -> String {
    line.replace("\\\n", "\n")
}
