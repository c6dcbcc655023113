//! Output formatting for the terminal.
//!
//! Row sets are drawn as box-drawing grids; every other message to the
//! operator is a [`StatusBlock`].

use serde_json::Value as JsonValue;
use unicode_width::UnicodeWidthStr;

/// Block shown for a data-returning statement with no rows.
pub const NO_ROWS_BLOCK: &str =
    "┌─ Query Result\n│  Status: No rows found\n│  Rows: 0\n└─ End of result";

/// Render a single cell.
pub fn format_value(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => "NULL".to_string(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::String(s) => s.clone(),
        JsonValue::Array(arr) => serde_json::to_string(arr).unwrap_or_default(),
        JsonValue::Object(obj) => serde_json::to_string(obj).unwrap_or_default(),
    }
}

/// Render a cell for the grid: control characters are escaped so that a
/// value never spans more than one line.
fn grid_cell(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_control() {
            out.extend(c.escape_debug());
        } else {
            out.push(c);
        }
    }
    out
}

/// Column widths: the widest header or cell of each column, plus two.
pub fn column_widths(rows: &[Vec<JsonValue>], headers: &[String]) -> Vec<usize> {
    let columns = rows
        .iter()
        .map(Vec::len)
        .chain(std::iter::once(headers.len()))
        .max()
        .unwrap_or(0);

    let mut widths: Vec<usize> = (0..columns)
        .map(|i| headers.get(i).map(|h| grid_cell(h).width()).unwrap_or(0))
        .collect();
    for row in rows {
        for (i, value) in row.iter().enumerate() {
            widths[i] = widths[i].max(grid_cell(&format_value(value)).width());
        }
    }
    widths.iter().map(|w| w + 2).collect()
}

/// Draw rows as a grid, or the no-rows block when there are none.
///
/// Without headers the header row and its separator are left out.
pub fn render(rows: &[Vec<JsonValue>], headers: &[String]) -> String {
    if rows.is_empty() {
        return NO_ROWS_BLOCK.to_string();
    }

    let widths = column_widths(rows, headers);
    let mut lines = Vec::with_capacity(rows.len() + 4);

    lines.push(border('┌', '┬', '┐', &widths));
    if !headers.is_empty() {
        let cells: Vec<String> = headers.iter().map(|h| grid_cell(h)).collect();
        lines.push(grid_row(cells.iter().map(String::as_str), &widths));
        lines.push(border('├', '┼', '┤', &widths));
    }
    for row in rows {
        let cells: Vec<String> = row
            .iter()
            .map(|v| grid_cell(&format_value(v)))
            .collect();
        lines.push(grid_row(cells.iter().map(String::as_str), &widths));
    }
    lines.push(border('└', '┴', '┘', &widths));

    lines.join("\n")
}

fn border(left: char, mid: char, right: char, widths: &[usize]) -> String {
    let segments: Vec<String> = widths.iter().map(|w| "─".repeat(*w)).collect();
    format!("{}{}{}", left, segments.join(&mid.to_string()), right)
}

fn grid_row<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    let mut cells = cells;
    let padded: Vec<String> = widths
        .iter()
        .map(|w| pad(cells.next().unwrap_or(""), *w))
        .collect();
    format!("│{}│", padded.join("│"))
}

/// Left-justify `text` to `width` display columns.
fn pad(text: &str, width: usize) -> String {
    let fill = width.saturating_sub(text.width());
    format!("{}{}", text, " ".repeat(fill))
}

/// A titled message block:
///
/// ```text
/// ┌─ Title
/// │  Key: Value
/// └─ footer
/// ```
#[derive(Debug, Clone, Default)]
pub struct StatusBlock {
    title: String,
    lines: Vec<String>,
    footer: String,
}

impl StatusBlock {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Add a `Key: Value` line.
    pub fn field(mut self, key: &str, value: impl std::fmt::Display) -> Self {
        self.lines.push(format!("{}: {}", key, value));
        self
    }

    pub fn footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = footer.into();
        self
    }

    pub fn render(&self) -> String {
        let mut out = format!("┌─ {}", self.title);
        for line in &self.lines {
            out.push_str("\n│  ");
            out.push_str(line);
        }
        out.push_str("\n└─");
        if !self.footer.is_empty() {
            out.push(' ');
            out.push_str(&self.footer);
        }
        out
    }
}

impl std::fmt::Display for StatusBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render())
    }
}
