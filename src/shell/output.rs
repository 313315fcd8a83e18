//! Result rendering.

use serde_json::{Map, Value as JsonValue};

use crate::config::OutputFormat;
use crate::storage::ColumnInfo;
use crate::value::{Row, Value};

pub fn render(format: OutputFormat, cols: &[ColumnInfo], rows: &[Row]) -> String {
    match format {
        OutputFormat::Table => render_table(cols, rows),
        OutputFormat::Json => render_json(cols, rows),
    }
}

/// Aligned columns with a header and a trailing row count.
pub fn render_table(cols: &[ColumnInfo], rows: &[Row]) -> String {
    let header: Vec<String> = cols.iter().map(display_name).collect();
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| row.iter().map(Value::to_string).collect())
        .collect();

    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for row in &cells {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    push_line(&mut out, &header, &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    push_line(&mut out, &rule, &widths);
    for row in &cells {
        push_line(&mut out, row, &widths);
    }
    let n = rows.len();
    out.push_str(&format!("({} row{})", n, if n == 1 { "" } else { "s" }));
    out
}

fn push_line(out: &mut String, cells: &[String], widths: &[usize]) {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(c, w)| format!("{:<width$}", c, width = *w))
        .collect();
    out.push_str(padded.join(" | ").trim_end());
    out.push('\n');
}

/// One JSON object per row, keyed by column name.
pub fn render_json(cols: &[ColumnInfo], rows: &[Row]) -> String {
    rows.iter()
        .map(|row| {
            let mut obj = Map::new();
            for (col, v) in cols.iter().zip(row) {
                obj.insert(display_name(col), v.to_json());
            }
            JsonValue::Object(obj).to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn display_name(col: &ColumnInfo) -> String {
    if col.name.is_empty() {
        "?".to_string()
    } else {
        col.name.clone()
    }
}
