//! Output formatting for row sets.
//!
//! The CLI prints JSON envelopes by default; previews and raw query results
//! can instead be rendered as an ASCII table (like the MySQL CLI) or as
//! Markdown.

use crate::models::{ColumnMetadata, Row};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use unicode_width::UnicodeWidthStr;

/// Output format for row results.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON envelope (default)
    #[default]
    Json,
    /// ASCII table format (like MySQL CLI)
    Table,
    /// Markdown table format
    Markdown,
}

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

/// Column names from result metadata, or from the first row when the
/// metadata is missing.
pub fn column_names(columns: &[ColumnMetadata], rows: &[Row]) -> Vec<String> {
    if !columns.is_empty() {
        return columns.iter().map(|c| c.name.clone()).collect();
    }
    rows.first()
        .map(|r| r.keys().cloned().collect())
        .unwrap_or_default()
}

/// Render rows in the requested format. `Json` yields `None`; the caller
/// prints the envelope instead.
pub fn render_rows(
    format: OutputFormat,
    columns: &[String],
    rows: &[Row],
    execution_time_ms: u64,
) -> Option<String> {
    match format {
        OutputFormat::Json => None,
        OutputFormat::Table => Some(format_as_table(columns, rows, execution_time_ms)),
        OutputFormat::Markdown => Some(format_as_markdown(columns, rows)),
    }
}

pub fn format_as_table(columns: &[String], rows: &[Row], execution_time_ms: u64) -> String {
    if columns.is_empty() {
        return "Empty set".to_string();
    }

    let mut widths: Vec<usize> = columns.iter().map(|c| c.width()).collect();
    for row in rows {
        for (i, col) in columns.iter().enumerate() {
            if let Some(value) = row.get(col) {
                widths[i] = widths[i].max(format_value(value).width());
            }
        }
    }

    let mut output = String::new();
    let separator: String = widths
        .iter()
        .map(|w| format!("+{}", "-".repeat(w + 2)))
        .collect::<String>()
        + "+\n";

    output.push_str(&separator);
    let header: String = columns
        .iter()
        .zip(&widths)
        .map(|(col, w)| format!("| {} ", pad_center(col, *w)))
        .collect::<String>()
        + "|\n";
    output.push_str(&header);
    output.push_str(&separator);

    for row in rows {
        let row_str: String = columns
            .iter()
            .zip(&widths)
            .map(|(col, w)| {
                let value = row.get(col).unwrap_or(&JsonValue::Null);
                let formatted = format_value(value);
                if matches!(value, JsonValue::Number(_)) {
                    format!("| {} ", pad_left(&formatted, *w))
                } else {
                    format!("| {} ", pad_right(&formatted, *w))
                }
            })
            .collect::<String>()
            + "|\n";
        output.push_str(&row_str);
    }

    output.push_str(&separator);

    let row_text = if rows.len() == 1 { "row" } else { "rows" };
    output.push_str(&format!(
        "{} {} in set ({:.2} sec)\n",
        rows.len(),
        row_text,
        execution_time_ms as f64 / 1000.0
    ));

    output
}

pub fn format_as_markdown(columns: &[String], rows: &[Row]) -> String {
    if columns.is_empty() {
        return "*Empty set*".to_string();
    }

    let mut output = String::new();

    let header: String = columns
        .iter()
        .map(|c| format!("| {} ", escape_markdown(c)))
        .collect::<String>()
        + "|\n";
    output.push_str(&header);

    let sep: String = columns.iter().map(|_| "|---").collect::<String>() + "|\n";
    output.push_str(&sep);

    for row in rows {
        let row_str: String = columns
            .iter()
            .map(|col| {
                let value = row.get(col).unwrap_or(&JsonValue::Null);
                format!("| {} ", escape_markdown(&format_value(value)))
            })
            .collect::<String>()
            + "|\n";
        output.push_str(&row_str);
    }

    output.push_str(&format!("\n*{} rows*", rows.len()));

    output
}

fn escape_markdown(s: &str) -> String {
    s.replace('|', "\\|").replace('\n', " ")
}

// `{:width$}` pads by char count; these pad by display width so CJK and
// emoji columns stay aligned.
fn pad_right(s: &str, width: usize) -> String {
    format!("{}{}", s, " ".repeat(width.saturating_sub(s.width())))
}

fn pad_left(s: &str, width: usize) -> String {
    format!("{}{}", " ".repeat(width.saturating_sub(s.width())), s)
}

fn pad_center(s: &str, width: usize) -> String {
    let total = width.saturating_sub(s.width());
    let left = total / 2;
    format!("{}{}{}", " ".repeat(left), s, " ".repeat(total - left))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows() -> Vec<Row> {
        vec![
            json!({"id": 1, "name": "Ann"}).as_object().cloned().unwrap(),
            json!({"id": 22, "name": null}).as_object().cloned().unwrap(),
        ]
    }

    #[test]
    fn test_table_alignment() {
        let columns = vec!["id".to_string(), "name".to_string()];
        let out = format_as_table(&columns, &rows(), 1500);
        assert!(out.contains("|  1 | Ann  |"));
        assert!(out.contains("| 22 | NULL |"));
        assert!(out.ends_with("2 rows in set (1.50 sec)\n"));
    }

    #[test]
    fn test_table_wide_characters() {
        let columns = vec!["名前".to_string()];
        let row = json!({"名前": "x"}).as_object().cloned().unwrap();
        let out = format_as_table(&columns, &[row], 0);
        assert!(out.starts_with("+------+\n| 名前 |\n"));
    }

    #[test]
    fn test_markdown_escapes_pipes() {
        let columns = vec!["v".to_string()];
        let row = json!({"v": "a|b"}).as_object().cloned().unwrap();
        let out = format_as_markdown(&columns, &[row]);
        assert!(out.contains("| a\\|b |"));
        assert!(out.ends_with("*1 rows*"));
    }

    #[test]
    fn test_json_renders_nothing() {
        assert!(render_rows(OutputFormat::Json, &[], &[], 0).is_none());
        assert_eq!(
            render_rows(OutputFormat::Table, &[], &[], 0).as_deref(),
            Some("Empty set")
        );
    }

    #[test]
    fn test_column_names_fall_back_to_first_row() {
        assert_eq!(column_names(&[], &rows()), vec!["id", "name"]);
        let meta = vec![ColumnMetadata::new("x", "INT", false)];
        assert_eq!(column_names(&meta, &rows()), vec!["x"]);
    }
}
