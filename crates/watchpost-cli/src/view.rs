//! Plain-text rendering of backend data.
//!
//! Payloads are untyped JSON. Arrays of objects print as a table whose
//! columns come from the first row; anything else prints as pretty JSON.

use serde_json::Value;
use watchpost_core::utils::truncate_string;
use watchpost_core::ApiError;

const MAX_CELL_WIDTH: usize = 24;
const MAX_COLUMNS: usize = 8;

pub fn section(title: &str, result: &Result<Option<Value>, ApiError>) {
    println!("== {} ==", title);
    match result {
        Ok(Some(value)) => println!("{}", render(value)),
        Ok(None) => println!("(no data)"),
        Err(e) => println!("error: {}", e),
    }
    println!();
}

pub fn render(value: &Value) -> String {
    match value {
        Value::Array(rows) if !rows.is_empty() && rows.iter().all(Value::is_object) => table(rows),
        Value::Array(rows) if rows.is_empty() => "(empty)".to_string(),
        Value::Object(map) if map.values().all(is_scalar) => map
            .iter()
            .map(|(k, v)| format!("{:<24} {}", k, cell(v)))
            .collect::<Vec<_>>()
            .join("\n"),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}

fn cell(value: &Value) -> String {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Null => "-".to_string(),
        other => other.to_string(),
    };
    truncate_string(&text, MAX_CELL_WIDTH)
}

fn table(rows: &[Value]) -> String {
    let columns: Vec<&String> = rows
        .first()
        .and_then(Value::as_object)
        .map(|first| first.keys().take(MAX_COLUMNS).collect())
        .unwrap_or_default();

    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            columns
                .iter()
                .map(|col| row.get(col.as_str()).map(cell).unwrap_or_else(|| "-".to_string()))
                .collect()
        })
        .collect();

    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, col)| {
            cells
                .iter()
                .map(|r| r[i].chars().count())
                .chain(std::iter::once(col.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let line = |values: Vec<&str>| -> String {
        values
            .iter()
            .zip(&widths)
            .map(|(v, w)| format!("{:<width$}", v, width = *w))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut out = vec![line(columns.iter().map(|c| c.as_str()).collect())];
    out.extend(cells.iter().map(|r| line(r.iter().map(String::as_str).collect())));
    out.join("\n")
}
