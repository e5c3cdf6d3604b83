//! Result encoding.
//!
//! Turns a [`QueryResult`] into what a tool hands back: a JSON array of rows,
//! a rendered text table, or a CSV document (see [`csv`]). Encoding never
//! mutates the result. The only encoding failure is a cell the decoder could
//! not read ([`Cell::Unsupported`]).

pub mod csv;
pub mod table;

use crate::error::{DbError, DbResult};
use crate::models::{Cell, QueryResult};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

pub use table::{format_as_markdown, format_as_table};

/// Output format for query results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON array of rows (default)
    #[default]
    Json,
    /// ASCII table format (like MySQL CLI)
    Table,
    /// Markdown table format
    Markdown,
}

fn unsupported_error(result: &QueryResult, col: usize, type_name: &str) -> DbError {
    let column = result
        .columns
        .get(col)
        .map(String::as_str)
        .unwrap_or("?");
    DbError::encoding(format!(
        "column '{}' has type '{}' which cannot be represented",
        column, type_name
    ))
}

/// Fail on the first cell that cannot be encoded.
pub fn ensure_encodable(result: &QueryResult) -> DbResult<()> {
    for row in &result.rows {
        for (col, cell) in row.iter().enumerate() {
            if let Cell::Unsupported { type_name } = cell {
                return Err(unsupported_error(result, col, type_name));
            }
        }
    }
    Ok(())
}

/// Convert one cell to its JSON representation.
///
/// Bytes become base64 text. Non-finite floats become their text form since
/// JSON has no representation for them. Unsupported cells map to null, so
/// check the result with [`ensure_encodable`] first.
pub fn cell_to_json(cell: &Cell) -> JsonValue {
    match cell {
        Cell::Null | Cell::Unsupported { .. } => JsonValue::Null,
        Cell::Bool(b) => JsonValue::Bool(*b),
        Cell::Int(v) => JsonValue::Number((*v).into()),
        Cell::UInt(v) => JsonValue::Number((*v).into()),
        Cell::Float(v) => serde_json::Number::from_f64(*v)
            .map(JsonValue::Number)
            .unwrap_or_else(|| JsonValue::String(v.to_string())),
        Cell::Text(s) => JsonValue::String(s.clone()),
        Cell::Json(v) => v.clone(),
        Cell::Bytes(b) => JsonValue::String(STANDARD.encode(b)),
    }
}

/// Plain-text form of a cell, shared by the table renderers and CSV.
///
/// NULL (and unsupported cells) yield `None`; callers pick their own placeholder.
pub fn cell_to_text(cell: &Cell) -> Option<String> {
    match cell {
        Cell::Null | Cell::Unsupported { .. } => None,
        Cell::Bool(b) => Some(b.to_string()),
        Cell::Int(v) => Some(v.to_string()),
        Cell::UInt(v) => Some(v.to_string()),
        Cell::Float(v) => Some(
            serde_json::Number::from_f64(*v)
                .map(|n| n.to_string())
                .unwrap_or_else(|| v.to_string()),
        ),
        Cell::Text(s) => Some(s.clone()),
        Cell::Json(v) => Some(v.to_string()),
        Cell::Bytes(b) => Some(STANDARD.encode(b)),
    }
}

/// Encode every row as a JSON array of values in projection order.
///
/// `SELECT 1` becomes `[[1]]`.
pub fn rows_to_json(result: &QueryResult) -> DbResult<JsonValue> {
    ensure_encodable(result)?;
    Ok(JsonValue::Array(
        result
            .rows
            .iter()
            .map(|row| JsonValue::Array(row.iter().map(cell_to_json).collect()))
            .collect(),
    ))
}

/// Render a result in the requested format.
///
/// JSON yields the rows array; the text formats yield a JSON string.
pub fn render(result: &QueryResult, format: OutputFormat) -> DbResult<JsonValue> {
    match format {
        OutputFormat::Json => rows_to_json(result),
        OutputFormat::Table => {
            ensure_encodable(result)?;
            Ok(JsonValue::String(format_as_table(result)))
        }
        OutputFormat::Markdown => {
            ensure_encodable(result)?;
            Ok(JsonValue::String(format_as_markdown(result)))
        }
    }
}
