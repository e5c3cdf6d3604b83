//! Query result data models.
//!
//! A [`QueryResult`] is the fully materialized output of one statement: the
//! column names in projection order and every row, each row holding one
//! [`Cell`] per column.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A single decoded value, independent of the backend it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Cell {
    Null,
    Bool(bool),
    Int(i64),
    /// Unsigned values that do not fit an i64 (MySQL BIGINT UNSIGNED)
    UInt(u64),
    Float(f64),
    /// Text, and anything rendered as text (decimals, dates, UUIDs)
    Text(String),
    Json(JsonValue),
    #[serde(with = "base64_bytes")]
    Bytes(Vec<u8>),
    /// A non-null value the decoder could not read
    Unsupported { type_name: String },
}

impl Cell {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Get the type name of this cell for debugging.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::UInt(_) => "uint",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Json(_) => "json",
            Self::Bytes(_) => "bytes",
            Self::Unsupported { .. } => "unsupported",
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for Cell {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// Custom serialization for binary data as base64.
mod base64_bytes {
    use base64::{Engine as _, engine::general_purpose::STANDARD};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        STANDARD.encode(bytes).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(&s).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Column names in projection order. Present even when there are no rows.
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl QueryResult {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self { columns, rows }
    }

    /// Get the number of rows in the result.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_types() {
        assert!(Cell::Null.is_null());
        assert!(!Cell::Bool(true).is_null());
        assert_eq!(Cell::Int(42).type_name(), "int");
        assert_eq!(Cell::from("hello").type_name(), "text");
        assert_eq!(Cell::from(None::<String>), Cell::Null);
        assert_eq!(Cell::from(Some(7i64)), Cell::Int(7));
    }

    #[test]
    fn test_bytes_serialize_as_base64() {
        let json = serde_json::to_value(Cell::Bytes(vec![0xde, 0xad])).unwrap();
        assert_eq!(json["type"], "bytes");
        assert_eq!(json["value"], "3q0=");

        let back: Cell = serde_json::from_value(json).unwrap();
        assert_eq!(back, Cell::Bytes(vec![0xde, 0xad]));
    }

    #[test]
    fn test_query_result_empty() {
        let result = QueryResult::new(vec!["id".to_string()], Vec::new());
        assert!(result.is_empty());
        assert_eq!(result.row_count(), 0);
        assert_eq!(result.columns, vec!["id"]);
    }
}
