//! Database-agnostic type mappings.
//!
//! This module turns backend rows into [`Cell`] values.
//!
//! # Architecture
//!
//! Type conversion uses a two-phase approach:
//! 1. `TypeCategory` classifies column types into logical categories
//! 2. Database-specific decoders handle the actual value extraction
//!
//! A value that is non-null but cannot be decoded becomes
//! [`Cell::Unsupported`] carrying the backend type name; the encoder decides
//! what to do with it.

use crate::models::{Cell, DatabaseType};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::mysql::{MySqlRow, MySqlTypeInfo, MySqlValueRef};
use sqlx::postgres::{PgRow, PgTypeInfo, PgValueRef};
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Decode, Row, Type, TypeInfo, ValueRef};

// =============================================================================
// Type Classification
// =============================================================================

/// Logical category for database column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Integer,
    Float,
    Decimal,
    Boolean,
    Text,
    Binary,
    Json,
    Uuid,
    Temporal,
    Unknown,
}

/// Classify a database type name into a logical category.
pub fn categorize_type(type_name: &str, db: DatabaseType) -> TypeCategory {
    let lower = type_name.to_lowercase();

    // Decimal/Numeric - check first as it overlaps with "numeric" in float checks
    if lower.contains("decimal") || lower.contains("numeric") {
        // SQLite's NUMERIC is actually a float
        if db == DatabaseType::SQLite && lower == "numeric" {
            return TypeCategory::Float;
        }
        return TypeCategory::Decimal;
    }

    // INTERVAL and POINT contain "int" but are not integers
    if lower.contains("interval") || lower.contains("point") {
        return TypeCategory::Unknown;
    }

    if lower == "bool" || lower == "boolean" {
        return TypeCategory::Boolean;
    }

    // Before integers: TINYBLOB and TINYTEXT contain "tiny"
    if lower.contains("blob") || lower.contains("binary") || lower == "bytea" {
        return TypeCategory::Binary;
    }

    if lower.contains("char") || lower.contains("text") || lower == "name" {
        return TypeCategory::Text;
    }

    if lower.contains("int") || lower.contains("serial") || lower.contains("tiny") {
        return TypeCategory::Integer;
    }

    if lower.contains("float")
        || lower.contains("double")
        || lower == "real"
        || lower == "float4"
        || lower == "float8"
    {
        return TypeCategory::Float;
    }

    if lower == "json" || lower == "jsonb" {
        return TypeCategory::Json;
    }

    if lower == "uuid" {
        return TypeCategory::Uuid;
    }

    if lower.starts_with("timestamp")
        || lower == "datetime"
        || lower == "date"
        || lower.starts_with("time")
    {
        return TypeCategory::Temporal;
    }

    TypeCategory::Unknown
}

// =============================================================================
// Decimal Type Support
// =============================================================================

/// Wrapper type for raw DECIMAL/NUMERIC values as strings.
/// This preserves the exact database representation.
#[derive(Debug)]
pub struct RawDecimal(pub String);

impl Type<sqlx::MySql> for RawDecimal {
    fn type_info() -> MySqlTypeInfo {
        <String as Type<sqlx::MySql>>::type_info()
    }

    fn compatible(ty: &MySqlTypeInfo) -> bool {
        let name = ty.name().to_lowercase();
        name.contains("decimal") || name.contains("numeric")
    }
}

impl<'r> Decode<'r, sqlx::MySql> for RawDecimal {
    fn decode(value: MySqlValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as Decode<sqlx::MySql>>::decode(value)?;
        Ok(RawDecimal(s.to_string()))
    }
}

impl Type<sqlx::Postgres> for RawDecimal {
    fn type_info() -> PgTypeInfo {
        <String as Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        let name = ty.name().to_lowercase();
        name.contains("numeric") || name.contains("decimal")
    }
}

impl<'r> Decode<'r, sqlx::Postgres> for RawDecimal {
    fn decode(value: PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as Decode<sqlx::Postgres>>::decode(value)?;
        Ok(RawDecimal(s.to_string()))
    }
}

// =============================================================================
// Shared helpers
// =============================================================================

fn unsigned_cell(v: u64) -> Cell {
    i64::try_from(v).map_or(Cell::UInt(v), Cell::Int)
}

/// Parse text that a JSON-typed column stored as a string.
fn json_text_cell(s: String) -> Cell {
    match serde_json::from_str::<JsonValue>(&s) {
        Ok(json) => Cell::Json(json),
        Err(_) => Cell::Text(s),
    }
}

fn unsupported(type_name: &str) -> Cell {
    Cell::Unsupported {
        type_name: type_name.to_string(),
    }
}

// =============================================================================
// Row to Cells Trait
// =============================================================================

/// Trait for converting database rows to backend-neutral cells.
pub trait RowToCells {
    /// Column names in projection order.
    fn column_names(&self) -> Vec<String>;
    /// One cell per column, in projection order.
    fn to_cells(&self) -> Vec<Cell>;
}

impl RowToCells for MySqlRow {
    fn column_names(&self) -> Vec<String> {
        self.columns().iter().map(|c| c.name().to_string()).collect()
    }

    fn to_cells(&self) -> Vec<Cell> {
        self.columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| {
                let type_name = col.type_info().name();
                let category = categorize_type(type_name, DatabaseType::MySQL);
                mysql::decode_column(self, idx, type_name, category)
            })
            .collect()
    }
}

impl RowToCells for PgRow {
    fn column_names(&self) -> Vec<String> {
        self.columns().iter().map(|c| c.name().to_string()).collect()
    }

    fn to_cells(&self) -> Vec<Cell> {
        self.columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| {
                let type_name = col.type_info().name();
                let category = categorize_type(type_name, DatabaseType::PostgreSQL);
                postgres::decode_column(self, idx, type_name, category)
            })
            .collect()
    }
}

impl RowToCells for SqliteRow {
    fn column_names(&self) -> Vec<String> {
        self.columns().iter().map(|c| c.name().to_string()).collect()
    }

    fn to_cells(&self) -> Vec<Cell> {
        self.columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| {
                let declared = col.type_info().name();
                sqlite::decode_column(self, idx, declared)
            })
            .collect()
    }
}

// =============================================================================
// Database-Specific Decoders
// =============================================================================

mod mysql {
    use super::*;

    pub fn decode_column(
        row: &MySqlRow,
        idx: usize,
        type_name: &str,
        category: TypeCategory,
    ) -> Cell {
        match row.try_get_raw(idx) {
            Ok(raw) if raw.is_null() => return Cell::Null,
            Ok(_) => {}
            Err(_) => return unsupported(type_name),
        }

        let decoded = match category {
            TypeCategory::Decimal => decode_decimal(row, idx),
            TypeCategory::Integer => decode_integer(row, idx),
            TypeCategory::Boolean => decode_boolean(row, idx),
            TypeCategory::Float => decode_float(row, idx),
            TypeCategory::Binary => decode_binary(row, idx),
            TypeCategory::Json => decode_json(row, idx),
            TypeCategory::Temporal => decode_temporal(row, idx),
            _ => decode_text(row, idx),
        };

        decoded
            .or_else(|| decode_raw_text(row, idx))
            .unwrap_or_else(|| {
                tracing::debug!(column = idx, type_name, "Undecodable MySQL value");
                unsupported(type_name)
            })
    }

    fn decode_decimal(row: &MySqlRow, idx: usize) -> Option<Cell> {
        row.try_get::<RawDecimal, _>(idx)
            .ok()
            .map(|v| Cell::Text(v.0))
    }

    fn decode_integer(row: &MySqlRow, idx: usize) -> Option<Cell> {
        // Try signed types
        if let Ok(v) = row.try_get::<i8, _>(idx) {
            return Some(Cell::Int(v.into()));
        }
        if let Ok(v) = row.try_get::<i16, _>(idx) {
            return Some(Cell::Int(v.into()));
        }
        if let Ok(v) = row.try_get::<i32, _>(idx) {
            return Some(Cell::Int(v.into()));
        }
        if let Ok(v) = row.try_get::<i64, _>(idx) {
            return Some(Cell::Int(v));
        }
        // Try unsigned types
        if let Ok(v) = row.try_get::<u8, _>(idx) {
            return Some(Cell::Int(v.into()));
        }
        if let Ok(v) = row.try_get::<u16, _>(idx) {
            return Some(Cell::Int(v.into()));
        }
        if let Ok(v) = row.try_get::<u32, _>(idx) {
            return Some(Cell::Int(v.into()));
        }
        if let Ok(v) = row.try_get::<u64, _>(idx) {
            return Some(unsigned_cell(v));
        }
        None
    }

    fn decode_boolean(row: &MySqlRow, idx: usize) -> Option<Cell> {
        row.try_get::<bool, _>(idx).ok().map(Cell::Bool)
    }

    fn decode_float(row: &MySqlRow, idx: usize) -> Option<Cell> {
        if let Ok(v) = row.try_get::<f64, _>(idx) {
            return Some(Cell::Float(v));
        }
        row.try_get::<f32, _>(idx)
            .ok()
            .map(|v| Cell::Float(v.into()))
    }

    fn decode_binary(row: &MySqlRow, idx: usize) -> Option<Cell> {
        row.try_get::<Vec<u8>, _>(idx).ok().map(Cell::Bytes)
    }

    fn decode_json(row: &MySqlRow, idx: usize) -> Option<Cell> {
        row.try_get::<JsonValue, _>(idx).ok().map(Cell::Json)
    }

    fn decode_temporal(row: &MySqlRow, idx: usize) -> Option<Cell> {
        if let Ok(v) = row.try_get::<DateTime<Utc>, _>(idx) {
            return Some(Cell::Text(v.to_rfc3339()));
        }
        if let Ok(v) = row.try_get::<NaiveDateTime, _>(idx) {
            return Some(Cell::Text(v.to_string()));
        }
        if let Ok(v) = row.try_get::<NaiveDate, _>(idx) {
            return Some(Cell::Text(v.to_string()));
        }
        row.try_get::<NaiveTime, _>(idx)
            .ok()
            .map(|v| Cell::Text(v.to_string()))
    }

    fn decode_text(row: &MySqlRow, idx: usize) -> Option<Cell> {
        row.try_get::<String, _>(idx).ok().map(Cell::Text)
    }

    /// Statements run over the text protocol, so most values are readable as UTF-8.
    fn decode_raw_text(row: &MySqlRow, idx: usize) -> Option<Cell> {
        let raw = row.try_get_raw(idx).ok()?;
        <&str as Decode<sqlx::MySql>>::decode(raw)
            .ok()
            .map(|s| Cell::Text(s.to_string()))
    }
}

mod postgres {
    use super::*;
    use sqlx::postgres::PgValueFormat;

    pub fn decode_column(row: &PgRow, idx: usize, type_name: &str, category: TypeCategory) -> Cell {
        match row.try_get_raw(idx) {
            Ok(raw) if raw.is_null() => return Cell::Null,
            Ok(_) => {}
            Err(_) => return unsupported(type_name),
        }

        let decoded = match category {
            TypeCategory::Decimal => decode_decimal(row, idx),
            TypeCategory::Integer => decode_integer(row, idx),
            TypeCategory::Boolean => decode_boolean(row, idx),
            TypeCategory::Float => decode_float(row, idx),
            TypeCategory::Binary => decode_binary(row, idx),
            TypeCategory::Json => decode_json(row, idx),
            TypeCategory::Uuid => decode_uuid(row, idx),
            TypeCategory::Temporal => decode_temporal(row, idx),
            _ => decode_text(row, idx),
        };

        decoded
            .or_else(|| decode_raw_text(row, idx))
            .unwrap_or_else(|| {
                tracing::debug!(column = idx, type_name, "Undecodable PostgreSQL value");
                unsupported(type_name)
            })
    }

    fn decode_decimal(row: &PgRow, idx: usize) -> Option<Cell> {
        row.try_get::<RawDecimal, _>(idx)
            .ok()
            .map(|v| Cell::Text(v.0))
    }

    fn decode_integer(row: &PgRow, idx: usize) -> Option<Cell> {
        if let Ok(v) = row.try_get::<i16, _>(idx) {
            return Some(Cell::Int(v.into()));
        }
        if let Ok(v) = row.try_get::<i32, _>(idx) {
            return Some(Cell::Int(v.into()));
        }
        row.try_get::<i64, _>(idx).ok().map(Cell::Int)
    }

    fn decode_boolean(row: &PgRow, idx: usize) -> Option<Cell> {
        row.try_get::<bool, _>(idx).ok().map(Cell::Bool)
    }

    fn decode_float(row: &PgRow, idx: usize) -> Option<Cell> {
        if let Ok(v) = row.try_get::<f64, _>(idx) {
            return Some(Cell::Float(v));
        }
        row.try_get::<f32, _>(idx)
            .ok()
            .map(|v| Cell::Float(v.into()))
    }

    fn decode_binary(row: &PgRow, idx: usize) -> Option<Cell> {
        row.try_get::<Vec<u8>, _>(idx).ok().map(Cell::Bytes)
    }

    fn decode_json(row: &PgRow, idx: usize) -> Option<Cell> {
        row.try_get::<JsonValue, _>(idx).ok().map(Cell::Json)
    }

    fn decode_uuid(row: &PgRow, idx: usize) -> Option<Cell> {
        row.try_get::<uuid::Uuid, _>(idx)
            .ok()
            .map(|v| Cell::Text(v.to_string()))
    }

    fn decode_temporal(row: &PgRow, idx: usize) -> Option<Cell> {
        if let Ok(v) = row.try_get::<DateTime<Utc>, _>(idx) {
            return Some(Cell::Text(v.to_rfc3339()));
        }
        if let Ok(v) = row.try_get::<NaiveDateTime, _>(idx) {
            return Some(Cell::Text(v.to_string()));
        }
        if let Ok(v) = row.try_get::<NaiveDate, _>(idx) {
            return Some(Cell::Text(v.to_string()));
        }
        row.try_get::<NaiveTime, _>(idx)
            .ok()
            .map(|v| Cell::Text(v.to_string()))
    }

    fn decode_text(row: &PgRow, idx: usize) -> Option<Cell> {
        row.try_get::<String, _>(idx).ok().map(Cell::Text)
    }

    /// Values sent in text format (simple query protocol) are readable as-is,
    /// which covers enums, intervals and other types without a Rust mapping.
    fn decode_raw_text(row: &PgRow, idx: usize) -> Option<Cell> {
        let raw = row.try_get_raw(idx).ok()?;
        if !matches!(raw.format(), PgValueFormat::Text) {
            return None;
        }
        <&str as Decode<sqlx::Postgres>>::decode(raw)
            .ok()
            .map(|s| Cell::Text(s.to_string()))
    }
}

mod sqlite {
    use super::*;

    /// SQLite is dynamically typed: the storage class of the value decides how
    /// it is read, the declared column type only refines it (BOOLEAN, JSON).
    pub fn decode_column(row: &SqliteRow, idx: usize, declared: &str) -> Cell {
        let storage = match row.try_get_raw(idx) {
            Ok(raw) if raw.is_null() => return Cell::Null,
            Ok(raw) => raw.type_info().name().to_string(),
            Err(_) => return unsupported(declared),
        };

        let declared_category = categorize_type(declared, DatabaseType::SQLite);
        let decoded = match storage.as_str() {
            "INTEGER" | "INT8" | "BOOLEAN" => decode_integer(row, idx, declared_category),
            "REAL" => row.try_get::<f64, _>(idx).ok().map(Cell::Float),
            "BLOB" => row.try_get::<Vec<u8>, _>(idx).ok().map(Cell::Bytes),
            _ => decode_text(row, idx, declared_category),
        };

        decoded.unwrap_or_else(|| {
            tracing::debug!(column = idx, declared, storage = %storage, "Undecodable SQLite value");
            unsupported(if declared.is_empty() { storage.as_str() } else { declared })
        })
    }

    fn decode_integer(row: &SqliteRow, idx: usize, declared: TypeCategory) -> Option<Cell> {
        let v = row.try_get::<i64, _>(idx).ok()?;
        Some(match declared {
            TypeCategory::Boolean => Cell::Bool(v != 0),
            _ => Cell::Int(v),
        })
    }

    fn decode_text(row: &SqliteRow, idx: usize, declared: TypeCategory) -> Option<Cell> {
        let v = row.try_get::<String, _>(idx).ok()?;
        Some(match declared {
            TypeCategory::Json => json_text_cell(v),
            _ => Cell::Text(v),
        })
    }
}
