//! Mapping between entity values and typed SQLite values.
//!
//! Entities are converted through their serde JSON form: each declared column
//! is read from (or written to) the field of the same name.

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::types::{Value, ValueRef};
use serde_json::{Map, Number};
use uuid::Uuid;

use crate::entity::{Column, ColumnType, Entity};
use crate::error::{ScdError, ScdResult};

/// Current time at storage precision.
///
/// Stamps taken here survive a write/read cycle unchanged.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Fixed-width RFC 3339 with microseconds, e.g. `2025-07-26T20:26:00.000000Z`.
pub fn encode_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_timestamp(text: &str) -> ScdResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ScdError::parse(format!("invalid timestamp '{}': {}", text, e)))
}

/// Convert a JSON value to the storage value of `column`.
pub fn to_sql_value(column: &Column, value: &serde_json::Value) -> ScdResult<Value> {
    if value.is_null() {
        return Ok(Value::Null);
    }

    let mismatch = || ScdError::type_mismatch(column.name, column.column_type.as_ref(), value);

    match column.column_type {
        ColumnType::Text => value
            .as_str()
            .map(|s| Value::Text(s.to_string()))
            .ok_or_else(mismatch),
        ColumnType::Uuid => {
            let text = value.as_str().ok_or_else(mismatch)?;
            let uuid = Uuid::parse_str(text).map_err(|_| mismatch())?;
            Ok(Value::Text(uuid.hyphenated().to_string()))
        }
        ColumnType::Integer => value
            .as_i64()
            .or_else(|| value.as_u64().and_then(|v| i64::try_from(v).ok()))
            .map(Value::Integer)
            .ok_or_else(mismatch),
        ColumnType::Real => value.as_f64().map(Value::Real).ok_or_else(mismatch),
        ColumnType::Boolean => value
            .as_bool()
            .map(|b| Value::Integer(i64::from(b)))
            .ok_or_else(mismatch),
        ColumnType::Timestamp => {
            let text = value.as_str().ok_or_else(mismatch)?;
            let at = DateTime::parse_from_rfc3339(text)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|_| mismatch())?;
            Ok(Value::Text(encode_timestamp(&at)))
        }
    }
}

/// Storage value for a timestamp bound (filters, cutoffs).
pub fn timestamp_value(at: &DateTime<Utc>) -> Value {
    Value::Text(encode_timestamp(at))
}

/// Convert a stored value back to JSON for `column`.
pub fn from_sql_value(column: &Column, value: ValueRef<'_>) -> ScdResult<serde_json::Value> {
    let json = match value {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Integer(i) => match column.column_type {
            ColumnType::Boolean => serde_json::Value::Bool(i != 0),
            ColumnType::Real => Number::from_f64(i as f64)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            _ => serde_json::Value::Number(i.into()),
        },
        ValueRef::Real(f) => Number::from_f64(f)
            .map(serde_json::Value::Number)
            .ok_or_else(|| ScdError::parse(format!("non-finite value in '{}'", column.name)))?,
        ValueRef::Text(bytes) => {
            let text = std::str::from_utf8(bytes)
                .map_err(|e| ScdError::parse(format!("column '{}': {}", column.name, e)))?;
            serde_json::Value::String(text.to_string())
        }
        ValueRef::Blob(_) => {
            return Err(ScdError::parse(format!(
                "unexpected blob in column '{}'",
                column.name
            )))
        }
    };
    Ok(json)
}

/// Storage values of `entity`, aligned with `T::all_columns()`.
pub fn entity_to_values<T: Entity>(entity: &T) -> ScdResult<Vec<Value>> {
    let json = serde_json::to_value(entity)?;
    let object = json.as_object().ok_or_else(|| {
        ScdError::validation(format!("{} must serialize to a JSON object", T::TABLE))
    })?;

    T::all_columns()
        .iter()
        .map(|column| {
            let value = object.get(column.name).unwrap_or(&serde_json::Value::Null);
            to_sql_value(column, value)
        })
        .collect()
}

/// Decode a row selected with `T::all_columns()` in order.
pub fn entity_from_row<T: Entity>(row: &rusqlite::Row<'_>) -> ScdResult<T> {
    let mut object = Map::new();
    for (idx, column) in T::all_columns().iter().enumerate() {
        let value = from_sql_value(column, row.get_ref(idx)?)?;
        object.insert(column.name.to_string(), value);
    }
    Ok(serde_json::from_value(serde_json::Value::Object(object))?)
}

/// Comma-separated, quoted column list for SELECT / INSERT.
pub fn column_list<T: Entity>() -> String {
    T::all_columns()
        .iter()
        .map(|c| quote_ident(c.name))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Quote an identifier for SQLite.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
