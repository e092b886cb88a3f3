//! Conversions between bound parameters, SQLite values and JSON rows.

use rusqlite::types::{Value, ValueRef};
use serde_json::{Map, Value as JsonValue};

use sift_query::value::FilterValue;

/// Convert a FilterValue to a SQLite Value.
///
/// Booleans become `0`/`1` and JSON is bound as its text encoding, which is
/// how SQLite stores both.
pub fn filter_value_to_sqlite(value: &FilterValue) -> Value {
    match value {
        FilterValue::Null => Value::Null,
        FilterValue::Bool(b) => Value::Integer(i64::from(*b)),
        FilterValue::Int(i) => Value::Integer(*i),
        FilterValue::Float(f) => Value::Real(*f),
        FilterValue::String(s) => Value::Text(s.clone()),
        FilterValue::Json(j) => Value::Text(j.to_string()),
    }
}

/// Convert a SQLite ValueRef to a JSON Value.
///
/// Text that looks like a JSON object or array is decoded, so JSON columns
/// come back structured.
pub fn from_sqlite_value(value: ValueRef<'_>) -> JsonValue {
    match value {
        ValueRef::Null => JsonValue::Null,
        ValueRef::Integer(i) => JsonValue::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        ValueRef::Text(bytes) => {
            let s = String::from_utf8_lossy(bytes);
            if s.starts_with('{') || s.starts_with('[') {
                if let Ok(json) = serde_json::from_str(&s) {
                    return json;
                }
            }
            JsonValue::String(s.into_owned())
        }
        ValueRef::Blob(bytes) => match std::str::from_utf8(bytes) {
            Ok(s) => JsonValue::String(s.to_string()),
            Err(_) => JsonValue::Array(bytes.iter().map(|b| JsonValue::from(*b)).collect()),
        },
    }
}

/// Decode a row into a JSON object keyed by `columns`.
pub fn row_to_json(row: &rusqlite::Row<'_>, columns: &[String]) -> rusqlite::Result<JsonValue> {
    let mut map = Map::with_capacity(columns.len());
    for (i, column) in columns.iter().enumerate() {
        map.insert(column.clone(), from_sqlite_value(row.get_ref(i)?));
    }
    Ok(JsonValue::Object(map))
}
