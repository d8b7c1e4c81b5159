// Copyright 2026 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # Row Values
//!
//! Two value worlds meet here:
//! - `SourceValue` is what the source database hands us, already typed
//!   (numbers, dates, raw bytes...).
//! - `CellValue` is what a destination receives: a handful of wire shapes that
//!   every driver (and JSON) can carry.
//!
//! `transform_value` is the bridge. It formats temporal values as text, turns
//! binary data into Base64 (the same encoding our CSV exports have always used)
//! and applies the dialect rule for booleans and "falsy" values.

use crate::domain::entities::{CanonicalType, DestinationKind, SchemaField};
use base64::{engine::general_purpose, Engine as _};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::{Map, Value};
use std::fmt;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M:%S";
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A value read from the source, typed by the source column.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// Exact decimal text, e.g. "12.50".
    Numeric(String),
    Text(String),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    Bytes(Vec<u8>),
}

/// A value ready to be bound or serialized for a destination.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    pub fn to_json(&self) -> Value {
        match self {
            CellValue::Null => Value::Null,
            CellValue::Bool(b) => Value::Bool(*b),
            CellValue::Int(i) => Value::from(*i),
            CellValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            CellValue::Text(s) => Value::String(s.clone()),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => write!(f, "NULL"),
            CellValue::Bool(b) => write!(f, "{}", b),
            CellValue::Int(i) => write!(f, "{}", i),
            CellValue::Float(v) => write!(f, "{}", v),
            CellValue::Text(s) => write!(f, "{}", s),
        }
    }
}

fn parse_bool_text(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "y" | "yes" | "1" => Some(true),
        "false" | "f" | "n" | "no" | "0" => Some(false),
        _ => None,
    }
}

/// Shapes the source value for the declared column type.
fn coerce(value: &SourceValue, ty: CanonicalType) -> CellValue {
    match value {
        SourceValue::Null => CellValue::Null,
        SourceValue::Bool(b) => match ty {
            CanonicalType::String => CellValue::Text(b.to_string()),
            _ => CellValue::Bool(*b),
        },
        SourceValue::Int(i) => match ty {
            CanonicalType::Bool => CellValue::Bool(*i != 0),
            CanonicalType::Float => CellValue::Float(*i as f64),
            CanonicalType::String | CanonicalType::Numeric => CellValue::Text(i.to_string()),
            _ => CellValue::Int(*i),
        },
        SourceValue::Float(v) => match ty {
            CanonicalType::Int if v.fract() == 0.0 && v.abs() < i64::MAX as f64 => {
                CellValue::Int(*v as i64)
            }
            CanonicalType::Bool => CellValue::Bool(*v != 0.0),
            CanonicalType::String => CellValue::Text(v.to_string()),
            _ => CellValue::Float(*v),
        },
        SourceValue::Numeric(text) => match ty {
            CanonicalType::Int => text
                .parse::<i64>()
                .map(CellValue::Int)
                .unwrap_or_else(|_| CellValue::Text(text.clone())),
            CanonicalType::Float => text
                .parse::<f64>()
                .map(CellValue::Float)
                .unwrap_or_else(|_| CellValue::Text(text.clone())),
            CanonicalType::Bool => text
                .parse::<f64>()
                .map(|v| CellValue::Bool(v != 0.0))
                .unwrap_or_else(|_| CellValue::Text(text.clone())),
            _ => CellValue::Text(text.clone()),
        },
        SourceValue::Text(text) => match ty {
            CanonicalType::Bool => parse_bool_text(text)
                .map(CellValue::Bool)
                .unwrap_or_else(|| CellValue::Text(text.clone())),
            _ => CellValue::Text(text.clone()),
        },
        SourceValue::Date(d) => match ty {
            CanonicalType::Datetime => {
                CellValue::Text(d.and_time(NaiveTime::default()).format(DATETIME_FORMAT).to_string())
            }
            _ => CellValue::Text(d.format(DATE_FORMAT).to_string()),
        },
        SourceValue::Time(t) => CellValue::Text(t.format(TIME_FORMAT).to_string()),
        SourceValue::DateTime(dt) => match ty {
            CanonicalType::Date => CellValue::Text(dt.date().format(DATE_FORMAT).to_string()),
            CanonicalType::Time => CellValue::Text(dt.time().format(TIME_FORMAT).to_string()),
            _ => CellValue::Text(dt.format(DATETIME_FORMAT).to_string()),
        },
        SourceValue::Bytes(bytes) => CellValue::Text(general_purpose::STANDARD.encode(bytes)),
    }
}

/// Converts one source value for a column of type `ty` in a `kind` destination.
///
/// Relational dialects store booleans as integers and treat boolean `false`
/// and NULL alike (both become NULL). BigQuery keeps native booleans.
pub fn transform_value(value: &SourceValue, ty: CanonicalType, kind: DestinationKind) -> CellValue {
    let cell = coerce(value, ty);
    if !kind.is_relational() {
        return cell;
    }
    match cell {
        CellValue::Bool(false) | CellValue::Null => CellValue::Null,
        CellValue::Bool(true) => CellValue::Int(1),
        other => other,
    }
}

/// One transformed row, keyed by destination column, in load order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DestinationRow {
    pub cells: Vec<(String, CellValue)>,
}

impl DestinationRow {
    /// Pairs the row tuple with `fields` (already in query column order).
    pub fn from_source(fields: &[&SchemaField], values: &[SourceValue], kind: DestinationKind) -> Self {
        let cells = fields
            .iter()
            .zip(values.iter())
            .map(|(field, value)| {
                (
                    field.destination_column.clone(),
                    transform_value(value, field.canonical_type, kind),
                )
            })
            .collect();
        Self { cells }
    }

    pub fn values(&self) -> Vec<CellValue> {
        self.cells.iter().map(|(_, v)| v.clone()).collect()
    }

    /// JSON object for newline-delimited JSON loads.
    pub fn to_json(&self) -> Value {
        let mut map = Map::with_capacity(self.cells.len());
        for (column, value) in &self.cells {
            map.insert(column.clone(), value.to_json());
        }
        Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_date_renders_iso() {
        let v = SourceValue::Date(date(2023, 5, 1));
        for kind in DestinationKind::all() {
            assert_eq!(
                transform_value(&v, CanonicalType::Date, *kind),
                CellValue::Text("2023-05-01".to_string())
            );
        }
    }

    #[test]
    fn test_datetime_narrowed_by_column_type() {
        let dt = date(2023, 5, 1).and_hms_opt(14, 30, 5).unwrap();
        let v = SourceValue::DateTime(dt);
        let kind = DestinationKind::BigQuery;
        assert_eq!(
            transform_value(&v, CanonicalType::Datetime, kind),
            CellValue::Text("2023-05-01 14:30:05".to_string())
        );
        assert_eq!(
            transform_value(&v, CanonicalType::Date, kind),
            CellValue::Text("2023-05-01".to_string())
        );
        assert_eq!(
            transform_value(&v, CanonicalType::Time, kind),
            CellValue::Text("14:30:05".to_string())
        );
    }

    #[test]
    fn test_false_is_null_only_for_relational() {
        let v = SourceValue::Bool(false);
        assert_eq!(
            transform_value(&v, CanonicalType::Bool, DestinationKind::MySql),
            CellValue::Null
        );
        assert_eq!(
            transform_value(&v, CanonicalType::Bool, DestinationKind::MsSql),
            CellValue::Null
        );
        assert_eq!(
            transform_value(&v, CanonicalType::Bool, DestinationKind::BigQuery),
            CellValue::Bool(false)
        );
    }

    #[test]
    fn test_true_becomes_one_for_relational() {
        let v = SourceValue::Bool(true);
        assert_eq!(
            transform_value(&v, CanonicalType::Bool, DestinationKind::MySql),
            CellValue::Int(1)
        );
        assert_eq!(
            transform_value(&v, CanonicalType::Bool, DestinationKind::BigQuery),
            CellValue::Bool(true)
        );
    }

    #[test]
    fn test_number_flag_in_bool_column() {
        let v = SourceValue::Int(0);
        assert_eq!(
            transform_value(&v, CanonicalType::Bool, DestinationKind::BigQuery),
            CellValue::Bool(false)
        );
        assert_eq!(
            transform_value(&v, CanonicalType::Bool, DestinationKind::MsSql),
            CellValue::Null
        );
    }

    #[test]
    fn test_float_in_int_column_never_saturates() {
        let kind = DestinationKind::BigQuery;
        assert_eq!(
            transform_value(&SourceValue::Float(42.0), CanonicalType::Int, kind),
            CellValue::Int(42)
        );
        assert_eq!(
            transform_value(&SourceValue::Float(1e20), CanonicalType::Int, kind),
            CellValue::Float(1e20)
        );
        assert_eq!(
            transform_value(&SourceValue::Float(-1e19), CanonicalType::Int, kind),
            CellValue::Float(-1e19)
        );
    }

    #[test]
    fn test_empty_string_is_kept() {
        let v = SourceValue::Text(String::new());
        assert_eq!(
            transform_value(&v, CanonicalType::String, DestinationKind::MySql),
            CellValue::Text(String::new())
        );
    }

    #[test]
    fn test_bytes_and_numeric() {
        let v = SourceValue::Bytes(b"hi".to_vec());
        assert_eq!(
            transform_value(&v, CanonicalType::String, DestinationKind::BigQuery),
            CellValue::Text("aGk=".to_string())
        );
        let n = SourceValue::Numeric("12.50".to_string());
        assert_eq!(
            transform_value(&n, CanonicalType::Numeric, DestinationKind::MySql),
            CellValue::Text("12.50".to_string())
        );
        assert_eq!(
            transform_value(&n, CanonicalType::Float, DestinationKind::MySql),
            CellValue::Float(12.5)
        );
    }

    #[test]
    fn test_row_to_json() {
        let id = SchemaField::new("id", "partner_id", CanonicalType::Int, true);
        let active = SchemaField::new("active", "is_active", CanonicalType::Bool, false);
        let row = DestinationRow::from_source(
            &[&id, &active],
            &[SourceValue::Int(7), SourceValue::Bool(false)],
            DestinationKind::BigQuery,
        );
        assert_eq!(
            row.to_json(),
            serde_json::json!({"partner_id": 7, "is_active": false})
        );
    }
}
