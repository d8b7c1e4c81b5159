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

//! # Type Mapper
//!
//! Each warehouse speaks its own type dialect. Operators declare columns with a
//! small set of canonical types and this module translates them into the
//! native column type of the destination.
//!
//! The mapping is an exhaustive `match`: adding a canonical type or a new
//! destination without filling in its row fails to compile.

use crate::domain::entities::{CanonicalType, DestinationKind, SchemaField};

/// Native column type for the given destination dialect.
pub fn native_type(kind: DestinationKind, ty: CanonicalType) -> &'static str {
    match kind {
        DestinationKind::BigQuery => bigquery_type(ty),
        DestinationKind::MySql => mysql_type(ty),
        DestinationKind::MsSql => mssql_type(ty),
    }
}

fn bigquery_type(ty: CanonicalType) -> &'static str {
    match ty {
        CanonicalType::Int => "INT64",
        CanonicalType::Float => "FLOAT",
        CanonicalType::Numeric => "NUMERIC",
        CanonicalType::Bool => "BOOL",
        CanonicalType::String => "STRING",
        CanonicalType::Date => "DATE",
        CanonicalType::Time => "TIME",
        CanonicalType::Datetime => "DATETIME",
    }
}

fn mysql_type(ty: CanonicalType) -> &'static str {
    match ty {
        CanonicalType::Int => "INT",
        CanonicalType::Float => "FLOAT",
        CanonicalType::Numeric => "DECIMAL(38, 9)",
        CanonicalType::Bool => "TINYINT",
        CanonicalType::String => "TEXT",
        CanonicalType::Date => "DATE",
        CanonicalType::Time => "TIME",
        CanonicalType::Datetime => "DATETIME",
    }
}

fn mssql_type(ty: CanonicalType) -> &'static str {
    match ty {
        CanonicalType::Int => "INT",
        CanonicalType::Float => "FLOAT",
        CanonicalType::Numeric => "NUMERIC(38, 9)",
        CanonicalType::Bool => "BIT",
        CanonicalType::String => "NVARCHAR(MAX)",
        CanonicalType::Date => "DATE",
        CanonicalType::Time => "TIME",
        CanonicalType::Datetime => "DATETIME2",
    }
}

/// BigQuery field mode for a schema field.
pub fn bigquery_mode(field: &SchemaField) -> &'static str {
    if field.required {
        "REQUIRED"
    } else {
        "NULLABLE"
    }
}

/// Column definition for relational DDL, e.g. `id INT NOT NULL`.
pub fn relational_column(kind: DestinationKind, field: &SchemaField) -> String {
    let mut def = format!(
        "{} {}",
        field.destination_column,
        native_type(kind, field.canonical_type)
    );
    if field.required {
        def.push_str(" NOT NULL");
    }
    def
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapping_is_total_and_stable() {
        for kind in DestinationKind::all() {
            for ty in CanonicalType::all() {
                let first = native_type(*kind, *ty);
                assert!(!first.is_empty());
                assert_eq!(first, native_type(*kind, *ty));
            }
        }
    }

    #[test]
    fn test_dialect_specific_tokens() {
        assert_eq!(native_type(DestinationKind::BigQuery, CanonicalType::Int), "INT64");
        assert_eq!(native_type(DestinationKind::MySql, CanonicalType::Bool), "TINYINT");
        assert_eq!(native_type(DestinationKind::MsSql, CanonicalType::Bool), "BIT");
        assert_eq!(
            native_type(DestinationKind::MsSql, CanonicalType::String),
            "NVARCHAR(MAX)"
        );
        assert_eq!(
            native_type(DestinationKind::MsSql, CanonicalType::Datetime),
            "DATETIME2"
        );
    }

    #[test]
    fn test_required_columns() {
        let id = SchemaField::new("id", "id", CanonicalType::Int, true);
        let name = SchemaField::new("name", "name", CanonicalType::String, false);
        assert_eq!(bigquery_mode(&id), "REQUIRED");
        assert_eq!(bigquery_mode(&name), "NULLABLE");
        assert_eq!(relational_column(DestinationKind::MySql, &id), "id INT NOT NULL");
        assert_eq!(relational_column(DestinationKind::MySql, &name), "name TEXT");
    }
}
