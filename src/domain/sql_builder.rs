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

//! DDL and DML text for the relational destinations.
//!
//! Every identifier is re-checked against the allow-list before it is
//! interpolated; values never are, they always travel as bound parameters.

use crate::domain::entities::{DestinationKind, SchemaField};
use crate::domain::errors::ValidationError;
use crate::domain::identifiers::ensure_identifier;
use crate::domain::type_mapper::relational_column;

fn terminate(kind: DestinationKind, sql: String) -> String {
    match kind {
        DestinationKind::MsSql => format!("{};", sql),
        _ => sql,
    }
}

pub fn drop_table_sql(kind: DestinationKind, table: &str) -> Result<String, ValidationError> {
    ensure_identifier("table", table)?;
    Ok(terminate(kind, format!("DROP TABLE IF EXISTS {}", table)))
}

/// `CREATE TABLE` with one column per field, in the given order.
pub fn create_table_sql(
    kind: DestinationKind,
    table: &str,
    fields: &[&SchemaField],
) -> Result<String, ValidationError> {
    ensure_identifier("table", table)?;
    let mut columns = Vec::with_capacity(fields.len());
    for field in fields {
        ensure_identifier("column", &field.destination_column)?;
        columns.push(relational_column(kind, field));
    }
    Ok(terminate(
        kind,
        format!("CREATE TABLE {} ({})", table, columns.join(", ")),
    ))
}

/// Parameterized INSERT binding every column positionally.
pub fn insert_sql(
    kind: DestinationKind,
    table: &str,
    fields: &[&SchemaField],
) -> Result<String, ValidationError> {
    ensure_identifier("table", table)?;
    let mut columns = Vec::with_capacity(fields.len());
    for field in fields {
        ensure_identifier("column", &field.destination_column)?;
        columns.push(field.destination_column.as_str());
    }
    let placeholders: Vec<String> = match kind {
        DestinationKind::MsSql => (1..=fields.len()).map(|i| format!("@P{}", i)).collect(),
        _ => vec!["?".to_string(); fields.len()],
    };
    Ok(terminate(
        kind,
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            columns.join(", "),
            placeholders.join(", ")
        ),
    ))
}
