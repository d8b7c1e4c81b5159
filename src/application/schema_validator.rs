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

//! # Schema Validation
//!
//! Two families of checks run before anything is loaded:
//! 1. **Offline** checks on the definitions themselves (names, datasets,
//!    duplicate columns, hook scripts). No database access.
//! 2. **Source** checks that run the extract query and compare the columns
//!    it really produces with the declared fields.

use crate::domain::entities::{Backend, DestinationKind, Extract, SchemaField};
use crate::domain::errors::{ExtractorError, Result, ValidationError};
use crate::domain::hook_script::validate_script;
use crate::domain::identifiers::ensure_identifier;
use crate::domain::query_columns::{extract_columns, is_select_query};
use crate::ports::source_port::SourcePort;
use log::{debug, error, info};
use std::collections::HashSet;

/// Compares result columns with declared source columns as multisets,
/// ignoring case. Both directions are reported.
pub fn compare_columns(columns: &[String], fields: &[SchemaField]) -> std::result::Result<(), ValidationError> {
    let mut remaining: Vec<&SchemaField> = fields.iter().collect();
    let mut unmapped_columns = Vec::new();

    for column in columns {
        match remaining.iter().position(|f| f.matches_column(column)) {
            Some(pos) => {
                remaining.remove(pos);
            }
            None => unmapped_columns.push(column.clone()),
        }
    }

    let unused_fields: Vec<String> = remaining.iter().map(|f| f.source_column.clone()).collect();
    if unmapped_columns.is_empty() && unused_fields.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::SchemaMismatch {
            unmapped_columns,
            unused_fields,
        })
    }
}

/// Pairs each query column, in query order, with the field it feeds.
pub fn fields_in_column_order(extract: &Extract) -> std::result::Result<Vec<&SchemaField>, ValidationError> {
    let columns = extract_columns(&extract.query)?;
    compare_columns(&columns, &extract.fields)?;

    let mut used: HashSet<usize> = HashSet::new();
    let mut ordered = Vec::with_capacity(columns.len());
    for column in &columns {
        let found = extract
            .fields
            .iter()
            .enumerate()
            .find(|(i, f)| !used.contains(i) && f.matches_column(column));
        // compare_columns already guarantees a match for every column.
        if let Some((i, field)) = found {
            used.insert(i);
            ordered.push(field);
        }
    }
    Ok(ordered)
}

/// Definition checks for one extract of a `kind` backend.
pub fn validate_extract_definition(
    extract: &Extract,
    kind: DestinationKind,
) -> std::result::Result<(), ValidationError> {
    if !is_select_query(&extract.query) {
        return Err(ValidationError::QuerySyntaxError);
    }
    ensure_identifier("table", &extract.table)?;

    if kind == DestinationKind::BigQuery {
        let dataset = extract
            .dataset
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .ok_or_else(|| ValidationError::MissingDataset {
                extract: extract.name.clone(),
            })?;
        ensure_identifier("dataset", dataset)?;
    }

    let mut seen = HashSet::new();
    for field in &extract.fields {
        ensure_identifier("column", &field.destination_column)?;
        if !seen.insert(field.destination_column.to_ascii_lowercase()) {
            return Err(ValidationError::DuplicateColumn {
                extract: extract.name.clone(),
                column: field.destination_column.clone(),
            });
        }
    }
    Ok(())
}

/// Offline checks for a backend and all of its extracts.
pub fn validate_backend_definition(backend: &Backend) -> std::result::Result<(), ValidationError> {
    let kind = backend
        .kind()
        .ok_or_else(|| ValidationError::MissingDestinationKind {
            backend: backend.name.clone(),
        })?;

    if let Some(script) = backend.hook_script() {
        validate_script(script).map_err(ValidationError::HookScript)?;
    }

    for extract in &backend.extracts {
        validate_extract_definition(extract, kind)?;
    }
    Ok(())
}

/// Runs an extract's query against the source and checks the columns it
/// returns against the declared fields.
pub fn validate_against_source(source: &dyn SourcePort, extract: &Extract) -> Result<()> {
    if !is_select_query(&extract.query) {
        return Err(ValidationError::QuerySyntaxError.into());
    }
    let described = source.describe(&extract.query)?;
    let columns: Vec<String> = described.iter().map(|c| c.name.clone()).collect();
    debug!("{} returns columns {:?}", extract.name, columns);
    compare_columns(&columns, &extract.fields)?;
    // The loader pairs values by the columns written in the query text.
    fields_in_column_order(extract)?;
    info!("Extract {} matches its source query", extract.name);
    Ok(())
}

/// Checks every extract of `backends` against the source. Each mismatch is
/// logged; any mismatch blocks the command.
pub fn validate_backends_against_source(source: &dyn SourcePort, backends: &[Backend]) -> Result<()> {
    let mut problems = 0;
    for backend in backends {
        for extract in &backend.extracts {
            if let Err(e) = validate_against_source(source, extract) {
                error!("{}/{}: {}", backend.name, extract.name, e);
                problems += 1;
            }
        }
    }
    if problems > 0 {
        return Err(ExtractorError::ConfigError(format!(
            "{} extract(s) do not match their query",
            problems
        )));
    }
    Ok(())
}
