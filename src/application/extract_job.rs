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

//! # Extract Job
//!
//! Runs one extract end to end: acquire a destination session, prepare the
//! table, fetch and transform the source rows, load them and release the
//! session. Every fault is caught here and written to the extract's log, so a
//! failing extract never stops its siblings.

use crate::application::schema_validator::{compare_columns, fields_in_column_order};
use crate::domain::entities::{DestinationKind, Extract, ExtractState, SchemaField};
use crate::domain::errors::{ExtractorError, Result};
use crate::domain::type_mapper::native_type;
use crate::domain::values::DestinationRow;
use crate::ports::connector_port::{BackendConnector, ConnectorSession, LoadResult};
use crate::ports::source_port::SourcePort;
use log::{error, info};
use std::time::{Duration, Instant};

pub const SUCCESS_LOG: &str = "Import finished successfully !";
const FAILURE_HEADER: &str = "Import failed !!\n\nErrors:\n";

/// What a run produced, as reported per extract.
#[derive(Debug, Clone, PartialEq)]
pub struct JobOutcome {
    pub state: ExtractState,
    pub rows: u64,
    pub duration: Duration,
}

/// Log text for a fault raised anywhere in the job.
pub fn failure_log(error: &ExtractorError) -> String {
    format!("{}{}", FAILURE_HEADER, error)
}

/// Log text for a load the destination refused: one error per line, then
/// the schema that was sent.
pub fn rejection_log(errors: &[String], kind: DestinationKind, fields: &[&SchemaField]) -> String {
    let mut log = FAILURE_HEADER.to_string();
    for e in errors {
        log.push_str(e);
        log.push('\n');
    }
    let schema: Vec<String> = fields
        .iter()
        .map(|f| {
            format!(
                "{} {}{}",
                f.destination_column,
                native_type(kind, f.canonical_type),
                if f.required { " REQUIRED" } else { " NULLABLE" }
            )
        })
        .collect();
    log.push_str("\n\n");
    log.push_str(&schema.join("\n"));
    log
}

enum Completion {
    Loaded(u64),
    Rejected(String),
}

pub struct ExtractJob<'a> {
    source: &'a dyn SourcePort,
    connector: &'a dyn BackendConnector,
}

impl<'a> ExtractJob<'a> {
    pub fn new(source: &'a dyn SourcePort, connector: &'a dyn BackendConnector) -> Self {
        Self { source, connector }
    }

    /// Runs the extract and records the new state and log on it.
    pub fn run(&self, extract: &mut Extract) -> JobOutcome {
        let start = Instant::now();
        info!("Running extract {} into {}", extract.name, extract.table);

        let (state, rows, log) = match self.execute(extract) {
            Ok(Completion::Loaded(rows)) => {
                info!("Extract {}: {} rows loaded", extract.name, rows);
                (ExtractState::Succeed, rows, SUCCESS_LOG.to_string())
            }
            Ok(Completion::Rejected(log)) => {
                error!("Extract {} rejected by destination", extract.name);
                (ExtractState::Failed, 0, log)
            }
            Err(e) => {
                error!("Extract {} failed: {}", extract.name, e);
                (ExtractState::Failed, 0, failure_log(&e))
            }
        };
        extract.record_outcome(state, log);

        JobOutcome {
            state,
            rows,
            duration: start.elapsed(),
        }
    }

    fn execute(&self, extract: &Extract) -> Result<Completion> {
        let fields = fields_in_column_order(extract)?;
        let mut session = self.connector.connect()?;
        let outcome = self.load(session.as_mut(), extract, &fields);
        // Always released, even when loading failed.
        let closed = session.close();
        let outcome = outcome?;
        closed?;
        Ok(outcome)
    }

    fn load(
        &self,
        session: &mut dyn ConnectorSession,
        extract: &Extract,
        fields: &[&SchemaField],
    ) -> Result<Completion> {
        let kind = self.connector.kind();
        session.prepare_destination(extract, fields)?;

        let result = self.source.execute(&extract.query)?;
        let columns: Vec<String> = result.columns.iter().map(|c| c.name.clone()).collect();
        compare_columns(&columns, &extract.fields)?;
        // Values are zipped positionally, so the live order must match too.
        if let Some((column, field)) = columns
            .iter()
            .zip(fields)
            .find(|(column, field)| !field.matches_column(column))
        {
            return Err(ExtractorError::LoadError {
                table: extract.table.clone(),
                reason: format!(
                    "query returned column {} where field {} was expected",
                    column, field.source_column
                ),
            });
        }
        let rows: Vec<DestinationRow> = result
            .rows
            .iter()
            .map(|values| DestinationRow::from_source(fields, values, kind))
            .collect();

        match session.load_rows(extract, fields, rows)? {
            LoadResult::Loaded { rows } => Ok(Completion::Loaded(rows)),
            LoadResult::Rejected { errors } => {
                Ok(Completion::Rejected(rejection_log(&errors, kind, fields)))
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::entities::CanonicalType;
    use crate::domain::hook_script::HookEnvironment;
    use crate::domain::values::SourceValue;
    use crate::ports::source_port::{ColumnDescriptor, ResultSet};
    use std::sync::{Arc, Mutex};

    pub(crate) struct StaticSource {
        pub columns: Vec<&'static str>,
        pub rows: Vec<Vec<SourceValue>>,
    }

    impl SourcePort for StaticSource {
        fn execute(&self, _query: &str) -> Result<ResultSet> {
            Ok(ResultSet {
                columns: self.describe("")?,
                rows: self.rows.clone(),
            })
        }

        fn describe(&self, _query: &str) -> Result<Vec<ColumnDescriptor>> {
            Ok(self
                .columns
                .iter()
                .map(|c| ColumnDescriptor::new(c, "VARCHAR2"))
                .collect())
        }
    }

    #[derive(Default)]
    pub(crate) struct Recorded {
        pub events: Vec<String>,
        pub rows: Vec<DestinationRow>,
    }

    /// Destination that accepts everything, except loads into `reject_table`.
    #[derive(Clone)]
    pub(crate) struct FakeConnector {
        pub kind: DestinationKind,
        pub recorded: Arc<Mutex<Recorded>>,
        pub reject_table: Option<String>,
        pub fail_prepare: bool,
    }

    impl FakeConnector {
        pub fn new(kind: DestinationKind) -> Self {
            Self {
                kind,
                recorded: Arc::new(Mutex::new(Recorded::default())),
                reject_table: None,
                fail_prepare: false,
            }
        }
    }

    struct FakeSession(FakeConnector);

    impl ConnectorSession for FakeSession {
        fn prepare_destination(&mut self, extract: &Extract, fields: &[&SchemaField]) -> Result<()> {
            let cols: Vec<&str> = fields.iter().map(|f| f.destination_column.as_str()).collect();
            self.0
                .recorded
                .lock()
                .unwrap()
                .events
                .push(format!("prepare {} ({})", extract.table, cols.join(", ")));
            if self.0.fail_prepare {
                return Err(ExtractorError::DestinationError("disk full".to_string()));
            }
            Ok(())
        }

        fn load_rows(
            &mut self,
            extract: &Extract,
            _fields: &[&SchemaField],
            rows: Vec<DestinationRow>,
        ) -> Result<LoadResult> {
            let mut recorded = self.0.recorded.lock().unwrap();
            recorded.events.push(format!("load {}", extract.table));
            if self.0.reject_table.as_deref() == Some(extract.table.as_str()) {
                return Ok(LoadResult::Rejected {
                    errors: vec!["Could not parse 'abc' as INT64".to_string()],
                });
            }
            let count = rows.len() as u64;
            recorded.rows.extend(rows);
            Ok(LoadResult::Loaded { rows: count })
        }

        fn close(self: Box<Self>) -> Result<()> {
            self.0.recorded.lock().unwrap().events.push("close".to_string());
            Ok(())
        }
    }

    impl BackendConnector for FakeConnector {
        fn kind(&self) -> DestinationKind {
            self.kind
        }

        fn test_connection(&self) -> Result<()> {
            Ok(())
        }

        fn connect(&self) -> Result<Box<dyn ConnectorSession>> {
            Ok(Box::new(FakeSession(self.clone())))
        }

        fn hook_environment(&self) -> Result<HookEnvironment> {
            Ok(HookEnvironment::new().with_value("backend_kind", self.kind.label()))
        }
    }

    pub(crate) fn id_name_extract(table: &str) -> Extract {
        Extract::new(
            table,
            "SELECT id, name FROM t",
            table,
            vec![
                SchemaField::new("id", "id", CanonicalType::Int, true),
                SchemaField::new("name", "name", CanonicalType::String, false),
            ],
        )
    }

    pub(crate) fn two_rows() -> StaticSource {
        StaticSource {
            columns: vec!["ID", "NAME"],
            rows: vec![
                vec![SourceValue::Int(1), SourceValue::Text("Azure".to_string())],
                vec![SourceValue::Int(2), SourceValue::Null],
            ],
        }
    }

    #[test]
    fn test_successful_run() {
        let source = two_rows();
        let connector = FakeConnector::new(DestinationKind::MySql);
        let mut extract = id_name_extract("partners");

        let outcome = ExtractJob::new(&source, &connector).run(&mut extract);

        assert_eq!(outcome.state, ExtractState::Succeed);
        assert_eq!(outcome.rows, 2);
        assert_eq!(extract.state, ExtractState::Succeed);
        assert_eq!(extract.log.as_deref(), Some(SUCCESS_LOG));

        let recorded = connector.recorded.lock().unwrap();
        assert_eq!(
            recorded.events,
            vec!["prepare partners (id, name)", "load partners", "close"]
        );
        assert_eq!(recorded.rows.len(), 2);
    }

    #[test]
    fn test_rejection_logs_errors_and_schema() {
        let source = two_rows();
        let mut connector = FakeConnector::new(DestinationKind::BigQuery);
        connector.reject_table = Some("partners".to_string());
        let mut extract = id_name_extract("partners");

        let outcome = ExtractJob::new(&source, &connector).run(&mut extract);

        assert_eq!(outcome.state, ExtractState::Failed);
        let log = extract.log.unwrap();
        assert!(log.starts_with("Import failed !!\n\nErrors:\nCould not parse 'abc' as INT64\n"));
        assert!(log.ends_with("id INT64 REQUIRED\nname STRING NULLABLE"));
    }

    #[test]
    fn test_fault_is_caught_and_session_closed() {
        let source = two_rows();
        let mut connector = FakeConnector::new(DestinationKind::MsSql);
        connector.fail_prepare = true;
        let mut extract = id_name_extract("partners");

        let outcome = ExtractJob::new(&source, &connector).run(&mut extract);

        assert_eq!(outcome.state, ExtractState::Failed);
        assert_eq!(
            extract.log.as_deref(),
            Some("Import failed !!\n\nErrors:\nDestination error: disk full")
        );
        let recorded = connector.recorded.lock().unwrap();
        assert_eq!(recorded.events.last().map(String::as_str), Some("close"));
    }

    #[test]
    fn test_schema_mismatch_fails_before_connecting() {
        let source = two_rows();
        let connector = FakeConnector::new(DestinationKind::MySql);
        let mut extract = id_name_extract("partners");
        extract.fields.pop();

        let outcome = ExtractJob::new(&source, &connector).run(&mut extract);

        assert_eq!(outcome.state, ExtractState::Failed);
        assert!(extract.log.unwrap().contains("not defined in fields"));
        assert!(connector.recorded.lock().unwrap().events.is_empty());
    }

    #[test]
    fn test_live_columns_must_match_declared_fields() {
        let source = StaticSource {
            columns: vec!["EMAIL", "PHONE"],
            rows: vec![vec![
                SourceValue::Text("a@b.c".to_string()),
                SourceValue::Text("555".to_string()),
            ]],
        };
        let connector = FakeConnector::new(DestinationKind::MySql);
        let mut extract = id_name_extract("partners");

        let outcome = ExtractJob::new(&source, &connector).run(&mut extract);

        assert_eq!(outcome.state, ExtractState::Failed);
        let log = extract.log.unwrap();
        assert!(log.starts_with("Import failed !!"));
        assert!(
            log.contains("\"EMAIL\", \"PHONE\" of the query are not defined in fields"),
            "{}",
            log
        );
        let recorded = connector.recorded.lock().unwrap();
        assert!(!recorded.events.iter().any(|e| e.starts_with("load")));
        assert_eq!(recorded.events.last().map(String::as_str), Some("close"));
    }

    #[test]
    fn test_live_column_order_must_match_query_order() {
        let source = StaticSource {
            columns: vec!["NAME", "ID"],
            rows: vec![vec![SourceValue::Text("Azure".to_string()), SourceValue::Int(1)]],
        };
        let connector = FakeConnector::new(DestinationKind::MySql);
        let mut extract = id_name_extract("partners");

        let outcome = ExtractJob::new(&source, &connector).run(&mut extract);

        assert_eq!(outcome.state, ExtractState::Failed);
        assert!(extract
            .log
            .unwrap()
            .contains("query returned column NAME where field id was expected"));
    }

    #[test]
    fn test_rerun_overwrites_previous_outcome() {
        let source = two_rows();
        let mut connector = FakeConnector::new(DestinationKind::MySql);
        connector.fail_prepare = true;
        let mut extract = id_name_extract("partners");
        ExtractJob::new(&source, &connector).run(&mut extract);
        assert_eq!(extract.state, ExtractState::Failed);

        connector.fail_prepare = false;
        ExtractJob::new(&source, &connector).run(&mut extract);
        assert_eq!(extract.state, ExtractState::Succeed);
        assert_eq!(extract.log.as_deref(), Some(SUCCESS_LOG));
    }
}
