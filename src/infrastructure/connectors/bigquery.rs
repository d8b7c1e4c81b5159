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

//! # BigQuery Connector
//!
//! Columnar load strategy: rows are serialized to newline-delimited JSON and
//! shipped in one truncating load job, then we block until BigQuery reports
//! the job as `DONE`. A job that ends with an `errorResult` is a rejection,
//! not a fault, so the caller can log the row-level errors.

use crate::domain::entities::{BigQueryParams, DestinationKind, Extract, SchemaField};
use crate::domain::errors::{ExtractorError, Result, ValidationError};
use crate::domain::hook_script::{HookEnvironment, ScriptHost, ScriptValue};
use crate::domain::identifiers::ensure_identifier;
use crate::domain::type_mapper::{bigquery_mode, native_type};
use crate::domain::values::DestinationRow;
use crate::infrastructure::bigquery::auth::credentials_json;
use crate::ports::bigquery_port::{BigQueryApi, BigQueryConnect, BigQueryField, LoadJobRequest};
use crate::ports::connector_port::{BackendConnector, ConnectorSession, LoadResult};
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;

/// BigQuery schema for `fields`, in the given order.
pub fn bigquery_schema(fields: &[&SchemaField]) -> Vec<BigQueryField> {
    fields
        .iter()
        .map(|f| BigQueryField {
            name: f.destination_column.clone(),
            field_type: native_type(DestinationKind::BigQuery, f.canonical_type).to_string(),
            mode: bigquery_mode(f).to_string(),
        })
        .collect()
}

/// One JSON object per line, each line terminated by `\n`.
pub fn to_ndjson(rows: &[DestinationRow]) -> Result<Vec<u8>> {
    let mut payload = Vec::new();
    for row in rows {
        serde_json::to_writer(&mut payload, &row.to_json())?;
        payload.push(b'\n');
    }
    Ok(payload)
}

fn dataset_of(extract: &Extract) -> Result<&str> {
    let dataset = extract
        .dataset
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .ok_or_else(|| ValidationError::MissingDataset {
            extract: extract.name.clone(),
        })?;
    ensure_identifier("dataset", dataset)?;
    Ok(dataset)
}

pub struct BigQueryConnector {
    params: BigQueryParams,
    client: Arc<dyn BigQueryConnect>,
}

impl BigQueryConnector {
    pub fn new(params: BigQueryParams, client: Arc<dyn BigQueryConnect>) -> Self {
        Self { params, client }
    }

    fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.params.poll_interval_ms.max(1))
    }
}

impl BackendConnector for BigQueryConnector {
    fn kind(&self) -> DestinationKind {
        DestinationKind::BigQuery
    }

    fn test_connection(&self) -> Result<()> {
        let api = self.client.connect(&self.params)?;
        let datasets = api.list_datasets().map_err(|e| {
            ExtractorError::ConnectionError(format!("BigQuery project {}: {}", self.params.project, e))
        })?;
        info!(
            "BigQuery connection OK ({} datasets in {})",
            datasets.len(),
            api.project_id()
        );
        Ok(())
    }

    fn connect(&self) -> Result<Box<dyn ConnectorSession>> {
        let api = self.client.connect(&self.params)?;
        Ok(Box::new(BigQuerySession {
            api,
            poll_interval: self.poll_interval(),
        }))
    }

    fn hook_environment(&self) -> Result<HookEnvironment> {
        let api = self.client.connect(&self.params)?;
        let credentials = credentials_json(&self.params)?.unwrap_or_default();
        Ok(HookEnvironment::new()
            .with_value("bq_project_id", self.params.project.as_str())
            .with_value("bq_credentials_json", credentials)
            .with_host(Box::new(QueryScriptHost { api })))
    }
}

pub struct BigQuerySession {
    api: Box<dyn BigQueryApi>,
    poll_interval: Duration,
}

impl ConnectorSession for BigQuerySession {
    fn prepare_destination(&mut self, extract: &Extract, fields: &[&SchemaField]) -> Result<()> {
        let dataset = dataset_of(extract)?;
        ensure_identifier("table", &extract.table)?;
        for field in fields {
            ensure_identifier("column", &field.destination_column)?;
        }
        let location = extract.dataset_location.to_string();
        let schema = bigquery_schema(fields);

        self.api
            .create_dataset(dataset, &location)
            .and_then(|_| self.api.create_table(dataset, &extract.table, &schema))
            .map_err(|e| {
                ExtractorError::DestinationError(format!("{}.{}: {}", dataset, extract.table, e))
            })
    }

    fn load_rows(
        &mut self,
        extract: &Extract,
        fields: &[&SchemaField],
        rows: Vec<DestinationRow>,
    ) -> Result<LoadResult> {
        let dataset = dataset_of(extract)?;
        let request = LoadJobRequest {
            dataset: dataset.to_string(),
            table: extract.table.clone(),
            location: extract.dataset_location.to_string(),
            schema: bigquery_schema(fields),
            payload: to_ndjson(&rows)?,
        };
        let job = self.api.start_load_job(&request)?;
        let status = self.api.wait_for_job(&job, self.poll_interval)?;

        if status.failed() {
            warn!("Load job {} for {} was rejected", job.job_id, extract.table);
            return Ok(LoadResult::Rejected {
                errors: status.all_errors(),
            });
        }
        Ok(LoadResult::Loaded {
            rows: status.output_rows.unwrap_or(rows.len() as u64),
        })
    }

    fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

/// `execute(sql)` for hooks on BigQuery: runs a query job.
struct QueryScriptHost {
    api: Box<dyn BigQueryApi>,
}

impl ScriptHost for QueryScriptHost {
    fn execute(&mut self, sql: &str) -> std::result::Result<ScriptValue, String> {
        self.api
            .run_query(sql)
            .map(|rows| ScriptValue::Int(i64::try_from(rows).unwrap_or(i64::MAX)))
            .map_err(|e| e.to_string())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::entities::CanonicalType;
    use crate::domain::hook_script::run_script;
    use crate::domain::values::CellValue;
    use crate::ports::bigquery_port::{JobReference, JobStatus};
    use std::sync::Mutex;

    #[derive(Default)]
    pub(crate) struct MockState {
        pub calls: Vec<String>,
        pub payloads: Vec<Vec<u8>>,
    }

    /// Fake BigQuery that rejects load jobs for `reject_table`.
    #[derive(Clone, Default)]
    pub(crate) struct MockBigQuery {
        pub state: Arc<Mutex<MockState>>,
        pub reject_table: Option<String>,
    }

    impl BigQueryApi for MockBigQuery {
        fn project_id(&self) -> &str {
            "acme"
        }

        fn list_datasets(&self) -> Result<Vec<String>> {
            Ok(vec!["sales".to_string()])
        }

        fn create_dataset(&self, dataset: &str, location: &str) -> Result<()> {
            let mut state = self.state.lock().unwrap();
            state.calls.push(format!("dataset {} {}", dataset, location));
            Ok(())
        }

        fn create_table(&self, dataset: &str, table: &str, schema: &[BigQueryField]) -> Result<()> {
            let cols: Vec<String> = schema
                .iter()
                .map(|f| format!("{}:{}:{}", f.name, f.field_type, f.mode))
                .collect();
            let mut state = self.state.lock().unwrap();
            state
                .calls
                .push(format!("table {}.{} [{}]", dataset, table, cols.join(", ")));
            Ok(())
        }

        fn start_load_job(&self, request: &LoadJobRequest) -> Result<JobReference> {
            let mut state = self.state.lock().unwrap();
            state.calls.push(format!("load {}", request.table));
            state.payloads.push(request.payload.clone());
            Ok(JobReference {
                job_id: format!("job_{}", request.table),
                location: request.location.clone(),
            })
        }

        fn wait_for_job(&self, job: &JobReference, _poll: Duration) -> Result<JobStatus> {
            let rejected = self
                .reject_table
                .as_deref()
                .is_some_and(|t| job.job_id == format!("job_{}", t));
            if rejected {
                return Ok(JobStatus {
                    error_result: Some("Error while reading data".to_string()),
                    errors: vec!["Could not parse 'x' as INT64 for field id".to_string()],
                    output_rows: None,
                });
            }
            let rows = self
                .state
                .lock()
                .unwrap()
                .payloads
                .last()
                .map(|p| p.iter().filter(|b| **b == b'\n').count() as u64);
            Ok(JobStatus {
                output_rows: rows,
                ..JobStatus::default()
            })
        }

        fn run_query(&self, sql: &str) -> Result<u64> {
            self.state.lock().unwrap().calls.push(format!("query {}", sql));
            Ok(3)
        }
    }

    impl BigQueryConnect for MockBigQuery {
        fn connect(&self, _params: &BigQueryParams) -> Result<Box<dyn BigQueryApi>> {
            Ok(Box::new(self.clone()))
        }
    }

    pub(crate) fn params() -> BigQueryParams {
        BigQueryParams {
            project: "acme".to_string(),
            credentials: Some("{\"type\": \"service_account\"}".to_string()),
            credentials_file: None,
            access_token: None,
            poll_interval_ms: 1,
        }
    }

    fn extract() -> Extract {
        let mut extract = Extract::new(
            "partners",
            "SELECT id, active FROM t",
            "partners",
            vec![
                SchemaField::new("id", "id", CanonicalType::Int, true),
                SchemaField::new("active", "active", CanonicalType::Bool, false),
            ],
        );
        extract.dataset = Some("sales".to_string());
        extract
    }

    fn rows() -> Vec<DestinationRow> {
        vec![DestinationRow {
            cells: vec![
                ("id".to_string(), CellValue::Int(1)),
                ("active".to_string(), CellValue::Bool(false)),
            ],
        }]
    }

    #[test]
    fn test_prepare_and_load() {
        let mock = MockBigQuery::default();
        let connector = BigQueryConnector::new(params(), Arc::new(mock.clone()));
        let extract = extract();
        let fields = extract.ordered_fields();

        let mut session = connector.connect().unwrap();
        session.prepare_destination(&extract, &fields).unwrap();
        let result = session.load_rows(&extract, &fields, rows()).unwrap();
        session.close().unwrap();

        assert_eq!(result, LoadResult::Loaded { rows: 1 });
        let state = mock.state.lock().unwrap();
        assert_eq!(
            state.calls,
            vec![
                "dataset sales EU".to_string(),
                "table sales.partners [id:INT64:REQUIRED, active:BOOL:NULLABLE]".to_string(),
                "load partners".to_string(),
            ]
        );
        let payload = String::from_utf8(state.payloads[0].clone()).unwrap();
        assert!(payload.ends_with('\n'));
        let line: serde_json::Value = serde_json::from_str(payload.trim_end()).unwrap();
        assert_eq!(line, serde_json::json!({"id": 1, "active": false}));
    }

    #[test]
    fn test_rejected_job_returns_errors() {
        let mock = MockBigQuery {
            reject_table: Some("partners".to_string()),
            ..MockBigQuery::default()
        };
        let connector = BigQueryConnector::new(params(), Arc::new(mock));
        let extract = extract();
        let fields = extract.ordered_fields();

        let mut session = connector.connect().unwrap();
        match session.load_rows(&extract, &fields, rows()).unwrap() {
            LoadResult::Rejected { errors } => {
                assert_eq!(errors.len(), 2);
                assert_eq!(errors[0], "Error while reading data");
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_missing_dataset_is_reported() {
        let connector = BigQueryConnector::new(params(), Arc::new(MockBigQuery::default()));
        let mut extract = extract();
        extract.dataset = None;
        let fields = extract.ordered_fields();

        let mut session = connector.connect().unwrap();
        let err = session.prepare_destination(&extract, &fields).unwrap_err();
        assert!(matches!(
            err,
            ExtractorError::Validation(ValidationError::MissingDataset { .. })
        ));
    }

    #[test]
    fn test_hook_runs_queries() {
        let mock = MockBigQuery::default();
        let connector = BigQueryConnector::new(params(), Arc::new(mock.clone()));
        let mut env = connector.hook_environment().unwrap();
        assert_eq!(env.values.get("bq_project_id"), Some(&ScriptValue::from("acme")));

        run_script("n = execute('DELETE FROM sales.partners WHERE id = 0')\nprint(n)", &mut env)
            .unwrap();
        assert_eq!(env.output, vec!["3".to_string()]);
        assert_eq!(
            mock.state.lock().unwrap().calls,
            vec!["query DELETE FROM sales.partners WHERE id = 0".to_string()]
        );
    }
}
