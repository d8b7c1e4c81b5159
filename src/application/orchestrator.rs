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

//! The core application logic that drives backends through their extracts.
//!
//! Backends run in declaration order and so do their extracts. A failing
//! extract only fails itself; a failing hook aborts the run.

use crate::application::extract_job::ExtractJob;
use crate::application::hook_runner::run_hook;
use crate::domain::entities::{Backend, ExtractState};
use crate::domain::errors::{ExtractorError, Result, ValidationError};
use crate::ports::connector_port::{BackendConnector, ConnectorFactory};
use crate::ports::source_port::SourcePort;
use log::{error, info};
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone, Serialize)]
pub struct ExtractReport {
    pub name: String,
    pub table: String,
    pub state: ExtractState,
    pub rows: u64,
    pub duration_seconds: f64,
    pub log: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BackendReport {
    pub name: String,
    pub destination: String,
    /// Aggregate over the extracts, computed after they ran.
    pub state: ExtractState,
    pub extracts: Vec<ExtractReport>,
    pub hook_output: Vec<String>,
}

fn connector_for(
    factory: &dyn ConnectorFactory,
    backend: &Backend,
) -> Result<Box<dyn BackendConnector>> {
    let destination = backend.destination.as_ref().ok_or_else(|| {
        ValidationError::MissingDestinationKind {
            backend: backend.name.clone(),
        }
    })?;
    factory.build(destination)
}

/// Opens and releases a connection to the backend's destination.
pub fn test_connection(factory: &dyn ConnectorFactory, backend: &Backend) -> Result<()> {
    info!("Testing connection of backend {}...", backend.name);
    connector_for(factory, backend)?.test_connection()
}

/// Runs backends against one Oracle source.
pub struct Orchestrator {
    source: Arc<dyn SourcePort>,
    factory: Arc<dyn ConnectorFactory>,
    output_dir: String,
}

impl Orchestrator {
    pub fn new(
        source: Arc<dyn SourcePort>,
        factory: Arc<dyn ConnectorFactory>,
        output_dir: String,
    ) -> Self {
        Self {
            source,
            factory,
            output_dir,
        }
    }

    /// Runs every extract of `backend`, then its hook.
    pub fn run_backend(&self, backend: &mut Backend) -> Result<BackendReport> {
        let connector = connector_for(self.factory.as_ref(), backend)?;
        info!(
            "Backend {}: {} extract(s) to {}",
            backend.name,
            backend.extracts.len(),
            connector.kind()
        );

        let job = ExtractJob::new(self.source.as_ref(), connector.as_ref());
        let mut extracts = Vec::with_capacity(backend.extracts.len());
        for extract in backend.extracts.iter_mut() {
            let outcome = job.run(extract);
            extracts.push(ExtractReport {
                name: extract.name.clone(),
                table: extract.table.clone(),
                state: outcome.state,
                rows: outcome.rows,
                duration_seconds: outcome.duration.as_secs_f64(),
                log: extract.log.clone(),
            });
        }

        let hook_output = run_hook(backend, connector.as_ref())?;

        Ok(BackendReport {
            name: backend.name.clone(),
            destination: backend
                .destination
                .as_ref()
                .map(|d| d.endpoint())
                .unwrap_or_default(),
            state: backend.state(),
            extracts,
            hook_output,
        })
    }

    /// Runs the given backends in order and writes the run report.
    pub fn run_all(&self, backends: &mut [Backend]) -> Result<Vec<BackendReport>> {
        let start_time = Instant::now();
        info!("Starting run of {} backend(s)...", backends.len());

        let mut reports = Vec::with_capacity(backends.len());
        for backend in backends.iter_mut() {
            let report = self.run_backend(backend).inspect_err(|e| {
                error!("Run aborted at backend {}: {}", backend.name, e);
            })?;
            reports.push(report);
        }

        self.generate_report(&reports, start_time.elapsed().as_secs_f64())?;
        Ok(reports)
    }

    fn generate_report(&self, reports: &[BackendReport], duration_secs: f64) -> Result<PathBuf> {
        let all: Vec<&ExtractReport> = reports.iter().flat_map(|b| b.extracts.iter()).collect();
        let succeed = all.iter().filter(|e| e.state == ExtractState::Succeed).count();
        let failed = all.iter().filter(|e| e.state == ExtractState::Failed).count();
        let total_rows: u64 = all.iter().map(|e| e.rows).sum();

        let report = json!({
            "summary": {
                "total_backends": reports.len(),
                "total_extracts": all.len(),
                "succeed": succeed,
                "failed": failed,
                "total_rows": total_rows,
                "total_duration_seconds": duration_secs,
            },
            "backends": reports
        });

        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        std::fs::create_dir_all(&self.output_dir)?;
        let report_path = PathBuf::from(&self.output_dir).join(format!("report_{}.json", timestamp));
        let file = std::fs::File::create(&report_path)?;
        serde_json::to_writer_pretty(file, &report).map_err(|e| ExtractorError::IoError(e.into()))?;

        info!(
            "Run finished: {}/{} extracts succeeded, report at {}",
            succeed,
            all.len(),
            report_path.display()
        );
        Ok(report_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::extract_job::tests::{id_name_extract, two_rows, FakeConnector};
    use crate::application::extract_job::SUCCESS_LOG;
    use crate::domain::entities::{Destination, DestinationKind, MySqlParams};
    use crate::infrastructure::connectors::relational::tests::RecordingOpener;
    use crate::infrastructure::connectors::relational::RelationalConnector;
    use std::sync::Mutex;

    struct FakeFactory(FakeConnector);

    impl ConnectorFactory for FakeFactory {
        fn build(&self, _destination: &Destination) -> Result<Box<dyn BackendConnector>> {
            Ok(Box::new(self.0.clone()))
        }
    }

    /// Real relational strategy over a recording SQL session.
    struct RecordingFactory(Arc<Mutex<Vec<String>>>);

    impl ConnectorFactory for RecordingFactory {
        fn build(&self, destination: &Destination) -> Result<Box<dyn BackendConnector>> {
            let opener = RecordingOpener {
                log: Arc::clone(&self.0),
                fail_on: None,
            };
            Ok(Box::new(RelationalConnector::new(
                destination.kind(),
                Box::new(opener),
                Vec::new(),
            )))
        }
    }

    fn mysql_backend(name: &str) -> Backend {
        Backend::new(
            name,
            Some(Destination::MySql(MySqlParams {
                host: "db.local".to_string(),
                port: 3306,
                user: "loader".to_string(),
                password: String::new(),
                database: "dwh".to_string(),
            })),
        )
    }

    fn report_files(dir: &std::path::Path) -> Vec<String> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .filter(|n| n.starts_with("report_") && n.ends_with(".json"))
            .collect()
    }

    #[test]
    fn test_end_to_end_relational_run() {
        let temp_dir = tempfile::tempdir().unwrap();
        let statements = Arc::new(Mutex::new(Vec::new()));
        let orchestrator = Orchestrator::new(
            Arc::new(two_rows()),
            Arc::new(RecordingFactory(Arc::clone(&statements))),
            temp_dir.path().to_str().unwrap().to_string(),
        );
        let mut backends = vec![mysql_backend("dwh")];
        backends[0].extracts.push(id_name_extract("partners"));

        let reports = orchestrator.run_all(&mut backends).unwrap();

        assert_eq!(reports[0].state, ExtractState::Succeed);
        assert_eq!(reports[0].extracts[0].rows, 2);
        let extract = &backends[0].extracts[0];
        assert_eq!(extract.state, ExtractState::Succeed);
        assert_eq!(extract.log.as_deref(), Some(SUCCESS_LOG));

        let statements = statements.lock().unwrap();
        assert!(statements.contains(&"CREATE TABLE partners (id INT NOT NULL, name TEXT)".to_string()));
        let inserts = statements.iter().filter(|s| s.starts_with("INSERT")).count();
        assert_eq!(inserts, 2);

        let files = report_files(temp_dir.path());
        assert_eq!(files.len(), 1);
        let text = std::fs::read_to_string(temp_dir.path().join(&files[0])).unwrap();
        let report: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(report["summary"]["succeed"], 1);
        assert_eq!(report["summary"]["total_rows"], 2);
        assert_eq!(report["backends"][0]["state"], "succeed");
        assert_eq!(report["backends"][0]["extracts"][0]["log"], SUCCESS_LOG);
    }

    #[test]
    fn test_rejected_extract_does_not_stop_sibling() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut connector = FakeConnector::new(DestinationKind::BigQuery);
        connector.reject_table = Some("first".to_string());
        let orchestrator = Orchestrator::new(
            Arc::new(two_rows()),
            Arc::new(FakeFactory(connector)),
            temp_dir.path().to_str().unwrap().to_string(),
        );
        let mut backend = mysql_backend("dwh");
        backend.extracts.push(id_name_extract("first"));
        backend.extracts.push(id_name_extract("second"));

        let report = orchestrator.run_backend(&mut backend).unwrap();

        assert_eq!(backend.extracts[0].state, ExtractState::Failed);
        assert!(backend.extracts[0]
            .log
            .as_deref()
            .unwrap()
            .contains("Could not parse 'abc' as INT64"));
        assert_eq!(backend.extracts[1].state, ExtractState::Succeed);
        assert_eq!(report.state, ExtractState::Failed);
        assert_eq!(backend.state(), ExtractState::Failed);
    }

    #[test]
    fn test_backend_without_destination() {
        let temp_dir = tempfile::tempdir().unwrap();
        let orchestrator = Orchestrator::new(
            Arc::new(two_rows()),
            Arc::new(FakeFactory(FakeConnector::new(DestinationKind::MySql))),
            temp_dir.path().to_str().unwrap().to_string(),
        );
        let mut backend = Backend::new("orphan", None);
        assert!(matches!(
            orchestrator.run_backend(&mut backend),
            Err(ExtractorError::Validation(ValidationError::MissingDestinationKind { .. }))
        ));
    }

    #[test]
    fn test_connection_needs_destination() {
        let factory = FakeFactory(FakeConnector::new(DestinationKind::MySql));
        assert!(test_connection(&factory, &mysql_backend("dwh")).is_ok());
        assert!(test_connection(&factory, &Backend::new("orphan", None)).is_err());
    }

    #[test]
    fn test_hook_runs_after_extracts_and_failure_aborts() {
        let temp_dir = tempfile::tempdir().unwrap();
        let connector = FakeConnector::new(DestinationKind::MySql);
        let orchestrator = Orchestrator::new(
            Arc::new(two_rows()),
            Arc::new(FakeFactory(connector)),
            temp_dir.path().to_str().unwrap().to_string(),
        );

        let mut first = mysql_backend("first");
        first.extracts.push(id_name_extract("partners"));
        first.hook = Some("print('done')\nundefined_name\n".to_string());
        let mut second = mysql_backend("second");
        second.extracts.push(id_name_extract("orders"));
        let mut backends = vec![first, second];

        let err = orchestrator.run_all(&mut backends).unwrap_err();
        assert!(matches!(err, ExtractorError::HookError(_)));
        // Extract states recorded before the hook ran are kept.
        assert_eq!(backends[0].extracts[0].state, ExtractState::Succeed);
        assert_eq!(backends[0].state(), ExtractState::Succeed);
        // The remainder of the run never started.
        assert_eq!(backends[1].extracts[0].state, ExtractState::New);
        assert!(report_files(temp_dir.path()).is_empty());
    }
}
