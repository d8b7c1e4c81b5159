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

//! # BigQuery Port
//!
//! The subset of the BigQuery REST API the warehouse connector needs. Keeping
//! it behind a trait means the connector's load strategy (dataset, table,
//! load job, poll) can be tested without Google Cloud.

use crate::domain::entities::BigQueryParams;
use crate::domain::errors::Result;
use serde::Serialize;
use std::time::Duration;

/// One column of a BigQuery table schema, serialized as the API expects.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BigQueryField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    pub mode: String,
}

/// Everything needed to submit a load job.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadJobRequest {
    pub dataset: String,
    pub table: String,
    pub location: String,
    pub schema: Vec<BigQueryField>,
    /// Newline-delimited JSON payload.
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JobReference {
    pub job_id: String,
    pub location: String,
}

/// Final state of a finished job.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JobStatus {
    /// Set when the job failed as a whole.
    pub error_result: Option<String>,
    /// Individual errors reported while running.
    pub errors: Vec<String>,
    pub output_rows: Option<u64>,
}

impl JobStatus {
    pub fn failed(&self) -> bool {
        self.error_result.is_some()
    }

    /// `error_result` first, then the detail errors, without duplicates.
    pub fn all_errors(&self) -> Vec<String> {
        let mut all = Vec::new();
        if let Some(e) = &self.error_result {
            all.push(e.clone());
        }
        for e in &self.errors {
            if !all.contains(e) {
                all.push(e.clone());
            }
        }
        all
    }
}

pub trait BigQueryApi: Send + Sync {
    fn project_id(&self) -> &str;

    fn list_datasets(&self) -> Result<Vec<String>>;

    /// Creates the dataset; an existing dataset is not an error.
    fn create_dataset(&self, dataset: &str, location: &str) -> Result<()>;

    /// Creates an empty table; an existing table is not an error.
    fn create_table(&self, dataset: &str, table: &str, schema: &[BigQueryField]) -> Result<()>;

    fn start_load_job(&self, request: &LoadJobRequest) -> Result<JobReference>;

    /// Blocks until the job is `DONE`, polling every `poll_interval`.
    fn wait_for_job(&self, job: &JobReference, poll_interval: Duration) -> Result<JobStatus>;

    /// Runs a statement synchronously and returns the affected or returned row count.
    fn run_query(&self, sql: &str) -> Result<u64>;
}

/// Builds authenticated API clients from connection parameters.
pub trait BigQueryConnect: Send + Sync {
    fn connect(&self, params: &BigQueryParams) -> Result<Box<dyn BigQueryApi>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_errors_dedupes() {
        let status = JobStatus {
            error_result: Some("Invalid value at row 2".to_string()),
            errors: vec![
                "Invalid value at row 2".to_string(),
                "Too many errors".to_string(),
            ],
            output_rows: None,
        };
        assert!(status.failed());
        assert_eq!(status.all_errors().len(), 2);
    }

    #[test]
    fn test_field_serializes_with_api_names() {
        let field = BigQueryField {
            name: "id".to_string(),
            field_type: "INT64".to_string(),
            mode: "REQUIRED".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&field).unwrap(),
            serde_json::json!({"name": "id", "type": "INT64", "mode": "REQUIRED"})
        );
    }
}
