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

//! # BigQuery REST Client
//!
//! A thin blocking client for the BigQuery v2 REST API. It covers dataset and
//! table creation, multipart load jobs, job polling and synchronous queries.
//!
//! "Already exists" (HTTP 409) answers on creation are treated as success so
//! that preparing a destination twice is harmless.

use crate::domain::entities::BigQueryParams;
use crate::domain::errors::{ExtractorError, Result};
use crate::infrastructure::bigquery::auth::get_access_token;
use crate::ports::bigquery_port::{
    BigQueryApi, BigQueryConnect, BigQueryField, JobReference, JobStatus, LoadJobRequest,
};
use log::{debug, info};
use reqwest::blocking::{Client, Response};
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::time::Duration;

const API_BASE: &str = "https://bigquery.googleapis.com/bigquery/v2";
const UPLOAD_BASE: &str = "https://bigquery.googleapis.com/upload/bigquery/v2";
const MULTIPART_BOUNDARY: &str = "oracle_dwh_extractor_boundary";

pub struct BigQueryRestClient {
    http: Client,
    token: String,
    project: String,
}

/// Builds a `multipart/related` body: JSON job metadata, then the data.
pub fn build_multipart_body(boundary: &str, metadata: &Value, payload: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(payload.len() + 1024);
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.extend_from_slice(metadata.to_string().as_bytes());
    body.extend_from_slice(format!("\r\n--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(payload);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    body
}

/// Job configuration for a truncating NDJSON load with an explicit schema.
pub fn load_job_metadata(project: &str, request: &LoadJobRequest) -> Value {
    json!({
        "jobReference": {
            "projectId": project,
            "location": request.location,
        },
        "configuration": {
            "load": {
                "destinationTable": {
                    "projectId": project,
                    "datasetId": request.dataset,
                    "tableId": request.table,
                },
                "schema": { "fields": request.schema },
                "sourceFormat": "NEWLINE_DELIMITED_JSON",
                "writeDisposition": "WRITE_TRUNCATE",
                "createDisposition": "CREATE_IF_NEEDED",
                "autodetect": false,
            }
        }
    })
}

/// Reads `status` out of a jobs.get response.
pub fn parse_job_status(job: &Value) -> JobStatus {
    let status = &job["status"];
    let message = |e: &Value| {
        let reason = e["reason"].as_str().unwrap_or_default();
        let text = e["message"].as_str().unwrap_or("unknown error");
        if reason.is_empty() {
            text.to_string()
        } else {
            format!("{}: {}", reason, text)
        }
    };
    JobStatus {
        error_result: status
            .get("errorResult")
            .filter(|e| !e.is_null())
            .map(message),
        errors: status["errors"]
            .as_array()
            .map(|errs| errs.iter().map(message).collect())
            .unwrap_or_default(),
        output_rows: job["statistics"]["load"]["outputRows"]
            .as_str()
            .and_then(|n| n.parse().ok()),
    }
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

impl BigQueryRestClient {
    pub fn new(project: &str, token: String) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(600))
            .user_agent(concat!("oracle-dwh-extractor/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            token,
            project: project.to_string(),
        })
    }

    fn check(&self, response: Response, action: &str, allow_conflict: bool) -> Result<Option<Value>> {
        let status = response.status();
        if allow_conflict && status == StatusCode::CONFLICT {
            debug!("{}: already exists", action);
            return Ok(None);
        }
        let body = response.text()?;
        if !status.is_success() {
            return Err(ExtractorError::BigQueryError(format!(
                "{} failed ({}): {}",
                action,
                status,
                error_message(&body)
            )));
        }
        if body.trim().is_empty() {
            return Ok(Some(Value::Null));
        }
        Ok(Some(serde_json::from_str(&body)?))
    }

    fn get_job(&self, job: &JobReference) -> Result<Value> {
        let url = format!("{}/projects/{}/jobs/{}", API_BASE, self.project, job.job_id);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .query(&[("location", job.location.as_str())])
            .send()?;
        Ok(self.check(response, "jobs.get", false)?.unwrap_or(Value::Null))
    }
}

impl BigQueryApi for BigQueryRestClient {
    fn project_id(&self) -> &str {
        &self.project
    }

    fn list_datasets(&self) -> Result<Vec<String>> {
        let url = format!("{}/projects/{}/datasets", API_BASE, self.project);
        let response = self.http.get(&url).bearer_auth(&self.token).send()?;
        let body = self.check(response, "datasets.list", false)?.unwrap_or(Value::Null);
        Ok(body["datasets"]
            .as_array()
            .map(|sets| {
                sets.iter()
                    .filter_map(|d| d["datasetReference"]["datasetId"].as_str())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default())
    }

    fn create_dataset(&self, dataset: &str, location: &str) -> Result<()> {
        let url = format!("{}/projects/{}/datasets", API_BASE, self.project);
        let body = json!({
            "datasetReference": { "projectId": self.project, "datasetId": dataset },
            "location": location,
        });
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()?;
        if self.check(response, "datasets.insert", true)?.is_some() {
            info!("Created dataset {}.{} in {}", self.project, dataset, location);
        }
        Ok(())
    }

    fn create_table(&self, dataset: &str, table: &str, schema: &[BigQueryField]) -> Result<()> {
        let url = format!(
            "{}/projects/{}/datasets/{}/tables",
            API_BASE, self.project, dataset
        );
        let body = json!({
            "tableReference": {
                "projectId": self.project,
                "datasetId": dataset,
                "tableId": table,
            },
            "schema": { "fields": schema },
        });
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()?;
        if self.check(response, "tables.insert", true)?.is_some() {
            info!("Created table {}.{}.{}", self.project, dataset, table);
        }
        Ok(())
    }

    fn start_load_job(&self, request: &LoadJobRequest) -> Result<JobReference> {
        let url = format!(
            "{}/projects/{}/jobs?uploadType=multipart",
            UPLOAD_BASE, self.project
        );
        let metadata = load_job_metadata(&self.project, request);
        let body = build_multipart_body(MULTIPART_BOUNDARY, &metadata, &request.payload);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .header(
                CONTENT_TYPE,
                format!("multipart/related; boundary={}", MULTIPART_BOUNDARY),
            )
            .body(body)
            .send()?;
        let job = self.check(response, "jobs.insert", false)?.unwrap_or(Value::Null);
        let job_id = job["jobReference"]["jobId"].as_str().ok_or_else(|| {
            ExtractorError::BigQueryError("load job response has no job id".to_string())
        })?;
        let location = job["jobReference"]["location"]
            .as_str()
            .unwrap_or(&request.location);
        info!(
            "Submitted load job {} for {}.{}",
            job_id, request.dataset, request.table
        );
        Ok(JobReference {
            job_id: job_id.to_string(),
            location: location.to_string(),
        })
    }

    fn wait_for_job(&self, job: &JobReference, poll_interval: Duration) -> Result<JobStatus> {
        loop {
            let body = self.get_job(job)?;
            let state = body["status"]["state"].as_str().unwrap_or_default();
            if state == "DONE" {
                return Ok(parse_job_status(&body));
            }
            debug!("Job {} is {}, waiting", job.job_id, state);
            std::thread::sleep(poll_interval);
        }
    }

    fn run_query(&self, sql: &str) -> Result<u64> {
        let url = format!("{}/projects/{}/queries", API_BASE, self.project);
        let body = json!({ "query": sql, "useLegacySql": false });
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()?;
        let mut result = self.check(response, "jobs.query", false)?.unwrap_or(Value::Null);

        if result["jobComplete"].as_bool() == Some(false) {
            let job = JobReference {
                job_id: result["jobReference"]["jobId"]
                    .as_str()
                    .unwrap_or_default()
                    .to_string(),
                location: result["jobReference"]["location"]
                    .as_str()
                    .unwrap_or_default()
                    .to_string(),
            };
            let status = self.wait_for_job(&job, Duration::from_secs(1))?;
            if status.failed() {
                return Err(ExtractorError::BigQueryError(status.all_errors().join("\n")));
            }
            result = self.get_job(&job)?;
            let affected = result["statistics"]["query"]["numDmlAffectedRows"]
                .as_str()
                .and_then(|n| n.parse().ok())
                .unwrap_or(0);
            return Ok(affected);
        }

        let count = result["numDmlAffectedRows"]
            .as_str()
            .or_else(|| result["totalRows"].as_str())
            .and_then(|n| n.parse().ok())
            .unwrap_or(0);
        Ok(count)
    }
}

/// Authenticates and builds `BigQueryRestClient`s.
#[derive(Debug, Default, Clone, Copy)]
pub struct BigQueryRestConnector;

impl BigQueryConnect for BigQueryRestConnector {
    fn connect(&self, params: &BigQueryParams) -> Result<Box<dyn BigQueryApi>> {
        let token = get_access_token(params)?;
        Ok(Box::new(BigQueryRestClient::new(&params.project, token)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> LoadJobRequest {
        LoadJobRequest {
            dataset: "sales".to_string(),
            table: "partners".to_string(),
            location: "EU".to_string(),
            schema: vec![BigQueryField {
                name: "id".to_string(),
                field_type: "INT64".to_string(),
                mode: "REQUIRED".to_string(),
            }],
            payload: b"{\"id\":1}\n{\"id\":2}\n".to_vec(),
        }
    }

    #[test]
    fn test_multipart_body_layout() {
        let metadata = json!({"a": 1});
        let body = build_multipart_body("XYZ", &metadata, b"{\"id\":1}\n");
        let text = String::from_utf8(body).unwrap();
        assert!(text.starts_with("--XYZ\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{\"a\":1}\r\n"));
        assert!(text.contains("--XYZ\r\nContent-Type: application/octet-stream\r\n\r\n{\"id\":1}\n"));
        assert!(text.ends_with("\r\n--XYZ--\r\n"));
    }

    #[test]
    fn test_load_job_is_truncating_ndjson() {
        let metadata = load_job_metadata("acme", &request());
        let load = &metadata["configuration"]["load"];
        assert_eq!(load["writeDisposition"], "WRITE_TRUNCATE");
        assert_eq!(load["sourceFormat"], "NEWLINE_DELIMITED_JSON");
        assert_eq!(load["autodetect"], false);
        assert_eq!(load["destinationTable"]["tableId"], "partners");
        assert_eq!(load["schema"]["fields"][0]["type"], "INT64");
        assert_eq!(metadata["jobReference"]["location"], "EU");
    }

    #[test]
    fn test_parse_failed_job() {
        let job = json!({
            "status": {
                "state": "DONE",
                "errorResult": {"reason": "invalid", "message": "Error while reading data"},
                "errors": [
                    {"reason": "invalid", "message": "Error while reading data"},
                    {"message": "Could not parse 'abc' as INT64 for field id"}
                ]
            }
        });
        let status = parse_job_status(&job);
        assert!(status.failed());
        assert_eq!(
            status.all_errors(),
            vec![
                "invalid: Error while reading data".to_string(),
                "Could not parse 'abc' as INT64 for field id".to_string()
            ]
        );
    }

    #[test]
    fn test_parse_successful_job() {
        let job = json!({
            "status": {"state": "DONE"},
            "statistics": {"load": {"outputRows": "42"}}
        });
        let status = parse_job_status(&job);
        assert!(!status.failed());
        assert_eq!(status.output_rows, Some(42));
    }

    #[test]
    fn test_error_message_prefers_api_message() {
        assert_eq!(
            error_message("{\"error\": {\"code\": 403, \"message\": \"Access Denied\"}}"),
            "Access Denied"
        );
        assert_eq!(error_message("plain text"), "plain text");
    }
}
