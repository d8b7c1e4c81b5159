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

//! # BigQuery Authentication
//!
//! We do not implement OAuth ourselves. An access token comes from, in order:
//! 1. the `access_token` of the destination definition;
//! 2. the `BQ_ACCESS_TOKEN` environment variable;
//! 3. the `gcloud` CLI. With a service-account key (inline JSON or a file)
//!    the key is exposed through `GOOGLE_APPLICATION_CREDENTIALS` and we ask
//!    for an application-default token; otherwise the active gcloud account
//!    prints its own token.

use crate::domain::entities::BigQueryParams;
use crate::domain::errors::{ExtractorError, Result};
use log::{debug, info};
use std::io::Write;
use std::path::Path;
use std::process::Command;
use tempfile::NamedTempFile;

pub const TOKEN_ENV_VAR: &str = "BQ_ACCESS_TOKEN";

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Token from configuration or environment, without touching gcloud.
pub fn preconfigured_token(params: &BigQueryParams, env_token: Option<&str>) -> Option<String> {
    non_blank(params.access_token.as_deref())
        .or_else(|| non_blank(env_token))
        .map(str::to_string)
}

/// Service-account key JSON, inline or read from `credentials_file`.
pub fn credentials_json(params: &BigQueryParams) -> Result<Option<String>> {
    if let Some(json) = non_blank(params.credentials.as_deref()) {
        return Ok(Some(json.to_string()));
    }
    match non_blank(params.credentials_file.as_deref()) {
        Some(path) => Ok(Some(std::fs::read_to_string(path)?)),
        None => Ok(None),
    }
}

/// Runs gcloud and returns its trimmed stdout.
fn gcloud_token(args: &[&str], credentials_path: Option<&Path>) -> Result<String> {
    let mut cmd = Command::new("gcloud");
    cmd.args(args);
    if let Some(path) = credentials_path {
        cmd.env("GOOGLE_APPLICATION_CREDENTIALS", path);
    }
    let output = cmd.output().map_err(|e| {
        ExtractorError::ConnectionError(format!("Failed to run gcloud: {}", e))
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ExtractorError::ConnectionError(format!(
            "Failed to get access token: {}",
            stderr.trim()
        )));
    }

    let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if token.is_empty() {
        return Err(ExtractorError::ConnectionError(
            "gcloud returned an empty access token".to_string(),
        ));
    }
    Ok(token)
}

/// Resolves an OAuth access token for the BigQuery API.
pub fn get_access_token(params: &BigQueryParams) -> Result<String> {
    let env_token = std::env::var(TOKEN_ENV_VAR).ok();
    if let Some(token) = preconfigured_token(params, env_token.as_deref()) {
        debug!("Using preconfigured BigQuery access token");
        return Ok(token);
    }

    if let Some(path) = non_blank(params.credentials_file.as_deref())
        .filter(|_| non_blank(params.credentials.as_deref()).is_none())
    {
        info!("Minting BigQuery token from key file {}", path);
        return gcloud_token(
            &["auth", "application-default", "print-access-token"],
            Some(Path::new(path)),
        );
    }

    if let Some(json) = non_blank(params.credentials.as_deref()) {
        info!("Minting BigQuery token from inline service-account key");
        // The key file only has to live while gcloud runs.
        let mut key_file = NamedTempFile::new()?;
        key_file.write_all(json.as_bytes())?;
        key_file.flush()?;
        return gcloud_token(
            &["auth", "application-default", "print-access-token"],
            Some(key_file.path()),
        );
    }

    info!("Using the active gcloud account for BigQuery");
    gcloud_token(&["auth", "print-access-token"], None)
}
