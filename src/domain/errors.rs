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

//! Core error definitions for the extractor.
//!
//! This module provides a centralized `ExtractorError` enum and a `Result` type
//! used throughout the application. Definition-time problems (bad queries,
//! schema drift, forbidden hook scripts) are grouped in `ValidationError` so
//! callers can tell them apart from run-time faults.

use crate::domain::hook_script::ScriptDiagnostic;
use thiserror::Error;

/// Problems found while checking backend and extract definitions.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Queries must be SELECT query")]
    QuerySyntaxError,

    #[error("{}", describe_mismatch(unmapped_columns, unused_fields))]
    SchemaMismatch {
        /// Columns produced by the query that no field maps.
        unmapped_columns: Vec<String>,
        /// Declared fields whose source column the query does not produce.
        unused_fields: Vec<String>,
    },

    #[error("Type field are empty for backend \"{backend}\"")]
    MissingDestinationKind { backend: String },

    #[error("Extract \"{extract}\" needs a BigQuery dataset")]
    MissingDataset { extract: String },

    #[error("Invalid {what} identifier \"{value}\"")]
    InvalidIdentifier { what: &'static str, value: String },

    #[error("Destination column \"{column}\" is declared twice in extract \"{extract}\"")]
    DuplicateColumn { extract: String, column: String },

    #[error("{0}")]
    HookScript(ScriptDiagnostic),
}

fn describe_mismatch(unmapped: &[String], unused: &[String]) -> String {
    let mut parts = Vec::new();
    if !unmapped.is_empty() {
        let quoted: Vec<String> = unmapped.iter().map(|c| format!("\"{}\"", c)).collect();
        parts.push(format!(
            "The columns {} of the query are not defined in fields",
            quoted.join(", ")
        ));
    }
    if !unused.is_empty() {
        parts.push(format!(
            "The following fields are not in the query: {}",
            unused.join(", ")
        ));
    }
    parts.join("; ")
}

/// Error types encountered while validating, extracting and loading.
#[derive(Error, Debug)]
pub enum ExtractorError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Destination error: {0}")]
    DestinationError(String),

    #[error("Load failed for {table}: {reason}")]
    LoadError { table: String, reason: String },

    #[error("Oracle error: {0}")]
    OracleError(String),

    #[error("MySQL error: {0}")]
    MySqlError(String),

    #[error("MsSQL error: {0}")]
    MsSqlError(String),

    #[error("BigQuery error: {0}")]
    BigQueryError(String),

    #[error("Hook error: {0}")]
    HookError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<oracle::Error> for ExtractorError {
    fn from(e: oracle::Error) -> Self {
        ExtractorError::OracleError(e.to_string())
    }
}

impl From<mysql::Error> for ExtractorError {
    fn from(e: mysql::Error) -> Self {
        ExtractorError::MySqlError(e.to_string())
    }
}

impl From<tiberius::error::Error> for ExtractorError {
    fn from(e: tiberius::error::Error) -> Self {
        ExtractorError::MsSqlError(e.to_string())
    }
}

impl From<reqwest::Error> for ExtractorError {
    fn from(e: reqwest::Error) -> Self {
        ExtractorError::BigQueryError(e.to_string())
    }
}

impl From<serde_json::Error> for ExtractorError {
    fn from(e: serde_json::Error) -> Self {
        ExtractorError::BigQueryError(format!("invalid JSON payload: {}", e))
    }
}

/// A specialized Result type for the extractor.
pub type Result<T> = std::result::Result<T, ExtractorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mismatch_reports_both_directions() {
        let err = ValidationError::SchemaMismatch {
            unmapped_columns: vec!["email".to_string()],
            unused_fields: vec!["phone".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("\"email\" of the query are not defined in fields"));
        assert!(msg.contains("not in the query: phone"));
    }

    #[test]
    fn test_validation_error_wraps() {
        let err: ExtractorError = ValidationError::QuerySyntaxError.into();
        assert_eq!(err.to_string(), "Validation error: Queries must be SELECT query");
    }
}
