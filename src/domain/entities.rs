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

//! # Domain Entities
//!
//! Entities are the "Nouns" of our application: a `Backend` (one configured
//! warehouse), the `Extract`s it owns (one query feeding one table) and the
//! `SchemaField`s of each extract.
//!
//! Ownership is the whole story for lifetimes here. A `Backend` owns its
//! extracts and an `Extract` owns its fields, so dropping a parent drops the
//! subtree with it.
//!
//! We use `serde` so these structs load straight from the YAML/JSON definitions file.

use crate::domain::aggregate::aggregate_state;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Destination-agnostic column type chosen by the operator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CanonicalType {
    Int,
    Float,
    Numeric,
    Bool,
    String,
    Date,
    Time,
    Datetime,
}

impl CanonicalType {
    /// Every canonical type, in declaration order.
    pub fn all() -> &'static [CanonicalType] {
        &[
            CanonicalType::Int,
            CanonicalType::Float,
            CanonicalType::Numeric,
            CanonicalType::Bool,
            CanonicalType::String,
            CanonicalType::Date,
            CanonicalType::Time,
            CanonicalType::Datetime,
        ]
    }

    pub fn label(&self) -> &'static str {
        match self {
            CanonicalType::Int => "INT",
            CanonicalType::Float => "FLOAT",
            CanonicalType::Numeric => "NUMERIC",
            CanonicalType::Bool => "BOOL",
            CanonicalType::String => "STRING",
            CanonicalType::Date => "DATE",
            CanonicalType::Time => "TIME",
            CanonicalType::Datetime => "DATETIME",
        }
    }
}

impl fmt::Display for CanonicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Run state of an extract (and, derived, of a backend).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExtractState {
    #[default]
    New,
    Succeed,
    Failed,
}

impl fmt::Display for ExtractState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractState::New => write!(f, "new"),
            ExtractState::Succeed => write!(f, "succeed"),
            ExtractState::Failed => write!(f, "failed"),
        }
    }
}

/// The three warehouse families we know how to load.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DestinationKind {
    #[serde(rename = "bigquery")]
    BigQuery,
    #[serde(rename = "mysql")]
    MySql,
    #[serde(rename = "mssql")]
    MsSql,
}

impl DestinationKind {
    pub fn all() -> &'static [DestinationKind] {
        &[DestinationKind::BigQuery, DestinationKind::MySql, DestinationKind::MsSql]
    }

    pub fn label(&self) -> &'static str {
        match self {
            DestinationKind::BigQuery => "BigQuery",
            DestinationKind::MySql => "MySQL",
            DestinationKind::MsSql => "MsSQL",
        }
    }

    /// Relational dialects turn falsy values into NULL and booleans into integers.
    pub fn is_relational(&self) -> bool {
        !matches!(self, DestinationKind::BigQuery)
    }
}

impl fmt::Display for DestinationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

fn default_mysql_port() -> u16 {
    3306
}

fn default_mssql_port() -> u16 {
    1433
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BigQueryParams {
    /// Google Cloud project id (e.g. "acme-reporting").
    pub project: String,
    /// Service-account key as JSON text.
    #[serde(default)]
    pub credentials: Option<String>,
    /// Path to a service-account key file, used when `credentials` is empty.
    #[serde(default)]
    pub credentials_file: Option<String>,
    /// Pre-minted OAuth token; skips the gcloud lookup entirely.
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MySqlParams {
    pub host: String,
    #[serde(default = "default_mysql_port")]
    pub port: u16,
    pub user: String,
    #[serde(default)]
    pub password: String,
    pub database: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MsSqlParams {
    pub server: String,
    #[serde(default = "default_mssql_port")]
    pub port: u16,
    pub database: String,
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_true")]
    pub trust_cert: bool,
}

/// Where a backend loads its data, with the connection parameters of that kind.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Destination {
    #[serde(rename = "bigquery")]
    BigQuery(BigQueryParams),
    #[serde(rename = "mysql")]
    MySql(MySqlParams),
    #[serde(rename = "mssql")]
    MsSql(MsSqlParams),
}

impl Destination {
    pub fn kind(&self) -> DestinationKind {
        match self {
            Destination::BigQuery(_) => DestinationKind::BigQuery,
            Destination::MySql(_) => DestinationKind::MySql,
            Destination::MsSql(_) => DestinationKind::MsSql,
        }
    }

    /// Human readable address, without credentials.
    pub fn endpoint(&self) -> String {
        match self {
            Destination::BigQuery(p) => format!("bigquery://{}", p.project),
            Destination::MySql(p) => format!("mysql://{}:{}/{}", p.host, p.port, p.database),
            Destination::MsSql(p) => format!("mssql://{}:{}/{}", p.server, p.port, p.database),
        }
    }
}

/// BigQuery dataset location.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum DatasetLocation {
    #[default]
    EU,
    US,
}

impl fmt::Display for DatasetLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetLocation::EU => write!(f, "EU"),
            DatasetLocation::US => write!(f, "US"),
        }
    }
}

fn default_sequence() -> i32 {
    10
}

/// Maps one query result column to one destination column.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SchemaField {
    /// Name of the column produced by the query, or its "AS" alias.
    pub source_column: String,
    pub destination_column: String,
    pub canonical_type: CanonicalType,
    #[serde(default)]
    pub required: bool,
    #[serde(default = "default_sequence")]
    pub sequence: i32,
}

impl SchemaField {
    pub fn new(
        source_column: &str,
        destination_column: &str,
        canonical_type: CanonicalType,
        required: bool,
    ) -> Self {
        Self {
            source_column: source_column.to_string(),
            destination_column: destination_column.to_string(),
            canonical_type,
            required,
            sequence: default_sequence(),
        }
    }

    /// Case-insensitive match against a result column name.
    pub fn matches_column(&self, column: &str) -> bool {
        self.source_column.trim().eq_ignore_ascii_case(column.trim())
    }
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// One source-query-to-destination-table mapping.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Extract {
    #[serde(default = "new_id")]
    pub id: String,
    pub name: String,
    pub query: String,
    /// Destination table name.
    pub table: String,
    #[serde(default)]
    pub fields: Vec<SchemaField>,
    /// BigQuery dataset holding `table`.
    #[serde(default)]
    pub dataset: Option<String>,
    #[serde(default)]
    pub dataset_location: DatasetLocation,
    /// Log of the last run.
    #[serde(default)]
    pub log: Option<String>,
    #[serde(default)]
    pub state: ExtractState,
}

impl Extract {
    pub fn new(name: &str, query: &str, table: &str, fields: Vec<SchemaField>) -> Self {
        Self {
            id: new_id(),
            name: name.to_string(),
            query: query.to_string(),
            table: table.to_string(),
            fields,
            dataset: None,
            dataset_location: DatasetLocation::default(),
            log: None,
            state: ExtractState::New,
        }
    }

    /// Fields sorted by `sequence`, keeping declaration order for ties.
    pub fn ordered_fields(&self) -> Vec<&SchemaField> {
        let mut fields: Vec<&SchemaField> = self.fields.iter().collect();
        fields.sort_by_key(|f| f.sequence);
        fields
    }

    /// The field fed by the given result column, if any.
    pub fn field_for_column(&self, column: &str) -> Option<&SchemaField> {
        self.fields.iter().find(|f| f.matches_column(column))
    }

    /// Records the outcome of a run, replacing the previous one.
    pub fn record_outcome(&mut self, state: ExtractState, log: String) {
        self.state = state;
        self.log = Some(log);
    }
}

/// One configured destination and the extracts it owns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Backend {
    #[serde(default = "new_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub destination: Option<Destination>,
    /// Script run once after every extract of this backend has run.
    #[serde(default)]
    pub hook: Option<String>,
    #[serde(default)]
    pub extracts: Vec<Extract>,
}

impl Backend {
    pub fn new(name: &str, destination: Option<Destination>) -> Self {
        Self {
            id: new_id(),
            name: name.to_string(),
            destination,
            hook: None,
            extracts: Vec::new(),
        }
    }

    pub fn kind(&self) -> Option<DestinationKind> {
        self.destination.as_ref().map(Destination::kind)
    }

    /// Derived from the children every time; never stored.
    pub fn state(&self) -> ExtractState {
        aggregate_state(self.extracts.iter().map(|e| e.state))
    }

    /// Non-blank hook script, if any.
    pub fn hook_script(&self) -> Option<&str> {
        self.hook.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// Removes an extract together with its fields.
    pub fn remove_extract(&mut self, extract_id: &str) -> Option<Extract> {
        let pos = self.extracts.iter().position(|e| e.id == extract_id)?;
        Some(self.extracts.remove(pos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destination_deserializes_from_tag() {
        let yaml = r#"
kind: mysql
host: db.local
user: loader
database: dwh
"#;
        let dest: Destination = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(dest.kind(), DestinationKind::MySql);
        match dest {
            Destination::MySql(p) => {
                assert_eq!(p.port, 3306);
                assert_eq!(p.password, "");
            }
            other => panic!("unexpected destination {:?}", other),
        }
    }

    #[test]
    fn test_fields_ordered_by_sequence() {
        let mut a = SchemaField::new("a", "a", CanonicalType::Int, false);
        a.sequence = 20;
        let b = SchemaField::new("b", "b", CanonicalType::String, false);
        let extract = Extract::new("e", "SELECT a, b FROM t", "t", vec![a, b]);
        let names: Vec<&str> = extract
            .ordered_fields()
            .iter()
            .map(|f| f.destination_column.as_str())
            .collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn test_remove_extract_drops_subtree() {
        let mut backend = Backend::new("bq", None);
        let extract = Extract::new(
            "partners",
            "SELECT id FROM res_partner",
            "partners",
            vec![SchemaField::new("id", "id", CanonicalType::Int, true)],
        );
        let id = extract.id.clone();
        backend.extracts.push(extract);

        let removed = backend.remove_extract(&id).unwrap();
        assert_eq!(removed.fields.len(), 1);
        assert!(backend.extracts.is_empty());
        assert!(backend.remove_extract(&id).is_none());
    }

    #[test]
    fn test_field_matches_case_insensitively() {
        let field = SchemaField::new("partner_name", "name", CanonicalType::String, false);
        assert!(field.matches_column("PARTNER_NAME"));
        assert!(!field.matches_column("partner"));
    }
}
