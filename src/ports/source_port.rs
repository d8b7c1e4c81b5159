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

//! # Source Port
//!
//! In Hexagonal Architecture, a **Port** is like a "Slot" or a "Contract".
//!
//! This Port defines what it means to "read query results" from the source
//! database. The extract jobs and the schema validator only ever see this
//! trait, so tests can plug in an in-memory source instead of Oracle.

use crate::domain::errors::Result;
use crate::domain::values::SourceValue;

/// A result column as reported by the source driver.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDescriptor {
    pub name: String,
    /// Driver type name, informational only (e.g. "NUMBER(10)").
    pub type_name: String,
}

impl ColumnDescriptor {
    pub fn new(name: &str, type_name: &str) -> Self {
        Self {
            name: name.to_string(),
            type_name: type_name.to_string(),
        }
    }
}

/// A fully fetched query result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub columns: Vec<ColumnDescriptor>,
    pub rows: Vec<Vec<SourceValue>>,
}

/// `SourcePort` runs operator-authored SELECT text as-is.
///
/// `Send + Sync` lets the runtime share one adapter behind an `Arc`.
pub trait SourcePort: Send + Sync {
    /// Executes the query and fetches every row.
    fn execute(&self, query: &str) -> Result<ResultSet>;

    /// Returns the projected columns without fetching rows.
    fn describe(&self, query: &str) -> Result<Vec<ColumnDescriptor>>;
}
