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

//! # Connector Port
//!
//! This Port is the contract every warehouse backend fulfils. The extract job
//! drives it in a fixed order:
//!
//! 1. `connect()` opens a short-lived session;
//! 2. `prepare_destination()` (re)creates the target table;
//! 3. `load_rows()` ships the transformed rows;
//! 4. `close()` always runs, success or not.
//!
//! How each step happens (DDL over a SQL connection, or REST calls and a load
//! job) is the adapter's business.

use crate::domain::entities::{Destination, DestinationKind, Extract, SchemaField};
use crate::domain::errors::Result;
use crate::domain::hook_script::HookEnvironment;
use crate::domain::values::DestinationRow;

/// Outcome of handing rows to a destination.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadResult {
    Loaded { rows: u64 },
    /// The destination refused the data; `errors` explains why.
    Rejected { errors: Vec<String> },
}

/// One exclusive connection to a destination, scoped to a single extract run.
pub trait ConnectorSession {
    /// Idempotently creates the destination object for `fields`, which are
    /// given in query column order.
    fn prepare_destination(&mut self, extract: &Extract, fields: &[&SchemaField]) -> Result<()>;

    fn load_rows(
        &mut self,
        extract: &Extract,
        fields: &[&SchemaField],
        rows: Vec<DestinationRow>,
    ) -> Result<LoadResult>;

    /// Releases the session. Consumes it so it cannot be used afterwards.
    fn close(self: Box<Self>) -> Result<()>;
}

/// A configured destination.
pub trait BackendConnector: Send + Sync {
    fn kind(&self) -> DestinationKind;

    /// Opens and immediately releases a connection.
    fn test_connection(&self) -> Result<()>;

    fn connect(&self) -> Result<Box<dyn ConnectorSession>>;

    /// Context values and a live handle for the backend's hook script.
    fn hook_environment(&self) -> Result<HookEnvironment>;
}

/// Builds a connector for a destination definition.
pub trait ConnectorFactory: Send + Sync {
    fn build(&self, destination: &Destination) -> Result<Box<dyn BackendConnector>>;
}
