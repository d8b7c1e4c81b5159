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

//! # SQL Session Port
//!
//! The relational connectors (MySQL and SQL Server) share one load strategy
//! and differ only in the driver underneath. This Port is that driver seam:
//! plain statements, parameterized statements, and explicit transactions.

use crate::domain::errors::Result;
use crate::domain::values::CellValue;

pub trait SqlSession {
    fn execute(&mut self, sql: &str) -> Result<()>;

    /// Runs a parameterized statement, binding `params` positionally.
    fn execute_with(&mut self, sql: &str, params: &[CellValue]) -> Result<()>;

    fn begin(&mut self) -> Result<()>;

    fn commit(&mut self) -> Result<()>;

    /// Disconnects. Anything not committed is discarded by the server.
    fn close(self: Box<Self>) -> Result<()>;
}

/// Opens driver sessions for one destination.
pub trait SessionOpener: Send + Sync {
    fn open(&self) -> Result<Box<dyn SqlSession>>;
}
