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

//! # Oracle to Data-Warehouse Extractor
//!
//! Copies the result of operator-written SELECT queries from an Oracle
//! database into BigQuery, MySQL or SQL Server tables, one typed table per
//! extract, and runs an optional restricted hook script per backend.
//!
//! The crate follows the **Hexagonal Architecture** (Ports and Adapters):
//! `domain` holds the rules, `ports` the seams, `infrastructure` the
//! drivers and `application` the use cases wiring them together.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod ports;
