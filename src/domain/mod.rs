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

//! # Domain Layer
//!
//! Pure business rules: entities, type mapping, value conversion and the hook
//! script language. Nothing in here talks to a database or the network.

pub mod aggregate;
pub mod entities;
pub mod errors;
pub mod hook_script;
pub mod identifiers;
pub mod query_columns;
pub mod sql_builder;
pub mod type_mapper;
pub mod values;
