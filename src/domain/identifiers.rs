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

//! Allow-list for names we interpolate into DDL.
//!
//! Table, dataset and column names end up inside `CREATE TABLE` text, so they
//! are checked once when definitions load and again right before the DDL is built.

use crate::domain::errors::ValidationError;
use regex::Regex;
use std::sync::OnceLock;

fn identifier_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,127}$").ok())
        .as_ref()
}

pub fn is_valid_identifier(value: &str) -> bool {
    identifier_pattern().is_some_and(|re| re.is_match(value))
}

/// Returns `InvalidIdentifier` naming `what` ("table", "dataset", "column") on failure.
pub fn ensure_identifier(what: &'static str, value: &str) -> Result<(), ValidationError> {
    if is_valid_identifier(value) {
        Ok(())
    } else {
        Err(ValidationError::InvalidIdentifier {
            what,
            value: value.to_string(),
        })
    }
}
