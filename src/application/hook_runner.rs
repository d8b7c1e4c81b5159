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

//! Runs a backend's post-load hook script once, in a fresh namespace.

use crate::domain::entities::Backend;
use crate::domain::errors::{ExtractorError, Result};
use crate::domain::hook_script::run_script;
use crate::ports::connector_port::BackendConnector;
use log::info;

/// Executes the hook of `backend`, if it has one.
///
/// Returns the lines the script printed. Any fault, including a failure to
/// open the connection the script would use, is a `HookError`.
pub fn run_hook(backend: &Backend, connector: &dyn BackendConnector) -> Result<Vec<String>> {
    let Some(script) = backend.hook_script() else {
        return Ok(Vec::new());
    };

    info!("Running hook for backend {}", backend.name);
    let mut env = connector.hook_environment().map_err(|e| {
        ExtractorError::HookError(format!("backend \"{}\": {}", backend.name, e))
    })?;
    let outcome = run_script(script, &mut env);
    // The host connection is released whatever the script did.
    let closed = env.close_host();
    outcome.map_err(|diag| {
        ExtractorError::HookError(format!("backend \"{}\": {}", backend.name, diag))
    })?;
    closed.map_err(|e| {
        ExtractorError::HookError(format!(
            "backend \"{}\": closing connection: {}",
            backend.name, e
        ))
    })?;
    Ok(env.output)
}
