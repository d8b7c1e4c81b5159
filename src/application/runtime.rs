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

//! # Runtime Context
//!
//! Owns the resources shared by a whole run. Extracts run one after another,
//! so a small Oracle connection pool is enough: one connection for the running
//! query and a spare for validation lookups.

use crate::config::AppConfig;
use crate::domain::errors::{ExtractorError, Result};
use crate::infrastructure::oracle::connection_manager::OracleConnectionManager;
use crate::infrastructure::oracle::oracle_source_adapter::OracleSourceAdapter;
use log::info;
use r2d2::Pool;
use std::sync::Arc;

pub const DEFAULT_POOL_SIZE: u32 = 2;
pub const DEFAULT_PREFETCH_ROWS: u32 = 5000;

/// Password from the config file, else `ORACLE_PASSWORD`, else empty.
pub fn resolve_password(configured: Option<&str>, env_value: Option<String>) -> String {
    configured
        .map(str::to_string)
        .or(env_value)
        .unwrap_or_default()
}

pub struct RuntimeContext {
    pub pool: Arc<Pool<OracleConnectionManager>>,
    pub prefetch_rows: u32,
}

impl RuntimeContext {
    /// Builds the Oracle pool. r2d2 opens the first connection eagerly, so an
    /// unreachable source fails here.
    pub fn init(config: &AppConfig) -> Result<Self> {
        let conn_str = config.source.get_connection_string();
        let password = resolve_password(
            config.source.password.as_deref(),
            std::env::var("ORACLE_PASSWORD").ok(),
        );
        let pool_size = config.source.pool_size.unwrap_or(DEFAULT_POOL_SIZE).max(1);

        info!(
            "Initializing Oracle connection pool for {} ({} connections)...",
            conn_str, pool_size
        );
        let manager = OracleConnectionManager::new(&config.source.username, &password, &conn_str);
        let pool = Pool::builder()
            .max_size(pool_size)
            .min_idle(Some(1))
            .build(manager)
            .map_err(|e| {
                ExtractorError::ConnectionError(format!("Failed to create Oracle pool: {}", e))
            })?;

        Ok(Self {
            pool: Arc::new(pool),
            prefetch_rows: config.source.prefetch_rows.unwrap_or(DEFAULT_PREFETCH_ROWS),
        })
    }

    pub fn source(&self) -> OracleSourceAdapter {
        OracleSourceAdapter::new(Arc::clone(&self.pool), self.prefetch_rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_precedence() {
        assert_eq!(resolve_password(Some("cfg"), Some("env".to_string())), "cfg");
        assert_eq!(resolve_password(None, Some("env".to_string())), "env");
        assert_eq!(resolve_password(None, None), "");
    }
}
