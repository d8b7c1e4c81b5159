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

//! # Relational Connector
//!
//! Shared load strategy for MySQL and SQL Server. The destination table is
//! dropped and recreated from the field list, then every row is inserted with
//! a parameterized statement inside a single transaction. The dialect only
//! changes the generated SQL and the driver behind `SessionOpener`.

use crate::domain::entities::{DestinationKind, Extract, MsSqlParams, MySqlParams, SchemaField};
use crate::domain::errors::{ExtractorError, Result};
use crate::domain::hook_script::{HookEnvironment, ScriptHost, ScriptValue};
use crate::domain::sql_builder::{create_table_sql, drop_table_sql, insert_sql};
use crate::domain::values::DestinationRow;
use crate::infrastructure::mssql::mssql_session::MsSqlSessionOpener;
use crate::infrastructure::mysql::mysql_session::MySqlSessionOpener;
use crate::ports::connector_port::{BackendConnector, ConnectorSession, LoadResult};
use crate::ports::sql_session_port::{SessionOpener, SqlSession};
use log::{debug, info};

pub struct RelationalConnector {
    kind: DestinationKind,
    opener: Box<dyn SessionOpener>,
    /// Values seeded into the hook namespace.
    context: Vec<(String, ScriptValue)>,
}

impl RelationalConnector {
    pub fn new(
        kind: DestinationKind,
        opener: Box<dyn SessionOpener>,
        context: Vec<(String, ScriptValue)>,
    ) -> Self {
        Self {
            kind,
            opener,
            context,
        }
    }

    pub fn mysql(params: &MySqlParams) -> Self {
        let context = vec![
            ("mysql_host".to_string(), ScriptValue::from(params.host.as_str())),
            ("mysql_port".to_string(), ScriptValue::Int(i64::from(params.port))),
            ("mysql_user".to_string(), ScriptValue::from(params.user.as_str())),
            ("mysql_password".to_string(), ScriptValue::from(params.password.as_str())),
            ("mysql_database".to_string(), ScriptValue::from(params.database.as_str())),
        ];
        Self::new(
            DestinationKind::MySql,
            Box::new(MySqlSessionOpener::new(params.clone())),
            context,
        )
    }

    pub fn mssql(params: &MsSqlParams) -> Self {
        let context = vec![
            ("mssql_server".to_string(), ScriptValue::from(params.server.as_str())),
            ("mssql_port".to_string(), ScriptValue::Int(i64::from(params.port))),
            ("mssql_database".to_string(), ScriptValue::from(params.database.as_str())),
            ("mssql_user".to_string(), ScriptValue::from(params.user.as_str())),
            ("mssql_password".to_string(), ScriptValue::from(params.password.as_str())),
        ];
        Self::new(
            DestinationKind::MsSql,
            Box::new(MsSqlSessionOpener::new(params.clone())),
            context,
        )
    }
}

impl BackendConnector for RelationalConnector {
    fn kind(&self) -> DestinationKind {
        self.kind
    }

    fn test_connection(&self) -> Result<()> {
        let session = self.opener.open()?;
        session.close()?;
        info!("{} connection OK", self.kind);
        Ok(())
    }

    fn connect(&self) -> Result<Box<dyn ConnectorSession>> {
        let session = self.opener.open()?;
        Ok(Box::new(RelationalSession {
            kind: self.kind,
            session,
        }))
    }

    fn hook_environment(&self) -> Result<HookEnvironment> {
        let session = self.opener.open()?;
        let env = self
            .context
            .iter()
            .fold(HookEnvironment::new(), |env, (name, value)| {
                env.with_value(name, value.clone())
            });
        Ok(env.with_host(Box::new(SqlScriptHost { session })))
    }
}

pub struct RelationalSession {
    kind: DestinationKind,
    session: Box<dyn SqlSession>,
}

impl ConnectorSession for RelationalSession {
    fn prepare_destination(&mut self, extract: &Extract, fields: &[&SchemaField]) -> Result<()> {
        let drop = drop_table_sql(self.kind, &extract.table)?;
        let create = create_table_sql(self.kind, &extract.table, fields)?;
        for sql in [drop, create] {
            self.session.execute(&sql).map_err(|e| {
                ExtractorError::DestinationError(format!("{} ({}): {}", extract.table, sql, e))
            })?;
        }
        Ok(())
    }

    fn load_rows(
        &mut self,
        extract: &Extract,
        fields: &[&SchemaField],
        rows: Vec<DestinationRow>,
    ) -> Result<LoadResult> {
        let insert = insert_sql(self.kind, &extract.table, fields)?;
        self.session.begin()?;
        let mut loaded = 0u64;
        for row in &rows {
            self.session.execute_with(&insert, &row.values())?;
            loaded += 1;
        }
        self.session.commit()?;
        debug!("Inserted {} rows into {}", loaded, extract.table);
        Ok(LoadResult::Loaded { rows: loaded })
    }

    fn close(self: Box<Self>) -> Result<()> {
        self.session.close()
    }
}

/// `execute(sql)` for hooks on relational destinations.
struct SqlScriptHost {
    session: Box<dyn SqlSession>,
}

impl ScriptHost for SqlScriptHost {
    fn execute(&mut self, sql: &str) -> std::result::Result<ScriptValue, String> {
        self.session
            .execute(sql)
            .map(|_| ScriptValue::None)
            .map_err(|e| e.to_string())
    }

    fn close(self: Box<Self>) -> std::result::Result<(), String> {
        self.session.close().map_err(|e| e.to_string())
    }
}
