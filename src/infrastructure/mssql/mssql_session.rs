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

//! # SQL Server Session
//!
//! `tiberius` is an async driver, while the rest of the extractor is plain
//! synchronous code. Each session therefore owns a private current-thread
//! `tokio` runtime and blocks on every call. Nothing async leaks out of this
//! file.

use crate::domain::entities::MsSqlParams;
use crate::domain::errors::{ExtractorError, Result};
use crate::domain::values::CellValue;
use crate::ports::sql_session_port::{SessionOpener, SqlSession};
use log::debug;
use std::borrow::Cow;
use tiberius::{AuthMethod, Client, ColumnData, Config, ToSql};
use tokio::net::TcpStream;
use tokio::runtime::Runtime;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

pub struct MsSqlSession {
    runtime: Runtime,
    client: Client<Compat<TcpStream>>,
}

/// Binds a `CellValue` as a tiberius parameter.
struct SqlParam<'a>(&'a CellValue);

impl ToSql for SqlParam<'_> {
    fn to_sql(&self) -> ColumnData<'_> {
        match self.0 {
            CellValue::Null => ColumnData::String(None),
            CellValue::Bool(b) => ColumnData::Bit(Some(*b)),
            CellValue::Int(i) => ColumnData::I64(Some(*i)),
            CellValue::Float(f) => ColumnData::F64(Some(*f)),
            CellValue::Text(s) => ColumnData::String(Some(Cow::Borrowed(s.as_str()))),
        }
    }
}

impl SqlSession for MsSqlSession {
    fn execute(&mut self, sql: &str) -> Result<()> {
        debug!("MsSQL: {}", sql);
        let client = &mut self.client;
        self.runtime.block_on(async {
            client.simple_query(sql).await?.into_results().await?;
            Ok::<_, ExtractorError>(())
        })
    }

    fn execute_with(&mut self, sql: &str, params: &[CellValue]) -> Result<()> {
        let bound: Vec<SqlParam> = params.iter().map(SqlParam).collect();
        let refs: Vec<&dyn ToSql> = bound.iter().map(|p| p as &dyn ToSql).collect();
        self.runtime.block_on(self.client.execute(sql, &refs))?;
        Ok(())
    }

    fn begin(&mut self) -> Result<()> {
        self.execute("BEGIN TRANSACTION;")
    }

    fn commit(&mut self) -> Result<()> {
        self.execute("COMMIT TRANSACTION;")
    }

    fn close(self: Box<Self>) -> Result<()> {
        let MsSqlSession { runtime, client } = *self;
        runtime.block_on(client.close())?;
        Ok(())
    }
}

/// Opens SQL Server sessions for one destination.
#[derive(Debug, Clone)]
pub struct MsSqlSessionOpener {
    params: MsSqlParams,
}

impl MsSqlSessionOpener {
    pub fn new(params: MsSqlParams) -> Self {
        Self { params }
    }

    fn config(&self) -> Config {
        let mut config = Config::new();
        config.host(&self.params.server);
        config.port(self.params.port);
        config.database(&self.params.database);
        config.authentication(AuthMethod::sql_server(
            &self.params.user,
            &self.params.password,
        ));
        if self.params.trust_cert {
            config.trust_cert();
        }
        config
    }
}

impl SessionOpener for MsSqlSessionOpener {
    fn open(&self) -> Result<Box<dyn SqlSession>> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let config = self.config();
        let client = runtime
            .block_on(async {
                let tcp = TcpStream::connect(config.get_addr()).await?;
                tcp.set_nodelay(true)?;
                let client = Client::connect(config, tcp.compat_write()).await?;
                Ok::<_, ExtractorError>(client)
            })
            .map_err(|e| {
                ExtractorError::ConnectionError(format!(
                    "SQL Server {}:{} unreachable: {}",
                    self.params.server, self.params.port, e
                ))
            })?;
        Ok(Box::new(MsSqlSession { runtime, client }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_bind_native_types() {
        let text = CellValue::Text("abc".to_string());
        assert!(matches!(
            SqlParam(&text).to_sql(),
            ColumnData::String(Some(ref s)) if s == "abc"
        ));
        assert!(matches!(
            SqlParam(&CellValue::Int(7)).to_sql(),
            ColumnData::I64(Some(7))
        ));
        assert!(matches!(
            SqlParam(&CellValue::Null).to_sql(),
            ColumnData::String(None)
        ));
    }

    #[test]
    fn test_config_targets_server() {
        let opener = MsSqlSessionOpener::new(MsSqlParams {
            server: "sql.local".to_string(),
            port: 1433,
            database: "dwh".to_string(),
            user: "sa".to_string(),
            password: "secret".to_string(),
            trust_cert: true,
        });
        assert_eq!(opener.config().get_addr(), "sql.local:1433");
    }
}
