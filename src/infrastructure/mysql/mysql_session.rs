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

//! MySQL driver session over the synchronous `mysql` crate.

use crate::domain::entities::MySqlParams;
use crate::domain::errors::{ExtractorError, Result};
use crate::domain::values::CellValue;
use crate::ports::sql_session_port::{SessionOpener, SqlSession};
use log::debug;
use mysql::prelude::Queryable;
use mysql::{Conn, Opts, OptsBuilder, Params, Value};

pub struct MySqlSession {
    conn: Conn,
}

fn to_mysql_value(value: &CellValue) -> Value {
    match value {
        CellValue::Null => Value::NULL,
        CellValue::Bool(b) => Value::Int(i64::from(*b)),
        CellValue::Int(i) => Value::Int(*i),
        CellValue::Float(f) => Value::Double(*f),
        CellValue::Text(s) => Value::Bytes(s.as_bytes().to_vec()),
    }
}

impl SqlSession for MySqlSession {
    fn execute(&mut self, sql: &str) -> Result<()> {
        debug!("MySQL: {}", sql);
        self.conn.query_drop(sql)?;
        Ok(())
    }

    fn execute_with(&mut self, sql: &str, params: &[CellValue]) -> Result<()> {
        let values: Vec<Value> = params.iter().map(to_mysql_value).collect();
        self.conn.exec_drop(sql, Params::Positional(values))?;
        Ok(())
    }

    fn begin(&mut self) -> Result<()> {
        self.execute("START TRANSACTION")
    }

    fn commit(&mut self) -> Result<()> {
        self.execute("COMMIT")
    }

    fn close(self: Box<Self>) -> Result<()> {
        // Dropping the connection sends COM_QUIT.
        drop(self.conn);
        Ok(())
    }
}

/// Opens MySQL sessions for one destination.
#[derive(Debug, Clone)]
pub struct MySqlSessionOpener {
    params: MySqlParams,
}

impl MySqlSessionOpener {
    pub fn new(params: MySqlParams) -> Self {
        Self { params }
    }

    fn opts(&self) -> Opts {
        let builder = OptsBuilder::new()
            .ip_or_hostname(Some(self.params.host.clone()))
            .tcp_port(self.params.port)
            .user(Some(self.params.user.clone()))
            .pass(Some(self.params.password.clone()))
            .db_name(Some(self.params.database.clone()));
        Opts::from(builder)
    }
}

impl SessionOpener for MySqlSessionOpener {
    fn open(&self) -> Result<Box<dyn SqlSession>> {
        let conn = Conn::new(self.opts()).map_err(|e| {
            ExtractorError::ConnectionError(format!(
                "MySQL {}:{} unreachable: {}",
                self.params.host, self.params.port, e
            ))
        })?;
        Ok(Box::new(MySqlSession { conn }))
    }
}
