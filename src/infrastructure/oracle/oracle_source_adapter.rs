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

//! Infrastructure adapter that runs extract queries on Oracle.

use crate::domain::errors::{ExtractorError, Result};
use crate::domain::values::SourceValue;
use crate::infrastructure::oracle::connection_manager::OracleConnectionManager;
use crate::ports::source_port::{ColumnDescriptor, ResultSet, SourcePort};
use chrono::{NaiveDate, NaiveDateTime};
use log::debug;
use oracle::sql_type::{OracleType, Timestamp};
use r2d2::{Pool, PooledConnection};
use std::sync::Arc;

/// Concrete implementation of `SourcePort` for Oracle databases.
///
/// Values are converted by their Oracle column type: integral NUMBERs become
/// integers, other NUMBERs keep their exact decimal text, DATE and TIMESTAMP
/// columns become date-times and RAW/BLOB columns stay binary.
pub struct OracleSourceAdapter {
    pool: Arc<Pool<OracleConnectionManager>>,
    prefetch_rows: u32,
}

impl OracleSourceAdapter {
    pub fn new(pool: Arc<Pool<OracleConnectionManager>>, prefetch_rows: u32) -> Self {
        Self {
            pool,
            prefetch_rows,
        }
    }

    fn get_conn(&self) -> Result<PooledConnection<OracleConnectionManager>> {
        self.pool.get().map_err(|e| {
            ExtractorError::ConnectionError(format!("Oracle pool exhausted or unreachable: {}", e))
        })
    }
}

impl SourcePort for OracleSourceAdapter {
    fn execute(&self, query: &str) -> Result<ResultSet> {
        let conn = self.get_conn()?;
        let mut stmt = conn
            .statement(query)
            .prefetch_rows(self.prefetch_rows)
            .build()?;
        let rows = stmt.query(&[])?;

        let col_types: Vec<OracleType> = rows
            .column_info()
            .iter()
            .map(|c| c.oracle_type().clone())
            .collect();
        let columns = rows.column_info().iter().map(describe_column).collect();

        let mut result = ResultSet {
            columns,
            rows: Vec::new(),
        };
        for row_res in rows {
            let row = row_res?;
            let mut values = Vec::with_capacity(col_types.len());
            for (i, otype) in col_types.iter().enumerate() {
                values.push(read_value(&row, i, otype)?);
            }
            result.rows.push(values);
        }
        debug!("Fetched {} rows from Oracle", result.rows.len());
        Ok(result)
    }

    fn describe(&self, query: &str) -> Result<Vec<ColumnDescriptor>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.statement(query).prefetch_rows(1).build()?;
        let rows = stmt.query(&[])?;
        Ok(rows.column_info().iter().map(describe_column).collect())
    }
}

fn describe_column(info: &oracle::ColumnInfo) -> ColumnDescriptor {
    ColumnDescriptor {
        name: info.name().to_string(),
        type_name: info.oracle_type().to_string(),
    }
}

fn read_value(row: &oracle::Row, i: usize, otype: &OracleType) -> Result<SourceValue> {
    let value = match otype {
        OracleType::Int64 => row.get::<_, Option<i64>>(i)?.map(SourceValue::Int),
        OracleType::Number(precision, 0) if *precision > 0 && *precision <= 18 => {
            row.get::<_, Option<i64>>(i)?.map(SourceValue::Int)
        }
        OracleType::Number(_, _) => row.get::<_, Option<String>>(i)?.map(SourceValue::Numeric),
        OracleType::Float(_) | OracleType::BinaryFloat | OracleType::BinaryDouble => {
            row.get::<_, Option<f64>>(i)?.map(SourceValue::Float)
        }
        OracleType::Boolean => row.get::<_, Option<bool>>(i)?.map(SourceValue::Bool),
        OracleType::Date
        | OracleType::Timestamp(_)
        | OracleType::TimestampTZ(_)
        | OracleType::TimestampLTZ(_) => row
            .get::<_, Option<Timestamp>>(i)?
            .map(|ts| timestamp_to_value(&ts)),
        OracleType::Raw(_) | OracleType::BLOB | OracleType::LongRaw => {
            row.get::<_, Option<Vec<u8>>>(i)?.map(SourceValue::Bytes)
        }
        _ => row.get::<_, Option<String>>(i)?.map(SourceValue::Text),
    };
    Ok(value.unwrap_or(SourceValue::Null))
}

/// Out-of-range timestamps (which chrono cannot hold) fall back to text.
fn timestamp_to_value(ts: &Timestamp) -> SourceValue {
    match to_naive(ts) {
        Some(dt) => SourceValue::DateTime(dt),
        None => SourceValue::Text(format_timestamp(ts)),
    }
}

fn to_naive(ts: &Timestamp) -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(ts.year(), ts.month(), ts.day())?.and_hms_nano_opt(
        ts.hour(),
        ts.minute(),
        ts.second(),
        ts.nanosecond(),
    )
}

fn format_timestamp(ts: &Timestamp) -> String {
    format!(
        "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
        ts.year(),
        ts.month(),
        ts.day(),
        ts.hour(),
        ts.minute(),
        ts.second()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_conversion() {
        let ts = Timestamp::new(2023, 10, 27, 10, 30, 0, 123456000).unwrap();
        match timestamp_to_value(&ts) {
            SourceValue::DateTime(dt) => {
                assert_eq!(
                    dt.format("%Y-%m-%d %H:%M:%S").to_string(),
                    "2023-10-27 10:30:00"
                );
            }
            other => panic!("unexpected value {:?}", other),
        }
        assert_eq!(format_timestamp(&ts), "2023-10-27 10:30:00");
    }
}
