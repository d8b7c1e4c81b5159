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

//! Destination connectors, one per load strategy.

pub mod bigquery;
pub mod relational;

use crate::domain::entities::Destination;
use crate::domain::errors::Result;
use crate::infrastructure::bigquery::rest_client::BigQueryRestConnector;
use crate::ports::bigquery_port::BigQueryConnect;
use crate::ports::connector_port::{BackendConnector, ConnectorFactory};
use self::bigquery::BigQueryConnector;
use self::relational::RelationalConnector;
use std::sync::Arc;

/// Builds the production connector for each destination kind.
pub struct DefaultConnectorFactory {
    bigquery: Arc<dyn BigQueryConnect>,
}

impl DefaultConnectorFactory {
    pub fn new() -> Self {
        Self {
            bigquery: Arc::new(BigQueryRestConnector),
        }
    }
}

impl Default for DefaultConnectorFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectorFactory for DefaultConnectorFactory {
    fn build(&self, destination: &Destination) -> Result<Box<dyn BackendConnector>> {
        Ok(match destination {
            Destination::BigQuery(p) => Box::new(BigQueryConnector::new(
                p.clone(),
                Arc::clone(&self.bigquery),
            )),
            Destination::MySql(p) => Box::new(RelationalConnector::mysql(p)),
            Destination::MsSql(p) => Box::new(RelationalConnector::mssql(p)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{DestinationKind, MsSqlParams};

    #[test]
    fn test_factory_picks_strategy_by_kind() {
        let factory = DefaultConnectorFactory::new();
        let destination = Destination::MsSql(MsSqlParams {
            server: "sql.local".to_string(),
            port: 1433,
            database: "dwh".to_string(),
            user: "sa".to_string(),
            password: String::new(),
            trust_cert: true,
        });
        let connector = factory.build(&destination).unwrap();
        assert_eq!(connector.kind(), DestinationKind::MsSql);
    }
}
