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

//! # Configuration
//!
//! The extractor is driven by one YAML or JSON file holding the Oracle source
//! settings and the backend/extract definitions. A handful of source settings
//! can be overridden from the command line for ad-hoc runs.

use crate::domain::entities::Backend;
use crate::domain::errors::{ExtractorError, Result};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;

fn default_port() -> u16 {
    1521
}

fn default_output_dir() -> String {
    ".".to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub source: SourceConfig,
    /// Where run reports are written.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    #[serde(default)]
    pub backends: Vec<Backend>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct SourceConfig {
    #[serde(default)]
    pub username: String,
    /// Falls back to the `ORACLE_PASSWORD` environment variable.
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub service: String,
    /// Full connect string; wins over host/port/service when set.
    #[serde(default)]
    pub connection_string: Option<String>,
    pub pool_size: Option<u32>,
    pub prefetch_rows: Option<u32>,
}

impl SourceConfig {
    pub fn get_connection_string(&self) -> String {
        match self.connection_string.as_deref().map(str::trim) {
            Some(cs) if !cs.is_empty() => cs.to_string(),
            _ => format!("//{}:{}/{}", self.host, self.port, self.service),
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to configuration file (YAML or JSON)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    // Overrides for ad-hoc runs
    #[arg(long, global = true)]
    pub username: Option<String>,
    #[arg(long, global = true)]
    pub password: Option<String>,
    #[arg(long, global = true)]
    pub host: Option<String>,
    #[arg(long, global = true)]
    pub port: Option<u16>,
    #[arg(long, global = true)]
    pub service: Option<String>,
    /// Directory for run reports
    #[arg(short, long, global = true)]
    pub output: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Check backend definitions, and extract queries against Oracle
    Validate {
        /// Skip the checks that need an Oracle connection
        #[arg(long)]
        offline: bool,
    },
    /// Open and close a connection to each destination
    TestConnection {
        #[arg(long)]
        backend: Option<String>,
    },
    /// Run every extract, then the hooks
    Run {
        #[arg(long)]
        backend: Option<String>,
    },
    /// Print a default field list for a query, as YAML
    SuggestFields {
        #[arg(long)]
        query: String,
    },
}

impl AppConfig {
    pub fn from_file(path: &str) -> Result<Self> {
        let mut file = File::open(path).map_err(|e| {
            ExtractorError::ConfigError(format!("cannot open {}: {}", path, e))
        })?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        let config: AppConfig = if path.ends_with(".json") {
            serde_json::from_str(&contents)
                .map_err(|e| ExtractorError::ConfigError(format!("{}: {}", path, e)))?
        } else {
            serde_yaml::from_str(&contents)
                .map_err(|e| ExtractorError::ConfigError(format!("{}: {}", path, e)))?
        };

        Ok(config)
    }

    /// Configuration with no backends, built from CLI values only.
    pub fn default_from_cli(args: &CliArgs) -> Self {
        let mut config = Self {
            source: SourceConfig {
                port: default_port(),
                ..SourceConfig::default()
            },
            output_dir: default_output_dir(),
            backends: Vec::new(),
        };
        config.merge_cli(args);
        config
    }

    pub fn merge_cli(&mut self, args: &CliArgs) {
        if let Some(u) = &args.username { self.source.username = u.clone(); }
        if let Some(p) = &args.password { self.source.password = Some(p.clone()); }
        if let Some(h) = &args.host { self.source.host = h.clone(); }
        if let Some(p) = args.port { self.source.port = p; }
        if let Some(s) = &args.service { self.source.service = s.clone(); }
        if let Some(o) = &args.output { self.output_dir = o.clone(); }
    }

    /// Structural checks that need no connection.
    pub fn validate(&self) -> Result<()> {
        if self.source.username.trim().is_empty() {
            return Err(ExtractorError::ConfigError(
                "source.username is required".to_string(),
            ));
        }
        let has_cs = self
            .source
            .connection_string
            .as_deref()
            .is_some_and(|cs| !cs.trim().is_empty());
        if !has_cs && (self.source.host.trim().is_empty() || self.source.service.trim().is_empty()) {
            return Err(ExtractorError::ConfigError(
                "source needs either connection_string or host and service".to_string(),
            ));
        }
        if self.source.pool_size == Some(0) {
            return Err(ExtractorError::ConfigError(
                "source.pool_size must be at least 1".to_string(),
            ));
        }

        let mut names = HashSet::new();
        for backend in &self.backends {
            if backend.name.trim().is_empty() {
                return Err(ExtractorError::ConfigError(
                    "every backend needs a name".to_string(),
                ));
            }
            if !names.insert(backend.name.as_str()) {
                return Err(ExtractorError::ConfigError(format!(
                    "backend \"{}\" is defined twice",
                    backend.name
                )));
            }
        }
        Ok(())
    }

    /// Backends to act on: all of them, or the one called `name`.
    pub fn select_backends(&self, name: Option<&str>) -> Result<Vec<usize>> {
        match name {
            None => Ok((0..self.backends.len()).collect()),
            Some(n) => self
                .backends
                .iter()
                .position(|b| b.name == n)
                .map(|i| vec![i])
                .ok_or_else(|| ExtractorError::ConfigError(format!("unknown backend \"{}\"", n))),
        }
    }
}
