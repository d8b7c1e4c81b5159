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

//! # Oracle to Data-Warehouse Extractor (CLI)
//!
//! Entry point. Parses the command line, loads the configuration and hands
//! over to the application layer.

use clap::Parser;
use log::{error, info, warn};
use oracle_dwh_extractor::application::orchestrator::{test_connection, Orchestrator};
use oracle_dwh_extractor::application::runtime::RuntimeContext;
use oracle_dwh_extractor::application::schema_validator::{
    validate_backend_definition, validate_backends_against_source,
};
use oracle_dwh_extractor::config::{AppConfig, CliArgs, Command};
use oracle_dwh_extractor::domain::entities::{Backend, ExtractState};
use oracle_dwh_extractor::domain::errors::{ExtractorError, Result};
use oracle_dwh_extractor::domain::query_columns::suggest_fields;
use oracle_dwh_extractor::infrastructure::connectors::DefaultConnectorFactory;
use std::process;
use std::sync::Arc;

fn main() {
    // 1. Initialize Logging
    env_logger::init();

    // 2. Parse Arguments
    let args = CliArgs::parse();

    if let Err(e) = dispatch(&args) {
        error!("{}", e);
        process::exit(1);
    }
}

fn load_config(args: &CliArgs) -> Result<AppConfig> {
    let mut config = match &args.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::default_from_cli(args),
    };
    // Merge CLI overrides
    config.merge_cli(args);
    config.validate()?;
    Ok(config)
}

fn selected(config: &AppConfig, name: Option<&str>) -> Result<Vec<Backend>> {
    Ok(config
        .select_backends(name)?
        .into_iter()
        .map(|i| config.backends[i].clone())
        .collect())
}

/// Offline definition checks; every problem is logged before failing.
fn check_definitions(backends: &[Backend]) -> Result<()> {
    let mut problems = 0;
    for backend in backends {
        if let Err(e) = validate_backend_definition(backend) {
            error!("Backend {}: {}", backend.name, e);
            problems += 1;
        }
    }
    if problems > 0 {
        return Err(ExtractorError::ConfigError(format!(
            "{} backend(s) have invalid definitions",
            problems
        )));
    }
    Ok(())
}

fn dispatch(args: &CliArgs) -> Result<()> {
    match &args.command {
        Command::SuggestFields { query } => {
            let fields = suggest_fields(query)?;
            let yaml = serde_yaml::to_string(&fields)
                .map_err(|e| ExtractorError::ConfigError(e.to_string()))?;
            print!("{}", yaml);
            Ok(())
        }
        Command::Validate { offline } => {
            let config = load_config(args)?;
            check_definitions(&config.backends)?;
            if *offline {
                info!("Definitions are valid (offline)");
                return Ok(());
            }

            let runtime = RuntimeContext::init(&config)?;
            validate_backends_against_source(&runtime.source(), &config.backends)?;
            info!("All extracts match their source queries");
            Ok(())
        }
        Command::TestConnection { backend } => {
            let config = load_config(args)?;
            let factory = DefaultConnectorFactory::new();
            let mut failures = 0;
            for b in selected(&config, backend.as_deref())? {
                match test_connection(&factory, &b) {
                    Ok(()) => info!("Backend {}: connection OK", b.name),
                    Err(e) => {
                        error!("Backend {}: {}", b.name, e);
                        failures += 1;
                    }
                }
            }
            if failures > 0 {
                return Err(ExtractorError::ConnectionError(format!(
                    "{} backend(s) unreachable",
                    failures
                )));
            }
            Ok(())
        }
        Command::Run { backend } => {
            let config = load_config(args)?;
            let mut backends = selected(&config, backend.as_deref())?;
            check_definitions(&backends)?;

            let runtime = RuntimeContext::init(&config)?;
            let source = runtime.source();
            validate_backends_against_source(&source, &backends)?;
            let orchestrator = Orchestrator::new(
                Arc::new(source),
                Arc::new(DefaultConnectorFactory::new()),
                config.output_dir.clone(),
            );

            info!("Starting extraction...");
            let reports = orchestrator.run_all(&mut backends)?;
            for report in &reports {
                match report.state {
                    ExtractState::Failed => warn!("Backend {}: {}", report.name, report.state),
                    _ => info!("Backend {}: {}", report.name, report.state),
                }
            }
            Ok(())
        }
    }
}
