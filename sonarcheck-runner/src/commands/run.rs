//! `sonarcheck run` command handler

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use sonarcheck_api::{Credentials, HttpSonarClient};
use sonarcheck_core::config::HarnessConfig;
use sonarcheck_core::error::HarnessError;

use crate::cli::{OutputFormat, RunArgs};
use crate::error::RunnerError;
use crate::orchestrator::Harness;
use crate::output::OutputWriter;
use crate::scenario::ScenarioSuite;

/// Execute the `run` command.
///
/// Loads the catalogue, brings the server up, runs every selected scenario,
/// tears the server down and prints the report. Fails with
/// `RunnerError::ScenariosFailed` when any scenario failed.
pub async fn execute(
    args: RunArgs,
    config: HarnessConfig,
    docker_socket: Option<&Path>,
) -> Result<(), RunnerError> {
    let mut suite = ScenarioSuite::load(&args.scenarios).await?;
    if let Some(name) = &args.only {
        suite = suite.only(name).map_err(HarnessError::from)?;
    }
    info!(
        path = %args.scenarios.display(),
        scenarios = suite.len(),
        "scenario catalogue loaded"
    );

    let docker = super::connect_docker(docker_socket).await?;

    let credentials = Credentials::basic(
        config.auth.admin_login.clone(),
        config.server.admin_password.clone(),
    );
    let api = HttpSonarClient::from_config(&config.server, credentials).map_err(HarnessError::from)?;

    let mut harness = Harness::new(config, Arc::new(docker), api)?;
    let report = harness
        .run_suite(async |h| Ok(h.run_catalogue(&suite).await))
        .await?;

    OutputWriter::new(OutputFormat::from_json_flag(args.json)).render(&report)?;

    if report.all_passed() {
        Ok(())
    } else {
        Err(RunnerError::ScenariosFailed {
            failed: report.failed(),
            total: report.outcomes.len(),
        })
    }
}
