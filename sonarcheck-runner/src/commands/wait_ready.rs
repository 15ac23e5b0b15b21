//! `sonarcheck wait-ready` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;

use sonarcheck_core::config::HarnessConfig;
use sonarcheck_core::error::HarnessError;
use sonarcheck_docker::ReadinessProbe;

use crate::cli::{OutputFormat, WaitReadyArgs};
use crate::error::RunnerError;
use crate::output::{OutputWriter, Render};

/// Execute the `wait-ready` command against the configured container.
pub async fn execute(
    args: WaitReadyArgs,
    config: HarnessConfig,
    docker_socket: Option<&Path>,
) -> Result<(), RunnerError> {
    let docker = super::connect_docker(docker_socket).await?;

    let probe = ReadinessProbe::from_config(&config.server);
    let waited = probe
        .wait(&docker, &config.server.container_name)
        .await
        .map_err(HarnessError::from)?;

    let report = ReadyReport {
        container: config.server.container_name,
        marker: config.server.ready_marker,
        waited_secs: waited.as_secs(),
    };
    OutputWriter::new(OutputFormat::from_json_flag(args.json)).render(&report)?;
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct ReadyReport {
    pub container: String,
    pub marker: String,
    pub waited_secs: u64,
}

impl Render for ReadyReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        writeln!(
            w,
            "{} is up (\"{}\" seen after {}s)",
            self.container, self.marker, self.waited_secs
        )
    }
}
