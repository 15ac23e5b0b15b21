//! Command handlers -- one module per subcommand

pub mod run;
pub mod validate;
pub mod wait_ready;

use std::path::Path;

use tracing::info;

use sonarcheck_core::config::HarnessConfig;
use sonarcheck_core::error::HarnessError;
use sonarcheck_docker::{BollardDockerClient, DockerClient};

use crate::error::RunnerError;

/// Effective configuration: defaults, then the file (when given), then the
/// environment, then command-line overrides.
pub async fn load_config(
    path: Option<&Path>,
    log_level: Option<String>,
    log_format: Option<String>,
) -> Result<HarnessConfig, RunnerError> {
    let mut config = match path {
        Some(path) => HarnessConfig::load(path).await?,
        None => HarnessConfig::from_env()?,
    };
    if let Some(level) = log_level {
        config.general.log_level = level;
    }
    if let Some(format) = log_format {
        config.general.log_format = format;
    }
    config.validate()?;
    Ok(config)
}

/// Connects to the daemon behind `socket` (platform default when `None`)
/// and checks it answers.
pub async fn connect_docker(socket: Option<&Path>) -> Result<BollardDockerClient, RunnerError> {
    let docker = match socket {
        Some(path) => BollardDockerClient::connect_with_socket(&path.to_string_lossy()),
        None => BollardDockerClient::connect_local(),
    }
    .map_err(HarnessError::from)?;
    docker.ping().await.map_err(HarnessError::from)?;
    Ok(docker)
}

/// Logs where the effective configuration came from.
pub fn log_source(path: Option<&Path>) {
    match path {
        Some(path) => info!(path = %path.display(), "configuration loaded"),
        None => info!("no configuration file, using defaults and environment"),
    }
}
