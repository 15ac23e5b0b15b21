//! Docker layer error type.
//!
//! [`DockerError`] converts into [`HarnessError`] so callers can propagate
//! it with `?`.

use sonarcheck_core::error::{ContainerError, HarnessError};

/// Errors raised while talking to the container runtime.
#[derive(Debug, thiserror::Error)]
pub enum DockerError {
    /// Docker API call failed
    #[error("docker api error: {0}")]
    Api(String),

    /// Docker daemon unreachable
    #[error("docker connection error: {0}")]
    Connection(String),

    /// Container or network does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// A container or network name was rejected before reaching the API
    #[error("invalid {kind} name '{name}'")]
    InvalidName { kind: &'static str, name: String },

    /// One-shot container exited with a non-zero status
    #[error("container from image '{image}' exited with code {exit_code}")]
    NonZeroExit {
        image: String,
        exit_code: i64,
        output: String,
    },

    /// Readiness marker not seen before the deadline
    #[error("container '{container}' not ready after {waited_secs}s")]
    ReadinessTimeout {
        container: String,
        marker: String,
        waited_secs: u64,
    },
}

impl From<DockerError> for HarnessError {
    fn from(err: DockerError) -> Self {
        let container = match err {
            DockerError::Api(msg) | DockerError::Connection(msg) => ContainerError::DockerApi(msg),
            DockerError::NotFound(what) => ContainerError::NotFound(what),
            DockerError::InvalidName { kind, name } => {
                ContainerError::DockerApi(format!("invalid {kind} name '{name}'"))
            }
            DockerError::NonZeroExit {
                image,
                exit_code,
                output,
            } => ContainerError::NonZeroExit {
                image,
                exit_code,
                output,
            },
            DockerError::ReadinessTimeout {
                container,
                marker,
                waited_secs,
            } => ContainerError::ReadinessTimeout {
                container,
                marker,
                waited_secs,
            },
        };
        HarnessError::Container(container)
    }
}
