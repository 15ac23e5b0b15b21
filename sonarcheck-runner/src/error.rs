//! Runner error type and exit code mapping.

use sonarcheck_core::error::HarnessError;

/// Errors surfaced by the `sonarcheck` binary.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// Scenario catalogue could not be loaded or is invalid.
    #[error("scenario file error: {0}")]
    Scenarios(String),

    /// At least one scenario failed.
    #[error("{failed} of {total} scenarios failed")]
    ScenariosFailed { failed: usize, total: usize },

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Anything else raised by the harness.
    #[error("{0}")]
    Harness(HarnessError),
}

impl RunnerError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                               |
    /// |------|---------------------------------------|
    /// | 0    | Success                               |
    /// | 1    | Failed scenario / general error       |
    /// | 2    | Configuration or scenario-file error  |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Scenarios(_) => 2,
            Self::ScenariosFailed { .. }
            | Self::JsonSerialize(_)
            | Self::Io(_)
            | Self::Harness(_) => 1,
        }
    }
}

impl From<HarnessError> for RunnerError {
    fn from(e: HarnessError) -> Self {
        match e {
            HarnessError::Config(c) => Self::Config(c.to_string()),
            HarnessError::Scenario(s) => Self::Scenarios(s.to_string()),
            other => Self::Harness(other),
        }
    }
}
