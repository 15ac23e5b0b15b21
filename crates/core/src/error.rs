//! Error types -- one top-level error with a sub-enum per concern.
//!
//! Lower crates (`sonarcheck-docker`, `sonarcheck-api`) define their own
//! error enums and implement `From<...> for HarnessError`, so the runner can
//! propagate everything with `?`.

use std::path::PathBuf;

/// Top-level harness error.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// Configuration error
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Container runtime error
    #[error("container error: {0}")]
    Container(#[from] ContainerError),

    /// Quality server API error
    #[error("server error: {0}")]
    Server(#[from] ServerError),

    /// A check on scanner output or server state did not hold
    #[error("check failed: {0}")]
    Check(#[from] CheckError),

    /// Scenario catalogue error
    #[error("scenario error: {0}")]
    Scenario(#[from] ScenarioError),

    /// I/O error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl HarnessError {
    /// Returns `true` when the error is a failed check rather than an
    /// infrastructure problem.
    pub fn is_check_failure(&self) -> bool {
        matches!(self, Self::Check(_))
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file not found
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// Config could not be parsed
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// Invalid config value
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Container runtime errors as seen by the rest of the harness
#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    /// Docker API call failed
    #[error("docker api error: {0}")]
    DockerApi(String),

    /// Container or network does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// A one-shot container exited with a non-zero code
    #[error("container '{image}' exited with code {exit_code}")]
    NonZeroExit {
        image: String,
        exit_code: i64,
        output: String,
    },

    /// The readiness marker never showed up in the container logs
    #[error(
        "container '{container}' not ready after {waited_secs}s (marker '{marker}' not found in logs)"
    )]
    ReadinessTimeout {
        container: String,
        marker: String,
        waited_secs: u64,
    },
}

/// Quality server API errors as seen by the rest of the harness
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Request could not be sent or no response was received
    #[error("request to {endpoint} failed: {reason}")]
    Request { endpoint: String, reason: String },

    /// Server answered with an unexpected HTTP status
    #[error("{endpoint} returned HTTP {status}")]
    Status { endpoint: String, status: u16 },

    /// Response body did not match the expected shape
    #[error("unexpected response from {endpoint}: {reason}")]
    Decode { endpoint: String, reason: String },
}

/// Check failures. Each message carries the hint a developer needs to start
/// looking for the cause.
#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    /// An expected line is missing from the scanner output
    #[error(
        "line not found in scanner output: '{line}' (hint: a plugin may not be installed correctly or its sensor was not triggered)"
    )]
    MissingOutputLine { line: String },

    /// Project is not listed by the server after analysis
    #[error("project '{project_key}' is not on the server (found: {found:?})")]
    ProjectNotRegistered {
        project_key: String,
        found: Option<String>,
    },

    /// Open issue count differs from the expectation
    #[error(
        "there should be {expected} issues on project '{project_key}' with the '{profile}' quality profile but {actual} were found"
    )]
    IssueCountMismatch {
        project_key: String,
        profile: String,
        expected: usize,
        actual: usize,
    },

    /// Issue count for a given rule differs from the expectation
    #[error(
        "rule '{rule}' should have raised {expected} issue(s) on project '{project_key}' but {actual} were found"
    )]
    RuleIssueCountMismatch {
        project_key: String,
        rule: String,
        expected: usize,
        actual: usize,
    },

    /// Server refused to create a project
    #[error("project '{project_key}' could not be created: {}", errors.join("; "))]
    ProjectCreationRejected {
        project_key: String,
        errors: Vec<String>,
    },

    /// Tool output differs from its reference file
    #[error(
        "output differs from reference (hint: diff {} {})",
        actual.display(),
        reference.display()
    )]
    OutputMismatch { actual: PathBuf, reference: PathBuf },

    /// Quality profile lookup returned nothing
    #[error("quality profile '{0}' not found on the server")]
    ProfileNotFound(String),
}

/// Scenario catalogue errors
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    /// Scenario file could not be read or parsed
    #[error("failed to load scenarios from {path}: {reason}")]
    Load { path: String, reason: String },

    /// Scenario definition is inconsistent
    #[error("invalid scenario '{scenario}': {reason}")]
    Invalid { scenario: String, reason: String },

    /// No scenario matched a name filter
    #[error("no scenario named '{0}'")]
    NotFound(String),
}
