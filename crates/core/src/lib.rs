//! Shared building blocks of the sonarcheck harness: configuration, the
//! error taxonomy, the server's domain records and metric names.

pub mod config;
pub mod error;
pub mod metrics;
pub mod types;

// Errors
pub use error::{
    CheckError, ConfigError, ContainerError, HarnessError, ScenarioError, ServerError,
};

// Configuration
pub use config::HarnessConfig;

// Domain types
pub use types::{Issue, IssueStatus, Paging, ProjectComponent, QualityProfile, UserToken};
