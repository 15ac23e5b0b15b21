//! Container runtime access for the sonarcheck harness.
//!
//! Wraps the Docker Engine API (via `bollard`) behind the [`DockerClient`]
//! trait: bridge networks, the long-running quality server container,
//! one-shot scanner/tool containers and log-based readiness polling.

pub mod docker;
pub mod error;
pub mod readiness;
pub mod spec;

pub use docker::{BollardDockerClient, DockerClient};
pub use error::DockerError;
pub use readiness::ReadinessProbe;
pub use spec::{ContainerOutput, ContainerSpec, Mount, MountMode, PortMapping};
