//! Readiness polling against a container's log.

use std::time::Duration;

use metrics::{counter, histogram};
use tokio::time::Instant;
use tracing::{debug, info};

use sonarcheck_core::config::ServerConfig;
use sonarcheck_core::metrics as names;

use crate::docker::DockerClient;
use crate::error::DockerError;

/// Waits until a marker line shows up in a container's log.
#[derive(Debug, Clone)]
pub struct ReadinessProbe {
    pub marker: String,
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl ReadinessProbe {
    pub fn new(marker: impl Into<String>, poll_interval: Duration, timeout: Duration) -> Self {
        Self {
            marker: marker.into(),
            poll_interval,
            timeout,
        }
    }

    pub fn from_config(server: &ServerConfig) -> Self {
        Self::new(
            server.ready_marker.clone(),
            server.ready_poll_interval(),
            server.ready_timeout(),
        )
    }

    /// Polls the full log of `container` until it contains the marker.
    ///
    /// The log is checked immediately, then once per poll interval. Returns
    /// the time spent waiting.
    ///
    /// # Errors
    ///
    /// `DockerError::ReadinessTimeout` once `timeout` has elapsed without the
    /// marker; any error from reading the log is returned as is.
    pub async fn wait<D: DockerClient>(
        &self,
        docker: &D,
        container: &str,
    ) -> Result<Duration, DockerError> {
        let started = Instant::now();
        let deadline = started + self.timeout;

        loop {
            counter!(names::READINESS_POLLS_TOTAL).increment(1);
            let logs = docker.container_logs(container).await?;
            if logs.contains(&self.marker) {
                let waited = started.elapsed();
                histogram!(names::READINESS_WAIT_SECONDS).record(waited.as_secs_f64());
                info!(container, waited_secs = waited.as_secs(), "server ready");
                return Ok(waited);
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(DockerError::ReadinessTimeout {
                    container: container.to_owned(),
                    marker: self.marker.clone(),
                    waited_secs: started.elapsed().as_secs(),
                });
            }

            debug!(container, "readiness marker not found yet");
            let remaining = deadline - now;
            tokio::time::sleep(self.poll_interval.min(remaining)).await;
        }
    }
}
