//! Docker API abstraction for testability.
//!
//! The [`DockerClient`] trait covers the handful of runtime operations the
//! harness needs. Production code uses [`BollardDockerClient`]; unit tests use
//! `MockDockerClient`.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │     Harness      │
//! └────────┬─────────┘
//!          │
//!          ▼
//!   ┌─────────────┐
//!   │DockerClient │ (trait)
//!   └─────────────┘
//!        │     │
//!        ▼     ▼
//!   ┌───────┐ ┌────┐
//!   │Bollard│ │Mock│
//!   └───┬───┘ └────┘
//!       │
//!       ▼
//!   Docker Daemon
//! ```
//!
//! # Name Validation
//!
//! Every method taking a container or network name validates it first
//! (`[a-zA-Z0-9][a-zA-Z0-9_.-]*`, at most 128 characters). Rejected names
//! never reach the daemon.
//!
//! # Examples
//!
//! ```ignore
//! use sonarcheck_docker::{BollardDockerClient, ContainerSpec, DockerClient};
//!
//! let client = BollardDockerClient::connect_local()?;
//! let out = client
//!     .run_container(&ContainerSpec::new("lequal/sonar-scanner").arg("--version"))
//!     .await?;
//! println!("{}", out.stdout);
//! # Ok::<(), sonarcheck_docker::DockerError>(())
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::StreamExt;
use tracing::{debug, warn};

use sonarcheck_core::config::is_valid_object_name;

use crate::error::DockerError;
use crate::spec::{ContainerOutput, ContainerSpec, Mount};

/// Validates a container or network name.
fn validate_name(kind: &'static str, name: &str) -> Result<(), DockerError> {
    if is_valid_object_name(name) {
        Ok(())
    } else {
        Err(DockerError::InvalidName {
            kind,
            name: name.to_owned(),
        })
    }
}

fn validate_spec(spec: &ContainerSpec) -> Result<(), DockerError> {
    if spec.image.is_empty() || spec.image.chars().any(char::is_whitespace) {
        return Err(DockerError::InvalidName {
            kind: "image",
            name: spec.image.clone(),
        });
    }
    if let Some(name) = &spec.name {
        validate_name("container", name)?;
    }
    if let Some(network) = &spec.network {
        validate_name("network", network)?;
    }
    Ok(())
}

/// Splits an image reference into repository and tag (or digest).
///
/// A reference without either resolves to `latest`. A `:` before the last
/// `/` belongs to a registry port, not a tag.
pub(crate) fn split_image_ref(image: &str) -> (&str, &str) {
    if let Some((repository, digest)) = image.split_once('@') {
        return (repository, digest);
    }
    match image.rsplit_once(':') {
        Some((repository, tag)) if !tag.contains('/') => (repository, tag),
        _ => (image, "latest"),
    }
}

/// Trait abstracting the container runtime.
///
/// `Send + Sync + 'static` so a client can be shared behind an `Arc`.
///
/// # Error Handling
///
/// - **404 errors**: `DockerError::NotFound`
/// - **Daemon unreachable**: `DockerError::Connection`
/// - **Other API failures**: `DockerError::Api`
pub trait DockerClient: Send + Sync + 'static {
    /// Checks daemon connectivity.
    fn ping(&self) -> impl Future<Output = Result<(), DockerError>> + Send;

    /// Creates a bridge network.
    fn create_network(&self, name: &str) -> impl Future<Output = Result<(), DockerError>> + Send;

    /// Removes a network.
    fn remove_network(&self, name: &str) -> impl Future<Output = Result<(), DockerError>> + Send;

    /// Creates and starts a detached container, returning its ID.
    ///
    /// Pulls the image first if it is not present locally.
    fn start_container(
        &self,
        spec: &ContainerSpec,
    ) -> impl Future<Output = Result<String, DockerError>> + Send;

    /// Runs a container to completion and captures its standard output.
    ///
    /// The container is removed after exit on every path; `spec.auto_remove`
    /// is ignored since the output must be read after the process exits.
    /// A non-zero exit code is reported in [`ContainerOutput`], not as an
    /// error.
    fn run_container(
        &self,
        spec: &ContainerSpec,
    ) -> impl Future<Output = Result<ContainerOutput, DockerError>> + Send;

    /// Reads a container's full stdout and stderr.
    fn container_logs(&self, name: &str)
    -> impl Future<Output = Result<String, DockerError>> + Send;

    /// Stops a container with a 10-second grace period.
    fn stop_container(&self, name: &str) -> impl Future<Output = Result<(), DockerError>> + Send;
}

/// Production client using `bollard`.
///
/// Internally holds an `Arc<bollard::Docker>`, so clones are cheap.
#[derive(Clone, Debug)]
pub struct BollardDockerClient {
    docker: Arc<bollard::Docker>,
}

impl BollardDockerClient {
    /// Connects using the platform defaults (honours `DOCKER_HOST`).
    ///
    /// # Errors
    ///
    /// Returns `DockerError::Connection` if the client cannot be created.
    pub fn connect_local() -> Result<Self, DockerError> {
        let docker = bollard::Docker::connect_with_local_defaults()
            .map_err(|e| DockerError::Connection(format!("failed to connect to docker: {e}")))?;
        Ok(Self {
            docker: Arc::new(docker),
        })
    }

    /// Connects using a specific socket path.
    pub fn connect_with_socket(socket_path: &str) -> Result<Self, DockerError> {
        let docker =
            bollard::Docker::connect_with_socket(socket_path, 120, bollard::API_DEFAULT_VERSION)
                .map_err(|e| {
                    DockerError::Connection(format!(
                        "failed to connect to docker at {socket_path}: {e}"
                    ))
                })?;
        Ok(Self {
            docker: Arc::new(docker),
        })
    }

    async fn pull_image(&self, image: &str) -> Result<(), DockerError> {
        use bollard::image::CreateImageOptions;

        let (repository, tag) = split_image_ref(image);
        debug!(repository, tag, "pulling image");
        // An empty tag makes the engine pull every tag of the repository.
        let options = CreateImageOptions::<String> {
            from_image: repository.to_owned(),
            tag: tag.to_owned(),
            ..Default::default()
        };
        let mut progress = self.docker.create_image(Some(options), None, None);
        while let Some(step) = progress.next().await {
            step.map_err(|e| map_error(e, &format!("pull {image}")))?;
        }
        Ok(())
    }

    /// Creates a container, pulling its image once if missing.
    async fn create(&self, spec: &ContainerSpec, remove_on_exit: bool) -> Result<String, DockerError> {
        use bollard::container::CreateContainerOptions;

        validate_spec(spec)?;

        let options = spec.name.as_ref().map(|name| CreateContainerOptions {
            name: name.clone(),
            platform: None,
        });
        let config = container_config(spec, remove_on_exit);

        let created = match self
            .docker
            .create_container(options.clone(), config.clone())
            .await
        {
            Ok(created) => created,
            Err(e) if is_not_found(&e) => {
                self.pull_image(&spec.image).await?;
                self.docker
                    .create_container(options, config)
                    .await
                    .map_err(|e| map_error(e, "create container"))?
            }
            Err(e) => return Err(map_error(e, "create container")),
        };

        for warning in &created.warnings {
            warn!(image = spec.image.as_str(), warning = warning.as_str(), "docker warning");
        }
        Ok(created.id)
    }

    async fn start(&self, id: &str) -> Result<(), DockerError> {
        use bollard::container::StartContainerOptions;

        self.docker
            .start_container(id, None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| map_error(e, "start container"))
    }

    async fn wait_exit(&self, id: &str) -> Result<i64, DockerError> {
        use bollard::container::WaitContainerOptions;

        let mut waits = self.docker.wait_container(
            id,
            Some(WaitContainerOptions {
                condition: "not-running",
            }),
        );
        let mut exit_code = 0;
        while let Some(item) = waits.next().await {
            match item {
                Ok(response) => exit_code = response.status_code,
                // bollard reports non-zero exits as an error item
                Err(bollard::errors::Error::DockerContainerWaitError { code, .. }) => {
                    exit_code = code;
                }
                Err(e) => return Err(map_error(e, "wait container")),
            }
        }
        Ok(exit_code)
    }

    async fn read_logs(&self, id: &str, stderr: bool) -> Result<String, DockerError> {
        use bollard::container::LogsOptions;

        let options = LogsOptions::<String> {
            stdout: true,
            stderr,
            tail: "all".to_owned(),
            ..Default::default()
        };
        let mut stream = self.docker.logs(id, Some(options));
        let mut buf = Vec::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| map_error(e, "read logs"))?;
            buf.extend_from_slice(&chunk.into_bytes());
        }
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    async fn remove_forced(&self, id: &str) -> Result<(), DockerError> {
        use bollard::container::RemoveContainerOptions;

        self.docker
            .remove_container(
                id,
                Some(RemoveContainerOptions {
                    force: true,
                    ..Default::default()
                }),
            )
            .await
            .map_err(|e| map_error(e, "remove container"))
    }
}

impl DockerClient for BollardDockerClient {
    async fn ping(&self) -> Result<(), DockerError> {
        self.docker
            .ping()
            .await
            .map_err(|e| DockerError::Connection(format!("ping failed: {e}")))?;
        Ok(())
    }

    async fn create_network(&self, name: &str) -> Result<(), DockerError> {
        use bollard::network::CreateNetworkOptions;

        validate_name("network", name)?;
        self.docker
            .create_network(CreateNetworkOptions::<String> {
                name: name.to_owned(),
                driver: "bridge".to_owned(),
                ..Default::default()
            })
            .await
            .map_err(|e| map_error(e, &format!("create network '{name}'")))?;
        Ok(())
    }

    async fn remove_network(&self, name: &str) -> Result<(), DockerError> {
        validate_name("network", name)?;
        self.docker
            .remove_network(name)
            .await
            .map_err(|e| map_error(e, &format!("remove network '{name}'")))
    }

    async fn start_container(&self, spec: &ContainerSpec) -> Result<String, DockerError> {
        let id = self.create(spec, spec.auto_remove).await?;
        self.start(&id).await?;
        debug!(image = spec.image.as_str(), id = id.as_str(), "container started");
        Ok(id)
    }

    async fn run_container(&self, spec: &ContainerSpec) -> Result<ContainerOutput, DockerError> {
        let id = self.create(spec, false).await?;

        let result = async {
            self.start(&id).await?;
            let exit_code = self.wait_exit(&id).await?;
            let stdout = self.read_logs(&id, false).await?;
            Ok::<_, DockerError>(ContainerOutput { exit_code, stdout })
        }
        .await;

        if let Err(e) = self.remove_forced(&id).await {
            warn!(id = id.as_str(), error = %e, "failed to remove one-shot container");
        }
        result
    }

    async fn container_logs(&self, name: &str) -> Result<String, DockerError> {
        validate_name("container", name)?;
        self.read_logs(name, true).await
    }

    async fn stop_container(&self, name: &str) -> Result<(), DockerError> {
        use bollard::container::StopContainerOptions;

        validate_name("container", name)?;
        self.docker
            .stop_container(name, Some(StopContainerOptions { t: 10 }))
            .await
            .map_err(|e| map_error(e, &format!("stop container '{name}'")))
    }
}

/// Translates a [`ContainerSpec`] into a bollard create request.
fn container_config(spec: &ContainerSpec, auto_remove: bool) -> bollard::container::Config<String> {
    use bollard::models::{HostConfig, PortBinding};

    let mut exposed_ports = HashMap::new();
    let mut port_bindings = HashMap::new();
    for port in &spec.ports {
        let key = format!("{}/tcp", port.container);
        exposed_ports.insert(key.clone(), HashMap::new());
        port_bindings.insert(
            key,
            Some(vec![PortBinding {
                host_ip: None,
                host_port: Some(port.host.to_string()),
            }]),
        );
    }

    let binds: Vec<String> = spec.mounts.iter().map(Mount::to_bind).collect();

    let host_config = HostConfig {
        binds: (!binds.is_empty()).then_some(binds),
        network_mode: spec.network.clone(),
        auto_remove: Some(auto_remove),
        port_bindings: (!port_bindings.is_empty()).then_some(port_bindings),
        ..Default::default()
    };

    bollard::container::Config {
        image: Some(spec.image.clone()),
        cmd: (!spec.args.is_empty()).then(|| spec.args.clone()),
        env: (!spec.env.is_empty()).then(|| spec.env_strings()),
        user: spec.user.clone(),
        working_dir: spec.working_dir.clone(),
        exposed_ports: (!exposed_ports.is_empty()).then_some(exposed_ports),
        attach_stdout: Some(true),
        attach_stderr: Some(true),
        host_config: Some(host_config),
        ..Default::default()
    }
}

fn is_not_found(e: &bollard::errors::Error) -> bool {
    matches!(
        e,
        bollard::errors::Error::DockerResponseServerError {
            status_code: 404,
            ..
        }
    )
}

fn map_error(e: bollard::errors::Error, context: &str) -> DockerError {
    if is_not_found(&e) {
        return DockerError::NotFound(format!("{context}: {e}"));
    }
    match e {
        bollard::errors::Error::HyperResponseError { .. }
        | bollard::errors::Error::IOError { .. } => {
            DockerError::Connection(format!("{context}: {e}"))
        }
        other => DockerError::Api(format!("{context}: {other}")),
    }
}

/// Mock Docker client for unit tests.
///
/// Records every call and serves scripted log snapshots: each
/// `container_logs` call pops the next snapshot, the last one repeats.
#[cfg(test)]
#[derive(Default)]
pub struct MockDockerClient {
    /// Successive log snapshots returned by `container_logs`
    pub log_script: std::sync::Mutex<std::collections::VecDeque<String>>,
    /// Output of every `run_container` call
    pub run_output: Option<ContainerOutput>,
    /// Simulate failing runtime operations
    pub fail_actions: bool,
    /// Call log (`op:target`)
    pub calls: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl MockDockerClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_logs<I, S>(self, snapshots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        *self.log_script.lock().unwrap() = snapshots.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_run_output(mut self, exit_code: i64, stdout: &str) -> Self {
        self.run_output = Some(ContainerOutput {
            exit_code,
            stdout: stdout.to_owned(),
        });
        self
    }

    pub fn with_failing_actions(mut self) -> Self {
        self.fail_actions = true;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, entry: String) -> Result<(), DockerError> {
        self.calls.lock().unwrap().push(entry);
        if self.fail_actions {
            Err(DockerError::Api("mock failure".to_owned()))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
impl DockerClient for MockDockerClient {
    async fn ping(&self) -> Result<(), DockerError> {
        Ok(())
    }

    async fn create_network(&self, name: &str) -> Result<(), DockerError> {
        validate_name("network", name)?;
        self.record(format!("create_network:{name}"))
    }

    async fn remove_network(&self, name: &str) -> Result<(), DockerError> {
        validate_name("network", name)?;
        self.record(format!("remove_network:{name}"))
    }

    async fn start_container(&self, spec: &ContainerSpec) -> Result<String, DockerError> {
        validate_spec(spec)?;
        self.record(format!("start:{}", spec.image))?;
        Ok("0123456789ab".to_owned())
    }

    async fn run_container(&self, spec: &ContainerSpec) -> Result<ContainerOutput, DockerError> {
        validate_spec(spec)?;
        self.record(format!("run:{}", spec.image))?;
        Ok(self.run_output.clone().unwrap_or(ContainerOutput {
            exit_code: 0,
            stdout: String::new(),
        }))
    }

    async fn container_logs(&self, name: &str) -> Result<String, DockerError> {
        validate_name("container", name)?;
        self.record(format!("logs:{name}"))?;
        let mut script = self.log_script.lock().unwrap();
        let snapshot = if script.len() > 1 {
            script.pop_front().unwrap_or_default()
        } else {
            script.front().cloned().unwrap_or_default()
        };
        Ok(snapshot)
    }

    async fn stop_container(&self, name: &str) -> Result<(), DockerError> {
        validate_name("container", name)?;
        self.record(format!("stop:{name}"))
    }
}
