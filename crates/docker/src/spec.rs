//! Container launch descriptions.
//!
//! [`ContainerSpec`] collects what the harness needs to start a container:
//! image, argv, environment, network, user, bind mounts, working directory
//! and published ports. It is runtime-agnostic; [`BollardDockerClient`]
//! translates it into a create request.
//!
//! [`BollardDockerClient`]: crate::docker::BollardDockerClient

use std::fmt;
use std::path::PathBuf;

/// Access mode of a bind mount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountMode {
    ReadWrite,
    ReadOnly,
}

impl MountMode {
    fn as_str(self) -> &'static str {
        match self {
            Self::ReadWrite => "rw",
            Self::ReadOnly => "ro",
        }
    }
}

/// Host directory bound into the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mount {
    pub host: PathBuf,
    pub container: String,
    pub mode: MountMode,
}

impl Mount {
    pub fn read_write(host: impl Into<PathBuf>, container: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            container: container.into(),
            mode: MountMode::ReadWrite,
        }
    }

    /// `host:container:mode`, the Docker `Binds` syntax.
    pub fn to_bind(&self) -> String {
        format!(
            "{}:{}:{}",
            self.host.display(),
            self.container,
            self.mode.as_str()
        )
    }
}

/// Published TCP port (`container` exposed on `host`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortMapping {
    pub container: u16,
    pub host: u16,
}

/// Everything needed to create and start one container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerSpec {
    pub image: String,
    pub args: Vec<String>,
    pub name: Option<String>,
    pub env: Vec<(String, String)>,
    pub network: Option<String>,
    pub user: Option<String>,
    pub mounts: Vec<Mount>,
    pub working_dir: Option<String>,
    pub ports: Vec<PortMapping>,
    pub auto_remove: bool,
}

impl ContainerSpec {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            ..Self::default()
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn network(mut self, network: impl Into<String>) -> Self {
        self.network = Some(network.into());
        self
    }

    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn mount(mut self, mount: Mount) -> Self {
        self.mounts.push(mount);
        self
    }

    pub fn working_dir(mut self, dir: impl Into<String>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn publish(mut self, container: u16, host: u16) -> Self {
        self.ports.push(PortMapping { container, host });
        self
    }

    pub fn auto_remove(mut self, auto_remove: bool) -> Self {
        self.auto_remove = auto_remove;
        self
    }

    /// Environment as `KEY=value` strings.
    pub fn env_strings(&self) -> Vec<String> {
        self.env.iter().map(|(k, v)| format!("{k}={v}")).collect()
    }

    /// Value of an environment variable, if set.
    pub fn env_value(&self, key: &str) -> Option<&str> {
        self.env
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Display for ContainerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.image)?;
        if !self.args.is_empty() {
            write!(f, " {}", self.args.join(" "))?;
        }
        Ok(())
    }
}

/// Result of a one-shot container run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerOutput {
    pub exit_code: i64,
    /// Captured standard output (stderr is not captured)
    pub stdout: String,
}

impl ContainerOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}
