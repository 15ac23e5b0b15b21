//! Scanner container invocation.
//!
//! Every analysis runs `lequal/sonar-scanner` as a one-shot container with
//! the project root mounted at `/usr/src` and the scanner cache mounted at
//! `/opt/sonar-scanner/.sonar/cache`. Analyses join the server's bridge
//! network and receive its URL through `SONAR_HOST_URL`; standalone tool
//! runs get neither.

use std::path::{Path, PathBuf};

use metrics::counter;
use tracing::{debug, info};

use sonarcheck_core::config::HarnessConfig;
use sonarcheck_core::error::CheckError;
use sonarcheck_core::metrics as names;
use sonarcheck_docker::{ContainerSpec, DockerClient, DockerError, Mount};

pub const SONAR_HOST_URL: &str = "SONAR_HOST_URL";
pub const SONAR_TOKEN: &str = "SONAR_TOKEN";

/// Everything needed to build scanner container specs.
#[derive(Debug, Clone)]
pub struct ScannerContext {
    pub image: String,
    /// Server URL as seen from inside the network
    pub server_url: String,
    pub network: String,
    /// Absolute host path of the project root
    pub project_root: PathBuf,
    /// Absolute host path of the scanner cache
    pub cache_dir: PathBuf,
    pub source_mount: String,
    pub cache_mount: String,
    /// `uid:gid` the container runs as
    pub user: Option<String>,
    /// Analysis token, when token authentication is enabled
    pub token: Option<String>,
}

impl ScannerContext {
    /// `project_root` must already be absolute.
    pub fn from_config(config: &HarnessConfig, project_root: PathBuf) -> Self {
        let cache_dir = project_root.join(&config.scanner.cache_dir);
        Self {
            image: config.scanner.image.clone(),
            server_url: config.server.scanner_url(),
            network: config.server.network.clone(),
            project_root,
            cache_dir,
            source_mount: config.scanner.source_mount.clone(),
            cache_mount: config.scanner.cache_mount.clone(),
            user: if config.scanner.run_as_host_user {
                host_user()
            } else {
                None
            },
            token: None,
        }
    }

    /// Container path of a directory given relative to the project root.
    pub fn container_path(&self, relative: &str) -> String {
        let relative = relative.trim_start_matches("./").trim_matches('/');
        if relative.is_empty() || relative == "." {
            self.source_mount.clone()
        } else {
            format!("{}/{relative}", self.source_mount.trim_end_matches('/'))
        }
    }

    /// Host path of a file given relative to the project root.
    pub fn host_path(&self, relative: &str) -> PathBuf {
        self.project_root.join(relative)
    }

    /// Scanner analysis with the given `-D` arguments.
    pub fn analysis<I, S>(&self, args: I) -> ContainerSpec
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut spec = self
            .base(args)
            .network(self.network.clone())
            .env(SONAR_HOST_URL, self.server_url.clone())
            .mount(Mount::read_write(&self.cache_dir, self.cache_mount.clone()));
        if let Some(token) = &self.token {
            spec = spec.env(SONAR_TOKEN, token.clone());
        }
        spec
    }

    /// Analysis of the project whose base directory is `base_dir`.
    pub fn project_analysis(&self, base_dir: &str) -> ContainerSpec {
        self.analysis([format!(
            "-Dsonar.projectBaseDir={}",
            self.container_path(base_dir)
        )])
    }

    /// Standalone tool run: project root mounted, no network, no server URL.
    pub fn tool<I, S>(&self, args: I) -> ContainerSpec
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.base(args).working_dir(self.source_mount.clone())
    }

    fn base<I, S>(&self, args: I) -> ContainerSpec
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut spec = ContainerSpec::new(self.image.clone())
            .args(args)
            .mount(Mount::read_write(&self.project_root, self.source_mount.clone()))
            .auto_remove(true);
        if let Some(user) = &self.user {
            spec = spec.user(user.clone());
        }
        spec
    }
}

/// Runs a one-shot scanner/tool container and returns its standard output.
///
/// # Errors
///
/// `DockerError::NonZeroExit` carrying the output when the process fails.
pub async fn run_scanner<D: DockerClient>(
    docker: &D,
    spec: &ContainerSpec,
) -> Result<String, DockerError> {
    info!(command = %spec, "running scanner container");
    let output = docker.run_container(spec).await?;

    let result = if output.success() { "success" } else { "failure" };
    counter!(names::SCANNER_RUNS_TOTAL, names::LABEL_RESULT => result).increment(1);

    if !output.success() {
        return Err(DockerError::NonZeroExit {
            image: spec.image.clone(),
            exit_code: output.exit_code,
            output: output.stdout,
        });
    }
    debug!(bytes = output.stdout.len(), "scanner output captured");
    Ok(output.stdout)
}

/// Checks that every expected line occurs in the scanner output.
///
/// # Errors
///
/// `CheckError::MissingOutputLine` naming the first line not found.
pub fn assert_sensors_ran<S: AsRef<str>>(output: &str, expected: &[S]) -> Result<(), CheckError> {
    match expected.iter().find(|line| !output.contains(line.as_ref())) {
        Some(missing) => Err(CheckError::MissingOutputLine {
            line: missing.as_ref().to_owned(),
        }),
        None => Ok(()),
    }
}

/// `uid:gid` of the calling process.
#[cfg(unix)]
pub fn host_user() -> Option<String> {
    // SAFETY: getuid(2) and getgid(2) always succeed and touch no memory
    let (uid, gid) = unsafe { (libc::getuid(), libc::getgid()) };
    Some(format!("{uid}:{gid}"))
}

#[cfg(not(unix))]
pub fn host_user() -> Option<String> {
    None
}

/// Resolves a possibly relative project root against the working directory.
pub fn absolute_root(root: &str) -> std::io::Result<PathBuf> {
    std::path::absolute(Path::new(root))
}
