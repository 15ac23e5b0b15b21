//! Harness configuration -- `sonarcheck.toml` parsing and runtime settings.
//!
//! [`HarnessConfig`] is passed explicitly to everything that needs it; there
//! is no global state.
//!
//! # Loading order
//! 1. CLI flags (highest)
//! 2. Environment variables (`SONARQUBE_*`, `RUN`, `SONARCHECK_{SECTION}_{FIELD}`)
//! 3. Config file (`sonarcheck.toml`)
//! 4. Defaults (`Default` impls)
//!
//! # Example
//! ```no_run
//! # async fn example() -> Result<(), sonarcheck_core::error::HarnessError> {
//! use sonarcheck_core::config::HarnessConfig;
//!
//! // file + environment overrides
//! let config = HarnessConfig::load("sonarcheck.toml").await?;
//!
//! // environment only
//! let config = HarnessConfig::from_env()?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, HarnessError};

/// Readiness line printed by the server image once its configuration script
/// has finished.
pub const DEFAULT_READY_MARKER: &str = "[INFO] CNES SonarQube: ready!";

/// Port the server listens on inside its container.
pub const SERVER_CONTAINER_PORT: u16 = 9000;

/// Upper bound for every interval/timeout setting, in seconds.
const MAX_SECS: u64 = 24 * 3600;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HarnessConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub scanner: ScannerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

impl HarnessConfig {
    /// Loads a TOML file, applies environment overrides, then validates.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, HarnessError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus environment overrides, for runs without a config file.
    pub fn from_env() -> Result<Self, HarnessError> {
        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Loads a TOML file without environment overrides.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, HarnessError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                HarnessError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                HarnessError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// Parses a TOML string.
    pub fn parse(toml_str: &str) -> Result<Self, HarnessError> {
        toml::from_str(toml_str).map_err(|e| {
            HarnessError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// Applies environment overrides.
    ///
    /// `RUN` and `SONARQUBE_*` keep the names CI jobs already export;
    /// everything else follows `SONARCHECK_{SECTION}_{FIELD}`.
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "SONARCHECK_GENERAL_LOG_LEVEL");
        override_string(
            &mut self.general.log_format,
            "SONARCHECK_GENERAL_LOG_FORMAT",
        );

        // Server
        override_yes(&mut self.server.run, "RUN");
        override_string(&mut self.server.container_name, "SONARQUBE_CONTAINER_NAME");
        override_string(&mut self.server.admin_password, "SONARQUBE_ADMIN_PASSWORD");
        override_string(&mut self.server.url, "SONARQUBE_URL");
        override_string(&mut self.server.local_url, "SONARQUBE_LOCAL_URL");
        override_string(&mut self.server.tag, "SONARQUBE_TAG");
        override_string(&mut self.server.network, "SONARQUBE_NETWORK");
        override_string(&mut self.server.image, "SONARCHECK_SERVER_IMAGE");
        override_u64(
            &mut self.server.ready_poll_interval_secs,
            "SONARCHECK_SERVER_READY_POLL_INTERVAL_SECS",
        );
        override_u64(
            &mut self.server.ready_timeout_secs,
            "SONARCHECK_SERVER_READY_TIMEOUT_SECS",
        );
        override_u64(
            &mut self.server.http_timeout_secs,
            "SONARCHECK_SERVER_HTTP_TIMEOUT_SECS",
        );

        // Scanner
        override_string(&mut self.scanner.image, "SONARCHECK_SCANNER_IMAGE");
        override_string(
            &mut self.scanner.project_root,
            "SONARCHECK_SCANNER_PROJECT_ROOT",
        );
        override_u64(
            &mut self.scanner.processing_wait_secs,
            "SONARCHECK_SCANNER_PROCESSING_WAIT_SECS",
        );
        override_u64(
            &mut self.scanner.import_processing_wait_secs,
            "SONARCHECK_SCANNER_IMPORT_PROCESSING_WAIT_SECS",
        );
        override_bool(
            &mut self.scanner.run_as_host_user,
            "SONARCHECK_SCANNER_RUN_AS_HOST_USER",
        );

        // Auth
        override_string(&mut self.auth.mode, "SONARCHECK_AUTH_MODE");
    }

    /// Validates every section.
    pub fn validate(&self) -> Result<(), HarnessError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        if !is_valid_object_name(&self.server.container_name) {
            return Err(invalid(
                "server.container_name",
                format!("'{}' is not a valid container name", self.server.container_name),
            ));
        }

        if !is_valid_object_name(&self.server.network) {
            return Err(invalid(
                "server.network",
                format!("'{}' is not a valid network name", self.server.network),
            ));
        }

        if self.server.image.is_empty() || self.server.tag.is_empty() {
            return Err(invalid("server.image", "image and tag must not be empty"));
        }

        if !self.server.url.is_empty() && !is_http_url(&self.server.url) {
            return Err(invalid("server.url", "must start with http:// or https://"));
        }

        if !is_http_url(&self.server.local_url) {
            return Err(invalid(
                "server.local_url",
                "must start with http:// or https://",
            ));
        }

        if self.server.port == 0 {
            return Err(invalid("server.port", "must be greater than 0"));
        }

        if self.server.ready_marker.is_empty() {
            return Err(invalid("server.ready_marker", "must not be empty"));
        }

        if self.server.ready_poll_interval_secs == 0
            || self.server.ready_poll_interval_secs > MAX_SECS
        {
            return Err(invalid(
                "server.ready_poll_interval_secs",
                format!("must be 1-{MAX_SECS}"),
            ));
        }

        if self.server.ready_timeout_secs < self.server.ready_poll_interval_secs
            || self.server.ready_timeout_secs > MAX_SECS
        {
            return Err(invalid(
                "server.ready_timeout_secs",
                format!(
                    "must be between ready_poll_interval_secs ({}) and {MAX_SECS}",
                    self.server.ready_poll_interval_secs
                ),
            ));
        }

        if self.server.http_timeout_secs == 0 || self.server.http_timeout_secs > MAX_SECS {
            return Err(invalid(
                "server.http_timeout_secs",
                format!("must be 1-{MAX_SECS}"),
            ));
        }

        if self.scanner.image.is_empty() {
            return Err(invalid("scanner.image", "must not be empty"));
        }

        if self.scanner.project_root.is_empty() {
            return Err(invalid("scanner.project_root", "must not be empty"));
        }

        for (field, value) in [
            ("scanner.source_mount", &self.scanner.source_mount),
            ("scanner.cache_mount", &self.scanner.cache_mount),
        ] {
            if !value.starts_with('/') {
                return Err(invalid(field, "must be an absolute container path"));
            }
        }

        if self.scanner.processing_wait_secs > MAX_SECS
            || self.scanner.import_processing_wait_secs > MAX_SECS
        {
            return Err(invalid(
                "scanner.processing_wait_secs",
                format!("must be 0-{MAX_SECS}"),
            ));
        }

        let valid_modes = ["basic", "token"];
        if !valid_modes.contains(&self.auth.mode.as_str()) {
            return Err(invalid(
                "auth.mode",
                format!("must be one of: {}", valid_modes.join(", ")),
            ));
        }

        if self.auth.admin_login.is_empty() {
            return Err(invalid("auth.admin_login", "must not be empty"));
        }

        Ok(())
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// trace, debug, info, warn, error
    pub log_level: String,
    /// json, pretty
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
        }
    }
}

/// Quality server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Launch a server container (and network) instead of reusing one
    pub run: bool,
    /// Name of the server container
    pub container_name: String,
    /// Server image, without tag
    pub image: String,
    /// Server image tag
    pub tag: String,
    /// Admin password, also handed to the server container
    pub admin_password: String,
    /// Server URL as seen from the scanner container; empty means
    /// `http://{container_name}:9000`
    pub url: String,
    /// Server URL as seen from the host
    pub local_url: String,
    /// Bridge network shared by server and scanner containers
    pub network: String,
    /// Host port the server's port 9000 is published on
    pub port: u16,
    /// Log line announcing the server is configured
    pub ready_marker: String,
    /// Log polling interval while waiting for readiness
    pub ready_poll_interval_secs: u64,
    /// Give up waiting for readiness after this long
    pub ready_timeout_secs: u64,
    /// Timeout of each HTTP request
    pub http_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            run: true,
            container_name: "lequalsonarqube".to_owned(),
            image: "lequal/sonarqube".to_owned(),
            tag: "latest".to_owned(),
            admin_password: "adminpassword".to_owned(),
            url: String::new(),
            local_url: "http://localhost:9000".to_owned(),
            network: "sonarbridge".to_owned(),
            port: 9000,
            ready_marker: DEFAULT_READY_MARKER.to_owned(),
            ready_poll_interval_secs: 10,
            ready_timeout_secs: 1800,
            http_timeout_secs: 60,
        }
    }
}

impl ServerConfig {
    /// URL the scanner container uses to reach the server.
    pub fn scanner_url(&self) -> String {
        if self.url.is_empty() {
            format!("http://{}:{SERVER_CONTAINER_PORT}", self.container_name)
        } else {
            self.url.clone()
        }
    }

    /// Full image reference (`image:tag`).
    pub fn image_ref(&self) -> String {
        format!("{}:{}", self.image, self.tag)
    }

    pub fn ready_poll_interval(&self) -> Duration {
        Duration::from_secs(self.ready_poll_interval_secs)
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_secs(self.ready_timeout_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

/// Scanner container settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Scanner image (also used to run standalone analysis tools)
    pub image: String,
    /// Host directory mounted into the scanner container
    pub project_root: String,
    /// Scanner cache directory, relative to `project_root`
    pub cache_dir: String,
    /// Mount point of `project_root` inside the container
    pub source_mount: String,
    /// Mount point of the cache directory inside the container
    pub cache_mount: String,
    /// Wait after an analysis before querying the server
    pub processing_wait_secs: u64,
    /// Wait after an import analysis before querying the server
    pub import_processing_wait_secs: u64,
    /// Run scanner containers as the calling user (uid:gid)
    pub run_as_host_user: bool,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            image: "lequal/sonar-scanner".to_owned(),
            project_root: ".".to_owned(),
            cache_dir: ".sonarcache".to_owned(),
            source_mount: "/usr/src".to_owned(),
            cache_mount: "/opt/sonar-scanner/.sonar/cache".to_owned(),
            processing_wait_secs: 8,
            import_processing_wait_secs: 10,
            run_as_host_user: true,
        }
    }
}

impl ScannerConfig {
    pub fn processing_wait(&self) -> Duration {
        Duration::from_secs(self.processing_wait_secs)
    }

    pub fn import_processing_wait(&self) -> Duration {
        Duration::from_secs(self.import_processing_wait_secs)
    }
}

/// Authentication settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// `basic`: scanner and API use the admin account.
    /// `token`: an analysis token is generated for the scanner.
    pub mode: String,
    /// Admin login for API calls
    pub admin_login: String,
    /// Prefix of generated token names
    pub token_name_prefix: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            mode: "basic".to_owned(),
            admin_login: "admin".to_owned(),
            token_name_prefix: "sonarcheck".to_owned(),
        }
    }
}

impl AuthConfig {
    pub fn uses_token(&self) -> bool {
        self.mode == "token"
    }
}

/// Docker object name rule: `[a-zA-Z0-9][a-zA-Z0-9_.-]*`, at most 128 chars.
pub fn is_valid_object_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphanumeric() => {}
        _ => return false,
    }
    name.len() <= 128 && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

fn invalid(field: &str, reason: impl Into<String>) -> HarnessError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason: reason.into(),
    }
    .into()
}

// --- environment override helpers ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

/// `RUN=yes` enables, any other value disables.
fn override_yes(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val == "yes";
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}
