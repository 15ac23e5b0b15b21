//! Scenario orchestration -- server lifecycle, analyses and checks.
//!
//! The [`Harness`] owns the configuration, a container runtime client and a
//! quality server API client. It runs every scenario sequentially against
//! one shared server.
//!
//! # Lifecycle
//!
//! 1. `setup`: bridge network and server container (when `server.run`),
//!    scanner cache directory, readiness wait, analysis token (token auth;
//!    later API calls authenticate with it too)
//! 2. scenarios
//! 3. `teardown`: token revocation, then stop/remove whatever `setup`
//!    created
//!
//! [`Harness::run_suite`] guarantees step 3 on every exit path, panics
//! included. Projects, activated rules and profile assignments are scoped
//! the same way by the `with_*` helpers.

use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use metrics::counter;
use tracing::{error, info, warn};
use uuid::Uuid;

use sonarcheck_api::{Credentials, SonarApi, model};
use sonarcheck_core::config::{HarnessConfig, SERVER_CONTAINER_PORT};
use sonarcheck_core::error::{CheckError, HarnessError, ServerError};
use sonarcheck_core::metrics as names;
use sonarcheck_core::types::DEFAULT_QUALITY_PROFILE;
use sonarcheck_docker::{ContainerSpec, DockerClient, ReadinessProbe};

use crate::fixtures;
use crate::report::{ScenarioOutcome, SuiteReport};
use crate::scanner::{ScannerContext, absolute_root, assert_sensors_ran, run_scanner};
use crate::scenario::{ImportScenario, LanguageScenario, ScenarioKind, ScenarioSuite, ToolScenario};

/// Environment variable the server image reads its admin password from.
const ADMIN_PASSWORD_ENV: &str = "SONARQUBE_ADMIN_PASSWORD";

/// Issue counts observed by a language analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageSummary {
    pub issues: usize,
    /// `(profile, issues)` when a custom profile was exercised
    pub custom_profile: Option<(String, usize)>,
}

impl fmt::Display for LanguageSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} open issues", self.issues)?;
        if let Some((profile, issues)) = &self.custom_profile {
            write!(f, ", {issues} with {profile}")?;
        }
        Ok(())
    }
}

/// Drives the server container, the scanner and the API checks.
pub struct Harness<D, A> {
    config: HarnessConfig,
    docker: Arc<D>,
    api: A,
    scanner: ScannerContext,
    /// Name of the token generated by `setup`
    token_name: Option<String>,
    created_network: bool,
    started_container: bool,
}

impl<D: DockerClient, A: SonarApi> Harness<D, A> {
    /// Builds a harness; the project root is resolved against the current
    /// directory.
    pub fn new(config: HarnessConfig, docker: Arc<D>, api: A) -> Result<Self, HarnessError> {
        let root = absolute_root(&config.scanner.project_root)?;
        let scanner = ScannerContext::from_config(&config, root);
        Ok(Self {
            config,
            docker,
            api,
            scanner,
            token_name: None,
            created_network: false,
            started_container: false,
        })
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn docker(&self) -> &D {
        &self.docker
    }

    pub fn scanner(&self) -> &ScannerContext {
        &self.scanner
    }

    // --- lifecycle ---

    /// Brings the server up (or attaches to a running one) and waits until
    /// it is ready.
    pub async fn setup(&mut self) -> Result<(), HarnessError> {
        let server = &self.config.server;
        if server.run {
            info!(network = server.network.as_str(), "creating bridge network");
            self.docker.create_network(&server.network).await?;
            self.created_network = true;

            info!(
                container = server.container_name.as_str(),
                image = %server.image_ref(),
                "launching server container"
            );
            self.docker.start_container(&self.server_spec()).await?;
            self.started_container = true;
        } else {
            info!(
                container = server.container_name.as_str(),
                network = server.network.as_str(),
                "using running server"
            );
        }

        fixtures::ensure_cache_dir(&self.scanner.cache_dir).await?;
        self.wait_ready().await?;

        if self.config.auth.uses_token() {
            self.generate_scanner_token().await?;
        }
        Ok(())
    }

    /// Server container launch description.
    pub fn server_spec(&self) -> ContainerSpec {
        let server = &self.config.server;
        ContainerSpec::new(server.image_ref())
            .name(server.container_name.clone())
            .env(ADMIN_PASSWORD_ENV, server.admin_password.clone())
            .publish(server.port, SERVER_CONTAINER_PORT)
            .network(server.network.clone())
            .auto_remove(true)
    }

    /// Blocks until the readiness marker shows up in the server log.
    pub async fn wait_ready(&self) -> Result<Duration, HarnessError> {
        let container = &self.config.server.container_name;
        info!(container = container.as_str(), "waiting for server to be up");
        let probe = ReadinessProbe::from_config(&self.config.server);
        Ok(probe.wait(self.docker.as_ref(), container).await?)
    }

    async fn generate_scanner_token(&mut self) -> Result<(), HarnessError> {
        let name = format!("{}-{}", self.config.auth.token_name_prefix, Uuid::new_v4());
        let token = self.api.generate_token(&name).await?;
        let value = token.token.ok_or_else(|| ServerError::Decode {
            endpoint: model::TOKENS_GENERATE.to_owned(),
            reason: "response carries no token value".to_owned(),
        })?;
        info!(token_name = name.as_str(), "analysis token generated");
        self.api.set_credentials(Credentials::token(value.clone()));
        self.token_name = Some(name);
        self.scanner.token = Some(value);
        Ok(())
    }

    fn admin_credentials(&self) -> Credentials {
        Credentials::basic(
            self.config.auth.admin_login.clone(),
            self.config.server.admin_password.clone(),
        )
    }

    /// Releases everything `setup` acquired. Every step is attempted; the
    /// first failure is returned.
    pub async fn teardown(&mut self) -> Result<(), HarnessError> {
        let mut first_error: Option<HarnessError> = None;

        if let Some(name) = self.token_name.take() {
            self.scanner.token = None;
            let admin = self.admin_credentials();
            self.api.set_credentials(admin);
            if let Err(e) = self.api.revoke_token(&name).await {
                warn!(token_name = name.as_str(), error = %e, "failed to revoke token");
                first_error.get_or_insert(e.into());
            }
        }

        let server = &self.config.server;
        if self.started_container {
            info!(container = server.container_name.as_str(), "stopping server container");
            if let Err(e) = self.docker.stop_container(&server.container_name).await {
                warn!(error = %e, "failed to stop server container");
                first_error.get_or_insert(e.into());
            }
            self.started_container = false;
        }
        if self.created_network {
            info!(network = server.network.as_str(), "removing bridge network");
            if let Err(e) = self.docker.remove_network(&server.network).await {
                warn!(error = %e, "failed to remove bridge network");
                first_error.get_or_insert(e.into());
            }
            self.created_network = false;
        }

        first_error.map_or(Ok(()), Err)
    }

    /// `setup`, `body`, then `teardown` whatever `body` did.
    ///
    /// A panic in `body` is resumed once teardown has run. When setup fails,
    /// whatever it already acquired is released and the setup error is
    /// returned.
    pub async fn run_suite<T>(
        &mut self,
        body: impl AsyncFnOnce(&Self) -> Result<T, HarnessError>,
    ) -> Result<T, HarnessError> {
        if let Err(e) = self.setup().await {
            error!(error = %e, "setup failed");
            if let Err(cleanup) = self.teardown().await {
                warn!(error = %cleanup, "cleanup after failed setup incomplete");
            }
            return Err(e);
        }

        let outcome = AssertUnwindSafe(body(&*self)).catch_unwind().await;
        let teardown = self.teardown().await;

        match outcome {
            Err(panic) => {
                if let Err(e) = teardown {
                    warn!(error = %e, "teardown after panic incomplete");
                }
                std::panic::resume_unwind(panic)
            }
            Ok(Err(e)) => {
                if let Err(t) = teardown {
                    warn!(error = %t, "teardown incomplete");
                }
                Err(e)
            }
            Ok(Ok(value)) => {
                teardown?;
                Ok(value)
            }
        }
    }

    // --- scoped server state ---

    /// Assigns `profile` to a project for one language.
    ///
    /// The server's answer is not checked; a rejection is only logged.
    pub async fn switch_quality_profile(
        &self,
        project_key: &str,
        language: &str,
        profile: &str,
    ) -> Result<(), HarnessError> {
        info!(project_key, language, profile, "switching quality profile");
        self.api
            .add_project_to_profile(language, project_key, profile)
            .await?;
        Ok(())
    }

    /// Runs `body` with `profile` assigned, then switches back to the
    /// default profile.
    pub async fn with_quality_profile<T>(
        &self,
        project_key: &str,
        language: &str,
        profile: &str,
        body: impl AsyncFnOnce() -> Result<T, HarnessError>,
    ) -> Result<T, HarnessError> {
        self.switch_quality_profile(project_key, language, profile)
            .await?;
        guarded(
            body(),
            self.switch_quality_profile(project_key, language, DEFAULT_QUALITY_PROFILE),
        )
        .await
    }

    /// Creates a project, runs `body`, then deletes the project.
    pub async fn with_project<T>(
        &self,
        name: &str,
        project_key: &str,
        body: impl AsyncFnOnce() -> Result<T, HarnessError>,
    ) -> Result<T, HarnessError> {
        let errors = self.api.create_project(name, project_key).await?;
        if !errors.is_empty() {
            return Err(CheckError::ProjectCreationRejected {
                project_key: project_key.to_owned(),
                errors,
            }
            .into());
        }
        info!(project_key, "project created");

        guarded(body(), async {
            info!(project_key, "deleting project");
            self.api
                .delete_project(project_key)
                .await
                .map_err(HarnessError::from)
        })
        .await
    }

    /// Activates `rule` in the profile named `profile`, runs `body`, then
    /// deactivates it.
    pub async fn with_activated_rule<T>(
        &self,
        profile: &str,
        language: &str,
        rule: &str,
        body: impl AsyncFnOnce() -> Result<T, HarnessError>,
    ) -> Result<T, HarnessError> {
        let found = sonarcheck_api::find_profile(&self.api, profile, Some(language)).await?;
        let profile_key = found
            .ok_or_else(|| CheckError::ProfileNotFound(profile.to_owned()))?
            .key;

        info!(profile, rule, "activating rule");
        self.api.activate_rule(&profile_key, rule).await?;

        guarded(body(), async {
            info!(profile, rule, "deactivating rule");
            self.api
                .deactivate_rule(&profile_key, rule)
                .await
                .map_err(HarnessError::from)
        })
        .await
    }

    // --- scenarios ---

    /// Runs the scanner on a project directory and returns its output.
    pub async fn analyze(&self, base_dir: &str) -> Result<String, HarnessError> {
        let spec = self.scanner.project_analysis(base_dir);
        Ok(run_scanner(self.docker.as_ref(), &spec).await?)
    }

    /// Analyzes a sample project and checks sensors, registration and issue
    /// counts, then repeats the analysis under the custom profile if one is
    /// named.
    pub async fn analyze_language(
        &self,
        s: &LanguageScenario,
    ) -> Result<LanguageSummary, HarnessError> {
        info!(language = s.name.as_str(), project_key = s.project_key.as_str(), "analysing project");
        let output = self.analyze(&s.base_dir).await?;
        assert_sensors_ran(&output, &s.sensors)?;
        self.processing_pause(self.config.scanner.processing_wait())
            .await;

        self.check_registered(&s.project_key).await?;
        let issues = self
            .check_open_issues(s, DEFAULT_QUALITY_PROFILE, s.expected_issues)
            .await?;
        info!(language = s.name.as_str(), issues, "analysis with default profile as expected");

        let mut summary = LanguageSummary {
            issues,
            custom_profile: None,
        };

        if let Some(profile) = &s.custom_profile {
            self.with_quality_profile(&s.project_key, &s.language_key, profile, async || {
                self.analyze(&s.base_dir).await?;
                self.processing_pause(self.config.scanner.processing_wait())
                    .await;
                Ok(())
            })
            .await?;

            let custom = self
                .check_open_issues(s, profile, s.expected_issues_custom_profile)
                .await?;
            summary.custom_profile = Some((profile.clone(), custom));
        }

        Ok(summary)
    }

    /// Runs a standalone tool in the scanner image and compares its output
    /// with the reference file.
    pub async fn run_analysis_tool(&self, s: &ToolScenario) -> Result<String, HarnessError> {
        info!(tool = s.tool.as_str(), "running analysis tool");
        let spec = self.scanner.tool(s.args.iter().cloned());
        let output = run_scanner(self.docker.as_ref(), &spec).await?;

        let actual = self.scanner.host_path(&s.output_file);
        if s.store_output {
            fixtures::store_output(&actual, &output).await?;
        }
        fixtures::compare_with_reference(actual, self.scanner.host_path(&s.reference_file))
            .await?;
        Ok(format!("output matches {}", s.reference_file))
    }

    /// Imports externally produced results into a fresh project and checks
    /// that exactly one issue is raised by the violated rule.
    ///
    /// The project is deleted, and the rule deactivated when it was
    /// activated, on every exit path.
    pub async fn import_analysis_results(&self, s: &ImportScenario) -> Result<usize, HarnessError> {
        if s.activate_rule {
            self.with_activated_rule(&s.quality_profile, &s.language_key, &s.violated_rule, async || {
                self.with_project(&s.project_name, &s.project_key, async || {
                    self.import_into_project(s).await
                })
                .await
            })
            .await
        } else {
            self.with_project(&s.project_name, &s.project_key, async || {
                self.import_into_project(s).await
            })
            .await
        }
    }

    async fn import_into_project(&self, s: &ImportScenario) -> Result<usize, HarnessError> {
        self.switch_quality_profile(&s.project_key, &s.language_key, &s.quality_profile)
            .await?;

        let spec = self
            .scanner
            .analysis([
                format!("-Dsonar.projectKey={}", s.project_key),
                format!("-Dsonar.projectName={}", s.project_name),
                "-Dsonar.projectVersion=1.0".to_owned(),
                format!("-Dsonar.sources={}", s.source_dir),
            ])
            .working_dir(self.scanner.container_path(&s.working_dir));
        let output = run_scanner(self.docker.as_ref(), &spec).await?;
        assert_sensors_ran(&output, &[&s.expected_sensor_line, &s.expected_import_line])?;

        self.processing_pause(self.config.scanner.import_processing_wait())
            .await;

        let actual =
            sonarcheck_api::count_rule_issues(&self.api, &s.project_key, &s.violated_rule).await?;
        if actual != 1 {
            return Err(CheckError::RuleIssueCountMismatch {
                project_key: s.project_key.clone(),
                rule: s.violated_rule.clone(),
                expected: 1,
                actual,
            }
            .into());
        }
        info!(project_key = s.project_key.as_str(), rule = s.violated_rule.as_str(), "import produced the expected issue");
        Ok(actual)
    }

    /// Runs every scenario of `suite`, continuing after failures.
    pub async fn run_catalogue(&self, suite: &ScenarioSuite) -> SuiteReport {
        let mut report = SuiteReport::default();

        for s in &suite.languages {
            let started = Instant::now();
            let result = self.analyze_language(s).await.map(|summary| summary.to_string());
            report.push(outcome(ScenarioKind::Language, &s.name, started, result));
        }
        for s in &suite.tools {
            let started = Instant::now();
            let result = self.run_analysis_tool(s).await;
            report.push(outcome(ScenarioKind::Tool, &s.tool, started, result));
        }
        for s in &suite.imports {
            let started = Instant::now();
            let result = self
                .import_analysis_results(s)
                .await
                .map(|n| format!("{n} issue raised by {}", s.violated_rule));
            report.push(outcome(ScenarioKind::Import, &s.project_name, started, result));
        }

        info!(
            passed = report.passed(),
            failed = report.failed(),
            "scenario catalogue finished"
        );
        report
    }

    // --- checks ---

    async fn check_registered(&self, project_key: &str) -> Result<(), HarnessError> {
        let found = sonarcheck_api::first_project_key(&self.api, project_key).await?;
        if found.as_deref() != Some(project_key) {
            return Err(CheckError::ProjectNotRegistered {
                project_key: project_key.to_owned(),
                found,
            }
            .into());
        }
        Ok(())
    }

    async fn check_open_issues(
        &self,
        s: &LanguageScenario,
        profile: &str,
        expected: usize,
    ) -> Result<usize, HarnessError> {
        let actual = if s.count_all_pages {
            let issues = sonarcheck_api::collect_all_issues(&self.api, &s.project_key).await?;
            sonarcheck_core::types::count_open(&issues)
        } else {
            sonarcheck_api::count_open_issues(&self.api, &s.project_key).await?
        };
        if actual != expected {
            return Err(CheckError::IssueCountMismatch {
                project_key: s.project_key.clone(),
                profile: profile.to_owned(),
                expected,
                actual,
            }
            .into());
        }
        Ok(actual)
    }

    /// Gives the server time to process a submitted analysis.
    async fn processing_pause(&self, wait: Duration) {
        if !wait.is_zero() {
            info!(wait_secs = wait.as_secs(), "waiting for the server to process results");
            tokio::time::sleep(wait).await;
        }
    }
}

/// Runs `body`, then `cleanup` whatever happened to `body`.
///
/// A panic in `body` is resumed after cleanup. A `body` error wins over a
/// cleanup error, which is then only logged.
async fn guarded<T>(
    body: impl Future<Output = Result<T, HarnessError>>,
    cleanup: impl Future<Output = Result<(), HarnessError>>,
) -> Result<T, HarnessError> {
    let outcome = AssertUnwindSafe(body).catch_unwind().await;
    let cleaned = cleanup.await;
    match outcome {
        Err(panic) => {
            if let Err(e) = cleaned {
                warn!(error = %e, "cleanup after panic failed");
            }
            std::panic::resume_unwind(panic)
        }
        Ok(Err(e)) => {
            if let Err(c) = cleaned {
                warn!(error = %c, "cleanup failed");
            }
            Err(e)
        }
        Ok(Ok(value)) => {
            cleaned?;
            Ok(value)
        }
    }
}

fn outcome(
    kind: ScenarioKind,
    name: &str,
    started: Instant,
    result: Result<String, HarnessError>,
) -> ScenarioOutcome {
    let elapsed = started.elapsed();
    let label = if result.is_ok() { "success" } else { "failure" };
    counter!(
        names::SCENARIOS_TOTAL,
        names::LABEL_KIND => kind.as_str(),
        names::LABEL_RESULT => label
    )
    .increment(1);

    match &result {
        Ok(detail) => info!(kind = kind.as_str(), scenario = name, detail = detail.as_str(), "scenario passed"),
        Err(e) => error!(kind = kind.as_str(), scenario = name, error = %e, "scenario failed"),
    }
    ScenarioOutcome::from_result(kind, name, elapsed, result)
}
