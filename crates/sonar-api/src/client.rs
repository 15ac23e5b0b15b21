//! Quality server API abstraction.
//!
//! [`SonarApi`] has one method per endpoint the harness calls. Production
//! code uses [`HttpSonarClient`]; tests substitute in-memory fakes.
//!
//! # Status handling
//!
//! Endpoints whose response is consumed (searches, token generation) turn a
//! non-success status into `ApiError::Status`. Write endpoints whose outcome
//! the harness never inspects (profile assignment, rule (de)activation,
//! project deletion, token revocation) log a non-success status at `warn`
//! and return `Ok(())`. Project creation reports the server's error
//! messages instead of failing.

use std::future::Future;
use std::time::Duration;

use metrics::counter;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use sonarcheck_core::config::ServerConfig;
use sonarcheck_core::metrics as names;
use sonarcheck_core::types::{ProjectComponent, QualityProfile, UserToken};

use crate::auth::Credentials;
use crate::error::ApiError;
use crate::model::{
    self, ErrorsResponse, IssuePage, ProjectsSearchResponse, QualityProfilesSearchResponse,
};

/// Quality server REST API.
pub trait SonarApi: Send + Sync + 'static {
    /// One page (1-based) of issues of a project.
    fn search_issues(
        &self,
        project_key: &str,
        page: u32,
    ) -> impl Future<Output = Result<IssuePage, ApiError>> + Send;

    /// Projects matching a key.
    fn search_projects(
        &self,
        project_key: &str,
    ) -> impl Future<Output = Result<Vec<ProjectComponent>, ApiError>> + Send;

    /// Creates a project. Returns the server's error messages, empty when
    /// the project was created.
    fn create_project(
        &self,
        name: &str,
        project_key: &str,
    ) -> impl Future<Output = Result<Vec<String>, ApiError>> + Send;

    fn delete_project(&self, project_key: &str)
    -> impl Future<Output = Result<(), ApiError>> + Send;

    /// Quality profiles whose name matches `name`, optionally restricted to
    /// one language.
    fn search_quality_profiles(
        &self,
        name: &str,
        language: Option<&str>,
    ) -> impl Future<Output = Result<Vec<QualityProfile>, ApiError>> + Send;

    /// Assigns a quality profile to a project for one language.
    fn add_project_to_profile(
        &self,
        language: &str,
        project_key: &str,
        profile: &str,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    fn activate_rule(
        &self,
        profile_key: &str,
        rule: &str,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    fn deactivate_rule(
        &self,
        profile_key: &str,
        rule: &str,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// Generates a token for the authenticated user.
    fn generate_token(&self, name: &str)
    -> impl Future<Output = Result<UserToken, ApiError>> + Send;

    fn revoke_token(&self, name: &str) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// Replaces the credentials sent with subsequent requests.
    fn set_credentials(&mut self, credentials: Credentials);
}

/// `reqwest`-backed client.
#[derive(Clone)]
pub struct HttpSonarClient {
    http: reqwest::Client,
    base_url: String,
    credentials: Credentials,
}

impl std::fmt::Debug for HttpSonarClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpSonarClient")
            .field("base_url", &self.base_url)
            .field("credentials", &self.credentials)
            .finish()
    }
}

impl HttpSonarClient {
    /// # Errors
    ///
    /// `ApiError::InvalidUrl` if `base_url` is not an absolute http(s) URL.
    pub fn new(
        base_url: &str,
        credentials: Credentials,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let parsed = reqwest::Url::parse(base_url).map_err(|e| ApiError::InvalidUrl {
            url: base_url.to_owned(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ApiError::InvalidUrl {
                url: base_url.to_owned(),
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Request {
                endpoint: base_url.to_owned(),
                reason: format!("failed to build http client: {e}"),
            })?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_owned(),
            credentials,
        })
    }

    /// Client for the host-side server URL with the configured timeout.
    pub fn from_config(server: &ServerConfig, credentials: Credentials) -> Result<Self, ApiError> {
        Self::new(&server.local_url, credentials, server.http_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{endpoint}", self.base_url)
    }

    async fn send(
        &self,
        endpoint: &'static str,
        request: reqwest::RequestBuilder,
    ) -> Result<(reqwest::StatusCode, String), ApiError> {
        let response = match self.credentials.apply(request).send().await {
            Ok(response) => response,
            Err(e) => {
                record(endpoint, false);
                return Err(ApiError::Request {
                    endpoint: endpoint.to_owned(),
                    reason: e.to_string(),
                });
            }
        };
        let status = response.status();
        let body = response.text().await.map_err(|e| ApiError::Request {
            endpoint: endpoint.to_owned(),
            reason: format!("failed to read body: {e}"),
        })?;
        record(endpoint, status.is_success());
        debug!(endpoint, status = status.as_u16(), "api response");
        Ok((status, body))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        query: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let request = self.http.get(self.url(endpoint)).query(query);
        let (status, body) = self.send(endpoint, request).await?;
        if !status.is_success() {
            return Err(ApiError::Status {
                endpoint: endpoint.to_owned(),
                status: status.as_u16(),
            });
        }
        decode(endpoint, &body)
    }

    async fn post_form(
        &self,
        endpoint: &'static str,
        form: &[(&str, &str)],
    ) -> Result<(reqwest::StatusCode, String), ApiError> {
        let request = self.http.post(self.url(endpoint)).form(form);
        self.send(endpoint, request).await
    }

    /// Posts a form whose outcome is not checked.
    async fn post_unchecked(
        &self,
        endpoint: &'static str,
        form: &[(&str, &str)],
    ) -> Result<(), ApiError> {
        let (status, body) = self.post_form(endpoint, form).await?;
        if !status.is_success() {
            warn!(
                endpoint,
                status = status.as_u16(),
                body = body.as_str(),
                "request not accepted by server"
            );
        }
        Ok(())
    }
}

impl SonarApi for HttpSonarClient {
    async fn search_issues(&self, project_key: &str, page: u32) -> Result<IssuePage, ApiError> {
        let page = page.max(1).to_string();
        self.get_json(
            model::ISSUES_SEARCH,
            &[("componentKeys", project_key), ("p", page.as_str())],
        )
        .await
    }

    async fn search_projects(&self, project_key: &str) -> Result<Vec<ProjectComponent>, ApiError> {
        let resp: ProjectsSearchResponse = self
            .get_json(model::PROJECTS_SEARCH, &[("projects", project_key)])
            .await?;
        Ok(resp.components)
    }

    async fn create_project(&self, name: &str, project_key: &str) -> Result<Vec<String>, ApiError> {
        let endpoint = model::PROJECTS_CREATE;
        let (status, body) = self
            .post_form(endpoint, &[("name", name), ("project", project_key)])
            .await?;

        let errors = serde_json::from_str::<ErrorsResponse>(&body)
            .map(ErrorsResponse::messages)
            .unwrap_or_default();
        if errors.is_empty() && !status.is_success() {
            return Err(ApiError::Status {
                endpoint: endpoint.to_owned(),
                status: status.as_u16(),
            });
        }
        Ok(errors)
    }

    async fn delete_project(&self, project_key: &str) -> Result<(), ApiError> {
        self.post_unchecked(model::PROJECTS_DELETE, &[("project", project_key)])
            .await
    }

    async fn search_quality_profiles(
        &self,
        name: &str,
        language: Option<&str>,
    ) -> Result<Vec<QualityProfile>, ApiError> {
        let mut query = vec![("qualityProfile", name)];
        if let Some(language) = language {
            query.push(("language", language));
        }
        let resp: QualityProfilesSearchResponse =
            self.get_json(model::PROFILES_SEARCH, &query).await?;
        Ok(resp
            .profiles
            .into_iter()
            .filter(|p| p.name == name)
            .collect())
    }

    async fn add_project_to_profile(
        &self,
        language: &str,
        project_key: &str,
        profile: &str,
    ) -> Result<(), ApiError> {
        self.post_unchecked(
            model::PROFILES_ADD_PROJECT,
            &[
                ("language", language),
                ("project", project_key),
                ("qualityProfile", profile),
            ],
        )
        .await
    }

    async fn activate_rule(&self, profile_key: &str, rule: &str) -> Result<(), ApiError> {
        self.post_unchecked(
            model::PROFILES_ACTIVATE_RULE,
            &[("key", profile_key), ("rule", rule)],
        )
        .await
    }

    async fn deactivate_rule(&self, profile_key: &str, rule: &str) -> Result<(), ApiError> {
        self.post_unchecked(
            model::PROFILES_DEACTIVATE_RULE,
            &[("key", profile_key), ("rule", rule)],
        )
        .await
    }

    async fn generate_token(&self, name: &str) -> Result<UserToken, ApiError> {
        let endpoint = model::TOKENS_GENERATE;
        let (status, body) = self.post_form(endpoint, &[("name", name)]).await?;
        if !status.is_success() {
            return Err(ApiError::Status {
                endpoint: endpoint.to_owned(),
                status: status.as_u16(),
            });
        }
        decode(endpoint, &body)
    }

    async fn revoke_token(&self, name: &str) -> Result<(), ApiError> {
        self.post_unchecked(model::TOKENS_REVOKE, &[("name", name)])
            .await
    }

    fn set_credentials(&mut self, credentials: Credentials) {
        debug!(credentials = ?credentials, "switching api credentials");
        self.credentials = credentials;
    }
}

fn decode<T: DeserializeOwned>(endpoint: &str, body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|e| ApiError::Decode {
        endpoint: endpoint.to_owned(),
        reason: e.to_string(),
    })
}

fn record(endpoint: &'static str, success: bool) {
    let result = if success { "success" } else { "failure" };
    counter!(
        names::API_REQUESTS_TOTAL,
        names::LABEL_ENDPOINT => endpoint,
        names::LABEL_RESULT => result
    )
    .increment(1);
}
