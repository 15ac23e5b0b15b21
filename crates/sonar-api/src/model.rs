//! Response envelopes of the endpoints the harness calls.

use serde::{Deserialize, Serialize};

use sonarcheck_core::types::{Issue, Paging, ProjectComponent, QualityProfile};

pub const ISSUES_SEARCH: &str = "/api/issues/search";
pub const PROJECTS_SEARCH: &str = "/api/projects/search";
pub const PROJECTS_CREATE: &str = "/api/projects/create";
pub const PROJECTS_DELETE: &str = "/api/projects/delete";
pub const PROFILES_SEARCH: &str = "/api/qualityprofiles/search";
pub const PROFILES_ADD_PROJECT: &str = "/api/qualityprofiles/add_project";
pub const PROFILES_ACTIVATE_RULE: &str = "/api/qualityprofiles/activate_rule";
pub const PROFILES_DEACTIVATE_RULE: &str = "/api/qualityprofiles/deactivate_rule";
pub const TOKENS_GENERATE: &str = "/api/user_tokens/generate";
pub const TOKENS_REVOKE: &str = "/api/user_tokens/revoke";

/// One page of `/api/issues/search`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IssuePage {
    #[serde(default)]
    pub issues: Vec<Issue>,
    #[serde(default)]
    pub paging: Option<Paging>,
}

impl IssuePage {
    pub fn has_next(&self) -> bool {
        self.paging.is_some_and(|p| p.has_next())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectsSearchResponse {
    #[serde(default)]
    pub components: Vec<ProjectComponent>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QualityProfilesSearchResponse {
    #[serde(default)]
    pub profiles: Vec<QualityProfile>,
}

/// `{"errors": [{"msg": "..."}]}` body of rejected requests.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorsResponse {
    #[serde(default)]
    pub errors: Vec<ErrorMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorMessage {
    pub msg: String,
}

impl ErrorsResponse {
    pub fn messages(self) -> Vec<String> {
        self.errors.into_iter().map(|e| e.msg).collect()
    }
}
