//! Domain types shared by the API client and the orchestrator.
//!
//! These mirror the JSON records returned by the quality server. They are
//! deserialized leniently: unknown fields are ignored and optional fields
//! default, since only a handful of attributes are ever checked.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Issue status as reported by the server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueStatus {
    Open,
    Confirmed,
    Reopened,
    Resolved,
    Closed,
    ToReview,
    Reviewed,
    /// Any status string this harness does not know about
    #[serde(other)]
    Unknown,
}

impl IssueStatus {
    /// Statuses counted as "open" when comparing against expected counts.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open | Self::ToReview)
    }
}

impl fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Open => "OPEN",
            Self::Confirmed => "CONFIRMED",
            Self::Reopened => "REOPENED",
            Self::Resolved => "RESOLVED",
            Self::Closed => "CLOSED",
            Self::ToReview => "TO_REVIEW",
            Self::Reviewed => "REVIEWED",
            Self::Unknown => "UNKNOWN",
        };
        write!(f, "{s}")
    }
}

/// A single rule violation recorded against a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    #[serde(default)]
    pub key: String,
    pub rule: String,
    pub status: IssueStatus,
    #[serde(default)]
    pub component: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub severity: Option<String>,
}

impl Issue {
    /// Minimal issue, mostly useful for fakes and tests.
    pub fn new(rule: impl Into<String>, status: IssueStatus) -> Self {
        Self {
            key: String::new(),
            rule: rule.into(),
            status,
            component: None,
            message: None,
            severity: None,
        }
    }
}

/// Number of issues whose status is OPEN or TO_REVIEW.
pub fn count_open(issues: &[Issue]) -> usize {
    issues.iter().filter(|i| i.status.is_open()).count()
}

/// Number of issues raised by `rule`, whatever their status.
pub fn count_for_rule(issues: &[Issue], rule: &str) -> usize {
    issues.iter().filter(|i| i.rule == rule).count()
}

/// Paging block of search endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paging {
    pub page_index: u32,
    pub page_size: u32,
    pub total: u32,
}

impl Paging {
    /// Whether pages after this one exist.
    pub fn has_next(&self) -> bool {
        u64::from(self.page_index) * u64::from(self.page_size) < u64::from(self.total)
    }
}

/// A project as listed by `/api/projects/search`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectComponent {
    pub key: String,
    #[serde(default)]
    pub name: String,
}

/// A quality profile as listed by `/api/qualityprofiles/search`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityProfile {
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub is_default: bool,
}

/// A user token. `token` is only present right after generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserToken {
    #[serde(default)]
    pub login: String,
    pub name: String,
    #[serde(default)]
    pub token: Option<String>,
}

/// Name of the built-in quality profile every project falls back to.
pub const DEFAULT_QUALITY_PROFILE: &str = "Sonar way";
