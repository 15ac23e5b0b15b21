//! Client for the quality server REST API.
//!
//! Provides the [`SonarApi`] trait, the `reqwest`-backed [`HttpSonarClient`]
//! and the issue/project queries the harness checks against.

pub mod auth;
pub mod client;
pub mod error;
pub mod model;
pub mod queries;

pub use auth::Credentials;
pub use client::{HttpSonarClient, SonarApi};
pub use error::ApiError;
pub use model::IssuePage;
pub use queries::{
    collect_all_issues, count_open_issues, count_rule_issues, find_profile, first_project_key,
};
