//! Issue and project queries built on top of [`SonarApi`].

use sonarcheck_core::types::{Issue, QualityProfile, count_for_rule, count_open};

use crate::client::SonarApi;
use crate::error::ApiError;

/// Stop paging after this many pages; the server refuses deeper paging.
const MAX_PAGES: u32 = 100;

/// Open (OPEN or TO_REVIEW) issues on the first result page.
pub async fn count_open_issues<A: SonarApi>(api: &A, project_key: &str) -> Result<usize, ApiError> {
    let page = api.search_issues(project_key, 1).await?;
    Ok(count_open(&page.issues))
}

/// Issues raised by `rule` on the first result page, whatever their status.
pub async fn count_rule_issues<A: SonarApi>(
    api: &A,
    project_key: &str,
    rule: &str,
) -> Result<usize, ApiError> {
    let page = api.search_issues(project_key, 1).await?;
    Ok(count_for_rule(&page.issues, rule))
}

/// Every issue of a project, following paging.
pub async fn collect_all_issues<A: SonarApi>(
    api: &A,
    project_key: &str,
) -> Result<Vec<Issue>, ApiError> {
    let mut issues = Vec::new();
    for page_index in 1..=MAX_PAGES {
        let page = api.search_issues(project_key, page_index).await?;
        let more = page.has_next() && !page.issues.is_empty();
        issues.extend(page.issues);
        if !more {
            break;
        }
    }
    Ok(issues)
}

/// Key of the first project returned when searching for `project_key`.
pub async fn first_project_key<A: SonarApi>(
    api: &A,
    project_key: &str,
) -> Result<Option<String>, ApiError> {
    let components = api.search_projects(project_key).await?;
    Ok(components.into_iter().next().map(|c| c.key))
}

/// First profile named `name`.
pub async fn find_profile<A: SonarApi>(
    api: &A,
    name: &str,
    language: Option<&str>,
) -> Result<Option<QualityProfile>, ApiError> {
    let profiles = api.search_quality_profiles(name, language).await?;
    Ok(profiles.into_iter().next())
}
