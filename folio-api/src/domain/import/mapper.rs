use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use super::classifier::infer_stage;
use crate::domain::{NewProject, Role};

/// Source-repository metrics attached to a candidate for display during
/// selection. Never persisted; discarded once the project is saved.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoMetrics {
    pub stars: u32,
    pub forks: u32,
    pub language: Option<String>,
    pub is_fork: bool,
    pub is_archived: bool,
    pub pushed_at: Option<DateTime<Utc>>,
}

/// An ephemeral, not-yet-persisted project derived from a repository record.
///
/// Exists only between the fetch and the moment the user either discards it
/// or imports it as a real project.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(flatten)]
    pub draft: NewProject,
    pub metrics: RepoMetrics,
}

#[derive(Debug, Error)]
pub enum MapError {
    #[error("repository record is missing required fields")]
    IncompleteRecord,
}

/// Map one repository record to an import candidate.
///
/// Pure transform. A record without a usable name or web URL is a
/// data-quality error; the caller excludes it from the candidate list rather
/// than importing a partial mapping.
pub fn map_repo(repo: &github::Repo) -> Result<Candidate, MapError> {
    if repo.name.is_empty() || repo.html_url.is_empty() {
        return Err(MapError::IncompleteRecord);
    }

    let mut domains = repo.topics.clone();
    if let Some(language) = &repo.language {
        let language = language.to_lowercase();
        if !domains.contains(&language) {
            domains.push(language);
        }
    }

    let mut links = vec![repo.html_url.clone()];
    if let Some(homepage) = &repo.homepage {
        if !homepage.is_empty() && homepage != &repo.html_url {
            links.push(homepage.clone());
        }
    }

    let one_liner = match &repo.description {
        Some(description) if !description.is_empty() => description.clone(),
        _ => format!("A {} project", repo.language.as_deref().unwrap_or("code")),
    };

    let stars = u32::try_from(repo.stargazers_count).unwrap_or(0);

    let draft = NewProject {
        name: repo.name.clone(),
        one_liner,
        role: Role::Solo,
        current_stage: infer_stage(stars, repo.archived, repo.homepage.as_deref()),
        start_date: Some(repo.created_at.date_naive()),
        end_date: None,
        ongoing: !repo.archived,
        domains,
        links,
        outcome: String::new(),
    };

    Ok(Candidate {
        metrics: RepoMetrics {
            stars,
            forks: u32::try_from(repo.forks_count).unwrap_or(0),
            language: repo.language.clone(),
            is_fork: repo.fork,
            is_archived: repo.archived,
            pushed_at: repo.pushed_at,
        },
        draft,
    })
}
