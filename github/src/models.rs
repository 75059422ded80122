use chrono::{DateTime, Utc};
use serde::Deserialize;

/// A public repository as returned by `GET /users/{username}/repos`.
///
/// Only the fields the portfolio importer depends on are modeled; the API
/// returns many more.
#[derive(Debug, Clone, Deserialize)]
pub struct Repo {
    pub name: String,
    pub description: Option<String>,
    pub language: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    pub stargazers_count: i64,
    pub forks_count: i64,
    pub fork: bool,
    pub archived: bool,
    pub homepage: Option<String>,
    pub html_url: String,
    pub created_at: DateTime<Utc>,
    pub pushed_at: Option<DateTime<Utc>>,
}
