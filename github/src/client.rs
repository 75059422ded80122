use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::models::Repo;

const DEFAULT_BASE_URL: &str = "https://api.github.com";
// The API rejects requests without a User-Agent.
const CLIENT_USER_AGENT: &str = "folio-api";
const MAX_PAGE_SIZE: u8 = 100;

pub struct Client {
    http: reqwest::Client,
    base_url: String,
}

impl Client {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Point the client at a different API root, e.g. a proxy or a test
    /// server.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    async fn fetch<T: DeserializeOwned>(&self, url: impl AsRef<str>) -> Result<T, GitHubError> {
        let resp = self
            .http
            .get(url.as_ref())
            .header(ACCEPT, "application/vnd.github.v3+json")
            .header(USER_AGENT, CLIENT_USER_AGENT)
            .send()
            .await
            .map_err(|e| GitHubError::Response(e.to_string()))?;

        match resp.status() {
            StatusCode::NOT_FOUND => return Err(GitHubError::UserNotFound),
            StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => {
                return Err(GitHubError::RateLimited)
            }
            status if !status.is_success() => {
                return Err(GitHubError::Response(format!("unexpected status {status}")))
            }
            _ => {}
        }

        resp.json::<T>()
            .await
            .map_err(|e| GitHubError::Parsing(format!("failed to parse response as JSON: {e}")))
    }

    /// List a user's public repositories, newest-updated first.
    ///
    /// A single page of up to 100 repositories is fetched.
    #[tracing::instrument(name = "Client::list_user_repos", skip(self))]
    pub async fn list_user_repos(&self, username: &str) -> Result<Vec<Repo>, GitHubError> {
        let url = format!(
            "{}/users/{}/repos?per_page={}&sort=updated",
            self.base_url, username, MAX_PAGE_SIZE
        );

        self.fetch(url).await
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Error, Debug)]
pub enum GitHubError {
    #[error("GitHub user not found")]
    UserNotFound,
    #[error("Rate limit exceeded, try again later")]
    RateLimited,
    #[error("ResponseError: {0}")]
    Response(String),
    #[error("ParsingError: {0}")]
    Parsing(String),
}
