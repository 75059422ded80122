use async_trait::async_trait;
use thiserror::Error;

/// Failures surfaced by a repository listing fetch.
///
/// The messages are user-facing; the workflow forwards them verbatim as
/// error notifications. None of these are retried automatically.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Account not found")]
    AccountNotFound,
    #[error("Rate limit exceeded, try again later")]
    RateLimited,
    #[error("Failed to fetch repositories")]
    Other,
}

/// Outbound port for listing an account's public repositories.
///
/// Abstracts the code-hosting API so the import workflow can be exercised
/// without network access.
#[async_trait]
pub trait RepoSource: Send + Sync {
    /// List public repositories, newest-updated first, capped at one page.
    async fn list_public_repos(&self, account: &str) -> Result<Vec<github::Repo>, SourceError>;
}

#[async_trait]
impl RepoSource for github::Client {
    async fn list_public_repos(&self, account: &str) -> Result<Vec<github::Repo>, SourceError> {
        self.list_user_repos(account).await.map_err(|err| match err {
            github::GitHubError::UserNotFound => SourceError::AccountNotFound,
            github::GitHubError::RateLimited => SourceError::RateLimited,
            github::GitHubError::Response(msg) | github::GitHubError::Parsing(msg) => {
                tracing::error!("repository fetch failed: {msg}");
                SourceError::Other
            }
        })
    }
}
