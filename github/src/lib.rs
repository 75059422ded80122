mod client;
mod models;

pub use client::Client;
pub use client::GitHubError;
pub use models::Repo;
