use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::domain::{EmbedFeed, FirstMake, Profile, ProfileUpdate, Socials, UserId};

use super::repo_error::RepositoryError;

/// Storage port for maker profiles.
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn get_profile(&self, id: UserId) -> Result<Profile, RepositoryError>;

    async fn profile_by_username(&self, username: &str) -> Result<Profile, RepositoryError>;

    /// Resolve a session token to its profile. The token is provisioned by
    /// the external identity provider.
    async fn profile_by_token(&self, token: &str) -> Result<Profile, RepositoryError>;

    async fn update_profile(
        &self,
        id: UserId,
        data: ProfileUpdate,
    ) -> Result<Profile, RepositoryError>;

    /// Create a profile, or rotate its token if the username exists. This is
    /// the integration point the identity provider calls when an account is
    /// provisioned.
    async fn upsert_profile(&self, data: NewProfile) -> Result<Profile, RepositoryError>;
}

pub struct NewProfile {
    pub username: String,
    pub api_token: String,
}

impl NewProfile {
    pub fn new(username: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            api_token: api_token.into(),
        }
    }
}

pub struct PgProfileRepository {
    pool: PgPool,
}

impl PgProfileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_where(
        &self,
        clause: &str,
        bind: &str,
    ) -> Result<Option<Profile>, RepositoryError> {
        let row: Option<ProfileRow> = sqlx::query_as(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE {clause} = $1"
        ))
        .bind(bind)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }
}

const PROFILE_COLUMNS: &str =
    "id, username, name, bio, first_make, domains, today_making, socials, embed_feed";

#[async_trait]
impl ProfileRepository for PgProfileRepository {
    async fn get_profile(&self, id: UserId) -> Result<Profile, RepositoryError> {
        let row: Option<ProfileRow> = sqlx::query_as(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = $1"
        ))
        .bind(id.as_i32())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Into::into)
            .ok_or_else(|| RepositoryError::NotFound(format!("profile {id}")))
    }

    async fn profile_by_username(&self, username: &str) -> Result<Profile, RepositoryError> {
        self.fetch_where("username", username)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(format!("profile '{username}'")))
    }

    async fn profile_by_token(&self, token: &str) -> Result<Profile, RepositoryError> {
        self.fetch_where("api_token", token)
            .await?
            .ok_or_else(|| RepositoryError::NotFound("no profile for token".into()))
    }

    async fn update_profile(
        &self,
        id: UserId,
        data: ProfileUpdate,
    ) -> Result<Profile, RepositoryError> {
        let row: Option<ProfileRow> = sqlx::query_as(&format!(
            r#"
            UPDATE profiles
            SET name = $2,
                bio = $3,
                first_make = $4,
                domains = $5,
                today_making = $6,
                socials = $7,
                embed_feed = $8
            WHERE id = $1
            RETURNING {PROFILE_COLUMNS}
            "#
        ))
        .bind(id.as_i32())
        .bind(&data.name)
        .bind(&data.bio)
        .bind(Json(&data.first_make))
        .bind(&data.domains)
        .bind(&data.today_making)
        .bind(Json(&data.socials))
        .bind(Json(&data.embed_feed))
        .fetch_optional(&self.pool)
        .await?;

        row.map(Into::into)
            .ok_or_else(|| RepositoryError::NotFound(format!("profile {id}")))
    }

    async fn upsert_profile(&self, data: NewProfile) -> Result<Profile, RepositoryError> {
        let row: ProfileRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO profiles (username, api_token)
            VALUES ($1, $2)
            ON CONFLICT (username) DO UPDATE
            SET api_token = EXCLUDED.api_token
            RETURNING {PROFILE_COLUMNS}
            "#
        ))
        .bind(&data.username)
        .bind(&data.api_token)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }
}

#[derive(sqlx::FromRow)]
struct ProfileRow {
    id: i32,
    username: String,
    name: String,
    bio: String,
    first_make: Json<FirstMake>,
    domains: Vec<String>,
    today_making: String,
    socials: Json<Socials>,
    embed_feed: Json<EmbedFeed>,
}

impl From<ProfileRow> for Profile {
    fn from(row: ProfileRow) -> Self {
        Profile {
            id: UserId::new(row.id),
            username: row.username,
            name: row.name,
            bio: row.bio,
            first_make: row.first_make.0,
            domains: row.domains,
            today_making: row.today_making,
            socials: row.socials.0,
            embed_feed: row.embed_feed.0,
        }
    }
}
