use serde::{Deserialize, Serialize};

use super::ids::UserId;

/// A maker's profile, as shown on the public page.
///
/// The session token and other account plumbing are not part of this model;
/// they stay inside the profile repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: UserId,
    pub username: String,
    pub name: String,
    pub bio: String,
    pub first_make: FirstMake,
    pub domains: Vec<String>,
    pub today_making: String,
    pub socials: Socials,
    pub embed_feed: EmbedFeed,
}

/// The "first thing I ever made" vignette.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FirstMake {
    pub description: String,
    pub age: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Socials {
    pub twitter: String,
    pub github: String,
    pub linkedin: String,
    pub substack: String,
    pub website: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmbedFeed {
    pub kind: Option<FeedKind>,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedKind {
    Twitter,
    Substack,
}

/// The profile fields a user may edit. Username is immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub name: String,
    pub bio: String,
    #[serde(default)]
    pub first_make: FirstMake,
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(default)]
    pub today_making: String,
    #[serde(default)]
    pub socials: Socials,
    #[serde(default)]
    pub embed_feed: EmbedFeed,
}
