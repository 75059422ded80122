use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tracing::instrument;

use crate::{
    app_state::AppState,
    auth::SessionContext,
    domain::{
        stats::{outcome_stats, role_breakdown, OutcomeStats, RoleShare},
        Profile, ProfileUpdate, Project,
    },
    routes::ApiError,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/me", get(my_profile).put(update_my_profile))
        .route("/:username", get(public_profile))
}

#[instrument(name = "GET /profiles/me", skip(session, app_state))]
async fn my_profile(
    session: SessionContext,
    State(app_state): State<AppState>,
) -> Result<Json<Profile>, ApiError> {
    let profile = app_state.profile_repo.get_profile(session.user_id).await?;

    Ok(Json(profile))
}

#[instrument(name = "PUT /profiles/me", skip(session, app_state, body))]
async fn update_my_profile(
    session: SessionContext,
    State(app_state): State<AppState>,
    Json(body): Json<ProfileUpdate>,
) -> Result<Json<Profile>, ApiError> {
    let profile = app_state
        .profile_repo
        .update_profile(session.user_id, body)
        .await?;

    Ok(Json(profile))
}

/// The read-only public page payload: the profile together with its project
/// list and the aggregates computed from it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PublicProfileResponse {
    #[serde(flatten)]
    profile: Profile,
    projects: Vec<Project>,
    stats: OutcomeStats,
    role_breakdown: Vec<RoleShare>,
}

#[instrument(name = "GET /profiles/:username", skip(app_state))]
async fn public_profile(
    Path(username): Path<String>,
    State(app_state): State<AppState>,
) -> Result<Json<PublicProfileResponse>, ApiError> {
    let profile = app_state
        .profile_repo
        .profile_by_username(&username)
        .await?;
    let projects = app_state
        .project_repo
        .projects_for_owner(profile.id)
        .await?;

    Ok(Json(PublicProfileResponse {
        stats: outcome_stats(&projects),
        role_breakdown: role_breakdown(&projects),
        profile,
        projects,
    }))
}
