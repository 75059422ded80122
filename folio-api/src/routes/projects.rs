use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use tracing::instrument;
use url::Url;

use crate::{
    app_state::AppState,
    auth::SessionContext,
    domain::{NewProject, Project, ProjectId},
    routes::ApiError,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_projects).post(create_project))
        .route("/:id", put(update_project).delete(delete_project))
}

#[instrument(name = "GET /projects", skip(session, app_state))]
async fn list_projects(
    session: SessionContext,
    State(app_state): State<AppState>,
) -> Result<Json<Vec<Project>>, ApiError> {
    let projects = app_state
        .project_repo
        .projects_for_owner(session.user_id)
        .await?;

    Ok(Json(projects))
}

#[instrument(name = "POST /projects", skip(session, app_state, body), fields(name = %body.name))]
async fn create_project(
    session: SessionContext,
    State(app_state): State<AppState>,
    Json(body): Json<NewProject>,
) -> Result<(StatusCode, Json<Project>), ApiError> {
    validate(&body)?;

    let project = app_state
        .project_repo
        .create_project(session.user_id, body.normalized())
        .await?;

    Ok((StatusCode::CREATED, Json(project)))
}

#[instrument(name = "PUT /projects/:id", skip(session, app_state, body))]
async fn update_project(
    session: SessionContext,
    Path(id): Path<i32>,
    State(app_state): State<AppState>,
    Json(body): Json<NewProject>,
) -> Result<Json<Project>, ApiError> {
    validate(&body)?;
    let id = owned_project(&session, ProjectId::new(id), &app_state).await?;

    let project = app_state
        .project_repo
        .update_project(id, body.normalized())
        .await?;

    Ok(Json(project))
}

#[instrument(name = "DELETE /projects/:id", skip(session, app_state))]
async fn delete_project(
    session: SessionContext,
    Path(id): Path<i32>,
    State(app_state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let id = owned_project(&session, ProjectId::new(id), &app_state).await?;

    app_state.project_repo.delete_project(id).await?;

    Ok(StatusCode::NO_CONTENT)
}

fn validate(body: &NewProject) -> Result<(), ApiError> {
    if body.name.trim().is_empty() {
        return Err(ApiError::bad_request("Project name is required"));
    }
    if let Some(link) = body.links.iter().find(|l| Url::parse(l).is_err()) {
        return Err(ApiError::bad_request(format!("Invalid link: {link}")));
    }
    Ok(())
}

/// Resolve a project id, treating another owner's project as unknown.
async fn owned_project(
    session: &SessionContext,
    id: ProjectId,
    app_state: &AppState,
) -> Result<ProjectId, ApiError> {
    let project = app_state.project_repo.get_project(id).await?;
    if project.owner_id != session.user_id {
        return Err(ApiError::not_found(format!("Not found: project {id}")));
    }
    Ok(id)
}
