use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::{
    app_state::AppState,
    auth::SessionContext,
    domain::import::{ImportWorkflow, Notification, ReviewDraft, WorkflowView},
    routes::ApiError,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(current_state).delete(discard))
        .route("/fetch", post(fetch))
        .route("/toggle", post(toggle))
        .route("/select-all", post(select_all))
        .route("/select-none", post(select_none))
        .route("/back", post(back))
        .route("/confirm", post(confirm))
        .route("/review", put(edit_review))
        .route("/review/save", post(save_and_next))
        .route("/review/skip", post(skip))
        .route("/finish", post(finish_early))
}

/// Every workflow step responds with the same envelope: the current snapshot
/// plus the notifications the step produced.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImportResponse {
    #[serde(flatten)]
    view: WorkflowView,
    notifications: Vec<Notification>,
}

impl ImportResponse {
    fn new(workflow: &ImportWorkflow, notifications: Vec<Notification>) -> Self {
        Self {
            view: workflow.view(),
            notifications,
        }
    }
}

#[instrument(name = "GET /import", skip(session, app_state))]
async fn current_state(
    session: SessionContext,
    State(app_state): State<AppState>,
) -> Json<ImportResponse> {
    let mut sessions = app_state.import_sessions().await;
    let workflow = sessions
        .entry(session.user_id)
        .or_insert_with(ImportWorkflow::new);

    Json(ImportResponse::new(workflow, Vec::new()))
}

#[instrument(name = "DELETE /import", skip(session, app_state))]
async fn discard(session: SessionContext, State(app_state): State<AppState>) -> StatusCode {
    app_state.discard_import_session(session.user_id).await;

    StatusCode::NO_CONTENT
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FetchBody {
    account: String,
}

#[instrument(name = "POST /import/fetch", skip(session, app_state), fields(account = %body.account))]
async fn fetch(
    session: SessionContext,
    State(app_state): State<AppState>,
    Json(body): Json<FetchBody>,
) -> Json<ImportResponse> {
    let mut sessions = app_state.import_sessions().await;
    let workflow = sessions
        .entry(session.user_id)
        .or_insert_with(ImportWorkflow::new);

    let notifications = workflow
        .fetch(&body.account, app_state.repo_source.as_ref())
        .await;

    Json(ImportResponse::new(workflow, notifications))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ToggleBody {
    index: usize,
}

#[instrument(name = "POST /import/toggle", skip(session, app_state))]
async fn toggle(
    session: SessionContext,
    State(app_state): State<AppState>,
    Json(body): Json<ToggleBody>,
) -> Result<Json<ImportResponse>, ApiError> {
    with_workflow(&session, &app_state, |workflow| {
        workflow.toggle(body.index);
        Vec::new()
    })
    .await
}

#[instrument(name = "POST /import/select-all", skip(session, app_state))]
async fn select_all(
    session: SessionContext,
    State(app_state): State<AppState>,
) -> Result<Json<ImportResponse>, ApiError> {
    with_workflow(&session, &app_state, |workflow| {
        workflow.select_all();
        Vec::new()
    })
    .await
}

#[instrument(name = "POST /import/select-none", skip(session, app_state))]
async fn select_none(
    session: SessionContext,
    State(app_state): State<AppState>,
) -> Result<Json<ImportResponse>, ApiError> {
    with_workflow(&session, &app_state, |workflow| {
        workflow.select_none();
        Vec::new()
    })
    .await
}

#[instrument(name = "POST /import/back", skip(session, app_state))]
async fn back(
    session: SessionContext,
    State(app_state): State<AppState>,
) -> Result<Json<ImportResponse>, ApiError> {
    with_workflow(&session, &app_state, |workflow| {
        workflow.back();
        Vec::new()
    })
    .await
}

#[instrument(name = "POST /import/confirm", skip(session, app_state))]
async fn confirm(
    session: SessionContext,
    State(app_state): State<AppState>,
) -> Result<Json<ImportResponse>, ApiError> {
    let mut sessions = app_state.import_sessions().await;
    let workflow = workflow_entry(&session, &mut sessions)?;

    let notifications = workflow
        .confirm(session.user_id, app_state.project_repo.as_ref())
        .await;

    Ok(Json(ImportResponse::new(workflow, notifications)))
}

#[instrument(name = "PUT /import/review", skip(session, app_state, body))]
async fn edit_review(
    session: SessionContext,
    State(app_state): State<AppState>,
    Json(body): Json<ReviewDraft>,
) -> Result<Json<ImportResponse>, ApiError> {
    with_workflow(&session, &app_state, |workflow| {
        workflow.update_draft(body);
        Vec::new()
    })
    .await
}

#[instrument(name = "POST /import/review/save", skip(session, app_state))]
async fn save_and_next(
    session: SessionContext,
    State(app_state): State<AppState>,
) -> Result<Json<ImportResponse>, ApiError> {
    let mut sessions = app_state.import_sessions().await;
    let workflow = workflow_entry(&session, &mut sessions)?;

    let notifications = workflow
        .save_and_next(app_state.project_repo.as_ref())
        .await;

    Ok(Json(ImportResponse::new(workflow, notifications)))
}

#[instrument(name = "POST /import/review/skip", skip(session, app_state))]
async fn skip(
    session: SessionContext,
    State(app_state): State<AppState>,
) -> Result<Json<ImportResponse>, ApiError> {
    with_workflow(&session, &app_state, |workflow| workflow.skip()).await
}

#[instrument(name = "POST /import/finish", skip(session, app_state))]
async fn finish_early(
    session: SessionContext,
    State(app_state): State<AppState>,
) -> Result<Json<ImportResponse>, ApiError> {
    with_workflow(&session, &app_state, |workflow| workflow.finish_early()).await
}

/// Run a synchronous workflow operation against the caller's instance.
///
/// Steps other than GET require the workflow to already exist; asking to
/// toggle or review without having started one is a client error.
async fn with_workflow<F>(
    session: &SessionContext,
    app_state: &AppState,
    op: F,
) -> Result<Json<ImportResponse>, ApiError>
where
    F: FnOnce(&mut ImportWorkflow) -> Vec<Notification>,
{
    let mut sessions = app_state.import_sessions().await;
    let workflow = workflow_entry(session, &mut sessions)?;

    let notifications = op(workflow);
    Ok(Json(ImportResponse::new(workflow, notifications)))
}

fn workflow_entry<'a>(
    session: &SessionContext,
    sessions: &'a mut std::collections::HashMap<crate::domain::UserId, ImportWorkflow>,
) -> Result<&'a mut ImportWorkflow, ApiError> {
    sessions
        .get_mut(&session.user_id)
        .ok_or_else(|| ApiError::bad_request("No import in progress"))
}
