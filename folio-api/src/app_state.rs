use std::{collections::HashMap, sync::Arc};

use tokio::sync::{RwLock, RwLockWriteGuard};

use crate::domain::import::{ImportWorkflow, RepoSource};
use crate::domain::UserId;
use crate::repositories::{ProfileRepository, ProjectRepository};

/// Shared application state.
///
/// The repositories are the storage port: handlers and the import workflow
/// only ever see these trait objects, never a concrete backend. Each user
/// owns at most one import workflow instance; a handler holds the write
/// guard for the duration of one workflow step, so steps of the same
/// workflow never interleave.
#[derive(Clone)]
pub struct AppState {
    pub project_repo: Arc<dyn ProjectRepository>,
    pub profile_repo: Arc<dyn ProfileRepository>,
    pub repo_source: Arc<dyn RepoSource>,
    import_sessions: Arc<RwLock<HashMap<UserId, ImportWorkflow>>>,
}

impl AppState {
    pub fn new(
        project_repo: Arc<dyn ProjectRepository>,
        profile_repo: Arc<dyn ProfileRepository>,
        repo_source: Arc<dyn RepoSource>,
    ) -> Self {
        Self {
            project_repo,
            profile_repo,
            repo_source,
            import_sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn import_sessions(
        &self,
    ) -> RwLockWriteGuard<'_, HashMap<UserId, ImportWorkflow>> {
        self.import_sessions.write().await
    }

    /// Drop a user's in-memory workflow state. Projects already persisted by
    /// the workflow are untouched.
    pub async fn discard_import_session(&self, user: UserId) {
        self.import_sessions.write().await.remove(&user);
    }
}
