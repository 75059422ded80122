use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::mapper::{map_repo, Candidate};
use super::source::RepoSource;
use crate::domain::{NewProject, Project, Role, Stage, UserId};
use crate::repositories::ProjectRepository;

/// A user-facing event emitted by a workflow step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub message: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Error,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: Severity::Success,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: Severity::Error,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportStep {
    Input,
    Select,
    Review,
    Closed,
}

/// The review-step edit buffer: the fields a user may adjust per imported
/// project before moving on.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewDraft {
    pub role: Role,
    pub current_stage: Stage,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub ongoing: bool,
    pub outcome: String,
}

impl ReviewDraft {
    fn normalized(mut self) -> Self {
        if self.ongoing {
            self.end_date = None;
        }
        self
    }

    /// Build the full update payload: draft fields over the project's
    /// untouched ones.
    fn apply_to(&self, project: &Project) -> NewProject {
        NewProject {
            name: project.name.clone(),
            one_liner: project.one_liner.clone(),
            role: self.role,
            current_stage: self.current_stage,
            start_date: self.start_date,
            end_date: self.end_date,
            ongoing: self.ongoing,
            domains: project.domains.clone(),
            links: project.links.clone(),
            outcome: self.outcome.clone(),
        }
        .normalized()
    }
}

impl From<&Project> for ReviewDraft {
    fn from(project: &Project) -> Self {
        Self {
            role: project.role,
            current_stage: project.current_stage,
            start_date: project.start_date,
            end_date: project.end_date,
            ongoing: project.ongoing,
            outcome: project.outcome.clone(),
        }
    }
}

/// The bulk-import state machine: `input → select → review → closed`.
///
/// One instance per user session. The candidate list is an immutable
/// snapshot of the last successful fetch; the review step walks an index
/// cursor over the projects created by the confirm step. Operations called
/// outside their step are ignored. Each operation returns the notifications
/// it produced; a failed external call surfaces as an error notification and
/// the machine does not advance (except review saves, which are best-effort
/// since the record already exists).
///
/// Projects created by the confirm step are never deleted here, no matter
/// how the workflow is abandoned.
#[derive(Debug)]
pub struct ImportWorkflow {
    step: ImportStep,
    candidates: Vec<Candidate>,
    selected: BTreeSet<usize>,
    imported: Vec<Project>,
    cursor: usize,
    draft: Option<ReviewDraft>,
}

impl Default for ImportWorkflow {
    fn default() -> Self {
        Self::new()
    }
}

impl ImportWorkflow {
    pub fn new() -> Self {
        Self {
            step: ImportStep::Input,
            candidates: Vec::new(),
            selected: BTreeSet::new(),
            imported: Vec::new(),
            cursor: 0,
            draft: None,
        }
    }

    pub fn step(&self) -> ImportStep {
        self.step
    }

    pub fn imported(&self) -> &[Project] {
        &self.imported
    }

    /// Fetch candidates for an account and move to the selection step.
    ///
    /// An empty result is valid (shown as "no public repositories found");
    /// a fetch failure reports an error and stays on the input step. Records
    /// that cannot be mapped are excluded from the batch with a notice.
    #[instrument(name = "ImportWorkflow::fetch", skip(self, source))]
    pub async fn fetch(&mut self, account: &str, source: &dyn RepoSource) -> Vec<Notification> {
        if self.step() != ImportStep::Input {
            return Vec::new();
        }
        let account = account.trim();
        if account.is_empty() {
            return Vec::new();
        }

        match source.list_public_repos(account).await {
            Ok(repos) => {
                let mut skipped = 0usize;
                self.candidates = repos
                    .iter()
                    .filter_map(|repo| match map_repo(repo) {
                        Ok(candidate) => Some(candidate),
                        Err(err) => {
                            tracing::warn!("excluding repository from import: {err}");
                            skipped += 1;
                            None
                        }
                    })
                    .collect();
                self.selected.clear();
                self.step = ImportStep::Select;

                if skipped > 0 {
                    vec![Notification::error(format!(
                        "Skipped {skipped} repositories with incomplete data"
                    ))]
                } else {
                    Vec::new()
                }
            }
            Err(err) => vec![Notification::error(err.to_string())],
        }
    }

    pub fn toggle(&mut self, index: usize) {
        if self.step() != ImportStep::Select || index >= self.candidates.len() {
            return;
        }
        if !self.selected.remove(&index) {
            self.selected.insert(index);
        }
    }

    pub fn select_all(&mut self) {
        if self.step() != ImportStep::Select {
            return;
        }
        self.selected = (0..self.candidates.len()).collect();
    }

    pub fn select_none(&mut self) {
        if self.step() != ImportStep::Select {
            return;
        }
        self.selected.clear();
    }

    /// Return to the input step, discarding the selection set.
    pub fn back(&mut self) {
        if self.step() != ImportStep::Select {
            return;
        }
        self.selected.clear();
        self.step = ImportStep::Input;
    }

    /// Persist every selected candidate, in fetched-list order, and enter
    /// review.
    ///
    /// A mid-batch failure reports an error and stays on the selection step;
    /// items created before the failure remain persisted.
    #[instrument(name = "ImportWorkflow::confirm", skip(self, projects))]
    pub async fn confirm(
        &mut self,
        owner: UserId,
        projects: &dyn ProjectRepository,
    ) -> Vec<Notification> {
        if self.step() != ImportStep::Select {
            return Vec::new();
        }
        if self.selected.is_empty() {
            return vec![Notification::error("Select at least one repository")];
        }

        let total = self.selected.len();
        let mut created = Vec::with_capacity(total);
        // BTreeSet iterates in ascending index order: list order is
        // authoritative, selection order is not tracked.
        for index in self.selected.iter().copied() {
            let draft = self.candidates[index].draft.clone().normalized();
            match projects.create_project(owner, draft).await {
                Ok(project) => created.push(project),
                Err(err) => {
                    tracing::error!(
                        "bulk import failed after {} of {total} projects: {err}",
                        created.len()
                    );
                    return vec![Notification::error(format!(
                        "Failed to import projects: {} of {total} were created",
                        created.len()
                    ))];
                }
            }
        }

        self.draft = created.first().map(ReviewDraft::from);
        self.imported = created;
        self.cursor = 0;
        self.step = ImportStep::Review;
        Vec::new()
    }

    /// Replace the review buffer for the project under the cursor.
    pub fn update_draft(&mut self, draft: ReviewDraft) {
        if self.step() != ImportStep::Review {
            return;
        }
        self.draft = Some(draft.normalized());
    }

    /// Persist the review buffer over the current project, then advance.
    ///
    /// A save failure is reported but still advances: skipping is always
    /// safe since the record exists from the bulk step.
    #[instrument(name = "ImportWorkflow::save_and_next", skip(self, projects))]
    pub async fn save_and_next(&mut self, projects: &dyn ProjectRepository) -> Vec<Notification> {
        if self.step() != ImportStep::Review {
            return Vec::new();
        }

        let mut notifications = Vec::new();
        if let (Some(project), Some(draft)) = (self.imported.get(self.cursor), self.draft.as_ref())
        {
            match projects.update_project(project.id, draft.apply_to(project)).await {
                Ok(updated) => self.imported[self.cursor] = updated,
                Err(err) => {
                    tracing::error!("failed to save review edits for {}: {err}", project.id);
                    notifications.push(Notification::error("Failed to save changes"));
                }
            }
        }

        notifications.extend(self.advance());
        notifications
    }

    /// Advance past the current project without persisting edits.
    pub fn skip(&mut self) -> Vec<Notification> {
        if self.step() != ImportStep::Review {
            return Vec::new();
        }
        self.advance()
    }

    /// Close the workflow from any cursor position; unreviewed projects keep
    /// their import-time defaults.
    pub fn finish_early(&mut self) -> Vec<Notification> {
        if self.step() != ImportStep::Review {
            return Vec::new();
        }
        self.close()
    }

    fn advance(&mut self) -> Vec<Notification> {
        if self.cursor + 1 < self.imported.len() {
            self.cursor += 1;
            self.draft = Some(ReviewDraft::from(&self.imported[self.cursor]));
            Vec::new()
        } else {
            self.close()
        }
    }

    fn close(&mut self) -> Vec<Notification> {
        self.step = ImportStep::Closed;
        self.draft = None;
        // The completion count covers every imported project, reviewed or
        // not.
        let total = self.imported.len();
        let plural = if total == 1 { "" } else { "s" };
        vec![Notification::success(format!(
            "Imported {total} project{plural}!"
        ))]
    }

    /// Snapshot for the surrounding UI.
    pub fn view(&self) -> WorkflowView {
        let review = (self.step() == ImportStep::Review)
            .then(|| self.imported.get(self.cursor))
            .flatten()
            .map(|project| ReviewView {
                position: self.cursor + 1,
                total: self.imported.len(),
                project: project.clone(),
                draft: self
                    .draft
                    .clone()
                    .unwrap_or_else(|| ReviewDraft::from(project)),
            });

        WorkflowView {
            step: self.step(),
            candidates: self
                .candidates
                .iter()
                .enumerate()
                .map(|(index, candidate)| CandidateView {
                    candidate: candidate.clone(),
                    selected: self.selected.contains(&index),
                })
                .collect(),
            selected_count: self.selected.len(),
            imported_total: self.imported.len(),
            review,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowView {
    pub step: ImportStep,
    pub candidates: Vec<CandidateView>,
    pub selected_count: usize,
    pub imported_total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review: Option<ReviewView>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateView {
    #[serde(flatten)]
    pub candidate: Candidate,
    pub selected: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewView {
    pub position: usize,
    pub total: usize,
    pub project: Project,
    pub draft: ReviewDraft,
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::domain::import::source::SourceError;
    use crate::domain::ProjectId;
    use crate::repositories::{MemoryStore, RepositoryError};

    fn make_repo(name: &str, stars: i64) -> github::Repo {
        github::Repo {
            name: name.to_string(),
            description: Some(format!("{name} description")),
            language: Some("Rust".into()),
            topics: vec![],
            stargazers_count: stars,
            forks_count: 0,
            fork: false,
            archived: false,
            homepage: None,
            html_url: format!("https://github.com/priya/{name}"),
            created_at: Utc.with_ymd_and_hms(2022, 6, 1, 12, 0, 0).unwrap(),
            pushed_at: None,
        }
    }

    struct StubSource {
        repos: Vec<github::Repo>,
    }

    #[async_trait]
    impl RepoSource for StubSource {
        async fn list_public_repos(
            &self,
            _account: &str,
        ) -> Result<Vec<github::Repo>, SourceError> {
            Ok(self.repos.clone())
        }
    }

    struct FailingSource;

    #[async_trait]
    impl RepoSource for FailingSource {
        async fn list_public_repos(
            &self,
            _account: &str,
        ) -> Result<Vec<github::Repo>, SourceError> {
            Err(SourceError::AccountNotFound)
        }
    }

    /// Delegates to a memory store but fails the nth create and, optionally,
    /// every update.
    struct FlakyRepo {
        inner: MemoryStore,
        fail_create_at: Option<usize>,
        fail_updates: bool,
        creates: AtomicUsize,
    }

    impl FlakyRepo {
        fn new(fail_create_at: Option<usize>, fail_updates: bool) -> Self {
            Self {
                inner: MemoryStore::new(),
                fail_create_at,
                fail_updates,
                creates: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ProjectRepository for FlakyRepo {
        async fn create_project(
            &self,
            owner: UserId,
            data: NewProject,
        ) -> Result<Project, RepositoryError> {
            let n = self.creates.fetch_add(1, Ordering::SeqCst);
            if Some(n) == self.fail_create_at {
                return Err(RepositoryError::DatabaseError(sqlx::Error::PoolClosed));
            }
            self.inner.create_project(owner, data).await
        }

        async fn update_project(
            &self,
            id: ProjectId,
            data: NewProject,
        ) -> Result<Project, RepositoryError> {
            if self.fail_updates {
                return Err(RepositoryError::DatabaseError(sqlx::Error::PoolClosed));
            }
            self.inner.update_project(id, data).await
        }

        async fn get_project(&self, id: ProjectId) -> Result<Project, RepositoryError> {
            self.inner.get_project(id).await
        }

        async fn projects_for_owner(
            &self,
            owner: UserId,
        ) -> Result<Vec<Project>, RepositoryError> {
            self.inner.projects_for_owner(owner).await
        }

        async fn delete_project(&self, id: ProjectId) -> Result<(), RepositoryError> {
            self.inner.delete_project(id).await
        }
    }

    fn owner() -> UserId {
        UserId::new(1)
    }

    async fn workflow_in_select(repos: Vec<github::Repo>) -> ImportWorkflow {
        let mut workflow = ImportWorkflow::new();
        let source = StubSource { repos };
        let notes = workflow.fetch("priya", &source).await;
        assert!(notes.is_empty());
        assert_eq!(workflow.step(), ImportStep::Select);
        workflow
    }

    #[tokio::test]
    async fn partial_selection_imports_in_list_order() {
        let store = MemoryStore::new();
        let mut workflow = workflow_in_select(vec![
            make_repo("alpha", 0),
            make_repo("beta", 0),
            make_repo("gamma", 0),
        ])
        .await;

        workflow.toggle(0);
        workflow.toggle(2);
        let notes = workflow.confirm(owner(), &store).await;
        assert!(notes.is_empty());

        assert_eq!(workflow.step(), ImportStep::Review);
        assert_eq!(workflow.imported().len(), 2);
        assert_eq!(workflow.imported()[0].name, "alpha");
        assert_eq!(workflow.imported()[1].name, "gamma");

        // Review presents alpha first; skip it, then save gamma with edits.
        let view = workflow.view();
        assert_eq!(view.review.as_ref().unwrap().project.name, "alpha");

        assert!(workflow.skip().is_empty());
        assert_eq!(workflow.view().review.unwrap().project.name, "gamma");

        let mut draft = ReviewDraft::from(&workflow.imported()[1]);
        draft.current_stage = Stage::Paying;
        draft.outcome = "10k users".into();
        workflow.update_draft(draft);

        let notes = workflow.save_and_next(&store).await;
        assert_eq!(workflow.step(), ImportStep::Closed);
        assert_eq!(notes, vec![Notification::success("Imported 2 projects!")]);

        let persisted = store.projects_for_owner(owner()).await.unwrap();
        assert_eq!(persisted.len(), 2);
        assert_eq!(persisted[0].current_stage, Stage::Idea);
        assert_eq!(persisted[1].current_stage, Stage::Paying);
        assert_eq!(persisted[1].outcome, "10k users");
    }

    #[tokio::test]
    async fn select_all_on_empty_list_selects_nothing() {
        let store = MemoryStore::new();
        let mut workflow = workflow_in_select(vec![]).await;

        workflow.select_all();
        assert_eq!(workflow.view().selected_count, 0);

        let notes = workflow.confirm(owner(), &store).await;
        assert_eq!(
            notes,
            vec![Notification::error("Select at least one repository")]
        );
        assert_eq!(workflow.step(), ImportStep::Select);
        assert!(store.projects_for_owner(owner()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn finish_early_reports_full_count_and_keeps_defaults() {
        let store = MemoryStore::new();
        let mut workflow = workflow_in_select(vec![
            make_repo("alpha", 0),
            make_repo("beta", 0),
            make_repo("gamma", 0),
        ])
        .await;

        workflow.select_all();
        workflow.confirm(owner(), &store).await;

        workflow.skip();
        let notes = workflow.finish_early();
        assert_eq!(workflow.step(), ImportStep::Closed);
        assert_eq!(notes, vec![Notification::success("Imported 3 projects!")]);

        // The unreviewed projects keep their import-time field values.
        let persisted = store.projects_for_owner(owner()).await.unwrap();
        for project in &persisted {
            assert_eq!(project.role, Role::Solo);
            assert!(project.outcome.is_empty());
        }
    }

    #[tokio::test]
    async fn fetch_failure_stays_on_input() {
        let mut workflow = ImportWorkflow::new();
        let notes = workflow.fetch("nobody", &FailingSource).await;

        assert_eq!(notes, vec![Notification::error("Account not found")]);
        assert_eq!(workflow.step(), ImportStep::Input);
    }

    #[tokio::test]
    async fn blank_account_is_ignored() {
        let mut workflow = ImportWorkflow::new();
        let notes = workflow.fetch("   ", &FailingSource).await;
        assert!(notes.is_empty());
        assert_eq!(workflow.step(), ImportStep::Input);
    }

    #[tokio::test]
    async fn mid_batch_failure_keeps_step_and_earlier_projects() {
        let repo = FlakyRepo::new(Some(1), false);
        let mut workflow =
            workflow_in_select(vec![make_repo("alpha", 0), make_repo("beta", 0)]).await;

        workflow.select_all();
        let notes = workflow.confirm(owner(), &repo).await;

        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].severity, Severity::Error);
        assert_eq!(workflow.step(), ImportStep::Select);
        assert!(workflow.imported().is_empty());

        // The first create landed before the failure and stays persisted.
        let persisted = repo.inner.projects_for_owner(owner()).await.unwrap();
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted[0].name, "alpha");
    }

    #[tokio::test]
    async fn review_save_failure_still_advances() {
        let repo = FlakyRepo::new(None, true);
        let mut workflow =
            workflow_in_select(vec![make_repo("alpha", 0), make_repo("beta", 0)]).await;

        workflow.select_all();
        workflow.confirm(owner(), &repo).await;

        let notes = workflow.save_and_next(&repo).await;
        assert_eq!(notes, vec![Notification::error("Failed to save changes")]);
        assert_eq!(workflow.step(), ImportStep::Review);
        assert_eq!(workflow.view().review.unwrap().project.name, "beta");
    }

    #[tokio::test]
    async fn back_discards_selection() {
        let mut workflow =
            workflow_in_select(vec![make_repo("alpha", 0), make_repo("beta", 0)]).await;

        workflow.toggle(1);
        workflow.back();
        assert_eq!(workflow.step(), ImportStep::Input);

        // Re-fetching starts from a clean selection.
        let source = StubSource {
            repos: vec![make_repo("alpha", 0)],
        };
        workflow.fetch("priya", &source).await;
        assert_eq!(workflow.view().selected_count, 0);
        assert_eq!(workflow.view().candidates.len(), 1);
    }

    #[tokio::test]
    async fn malformed_records_are_excluded_not_fatal() {
        let mut nameless = make_repo("", 0);
        nameless.name = String::new();

        let mut workflow = ImportWorkflow::new();
        let source = StubSource {
            repos: vec![make_repo("alpha", 0), nameless],
        };
        let notes = workflow.fetch("priya", &source).await;

        assert_eq!(workflow.step(), ImportStep::Select);
        assert_eq!(workflow.view().candidates.len(), 1);
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].severity, Severity::Error);
    }

    #[test]
    fn view_serializes_with_camel_case_keys() {
        let view = ImportWorkflow::new().view();
        let value = serde_json::to_value(view).unwrap();

        assert_eq!(value["step"], "input");
        assert_eq!(value["selectedCount"], 0);
        assert_eq!(value["importedTotal"], 0);
        assert!(value.get("review").is_none());
    }

    #[tokio::test]
    async fn draft_normalization_applies_ongoing_invariant() {
        let store = MemoryStore::new();
        let mut workflow = workflow_in_select(vec![make_repo("alpha", 0)]).await;
        workflow.select_all();
        workflow.confirm(owner(), &store).await;

        let mut draft = ReviewDraft::from(&workflow.imported()[0]);
        draft.ongoing = true;
        draft.end_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 1);
        workflow.update_draft(draft);
        workflow.save_and_next(&store).await;

        let persisted = store.projects_for_owner(owner()).await.unwrap();
        assert!(persisted[0].ongoing);
        assert!(persisted[0].end_date.is_none());
    }
}
