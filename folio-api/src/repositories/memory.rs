use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::domain::{NewProject, Profile, ProfileUpdate, Project, ProjectId, UserId};

use super::profile_repo::{NewProfile, ProfileRepository};
use super::project_repo::ProjectRepository;
use super::repo_error::RepositoryError;

/// In-process storage backing both ports.
///
/// This is the local fallback selected by `storage.backend = memory` when no
/// database is configured; everything lives for the lifetime of the process.
/// It is also the repository used by tests.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    profiles: HashMap<i32, StoredProfile>,
    // BTreeMap keeps project iteration in id (creation) order.
    projects: BTreeMap<i32, Project>,
    next_profile_id: i32,
    next_project_id: i32,
}

struct StoredProfile {
    profile: Profile,
    api_token: String,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::RwLockWriteGuard<'_, Inner> {
        // Lock poisoning only happens if a writer panicked; propagate it.
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ProjectRepository for MemoryStore {
    async fn create_project(
        &self,
        owner: UserId,
        data: NewProject,
    ) -> Result<Project, RepositoryError> {
        let data = data.normalized();
        let mut inner = self.lock();
        inner.next_project_id += 1;
        let id = inner.next_project_id;

        let project = Project {
            id: ProjectId::new(id),
            owner_id: owner,
            name: data.name,
            one_liner: data.one_liner,
            role: data.role,
            current_stage: data.current_stage,
            start_date: data.start_date,
            end_date: data.end_date,
            ongoing: data.ongoing,
            domains: data.domains,
            links: data.links,
            outcome: data.outcome,
        };
        inner.projects.insert(id, project.clone());
        Ok(project)
    }

    async fn update_project(
        &self,
        id: ProjectId,
        data: NewProject,
    ) -> Result<Project, RepositoryError> {
        let data = data.normalized();
        let mut inner = self.lock();
        let project = inner
            .projects
            .get_mut(&id.as_i32())
            .ok_or_else(|| RepositoryError::NotFound(format!("project {id}")))?;

        project.name = data.name;
        project.one_liner = data.one_liner;
        project.role = data.role;
        project.current_stage = data.current_stage;
        project.start_date = data.start_date;
        project.end_date = data.end_date;
        project.ongoing = data.ongoing;
        project.domains = data.domains;
        project.links = data.links;
        project.outcome = data.outcome;

        Ok(project.clone())
    }

    async fn get_project(&self, id: ProjectId) -> Result<Project, RepositoryError> {
        self.read()
            .projects
            .get(&id.as_i32())
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(format!("project {id}")))
    }

    async fn projects_for_owner(&self, owner: UserId) -> Result<Vec<Project>, RepositoryError> {
        Ok(self
            .read()
            .projects
            .values()
            .filter(|p| p.owner_id == owner)
            .cloned()
            .collect())
    }

    async fn delete_project(&self, id: ProjectId) -> Result<(), RepositoryError> {
        self.lock()
            .projects
            .remove(&id.as_i32())
            .map(|_| ())
            .ok_or_else(|| RepositoryError::NotFound(format!("project {id}")))
    }
}

#[async_trait]
impl ProfileRepository for MemoryStore {
    async fn get_profile(&self, id: UserId) -> Result<Profile, RepositoryError> {
        self.read()
            .profiles
            .get(&id.as_i32())
            .map(|stored| stored.profile.clone())
            .ok_or_else(|| RepositoryError::NotFound(format!("profile {id}")))
    }

    async fn profile_by_username(&self, username: &str) -> Result<Profile, RepositoryError> {
        self.read()
            .profiles
            .values()
            .find(|stored| stored.profile.username == username)
            .map(|stored| stored.profile.clone())
            .ok_or_else(|| RepositoryError::NotFound(format!("profile '{username}'")))
    }

    async fn profile_by_token(&self, token: &str) -> Result<Profile, RepositoryError> {
        self.read()
            .profiles
            .values()
            .find(|stored| stored.api_token == token)
            .map(|stored| stored.profile.clone())
            .ok_or_else(|| RepositoryError::NotFound("no profile for token".into()))
    }

    async fn update_profile(
        &self,
        id: UserId,
        data: ProfileUpdate,
    ) -> Result<Profile, RepositoryError> {
        let mut inner = self.lock();
        let stored = inner
            .profiles
            .get_mut(&id.as_i32())
            .ok_or_else(|| RepositoryError::NotFound(format!("profile {id}")))?;

        stored.profile.name = data.name;
        stored.profile.bio = data.bio;
        stored.profile.first_make = data.first_make;
        stored.profile.domains = data.domains;
        stored.profile.today_making = data.today_making;
        stored.profile.socials = data.socials;
        stored.profile.embed_feed = data.embed_feed;

        Ok(stored.profile.clone())
    }

    async fn upsert_profile(&self, data: NewProfile) -> Result<Profile, RepositoryError> {
        let mut inner = self.lock();

        if let Some(stored) = inner
            .profiles
            .values_mut()
            .find(|stored| stored.profile.username == data.username)
        {
            stored.api_token = data.api_token;
            return Ok(stored.profile.clone());
        }

        inner.next_profile_id += 1;
        let id = inner.next_profile_id;
        let profile = Profile {
            id: UserId::new(id),
            username: data.username,
            name: String::new(),
            bio: String::new(),
            first_make: Default::default(),
            domains: Vec::new(),
            today_making: String::new(),
            socials: Default::default(),
            embed_feed: Default::default(),
        };
        inner.profiles.insert(
            id,
            StoredProfile {
                profile: profile.clone(),
                api_token: data.api_token,
            },
        );
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Role, Stage};

    fn draft(name: &str) -> NewProject {
        NewProject {
            name: name.to_string(),
            one_liner: format!("{name} one-liner"),
            role: Role::Solo,
            current_stage: Stage::Idea,
            start_date: None,
            end_date: None,
            ongoing: true,
            domains: vec![],
            links: vec![],
            outcome: String::new(),
        }
    }

    #[tokio::test]
    async fn projects_list_in_creation_order() {
        let store = MemoryStore::new();
        let owner = UserId::new(1);

        for name in ["first", "second", "third"] {
            store.create_project(owner, draft(name)).await.unwrap();
        }
        store
            .create_project(UserId::new(2), draft("other"))
            .await
            .unwrap();

        let projects = store.projects_for_owner(owner).await.unwrap();
        let names: Vec<&str> = projects.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn update_of_missing_project_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .update_project(ProjectId::new(99), draft("ghost"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound(_)));
    }

    #[tokio::test]
    async fn create_applies_field_invariants() {
        let store = MemoryStore::new();
        let mut data = draft("devlog");
        data.ongoing = true;
        data.end_date = chrono::NaiveDate::from_ymd_opt(2024, 5, 1);
        data.links = vec!["https://a.dev".into(), "https://a.dev".into()];

        let project = store.create_project(UserId::new(1), data).await.unwrap();
        assert!(project.end_date.is_none());
        assert_eq!(project.links, vec!["https://a.dev"]);
    }

    #[tokio::test]
    async fn delete_removes_exactly_one() {
        let store = MemoryStore::new();
        let owner = UserId::new(1);
        let a = store.create_project(owner, draft("a")).await.unwrap();
        store.create_project(owner, draft("b")).await.unwrap();

        store.delete_project(a.id).await.unwrap();
        let remaining = store.projects_for_owner(owner).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].name, "b");

        let err = store.delete_project(a.id).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound(_)));
    }

    #[tokio::test]
    async fn profile_token_lookup_and_rotation() {
        let store = MemoryStore::new();
        let profile = store
            .upsert_profile(NewProfile::new("priya", "token-1"))
            .await
            .unwrap();

        let found = store.profile_by_token("token-1").await.unwrap();
        assert_eq!(found.id, profile.id);

        // Upserting the same username rotates the token, keeping the id.
        let again = store
            .upsert_profile(NewProfile::new("priya", "token-2"))
            .await
            .unwrap();
        assert_eq!(again.id, profile.id);
        assert!(store.profile_by_token("token-1").await.is_err());
        assert!(store.profile_by_token("token-2").await.is_ok());
    }

    #[tokio::test]
    async fn profile_update_keeps_username() {
        let store = MemoryStore::new();
        let profile = store
            .upsert_profile(NewProfile::new("priya", "token"))
            .await
            .unwrap();

        let updated = store
            .update_profile(
                profile.id,
                ProfileUpdate {
                    name: "Priya Sharma".into(),
                    bio: "I make things".into(),
                    first_make: Default::default(),
                    domains: vec!["apps".into()],
                    today_making: "a CLI tool".into(),
                    socials: Default::default(),
                    embed_feed: Default::default(),
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.username, "priya");
        assert_eq!(updated.name, "Priya Sharma");
        assert_eq!(updated.domains, vec!["apps"]);
    }
}
