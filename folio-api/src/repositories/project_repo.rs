use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;

use crate::domain::{NewProject, Project, ProjectId, UserId};

use super::repo_error::RepositoryError;

/// Storage port for projects.
///
/// Each call is atomic from the workflow's perspective; implementations make
/// no further guarantees (in particular, no cross-call transactions).
#[async_trait]
pub trait ProjectRepository: Send + Sync {
    async fn create_project(
        &self,
        owner: UserId,
        data: NewProject,
    ) -> Result<Project, RepositoryError>;

    /// Replace every writable field of an existing project.
    async fn update_project(
        &self,
        id: ProjectId,
        data: NewProject,
    ) -> Result<Project, RepositoryError>;

    async fn get_project(&self, id: ProjectId) -> Result<Project, RepositoryError>;

    /// All projects owned by a profile, in stable creation order.
    async fn projects_for_owner(&self, owner: UserId) -> Result<Vec<Project>, RepositoryError>;

    async fn delete_project(&self, id: ProjectId) -> Result<(), RepositoryError>;
}

pub struct PgProjectRepository {
    pool: PgPool,
}

impl PgProjectRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const PROJECT_COLUMNS: &str = "id, owner_id, name, one_liner, role, current_stage, \
     start_date, end_date, ongoing, domains, links, outcome";

#[async_trait]
impl ProjectRepository for PgProjectRepository {
    async fn create_project(
        &self,
        owner: UserId,
        data: NewProject,
    ) -> Result<Project, RepositoryError> {
        let data = data.normalized();
        let row: ProjectRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO projects
                (owner_id, name, one_liner, role, current_stage,
                 start_date, end_date, ongoing, domains, links, outcome)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {PROJECT_COLUMNS}
            "#
        ))
        .bind(owner.as_i32())
        .bind(&data.name)
        .bind(&data.one_liner)
        .bind(data.role.to_string())
        .bind(data.current_stage.to_string())
        .bind(data.start_date)
        .bind(data.end_date)
        .bind(data.ongoing)
        .bind(&data.domains)
        .bind(&data.links)
        .bind(&data.outcome)
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn update_project(
        &self,
        id: ProjectId,
        data: NewProject,
    ) -> Result<Project, RepositoryError> {
        let data = data.normalized();
        let row: Option<ProjectRow> = sqlx::query_as(&format!(
            r#"
            UPDATE projects
            SET name = $2,
                one_liner = $3,
                role = $4,
                current_stage = $5,
                start_date = $6,
                end_date = $7,
                ongoing = $8,
                domains = $9,
                links = $10,
                outcome = $11
            WHERE id = $1
            RETURNING {PROJECT_COLUMNS}
            "#
        ))
        .bind(id.as_i32())
        .bind(&data.name)
        .bind(&data.one_liner)
        .bind(data.role.to_string())
        .bind(data.current_stage.to_string())
        .bind(data.start_date)
        .bind(data.end_date)
        .bind(data.ongoing)
        .bind(&data.domains)
        .bind(&data.links)
        .bind(&data.outcome)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or_else(|| RepositoryError::NotFound(format!("project {id}")))?
            .try_into()
    }

    async fn get_project(&self, id: ProjectId) -> Result<Project, RepositoryError> {
        let row: Option<ProjectRow> = sqlx::query_as(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE id = $1"
        ))
        .bind(id.as_i32())
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or_else(|| RepositoryError::NotFound(format!("project {id}")))?
            .try_into()
    }

    async fn projects_for_owner(&self, owner: UserId) -> Result<Vec<Project>, RepositoryError> {
        let rows: Vec<ProjectRow> = sqlx::query_as(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE owner_id = $1 ORDER BY id"
        ))
        .bind(owner.as_i32())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn delete_project(&self, id: ProjectId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id.as_i32())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("project {id}")));
        }
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct ProjectRow {
    id: i32,
    owner_id: i32,
    name: String,
    one_liner: String,
    role: String,
    current_stage: String,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    ongoing: bool,
    domains: Vec<String>,
    links: Vec<String>,
    outcome: String,
}

impl TryFrom<ProjectRow> for Project {
    type Error = RepositoryError;

    fn try_from(row: ProjectRow) -> Result<Self, Self::Error> {
        Ok(Project {
            id: ProjectId::new(row.id),
            owner_id: UserId::new(row.owner_id),
            name: row.name,
            one_liner: row.one_liner,
            role: row
                .role
                .parse()
                .map_err(|_| RepositoryError::InvalidData(format!("role '{}'", row.role)))?,
            current_stage: row.current_stage.parse().map_err(|_| {
                RepositoryError::InvalidData(format!("stage '{}'", row.current_stage))
            })?,
            start_date: row.start_date,
            end_date: row.end_date,
            ongoing: row.ongoing,
            domains: row.domains,
            links: row.links,
            outcome: row.outcome,
        })
    }
}
