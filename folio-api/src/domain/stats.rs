use serde::Serialize;
use strum::IntoEnumIterator;

use super::project::{Project, Role, Stage};

/// Aggregate outcome counters shown on the public profile.
///
/// Computed from the project list on demand, never stored. "Reached X" means
/// the current stage is X or later in the stage order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeStats {
    pub things_made: usize,
    pub reached_users: usize,
    pub reached_paying: usize,
    pub acquisitions: usize,
}

pub fn outcome_stats(projects: &[Project]) -> OutcomeStats {
    OutcomeStats {
        things_made: projects.len(),
        reached_users: projects
            .iter()
            .filter(|p| p.current_stage >= Stage::Users)
            .count(),
        reached_paying: projects
            .iter()
            .filter(|p| p.current_stage >= Stage::Paying)
            .count(),
        acquisitions: projects
            .iter()
            .filter(|p| p.current_stage == Stage::Acquired)
            .count(),
    }
}

/// One slice of the role breakdown bar. Roles without projects are omitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleShare {
    pub role: Role,
    pub count: usize,
    pub percentage: u32,
}

pub fn role_breakdown(projects: &[Project]) -> Vec<RoleShare> {
    if projects.is_empty() {
        return Vec::new();
    }

    Role::iter()
        .map(|role| {
            let count = projects.iter().filter(|p| p.role == role).count();
            RoleShare {
                role,
                count,
                percentage: (count as f64 / projects.len() as f64 * 100.0).round() as u32,
            }
        })
        .filter(|share| share.count > 0)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ids::{ProjectId, UserId};

    fn make_project(id: i32, role: Role, stage: Stage) -> Project {
        Project {
            id: ProjectId::new(id),
            owner_id: UserId::new(1),
            name: format!("project-{id}"),
            one_liner: String::new(),
            role,
            current_stage: stage,
            start_date: None,
            end_date: None,
            ongoing: true,
            domains: vec![],
            links: vec![],
            outcome: String::new(),
        }
    }

    #[test]
    fn outcome_stats_use_stage_rank_not_equality() {
        let projects = vec![
            make_project(1, Role::Solo, Stage::Idea),
            make_project(2, Role::Solo, Stage::Users),
            make_project(3, Role::Cofounder, Stage::Acquired),
            make_project(4, Role::Cofounder, Stage::Funded),
            make_project(5, Role::Solo, Stage::Believers),
        ];

        let stats = outcome_stats(&projects);
        assert_eq!(stats.things_made, 5);
        // users, acquired and funded all sit at or above the users stage
        assert_eq!(stats.reached_users, 3);
        assert_eq!(stats.reached_paying, 2);
        assert_eq!(stats.acquisitions, 1);
    }

    #[test]
    fn role_breakdown_omits_empty_roles() {
        let projects = vec![
            make_project(1, Role::Solo, Stage::Idea),
            make_project(2, Role::Solo, Stage::Mvp),
            make_project(3, Role::Cofounder, Stage::Idea),
            make_project(4, Role::Solo, Stage::Idea),
        ];

        let shares = role_breakdown(&projects);
        assert_eq!(shares.len(), 2);
        assert_eq!(shares[0].role, Role::Solo);
        assert_eq!(shares[0].count, 3);
        assert_eq!(shares[0].percentage, 75);
        assert_eq!(shares[1].role, Role::Cofounder);
        assert_eq!(shares[1].percentage, 25);
    }

    #[test]
    fn role_breakdown_of_nothing_is_empty() {
        assert!(role_breakdown(&[]).is_empty());
    }
}
