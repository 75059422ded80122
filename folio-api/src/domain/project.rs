use chrono::NaiveDate;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use super::ids::{ProjectId, UserId};

/// Lifecycle stage of a project.
///
/// The ten values are ordered: aggregate stats ask "reached X or later", so
/// `Ord` follows declaration order. The string forms (snake_case) are used on
/// the wire and in the database.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Stage {
    Idea,
    Mvp,
    Launch,
    Believers,
    Users,
    Paying,
    Funded,
    Revenue,
    Acquired,
    Ipo,
}

/// The maker's relationship to a project.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    Solo,
    Cofounder,
    EarlyTeam,
    Contributor,
}

/// A persisted project ("make"), owned by exactly one profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: ProjectId,
    pub owner_id: UserId,
    pub name: String,
    pub one_liner: String,
    pub role: Role,
    pub current_stage: Stage,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub ongoing: bool,
    pub domains: Vec<String>,
    pub links: Vec<String>,
    pub outcome: String,
}

/// The writable fields of a project, used for both creation and full update.
///
/// `normalized` enforces the field invariants and is applied on every write
/// path: an ongoing project has no end date, and domains/links carry no
/// duplicates (first occurrence wins, order preserved).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProject {
    pub name: String,
    pub one_liner: String,
    pub role: Role,
    pub current_stage: Stage,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    pub ongoing: bool,
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(default)]
    pub links: Vec<String>,
    #[serde(default)]
    pub outcome: String,
}

impl NewProject {
    pub fn normalized(mut self) -> Self {
        if self.ongoing {
            self.end_date = None;
        }
        self.domains = self.domains.into_iter().unique().collect();
        self.links = self.links.into_iter().unique().collect();
        self
    }
}

impl From<&Project> for NewProject {
    fn from(project: &Project) -> Self {
        Self {
            name: project.name.clone(),
            one_liner: project.one_liner.clone(),
            role: project.role,
            current_stage: project.current_stage,
            start_date: project.start_date,
            end_date: project.end_date,
            ongoing: project.ongoing,
            domains: project.domains.clone(),
            links: project.links.clone(),
            outcome: project.outcome.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn stage_order_follows_maturity() {
        assert!(Stage::Idea < Stage::Mvp);
        assert!(Stage::Launch < Stage::Believers);
        assert!(Stage::Users < Stage::Paying);
        assert!(Stage::Acquired < Stage::Ipo);

        let ranks: Vec<Stage> = Stage::iter().collect();
        assert_eq!(ranks.len(), 10);
        assert!(ranks.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn stage_string_forms_round_trip() {
        for stage in Stage::iter() {
            let parsed: Stage = stage.to_string().parse().unwrap();
            assert_eq!(parsed, stage);
        }
        assert_eq!("early_team".parse::<Role>().unwrap(), Role::EarlyTeam);
        assert_eq!(Role::EarlyTeam.to_string(), "early_team");
    }

    #[test]
    fn normalization_clears_end_date_when_ongoing() {
        let data = NewProject {
            name: "devlog".into(),
            one_liner: "work journals".into(),
            role: Role::Solo,
            current_stage: Stage::Mvp,
            start_date: NaiveDate::from_ymd_opt(2021, 3, 14),
            end_date: NaiveDate::from_ymd_opt(2022, 1, 1),
            ongoing: true,
            domains: vec![],
            links: vec![],
            outcome: String::new(),
        }
        .normalized();

        assert!(data.end_date.is_none());
    }

    #[test]
    fn normalization_dedups_preserving_order() {
        let data = NewProject {
            name: "devlog".into(),
            one_liner: "work journals".into(),
            role: Role::Solo,
            current_stage: Stage::Mvp,
            start_date: None,
            end_date: None,
            ongoing: false,
            domains: vec!["cli".into(), "rust".into(), "cli".into()],
            links: vec![
                "https://github.com/p/devlog".into(),
                "https://devlog.dev".into(),
                "https://github.com/p/devlog".into(),
            ],
            outcome: String::new(),
        }
        .normalized();

        assert_eq!(data.domains, vec!["cli", "rust"]);
        assert_eq!(
            data.links,
            vec!["https://github.com/p/devlog", "https://devlog.dev"]
        );
    }
}
