//! The GitHub bulk-import core: stage classifier, candidate mapper and the
//! sequential import/review workflow.

mod classifier;
mod mapper;
mod source;
mod workflow;

pub use classifier::infer_stage;
pub use mapper::{map_repo, Candidate, MapError, RepoMetrics};
pub use source::{RepoSource, SourceError};
pub use workflow::{
    CandidateView, ImportStep, ImportWorkflow, Notification, ReviewDraft, ReviewView, Severity,
    WorkflowView,
};
