//! Model validation errors.

use crate::id::MilestoneId;

/// Result alias for model operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised when a model invariant would be violated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    /// Goal title was blank
    #[error("goal title is required")]
    EmptyTitle,

    /// Milestone text was blank
    #[error("milestone text cannot be empty")]
    EmptyMilestoneText,

    /// Milestone does not belong to the goal
    #[error("unknown milestone: {0}")]
    UnknownMilestone(MilestoneId),
}
