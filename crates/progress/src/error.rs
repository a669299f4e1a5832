//! Errors for tracker operations.

use goalie_core::{CoreError, GoalId, MilestoneId};
use goalie_storage::StorageError;

/// Result alias for tracker operations.
pub type Result<T> = std::result::Result<T, ProgressError>;

/// Errors raised by the goal and activity trackers.
#[derive(Debug, thiserror::Error)]
pub enum ProgressError {
    /// A model invariant was violated
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The storage backend failed
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Goal does not exist
    #[error("goal not found: {0}")]
    GoalNotFound(GoalId),

    /// Milestone does not exist on the goal
    #[error("milestone {milestone} not found on goal {goal}")]
    MilestoneNotFound {
        /// Goal searched
        goal: GoalId,
        /// Missing milestone
        milestone: MilestoneId,
    },

    /// The goal holds milestones without text that must be fixed first
    #[error("goal {goal} has milestones without text ({}); fix or delete them first", .ids.len())]
    CorruptedMilestones {
        /// Affected goal
        goal: GoalId,
        /// Milestones missing text
        ids: Vec<MilestoneId>,
    },

    /// Configuration out of range
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
