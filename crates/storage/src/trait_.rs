//! Storage trait abstraction.

use async_trait::async_trait;
use goalie_core::{ActivityRecord, Day, Goal, GoalId, StreakSummary};

/// Error type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Storage abstraction for Goalie data.
///
/// Milestones are embedded in their goal, so saving or deleting a goal
/// covers its milestones too. The activity log is append-only.
#[async_trait]
pub trait Storage: Send + Sync {
    // === Goal operations ===

    /// Save a goal (create or update).
    async fn save_goal(&mut self, goal: &Goal) -> Result<()>;

    /// Load a goal by ID.
    async fn load_goal(&self, id: GoalId) -> Result<Option<Goal>>;

    /// List all goals, newest first.
    async fn list_goals(&self) -> Result<Vec<Goal>>;

    /// Delete a goal with its milestones. Returns whether it existed.
    async fn delete_goal(&mut self, id: GoalId) -> Result<bool>;

    // === Activity log ===

    /// Append an entry to the activity log.
    async fn append_activity(&mut self, record: &ActivityRecord) -> Result<()>;

    /// Whether any activity was logged on `day`.
    async fn has_activity_on(&self, day: Day) -> Result<bool>;

    /// Distinct days with at least one activity, in no particular order.
    async fn list_activity_dates(&self) -> Result<Vec<Day>>;

    // === Streak summary ===

    /// Load the streak summary, or the zero record if none was written yet.
    async fn load_streak_summary(&self) -> Result<StreakSummary>;

    /// Overwrite the streak summary.
    async fn save_streak_summary(&mut self, summary: &StreakSummary) -> Result<()>;

    // === Transaction support ===

    /// Commit pending changes with a message.
    async fn commit(&mut self, message: &str) -> Result<()>;

    /// Rollback pending changes.
    async fn rollback(&mut self) -> Result<()>;
}
