//! Activity log and streak summary models.

use serde::{Deserialize, Serialize};

use crate::date::Day;
use crate::id::{ActivityId, GoalId};
use crate::Time;

/// What kind of mutation produced an activity entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    /// A goal was created
    GoalCreated,
    /// Goal fields were edited
    GoalUpdated,
    /// A goal was marked completed
    GoalCompleted,
    /// A milestone was added
    MilestoneAdded,
    /// A milestone was edited or reordered
    MilestoneUpdated,
    /// A milestone was checked off
    MilestoneCompleted,
    /// A milestone was removed
    MilestoneDeleted,
}

impl ActivityType {
    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::GoalCreated => "goal_created",
            ActivityType::GoalUpdated => "goal_updated",
            ActivityType::GoalCompleted => "goal_completed",
            ActivityType::MilestoneAdded => "milestone_added",
            ActivityType::MilestoneUpdated => "milestone_updated",
            ActivityType::MilestoneCompleted => "milestone_completed",
            ActivityType::MilestoneDeleted => "milestone_deleted",
        }
    }
}

impl std::str::FromStr for ActivityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "goal_created" => Ok(ActivityType::GoalCreated),
            "goal_updated" => Ok(ActivityType::GoalUpdated),
            "goal_completed" => Ok(ActivityType::GoalCompleted),
            "milestone_added" => Ok(ActivityType::MilestoneAdded),
            "milestone_updated" => Ok(ActivityType::MilestoneUpdated),
            "milestone_completed" => Ok(ActivityType::MilestoneCompleted),
            "milestone_deleted" => Ok(ActivityType::MilestoneDeleted),
            other => Err(format!("unknown activity type: {other}")),
        }
    }
}

/// One entry of the append-only activity log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    /// Unique identifier
    pub id: ActivityId,

    /// Day the activity happened on
    pub date: Day,

    /// What happened
    pub activity_type: ActivityType,

    /// Goal involved, if any
    pub goal_id: Option<GoalId>,

    /// Wall-clock time the entry was written
    pub created_at: Time,
}

impl ActivityRecord {
    /// Create a new log entry.
    pub fn new(date: Day, activity_type: ActivityType, goal_id: Option<GoalId>) -> Self {
        Self {
            id: ActivityId::new(),
            date,
            activity_type,
            goal_id,
            created_at: chrono::Utc::now(),
        }
    }
}

/// Cached streak figures, overwritten on every recorded activity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakSummary {
    /// Consecutive active days ending today or yesterday
    pub current_streak: u32,

    /// Best run ever
    pub longest_streak: u32,

    /// Most recent active day
    #[serde(default, with = "crate::date::lenient")]
    pub last_activity_date: Option<Day>,

    /// When the summary was last written
    #[serde(default)]
    pub updated_at: Option<Time>,
}

impl StreakSummary {
    /// Whether a streak is currently running.
    pub fn is_active(&self) -> bool {
        self.current_streak > 0
    }
}
