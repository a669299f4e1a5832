//! Progress Tracking
//!
//! Goal status derivation, streak accounting, and the services that keep
//! both current as goals and milestones change.

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod goals;
pub mod stats;
pub mod status;
pub mod streak;
pub mod tracker;

pub use config::TrackerConfig;
pub use error::{ProgressError, Result};
pub use goals::{GoalChanges, GoalSpec, GoalTracker, GoalUpdate, GoalView, MilestoneChanges, MilestoneSpec};
pub use stats::{weekly_stats, WeeklyStats};
pub use status::{
    apply_auto_complete, calculate_progress, goal_status, goal_status_type, is_milestone_overdue,
    should_auto_complete, GoalStatusResult, GoalStatusType,
};
pub use streak::{calculate_streak, summary_as_of, StreakCalculation, StreakResult};
pub use tracker::ActivityTracker;
