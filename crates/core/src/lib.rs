//! Goalie core data models.
//!
//! Goals, their milestones, and the activity log that feeds streak
//! accounting. Everything here is plain data; derivation logic lives in
//! `goalie-progress`.

#![warn(missing_docs)]

mod id;
mod error;
pub mod date;

mod goal;
mod activity;

pub use id::*;
pub use error::{CoreError, Result};
pub use date::Day;

pub use goal::{Goal, GoalStatus, Milestone};
pub use activity::{ActivityRecord, ActivityType, StreakSummary};

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;
