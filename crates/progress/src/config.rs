//! Tracker configuration.

use chrono::{Duration, Utc, Weekday};
use goalie_core::{Day, Time};

use crate::error::{ProgressError, Result};

const MAX_OFFSET_MINUTES: i32 = 14 * 60;

/// Settings that pin down what "today" and "this week" mean.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerConfig {
    /// Fixed offset from UTC used to derive the calendar day
    pub utc_offset_minutes: i32,

    /// First day of the week for weekly statistics
    pub week_start: Weekday,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: 0,
            week_start: Weekday::Sun,
        }
    }
}

impl TrackerConfig {
    /// Builder: set the UTC offset in minutes.
    pub fn with_utc_offset_minutes(mut self, minutes: i32) -> Self {
        self.utc_offset_minutes = minutes;
        self
    }

    /// Builder: set the week start.
    pub fn with_week_start(mut self, week_start: Weekday) -> Self {
        self.week_start = week_start;
        self
    }

    /// Reject offsets no real zone uses.
    pub fn validate(&self) -> Result<()> {
        if self.utc_offset_minutes.abs() > MAX_OFFSET_MINUTES {
            return Err(ProgressError::InvalidConfig(format!(
                "UTC offset {} minutes is outside ±{}",
                self.utc_offset_minutes, MAX_OFFSET_MINUTES
            )));
        }
        Ok(())
    }

    /// Calendar day an instant falls on under this configuration.
    pub fn day_of(&self, instant: Time) -> Day {
        (instant + Duration::minutes(i64::from(self.utc_offset_minutes))).date_naive()
    }

    /// The current calendar day.
    pub fn today(&self) -> Day {
        self.day_of(Utc::now())
    }
}
