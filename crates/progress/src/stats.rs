//! Weekly goal statistics.

use goalie_core::date::start_of_week;
use goalie_core::{Day, Goal, GoalStatus};
use serde::{Deserialize, Serialize};

use crate::config::TrackerConfig;

/// Goal counts for the dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyStats {
    /// Goals completed since the start of the current week
    pub goals_completed_this_week: usize,
    /// Goals still active
    pub active_goals: usize,
}

/// Count goals completed this week and goals still active.
///
/// Goals completed before `completed_at` was tracked fall back to
/// `updated_at`.
pub fn weekly_stats(goals: &[Goal], today: Day, config: &TrackerConfig) -> WeeklyStats {
    let week_start = start_of_week(today, config.week_start);

    let goals_completed_this_week = goals
        .iter()
        .filter(|g| g.status == GoalStatus::Completed)
        .filter(|g| {
            let at = g.completed_at.unwrap_or(g.updated_at);
            config.day_of(at) >= week_start
        })
        .count();

    let active_goals = goals.iter().filter(|g| g.status == GoalStatus::Active).count();

    WeeklyStats {
        goals_completed_this_week,
        active_goals,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc, Weekday};

    fn completed_on(y: i32, m: u32, d: u32) -> Goal {
        let mut goal = Goal::new("done").unwrap();
        goal.mark_completed(Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap());
        goal
    }

    #[test]
    fn test_week_start_is_configurable() {
        // 2025-01-08 is a Wednesday; Sunday is the 5th, Monday the 6th.
        let today = chrono::NaiveDate::from_ymd_opt(2025, 1, 8).unwrap();
        let goals = vec![
            completed_on(2025, 1, 5),
            completed_on(2025, 1, 7),
            completed_on(2024, 12, 30),
            Goal::new("active").unwrap(),
        ];

        let sunday = weekly_stats(&goals, today, &TrackerConfig::default());
        assert_eq!(sunday.goals_completed_this_week, 2);
        assert_eq!(sunday.active_goals, 1);

        let monday = TrackerConfig::default().with_week_start(Weekday::Mon);
        assert_eq!(weekly_stats(&goals, today, &monday).goals_completed_this_week, 1);
    }

    #[test]
    fn test_legacy_completion_uses_updated_at() {
        let today = chrono::NaiveDate::from_ymd_opt(2025, 1, 8).unwrap();
        let mut goal = Goal::new("legacy").unwrap();
        goal.status = GoalStatus::Completed;
        goal.updated_at = Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0).unwrap();

        let stats = weekly_stats(&[goal], today, &TrackerConfig::default());
        assert_eq!(stats.goals_completed_this_week, 1);
        assert_eq!(stats.active_goals, 0);
    }

    #[test]
    fn test_empty() {
        let today = chrono::NaiveDate::from_ymd_opt(2025, 1, 8).unwrap();
        assert_eq!(weekly_stats(&[], today, &TrackerConfig::default()), WeeklyStats::default());
    }
}
