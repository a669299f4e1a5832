//! Consecutive-day streak accounting.
//!
//! A streak is a run of calendar days that each carry at least one logged
//! activity. The current streak only counts if its most recent day is today
//! or yesterday; the longest streak is a historical maximum and ignores
//! `today` entirely.

use goalie_core::date::{days_between, previous_day};
use goalie_core::{Day, StreakSummary, Time};
use serde::{Deserialize, Serialize};

/// Streak figures computed from the activity log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakCalculation {
    /// Run ending today or yesterday, 0 if broken
    pub current_streak: u32,
    /// Best run ever
    pub longest_streak: u32,
    /// Most recent active day
    pub last_activity_date: Option<Day>,
}

impl StreakCalculation {
    /// Summary record to persist.
    pub fn to_summary(self, now: Time) -> StreakSummary {
        StreakSummary {
            current_streak: self.current_streak,
            longest_streak: self.longest_streak,
            last_activity_date: self.last_activity_date,
            updated_at: Some(now),
        }
    }
}

/// Outcome of recording an activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakResult {
    /// Run ending today or yesterday
    pub current_streak: u32,
    /// Best run ever
    pub longest_streak: u32,
    /// Most recent active day
    pub last_activity_date: Option<Day>,
    /// Whether this was the first activity of the day
    pub is_new_streak_day: bool,
}

impl StreakResult {
    /// Combine a calculation with the first-of-day flag.
    pub fn new(calc: StreakCalculation, is_new_streak_day: bool) -> Self {
        Self {
            current_streak: calc.current_streak,
            longest_streak: calc.longest_streak,
            last_activity_date: calc.last_activity_date,
            is_new_streak_day,
        }
    }

    /// The current run just matched or set the record (and is more than a day).
    pub fn is_new_record(&self) -> bool {
        self.current_streak == self.longest_streak && self.current_streak > 1
    }
}

/// Compute current and longest streaks from activity days.
///
/// `dates` may be unsorted and contain duplicates; several activities on
/// one day count once.
pub fn calculate_streak(dates: &[Day], today: Day) -> StreakCalculation {
    let mut days = dates.to_vec();
    days.sort_unstable_by(|a, b| b.cmp(a));
    days.dedup();

    let Some(&most_recent) = days.first() else {
        return StreakCalculation::default();
    };

    StreakCalculation {
        current_streak: current_run(&days, today),
        longest_streak: longest_run(&days),
        last_activity_date: Some(most_recent),
    }
}

/// `days` must be sorted descending without duplicates.
fn current_run(days: &[Day], today: Day) -> u32 {
    let most_recent = days[0];
    if most_recent != today && most_recent != previous_day(today) {
        return 0;
    }

    let mut run = 1;
    let mut expected = most_recent;
    for &day in &days[1..] {
        if day != previous_day(expected) {
            break;
        }
        run += 1;
        expected = day;
    }
    run
}

/// `days` must be sorted descending without duplicates.
fn longest_run(days: &[Day]) -> u32 {
    let mut best = 1;
    let mut run = 1;
    for pair in days.windows(2) {
        if days_between(pair[1], pair[0]) == 1 {
            run += 1;
            best = best.max(run);
        } else {
            run = 1;
        }
    }
    best
}

/// The stored summary as seen on `today`: a current streak whose last day
/// is older than yesterday reads as 0. Nothing is written back.
pub fn summary_as_of(summary: &StreakSummary, today: Day) -> StreakSummary {
    let alive = summary
        .last_activity_date
        .is_some_and(|last| last == today || last == previous_day(today));
    StreakSummary {
        current_streak: if alive { summary.current_streak } else { 0 },
        ..summary.clone()
    }
}
