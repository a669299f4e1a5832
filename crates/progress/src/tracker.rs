//! Activity recording and streak bookkeeping.

use std::sync::Arc;

use goalie_core::{ActivityRecord, ActivityType, Day, Goal, GoalId, StreakSummary};
use goalie_storage::Storage;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::streak::{calculate_streak, summary_as_of, StreakResult};

/// Records activity days and keeps the streak summary current.
///
/// The storage lock is held across the whole read-insert-recompute-write
/// sequence, so concurrent callers on the same day cannot double-insert or
/// interleave summary writes.
pub struct ActivityTracker<S: Storage> {
    storage: Arc<Mutex<S>>,
}

impl<S: Storage> Clone for ActivityTracker<S> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
        }
    }
}

impl<S: Storage> ActivityTracker<S> {
    /// Create a tracker that owns `storage`.
    pub fn new(storage: S) -> Self {
        Self::from_shared(Arc::new(Mutex::new(storage)))
    }

    /// Create a tracker over storage shared with other services.
    pub fn from_shared(storage: Arc<Mutex<S>>) -> Self {
        Self { storage }
    }

    /// Shared handle to the underlying storage.
    pub fn storage(&self) -> Arc<Mutex<S>> {
        Arc::clone(&self.storage)
    }

    /// Log an activity for `today` and return the refreshed streak.
    ///
    /// Only the first activity of a day is appended; later calls on the same
    /// day leave the log untouched and report `is_new_streak_day = false`.
    pub async fn record_activity(
        &self,
        activity_type: ActivityType,
        goal_id: Option<GoalId>,
        today: Day,
    ) -> Result<StreakResult> {
        let mut storage = self.storage.lock().await;
        record_locked(&mut *storage, activity_type, goal_id, today).await
    }

    /// The persisted summary as seen on `today`.
    pub async fn user_stats(&self, today: Day) -> Result<StreakSummary> {
        let storage = self.storage.lock().await;
        let summary = storage.load_streak_summary().await?;
        Ok(summary_as_of(&summary, today))
    }
}

/// Record an activity against storage the caller has already locked.
async fn record_locked<S: Storage>(
    storage: &mut S,
    activity_type: ActivityType,
    goal_id: Option<GoalId>,
    today: Day,
) -> Result<StreakResult> {
    let outcome = try_record(storage, activity_type, goal_id, today).await;
    rollback_on_error(storage, activity_type, outcome).await
}

/// Save `goal` and record the activity it caused as one unit of work.
///
/// Either the goal, the log entry and the summary are all committed, or
/// every write is rolled back and the error returned.
pub(crate) async fn save_and_record<S: Storage>(
    storage: &mut S,
    goal: &Goal,
    activity_type: ActivityType,
    today: Day,
) -> Result<StreakResult> {
    let outcome = match storage.save_goal(goal).await {
        Ok(()) => try_record(storage, activity_type, Some(goal.id), today).await,
        Err(e) => Err(e.into()),
    };
    rollback_on_error(storage, activity_type, outcome).await
}

async fn rollback_on_error<S: Storage>(
    storage: &mut S,
    activity_type: ActivityType,
    outcome: Result<StreakResult>,
) -> Result<StreakResult> {
    if let Err(e) = &outcome {
        warn!("Recording {} failed: {}", activity_type.as_str(), e);
        if let Err(rollback_err) = storage.rollback().await {
            warn!("Rollback failed: {}", rollback_err);
        }
    }
    outcome
}

async fn try_record<S: Storage>(
    storage: &mut S,
    activity_type: ActivityType,
    goal_id: Option<GoalId>,
    today: Day,
) -> Result<StreakResult> {
    let is_new_streak_day = !storage.has_activity_on(today).await?;
    if is_new_streak_day {
        let record = ActivityRecord::new(today, activity_type, goal_id);
        storage.append_activity(&record).await?;
    }

    let dates = storage.list_activity_dates().await?;
    let calc = calculate_streak(&dates, today);
    storage
        .save_streak_summary(&calc.to_summary(chrono::Utc::now()))
        .await?;
    storage.commit(&format!("Record {}", activity_type.as_str())).await?;

    if is_new_streak_day {
        info!(
            "Streak day logged for {}: current {}, longest {}",
            today, calc.current_streak, calc.longest_streak
        );
    } else {
        debug!("Activity already logged for {}", today);
    }

    Ok(StreakResult::new(calc, is_new_streak_day))
}

#[cfg(test)]
mod tests {
    use super::*;
    use goalie_storage::JsonStorage;

    fn day(y: i32, m: u32, d: u32) -> Day {
        chrono::NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn tracker() -> (tempfile::TempDir, ActivityTracker<JsonStorage>) {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonStorage::new(dir.path()).await.unwrap();
        (dir, ActivityTracker::new(storage))
    }

    #[tokio::test]
    async fn test_first_activity_starts_streak() {
        let (_dir, tracker) = tracker().await;
        let result = tracker
            .record_activity(ActivityType::GoalCreated, None, day(2025, 1, 1))
            .await
            .unwrap();

        assert!(result.is_new_streak_day);
        assert_eq!(result.current_streak, 1);
        assert_eq!(result.longest_streak, 1);
        assert_eq!(result.last_activity_date, Some(day(2025, 1, 1)));
    }

    #[tokio::test]
    async fn test_same_day_is_idempotent() {
        let (_dir, tracker) = tracker().await;
        let today = day(2025, 1, 1);

        let first = tracker.record_activity(ActivityType::GoalCreated, None, today).await.unwrap();
        let second = tracker
            .record_activity(ActivityType::MilestoneAdded, None, today)
            .await
            .unwrap();

        assert!(first.is_new_streak_day);
        assert!(!second.is_new_streak_day);
        assert_eq!(first.current_streak, second.current_streak);
        assert_eq!(first.longest_streak, second.longest_streak);

        let storage = tracker.storage();
        let dates = storage.lock().await.list_activity_dates().await.unwrap();
        assert_eq!(dates, vec![today]);
    }

    #[tokio::test]
    async fn test_consecutive_days_then_gap() {
        let (_dir, tracker) = tracker().await;
        for d in 1..=3 {
            tracker
                .record_activity(ActivityType::GoalUpdated, None, day(2025, 1, d))
                .await
                .unwrap();
        }
        assert_eq!(tracker.user_stats(day(2025, 1, 3)).await.unwrap().current_streak, 3);

        // Two idle days: the stored summary still says 3, reads say 0.
        let stats = tracker.user_stats(day(2025, 1, 6)).await.unwrap();
        assert_eq!(stats.current_streak, 0);
        assert_eq!(stats.longest_streak, 3);

        let result = tracker
            .record_activity(ActivityType::GoalUpdated, None, day(2025, 1, 6))
            .await
            .unwrap();
        assert_eq!(result.current_streak, 1);
        assert_eq!(result.longest_streak, 3);
    }

    #[tokio::test]
    async fn test_summary_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        {
            let tracker = ActivityTracker::new(JsonStorage::new(dir.path()).await.unwrap());
            tracker
                .record_activity(ActivityType::GoalCreated, None, day(2025, 2, 1))
                .await
                .unwrap();
            tracker
                .record_activity(ActivityType::GoalUpdated, None, day(2025, 2, 2))
                .await
                .unwrap();
        }

        let storage = JsonStorage::new(dir.path()).await.unwrap();
        let summary = storage.load_streak_summary().await.unwrap();
        assert_eq!(summary.current_streak, 2);
        assert_eq!(summary.longest_streak, 2);
        assert_eq!(summary.last_activity_date, Some(day(2025, 2, 2)));
        assert!(summary.updated_at.is_some());
    }

    #[tokio::test]
    async fn test_malformed_activity_file_does_not_count() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = ActivityTracker::new(JsonStorage::new(dir.path()).await.unwrap());
        tracker
            .record_activity(ActivityType::GoalCreated, None, day(2025, 1, 1))
            .await
            .unwrap();

        let garbage = serde_json::json!({
            "id": goalie_core::ActivityId::new().to_string(),
            "date": "not a date",
            "activity_type": "goal_updated",
            "goal_id": null,
            "created_at": "2025-01-02T09:00:00Z",
        });
        tokio::fs::write(dir.path().join("activity").join("garbage.json"), garbage.to_string())
            .await
            .unwrap();

        let result = tracker
            .record_activity(ActivityType::GoalUpdated, None, day(2025, 1, 2))
            .await
            .unwrap();
        assert!(result.is_new_streak_day);
        assert_eq!(result.current_streak, 2);
        assert_eq!(result.longest_streak, 2);
    }

    #[tokio::test]
    async fn test_concurrent_same_day_records_once() {
        let (_dir, tracker) = tracker().await;
        let today = day(2025, 4, 1);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let tracker = tracker.clone();
                tokio::spawn(async move {
                    tracker
                        .record_activity(ActivityType::MilestoneUpdated, None, today)
                        .await
                        .unwrap()
                })
            })
            .collect();

        let mut new_days = 0;
        for handle in handles {
            if handle.await.unwrap().is_new_streak_day {
                new_days += 1;
            }
        }
        assert_eq!(new_days, 1);
    }
}
