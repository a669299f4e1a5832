//! JSON file storage implementation.
//!
//! Stores data as JSON files under a data directory: one file per goal
//! (milestones embedded), one file per activity entry, and a single
//! `stats.json` holding the streak summary. Small per-goal meta markers
//! (version + updated_at) are kept next to the data.
//!
//! Files are written eagerly. The first write to each path since the last
//! commit records the file's previous contents, and `rollback` puts them back.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use goalie_core::{date, ActivityRecord, Day, Goal, GoalId, StreakSummary};
use tokio::fs;
use tracing::{debug, warn};

use super::{Result, Storage};

/// File-based JSON storage backend.
pub struct JsonStorage {
    root: PathBuf,
    journal: Vec<Undo>,
}

/// A file touched since the last commit, with what it held before.
struct Undo {
    path: PathBuf,
    previous: Option<Vec<u8>>,
}

impl JsonStorage {
    /// Create storage rooted at `root`, creating the directory layout.
    pub async fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        fs::create_dir_all(root.join("goals")).await?;
        fs::create_dir_all(root.join("activity")).await?;
        fs::create_dir_all(root.join("meta").join("goals")).await?;

        debug!("Opened JSON storage at {}", root.display());
        Ok(Self {
            root,
            journal: Vec::new(),
        })
    }

    /// Whether writes happened since the last commit/rollback.
    pub fn has_pending(&self) -> bool {
        !self.journal.is_empty()
    }

    fn goal_path(&self, id: GoalId) -> PathBuf {
        self.root.join("goals").join(format!("{}.json", id))
    }

    fn activity_path(&self, record: &ActivityRecord) -> PathBuf {
        self.root
            .join("activity")
            .join(format!("{}_{}.json", date::format_day(record.date), record.id))
    }

    fn stats_path(&self) -> PathBuf {
        self.root.join("stats.json")
    }

    fn meta_path(&self, kind: &str, id: &str) -> PathBuf {
        self.root.join("meta").join(kind).join(format!("{}.meta.json", id))
    }

    /// Remember what `path` holds before its first change since the last commit.
    async fn snapshot(&mut self, path: &Path) -> Result<()> {
        if self.journal.iter().any(|u| u.path == path) {
            return Ok(());
        }
        let previous = match fs::read(path).await {
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };
        self.journal.push(Undo {
            path: path.to_path_buf(),
            previous,
        });
        Ok(())
    }

    async fn write_file(&mut self, path: PathBuf, contents: String) -> Result<()> {
        self.snapshot(&path).await?;
        fs::write(&path, contents.as_bytes()).await?;
        Ok(())
    }

    /// Remove `path`, returning whether it existed.
    async fn remove_file(&mut self, path: PathBuf) -> Result<bool> {
        self.snapshot(&path).await?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Read and increment per-object version, return new version.
    async fn bump_version(&mut self, kind: &str, id: &str) -> Result<u64> {
        let path = self.meta_path(kind, id);
        let mut version = 0u64;
        if let Ok(s) = fs::read_to_string(&path).await {
            if let Ok(json) = serde_json::from_str::<serde_json::Value>(&s) {
                if let Some(v) = json.get("version").and_then(|v| v.as_u64()) {
                    version = v;
                }
            }
        }
        version += 1;
        let meta = serde_json::json!({"version": version, "updated_at": chrono::Utc::now()});
        self.write_file(path, serde_json::to_string_pretty(&meta)?).await?;
        Ok(version)
    }

    async fn activity_records(&self) -> Result<Vec<ActivityRecord>> {
        list_dir(&self.root.join("activity")).await
    }
}

#[async_trait::async_trait]
impl Storage for JsonStorage {
    async fn save_goal(&mut self, goal: &Goal) -> Result<()> {
        let json = serde_json::to_string_pretty(goal)?;
        self.write_file(self.goal_path(goal.id), json).await?;

        let version = self.bump_version("goals", &goal.id.to_string()).await?;
        debug!("Saved goal {} (v{})", goal.id, version);
        Ok(())
    }

    async fn load_goal(&self, id: GoalId) -> Result<Option<Goal>> {
        read_json(&self.goal_path(id)).await
    }

    async fn list_goals(&self) -> Result<Vec<Goal>> {
        let mut goals: Vec<Goal> = list_dir(&self.root.join("goals")).await?;
        goals.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(goals)
    }

    async fn delete_goal(&mut self, id: GoalId) -> Result<bool> {
        if !self.remove_file(self.goal_path(id)).await? {
            return Ok(false);
        }
        self.remove_file(self.meta_path("goals", &id.to_string())).await?;
        Ok(true)
    }

    async fn append_activity(&mut self, record: &ActivityRecord) -> Result<()> {
        let json = serde_json::to_string_pretty(record)?;
        self.write_file(self.activity_path(record), json).await
    }

    async fn has_activity_on(&self, day: Day) -> Result<bool> {
        Ok(self.activity_records().await?.iter().any(|r| r.date == day))
    }

    async fn list_activity_dates(&self) -> Result<Vec<Day>> {
        let days: BTreeSet<Day> = self
            .activity_records()
            .await?
            .into_iter()
            .map(|r| r.date)
            .collect();
        Ok(days.into_iter().collect())
    }

    async fn load_streak_summary(&self) -> Result<StreakSummary> {
        Ok(read_json(&self.stats_path()).await?.unwrap_or_default())
    }

    async fn save_streak_summary(&mut self, summary: &StreakSummary) -> Result<()> {
        let json = serde_json::to_string_pretty(summary)?;
        self.write_file(self.stats_path(), json).await
    }

    async fn commit(&mut self, message: &str) -> Result<()> {
        debug!("Commit: {} ({} file(s))", message, self.journal.len());
        self.journal.clear();
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        let journal = std::mem::take(&mut self.journal);
        let mut first_err = None;
        for undo in journal.iter().rev() {
            let restored = match &undo.previous {
                Some(bytes) => fs::write(&undo.path, bytes).await,
                None => match fs::remove_file(&undo.path).await {
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                    other => other,
                },
            };
            if let Err(e) = restored {
                warn!("Could not restore {}: {}", undo.path.display(), e);
                if first_err.is_none() {
                    first_err = Some(e);
                }
            }
        }
        if !journal.is_empty() {
            warn!("Rolled back {} file(s)", journal.len());
        }
        match first_err {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match fs::read_to_string(path).await {
        Ok(json) => {
            let value = serde_json::from_str(&json)?;
            Ok(Some(value))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn list_dir<T: serde::de::DeserializeOwned>(dir: &Path) -> Result<Vec<T>> {
    let mut items = Vec::new();
    let mut rd = fs::read_dir(dir).await?;
    while let Some(entry) = rd.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) != Some("json") {
            continue;
        }
        match read_json(&path).await {
            Ok(Some(item)) => items.push(item),
            Ok(None) => {}
            Err(e) => warn!("Skipping unreadable file {}: {}", path.display(), e),
        }
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use goalie_core::{ActivityType, GoalStatus, Milestone};

    fn day(y: i32, m: u32, d: u32) -> Day {
        chrono::NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_goal_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = JsonStorage::new(dir.path()).await.unwrap();

        let mut goal = Goal::new("Read 12 books").unwrap().with_due_date(Some(day(2025, 12, 31)));
        goal.add_milestone(Milestone::new("Book 1").unwrap());

        storage.save_goal(&goal).await.unwrap();
        assert!(storage.has_pending());

        let loaded = storage.load_goal(goal.id).await.unwrap().unwrap();
        assert_eq!(loaded, goal);
        assert_eq!(loaded.status, GoalStatus::Active);

        storage.commit("save goal").await.unwrap();
        assert!(!storage.has_pending());
    }

    #[tokio::test]
    async fn test_rollback_restores_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = JsonStorage::new(dir.path()).await.unwrap();

        let mut kept = Goal::new("Kept").unwrap();
        storage.save_goal(&kept).await.unwrap();
        storage.commit("create").await.unwrap();

        let fresh = Goal::new("Fresh").unwrap();
        storage.save_goal(&fresh).await.unwrap();
        kept.set_title("Renamed").unwrap();
        storage.save_goal(&kept).await.unwrap();
        storage
            .append_activity(&ActivityRecord::new(day(2025, 1, 1), ActivityType::GoalCreated, Some(fresh.id)))
            .await
            .unwrap();
        storage
            .save_streak_summary(&StreakSummary {
                current_streak: 1,
                longest_streak: 1,
                last_activity_date: Some(day(2025, 1, 1)),
                updated_at: None,
            })
            .await
            .unwrap();

        storage.rollback().await.unwrap();

        assert!(!storage.has_pending());
        assert!(storage.load_goal(fresh.id).await.unwrap().is_none());
        assert_eq!(storage.load_goal(kept.id).await.unwrap().unwrap().title, "Kept");
        assert!(storage.list_activity_dates().await.unwrap().is_empty());
        assert_eq!(storage.load_streak_summary().await.unwrap(), StreakSummary::default());
    }

    #[tokio::test]
    async fn test_rollback_restores_deleted_goal() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = JsonStorage::new(dir.path()).await.unwrap();

        let goal = Goal::new("Survivor").unwrap();
        storage.save_goal(&goal).await.unwrap();
        storage.commit("create").await.unwrap();

        assert!(storage.delete_goal(goal.id).await.unwrap());
        storage.rollback().await.unwrap();

        assert_eq!(storage.load_goal(goal.id).await.unwrap(), Some(goal));
    }

    #[tokio::test]
    async fn test_delete_goal() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = JsonStorage::new(dir.path()).await.unwrap();

        let goal = Goal::new("Temporary").unwrap();
        storage.save_goal(&goal).await.unwrap();

        assert!(storage.delete_goal(goal.id).await.unwrap());
        assert!(storage.load_goal(goal.id).await.unwrap().is_none());
        assert!(!storage.delete_goal(goal.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_goals_skips_corrupt_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = JsonStorage::new(dir.path()).await.unwrap();

        storage.save_goal(&Goal::new("One").unwrap()).await.unwrap();
        storage.save_goal(&Goal::new("Two").unwrap()).await.unwrap();
        fs::write(dir.path().join("goals").join("broken.json"), b"{ not json")
            .await
            .unwrap();

        let goals = storage.list_goals().await.unwrap();
        assert_eq!(goals.len(), 2);
    }

    #[tokio::test]
    async fn test_activity_dates_are_distinct() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = JsonStorage::new(dir.path()).await.unwrap();

        for d in [day(2025, 1, 2), day(2025, 1, 1), day(2025, 1, 2)] {
            let record = ActivityRecord::new(d, ActivityType::GoalUpdated, None);
            storage.append_activity(&record).await.unwrap();
        }

        let dates = storage.list_activity_dates().await.unwrap();
        assert_eq!(dates, vec![day(2025, 1, 1), day(2025, 1, 2)]);
        assert!(storage.has_activity_on(day(2025, 1, 1)).await.unwrap());
        assert!(!storage.has_activity_on(day(2025, 1, 3)).await.unwrap());
    }

    #[tokio::test]
    async fn test_malformed_activity_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = JsonStorage::new(dir.path()).await.unwrap();

        let record = ActivityRecord::new(day(2025, 1, 2), ActivityType::GoalUpdated, None);
        storage.append_activity(&record).await.unwrap();

        let activity = dir.path().join("activity");
        fs::write(activity.join("truncated.json"), b"{ not json").await.unwrap();
        let mut bad_date = serde_json::to_value(&record).unwrap();
        bad_date["id"] = serde_json::json!(goalie_core::ActivityId::new().to_string());
        bad_date["date"] = serde_json::json!("garbage");
        fs::write(activity.join("bad_date.json"), bad_date.to_string()).await.unwrap();

        assert_eq!(storage.list_activity_dates().await.unwrap(), vec![day(2025, 1, 2)]);
        assert!(storage.has_activity_on(day(2025, 1, 2)).await.unwrap());
    }

    #[tokio::test]
    async fn test_streak_summary_defaults_then_persists() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = JsonStorage::new(dir.path()).await.unwrap();

        assert_eq!(storage.load_streak_summary().await.unwrap(), StreakSummary::default());

        let summary = StreakSummary {
            current_streak: 2,
            longest_streak: 5,
            last_activity_date: Some(day(2025, 1, 3)),
            updated_at: None,
        };
        storage.save_streak_summary(&summary).await.unwrap();

        let reopened = JsonStorage::new(dir.path()).await.unwrap();
        assert_eq!(reopened.load_streak_summary().await.unwrap(), summary);
    }
}
