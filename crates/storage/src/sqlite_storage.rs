//! SQLite storage backend for Goalie.
//!
//! Goals are stored as JSON blobs in an entity table; the activity log and
//! the streak summary get their own tables so streak queries stay cheap.
//!
//! Writes join a transaction that stays open until `commit` or `rollback`.
//! Reads run inside that transaction while it is open, so they see the
//! pending writes.

use async_trait::async_trait;
use goalie_core::{date, ActivityRecord, Day, Goal, GoalId, StreakSummary};
use sqlx::Row;
use std::path::Path;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::trait_::{Result, Storage, StorageError};

/// SQLite storage implementation.
pub struct SqliteStorage {
    /// Database connection pool
    pool: sqlx::SqlitePool,
    /// Transaction holding uncommitted writes
    tx: Mutex<Option<sqlx::Transaction<'static, sqlx::Sqlite>>>,
}

fn db_err(e: sqlx::Error) -> StorageError {
    StorageError::Other(e.to_string())
}

/// Run a query on the open transaction, or on the pool when none is open.
macro_rules! run {
    ($storage:expr, $query:expr, $method:ident) => {{
        let mut tx = $storage.tx.lock().await;
        match tx.as_mut() {
            Some(tx) => $query.$method(&mut **tx).await,
            None => $query.$method(&$storage.pool).await,
        }
        .map_err(db_err)
    }};
}

impl SqliteStorage {
    /// Create a new SQLite storage instance.
    pub async fn new(db_url: &str) -> Result<Self> {
        let pool = sqlx::SqlitePool::connect(db_url).await.map_err(db_err)?;
        Self::with_pool(pool).await
    }

    /// Open (creating if needed) a database file.
    pub async fn new_from_path(path: &Path) -> Result<Self> {
        let url = format!("sqlite://{}?mode=rwc", path.display());
        Self::new(&url).await
    }

    /// Create an in-memory SQLite storage for testing.
    pub async fn in_memory() -> Result<Self> {
        // A single connection keeps every query on the same in-memory database.
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(db_err)?;
        Self::with_pool(pool).await
    }

    async fn with_pool(pool: sqlx::SqlitePool) -> Result<Self> {
        let storage = Self {
            pool,
            tx: Mutex::new(None),
        };
        storage.init_schema().await?;
        Ok(storage)
    }

    /// Initialize the database schema.
    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS goals (
                id TEXT PRIMARY KEY,
                data TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS activity_log (
                id TEXT PRIMARY KEY,
                activity_date TEXT NOT NULL,
                activity_type TEXT NOT NULL,
                goal_id TEXT,
                created_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_activity_date ON activity_log(activity_date DESC)")
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS user_stats (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                current_streak INTEGER NOT NULL DEFAULT 0,
                longest_streak INTEGER NOT NULL DEFAULT 0,
                last_activity_date TEXT,
                updated_at TEXT
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    /// Check if the database is healthy.
    pub async fn health_check(&self) -> bool {
        run!(self, sqlx::query("SELECT 1"), fetch_one).is_ok()
    }

    /// Open the write transaction unless one is already pending.
    async fn begin(&self) -> Result<()> {
        let mut tx = self.tx.lock().await;
        if tx.is_none() {
            *tx = Some(self.pool.begin().await.map_err(db_err)?);
            debug!("Opened SQLite transaction");
        }
        Ok(())
    }

    fn decode_goal(row: &sqlx::sqlite::SqliteRow) -> Result<Goal> {
        let data: String = row.try_get("data").map_err(db_err)?;
        Ok(serde_json::from_str(&data)?)
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    // === Goal operations ===

    async fn save_goal(&mut self, goal: &Goal) -> Result<()> {
        let data = serde_json::to_string(goal)?;

        self.begin().await?;
        run!(
            self,
            sqlx::query(
                "INSERT OR REPLACE INTO goals (id, data, created_at, updated_at)
                VALUES (?, ?, ?, ?)",
            )
            .bind(goal.id.to_string())
            .bind(data)
            .bind(goal.created_at.to_rfc3339())
            .bind(goal.updated_at.to_rfc3339()),
            execute
        )?;

        Ok(())
    }

    async fn load_goal(&self, id: GoalId) -> Result<Option<Goal>> {
        let row = run!(
            self,
            sqlx::query("SELECT data FROM goals WHERE id = ?").bind(id.to_string()),
            fetch_optional
        )?;

        row.as_ref().map(Self::decode_goal).transpose()
    }

    async fn list_goals(&self) -> Result<Vec<Goal>> {
        let rows = run!(
            self,
            sqlx::query("SELECT id, data FROM goals ORDER BY created_at DESC"),
            fetch_all
        )?;

        let mut goals = Vec::with_capacity(rows.len());
        for row in &rows {
            match Self::decode_goal(row) {
                Ok(goal) => goals.push(goal),
                Err(e) => {
                    let id: String = row.try_get("id").unwrap_or_default();
                    warn!("Skipping unreadable goal {}: {}", id, e);
                }
            }
        }
        Ok(goals)
    }

    async fn delete_goal(&mut self, id: GoalId) -> Result<bool> {
        self.begin().await?;
        let result = run!(
            self,
            sqlx::query("DELETE FROM goals WHERE id = ?").bind(id.to_string()),
            execute
        )?;

        Ok(result.rows_affected() > 0)
    }

    // === Activity log ===

    async fn append_activity(&mut self, record: &ActivityRecord) -> Result<()> {
        self.begin().await?;
        run!(
            self,
            sqlx::query(
                "INSERT INTO activity_log (id, activity_date, activity_type, goal_id, created_at)
                VALUES (?, ?, ?, ?, ?)",
            )
            .bind(record.id.to_string())
            .bind(date::format_day(record.date))
            .bind(record.activity_type.as_str())
            .bind(record.goal_id.map(|id| id.to_string()))
            .bind(record.created_at.to_rfc3339()),
            execute
        )?;

        Ok(())
    }

    async fn has_activity_on(&self, day: Day) -> Result<bool> {
        // Legacy rows may hold timestamps or display dates, so compare parsed days.
        Ok(self.list_activity_dates().await?.binary_search(&day).is_ok())
    }

    async fn list_activity_dates(&self) -> Result<Vec<Day>> {
        let rows = run!(
            self,
            sqlx::query("SELECT DISTINCT activity_date FROM activity_log"),
            fetch_all
        )?;

        let mut days = Vec::with_capacity(rows.len());
        for row in rows {
            let raw: String = row.try_get("activity_date").map_err(db_err)?;
            match date::parse_day(&raw) {
                Some(day) => days.push(day),
                None => warn!("Ignoring malformed activity date {:?}", raw),
            }
        }
        // Legacy rows in other date shapes may collapse onto the same day.
        days.sort_unstable();
        days.dedup();
        Ok(days)
    }

    // === Streak summary ===

    async fn load_streak_summary(&self) -> Result<StreakSummary> {
        let row = run!(
            self,
            sqlx::query(
                "SELECT current_streak, longest_streak, last_activity_date, updated_at
                FROM user_stats WHERE id = 1",
            ),
            fetch_optional
        )?;

        let Some(row) = row else {
            return Ok(StreakSummary::default());
        };

        let current: i64 = row.try_get("current_streak").map_err(db_err)?;
        let longest: i64 = row.try_get("longest_streak").map_err(db_err)?;
        let last: Option<String> = row.try_get("last_activity_date").map_err(db_err)?;
        let updated: Option<String> = row.try_get("updated_at").map_err(db_err)?;

        Ok(StreakSummary {
            current_streak: u32::try_from(current).unwrap_or(0),
            longest_streak: u32::try_from(longest).unwrap_or(0),
            last_activity_date: last.as_deref().and_then(date::parse_day),
            updated_at: updated
                .as_deref()
                .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
                .map(|t| t.with_timezone(&chrono::Utc)),
        })
    }

    async fn save_streak_summary(&mut self, summary: &StreakSummary) -> Result<()> {
        self.begin().await?;
        run!(
            self,
            sqlx::query(
                "INSERT INTO user_stats (id, current_streak, longest_streak, last_activity_date, updated_at)
                VALUES (1, ?, ?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    current_streak = excluded.current_streak,
                    longest_streak = excluded.longest_streak,
                    last_activity_date = excluded.last_activity_date,
                    updated_at = excluded.updated_at",
            )
            .bind(i64::from(summary.current_streak))
            .bind(i64::from(summary.longest_streak))
            .bind(summary.last_activity_date.map(date::format_day))
            .bind(summary.updated_at.map(|t| t.to_rfc3339())),
            execute
        )?;

        Ok(())
    }

    // === Transaction support ===

    async fn commit(&mut self, message: &str) -> Result<()> {
        if let Some(tx) = self.tx.get_mut().take() {
            tx.commit().await.map_err(db_err)?;
        }
        debug!("Commit: {}", message);
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        if let Some(tx) = self.tx.get_mut().take() {
            tx.rollback().await.map_err(db_err)?;
            warn!("Rolled back pending SQLite writes");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use goalie_core::{ActivityType, Milestone};

    fn day(y: i32, m: u32, d: u32) -> Day {
        chrono::NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_in_memory_storage() {
        let mut storage = SqliteStorage::in_memory().await.unwrap();

        let mut goal = Goal::new("Test Goal").unwrap().with_description("Test description");
        goal.add_milestone(Milestone::new("First step").unwrap());

        storage.save_goal(&goal).await.unwrap();
        let loaded = storage.load_goal(goal.id).await.unwrap().unwrap();

        assert_eq!(loaded.title, goal.title);
        assert_eq!(loaded.milestones.len(), 1);
        assert_eq!(storage.list_goals().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_goal() {
        let mut storage = SqliteStorage::in_memory().await.unwrap();
        let goal = Goal::new("Short lived").unwrap();
        storage.save_goal(&goal).await.unwrap();

        assert!(storage.delete_goal(goal.id).await.unwrap());
        assert!(!storage.delete_goal(goal.id).await.unwrap());
        assert!(storage.load_goal(goal.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_activity_dates() {
        let mut storage = SqliteStorage::in_memory().await.unwrap();

        for d in [day(2025, 1, 1), day(2025, 1, 3), day(2025, 1, 3)] {
            let record = ActivityRecord::new(d, ActivityType::MilestoneCompleted, None);
            storage.append_activity(&record).await.unwrap();
        }

        let dates = storage.list_activity_dates().await.unwrap();
        assert_eq!(dates, vec![day(2025, 1, 1), day(2025, 1, 3)]);
        assert!(storage.has_activity_on(day(2025, 1, 3)).await.unwrap());
        assert!(!storage.has_activity_on(day(2025, 1, 2)).await.unwrap());
    }

    #[tokio::test]
    async fn test_streak_summary_upsert() {
        let mut storage = SqliteStorage::in_memory().await.unwrap();
        assert_eq!(storage.load_streak_summary().await.unwrap(), StreakSummary::default());

        let mut summary = StreakSummary {
            current_streak: 1,
            longest_streak: 4,
            last_activity_date: Some(day(2025, 1, 3)),
            updated_at: None,
        };
        storage.save_streak_summary(&summary).await.unwrap();
        summary.current_streak = 2;
        storage.save_streak_summary(&summary).await.unwrap();

        assert_eq!(storage.load_streak_summary().await.unwrap(), summary);
    }

    #[tokio::test]
    async fn test_rollback_discards_pending_writes() {
        let mut storage = SqliteStorage::in_memory().await.unwrap();
        let mut goal = Goal::new("Kept").unwrap();
        storage.save_goal(&goal).await.unwrap();
        storage.commit("create").await.unwrap();

        goal.set_title("Discarded").unwrap();
        storage.save_goal(&goal).await.unwrap();
        storage
            .append_activity(&ActivityRecord::new(day(2025, 1, 1), ActivityType::GoalUpdated, Some(goal.id)))
            .await
            .unwrap();
        // Reads inside the open transaction see the pending rows.
        assert!(storage.has_activity_on(day(2025, 1, 1)).await.unwrap());

        storage.rollback().await.unwrap();

        assert_eq!(storage.load_goal(goal.id).await.unwrap().unwrap().title, "Kept");
        assert!(storage.list_activity_dates().await.unwrap().is_empty());
        assert!(storage.health_check().await);
    }

    #[tokio::test]
    async fn test_malformed_activity_dates_are_skipped() {
        let storage = SqliteStorage::in_memory().await.unwrap();
        for (id, raw) in [("a", "garbage"), ("b", "2025-01-02"), ("c", "2025-01-03T08:15:00.000Z")] {
            sqlx::query(
                "INSERT INTO activity_log (id, activity_date, activity_type, goal_id, created_at)
                VALUES (?, ?, 'goal_updated', NULL, '2025-01-03T08:15:00Z')",
            )
            .bind(id)
            .bind(raw)
            .execute(&storage.pool)
            .await
            .unwrap();
        }

        let dates = storage.list_activity_dates().await.unwrap();
        assert_eq!(dates, vec![day(2025, 1, 2), day(2025, 1, 3)]);
        // Timestamp rows count as activity on their day.
        assert!(storage.has_activity_on(day(2025, 1, 3)).await.unwrap());
        assert!(!storage.has_activity_on(day(2025, 1, 4)).await.unwrap());
    }

    #[tokio::test]
    async fn test_health_check() {
        let storage = SqliteStorage::in_memory().await.unwrap();
        assert!(storage.health_check().await);
    }
}
