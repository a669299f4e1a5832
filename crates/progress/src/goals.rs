//! Goal management service.
//!
//! Wraps storage with the operations a UI or API needs, and wires every
//! mutation into the activity log and the auto-completion guard. Each
//! operation runs under the storage lock, so the goal write and the
//! activity bookkeeping land together.

use std::sync::Arc;

use goalie_core::{ActivityType, Day, Goal, GoalId, Milestone, MilestoneId};
use goalie_storage::Storage;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::TrackerConfig;
use crate::error::{ProgressError, Result};
use crate::stats::{weekly_stats, WeeklyStats};
use crate::status::{apply_auto_complete, goal_status, GoalStatusResult, GoalStatusType};
use crate::streak::StreakResult;
use crate::tracker::{save_and_record, ActivityTracker};

/// Input for creating a goal.
#[derive(Debug, Clone, Default)]
pub struct GoalSpec {
    /// Title (required)
    pub title: String,
    /// Description
    pub description: String,
    /// Due date
    pub due_date: Option<Day>,
    /// Initial milestones, in order
    pub milestones: Vec<MilestoneSpec>,
}

/// Input for creating a milestone.
#[derive(Debug, Clone, Default)]
pub struct MilestoneSpec {
    /// Text (required)
    pub text: String,
    /// Due date
    pub due_date: Option<Day>,
}

/// Partial update of goal fields. `None` leaves a field untouched;
/// `due_date: Some(None)` clears the due date.
#[derive(Debug, Clone, Default)]
pub struct GoalChanges {
    /// New title
    pub title: Option<String>,
    /// New description
    pub description: Option<String>,
    /// New or cleared due date
    pub due_date: Option<Option<Day>>,
}

/// Partial update of milestone fields.
#[derive(Debug, Clone, Default)]
pub struct MilestoneChanges {
    /// New text
    pub text: Option<String>,
    /// New or cleared due date
    pub due_date: Option<Option<Day>>,
}

/// A goal with its derived status.
#[derive(Debug, Clone, Serialize)]
pub struct GoalView {
    /// Stored goal
    #[serde(flatten)]
    pub goal: Goal,
    /// Derived status and progress
    #[serde(rename = "display_status")]
    pub status: GoalStatusResult,
    /// Milestones missing text
    pub integrity_warnings: Vec<MilestoneId>,
}

impl GoalView {
    fn new(goal: Goal, today: Day) -> Self {
        let status = goal_status(&goal, today);
        let integrity_warnings = goal.corrupted_milestones();
        Self {
            goal,
            status,
            integrity_warnings,
        }
    }
}

/// Result of a mutation.
#[derive(Debug, Clone, Serialize)]
pub struct GoalUpdate {
    /// Goal after the change
    pub goal: Goal,
    /// Derived status after the change
    pub status: GoalStatusResult,
    /// Streak after recording the activity; `None` if nothing was recorded
    pub streak: Option<StreakResult>,
    /// Whether this change completed the goal automatically
    pub auto_completed: bool,
}

/// Goal management service.
pub struct GoalTracker<S: Storage> {
    storage: Arc<Mutex<S>>,
    config: TrackerConfig,
}

impl<S: Storage> GoalTracker<S> {
    /// Create a goal tracker that owns `storage`.
    pub fn new(storage: S) -> Self {
        Self {
            storage: Arc::new(Mutex::new(storage)),
            config: TrackerConfig::default(),
        }
    }

    /// Set configuration.
    pub fn with_config(mut self, config: TrackerConfig) -> Self {
        self.config = config;
        self
    }

    /// Current configuration.
    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Activity tracker sharing this tracker's storage.
    pub fn activity(&self) -> ActivityTracker<S> {
        ActivityTracker::from_shared(Arc::clone(&self.storage))
    }

    /// Create a goal with optional initial milestones.
    pub async fn create_goal(&self, spec: GoalSpec, today: Day) -> Result<GoalUpdate> {
        let mut goal = Goal::new(spec.title)?
            .with_description(spec.description)
            .with_due_date(spec.due_date);
        for m in spec.milestones {
            goal.add_milestone(Milestone::new(m.text)?.with_due_date(m.due_date));
        }

        let mut storage = self.storage.lock().await;
        let streak = save_and_record(&mut *storage, &goal, ActivityType::GoalCreated, today).await?;
        info!("Created goal {} ({})", goal.id, goal.title);
        Ok(self.update(goal, Some(streak), false, today))
    }

    /// Edit title, description or due date.
    pub async fn update_goal(&self, id: GoalId, changes: GoalChanges, today: Day) -> Result<GoalUpdate> {
        let mut storage = self.storage.lock().await;
        let mut goal = load(&*storage, id).await?;
        ensure_editable(&goal, None)?;

        if let Some(title) = changes.title {
            goal.set_title(title)?;
        }
        if let Some(description) = changes.description {
            goal.description = description.trim().to_string();
        }
        if let Some(due_date) = changes.due_date {
            goal.due_date = due_date;
        }
        goal.touch();

        let streak = save_and_record(&mut *storage, &goal, ActivityType::GoalUpdated, today).await?;
        debug!("Updated goal {}", id);
        Ok(self.update(goal, Some(streak), false, today))
    }

    /// Delete a goal and its milestones.
    pub async fn delete_goal(&self, id: GoalId) -> Result<()> {
        let mut storage = self.storage.lock().await;
        if !storage.delete_goal(id).await? {
            return Err(ProgressError::GoalNotFound(id));
        }
        if let Err(e) = storage.commit(&format!("Delete goal {}", id)).await {
            if let Err(rollback_err) = storage.rollback().await {
                warn!("Rollback failed: {}", rollback_err);
            }
            return Err(e.into());
        }
        info!("Deleted goal {}", id);
        Ok(())
    }

    /// Mark a goal completed. Completing an already completed goal is a no-op
    /// that records nothing.
    pub async fn complete_goal(&self, id: GoalId, today: Day) -> Result<GoalUpdate> {
        let mut storage = self.storage.lock().await;
        let mut goal = load(&*storage, id).await?;
        ensure_editable(&goal, None)?;

        if !goal.mark_completed(chrono::Utc::now()) {
            debug!("Goal {} already completed", id);
            return Ok(self.update(goal, None, false, today));
        }

        let streak = save_and_record(&mut *storage, &goal, ActivityType::GoalCompleted, today).await?;
        info!("Goal {} marked as completed", id);
        Ok(self.update(goal, Some(streak), false, today))
    }

    /// Append a milestone to a goal.
    pub async fn add_milestone(&self, id: GoalId, spec: MilestoneSpec, today: Day) -> Result<GoalUpdate> {
        let milestone = Milestone::new(spec.text)?.with_due_date(spec.due_date);

        self.mutate_milestones(id, None, today, move |goal| {
            goal.add_milestone(milestone);
            Ok(ActivityType::MilestoneAdded)
        })
        .await
    }

    /// Edit a milestone's text or due date. Supplying text is also how a
    /// milestone with missing text gets repaired.
    pub async fn update_milestone(
        &self,
        id: GoalId,
        milestone_id: MilestoneId,
        changes: MilestoneChanges,
        today: Day,
    ) -> Result<GoalUpdate> {
        let text = match changes.text {
            Some(text) if text.trim().is_empty() => {
                return Err(goalie_core::CoreError::EmptyMilestoneText.into())
            }
            other => other.map(|t| t.trim().to_string()),
        };

        // Only an edit that supplies text can repair a textless milestone.
        let repairing = text.as_ref().map(|_| milestone_id);

        self.mutate_milestones(id, repairing, today, move |goal| {
            let milestone = find_mut(goal, milestone_id)?;
            if let Some(text) = text {
                milestone.text = text;
            }
            if let Some(due_date) = changes.due_date {
                milestone.due_date = due_date;
            }
            Ok(ActivityType::MilestoneUpdated)
        })
        .await
    }

    /// Flip a milestone between done and not done.
    pub async fn toggle_milestone(&self, id: GoalId, milestone_id: MilestoneId, today: Day) -> Result<GoalUpdate> {
        self.mutate_milestones(id, None, today, move |goal| {
            let milestone = find_mut(goal, milestone_id)?;
            milestone.completed = !milestone.completed;
            Ok(if milestone.completed {
                ActivityType::MilestoneCompleted
            } else {
                ActivityType::MilestoneUpdated
            })
        })
        .await
    }

    /// Remove a milestone.
    pub async fn delete_milestone(&self, id: GoalId, milestone_id: MilestoneId, today: Day) -> Result<GoalUpdate> {
        self.mutate_milestones(id, Some(milestone_id), today, move |goal| {
            let goal_id = goal.id;
            goal.remove_milestone(milestone_id)
                .map_err(|_| ProgressError::MilestoneNotFound {
                    goal: goal_id,
                    milestone: milestone_id,
                })?;
            Ok(ActivityType::MilestoneDeleted)
        })
        .await
    }

    /// Reorder milestones; listed ids come first in the given order.
    pub async fn reorder_milestones(&self, id: GoalId, order: Vec<MilestoneId>, today: Day) -> Result<GoalUpdate> {
        self.mutate_milestones(id, None, today, move |goal| {
            goal.reorder_milestones(&order)?;
            Ok(ActivityType::MilestoneUpdated)
        })
        .await
    }

    /// One goal with its status as of `today`.
    pub async fn goal_view(&self, id: GoalId, today: Day) -> Result<GoalView> {
        let storage = self.storage.lock().await;
        let goal = load(&*storage, id).await?;
        Ok(GoalView::new(goal, today))
    }

    /// All goals with their status, optionally filtered by status.
    pub async fn list_goal_views(&self, today: Day, filter: Option<GoalStatusType>) -> Result<Vec<GoalView>> {
        let goals = self.storage.lock().await.list_goals().await?;
        let views = goals
            .into_iter()
            .map(|g| GoalView::new(g, today))
            .inspect(|v| {
                if !v.integrity_warnings.is_empty() {
                    warn!(
                        "Goal {} has {} milestone(s) without text",
                        v.goal.id,
                        v.integrity_warnings.len()
                    );
                }
            })
            .filter(|v| filter.map_or(true, |f| v.status.kind == f))
            .collect();
        Ok(views)
    }

    /// Weekly completion counts.
    pub async fn weekly_stats(&self, today: Day) -> Result<WeeklyStats> {
        let goals = self.storage.lock().await.list_goals().await?;
        Ok(weekly_stats(&goals, today, &self.config))
    }

    /// Load, edit, auto-complete, save and record, all under one lock.
    ///
    /// `repairing` names a milestone the edit is allowed to touch even though
    /// it lacks text; every other textless milestone blocks the edit.
    async fn mutate_milestones<F>(
        &self,
        id: GoalId,
        repairing: Option<MilestoneId>,
        today: Day,
        edit: F,
    ) -> Result<GoalUpdate>
    where
        F: FnOnce(&mut Goal) -> Result<ActivityType> + Send,
    {
        let mut storage = self.storage.lock().await;
        let mut goal = load(&*storage, id).await?;
        ensure_editable(&goal, repairing)?;

        let activity = edit(&mut goal)?;
        goal.touch();

        let auto_completed = apply_auto_complete(&mut goal, chrono::Utc::now());
        if auto_completed {
            info!("Goal {} auto-completed: all milestones done", id);
        }

        let streak = save_and_record(&mut *storage, &goal, activity, today).await?;
        Ok(self.update(goal, Some(streak), auto_completed, today))
    }

    fn update(&self, goal: Goal, streak: Option<StreakResult>, auto_completed: bool, today: Day) -> GoalUpdate {
        let status = goal_status(&goal, today);
        GoalUpdate {
            goal,
            status,
            streak,
            auto_completed,
        }
    }
}

async fn load<S: Storage>(storage: &S, id: GoalId) -> Result<Goal> {
    storage
        .load_goal(id)
        .await?
        .ok_or(ProgressError::GoalNotFound(id))
}

fn find_mut(goal: &mut Goal, milestone_id: MilestoneId) -> Result<&mut Milestone> {
    let goal_id = goal.id;
    goal.find_milestone_mut(milestone_id)
        .ok_or(ProgressError::MilestoneNotFound {
            goal: goal_id,
            milestone: milestone_id,
        })
}

fn ensure_editable(goal: &Goal, repairing: Option<MilestoneId>) -> Result<()> {
    let ids: Vec<MilestoneId> = goal
        .corrupted_milestones()
        .into_iter()
        .filter(|id| Some(*id) != repairing)
        .collect();
    if ids.is_empty() {
        return Ok(());
    }
    warn!("Refusing to edit goal {}: {} milestone(s) without text", goal.id, ids.len());
    Err(ProgressError::CorruptedMilestones { goal: goal.id, ids })
}
