//! Goal status and progress derivation.
//!
//! Everything here is a pure function of the goal and the caller's notion
//! of "today". Nothing reads the clock.

use goalie_core::{Day, Goal, Milestone, Time};
use serde::{Deserialize, Serialize};

/// Display status derived from a goal's dates and milestones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GoalStatusType {
    /// Nothing overdue
    OnTrack,
    /// An incomplete milestone is past due
    Behind,
    /// The goal itself is past due
    Late,
    /// Both the goal and a milestone are past due
    LateBehind,
    /// The goal is completed
    Completed,
}

impl GoalStatusType {
    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            GoalStatusType::OnTrack => "on-track",
            GoalStatusType::Behind => "behind",
            GoalStatusType::Late => "late",
            GoalStatusType::LateBehind => "late-behind",
            GoalStatusType::Completed => "completed",
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            GoalStatusType::OnTrack => "On Track",
            GoalStatusType::Behind => "Behind",
            GoalStatusType::Late => "Late",
            GoalStatusType::LateBehind => "Late & Behind",
            GoalStatusType::Completed => "Completed",
        }
    }
}

impl std::fmt::Display for GoalStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for GoalStatusType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "on-track" => Ok(GoalStatusType::OnTrack),
            "behind" => Ok(GoalStatusType::Behind),
            "late" => Ok(GoalStatusType::Late),
            "late-behind" => Ok(GoalStatusType::LateBehind),
            "completed" => Ok(GoalStatusType::Completed),
            other => Err(format!("unknown goal status: {other}")),
        }
    }
}

/// Status and progress of a goal as of some day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalStatusResult {
    /// Derived status
    #[serde(rename = "type")]
    pub kind: GoalStatusType,

    /// Percentage of milestones completed (0-100)
    pub progress_percent: u8,
}

/// Percentage of completed milestones, rounded half up. Zero when empty.
pub fn calculate_progress(milestones: &[Milestone]) -> u8 {
    if milestones.is_empty() {
        return 0;
    }
    let total = milestones.len();
    let completed = milestones.iter().filter(|m| m.completed).count();
    // round(100k / n) == floor((200k + n) / 2n)
    ((200 * completed + total) / (2 * total)) as u8
}

/// Whether an incomplete milestone's due date is strictly before `today`.
pub fn is_milestone_overdue(milestone: &Milestone, today: Day) -> bool {
    !milestone.completed && milestone.due_date.is_some_and(|due| due < today)
}

/// Derive the display status. Completion wins over any date.
pub fn goal_status_type(goal: &Goal, today: Day) -> GoalStatusType {
    if goal.is_completed() {
        return GoalStatusType::Completed;
    }

    let behind = goal.milestones.iter().any(|m| is_milestone_overdue(m, today));
    let late = goal.due_date.is_some_and(|due| due < today);

    match (late, behind) {
        (true, true) => GoalStatusType::LateBehind,
        (true, false) => GoalStatusType::Late,
        (false, true) => GoalStatusType::Behind,
        (false, false) => GoalStatusType::OnTrack,
    }
}

/// Status and progress together.
pub fn goal_status(goal: &Goal, today: Day) -> GoalStatusResult {
    GoalStatusResult {
        kind: goal_status_type(goal, today),
        progress_percent: calculate_progress(&goal.milestones),
    }
}

/// Whether the goal is due for its one-shot auto-completion.
pub fn should_auto_complete(goal: &Goal) -> bool {
    !goal.is_completed()
        && !goal.milestones.is_empty()
        && calculate_progress(&goal.milestones) == 100
}

/// Complete the goal if every milestone is done. Returns whether the
/// transition fired; once completed it never fires again.
pub fn apply_auto_complete(goal: &mut Goal, now: Time) -> bool {
    should_auto_complete(goal) && goal.mark_completed(now)
}
