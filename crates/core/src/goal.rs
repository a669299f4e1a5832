//! Goal model - a personal objective broken into milestones.

use serde::{Deserialize, Serialize};

use crate::date::Day;
use crate::error::{CoreError, Result};
use crate::id::{GoalId, MilestoneId};
use crate::Time;

/// A goal the user is working towards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    /// Unique identifier
    pub id: GoalId,

    /// Goal title (never blank)
    pub title: String,

    /// Free-form description
    #[serde(default)]
    pub description: String,

    /// Optional due date
    #[serde(default, with = "crate::date::lenient")]
    pub due_date: Option<Day>,

    /// Stored lifecycle status
    #[serde(default)]
    pub status: GoalStatus,

    /// Milestones, owned by this goal
    #[serde(default)]
    pub milestones: Vec<Milestone>,

    /// When created
    pub created_at: Time,

    /// Last updated
    pub updated_at: Time,

    /// When the goal transitioned to completed
    #[serde(default)]
    pub completed_at: Option<Time>,
}

/// Stored goal status. The only transition is `Active -> Completed`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    /// Goal is being worked on
    #[default]
    Active,
    /// Goal completed
    Completed,
}

/// An actionable step towards a goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    /// Unique identifier
    pub id: MilestoneId,

    /// What needs doing. Blank text marks corrupted data.
    #[serde(default)]
    pub text: String,

    /// Whether it is done
    #[serde(default)]
    pub completed: bool,

    /// Optional due date
    #[serde(default, with = "crate::date::lenient")]
    pub due_date: Option<Day>,

    /// Display order within the goal
    #[serde(default)]
    pub position: u32,
}

impl Milestone {
    /// Create an incomplete milestone. Blank text is rejected.
    pub fn new(text: impl Into<String>) -> Result<Self> {
        let text = text.into().trim().to_string();
        if text.is_empty() {
            return Err(CoreError::EmptyMilestoneText);
        }
        Ok(Self {
            id: MilestoneId::new(),
            text,
            completed: false,
            due_date: None,
            position: 0,
        })
    }

    /// Builder: set due date.
    pub fn with_due_date(mut self, due_date: Option<Day>) -> Self {
        self.due_date = due_date;
        self
    }

    /// Whether the milestone carries usable text.
    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }
}

impl Goal {
    /// Create a new active goal. Blank titles are rejected.
    pub fn new(title: impl Into<String>) -> Result<Self> {
        let title = title.into().trim().to_string();
        if title.is_empty() {
            return Err(CoreError::EmptyTitle);
        }
        let now = chrono::Utc::now();
        Ok(Self {
            id: GoalId::new(),
            title,
            description: String::new(),
            due_date: None,
            status: GoalStatus::Active,
            milestones: Vec::new(),
            created_at: now,
            updated_at: now,
            completed_at: None,
        })
    }

    /// Builder: set description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into().trim().to_string();
        self
    }

    /// Builder: set due date.
    pub fn with_due_date(mut self, due_date: Option<Day>) -> Self {
        self.due_date = due_date;
        self
    }

    /// Replace the title. Blank titles are rejected.
    pub fn set_title(&mut self, title: impl Into<String>) -> Result<()> {
        let title = title.into().trim().to_string();
        if title.is_empty() {
            return Err(CoreError::EmptyTitle);
        }
        self.title = title;
        Ok(())
    }

    /// Whether the goal has been completed.
    pub fn is_completed(&self) -> bool {
        self.status == GoalStatus::Completed
    }

    /// Milestones in display order.
    pub fn ordered_milestones(&self) -> Vec<&Milestone> {
        let mut ordered: Vec<&Milestone> = self.milestones.iter().collect();
        ordered.sort_by_key(|m| m.position);
        ordered
    }

    /// Ids of milestones whose text is missing.
    pub fn corrupted_milestones(&self) -> Vec<MilestoneId> {
        self.milestones
            .iter()
            .filter(|m| !m.has_text())
            .map(|m| m.id)
            .collect()
    }

    /// Look up a milestone.
    pub fn find_milestone(&self, id: MilestoneId) -> Option<&Milestone> {
        self.milestones.iter().find(|m| m.id == id)
    }

    /// Look up a milestone for editing.
    pub fn find_milestone_mut(&mut self, id: MilestoneId) -> Option<&mut Milestone> {
        self.milestones.iter_mut().find(|m| m.id == id)
    }

    /// Append a milestone after the existing ones and return its id.
    pub fn add_milestone(&mut self, mut milestone: Milestone) -> MilestoneId {
        milestone.position = self
            .milestones
            .iter()
            .map(|m| m.position + 1)
            .max()
            .unwrap_or(0);
        let id = milestone.id;
        self.milestones.push(milestone);
        id
    }

    /// Remove a milestone and close the gap in positions.
    pub fn remove_milestone(&mut self, id: MilestoneId) -> Result<Milestone> {
        let index = self
            .milestones
            .iter()
            .position(|m| m.id == id)
            .ok_or(CoreError::UnknownMilestone(id))?;
        let removed = self.milestones.remove(index);
        self.repack_positions();
        Ok(removed)
    }

    /// Reorder milestones. Listed ids come first in the given order;
    /// unlisted milestones follow in their current relative order.
    pub fn reorder_milestones(&mut self, order: &[MilestoneId]) -> Result<()> {
        if let Some(unknown) = order.iter().find(|id| self.find_milestone(**id).is_none()) {
            return Err(CoreError::UnknownMilestone(*unknown));
        }

        let rank = |m: &Milestone| -> (usize, u32) {
            match order.iter().position(|id| *id == m.id) {
                Some(i) => (i, 0),
                None => (order.len(), m.position),
            }
        };
        self.milestones.sort_by_key(|m| rank(m));
        for (i, m) in self.milestones.iter_mut().enumerate() {
            m.position = i as u32;
        }
        Ok(())
    }

    /// Transition `Active -> Completed`. Returns `false` if already completed.
    pub fn mark_completed(&mut self, now: Time) -> bool {
        if self.is_completed() {
            return false;
        }
        self.status = GoalStatus::Completed;
        self.completed_at = Some(now);
        self.updated_at = now;
        true
    }

    /// Bump `updated_at`.
    pub fn touch(&mut self) {
        self.updated_at = chrono::Utc::now();
    }

    fn repack_positions(&mut self) {
        self.milestones.sort_by_key(|m| m.position);
        for (i, m) in self.milestones.iter_mut().enumerate() {
            m.position = i as u32;
        }
    }
}
