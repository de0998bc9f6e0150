//! Task domain model.
//!
//! # Responsibility
//! - Define the canonical task record and its lifecycle vocabulary.
//! - Provide validation used by every write path before persistence.
//!
//! # Invariants
//! - `id` is stable and never reused for another task.
//! - `created_at` is set once at construction and never changes.
//! - `completed_at` is `Some` if and only if `status == Done`.

use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for every task.
///
/// Kept as a type alias to make semantic intent explicit in signatures.
pub type TaskId = Uuid;

/// Task lifecycle state.
///
/// `Done` and `Archived` are terminal for queue purposes: neither is ever
/// eligible for the today queue, and neither transitions into the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Open and rankable.
    Active,
    /// Completed; `completed_at` records when.
    Done,
    /// Kept for history but out of every queue.
    Archived,
}

/// Manual priority band, strongest first.
///
/// The discriminant order is the ranking order: `Pinned` sorts before
/// `High`, and so on. Derived `Ord` relies on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Pinned = 0,
    High = 1,
    Normal = 2,
    Low = 3,
}

/// A checklist entry inside a task. Informational only; no queue logic
/// reads subtask completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtask {
    pub id: Uuid,
    pub title: String,
    pub done: bool,
}

impl Subtask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            done: false,
        }
    }
}

/// Canonical task record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Stable global ID used for addressing mutations and store rows.
    pub id: TaskId,
    /// Display text. Non-empty after trimming.
    pub title: String,
    /// Optional free text.
    pub notes: Option<String>,
    pub status: TaskStatus,
    pub priority: Priority,
    /// Duration hint in minutes.
    pub estimate_minutes: Option<u32>,
    /// Hard deadline.
    pub due_at: Option<DateTime<Utc>>,
    /// Earliest intended visibility; gates the today queue at day granularity.
    pub scheduled_at: Option<DateTime<Utc>>,
    /// While in the future, suppresses eligibility.
    pub snooze_until: Option<DateTime<Utc>>,
    /// Set exactly once, on the transition to `Done`.
    pub completed_at: Option<DateTime<Utc>>,
    /// Immutable creation instant. Final ranking tie-break and fallback for
    /// history grouping.
    pub created_at: DateTime<Utc>,
    /// Manual ordering among equally ranked tasks. Not necessarily
    /// contiguous or unique.
    pub order_index: i64,
    /// Free-form labels. Insertion order is irrelevant.
    pub tags: BTreeSet<String>,
    /// Incremented on every explicit skip.
    pub skips_count: u32,
    pub subtasks: Vec<Subtask>,
}

impl Task {
    /// Creates an active task with a generated stable ID.
    ///
    /// # Invariants
    /// - Optional fields start as `None`.
    /// - `skips_count` starts at 0.
    pub fn new(title: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self::with_id(Uuid::new_v4(), title, created_at)
    }

    /// Creates a task with a caller-provided stable ID.
    ///
    /// Used by hydration and tests where identity already exists.
    pub fn with_id(id: TaskId, title: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            title: title.into(),
            notes: None,
            status: TaskStatus::Active,
            priority: Priority::Normal,
            estimate_minutes: None,
            due_at: None,
            scheduled_at: None,
            snooze_until: None,
            completed_at: None,
            created_at,
            order_index: 0,
            tags: BTreeSet::new(),
            skips_count: 0,
            subtasks: Vec::new(),
        }
    }

    /// Checks model invariants.
    ///
    /// Write paths must call this before SQL mutations; read paths use it to
    /// reject invalid persisted state instead of masking it.
    pub fn validate(&self) -> Result<(), TaskValidationError> {
        if self.title.trim().is_empty() {
            return Err(TaskValidationError::EmptyTitle);
        }
        match (self.status, self.completed_at) {
            (TaskStatus::Done, None) => Err(TaskValidationError::MissingCompletedAt),
            (TaskStatus::Active, Some(_)) | (TaskStatus::Archived, Some(_)) => {
                Err(TaskValidationError::UnexpectedCompletedAt)
            }
            _ => Ok(()),
        }
    }
}

/// Validation failures for task records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskValidationError {
    /// Title is empty after trimming.
    EmptyTitle,
    /// `status == Done` without a completion timestamp.
    MissingCompletedAt,
    /// Completion timestamp on a task that is not done.
    UnexpectedCompletedAt,
}

impl Display for TaskValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "task title must not be empty"),
            Self::MissingCompletedAt => write!(f, "done task is missing completed_at"),
            Self::UnexpectedCompletedAt => {
                write!(f, "completed_at is set on a task that is not done")
            }
        }
    }
}

impl Error for TaskValidationError {}

/// Caller input for the Add operation.
///
/// Everything except the title is optional; the store fills queue defaults
/// (`order_index`, `scheduled_at`, `created_at`) at insertion time.
#[derive(Debug, Clone, Default)]
pub struct TaskDraft {
    pub title: String,
    pub notes: Option<String>,
    pub priority: Option<Priority>,
    pub estimate_minutes: Option<u32>,
    pub due_at: Option<DateTime<Utc>>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub tags: BTreeSet<String>,
    pub subtasks: Vec<Subtask>,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// Partial update for the Update operation.
///
/// Outer `None` leaves a field untouched; for clearable fields the inner
/// option distinguishes "set to value" from "clear".
///
/// `status` and `completed_at` are deliberately absent: lifecycle
/// transitions go through `complete`/`remove` so the done/completed_at
/// invariant cannot be broken by a patch.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub notes: Option<Option<String>>,
    pub priority: Option<Priority>,
    pub estimate_minutes: Option<Option<u32>>,
    pub due_at: Option<Option<DateTime<Utc>>>,
    pub scheduled_at: Option<Option<DateTime<Utc>>>,
    pub snooze_until: Option<Option<DateTime<Utc>>>,
    pub tags: Option<BTreeSet<String>>,
    pub subtasks: Option<Vec<Subtask>>,
}

impl TaskPatch {
    /// Applies the patch to a task, returning the merged copy.
    ///
    /// The caller validates the result before committing it anywhere.
    pub fn apply_to(&self, task: &Task) -> Task {
        let mut next = task.clone();
        if let Some(title) = &self.title {
            next.title = title.clone();
        }
        if let Some(notes) = &self.notes {
            next.notes = notes.clone();
        }
        if let Some(priority) = self.priority {
            next.priority = priority;
        }
        if let Some(estimate) = self.estimate_minutes {
            next.estimate_minutes = estimate;
        }
        if let Some(due_at) = self.due_at {
            next.due_at = due_at;
        }
        if let Some(scheduled_at) = self.scheduled_at {
            next.scheduled_at = scheduled_at;
        }
        if let Some(snooze_until) = self.snooze_until {
            next.snooze_until = snooze_until;
        }
        if let Some(tags) = &self.tags {
            next.tags = tags.clone();
        }
        if let Some(subtasks) = &self.subtasks {
            next.subtasks = subtasks.clone();
        }
        next
    }
}
