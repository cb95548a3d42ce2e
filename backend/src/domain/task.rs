//! Per-user tasks with derived overdue reporting.
//!
//! Only `pending` and `completed` are persisted; `overdue` is derived from
//! the due date at read time so it can never go stale.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::user::UserId;

/// Maximum task title length in characters.
pub const TASK_TITLE_MAX: usize = 120;
/// Maximum task notes length in characters.
pub const TASK_NOTES_MAX: usize = 1000;

/// Validation errors for task components.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskValidationError {
    /// The id was not a valid UUID.
    #[error("task id must be a valid UUID")]
    InvalidId,
    /// The title was empty after trimming.
    #[error("task title must not be empty")]
    EmptyTitle,
    /// The title exceeded [`TASK_TITLE_MAX`].
    #[error("task title must be at most {max} characters")]
    TitleTooLong {
        /// Maximum accepted length.
        max: usize,
    },
    /// The notes exceeded [`TASK_NOTES_MAX`].
    #[error("task notes must be at most {max} characters")]
    NotesTooLong {
        /// Maximum accepted length.
        max: usize,
    },
}

/// Stable task identifier stored as a UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaskId(Uuid);

impl TaskId {
    /// Validate and construct a [`TaskId`] from string input.
    pub fn new(id: impl AsRef<str>) -> Result<Self, TaskValidationError> {
        let parsed = Uuid::parse_str(id.as_ref()).map_err(|_| TaskValidationError::InvalidId)?;
        Ok(Self(parsed))
    }

    /// Generate a new random [`TaskId`].
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an already-parsed UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<TaskId> for String {
    fn from(value: TaskId) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for TaskId {
    type Error = TaskValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Persisted task state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    /// Not yet done.
    Pending,
    /// Done.
    Completed,
}

impl TaskState {
    /// Stable string form used for persistence.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
        }
    }

    /// Parse the persisted string form.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(Self::Pending),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

/// Status reported to clients, including the derived overdue state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Not yet done, due date (if any) not passed.
    Pending,
    /// Done.
    Completed,
    /// Not done and past the due date.
    Overdue,
}

/// Validated task content fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskContent {
    /// Short description of the work.
    pub title: String,
    /// Optional free-form notes.
    pub notes: Option<String>,
    /// Optional due date.
    pub due_at: Option<DateTime<Utc>>,
}

impl TaskContent {
    /// Validate raw content fields.
    pub fn new(
        title: impl Into<String>,
        notes: Option<String>,
        due_at: Option<DateTime<Utc>>,
    ) -> Result<Self, TaskValidationError> {
        let title = title.into();
        let trimmed = title.trim();
        if trimmed.is_empty() {
            return Err(TaskValidationError::EmptyTitle);
        }
        if trimmed.chars().count() > TASK_TITLE_MAX {
            return Err(TaskValidationError::TitleTooLong {
                max: TASK_TITLE_MAX,
            });
        }
        let notes = match notes {
            Some(raw) => {
                let note = raw.trim().to_owned();
                if note.chars().count() > TASK_NOTES_MAX {
                    return Err(TaskValidationError::NotesTooLong {
                        max: TASK_NOTES_MAX,
                    });
                }
                (!note.is_empty()).then_some(note)
            }
            None => None,
        };
        Ok(Self {
            title: trimmed.to_owned(),
            notes,
            due_at,
        })
    }
}

/// A per-user task.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    id: TaskId,
    owner: UserId,
    content: TaskContent,
    state: TaskState,
    completed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Task {
    /// Create a pending task.
    pub fn new(id: TaskId, owner: UserId, content: TaskContent, now: DateTime<Utc>) -> Self {
        Self {
            id,
            owner,
            content,
            state: TaskState::Pending,
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Reassemble a task from persisted state.
    pub fn from_parts(
        id: TaskId,
        owner: UserId,
        content: TaskContent,
        state: TaskState,
        completed_at: Option<DateTime<Utc>>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            owner,
            content,
            state,
            completed_at,
            created_at,
            updated_at,
        }
    }

    /// Stable task identifier.
    pub fn id(&self) -> &TaskId {
        &self.id
    }

    /// Owning user.
    pub fn owner(&self) -> &UserId {
        &self.owner
    }

    /// Content fields.
    pub fn content(&self) -> &TaskContent {
        &self.content
    }

    /// Persisted state.
    pub fn state(&self) -> TaskState {
        self.state
    }

    /// Completion timestamp, once completed.
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Creation timestamp.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Last modification timestamp.
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Status reported to clients at `now`.
    pub fn status_at(&self, now: DateTime<Utc>) -> TaskStatus {
        match self.state {
            TaskState::Completed => TaskStatus::Completed,
            TaskState::Pending => match self.content.due_at {
                Some(due) if due < now => TaskStatus::Overdue,
                _ => TaskStatus::Pending,
            },
        }
    }

    /// Replace the content fields.
    pub fn edit(&mut self, content: TaskContent, now: DateTime<Utc>) {
        self.content = content;
        self.updated_at = now;
    }

    /// Mark the task done. Returns whether the state changed.
    pub fn complete(&mut self, now: DateTime<Utc>) -> bool {
        if self.state == TaskState::Completed {
            return false;
        }
        self.state = TaskState::Completed;
        self.completed_at = Some(now);
        self.updated_at = now;
        true
    }

    /// Reopen a completed task. Returns whether the state changed.
    pub fn reopen(&mut self, now: DateTime<Utc>) -> bool {
        if self.state == TaskState::Pending {
            return false;
        }
        self.state = TaskState::Pending;
        self.completed_at = None;
        self.updated_at = now;
        true
    }
}
