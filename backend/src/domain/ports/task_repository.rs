//! Persistence port for per-user tasks.

use async_trait::async_trait;
use pagination::PageRequest;

use crate::domain::task::{Task, TaskId};
use crate::domain::user::UserId;

/// Failures surfaced by task persistence adapters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskPersistenceError {
    /// The backing store could not be reached.
    #[error("task store unavailable: {message}")]
    Connection {
        /// Adapter-provided context.
        message: String,
    },
    /// A query failed.
    #[error("task store error: {message}")]
    Query {
        /// Adapter-provided context.
        message: String,
    },
}

impl TaskPersistenceError {
    /// Create a connection error with the given message.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Create a query error with the given message.
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
        }
    }
}

/// Persistence port for tasks.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Insert a new task.
    async fn insert(&self, task: &Task) -> Result<(), TaskPersistenceError>;

    /// Persist changes to an existing task.
    async fn update(&self, task: &Task) -> Result<(), TaskPersistenceError>;

    /// Fetch a task by id.
    async fn find_by_id(&self, id: &TaskId) -> Result<Option<Task>, TaskPersistenceError>;

    /// Delete a task.
    async fn delete(&self, id: &TaskId) -> Result<(), TaskPersistenceError>;

    /// One owner's tasks, newest creation first, with the total count.
    async fn list_by_owner(
        &self,
        owner: &UserId,
        page: PageRequest,
    ) -> Result<(Vec<Task>, u64), TaskPersistenceError>;
}

/// In-memory [`TaskRepository`] used by tests and database-less runs.
#[derive(Debug, Default)]
pub struct InMemoryTaskRepository {
    tasks: std::sync::RwLock<Vec<Task>>,
}

impl InMemoryTaskRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Vec<Task>>, TaskPersistenceError> {
        self.tasks
            .read()
            .map_err(|_| TaskPersistenceError::query("task store lock poisoned"))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Vec<Task>>, TaskPersistenceError> {
        self.tasks
            .write()
            .map_err(|_| TaskPersistenceError::query("task store lock poisoned"))
    }
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepository {
    async fn insert(&self, task: &Task) -> Result<(), TaskPersistenceError> {
        self.write()?.push(task.clone());
        Ok(())
    }

    async fn update(&self, task: &Task) -> Result<(), TaskPersistenceError> {
        let mut tasks = self.write()?;
        match tasks.iter_mut().find(|t| t.id() == task.id()) {
            Some(existing) => {
                *existing = task.clone();
                Ok(())
            }
            None => Err(TaskPersistenceError::query("task not found")),
        }
    }

    async fn find_by_id(&self, id: &TaskId) -> Result<Option<Task>, TaskPersistenceError> {
        Ok(self.read()?.iter().find(|t| t.id() == id).cloned())
    }

    async fn delete(&self, id: &TaskId) -> Result<(), TaskPersistenceError> {
        self.write()?.retain(|t| t.id() != id);
        Ok(())
    }

    async fn list_by_owner(
        &self,
        owner: &UserId,
        page: PageRequest,
    ) -> Result<(Vec<Task>, u64), TaskPersistenceError> {
        let tasks = self.read()?;
        let mut owned: Vec<Task> = tasks.iter().filter(|t| t.owner() == owner).cloned().collect();
        owned.sort_by_key(|t| std::cmp::Reverse(t.created_at()));
        let total = owned.len() as u64;
        let items = owned
            .into_iter()
            .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
            .take(page.limit() as usize)
            .collect();
        Ok((items, total))
    }
}
