//! PostgreSQL-backed `TaskRepository` implementation using Diesel.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use pagination::PageRequest;

use crate::domain::ports::{TaskPersistenceError, TaskRepository};
use crate::domain::task::{Task, TaskContent, TaskId, TaskState};
use crate::domain::user::UserId;

use super::error_mapping::{DbFailure, classify_diesel, classify_pool};
use super::models::{NewTaskRow, TaskRow, TaskUpdateRow};
use super::pool::DbPool;
use super::schema::tasks;

/// Diesel-backed implementation of the `TaskRepository` port.
#[derive(Clone)]
pub struct DieselTaskRepository {
    pool: DbPool,
}

impl DieselTaskRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn conn(
        &self,
    ) -> Result<
        diesel_async::pooled_connection::bb8::PooledConnection<'_, diesel_async::AsyncPgConnection>,
        TaskPersistenceError,
    > {
        self.pool
            .get()
            .await
            .map_err(|err| map_failure(classify_pool(err)))
    }
}

fn map_failure(failure: DbFailure) -> TaskPersistenceError {
    match failure {
        DbFailure::Connection(message) => TaskPersistenceError::connection(message),
        DbFailure::Query(message) | DbFailure::UniqueViolation(message) => {
            TaskPersistenceError::query(message)
        }
    }
}

fn row_to_task(row: TaskRow) -> Result<Task, TaskPersistenceError> {
    let corrupted =
        |what: &str| TaskPersistenceError::query(format!("corrupted {what} in database"));

    let content = TaskContent::new(row.title, row.notes, row.due_at)
        .map_err(|_| corrupted("task content"))?;
    let state = TaskState::parse(&row.state).ok_or_else(|| corrupted("state"))?;
    Ok(Task::from_parts(
        TaskId::from_uuid(row.id),
        UserId::from_uuid(row.owner_id),
        content,
        state,
        row.completed_at,
        row.created_at,
        row.updated_at,
    ))
}

#[async_trait]
impl TaskRepository for DieselTaskRepository {
    async fn insert(&self, task: &Task) -> Result<(), TaskPersistenceError> {
        let mut conn = self.conn().await?;
        let content = task.content();
        let row = NewTaskRow {
            id: *task.id().as_uuid(),
            owner_id: *task.owner().as_uuid(),
            title: &content.title,
            notes: content.notes.as_deref(),
            due_at: content.due_at,
            state: task.state().as_str(),
            completed_at: task.completed_at(),
            created_at: task.created_at(),
            updated_at: task.updated_at(),
        };
        diesel::insert_into(tasks::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(|err| map_failure(classify_diesel(err)))
    }

    async fn update(&self, task: &Task) -> Result<(), TaskPersistenceError> {
        let mut conn = self.conn().await?;
        let content = task.content();
        let changes = TaskUpdateRow {
            title: &content.title,
            notes: Some(content.notes.as_deref()),
            due_at: Some(content.due_at),
            state: task.state().as_str(),
            completed_at: Some(task.completed_at()),
            updated_at: task.updated_at(),
        };
        diesel::update(tasks::table.find(task.id().as_uuid()))
            .set(&changes)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(|err| map_failure(classify_diesel(err)))
    }

    async fn find_by_id(&self, id: &TaskId) -> Result<Option<Task>, TaskPersistenceError> {
        let mut conn = self.conn().await?;
        let row: Option<TaskRow> = tasks::table
            .find(id.as_uuid())
            .select(TaskRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(|err| map_failure(classify_diesel(err)))?;
        row.map(row_to_task).transpose()
    }

    async fn delete(&self, id: &TaskId) -> Result<(), TaskPersistenceError> {
        let mut conn = self.conn().await?;
        diesel::delete(tasks::table.find(id.as_uuid()))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(|err| map_failure(classify_diesel(err)))
    }

    async fn list_by_owner(
        &self,
        owner: &UserId,
        page: PageRequest,
    ) -> Result<(Vec<Task>, u64), TaskPersistenceError> {
        let mut conn = self.conn().await?;
        let base = tasks::table.filter(tasks::owner_id.eq(owner.as_uuid()));

        let total: i64 = base
            .clone()
            .count()
            .get_result(&mut conn)
            .await
            .map_err(|err| map_failure(classify_diesel(err)))?;

        let rows: Vec<TaskRow> = base
            .order(tasks::created_at.desc())
            .offset(page.offset())
            .limit(i64::from(page.limit()))
            .select(TaskRow::as_select())
            .load(&mut conn)
            .await
            .map_err(|err| map_failure(classify_diesel(err)))?;

        let items = rows
            .into_iter()
            .map(row_to_task)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((items, total.unsigned_abs()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn rows_rehydrate() {
        let row = TaskRow {
            id: uuid::Uuid::new_v4(),
            owner_id: uuid::Uuid::new_v4(),
            title: "File the report".to_owned(),
            notes: Some("Before Friday".to_owned()),
            due_at: None,
            state: "pending".to_owned(),
            completed_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let task = row_to_task(row).expect("row rehydrates");
        assert_eq!(task.state(), TaskState::Pending);
        assert_eq!(task.content().notes.as_deref(), Some("Before Friday"));
    }

    #[test]
    fn unknown_states_fail_rehydration() {
        let row = TaskRow {
            id: uuid::Uuid::new_v4(),
            owner_id: uuid::Uuid::new_v4(),
            title: "File the report".to_owned(),
            notes: None,
            due_at: None,
            state: "overdue".to_owned(),
            completed_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(row_to_task(row).is_err());
    }
}
