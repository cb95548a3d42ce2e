//! Task API handlers.
//!
//! ```text
//! POST   /api/v1/tasks                Create
//! GET    /api/v1/tasks                Own tasks
//! PUT    /api/v1/tasks/{id}           Edit
//! POST   /api/v1/tasks/{id}/complete  Mark done
//! POST   /api/v1/tasks/{id}/reopen    Reopen
//! DELETE /api/v1/tasks/{id}           Delete
//! ```

use actix_web::{HttpResponse, delete, get, post, put, web};
use chrono::{DateTime, Utc};
use pagination::Page;
use serde::{Deserialize, Serialize};

use crate::domain::Error;
use crate::domain::ports::TaskPersistenceError;
use crate::domain::task::{Task, TaskContent, TaskId};
use crate::domain::user::UserId;
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::{PageQuery, TaskDto};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

/// Task create/update request body.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskRequest {
    /// Short description of the work.
    pub title: String,
    /// Optional free-form notes.
    #[serde(default)]
    pub notes: Option<String>,
    /// Optional due date.
    #[serde(default)]
    pub due_at: Option<DateTime<Utc>>,
}

impl TaskRequest {
    fn into_content(self) -> Result<TaskContent, Error> {
        TaskContent::new(self.title, self.notes, self.due_at)
            .map_err(|err| Error::invalid_request(err.to_string()))
    }
}

fn map_task_error(error: TaskPersistenceError) -> Error {
    match error {
        TaskPersistenceError::Connection { message } => Error::service_unavailable(message),
        TaskPersistenceError::Query { message } => Error::internal(message),
    }
}

fn parse_task_id(raw: &str) -> Result<TaskId, Error> {
    TaskId::new(raw).map_err(|err| Error::invalid_request(err.to_string()))
}

async fn load_owned(state: &HttpState, owner: &UserId, id: &TaskId) -> Result<Task, Error> {
    let task = state
        .tasks
        .find_by_id(id)
        .await
        .map_err(map_task_error)?
        .ok_or_else(|| Error::not_found("task not found"))?;
    if task.owner() != owner {
        // Other users' tasks do not exist as far as the caller can tell.
        return Err(Error::not_found("task not found"));
    }
    Ok(task)
}

/// Create a task.
#[utoipa::path(
    post,
    path = "/api/v1/tasks",
    request_body = TaskRequest,
    responses(
        (status = 201, description = "Task created", body = TaskDto),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Unauthorised", body = Error)
    ),
    tags = ["tasks"],
    operation_id = "createTask"
)]
#[post("/tasks")]
pub async fn create_task(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<TaskRequest>,
) -> ApiResult<HttpResponse> {
    let owner = session.require_user_id()?;
    let content = payload.into_inner().into_content()?;
    let now = Utc::now();
    let task = Task::new(TaskId::random(), owner, content, now);
    state.tasks.insert(&task).await.map_err(map_task_error)?;
    Ok(HttpResponse::Created().json(TaskDto::from_task(&task, now)))
}

/// Own tasks, newest first, with derived overdue status.
#[utoipa::path(
    get,
    path = "/api/v1/tasks",
    params(PageQuery),
    responses(
        (status = 200, description = "Tasks", body = Page<TaskDto>),
        (status = 401, description = "Unauthorised", body = Error)
    ),
    tags = ["tasks"],
    operation_id = "listTasks"
)]
#[get("/tasks")]
pub async fn list_tasks(
    state: web::Data<HttpState>,
    session: SessionContext,
    query: web::Query<PageQuery>,
) -> ApiResult<web::Json<Page<TaskDto>>> {
    let owner = session.require_user_id()?;
    let page = query.into_inner().into_request()?;
    let (items, total) = state
        .tasks
        .list_by_owner(&owner, page)
        .await
        .map_err(map_task_error)?;
    let now = Utc::now();
    let dtos = items
        .iter()
        .map(|task| TaskDto::from_task(task, now))
        .collect();
    Ok(web::Json(Page::new(dtos, page, total)))
}

/// Edit a task's content.
#[utoipa::path(
    put,
    path = "/api/v1/tasks/{id}",
    params(("id" = String, Path, description = "Task id")),
    request_body = TaskRequest,
    responses(
        (status = 200, description = "Updated task", body = TaskDto),
        (status = 400, description = "Invalid request", body = Error),
        (status = 404, description = "Not found", body = Error)
    ),
    tags = ["tasks"],
    operation_id = "updateTask"
)]
#[put("/tasks/{id}")]
pub async fn update_task(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    payload: web::Json<TaskRequest>,
) -> ApiResult<web::Json<TaskDto>> {
    let owner = session.require_user_id()?;
    let id = parse_task_id(&path)?;
    let content = payload.into_inner().into_content()?;
    let mut task = load_owned(&state, &owner, &id).await?;
    let now = Utc::now();
    task.edit(content, now);
    state.tasks.update(&task).await.map_err(map_task_error)?;
    Ok(web::Json(TaskDto::from_task(&task, now)))
}

/// Mark a task done.
#[utoipa::path(
    post,
    path = "/api/v1/tasks/{id}/complete",
    params(("id" = String, Path, description = "Task id")),
    responses(
        (status = 200, description = "Completed task", body = TaskDto),
        (status = 404, description = "Not found", body = Error)
    ),
    tags = ["tasks"],
    operation_id = "completeTask"
)]
#[post("/tasks/{id}/complete")]
pub async fn complete_task(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<TaskDto>> {
    let owner = session.require_user_id()?;
    let id = parse_task_id(&path)?;
    let mut task = load_owned(&state, &owner, &id).await?;
    let now = Utc::now();
    if task.complete(now) {
        state.tasks.update(&task).await.map_err(map_task_error)?;
    }
    Ok(web::Json(TaskDto::from_task(&task, now)))
}

/// Reopen a completed task.
#[utoipa::path(
    post,
    path = "/api/v1/tasks/{id}/reopen",
    params(("id" = String, Path, description = "Task id")),
    responses(
        (status = 200, description = "Reopened task", body = TaskDto),
        (status = 404, description = "Not found", body = Error)
    ),
    tags = ["tasks"],
    operation_id = "reopenTask"
)]
#[post("/tasks/{id}/reopen")]
pub async fn reopen_task(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<TaskDto>> {
    let owner = session.require_user_id()?;
    let id = parse_task_id(&path)?;
    let mut task = load_owned(&state, &owner, &id).await?;
    let now = Utc::now();
    if task.reopen(now) {
        state.tasks.update(&task).await.map_err(map_task_error)?;
    }
    Ok(web::Json(TaskDto::from_task(&task, now)))
}

/// Delete a task.
#[utoipa::path(
    delete,
    path = "/api/v1/tasks/{id}",
    params(("id" = String, Path, description = "Task id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not found", body = Error)
    ),
    tags = ["tasks"],
    operation_id = "deleteTask"
)]
#[delete("/tasks/{id}")]
pub async fn delete_task(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let owner = session.require_user_id()?;
    let id = parse_task_id(&path)?;
    let _ = load_owned(&state, &owner, &id).await?;
    state.tasks.delete(&id).await.map_err(map_task_error)?;
    Ok(HttpResponse::NoContent().finish())
}
