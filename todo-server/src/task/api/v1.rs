use crate::task::{NewTask, Task, TaskServiceError, TaskState};
use crate::web::api::ErrorResponse;
use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, patch},
};
use chrono::{DateTime, NaiveDateTime, SubsecRound, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

/// JSON representation of a Task.
#[derive(Debug, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct TaskJson {
    /// Unique identifier assigned by the store
    pub id: i32,
    /// Short title, must not be empty
    pub title: String,
    /// Optional longer description
    #[serde(default)]
    pub description: Option<String>,
    /// Expiry timestamp; offsets are normalized to UTC, a missing offset means UTC
    #[serde(deserialize_with = "deserialize_expiry")]
    pub expiry: DateTime<Utc>,
    /// Completion percentage between 0 and 100
    pub percent_complete: i32,
}

impl From<Task> for TaskJson {
    fn from(task: Task) -> Self {
        Self {
            id: task.id(),
            title: task.title().to_string(),
            description: task.description().map(str::to_string),
            expiry: task.expiry(),
            percent_complete: task.percent_complete(),
        }
    }
}

impl From<TaskJson> for Task {
    fn from(json: TaskJson) -> Self {
        Task::new(
            json.id,
            json.title,
            json.description,
            json.expiry,
            json.percent_complete,
        )
    }
}

/// Request body for creating a task.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateTaskJson {
    /// Short title, must not be empty
    pub title: String,
    /// Optional longer description
    #[serde(default)]
    pub description: Option<String>,
    /// Expiry timestamp; offsets are normalized to UTC, a missing offset means UTC
    #[serde(deserialize_with = "deserialize_expiry")]
    pub expiry: DateTime<Utc>,
    /// Completion percentage between 0 and 100
    pub percent_complete: i32,
}

impl From<CreateTaskJson> for NewTask {
    fn from(json: CreateTaskJson) -> Self {
        NewTask::new(
            json.title,
            json.description,
            json.expiry,
            json.percent_complete,
        )
    }
}

/// Response body for a created task.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreatedTaskJson {
    /// Identifier assigned to the new task
    pub id: i32,
}

/// Parses an expiry timestamp and normalizes it to UTC.
///
/// RFC 3339 input is converted from its offset; input without an offset is
/// taken to already be UTC. Precision beyond microseconds is dropped, as the
/// store keeps no more than that.
pub fn parse_expiry(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    let expiry = match DateTime::parse_from_rfc3339(raw) {
        Ok(with_offset) => with_offset.with_timezone(&Utc),
        Err(err) => raw
            .parse::<NaiveDateTime>()
            .map(|naive| naive.and_utc())
            .map_err(|_| err)?,
    };
    Ok(expiry.trunc_subsecs(6))
}

fn deserialize_expiry<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_expiry(&raw).map_err(serde::de::Error::custom)
}

/// Handler error that maps service failures onto HTTP responses.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct TaskApiError(#[from] TaskServiceError);

impl IntoResponse for TaskApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        let (status_code, error_code, message) = match &err {
            TaskServiceError::TaskNotFound(_) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string())
            }
            invalid if invalid.is_invalid_argument() => {
                (StatusCode::BAD_REQUEST, "INVALID_ARGUMENT", err.to_string())
            }
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "STORE_FAILURE",
                "An unexpected error occurred. Please try again later.".to_string(),
            ),
        };

        if status_code.is_server_error() {
            tracing::error!("Task request failed: {}", err);
        } else {
            tracing::warn!("Task request rejected: {}", err);
        }

        (
            status_code,
            Json(ErrorResponse::new(error_code.to_string(), message)),
        )
            .into_response()
    }
}

/// Handler for GET /tasks - Returns all tasks.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/tasks",
    responses(
        (status = 200, description = "Successfully retrieved tasks", body = Vec<TaskJson>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn list_tasks_handler(
    State(state): State<Arc<TaskState>>,
) -> Result<Json<Vec<TaskJson>>, TaskApiError> {
    let tasks = state.service().list_all().await?;
    Ok(Json(tasks.into_iter().map(TaskJson::from).collect()))
}

/// Handler for GET /tasks/{id} - Returns a single task.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/tasks/{id}",
    params(("id" = i32, Path, description = "Task ID")),
    responses(
        (status = 200, description = "Successfully retrieved task", body = TaskJson),
        (status = 404, description = "Task not found", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn get_task_handler(
    State(state): State<Arc<TaskState>>,
    Path(id): Path<i32>,
) -> Result<Json<TaskJson>, TaskApiError> {
    let task = state
        .service()
        .get_by_id(id)
        .await?
        .ok_or(TaskServiceError::TaskNotFound(id))?;
    Ok(Json(TaskJson::from(task)))
}

/// Handler for GET /tasks/due-today.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/tasks/due-today",
    responses((status = 200, description = "Tasks expiring today", body = Vec<TaskJson>)),
    tag = "Tasks"
)]
pub async fn due_today_handler(
    State(state): State<Arc<TaskState>>,
) -> Result<Json<Vec<TaskJson>>, TaskApiError> {
    let tasks = state.service().get_due_today().await?;
    Ok(Json(tasks.into_iter().map(TaskJson::from).collect()))
}

/// Handler for GET /tasks/due-tomorrow.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/tasks/due-tomorrow",
    responses((status = 200, description = "Tasks expiring tomorrow", body = Vec<TaskJson>)),
    tag = "Tasks"
)]
pub async fn due_tomorrow_handler(
    State(state): State<Arc<TaskState>>,
) -> Result<Json<Vec<TaskJson>>, TaskApiError> {
    let tasks = state.service().get_due_tomorrow().await?;
    Ok(Json(tasks.into_iter().map(TaskJson::from).collect()))
}

/// Handler for GET /tasks/due-this-week.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/tasks/due-this-week",
    responses((status = 200, description = "Tasks expiring this week", body = Vec<TaskJson>)),
    tag = "Tasks"
)]
pub async fn due_this_week_handler(
    State(state): State<Arc<TaskState>>,
) -> Result<Json<Vec<TaskJson>>, TaskApiError> {
    let tasks = state.service().get_due_this_week().await?;
    Ok(Json(tasks.into_iter().map(TaskJson::from).collect()))
}

/// Handler for POST /tasks - Creates a task.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    post,
    path = "/tasks",
    request_body = CreateTaskJson,
    responses(
        (status = 200, description = "Task created", body = CreatedTaskJson),
        (status = 400, description = "Invalid task", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn create_task_handler(
    State(state): State<Arc<TaskState>>,
    Json(payload): Json<CreateTaskJson>,
) -> Result<Json<CreatedTaskJson>, TaskApiError> {
    let id = state.service().create(NewTask::from(payload)).await?;
    Ok(Json(CreatedTaskJson { id }))
}

/// Handler for PUT /tasks - Replaces a task.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    put,
    path = "/tasks",
    request_body = TaskJson,
    responses(
        (status = 200, description = "Task replaced"),
        (status = 400, description = "Invalid task", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn update_task_handler(
    State(state): State<Arc<TaskState>>,
    Json(payload): Json<TaskJson>,
) -> Result<StatusCode, TaskApiError> {
    state.service().update(Task::from(payload)).await?;
    Ok(StatusCode::OK)
}

/// Handler for PATCH /tasks/{id}/complete.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    patch,
    path = "/tasks/{id}/complete",
    params(("id" = i32, Path, description = "Task ID")),
    responses(
        (status = 200, description = "Task completed"),
        (status = 404, description = "Task not found", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn complete_task_handler(
    State(state): State<Arc<TaskState>>,
    Path(id): Path<i32>,
) -> Result<StatusCode, TaskApiError> {
    state.service().complete(id).await?;
    Ok(StatusCode::OK)
}

/// Handler for PATCH /tasks/{id}/percent/{percent}.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    patch,
    path = "/tasks/{id}/percent/{percent}",
    params(
        ("id" = i32, Path, description = "Task ID"),
        ("percent" = i32, Path, description = "Completion percentage between 0 and 100")
    ),
    responses(
        (status = 200, description = "Percentage updated"),
        (status = 400, description = "Percentage out of range", body = ErrorResponse),
        (status = 404, description = "Task not found", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn set_percent_complete_handler(
    State(state): State<Arc<TaskState>>,
    Path((id, percent)): Path<(i32, i32)>,
) -> Result<StatusCode, TaskApiError> {
    state.service().set_percent_complete(id, percent).await?;
    Ok(StatusCode::OK)
}

/// Handler for DELETE /tasks/{id}.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    delete,
    path = "/tasks/{id}",
    params(("id" = i32, Path, description = "Task ID")),
    responses(
        (status = 200, description = "Task deleted"),
        (status = 404, description = "Task not found", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn delete_task_handler(
    State(state): State<Arc<TaskState>>,
    Path(id): Path<i32>,
) -> Result<StatusCode, TaskApiError> {
    state.service().delete(id).await?;
    Ok(StatusCode::OK)
}

/// Creates and returns the tasks API router.
pub fn create_api_router(state: Arc<TaskState>) -> Router {
    Router::new()
        .route(
            "/tasks",
            get(list_tasks_handler)
                .post(create_task_handler)
                .put(update_task_handler),
        )
        .route("/tasks/due-today", get(due_today_handler))
        .route("/tasks/due-tomorrow", get(due_tomorrow_handler))
        .route("/tasks/due-this-week", get(due_this_week_handler))
        .route(
            "/tasks/{id}",
            get(get_task_handler).delete(delete_task_handler),
        )
        .route("/tasks/{id}/complete", patch(complete_task_handler))
        .route(
            "/tasks/{id}/percent/{percent}",
            patch(set_percent_complete_handler),
        )
        .with_state(state)
}
