use std::sync::Arc;

use axum::Router;
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

use crate::task::TaskState;
use crate::task::api::v1::{self as tasks_v1, CreateTaskJson, CreatedTaskJson, TaskJson};

/// JSON response for API errors
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Machine-readable error code
    pub error: String,
    /// Human-readable description
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: String, message: String) -> Self {
        Self { error, message }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        tasks_v1::list_tasks_handler,
        tasks_v1::get_task_handler,
        tasks_v1::due_today_handler,
        tasks_v1::due_tomorrow_handler,
        tasks_v1::due_this_week_handler,
        tasks_v1::create_task_handler,
        tasks_v1::update_task_handler,
        tasks_v1::complete_task_handler,
        tasks_v1::set_percent_complete_handler,
        tasks_v1::delete_task_handler,
    ),
    components(schemas(TaskJson, CreateTaskJson, CreatedTaskJson, ErrorResponse)),
    tags((name = "Tasks", description = "To-do items and their due dates"))
)]
pub struct ApiDoc;

/// Creates the API routes for JSON API endpoints, plus Swagger UI over the
/// generated OpenAPI document.
pub fn create_api_router(task_state: Arc<TaskState>) -> Router {
    tasks_v1::create_api_router(task_state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
