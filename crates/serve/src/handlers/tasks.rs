//! Task listing and polling endpoints

use crate::error::{not_found, ApiError};
use crate::state::AppState;
use crate::tasks::Task;
use axum::extract::{Path, State};
use axum::response::Json;
use serde_json::{json, Value};

/// All tasks, live state merged over persisted history
pub async fn list_tasks(State(state): State<AppState>) -> Json<Value> {
    let tasks = state.tasks.all_tasks().await;
    Json(json!({ "tasks": tasks }))
}

/// One task by id
pub async fn get_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<Task>, ApiError> {
    match state.tasks.get_task_or_stored(&task_id).await {
        Some(task) => Ok(Json(task)),
        None => Err(not_found("任务不存在")),
    }
}
