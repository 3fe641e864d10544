use axum::extract::{Path, State};
use axum::{http::StatusCode, Json};
use serde_json::{json, Value};
use tracing::info;

use crate::db::{create_task, delete_task, list_tasks, update_task};
use crate::error::AppError;
use crate::middleware::AuthUser;
use crate::models::{CreateTask, Task, UpdateTask};
use crate::AppState;

pub async fn list_user_tasks(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Task>>, AppError> {
    let tasks = list_tasks(&state.db, &user_id)?;
    info!(%user_id, count = tasks.len(), "Listed tasks");
    Ok(Json(tasks))
}

pub async fn create_new_task(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<CreateTask>,
) -> Result<(StatusCode, Json<Task>), AppError> {
    if req.title.trim().is_empty() {
        return Err(AppError::BadRequest("Title cannot be empty"));
    }

    let task = create_task(&state.db, &user_id, &req)?;
    info!(id = %task.id, title = %task.title, "Created task");
    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn update_existing_task(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateTask>,
) -> Result<Json<Task>, AppError> {
    if let Some(ref title) = req.title {
        if title.trim().is_empty() {
            return Err(AppError::BadRequest("Title cannot be empty"));
        }
    }

    match update_task(&state.db, &user_id, &id, &req)? {
        Some(task) => {
            info!(id = %task.id, completed = task.completed, "Updated task");
            Ok(Json(task))
        }
        None => Err(AppError::NotFound),
    }
}

/// Always acknowledges; deleting a missing task is a no-op.
pub async fn delete_existing_task(
    AuthUser(user_id): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let removed = delete_task(&state.db, &user_id, &id)?;
    info!(%id, removed, "Deleted task");
    Ok(Json(json!({ "msg": "Task deleted" })))
}
