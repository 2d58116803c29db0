use axum::{
    Json,
    extract::{Path, State},
    http::HeaderMap,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_sessions::Session;

use super::auth::{client_info, current_user};
use super::{ApiError, ApiResponse, AppState, MessageResponse, TaskDto};
use crate::services::SessionUser;

/// Oldest date a task may carry, relative to today.
const BACKFILL_DAYS: i64 = 5;

const PRIORITIES: &[&str] = &["low", "medium", "high"];

#[derive(Deserialize)]
pub struct TaskRequest {
    pub title: String,
    pub description: Option<String>,
    pub date: String,
    #[serde(default = "default_priority")]
    pub priority: String,
}

fn default_priority() -> String {
    "medium".to_string()
}

fn validate(payload: &TaskRequest) -> Result<(), ApiError> {
    if payload.title.trim().is_empty() {
        return Err(ApiError::validation("Title is required"));
    }

    if !PRIORITIES.contains(&payload.priority.as_str()) {
        return Err(ApiError::validation("Priority must be low, medium or high"));
    }

    let Ok(date) = chrono::NaiveDate::parse_from_str(&payload.date, "%Y-%m-%d") else {
        return Err(ApiError::validation("Date must be YYYY-MM-DD"));
    };

    let today = chrono::Utc::now().date_naive();
    let earliest = today - chrono::Duration::days(BACKFILL_DAYS);

    if date < earliest || date > today {
        return Err(ApiError::validation(format!(
            "Date must be between {earliest} and {today}"
        )));
    }

    Ok(())
}

/// Managers are read-only on tasks; writes belong to employees.
fn require_employee_writer(user: &SessionUser) -> Result<(), ApiError> {
    if user.is_manager() {
        return Err(ApiError::permission_denied());
    }
    Ok(())
}

/// GET /tasks
/// Managers see every task, employees only their own.
pub async fn list_tasks(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<ApiResponse<Vec<TaskDto>>>, ApiError> {
    let user = current_user(&session).await?;

    let tasks = if user.is_manager() {
        state.store().list_all_tasks().await?
    } else {
        state.store().list_tasks_for_account(user.id).await?
    };

    Ok(Json(ApiResponse::success(
        tasks.into_iter().map(TaskDto::from).collect(),
    )))
}

/// POST /tasks
pub async fn create_task(
    State(state): State<Arc<AppState>>,
    session: Session,
    headers: HeaderMap,
    Json(payload): Json<TaskRequest>,
) -> Result<Json<ApiResponse<TaskDto>>, ApiError> {
    let user = current_user(&session).await?;
    require_employee_writer(&user)?;
    validate(&payload)?;

    let client = client_info(&headers);

    let task = state
        .store()
        .create_task(
            user.id,
            &payload.title,
            payload.description.as_deref(),
            &payload.date,
            &payload.priority,
        )
        .await?;

    state
        .security()
        .record_access(
            Some(&user),
            "TASK_CREATED",
            Some(&format!("task {} '{}'", task.id, task.title)),
            &client.ip,
            &client.user_agent,
        )
        .await;

    Ok(Json(ApiResponse::success(TaskDto::from(task))))
}

/// PUT /tasks/{id}
pub async fn update_task(
    State(state): State<Arc<AppState>>,
    session: Session,
    headers: HeaderMap,
    Path(task_id): Path<i32>,
    Json(payload): Json<TaskRequest>,
) -> Result<Json<ApiResponse<TaskDto>>, ApiError> {
    let user = current_user(&session).await?;
    require_employee_writer(&user)?;
    validate(&payload)?;

    let existing = state
        .store()
        .get_task(task_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Task {task_id} not found")))?;

    if existing.account_id != user.id {
        return Err(ApiError::permission_denied());
    }

    let client = client_info(&headers);

    let task = state
        .store()
        .update_task(
            task_id,
            &payload.title,
            payload.description.as_deref(),
            &payload.date,
            &payload.priority,
        )
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Task {task_id} not found")))?;

    state
        .security()
        .record_access(
            Some(&user),
            "TASK_UPDATED",
            Some(&format!("task {task_id}")),
            &client.ip,
            &client.user_agent,
        )
        .await;

    Ok(Json(ApiResponse::success(TaskDto::from(task))))
}

/// DELETE /tasks/{id}
pub async fn delete_task(
    State(state): State<Arc<AppState>>,
    session: Session,
    headers: HeaderMap,
    Path(task_id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let user = current_user(&session).await?;
    require_employee_writer(&user)?;

    let existing = state
        .store()
        .get_task(task_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Task {task_id} not found")))?;

    if existing.account_id != user.id {
        return Err(ApiError::permission_denied());
    }

    let client = client_info(&headers);

    state.store().delete_task(task_id).await?;

    state
        .security()
        .record_access(
            Some(&user),
            "TASK_DELETED",
            Some(&format!("task {task_id}")),
            &client.ip,
            &client.user_agent,
        )
        .await;

    Ok(Json(ApiResponse::success(MessageResponse {
        message: "Task deleted".to_string(),
    })))
}
