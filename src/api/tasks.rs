//! Task endpoints.
//!
//! These operate on concrete tasks only (standalone or generated from a
//! template); recurring templates are managed through the
//! `/recurring-tasks` surface and are invisible here.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::db::{
    CreateTaskRequest, DbPool, Task, TaskListResponse, TaskResponse, TaskTemplate,
    UpdateTaskRequest, User, SESSION_WORK,
};
use crate::engine;
use crate::AppState;

use super::error::{ApiError, ValidationErrorBuilder};
use super::validation::{
    validate_description, validate_priority, validate_recurrence_days, validate_recurrence_type,
    validate_title, validate_uuid,
};

#[derive(Debug, Serialize)]
pub struct TaskEnvelope {
    pub message: String,
    pub task: TaskResponse,
}

/// Count of completed work sessions attached to a task.
pub(super) async fn work_session_count(pool: &DbPool, task_id: &str) -> Result<i64, sqlx::Error> {
    let row: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM focus_sessions WHERE task_id = ? AND kind = ?")
            .bind(task_id)
            .bind(SESSION_WORK)
            .fetch_one(pool)
            .await?;
    Ok(row.0)
}

fn validate_create_request(req: &CreateTaskRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    if let Err(e) = validate_title(&req.title) {
        errors.add("title", e);
    }
    if let Err(e) = validate_description(&req.description) {
        errors.add("description", e);
    }
    if let Err(e) = validate_priority(req.priority) {
        errors.add("priority", e);
    }

    if req.is_recurring {
        match req.recurrence_type.as_deref() {
            None => {
                errors.add("recurrence_type", "Recurrence type is required for recurring tasks");
            }
            Some(kind) => {
                if let Err(e) = validate_recurrence_type(kind) {
                    errors.add("recurrence_type", e);
                } else if kind == "weekly" {
                    match req.recurrence_days.as_deref() {
                        None => {
                            errors.add(
                                "recurrence_days",
                                "Recurrence days are required for weekly tasks",
                            );
                        }
                        Some(days) => {
                            if let Err(e) = validate_recurrence_days(days) {
                                errors.add("recurrence_days", e);
                            }
                        }
                    }
                }
            }
        }
    }

    errors.finish()
}

/// List today's tasks, materializing recurring instances first.
pub async fn list_tasks(
    State(state): State<Arc<AppState>>,
    user: User,
) -> Result<Json<TaskListResponse>, ApiError> {
    let today = Utc::now().date_naive();

    engine::ensure_instances(&state.db, &user.id, today).await?;

    let tasks: Vec<Task> = sqlx::query_as(
        "SELECT * FROM tasks \
         WHERE user_id = ? AND due_date = ? AND is_recurring = 0 \
         ORDER BY priority DESC, created_at ASC",
    )
    .bind(&user.id)
    .bind(today)
    .fetch_all(&state.db)
    .await?;

    let mut responses = Vec::with_capacity(tasks.len());
    for task in tasks {
        let count = work_session_count(&state.db, &task.id).await?;
        responses.push(task.into_response(count));
    }

    Ok(Json(TaskListResponse { tasks: responses }))
}

/// Create a task, or a recurring template when `is_recurring` is set.
pub async fn create_task(
    State(state): State<Arc<AppState>>,
    user: User,
    Json(req): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<TaskEnvelope>), ApiError> {
    validate_create_request(&req)?;

    let id = Uuid::new_v4().to_string();
    let now = Utc::now();
    let due_date = req.due_date.unwrap_or_else(|| now.date_naive());

    // Recurrence fields are only meaningful on templates.
    let recurrence_type = req.is_recurring.then_some(req.recurrence_type).flatten();
    let recurrence_days = req.is_recurring.then_some(req.recurrence_days).flatten();

    sqlx::query(
        "INSERT INTO tasks (id, user_id, title, description, priority, completed, due_date, \
                            created_at, is_recurring, recurrence_type, recurrence_days) \
         VALUES (?, ?, ?, ?, ?, 0, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(&user.id)
    .bind(&req.title)
    .bind(&req.description)
    .bind(req.priority)
    .bind(due_date)
    .bind(now)
    .bind(req.is_recurring)
    .bind(&recurrence_type)
    .bind(&recurrence_days)
    .execute(&state.db)
    .await?;

    let task = if req.is_recurring {
        let template: TaskTemplate = sqlx::query_as(
            "SELECT id, user_id, title, description, priority, completed, due_date, created_at, \
                    recurrence_type, recurrence_days \
             FROM tasks WHERE id = ?",
        )
        .bind(&id)
        .fetch_one(&state.db)
        .await?;
        template.into_response(0)
    } else {
        let task: Task = sqlx::query_as("SELECT * FROM tasks WHERE id = ?")
            .bind(&id)
            .fetch_one(&state.db)
            .await?;
        task.into_response(0)
    };

    Ok((
        StatusCode::CREATED,
        Json(TaskEnvelope {
            message: "Task created successfully".to_string(),
            task,
        }),
    ))
}

fn validate_update_request(req: &UpdateTaskRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    if let Some(ref title) = req.title {
        if let Err(e) = validate_title(title) {
            errors.add("title", e);
        }
    }
    if let Some(ref description) = req.description {
        if let Err(e) = validate_description(description) {
            errors.add("description", e);
        }
    }
    if let Some(priority) = req.priority {
        if let Err(e) = validate_priority(priority) {
            errors.add("priority", e);
        }
    }

    errors.finish()
}

/// Partially update an owned task.
pub async fn update_task(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
    Json(req): Json<UpdateTaskRequest>,
) -> Result<Json<TaskEnvelope>, ApiError> {
    if let Err(e) = validate_uuid(&id, "task_id") {
        return Err(ApiError::validation_field("task_id", e));
    }
    validate_update_request(&req)?;

    let existing: Option<Task> = sqlx::query_as(
        "SELECT * FROM tasks WHERE id = ? AND user_id = ? AND is_recurring = 0",
    )
    .bind(&id)
    .bind(&user.id)
    .fetch_optional(&state.db)
    .await?;
    existing.ok_or_else(|| ApiError::not_found("Task not found"))?;

    sqlx::query(
        "UPDATE tasks SET \
            title = COALESCE(?, title), \
            description = COALESCE(?, description), \
            priority = COALESCE(?, priority), \
            completed = COALESCE(?, completed), \
            due_date = COALESCE(?, due_date) \
         WHERE id = ? AND user_id = ?",
    )
    .bind(&req.title)
    .bind(&req.description)
    .bind(req.priority)
    .bind(req.completed)
    .bind(req.due_date)
    .bind(&id)
    .bind(&user.id)
    .execute(&state.db)
    .await?;

    let task: Task = sqlx::query_as("SELECT * FROM tasks WHERE id = ?")
        .bind(&id)
        .fetch_one(&state.db)
        .await?;

    let count = work_session_count(&state.db, &task.id).await?;

    Ok(Json(TaskEnvelope {
        message: "Task updated successfully".to_string(),
        task: task.into_response(count),
    }))
}

/// Delete an owned task.
pub async fn delete_task(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
) -> Result<Json<super::profile::MessageResponse>, ApiError> {
    if let Err(e) = validate_uuid(&id, "task_id") {
        return Err(ApiError::validation_field("task_id", e));
    }

    let result = sqlx::query("DELETE FROM tasks WHERE id = ? AND user_id = ? AND is_recurring = 0")
        .bind(&id)
        .bind(&user.id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Task not found"));
    }

    Ok(Json(super::profile::MessageResponse {
        message: "Task deleted successfully".to_string(),
    }))
}

/// Flip a task's completion flag.
pub async fn toggle_task(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
) -> Result<Json<TaskEnvelope>, ApiError> {
    if let Err(e) = validate_uuid(&id, "task_id") {
        return Err(ApiError::validation_field("task_id", e));
    }

    let result = sqlx::query(
        "UPDATE tasks SET completed = NOT completed \
         WHERE id = ? AND user_id = ? AND is_recurring = 0",
    )
    .bind(&id)
    .bind(&user.id)
    .execute(&state.db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Task not found"));
    }

    let task: Task = sqlx::query_as("SELECT * FROM tasks WHERE id = ?")
        .bind(&id)
        .fetch_one(&state.db)
        .await?;

    let count = work_session_count(&state.db, &task.id).await?;

    Ok(Json(TaskEnvelope {
        message: "Task toggled successfully".to_string(),
        task: task.into_response(count),
    }))
}
