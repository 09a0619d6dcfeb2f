//! Recurring-task template management.
//!
//! Templates are definitions, never schedulable work: the task endpoints
//! do not see them, and deleting one detaches its generated instances
//! instead of removing them.

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::db::{TaskTemplate, TemplateListResponse, UpdateTemplateRequest, User};
use crate::AppState;

use super::error::{ApiError, ValidationErrorBuilder};
use super::profile::MessageResponse;
use super::tasks::{work_session_count, TaskEnvelope};
use super::validation::{
    validate_description, validate_priority, validate_recurrence_days, validate_recurrence_type,
    validate_title, validate_uuid,
};

const TEMPLATE_COLUMNS: &str =
    "id, user_id, title, description, priority, completed, due_date, created_at, \
     recurrence_type, recurrence_days";

/// List the caller's recurring templates, newest first.
pub async fn list_templates(
    State(state): State<Arc<AppState>>,
    user: User,
) -> Result<Json<TemplateListResponse>, ApiError> {
    let templates: Vec<TaskTemplate> = sqlx::query_as(&format!(
        "SELECT {TEMPLATE_COLUMNS} FROM tasks \
         WHERE user_id = ? AND is_recurring = 1 AND recurring_parent_id IS NULL \
         ORDER BY created_at DESC"
    ))
    .bind(&user.id)
    .fetch_all(&state.db)
    .await?;

    let mut responses = Vec::with_capacity(templates.len());
    for template in templates {
        let count = work_session_count(&state.db, &template.id).await?;
        responses.push(template.into_response(count));
    }

    Ok(Json(TemplateListResponse {
        recurring_tasks: responses,
    }))
}

fn validate_update_request(req: &UpdateTemplateRequest) -> Result<(), ApiError> {
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
    if let Some(ref kind) = req.recurrence_type {
        if let Err(e) = validate_recurrence_type(kind) {
            errors.add("recurrence_type", e);
        }
    }
    if let Some(ref days) = req.recurrence_days {
        if let Err(e) = validate_recurrence_days(days) {
            errors.add("recurrence_days", e);
        }
    }

    errors.finish()
}

/// Update a recurring template.
pub async fn update_template(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
    Json(req): Json<UpdateTemplateRequest>,
) -> Result<Json<TaskEnvelope>, ApiError> {
    if let Err(e) = validate_uuid(&id, "template_id") {
        return Err(ApiError::validation_field("template_id", e));
    }
    validate_update_request(&req)?;

    let existing: Option<TaskTemplate> = sqlx::query_as(&format!(
        "SELECT {TEMPLATE_COLUMNS} FROM tasks \
         WHERE id = ? AND user_id = ? AND is_recurring = 1 AND recurring_parent_id IS NULL"
    ))
    .bind(&id)
    .bind(&user.id)
    .fetch_optional(&state.db)
    .await?;
    existing.ok_or_else(|| ApiError::not_found("Recurring task not found"))?;

    sqlx::query(
        "UPDATE tasks SET \
            title = COALESCE(?, title), \
            description = COALESCE(?, description), \
            priority = COALESCE(?, priority), \
            recurrence_type = COALESCE(?, recurrence_type), \
            recurrence_days = COALESCE(?, recurrence_days) \
         WHERE id = ? AND user_id = ?",
    )
    .bind(&req.title)
    .bind(&req.description)
    .bind(req.priority)
    .bind(&req.recurrence_type)
    .bind(&req.recurrence_days)
    .bind(&id)
    .bind(&user.id)
    .execute(&state.db)
    .await?;

    let template: TaskTemplate = sqlx::query_as(&format!(
        "SELECT {TEMPLATE_COLUMNS} FROM tasks WHERE id = ?"
    ))
    .bind(&id)
    .fetch_one(&state.db)
    .await?;

    let count = work_session_count(&state.db, &template.id).await?;

    Ok(Json(TaskEnvelope {
        message: "Recurring task updated successfully".to_string(),
        task: template.into_response(count),
    }))
}

/// Delete a recurring template. Already-generated instances are left in
/// place (their parent reference is cleared by the schema).
pub async fn delete_template(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    if let Err(e) = validate_uuid(&id, "template_id") {
        return Err(ApiError::validation_field("template_id", e));
    }

    let result = sqlx::query(
        "DELETE FROM tasks \
         WHERE id = ? AND user_id = ? AND is_recurring = 1 AND recurring_parent_id IS NULL",
    )
    .bind(&id)
    .bind(&user.id)
    .execute(&state.db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Recurring task not found"));
    }

    Ok(Json(MessageResponse {
        message: "Recurring task deleted successfully".to_string(),
    }))
}
