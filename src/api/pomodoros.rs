//! Focus-session logging and stats.

use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::db::{
    FocusSession, FocusSessionResponse, LogSessionRequest, User, SESSION_BREAK, SESSION_WORK,
};
use crate::engine::{self, analytics::PomodoroStats};
use crate::AppState;

use super::error::{ApiError, ValidationErrorBuilder};
use super::validation::validate_uuid;

#[derive(Debug, Serialize)]
pub struct SessionEnvelope {
    pub message: String,
    pub pomodoro: FocusSessionResponse,
}

fn validate_log_request(req: &LogSessionRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    if req.kind != SESSION_WORK && req.kind != SESSION_BREAK {
        errors.add("type", "Session type must be 'work' or 'break'");
    }
    if req.duration <= 0 {
        errors.add("duration", "Duration must be a positive number of minutes");
    }
    if let Some(ref task_id) = req.task_id {
        if let Err(e) = validate_uuid(task_id, "task_id") {
            errors.add("task_id", e);
        }
    }

    errors.finish()
}

/// Record a finished focus session. Sessions are immutable once logged.
pub async fn log_session(
    State(state): State<Arc<AppState>>,
    user: User,
    Json(req): Json<LogSessionRequest>,
) -> Result<(StatusCode, Json<SessionEnvelope>), ApiError> {
    validate_log_request(&req)?;

    // A session may reference a task, but only one the caller owns.
    if let Some(ref task_id) = req.task_id {
        let owned: Option<(String,)> =
            sqlx::query_as("SELECT id FROM tasks WHERE id = ? AND user_id = ?")
                .bind(task_id)
                .bind(&user.id)
                .fetch_optional(&state.db)
                .await?;
        if owned.is_none() {
            return Err(ApiError::not_found("Task not found"));
        }
    }

    let session = FocusSession {
        id: Uuid::new_v4().to_string(),
        user_id: user.id,
        task_id: req.task_id,
        duration: req.duration,
        kind: req.kind,
        completed_at: Utc::now(),
    };

    sqlx::query(
        "INSERT INTO focus_sessions (id, user_id, task_id, duration, kind, completed_at) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&session.id)
    .bind(&session.user_id)
    .bind(&session.task_id)
    .bind(session.duration)
    .bind(&session.kind)
    .bind(session.completed_at)
    .execute(&state.db)
    .await?;

    tracing::info!(
        session_id = %session.id,
        kind = %session.kind,
        duration = session.duration,
        "Recorded focus session"
    );

    Ok((
        StatusCode::CREATED,
        Json(SessionEnvelope {
            message: "Pomodoro recorded".to_string(),
            pomodoro: FocusSessionResponse::from(session),
        }),
    ))
}

/// Work-session counts and focus minutes for today and this week.
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    user: User,
) -> Result<Json<PomodoroStats>, ApiError> {
    let today = Utc::now().date_naive();
    let stats = engine::compute_pomodoro_stats(&state.db, &user.id, today).await?;
    Ok(Json(stats))
}
