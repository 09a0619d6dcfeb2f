//! Focus session model and DTOs.
//!
//! Sessions are written once when a timer finishes and are immutable after
//! that; everything downstream is read-only aggregation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const SESSION_WORK: &str = "work";
pub const SESSION_BREAK: &str = "break";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FocusSession {
    pub id: String,
    pub user_id: String,
    pub task_id: Option<String>,
    /// Duration in minutes.
    pub duration: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FocusSessionResponse {
    pub id: String,
    pub task_id: Option<String>,
    pub duration: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub completed_at: DateTime<Utc>,
}

impl From<FocusSession> for FocusSessionResponse {
    fn from(session: FocusSession) -> Self {
        Self {
            id: session.id,
            task_id: session.task_id,
            duration: session.duration,
            kind: session.kind,
            completed_at: session.completed_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LogSessionRequest {
    pub task_id: Option<String>,
    #[serde(default = "default_duration")]
    pub duration: i64,
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
}

fn default_duration() -> i64 {
    25
}

fn default_kind() -> String {
    SESSION_WORK.to_string()
}
