//! Task models and DTOs.
//!
//! Tasks are stored in a single table but surface as two distinct types:
//! [`TaskTemplate`] for recurring definitions (never scheduled directly) and
//! [`Task`] for concrete work items, whether standalone or generated from a
//! template. Only the materializer writes generated instances, so a `Task`
//! row always has `is_recurring = false` when it carries a parent.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// The two supported recurrence schedules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecurrenceType {
    Daily,
    Weekly,
}

impl RecurrenceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecurrenceType::Daily => "daily",
            RecurrenceType::Weekly => "weekly",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "daily" => Some(RecurrenceType::Daily),
            "weekly" => Some(RecurrenceType::Weekly),
            _ => None,
        }
    }
}

/// A concrete task: standalone, or an instance generated from a template.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Task {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: String,
    pub priority: i64,
    pub completed: bool,
    pub due_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub is_recurring: bool,
    pub recurrence_type: Option<String>,
    pub recurrence_days: Option<String>,
    pub recurring_parent_id: Option<String>,
}

/// A recurring task definition. Templates are never returned by the task
/// queries and never carry a parent; the template-scoped queries are the
/// only producers of this type.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TaskTemplate {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: String,
    pub priority: i64,
    pub completed: bool,
    pub due_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub recurrence_type: Option<String>,
    pub recurrence_days: Option<String>,
}

/// Wire representation shared by tasks and templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResponse {
    pub id: String,
    pub title: String,
    pub description: String,
    pub priority: i64,
    pub completed: bool,
    pub due_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub pomodoro_count: i64,
    pub is_recurring: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurrence_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurrence_days: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurring_parent_id: Option<String>,
}

impl Task {
    pub fn into_response(self, pomodoro_count: i64) -> TaskResponse {
        TaskResponse {
            id: self.id,
            title: self.title,
            description: self.description,
            priority: self.priority,
            completed: self.completed,
            due_date: self.due_date,
            created_at: self.created_at,
            pomodoro_count,
            is_recurring: false,
            recurrence_type: None,
            recurrence_days: None,
            recurring_parent_id: self.recurring_parent_id,
        }
    }
}

impl TaskTemplate {
    pub fn into_response(self, pomodoro_count: i64) -> TaskResponse {
        TaskResponse {
            id: self.id,
            title: self.title,
            description: self.description,
            priority: self.priority,
            completed: self.completed,
            due_date: self.due_date,
            created_at: self.created_at,
            pomodoro_count,
            is_recurring: true,
            recurrence_type: self.recurrence_type,
            recurrence_days: self.recurrence_days,
            recurring_parent_id: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_priority")]
    pub priority: i64,
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub is_recurring: bool,
    pub recurrence_type: Option<String>,
    pub recurrence_days: Option<String>,
}

fn default_priority() -> i64 {
    1
}

#[derive(Debug, Deserialize)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<i64>,
    pub completed: Option<bool>,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTemplateRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<i64>,
    pub recurrence_type: Option<String>,
    pub recurrence_days: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TaskListResponse {
    pub tasks: Vec<TaskResponse>,
}

#[derive(Debug, Serialize)]
pub struct TemplateListResponse {
    pub recurring_tasks: Vec<TaskResponse>,
}
