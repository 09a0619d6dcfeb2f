//! Recurring-task materialization.
//!
//! Materialization is lazy and pull-based: reading "today" is what creates
//! today's instances, so no background scheduler exists. Past dates are
//! never backfilled unless a caller explicitly asks for them.

use chrono::{Datelike, NaiveDate, Utc};
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::db::{DbPool, RecurrenceType, Task, TaskTemplate};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecurrenceError {
    #[error("invalid weekday token `{0}` in recurrence days")]
    InvalidToken(String),
}

/// Parse a comma-separated weekday list (`"0,2,4"`, Monday = 0).
///
/// Any non-numeric token is an error; numeric tokens outside 0-6 parse fine
/// and simply never match a weekday. Write-time validation rejects both, so
/// this only sees bad data that predates it or was inserted out-of-band.
pub fn parse_recurrence_days(raw: &str) -> Result<Vec<u32>, RecurrenceError> {
    raw.split(',')
        .map(str::trim)
        .map(|token| {
            token
                .parse::<u32>()
                .map_err(|_| RecurrenceError::InvalidToken(token.to_string()))
        })
        .collect()
}

/// Decide whether a template produces an instance on `target_date`.
///
/// Unknown recurrence types never fire and raise no error; a template with
/// a malformed weekday list is skipped with a warning rather than failing
/// the whole materialization pass.
pub fn should_fire(template: &TaskTemplate, target_date: NaiveDate) -> bool {
    let kind = match template
        .recurrence_type
        .as_deref()
        .and_then(RecurrenceType::parse)
    {
        Some(kind) => kind,
        None => return false,
    };

    match kind {
        RecurrenceType::Daily => true,
        RecurrenceType::Weekly => {
            let raw = match template.recurrence_days.as_deref() {
                Some(raw) if !raw.trim().is_empty() => raw,
                _ => return false,
            };
            match parse_recurrence_days(raw) {
                Ok(days) => days.contains(&target_date.weekday().num_days_from_monday()),
                Err(err) => {
                    warn!(
                        template_id = %template.id,
                        error = %err,
                        "Skipping template with malformed recurrence days"
                    );
                    false
                }
            }
        }
    }
}

/// Ensure a concrete instance exists for every template of `user_id` that
/// fires on `target_date`. Idempotent; returns the newly created instances.
///
/// All inserts run in one transaction, so a failure mid-batch commits
/// nothing. A concurrent materialization for the same date loses the race
/// at the `(recurring_parent_id, due_date)` unique index and its insert is
/// silently ignored.
pub async fn ensure_instances(
    pool: &DbPool,
    user_id: &str,
    target_date: NaiveDate,
) -> Result<Vec<Task>, sqlx::Error> {
    let templates: Vec<TaskTemplate> = sqlx::query_as(
        "SELECT id, user_id, title, description, priority, completed, due_date, created_at, \
                recurrence_type, recurrence_days \
         FROM tasks \
         WHERE user_id = ? AND is_recurring = 1 AND recurring_parent_id IS NULL",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    let due: Vec<&TaskTemplate> = templates
        .iter()
        .filter(|t| should_fire(t, target_date))
        .collect();

    if due.is_empty() {
        return Ok(Vec::new());
    }

    let mut tx = pool.begin().await?;
    let mut created = Vec::new();

    for template in due {
        let existing: Option<(String,)> =
            sqlx::query_as("SELECT id FROM tasks WHERE recurring_parent_id = ? AND due_date = ?")
                .bind(&template.id)
                .bind(target_date)
                .fetch_optional(&mut *tx)
                .await?;

        if existing.is_some() {
            continue;
        }

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT OR IGNORE INTO tasks \
             (id, user_id, title, description, priority, completed, due_date, created_at, \
              is_recurring, recurring_parent_id) \
             VALUES (?, ?, ?, ?, ?, 0, ?, ?, 0, ?)",
        )
        .bind(&id)
        .bind(user_id)
        .bind(&template.title)
        .bind(&template.description)
        .bind(template.priority)
        .bind(target_date)
        .bind(now)
        .bind(&template.id)
        .execute(&mut *tx)
        .await?;

        // Zero rows means a concurrent request created the instance between
        // our check and insert; the unique index absorbed it.
        if result.rows_affected() == 0 {
            continue;
        }

        created.push(Task {
            id,
            user_id: user_id.to_string(),
            title: template.title.clone(),
            description: template.description.clone(),
            priority: template.priority,
            completed: false,
            due_date: target_date,
            created_at: now,
            is_recurring: false,
            recurrence_type: None,
            recurrence_days: None,
            recurring_parent_id: Some(template.id.clone()),
        });
    }

    tx.commit().await?;
    Ok(created)
}
