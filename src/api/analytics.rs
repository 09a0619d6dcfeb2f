//! Analytics endpoint.

use axum::{extract::State, Json};
use chrono::Utc;
use std::sync::Arc;

use crate::db::User;
use crate::engine::{self, analytics::AnalyticsReport};
use crate::AppState;

use super::error::ApiError;

/// Completion rates for today and this week, the 7-day trend, and the
/// per-priority breakdown. Materializes today's recurring instances first
/// so the numbers include work that is due but not yet looked at.
pub async fn get_analytics(
    State(state): State<Arc<AppState>>,
    user: User,
) -> Result<Json<AnalyticsReport>, ApiError> {
    let today = Utc::now().date_naive();

    engine::ensure_instances(&state.db, &user.id, today).await?;

    let report = engine::compute_analytics(&state.db, &user.id, today).await?;
    Ok(Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::tasks::{create_task, toggle_task};
    use crate::api::testing::{create_task_req, create_user, test_state};
    use axum::extract::Path;

    #[tokio::test]
    async fn two_of_three_tasks_complete_is_66_7_percent() {
        let state = test_state().await;
        let user = create_user(&state, "alice").await;

        let mut ids = Vec::new();
        for title in ["one", "two", "three"] {
            let (_, Json(created)) = create_task(
                State(state.clone()),
                user.clone(),
                Json(create_task_req(title, 1)),
            )
            .await
            .unwrap();
            ids.push(created.task.id);
        }
        for id in &ids[..2] {
            toggle_task(State(state.clone()), user.clone(), Path(id.clone()))
                .await
                .unwrap();
        }

        let Json(report) = get_analytics(State(state), user).await.unwrap();
        assert_eq!(report.today.completed, 2);
        assert_eq!(report.today.total, 3);
        assert_eq!(report.today.rate, 66.7);
        assert_eq!(report.daily_trend.len(), 7);
        assert_eq!(report.priority_stats.len(), 5);
    }

    #[tokio::test]
    async fn analytics_materializes_todays_recurring_instances() {
        let state = test_state().await;
        let user = create_user(&state, "bob").await;

        let mut req = create_task_req("Daily journal", 2);
        req.is_recurring = true;
        req.recurrence_type = Some("daily".to_string());
        create_task(State(state.clone()), user.clone(), Json(req))
            .await
            .unwrap();

        // No task list fetch happened, yet the instance counts for today.
        let Json(report) = get_analytics(State(state), user).await.unwrap();
        assert_eq!(report.today.total, 1);
        assert_eq!(report.today.completed, 0);
        assert_eq!(report.today.rate, 0.0);
    }

    #[tokio::test]
    async fn empty_day_reports_zero_rate() {
        let state = test_state().await;
        let user = create_user(&state, "carol").await;

        let Json(report) = get_analytics(State(state), user).await.unwrap();
        assert_eq!(report.today.total, 0);
        assert_eq!(report.today.rate, 0.0);
        assert_eq!(report.week.rate, 0.0);
    }
}
