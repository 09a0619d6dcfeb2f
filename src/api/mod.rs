mod analytics;
pub mod auth;
pub mod error;
mod pomodoros;
mod profile;
mod recurring;
mod tasks;
mod validation;

use axum::{
    routing::{delete, get, post, put},
    Json, Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Auth is enforced per handler through the `User` extractor; the
    // register/login/health handlers simply don't ask for one.
    let api_routes = Router::new()
        // Accounts
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/profile", get(profile::get_profile))
        .route("/profile", put(profile::update_profile))
        .route("/profile/password", put(profile::change_password))
        // Tasks
        .route("/tasks", get(tasks::list_tasks))
        .route("/tasks", post(tasks::create_task))
        .route("/tasks/:id", put(tasks::update_task))
        .route("/tasks/:id", delete(tasks::delete_task))
        .route("/tasks/:id/toggle", post(tasks::toggle_task))
        // Recurring templates
        .route("/recurring-tasks", get(recurring::list_templates))
        .route("/recurring-tasks/:id", put(recurring::update_template))
        .route("/recurring-tasks/:id", delete(recurring::delete_template))
        // Analytics & focus sessions
        .route("/analytics", get(analytics::get_analytics))
        .route("/pomodoros", post(pomodoros::log_session))
        .route("/pomodoros/stats", get(pomodoros::get_stats))
        // Misc
        .route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        // The tracker is consumed by a browser frontend on another origin.
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy" }))
}

#[cfg(test)]
pub(crate) mod testing {
    //! Shared fixtures for handler tests.

    use std::sync::Arc;

    use chrono::Utc;
    use sqlx::sqlite::SqlitePoolOptions;
    use uuid::Uuid;

    use crate::config::Config;
    use crate::db::{CreateTaskRequest, User};
    use crate::AppState;

    pub async fn test_state() -> Arc<AppState> {
        // A single connection keeps every query in the same in-memory DB.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::db::run_migrations(&pool).await.unwrap();

        let mut config = Config::default();
        config.auth.jwt_secret = "test-secret".to_string();
        Arc::new(AppState::new(config, pool))
    }

    pub async fn create_user(state: &Arc<AppState>, username: &str) -> User {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO users (id, username, email, password_hash, created_at, updated_at) \
             VALUES (?, ?, ?, 'x', ?, ?)",
        )
        .bind(&id)
        .bind(username)
        .bind(format!("{username}@example.com"))
        .bind(now)
        .bind(now)
        .execute(&state.db)
        .await
        .unwrap();

        sqlx::query_as("SELECT * FROM users WHERE id = ?")
            .bind(&id)
            .fetch_one(&state.db)
            .await
            .unwrap()
    }

    pub fn create_task_req(title: &str, priority: i64) -> CreateTaskRequest {
        CreateTaskRequest {
            title: title.to_string(),
            description: String::new(),
            priority,
            due_date: None,
            is_recurring: false,
            recurrence_type: None,
            recurrence_days: None,
        }
    }
}
