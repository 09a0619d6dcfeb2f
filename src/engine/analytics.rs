//! On-demand analytics over tasks and focus sessions.
//!
//! Reports are recomputed from raw rows on every request instead of being
//! maintained incrementally. Row counts are personal-scale (one user's
//! tasks for a week), so a single fetch plus an in-memory pass is the
//! deliberate tradeoff here.
//!
//! Templates never enter these numbers: the fetches select only concrete
//! tasks, so completion rates are over work that can actually be done.

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;

use crate::db::{DbPool, FocusSession, Task, SESSION_WORK};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionStats {
    pub completed: i64,
    pub total: i64,
    pub rate: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DayStat {
    pub date: NaiveDate,
    pub completed: i64,
    pub total: i64,
    pub day: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PriorityStat {
    pub priority: i64,
    pub completed: i64,
    pub total: i64,
}

#[derive(Debug, Serialize)]
pub struct AnalyticsReport {
    pub today: CompletionStats,
    pub week: CompletionStats,
    pub daily_trend: Vec<DayStat>,
    pub priority_stats: Vec<PriorityStat>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionBucket {
    pub count: i64,
    pub focus_time: i64,
}

#[derive(Debug, Serialize)]
pub struct PomodoroStats {
    pub today: SessionBucket,
    pub week: SessionBucket,
}

/// Monday of the week containing `today`.
pub fn week_start(today: NaiveDate) -> NaiveDate {
    today - Duration::days(today.weekday().num_days_from_monday() as i64)
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn window_stats(tasks: &[Task], from: NaiveDate, to: NaiveDate) -> CompletionStats {
    let mut completed = 0;
    let mut total = 0;
    for task in tasks {
        if task.due_date >= from && task.due_date <= to {
            total += 1;
            if task.completed {
                completed += 1;
            }
        }
    }
    let rate = if total > 0 {
        round1(completed as f64 / total as f64 * 100.0)
    } else {
        0.0
    };
    CompletionStats {
        completed,
        total,
        rate,
    }
}

/// The 7 days ending at `today`, oldest first.
fn daily_trend(tasks: &[Task], today: NaiveDate) -> Vec<DayStat> {
    (0..7)
        .rev()
        .map(|offset| {
            let day = today - Duration::days(offset);
            let stats = window_stats(tasks, day, day);
            DayStat {
                date: day,
                completed: stats.completed,
                total: stats.total,
                day: day.format("%a").to_string(),
            }
        })
        .collect()
}

fn priority_breakdown(tasks: &[Task], from: NaiveDate, to: NaiveDate) -> Vec<PriorityStat> {
    (1..=5)
        .map(|priority| {
            let mut completed = 0;
            let mut total = 0;
            for task in tasks {
                if task.priority == priority && task.due_date >= from && task.due_date <= to {
                    total += 1;
                    if task.completed {
                        completed += 1;
                    }
                }
            }
            PriorityStat {
                priority,
                completed,
                total,
            }
        })
        .collect()
}

fn session_stats(
    sessions: &[FocusSession],
    today: NaiveDate,
    week_start: NaiveDate,
) -> PomodoroStats {
    let mut stats = PomodoroStats {
        today: SessionBucket {
            count: 0,
            focus_time: 0,
        },
        week: SessionBucket {
            count: 0,
            focus_time: 0,
        },
    };
    for session in sessions {
        let day = session.completed_at.date_naive();
        if day == today {
            stats.today.count += 1;
            stats.today.focus_time += session.duration;
        }
        if day >= week_start {
            stats.week.count += 1;
            stats.week.focus_time += session.duration;
        }
    }
    stats
}

/// Completion rates for today and the current week, the 7-day trend, and
/// the per-priority breakdown.
pub async fn compute_analytics(
    pool: &DbPool,
    user_id: &str,
    today: NaiveDate,
) -> Result<AnalyticsReport, sqlx::Error> {
    let start = week_start(today);
    // The trend window can reach back past Monday early in the week.
    let fetch_from = start.min(today - Duration::days(6));

    let tasks: Vec<Task> = sqlx::query_as(
        "SELECT * FROM tasks \
         WHERE user_id = ? AND due_date >= ? AND due_date <= ? AND is_recurring = 0",
    )
    .bind(user_id)
    .bind(fetch_from)
    .bind(today)
    .fetch_all(pool)
    .await?;

    Ok(AnalyticsReport {
        today: window_stats(&tasks, today, today),
        week: window_stats(&tasks, start, today),
        daily_trend: daily_trend(&tasks, today),
        priority_stats: priority_breakdown(&tasks, start, today),
    })
}

/// Work-session counts and focus minutes for today and the current week.
pub async fn compute_pomodoro_stats(
    pool: &DbPool,
    user_id: &str,
    today: NaiveDate,
) -> Result<PomodoroStats, sqlx::Error> {
    let start = week_start(today);

    let sessions: Vec<FocusSession> = sqlx::query_as(
        "SELECT * FROM focus_sessions \
         WHERE user_id = ? AND kind = ? AND date(completed_at) >= ?",
    )
    .bind(user_id)
    .bind(SESSION_WORK)
    .bind(start)
    .fetch_all(pool)
    .await?;

    Ok(session_stats(&sessions, today, start))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use sqlx::sqlite::SqlitePoolOptions;
    use sqlx::SqlitePool;
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn task(due: NaiveDate, priority: i64, completed: bool) -> Task {
        Task {
            id: Uuid::new_v4().to_string(),
            user_id: "u".to_string(),
            title: "t".to_string(),
            description: String::new(),
            priority,
            completed,
            due_date: due,
            created_at: Utc::now(),
            is_recurring: false,
            recurrence_type: None,
            recurrence_days: None,
            recurring_parent_id: None,
        }
    }

    fn work_session(completed_at: chrono::DateTime<Utc>, duration: i64) -> FocusSession {
        FocusSession {
            id: Uuid::new_v4().to_string(),
            user_id: "u".to_string(),
            task_id: None,
            duration,
            kind: SESSION_WORK.to_string(),
            completed_at,
        }
    }

    #[test]
    fn week_start_is_monday_anchored() {
        // 2025-06-09 is a Monday.
        assert_eq!(week_start(date(2025, 6, 9)), date(2025, 6, 9));
        assert_eq!(week_start(date(2025, 6, 11)), date(2025, 6, 9));
        assert_eq!(week_start(date(2025, 6, 15)), date(2025, 6, 9));
    }

    #[test]
    fn rate_is_rounded_to_one_decimal() {
        let today = date(2025, 6, 11);
        let tasks = vec![
            task(today, 1, true),
            task(today, 2, true),
            task(today, 3, false),
        ];
        let stats = window_stats(&tasks, today, today);
        assert_eq!(stats.completed, 2);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.rate, 66.7);
    }

    #[test]
    fn rate_is_zero_when_there_are_no_tasks() {
        let today = date(2025, 6, 11);
        let stats = window_stats(&[], today, today);
        assert_eq!(
            stats,
            CompletionStats {
                completed: 0,
                total: 0,
                rate: 0.0
            }
        );
    }

    #[test]
    fn trend_covers_seven_days_oldest_first() {
        let today = date(2025, 6, 11);
        let tasks = vec![task(today, 1, true), task(today - Duration::days(6), 1, false)];
        let trend = daily_trend(&tasks, today);

        assert_eq!(trend.len(), 7);
        assert_eq!(trend[0].date, date(2025, 6, 5));
        assert_eq!(trend[6].date, today);
        assert_eq!(trend[0].total, 1);
        assert_eq!(trend[0].completed, 0);
        assert_eq!(trend[6].completed, 1);
        // 2025-06-11 is a Wednesday.
        assert_eq!(trend[6].day, "Wed");
    }

    #[test]
    fn priority_breakdown_has_all_five_levels() {
        let today = date(2025, 6, 11);
        let tasks = vec![
            task(today, 5, true),
            task(today, 5, false),
            task(today, 1, true),
        ];
        let breakdown = priority_breakdown(&tasks, today, today);

        assert_eq!(breakdown.len(), 5);
        assert_eq!(breakdown[0].priority, 1);
        assert_eq!(breakdown[0].total, 1);
        assert_eq!(breakdown[0].completed, 1);
        assert_eq!(breakdown[4].priority, 5);
        assert_eq!(breakdown[4].total, 2);
        assert_eq!(breakdown[4].completed, 1);
        assert_eq!(breakdown[1].total, 0);
    }

    #[test]
    fn two_work_sessions_today_sum_their_minutes() {
        let today = date(2025, 6, 12);
        let start = week_start(today);
        let at = |d: NaiveDate| Utc.from_utc_datetime(&d.and_hms_opt(9, 30, 0).unwrap());

        let sessions = vec![work_session(at(today), 25), work_session(at(today), 25)];
        let stats = session_stats(&sessions, today, start);

        assert_eq!(stats.today, SessionBucket { count: 2, focus_time: 50 });
        assert_eq!(stats.week, SessionBucket { count: 2, focus_time: 50 });
    }

    #[test]
    fn earlier_weekdays_count_toward_week_only() {
        // Thursday; Monday of that week is 2025-06-09.
        let today = date(2025, 6, 12);
        let start = week_start(today);
        let at = |d: NaiveDate| Utc.from_utc_datetime(&d.and_hms_opt(18, 0, 0).unwrap());

        let sessions = vec![
            work_session(at(today), 25),
            work_session(at(date(2025, 6, 10)), 50),
        ];
        let stats = session_stats(&sessions, today, start);

        assert_eq!(stats.today, SessionBucket { count: 1, focus_time: 25 });
        assert_eq!(stats.week, SessionBucket { count: 2, focus_time: 75 });
    }

    async fn setup_test_db() -> SqlitePool {
        // A single connection keeps every query in the same in-memory DB.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::db::run_migrations(&pool).await.unwrap();
        pool
    }

    async fn insert_user(pool: &SqlitePool) -> String {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO users (id, username, email, password_hash, created_at, updated_at) \
             VALUES (?, ?, ?, 'x', ?, ?)",
        )
        .bind(&id)
        .bind(format!("user-{id}"))
        .bind(format!("{id}@example.com"))
        .bind(now)
        .bind(now)
        .execute(pool)
        .await
        .unwrap();
        id
    }

    async fn insert_task(
        pool: &SqlitePool,
        user_id: &str,
        due: NaiveDate,
        completed: bool,
        is_recurring: bool,
    ) {
        sqlx::query(
            "INSERT INTO tasks (id, user_id, title, description, priority, completed, due_date, \
                                created_at, is_recurring) \
             VALUES (?, ?, 'task', '', 1, ?, ?, ?, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_id)
        .bind(completed)
        .bind(due)
        .bind(Utc::now())
        .bind(is_recurring)
        .execute(pool)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn analytics_exclude_templates() {
        let pool = setup_test_db().await;
        let user = insert_user(&pool).await;
        let today = date(2025, 6, 11);

        insert_task(&pool, &user, today, true, false).await;
        insert_task(&pool, &user, today, true, false).await;
        insert_task(&pool, &user, today, false, false).await;
        // A completed template due today must not skew the numbers.
        insert_task(&pool, &user, today, true, true).await;

        let report = compute_analytics(&pool, &user, today).await.unwrap();
        assert_eq!(report.today.completed, 2);
        assert_eq!(report.today.total, 3);
        assert_eq!(report.today.rate, 66.7);
    }

    #[tokio::test]
    async fn analytics_week_window_is_monday_through_today() {
        let pool = setup_test_db().await;
        let user = insert_user(&pool).await;
        // Wednesday; week runs from Monday 2025-06-09.
        let today = date(2025, 6, 11);

        insert_task(&pool, &user, date(2025, 6, 9), true, false).await;
        insert_task(&pool, &user, today, false, false).await;
        // Last week; in the trend window but not the week report.
        insert_task(&pool, &user, date(2025, 6, 8), true, false).await;

        let report = compute_analytics(&pool, &user, today).await.unwrap();
        assert_eq!(report.week.total, 2);
        assert_eq!(report.week.completed, 1);
        assert_eq!(report.week.rate, 50.0);

        // The Sunday task still shows up in the 7-day trend.
        let sunday = report
            .daily_trend
            .iter()
            .find(|d| d.date == date(2025, 6, 8))
            .unwrap();
        assert_eq!(sunday.total, 1);
    }

    #[tokio::test]
    async fn pomodoro_stats_ignore_breaks_and_other_users() {
        let pool = setup_test_db().await;
        let user = insert_user(&pool).await;
        let other = insert_user(&pool).await;
        let today = date(2025, 6, 12);
        let at = Utc.from_utc_datetime(&today.and_hms_opt(14, 0, 0).unwrap());

        for (owner, kind, duration) in [
            (&user, SESSION_WORK, 25),
            (&user, SESSION_WORK, 25),
            (&user, "break", 5),
            (&other, SESSION_WORK, 25),
        ] {
            sqlx::query(
                "INSERT INTO focus_sessions (id, user_id, task_id, duration, kind, completed_at) \
                 VALUES (?, ?, NULL, ?, ?, ?)",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(owner)
            .bind(duration)
            .bind(kind)
            .bind(at)
            .execute(&pool)
            .await
            .unwrap();
        }

        let stats = compute_pomodoro_stats(&pool, &user, today).await.unwrap();
        assert_eq!(stats.today, SessionBucket { count: 2, focus_time: 50 });
        assert_eq!(stats.week, SessionBucket { count: 2, focus_time: 50 });
    }
}
