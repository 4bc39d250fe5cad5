use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::jwt::AdminUser,
    courses::repo::Course,
    error::ApiError,
    response::{ok, DataEnvelope},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/dashboard", get(dashboard))
        .route("/admin/stats/enrollment", get(enrollment_stats))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_users: i64,
    pub total_courses: i64,
    pub total_enrollments: i64,
    pub total_events: i64,
    pub total_contacts: i64,
    pub unread_contacts: i64,
    pub recent_signups: i64,
    pub recent_enrollments: i64,
    pub total_revenue: f64,
    pub top_courses: Vec<Course>,
}

async fn count(db: &PgPool, sql: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(sql).fetch_one(db).await
}

#[instrument(skip(state))]
pub async fn dashboard(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> Result<Json<DataEnvelope<DashboardStats>>, ApiError> {
    let db = &state.db;

    let total_users = count(db, "SELECT COUNT(*) FROM users").await?;
    let total_courses =
        count(db, "SELECT COUNT(*) FROM courses WHERE is_deleted = FALSE").await?;
    let total_enrollments = count(db, "SELECT COUNT(*) FROM enrollments").await?;
    let total_events = count(db, "SELECT COUNT(*) FROM events WHERE is_active = TRUE").await?;
    let total_contacts = count(db, "SELECT COUNT(*) FROM contacts").await?;
    let unread_contacts =
        count(db, "SELECT COUNT(*) FROM contacts WHERE is_read = FALSE").await?;

    let recent_signups = count(
        db,
        "SELECT COUNT(*) FROM users WHERE created_at >= now() - interval '7 days'",
    )
    .await?;
    let recent_enrollments = count(
        db,
        "SELECT COUNT(*) FROM enrollments WHERE created_at >= now() - interval '7 days'",
    )
    .await?;

    // Revenue is the sum of course prices over completed enrollments.
    let total_revenue: f64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(c.price), 0)::FLOAT8
         FROM enrollments e
         JOIN courses c ON c.id = e.course_id
         WHERE e.payment_status = 'completed'",
    )
    .fetch_one(db)
    .await?;

    let top_courses = crate::courses::repo::most_popular(db).await?;

    Ok(ok(DashboardStats {
        total_users,
        total_courses,
        total_enrollments,
        total_events,
        total_contacts,
        unread_contacts,
        recent_signups,
        recent_enrollments,
        total_revenue,
        top_courses,
    }))
}

#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyEnrollments {
    pub year: i32,
    pub month: i32,
    pub count: i64,
    pub completed: i64,
}

#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CourseEnrollments {
    pub course_id: Uuid,
    pub course_title: String,
    pub count: i64,
    pub completed: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentStats {
    pub monthly_stats: Vec<MonthlyEnrollments>,
    pub by_course: Vec<CourseEnrollments>,
}

/// Enrollment volume grouped by month and by course (top 10).
#[instrument(skip(state))]
pub async fn enrollment_stats(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> Result<Json<DataEnvelope<EnrollmentStats>>, ApiError> {
    let monthly_stats = sqlx::query_as::<_, MonthlyEnrollments>(
        "SELECT EXTRACT(YEAR FROM created_at)::INT AS year,
                EXTRACT(MONTH FROM created_at)::INT AS month,
                COUNT(*) AS count,
                COUNT(*) FILTER (WHERE payment_status = 'completed') AS completed
         FROM enrollments
         GROUP BY 1, 2
         ORDER BY 1, 2",
    )
    .fetch_all(&state.db)
    .await?;

    let by_course = sqlx::query_as::<_, CourseEnrollments>(
        "SELECT e.course_id,
                c.title AS course_title,
                COUNT(*) AS count,
                COUNT(*) FILTER (WHERE e.payment_status = 'completed') AS completed
         FROM enrollments e
         JOIN courses c ON c.id = e.course_id
         GROUP BY e.course_id, c.title
         ORDER BY count DESC
         LIMIT 10",
    )
    .fetch_all(&state.db)
    .await?;

    Ok(ok(EnrollmentStats {
        monthly_stats,
        by_course,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_serialize_camel_case() {
        let stats = DashboardStats {
            total_users: 10,
            total_courses: 3,
            total_enrollments: 7,
            total_events: 1,
            total_contacts: 4,
            unread_contacts: 2,
            recent_signups: 5,
            recent_enrollments: 6,
            total_revenue: 199.99,
            top_courses: vec![],
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["totalUsers"], 10);
        assert_eq!(json["unreadContacts"], 2);
        assert_eq!(json["totalRevenue"], 199.99);
        assert!(json["topCourses"].as_array().unwrap().is_empty());
    }

    #[test]
    fn enrollment_stats_serialize_camel_case() {
        let stats = EnrollmentStats {
            monthly_stats: vec![MonthlyEnrollments {
                year: 2026,
                month: 8,
                count: 12,
                completed: 9,
            }],
            by_course: vec![CourseEnrollments {
                course_id: Uuid::from_u128(1),
                course_title: "Intro to Rust".into(),
                count: 7,
                completed: 5,
            }],
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["monthlyStats"][0]["completed"], 9);
        assert_eq!(json["byCourse"][0]["courseTitle"], "Intro to Rust");
        assert_eq!(json["byCourse"][0]["count"], 7);
    }
}
