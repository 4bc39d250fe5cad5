use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::courses;
use crate::error::ApiError;
use crate::query::collection::{Collection, Field, FieldType};

use super::progress::{insert_completed, progress_percent, CompletedLesson};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub payment_status: PaymentStatus,
    pub progress: i32,
    pub completed_lessons: Json<Vec<CompletedLesson>>,
    pub certificate_issued: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub completed_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

pub static ENROLLMENTS: Collection = Collection {
    table: "enrollments",
    fields: &[
        Field {
            name: "user",
            column: "user_id",
            ty: FieldType::Uuid,
        },
        Field {
            name: "course",
            column: "course_id",
            ty: FieldType::Uuid,
        },
        Field {
            name: "paymentStatus",
            column: "payment_status",
            ty: FieldType::Text,
        },
        Field {
            name: "progress",
            column: "progress",
            ty: FieldType::Int,
        },
        Field {
            name: "certificateIssued",
            column: "certificate_issued",
            ty: FieldType::Bool,
        },
        Field {
            name: "createdAt",
            column: "created_at",
            ty: FieldType::Timestamp,
        },
    ],
    search_fields: &[],
    base_filter: None,
};

/// Conditional insert guarded by the (user, course) unique index; `None` means
/// the pair already exists. This is the race-safe primitive both the direct
/// enroll path and checkout build on.
pub async fn try_insert(
    exec: impl sqlx::PgExecutor<'_>,
    user_id: Uuid,
    course_id: Uuid,
    status: PaymentStatus,
) -> Result<Option<Enrollment>, sqlx::Error> {
    sqlx::query_as::<_, Enrollment>(
        "INSERT INTO enrollments (user_id, course_id, payment_status)
         VALUES ($1, $2, $3)
         ON CONFLICT (user_id, course_id) DO NOTHING
         RETURNING *",
    )
    .bind(user_id)
    .bind(course_id)
    .bind(status)
    .fetch_optional(exec)
    .await
}

pub async fn increment_enrolled(
    exec: impl sqlx::PgExecutor<'_>,
    course_id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE courses SET total_students_enrolled = total_students_enrolled + 1,
                            updated_at = now()
         WHERE id = $1",
    )
    .bind(course_id)
    .execute(exec)
    .await?;
    Ok(())
}

/// Decrement clamped at zero so counter drift can never go negative.
pub async fn decrement_enrolled(
    exec: impl sqlx::PgExecutor<'_>,
    course_id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE courses SET total_students_enrolled = GREATEST(total_students_enrolled - 1, 0),
                            updated_at = now()
         WHERE id = $1",
    )
    .bind(course_id)
    .execute(exec)
    .await?;
    Ok(())
}

/// Direct enrollment: insert + counter increment in one transaction. A
/// duplicate pair surfaces as `Conflict`, leaving exactly one enrollment.
pub async fn enroll(db: &PgPool, user_id: Uuid, course_id: Uuid) -> Result<Enrollment, ApiError> {
    courses::repo::find_by_id(db, course_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Course", course_id))?;

    let mut tx = db.begin().await?;
    let enrollment = try_insert(&mut *tx, user_id, course_id, PaymentStatus::Pending)
        .await?
        .ok_or_else(|| {
            ApiError::Conflict("User is already enrolled in this course".into())
        })?;
    increment_enrolled(&mut *tx, course_id).await?;
    tx.commit().await?;
    Ok(enrollment)
}

/// Unenroll: owner or admin only. The counter decrement rides the same
/// transaction as the delete.
pub async fn unenroll(
    db: &PgPool,
    id: Uuid,
    caller_id: Uuid,
    caller_is_admin: bool,
) -> Result<(), ApiError> {
    let enrollment = sqlx::query_as::<_, Enrollment>("SELECT * FROM enrollments WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| ApiError::not_found("Enrollment", id))?;

    if !caller_is_admin && enrollment.user_id != caller_id {
        return Err(ApiError::Unauthorized(
            "Not authorized to delete this enrollment".into(),
        ));
    }

    let mut tx = db.begin().await?;
    let res = sqlx::query("DELETE FROM enrollments WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    if res.rows_affected() > 0 {
        decrement_enrolled(&mut *tx, enrollment.course_id).await?;
    }
    tx.commit().await?;
    Ok(())
}

/// Admin-or-owner field update (payment status, certificate flag).
pub async fn update_fields(
    db: &PgPool,
    id: Uuid,
    payment_status: Option<PaymentStatus>,
    certificate_issued: Option<bool>,
) -> Result<Option<Enrollment>, sqlx::Error> {
    sqlx::query_as::<_, Enrollment>(
        "UPDATE enrollments SET
            payment_status = COALESCE($2, payment_status),
            certificate_issued = COALESCE($3, certificate_issued),
            updated_at = now()
         WHERE id = $1
         RETURNING *",
    )
    .bind(id)
    .bind(payment_status)
    .bind(certificate_issued)
    .fetch_optional(db)
    .await
}

pub async fn find_by_id(db: &PgPool, id: Uuid) -> Result<Option<Enrollment>, sqlx::Error> {
    sqlx::query_as::<_, Enrollment>("SELECT * FROM enrollments WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await
}

/// Enrollment joined with a course summary, for the "my enrollments" view.
#[derive(Debug, FromRow)]
pub struct EnrollmentCourseRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub payment_status: PaymentStatus,
    pub progress: i32,
    pub completed_lessons: Json<Vec<CompletedLesson>>,
    pub certificate_issued: bool,
    pub completed_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub course_title: String,
    pub course_category: String,
    pub course_price: f64,
    pub course_thumbnail: String,
    pub course_instructor: String,
    pub course_rating: f32,
}

pub async fn list_for_user(
    db: &PgPool,
    user_id: Uuid,
) -> Result<Vec<EnrollmentCourseRow>, sqlx::Error> {
    sqlx::query_as::<_, EnrollmentCourseRow>(
        "SELECT e.*,
                c.title AS course_title,
                c.category AS course_category,
                c.price AS course_price,
                c.thumbnail AS course_thumbnail,
                c.instructor AS course_instructor,
                c.rating AS course_rating
         FROM enrollments e
         JOIN courses c ON c.id = e.course_id
         WHERE e.user_id = $1
         ORDER BY e.created_at DESC",
    )
    .bind(user_id)
    .fetch_all(db)
    .await
}

/// Single enrollment with user and course references resolved (admin detail).
#[derive(Debug, FromRow)]
pub struct EnrollmentDetailRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub payment_status: PaymentStatus,
    pub progress: i32,
    pub completed_lessons: Json<Vec<CompletedLesson>>,
    pub certificate_issued: bool,
    pub completed_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub user_full_name: String,
    pub user_email: String,
    pub course_title: String,
    pub course_price: f64,
}

pub async fn find_detail(db: &PgPool, id: Uuid) -> Result<Option<EnrollmentDetailRow>, sqlx::Error> {
    sqlx::query_as::<_, EnrollmentDetailRow>(
        "SELECT e.*,
                u.full_name AS user_full_name,
                u.email AS user_email,
                c.title AS course_title,
                c.price AS course_price
         FROM enrollments e
         JOIN users u ON u.id = e.user_id
         JOIN courses c ON c.id = e.course_id
         WHERE e.id = $1",
    )
    .bind(id)
    .fetch_optional(db)
    .await
}

/// Records one completed lesson on the caller's own enrollment and re-derives
/// the progress percentage. The row is locked for the read-modify-write, the
/// insert is a set union, and a completion timestamp that is already set is
/// never overwritten.
pub async fn record_lesson_completion(
    db: &PgPool,
    enrollment_id: Uuid,
    user_id: Uuid,
    module_id: Uuid,
    lesson_id: Uuid,
) -> Result<Enrollment, ApiError> {
    let mut tx = db.begin().await?;

    let enrollment = sqlx::query_as::<_, Enrollment>(
        "SELECT * FROM enrollments WHERE id = $1 AND user_id = $2 FOR UPDATE",
    )
    .bind(enrollment_id)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| ApiError::NotFound("Enrollment not found".into()))?;

    let curriculum: Json<Vec<courses::repo::CourseModule>> =
        sqlx::query_scalar("SELECT curriculum FROM courses WHERE id = $1")
            .bind(enrollment.course_id)
            .fetch_one(&mut *tx)
            .await?;
    let total_lessons: usize = curriculum.iter().map(|m| m.lessons.len()).sum();

    let mut completed = enrollment.completed_lessons.0.clone();
    insert_completed(
        &mut completed,
        CompletedLesson {
            module_id,
            lesson_id,
        },
    );
    let progress = progress_percent(completed.len(), total_lessons);

    let updated = sqlx::query_as::<_, Enrollment>(
        "UPDATE enrollments SET
            completed_lessons = $2,
            progress = $3,
            completed_at = CASE
                WHEN $3 = 100 AND completed_at IS NULL THEN now()
                ELSE completed_at
            END,
            updated_at = now()
         WHERE id = $1
         RETURNING *",
    )
    .bind(enrollment_id)
    .bind(Json(completed))
    .bind(progress)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(updated)
}
