use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::courses;
use crate::error::ApiError;
use crate::query::collection::{Collection, Field, FieldType};

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub rating: i32,
    pub comment: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

pub static FEEDBACK: Collection = Collection {
    table: "feedback",
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
            name: "rating",
            column: "rating",
            ty: FieldType::Int,
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

pub fn validate_rating(rating: i32) -> Result<(), ApiError> {
    if !(1..=5).contains(&rating) {
        return Err(ApiError::BadRequest(
            "Rating must be between 1 and 5".into(),
        ));
    }
    Ok(())
}

/// One review per (user, course); the conditional insert and the course
/// rating recompute share a transaction so aggregates never drift.
pub async fn create(
    db: &PgPool,
    user_id: Uuid,
    course_id: Uuid,
    rating: i32,
    comment: &str,
) -> Result<Feedback, ApiError> {
    validate_rating(rating)?;
    courses::repo::find_by_id(db, course_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Course", course_id))?;

    let mut tx = db.begin().await?;
    let feedback = sqlx::query_as::<_, Feedback>(
        "INSERT INTO feedback (user_id, course_id, rating, comment)
         VALUES ($1, $2, $3, $4)
         ON CONFLICT (user_id, course_id) DO NOTHING
         RETURNING *",
    )
    .bind(user_id)
    .bind(course_id)
    .bind(rating)
    .bind(comment)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| {
        ApiError::Conflict("You have already submitted feedback for this course".into())
    })?;
    courses::repo::recompute_rating(&mut *tx, course_id).await?;
    tx.commit().await?;
    Ok(feedback)
}

pub async fn find_by_id(db: &PgPool, id: Uuid) -> Result<Option<Feedback>, sqlx::Error> {
    sqlx::query_as::<_, Feedback>("SELECT * FROM feedback WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await
}

pub async fn update(
    db: &PgPool,
    id: Uuid,
    course_id: Uuid,
    rating: Option<i32>,
    comment: Option<&str>,
) -> Result<Feedback, ApiError> {
    if let Some(rating) = rating {
        validate_rating(rating)?;
    }

    let mut tx = db.begin().await?;
    let feedback = sqlx::query_as::<_, Feedback>(
        "UPDATE feedback SET
            rating = COALESCE($2, rating),
            comment = COALESCE($3, comment),
            updated_at = now()
         WHERE id = $1
         RETURNING *",
    )
    .bind(id)
    .bind(rating)
    .bind(comment)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| ApiError::not_found("Feedback", id))?;
    courses::repo::recompute_rating(&mut *tx, course_id).await?;
    tx.commit().await?;
    Ok(feedback)
}

pub async fn delete(db: &PgPool, id: Uuid, course_id: Uuid) -> Result<(), ApiError> {
    let mut tx = db.begin().await?;
    let res = sqlx::query("DELETE FROM feedback WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    if res.rows_affected() == 0 {
        return Err(ApiError::not_found("Feedback", id));
    }
    courses::repo::recompute_rating(&mut *tx, course_id).await?;
    tx.commit().await?;
    Ok(())
}

/// Feedback joined with the reviewer's name, for the public course view.
#[derive(Debug, FromRow)]
pub struct FeedbackUserRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub rating: i32,
    pub comment: String,
    pub created_at: OffsetDateTime,
    pub user_full_name: String,
}

pub async fn list_for_course(
    db: &PgPool,
    course_id: Uuid,
) -> Result<Vec<FeedbackUserRow>, sqlx::Error> {
    sqlx::query_as::<_, FeedbackUserRow>(
        "SELECT f.id, f.user_id, f.course_id, f.rating, f.comment, f.created_at,
                u.full_name AS user_full_name
         FROM feedback f
         JOIN users u ON u.id = f.user_id
         WHERE f.course_id = $1
         ORDER BY f.created_at DESC",
    )
    .bind(course_id)
    .fetch_all(db)
    .await
}

#[derive(Debug, FromRow)]
pub struct FeedbackDetailRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub rating: i32,
    pub comment: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub user_full_name: String,
    pub user_email: String,
    pub course_title: String,
}

pub async fn find_detail(db: &PgPool, id: Uuid) -> Result<Option<FeedbackDetailRow>, sqlx::Error> {
    sqlx::query_as::<_, FeedbackDetailRow>(
        "SELECT f.*,
                u.full_name AS user_full_name,
                u.email AS user_email,
                c.title AS course_title
         FROM feedback f
         JOIN users u ON u.id = f.user_id
         JOIN courses c ON c.id = f.course_id
         WHERE f.id = $1",
    )
    .bind(id)
    .fetch_optional(db)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feedback_listing_has_no_search_behavior() {
        assert!(FEEDBACK.search_fields.is_empty());
    }

    #[test]
    fn rating_bounds_are_inclusive() {
        assert!(validate_rating(1).is_ok());
        assert!(validate_rating(5).is_ok());
        assert!(validate_rating(0).is_err());
        assert!(validate_rating(6).is_err());
    }
}
