use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::query::collection::{Collection, Field, FieldType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text")]
pub enum ExperienceLevel {
    Beginner,
    Intermediate,
    Advanced,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub lesson_title: String,
    pub lesson_content: String,
    pub duration: String,
}

/// One curriculum module: ordered lessons under a module title. Ids are
/// assigned at creation so progress tracking can reference them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseModule {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub module: String,
    #[serde(default)]
    pub lessons: Vec<Lesson>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: Uuid,
    pub title: String,
    pub category: String,
    pub experience_level: ExperienceLevel,
    pub short_description: String,
    pub long_description: String,
    pub curriculum: Json<Vec<CourseModule>>,
    pub price: f64,
    pub thumbnail: String,
    pub instructor: String,
    pub rating: f32,
    pub number_of_reviews: i32,
    pub total_students_enrolled: i32,
    pub is_active: bool,
    pub is_deleted: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Course {
    pub fn total_lessons(&self) -> usize {
        self.curriculum.iter().map(|m| m.lessons.len()).sum()
    }
}

pub static COURSES: Collection = Collection {
    table: "courses",
    fields: &[
        Field {
            name: "title",
            column: "title",
            ty: FieldType::Text,
        },
        Field {
            name: "category",
            column: "category",
            ty: FieldType::Text,
        },
        Field {
            name: "experienceLevel",
            column: "experience_level",
            ty: FieldType::Text,
        },
        Field {
            name: "shortDescription",
            column: "short_description",
            ty: FieldType::Text,
        },
        Field {
            name: "longDescription",
            column: "long_description",
            ty: FieldType::Text,
        },
        Field {
            name: "instructor",
            column: "instructor",
            ty: FieldType::Text,
        },
        Field {
            name: "price",
            column: "price",
            ty: FieldType::Float,
        },
        Field {
            name: "rating",
            column: "rating",
            ty: FieldType::Float,
        },
        Field {
            name: "numberOfReviews",
            column: "number_of_reviews",
            ty: FieldType::Int,
        },
        Field {
            name: "totalStudentsEnrolled",
            column: "total_students_enrolled",
            ty: FieldType::Int,
        },
        Field {
            name: "isActive",
            column: "is_active",
            ty: FieldType::Bool,
        },
        Field {
            name: "createdAt",
            column: "created_at",
            ty: FieldType::Timestamp,
        },
    ],
    search_fields: &[
        "title",
        "shortDescription",
        "longDescription",
        "instructor",
        "category",
    ],
    base_filter: Some("is_deleted = FALSE"),
};

/// Soft-deleted rows are invisible to every read path.
pub async fn find_by_id(db: &PgPool, id: Uuid) -> Result<Option<Course>, sqlx::Error> {
    sqlx::query_as::<_, Course>("SELECT * FROM courses WHERE id = $1 AND is_deleted = FALSE")
        .bind(id)
        .fetch_optional(db)
        .await
}

#[allow(clippy::too_many_arguments)]
pub async fn create(
    db: &PgPool,
    title: &str,
    category: &str,
    experience_level: ExperienceLevel,
    short_description: &str,
    long_description: &str,
    curriculum: Vec<CourseModule>,
    price: f64,
    instructor: &str,
) -> Result<Course, sqlx::Error> {
    sqlx::query_as::<_, Course>(
        "INSERT INTO courses
            (title, category, experience_level, short_description, long_description,
             curriculum, price, instructor)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
         RETURNING *",
    )
    .bind(title)
    .bind(category)
    .bind(experience_level)
    .bind(short_description)
    .bind(long_description)
    .bind(Json(curriculum))
    .bind(price)
    .bind(instructor)
    .fetch_one(db)
    .await
}

#[allow(clippy::too_many_arguments)]
pub async fn update(
    db: &PgPool,
    id: Uuid,
    title: Option<&str>,
    category: Option<&str>,
    experience_level: Option<ExperienceLevel>,
    short_description: Option<&str>,
    long_description: Option<&str>,
    curriculum: Option<Vec<CourseModule>>,
    price: Option<f64>,
    instructor: Option<&str>,
    is_active: Option<bool>,
) -> Result<Option<Course>, sqlx::Error> {
    sqlx::query_as::<_, Course>(
        "UPDATE courses SET
            title = COALESCE($2, title),
            category = COALESCE($3, category),
            experience_level = COALESCE($4, experience_level),
            short_description = COALESCE($5, short_description),
            long_description = COALESCE($6, long_description),
            curriculum = COALESCE($7, curriculum),
            price = COALESCE($8, price),
            instructor = COALESCE($9, instructor),
            is_active = COALESCE($10, is_active),
            updated_at = now()
         WHERE id = $1 AND is_deleted = FALSE
         RETURNING *",
    )
    .bind(id)
    .bind(title)
    .bind(category)
    .bind(experience_level)
    .bind(short_description)
    .bind(long_description)
    .bind(curriculum.map(Json))
    .bind(price)
    .bind(instructor)
    .bind(is_active)
    .fetch_optional(db)
    .await
}

pub async fn soft_delete(db: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let res = sqlx::query(
        "UPDATE courses SET is_deleted = TRUE, updated_at = now()
         WHERE id = $1 AND is_deleted = FALSE",
    )
    .bind(id)
    .execute(db)
    .await?;
    Ok(res.rows_affected() > 0)
}

pub async fn set_thumbnail(db: &PgPool, id: Uuid, url: &str) -> Result<Option<Course>, sqlx::Error> {
    sqlx::query_as::<_, Course>(
        "UPDATE courses SET thumbnail = $2, updated_at = now()
         WHERE id = $1 AND is_deleted = FALSE
         RETURNING *",
    )
    .bind(id)
    .bind(url)
    .fetch_optional(db)
    .await
}

pub async fn top_rated(db: &PgPool) -> Result<Vec<Course>, sqlx::Error> {
    sqlx::query_as::<_, Course>(
        "SELECT * FROM courses WHERE is_deleted = FALSE ORDER BY rating DESC LIMIT 5",
    )
    .fetch_all(db)
    .await
}

pub async fn most_popular(db: &PgPool) -> Result<Vec<Course>, sqlx::Error> {
    sqlx::query_as::<_, Course>(
        "SELECT * FROM courses WHERE is_deleted = FALSE
         ORDER BY total_students_enrolled DESC LIMIT 5",
    )
    .fetch_all(db)
    .await
}

/// Re-derives rating and review count from the current feedback rows. The
/// empty aggregate resets both to zero instead of erroring, and repeated calls
/// converge on the same values no matter how they interleave.
pub async fn recompute_rating(
    exec: impl sqlx::PgExecutor<'_>,
    course_id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE courses SET
            rating = COALESCE(sub.avg_rating, 0),
            number_of_reviews = sub.review_count,
            updated_at = now()
         FROM (
            SELECT AVG(rating)::REAL AS avg_rating, COUNT(*)::INT AS review_count
            FROM feedback WHERE course_id = $1
         ) AS sub
         WHERE courses.id = $1",
    )
    .bind(course_id)
    .execute(exec)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lesson(title: &str) -> Lesson {
        Lesson {
            id: Uuid::new_v4(),
            lesson_title: title.into(),
            lesson_content: "content".into(),
            duration: "30 mins".into(),
        }
    }

    #[test]
    fn total_lessons_sums_across_modules() {
        let course = Course {
            id: Uuid::new_v4(),
            title: "t".into(),
            category: "c".into(),
            experience_level: ExperienceLevel::Beginner,
            short_description: "".into(),
            long_description: "".into(),
            curriculum: Json(vec![
                CourseModule {
                    id: Uuid::new_v4(),
                    module: "m1".into(),
                    lessons: vec![lesson("a"), lesson("b")],
                },
                CourseModule {
                    id: Uuid::new_v4(),
                    module: "m2".into(),
                    lessons: vec![lesson("c")],
                },
            ]),
            price: 0.0,
            thumbnail: "".into(),
            instructor: "i".into(),
            rating: 0.0,
            number_of_reviews: 0,
            total_students_enrolled: 0,
            is_active: true,
            is_deleted: false,
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        };
        assert_eq!(course.total_lessons(), 3);
    }

    #[test]
    fn curriculum_deserialization_assigns_ids() {
        let module: CourseModule = serde_json::from_value(serde_json::json!({
            "module": "Basics",
            "lessons": [
                { "lessonTitle": "Intro", "lessonContent": "...", "duration": "10 mins" }
            ]
        }))
        .unwrap();
        assert!(!module.id.is_nil());
        assert_eq!(module.lessons.len(), 1);
        assert!(!module.lessons[0].id.is_nil());
    }

    #[test]
    fn course_serializes_camel_case() {
        let json = serde_json::to_value(ExperienceLevel::Intermediate).unwrap();
        assert_eq!(json, "Intermediate");
    }
}
