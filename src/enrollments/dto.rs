use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use time::OffsetDateTime;
use uuid::Uuid;

use super::progress::CompletedLesson;
use super::repo::{EnrollmentCourseRow, EnrollmentDetailRow, PaymentStatus};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEnrollmentRequest {
    pub course_id: Uuid,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEnrollmentRequest {
    pub payment_status: Option<PaymentStatus>,
    pub certificate_issued: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProgressRequest {
    pub module_id: Uuid,
    pub lesson_id: Uuid,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseSummary {
    pub id: Uuid,
    pub title: String,
    pub category: String,
    pub price: f64,
    pub thumbnail: String,
    pub instructor: String,
    pub rating: f32,
}

/// One of the caller's enrollments with its course summary nested.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MyEnrollment {
    pub id: Uuid,
    pub payment_status: PaymentStatus,
    pub progress: i32,
    pub completed_lessons: Json<Vec<CompletedLesson>>,
    pub certificate_issued: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub completed_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub course: CourseSummary,
}

impl From<EnrollmentCourseRow> for MyEnrollment {
    fn from(row: EnrollmentCourseRow) -> Self {
        Self {
            id: row.id,
            payment_status: row.payment_status,
            progress: row.progress,
            completed_lessons: row.completed_lessons,
            certificate_issued: row.certificate_issued,
            completed_at: row.completed_at,
            created_at: row.created_at,
            course: CourseSummary {
                id: row.course_id,
                title: row.course_title,
                category: row.course_category,
                price: row.course_price,
                thumbnail: row.course_thumbnail,
                instructor: row.course_instructor,
                rating: row.course_rating,
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRef {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseRef {
    pub id: Uuid,
    pub title: String,
    pub price: f64,
}

/// Admin detail view with user and course references resolved.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentDetail {
    pub id: Uuid,
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
    pub user: UserRef,
    pub course: CourseRef,
}

impl From<EnrollmentDetailRow> for EnrollmentDetail {
    fn from(row: EnrollmentDetailRow) -> Self {
        Self {
            id: row.id,
            payment_status: row.payment_status,
            progress: row.progress,
            completed_lessons: row.completed_lessons,
            certificate_issued: row.certificate_issued,
            completed_at: row.completed_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
            user: UserRef {
                id: row.user_id,
                full_name: row.user_full_name,
                email: row.user_email,
            },
            course: CourseRef {
                id: row.course_id,
                title: row.course_title,
                price: row.course_price,
            },
        }
    }
}
