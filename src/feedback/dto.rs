use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo::{FeedbackDetailRow, FeedbackUserRow};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFeedbackRequest {
    pub course_id: Uuid,
    pub rating: i32,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFeedbackRequest {
    pub rating: Option<i32>,
    pub comment: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewerRef {
    pub id: Uuid,
    pub full_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseFeedback {
    pub id: Uuid,
    pub rating: i32,
    pub comment: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub user: ReviewerRef,
}

impl From<FeedbackUserRow> for CourseFeedback {
    fn from(row: FeedbackUserRow) -> Self {
        Self {
            id: row.id,
            rating: row.rating,
            comment: row.comment,
            created_at: row.created_at,
            user: ReviewerRef {
                id: row.user_id,
                full_name: row.user_full_name,
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackUserDetail {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackCourseDetail {
    pub id: Uuid,
    pub title: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackDetail {
    pub id: Uuid,
    pub rating: i32,
    pub comment: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub user: FeedbackUserDetail,
    pub course: FeedbackCourseDetail,
}

impl From<FeedbackDetailRow> for FeedbackDetail {
    fn from(row: FeedbackDetailRow) -> Self {
        Self {
            id: row.id,
            rating: row.rating,
            comment: row.comment,
            created_at: row.created_at,
            updated_at: row.updated_at,
            user: FeedbackUserDetail {
                id: row.user_id,
                full_name: row.user_full_name,
                email: row.user_email,
            },
            course: FeedbackCourseDetail {
                id: row.course_id,
                title: row.course_title,
            },
        }
    }
}
