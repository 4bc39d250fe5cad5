use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::jwt::{AdminUser, AuthUser},
    error::ApiError,
    query::run_list,
    response::{ok, ok_empty, DataEnvelope, ListEnvelope},
    state::AppState,
};

use super::dto::{CourseFeedback, CreateFeedbackRequest, FeedbackDetail, UpdateFeedbackRequest};
use super::repo::{self, Feedback, FEEDBACK};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/feedback", get(list_feedback).post(create_feedback))
        .route("/feedback/course/:course_id", get(course_feedback))
        .route(
            "/feedback/:id",
            get(get_feedback).put(update_feedback).delete(delete_feedback),
        )
}

#[instrument(skip(state, payload))]
pub async fn create_feedback(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateFeedbackRequest>,
) -> Result<Json<DataEnvelope<Feedback>>, ApiError> {
    let feedback = repo::create(
        &state.db,
        user.id,
        payload.course_id,
        payload.rating,
        payload.comment.trim(),
    )
    .await?;
    info!(feedback_id = %feedback.id, course_id = %payload.course_id, "feedback submitted");
    Ok(ok(feedback))
}

#[instrument(skip(state))]
pub async fn list_feedback(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Query(raw): Query<HashMap<String, String>>,
) -> Result<Json<ListEnvelope>, ApiError> {
    let result = run_list::<Feedback>(&state.db, &FEEDBACK, &raw).await?;
    Ok(Json(result.into_envelope()))
}

/// Public per-course review listing.
#[instrument(skip(state))]
pub async fn course_feedback(
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
) -> Result<Json<DataEnvelope<Vec<CourseFeedback>>>, ApiError> {
    let rows = repo::list_for_course(&state.db, course_id).await?;
    Ok(ok(rows.into_iter().map(CourseFeedback::from).collect()))
}

#[instrument(skip(state))]
pub async fn get_feedback(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<DataEnvelope<FeedbackDetail>>, ApiError> {
    let row = repo::find_detail(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Feedback", id))?;
    Ok(ok(FeedbackDetail::from(row)))
}

#[instrument(skip(state, payload))]
pub async fn update_feedback(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateFeedbackRequest>,
) -> Result<Json<DataEnvelope<Feedback>>, ApiError> {
    let existing = repo::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Feedback", id))?;
    if !user.is_admin() && existing.user_id != user.id {
        return Err(ApiError::Unauthorized(
            "Not authorized to update this feedback".into(),
        ));
    }

    let feedback = repo::update(
        &state.db,
        id,
        existing.course_id,
        payload.rating,
        payload.comment.as_deref(),
    )
    .await?;
    Ok(ok(feedback))
}

#[instrument(skip(state))]
pub async fn delete_feedback(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<DataEnvelope<serde_json::Value>>, ApiError> {
    let existing = repo::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Feedback", id))?;
    if !user.is_admin() && existing.user_id != user.id {
        return Err(ApiError::Unauthorized(
            "Not authorized to delete this feedback".into(),
        ));
    }

    repo::delete(&state.db, id, existing.course_id).await?;
    info!(feedback_id = %id, "feedback deleted");
    Ok(ok_empty())
}
