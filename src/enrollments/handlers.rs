use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    routing::{get, put},
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

use super::dto::{
    CreateEnrollmentRequest, EnrollmentDetail, MyEnrollment, UpdateEnrollmentRequest,
    UpdateProgressRequest,
};
use super::repo::{self, Enrollment, ENROLLMENTS};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/enrollments", get(list_enrollments).post(create_enrollment))
        .route("/enrollments/my", get(my_enrollments))
        .route(
            "/enrollments/:id",
            get(get_enrollment)
                .put(update_enrollment)
                .delete(delete_enrollment),
        )
        .route("/enrollments/:id/progress", put(update_progress))
}

#[instrument(skip(state, payload))]
pub async fn create_enrollment(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateEnrollmentRequest>,
) -> Result<Json<DataEnvelope<Enrollment>>, ApiError> {
    let enrollment = repo::enroll(&state.db, user.id, payload.course_id).await?;
    info!(enrollment_id = %enrollment.id, user_id = %user.id, "user enrolled");
    Ok(ok(enrollment))
}

#[instrument(skip(state))]
pub async fn my_enrollments(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<DataEnvelope<Vec<MyEnrollment>>>, ApiError> {
    let rows = repo::list_for_user(&state.db, user.id).await?;
    Ok(ok(rows.into_iter().map(MyEnrollment::from).collect()))
}

#[instrument(skip(state))]
pub async fn list_enrollments(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Query(raw): Query<HashMap<String, String>>,
) -> Result<Json<ListEnvelope>, ApiError> {
    let result = run_list::<Enrollment>(&state.db, &ENROLLMENTS, &raw).await?;
    Ok(Json(result.into_envelope()))
}

#[instrument(skip(state))]
pub async fn get_enrollment(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<DataEnvelope<EnrollmentDetail>>, ApiError> {
    let row = repo::find_detail(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Enrollment", id))?;
    Ok(ok(EnrollmentDetail::from(row)))
}

#[instrument(skip(state, payload))]
pub async fn update_enrollment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateEnrollmentRequest>,
) -> Result<Json<DataEnvelope<Enrollment>>, ApiError> {
    let existing = repo::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Enrollment", id))?;
    if !user.is_admin() && existing.user_id != user.id {
        return Err(ApiError::Unauthorized(
            "Not authorized to update this enrollment".into(),
        ));
    }

    let enrollment = repo::update_fields(
        &state.db,
        id,
        payload.payment_status,
        payload.certificate_issued,
    )
    .await?
    .ok_or_else(|| ApiError::not_found("Enrollment", id))?;
    Ok(ok(enrollment))
}

#[instrument(skip(state))]
pub async fn delete_enrollment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<DataEnvelope<serde_json::Value>>, ApiError> {
    repo::unenroll(&state.db, id, user.id, user.is_admin()).await?;
    info!(enrollment_id = %id, user_id = %user.id, "enrollment deleted");
    Ok(ok_empty())
}

/// PUT /enrollments/:id/progress, owner only.
#[instrument(skip(state, payload))]
pub async fn update_progress(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProgressRequest>,
) -> Result<Json<DataEnvelope<Enrollment>>, ApiError> {
    let enrollment = repo::record_lesson_completion(
        &state.db,
        id,
        user.id,
        payload.module_id,
        payload.lesson_id,
    )
    .await?;
    Ok(ok(enrollment))
}
