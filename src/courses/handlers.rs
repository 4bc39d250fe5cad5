use std::collections::HashMap;

use axum::{
    extract::{Multipart, Path, Query, State},
    routing::{get, post, put},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::jwt::AdminUser,
    error::ApiError,
    query::run_list,
    response::{ok, ok_empty, DataEnvelope, ListEnvelope},
    state::AppState,
};

use super::dto::{CreateCourseRequest, UpdateCourseRequest};
use super::repo::{self, Course, COURSES};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/courses", get(list_courses).post(create_course))
        .route("/courses/top", get(top_rated))
        .route("/courses/popular", get(most_popular))
        .route(
            "/courses/:id",
            get(get_course).put(update_course).delete(delete_course),
        )
        .route("/courses/:id/thumbnail", put(upload_thumbnail))
}

#[instrument(skip(state))]
pub async fn list_courses(
    State(state): State<AppState>,
    Query(raw): Query<HashMap<String, String>>,
) -> Result<Json<ListEnvelope>, ApiError> {
    let result = run_list::<Course>(&state.db, &COURSES, &raw).await?;
    Ok(Json(result.into_envelope()))
}

#[instrument(skip(state))]
pub async fn get_course(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DataEnvelope<Course>>, ApiError> {
    let course = repo::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Course", id))?;
    Ok(ok(course))
}

#[instrument(skip(state))]
pub async fn top_rated(
    State(state): State<AppState>,
) -> Result<Json<DataEnvelope<Vec<Course>>>, ApiError> {
    Ok(ok(repo::top_rated(&state.db).await?))
}

#[instrument(skip(state))]
pub async fn most_popular(
    State(state): State<AppState>,
) -> Result<Json<DataEnvelope<Vec<Course>>>, ApiError> {
    Ok(ok(repo::most_popular(&state.db).await?))
}

fn validate_course_fields(
    title: Option<&str>,
    short_description: Option<&str>,
    price: Option<f64>,
) -> Result<(), ApiError> {
    if let Some(title) = title {
        if title.trim().is_empty() || title.len() > 100 {
            return Err(ApiError::BadRequest(
                "Title is required and cannot be more than 100 characters".into(),
            ));
        }
    }
    if let Some(short) = short_description {
        if short.len() > 200 {
            return Err(ApiError::BadRequest(
                "Short description cannot be more than 200 characters".into(),
            ));
        }
    }
    if let Some(price) = price {
        if price < 0.0 {
            return Err(ApiError::BadRequest("Price must be at least 0".into()));
        }
    }
    Ok(())
}

#[instrument(skip(state, payload))]
pub async fn create_course(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(payload): Json<CreateCourseRequest>,
) -> Result<Json<DataEnvelope<Course>>, ApiError> {
    validate_course_fields(
        Some(&payload.title),
        Some(&payload.short_description),
        Some(payload.price),
    )?;

    let course = repo::create(
        &state.db,
        payload.title.trim(),
        &payload.category,
        payload.experience_level,
        &payload.short_description,
        &payload.long_description,
        payload.curriculum,
        payload.price,
        &payload.instructor,
    )
    .await
    .map_err(|e| ApiError::conflict_on_unique(e, "A course with this title already exists"))?;

    info!(course_id = %course.id, admin_id = %admin.id, "course created");
    Ok(ok(course))
}

#[instrument(skip(state, payload))]
pub async fn update_course(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCourseRequest>,
) -> Result<Json<DataEnvelope<Course>>, ApiError> {
    validate_course_fields(
        payload.title.as_deref(),
        payload.short_description.as_deref(),
        payload.price,
    )?;

    let course = repo::update(
        &state.db,
        id,
        payload.title.as_deref(),
        payload.category.as_deref(),
        payload.experience_level,
        payload.short_description.as_deref(),
        payload.long_description.as_deref(),
        payload.curriculum,
        payload.price,
        payload.instructor.as_deref(),
        payload.is_active,
    )
    .await
    .map_err(|e| ApiError::conflict_on_unique(e, "A course with this title already exists"))?
    .ok_or_else(|| ApiError::not_found("Course", id))?;

    Ok(ok(course))
}

#[instrument(skip(state))]
pub async fn delete_course(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<DataEnvelope<serde_json::Value>>, ApiError> {
    if !repo::soft_delete(&state.db, id).await? {
        return Err(ApiError::not_found("Course", id));
    }
    info!(course_id = %id, admin_id = %admin.id, "course soft-deleted");
    Ok(ok_empty())
}

/// PUT /courses/:id/thumbnail (multipart, field `thumbnail`).
#[instrument(skip(state, mp))]
pub async fn upload_thumbnail(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
    mut mp: Multipart,
) -> Result<Json<DataEnvelope<Course>>, ApiError> {
    // 404 before accepting the upload.
    repo::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Course", id))?;

    let mut uploaded: Option<String> = None;
    while let Ok(Some(field)) = mp.next_field().await {
        if field.name() == Some("thumbnail") {
            let content_type = field
                .content_type()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "application/octet-stream".into());
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(format!("invalid multipart field: {e}")))?;
            let key = format!("courses/{}", Uuid::new_v4());
            state.media.put_object(&key, data, &content_type).await?;
            uploaded = Some(state.media.public_url(&key));
        }
    }

    let url = uploaded
        .ok_or_else(|| ApiError::BadRequest("Please upload a thumbnail image".into()))?;
    let course = repo::set_thumbnail(&state.db, id, &url)
        .await?
        .ok_or_else(|| ApiError::not_found("Course", id))?;
    Ok(ok(course))
}
