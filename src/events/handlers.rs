use std::collections::HashMap;

use axum::{
    extract::{Multipart, Path, Query, State},
    routing::{get, post, put},
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

use super::dto::{CreateEventRequest, UpdateEventRequest};
use super::repo::{self, Event, EVENTS};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/events", get(list_events).post(create_event))
        .route("/events/my", get(my_events))
        .route(
            "/events/:id",
            get(get_event).put(update_event).delete(delete_event),
        )
        .route("/events/:id/register", post(register))
        .route("/events/:id/banner", put(upload_banner))
}

fn validate_event_fields(
    title: Option<&str>,
    seats_available: Option<i32>,
) -> Result<(), ApiError> {
    if let Some(title) = title {
        if title.trim().is_empty() || title.len() > 100 {
            return Err(ApiError::BadRequest(
                "Title is required and cannot be more than 100 characters".into(),
            ));
        }
    }
    if let Some(seats) = seats_available {
        if seats < 0 {
            return Err(ApiError::BadRequest(
                "Seats available cannot be negative".into(),
            ));
        }
    }
    Ok(())
}

#[instrument(skip(state))]
pub async fn list_events(
    State(state): State<AppState>,
    Query(raw): Query<HashMap<String, String>>,
) -> Result<Json<ListEnvelope>, ApiError> {
    let result = run_list::<Event>(&state.db, &EVENTS, &raw).await?;
    Ok(Json(result.into_envelope()))
}

#[instrument(skip(state))]
pub async fn my_events(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<DataEnvelope<Vec<Event>>>, ApiError> {
    Ok(ok(repo::list_for_user(&state.db, user.id).await?))
}

#[instrument(skip(state))]
pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DataEnvelope<Event>>, ApiError> {
    let event = repo::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Event", id))?;
    Ok(ok(event))
}

#[instrument(skip(state, payload))]
pub async fn create_event(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(payload): Json<CreateEventRequest>,
) -> Result<Json<DataEnvelope<Event>>, ApiError> {
    validate_event_fields(Some(&payload.title), Some(payload.seats_available))?;

    let event = repo::create(
        &state.db,
        payload.title.trim(),
        &payload.description,
        payload.event_date,
        &payload.event_time,
        payload.event_type,
        &payload.speaker,
        &payload.registration_link,
        payload.seats_available,
    )
    .await?;
    info!(event_id = %event.id, admin_id = %admin.id, "event created");
    Ok(ok(event))
}

#[instrument(skip(state, payload))]
pub async fn update_event(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateEventRequest>,
) -> Result<Json<DataEnvelope<Event>>, ApiError> {
    validate_event_fields(payload.title.as_deref(), payload.seats_available)?;

    let event = repo::update(
        &state.db,
        id,
        payload.title.as_deref(),
        payload.description.as_deref(),
        payload.event_date,
        payload.event_time.as_deref(),
        payload.event_type,
        payload.speaker.as_deref(),
        payload.registration_link.as_deref(),
        payload.seats_available,
        payload.is_active,
    )
    .await?
    .ok_or_else(|| ApiError::not_found("Event", id))?;
    Ok(ok(event))
}

#[instrument(skip(state))]
pub async fn delete_event(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<DataEnvelope<serde_json::Value>>, ApiError> {
    if !repo::delete(&state.db, id).await? {
        return Err(ApiError::not_found("Event", id));
    }
    info!(event_id = %id, admin_id = %admin.id, "event deleted");
    Ok(ok_empty())
}

#[instrument(skip(state))]
pub async fn register(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<DataEnvelope<Event>>, ApiError> {
    let event = repo::register(&state.db, id, user.id).await?;
    info!(event_id = %id, user_id = %user.id, "event registration");
    Ok(ok(event))
}

/// PUT /events/:id/banner (multipart, field `banner`).
#[instrument(skip(state, mp))]
pub async fn upload_banner(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
    mut mp: Multipart,
) -> Result<Json<DataEnvelope<Event>>, ApiError> {
    repo::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Event", id))?;

    let mut uploaded: Option<String> = None;
    while let Ok(Some(field)) = mp.next_field().await {
        if field.name() == Some("banner") {
            let content_type = field
                .content_type()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "application/octet-stream".into());
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(format!("invalid multipart field: {e}")))?;
            let key = format!("events/{}", Uuid::new_v4());
            state.media.put_object(&key, data, &content_type).await?;
            uploaded = Some(state.media.public_url(&key));
        }
    }

    let url =
        uploaded.ok_or_else(|| ApiError::BadRequest("Please upload a banner image".into()))?;
    let event = repo::set_banner(&state.db, id, &url)
        .await?
        .ok_or_else(|| ApiError::not_found("Event", id))?;
    Ok(ok(event))
}
