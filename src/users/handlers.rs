use std::collections::HashMap;

use axum::{
    extract::{Multipart, Path, Query, State},
    routing::{get, put},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::is_valid_email,
    auth::jwt::{AdminUser, AuthUser},
    error::ApiError,
    query::run_list,
    response::{ok, ok_empty, DataEnvelope, ListEnvelope},
    state::AppState,
};

use super::dto::{ProfileResponse, UpdateUserRequest};
use super::repo::{self, User, USERS};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users/profile", get(get_profile).put(update_profile))
        .route("/users", get(list_users))
        .route(
            "/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route("/users/:id/toggle-active", put(toggle_active))
}

#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<DataEnvelope<ProfileResponse>>, ApiError> {
    let user = repo::find_by_id(&state.db, auth.id)
        .await?
        .ok_or_else(|| ApiError::not_found("User", auth.id))?;
    let enrolled_courses = repo::enrolled_course_ids(&state.db, auth.id).await?;
    Ok(ok(ProfileResponse {
        user,
        enrolled_courses,
    }))
}

/// PUT /users/profile (multipart): text fields plus an optional `photo` file
/// that goes to the media store.
#[instrument(skip(state, mp))]
pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    mut mp: Multipart,
) -> Result<Json<DataEnvelope<ProfileResponse>>, ApiError> {
    let mut full_name: Option<String> = None;
    let mut email: Option<String> = None;
    let mut phone: Option<String> = None;
    let mut address: Option<serde_json::Value> = None;
    let mut photo_url: Option<String> = None;

    while let Ok(Some(field)) = mp.next_field().await {
        match field.name().map(|s| s.to_string()).as_deref() {
            Some("fullName") => {
                full_name = Some(field.text().await.map_err(bad_multipart)?);
            }
            Some("email") => {
                let value = field.text().await.map_err(bad_multipart)?;
                let value = value.trim().to_lowercase();
                if !is_valid_email(&value) {
                    return Err(ApiError::BadRequest("Please add a valid email".into()));
                }
                email = Some(value);
            }
            Some("phone") => {
                phone = Some(field.text().await.map_err(bad_multipart)?);
            }
            Some("address") => {
                let raw = field.text().await.map_err(bad_multipart)?;
                address = Some(
                    serde_json::from_str(&raw)
                        .map_err(|_| ApiError::BadRequest("address must be a JSON object".into()))?,
                );
            }
            Some("photo") => {
                let content_type = field
                    .content_type()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "application/octet-stream".into());
                let data = field.bytes().await.map_err(bad_multipart)?;
                let key = format!("avatars/{}", Uuid::new_v4());
                state.media.put_object(&key, data, &content_type).await?;
                photo_url = Some(state.media.public_url(&key));
            }
            _ => {}
        }
    }

    let user = repo::update_profile(
        &state.db,
        auth.id,
        full_name.as_deref(),
        email.as_deref(),
        phone.as_deref(),
        address.as_ref(),
        photo_url.as_deref(),
    )
    .await
    .map_err(|e| ApiError::conflict_on_unique(e, "Email already registered"))?
    .ok_or_else(|| ApiError::not_found("User", auth.id))?;

    let enrolled_courses = repo::enrolled_course_ids(&state.db, auth.id).await?;
    info!(user_id = %auth.id, "profile updated");
    Ok(ok(ProfileResponse {
        user,
        enrolled_courses,
    }))
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(raw): Query<HashMap<String, String>>,
) -> Result<Json<ListEnvelope>, ApiError> {
    let result = run_list::<User>(&state.db, &USERS, &raw).await?;
    Ok(Json(result.into_envelope()))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<DataEnvelope<User>>, ApiError> {
    let user = repo::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("User", id))?;
    Ok(ok(user))
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<DataEnvelope<User>>, ApiError> {
    if let Some(email) = &payload.email {
        if !is_valid_email(email) {
            return Err(ApiError::BadRequest("Please add a valid email".into()));
        }
    }
    let user = repo::admin_update(
        &state.db,
        id,
        payload.full_name.as_deref(),
        payload.email.as_deref(),
        payload.phone.as_deref(),
        payload.role,
        payload.is_active,
    )
    .await
    .map_err(|e| ApiError::conflict_on_unique(e, "Email already registered"))?
    .ok_or_else(|| ApiError::not_found("User", id))?;
    Ok(ok(user))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<DataEnvelope<serde_json::Value>>, ApiError> {
    if !repo::delete(&state.db, id).await? {
        return Err(ApiError::not_found("User", id));
    }
    info!(user_id = %id, "user deleted");
    Ok(ok_empty())
}

#[instrument(skip(state))]
pub async fn toggle_active(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<DataEnvelope<User>>, ApiError> {
    let user = repo::toggle_active(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("User", id))?;
    info!(user_id = %id, is_active = user.is_active, "user active flag toggled");
    Ok(ok(user))
}

fn bad_multipart(e: axum::extract::multipart::MultipartError) -> ApiError {
    ApiError::BadRequest(format!("invalid multipart field: {e}"))
}
