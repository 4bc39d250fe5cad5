use axum::{
    extract::{FromRef, State},
    routing::{get, post, put},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{
            AuthResponse, LoginRequest, PublicUser, RefreshRequest, RegisterRequest,
            UpdatePasswordRequest,
        },
        is_valid_email,
        jwt::{AuthUser, JwtKeys},
        password::{hash_password, verify_password},
    },
    error::ApiError,
    response::{ok, DataEnvelope},
    state::AppState,
    users::repo::{self as users_repo, Role},
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/updatepassword", put(update_password))
}

fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.len() < 6 {
        return Err(ApiError::BadRequest(
            "Password should be at least 6 characters".into(),
        ));
    }
    Ok(())
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

fn issue_tokens(
    state: &AppState,
    user_id: uuid::Uuid,
    role: Role,
) -> Result<(String, String), ApiError> {
    let keys = JwtKeys::from_ref(state);
    let access = keys.sign_access(user_id, role)?;
    let refresh = keys.sign_refresh(user_id, role)?;
    Ok((access, refresh))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<Json<DataEnvelope<AuthResponse>>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();
    payload.full_name = payload.full_name.trim().to_string();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::BadRequest("Please add a valid email".into()));
    }
    if payload.full_name.is_empty() || payload.full_name.len() > 50 {
        return Err(ApiError::BadRequest(
            "Name is required and cannot be more than 50 characters".into(),
        ));
    }
    if payload.phone.len() > 15 {
        return Err(ApiError::BadRequest(
            "Phone number cannot be more than 15 digits".into(),
        ));
    }
    validate_password(&payload.password)?;

    let hash = hash_password(&payload.password)?;
    let user = users_repo::create(
        &state.db,
        &payload.full_name,
        &payload.email,
        &payload.phone,
        &hash,
        Role::Student,
    )
    .await
    .map_err(|e| ApiError::conflict_on_unique(e, "Email already registered"))?;

    let (access_token, refresh_token) = issue_tokens(&state, user.id, user.role)?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(ok(AuthResponse {
        access_token,
        refresh_token,
        user: PublicUser::from(&user),
    }))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<DataEnvelope<AuthResponse>>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::BadRequest("Please add a valid email".into()));
    }

    let user = users_repo::find_by_email(&state.db, &payload.email)
        .await?
        .ok_or_else(|| {
            warn!(email = %payload.email, "login unknown email");
            ApiError::Unauthorized("Invalid credentials".into())
        })?;

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(email = %payload.email, user_id = %user.id, "login invalid password");
        return Err(ApiError::Unauthorized("Invalid credentials".into()));
    }

    if !user.is_active {
        warn!(user_id = %user.id, "login on deactivated account");
        return Err(ApiError::Unauthorized("Account is deactivated".into()));
    }

    let (access_token, refresh_token) = issue_tokens(&state, user.id, user.role)?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(ok(AuthResponse {
        access_token,
        refresh_token,
        user: PublicUser::from(&user),
    }))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<DataEnvelope<AuthResponse>>, ApiError> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|e| ApiError::Unauthorized(e.to_string()))?;

    // Role may have changed since the refresh token was minted; reload it.
    let user = users_repo::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User not found".into()))?;

    if !user.is_active {
        return Err(ApiError::Unauthorized("Account is deactivated".into()));
    }

    let (access_token, refresh_token) = issue_tokens(&state, user.id, user.role)?;

    Ok(ok(AuthResponse {
        access_token,
        refresh_token,
        user: PublicUser::from(&user),
    }))
}

/// PUT /auth/updatepassword: credential rotation for a logged-in user. The
/// current password must verify before the new one is stored, and fresh
/// tokens are issued.
#[instrument(skip(state, payload))]
pub async fn update_password(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<UpdatePasswordRequest>,
) -> Result<Json<DataEnvelope<AuthResponse>>, ApiError> {
    validate_password(&payload.new_password)?;

    let user = users_repo::find_by_id(&state.db, auth.id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User not found".into()))?;

    if !verify_password(&payload.current_password, &user.password_hash)? {
        warn!(user_id = %user.id, "password change with wrong current password");
        return Err(ApiError::Unauthorized("Current password is incorrect".into()));
    }

    let hash = hash_password(&payload.new_password)?;
    if !users_repo::set_password(&state.db, user.id, &hash).await? {
        return Err(ApiError::Unauthorized("User not found".into()));
    }

    let (access_token, refresh_token) = issue_tokens(&state, user.id, user.role)?;

    info!(user_id = %user.id, "password updated");
    Ok(ok(AuthResponse {
        access_token,
        refresh_token,
        user: PublicUser::from(&user),
    }))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<DataEnvelope<PublicUser>>, ApiError> {
    let user = users_repo::find_by_id(&state.db, auth.id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User not found".into()))?;

    Ok(ok(PublicUser::from(&user)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_passwords_are_rejected() {
        assert!(validate_password("abc12").is_err());
        assert!(validate_password("abc123").is_ok());
    }

    #[test]
    fn update_password_request_is_camel_case() {
        let req: UpdatePasswordRequest = serde_json::from_value(serde_json::json!({
            "currentPassword": "old-secret",
            "newPassword": "new-secret"
        }))
        .unwrap();
        assert_eq!(req.current_password, "old-secret");
        assert_eq!(req.new_password, "new-secret");
    }

    #[test]
    fn public_user_serialization_is_camel_case() {
        let user = PublicUser {
            id: uuid::Uuid::new_v4(),
            full_name: "Test User".into(),
            email: "test@example.com".into(),
            role: Role::Student,
        };
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["fullName"], "Test User");
        assert_eq!(json["role"], "student");
    }
}
