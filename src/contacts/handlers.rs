use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::{self, jwt::AdminUser},
    error::ApiError,
    notify::notify_best_effort,
    query::run_list,
    response::{ok, ok_empty, DataEnvelope, ListEnvelope},
    state::AppState,
};

use super::repo::{self, Contact, CONTACTS};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/contacts", get(list_contacts).post(submit_contact))
        .route("/contacts/unread/count", get(unread_count))
        .route(
            "/contacts/:id",
            get(get_contact).put(update_contact).delete(delete_contact),
        )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitContactRequest {
    pub full_name: String,
    pub email: String,
    pub subject: String,
    pub description: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateContactRequest {
    pub is_read: bool,
}

#[derive(Debug, Serialize)]
pub struct UnreadCount {
    pub count: i64,
}

fn validate_submission(payload: &SubmitContactRequest) -> Result<(), ApiError> {
    if payload.full_name.trim().is_empty() || payload.full_name.len() > 50 {
        return Err(ApiError::BadRequest(
            "Name is required and cannot be more than 50 characters".into(),
        ));
    }
    if !auth::is_valid_email(&payload.email) {
        return Err(ApiError::BadRequest("Please provide a valid email".into()));
    }
    if payload.subject.trim().is_empty() || payload.subject.len() > 100 {
        return Err(ApiError::BadRequest(
            "Subject is required and cannot be more than 100 characters".into(),
        ));
    }
    if payload.description.trim().is_empty() || payload.description.len() > 1000 {
        return Err(ApiError::BadRequest(
            "Description is required and cannot be more than 1000 characters".into(),
        ));
    }
    Ok(())
}

/// Public endpoint; the admin notification is best-effort and never fails the
/// submission.
#[instrument(skip(state, payload))]
pub async fn submit_contact(
    State(state): State<AppState>,
    Json(payload): Json<SubmitContactRequest>,
) -> Result<Json<DataEnvelope<Contact>>, ApiError> {
    validate_submission(&payload)?;

    let contact = repo::create(
        &state.db,
        payload.full_name.trim(),
        &payload.email.to_lowercase(),
        payload.subject.trim(),
        payload.description.trim(),
    )
    .await?;

    let subject = format!("New Contact Form Submission: {}", contact.subject);
    let body = format!(
        "From: {} <{}>\n\n{}",
        contact.full_name, contact.email, contact.description
    );
    notify_best_effort(
        state.notifier.as_ref(),
        &state.config.admin_email,
        &subject,
        &body,
    )
    .await;

    info!(contact_id = %contact.id, "contact form submitted");
    Ok(ok(contact))
}

#[instrument(skip(state))]
pub async fn list_contacts(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Query(raw): Query<HashMap<String, String>>,
) -> Result<Json<ListEnvelope>, ApiError> {
    let result = run_list::<Contact>(&state.db, &CONTACTS, &raw).await?;
    Ok(Json(result.into_envelope()))
}

/// Admin badge counter for the inbox.
#[instrument(skip(state))]
pub async fn unread_count(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> Result<Json<DataEnvelope<UnreadCount>>, ApiError> {
    let count = repo::unread_count(&state.db).await?;
    Ok(ok(UnreadCount { count }))
}

#[instrument(skip(state))]
pub async fn get_contact(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<DataEnvelope<Contact>>, ApiError> {
    let contact = repo::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Contact", id))?;
    Ok(ok(contact))
}

#[instrument(skip(state, payload))]
pub async fn update_contact(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateContactRequest>,
) -> Result<Json<DataEnvelope<Contact>>, ApiError> {
    let contact = repo::set_read(&state.db, id, payload.is_read)
        .await?
        .ok_or_else(|| ApiError::not_found("Contact", id))?;
    Ok(ok(contact))
}

#[instrument(skip(state))]
pub async fn delete_contact(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<DataEnvelope<serde_json::Value>>, ApiError> {
    if !repo::delete(&state.db, id).await? {
        return Err(ApiError::not_found("Contact", id));
    }
    Ok(ok_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> SubmitContactRequest {
        SubmitContactRequest {
            full_name: "Jane Doe".into(),
            email: "jane@example.com".into(),
            subject: "Course access".into(),
            description: "I cannot open my enrolled course.".into(),
        }
    }

    #[test]
    fn accepts_a_valid_submission() {
        assert!(validate_submission(&valid()).is_ok());
    }

    #[test]
    fn rejects_blank_and_oversized_fields() {
        let mut p = valid();
        p.full_name = " ".into();
        assert!(validate_submission(&p).is_err());

        let mut p = valid();
        p.subject = "x".repeat(101);
        assert!(validate_submission(&p).is_err());

        let mut p = valid();
        p.description = "x".repeat(1001);
        assert!(validate_submission(&p).is_err());
    }

    #[test]
    fn rejects_bad_email() {
        let mut p = valid();
        p.email = "not-an-email".into();
        assert!(validate_submission(&p).is_err());
    }
}
