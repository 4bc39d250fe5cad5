use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::ApiError;
use crate::query::collection::{Collection, Field, FieldType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text")]
pub enum EventType {
    Webinar,
    Workshop,
    Seminar,
    Conference,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    #[serde(with = "time::serde::rfc3339")]
    pub event_date: OffsetDateTime,
    pub event_time: String,
    pub event_type: EventType,
    pub speaker: String,
    pub banner: String,
    pub registration_link: String,
    pub seats_available: i32,
    pub registered_users: Vec<Uuid>,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

pub static EVENTS: Collection = Collection {
    table: "events",
    fields: &[
        Field {
            name: "title",
            column: "title",
            ty: FieldType::Text,
        },
        Field {
            name: "eventType",
            column: "event_type",
            ty: FieldType::Text,
        },
        Field {
            name: "eventDate",
            column: "event_date",
            ty: FieldType::Timestamp,
        },
        Field {
            name: "speaker",
            column: "speaker",
            ty: FieldType::Text,
        },
        Field {
            name: "seatsAvailable",
            column: "seats_available",
            ty: FieldType::Int,
        },
        Field {
            name: "createdAt",
            column: "created_at",
            ty: FieldType::Timestamp,
        },
    ],
    search_fields: &["title", "description", "speaker"],
    base_filter: Some("is_active = TRUE"),
};

pub async fn find_by_id(db: &PgPool, id: Uuid) -> Result<Option<Event>, sqlx::Error> {
    sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1 AND is_active = TRUE")
        .bind(id)
        .fetch_optional(db)
        .await
}

#[allow(clippy::too_many_arguments)]
pub async fn create(
    db: &PgPool,
    title: &str,
    description: &str,
    event_date: OffsetDateTime,
    event_time: &str,
    event_type: EventType,
    speaker: &str,
    registration_link: &str,
    seats_available: i32,
) -> Result<Event, sqlx::Error> {
    sqlx::query_as::<_, Event>(
        "INSERT INTO events (title, description, event_date, event_time, event_type,
                             speaker, registration_link, seats_available)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
         RETURNING *",
    )
    .bind(title)
    .bind(description)
    .bind(event_date)
    .bind(event_time)
    .bind(event_type)
    .bind(speaker)
    .bind(registration_link)
    .bind(seats_available)
    .fetch_one(db)
    .await
}

#[allow(clippy::too_many_arguments)]
pub async fn update(
    db: &PgPool,
    id: Uuid,
    title: Option<&str>,
    description: Option<&str>,
    event_date: Option<OffsetDateTime>,
    event_time: Option<&str>,
    event_type: Option<EventType>,
    speaker: Option<&str>,
    registration_link: Option<&str>,
    seats_available: Option<i32>,
    is_active: Option<bool>,
) -> Result<Option<Event>, sqlx::Error> {
    sqlx::query_as::<_, Event>(
        "UPDATE events SET
            title = COALESCE($2, title),
            description = COALESCE($3, description),
            event_date = COALESCE($4, event_date),
            event_time = COALESCE($5, event_time),
            event_type = COALESCE($6, event_type),
            speaker = COALESCE($7, speaker),
            registration_link = COALESCE($8, registration_link),
            seats_available = COALESCE($9, seats_available),
            is_active = COALESCE($10, is_active),
            updated_at = now()
         WHERE id = $1
         RETURNING *",
    )
    .bind(id)
    .bind(title)
    .bind(description)
    .bind(event_date)
    .bind(event_time)
    .bind(event_type)
    .bind(speaker)
    .bind(registration_link)
    .bind(seats_available)
    .bind(is_active)
    .fetch_optional(db)
    .await
}

pub async fn delete(db: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let res = sqlx::query("DELETE FROM events WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    Ok(res.rows_affected() > 0)
}

pub async fn set_banner(db: &PgPool, id: Uuid, url: &str) -> Result<Option<Event>, sqlx::Error> {
    sqlx::query_as::<_, Event>(
        "UPDATE events SET banner = $2, updated_at = now() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(url)
    .fetch_optional(db)
    .await
}

/// Events the user has registered for.
pub async fn list_for_user(db: &PgPool, user_id: Uuid) -> Result<Vec<Event>, sqlx::Error> {
    sqlx::query_as::<_, Event>(
        "SELECT * FROM events
         WHERE registered_users @> ARRAY[$1]::uuid[] AND is_active = TRUE
         ORDER BY event_date",
    )
    .bind(user_id)
    .fetch_all(db)
    .await
}

/// Registers the caller: membership check and seat decrement happen under a
/// row lock so two concurrent registrations cannot both take the last seat.
/// Re-registering is rejected, never duplicated.
pub async fn register(db: &PgPool, event_id: Uuid, user_id: Uuid) -> Result<Event, ApiError> {
    let mut tx = db.begin().await?;

    let event = sqlx::query_as::<_, Event>(
        "SELECT * FROM events WHERE id = $1 AND is_active = TRUE FOR UPDATE",
    )
    .bind(event_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| ApiError::not_found("Event", event_id))?;

    if event.registered_users.contains(&user_id) {
        return Err(ApiError::Conflict(
            "User is already registered for this event".into(),
        ));
    }
    if event.seats_available <= 0 {
        return Err(ApiError::BadRequest(
            "No seats available for this event".into(),
        ));
    }

    let updated = sqlx::query_as::<_, Event>(
        "UPDATE events SET
            registered_users = array_append(registered_users, $2),
            seats_available = GREATEST(seats_available - 1, 0),
            updated_at = now()
         WHERE id = $1
         RETURNING *",
    )
    .bind(event_id)
    .bind(user_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(updated)
}
