use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::query::collection::{Collection, Field, FieldType};

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub subject: String,
    pub description: String,
    pub is_read: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

pub static CONTACTS: Collection = Collection {
    table: "contacts",
    fields: &[
        Field {
            name: "fullName",
            column: "full_name",
            ty: FieldType::Text,
        },
        Field {
            name: "email",
            column: "email",
            ty: FieldType::Text,
        },
        Field {
            name: "subject",
            column: "subject",
            ty: FieldType::Text,
        },
        Field {
            name: "isRead",
            column: "is_read",
            ty: FieldType::Bool,
        },
        Field {
            name: "createdAt",
            column: "created_at",
            ty: FieldType::Timestamp,
        },
    ],
    search_fields: &[],
    base_filter: None,
};

pub async fn create(
    db: &PgPool,
    full_name: &str,
    email: &str,
    subject: &str,
    description: &str,
) -> Result<Contact, sqlx::Error> {
    sqlx::query_as::<_, Contact>(
        "INSERT INTO contacts (full_name, email, subject, description)
         VALUES ($1, $2, $3, $4)
         RETURNING *",
    )
    .bind(full_name)
    .bind(email)
    .bind(subject)
    .bind(description)
    .fetch_one(db)
    .await
}

pub async fn find_by_id(db: &PgPool, id: Uuid) -> Result<Option<Contact>, sqlx::Error> {
    sqlx::query_as::<_, Contact>("SELECT * FROM contacts WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await
}

/// The only mutable field after submission is the read flag.
pub async fn set_read(db: &PgPool, id: Uuid, is_read: bool) -> Result<Option<Contact>, sqlx::Error> {
    sqlx::query_as::<_, Contact>(
        "UPDATE contacts SET is_read = $2, updated_at = now() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(is_read)
    .fetch_optional(db)
    .await
}

pub async fn unread_count(db: &PgPool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM contacts WHERE is_read = FALSE")
        .fetch_one(db)
        .await
}

pub async fn delete(db: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let res = sqlx::query("DELETE FROM contacts WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    Ok(res.rows_affected() > 0)
}
