use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::query::collection::{Collection, Field, FieldType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Admin,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub photo: String,
    pub address: Option<serde_json::Value>,
    pub wishlist: Vec<Uuid>,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

pub static USERS: Collection = Collection {
    table: "users",
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
            name: "phone",
            column: "phone",
            ty: FieldType::Text,
        },
        Field {
            name: "role",
            column: "role",
            ty: FieldType::Text,
        },
        Field {
            name: "isActive",
            column: "is_active",
            ty: FieldType::Bool,
        },
        Field {
            name: "createdAt",
            column: "created_at",
            ty: FieldType::Timestamp,
        },
    ],
    search_fields: &["fullName", "email"],
    base_filter: None,
};

const USER_COLUMNS: &str = "id, full_name, email, phone, password_hash, role, photo, address, \
                            wishlist, is_active, created_at, updated_at";

pub async fn find_by_email(db: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
    ))
    .bind(email)
    .fetch_optional(db)
    .await
}

pub async fn find_by_id(db: &PgPool, id: Uuid) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
        .bind(id)
        .fetch_optional(db)
        .await
}

pub async fn create(
    db: &PgPool,
    full_name: &str,
    email: &str,
    phone: &str,
    password_hash: &str,
    role: Role,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (full_name, email, phone, password_hash, role)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING {USER_COLUMNS}"
    ))
    .bind(full_name)
    .bind(email)
    .bind(phone)
    .bind(password_hash)
    .bind(role)
    .fetch_one(db)
    .await
}

/// Owner-facing profile update; only provided fields change.
pub async fn update_profile(
    db: &PgPool,
    id: Uuid,
    full_name: Option<&str>,
    email: Option<&str>,
    phone: Option<&str>,
    address: Option<&serde_json::Value>,
    photo: Option<&str>,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "UPDATE users SET
            full_name = COALESCE($2, full_name),
            email = COALESCE($3, email),
            phone = COALESCE($4, phone),
            address = COALESCE($5, address),
            photo = COALESCE($6, photo),
            updated_at = now()
         WHERE id = $1
         RETURNING {USER_COLUMNS}"
    ))
    .bind(id)
    .bind(full_name)
    .bind(email)
    .bind(phone)
    .bind(address)
    .bind(photo)
    .fetch_optional(db)
    .await
}

/// Admin update; role and active flag are only mutable through here.
pub async fn admin_update(
    db: &PgPool,
    id: Uuid,
    full_name: Option<&str>,
    email: Option<&str>,
    phone: Option<&str>,
    role: Option<Role>,
    is_active: Option<bool>,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "UPDATE users SET
            full_name = COALESCE($2, full_name),
            email = COALESCE($3, email),
            phone = COALESCE($4, phone),
            role = COALESCE($5, role),
            is_active = COALESCE($6, is_active),
            updated_at = now()
         WHERE id = $1
         RETURNING {USER_COLUMNS}"
    ))
    .bind(id)
    .bind(full_name)
    .bind(email)
    .bind(phone)
    .bind(role)
    .bind(is_active)
    .fetch_optional(db)
    .await
}

pub async fn set_password(db: &PgPool, id: Uuid, password_hash: &str) -> Result<bool, sqlx::Error> {
    let res = sqlx::query("UPDATE users SET password_hash = $2, updated_at = now() WHERE id = $1")
        .bind(id)
        .bind(password_hash)
        .execute(db)
        .await?;
    Ok(res.rows_affected() > 0)
}

pub async fn toggle_active(db: &PgPool, id: Uuid) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "UPDATE users SET is_active = NOT is_active, updated_at = now()
         WHERE id = $1
         RETURNING {USER_COLUMNS}"
    ))
    .bind(id)
    .fetch_optional(db)
    .await
}

/// Admin hard delete. Regular deactivation goes through the active flag.
pub async fn delete(db: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let res = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    Ok(res.rows_affected() > 0)
}

/// Enrolled courses are derived from the enrollments table; there is no
/// mirrored array to keep in sync.
pub async fn enrolled_course_ids(db: &PgPool, user_id: Uuid) -> Result<Vec<Uuid>, sqlx::Error> {
    sqlx::query_scalar::<_, Uuid>(
        "SELECT course_id FROM enrollments WHERE user_id = $1 ORDER BY created_at",
    )
    .bind(user_id)
    .fetch_all(db)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_is_never_serialized() {
        let user = User {
            id: Uuid::new_v4(),
            full_name: "A".into(),
            email: "a@b.co".into(),
            phone: "".into(),
            password_hash: "secret".into(),
            role: Role::Student,
            photo: "".into(),
            address: None,
            wishlist: vec![],
            is_active: true,
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret"));
        assert!(!json.contains("password"));
        assert!(json.contains("fullName"));
    }
}
