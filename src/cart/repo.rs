use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::courses;
use crate::enrollments::repo::{self as enrollments_repo, PaymentStatus};
use crate::error::ApiError;

#[derive(Debug, FromRow)]
pub struct Cart {
    pub id: Uuid,
    pub user_id: Uuid,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Cart line joined with its course summary.
#[derive(Debug, FromRow)]
pub struct CartItemRow {
    pub id: Uuid,
    pub course_id: Uuid,
    pub quantity: i32,
    pub created_at: OffsetDateTime,
    pub course_title: String,
    pub course_price: f64,
    pub course_thumbnail: String,
    pub course_instructor: String,
}

/// One cart per user. Insert-then-select rides the unique index on
/// `carts.user_id` so concurrent first requests converge on the same row.
pub async fn get_or_create(db: &PgPool, user_id: Uuid) -> Result<Cart, sqlx::Error> {
    sqlx::query("INSERT INTO carts (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
        .bind(user_id)
        .execute(db)
        .await?;
    sqlx::query_as::<_, Cart>("SELECT * FROM carts WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(db)
        .await
}

pub async fn list_items(db: &PgPool, cart_id: Uuid) -> Result<Vec<CartItemRow>, sqlx::Error> {
    sqlx::query_as::<_, CartItemRow>(
        "SELECT i.id,
                i.course_id,
                i.quantity,
                i.created_at,
                c.title AS course_title,
                c.price AS course_price,
                c.thumbnail AS course_thumbnail,
                c.instructor AS course_instructor
         FROM cart_items i
         JOIN courses c ON c.id = i.course_id
         WHERE i.cart_id = $1
         ORDER BY i.created_at",
    )
    .bind(cart_id)
    .fetch_all(db)
    .await
}

/// Adds a course to the cart, merging quantity into an existing line for the
/// same course.
pub async fn add_item(
    db: &PgPool,
    user_id: Uuid,
    course_id: Uuid,
    quantity: i32,
) -> Result<Cart, ApiError> {
    if quantity < 1 {
        return Err(ApiError::BadRequest("Quantity must be at least 1".into()));
    }
    courses::repo::find_by_id(db, course_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Course", course_id))?;

    let cart = get_or_create(db, user_id).await?;
    sqlx::query(
        "INSERT INTO cart_items (cart_id, course_id, quantity)
         VALUES ($1, $2, $3)
         ON CONFLICT (cart_id, course_id)
         DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity",
    )
    .bind(cart.id)
    .bind(course_id)
    .bind(quantity)
    .execute(db)
    .await?;
    Ok(cart)
}

/// Sets a line's quantity; zero or less removes the line. Returns false when
/// the line does not belong to the user's cart.
pub async fn update_item(
    db: &PgPool,
    user_id: Uuid,
    item_id: Uuid,
    quantity: i32,
) -> Result<bool, sqlx::Error> {
    let res = if quantity <= 0 {
        sqlx::query(
            "DELETE FROM cart_items i USING carts c
             WHERE i.id = $1 AND i.cart_id = c.id AND c.user_id = $2",
        )
        .bind(item_id)
        .bind(user_id)
        .execute(db)
        .await?
    } else {
        sqlx::query(
            "UPDATE cart_items i SET quantity = $3
             FROM carts c
             WHERE i.id = $1 AND i.cart_id = c.id AND c.user_id = $2",
        )
        .bind(item_id)
        .bind(user_id)
        .bind(quantity)
        .execute(db)
        .await?
    };
    Ok(res.rows_affected() > 0)
}

pub async fn remove_item(db: &PgPool, user_id: Uuid, item_id: Uuid) -> Result<bool, sqlx::Error> {
    let res = sqlx::query(
        "DELETE FROM cart_items i USING carts c
         WHERE i.id = $1 AND i.cart_id = c.id AND c.user_id = $2",
    )
    .bind(item_id)
    .bind(user_id)
    .execute(db)
    .await?;
    Ok(res.rows_affected() > 0)
}

pub async fn clear(db: &PgPool, user_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query(
        "DELETE FROM cart_items i USING carts c
         WHERE i.cart_id = c.id AND c.user_id = $1",
    )
    .bind(user_id)
    .execute(db)
    .await?;
    Ok(())
}

#[derive(Debug, FromRow)]
pub struct CartTotal {
    pub total: f64,
    pub item_count: i64,
}

/// Sum of price * quantity over the user's cart; an absent cart reads as an
/// empty one.
pub async fn total(db: &PgPool, user_id: Uuid) -> Result<CartTotal, sqlx::Error> {
    sqlx::query_as::<_, CartTotal>(
        "SELECT COALESCE(SUM(c.price * i.quantity), 0)::FLOAT8 AS total,
                COALESCE(SUM(i.quantity), 0) AS item_count
         FROM cart_items i
         JOIN courses c ON c.id = i.course_id
         JOIN carts ca ON ca.id = i.cart_id
         WHERE ca.user_id = $1",
    )
    .bind(user_id)
    .fetch_one(db)
    .await
}

/// Converts every cart line into a completed enrollment and empties the cart,
/// all in one transaction. Lines for already-enrolled courses are skipped and
/// the enrolled counter moves only for rows actually inserted.
pub async fn checkout(db: &PgPool, user_id: Uuid) -> Result<Vec<Uuid>, ApiError> {
    let mut tx = db.begin().await?;

    let course_ids: Vec<Uuid> = sqlx::query_scalar(
        "SELECT i.course_id FROM cart_items i
         JOIN carts c ON c.id = i.cart_id
         WHERE c.user_id = $1
         ORDER BY i.created_at",
    )
    .bind(user_id)
    .fetch_all(&mut *tx)
    .await?;

    if course_ids.is_empty() {
        return Err(ApiError::BadRequest("Cart is empty".into()));
    }

    let mut enrolled = Vec::new();
    for course_id in course_ids {
        let inserted =
            enrollments_repo::try_insert(&mut *tx, user_id, course_id, PaymentStatus::Completed)
                .await?;
        if let Some(enrollment) = inserted {
            enrollments_repo::increment_enrolled(&mut *tx, course_id).await?;
            enrolled.push(enrollment.id);
        }
    }

    sqlx::query(
        "DELETE FROM cart_items i USING carts c
         WHERE i.cart_id = c.id AND c.user_id = $1",
    )
    .bind(user_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(enrolled)
}
