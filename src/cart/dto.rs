use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo::{CartItemRow, CartTotal};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub course_id: Uuid,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItemRequest {
    pub quantity: i32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemView {
    pub id: Uuid,
    pub quantity: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub added_at: OffsetDateTime,
    pub course: CartCourse,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartCourse {
    pub id: Uuid,
    pub title: String,
    pub price: f64,
    pub thumbnail: String,
    pub instructor: String,
}

impl From<CartItemRow> for CartItemView {
    fn from(row: CartItemRow) -> Self {
        Self {
            id: row.id,
            quantity: row.quantity,
            added_at: row.created_at,
            course: CartCourse {
                id: row.course_id,
                title: row.course_title,
                price: row.course_price,
                thumbnail: row.course_thumbnail,
                instructor: row.course_instructor,
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub id: Uuid,
    pub items: Vec<CartItemView>,
    pub total: f64,
    pub item_count: i64,
}

impl CartView {
    pub fn assemble(cart_id: Uuid, items: Vec<CartItemRow>, totals: CartTotal) -> Self {
        Self {
            id: cart_id,
            items: items.into_iter().map(CartItemView::from).collect(),
            total: totals.total,
            item_count: totals.item_count,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartTotalView {
    pub total: f64,
    pub item_count: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub enrollments_created: usize,
    pub enrollment_ids: Vec<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cart_view_serializes_camel_case() {
        let view = CartView::assemble(
            Uuid::from_u128(1),
            vec![CartItemRow {
                id: Uuid::from_u128(2),
                course_id: Uuid::from_u128(3),
                quantity: 2,
                created_at: OffsetDateTime::UNIX_EPOCH,
                course_title: "Rust for Backend Engineers".into(),
                course_price: 49.99,
                course_thumbnail: String::new(),
                course_instructor: "J. Doe".into(),
            }],
            CartTotal {
                total: 99.98,
                item_count: 2,
            },
        );
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["itemCount"], 2);
        assert_eq!(json["items"][0]["course"]["title"], "Rust for Backend Engineers");
        assert!(json["items"][0].get("addedAt").is_some());
    }
}
