use serde::Serialize;
use serde_json::{json, Value};

use crate::query::pagination::Pagination;

/// Single-entity / mutation envelope: `{ "success": true, "data": ... }`.
#[derive(Debug, Serialize)]
pub struct DataEnvelope<T: Serialize> {
    pub success: bool,
    pub data: T,
}

pub fn ok<T: Serialize>(data: T) -> axum::Json<DataEnvelope<T>> {
    axum::Json(DataEnvelope {
        success: true,
        data,
    })
}

/// Mutation-without-body responses carry an empty object, not null.
pub fn ok_empty() -> axum::Json<DataEnvelope<Value>> {
    ok(json!({}))
}

/// List envelope: `{ success, count, total, pagination, data }`.
#[derive(Debug, Serialize)]
pub struct ListEnvelope {
    pub success: bool,
    pub count: usize,
    pub total: i64,
    pub pagination: Pagination,
    pub data: Vec<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_envelope_shape() {
        let body = serde_json::to_value(&DataEnvelope {
            success: true,
            data: json!({ "id": 1 }),
        })
        .unwrap();
        assert_eq!(body, json!({ "success": true, "data": { "id": 1 } }));
    }

    #[test]
    fn empty_mutation_body_is_an_object() {
        let body = serde_json::to_value(&ok_empty().0).unwrap();
        assert_eq!(body, json!({ "success": true, "data": {} }));
    }
}
