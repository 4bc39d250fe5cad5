use serde::Serialize;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PageRef {
    pub page: i64,
    pub limit: i64,
}

#[derive(Debug, Default, Serialize)]
pub struct Pagination {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<PageRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous: Option<PageRef>,
}

/// `total` is the size of the *filtered* set, so next/previous stay consistent
/// when a filter or search is active. Saturating arithmetic so hostile
/// page/limit values can never overflow.
pub fn build(page: i64, limit: i64, total: i64) -> Pagination {
    let next = if page.saturating_mul(limit) < total {
        Some(PageRef {
            page: page.saturating_add(1),
            limit,
        })
    } else {
        None
    };
    let previous = if page > 1 {
        Some(PageRef {
            page: page - 1,
            limit,
        })
    } else {
        None
    };
    Pagination { next, previous }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_page_of_23_items_limit_10() {
        let p = build(1, 10, 23);
        assert_eq!(p.next, Some(PageRef { page: 2, limit: 10 }));
        assert_eq!(p.previous, None);
    }

    #[test]
    fn middle_page_has_both_links() {
        let p = build(2, 10, 23);
        assert_eq!(p.next, Some(PageRef { page: 3, limit: 10 }));
        assert_eq!(p.previous, Some(PageRef { page: 1, limit: 10 }));
    }

    #[test]
    fn last_page_of_23_items_limit_10() {
        let p = build(3, 10, 23);
        assert_eq!(p.next, None);
        assert_eq!(p.previous, Some(PageRef { page: 2, limit: 10 }));
    }

    #[test]
    fn exact_multiple_has_no_next() {
        let p = build(2, 10, 20);
        assert_eq!(p.next, None);
    }

    #[test]
    fn extreme_page_values_do_not_overflow() {
        let p = build(i64::MAX, 25, 23);
        assert_eq!(p.next, None);
        assert_eq!(p.previous, Some(PageRef { page: i64::MAX - 1, limit: 25 }));
    }

    #[test]
    fn empty_result_set() {
        let p = build(1, 25, 0);
        assert_eq!(p.next, None);
        assert_eq!(p.previous, None);
    }

    #[test]
    fn omitted_links_are_not_serialized() {
        let body = serde_json::to_value(build(1, 10, 5)).unwrap();
        assert_eq!(body, serde_json::json!({}));
        let body = serde_json::to_value(build(1, 10, 23)).unwrap();
        assert_eq!(
            body,
            serde_json::json!({ "next": { "page": 2, "limit": 10 } })
        );
    }
}
