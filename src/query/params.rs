use std::collections::HashMap;

/// Keys consumed by the engine itself; everything else becomes a field filter.
const RESERVED: [&str; 5] = ["select", "sort", "page", "limit", "search"];

const DEFAULT_LIMIT: i64 = 25;

// Ceilings keep page * limit far from i64 overflow and the OFFSET non-negative
// no matter what the query string says.
const MAX_PAGE: i64 = 1_000_000;
const MAX_LIMIT: i64 = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
}

impl FilterOp {
    fn from_token(token: &str) -> Option<Self> {
        match token {
            "gt" => Some(Self::Gt),
            "gte" => Some(Self::Gte),
            "lt" => Some(Self::Lt),
            "lte" => Some(Self::Lte),
            "in" => Some(Self::In),
            _ => None,
        }
    }

    pub fn sql(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
            // `In` is rendered as `= ANY(...)`, not through this path.
            Self::In => "=",
        }
    }
}

/// One parsed filter expression: `{field, op, value}` built from the raw query
/// string exactly once, instead of ad hoc string substitution.
#[derive(Debug, Clone)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct SortKey {
    pub field: String,
    pub descending: bool,
}

#[derive(Debug, Clone)]
pub struct ListParams {
    pub filters: Vec<Filter>,
    pub search: Option<String>,
    pub select: Option<Vec<String>>,
    pub sort: Vec<SortKey>,
    pub page: i64,
    pub limit: i64,
}

impl ListParams {
    pub fn parse(raw: &HashMap<String, String>) -> Self {
        let mut filters = Vec::new();
        for (key, value) in raw {
            if RESERVED.contains(&key.as_str()) {
                continue;
            }
            filters.push(parse_filter_key(key, value));
        }
        // Deterministic order regardless of hash-map iteration.
        filters.sort_by(|a, b| a.field.cmp(&b.field));

        let search = raw
            .get("search")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let select = raw.get("select").map(|s| {
            s.split(',')
                .map(|f| f.trim().to_string())
                .filter(|f| !f.is_empty())
                .collect::<Vec<_>>()
        });

        let sort = match raw.get("sort") {
            Some(s) => s
                .split(',')
                .map(|f| f.trim())
                .filter(|f| !f.is_empty() && *f != "-")
                .map(|f| match f.strip_prefix('-') {
                    Some(rest) => SortKey {
                        field: rest.to_string(),
                        descending: true,
                    },
                    None => SortKey {
                        field: f.to_string(),
                        descending: false,
                    },
                })
                .collect(),
            None => vec![SortKey {
                field: "createdAt".to_string(),
                descending: true,
            }],
        };

        let page = raw
            .get("page")
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|p| *p >= 1)
            .unwrap_or(1)
            .min(MAX_PAGE);
        let limit = raw
            .get("limit")
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|l| *l >= 1)
            .unwrap_or(DEFAULT_LIMIT)
            .min(MAX_LIMIT);

        Self {
            filters,
            search,
            select,
            sort,
            page,
            limit,
        }
    }
}

/// `price[gte]=100` becomes a range filter; a bracket suffix that is not a
/// known operator keeps the whole key as a literal field name (fails open, the
/// unknown field then matches nothing downstream).
fn parse_filter_key(key: &str, value: &str) -> Filter {
    if let Some(open) = key.find('[') {
        if let Some(token) = key[open..].strip_prefix('[').and_then(|r| r.strip_suffix(']')) {
            if let Some(op) = FilterOp::from_token(token) {
                return Filter {
                    field: key[..open].to_string(),
                    op,
                    value: value.to_string(),
                };
            }
        }
    }
    Filter {
        field: key.to_string(),
        op: FilterOp::Eq,
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_when_empty() {
        let p = ListParams::parse(&raw(&[]));
        assert_eq!(p.page, 1);
        assert_eq!(p.limit, 25);
        assert!(p.filters.is_empty());
        assert!(p.search.is_none());
        assert!(p.select.is_none());
        assert_eq!(p.sort.len(), 1);
        assert_eq!(p.sort[0].field, "createdAt");
        assert!(p.sort[0].descending);
    }

    #[test]
    fn reserved_keys_are_not_filters() {
        let p = ListParams::parse(&raw(&[
            ("page", "2"),
            ("limit", "10"),
            ("sort", "price"),
            ("select", "title,price"),
            ("search", "rust"),
            ("category", "dev"),
        ]));
        assert_eq!(p.filters.len(), 1);
        assert_eq!(p.filters[0].field, "category");
        assert_eq!(p.page, 2);
        assert_eq!(p.limit, 10);
        assert_eq!(p.search.as_deref(), Some("rust"));
        assert_eq!(p.select.as_deref(), Some(&["title".to_string(), "price".to_string()][..]));
    }

    #[test]
    fn operator_suffix_parses() {
        let p = ListParams::parse(&raw(&[("price[gte]", "100"), ("price[lt]", "500")]));
        assert_eq!(p.filters.len(), 2);
        assert!(p
            .filters
            .iter()
            .all(|f| f.field == "price"));
        assert!(p.filters.iter().any(|f| f.op == FilterOp::Gte && f.value == "100"));
        assert!(p.filters.iter().any(|f| f.op == FilterOp::Lt && f.value == "500"));
    }

    #[test]
    fn in_operator_parses() {
        let p = ListParams::parse(&raw(&[("category[in]", "dev,design")]));
        assert_eq!(p.filters[0].op, FilterOp::In);
        assert_eq!(p.filters[0].value, "dev,design");
    }

    #[test]
    fn unknown_operator_fails_open_as_literal_field() {
        let p = ListParams::parse(&raw(&[("price[almost]", "100")]));
        assert_eq!(p.filters[0].field, "price[almost]");
        assert_eq!(p.filters[0].op, FilterOp::Eq);
    }

    #[test]
    fn sort_prefix_dash_means_descending() {
        let p = ListParams::parse(&raw(&[("sort", "-price,title")]));
        assert_eq!(p.sort.len(), 2);
        assert_eq!(p.sort[0].field, "price");
        assert!(p.sort[0].descending);
        assert_eq!(p.sort[1].field, "title");
        assert!(!p.sort[1].descending);
    }

    #[test]
    fn malformed_page_and_limit_fall_back_to_defaults() {
        let p = ListParams::parse(&raw(&[("page", "abc"), ("limit", "-5")]));
        assert_eq!(p.page, 1);
        assert_eq!(p.limit, 25);
    }

    #[test]
    fn oversized_page_and_limit_are_clamped() {
        let p = ListParams::parse(&raw(&[
            ("page", &i64::MAX.to_string()),
            ("limit", "999999999"),
        ]));
        assert_eq!(p.page, MAX_PAGE);
        assert_eq!(p.limit, MAX_LIMIT);
    }

    #[test]
    fn empty_search_is_ignored() {
        let p = ListParams::parse(&raw(&[("search", "  ")]));
        assert!(p.search.is_none());
    }
}
