//! Generic list-query engine shared by the list endpoints: field filters with
//! comparison operators, text search, projection, sorting and pagination over
//! a declared collection.

pub mod collection;
pub mod pagination;
pub mod params;

use std::collections::HashSet;

use serde::Serialize;
use serde_json::Value;
use sqlx::{postgres::PgRow, PgPool, Postgres, QueryBuilder};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use uuid::Uuid;

use crate::error::ApiError;
use crate::response::ListEnvelope;
use collection::{Collection, FieldType};
use pagination::Pagination;
use params::{Filter, FilterOp, ListParams, SortKey};

pub struct ListResult {
    pub items: Vec<Value>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub pagination: Pagination,
}

impl ListResult {
    pub fn into_envelope(self) -> ListEnvelope {
        ListEnvelope {
            success: true,
            count: self.items.len(),
            total: self.total,
            pagination: self.pagination,
            data: self.items,
        }
    }
}

/// A filter value parsed into the native type of its target column.
#[derive(Debug, Clone, PartialEq)]
enum BindValue {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Ts(OffsetDateTime),
    Id(Uuid),
    TextList(Vec<String>),
    IntList(Vec<i64>),
    FloatList(Vec<f64>),
    IdList(Vec<Uuid>),
}

#[derive(Debug)]
struct Predicate {
    column: &'static str,
    op: FilterOp,
    value: BindValue,
}

/// Compiles raw filters against the collection. `None` means the query cannot
/// match anything (unknown field or a value that does not parse as the
/// column's type); listing endpoints degrade to an empty page instead of
/// failing.
fn compile_filters(col: &Collection, filters: &[Filter]) -> Option<Vec<Predicate>> {
    let mut out = Vec::with_capacity(filters.len());
    for f in filters {
        let field = col.field(&f.field)?;
        let value = parse_bind(field.ty, f.op, &f.value)?;
        out.push(Predicate {
            column: field.column,
            op: f.op,
            value,
        });
    }
    Some(out)
}

fn parse_bind(ty: FieldType, op: FilterOp, raw: &str) -> Option<BindValue> {
    if op == FilterOp::In {
        let parts: Vec<&str> = raw.split(',').map(str::trim).filter(|s| !s.is_empty()).collect();
        if parts.is_empty() {
            return None;
        }
        return match ty {
            FieldType::Text => Some(BindValue::TextList(
                parts.into_iter().map(str::to_string).collect(),
            )),
            FieldType::Int => parts
                .into_iter()
                .map(|p| p.parse::<i64>().ok())
                .collect::<Option<Vec<_>>>()
                .map(BindValue::IntList),
            FieldType::Float => parts
                .into_iter()
                .map(|p| p.parse::<f64>().ok())
                .collect::<Option<Vec<_>>>()
                .map(BindValue::FloatList),
            FieldType::Uuid => parts
                .into_iter()
                .map(|p| p.parse::<Uuid>().ok())
                .collect::<Option<Vec<_>>>()
                .map(BindValue::IdList),
            // Membership tests over bools/timestamps are not meaningful.
            FieldType::Bool | FieldType::Timestamp => None,
        };
    }
    match ty {
        FieldType::Text => Some(BindValue::Text(raw.to_string())),
        FieldType::Int => raw.parse::<i64>().ok().map(BindValue::Int),
        FieldType::Float => raw.parse::<f64>().ok().map(BindValue::Float),
        FieldType::Bool => raw.parse::<bool>().ok().map(BindValue::Bool),
        FieldType::Timestamp => OffsetDateTime::parse(raw, &Rfc3339).ok().map(BindValue::Ts),
        FieldType::Uuid => raw.parse::<Uuid>().ok().map(BindValue::Id),
    }
}

/// Sort keys resolved to real columns; unknown fields are dropped, and an
/// empty result falls back to newest-first.
fn resolve_sort(col: &Collection, keys: &[SortKey]) -> Vec<(&'static str, bool)> {
    let mut out: Vec<(&'static str, bool)> = keys
        .iter()
        .filter_map(|k| col.field(&k.field).map(|f| (f.column, k.descending)))
        .collect();
    if out.is_empty() {
        out.push(("created_at", true));
    }
    out
}

/// LIKE wildcards in a search term are data, not pattern syntax.
fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn push_where(
    qb: &mut QueryBuilder<'_, Postgres>,
    col: &Collection,
    predicates: &[Predicate],
    search: Option<&str>,
) {
    qb.push(" WHERE ");
    match col.base_filter {
        Some(base) => qb.push(base),
        None => qb.push("TRUE"),
    };

    // Search replaces field filters entirely; combining them is deliberately
    // not supported (matches the original behavior).
    if let Some(term) = search {
        let columns: Vec<&'static str> = col
            .search_fields
            .iter()
            .filter_map(|name| col.field(name).map(|f| f.column))
            .collect();
        if columns.is_empty() {
            return;
        }
        let pattern = format!("%{}%", escape_like(term));
        qb.push(" AND (");
        for (i, column) in columns.iter().enumerate() {
            if i > 0 {
                qb.push(" OR ");
            }
            qb.push(*column);
            qb.push(" ILIKE ");
            qb.push_bind(pattern.clone());
        }
        qb.push(")");
        return;
    }

    for p in predicates {
        qb.push(" AND ");
        qb.push(p.column);
        match &p.value {
            BindValue::TextList(v) => {
                qb.push(" = ANY(");
                qb.push_bind(v.clone());
                qb.push(")");
            }
            BindValue::IntList(v) => {
                qb.push(" = ANY(");
                qb.push_bind(v.clone());
                qb.push(")");
            }
            BindValue::FloatList(v) => {
                qb.push(" = ANY(");
                qb.push_bind(v.clone());
                qb.push(")");
            }
            BindValue::IdList(v) => {
                qb.push(" = ANY(");
                qb.push_bind(v.clone());
                qb.push(")");
            }
            scalar => {
                qb.push(" ");
                qb.push(p.op.sql());
                qb.push(" ");
                match scalar {
                    BindValue::Text(v) => qb.push_bind(v.clone()),
                    BindValue::Int(v) => qb.push_bind(*v),
                    BindValue::Float(v) => qb.push_bind(*v),
                    BindValue::Bool(v) => qb.push_bind(*v),
                    BindValue::Ts(v) => qb.push_bind(*v),
                    BindValue::Id(v) => qb.push_bind(*v),
                    _ => unreachable!("list values handled above"),
                };
            }
        }
    }
}

/// Runs the full pipeline against one collection and returns projected rows
/// plus pagination metadata. The total is counted over the same predicate as
/// the page itself.
pub async fn run_list<E>(
    db: &PgPool,
    col: &Collection,
    raw: &std::collections::HashMap<String, String>,
) -> Result<ListResult, ApiError>
where
    E: for<'r> sqlx::FromRow<'r, PgRow> + Serialize + Send + Unpin,
{
    let params = ListParams::parse(raw);

    let empty = |params: &ListParams| ListResult {
        items: Vec::new(),
        total: 0,
        page: params.page,
        limit: params.limit,
        pagination: pagination::build(params.page, params.limit, 0),
    };

    let predicates = match compile_filters(col, &params.filters) {
        Some(p) => p,
        None => return Ok(empty(&params)),
    };
    let search = params.search.as_deref();

    let mut count_qb =
        QueryBuilder::<Postgres>::new(format!("SELECT COUNT(*) FROM {}", col.table));
    push_where(&mut count_qb, col, &predicates, search);
    let total: i64 = count_qb.build_query_scalar().fetch_one(db).await?;

    let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT * FROM {}", col.table));
    push_where(&mut qb, col, &predicates, search);
    qb.push(" ORDER BY ");
    for (i, (column, descending)) in resolve_sort(col, &params.sort).iter().enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        qb.push(*column);
        qb.push(if *descending { " DESC" } else { " ASC" });
    }
    qb.push(" LIMIT ");
    qb.push_bind(params.limit);
    qb.push(" OFFSET ");
    qb.push_bind(params.page.saturating_sub(1).saturating_mul(params.limit));

    let rows: Vec<E> = qb.build_query_as().fetch_all(db).await?;

    let mut items = Vec::with_capacity(rows.len());
    for row in &rows {
        items.push(serde_json::to_value(row).map_err(anyhow::Error::from)?);
    }
    if let Some(select) = &params.select {
        project(&mut items, select);
    }

    Ok(ListResult {
        pagination: pagination::build(params.page, params.limit, total),
        total,
        page: params.page,
        limit: params.limit,
        items,
    })
}

/// Keeps only the selected keys on each row; the id always survives.
fn project(items: &mut [Value], select: &[String]) {
    let mut keep: HashSet<&str> = select.iter().map(String::as_str).collect();
    keep.insert("id");
    for item in items {
        if let Value::Object(map) = item {
            map.retain(|k, _| keep.contains(k.as_str()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use collection::Field;
    use serde_json::json;

    static TEST_FIELDS: &[Field] = &[
        Field {
            name: "title",
            column: "title",
            ty: FieldType::Text,
        },
        Field {
            name: "price",
            column: "price",
            ty: FieldType::Float,
        },
        Field {
            name: "totalStudentsEnrolled",
            column: "total_students_enrolled",
            ty: FieldType::Int,
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
    ];

    static TEST_COLLECTION: Collection = Collection {
        table: "courses",
        fields: TEST_FIELDS,
        search_fields: &["title"],
        base_filter: Some("is_deleted = FALSE"),
    };

    fn filter(field: &str, op: FilterOp, value: &str) -> Filter {
        Filter {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    #[test]
    fn compile_maps_api_names_to_columns() {
        let preds = compile_filters(
            &TEST_COLLECTION,
            &[filter("totalStudentsEnrolled", FilterOp::Gte, "10")],
        )
        .unwrap();
        assert_eq!(preds.len(), 1);
        assert_eq!(preds[0].column, "total_students_enrolled");
        assert_eq!(preds[0].value, BindValue::Int(10));
    }

    #[test]
    fn unknown_field_is_unsatisfiable() {
        assert!(compile_filters(&TEST_COLLECTION, &[filter("nope", FilterOp::Eq, "1")]).is_none());
    }

    #[test]
    fn malformed_value_is_unsatisfiable() {
        assert!(
            compile_filters(&TEST_COLLECTION, &[filter("price", FilterOp::Gt, "cheap")]).is_none()
        );
    }

    #[test]
    fn in_operator_splits_lists() {
        let preds = compile_filters(
            &TEST_COLLECTION,
            &[filter("title", FilterOp::In, "a, b,c")],
        )
        .unwrap();
        assert_eq!(
            preds[0].value,
            BindValue::TextList(vec!["a".into(), "b".into(), "c".into()])
        );
    }

    #[test]
    fn bool_membership_is_rejected() {
        assert!(
            compile_filters(&TEST_COLLECTION, &[filter("isActive", FilterOp::In, "true")]).is_none()
        );
    }

    #[test]
    fn timestamp_values_parse_rfc3339() {
        let preds = compile_filters(
            &TEST_COLLECTION,
            &[filter("createdAt", FilterOp::Gte, "2024-01-01T00:00:00Z")],
        )
        .unwrap();
        assert!(matches!(preds[0].value, BindValue::Ts(_)));
    }

    #[test]
    fn sort_resolution_drops_unknown_and_defaults() {
        let keys = vec![
            SortKey {
                field: "bogus".into(),
                descending: false,
            },
            SortKey {
                field: "price".into(),
                descending: true,
            },
        ];
        assert_eq!(resolve_sort(&TEST_COLLECTION, &keys), vec![("price", true)]);
        assert_eq!(
            resolve_sort(
                &TEST_COLLECTION,
                &[SortKey {
                    field: "bogus".into(),
                    descending: false
                }]
            ),
            vec![("created_at", true)]
        );
    }

    #[test]
    fn where_clause_uses_search_instead_of_filters() {
        let preds = compile_filters(
            &TEST_COLLECTION,
            &[filter("price", FilterOp::Gt, "10")],
        )
        .unwrap();
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM courses");
        push_where(&mut qb, &TEST_COLLECTION, &preds, Some("rust"));
        let sql = qb.sql();
        assert!(sql.contains("ILIKE"));
        assert!(!sql.contains("price"));
    }

    #[test]
    fn search_terms_escape_like_wildcards() {
        assert_eq!(escape_like("50%_off"), "50\\%\\_off");
        assert_eq!(escape_like("back\\slash"), "back\\\\slash");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn search_without_search_fields_adds_no_predicate() {
        static NO_SEARCH: Collection = Collection {
            table: "contacts",
            fields: TEST_FIELDS,
            search_fields: &[],
            base_filter: None,
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM contacts");
        push_where(&mut qb, &NO_SEARCH, &[], Some("rust"));
        assert_eq!(qb.sql(), "SELECT * FROM contacts WHERE TRUE");
    }

    #[test]
    fn where_clause_includes_base_filter_and_predicates() {
        let preds = compile_filters(
            &TEST_COLLECTION,
            &[filter("price", FilterOp::Lte, "99.5")],
        )
        .unwrap();
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM courses");
        push_where(&mut qb, &TEST_COLLECTION, &preds, None);
        let sql = qb.sql();
        assert!(sql.contains("is_deleted = FALSE"));
        assert!(sql.contains("price <= "));
    }

    #[test]
    fn projection_keeps_id() {
        let mut items = vec![json!({ "id": "1", "title": "t", "price": 5.0 })];
        project(&mut items, &["title".to_string()]);
        assert_eq!(items[0], json!({ "id": "1", "title": "t" }));
    }
}
