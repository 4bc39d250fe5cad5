/// Static description of a listable collection: which API field names exist,
/// which columns they map to, how values are typed for binding, and which
/// fields participate in text search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Text,
    Int,
    Float,
    Bool,
    Timestamp,
    Uuid,
}

pub struct Field {
    pub name: &'static str,
    pub column: &'static str,
    pub ty: FieldType,
}

pub struct Collection {
    pub table: &'static str,
    pub fields: &'static [Field],
    /// API names of the fields ORed together for `search`.
    pub search_fields: &'static [&'static str],
    /// Predicate applied to every query (e.g. hiding soft-deleted rows).
    pub base_filter: Option<&'static str>,
}

impl Collection {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}
