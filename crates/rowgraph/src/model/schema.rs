use crate::{
    expr::FieldRef,
    model::{field::FieldModel, relation::RelationModel},
};
use indexmap::IndexMap;

///
/// RecordSchema
///
/// Frozen runtime shape of one declared record type. Field insertion order is
/// the canonical column order and the canonical slice width used by hydration.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RecordSchema {
    /// Schema name (registry key, also the default table name).
    pub name: String,
    /// Table name in generated SQL.
    pub table: String,
    /// Ordered columns.
    pub fields: IndexMap<String, FieldModel>,
    /// Whether an `id` primary key was auto-declared.
    pub primary_key: bool,
    /// Multi-column UNIQUE groups.
    pub unique: Vec<Vec<String>>,
    /// Columns named in INSERT ... ON CONFLICT clauses.
    pub on_conflict: Vec<String>,
    /// Whether this schema is a many-to-many link table.
    pub many_to_many: bool,
    /// Consumed by the external change-propagation collaborator only.
    pub propagate: bool,
    /// Forward relations keyed by key-column name.
    pub relations: IndexMap<String, RelationModel>,
    /// Reverse relations keyed by collection-field name.
    pub reverse_relations: IndexMap<String, RelationModel>,
    /// Forward key-column name per peer schema.
    pub relation_by_peer: IndexMap<String, String>,
}

impl RecordSchema {
    /// Number of columns, i.e. the width of this schema's slice in a joined
    /// result row.
    #[must_use]
    pub fn width(&self) -> usize {
        self.fields.len()
    }

    /// Column names in canonical order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldModel> {
        self.fields.get(name)
    }

    /// Reference a column of this schema in an expression.
    #[must_use]
    pub fn col(&self, field: &str) -> FieldRef {
        FieldRef {
            schema: self.name.clone(),
            field: field.to_string(),
        }
    }

    /// Forward relation whose key column points at `peer`, if any.
    #[must_use]
    pub fn relation_to(&self, peer: &str) -> Option<&RelationModel> {
        let field = self.relation_by_peer.get(peer)?;
        self.relations.get(field)
    }

    /// The two link key columns of a many-to-many schema, in declared order.
    ///
    /// Registry validation guarantees exactly two for `many_to_many` schemas.
    #[must_use]
    pub fn link_fields(&self) -> Option<(&FieldModel, &FieldModel)> {
        if !self.many_to_many {
            return None;
        }
        let mut links = self.fields.values().filter(|f| f.is_foreign_key());
        match (links.next(), links.next()) {
            (Some(a), Some(b)) => Some((a, b)),
            _ => None,
        }
    }

    /// Position of the link column keyed to `peer`, used to canonicalize
    /// many-to-many operand order.
    #[must_use]
    pub fn link_position(&self, peer: &str) -> Option<usize> {
        let field = self.relation_by_peer.get(peer)?;
        self.fields.get_index_of(field)
    }
}
