use std::fmt::{self, Display};

///
/// RelationKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RelationKind {
    /// This schema holds the key column pointing at the peer.
    ForeignKey,
    /// Auto-created reverse of a foreign key; a collection, not a column.
    Reference,
    /// Reverse entry created on both peers of a many-to-many link table.
    ManyToManyLink,
}

impl Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::ForeignKey => "foreign_key",
            Self::Reference => "reference",
            Self::ManyToManyLink => "many_to_many",
        };
        write!(f, "{label}")
    }
}

///
/// RelationModel
///
/// One declared link between two schemas. A foreign key and its auto-created
/// reverse `Reference` are registered together and stay mutually consistent:
/// `field` on one side is `reverse_field` on the other.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RelationModel {
    pub kind: RelationKind,
    /// Owning schema name.
    pub schema: String,
    /// Peer schema name.
    pub peer: String,
    /// Field name on the owning schema (key column, or collection name for
    /// reverse entries).
    pub field: String,
    /// Field name on the peer side.
    pub reverse_field: String,
    /// Link-table schema for `ManyToManyLink` entries.
    pub via: Option<String>,
}
