///
/// FieldModel
/// Runtime field metadata used by compilation and hydration.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FieldModel {
    /// Column name as used in statements and value maps.
    pub name: String,
    /// Column type shape.
    pub kind: FieldKind,
    /// Columns are nullable unless declared otherwise.
    pub nullable: bool,
    /// Single-column UNIQUE constraint.
    pub unique: bool,
    /// Value must pass through the sensitive-value transform before binding.
    pub sensitive: bool,
}

impl FieldModel {
    /// Whether this field is a stored foreign-key column.
    #[must_use]
    pub const fn is_foreign_key(&self) -> bool {
        matches!(self.kind, FieldKind::ForeignKey { .. })
    }
}

///
/// FieldKind
///
/// Logical column types. Reverse-relation collections are not columns and
/// therefore have no kind here; they live in `RelationModel`.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FieldKind {
    Bool,
    Char { max_length: u32 },
    Int,
    Float,
    Date,
    Json,
    PrimaryKey,
    ForeignKey {
        /// Peer schema name.
        peer: String,
        /// Referenced column on the peer.
        references: String,
        on_delete_cascade: bool,
        on_update_cascade: bool,
    },
}
