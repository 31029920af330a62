use serde::{Deserialize, Serialize};

///
/// SchemaDecl
///
/// Declaration surface consumed by `SchemaRegistry::declare`. Serde-friendly
/// so embedding applications can load model declarations from configuration.
///

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SchemaDecl {
    /// Schema name; lower-cased for the registry key and default table name.
    pub name: String,
    /// Table name override.
    #[serde(default)]
    pub table: Option<String>,
    /// Auto-declare an `id` primary key. Defaults to true.
    #[serde(default = "default_true")]
    pub primary_key: bool,
    /// Multi-column UNIQUE groups.
    #[serde(default)]
    pub unique: Vec<Vec<String>>,
    /// Columns for INSERT ... ON CONFLICT handling.
    #[serde(default)]
    pub on_conflict: Vec<String>,
    /// Declare this schema as a many-to-many link table (exactly two
    /// foreign-key fields, no primary key).
    #[serde(default)]
    pub many_to_many: bool,
    /// Forwarded to the external change-propagation collaborator.
    #[serde(default)]
    pub propagate: bool,
    /// Ordered field declarations. Declaration order is the column order.
    pub fields: Vec<FieldDecl>,
}

impl SchemaDecl {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            table: None,
            primary_key: true,
            unique: Vec::new(),
            on_conflict: Vec::new(),
            many_to_many: false,
            propagate: false,
            fields: Vec::new(),
        }
    }

    #[must_use]
    pub fn link_table(name: &str) -> Self {
        Self {
            primary_key: false,
            many_to_many: true,
            ..Self::new(name)
        }
    }

    #[must_use]
    pub fn table(mut self, table: &str) -> Self {
        self.table = Some(table.to_string());
        self
    }

    #[must_use]
    pub const fn without_primary_key(mut self) -> Self {
        self.primary_key = false;
        self
    }

    #[must_use]
    pub fn unique_group(mut self, fields: &[&str]) -> Self {
        self.unique
            .push(fields.iter().map(ToString::to_string).collect());
        self
    }

    #[must_use]
    pub fn on_conflict(mut self, fields: &[&str]) -> Self {
        self.on_conflict = fields.iter().map(ToString::to_string).collect();
        self
    }

    #[must_use]
    pub const fn propagate(mut self) -> Self {
        self.propagate = true;
        self
    }

    #[must_use]
    pub fn field(mut self, field: FieldDecl) -> Self {
        self.fields.push(field);
        self
    }
}

///
/// FieldDecl
///

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct FieldDecl {
    pub name: String,
    pub kind: FieldDeclKind,
    #[serde(default = "default_true")]
    pub nullable: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub sensitive: bool,
}

impl FieldDecl {
    #[must_use]
    pub fn new(name: &str, kind: FieldDeclKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            nullable: true,
            unique: false,
            sensitive: false,
        }
    }

    #[must_use]
    pub fn char(name: &str, max_length: u32) -> Self {
        Self::new(name, FieldDeclKind::Char { max_length })
    }

    #[must_use]
    pub fn int(name: &str) -> Self {
        Self::new(name, FieldDeclKind::Int)
    }

    #[must_use]
    pub fn bool(name: &str) -> Self {
        Self::new(name, FieldDeclKind::Bool)
    }

    #[must_use]
    pub fn float(name: &str) -> Self {
        Self::new(name, FieldDeclKind::Float)
    }

    #[must_use]
    pub fn date(name: &str) -> Self {
        Self::new(name, FieldDeclKind::Date)
    }

    #[must_use]
    pub fn json(name: &str) -> Self {
        Self::new(name, FieldDeclKind::Json)
    }

    /// Foreign key to `peer`'s primary key, with the default reverse name
    /// (`"{owner}s"`).
    #[must_use]
    pub fn foreign_key(name: &str, peer: &str) -> Self {
        Self::new(
            name,
            FieldDeclKind::ForeignKey {
                peer: peer.to_string(),
                references: None,
                reverse: None,
                on_delete_cascade: false,
                on_update_cascade: false,
            },
        )
    }

    #[must_use]
    pub const fn required(mut self) -> Self {
        self.nullable = false;
        self
    }

    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    #[must_use]
    pub const fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    /// Override the reverse-collection name of a foreign key. No-op for
    /// other kinds.
    #[must_use]
    pub fn reverse(mut self, reverse_name: &str) -> Self {
        if let FieldDeclKind::ForeignKey { reverse, .. } = &mut self.kind {
            *reverse = Some(reverse_name.to_string());
        }
        self
    }

    #[must_use]
    pub fn on_delete_cascade(mut self) -> Self {
        if let FieldDeclKind::ForeignKey {
            on_delete_cascade, ..
        } = &mut self.kind
        {
            *on_delete_cascade = true;
        }
        self
    }
}

///
/// FieldDeclKind
///

#[derive(Clone, Debug, Deserialize, Serialize)]
pub enum FieldDeclKind {
    Bool,
    Char {
        max_length: u32,
    },
    Int,
    Float,
    Date,
    Json,
    ForeignKey {
        peer: String,
        /// Referenced column on the peer; defaults to its primary key.
        #[serde(default)]
        references: Option<String>,
        /// Reverse-collection name on the peer; defaults to `"{owner}s"`.
        #[serde(default)]
        reverse: Option<String>,
        #[serde(default)]
        on_delete_cascade: bool,
        #[serde(default)]
        on_update_cascade: bool,
    },
}

const fn default_true() -> bool {
    true
}
