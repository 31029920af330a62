use crate::model::{
    decl::{FieldDecl, FieldDeclKind, SchemaDecl},
    field::{FieldKind, FieldModel},
    relation::{RelationKind, RelationModel},
    schema::RecordSchema,
};
use indexmap::IndexMap;
use thiserror::Error as ThisError;

///
/// ConfigError
///
/// Declaration- and build-time errors. All are fatal and surface before any
/// I/O is attempted; none leaves the registry partially mutated.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum ConfigError {
    #[error("schema '{schema}' is already declared")]
    DuplicateSchema { schema: String },

    #[error("unknown schema '{schema}'")]
    UnknownSchema { schema: String },

    #[error("unknown field '{field}' on schema '{schema}'")]
    UnknownField { schema: String, field: String },

    #[error("foreign key '{field}' on schema '{schema}' names undeclared peer '{peer}'")]
    UnknownPeer {
        schema: String,
        field: String,
        peer: String,
    },

    #[error("foreign key on schema '{schema}' references missing column '{column}' of '{peer}'")]
    MissingReferencedColumn {
        schema: String,
        peer: String,
        column: String,
    },

    #[error("reverse relation '{name}' collides with an existing field or relation on '{peer}'")]
    ReverseNameCollision { peer: String, name: String },

    #[error("many-to-many schema '{schema}' must declare exactly 2 link fields, found {found}")]
    LinkArity { schema: String, found: usize },

    #[error("schema '{schema}' has no primary key")]
    NoPrimaryKey { schema: String },

    #[error("update on schema '{schema}' requires a primary-key value")]
    MissingPrimaryKeyValue { schema: String },

    #[error("schema '{schema}' is not a many-to-many link table")]
    NotManyToMany { schema: String },

    #[error("'{value}' is not linked by many-to-many schema '{schema}'")]
    NotLinked { schema: String, value: String },
}

/// Reverse-relation write staged against an already-declared peer schema.
struct ReverseEntry {
    peer: String,
    name: String,
    relation: RelationModel,
}

///
/// SchemaRegistry
///
/// Owns every declared `RecordSchema`. Built once at startup; query
/// execution treats it as read-only.
///

#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: IndexMap<String, RecordSchema>,
}

impl SchemaRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RecordSchema> {
        self.schemas.get(name)
    }

    pub fn require(&self, name: &str) -> Result<&RecordSchema, ConfigError> {
        self.schemas.get(name).ok_or_else(|| ConfigError::UnknownSchema {
            schema: name.to_string(),
        })
    }

    pub fn schemas(&self) -> impl Iterator<Item = &RecordSchema> {
        self.schemas.values()
    }

    /// Resolve the foreign-key relation behind `field` on `schema`.
    pub fn resolve_relation(&self, schema: &str, field: &str) -> Result<&RelationModel, ConfigError> {
        self.require(schema)?
            .relations
            .get(field)
            .ok_or_else(|| ConfigError::UnknownField {
                schema: schema.to_string(),
                field: field.to_string(),
            })
    }

    /// Declare a record type and freeze its runtime schema.
    ///
    /// Duplicate field names warn and drop the later declaration; callers may
    /// rely on declaration order, so this stays an observable no-op rather
    /// than an error. Everything cross-schema (reverse relations) is staged
    /// and applied only after the whole declaration validates.
    pub fn declare(&mut self, decl: SchemaDecl) -> Result<&RecordSchema, ConfigError> {
        let name = decl.name.to_lowercase();
        let table = decl
            .table
            .as_ref()
            .map_or_else(|| name.clone(), |t| t.to_lowercase());

        if self.schemas.contains_key(&name) {
            return Err(ConfigError::DuplicateSchema { schema: name });
        }

        let primary_key = decl.primary_key && !decl.many_to_many;
        let mut fields: IndexMap<String, FieldModel> = IndexMap::new();

        if primary_key {
            fields.insert(
                "id".to_string(),
                FieldModel {
                    name: "id".to_string(),
                    kind: FieldKind::PrimaryKey,
                    nullable: false,
                    unique: false,
                    sensitive: false,
                },
            );
        }

        for field in &decl.fields {
            if fields.contains_key(&field.name) {
                log::warn!("field {} already in model {}", field.name, table);
                continue;
            }
            let model = self.lower_field(&name, field)?;
            fields.insert(model.name.clone(), model);
        }

        for group in &decl.unique {
            for column in group {
                if !fields.contains_key(column) {
                    return Err(ConfigError::UnknownField {
                        schema: name.clone(),
                        field: column.clone(),
                    });
                }
            }
        }

        let mut schema = RecordSchema {
            name: name.clone(),
            table,
            fields,
            primary_key,
            unique: decl.unique.clone(),
            on_conflict: decl.on_conflict.clone(),
            many_to_many: decl.many_to_many,
            propagate: decl.propagate,
            relations: IndexMap::new(),
            reverse_relations: IndexMap::new(),
            relation_by_peer: IndexMap::new(),
        };

        let staged = if decl.many_to_many {
            self.wire_link_table(&mut schema)?
        } else {
            self.wire_foreign_keys(&mut schema, &decl.fields)?
        };

        // Validation is complete; apply atomically.
        for entry in staged {
            let peer = self
                .schemas
                .get_mut(&entry.peer)
                .expect("staged peer was validated");
            peer.reverse_relations.insert(entry.name, entry.relation);
        }
        let (index, _) = self.schemas.insert_full(name, schema);

        Ok(&self.schemas[index])
    }

    fn lower_field(&self, schema: &str, decl: &FieldDecl) -> Result<FieldModel, ConfigError> {
        let kind = match &decl.kind {
            FieldDeclKind::Bool => FieldKind::Bool,
            FieldDeclKind::Char { max_length } => FieldKind::Char {
                max_length: *max_length,
            },
            FieldDeclKind::Int => FieldKind::Int,
            FieldDeclKind::Float => FieldKind::Float,
            FieldDeclKind::Date => FieldKind::Date,
            FieldDeclKind::Json => FieldKind::Json,
            FieldDeclKind::ForeignKey {
                peer,
                references,
                on_delete_cascade,
                on_update_cascade,
                ..
            } => {
                let peer = peer.to_lowercase();
                let peer_schema =
                    self.schemas
                        .get(&peer)
                        .ok_or_else(|| ConfigError::UnknownPeer {
                            schema: schema.to_string(),
                            field: decl.name.clone(),
                            peer: peer.clone(),
                        })?;
                let references = references.clone().unwrap_or_else(|| "id".to_string());
                if !peer_schema.fields.contains_key(&references) {
                    return Err(ConfigError::MissingReferencedColumn {
                        schema: schema.to_string(),
                        peer,
                        column: references,
                    });
                }
                FieldKind::ForeignKey {
                    peer,
                    references,
                    on_delete_cascade: *on_delete_cascade,
                    on_update_cascade: *on_update_cascade,
                }
            }
        };

        Ok(FieldModel {
            name: decl.name.clone(),
            kind,
            nullable: decl.nullable,
            unique: decl.unique,
            sensitive: decl.sensitive,
        })
    }

    /// Wire forward relations and stage the auto-created reverse `Reference`
    /// on each foreign key's peer.
    fn wire_foreign_keys(
        &self,
        schema: &mut RecordSchema,
        decls: &[FieldDecl],
    ) -> Result<Vec<ReverseEntry>, ConfigError> {
        let mut staged = Vec::new();
        let mut seen = std::collections::HashSet::new();

        for decl in decls {
            if !seen.insert(decl.name.clone()) {
                // Dropped duplicate.
                continue;
            }
            let Some(field) = schema.fields.get(&decl.name) else {
                continue;
            };
            let FieldKind::ForeignKey { peer, .. } = &field.kind else {
                continue;
            };
            let reverse = match &decl.kind {
                FieldDeclKind::ForeignKey {
                    reverse: Some(name),
                    ..
                } => name.clone(),
                _ => format!("{}s", schema.name),
            };

            self.check_reverse_slot(peer, &reverse, &staged)?;

            staged.push(ReverseEntry {
                peer: peer.clone(),
                name: reverse.clone(),
                relation: RelationModel {
                    kind: RelationKind::Reference,
                    schema: peer.clone(),
                    peer: schema.name.clone(),
                    field: reverse.clone(),
                    reverse_field: field.name.clone(),
                    via: None,
                },
            });

            let peer = peer.clone();
            schema.relations.insert(
                field.name.clone(),
                RelationModel {
                    kind: RelationKind::ForeignKey,
                    schema: schema.name.clone(),
                    peer: peer.clone(),
                    field: field.name.clone(),
                    reverse_field: reverse,
                    via: None,
                },
            );
            schema.relation_by_peer.insert(peer, field.name.clone());
        }

        Ok(staged)
    }

    /// Wire a many-to-many link table: exactly two foreign-key link fields,
    /// each peer gaining a symmetric collection named after the *other* link
    /// field.
    fn wire_link_table(&self, schema: &mut RecordSchema) -> Result<Vec<ReverseEntry>, ConfigError> {
        let links: Vec<(String, String)> = schema
            .fields
            .values()
            .filter_map(|f| match &f.kind {
                FieldKind::ForeignKey { peer, .. } => Some((f.name.clone(), peer.clone())),
                _ => None,
            })
            .collect();

        if links.len() != 2 {
            return Err(ConfigError::LinkArity {
                schema: schema.name.clone(),
                found: links.len(),
            });
        }

        let mut staged = Vec::new();
        for (own, other) in [(0usize, 1usize), (1, 0)] {
            let (field, peer) = &links[own];
            let (other_field, other_peer) = &links[other];

            self.check_reverse_slot(peer, other_field, &staged)?;

            staged.push(ReverseEntry {
                peer: peer.clone(),
                name: other_field.clone(),
                relation: RelationModel {
                    kind: RelationKind::ManyToManyLink,
                    schema: peer.clone(),
                    peer: other_peer.clone(),
                    field: other_field.clone(),
                    reverse_field: field.clone(),
                    via: Some(schema.name.clone()),
                },
            });

            schema.relations.insert(
                field.clone(),
                RelationModel {
                    kind: RelationKind::ForeignKey,
                    schema: schema.name.clone(),
                    peer: peer.clone(),
                    field: field.clone(),
                    reverse_field: other_field.clone(),
                    via: None,
                },
            );
            schema.relation_by_peer.insert(peer.clone(), field.clone());
        }

        Ok(staged)
    }

    fn check_reverse_slot(
        &self,
        peer: &str,
        name: &str,
        staged: &[ReverseEntry],
    ) -> Result<(), ConfigError> {
        let peer_schema = self.schemas.get(peer).ok_or_else(|| ConfigError::UnknownSchema {
            schema: peer.to_string(),
        })?;

        let taken = peer_schema.fields.contains_key(name)
            || peer_schema.reverse_relations.contains_key(name)
            || staged.iter().any(|e| e.peer == peer && e.name == name);
        if taken {
            return Err(ConfigError::ReverseNameCollision {
                peer: peer.to_string(),
                name: name.to_string(),
            });
        }

        Ok(())
    }
}
