//! Runtime schema model.
//!
//! This module holds the *runtime representations* of declared record types:
//! fields, relations, schemas, and the registry that owns them. Declarations
//! (`decl`) define what exists; the registry validates them once and freezes
//! the result, which query compilation and hydration then treat as read-only.

pub mod decl;
pub mod field;
pub mod registry;
pub mod relation;
pub mod schema;

pub use decl::{FieldDecl, FieldDeclKind, SchemaDecl};
pub use field::{FieldKind, FieldModel};
pub use registry::{ConfigError, SchemaRegistry};
pub use relation::{RelationKind, RelationModel};
pub use schema::RecordSchema;
