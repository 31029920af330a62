use crate::{model::RecordSchema, value::Value};
use indexmap::IndexMap;
use std::{cell::RefCell, fmt, rc::Rc};
use thiserror::Error as ThisError;

///
/// RecordError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum RecordError {
    #[error("unknown field '{field}' on record '{schema}'")]
    UnknownField { schema: String, field: String },

    #[error("'{field}' on record '{schema}' is not a declared relation")]
    NotARelation { schema: String, field: String },

    #[error("related '{schema}' record carries no primary-key value")]
    MissingPeerKey { schema: String },
}

/// Shared handle to a hydrated record. Parents and children reference the
/// same allocation, so a record edited through one edge is edited everywhere.
pub type SharedRecord = Rc<RefCell<Record>>;

///
/// Record
///
/// One materialized row plus the relation edges wired onto it. Values stay in
/// canonical column order; single-valued edges hold parents, collections hold
/// children and many-to-many peers.
///

#[derive(Clone, Debug)]
pub struct Record {
    pub schema: Rc<RecordSchema>,
    pub values: IndexMap<String, Value>,
    pub related_one: IndexMap<String, SharedRecord>,
    pub related_many: IndexMap<String, Vec<SharedRecord>>,
}

impl Record {
    #[must_use]
    pub fn new(schema: Rc<RecordSchema>) -> Self {
        Self {
            schema,
            values: IndexMap::new(),
            related_one: IndexMap::new(),
            related_many: IndexMap::new(),
        }
    }

    /// Build a record from one fixed-width row slice, zipping values with the
    /// schema's canonical column order.
    #[must_use]
    pub fn from_row(schema: Rc<RecordSchema>, row: &[Value]) -> Self {
        let values = schema
            .field_names()
            .zip(row.iter().cloned())
            .map(|(name, value)| (name.to_string(), value))
            .collect();
        Self {
            schema,
            values,
            related_one: IndexMap::new(),
            related_many: IndexMap::new(),
        }
    }

    #[must_use]
    pub fn shared(self) -> SharedRecord {
        Rc::new(RefCell::new(self))
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    /// Primary-key value, if the schema declares one and it is populated.
    #[must_use]
    pub fn id(&self) -> Option<&Value> {
        self.values.get("id").filter(|v| !v.is_null())
    }

    pub fn set(&mut self, field: &str, value: impl Into<Value>) -> Result<(), RecordError> {
        if self.schema.field(field).is_none() {
            return Err(RecordError::UnknownField {
                schema: self.schema.name.clone(),
                field: field.to_string(),
            });
        }
        self.values.insert(field.to_string(), value.into());
        Ok(())
    }

    /// Point a foreign-key field at `other`: the peer's primary key lands in
    /// the key column and the record itself on the single-valued edge.
    pub fn set_related(&mut self, field: &str, other: &SharedRecord) -> Result<(), RecordError> {
        if !self.schema.relations.contains_key(field) {
            return Err(RecordError::NotARelation {
                schema: self.schema.name.clone(),
                field: field.to_string(),
            });
        }
        let id = {
            let peer = other.borrow();
            peer.id().cloned().ok_or_else(|| RecordError::MissingPeerKey {
                schema: peer.schema.name.clone(),
            })?
        };
        self.values.insert(field.to_string(), id);
        self.related_one.insert(field.to_string(), Rc::clone(other));
        Ok(())
    }

    /// Attach `other` to the named collection edge, used while wiring
    /// hydrated rows.
    pub fn push_related(&mut self, name: &str, other: &SharedRecord) {
        self.related_many
            .entry(name.to_string())
            .or_default()
            .push(Rc::clone(other));
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}", self.schema.name)?;
        for (name, value) in &self.values {
            write!(f, " {name}={value}")?;
        }
        write!(f, ">")
    }
}
