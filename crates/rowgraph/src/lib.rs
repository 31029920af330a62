//! Schema-driven query core: a registry of record schemas, an expression
//! and statement compiler, fluent query builders, and the hydrator that
//! rebuilds object graphs from joined row sets. Execution goes through the
//! `DataStore` seam; no driver lives in this crate.
#![warn(unreachable_pub)]

pub mod db;
pub mod error;
pub mod expr;
pub mod hydrate;
pub mod model;
pub mod query;
pub mod record;
pub mod sql;
pub mod store;
pub mod value;

// test
#[cfg(test)]
pub(crate) mod test_support;

///
/// Prelude
///
/// Domain vocabulary only: declarations, expressions, the handle, and the
/// record types most call sites touch.
///

pub mod prelude {
    pub use crate::{
        db::Db,
        error::Error,
        expr::{
            and_, between, eq, gt, gte, ilike, in_, is_not_null, is_null, like, lt, lte, ne,
            not_in, or_, FieldRef,
        },
        model::{FieldDecl, SchemaDecl, SchemaRegistry},
        query::{Filter, Join, JoinKind, OnClause},
        record::{Record, SharedRecord},
        sql::Dialect,
        store::DataStore,
        value::Value,
    };
}
