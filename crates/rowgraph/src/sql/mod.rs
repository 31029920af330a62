//! SQL compilation.
//!
//! Pure functions from query specifications and registry metadata to
//! `Statement` values (text plus ordered bound parameters). Nothing here
//! performs I/O; execution errors belong to the store layer.

pub mod ddl;
pub mod dml;
pub mod filter;
pub mod select;

use crate::{expr::CompareOp, model::ConfigError, value::Value};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

///
/// Dialect
///
/// Identifier quoting, parameter placeholders, and column type names for the
/// supported relational dialects.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum Dialect {
    #[default]
    Postgres,
    /// Quoting, placeholders, and column types only. Key-returning
    /// statements still render `RETURNING id`, which MySQL does not
    /// support; use schemas without a primary key, or Postgres, for the
    /// returning paths.
    MySql,
}

impl Dialect {
    #[must_use]
    pub fn quote(self, ident: &str) -> String {
        match self {
            Self::Postgres => format!("\"{ident}\""),
            Self::MySql => format!("`{ident}`"),
        }
    }

    /// Qualified `table.column` reference.
    #[must_use]
    pub fn column(self, table: &str, column: &str) -> String {
        format!("{}.{}", self.quote(table), self.quote(column))
    }

    /// Placeholder for the `n`th bound parameter (1-based).
    #[must_use]
    pub fn placeholder(self, n: usize) -> String {
        match self {
            Self::Postgres => format!("${n}"),
            Self::MySql => "?".to_string(),
        }
    }
}

///
/// Statement
///
/// Compiled statement text plus its bound parameters, in placeholder order.
/// Literal values never appear in the text.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Statement {
    pub text: String,
    pub params: Vec<Value>,
}

impl Statement {
    #[must_use]
    pub const fn new(text: String, params: Vec<Value>) -> Self {
        Self { text, params }
    }
}

///
/// CompileError
/// Fatal at compile time; surfaced before any I/O is attempted.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum CompileError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("no relation between '{src}' and '{dest}' and no explicit on-clause")]
    NoRelation { src: String, dest: String },

    #[error("IN list for field '{field}' is empty")]
    EmptyInList { field: String },

    #[error("operator {op} does not accept the supplied operand")]
    OperandMismatch { op: CompareOp },

    #[error("delete-returning queries cannot carry joins")]
    DeleteWithJoins,

    #[error("raw and expression filters cannot be combined on one query")]
    MixedFilters,

    #[error("no values supplied for '{schema}'")]
    EmptyValues { schema: String },
}

/// Accumulates bound parameters and hands out their placeholders.
pub(crate) struct ParamSink {
    dialect: Dialect,
    params: Vec<Value>,
}

impl ParamSink {
    pub(crate) const fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            params: Vec::new(),
        }
    }

    /// Bind a value and return its placeholder.
    pub(crate) fn bind(&mut self, value: Value) -> String {
        self.params.push(value);
        self.dialect.placeholder(self.params.len())
    }

    pub(crate) fn into_params(self) -> Vec<Value> {
        self.params
    }
}
