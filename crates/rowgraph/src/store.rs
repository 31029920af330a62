use crate::{sql::Statement, value::Value};
use async_trait::async_trait;
use thiserror::Error as ThisError;

///
/// StoreFailure
///
/// Opaque backend failure. The driver owns the detail; this layer only
/// carries its message upward.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("{message}")]
pub struct StoreFailure {
    pub message: String,
}

impl StoreFailure {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

///
/// ExecuteError
///
/// A store failure tied to the statement that provoked it.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("statement failed: {cause} ({statement})")]
pub struct ExecuteError {
    pub statement: String,
    pub cause: StoreFailure,
}

///
/// DataStore
///
/// Driver seam. Implementations hold the connection and speak the wire
/// protocol; everything above hands them compiled statements and consumes
/// plain rows back.
///

#[async_trait]
pub trait DataStore: Send + Sync {
    /// Run a row-returning statement.
    async fn run_query(&self, statement: &Statement) -> Result<Vec<Vec<Value>>, StoreFailure>;

    /// Run a statement for effect, returning any values the statement
    /// declares it returns (one per affected row).
    async fn run_operation(&self, statement: &Statement) -> Result<Vec<Value>, StoreFailure>;
}
