use crate::{
    hydrate::HydrateError, model::ConfigError, record::RecordError, sql::CompileError,
    store::ExecuteError,
};
use thiserror::Error as ThisError;

///
/// Error
///
/// Aggregates every layer's error. Configuration and compile errors surface
/// before any I/O; execute errors carry the statement that failed.
///

#[derive(Clone, Debug, ThisError)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Record(#[from] RecordError),

    #[error(transparent)]
    Hydrate(#[from] HydrateError),

    #[error(transparent)]
    Execute(#[from] ExecuteError),
}
