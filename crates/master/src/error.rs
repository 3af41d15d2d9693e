//! Master error types.

use thiserror::Error;

use flotilla_core::error::CoreError;

/// Errors surfaced to callers of the master handle.
#[derive(Debug, Error)]
pub enum MasterError {
    #[error("master is stopped")]
    Stopped,

    #[error("unknown node: {0}")]
    UnknownNode(String),

    #[error("invalid node table: {0}")]
    InvalidConfig(#[from] CoreError),
}

pub type MasterResult<T> = Result<T, MasterError>;
