use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid pattern '{source_pattern}': {error}")]
    InvalidPattern {
        source_pattern: String,
        #[source]
        error: regex::Error,
    },

    #[error("Alias '{0}' is already bound to a different value")]
    AliasConflict(String),

    #[error("Session has been disposed")]
    SessionDisposed,

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Failure of a single pattern evaluation.
#[derive(Error, Debug)]
pub enum PatternError {
    #[error("Pattern '{pattern}' exceeded its {limit:?} evaluation budget")]
    Timeout { pattern: String, limit: Duration },

    #[error(transparent)]
    Compile(#[from] Error),
}
