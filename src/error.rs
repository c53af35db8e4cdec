//! Error types for splitest
//!
//! Nothing in this crate is fatal to the host process: significance
//! preconditions surface as descriptive validation failures, and registry
//! save failures are logged and swallowed by the registry itself.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Splitest error types
#[derive(Error, Debug)]
pub enum Error {
    /// A precondition was violated (e.g. z-test on an arm with no
    /// participants). The message is suitable for inclusion in a
    /// human-readable report.
    #[error("{0}")]
    Validation(String),

    /// The persisted registry could not be read or written.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Registry (de)serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
