//! Shared error taxonomy for adapters and translators.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by adapter operations.
///
/// Recoverable degradations (an unknown vendor state code, a malformed
/// array-id spec) are handled locally by the translators and never reach
/// this type.
#[derive(Error, Debug)]
pub enum Error {
    /// A required primitive was left unimplemented by the backend.
    #[error("adapter does not implement `{0}`")]
    NotImplemented(&'static str),

    /// The backend command or API call failed. Carries the backend's own
    /// diagnostic text verbatim.
    #[error("{0}")]
    Backend(String),

    /// Backend output no longer matches the shape its translator expects.
    #[error("unexpected scheduler output: {0}")]
    UnexpectedFormat(String),

    /// A status was constructed from a token outside the canonical set.
    #[error("unknown job state `{0}`")]
    UnknownState(String),
}
