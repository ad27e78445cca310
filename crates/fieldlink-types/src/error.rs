use thiserror::Error;

/// Error taxonomy shared by the stores, the HTTP API and the gateway.
///
/// Identity/validation errors are surfaced to the originating caller with a
/// human-readable reason and are never retried. `Persistence` during a send
/// aborts the broadcast for that message only.
#[derive(Debug, Error)]
pub enum ChatError {
    /// A technician with the same name or email already exists.
    #[error("duplicate identity: {0}")]
    DuplicateIdentity(String),

    /// A required field was missing or empty.
    #[error("{0}")]
    Validation(String),

    /// A message must address exactly one of a recipient or a group.
    #[error("message must address exactly one of a recipient or a group")]
    InvalidAddressing,

    /// The caller is not allowed to perform the operation.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The store was unavailable or a write failed.
    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl ChatError {
    /// Wrap any store-level failure (SQL, lock, task join) as `Persistence`.
    pub fn persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}
