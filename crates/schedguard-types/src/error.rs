//! Error types for wire encoding/decoding.

use thiserror::Error;

/// Errors produced while encoding or decoding a [`crate::StatusMessage`].
#[derive(Error, Debug)]
pub enum TypesError {
    /// The payload was not valid JSON, or was valid JSON but not a status
    /// message. Callers on the subscriber side must drop the message and
    /// keep consuming, never treat this as fatal.
    #[error("malformed status message: {0}")]
    Malformed(#[from] serde_json::Error),
}
