//! Error types for the shared store client.

use thiserror::Error;

/// Store errors. Only [`StoreError::Unavailable`] is recoverable — it is
/// what the coordinator's connection-failure path watches for. Everything
/// else is a programming or schema error and propagates as fatal.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The connection could not be established, or an in-flight statement
    /// failed for transport reasons (lost connection, timeout). The
    /// coordinator treats this as a transient fault.
    #[error("store unavailable: {0}")]
    Unavailable(#[source] sqlx::Error),

    /// A statement failed for a reason that is not a transport fault
    /// (schema mismatch, constraint violation, type error). Fatal.
    #[error("store query failed: {0}")]
    Query(#[source] sqlx::Error),

    /// An operation was attempted before `connect` or after `disconnect`.
    #[error("store client is not connected")]
    NotConnected,
}

impl StoreError {
    /// Classifies a raw `sqlx::Error` using the same transport-vs-fatal
    /// split the coordinator relies on (spec §4.1: "`Unavailable` is
    /// raised when the connection cannot be established or an in-flight
    /// statement fails for transport reasons; all other errors propagate
    /// as fatal").
    pub fn from_sqlx(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                Self::Unavailable(err)
            }
            other => Self::Query(other),
        }
    }

    /// Any failure to establish a connection is unavailability, regardless
    /// of the underlying `sqlx::Error` variant.
    pub fn from_connect(err: sqlx::Error) -> Self {
        Self::Unavailable(err)
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}
