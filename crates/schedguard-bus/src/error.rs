//! Error types for the message bus client.

use thiserror::Error;

/// Bus errors. Only [`BusError::Unavailable`] is recoverable — connect or
/// publish failures due to a lost broker connection. Everything else is
/// fatal (spec §4.2/§7).
#[derive(Error, Debug)]
pub enum BusError {
    #[error("bus unavailable: {0}")]
    Unavailable(#[source] lapin::Error),

    #[error("bus operation failed: {0}")]
    Operation(#[source] lapin::Error),

    #[error("bus client is not connected")]
    NotConnected,
}

impl BusError {
    pub fn from_lapin(err: lapin::Error) -> Self {
        use lapin::Error as E;
        match err {
            E::IOError(_) | E::InvalidConnectionState(_) | E::InvalidChannelState(_) => {
                Self::Unavailable(err)
            }
            other => Self::Operation(other),
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}
