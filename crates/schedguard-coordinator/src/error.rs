//! Coordinator errors and the recovery action each implies (spec §7).

use schedguard_bus::BusError;
use schedguard_store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Bus(#[from] BusError),
    /// This node's address is missing from the active set after check-in —
    /// its own row was evicted or its check-in was lost.
    #[error("self-eviction: address missing from active set")]
    SelfEvicted,
    /// A leadership change (election or a dead child) requires an
    /// immediate full reset, mirroring the original's `relinquish_leadership`
    /// folding straight into `reset()` with no pause.
    #[error("relinquished leadership, resetting")]
    Relinquished,
    /// Configuration or schema problems: log and abort, no retry.
    #[error("{0}")]
    Fatal(String),
}

/// What the outer run loop should do after a tick or registration fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Re-register immediately, no pause.
    Immediate,
    /// Best-effort UNAVAILABLE, sleep 30s, then re-register.
    AfterPause,
    /// Log and abort; an external supervisor is expected to restart us.
    Fatal,
}

impl CoordinatorError {
    pub fn recovery(&self) -> Recovery {
        match self {
            Self::Relinquished => Recovery::Immediate,
            Self::SelfEvicted => Recovery::AfterPause,
            Self::Store(e) if e.is_unavailable() => Recovery::AfterPause,
            Self::Bus(e) if e.is_unavailable() => Recovery::AfterPause,
            Self::Store(_) | Self::Bus(_) | Self::Fatal(_) => Recovery::Fatal,
        }
    }
}
