//! Error types for configuration loading.

use thiserror::Error;

/// Configuration errors. All variants are treated as fatal by callers —
/// schedguard does not retry a bad configuration, it aborts so an external
/// supervisor can fix the source and restart.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),

    #[error("timing.{field} must be greater than zero")]
    NonPositiveTiming { field: &'static str },

    #[error("timing.grace_period ({grace}s) must exceed timing.time_between_checkins ({checkin}s), or peers will evict themselves between check-ins")]
    GraceTooShort { grace: u64, checkin: u64 },
}
