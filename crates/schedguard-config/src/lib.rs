//! Configuration for the `schedguard` coordinator and observer.
//!
//! Sections match spec §6 field-for-field: `store`, `bus`, `ssh`, `timing`.
//! Loading is layered, following `kimberlite-config`'s precedence order:
//! built-in defaults, then an optional project TOML file, then
//! `SCHEDGUARD_*` environment variables (highest precedence).

mod error;
mod loader;

pub use error::ConfigError;
pub use loader::ConfigLoader;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration, one instance shared by the coordinator and the
/// observer (they read disjoint sections in practice, but both ship with
/// the full shape so a single config file serves a whole node).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedguardConfig {
    pub store: StoreConfig,
    pub bus: BusConfig,
    pub ssh: SshConfig,
    pub timing: TimingConfig,
}

impl Default for SchedguardConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            bus: BusConfig::default(),
            ssh: SshConfig::default(),
            timing: TimingConfig::default(),
        }
    }
}

/// Shared relational store connection parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub address: String,
    pub database: String,
    pub user: String,
    pub password: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:5432".to_string(),
            database: "schedguard".to_string(),
            user: "schedguard".to_string(),
            password: String::new(),
        }
    }
}

impl StoreConfig {
    /// A `postgres://` connection URI built from the configured fields.
    pub fn connection_uri(&self) -> String {
        format!(
            "postgres://{}:{}@{}/{}",
            self.user, self.password, self.address, self.database
        )
    }
}

/// Message bus connection parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    pub address: String,
    pub vhost: String,
    pub user: String,
    pub password: String,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:5672".to_string(),
            vhost: "/".to_string(),
            user: "guest".to_string(),
            password: "guest".to_string(),
        }
    }
}

impl BusConfig {
    /// An `amqp://` connection URI built from the configured fields.
    pub fn connection_uri(&self) -> String {
        let vhost = self.vhost.trim_start_matches('/');
        format!(
            "amqp://{}:{}@{}/{}",
            self.user, self.password, self.address, vhost
        )
    }
}

/// SSH parameters the observer uses for `start`/`stop` commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SshConfig {
    pub ssh_key: PathBuf,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            ssh_key: PathBuf::from("~/.ssh/id_rsa"),
        }
    }
}

/// Timing parameters, stored as seconds on the wire (matching the `.ini`
/// the original used) but exposed as [`Duration`] everywhere else in the
/// codebase — never a bare integer, and never both a `Duration` and a raw
/// seconds value at different call sites (see spec §9's open question
/// about `patience`'s inconsistent unit in the original).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    time_between_checkins_secs: u64,
    grace_period_secs: u64,
    patience_secs: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            time_between_checkins_secs: 10,
            grace_period_secs: 30,
            patience_secs: 15,
        }
    }
}

impl TimingConfig {
    /// Builds a `TimingConfig` from explicit durations, truncated to whole
    /// seconds (the wire/storage unit). Useful for tests and for
    /// deployments that assemble configuration programmatically rather
    /// than from a file.
    pub fn new(time_between_checkins: Duration, grace_period: Duration, patience: Duration) -> Self {
        Self {
            time_between_checkins_secs: time_between_checkins.as_secs(),
            grace_period_secs: grace_period.as_secs(),
            patience_secs: patience.as_secs(),
        }
    }

    pub fn time_between_checkins(&self) -> Duration {
        Duration::from_secs(self.time_between_checkins_secs)
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_period_secs)
    }

    pub fn patience(&self) -> Duration {
        Duration::from_secs(self.patience_secs)
    }

    /// Validates the timing relationship the protocol depends on: grace
    /// must exceed the check-in interval or every peer will evict itself
    /// before its next check-in lands.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.time_between_checkins_secs == 0 {
            return Err(ConfigError::NonPositiveTiming {
                field: "time_between_checkins",
            });
        }
        if self.grace_period_secs == 0 {
            return Err(ConfigError::NonPositiveTiming {
                field: "grace_period",
            });
        }
        if self.grace_period_secs <= self.time_between_checkins_secs {
            return Err(ConfigError::GraceTooShort {
                grace: self.grace_period_secs,
                checkin: self.time_between_checkins_secs,
            });
        }
        Ok(())
    }
}

impl SchedguardConfig {
    /// Loads configuration from the default locations (see [`ConfigLoader`]).
    pub fn load() -> Result<Self, ConfigError> {
        ConfigLoader::new().load()
    }

    /// Loads configuration rooted at a specific project directory.
    pub fn load_from_dir(project_dir: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        ConfigLoader::new().with_project_dir(project_dir).load()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_internally_consistent() {
        let config = SchedguardConfig::default();
        config.timing.validate().unwrap();
        assert_eq!(config.store.address, "127.0.0.1:5432");
        assert_eq!(config.bus.vhost, "/");
    }

    #[test]
    fn connection_uris_are_well_formed() {
        let config = SchedguardConfig::default();
        assert!(config.store.connection_uri().starts_with("postgres://"));
        assert!(config.bus.connection_uri().starts_with("amqp://"));
    }

    #[test]
    fn grace_must_exceed_checkin_interval() {
        let timing = TimingConfig {
            time_between_checkins_secs: 30,
            grace_period_secs: 10,
            patience_secs: 5,
        };
        assert!(matches!(
            timing.validate(),
            Err(ConfigError::GraceTooShort { .. })
        ));
    }
}
