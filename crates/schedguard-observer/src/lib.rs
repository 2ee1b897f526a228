//! The observer: a read-mostly process that subscribes to the status bus,
//! renders the reported cluster for an operator, and issues SSH-based
//! start/stop commands against individual peers (spec §4.6, §5).

mod commands;
mod error;
mod observer;
mod ssh;

pub use commands::Command;
pub use error::ObserverError;
pub use observer::{history_path, Observer};
pub use ssh::{ServiceAction, SERVICE_NAME};
