//! The per-node leader-election and liveness-reporting state machine.
//!
//! [`Coordinator`] is generic over [`SchedulerStore`](schedguard_store::SchedulerStore),
//! [`MessageBus`](schedguard_bus::MessageBus), and [`AddressSource`] so the
//! same state machine runs against `FakeStore`/`FakeBus` in tests and
//! `PgSchedulerStore`/`LapinMessageBus` in production.

mod address;
mod child;
mod coordinator;
mod error;
mod state;

pub use address::{AddressSource, MetadataAddressSource, StaticAddressSource};
pub use child::{ChildProcess, ChildSpec};
pub use coordinator::{Coordinator, TOPIC};
pub use error::{CoordinatorError, Recovery};
pub use state::CoordinatorState;
