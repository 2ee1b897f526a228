//! The AMQP-style message bus client.
//!
//! No pack repository speaks AMQP, so [`LapinMessageBus`] reaches for
//! `lapin` — the ecosystem-standard async AMQP 0.9.1 client for Tokio —
//! and wraps it in the same connect/operate/disconnect shape
//! `schedguard-store` uses for its relational client, so the coordinator's
//! per-tick resource policy (spec §5) treats both uniformly.

mod error;
pub mod fake;
mod lapin_bus;

pub use error::BusError;
pub use lapin_bus::LapinMessageBus;

use async_trait::async_trait;

/// A callback invoked once per delivered message with the raw payload.
pub type DeliveryCallback = Box<dyn Fn(Vec<u8>) + Send + Sync + 'static>;

/// The bus contract from spec §4.2.
#[async_trait]
pub trait MessageBus: Send {
    async fn connect(&mut self) -> Result<(), BusError>;

    /// Declares a topic (queue) if it does not already exist. Idempotent.
    async fn declare_topic(&mut self, topic: &str) -> Result<(), BusError>;

    /// Publishes `bytes` to `topic`. Ordering within a single publisher is
    /// preserved; across publishers it is not (spec §4.2).
    async fn publish(&mut self, topic: &str, bytes: Vec<u8>) -> Result<(), BusError>;

    /// Subscribes to `topic`; `callback` is invoked once per delivered
    /// message. Delivery is auto-acked (at-most-once from the publisher's
    /// point of view) — a dropped message is an acceptable loss because
    /// the observer can always `refresh` from the store.
    async fn subscribe(&mut self, topic: &str, callback: DeliveryCallback) -> Result<(), BusError>;

    async fn disconnect(&mut self);
}
