//! The shared relational store client.
//!
//! [`SchedulerStore`] exposes the domain operations the protocol actually
//! needs (registration, check-in, eviction, leader/active-set queries)
//! rather than the raw `execute`/`queryOne`/`queryAll` primitives from
//! spec §4.1 — every one of those primitives here is a single
//! parameterized statement from spec §6, so giving each its own typed
//! method removes an entire class of "built the wrong SQL string" bugs
//! without losing anything the spec requires. [`PgSchedulerStore`] is the
//! production implementation over `sqlx::PgPool`; [`fake::FakeStore`] is
//! an in-memory stand-in used by every other crate's tests.

mod error;
pub mod fake;
mod postgres;
mod schema;

pub use error::StoreError;
pub use postgres::PgSchedulerStore;
pub use schema::CREATE_SCHEDULERS_TABLE;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// The shared `schedulers` table contract (spec §3, §6).
#[async_trait]
pub trait SchedulerStore: Send {
    /// Opens the connection. `Err(StoreError::Unavailable)` on any
    /// transport failure.
    async fn connect(&mut self) -> Result<(), StoreError>;

    /// Closes the connection. Always succeeds from the caller's point of
    /// view — there is nothing useful to do with a disconnect failure.
    async fn disconnect(&mut self);

    /// Inserts a birth row for `address` and returns the server-assigned
    /// `birth` timestamp. Called exactly once per daemon incarnation, at
    /// registration.
    async fn register(&mut self, address: &str) -> Result<DateTime<Utc>, StoreError>;

    /// Inserts a check-in row reusing the remembered `birth`, so this
    /// node's seniority is preserved across ticks.
    async fn check_in(&mut self, address: &str, birth: DateTime<Utc>) -> Result<(), StoreError>;

    /// Deletes every row whose `latest` is older than `now - grace`.
    async fn evict_stale(&mut self, grace: Duration) -> Result<(), StoreError>;

    /// Every row at the minimum `birth` in the table. Usually length 1;
    /// length > 1 only on a birth-timestamp tie, which the caller must
    /// break deterministically (spec §9 open question — lexicographic
    /// address order is the documented tie-break).
    async fn leader_candidates(&mut self) -> Result<Vec<(String, DateTime<Utc>)>, StoreError>;

    /// `SELECT DISTINCT address` — the current active set.
    async fn active_addresses(&mut self) -> Result<Vec<String>, StoreError>;

    /// `SELECT DISTINCT address, birth ORDER BY birth ASC` — used only by
    /// the observer's `refresh`.
    async fn ordered_by_birth(&mut self) -> Result<Vec<(String, DateTime<Utc>)>, StoreError>;

    /// Commits the current transaction, if the implementation buffers
    /// writes in one (the Postgres implementation auto-commits each
    /// statement and this is a no-op; kept because spec §4.1 names it as
    /// a first-class operation of the store contract).
    async fn commit(&mut self) -> Result<(), StoreError>;
}

/// Applies the documented tie-break to a set of leader candidates:
/// lexicographically smallest address wins. Spec §9: "Pick a documented
/// tie-break (lexicographic address is sufficient)."
pub fn break_leader_tie(mut candidates: Vec<(String, DateTime<Utc>)>) -> Option<String> {
    candidates.sort_by(|a, b| a.0.cmp(&b.0));
    candidates.into_iter().next().map(|(address, _)| address)
}
