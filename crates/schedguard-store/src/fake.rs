//! An in-memory [`SchedulerStore`] shared across handles, for tests.
//!
//! A single [`FakeStore`] can be cloned cheaply (it's an `Arc<Mutex<..>>`
//! handle) so a test can simulate several coordinators sharing one table,
//! exactly as spec §8's end-to-end scenarios require.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::{SchedulerStore, StoreError};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Row {
    birth: DateTime<Utc>,
    latest: DateTime<Utc>,
}

#[derive(Default)]
struct Table {
    // Keyed by address; a real `schedulers` table allows multiple rows per
    // address, but only `MIN(birth)`/`MAX(latest)` are ever observed, so
    // one logical row per address is an equivalent model.
    rows: BTreeMap<String, Row>,
    connected: bool,
}

/// A handle to a shared in-memory table. Clones share the same underlying
/// state, modeling several coordinators against one real database.
#[derive(Clone)]
pub struct FakeStore {
    table: Arc<Mutex<Table>>,
    /// When set, `connect` fails with `Unavailable` — used to simulate a
    /// store outage (spec §8 scenario S4).
    unavailable: Arc<Mutex<bool>>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self {
            table: Arc::new(Mutex::new(Table::default())),
            unavailable: Arc::new(Mutex::new(false)),
        }
    }

    /// Creates an independent handle bound to the same shared table —
    /// the "another coordinator, same database" case.
    pub fn handle(&self) -> Self {
        self.clone()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.lock().unwrap() = unavailable;
    }

    pub fn row_count(&self) -> usize {
        self.table.lock().unwrap().rows.len()
    }
}

impl Default for FakeStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SchedulerStore for FakeStore {
    async fn connect(&mut self) -> Result<(), StoreError> {
        if *self.unavailable.lock().unwrap() {
            return Err(StoreError::Unavailable(sqlx::Error::PoolClosed));
        }
        self.table.lock().unwrap().connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) {
        self.table.lock().unwrap().connected = false;
    }

    async fn register(&mut self, address: &str) -> Result<DateTime<Utc>, StoreError> {
        let mut table = self.table.lock().unwrap();
        if !table.connected {
            return Err(StoreError::NotConnected);
        }
        let now = Utc::now();
        table.rows.insert(
            address.to_string(),
            Row {
                birth: now,
                latest: now,
            },
        );
        Ok(now)
    }

    async fn check_in(&mut self, address: &str, birth: DateTime<Utc>) -> Result<(), StoreError> {
        let mut table = self.table.lock().unwrap();
        if !table.connected {
            return Err(StoreError::NotConnected);
        }
        let now = Utc::now();
        let entry = table.rows.entry(address.to_string()).or_insert(Row {
            birth,
            latest: now,
        });
        // Real schema allows multiple rows; effective birth is MIN(birth).
        // A peer always reuses its own first birth, so this never regresses
        // in practice — but guard it anyway to document the invariant.
        if birth < entry.birth {
            entry.birth = birth;
        }
        entry.latest = now;
        Ok(())
    }

    async fn evict_stale(&mut self, grace: Duration) -> Result<(), StoreError> {
        let mut table = self.table.lock().unwrap();
        if !table.connected {
            return Err(StoreError::NotConnected);
        }
        let grace = chrono::Duration::from_std(grace).unwrap_or(chrono::Duration::zero());
        let cutoff = Utc::now() - grace;
        table.rows.retain(|_, row| row.latest >= cutoff);
        Ok(())
    }

    async fn leader_candidates(&mut self) -> Result<Vec<(String, DateTime<Utc>)>, StoreError> {
        let table = self.table.lock().unwrap();
        if !table.connected {
            return Err(StoreError::NotConnected);
        }
        let Some(min_birth) = table.rows.values().map(|r| r.birth).min() else {
            return Ok(Vec::new());
        };
        Ok(table
            .rows
            .iter()
            .filter(|(_, row)| row.birth == min_birth)
            .map(|(address, row)| (address.clone(), row.birth))
            .collect())
    }

    async fn active_addresses(&mut self) -> Result<Vec<String>, StoreError> {
        let table = self.table.lock().unwrap();
        if !table.connected {
            return Err(StoreError::NotConnected);
        }
        Ok(table.rows.keys().cloned().collect())
    }

    async fn ordered_by_birth(&mut self) -> Result<Vec<(String, DateTime<Utc>)>, StoreError> {
        let table = self.table.lock().unwrap();
        if !table.connected {
            return Err(StoreError::NotConnected);
        }
        let mut rows: Vec<_> = table
            .rows
            .iter()
            .map(|(address, row)| (address.clone(), row.birth))
            .collect();
        rows.sort_by_key(|(_, birth)| *birth);
        Ok(rows)
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn register_then_check_in_preserves_birth() {
        let mut store = FakeStore::new();
        store.connect().await.unwrap();
        let birth = store.register("10.0.0.1").await.unwrap();

        store.check_in("10.0.0.1", birth).await.unwrap();
        let candidates = store.leader_candidates().await.unwrap();
        assert_eq!(candidates, vec![("10.0.0.1".to_string(), birth)]);
    }

    #[tokio::test]
    async fn eviction_threshold_removes_only_stale_rows() {
        let mut store = FakeStore::new();
        store.connect().await.unwrap();
        store.register("10.0.0.1").await.unwrap();

        // Nothing is older than a 1-hour grace immediately after insert.
        store.evict_stale(Duration::from_secs(3600)).await.unwrap();
        assert_eq!(store.row_count(), 1);

        // A zero grace evicts everything not inserted in the same instant.
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        store.evict_stale(Duration::from_millis(1)).await.unwrap();
        assert_eq!(store.row_count(), 0);
    }

    #[tokio::test]
    async fn shared_handles_see_each_others_writes() {
        let store_a = FakeStore::new();
        let mut handle_a = store_a.handle();
        let mut handle_b = store_a.handle();

        handle_a.connect().await.unwrap();
        handle_b.connect().await.unwrap();

        handle_a.register("10.0.0.1").await.unwrap();
        handle_b.register("10.0.0.2").await.unwrap();

        let active = handle_a.active_addresses().await.unwrap();
        assert_eq!(active.len(), 2);
    }

    #[tokio::test]
    async fn unavailable_flag_fails_connect() {
        let mut store = FakeStore::new();
        store.set_unavailable(true);
        let err = store.connect().await.unwrap_err();
        assert!(err.is_unavailable());
    }
}
