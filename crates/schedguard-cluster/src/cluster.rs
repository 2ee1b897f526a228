//! The observer's in-memory view of the cluster.

use indexmap::IndexMap;
use schedguard_store::{SchedulerStore, StoreError};
use schedguard_types::{StatusMessage, StatusValue};

use crate::peer::{News, ReportedPeer};

/// Dense, insertion-ordered map from address to [`ReportedPeer`]. Keys are
/// reassigned `1..=len` whenever a peer is removed, so the operator can
/// always address a peer by the short integer `report` last printed next
/// to it (spec §3's "the key the operator types is the key `report` showed").
#[derive(Debug, Default)]
pub struct ReportedCluster {
    peers: IndexMap<String, ReportedPeer>,
}

impl ReportedCluster {
    pub fn new() -> Self {
        Self {
            peers: IndexMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn peer(&self, key: usize) -> Option<&ReportedPeer> {
        self.peers.values().find(|p| p.key == key)
    }

    pub fn by_address(&self, address: &str) -> Option<&ReportedPeer> {
        self.peers.get(address)
    }

    fn entry_for(&mut self, address: &str) -> &mut ReportedPeer {
        if !self.peers.contains_key(address) {
            let key = self.peers.len() + 1;
            self.peers
                .insert(address.to_string(), ReportedPeer::new(key, address));
        }
        self.peers.get_mut(address).expect("just inserted")
    }

    /// Folds one status message into the cluster (spec §9). A `Leader`
    /// status also tells the *sender* that it now follows the message's
    /// `subject` — the two-peer update the original calls `News`.
    pub fn consume(&mut self, message: &StatusMessage) {
        self.entry_for(&message.subject)
            .apply(&News::Status(message.status));

        if message.status == StatusValue::Leader && message.sender != message.subject {
            self.entry_for(&message.sender)
                .apply(&News::Following(message.subject.clone()));
        }
    }

    /// Removes the peer at `key`, then renumbers the remaining peers so
    /// keys stay dense and base-1.
    pub fn remove(&mut self, key: usize) -> Option<ReportedPeer> {
        let address = self.peer(key)?.address.clone();
        let (_, removed) = self.peers.shift_remove_entry(&address)?;
        for (index, peer) in self.peers.values_mut().enumerate() {
            peer.key = index + 1;
        }
        Some(removed)
    }

    /// Renders the operator-facing `report` text: one line per peer,
    /// ANSI-bolding the current leader the way the original's console
    /// report does.
    pub fn report(&self) -> String {
        if self.peers.is_empty() {
            return "(no peers known)".to_string();
        }
        let mut lines = Vec::with_capacity(self.peers.len());
        for peer in self.peers.values() {
            let status = if !peer.available {
                "unavailable"
            } else if peer.leading {
                "leader"
            } else {
                "follower"
            };
            let following = peer
                .following
                .as_deref()
                .map(|addr| format!(" following {addr}"))
                .unwrap_or_default();
            let line = format!("{}) {} - {}{}", peer.key, peer.address, status, following);
            if peer.leading {
                lines.push(format!("\x1b[1m{line}\x1b[0m"));
            } else {
                lines.push(line);
            }
        }
        lines.join("\n")
    }

    /// Reconciles the cluster against the store's `ordered_by_birth`
    /// view: synthesizes `{a, a, LEADER}` for the oldest address and
    /// `{a, a, AVAILABLE}` for each subsequent one, feeding both through
    /// `consume` exactly as the live bus path does, then drops any
    /// address no longer present (spec §4.5).
    pub async fn refresh<S>(&mut self, store: &mut S) -> Result<(), StoreError>
    where
        S: SchedulerStore + ?Sized,
    {
        let rows = store.ordered_by_birth().await?;
        let mut seen = Vec::with_capacity(rows.len());
        for (index, (address, _birth)) in rows.iter().enumerate() {
            let status = if index == 0 {
                StatusValue::Leader
            } else {
                StatusValue::Available
            };
            self.consume(&StatusMessage::new(address, address, status));
            seen.push(address.clone());
        }
        let stale: Vec<String> = self
            .peers
            .keys()
            .filter(|address| !seen.contains(address))
            .cloned()
            .collect();
        for address in stale {
            self.peers.shift_remove(&address);
        }
        for (index, peer) in self.peers.values_mut().enumerate() {
            peer.key = index + 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use schedguard_store::fake::FakeStore;

    fn msg(sender: &str, subject: &str, status: StatusValue) -> StatusMessage {
        StatusMessage::new(sender, subject, status)
    }

    #[test]
    fn keys_stay_dense_after_removal() {
        let mut cluster = ReportedCluster::new();
        cluster.consume(&msg("a", "10.0.0.1", StatusValue::Available));
        cluster.consume(&msg("b", "10.0.0.2", StatusValue::Available));
        cluster.consume(&msg("c", "10.0.0.3", StatusValue::Available));

        cluster.remove(2);

        let keys: Vec<usize> = cluster.peers.values().map(|p| p.key).collect();
        assert_eq!(keys, vec![1, 2]);
        assert_eq!(cluster.peer(2).unwrap().address, "10.0.0.3");
    }

    #[test]
    fn leader_status_marks_sender_as_following() {
        let mut cluster = ReportedCluster::new();
        cluster.consume(&msg("10.0.0.2", "10.0.0.1", StatusValue::Leader));

        let leader = cluster.by_address("10.0.0.1").unwrap();
        assert!(leader.leading);

        let follower = cluster.by_address("10.0.0.2").unwrap();
        assert_eq!(follower.following.as_deref(), Some("10.0.0.1"));
    }

    #[test]
    fn self_leadership_does_not_duplicate_as_follower() {
        let mut cluster = ReportedCluster::new();
        cluster.consume(&msg("10.0.0.1", "10.0.0.1", StatusValue::Leader));
        assert_eq!(cluster.len(), 1);
    }

    #[tokio::test]
    async fn refresh_drops_addresses_no_longer_in_the_store() {
        let mut store = FakeStore::new();
        store.connect().await.unwrap();
        store.register("10.0.0.1").await.unwrap();

        let mut cluster = ReportedCluster::new();
        cluster.consume(&msg("a", "10.0.0.9", StatusValue::Available));
        cluster.refresh(&mut store).await.unwrap();

        assert!(cluster.by_address("10.0.0.9").is_none());
        // The sole remaining address is the oldest, so refresh reports it
        // as leader rather than available (spec §4.5's synthesized news).
        assert!(cluster.by_address("10.0.0.1").unwrap().leading);
        assert_eq!(cluster.peer(1).unwrap().address, "10.0.0.1");
    }

    #[tokio::test]
    async fn refresh_marks_oldest_as_leader_and_rest_as_available() {
        let mut store = FakeStore::new();
        store.connect().await.unwrap();
        store.register("10.0.0.1").await.unwrap();
        store.register("10.0.0.2").await.unwrap();

        let mut cluster = ReportedCluster::new();
        cluster.refresh(&mut store).await.unwrap();

        let oldest = cluster.by_address("10.0.0.1").unwrap();
        assert!(oldest.leading);
        let newest = cluster.by_address("10.0.0.2").unwrap();
        assert!(!newest.leading);
        assert!(newest.available);
    }

    #[tokio::test]
    async fn refresh_is_idempotent() {
        let mut store = FakeStore::new();
        store.connect().await.unwrap();
        store.register("10.0.0.1").await.unwrap();

        let mut cluster = ReportedCluster::new();
        cluster.refresh(&mut store).await.unwrap();
        let first = cluster.report();
        cluster.refresh(&mut store).await.unwrap();
        assert_eq!(cluster.report(), first);
    }

    proptest! {
        #[test]
        fn keys_are_always_a_dense_base_one_range(
            addresses in prop::collection::vec("10\\.0\\.0\\.[1-9]", 1..8),
            remove_at in prop::collection::vec(1usize..9, 0..4),
        ) {
            let mut cluster = ReportedCluster::new();
            for address in &addresses {
                cluster.consume(&msg("x", address, StatusValue::Available));
            }
            for key in remove_at {
                cluster.remove(key);
            }

            let keys: Vec<usize> = cluster.peers.values().map(|p| p.key).collect();
            let expected: Vec<usize> = (1..=keys.len()).collect();
            prop_assert_eq!(keys, expected);
        }
    }
}
