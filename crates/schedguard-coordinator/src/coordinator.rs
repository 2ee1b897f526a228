//! The coordinator state machine (spec §4.4).

use chrono::{DateTime, Utc};
use schedguard_bus::MessageBus;
use schedguard_config::TimingConfig;
use schedguard_store::{break_leader_tie, SchedulerStore};
use schedguard_types::{StatusMessage, StatusValue};
use std::time::Duration;

use crate::address::AddressSource;
use crate::child::{ChildProcess, ChildSpec};
use crate::error::{CoordinatorError, Recovery};
use crate::state::CoordinatorState;

/// The bus topic every status message is published to (spec §6).
pub const TOPIC: &str = "news";

/// The post-fault pause before re-registering (spec §4.4).
const FAULT_PAUSE: Duration = Duration::from_secs(30);

pub struct Coordinator<S, B, A> {
    store: S,
    bus: B,
    address_source: A,
    child: ChildProcess,
    child_spec: ChildSpec,
    timing: TimingConfig,
    state: CoordinatorState,
    address: Option<String>,
    birth: Option<DateTime<Utc>>,
    old_leader: Option<String>,
    active_set: Vec<String>,
}

impl<S, B, A> Coordinator<S, B, A>
where
    S: SchedulerStore,
    B: MessageBus,
    A: AddressSource,
{
    pub fn new(store: S, bus: B, address_source: A, child_spec: ChildSpec, timing: TimingConfig) -> Self {
        Self {
            store,
            bus,
            address_source,
            child: ChildProcess::new(),
            child_spec,
            timing,
            state: CoordinatorState::Init,
            address: None,
            birth: None,
            old_leader: None,
            active_set: Vec::new(),
        }
    }

    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    /// Runs the protocol forever: register, then tick until a fault
    /// demands a reset, then register again. This is an explicit outer
    /// loop rather than the original's recursive `reset()` call so stack
    /// depth never grows with uptime (spec §9).
    pub async fn run(&mut self) {
        loop {
            if let Err(error) = self.register().await {
                tracing::error!(%error, "registration failed");
                if error.recovery() == Recovery::Fatal {
                    return;
                }
                tokio::time::sleep(FAULT_PAUSE).await;
                continue;
            }

            loop {
                tokio::time::sleep(self.timing.time_between_checkins()).await;
                match self.tick().await {
                    Ok(()) => continue,
                    Err(error) => {
                        tracing::warn!(%error, "tick failed");
                        match error.recovery() {
                            Recovery::Immediate => break,
                            Recovery::AfterPause => {
                                self.enter_disconnected_after_pause_fault().await;
                                tokio::time::sleep(FAULT_PAUSE).await;
                                break;
                            }
                            Recovery::Fatal => return,
                        }
                    }
                }
            }
        }
    }

    /// INIT → FOLLOWER.
    pub async fn register(&mut self) -> Result<(), CoordinatorError> {
        let address = self.address_source.discover().await?;

        self.store.connect().await?;
        self.bus.connect().await?;
        self.bus.declare_topic(TOPIC).await?;
        let birth = self.store.register(&address).await?;
        self.publish(&address, &address, StatusValue::Available).await?;
        self.store.disconnect().await;
        self.bus.disconnect().await;

        self.address = Some(address);
        self.birth = Some(birth);
        self.old_leader = None;
        self.active_set = Vec::new();
        self.state = CoordinatorState::Follower;
        Ok(())
    }

    /// One full tick: evict, check in, recompute and adjust leadership,
    /// recompute the active set, announce departures, and check for a
    /// dead child. Store and bus connections are acquired and released
    /// around the whole tick regardless of which step fails.
    pub async fn tick(&mut self) -> Result<(), CoordinatorError> {
        let address = self
            .address
            .clone()
            .expect("tick called before registration");
        let birth = self.birth.expect("tick called before registration");

        let outcome = match self.store.connect().await {
            Ok(()) => match self.bus.connect().await {
                Ok(()) => self.run_tick_steps(&address, birth).await,
                Err(e) => Err(e.into()),
            },
            Err(e) => Err(e.into()),
        };

        self.store.disconnect().await;
        self.bus.disconnect().await;
        outcome
    }

    async fn run_tick_steps(&mut self, address: &str, birth: DateTime<Utc>) -> Result<(), CoordinatorError> {
        self.store.evict_stale(self.timing.grace_period()).await?;
        self.store.check_in(address, birth).await?;

        let candidates = self.store.leader_candidates().await?;
        let new_leader = break_leader_tie(candidates);
        self.adjust_leadership(address, new_leader).await?;

        let active = self.store.active_addresses().await?;
        if !active.iter().any(|a| a == address) {
            return Err(CoordinatorError::SelfEvicted);
        }
        let departed: Vec<String> = self
            .active_set
            .iter()
            .filter(|a| !active.contains(a))
            .cloned()
            .collect();
        for address_departed in departed {
            self.publish(address, &address_departed, StatusValue::Unavailable)
                .await?;
        }
        self.active_set = active;

        if self.state == CoordinatorState::Leader && self.child.exited() {
            self.child.interrupt_and_wait().await;
            self.state = CoordinatorState::Disconnected;
            return Err(CoordinatorError::Relinquished);
        }

        Ok(())
    }

    /// Implements the four leadership-adjustment rules of spec §4.4 in
    /// order. A leadership loss short-circuits the remaining rules,
    /// mirroring the original's `relinquish_leadership` folding straight
    /// into a reset with nothing executing afterward.
    async fn adjust_leadership(
        &mut self,
        address: &str,
        new_leader: Option<String>,
    ) -> Result<(), CoordinatorError> {
        let was_leader = self.old_leader.as_deref() == Some(address);
        let is_leader = new_leader.as_deref() == Some(address);

        if was_leader && !is_leader {
            self.child.interrupt_and_wait().await;
            self.state = CoordinatorState::Disconnected;
            return Err(CoordinatorError::Relinquished);
        }

        if new_leader.as_deref() != self.old_leader.as_deref() {
            if let Some(old) = self.old_leader.clone() {
                self.publish(address, &old, StatusValue::Unavailable).await?;
            }
            if let Some(new) = &new_leader {
                self.publish(address, new, StatusValue::Leader).await?;
            }
        }

        if !was_leader && is_leader {
            tokio::time::sleep(self.timing.patience()).await;
            self.child.spawn(&self.child_spec).await?;
            self.store
                .check_in(address, self.birth.expect("registered"))
                .await?;
        }
        self.state = if is_leader {
            CoordinatorState::Leader
        } else {
            CoordinatorState::Follower
        };

        self.old_leader = new_leader;
        Ok(())
    }

    async fn publish(&mut self, sender: &str, subject: &str, status: StatusValue) -> Result<(), CoordinatorError> {
        let message = StatusMessage::new(sender, subject, status);
        self.bus.publish(TOPIC, message.to_bytes()).await?;
        Ok(())
    }

    /// A self-eviction or a transient store/bus outage can strand a live
    /// child behind this node while a new leader gets elected elsewhere
    /// (spec §4.4, §7, scenario S5) — tear it down and enter DISCONNECTED
    /// before the fault pause, the same as an explicit election loss.
    async fn enter_disconnected_after_pause_fault(&mut self) {
        self.child.interrupt_and_wait().await;
        self.state = CoordinatorState::Disconnected;
        self.announce_unavailable_best_effort().await;
    }

    /// Best-effort self-UNAVAILABLE announcement on the way into a pause
    /// recovery; failures here are swallowed (spec §4.4: "best-effort —
    /// may be dropped").
    async fn announce_unavailable_best_effort(&mut self) {
        let Some(address) = self.address.clone() else {
            return;
        };
        if self.bus.connect().await.is_ok() {
            let _ = self.publish(&address, &address, StatusValue::Unavailable).await;
            self.bus.disconnect().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::StaticAddressSource;
    use schedguard_bus::fake::FakeBus;
    use schedguard_store::fake::FakeStore;
    use std::time::Duration as StdDuration;

    fn quick_timing() -> TimingConfig {
        TimingConfig::new(
            StdDuration::from_secs(1),
            StdDuration::from_secs(2),
            StdDuration::from_secs(0),
        )
    }

    fn harmless_child() -> ChildSpec {
        ChildSpec::new("sleep", vec!["60".to_string()])
    }

    async fn new_coordinator(
        address: &str,
        store: FakeStore,
        bus: FakeBus,
    ) -> Coordinator<FakeStore, FakeBus, StaticAddressSource> {
        Coordinator::new(
            store,
            bus,
            StaticAddressSource::new(address),
            harmless_child(),
            quick_timing(),
        )
    }

    #[tokio::test]
    async fn s1_single_node_registers_and_becomes_leader() {
        let store = FakeStore::new();
        let bus = FakeBus::new();
        let mut node = new_coordinator("10.0.0.1", store, bus).await;

        node.register().await.unwrap();
        assert_eq!(node.state(), CoordinatorState::Follower);

        node.tick().await.unwrap();
        assert_eq!(node.state(), CoordinatorState::Leader);
        node.child.interrupt_and_wait().await;
    }

    #[tokio::test]
    async fn s2_second_node_follows_the_first() {
        let store = FakeStore::new();
        let bus = FakeBus::new();

        let mut a = new_coordinator("10.0.0.1", store.handle(), bus.handle()).await;
        a.register().await.unwrap();
        a.tick().await.unwrap();
        assert_eq!(a.state(), CoordinatorState::Leader);

        let mut b = new_coordinator("10.0.0.2", store.handle(), bus.handle()).await;
        b.register().await.unwrap();
        b.tick().await.unwrap();
        assert_eq!(b.state(), CoordinatorState::Follower);
        assert_eq!(b.old_leader.as_deref(), Some("10.0.0.1"));

        a.child.interrupt_and_wait().await;
    }

    #[tokio::test]
    async fn s3_leader_eviction_promotes_the_sole_survivor() {
        let store = FakeStore::new();
        let bus = FakeBus::new();

        let mut a = new_coordinator("10.0.0.1", store.handle(), bus.handle()).await;
        a.register().await.unwrap();
        a.tick().await.unwrap();

        let mut b = new_coordinator("10.0.0.2", store.handle(), bus.handle()).await;
        b.register().await.unwrap();
        b.tick().await.unwrap();
        assert_eq!(b.state(), CoordinatorState::Follower);

        // A's process is killed: simulate by letting its rows go stale
        // and never checking in again.
        tokio::time::sleep(StdDuration::from_millis(5)).await;
        store
            .handle()
            .evict_stale(StdDuration::from_millis(1))
            .await
            .unwrap();

        b.tick().await.unwrap();
        assert_eq!(b.state(), CoordinatorState::Leader);
        b.child.interrupt_and_wait().await;
    }

    /// Wraps a [`FakeStore`] and hides one address from `active_addresses`,
    /// standing in for a peer's eviction landing between this node's own
    /// check-in and its active-set read — a genuine race in production
    /// that a single sequential fake cannot otherwise reproduce.
    struct ExcludingStore {
        inner: FakeStore,
        excluded: String,
    }

    #[async_trait::async_trait]
    impl SchedulerStore for ExcludingStore {
        async fn connect(&mut self) -> Result<(), schedguard_store::StoreError> {
            self.inner.connect().await
        }
        async fn disconnect(&mut self) {
            self.inner.disconnect().await
        }
        async fn register(&mut self, address: &str) -> Result<DateTime<Utc>, schedguard_store::StoreError> {
            self.inner.register(address).await
        }
        async fn check_in(&mut self, address: &str, birth: DateTime<Utc>) -> Result<(), schedguard_store::StoreError> {
            self.inner.check_in(address, birth).await
        }
        async fn evict_stale(&mut self, grace: StdDuration) -> Result<(), schedguard_store::StoreError> {
            self.inner.evict_stale(grace).await
        }
        async fn leader_candidates(&mut self) -> Result<Vec<(String, DateTime<Utc>)>, schedguard_store::StoreError> {
            self.inner.leader_candidates().await
        }
        async fn active_addresses(&mut self) -> Result<Vec<String>, schedguard_store::StoreError> {
            let mut addresses = self.inner.active_addresses().await?;
            addresses.retain(|a| a != &self.excluded);
            Ok(addresses)
        }
        async fn ordered_by_birth(&mut self) -> Result<Vec<(String, DateTime<Utc>)>, schedguard_store::StoreError> {
            self.inner.ordered_by_birth().await
        }
        async fn commit(&mut self) -> Result<(), schedguard_store::StoreError> {
            self.inner.commit().await
        }
    }

    #[tokio::test]
    async fn self_eviction_is_reported_as_self_evicted() {
        let store = ExcludingStore {
            inner: FakeStore::new(),
            excluded: "10.0.0.1".to_string(),
        };
        let bus = FakeBus::new();
        let mut node = Coordinator::new(
            store,
            bus,
            StaticAddressSource::new("10.0.0.1"),
            harmless_child(),
            quick_timing(),
        );
        node.register().await.unwrap();

        // The sole candidate becomes leader and spawns its child within
        // the same tick that then discovers its own row is missing from
        // the active set.
        let err = node.tick().await.unwrap_err();
        assert!(matches!(err, CoordinatorError::SelfEvicted));
        assert_eq!(err.recovery(), Recovery::AfterPause);
        assert_eq!(node.state(), CoordinatorState::Leader);
        assert!(!node.child.exited(), "child should still be running here");

        // `run()`'s AfterPause arm must tear the child down before the
        // fault pause, not leave it running unsupervised.
        node.enter_disconnected_after_pause_fault().await;
        assert_eq!(node.state(), CoordinatorState::Disconnected);
        assert!(!node.child.is_holding_a_child());
    }

    #[tokio::test]
    async fn store_outage_while_leader_tears_down_the_child() {
        let store = FakeStore::new();
        let bus = FakeBus::new();
        let mut node = new_coordinator("10.0.0.1", store.handle(), bus.handle()).await;
        node.register().await.unwrap();
        node.tick().await.unwrap();
        assert_eq!(node.state(), CoordinatorState::Leader);

        store.set_unavailable(true);
        let err = node.tick().await.unwrap_err();
        assert_eq!(err.recovery(), Recovery::AfterPause);
        // The leader's child is still live: the outage only blocked the
        // tick's store connection, not the child process.
        assert!(!node.child.exited(), "child should still be running here");

        node.enter_disconnected_after_pause_fault().await;
        assert_eq!(node.state(), CoordinatorState::Disconnected);
        assert!(!node.child.is_holding_a_child());
    }

    #[tokio::test]
    async fn dead_child_triggers_immediate_relinquish() {
        let store = FakeStore::new();
        let bus = FakeBus::new();
        let mut node = Coordinator::new(
            store,
            bus,
            StaticAddressSource::new("10.0.0.1"),
            ChildSpec::new("true", Vec::new()),
            quick_timing(),
        );

        node.register().await.unwrap();
        node.tick().await.unwrap();
        assert_eq!(node.state(), CoordinatorState::Leader);

        // Give the short-lived "true" process time to exit.
        tokio::time::sleep(StdDuration::from_millis(50)).await;

        let err = node.tick().await.unwrap_err();
        assert!(matches!(err, CoordinatorError::Relinquished));
        assert_eq!(err.recovery(), Recovery::Immediate);
        assert_eq!(node.state(), CoordinatorState::Disconnected);
    }
}
