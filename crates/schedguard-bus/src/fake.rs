//! An in-memory [`MessageBus`], for tests.
//!
//! Every handle cloned from the same [`FakeBus`] shares one set of topics;
//! publishing from one handle delivers to every subscriber registered on
//! any handle, modeling a real broker shared by several coordinators and
//! an observer.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::{BusError, DeliveryCallback, MessageBus};

#[derive(Default)]
struct Broker {
    topics: HashMap<String, Vec<DeliveryCallback>>,
    connected: bool,
}

#[derive(Clone)]
pub struct FakeBus {
    broker: Arc<Mutex<Broker>>,
    unavailable: Arc<Mutex<bool>>,
}

impl FakeBus {
    pub fn new() -> Self {
        Self {
            broker: Arc::new(Mutex::new(Broker::default())),
            unavailable: Arc::new(Mutex::new(false)),
        }
    }

    pub fn handle(&self) -> Self {
        self.clone()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.lock().unwrap() = unavailable;
    }
}

impl Default for FakeBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageBus for FakeBus {
    async fn connect(&mut self) -> Result<(), BusError> {
        if *self.unavailable.lock().unwrap() {
            return Err(BusError::Unavailable(lapin::Error::InvalidConnectionState(
                lapin::ConnectionState::Error,
            )));
        }
        self.broker.lock().unwrap().connected = true;
        Ok(())
    }

    async fn declare_topic(&mut self, topic: &str) -> Result<(), BusError> {
        let mut broker = self.broker.lock().unwrap();
        if !broker.connected {
            return Err(BusError::NotConnected);
        }
        broker.topics.entry(topic.to_string()).or_default();
        Ok(())
    }

    async fn publish(&mut self, topic: &str, bytes: Vec<u8>) -> Result<(), BusError> {
        let broker = self.broker.lock().unwrap();
        if !broker.connected {
            return Err(BusError::NotConnected);
        }
        if let Some(subscribers) = broker.topics.get(topic) {
            for callback in subscribers {
                callback(bytes.clone());
            }
        }
        Ok(())
    }

    async fn subscribe(&mut self, topic: &str, callback: DeliveryCallback) -> Result<(), BusError> {
        let mut broker = self.broker.lock().unwrap();
        if !broker.connected {
            return Err(BusError::NotConnected);
        }
        broker.topics.entry(topic.to_string()).or_default().push(callback);
        Ok(())
    }

    async fn disconnect(&mut self) {
        self.broker.lock().unwrap().connected = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn subscriber_on_one_handle_sees_publish_from_another() {
        let bus = FakeBus::new();
        let mut publisher = bus.handle();
        let mut subscriber = bus.handle();

        publisher.connect().await.unwrap();
        subscriber.connect().await.unwrap();
        subscriber.declare_topic("news").await.unwrap();

        let received = Arc::new(AtomicUsize::new(0));
        let received_clone = received.clone();
        subscriber
            .subscribe(
                "news",
                Box::new(move |_bytes| {
                    received_clone.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .await
            .unwrap();

        publisher.publish("news", b"hello".to_vec()).await.unwrap();
        assert_eq!(received.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn publish_before_connect_fails() {
        let mut bus = FakeBus::new();
        let err = bus.publish("news", vec![]).await.unwrap_err();
        assert!(matches!(err, BusError::NotConnected));
    }

    #[tokio::test]
    async fn unavailable_flag_fails_connect() {
        let mut bus = FakeBus::new();
        bus.set_unavailable(true);
        let err = bus.connect().await.unwrap_err();
        assert!(err.is_unavailable());
    }
}
