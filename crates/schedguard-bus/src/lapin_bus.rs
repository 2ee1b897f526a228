//! Production [`MessageBus`] over `lapin`.

use async_trait::async_trait;
use lapin::options::{
    BasicConsumeOptions, BasicPublishOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Connection, ConnectionProperties};
use tokio::task::JoinHandle;

use futures_util::stream::StreamExt;

use crate::{BusError, DeliveryCallback, MessageBus};

pub struct LapinMessageBus {
    uri: String,
    connection: Option<Connection>,
    consumer_task: Option<JoinHandle<()>>,
}

impl LapinMessageBus {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            connection: None,
            consumer_task: None,
        }
    }

    fn connection(&self) -> Result<&Connection, BusError> {
        self.connection.as_ref().ok_or(BusError::NotConnected)
    }
}

#[async_trait]
impl MessageBus for LapinMessageBus {
    async fn connect(&mut self) -> Result<(), BusError> {
        let connection = Connection::connect(&self.uri, ConnectionProperties::default())
            .await
            .map_err(BusError::Unavailable)?;
        self.connection = Some(connection);
        Ok(())
    }

    async fn declare_topic(&mut self, topic: &str) -> Result<(), BusError> {
        let channel = self
            .connection()?
            .create_channel()
            .await
            .map_err(BusError::from_lapin)?;
        channel
            .queue_declare(topic, QueueDeclareOptions::default(), FieldTable::default())
            .await
            .map_err(BusError::from_lapin)?;
        Ok(())
    }

    async fn publish(&mut self, topic: &str, bytes: Vec<u8>) -> Result<(), BusError> {
        let channel = self
            .connection()?
            .create_channel()
            .await
            .map_err(BusError::from_lapin)?;
        channel
            .basic_publish(
                "",
                topic,
                BasicPublishOptions::default(),
                &bytes,
                BasicProperties::default(),
            )
            .await
            .map_err(BusError::from_lapin)?
            .await
            .map_err(BusError::from_lapin)?;
        Ok(())
    }

    async fn subscribe(&mut self, topic: &str, callback: DeliveryCallback) -> Result<(), BusError> {
        let channel = self
            .connection()?
            .create_channel()
            .await
            .map_err(BusError::from_lapin)?;

        let mut consumer = channel
            .basic_consume(
                topic,
                "schedguard",
                BasicConsumeOptions {
                    no_ack: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(BusError::from_lapin)?;

        // Bus delivery is inverted control (the broker calls us); wrap the
        // subscription so each delivery just pushes through `callback` on
        // its own task, leaving whatever the callback does (typically:
        // push onto an mpsc channel) to serialize with the rest of the
        // observer (spec §9's "callback-driven subscriber" design note).
        let task = tokio::spawn(async move {
            while let Some(delivery) = consumer.next().await {
                let Ok(delivery) = delivery else {
                    continue;
                };
                callback(delivery.data.clone());
            }
        });
        self.consumer_task = Some(task);
        Ok(())
    }

    async fn disconnect(&mut self) {
        if let Some(task) = self.consumer_task.take() {
            task.abort();
        }
        if let Some(connection) = self.connection.take() {
            let _ = connection.close(0, "disconnect").await;
        }
    }
}
