//! Kafka transport backed by librdkafka.
//!
//! Offsets are committed manually after each record is stored or parked, so a
//! restart re-delivers at most the record that was in flight.

use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer as _, StreamConsumer};
use rdkafka::message::Message;
use rdkafka::{Offset, TopicPartitionList};
use scanner_types::events::Topic;
use tracing::debug;

use crate::error::TransportError;
use crate::source::{Delivery, QueueConnector, QueueSource};

#[derive(Debug, Clone)]
pub struct KafkaConnector {
    brokers: String,
    group_id: String,
}

impl KafkaConnector {
    pub fn new(brokers: impl Into<String>, group_id: impl Into<String>) -> Self {
        Self {
            brokers: brokers.into(),
            group_id: group_id.into(),
        }
    }
}

impl QueueConnector for KafkaConnector {
    type Source = KafkaSource;

    async fn connect(&self, topic: Topic) -> Result<KafkaSource, TransportError> {
        let connect_err = |e: rdkafka::error::KafkaError| TransportError::Connect {
            topic: topic.to_string(),
            reason: e.to_string(),
        };

        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &self.brokers)
            .set("group.id", &self.group_id)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "earliest")
            .create()
            .map_err(connect_err)?;

        consumer.subscribe(&[topic.as_str()]).map_err(connect_err)?;
        debug!(brokers = %self.brokers, group = %self.group_id, %topic, "kafka consumer subscribed");

        Ok(KafkaSource { consumer, topic })
    }
}

pub struct KafkaSource {
    consumer: StreamConsumer,
    topic: Topic,
}

impl QueueSource for KafkaSource {
    async fn recv(&mut self) -> Result<Option<Delivery>, TransportError> {
        let msg = self
            .consumer
            .recv()
            .await
            .map_err(|e| TransportError::Receive {
                topic: self.topic.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Some(Delivery {
            topic: msg.topic().to_string(),
            partition: msg.partition(),
            offset: msg.offset(),
            payload: msg.payload().map(<[u8]>::to_vec).unwrap_or_default(),
        }))
    }

    async fn commit(&mut self, delivery: &Delivery) -> Result<(), TransportError> {
        let commit_err = |e: rdkafka::error::KafkaError| TransportError::Commit {
            topic: delivery.topic.clone(),
            offset: delivery.offset,
            reason: e.to_string(),
        };

        let mut tpl = TopicPartitionList::new();
        tpl.add_partition_offset(
            &delivery.topic,
            delivery.partition,
            Offset::Offset(delivery.offset + 1),
        )
        .map_err(commit_err)?;

        self.consumer
            .commit(&tpl, CommitMode::Async)
            .map_err(commit_err)
    }
}
