//! In-process broker with per-topic logs and committed offsets.
//!
//! Behaves like a single-partition Kafka topic: sources start at the first
//! uncommitted record and block until more are published. Used by tests and
//! for running the server without a broker.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use scanner_types::events::Topic;
use tokio::sync::Notify;

use crate::error::TransportError;
use crate::source::{Delivery, QueueConnector, QueueSource};

#[derive(Default)]
struct TopicLog {
    records: Vec<Vec<u8>>,
    /// Offset of the first uncommitted record.
    committed: i64,
    faults: usize,
}

#[derive(Default)]
struct BrokerState {
    topics: HashMap<Topic, TopicLog>,
    closed: bool,
}

#[derive(Clone, Default)]
pub struct MemoryBroker {
    state: Arc<Mutex<BrokerState>>,
    notify: Arc<Notify>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record and return its offset.
    pub fn publish(&self, topic: Topic, payload: impl Into<Vec<u8>>) -> i64 {
        let offset = {
            let mut state = self.lock();
            let log = state.topics.entry(topic).or_default();
            log.records.push(payload.into());
            log.records.len() as i64 - 1
        };
        self.notify.notify_waiters();
        offset
    }

    /// Make the next `recv` on `topic` fail with a transport error.
    pub fn inject_fault(&self, topic: Topic) {
        self.lock().topics.entry(topic).or_default().faults += 1;
        self.notify.notify_waiters();
    }

    /// Sources drain what is left and then report end of stream.
    pub fn close(&self) {
        self.lock().closed = true;
        self.notify.notify_waiters();
    }

    pub fn committed(&self, topic: Topic) -> i64 {
        self.lock().topics.get(&topic).map_or(0, |log| log.committed)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BrokerState> {
        // Nothing in the broker panics while holding the lock.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl QueueConnector for MemoryBroker {
    type Source = MemorySource;

    async fn connect(&self, topic: Topic) -> Result<MemorySource, TransportError> {
        let position = self.committed(topic);
        Ok(MemorySource {
            broker: self.clone(),
            topic,
            position,
        })
    }
}

pub struct MemorySource {
    broker: MemoryBroker,
    topic: Topic,
    position: i64,
}

impl QueueSource for MemorySource {
    async fn recv(&mut self) -> Result<Option<Delivery>, TransportError> {
        loop {
            let notified = self.broker.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.broker.lock();
                let closed = state.closed;
                let log = state.topics.entry(self.topic).or_default();

                if log.faults > 0 {
                    log.faults -= 1;
                    return Err(TransportError::Receive {
                        topic: self.topic.to_string(),
                        reason: "injected fault".into(),
                    });
                }

                if let Some(payload) = log.records.get(self.position as usize) {
                    let delivery = Delivery {
                        topic: self.topic.to_string(),
                        partition: 0,
                        offset: self.position,
                        payload: payload.clone(),
                    };
                    self.position += 1;
                    return Ok(Some(delivery));
                }

                if closed {
                    return Ok(None);
                }
            }

            notified.await;
        }
    }

    async fn commit(&mut self, delivery: &Delivery) -> Result<(), TransportError> {
        let mut state = self.broker.lock();
        let log = state.topics.entry(self.topic).or_default();
        log.committed = log.committed.max(delivery.offset + 1);
        Ok(())
    }
}
