use std::sync::Arc;

use anyhow::anyhow;
use scanner_db::Database;
use scanner_types::events::{ChannelEvent, TgMessage, Topic};
use tracing::{error, info, warn};

use crate::backoff::Backoff;
use crate::error::{ConsumerError, IngestError};
use crate::graph::{GraphWriter, WrittenGraph};
use crate::resolver::{EntityResolver, RefreshPolicy};
use crate::source::Delivery;

/// Bounded retry for store failures. Decode failures are never retried.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Backoff::new(
                std::time::Duration::from_millis(200),
                std::time::Duration::from_secs(5),
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Channel { id: i64, created: bool },
    Message(WrittenGraph),
    /// Stored in the dead-letter table instead of being applied.
    Parked { dead_letter_id: i64 },
}

/// Applies one delivery: decode, write, and park it if it cannot be applied.
pub struct Ingestor {
    db: Arc<Database>,
    graph: GraphWriter,
    retry: RetryPolicy,
}

impl Ingestor {
    pub fn new(db: Arc<Database>, policy: RefreshPolicy, retry: RetryPolicy) -> Self {
        let graph = GraphWriter::new(db.clone(), EntityResolver::new(policy));
        Self { db, graph, retry }
    }

    /// `Err` only when the delivery could neither be applied nor parked; the
    /// caller must not commit its offset in that case.
    pub async fn handle(&self, delivery: &Delivery) -> Result<Outcome, ConsumerError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let err = match self.apply(delivery).await {
                Ok(outcome) => return Ok(outcome),
                Err(e) => e,
            };

            if err.is_permanent() {
                warn!(
                    topic = %delivery.topic,
                    offset = delivery.offset,
                    "parking unprocessable payload: {err}"
                );
                return self.park(delivery, &err.to_string()).await;
            }

            if attempt < self.retry.attempts {
                let delay = self.retry.backoff.delay(attempt);
                warn!(
                    topic = %delivery.topic,
                    offset = delivery.offset,
                    attempt,
                    ?delay,
                    "store write failed, retrying: {err:#}"
                );
                tokio::time::sleep(delay).await;
                continue;
            }

            error!(
                topic = %delivery.topic,
                offset = delivery.offset,
                attempt,
                "store write failed, giving up: {err:#}"
            );
            return self.park(delivery, &format!("{err:#}")).await;
        }
    }

    async fn apply(&self, delivery: &Delivery) -> Result<Outcome, IngestError> {
        let topic = Topic::from_name(&delivery.topic)
            .ok_or_else(|| IngestError::UnknownTopic(delivery.topic.clone()))?;

        match topic {
            Topic::Channels => {
                let event = decode_channel(&delivery.payload)?;
                let graph = self.graph.clone();
                let resolved = tokio::task::spawn_blocking(move || graph.write_channel(&event))
                    .await
                    .map_err(|e| anyhow!("spawn_blocking join error: {}", e))??;

                if resolved.created {
                    info!(offset = delivery.offset, id = resolved.id, "stored channel");
                } else {
                    info!(offset = delivery.offset, id = resolved.id, "channel already exists");
                }
                Ok(Outcome::Channel {
                    id: resolved.id,
                    created: resolved.created,
                })
            }
            Topic::Messages => {
                let event = decode_message(&delivery.payload)?;
                let graph = self.graph.clone();
                let written = tokio::task::spawn_blocking(move || graph.write_message(&event))
                    .await
                    .map_err(|e| anyhow!("spawn_blocking join error: {}", e))??;

                info!(
                    offset = delivery.offset,
                    message_id = written.message_id,
                    channel_id = written.channel_id,
                    replies = written.reply_ids.len(),
                    "stored message"
                );
                Ok(Outcome::Message(written))
            }
        }
    }

    async fn park(&self, delivery: &Delivery, reason: &str) -> Result<Outcome, ConsumerError> {
        let db = self.db.clone();
        let topic = delivery.topic.clone();
        let partition = delivery.partition;
        let offset = delivery.offset;
        let payload = delivery.payload.clone();
        let reason = reason.to_string();

        let dead_letter_id = tokio::task::spawn_blocking(move || {
            db.insert_dead_letter(&topic, partition, offset, &payload, &reason)
        })
        .await
        .map_err(|e| anyhow!("spawn_blocking join error: {}", e))
        .and_then(|r| r)
        .map_err(|source| ConsumerError::Park {
            topic: delivery.topic.clone(),
            offset,
            source,
        })?;

        Ok(Outcome::Parked { dead_letter_id })
    }
}

fn decode_channel(payload: &[u8]) -> Result<ChannelEvent, IngestError> {
    let event: ChannelEvent = serde_json::from_slice(payload)?;
    if event.name.trim().is_empty() {
        return Err(IngestError::Invalid("channel event without a name"));
    }
    Ok(event)
}

fn decode_message(payload: &[u8]) -> Result<TgMessage, IngestError> {
    let event: TgMessage = serde_json::from_slice(payload)?;
    if event.peer_id.username.trim().is_empty() {
        return Err(IngestError::Invalid("message without a target channel"));
    }
    if event.from_id.username.trim().is_empty() {
        return Err(IngestError::Invalid("message without an author"));
    }
    if event
        .replies
        .messages
        .iter()
        .any(|r| r.from_id.username.trim().is_empty())
    {
        return Err(IngestError::Invalid("reply without an author"));
    }
    Ok(event)
}
