use std::sync::Arc;

use scanner_types::events::Topic;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::backoff::Backoff;
use crate::error::ConsumerError;
use crate::ingestor::Ingestor;
use crate::source::{QueueConnector, QueueSource};

/// How a consumer run ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEnd {
    /// Shutdown was signalled.
    Shutdown,
    /// The source reported end of stream.
    Closed,
}

/// Sequential worker for one topic. Records are applied strictly in delivery
/// order and each offset is committed only after its record is stored or parked.
pub struct Consumer<C: QueueConnector> {
    connector: Arc<C>,
    topic: Topic,
    ingestor: Arc<Ingestor>,
    restart: Backoff,
    /// Consecutive failed runs before giving up. `None` retries forever.
    max_restarts: Option<u32>,
}

impl<C: QueueConnector> Consumer<C> {
    pub fn new(connector: Arc<C>, topic: Topic, ingestor: Arc<Ingestor>) -> Self {
        Self {
            connector,
            topic,
            ingestor,
            restart: Backoff::default(),
            max_restarts: None,
        }
    }

    pub fn with_restart(mut self, restart: Backoff, max_restarts: Option<u32>) -> Self {
        self.restart = restart;
        self.max_restarts = max_restarts;
        self
    }

    /// Spawn the supervised consumer on the runtime.
    pub fn start(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move { self.supervise(shutdown).await })
    }

    /// Run the consumer, reconnecting with backoff after transport failures,
    /// until shutdown, end of stream, or `max_restarts` consecutive failures.
    pub async fn supervise(self, mut shutdown: watch::Receiver<bool>) {
        let mut failures = 0u32;
        loop {
            if *shutdown.borrow() {
                break;
            }

            let mut processed = 0u64;
            let err = match self.run_once(&mut shutdown, &mut processed).await {
                Ok(RunEnd::Shutdown) => {
                    info!(topic = %self.topic, "consumer stopped");
                    break;
                }
                Ok(RunEnd::Closed) => {
                    info!(topic = %self.topic, "queue closed, consumer finished");
                    break;
                }
                Err(e) => e,
            };

            // A run that made progress starts the backoff over.
            if processed > 0 {
                failures = 0;
            }
            failures += 1;

            if self.max_restarts.is_some_and(|max| failures > max) {
                error!(topic = %self.topic, failures, "consumer failed, not restarting: {err}");
                break;
            }

            let delay = self.restart.delay(failures);
            error!(
                topic = %self.topic,
                failures,
                ?delay,
                "consumer failed, restarting: {err}"
            );

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.changed() => {}
            }
        }
    }

    /// One connection's worth of consumption. Returns on shutdown, end of
    /// stream, or the first transport / dead-letter failure.
    pub async fn run_once(
        &self,
        shutdown: &mut watch::Receiver<bool>,
        processed: &mut u64,
    ) -> Result<RunEnd, ConsumerError> {
        let mut source = self.connector.connect(self.topic).await?;
        info!(topic = %self.topic, "consumer connected");

        loop {
            if *shutdown.borrow() {
                return Ok(RunEnd::Shutdown);
            }

            let next = tokio::select! {
                next = source.recv() => next?,
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        warn!(topic = %self.topic, "shutdown sender dropped");
                    }
                    return Ok(RunEnd::Shutdown);
                }
            };

            let Some(delivery) = next else {
                return Ok(RunEnd::Closed);
            };

            self.ingestor.handle(&delivery).await?;
            source.commit(&delivery).await?;
            *processed += 1;
        }
    }
}
