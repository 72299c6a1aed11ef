use thiserror::Error;

/// Failure of the queue connection itself. Ends the current consumer run.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connect to {topic}: {reason}")]
    Connect { topic: String, reason: String },

    #[error("receive from {topic}: {reason}")]
    Receive { topic: String, reason: String },

    #[error("commit {topic}@{offset}: {reason}")]
    Commit {
        topic: String,
        offset: i64,
        reason: String,
    },
}

/// Failure to apply one delivery.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("decode payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid event: {0}")]
    Invalid(&'static str),

    #[error("unknown topic {0:?}")]
    UnknownTopic(String),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl IngestError {
    /// Retrying will not help: the payload itself is the problem.
    pub fn is_permanent(&self) -> bool {
        !matches!(self, Self::Store(_))
    }
}

/// Why a consumer run ended abnormally.
#[derive(Debug, Error)]
pub enum ConsumerError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("dead-letter write failed at {topic}@{offset}: {source:#}")]
    Park {
        topic: String,
        offset: i64,
        source: anyhow::Error,
    },
}
