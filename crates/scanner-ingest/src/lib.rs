//! Ingestion side: turns queue payloads into channel, user, message and reply rows.

pub mod backoff;
pub mod consumer;
pub mod error;
pub mod graph;
pub mod ingestor;
#[cfg(feature = "kafka")]
pub mod kafka;
pub mod memory;
pub mod resolver;
pub mod source;

pub use consumer::Consumer;
pub use graph::GraphWriter;
pub use ingestor::{Ingestor, Outcome, RetryPolicy};
pub use resolver::{EntityResolver, RefreshPolicy};
