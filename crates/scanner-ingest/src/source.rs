use std::future::Future;

use scanner_types::events::Topic;

use crate::error::TransportError;

/// One raw record pulled from a topic partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub payload: Vec<u8>,
}

/// A positioned reader over one topic partition.
pub trait QueueSource: Send {
    /// Next record in partition order. `Ok(None)` once the source is closed for good.
    fn recv(&mut self) -> impl Future<Output = Result<Option<Delivery>, TransportError>> + Send;

    /// Mark `delivery` and everything before it as processed. A later
    /// connection resumes right after the last committed record.
    fn commit(&mut self, delivery: &Delivery)
    -> impl Future<Output = Result<(), TransportError>> + Send;
}

/// Opens sources positioned at the oldest uncommitted record of a topic.
pub trait QueueConnector: Send + Sync + 'static {
    type Source: QueueSource + 'static;

    fn connect(&self, topic: Topic)
    -> impl Future<Output = Result<Self::Source, TransportError>> + Send;
}
