//! Job broker adapter (§4.4): enqueue/dequeue against named
//! queues, visibility timeouts, and dead-letter handling.

mod error;
mod memory;

pub use error::Error;
pub use memory::InMemoryBroker;

use async_trait::async_trait;
use std::time::Duration;

/// Max deliveries before a message is routed to the dead-letter store
/// (§4.4: "Max broker retries = 5; the 6th delivery is routed to a
/// dead-letter store").
pub const MAX_DELIVERY_ATTEMPTS: u32 = 5;

/// Pull-one-ack-one prefetch (§4.4) so one long-running task on a slot
/// never starves the rest of that queue's backlog.
pub const DEFAULT_PREFETCH: usize = 1;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Message {
    pub broker_id: String,
    pub queue: String,
    pub task_name: String,
    pub payload: serde_json::Value,
    /// 1-indexed; incremented on each redelivery.
    pub attempt: u32,
    pub visibility_deadline: i64,
}

#[derive(Debug, Clone, Default)]
pub struct EnqueueOptions {
    pub delay: Duration,
}

/// The broker capability (§4.9). `InMemoryBroker` is a complete,
/// deterministic implementation used by tests and local workers; a
/// production deployment would swap in an SQS- or Kafka-backed one behind
/// the same trait.
#[async_trait]
pub trait Broker: Send + Sync {
    async fn enqueue(&self, queue: &str, task_name: &str, payload: serde_json::Value, opts: EnqueueOptions, now: i64) -> Result<String, Error>;

    /// Pulls up to `max` visible messages from any of `queues`, marking
    /// them invisible until `visibility_timeout` elapses.
    async fn dequeue(&self, queues: &[String], max: usize, visibility_timeout: Duration, now: i64) -> Result<Vec<Message>, Error>;

    async fn ack(&self, msg: &Message) -> Result<(), Error>;

    /// Requeues immediately visible after `delay`, or dead-letters it if
    /// `msg.attempt` has already exhausted `MAX_DELIVERY_ATTEMPTS`.
    async fn nack(&self, msg: &Message, delay: Duration, now: i64) -> Result<(), Error>;

    async fn dead_letters(&self, queue: &str) -> Result<Vec<Message>, Error>;

    /// Visible (non-invisible, non-dead-lettered) depth, used for the
    /// backpressure flag described in §5.
    async fn depth(&self, queue: &str) -> Result<usize, Error>;
}
