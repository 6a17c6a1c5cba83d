use crate::{Broker, EnqueueOptions, Error, Message, MAX_DELIVERY_ATTEMPTS};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use uuid::Uuid;

struct InFlight {
    message: Message,
    deadline: i64,
}

#[derive(Default)]
struct QueueState {
    ready: VecDeque<Message>,
    delayed: Vec<(i64, Message)>,
    in_flight: HashMap<String, InFlight>,
    dead_letters: Vec<Message>,
}

impl QueueState {
    /// Moves any delayed or expired in-flight messages back onto the ready
    /// queue. Must run before every enqueue/dequeue so `depth` and
    /// `dequeue` observe a consistent view.
    fn promote_due(&mut self, now: i64) {
        let mut still_delayed = Vec::with_capacity(self.delayed.len());
        for (visible_at, msg) in self.delayed.drain(..) {
            if visible_at <= now {
                self.ready.push_back(msg);
            } else {
                still_delayed.push((visible_at, msg));
            }
        }
        self.delayed = still_delayed;

        let expired: Vec<String> = self
            .in_flight
            .iter()
            .filter(|(_, f)| f.deadline <= now)
            .map(|(id, _)| id.clone())
            .collect();
        for id in expired {
            if let Some(flight) = self.in_flight.remove(&id) {
                let mut msg = flight.message;
                msg.attempt += 1;
                if msg.attempt > MAX_DELIVERY_ATTEMPTS {
                    tracing::warn!(broker_id = %msg.broker_id, queue = %msg.queue, "visibility timeout exhausted retries, dead-lettering");
                    self.dead_letters.push(msg);
                } else {
                    tracing::debug!(broker_id = %msg.broker_id, queue = %msg.queue, attempt = msg.attempt, "visibility timeout expired, redelivering");
                    self.ready.push_back(msg);
                }
            }
        }
    }
}

/// Deterministic, single-process broker used by workers in tests and local
/// development (§4.4/§4.9). Visibility-timeout redelivery and
/// dead-lettering after `MAX_DELIVERY_ATTEMPTS` mirror the contract a
/// production queue (SQS, etc.) is expected to provide.
#[derive(Default)]
pub struct InMemoryBroker {
    queues: Mutex<HashMap<String, QueueState>>,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Broker for InMemoryBroker {
    async fn enqueue(&self, queue: &str, task_name: &str, payload: serde_json::Value, opts: EnqueueOptions, now: i64) -> Result<String, Error> {
        let broker_id = Uuid::new_v4().to_string();
        let message = Message {
            broker_id: broker_id.clone(),
            queue: queue.to_string(),
            task_name: task_name.to_string(),
            payload,
            attempt: 0,
            visibility_deadline: now,
        };

        let mut queues = self.queues.lock();
        let state = queues.entry(queue.to_string()).or_default();
        state.promote_due(now);
        if opts.delay.is_zero() {
            state.ready.push_back(message);
        } else {
            state.delayed.push((now + opts.delay.as_secs() as i64, message));
        }
        Ok(broker_id)
    }

    async fn dequeue(&self, queues: &[String], max: usize, visibility_timeout: Duration, now: i64) -> Result<Vec<Message>, Error> {
        let mut out = Vec::with_capacity(max);
        let mut guard = self.queues.lock();
        for queue in queues {
            if out.len() >= max {
                break;
            }
            let state = guard.entry(queue.clone()).or_default();
            state.promote_due(now);
            while out.len() < max {
                let Some(mut msg) = state.ready.pop_front() else { break };
                msg.attempt += 1;
                msg.visibility_deadline = now + visibility_timeout.as_secs() as i64;
                state.in_flight.insert(
                    msg.broker_id.clone(),
                    InFlight { message: msg.clone(), deadline: msg.visibility_deadline },
                );
                out.push(msg);
            }
        }
        Ok(out)
    }

    async fn ack(&self, msg: &Message) -> Result<(), Error> {
        let mut guard = self.queues.lock();
        let state = guard.get_mut(&msg.queue).ok_or_else(|| Error::UnknownQueue(msg.queue.clone()))?;
        state
            .in_flight
            .remove(&msg.broker_id)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(msg.broker_id.clone()))
    }

    async fn nack(&self, msg: &Message, delay: Duration, now: i64) -> Result<(), Error> {
        let mut guard = self.queues.lock();
        let state = guard.get_mut(&msg.queue).ok_or_else(|| Error::UnknownQueue(msg.queue.clone()))?;
        state.in_flight.remove(&msg.broker_id).ok_or_else(|| Error::NotFound(msg.broker_id.clone()))?;

        if msg.attempt >= MAX_DELIVERY_ATTEMPTS {
            tracing::warn!(broker_id = %msg.broker_id, queue = %msg.queue, attempt = msg.attempt, "nack exhausted retries, dead-lettering");
            state.dead_letters.push(msg.clone());
            return Ok(());
        }
        if delay.is_zero() {
            state.ready.push_back(msg.clone());
        } else {
            state.delayed.push((now + delay.as_secs() as i64, msg.clone()));
        }
        Ok(())
    }

    async fn dead_letters(&self, queue: &str) -> Result<Vec<Message>, Error> {
        let guard = self.queues.lock();
        Ok(guard.get(queue).map(|s| s.dead_letters.clone()).unwrap_or_default())
    }

    async fn depth(&self, queue: &str) -> Result<usize, Error> {
        let mut guard = self.queues.lock();
        let state = guard.entry(queue.to_string()).or_default();
        Ok(state.ready.len() + state.delayed.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn enqueue_then_dequeue_round_trips_payload() {
        let broker = InMemoryBroker::new();
        broker
            .enqueue("jobs", "extract-problem", serde_json::json!({"id": 1}), EnqueueOptions::default(), 1000)
            .await
            .unwrap();

        let msgs = broker.dequeue(&["jobs".to_string()], 10, Duration::from_secs(600), 1000).await.unwrap();
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].task_name, "extract-problem");
        assert_eq!(msgs[0].attempt, 1);
    }

    #[tokio::test]
    async fn ack_removes_message_permanently() {
        let broker = InMemoryBroker::new();
        broker.enqueue("jobs", "t", serde_json::Value::Null, EnqueueOptions::default(), 0).await.unwrap();
        let msgs = broker.dequeue(&["jobs".to_string()], 1, Duration::from_secs(60), 0).await.unwrap();
        broker.ack(&msgs[0]).await.unwrap();

        assert_eq!(broker.depth("jobs").await.unwrap(), 0);
        assert!(broker.dequeue(&["jobs".to_string()], 1, Duration::from_secs(60), 100).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn nack_with_delay_is_invisible_until_delay_elapses() {
        let broker = InMemoryBroker::new();
        broker.enqueue("jobs", "t", serde_json::Value::Null, EnqueueOptions::default(), 0).await.unwrap();
        let msgs = broker.dequeue(&["jobs".to_string()], 1, Duration::from_secs(60), 0).await.unwrap();
        broker.nack(&msgs[0], Duration::from_secs(30), 0).await.unwrap();

        assert!(broker.dequeue(&["jobs".to_string()], 1, Duration::from_secs(60), 10).await.unwrap().is_empty());
        let redelivered = broker.dequeue(&["jobs".to_string()], 1, Duration::from_secs(60), 31).await.unwrap();
        assert_eq!(redelivered.len(), 1);
        assert_eq!(redelivered[0].attempt, 2);
    }

    #[tokio::test]
    async fn expired_visibility_timeout_redelivers_automatically() {
        let broker = InMemoryBroker::new();
        broker.enqueue("ai", "t", serde_json::Value::Null, EnqueueOptions::default(), 0).await.unwrap();
        let first = broker.dequeue(&["ai".to_string()], 1, Duration::from_secs(10), 0).await.unwrap();
        assert_eq!(first[0].attempt, 1);

        // No ack/nack: once the visibility window lapses the message comes back.
        let redelivered = broker.dequeue(&["ai".to_string()], 1, Duration::from_secs(10), 11).await.unwrap();
        assert_eq!(redelivered.len(), 1);
        assert_eq!(redelivered[0].attempt, 2);
    }

    #[tokio::test]
    async fn exhausting_retries_dead_letters_instead_of_requeueing() {
        let broker = InMemoryBroker::new();
        broker.enqueue("jobs", "t", serde_json::Value::Null, EnqueueOptions::default(), 0).await.unwrap();

        let mut now = 0i64;
        for _ in 0..MAX_DELIVERY_ATTEMPTS {
            let msgs = broker.dequeue(&["jobs".to_string()], 1, Duration::from_secs(5), now).await.unwrap();
            assert_eq!(msgs.len(), 1);
            broker.nack(&msgs[0], Duration::ZERO, now).await.unwrap();
            now += 1;
        }

        assert!(broker.dequeue(&["jobs".to_string()], 1, Duration::from_secs(5), now).await.unwrap().is_empty());
        let dead = broker.dead_letters("jobs").await.unwrap();
        assert_eq!(dead.len(), 1);
    }

    #[tokio::test]
    async fn dequeue_drains_multiple_queues_up_to_max() {
        let broker = InMemoryBroker::new();
        broker.enqueue("jobs", "a", serde_json::Value::Null, EnqueueOptions::default(), 0).await.unwrap();
        broker.enqueue("ai", "b", serde_json::Value::Null, EnqueueOptions::default(), 0).await.unwrap();

        let msgs = broker
            .dequeue(&["jobs".to_string(), "ai".to_string()], 10, Duration::from_secs(60), 0)
            .await
            .unwrap();
        assert_eq!(msgs.len(), 2);
    }
}
