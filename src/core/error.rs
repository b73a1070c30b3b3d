use thiserror::Error;

/// Errors raised by the queue store.
///
/// An unbounded store never produces one of these; an empty queue is reported
/// as `None` from `dequeue`, not as an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("queue '{queue_id}' is full (capacity {capacity})")]
    Full { queue_id: String, capacity: usize },
}
