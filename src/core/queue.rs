//! QueueStore owns every named queue behind one store-wide lock.
//!
//! A single `Mutex` guards the whole map rather than one lock per queue. Lock
//! hold time is an append or a pop on a `VecDeque`, so contention stays low at
//! the scale this store targets. Queues are created on first enqueue and are
//! never removed, so memory grows with the number of distinct queue IDs.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::core::error::QueueError;
use crate::core::message::Message;

type Queues = HashMap<String, VecDeque<Message>>;

#[derive(Debug, Default)]
pub struct QueueStore {
    queues: Mutex<Queues>,
    /// Per-queue message limit. `None` means unbounded.
    capacity: Option<usize>,
}

impl QueueStore {
    /// Creates an empty, unbounded store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store whose queues each hold at most `capacity` messages.
    /// A capacity of zero means unbounded.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            queues: Mutex::new(HashMap::new()),
            capacity: (capacity > 0).then_some(capacity),
        }
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Appends `message` to the tail of `queue_id`, creating the queue if needed.
    ///
    /// Callers must pass a non-empty `queue_id`. Fails only when the store is
    /// bounded and the queue is already at capacity; nothing is stored then.
    pub fn enqueue(&self, queue_id: &str, message: Message) -> Result<(), QueueError> {
        let mut queues = self.lock();

        if let Some(capacity) = self.capacity {
            let depth = queues.get(queue_id).map_or(0, VecDeque::len);
            if depth >= capacity {
                return Err(QueueError::Full {
                    queue_id: queue_id.to_string(),
                    capacity,
                });
            }
        }

        let queue = queues.entry(queue_id.to_string()).or_default();
        queue.push_back(message);
        debug!(queue_id, depth = queue.len(), "enqueued message");
        Ok(())
    }

    /// Removes and returns the head of `queue_id`.
    ///
    /// Returns `None` immediately when the queue is empty or was never
    /// created; it never waits for a message to arrive.
    pub fn dequeue(&self, queue_id: &str) -> Option<Message> {
        let mut queues = self.lock();
        let queue = queues.get_mut(queue_id)?;
        let message = queue.pop_front();
        if message.is_some() {
            debug!(queue_id, depth = queue.len(), "dequeued message");
        }
        message
    }

    /// Number of messages waiting in `queue_id`.
    pub fn len(&self, queue_id: &str) -> usize {
        self.lock().get(queue_id).map_or(0, VecDeque::len)
    }

    pub fn is_empty(&self, queue_id: &str) -> bool {
        self.len(queue_id) == 0
    }

    /// Number of queue IDs ever enqueued to, drained or not.
    pub fn queue_count(&self) -> usize {
        self.lock().len()
    }

    // Every critical section leaves the map consistent, so a panic in another
    // holder cannot corrupt it and the poisoned guard is safe to reuse.
    fn lock(&self) -> MutexGuard<'_, Queues> {
        self.queues.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
