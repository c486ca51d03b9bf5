//! Queue storage behind the broker.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

/// FIFO message storage shared by every broker connection.
pub trait MessageQueue: Send + Sync + 'static {
    /// Append a payload at the tail.
    fn push(&self, payload: String);

    /// Remove and return the oldest payload.
    fn pop(&self) -> Option<String>;

    /// Messages currently waiting.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Unbounded in-memory queue guarded by a single lock.
#[derive(Debug, Default)]
pub struct InMemoryQueue {
    messages: Mutex<VecDeque<String>>,
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MessageQueue for InMemoryQueue {
    fn push(&self, payload: String) {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(payload);
    }

    fn pop(&self) -> Option<String> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }

    fn len(&self) -> usize {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
