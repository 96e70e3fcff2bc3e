//! Iterator over a fixed snapshot of messages.

use super::{IteratorResult, MessageIterator};
use crate::message::domain::Message;
use async_trait::async_trait;
use std::collections::VecDeque;

/// Yields a snapshot in order, then `None`.
#[derive(Debug, Clone, Default)]
pub struct BufferedMessageIterator {
    messages: VecDeque<Message>,
}

impl BufferedMessageIterator {
    /// Creates an iterator over `messages`.
    #[must_use]
    pub fn new(messages: impl IntoIterator<Item = Message>) -> Self {
        Self {
            messages: messages.into_iter().collect(),
        }
    }

    /// Returns the number of messages left.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns `true` when the snapshot is exhausted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[async_trait]
impl MessageIterator for BufferedMessageIterator {
    async fn next_message(&mut self) -> IteratorResult<Option<Message>> {
        Ok(self.messages.pop_front())
    }

    fn is_buffer_empty(&self) -> bool {
        self.messages.is_empty()
    }

    fn is_finite(&self) -> bool {
        true
    }
}
