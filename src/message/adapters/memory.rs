//! In-memory message store for tests and single-process deployments.

use crate::message::{
    domain::{
        AttemptWindow, Message, MessageId, MessagePage, MessageSort, MessageState, PageRequest,
        PagerCriteria, SortDirection, SortField, StateCounts, TypeFilter,
    },
    ports::{MessageStore, MessageStoreError, MessageStoreResult},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Thread-safe in-memory message store.
///
/// Messages created at the same instant keep their insertion order, which
/// makes oldest-first pickup deterministic.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMessageStore {
    state: Arc<RwLock<InMemoryStoreState>>,
}

#[derive(Debug, Default)]
struct InMemoryStoreState {
    messages: HashMap<MessageId, StoredMessage>,
    next_sequence: u64,
}

#[derive(Debug, Clone)]
struct StoredMessage {
    sequence: u64,
    message: Message,
}

impl InMemoryMessageStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored messages.
    ///
    /// # Errors
    ///
    /// Returns [`MessageStoreError::Persistence`] when the lock is poisoned.
    pub fn len(&self) -> MessageStoreResult<usize> {
        Ok(self.read()?.messages.len())
    }

    /// Returns `true` when the store holds no messages.
    ///
    /// # Errors
    ///
    /// Returns [`MessageStoreError::Persistence`] when the lock is poisoned.
    pub fn is_empty(&self) -> MessageStoreResult<bool> {
        Ok(self.len()? == 0)
    }

    fn read(&self) -> MessageStoreResult<std::sync::RwLockReadGuard<'_, InMemoryStoreState>> {
        self.state
            .read()
            .map_err(|err| MessageStoreError::persistence(std::io::Error::other(err.to_string())))
    }

    fn write(&self) -> MessageStoreResult<std::sync::RwLockWriteGuard<'_, InMemoryStoreState>> {
        self.state
            .write()
            .map_err(|err| MessageStoreError::persistence(std::io::Error::other(err.to_string())))
    }
}

/// Selects messages in `state` accepted by `filter` and `admit`, oldest first.
fn select_oldest<F>(
    state: &InMemoryStoreState,
    filter: &TypeFilter,
    wanted: MessageState,
    batch_size: usize,
    admit: F,
) -> Vec<Message>
where
    F: Fn(&Message) -> bool,
{
    let mut matches: Vec<&StoredMessage> = state
        .messages
        .values()
        .filter(|stored| stored.message.state() == wanted)
        .filter(|stored| filter.matches(stored.message.message_type()))
        .filter(|stored| admit(&stored.message))
        .collect();
    matches.sort_by(|a, b| {
        a.message
            .created_at()
            .cmp(&b.message.created_at())
            .then(a.sequence.cmp(&b.sequence))
    });
    matches
        .into_iter()
        .take(batch_size)
        .map(|stored| stored.message.clone())
        .collect()
}

fn compare_field(field: SortField, a: &Message, b: &Message) -> Ordering {
    match field {
        SortField::Type => a.message_type().cmp(b.message_type()),
        SortField::State => a.state().as_str().cmp(b.state().as_str()),
        SortField::RestartCount => a.restart_count().cmp(&b.restart_count()),
        SortField::CreatedAt => a.created_at().cmp(&b.created_at()),
        SortField::UpdatedAt => a.updated_at().cmp(&b.updated_at()),
        SortField::StartedAt => a.started_at().cmp(&b.started_at()),
        SortField::CompletedAt => a.completed_at().cmp(&b.completed_at()),
    }
}

fn compare_by_sort(sort: &MessageSort, a: &StoredMessage, b: &StoredMessage) -> Ordering {
    sort.keys()
        .iter()
        .map(|(field, direction)| {
            let ordering = compare_field(*field, &a.message, &b.message);
            match direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        })
        .find(|ordering| ordering.is_ne())
        .unwrap_or_else(|| a.sequence.cmp(&b.sequence))
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn save(&self, message: &Message) -> MessageStoreResult<()> {
        let mut state = self.write()?;
        let existing_sequence = state
            .messages
            .get(&message.id())
            .map(|stored| stored.sequence);
        let sequence = if let Some(sequence) = existing_sequence {
            sequence
        } else {
            let sequence = state.next_sequence;
            state.next_sequence = sequence.saturating_add(1);
            sequence
        };
        state.messages.insert(
            message.id(),
            StoredMessage {
                sequence,
                message: message.clone(),
            },
        );
        Ok(())
    }

    async fn find_by_id(&self, id: MessageId) -> MessageStoreResult<Option<Message>> {
        let state = self.read()?;
        Ok(state.messages.get(&id).map(|stored| stored.message.clone()))
    }

    async fn find_by_types(
        &self,
        filter: &TypeFilter,
        state: MessageState,
        batch_size: usize,
    ) -> MessageStoreResult<Vec<Message>> {
        let guard = self.read()?;
        Ok(select_oldest(&guard, filter, state, batch_size, |_| true))
    }

    async fn find_by_attempts(
        &self,
        filter: &TypeFilter,
        state: MessageState,
        batch_size: usize,
        window: &AttemptWindow,
    ) -> MessageStoreResult<Vec<Message>> {
        let guard = self.read()?;
        Ok(select_oldest(&guard, filter, state, batch_size, |message| {
            window.admits(message)
        }))
    }

    async fn count_states(&self) -> MessageStoreResult<StateCounts> {
        let state = self.read()?;
        Ok(state
            .messages
            .values()
            .map(|stored| (stored.message.state(), 1))
            .collect())
    }

    async fn cleanup(&self, completed_before: DateTime<Utc>) -> MessageStoreResult<u64> {
        let mut state = self.write()?;
        let before = state.messages.len();
        state.messages.retain(|_, stored| {
            let expired = stored.message.is_done()
                && stored
                    .message
                    .completed_at()
                    .is_some_and(|completed_at| completed_at < completed_before);
            !expired
        });
        let removed = before.saturating_sub(state.messages.len());
        Ok(u64::try_from(removed).unwrap_or(u64::MAX))
    }

    async fn get_pager(
        &self,
        criteria: &PagerCriteria,
        page: PageRequest,
        sort: &MessageSort,
    ) -> MessageStoreResult<MessagePage> {
        let state = self.read()?;
        let mut matches: Vec<&StoredMessage> = state
            .messages
            .values()
            .filter(|stored| criteria.matches(&stored.message))
            .collect();
        matches.sort_by(|a, b| compare_by_sort(sort, a, b));

        let total = u64::try_from(matches.len()).unwrap_or(u64::MAX);
        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(page.page_size()).unwrap_or(usize::MAX);
        let items = matches
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|stored| stored.message.clone())
            .collect();

        Ok(MessagePage {
            items,
            request: page,
            total,
        })
    }

    async fn claim(&self, id: MessageId, claimed_at: DateTime<Utc>) -> MessageStoreResult<bool> {
        let mut state = self.write()?;
        let stored = state
            .messages
            .get_mut(&id)
            .ok_or(MessageStoreError::NotFound(id))?;
        Ok(stored.message.mark_in_progress_at(claimed_at).is_ok())
    }
}

