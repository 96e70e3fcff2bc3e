//! `PostgreSQL` store implementation for the message backlog.

use super::{
    models::{MessageChangeset, MessageRow},
    queries,
    schema::messages,
};
use crate::message::{
    domain::{
        AttemptWindow, Message, MessageBody, MessageId, MessagePage, MessageSort, MessageState,
        PageRequest, PagerCriteria, PersistedMessageData, StateCounts, TypeFilter,
    },
    ports::{MessageStore, MessageStoreError, MessageStoreResult},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::dsl::count_star;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};

/// `PostgreSQL` connection pool type used by the message store.
pub type MessagePgPool = Pool<ConnectionManager<PgConnection>>;

/// `PostgreSQL`-backed message store.
#[derive(Debug, Clone)]
pub struct PostgresMessageStore {
    pool: MessagePgPool,
}

impl PostgresMessageStore {
    /// Creates a new store from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: MessagePgPool) -> Self {
        Self { pool }
    }

    /// Builds a connection pool for `database_url` and wraps it in a store.
    ///
    /// # Errors
    ///
    /// Returns [`MessageStoreError::Persistence`] when the pool cannot be
    /// created.
    pub fn connect(database_url: &str) -> MessageStoreResult<Self> {
        let manager = ConnectionManager::<PgConnection>::new(database_url);
        let pool = Pool::builder()
            .build(manager)
            .map_err(MessageStoreError::persistence)?;
        Ok(Self::new(pool))
    }

    async fn run_blocking<F, T>(&self, f: F) -> MessageStoreResult<T>
    where
        F: FnOnce(&mut PgConnection) -> MessageStoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(MessageStoreError::persistence)?;
            f(&mut connection)
        })
        .await
        .map_err(MessageStoreError::persistence)?
    }
}

#[async_trait]
impl MessageStore for PostgresMessageStore {
    async fn save(&self, message: &Message) -> MessageStoreResult<()> {
        let row = to_row(message)?;
        let changeset = to_changeset(&row);

        self.run_blocking(move |connection| {
            diesel::insert_into(messages::table)
                .values(&row)
                .on_conflict(messages::id)
                .do_update()
                .set(&changeset)
                .execute(connection)
                .map_err(MessageStoreError::persistence)?;
            Ok(())
        })
        .await
    }

    async fn find_by_id(&self, id: MessageId) -> MessageStoreResult<Option<Message>> {
        self.run_blocking(move |connection| {
            let row = messages::table
                .filter(messages::id.eq(id.into_inner()))
                .select(MessageRow::as_select())
                .first::<MessageRow>(connection)
                .optional()
                .map_err(MessageStoreError::persistence)?;
            row.map(row_to_message).transpose()
        })
        .await
    }

    async fn find_by_types(
        &self,
        filter: &TypeFilter,
        state: MessageState,
        batch_size: usize,
    ) -> MessageStoreResult<Vec<Message>> {
        let query = queries::state_query(filter, state, batch_size);
        self.run_blocking(move |connection| load_messages(query, connection))
            .await
    }

    async fn find_by_attempts(
        &self,
        filter: &TypeFilter,
        state: MessageState,
        batch_size: usize,
        window: &AttemptWindow,
    ) -> MessageStoreResult<Vec<Message>> {
        let query = queries::attempts_query(filter, state, batch_size, window);
        self.run_blocking(move |connection| load_messages(query, connection))
            .await
    }

    async fn count_states(&self) -> MessageStoreResult<StateCounts> {
        self.run_blocking(|connection| {
            let rows = messages::table
                .group_by(messages::state)
                .select((messages::state, count_star()))
                .load::<(String, i64)>(connection)
                .map_err(MessageStoreError::persistence)?;

            let mut counts = StateCounts::new();
            for (persisted_state, count) in rows {
                let state = MessageState::try_from(persisted_state.as_str())
                    .map_err(MessageStoreError::persistence)?;
                counts.add(state, u64::try_from(count).unwrap_or_default());
            }
            Ok(counts)
        })
        .await
    }

    async fn cleanup(&self, completed_before: DateTime<Utc>) -> MessageStoreResult<u64> {
        self.run_blocking(move |connection| {
            let deleted = diesel::delete(
                messages::table
                    .filter(messages::state.eq(MessageState::Done.as_str()))
                    .filter(messages::completed_at.lt(completed_before)),
            )
            .execute(connection)
            .map_err(MessageStoreError::persistence)?;
            Ok(u64::try_from(deleted).unwrap_or(u64::MAX))
        })
        .await
    }

    async fn get_pager(
        &self,
        criteria: &PagerCriteria,
        page: PageRequest,
        sort: &MessageSort,
    ) -> MessageStoreResult<MessagePage> {
        let items_query = queries::pager_query(criteria, page, sort);
        let count_query = queries::pager_count_query(criteria);

        self.run_blocking(move |connection| {
            let total = count_query
                .get_result::<i64>(connection)
                .map_err(MessageStoreError::persistence)?;
            let items = load_messages(items_query, connection)?;
            Ok(MessagePage {
                items,
                request: page,
                total: u64::try_from(total).unwrap_or_default(),
            })
        })
        .await
    }

    async fn claim(&self, id: MessageId, claimed_at: DateTime<Utc>) -> MessageStoreResult<bool> {
        self.run_blocking(move |connection| {
            let updated = diesel::update(
                messages::table
                    .filter(messages::id.eq(id.into_inner()))
                    .filter(messages::state.eq(MessageState::Open.as_str())),
            )
            .set((
                messages::state.eq(MessageState::InProgress.as_str()),
                messages::updated_at.eq(claimed_at),
                messages::started_at.eq(Some(claimed_at)),
            ))
            .execute(connection)
            .map_err(MessageStoreError::persistence)?;
            Ok(updated == 1)
        })
        .await
    }
}

fn load_messages(
    query: queries::MessageQuery,
    connection: &mut PgConnection,
) -> MessageStoreResult<Vec<Message>> {
    query
        .load::<MessageRow>(connection)
        .map_err(MessageStoreError::persistence)?
        .into_iter()
        .map(row_to_message)
        .collect()
}

fn to_row(message: &Message) -> MessageStoreResult<MessageRow> {
    let restart_count =
        i32::try_from(message.restart_count()).map_err(MessageStoreError::persistence)?;
    Ok(MessageRow {
        id: message.id().into_inner(),
        message_type: message.message_type().to_owned(),
        body: message.body().clone().into_value(),
        state: message.state().as_str().to_owned(),
        restart_count,
        created_at: message.created_at(),
        updated_at: message.updated_at(),
        started_at: message.started_at(),
        completed_at: message.completed_at(),
    })
}

fn to_changeset(row: &MessageRow) -> MessageChangeset {
    MessageChangeset {
        message_type: row.message_type.clone(),
        body: row.body.clone(),
        state: row.state.clone(),
        restart_count: row.restart_count,
        updated_at: row.updated_at,
        started_at: row.started_at,
        completed_at: row.completed_at,
    }
}

fn row_to_message(row: MessageRow) -> MessageStoreResult<Message> {
    let MessageRow {
        id,
        message_type,
        body: persisted_body,
        state: persisted_state,
        restart_count: persisted_restart_count,
        created_at,
        updated_at,
        started_at,
        completed_at,
    } = row;

    let body = MessageBody::try_from(persisted_body).map_err(MessageStoreError::persistence)?;
    let state = MessageState::try_from(persisted_state.as_str())
        .map_err(MessageStoreError::persistence)?;
    let restart_count =
        u32::try_from(persisted_restart_count).map_err(MessageStoreError::persistence)?;

    Ok(Message::from_persisted(PersistedMessageData {
        id: MessageId::from_uuid(id),
        message_type,
        body,
        state,
        restart_count,
        created_at,
        updated_at,
        started_at,
        completed_at,
    }))
}
