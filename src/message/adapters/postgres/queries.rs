//! Query builders for the `messages` table.
//!
//! Kept free of connections so the generated SQL can be inspected with
//! [`diesel::debug_query`].

use super::schema::messages;
use crate::message::domain::{
    AttemptWindow, MessageSort, MessageState, PageRequest, PagerCriteria, SortDirection,
    SortField, TypeFilter,
};
use diesel::dsl::count_star;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::sql_types::BigInt;

/// Boxed select over every message column.
pub(super) type MessageQuery = messages::BoxedQuery<'static, Pg>;

/// Boxed `COUNT(*)` over the messages table.
pub(super) type MessageCountQuery = messages::BoxedQuery<'static, Pg, BigInt>;

/// Messages in `state` accepted by `filter`, oldest first.
///
/// Equal timestamps are ordered by id so repeated polls agree.
pub(super) fn state_query(filter: &TypeFilter, state: MessageState, batch_size: usize) -> MessageQuery {
    let mut query = messages::table
        .filter(messages::state.eq(state.as_str()))
        .into_boxed();

    if !filter.include().is_empty() {
        query = query.filter(messages::message_type.eq_any(filter.include().to_vec()));
    }
    if !filter.exclude().is_empty() {
        query = query.filter(messages::message_type.ne_all(filter.exclude().to_vec()));
    }

    query
        .order(messages::created_at.asc())
        .then_order_by(messages::id.asc())
        .limit(i64::try_from(batch_size).unwrap_or(i64::MAX))
}

/// [`state_query`] restricted to the retry window.
pub(super) fn attempts_query(
    filter: &TypeFilter,
    state: MessageState,
    batch_size: usize,
    window: &AttemptWindow,
) -> MessageQuery {
    let mut query = state_query(filter, state, batch_size);
    if let Some(max_attempts) = window.max_attempts {
        let cap = i32::try_from(max_attempts).unwrap_or(i32::MAX);
        query = query.filter(messages::restart_count.lt(cap));
    }
    query.filter(messages::updated_at.lt(window.updated_before))
}

/// One page of messages matching `criteria`.
pub(super) fn pager_query(
    criteria: &PagerCriteria,
    page: PageRequest,
    sort: &MessageSort,
) -> MessageQuery {
    let mut query = messages::table.into_boxed();
    if let Some(message_type) = &criteria.message_type {
        query = query.filter(messages::message_type.eq(message_type.clone()));
    }
    if let Some(state) = criteria.state {
        query = query.filter(messages::state.eq(state.as_str()));
    }
    for (field, direction) in sort.keys() {
        query = order_by_key(query, *field, *direction);
    }

    query
        .then_order_by(messages::id.asc())
        .offset(i64::try_from(page.offset()).unwrap_or(i64::MAX))
        .limit(i64::from(page.page_size()))
}

/// Total number of messages matching `criteria`.
pub(super) fn pager_count_query(criteria: &PagerCriteria) -> MessageCountQuery {
    let mut query = messages::table.select(count_star()).into_boxed();
    if let Some(message_type) = &criteria.message_type {
        query = query.filter(messages::message_type.eq(message_type.clone()));
    }
    if let Some(state) = criteria.state {
        query = query.filter(messages::state.eq(state.as_str()));
    }
    query
}

fn order_by_key(query: MessageQuery, field: SortField, direction: SortDirection) -> MessageQuery {
    macro_rules! ordered {
        ($column:expr) => {
            match direction {
                SortDirection::Asc => query.then_order_by($column.asc()),
                SortDirection::Desc => query.then_order_by($column.desc()),
            }
        };
    }

    match field {
        SortField::Type => ordered!(messages::message_type),
        SortField::State => ordered!(messages::state),
        SortField::RestartCount => ordered!(messages::restart_count),
        SortField::CreatedAt => ordered!(messages::created_at),
        SortField::UpdatedAt => ordered!(messages::updated_at),
        SortField::StartedAt => ordered!(messages::started_at),
        SortField::CompletedAt => ordered!(messages::completed_at),
    }
}

#[cfg(test)]
#[path = "queries_tests.rs"]
mod tests;
