//! Diesel row models for message persistence.

use super::schema::messages;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;

/// Query result and insert row for message records.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = messages)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct MessageRow {
    /// Message identifier.
    pub id: uuid::Uuid,
    /// Routing type.
    pub message_type: String,
    /// Producer payload.
    pub body: Value,
    /// Lifecycle state.
    pub state: String,
    /// Restart count.
    pub restart_count: i32,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Latest state change timestamp.
    pub updated_at: DateTime<Utc>,
    /// Claim timestamp.
    pub started_at: Option<DateTime<Utc>>,
    /// Completion timestamp.
    pub completed_at: Option<DateTime<Utc>>,
}

/// Update model applied when saving a message that already exists.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = messages)]
#[diesel(treat_none_as_null = true)]
pub struct MessageChangeset {
    /// Routing type.
    pub message_type: String,
    /// Producer payload.
    pub body: Value,
    /// Lifecycle state.
    pub state: String,
    /// Restart count.
    pub restart_count: i32,
    /// Latest state change timestamp.
    pub updated_at: DateTime<Utc>,
    /// Claim timestamp.
    pub started_at: Option<DateTime<Utc>>,
    /// Completion timestamp.
    pub completed_at: Option<DateTime<Utc>>,
}
