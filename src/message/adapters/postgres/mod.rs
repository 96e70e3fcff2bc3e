//! `PostgreSQL` adapter for the message store.
//!
//! The table definition lives in `migrations/`; the Diesel schema in
//! [`schema`] mirrors it.

mod models;
mod queries;
mod repository;
pub mod schema;

pub use repository::{MessagePgPool, PostgresMessageStore};
