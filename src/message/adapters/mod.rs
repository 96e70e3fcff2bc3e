//! Store adapters for the message module.
//!
//! # Available Adapters
//!
//! - [`memory::InMemoryMessageStore`]: thread-safe in-process storage for
//!   tests and single-process deployments
//! - [`postgres::PostgresMessageStore`]: durable `PostgreSQL` storage using
//!   Diesel

pub mod memory;
pub mod postgres;
