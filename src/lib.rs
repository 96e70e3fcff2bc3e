//! Postmaster: durable, at-least-once job dispatch.
//!
//! Producers publish typed messages to a backend. A consumer loop pulls
//! them back out, hands each one to the consumers registered for its type,
//! and records the outcome on the message's state machine.
//!
//! # Architecture
//!
//! Postmaster follows hexagonal architecture principles:
//!
//! - **Domain**: the message state machine, free of infrastructure
//! - **Ports**: store, broker, iterator, and backend traits
//! - **Adapters**: in-memory and `PostgreSQL` stores, an in-memory broker
//!
//! # Modules
//!
//! - [`message`]: message model, persistence port, and lifecycle service
//! - [`dispatch`]: consumers and the per-type handler registry
//! - [`queue`]: broker port and wire envelope
//! - [`iterator`]: message sources pulled by the consumer loop
//! - [`backend`]: publish and handle strategies
//! - [`consumer`]: the long-running consumer loop
//! - [`config`]: JSON configuration
//! - [`telemetry`]: tracing subscriber setup

pub mod backend;
pub mod config;
pub mod consumer;
pub mod dispatch;
pub mod iterator;
pub mod message;
pub mod queue;
pub mod telemetry;
