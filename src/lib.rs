//! SimpleMQ – a minimal in-memory message queue served over HTTP.
//!
//! This crate exports
//!  * `core`   – messages and the lock-guarded queue store
//!  * `api`    – HTTP handlers, router and the `QueueService` lifecycle
//!  * `config` – layered TOML / environment / CLI configuration
//!
//! Producers `POST /messages/{queue_id}`; consumers `GET /messages/{queue_id}`
//! and receive the oldest unconsumed payload, or 404 when there is none.
//! Nothing is persisted across restarts.

// ───────────────────────────────────────────────────────────
// Public modules
// ───────────────────────────────────────────────────────────
pub mod api;
pub mod config;
pub mod core;
pub mod logging;
pub mod signal;

// ───────────────────────────────────────────────────────────
// Re-exports
// ───────────────────────────────────────────────────────────
pub use api::{ApiConfig, QueueService, ServiceError, ServiceState};
pub use config::{Config, ConfigError, Overrides};
pub use crate::core::{Message, QueueError, QueueStore};
