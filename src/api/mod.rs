//! SimpleMQ HTTP interface
//!
//! Exposes the queue store over two routes:
//! - `POST /messages/:queue_id` enqueues the request body
//! - `GET /messages/:queue_id` dequeues the oldest message

pub mod handlers;
pub mod rest;

pub use handlers::ApiError;
pub use rest::{create_router, QueueService, ServiceError, ServiceState};

use std::sync::Arc;
use std::time::Duration;

use crate::core::queue::QueueStore;

/// HTTP layer configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub enable_tracing: bool,
    pub max_body_bytes: usize,
    /// Upper bound on reading one request body.
    pub request_timeout: Duration,
    pub shutdown_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enable_tracing: true,
            max_body_bytes: 1024 * 1024, // 1MB
            request_timeout: Duration::from_secs(30),
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

/// Shared state handed to every handler
#[derive(Debug, Clone)]
pub struct AppState {
    pub store: Arc<QueueStore>,
    pub config: ApiConfig,
}

impl AppState {
    pub fn new(store: Arc<QueueStore>, config: ApiConfig) -> Self {
        Self { store, config }
    }
}
