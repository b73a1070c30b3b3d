//! HTTP request handlers for SimpleMQ
//!
//! Each route handler is a thin extractor shell around `enqueue_into` /
//! `dequeue_from`, which carry the validation order and status mapping.

use axum::{
    body::{to_bytes, Body, Bytes},
    extract::{Path, State},
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, error, warn};

use crate::api::{ApiConfig, AppState};
use crate::core::error::QueueError;
use crate::core::message::Message;
use crate::core::queue::QueueStore;

/// API error types
///
/// The response body is the plain-text `Display` output, except for
/// `NoMessage`, which answers with an empty body.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("error queue_id is mandatory")]
    MissingQueueId,

    #[error("{0}")]
    UnreadableBody(String),

    #[error("body can not be empty")]
    EmptyBody,

    #[error(transparent)]
    QueueFull(#[from] QueueError),

    #[error("no message available")]
    NoMessage,

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MissingQueueId => StatusCode::BAD_REQUEST,
            ApiError::UnreadableBody(_) | ApiError::EmptyBody => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::QueueFull(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::NoMessage => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match &self {
            ApiError::NoMessage => {
                debug!("queue empty");
                return status.into_response();
            }
            ApiError::Internal(_) => error!("API error: {}", self),
            _ => warn!("API error: {}", self),
        }

        (status, self.to_string()).into_response()
    }
}

/// Buffers the request body, bounded by `max_body_bytes` and `request_timeout`.
///
/// Oversized, broken and slow bodies all surface as `UnreadableBody`.
pub async fn read_body(body: Body, config: &ApiConfig) -> Result<Bytes, ApiError> {
    match timeout(config.request_timeout, to_bytes(body, config.max_body_bytes)).await {
        Ok(Ok(bytes)) => Ok(bytes),
        Ok(Err(e)) => Err(ApiError::UnreadableBody(format!("failed to read body: {e}"))),
        Err(_) => Err(ApiError::UnreadableBody(format!(
            "timed out reading body after {:?}",
            config.request_timeout
        ))),
    }
}

/// Validates and stores one message.
///
/// Checks run in order: queue ID, body readability, body length. The body is
/// not read for a missing queue ID, and nothing touches the store until all
/// three pass.
pub async fn enqueue_into(state: &AppState, queue_id: &str, body: Body) -> Result<StatusCode, ApiError> {
    if queue_id.is_empty() {
        return Err(ApiError::MissingQueueId);
    }

    let payload = read_body(body, &state.config).await?;
    if payload.is_empty() {
        return Err(ApiError::EmptyBody);
    }

    state.store.enqueue(queue_id, Message::new(payload))?;
    Ok(StatusCode::CREATED)
}

/// Pops the oldest message of `queue_id` and renders it as JSON.
pub fn dequeue_from(store: &QueueStore, queue_id: &str) -> Result<Response, ApiError> {
    if queue_id.is_empty() {
        return Err(ApiError::MissingQueueId);
    }

    let message = store.dequeue(queue_id).ok_or(ApiError::NoMessage)?;
    let body = serde_json::to_vec(&message).map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok((StatusCode::OK, [(CONTENT_TYPE, "application/json")], body).into_response())
}

pub async fn post_message(
    State(state): State<AppState>,
    Path(queue_id): Path<String>,
    body: Body,
) -> Result<StatusCode, ApiError> {
    enqueue_into(&state, &queue_id, body).await
}

pub async fn get_message(
    State(state): State<AppState>,
    Path(queue_id): Path<String>,
) -> Result<Response, ApiError> {
    dequeue_from(&state.store, &queue_id)
}

/// `POST /messages/` with no queue segment.
pub async fn post_message_without_id(
    State(state): State<AppState>,
    body: Body,
) -> Result<StatusCode, ApiError> {
    enqueue_into(&state, "", body).await
}

/// `GET /messages/` with no queue segment.
pub async fn get_message_without_id(State(state): State<AppState>) -> Result<Response, ApiError> {
    dequeue_from(&state.store, "")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    fn state_with(store: QueueStore, config: ApiConfig) -> AppState {
        AppState::new(Arc::new(store), config)
    }

    fn state() -> AppState {
        state_with(QueueStore::new(), ApiConfig::default())
    }

    #[tokio::test]
    async fn missing_queue_id_is_checked_before_body() {
        let state = state();
        let err = enqueue_into(&state, "", Body::empty()).await.unwrap_err();
        assert!(matches!(err, ApiError::MissingQueueId));
        assert_eq!(state.store.queue_count(), 0);
    }

    #[tokio::test]
    async fn empty_body_is_rejected_without_creating_queue() {
        let state = state();
        let err = enqueue_into(&state, "orders", Body::empty()).await.unwrap_err();
        assert!(matches!(err, ApiError::EmptyBody));
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(state.store.queue_count(), 0);
    }

    #[tokio::test]
    async fn accepted_body_is_stored() {
        let state = state();
        let status = enqueue_into(&state, "orders", Body::from("order-1")).await.unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(state.store.dequeue("orders").unwrap().payload, "order-1");
    }

    #[tokio::test]
    async fn oversized_body_is_unreadable() {
        let config = ApiConfig {
            max_body_bytes: 4,
            ..ApiConfig::default()
        };
        let state = state_with(QueueStore::new(), config);
        let err = enqueue_into(&state, "orders", Body::from("too long")).await.unwrap_err();
        assert!(matches!(err, ApiError::UnreadableBody(_)));
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(state.store.is_empty("orders"));
    }

    #[tokio::test]
    async fn stalled_body_times_out_as_unreadable() {
        let config = ApiConfig {
            request_timeout: Duration::from_millis(50),
            ..ApiConfig::default()
        };
        let state = state_with(QueueStore::new(), config);

        // A stream that never yields stands in for a client that stops sending.
        let stalled = Body::from_stream(futures::stream::pending::<Result<Bytes, std::io::Error>>());
        let err = enqueue_into(&state, "orders", stalled).await.unwrap_err();

        match &err {
            ApiError::UnreadableBody(text) => assert!(text.starts_with("timed out reading body")),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(err.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(state.store.is_empty("orders"));
    }

    #[tokio::test]
    async fn full_queue_maps_to_service_unavailable() {
        let state = state_with(QueueStore::with_capacity(1), ApiConfig::default());
        enqueue_into(&state, "q", Body::from("a")).await.unwrap();
        let err = enqueue_into(&state, "q", Body::from("b")).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.to_string(), "queue 'q' is full (capacity 1)");
    }

    #[test]
    fn empty_queue_maps_to_not_found() {
        let store = QueueStore::new();
        let err = dequeue_from(&store, "orders").unwrap_err();
        assert!(matches!(err, ApiError::NoMessage));
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn dequeue_without_id_is_bad_request() {
        let store = QueueStore::new();
        store.enqueue("orders", Message::new("x")).unwrap();
        let err = dequeue_from(&store, "").unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(store.len("orders"), 1);
    }
}
