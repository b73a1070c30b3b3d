//! REST server, routing and listener lifecycle
//!
//! `QueueService` moves through `Created → Listening → ShuttingDown → Stopped`
//! and never returns to `Listening`. `start` drives the listener on the
//! calling task; `stop` may be called from any other task or thread.

use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use axum::{routing::post, serve, Router};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{error, info, Level};

use crate::api::handlers;
use crate::api::{ApiConfig, AppState};
use crate::core::queue::QueueStore;

/// Builds the queue router.
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route(
            "/messages/:queue_id",
            post(handlers::post_message).get(handlers::get_message),
        )
        // An empty queue segment never matches `:queue_id`; answer it explicitly.
        .route(
            "/messages/",
            post(handlers::post_message_without_id).get(handlers::get_message_without_id),
        )
        .route(
            "/messages",
            post(handlers::post_message_without_id).get(handlers::get_message_without_id),
        )
}

/// Router plus middleware, bound to `store`.
///
/// Body size and read time are enforced by the enqueue handler itself so that
/// both failures answer 422.
pub fn create_app(store: Arc<QueueStore>, config: &ApiConfig) -> Router {
    let app = create_router().with_state(AppState::new(store, config.clone()));

    if config.enable_tracing {
        // One span and one response line per request at the default `info` filter.
        app.layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
    } else {
        app
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Created,
    Listening,
    ShuttingDown,
    Stopped,
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),

    #[error("service already started")]
    AlreadyStarted,

    #[error("service has not been started")]
    NotStarted,

    #[error("service is not listening")]
    NotListening,

    #[error("shutdown did not complete within {0:?}")]
    ShutdownTimeout(Duration),
}

/// HTTP front end for a [`QueueStore`].
#[derive(Debug)]
pub struct QueueService {
    store: Arc<QueueStore>,
    config: ApiConfig,
    state: watch::Sender<ServiceState>,
    shutdown: watch::Sender<bool>,
    local_addr: OnceLock<SocketAddr>,
}

impl QueueService {
    pub fn new(store: Arc<QueueStore>, config: ApiConfig) -> Self {
        let (state, _) = watch::channel(ServiceState::Created);
        let (shutdown, _) = watch::channel(false);
        Self {
            store,
            config,
            state,
            shutdown,
            local_addr: OnceLock::new(),
        }
    }

    pub fn store(&self) -> &Arc<QueueStore> {
        &self.store
    }

    pub fn state(&self) -> ServiceState {
        *self.state.borrow()
    }

    /// Address the listener is bound to, once `start` has bound it.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr.get().copied()
    }

    /// Binds `addr` and serves requests until `stop` is called.
    ///
    /// Returns `Ok(())` when the listener was closed by `stop` and all
    /// in-flight requests drained. Bind and accept failures are returned as
    /// errors and leave the service `Stopped`.
    pub async fn start(&self, addr: &str) -> Result<(), ServiceError> {
        if self.state() != ServiceState::Created {
            return Err(ServiceError::AlreadyStarted);
        }

        let listener = match TcpListener::bind(addr).await {
            Ok(listener) => listener,
            Err(source) => {
                self.abandon_start();
                error!("failed to bind {}: {}", addr, source);
                return Err(ServiceError::Bind {
                    addr: addr.to_string(),
                    source,
                });
            }
        };
        let local_addr = match listener.local_addr() {
            Ok(local_addr) => local_addr,
            Err(e) => {
                self.abandon_start();
                return Err(ServiceError::Serve(e));
            }
        };

        let claimed = self.state.send_if_modified(|state| {
            if *state != ServiceState::Created {
                return false;
            }
            let _ = self.local_addr.set(local_addr);
            *state = ServiceState::Listening;
            true
        });
        if !claimed {
            return Err(ServiceError::AlreadyStarted);
        }

        info!("SimpleMQ listening on {}", local_addr);
        info!("  - Enqueue: POST http://{}/messages/{{queue_id}}", local_addr);
        info!("  - Dequeue: GET  http://{}/messages/{{queue_id}}", local_addr);

        let app = create_app(Arc::clone(&self.store), &self.config);
        let mut shutdown_rx = self.shutdown.subscribe();
        let result = serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.wait_for(|stop| *stop).await;
            })
            .await;

        self.state.send_replace(ServiceState::Stopped);

        match result {
            Ok(()) => {
                info!("SimpleMQ listener on {} closed", local_addr);
                Ok(())
            }
            Err(e) => {
                error!("SimpleMQ server on {} failed: {}", local_addr, e);
                Err(ServiceError::Serve(e))
            }
        }
    }

    /// Stops accepting connections and waits for in-flight requests.
    ///
    /// Fails with `NotStarted` before `start` has bound a listener, and with
    /// `ShutdownTimeout` if draining exceeds the configured shutdown timeout.
    /// Stopping an already stopped service succeeds.
    pub async fn stop(&self) -> Result<(), ServiceError> {
        let mut state_rx = self.state.subscribe();

        let mut not_started = false;
        self.state.send_if_modified(|state| match *state {
            ServiceState::Created => {
                not_started = true;
                false
            }
            ServiceState::Listening => {
                *state = ServiceState::ShuttingDown;
                true
            }
            ServiceState::ShuttingDown | ServiceState::Stopped => false,
        });
        if not_started {
            return Err(ServiceError::NotStarted);
        }

        info!("SimpleMQ shutting down");
        self.shutdown.send_replace(true);

        let timeout = self.config.shutdown_timeout;
        let drained = tokio::time::timeout(timeout, state_rx.wait_for(|s| *s == ServiceState::Stopped))
            .await
            .map(|_| ());

        match drained {
            Ok(()) => Ok(()),
            Err(_) => {
                error!("SimpleMQ shutdown timed out after {:?}", timeout);
                Err(ServiceError::ShutdownTimeout(timeout))
            }
        }
    }

    /// Resolves with the bound address once the service is listening.
    pub async fn wait_until_listening(&self) -> Result<SocketAddr, ServiceError> {
        let mut state_rx = self.state.subscribe();
        let state = match state_rx.wait_for(|s| *s != ServiceState::Created).await {
            Ok(state) => *state,
            Err(_) => return Err(ServiceError::NotListening),
        };

        match (state, self.local_addr()) {
            (ServiceState::Listening, Some(addr)) => Ok(addr),
            _ => Err(ServiceError::NotListening),
        }
    }

    // A start that never reached `Listening` ends the service.
    fn abandon_start(&self) {
        self.state.send_if_modified(|state| {
            if *state == ServiceState::Created {
                *state = ServiceState::Stopped;
                true
            } else {
                false
            }
        });
    }
}
