//! HTTP server configuration and request routing.
//!
//! Requests flow through middleware in order:
//! 1. Request ID generation
//! 2. Request/response logging
//! 3. Timeout enforcement
//! 4. Body size limit (webhook route only)
//! 5. Handler execution
//!
//! # Graceful Shutdown
//!
//! The server stops accepting connections on SIGINT or SIGTERM and lets
//! in-flight requests finish.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    extract::{DefaultBodyLimit, Request},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use encore_core::{
    events::MulticastEventHandler,
    time::{Clock, RealClock},
};
use encore_webhooks::{Dispatcher, EmailEventStorage, EventProcessor, StatusSync};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{info, warn};
use uuid::Uuid;

use crate::handlers;

/// Request handling limits for the webhook route.
#[derive(Debug, Clone)]
pub struct ApiSettings {
    /// Largest accepted webhook body in bytes.
    pub max_payload_bytes: usize,
    /// Provider signing secret; `None` skips verification.
    pub signing_secret: Option<String>,
    /// Allowed skew of the signature timestamp.
    pub signature_tolerance: Duration,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            max_payload_bytes: 256 * 1024,
            signing_secret: None,
            signature_tolerance: Duration::from_secs(300),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// Routes parsed webhooks to the event processor.
    pub dispatcher: Dispatcher,
    /// Storage used for correlation, persistence and health checks.
    pub storage: Arc<dyn EmailEventStorage>,
    /// Time source for signature windows, records and health timestamps.
    pub clock: Arc<dyn Clock>,
    /// Webhook route limits.
    pub settings: ApiSettings,
}

impl AppState {
    /// Wires the processing pipeline over `storage` with a real clock.
    ///
    /// Every recorded event also advances the owning email log status.
    pub fn new(storage: Arc<dyn EmailEventStorage>, settings: ApiSettings) -> Self {
        Self::with_clock(storage, Arc::new(RealClock::new()), settings)
    }

    /// Same as [`AppState::new`] with an explicit clock.
    pub fn with_clock(
        storage: Arc<dyn EmailEventStorage>,
        clock: Arc<dyn Clock>,
        settings: ApiSettings,
    ) -> Self {
        let mut subscribers = MulticastEventHandler::new();
        subscribers.add_subscriber(Arc::new(StatusSync::new(storage.clone())));

        let processor = EventProcessor::new(storage.clone())
            .with_clock(clock.clone())
            .with_subscriber(Arc::new(subscribers));

        Self { dispatcher: Dispatcher::new(processor), storage, clock, settings }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("dispatcher", &self.dispatcher)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

/// Creates the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
///
/// use encore_api::{create_router, ApiSettings, AppState};
/// use encore_webhooks::storage::mock::MockEmailEventStorage;
///
/// let state = AppState::new(Arc::new(MockEmailEventStorage::new()), ApiSettings::default());
/// let app = create_router(state);
/// ```
pub fn create_router(state: AppState) -> Router {
    let health_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/live", get(handlers::liveness_check));

    let webhook_routes = Router::new()
        .route("/webhooks/resend", post(handlers::ingest_resend_webhook))
        .layer(DefaultBodyLimit::max(state.settings.max_payload_bytes));

    Router::new()
        .merge(health_routes)
        .merge(webhook_routes)
        .layer(TimeoutLayer::new(state.settings.request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(inject_request_id))
        .with_state(state)
}

/// Middleware to inject request ID into all responses.
async fn inject_request_id(req: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();

    let mut req = req;
    req.extensions_mut().insert(request_id.clone());

    let mut response = next.run(req).await;

    if let Ok(header_value) = request_id.parse() {
        response.headers_mut().insert("X-Request-Id", header_value);
    }

    response
}

/// Starts the HTTP server with graceful shutdown support.
///
/// # Errors
///
/// Returns `std::io::Error` if the address cannot be bound.
pub async fn start_server(state: AppState, addr: SocketAddr) -> Result<(), std::io::Error> {
    let app = create_router(state);

    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    info!("HTTP server listening on {}", actual_addr);

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    info!("HTTP server stopped gracefully");
    Ok(())
}

/// Waits for shutdown signal (CTRL+C or SIGTERM).
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received CTRL+C, starting graceful shutdown");
        },
        () = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        },
    }

    warn!("Waiting for in-flight requests to complete");
}
