//! `LivenessServer`: Axum HTTP + `WebSocket` server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use chrono::{DateTime, Utc};
use liveness_core::{
    ConnectionId, ConnectionLifecycle, ConnectionRegistry, LivenessPolicy, LivenessScheduler,
};
use metrics::counter;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::errors::ServerError;
use crate::health::{self, HealthResponse};
use crate::metrics::WS_CONNECTIONS_REJECTED_TOTAL;
use crate::session::run_ws_session;
use crate::shutdown::ShutdownCoordinator;
use crate::slots::ConnectionSlots;

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Connection open/activity/close bookkeeping.
    pub lifecycle: ConnectionLifecycle,
    /// Probe scheduler.
    pub scheduler: Arc<LivenessScheduler>,
    /// Shutdown coordinator.
    pub shutdown: Arc<ShutdownCoordinator>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Reservations against `max_connections`.
    pub slots: Arc<ConnectionSlots>,
    /// Wall-clock start.
    pub started_at: DateTime<Utc>,
    /// Monotonic start.
    pub start_time: Instant,
    /// Prometheus handle for `/metrics`, if a recorder is installed.
    pub metrics_handle: Option<PrometheusHandle>,
}

/// The keepalive gateway server.
pub struct LivenessServer {
    state: AppState,
}

impl LivenessServer {
    /// Create a server. Nothing runs until [`listen`](Self::listen).
    pub fn new(
        config: ServerConfig,
        policy: LivenessPolicy,
        metrics_handle: Option<PrometheusHandle>,
    ) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let scheduler = Arc::new(LivenessScheduler::from_policy(registry.clone(), &policy));
        Self {
            state: AppState {
                lifecycle: ConnectionLifecycle::new(registry, policy),
                scheduler,
                shutdown: Arc::new(ShutdownCoordinator::new()),
                slots: Arc::new(ConnectionSlots::new(config.max_connections)),
                config: Arc::new(config),
                started_at: Utc::now(),
                start_time: Instant::now(),
                metrics_handle,
            },
        }
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/ws", get(ws_handler))
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Bind, start the probe scheduler and serve until shutdown.
    ///
    /// Returns the bound address and the HTTP server task. Both background
    /// tasks are also tracked by the shutdown coordinator.
    pub async fn listen(&self) -> Result<(SocketAddr, JoinHandle<()>), ServerError> {
        let addr = self.state.config.bind_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        let local_addr = listener.local_addr()?;

        let scheduler = self.state.scheduler.clone();
        let token = self.state.shutdown.token();
        self.state.shutdown.track(tokio::spawn(async move {
            let stopper = async {
                token.cancelled().await;
                let _ = scheduler.stop();
            };
            let (result, ()) = tokio::join!(scheduler.run(), stopper);
            if let Err(e) = result {
                warn!(error = %e, "probe scheduler did not start");
            }
        }));

        let router = self.router();
        let token = self.state.shutdown.token();
        let server = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router)
                .with_graceful_shutdown(token.cancelled_owned())
                .await
            {
                warn!(error = %e, "http server exited with error");
            }
        });
        // A second handle lets callers await the server while shutdown still
        // drains it.
        let (done_tx, done_rx) = tokio::sync::oneshot::channel::<()>();
        self.state.shutdown.track(tokio::spawn(async move {
            let _ = server.await;
            let _ = done_tx.send(());
        }));
        let handle = tokio::spawn(async move {
            let _ = done_rx.await;
        });

        info!(addr = %local_addr, "liveness server listening");
        Ok((local_addr, handle))
    }

    /// Stop accepting, close every session and wait for sessions and
    /// background tasks, up to the configured timeout.
    pub async fn shutdown(&self) -> bool {
        let timeout = self.state.config.shutdown_timeout;
        self.state.shutdown.graceful_shutdown(timeout).await
    }

    /// Connection bookkeeping.
    pub fn lifecycle(&self) -> &ConnectionLifecycle {
        &self.state.lifecycle
    }

    /// Live connections.
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        self.state.lifecycle.registry()
    }

    /// Probe scheduler.
    pub fn scheduler(&self) -> &Arc<LivenessScheduler> {
        &self.state.scheduler
    }

    /// Session slot reservations.
    pub fn slots(&self) -> &Arc<ConnectionSlots> {
        &self.state.slots
    }

    /// Shutdown coordinator.
    pub fn shutdown_coordinator(&self) -> &Arc<ShutdownCoordinator> {
        &self.state.shutdown
    }

    /// Server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.state.config
    }
}

/// GET /ws
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    if state.shutdown.is_shutting_down() {
        return (StatusCode::SERVICE_UNAVAILABLE, "shutting down").into_response();
    }
    let Some(slot) = state.slots.try_acquire() else {
        counter!(WS_CONNECTIONS_REJECTED_TOTAL).increment(1);
        warn!(limit = state.slots.limit(), "connection limit reached");
        return (StatusCode::SERVICE_UNAVAILABLE, "too many connections").into_response();
    };

    let id = ConnectionId::new();
    let lifecycle = state.lifecycle.clone();
    let capacity = state.config.send_queue_capacity;
    let token = state.shutdown.token();
    // Counted by graceful shutdown from here, even before the upgrade lands.
    let tracked = state.shutdown.session_token();
    ws.max_message_size(state.config.max_message_size)
        .on_upgrade(move |socket| async move {
            let _ = run_ws_session(socket, id, lifecycle, capacity, token).await;
            drop(slot);
            drop(tracked);
        })
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health::health_check(
        state.started_at,
        state.start_time,
        state.lifecycle.registry().len(),
        state.scheduler.state(),
        state.scheduler.sweeps(),
    ))
}

/// GET /metrics
async fn metrics_handler(State(state): State<AppState>) -> Response {
    match &state.metrics_handle {
        Some(handle) => handle.render().into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}
