//! # liveness-server
//!
//! Axum `WebSocket` transport for the liveness subsystem.
//!
//! - `GET /ws`: echo sessions whose inactivity deadline is owned here and
//!   re-armed through [`liveness_core::ConnectionLifecycle`]
//! - `GET /health` and `GET /metrics`
//! - A [`LivenessScheduler`](liveness_core::LivenessScheduler) probing every
//!   connection with `WebSocket` Ping frames
//! - Graceful shutdown via `CancellationToken`

#![deny(unsafe_code)]

pub mod config;
pub mod deadline;
pub mod errors;
pub mod handler;
pub mod health;
pub mod metrics;
pub mod server;
pub mod session;
pub mod shutdown;
pub mod slots;
pub mod ws_connection;

pub use config::ServerConfig;
pub use deadline::Deadline;
pub use errors::ServerError;
pub use server::LivenessServer;
pub use shutdown::ShutdownCoordinator;
pub use slots::ConnectionSlots;
pub use ws_connection::WsConnection;
