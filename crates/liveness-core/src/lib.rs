//! # liveness-core
//!
//! Heartbeat-based failure detection for long-lived bidirectional connections.
//!
//! - **Registry**: [`ConnectionRegistry`], the set of live connection handles
//! - **Scheduler**: [`LivenessScheduler`], periodic probe sweeps over the registry
//! - **Lifecycle**: [`ConnectionLifecycle`], deadline re-arm on activity and
//!   removal on transport-reported close
//! - **Transport seam**: the [`Connection`] trait implemented by whatever owns
//!   the sockets
//!
//! The transport owns every connection's inactivity deadline. This crate only
//! asks for re-arms and never closes anything itself.

#![deny(unsafe_code)]

pub mod connection;
pub mod errors;
pub mod ids;
pub mod lifecycle;
pub mod logging;
pub mod metrics;
pub mod policy;
pub mod registry;
pub mod scheduler;

pub use connection::{CloseCause, Connection};
pub use errors::{LivenessError, SchedulerError, TransportError};
pub use ids::ConnectionId;
pub use lifecycle::ConnectionLifecycle;
pub use policy::LivenessPolicy;
pub use registry::ConnectionRegistry;
pub use scheduler::{LivenessScheduler, SchedulerState, SweepReport};
