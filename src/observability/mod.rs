//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! config, lifecycle, connector:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (connector counters)
//! ```
//!
//! # Design Decisions
//! - Structured fields over formatted messages
//! - Secrets never appear in events; credentials are logged by outcome only

pub mod logging;
pub mod metrics;
