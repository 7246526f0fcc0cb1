//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Startup
//!     → resolve.rs (advertised host, local name lookups)
//!     → listener.rs (bind the wildcard interface)
//!     → tls.rs (optional rustls acceptor)
//!     → Hand off to the connector
//! ```
//!
//! # Design Decisions
//! - Listeners always bind the wildcard interface; the hostname only
//!   changes what is advertised
//! - TLS is optional and handled transparently by axum-server

pub mod listener;
pub mod resolve;
pub mod tls;
