//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     ResolvedConfiguration → Pin hostname → TLS → Auth mode
//!         → Access control → Bind listeners → Endpoint
//!
//! Shutdown (shutdown.rs):
//!     Endpoint::stop → Stop listeners → Drop runtime
//! ```
//!
//! # Design Decisions
//! - Ordered startup: listeners open last, after every setting is resolved
//! - Startup never retries and never rolls back a published hostname
//! - Shutdown is best effort and cannot fail

pub mod shutdown;
pub mod startup;

pub use shutdown::Endpoint;
pub use startup::{Orchestrator, StartupError};
