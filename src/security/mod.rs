//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Connector request:
//!     → auth.rs (credentials → Subject via an Authenticator)
//!     → policy.rs (named login policies for policy authenticators)
//!     → access_control.rs (identity → access level → allow or deny)
//!     → Pass to the management server
//! ```
//!
//! # Design Decisions
//! - Fail closed: malformed credentials and unlisted identities are rejected
//! - Secrets are zeroed once checked
//! - Denial messages are stable text operators can match on

pub mod access_control;
pub mod auth;
pub mod policy;
