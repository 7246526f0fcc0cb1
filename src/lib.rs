//! Remote management agent.
//!
//! Resolves a management configuration from layered sources and starts a
//! management endpoint serving a [`management::ManagementServer`].

pub mod agent;
pub mod config;
pub mod connector;
pub mod lifecycle;
pub mod management;
pub mod net;
pub mod observability;
pub mod security;

pub use agent::{activate, shutdown, AgentContext};
pub use config::ResolvedConfiguration;
pub use lifecycle::{Endpoint, Orchestrator};
