//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber for the binaries
//! - Honor `RUST_LOG` over the command-line level
//!
//! # Design Decisions
//! - Library code only emits `tracing` events; installing a subscriber is
//!   left to the process that embeds the agent

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter applied when neither `RUST_LOG` nor a level is given.
pub const DEFAULT_FILTER: &str = "mgmt_agent=info,tower_http=info";

/// Install the global subscriber. A second call is a no-op.
pub fn init(level: Option<&str>) {
    let fallback = match level {
        Some(level) => format!("mgmt_agent={level},tower_http={level}"),
        None => DEFAULT_FILTER.to_string(),
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
