//! Configuration resolution subsystem.
//!
//! # Data Flow
//! ```text
//! process environment (Properties::from_env)
//!     → config file (Source::File or a redirect key, merged on discovery)
//!     → inline agent arguments (Properties::parse_args)
//!     → builder.rs (well-known keys, then bean setter table)
//!     → ResolvedConfiguration (validated, immutable)
//!     → handed to the startup orchestrator
//! ```
//!
//! # Design Decisions
//! - Last write wins per field; the only cross-field effects are the
//!   hostname re-resolution and the `authenticate=false` cascade
//! - Bean-style keys go through a fixed table of setters, never free lookup
//! - Raw strings are kept until `build`, where parsing errors surface

pub mod builder;
pub mod keys;
pub mod loader;
pub mod properties;
pub mod schema;

pub use builder::ConfigBuilder;
pub use loader::{resolve, ConfigError, Source};
pub use properties::Properties;
pub use schema::{AuthMode, PolicyBinding, Protocol, ResolvedConfiguration};
