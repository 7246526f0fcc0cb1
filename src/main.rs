//! Remote management agent.
//!
//! Starts a management endpoint for this process and serves it until Ctrl-C.
//!
//! # Architecture Overview
//!
//! ```text
//!   process env ─┐
//!   --config ────┼─▶ config resolver ─▶ ResolvedConfiguration
//!   --args ──────┘                              │
//!                                               ▼
//!                                     startup orchestrator
//!                            (hostname, TLS, auth, access control)
//!                                               │
//!                     ┌─────────────────────────┴──────────┐
//!                     ▼                                    ▼
//!             registry listener ──── lookup ────▶  connector (HTTP)
//!                                                          │
//!                                                          ▼
//!                                               management server
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use mgmt_agent::agent::{self, AgentContext};
use mgmt_agent::config::{Properties, Source};
use mgmt_agent::management::LocalRegistry;
use mgmt_agent::observability;
use mgmt_agent::security::policy::PolicyFile;

#[derive(Parser)]
#[command(name = "mgmt-agent", version)]
#[command(about = "Remote management agent", long_about = None)]
struct Cli {
    /// Inline agent arguments: `key=value` pairs separated by the path-list separator
    #[arg(short, long)]
    args: Option<String>,

    /// Configuration file applied after the process environment
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Login policy file that named policies are resolved against
    #[arg(long)]
    policy_source: Option<PathBuf>,

    /// Log level when RUST_LOG is unset
    #[arg(long)]
    log_level: Option<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    observability::logging::init(cli.log_level.as_deref());
    observability::metrics::describe();

    tracing::info!("mgmt-agent v{} starting", env!("CARGO_PKG_VERSION"));

    let mut ctx = AgentContext::new(Arc::new(LocalRegistry::platform()));
    if let Some(path) = &cli.policy_source {
        ctx = ctx.with_default_login_policy(Arc::new(PolicyFile::load(path)?));
    }
    if agent::install(ctx).is_err() {
        return Err("agent context already installed".into());
    }

    let mut sources = vec![Source::Properties(Properties::from_env())];
    if let Some(path) = cli.config {
        sources.push(Source::File(path));
    }
    if let Some(args) = &cli.args {
        sources.push(Source::Properties(Properties::parse_args(args)));
    }

    let url = match agent::global().activate_with(&sources) {
        Ok(url) => url,
        Err(e) => {
            tracing::error!(error = %e, "Management agent activation failed");
            return Err(e.into());
        }
    };
    tracing::info!(url = %url, "Serving until interrupted");

    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?
        .block_on(tokio::signal::ctrl_c())?;

    tracing::info!("Shutdown signal received");
    agent::shutdown();
    tracing::info!("Shutdown complete");
    Ok(())
}
