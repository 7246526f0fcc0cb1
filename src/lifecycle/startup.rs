//! Startup orchestration.
//!
//! # Responsibilities
//! - Pin the advertised hostname before any listener opens
//! - Build the TLS acceptor and select the authentication mode
//! - Harden an unauthenticated endpoint when strict
//! - Bind listeners and begin accepting connections
//!
//! # Design Decisions
//! - Fail fast: the first error aborts startup and nothing keeps running
//! - The registry port is reserved before the connector is created
//! - The scratch access policy lives only for the duration of `start`

use std::io::Write;
use std::sync::Arc;

use tempfile::NamedTempFile;
use thiserror::Error;
use tokio::runtime::{Builder, Runtime};

use crate::agent::AgentContext;
use crate::config::{AuthMode, Protocol, ResolvedConfiguration};
use crate::connector::registry::RegistryServer;
use crate::connector::{ConnectorError, ConnectorServer, Environment, ServiceUrl};
use crate::lifecycle::shutdown::Endpoint;
use crate::management::{ManagementError, ManagementServer, ObjectName, SENSITIVE_ENTRIES};
use crate::net::listener::{Listener, ListenerError};
use crate::net::tls::{SecurityContext, TlsError};
use crate::security::access_control::BUNDLED_ACCESS_POLICY;
use crate::security::auth::{AnonymousAuthenticator, PolicyAuthenticator};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error("TLS setup failed: {0}")]
    Tls(#[from] TlsError),

    #[error(transparent)]
    Connector(#[from] ConnectorError),

    #[error("cannot write the default access policy: {0}")]
    AccessPolicy(#[source] std::io::Error),

    #[error("cannot start the endpoint runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

/// Turns a resolved configuration into a running endpoint.
pub struct Orchestrator;

impl Orchestrator {
    pub fn start(
        ctx: &AgentContext,
        config: ResolvedConfiguration,
        server: Arc<dyn ManagementServer>,
    ) -> Result<Endpoint, StartupError> {
        if let Some(hostname) = &config.hostname {
            ctx.address().publish(hostname);
        }

        let mut env = Environment::default();

        if config.with_ssl {
            let context = match &config.security_context {
                Some(context) => context.clone(),
                None => SecurityContext::self_signed(vec![ctx.address().advertised_host()])?,
            };
            env.tls = Some(context.server_config(config.client_authentication)?);
        }

        let mode = config.auth_mode();
        match mode {
            AuthMode::NamedPolicyWithSource => {
                if let (Some(name), Some(binding)) = (&config.login_policy, &config.policy_source) {
                    env.authenticator = Some(Arc::new(PolicyAuthenticator::new(
                        name.clone(),
                        Arc::clone(&binding.policy),
                    )));
                }
            }
            AuthMode::NamedPolicy => {
                env.login_config = config.login_policy.clone();
                env.default_login_policy = ctx.default_login_policy();
            }
            AuthMode::PasswordFile => env.password_file = config.password_file.clone(),
            AuthMode::None => {}
        }

        // Held until start returns; the file is removed when dropped.
        let mut scratch: Option<NamedTempFile> = None;
        if mode != AuthMode::None {
            env.access_file = config.access_file.clone();
        } else if config.strict {
            harden(server.as_ref());
            let file = write_default_policy()?;
            env.access_file = Some(file.path().to_path_buf());
            env.authenticator = Some(Arc::new(AnonymousAuthenticator));
            scratch = Some(file);
        }

        tracing::debug!(
            protocol = %config.protocol,
            port = config.port,
            auth_mode = ?mode,
            strict = config.strict,
            tls = config.with_ssl,
            "Starting endpoint"
        );

        let endpoint = activate(ctx, &config, env, server);
        drop(scratch);
        endpoint
    }
}

/// Remove entries that expose code execution or heap contents.
fn harden(server: &dyn ManagementServer) {
    for name in SENSITIVE_ENTRIES {
        let Ok(name) = name.parse::<ObjectName>() else { continue };
        match server.unregister(&name) {
            Ok(()) => tracing::debug!(entry = %name, "Unregistered sensitive entry"),
            Err(ManagementError::NotFound(_)) => {}
            Err(e) => tracing::warn!(entry = %name, error = %e, "Cannot unregister entry"),
        }
    }
}

fn write_default_policy() -> Result<NamedTempFile, StartupError> {
    let mut file = tempfile::Builder::new()
        .prefix("mgmtremote")
        .suffix(".access")
        .tempfile()
        .map_err(StartupError::AccessPolicy)?;
    file.write_all(BUNDLED_ACCESS_POLICY.as_bytes())
        .and_then(|()| file.flush())
        .map_err(StartupError::AccessPolicy)?;
    Ok(file)
}

fn runtime() -> Result<Runtime, StartupError> {
    Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("mgmt-endpoint")
        .enable_all()
        .build()
        .map_err(StartupError::Runtime)
}

fn activate(
    ctx: &AgentContext,
    config: &ResolvedConfiguration,
    env: Environment,
    server: Arc<dyn ManagementServer>,
) -> Result<Endpoint, StartupError> {
    let tls = env.tls.clone();

    match config.protocol {
        Protocol::Registry => {
            let mut registry = RegistryServer::new(Listener::bind(config.port)?, tls);
            let connector_listener = Listener::bind(0)?;
            let url = ServiceUrl::new(config.protocol, registry.local_addr().port());
            let connector = ConnectorServer::new(url, env, server, ctx.address().clone())?;

            let runtime = runtime()?;
            let connector_addr = connector.start(&runtime, connector_listener);
            registry.start(&runtime, ctx.address().clone(), connector_addr.port());

            tracing::info!(url = %connector.url(), "Management endpoint started");
            Ok(Endpoint::new(runtime, connector, connector_addr, Some(registry)))
        }
        Protocol::Direct => {
            let listener = Listener::bind(config.port)?;
            let url = ServiceUrl::new(config.protocol, listener.local_addr().port());
            let connector = ConnectorServer::new(url, env, server, ctx.address().clone())?;

            let runtime = runtime()?;
            let connector_addr = connector.start(&runtime, listener);

            tracing::info!(url = %connector.url(), "Management endpoint started");
            Ok(Endpoint::new(runtime, connector, connector_addr, None))
        }
    }
}
