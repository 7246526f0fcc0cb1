//! Management connector subsystem.
//!
//! # Data Flow
//! ```text
//! Client request
//!     → registry.rs (Registry protocol only: lookup of the connector URL)
//!     → auth.rs (credentials → Subject via the installed Authenticator)
//!     → handlers.rs (access-file check, then ManagementServer call)
//! ```
//!
//! # Design Decisions
//! - The environment is resolved once, at construction: the password file
//!   and access file are read before `start` returns
//! - Authentication failures reject one request, never the endpoint
//! - The advertised host comes from the agent's address override

pub mod auth;
pub mod handlers;
pub mod registry;

use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::{middleware, routing::get, Router};
use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use thiserror::Error;
use tokio::runtime::Runtime;
use tower_http::trace::TraceLayer;

use crate::config::Protocol;
use crate::management::ManagementServer;
use crate::net::listener::{Listener, WILDCARD};
use crate::net::resolve::AddressOverride;
use crate::security::access_control::{AccessController, AccessFileError};
use crate::security::auth::{Authenticator, NamedPolicyAuthenticator, PasswordFileAuthenticator};
use crate::security::policy::LoginPolicy;

use self::handlers::*;

/// Name the connector is bound under in the registry.
pub const REGISTRY_BINDING: &str = "mgmt";

#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("cannot read password file {path}: {source}")]
    PasswordFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    AccessFile(#[from] AccessFileError),
}

/// Address of a management connector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceUrl {
    pub protocol: Protocol,
    pub host: String,
    pub port: u16,
    pub path: String,
}

impl ServiceUrl {
    /// URL on the wildcard interface with the protocol's path.
    pub fn new(protocol: Protocol, port: u16) -> Self {
        let path = match protocol {
            Protocol::Registry => format!("/lookup/{REGISTRY_BINDING}"),
            Protocol::Direct => "/".to_string(),
        };
        Self {
            protocol,
            host: WILDCARD.to_string(),
            port,
            path,
        }
    }
}

impl fmt::Display for ServiceUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "service:mgmt:{}://{}:{}{}",
            self.protocol, self.host, self.port, self.path
        )
    }
}

/// Settings handed to the connector by the startup orchestrator.
#[derive(Clone, Default)]
pub struct Environment {
    pub tls: Option<RustlsConfig>,
    pub authenticator: Option<Arc<dyn Authenticator>>,
    /// Policy name resolved at connection time against `default_login_policy`.
    pub login_config: Option<String>,
    pub default_login_policy: Option<Arc<dyn LoginPolicy>>,
    pub password_file: Option<PathBuf>,
    pub access_file: Option<PathBuf>,
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("tls", &self.tls.is_some())
            .field("authenticator", &self.authenticator.is_some())
            .field("login_config", &self.login_config)
            .field("password_file", &self.password_file)
            .field("access_file", &self.access_file)
            .finish()
    }
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct ConnectorState {
    pub server: Arc<dyn ManagementServer>,
    pub authenticator: Option<Arc<dyn Authenticator>>,
    pub access: Option<Arc<AccessController>>,
    pub address: AddressOverride,
    pub protocol: Protocol,
}

/// HTTP connector exposing a management server.
pub struct ConnectorServer {
    url: ServiceUrl,
    state: ConnectorState,
    tls: Option<RustlsConfig>,
    access_file: Option<PathBuf>,
    handle: Handle,
}

impl ConnectorServer {
    /// Resolve the environment into connector state.
    pub fn new(
        url: ServiceUrl,
        env: Environment,
        server: Arc<dyn ManagementServer>,
        address: AddressOverride,
    ) -> Result<Self, ConnectorError> {
        let authenticator: Option<Arc<dyn Authenticator>> =
            match (env.authenticator, env.login_config, env.password_file) {
                (Some(authenticator), _, _) => Some(authenticator),
                (None, Some(name), _) => Some(Arc::new(NamedPolicyAuthenticator::new(
                    name,
                    env.default_login_policy,
                ))),
                (None, None, Some(path)) => {
                    let authenticator = PasswordFileAuthenticator::load(&path)
                        .map_err(|source| ConnectorError::PasswordFile { path, source })?;
                    Some(Arc::new(authenticator))
                }
                (None, None, None) => None,
            };

        let access = env
            .access_file
            .as_deref()
            .map(AccessController::load)
            .transpose()?
            .map(Arc::new);

        tracing::debug!(
            url = %url,
            authenticated = authenticator.is_some(),
            access_controlled = access.is_some(),
            tls = env.tls.is_some(),
            "Connector configured"
        );

        Ok(Self {
            state: ConnectorState {
                server,
                authenticator,
                access,
                address,
                protocol: url.protocol,
            },
            url,
            tls: env.tls,
            access_file: env.access_file,
            handle: Handle::new(),
        })
    }

    pub fn url(&self) -> &ServiceUrl {
        &self.url
    }

    pub fn is_tls(&self) -> bool {
        self.tls.is_some()
    }

    /// Access file the connector was configured with, possibly removed since.
    pub fn access_file(&self) -> Option<&Path> {
        self.access_file.as_deref()
    }

    /// Build the Axum router with authentication and tracing layers.
    pub fn router(&self) -> Router {
        let state = self.state.clone();
        Router::new()
            .route("/connection", get(get_connection))
            .route("/domains", get(get_domains))
            .route("/entries", get(get_entries).post(create_entry))
            .route("/entries/{name}", get(get_entry).delete(delete_entry))
            .layer(middleware::from_fn_with_state(state.clone(), auth::authenticate))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Serve on `listener` from the given runtime.
    pub fn start(&self, runtime: &Runtime, listener: Listener) -> SocketAddr {
        let addr = listener.local_addr();
        let app = self.router().into_make_service();
        let handle = self.handle.clone();
        let std_listener = listener.into_std();

        match self.tls.clone() {
            Some(tls) => {
                let server = axum_server::tls_rustls::from_tcp_rustls(std_listener, tls).handle(handle);
                runtime.spawn(async move {
                    if let Err(e) = server.serve(app).await {
                        tracing::error!(error = %e, "Connector stopped with error");
                    }
                });
            }
            None => {
                let server = axum_server::from_tcp(std_listener).handle(handle);
                runtime.spawn(async move {
                    if let Err(e) = server.serve(app).await {
                        tracing::error!(error = %e, "Connector stopped with error");
                    }
                });
            }
        }

        tracing::info!(address = %addr, url = %self.url, "Connector started");
        addr
    }

    pub fn stop(&self) {
        self.handle.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::management::LocalRegistry;

    #[test]
    fn service_urls() {
        assert_eq!(
            ServiceUrl::new(Protocol::Registry, 9999).to_string(),
            "service:mgmt:registry://0.0.0.0:9999/lookup/mgmt"
        );
        assert_eq!(
            ServiceUrl::new(Protocol::Direct, 9999).to_string(),
            "service:mgmt:direct://0.0.0.0:9999/"
        );
    }

    #[test]
    fn missing_password_file_fails_construction() {
        let env = Environment {
            password_file: Some("/nonexistent/password".into()),
            ..Environment::default()
        };
        let result = ConnectorServer::new(
            ServiceUrl::new(Protocol::Direct, 0),
            env,
            Arc::new(LocalRegistry::new()),
            AddressOverride::default(),
        );
        assert!(matches!(result, Err(ConnectorError::PasswordFile { .. })));
    }

    #[test]
    fn missing_access_file_fails_construction() {
        let env = Environment {
            access_file: Some("/nonexistent/access".into()),
            ..Environment::default()
        };
        let result = ConnectorServer::new(
            ServiceUrl::new(Protocol::Direct, 0),
            env,
            Arc::new(LocalRegistry::new()),
            AddressOverride::default(),
        );
        assert!(matches!(result, Err(ConnectorError::AccessFile(_))));
    }
}
