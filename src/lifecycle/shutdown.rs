//! Running endpoint and its teardown.

use std::fmt;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use tokio::runtime::Runtime;

use crate::connector::registry::RegistryServer;
use crate::connector::{ConnectorServer, ServiceUrl};

/// Upper bound on waiting for serving tasks to unwind in [`Endpoint::stop`].
const STOP_TIMEOUT: Duration = Duration::from_secs(1);

/// A started management endpoint.
///
/// Owns the runtime its listeners are served from, so dropping an endpoint
/// also ends serving.
pub struct Endpoint {
    runtime: Runtime,
    connector: ConnectorServer,
    connector_addr: SocketAddr,
    registry: Option<RegistryServer>,
}

impl Endpoint {
    pub(crate) fn new(
        runtime: Runtime,
        connector: ConnectorServer,
        connector_addr: SocketAddr,
        registry: Option<RegistryServer>,
    ) -> Self {
        Self {
            runtime,
            connector,
            connector_addr,
            registry,
        }
    }

    pub fn url(&self) -> &ServiceUrl {
        self.connector.url()
    }

    /// Address the connector accepts connections on.
    pub fn connector_addr(&self) -> SocketAddr {
        self.connector_addr
    }

    /// Address of the registry listener, `Registry` protocol only.
    pub fn registry_addr(&self) -> Option<SocketAddr> {
        self.registry.as_ref().map(RegistryServer::local_addr)
    }

    pub fn is_tls(&self) -> bool {
        self.connector.is_tls()
    }

    pub fn access_file(&self) -> Option<&Path> {
        self.connector.access_file()
    }

    /// Stop accepting connections and tear the runtime down.
    ///
    /// Best effort: requests still running after the timeout are abandoned
    /// and nothing is reported. Must not be called from async code.
    pub fn stop(self) {
        if let Some(registry) = &self.registry {
            registry.stop();
        }
        self.connector.stop();
        self.runtime.shutdown_timeout(STOP_TIMEOUT);
        tracing::info!(url = %self.connector.url(), "Endpoint stopped");
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("url", self.url())
            .field("connector_addr", &self.connector_addr)
            .field("registry_addr", &self.registry_addr())
            .finish()
    }
}
