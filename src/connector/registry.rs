//! Lookup listener for the `Registry` protocol.
//!
//! Clients contact the registry on the configured port and are redirected to
//! the connector, which listens on an ephemeral port.

use std::net::SocketAddr;

use axum::{extract::State, routing::get, Json, Router};
use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use serde::{Deserialize, Serialize};
use tokio::runtime::Runtime;
use tower_http::trace::TraceLayer;

use crate::connector::REGISTRY_BINDING;
use crate::net::listener::Listener;
use crate::net::resolve::AddressOverride;

/// Body of a successful lookup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Lookup {
    pub url: String,
}

#[derive(Clone)]
struct RegistryState {
    address: AddressOverride,
    scheme: &'static str,
    connector_port: u16,
}

pub struct RegistryServer {
    addr: SocketAddr,
    listener: Option<Listener>,
    tls: Option<RustlsConfig>,
    handle: Handle,
}

impl RegistryServer {
    /// Reserve the registry port. Serving starts with [`RegistryServer::start`].
    pub fn new(listener: Listener, tls: Option<RustlsConfig>) -> Self {
        Self {
            addr: listener.local_addr(),
            listener: Some(listener),
            tls,
            handle: Handle::new(),
        }
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Serve lookups pointing at `connector_port`.
    pub fn start(&mut self, runtime: &Runtime, address: AddressOverride, connector_port: u16) {
        let Some(listener) = self.listener.take() else {
            return;
        };
        let state = RegistryState {
            address,
            scheme: if self.tls.is_some() { "https" } else { "http" },
            connector_port,
        };
        let app = Router::new()
            .route(&format!("/lookup/{REGISTRY_BINDING}"), get(lookup))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
            .into_make_service();
        let handle = self.handle.clone();
        let std_listener = listener.into_std();

        match self.tls.clone() {
            Some(tls) => {
                let server = axum_server::tls_rustls::from_tcp_rustls(std_listener, tls).handle(handle);
                runtime.spawn(async move {
                    if let Err(e) = server.serve(app).await {
                        tracing::error!(error = %e, "Registry stopped with error");
                    }
                });
            }
            None => {
                let server = axum_server::from_tcp(std_listener).handle(handle);
                runtime.spawn(async move {
                    if let Err(e) = server.serve(app).await {
                        tracing::error!(error = %e, "Registry stopped with error");
                    }
                });
            }
        }

        tracing::info!(address = %self.addr, connector_port, "Registry started");
    }

    pub fn stop(&self) {
        self.handle.shutdown();
    }
}

async fn lookup(State(state): State<RegistryState>) -> Json<Lookup> {
    Json(Lookup {
        url: format!(
            "{}://{}:{}",
            state.scheme,
            state.address.advertised_host(),
            state.connector_port
        ),
    })
}
