//! TCP listener binding.
//!
//! # Responsibilities
//! - Bind the registry and connector listeners
//! - Report bind failures with the address that failed
//! - Hand off non-blocking std listeners to the serving runtime

use std::net::{Ipv4Addr, SocketAddr, TcpListener};

/// Interface every management listener binds to.
pub const WILDCARD: Ipv4Addr = Ipv4Addr::UNSPECIFIED;

/// Error type for listener operations.
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    /// Failed to bind to address.
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// A bound listener ready to be served.
#[derive(Debug)]
pub struct Listener {
    inner: TcpListener,
    local_addr: SocketAddr,
}

impl Listener {
    /// Bind the wildcard interface on `port`; port 0 selects an ephemeral port.
    pub fn bind(port: u16) -> Result<Self, ListenerError> {
        let addr = SocketAddr::from((WILDCARD, port));
        let bind_err = |source| ListenerError::Bind { addr, source };

        let inner = TcpListener::bind(addr).map_err(bind_err)?;
        inner.set_nonblocking(true).map_err(bind_err)?;
        let local_addr = inner.local_addr().map_err(bind_err)?;

        tracing::info!(address = %local_addr, "Listener bound");

        Ok(Self { inner, local_addr })
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn into_std(self) -> TcpListener {
        self.inner
    }
}
