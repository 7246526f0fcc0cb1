//! Shared utilities for integration tests.

use std::io::Write;
use std::net::{Ipv4Addr, TcpListener};
use std::sync::Arc;

use mgmt_agent::agent::AgentContext;
use mgmt_agent::config::{keys, Properties, Source};
use mgmt_agent::management::LocalRegistry;
use tempfile::NamedTempFile;

/// A port that was free a moment ago.
pub fn free_port() -> u16 {
    TcpListener::bind((Ipv4Addr::UNSPECIFIED, 0))
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

/// A context over a fresh platform registry.
pub fn context() -> (Arc<LocalRegistry>, AgentContext) {
    let registry = Arc::new(LocalRegistry::platform());
    let ctx = AgentContext::new(registry.clone());
    (registry, ctx)
}

/// Loopback-bound direct-protocol properties on `port`.
pub fn direct(port: u16) -> Properties {
    Properties::new()
        .with(keys::PORT, port.to_string())
        .with(keys::HOSTNAME, "127.0.0.1")
        .with("protocol", "direct")
}

pub fn source(props: Properties) -> Vec<Source> {
    vec![Source::Properties(props)]
}

pub fn write_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

pub fn path_of(file: &NamedTempFile) -> String {
    file.path().to_string_lossy().into_owned()
}

#[allow(dead_code)]
pub fn client() -> reqwest::blocking::Client {
    reqwest::blocking::Client::builder()
        .danger_accept_invalid_certs(true)
        .build()
        .unwrap()
}
