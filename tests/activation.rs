//! End-to-end activation tests against live endpoints.

use std::net::{Ipv4Addr, TcpListener};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use mgmt_agent::agent::ActivationError;
use mgmt_agent::config::{keys, ConfigError, Properties, Source};
use mgmt_agent::connector::handlers::ConnectionInfo;
use mgmt_agent::connector::registry::Lookup;
use mgmt_agent::lifecycle::StartupError;
use mgmt_agent::management::{ManagementServer, SENSITIVE_ENTRIES};
use mgmt_agent::security::policy::PolicyFile;
use reqwest::StatusCode;
use serde_json::{json, Value};

mod common;

const INSUFFICIENT_LEVEL: &str =
    "Access denied! Invalid access level for requested MBeanServer operation.";

const POLICIES: &str = r#"
[policies.ops.users]
alice = "secret"
"#;

fn error_of(res: reqwest::blocking::Response) -> String {
    let body: Value = res.json().unwrap();
    body["error"].as_str().unwrap_or_default().to_string()
}

#[test]
fn strict_endpoint_without_auth_is_anonymous_and_read_only() {
    let (registry, ctx) = common::context();
    let port = common::free_port();

    let url = ctx.activate_with(&common::source(common::direct(port))).unwrap();
    assert_eq!(url.to_string(), format!("service:mgmt:direct://0.0.0.0:{port}/"));

    for name in SENSITIVE_ENTRIES {
        assert!(!registry.is_registered(&name.parse().unwrap()), "{name} still registered");
    }
    let access_file = ctx
        .with_active(|e| e.access_file().map(|p| p.to_path_buf()))
        .flatten()
        .expect("strict endpoint has an access file");
    assert!(!access_file.exists(), "{} left behind", access_file.display());

    let client = common::client();
    let base = format!("http://127.0.0.1:{port}");

    let info: ConnectionInfo = client.get(format!("{base}/connection")).send().unwrap().json().unwrap();
    assert!(
        info.connection_id.starts_with("direct://127.0.0.1 anonymous "),
        "{}",
        info.connection_id
    );

    let entries: Vec<String> = client.get(format!("{base}/entries")).send().unwrap().json().unwrap();
    assert!(entries.contains(&"agent:type=Runtime".to_string()));

    let res = client
        .post(format!("{base}/entries"))
        .json(&json!({ "name": "app:type=Cache" }))
        .send()
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(error_of(res), INSUFFICIENT_LEVEL);

    ctx.shutdown();
    assert!(!ctx.is_active());
    assert!(client.get(format!("{base}/entries")).send().is_err());
}

#[test]
fn non_strict_endpoint_without_auth_allows_writes() {
    let (registry, ctx) = common::context();
    let port = common::free_port();

    ctx.activate_with(&common::source(common::direct(port).with("strict", "false")))
        .unwrap();
    assert!(registry.is_registered(&SENSITIVE_ENTRIES[0].parse().unwrap()));

    let client = common::client();
    let base = format!("http://127.0.0.1:{port}");

    let res = client
        .post(format!("{base}/entries"))
        .json(&json!({ "name": "app:type=Cache", "attributes": { "size": 3 } }))
        .send()
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let attributes: Value = client
        .get(format!("{base}/entries/app:type=Cache"))
        .send()
        .unwrap()
        .json()
        .unwrap();
    assert_eq!(attributes, json!({ "size": 3 }));

    let res = client
        .post(format!("{base}/entries"))
        .json(&json!({ "name": "app:type=Cache" }))
        .send()
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = client.delete(format!("{base}/entries/app:type=Cache")).send().unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    let res = client.delete(format!("{base}/entries/app:type=Cache")).send().unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let info: ConnectionInfo = client.get(format!("{base}/connection")).send().unwrap().json().unwrap();
    assert!(info.connection_id.starts_with("direct://127.0.0.1  "), "{}", info.connection_id);
}

#[test]
fn named_policy_with_source_authenticates() {
    let (_, ctx) = common::context();
    let port = common::free_port();
    let policies = common::write_file(POLICIES);

    ctx.activate_with(&common::source(
        common::direct(port)
            .with("login_policy", "ops")
            .with("policy_source", common::path_of(&policies)),
    ))
    .unwrap();

    let client = common::client();
    let base = format!("http://127.0.0.1:{port}");

    let info: ConnectionInfo = client
        .get(format!("{base}/connection"))
        .basic_auth("alice", Some("secret"))
        .send()
        .unwrap()
        .json()
        .unwrap();
    assert!(info.connection_id.contains("127.0.0.1 alice "), "{}", info.connection_id);

    let res = client
        .get(format!("{base}/connection"))
        .basic_auth("alice", Some("wrong"))
        .send()
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client.get(format!("{base}/connection")).send().unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[test]
fn named_policy_resolves_against_context_default() {
    let policies = common::write_file(POLICIES);
    let (registry, _) = common::context();
    let ctx = mgmt_agent::AgentContext::new(registry)
        .with_default_login_policy(Arc::new(PolicyFile::load(policies.path()).unwrap()));
    let port = common::free_port();

    ctx.activate_with(&common::source(common::direct(port).with(keys::LOGIN_CONFIG, "ops")))
        .unwrap();

    let client = common::client();
    let res = client
        .get(format!("http://127.0.0.1:{port}/domains"))
        .basic_auth("alice", Some("secret"))
        .send()
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .get(format!("http://127.0.0.1:{port}/domains"))
        .basic_auth("mallory", Some("secret"))
        .send()
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[test]
fn named_policy_without_default_rejects_everyone() {
    let (_, ctx) = common::context();
    let port = common::free_port();

    ctx.activate_with(&common::source(common::direct(port).with(keys::LOGIN_CONFIG, "ops")))
        .unwrap();

    let res = common::client()
        .get(format!("http://127.0.0.1:{port}/domains"))
        .basic_auth("alice", Some("secret"))
        .send()
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[test]
fn password_file_with_access_file() {
    let (_, ctx) = common::context();
    let port = common::free_port();
    let passwords = common::write_file("# login password\nalice secret\nbob hunter2\neve pw\n");
    let access = common::write_file("alice readwrite\nbob readonly\n");

    ctx.activate_with(&common::source(
        common::direct(port)
            .with(keys::PASSWORD_FILE, common::path_of(&passwords))
            .with(keys::ACCESS_FILE, common::path_of(&access)),
    ))
    .unwrap();

    let client = common::client();
    let base = format!("http://127.0.0.1:{port}");
    let create = |user: &str, password: &str, name: &str| {
        client
            .post(format!("{base}/entries"))
            .basic_auth(user, Some(password))
            .json(&json!({ "name": name }))
            .send()
            .unwrap()
    };

    assert_eq!(create("alice", "secret", "app:type=A").status(), StatusCode::CREATED);

    let res = create("bob", "hunter2", "app:type=B");
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(error_of(res), INSUFFICIENT_LEVEL);

    assert_eq!(create("carol", "x", "app:type=C").status(), StatusCode::UNAUTHORIZED);

    let res = client
        .get(format!("{base}/entries"))
        .basic_auth("eve", Some("pw"))
        .send()
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert!(error_of(res).contains("No entries found in the access file"));
}

#[test]
fn registry_protocol_redirects_to_connector() {
    let (_, ctx) = common::context();
    let port = common::free_port();
    let props = Properties::new()
        .with(keys::PORT, port.to_string())
        .with(keys::HOSTNAME, "127.0.0.1");

    let url = ctx.activate_with(&common::source(props)).unwrap();
    assert_eq!(url.to_string(), format!("service:mgmt:registry://0.0.0.0:{port}/lookup/mgmt"));

    let connector_port = ctx.with_active(|e| e.connector_addr().port()).unwrap();
    assert_ne!(connector_port, port);
    assert_eq!(ctx.with_active(|e| e.registry_addr().map(|a| a.port())).flatten(), Some(port));

    let client = common::client();
    let lookup: Lookup = client
        .get(format!("http://127.0.0.1:{port}/lookup/mgmt"))
        .send()
        .unwrap()
        .json()
        .unwrap();
    assert_eq!(lookup.url, format!("http://127.0.0.1:{connector_port}"));

    let info: ConnectionInfo = client
        .get(format!("{}/connection", lookup.url))
        .send()
        .unwrap()
        .json()
        .unwrap();
    assert!(info.connection_id.starts_with("registry://127.0.0.1 anonymous "));
}

#[test]
fn ssl_with_generated_identity() {
    let (_, ctx) = common::context();
    let port = common::free_port();

    ctx.activate_with(&common::source(common::direct(port).with(keys::REGISTRY_SSL, "true")))
        .unwrap();
    assert_eq!(ctx.with_active(|e| e.is_tls()), Some(true));

    let client = common::client();
    let res = client.get(format!("https://127.0.0.1:{port}/domains")).send().unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    assert!(client.get(format!("http://127.0.0.1:{port}/domains")).send().is_err());
}

#[test]
fn ssl_context_with_client_authentication() {
    let rcgen::CertifiedKey { cert, key_pair } =
        rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
    let bundle_pem = format!("{}{}", cert.pem(), key_pair.serialize_pem());
    let bundle = common::write_file(&bundle_pem);

    let (_, ctx) = common::context();
    let port = common::free_port();
    ctx.activate_with(&common::source(
        common::direct(port)
            .with("ssl_context", common::path_of(&bundle))
            .with("with_ssl", "true")
            .with("client_authentication", "true"),
    ))
    .unwrap();

    let authenticated = reqwest::blocking::Client::builder()
        .danger_accept_invalid_certs(true)
        .identity(reqwest::Identity::from_pem(bundle_pem.as_bytes()).unwrap())
        .build()
        .unwrap();
    let res = authenticated
        .get(format!("https://127.0.0.1:{port}/domains"))
        .send()
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    assert!(common::client()
        .get(format!("https://127.0.0.1:{port}/domains"))
        .send()
        .is_err());
}

#[test]
fn second_activation_leaves_first_endpoint_serving() {
    let (_, ctx) = common::context();
    let first = common::free_port();
    let second = common::free_port();

    ctx.activate_with(&common::source(common::direct(first))).unwrap();
    ctx.activate_with(&common::source(common::direct(second))).unwrap();

    assert_eq!(ctx.detached_count(), 1);
    assert_eq!(ctx.active_url().map(|u| u.port), Some(second));

    let client = common::client();
    for port in [first, second] {
        let res = client.get(format!("http://127.0.0.1:{port}/domains")).send().unwrap();
        assert_eq!(res.status(), StatusCode::OK, "port {port}");
    }
}

#[test]
fn invalid_configuration_leaves_nothing_active() {
    let (_, ctx) = common::context();

    let result = ctx.activate_with(&common::source(Properties::new().with(keys::PORT, "notaport")));
    assert!(matches!(
        result,
        Err(ActivationError::Config(ConfigError::InvalidPort(_)))
    ));
    assert!(!ctx.is_active());

    let result = ctx.activate_with(&[Source::Properties(Properties::new())]);
    assert!(matches!(result, Err(ActivationError::Config(ConfigError::MissingPort))));

    ctx.activate(Some("port=abc"));
    assert!(!ctx.is_active());
}

#[test]
fn occupied_port_fails_startup() {
    let taken = TcpListener::bind((Ipv4Addr::UNSPECIFIED, 0)).unwrap();
    let port = taken.local_addr().unwrap().port();
    let (_, ctx) = common::context();
    let before = scratch_policies();

    let result = ctx.activate_with(&common::source(common::direct(port).with("strict", "true")));
    assert!(matches!(
        result,
        Err(ActivationError::Startup(StartupError::Listener(_)))
    ));
    assert!(!ctx.is_active());

    // Strict tests running alongside create their own short-lived files.
    let deadline = Instant::now() + Duration::from_secs(2);
    let mut leftover = scratch_policies();
    leftover.retain(|path| !before.contains(path));
    while !leftover.is_empty() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(50));
        leftover = scratch_policies();
        leftover.retain(|path| !before.contains(path));
    }
    assert!(leftover.is_empty(), "access policy left behind: {leftover:?}");
}

/// Default access policies written to the temp dir by strict startups.
fn scratch_policies() -> Vec<PathBuf> {
    std::fs::read_dir(std::env::temp_dir())
        .unwrap()
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with("mgmtremote") && name.ends_with(".access"))
        })
        .collect()
}

#[test]
fn inline_arguments_activate() {
    let (_, ctx) = common::context();
    let port = common::free_port();
    let sep = mgmt_agent::config::properties::ARG_SEPARATOR;

    ctx.activate(Some(&format!(
        "port={port}{sep}protocol=direct{sep}hostname=127.0.0.1{sep}strict=false"
    )));
    assert!(ctx.is_active());

    let res = common::client()
        .post(format!("http://127.0.0.1:{port}/entries"))
        .json(&json!({ "name": "app:type=Inline" }))
        .send()
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
}
