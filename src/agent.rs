//! Process-lifetime agent state and the activation entry points.
//!
//! [`activate`] and [`shutdown`] operate on a global [`AgentContext`];
//! tests and embedders can hold their own context instead.

use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use thiserror::Error;

use crate::config::{self, ConfigError, Properties, Source};
use crate::connector::ServiceUrl;
use crate::lifecycle::{Endpoint, Orchestrator, StartupError};
use crate::management::{LocalRegistry, ManagementServer};
use crate::net::resolve::AddressOverride;
use crate::security::policy::LoginPolicy;

#[derive(Debug, Error)]
pub enum ActivationError {
    #[error("Invalid management configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Management endpoint failed to start: {0}")]
    Startup(#[from] StartupError),
}

/// State shared by every activation in a process.
pub struct AgentContext {
    address: AddressOverride,
    default_login_policy: Option<Arc<dyn LoginPolicy>>,
    server: Arc<dyn ManagementServer>,
    active: Mutex<Option<Endpoint>>,
    detached: Mutex<Vec<Endpoint>>,
}

impl AgentContext {
    pub fn new(server: Arc<dyn ManagementServer>) -> Self {
        Self {
            address: AddressOverride::default(),
            default_login_policy: None,
            server,
            active: Mutex::new(None),
            detached: Mutex::new(Vec::new()),
        }
    }

    /// Policy source that named login policies are resolved against.
    pub fn with_default_login_policy(mut self, policy: Arc<dyn LoginPolicy>) -> Self {
        self.default_login_policy = Some(policy);
        self
    }

    pub fn address(&self) -> &AddressOverride {
        &self.address
    }

    pub fn default_login_policy(&self) -> Option<Arc<dyn LoginPolicy>> {
        self.default_login_policy.clone()
    }

    pub fn server(&self) -> Arc<dyn ManagementServer> {
        Arc::clone(&self.server)
    }

    /// Resolve `sources` in order and start an endpoint from the result.
    ///
    /// An endpoint that is already active is detached, not stopped.
    pub fn activate_with(&self, sources: &[Source]) -> Result<ServiceUrl, ActivationError> {
        let config = config::resolve(sources)?;
        let endpoint = Orchestrator::start(self, config, self.server())?;
        let url = endpoint.url().clone();

        if let Some(previous) = lock(&self.active).replace(endpoint) {
            tracing::warn!(
                url = %previous.url(),
                "Replacing active endpoint; the previous one keeps serving"
            );
            lock(&self.detached).push(previous);
        }
        Ok(url)
    }

    /// Activate from the process environment and an inline argument string.
    ///
    /// Failures are logged and leave the context without an active endpoint.
    pub fn activate(&self, args: Option<&str>) {
        let mut sources = vec![Source::Properties(Properties::from_env())];
        if let Some(args) = args {
            sources.push(Source::Properties(Properties::parse_args(args)));
        }

        if let Err(e) = self.activate_with(&sources) {
            tracing::error!(error = %e, "Management agent activation failed");
            if let Some(endpoint) = lock(&self.active).take() {
                lock(&self.detached).push(endpoint);
            }
        }
    }

    /// Stop the active endpoint, if any.
    pub fn shutdown(&self) {
        if let Some(endpoint) = lock(&self.active).take() {
            endpoint.stop();
        }
    }

    pub fn active_url(&self) -> Option<ServiceUrl> {
        lock(&self.active).as_ref().map(|e| e.url().clone())
    }

    pub fn is_active(&self) -> bool {
        lock(&self.active).is_some()
    }

    /// Run `f` against the active endpoint.
    pub fn with_active<R>(&self, f: impl FnOnce(&Endpoint) -> R) -> Option<R> {
        lock(&self.active).as_ref().map(f)
    }

    /// Endpoints replaced by a later activation that are still serving.
    pub fn detached_count(&self) -> usize {
        lock(&self.detached).len()
    }
}

impl Drop for AgentContext {
    fn drop(&mut self) {
        self.shutdown();
        for endpoint in lock(&self.detached).drain(..) {
            endpoint.stop();
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

static GLOBAL: OnceLock<AgentContext> = OnceLock::new();

/// Install the global context. Fails with the given context when one exists.
pub fn install(ctx: AgentContext) -> Result<(), AgentContext> {
    GLOBAL.set(ctx)
}

/// The global context, created over the platform registry on first use.
pub fn global() -> &'static AgentContext {
    GLOBAL.get_or_init(|| AgentContext::new(Arc::new(LocalRegistry::platform())))
}

/// Activate the global agent. Never fails; errors are logged.
pub fn activate(args: Option<&str>) {
    global().activate(args);
}

/// Stop the global agent's endpoint, if any.
pub fn shutdown() {
    global().shutdown();
}
