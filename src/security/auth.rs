//! Connector authenticators.
//!
//! An [`Authenticator`] turns the credentials presented by a connecting
//! client into an authenticated [`Subject`], or rejects the connection with
//! an [`AuthenticationFailure`]. Failures are per connection and never stop
//! the endpoint.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use zeroize::{Zeroize, Zeroizing};

use crate::security::policy::{LoginError, LoginPolicy};

/// Principal installed by the anonymous authenticator.
pub const ANONYMOUS: &str = "anonymous";

/// Authenticated identity of a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    principal: String,
}

impl Subject {
    pub fn new(principal: impl Into<String>) -> Self {
        Self {
            principal: principal.into(),
        }
    }

    pub fn anonymous() -> Self {
        Self::new(ANONYMOUS)
    }

    pub fn principal(&self) -> &str {
        &self.principal
    }
}

/// Rejection raised by an authenticator.
#[derive(Debug, Error)]
pub enum AuthenticationFailure {
    #[error("No valid credentials")]
    MalformedCredentials,

    #[error("Failed user authentication: {0}")]
    Login(#[from] LoginError),

    #[error("Invalid user")]
    NoSubject,

    #[error("Authentication failed! Invalid username or password")]
    Rejected,
}

/// Credentials presented by a client.
///
/// Absent credentials and arrays of any length are representable; only a
/// two-element `[login, secret]` array is accepted by the credential-checking
/// authenticators. Remaining values are zeroed on drop.
#[derive(Default)]
pub struct Credentials(Option<Vec<String>>);

impl Credentials {
    pub fn none() -> Self {
        Self(None)
    }

    pub fn array(values: Vec<String>) -> Self {
        Self(Some(values))
    }

    pub fn login_secret(login: impl Into<String>, secret: impl Into<String>) -> Self {
        Self::array(vec![login.into(), secret.into()])
    }

    pub fn is_present(&self) -> bool {
        self.0.is_some()
    }

    /// Split into `(login, secret)`; the secret is zeroed when dropped.
    pub fn into_login_secret(mut self) -> Result<(String, Zeroizing<String>), AuthenticationFailure> {
        match self.0.take() {
            Some(mut values) if values.len() == 2 => {
                let secret = Zeroizing::new(values.pop().unwrap_or_default());
                let login = values.pop().unwrap_or_default();
                Ok((login, secret))
            }
            Some(mut values) => {
                values.zeroize();
                Err(AuthenticationFailure::MalformedCredentials)
            }
            None => Err(AuthenticationFailure::MalformedCredentials),
        }
    }
}

impl Drop for Credentials {
    fn drop(&mut self) {
        if let Some(values) = self.0.as_mut() {
            values.zeroize();
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(values) => write!(f, "Credentials([{} values])", values.len()),
            None => f.write_str("Credentials(none)"),
        }
    }
}

/// Authentication callback installed on the connector.
pub trait Authenticator: Send + Sync {
    fn authenticate(&self, credentials: Credentials) -> Result<Subject, AuthenticationFailure>;
}

/// Runs a named policy against an explicitly loaded policy source.
pub struct PolicyAuthenticator {
    name: String,
    policy: Arc<dyn LoginPolicy>,
}

impl PolicyAuthenticator {
    pub fn new(name: impl Into<String>, policy: Arc<dyn LoginPolicy>) -> Self {
        Self {
            name: name.into(),
            policy,
        }
    }
}

impl Authenticator for PolicyAuthenticator {
    fn authenticate(&self, credentials: Credentials) -> Result<Subject, AuthenticationFailure> {
        let (login, secret) = credentials.into_login_secret()?;
        let subject = self.policy.login(&self.name, &login, &secret)?;
        drop(secret);
        subject.ok_or(AuthenticationFailure::NoSubject)
    }
}

/// Resolves a policy name at connection time against the process default
/// policy source.
pub struct NamedPolicyAuthenticator {
    name: String,
    default_policy: Option<Arc<dyn LoginPolicy>>,
}

impl NamedPolicyAuthenticator {
    pub fn new(name: impl Into<String>, default_policy: Option<Arc<dyn LoginPolicy>>) -> Self {
        Self {
            name: name.into(),
            default_policy,
        }
    }
}

impl Authenticator for NamedPolicyAuthenticator {
    fn authenticate(&self, credentials: Credentials) -> Result<Subject, AuthenticationFailure> {
        let Some(policy) = self.default_policy.as_ref() else {
            return Err(LoginError::Unavailable(format!(
                "no default policy source to resolve '{}'",
                self.name
            ))
            .into());
        };
        PolicyAuthenticator::new(self.name.clone(), Arc::clone(policy)).authenticate(credentials)
    }
}

/// Accepts any credentials as the fixed anonymous principal.
#[derive(Debug, Default)]
pub struct AnonymousAuthenticator;

impl Authenticator for AnonymousAuthenticator {
    fn authenticate(&self, _credentials: Credentials) -> Result<Subject, AuthenticationFailure> {
        Ok(Subject::anonymous())
    }
}

/// Checks credentials against a `login password` file.
pub struct PasswordFileAuthenticator {
    entries: HashMap<String, Zeroizing<String>>,
}

impl PasswordFileAuthenticator {
    /// Read the password file. Lines are `login password`; `#` starts a comment.
    pub fn load(path: &Path) -> Result<Self, std::io::Error> {
        let content = Zeroizing::new(fs::read_to_string(path)?);
        let mut entries = HashMap::new();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut fields = line.split_whitespace();
            if let (Some(login), Some(password)) = (fields.next(), fields.next()) {
                entries.insert(login.to_string(), Zeroizing::new(password.to_string()));
            }
        }

        tracing::debug!(path = %path.display(), users = entries.len(), "Password file loaded");
        Ok(Self { entries })
    }
}

impl Authenticator for PasswordFileAuthenticator {
    fn authenticate(&self, credentials: Credentials) -> Result<Subject, AuthenticationFailure> {
        let (login, secret) = credentials.into_login_secret()?;
        match self.entries.get(&login) {
            Some(expected) if expected.as_str() == secret.as_str() => Ok(Subject::new(login)),
            _ => Err(AuthenticationFailure::Rejected),
        }
    }
}
