//! Resolved configuration snapshot.
//!
//! A [`ResolvedConfiguration`] is produced once by the resolver and never
//! mutated afterwards. It is consumed by the startup orchestrator.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use crate::config::loader::ConfigError;
use crate::net::tls::SecurityContext;
use crate::security::policy::LoginPolicy;

/// Transport used by the management connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Protocol {
    /// Connector behind a lookup registry bound on the configured port.
    #[default]
    Registry,
    /// Connector bound directly on the configured port.
    Direct,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Registry => "registry",
            Self::Direct => "direct",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "registry" => Ok(Self::Registry),
            "direct" => Ok(Self::Direct),
            _ => Err(ConfigError::UnknownProtocol(s.to_string())),
        }
    }
}

/// A login policy bound to the location it was loaded from.
#[derive(Clone)]
pub struct PolicyBinding {
    /// File the policy was loaded from, `None` when supplied programmatically.
    pub location: Option<PathBuf>,
    pub policy: Arc<dyn LoginPolicy>,
}

impl PartialEq for PolicyBinding {
    fn eq(&self, other: &Self) -> bool {
        match (&self.location, &other.location) {
            (Some(a), Some(b)) => a == b,
            _ => Arc::ptr_eq(&self.policy, &other.policy),
        }
    }
}

impl fmt::Debug for PolicyBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicyBinding")
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

/// Authentication mode selected from a resolved configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// Named policy evaluated against an explicitly loaded policy source.
    NamedPolicyWithSource,
    /// Named policy resolved by the connector at connection time.
    NamedPolicy,
    /// Credentials checked against a password file.
    PasswordFile,
    /// No authentication configured.
    None,
}

/// Immutable configuration snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfiguration {
    pub protocol: Protocol,
    pub port: u16,
    pub hostname: Option<String>,
    pub with_ssl: bool,
    pub security_context: Option<SecurityContext>,
    pub login_policy: Option<String>,
    pub policy_source: Option<PolicyBinding>,
    pub client_authentication: bool,
    pub password_file: Option<PathBuf>,
    pub access_file: Option<PathBuf>,
    pub strict: bool,
}

impl ResolvedConfiguration {
    /// Select the authentication mode, first match wins.
    pub fn auth_mode(&self) -> AuthMode {
        match (&self.login_policy, &self.policy_source, &self.password_file) {
            (Some(_), Some(_), _) => AuthMode::NamedPolicyWithSource,
            (Some(_), None, _) => AuthMode::NamedPolicy,
            (None, _, Some(_)) => AuthMode::PasswordFile,
            (None, _, None) => AuthMode::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> ResolvedConfiguration {
        ResolvedConfiguration {
            protocol: Protocol::Registry,
            port: 1,
            hostname: None,
            with_ssl: false,
            security_context: None,
            login_policy: None,
            policy_source: None,
            client_authentication: false,
            password_file: None,
            access_file: None,
            strict: true,
        }
    }

    #[test]
    fn protocol_is_case_insensitive() {
        assert_eq!("REGISTRY".parse::<Protocol>().unwrap(), Protocol::Registry);
        assert_eq!("Direct".parse::<Protocol>().unwrap(), Protocol::Direct);
        assert!(matches!(
            "http".parse::<Protocol>(),
            Err(ConfigError::UnknownProtocol(p)) if p == "http"
        ));
    }

    #[test]
    fn auth_mode_priority() {
        let mut config = base();
        assert_eq!(config.auth_mode(), AuthMode::None);

        config.password_file = Some("pw".into());
        assert_eq!(config.auth_mode(), AuthMode::PasswordFile);

        config.login_policy = Some("mgmt".into());
        assert_eq!(config.auth_mode(), AuthMode::NamedPolicy);

        config.policy_source = Some(PolicyBinding {
            location: Some("policy.toml".into()),
            policy: Arc::new(crate::security::policy::PolicyFile::default()),
        });
        assert_eq!(config.auth_mode(), AuthMode::NamedPolicyWithSource);
    }

    #[test]
    fn policy_source_without_name_is_ignored() {
        let mut config = base();
        config.policy_source = Some(PolicyBinding {
            location: None,
            policy: Arc::new(crate::security::policy::PolicyFile::default()),
        });
        assert_eq!(config.auth_mode(), AuthMode::None);
    }
}
