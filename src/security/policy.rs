//! Login policies.
//!
//! A login policy validates a login/secret pair against a named policy and
//! yields the authenticated [`Subject`]. The file-backed [`PolicyFile`] reads
//! a TOML document:
//!
//! ```toml
//! [policies.mgmt.users]
//! alice = "secret"
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::security::auth::Subject;

/// Errors raised while evaluating a login policy.
#[derive(Debug, Error)]
pub enum LoginError {
    #[error("no login policy named '{0}'")]
    UnknownPolicy(String),

    #[error("invalid login or secret")]
    InvalidCredentials,

    #[error("login policy unavailable: {0}")]
    Unavailable(String),
}

/// Errors raised while loading a policy source.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("cannot read policy source {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse policy source {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Capability that validates credentials against a named policy.
///
/// `Ok(None)` means the policy ran but produced no subject.
pub trait LoginPolicy: Send + Sync {
    fn login(&self, name: &str, login: &str, secret: &str) -> Result<Option<Subject>, LoginError>;
}

impl std::fmt::Debug for dyn LoginPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("LoginPolicy")
    }
}

/// File-backed login policies.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PolicyFile {
    #[serde(default)]
    policies: HashMap<String, PolicyEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct PolicyEntry {
    #[serde(default)]
    users: HashMap<String, String>,
}

impl PolicyFile {
    /// Load policies from a TOML file.
    pub fn load(path: &Path) -> Result<Self, PolicyError> {
        let content = fs::read_to_string(path).map_err(|source| PolicyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file: PolicyFile = toml::from_str(&content).map_err(|source| PolicyError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::debug!(
            path = %path.display(),
            policies = file.policies.len(),
            "Login policy source loaded"
        );
        Ok(file)
    }
}

impl LoginPolicy for PolicyFile {
    fn login(&self, name: &str, login: &str, secret: &str) -> Result<Option<Subject>, LoginError> {
        let policy = self
            .policies
            .get(name)
            .ok_or_else(|| LoginError::UnknownPolicy(name.to_string()))?;

        match policy.users.get(login) {
            Some(expected) if expected == secret => Ok(Some(Subject::new(login))),
            _ => Err(LoginError::InvalidCredentials),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const POLICY: &str = r#"
[policies.mgmt.users]
alice = "secret"

[policies.empty]
"#;

    fn policy() -> PolicyFile {
        toml::from_str(POLICY).unwrap()
    }

    #[test]
    fn accepts_listed_user() {
        let subject = policy().login("mgmt", "alice", "secret").unwrap().unwrap();
        assert_eq!(subject.principal(), "alice");
    }

    #[test]
    fn rejects_wrong_secret_and_unknown_user() {
        let policy = policy();
        assert!(matches!(
            policy.login("mgmt", "alice", "nope"),
            Err(LoginError::InvalidCredentials)
        ));
        assert!(matches!(
            policy.login("empty", "alice", "secret"),
            Err(LoginError::InvalidCredentials)
        ));
    }

    #[test]
    fn rejects_unknown_policy() {
        assert!(matches!(
            policy().login("other", "alice", "secret"),
            Err(LoginError::UnknownPolicy(name)) if name == "other"
        ));
    }

    #[test]
    fn load_reports_parse_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "policies = 3").unwrap();
        assert!(matches!(PolicyFile::load(file.path()), Err(PolicyError::Parse { .. })));
    }

    #[test]
    fn load_reports_missing_file() {
        assert!(matches!(
            PolicyFile::load(Path::new("/nonexistent/policy.toml")),
            Err(PolicyError::Io { .. })
        ));
    }
}
