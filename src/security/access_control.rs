//! Access-control files.
//!
//! Each line grants an access level to an identity:
//!
//! ```text
//! # identity   level
//! monitor      readonly
//! operator     readwrite
//! ```
//!
//! Identities not listed are denied everything.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use thiserror::Error;

/// Access policy shipped with the agent, used by the strict hardening path.
pub const BUNDLED_ACCESS_POLICY: &str = include_str!("../../resources/mgmtremote.access");

/// Access level granted to an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AccessLevel {
    ReadOnly,
    ReadWrite,
}

/// Kind of operation requested on the management server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Read,
    Write,
}

impl Operation {
    fn required_level(self) -> AccessLevel {
        match self {
            Self::Read => AccessLevel::ReadOnly,
            Self::Write => AccessLevel::ReadWrite,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccessDenied {
    #[error("Access denied! No entries found in the access file for any of the authenticated identities")]
    UnknownIdentity,

    #[error("Access denied! Invalid access level for requested MBeanServer operation.")]
    InsufficientLevel,
}

#[derive(Debug, Error)]
pub enum AccessFileError {
    #[error("cannot read access file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid access level '{level}' for identity '{identity}'")]
    InvalidLevel { identity: String, level: String },
}

/// Parsed access-control file.
#[derive(Debug, Clone, Default)]
pub struct AccessController {
    grants: HashMap<String, AccessLevel>,
}

impl AccessController {
    pub fn load(path: &Path) -> Result<Self, AccessFileError> {
        let content = fs::read_to_string(path).map_err(|source| AccessFileError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, AccessFileError> {
        let mut grants = HashMap::new();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut fields = line.split_whitespace();
            let (Some(identity), Some(level)) = (fields.next(), fields.next()) else {
                continue;
            };
            let level = match level.to_ascii_lowercase().as_str() {
                "readonly" => AccessLevel::ReadOnly,
                "readwrite" => AccessLevel::ReadWrite,
                _ => {
                    return Err(AccessFileError::InvalidLevel {
                        identity: identity.to_string(),
                        level: level.to_string(),
                    })
                }
            };
            grants.insert(identity.to_string(), level);
        }
        Ok(Self { grants })
    }

    pub fn level(&self, identity: &str) -> Option<AccessLevel> {
        self.grants.get(identity).copied()
    }

    pub fn check(&self, identity: &str, operation: Operation) -> Result<(), AccessDenied> {
        let level = self.level(identity).ok_or(AccessDenied::UnknownIdentity)?;
        if level >= operation.required_level() {
            Ok(())
        } else {
            Err(AccessDenied::InsufficientLevel)
        }
    }
}
