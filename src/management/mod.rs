//! Management server capability.
//!
//! The connector exposes a [`ManagementServer`] to remote clients. The agent
//! only needs a handful of operations from it; [`LocalRegistry`] is the
//! in-process implementation used by the activation entry point.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;

/// Built-in entries removed by the strict hardening path.
pub const SENSITIVE_ENTRIES: [&str; 3] = [
    "management:type=DiagnosticCommand",
    "management:type=HotSpotDiagnostic",
    "management.jfr:type=FlightRecorder",
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ManagementError {
    #[error("Malformed entry name '{0}'")]
    MalformedName(String),

    #[error("Entry not found: {0}")]
    NotFound(ObjectName),

    #[error("Entry already registered: {0}")]
    AlreadyExists(ObjectName),
}

/// Name of a management entry: `domain:key=value[,key=value...]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectName(String);

impl ObjectName {
    pub fn domain(&self) -> &str {
        self.0.split_once(':').map(|(domain, _)| domain).unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for ObjectName {
    type Err = ManagementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ManagementError::MalformedName(s.to_string());
        let (domain, properties) = s.split_once(':').ok_or_else(malformed)?;
        if domain.is_empty() || properties.is_empty() {
            return Err(malformed());
        }
        let well_formed = properties.split(',').all(|pair| {
            matches!(pair.split_once('='), Some((k, v)) if !k.is_empty() && !v.is_empty())
        });
        if !well_formed {
            return Err(malformed());
        }
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for ObjectName {
    type Error = ManagementError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ObjectName> for String {
    fn from(name: ObjectName) -> Self {
        name.0
    }
}

impl fmt::Display for ObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Operations the agent and its connector need from a management server.
pub trait ManagementServer: Send + Sync {
    /// Registered entry names, sorted.
    fn names(&self) -> Vec<ObjectName>;

    /// Distinct domains of the registered entries, sorted.
    fn domains(&self) -> Vec<String> {
        let domains: BTreeSet<String> = self.names().iter().map(|n| n.domain().to_string()).collect();
        domains.into_iter().collect()
    }

    fn attributes(&self, name: &ObjectName) -> Result<Map<String, Value>, ManagementError>;

    fn register(&self, name: ObjectName, attributes: Map<String, Value>) -> Result<(), ManagementError>;

    fn unregister(&self, name: &ObjectName) -> Result<(), ManagementError>;

    fn is_registered(&self, name: &ObjectName) -> bool {
        self.attributes(name).is_ok()
    }
}

/// In-process management registry.
#[derive(Debug, Default)]
pub struct LocalRegistry {
    entries: DashMap<ObjectName, Map<String, Value>>,
}

impl LocalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the built-in entries.
    pub fn platform() -> Self {
        let registry = Self::new();
        let builtins = [
            (
                "agent:type=Runtime",
                json!({
                    "name": env!("CARGO_PKG_NAME"),
                    "version": env!("CARGO_PKG_VERSION"),
                    "pid": std::process::id(),
                }),
            ),
            (
                "agent:type=OperatingSystem",
                json!({ "os": std::env::consts::OS, "arch": std::env::consts::ARCH }),
            ),
            (SENSITIVE_ENTRIES[0], json!({ "description": "Diagnostic command execution" })),
            (SENSITIVE_ENTRIES[1], json!({ "description": "Heap dumps and VM flags" })),
            (SENSITIVE_ENTRIES[2], json!({ "description": "Flight recording control" })),
        ];
        for (name, attributes) in builtins {
            if let (Ok(name), Value::Object(attributes)) = (name.parse(), attributes) {
                registry.entries.insert(name, attributes);
            }
        }
        registry
    }
}

impl ManagementServer for LocalRegistry {
    fn names(&self) -> Vec<ObjectName> {
        let mut names: Vec<ObjectName> = self.entries.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    fn attributes(&self, name: &ObjectName) -> Result<Map<String, Value>, ManagementError> {
        self.entries
            .get(name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| ManagementError::NotFound(name.clone()))
    }

    fn register(&self, name: ObjectName, attributes: Map<String, Value>) -> Result<(), ManagementError> {
        match self.entries.entry(name) {
            dashmap::mapref::entry::Entry::Occupied(e) => Err(ManagementError::AlreadyExists(e.key().clone())),
            dashmap::mapref::entry::Entry::Vacant(e) => {
                e.insert(attributes);
                Ok(())
            }
        }
    }

    fn unregister(&self, name: &ObjectName) -> Result<(), ManagementError> {
        self.entries
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| ManagementError::NotFound(name.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_name_validation() {
        let name: ObjectName = "agent:type=Runtime,name=x".parse().unwrap();
        assert_eq!(name.domain(), "agent");
        for bad in ["", "agent", ":type=x", "agent:", "agent:type", "agent:type=x,"] {
            assert!(bad.parse::<ObjectName>().is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn platform_registry_has_sensitive_entries() {
        let registry = LocalRegistry::platform();
        for name in SENSITIVE_ENTRIES {
            assert!(registry.is_registered(&name.parse().unwrap()), "{name}");
        }
        assert_eq!(registry.domains(), vec!["agent", "management", "management.jfr"]);
    }

    #[test]
    fn domains_are_distinct_when_names_interleave() {
        let registry = LocalRegistry::new();
        for name in ["app:type=A", "app.cache:type=B", "app:type=C", "zeta:type=D"] {
            registry.register(name.parse().unwrap(), Map::new()).unwrap();
        }
        assert_eq!(registry.domains(), vec!["app", "app.cache", "zeta"]);
    }

    #[test]
    fn register_and_unregister() {
        let registry = LocalRegistry::new();
        let name: ObjectName = "app:type=Cache".parse().unwrap();
        registry.register(name.clone(), Map::new()).unwrap();
        assert_eq!(
            registry.register(name.clone(), Map::new()),
            Err(ManagementError::AlreadyExists(name.clone()))
        );
        registry.unregister(&name).unwrap();
        assert_eq!(registry.unregister(&name), Err(ManagementError::NotFound(name)));
    }
}
