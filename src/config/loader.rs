//! Multi-source configuration resolution.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::builder::ConfigBuilder;
use crate::config::properties::Properties;
use crate::config::schema::ResolvedConfiguration;
use crate::net::tls::TlsError;
use crate::security::policy::PolicyError;

/// Error type for configuration resolution.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unusable configuration file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration file {0} redirects to itself")]
    Cycle(PathBuf),

    #[error("Invalid key '{0}'")]
    UnknownKey(String),

    #[error("Key '{0}' requires a value")]
    MissingValue(String),

    #[error("No port configured")]
    MissingPort,

    #[error("Invalid port '{0}'")]
    InvalidPort(String),

    #[error("Unknown protocol '{0}'")]
    UnknownProtocol(String),

    #[error("Unusable login policy source: {0}")]
    PolicySource(#[from] PolicyError),

    #[error("Unusable security context: {0}")]
    SecurityContext(#[from] TlsError),
}

/// One configuration source.
#[derive(Debug, Clone)]
pub enum Source {
    Properties(Properties),
    File(PathBuf),
}

impl From<Properties> for Source {
    fn from(props: Properties) -> Self {
        Self::Properties(props)
    }
}

/// Merge the sources in order into a frozen configuration.
pub fn resolve(sources: &[Source]) -> Result<ResolvedConfiguration, ConfigError> {
    resolve_with(ConfigBuilder::new(), sources)
}

/// Like [`resolve`], starting from a prepared builder.
pub fn resolve_with(
    mut builder: ConfigBuilder,
    sources: &[Source],
) -> Result<ResolvedConfiguration, ConfigError> {
    for source in sources {
        match source {
            Source::Properties(props) => builder.read_properties(props)?,
            Source::File(path) => builder.read_file(path)?,
        };
    }
    builder.build()
}
