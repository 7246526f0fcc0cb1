//! Configuration builder.
//!
//! The builder accumulates raw string values from every source. Well-known
//! keys are dispatched through [`ConfigBuilder::apply_entry`]; every other
//! key is looked up in [`BEAN_SETTERS`]. Values are only parsed and
//! validated by [`ConfigBuilder::build`].

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::keys;
use crate::config::loader::ConfigError;
use crate::config::properties::Properties;
use crate::config::schema::{PolicyBinding, Protocol, ResolvedConfiguration};
use crate::net::resolve;
use crate::net::tls::SecurityContext;
use crate::security::policy::{LoginPolicy, PolicyFile};

/// Authentication-related settings cleared together by `authenticate=false`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSettings {
    pub login_policy: Option<String>,
    pub access_file: Option<String>,
    pub password_file: Option<String>,
    pub strict: Option<String>,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            login_policy: None,
            access_file: None,
            password_file: None,
            strict: Some("true".to_string()),
        }
    }
}

impl AuthSettings {
    /// Transition applied by `authenticate=false`.
    ///
    /// Clears the login policy, access file, password file and strict flag,
    /// whatever order they were set in.
    pub fn without_authentication(self) -> Self {
        Self {
            login_policy: None,
            access_file: None,
            password_file: None,
            strict: None,
        }
    }
}

/// Security context, either still a path or already loaded.
#[derive(Debug, Clone)]
enum ContextSetting {
    Path(String),
    Loaded(SecurityContext),
}

/// Builder for [`ResolvedConfiguration`].
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    protocol: String,
    port: Option<String>,
    hostname: Option<String>,
    security_context: Option<ContextSetting>,
    with_ssl: Option<String>,
    policy_source: Option<String>,
    policy: Option<Arc<dyn LoginPolicy>>,
    client_authentication: Option<String>,
    auth: AuthSettings,
    file_stack: Vec<PathBuf>,
}

type Setter = fn(&mut ConfigBuilder, String);

/// Value of an entry; bare boolean keys read as `"true"`.
fn value_of(key: &str, value: Option<&str>) -> Result<String, ConfigError> {
    match value {
        Some(value) => Ok(value.to_string()),
        None if keys::is_boolean(key) => Ok("true".to_string()),
        None => Err(ConfigError::MissingValue(key.to_string())),
    }
}

/// Settable fields reachable through bean-style keys.
pub const BEAN_SETTERS: [(&str, Setter); 11] = [
    ("protocol", ConfigBuilder::set_protocol),
    ("port", ConfigBuilder::set_port),
    ("hostname", ConfigBuilder::set_hostname),
    ("ssl_context", ConfigBuilder::set_ssl_context),
    ("with_ssl", ConfigBuilder::set_with_ssl),
    ("login_policy", ConfigBuilder::set_login_policy),
    ("policy_source", ConfigBuilder::set_policy_source),
    ("client_authentication", ConfigBuilder::set_client_authentication),
    ("password_file", ConfigBuilder::set_password_file),
    ("access_file", ConfigBuilder::set_access_file),
    ("strict", ConfigBuilder::set_strict),
];

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigBuilder {
    /// New builder; the hostname defaults to the local machine's address.
    pub fn new() -> Self {
        Self::with_hostname(Some(resolve::local_address().to_string()))
    }

    /// New builder with an explicit default hostname.
    pub fn with_hostname(hostname: Option<String>) -> Self {
        Self {
            protocol: Protocol::default().as_str().to_string(),
            port: None,
            hostname,
            security_context: None,
            with_ssl: None,
            policy_source: None,
            policy: None,
            client_authentication: None,
            auth: AuthSettings::default(),
            file_stack: Vec::new(),
        }
    }

    // Bean setters.

    pub fn set_protocol(&mut self, value: String) {
        self.protocol = value;
    }

    pub fn set_port(&mut self, value: String) {
        self.port = Some(value);
    }

    pub fn set_hostname(&mut self, value: String) {
        self.hostname = Some(value);
    }

    pub fn set_ssl_context(&mut self, value: String) {
        self.security_context = Some(ContextSetting::Path(value));
    }

    pub fn set_with_ssl(&mut self, value: String) {
        self.with_ssl = Some(value);
    }

    pub fn set_login_policy(&mut self, value: String) {
        self.auth.login_policy = Some(value);
    }

    pub fn set_policy_source(&mut self, value: String) {
        self.policy_source = Some(value);
    }

    pub fn set_client_authentication(&mut self, value: String) {
        self.client_authentication = Some(value);
    }

    pub fn set_password_file(&mut self, value: String) {
        self.auth.password_file = Some(value);
    }

    pub fn set_access_file(&mut self, value: String) {
        self.auth.access_file = Some(value);
    }

    pub fn set_strict(&mut self, value: String) {
        self.auth.strict = Some(value);
    }

    /// Use an already built security context.
    pub fn security_context(mut self, context: SecurityContext) -> Self {
        self.security_context = Some(ContextSetting::Loaded(context));
        self
    }

    /// Use an already built login policy instead of a policy source file.
    pub fn login_policy_source(mut self, policy: Arc<dyn LoginPolicy>) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn auth_settings(&self) -> &AuthSettings {
        &self.auth
    }

    pub fn hostname(&self) -> Option<&str> {
        self.hostname.as_deref()
    }

    pub fn apply_authenticate_false(&mut self) {
        self.auth = std::mem::take(&mut self.auth).without_authentication();
    }

    /// Apply one source.
    ///
    /// Config-file redirects in the source are loaded first; the remaining
    /// entries are applied in order afterwards.
    pub fn read_properties(&mut self, props: &Properties) -> Result<&mut Self, ConfigError> {
        for key in keys::CONFIG_FILE_KEYS {
            if let Some(Some(path)) = props.get(key) {
                self.read_file(Path::new(path))?;
            }
        }
        for (key, value) in props.iter() {
            self.apply_entry(key, value)?;
        }
        Ok(self)
    }

    /// Load a `key=value` file and apply it as a source.
    pub fn read_file(&mut self, path: &Path) -> Result<&mut Self, ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        let canonical = fs::canonicalize(path).map_err(io_err)?;
        if self.file_stack.contains(&canonical) {
            return Err(ConfigError::Cycle(path.to_path_buf()));
        }
        let content = fs::read_to_string(&canonical).map_err(io_err)?;

        tracing::debug!(path = %path.display(), "Reading configuration file");

        self.file_stack.push(canonical);
        let result = self.read_properties(&Properties::parse(&content)).map(|_| ());
        self.file_stack.pop();
        result?;
        Ok(self)
    }

    fn apply_entry(&mut self, key: &str, value: Option<&str>) -> Result<(), ConfigError> {
        match key {
            keys::CONFIG_FILE
            | keys::CONFIG_FILE_SHORT
            | keys::SSL_ENABLED_PROTOCOLS
            | keys::SSL_ENABLED_CIPHER_SUITES => {}
            keys::USE_LOCAL_HOSTNAME => {
                if keys::parse_bool(&value_of(key, value)?) {
                    self.hostname = Some(resolve::canonical_host_name());
                }
            }
            keys::AUTHENTICATE => {
                if value_of(key, value)?.eq_ignore_ascii_case("false") {
                    self.apply_authenticate_false();
                }
            }
            keys::HOSTNAME => self.set_hostname(value_of(key, value)?),
            keys::PORT => self.set_port(value_of(key, value)?),
            keys::REGISTRY_SSL => self.set_with_ssl(value_of(key, value)?),
            keys::SSL_NEED_CLIENT_AUTH => self.set_client_authentication(value_of(key, value)?),
            keys::PASSWORD_FILE => self.set_password_file(value_of(key, value)?),
            keys::ACCESS_FILE => self.set_access_file(value_of(key, value)?),
            keys::LOGIN_CONFIG => self.set_login_policy(value_of(key, value)?),
            _ => {
                self.read_bean(key, value)?;
            }
        }
        Ok(())
    }

    /// Apply a bean-style key through the setter table.
    pub fn read_bean(&mut self, name: &str, value: Option<&str>) -> Result<&mut Self, ConfigError> {
        let setter = BEAN_SETTERS
            .iter()
            .find(|(field, _)| *field == name)
            .map(|(_, setter)| *setter)
            .ok_or_else(|| ConfigError::UnknownKey(name.to_string()))?;
        setter(self, value_of(name, value)?);
        Ok(self)
    }

    /// Freeze the builder into a validated snapshot.
    pub fn build(&self) -> Result<ResolvedConfiguration, ConfigError> {
        let protocol: Protocol = self.protocol.parse()?;

        let port = self.port.as_deref().ok_or(ConfigError::MissingPort)?;
        let port = port.trim().parse::<u16>().map_err(|_| ConfigError::InvalidPort(port.to_string()))?;

        let policy_source = match (&self.policy, &self.policy_source) {
            (Some(policy), _) => Some(PolicyBinding {
                location: None,
                policy: Arc::clone(policy),
            }),
            (None, Some(location)) => {
                let location = PathBuf::from(location);
                let policy = PolicyFile::load(&location)?;
                Some(PolicyBinding {
                    location: Some(location),
                    policy: Arc::new(policy),
                })
            }
            (None, None) => None,
        };

        let security_context = match &self.security_context {
            Some(ContextSetting::Loaded(context)) => Some(context.clone()),
            Some(ContextSetting::Path(path)) => {
                Some(SecurityContext::from_pem_file(Path::new(path))?)
            }
            None => None,
        };

        let flag = |value: &Option<String>| value.as_deref().is_some_and(keys::parse_bool);

        let config = ResolvedConfiguration {
            protocol,
            port,
            hostname: self.hostname.clone(),
            with_ssl: flag(&self.with_ssl),
            security_context,
            login_policy: self.auth.login_policy.clone(),
            policy_source,
            client_authentication: flag(&self.client_authentication),
            password_file: self.auth.password_file.as_ref().map(PathBuf::from),
            access_file: self.auth.access_file.as_ref().map(PathBuf::from),
            strict: flag(&self.auth.strict),
        };

        tracing::debug!(
            protocol = %config.protocol,
            port = config.port,
            hostname = ?config.hostname,
            with_ssl = config.with_ssl,
            auth_mode = ?config.auth_mode(),
            strict = config.strict,
            "Configuration resolved"
        );
        Ok(config)
    }
}
