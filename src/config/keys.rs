//! Well-known configuration keys.
//!
//! Keys in this module are matched before the bean-style setter table. Every
//! process-level key is also read from the environment (see
//! [`env_var_name`]).

pub const HOSTNAME: &str = "management.remote.hostname";
pub const USE_LOCAL_HOSTNAME: &str = "management.remote.use_local_hostname";
pub const PORT: &str = "management.remote.port";
pub const REGISTRY_SSL: &str = "management.remote.registry.ssl";
pub const SSL_ENABLED_PROTOCOLS: &str = "management.remote.ssl.enabled.protocols";
pub const SSL_ENABLED_CIPHER_SUITES: &str = "management.remote.ssl.enabled.cipher.suites";
pub const SSL_NEED_CLIENT_AUTH: &str = "management.remote.ssl.need.client.auth";
pub const AUTHENTICATE: &str = "management.remote.authenticate";
pub const PASSWORD_FILE: &str = "management.remote.password.file";
pub const ACCESS_FILE: &str = "management.remote.access.file";
pub const LOGIN_CONFIG: &str = "management.remote.login.config";
pub const CONFIG_FILE: &str = "management.config.file";

/// Short spelling of [`CONFIG_FILE`].
pub const CONFIG_FILE_SHORT: &str = "config_file";

/// Redirect keys, in the order they are honoured within a single source.
pub const CONFIG_FILE_KEYS: [&str; 2] = [CONFIG_FILE, CONFIG_FILE_SHORT];

/// Keys read from the process environment.
pub const PROCESS_KEYS: [&str; 12] = [
    HOSTNAME,
    USE_LOCAL_HOSTNAME,
    PORT,
    REGISTRY_SSL,
    SSL_ENABLED_PROTOCOLS,
    SSL_ENABLED_CIPHER_SUITES,
    SSL_NEED_CLIENT_AUTH,
    AUTHENTICATE,
    PASSWORD_FILE,
    ACCESS_FILE,
    LOGIN_CONFIG,
    CONFIG_FILE,
];

/// Keys whose value defaults to `true` when present without a value.
pub const BOOLEAN_KEYS: [&str; 7] = [
    USE_LOCAL_HOSTNAME,
    REGISTRY_SSL,
    SSL_NEED_CLIENT_AUTH,
    AUTHENTICATE,
    "client_authentication",
    "strict",
    "with_ssl",
];

pub fn is_boolean(key: &str) -> bool {
    BOOLEAN_KEYS.contains(&key)
}

/// Parse a boolean value: `"true"` in any case is true, everything else false.
pub fn parse_bool(value: &str) -> bool {
    value.eq_ignore_ascii_case("true")
}

/// Environment variable carrying a process-level key.
///
/// `management.remote.port` is read from `MANAGEMENT_REMOTE_PORT`.
pub fn env_var_name(key: &str) -> String {
    key.to_ascii_uppercase().replace('.', "_")
}
