//! Server configuration module.
//!
//! Parses configuration from environment variables for the ListKeeper server.
//!
//! # Environment Variables
//!
//! | Variable | Required | Default | Description |
//! |----------|----------|---------|-------------|
//! | `PORT` | No | 4567 | HTTP server port |
//! | `LISTKEEPER_SESSION_TTL_SECS` | No | 86400 | Idle time before a session expires |
//! | `LISTKEEPER_MAX_SESSIONS` | No | 10000 | Maximum number of live sessions |
//! | `LISTKEEPER_CLEANUP_INTERVAL_SECS` | No | 60 | Expired-session sweep interval |
//! | `LISTKEEPER_COOKIE_NAME` | No | `listkeeper_session` | Session cookie name |
//! | `LISTKEEPER_SECURE_COOKIE` | No | false | Mark the session cookie `Secure` |

use std::env;
use std::time::Duration;

use thiserror::Error;
use tracing::warn;

use crate::session::SessionStoreConfig;

/// Default HTTP server port.
const DEFAULT_PORT: u16 = 4567;

/// Default idle session lifetime (one day).
const DEFAULT_SESSION_TTL_SECS: u64 = 86_400;

/// Default session store capacity.
const DEFAULT_MAX_SESSIONS: usize = 10_000;

/// Default interval between expired-session sweeps.
const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 60;

/// Default session cookie name.
pub const DEFAULT_COOKIE_NAME: &str = "listkeeper_session";

/// Errors that can occur when parsing configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable has invalid format.
    #[error("invalid format for {var}: {message}")]
    InvalidFormat { var: String, message: String },

    /// A numeric value failed to parse.
    #[error("invalid number: {0}")]
    InvalidNumber(#[from] std::num::ParseIntError),

    /// Configuration validation failed.
    #[error("configuration validation failed: {0}")]
    ValidationError(String),
}

/// Server configuration parsed from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// HTTP server port.
    pub port: u16,

    /// Sliding session lifetime; refreshed on every request.
    pub session_ttl: Duration,

    /// Maximum number of sessions held in memory.
    pub max_sessions: usize,

    /// How often the background task sweeps expired sessions.
    pub cleanup_interval: Duration,

    /// Name of the cookie carrying the session token.
    pub cookie_name: String,

    /// When true, the session cookie carries the `Secure` attribute.
    pub secure_cookie: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
            max_sessions: DEFAULT_MAX_SESSIONS,
            cleanup_interval: Duration::from_secs(DEFAULT_CLEANUP_INTERVAL_SECS),
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            secure_cookie: false,
        }
    }
}

impl Config {
    /// Parse configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is not valid unicode, a number
    /// fails to parse, or the resulting configuration fails validation.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use listkeeper_server::config::Config;
    ///
    /// let config = Config::from_env().expect("Failed to load config");
    /// println!("Server will listen on port {}", config.port);
    /// ```
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = parse_number("PORT", DEFAULT_PORT)?;
        let session_ttl = Duration::from_secs(parse_number(
            "LISTKEEPER_SESSION_TTL_SECS",
            DEFAULT_SESSION_TTL_SECS,
        )?);
        let max_sessions = parse_number("LISTKEEPER_MAX_SESSIONS", DEFAULT_MAX_SESSIONS)?;
        let cleanup_interval = Duration::from_secs(parse_number(
            "LISTKEEPER_CLEANUP_INTERVAL_SECS",
            DEFAULT_CLEANUP_INTERVAL_SECS,
        )?);
        let cookie_name = match read_var("LISTKEEPER_COOKIE_NAME")? {
            Some(name) => name.trim().to_string(),
            None => DEFAULT_COOKIE_NAME.to_string(),
        };
        let secure_cookie = parse_bool_env("LISTKEEPER_SECURE_COOKIE");

        let config = Self {
            port,
            session_ttl,
            max_sessions,
            cleanup_interval,
            cookie_name,
            secure_cookie,
        };

        config.validate()?;

        if !config.secure_cookie {
            warn!("LISTKEEPER_SECURE_COOKIE is not set - session cookie will be sent over plain HTTP");
        }

        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session_ttl.is_zero() {
            return Err(ConfigError::ValidationError(
                "session TTL must be greater than zero".to_string(),
            ));
        }

        if self.max_sessions == 0 {
            return Err(ConfigError::ValidationError(
                "max sessions must be greater than zero".to_string(),
            ));
        }

        if self.cleanup_interval.is_zero() {
            return Err(ConfigError::ValidationError(
                "cleanup interval must be greater than zero".to_string(),
            ));
        }

        if !is_valid_cookie_name(&self.cookie_name) {
            return Err(ConfigError::InvalidFormat {
                var: "LISTKEEPER_COOKIE_NAME".to_string(),
                message: format!("'{}' is not a valid cookie name", self.cookie_name),
            });
        }

        Ok(())
    }

    /// Session store settings derived from this configuration.
    pub fn session_store_config(&self) -> SessionStoreConfig {
        SessionStoreConfig::new(self.max_sessions, self.session_ttl)
    }
}

/// Cookie names are RFC 6265 tokens: visible ASCII minus separators.
fn is_valid_cookie_name(name: &str) -> bool {
    !name.is_empty()
        && name.bytes().all(|b| {
            b.is_ascii_graphic() && !b"()<>@,;:\\\"/[]?={}".contains(&b)
        })
}

/// Read an environment variable, treating "not set" as `None`.
fn read_var(name: &str) -> Result<Option<String>, ConfigError> {
    match env::var(name) {
        Ok(value) => Ok(Some(value)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(_)) => Err(ConfigError::InvalidFormat {
            var: name.to_string(),
            message: "contains invalid unicode".to_string(),
        }),
    }
}

/// Parse a numeric environment variable, falling back to `default` if unset.
fn parse_number<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr<Err = std::num::ParseIntError>,
{
    match read_var(name)? {
        Some(value) => Ok(value.trim().parse()?),
        None => Ok(default),
    }
}

/// Parse a boolean environment variable.
///
/// Returns `true` if the variable is set to "true" (case-insensitive),
/// `false` otherwise.
fn parse_bool_env(name: &str) -> bool {
    env::var(name)
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    const ALL_VARS: [&str; 6] = [
        "PORT",
        "LISTKEEPER_SESSION_TTL_SECS",
        "LISTKEEPER_MAX_SESSIONS",
        "LISTKEEPER_CLEANUP_INTERVAL_SECS",
        "LISTKEEPER_COOKIE_NAME",
        "LISTKEEPER_SECURE_COOKIE",
    ];

    /// Helper to temporarily set environment variables for testing.
    struct EnvGuard {
        vars: Vec<(String, Option<String>)>,
    }

    impl EnvGuard {
        fn new() -> Self {
            Self { vars: Vec::new() }
        }

        /// Starts from a clean slate for every variable the config reads.
        fn clean() -> Self {
            let mut guard = Self::new();
            for var in ALL_VARS {
                guard.remove(var);
            }
            guard
        }

        fn set(&mut self, key: &str, value: &str) {
            let old_value = env::var(key).ok();
            self.vars.push((key.to_string(), old_value));
            env::set_var(key, value);
        }

        fn remove(&mut self, key: &str) {
            let old_value = env::var(key).ok();
            self.vars.push((key.to_string(), old_value));
            env::remove_var(key);
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (key, value) in self.vars.iter().rev() {
                match value {
                    Some(v) => env::set_var(key, v),
                    None => env::remove_var(key),
                }
            }
        }
    }

    #[test]
    #[serial]
    fn test_config_defaults() {
        let _guard = EnvGuard::clean();

        let config = Config::from_env().expect("should parse config");
        assert_eq!(config, Config::default());
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.cookie_name, DEFAULT_COOKIE_NAME);
        assert!(!config.secure_cookie);
    }

    #[test]
    #[serial]
    fn test_config_all_values_set() {
        let mut guard = EnvGuard::clean();
        guard.set("PORT", "9090");
        guard.set("LISTKEEPER_SESSION_TTL_SECS", "600");
        guard.set("LISTKEEPER_MAX_SESSIONS", "25");
        guard.set("LISTKEEPER_CLEANUP_INTERVAL_SECS", "5");
        guard.set("LISTKEEPER_COOKIE_NAME", "sid");
        guard.set("LISTKEEPER_SECURE_COOKIE", "TRUE");

        let config = Config::from_env().expect("should parse config");
        assert_eq!(config.port, 9090);
        assert_eq!(config.session_ttl, Duration::from_secs(600));
        assert_eq!(config.max_sessions, 25);
        assert_eq!(config.cleanup_interval, Duration::from_secs(5));
        assert_eq!(config.cookie_name, "sid");
        assert!(config.secure_cookie);
    }

    #[test]
    #[serial]
    fn test_parse_port_invalid() {
        let mut guard = EnvGuard::clean();
        guard.set("PORT", "not-a-number");

        let result = Config::from_env();
        assert!(matches!(result.unwrap_err(), ConfigError::InvalidNumber(_)));
    }

    #[test]
    #[serial]
    fn test_parse_port_out_of_range() {
        let mut guard = EnvGuard::clean();
        guard.set("PORT", "99999");

        assert!(Config::from_env().is_err());
    }

    #[test]
    #[serial]
    fn test_zero_ttl_rejected() {
        let mut guard = EnvGuard::clean();
        guard.set("LISTKEEPER_SESSION_TTL_SECS", "0");

        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    #[serial]
    fn test_zero_capacity_rejected() {
        let mut guard = EnvGuard::clean();
        guard.set("LISTKEEPER_MAX_SESSIONS", "0");

        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    #[serial]
    fn test_invalid_cookie_name_rejected() {
        let mut guard = EnvGuard::clean();
        guard.set("LISTKEEPER_COOKIE_NAME", "bad name;");

        let err = Config::from_env().unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidFormat { ref var, .. } if var == "LISTKEEPER_COOKIE_NAME")
        );
    }

    #[test]
    #[serial]
    fn test_parse_bool_env_values() {
        let mut guard = EnvGuard::new();
        guard.set("TEST_BOOL", "True");
        assert!(parse_bool_env("TEST_BOOL"));

        guard.set("TEST_BOOL", "yes");
        assert!(!parse_bool_env("TEST_BOOL"));

        guard.remove("TEST_BOOL");
        assert!(!parse_bool_env("TEST_BOOL"));
    }

    #[test]
    fn test_validate_rejects_zero_cleanup_interval() {
        let config = Config {
            cleanup_interval: Duration::ZERO,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_cookie_name_rules() {
        assert!(is_valid_cookie_name("listkeeper_session"));
        assert!(is_valid_cookie_name("sid-2"));
        assert!(!is_valid_cookie_name(""));
        assert!(!is_valid_cookie_name("a=b"));
        assert!(!is_valid_cookie_name("with space"));
    }

    #[test]
    fn test_session_store_config_follows_config() {
        let config = Config {
            max_sessions: 3,
            session_ttl: Duration::from_secs(42),
            ..Config::default()
        };
        let store_config = config.session_store_config();
        assert_eq!(store_config.max_capacity, 3);
        assert_eq!(store_config.ttl, Duration::from_secs(42));
    }
}
