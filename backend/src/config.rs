//! Application configuration loaded via OrthoConfig.
//!
//! Values come from `APP_*` environment variables, configuration files and
//! command-line flags, merged by `ortho_config`. Numeric settings carry
//! their defaults on the field; accessors supply the rest.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;

use ortho_config::OrthoConfig;
use serde::Deserialize;

use crate::domain::DEFAULT_UNIQUE_FIELD_FALLBACK;

pub const DEFAULT_API_PREFIX: &str = "api/v1";
const DEFAULT_LOG_LEVEL: &str = "info";

/// Deployment environment. Only [`DeploymentMode::Development`] exposes
/// stacks and data-layer diagnostics in error responses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeploymentMode {
    #[default]
    Development,
    Staging,
    Production,
    Test,
}

impl DeploymentMode {
    pub fn is_development(self) -> bool {
        matches!(self, Self::Development)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Staging => "staging",
            Self::Production => "production",
            Self::Test => "test",
        }
    }
}

impl fmt::Display for DeploymentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned for an unrecognised environment name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown deployment environment {0:?}; expected development, staging, production or test")]
pub struct UnknownDeploymentMode(pub String);

impl FromStr for DeploymentMode {
    type Err = UnknownDeploymentMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "staging" => Ok(Self::Staging),
            "production" | "prod" => Ok(Self::Production),
            "test" => Ok(Self::Test),
            _ => Err(UnknownDeploymentMode(s.to_owned())),
        }
    }
}

/// Settings for the API server.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "APP")]
pub struct AppSettings {
    /// `development`, `staging`, `production` or `test`.
    pub env: Option<String>,
    /// Interface to bind; defaults to all interfaces.
    pub host: Option<String>,
    /// TCP port to listen on.
    #[ortho_config(default = 3000)]
    pub port: u16,
    /// Path prefix for versioned routes, without slashes at either end.
    pub api_prefix: Option<String>,
    /// PostgreSQL URL. Without one the server keeps users in memory.
    pub database_url: Option<String>,
    /// Word used in unique-violation messages when the fields are unknown.
    pub unique_field_fallback: Option<String>,
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    pub log_level: Option<String>,
    /// Upper bound on pooled database connections.
    #[ortho_config(default = 10)]
    pub pool_max_size: u32,
}

impl AppSettings {
    /// The configured mode.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownDeploymentMode`] for an unrecognised name so that a
    /// typo cannot silently enable development diagnostics.
    pub fn mode(&self) -> Result<DeploymentMode, UnknownDeploymentMode> {
        self.env
            .as_deref()
            .map_or(Ok(DeploymentMode::default()), str::parse)
    }

    /// Socket address to bind.
    ///
    /// # Errors
    ///
    /// Returns the parse error when `host` is not an IP address.
    pub fn bind_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        let host = match self.host.as_deref() {
            Some(host) => host.parse::<IpAddr>()?,
            None => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        };
        Ok(SocketAddr::new(host, self.port))
    }

    /// Route prefix as a scope path, e.g. `/api/v1`.
    pub fn api_scope(&self) -> String {
        let prefix = self
            .api_prefix
            .as_deref()
            .unwrap_or(DEFAULT_API_PREFIX)
            .trim_matches('/');
        if prefix.is_empty() {
            String::new()
        } else {
            format!("/{prefix}")
        }
    }

    pub fn database_url(&self) -> Option<&str> {
        self.database_url.as_deref().filter(|url| !url.is_empty())
    }

    pub fn unique_field_fallback(&self) -> &str {
        self.unique_field_fallback
            .as_deref()
            .unwrap_or(DEFAULT_UNIQUE_FIELD_FALLBACK)
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn pool_max_size(&self) -> u32 {
        self.pool_max_size
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for configuration parsing.

    use super::*;
    use std::ffi::OsString;

    use env_lock::lock_env;
    use rstest::rstest;

    const KEYS: [&str; 8] = [
        "APP_ENV",
        "APP_HOST",
        "APP_PORT",
        "APP_API_PREFIX",
        "APP_DATABASE_URL",
        "APP_UNIQUE_FIELD_FALLBACK",
        "APP_LOG_LEVEL",
        "APP_POOL_MAX_SIZE",
    ];

    fn load_from_empty_args() -> AppSettings {
        AppSettings::load_from_iter([OsString::from("b2b-api")]).expect("config should load")
    }

    #[rstest]
    fn default_values_are_used_when_missing() {
        let _guard = lock_env(KEYS.map(|key| (key, None::<String>)));

        let settings = load_from_empty_args();
        assert_eq!(settings.mode(), Ok(DeploymentMode::Development));
        assert_eq!(
            settings.bind_addr().expect("default address"),
            SocketAddr::from(([0, 0, 0, 0], 3000))
        );
        assert_eq!(settings.api_scope(), "/api/v1");
        assert!(settings.database_url().is_none());
        assert_eq!(settings.unique_field_fallback(), "field");
        assert_eq!(settings.log_level(), "info");
        assert_eq!(settings.pool_max_size(), 10);
    }

    #[rstest]
    fn environment_overrides_are_respected() {
        let _guard = lock_env([
            ("APP_ENV", Some("production".to_owned())),
            ("APP_HOST", Some("127.0.0.1".to_owned())),
            ("APP_PORT", Some("8080".to_owned())),
            ("APP_API_PREFIX", Some("/api/v2/".to_owned())),
            ("APP_DATABASE_URL", Some("postgres://localhost/app".to_owned())),
            ("APP_UNIQUE_FIELD_FALLBACK", Some("value".to_owned())),
            ("APP_LOG_LEVEL", Some("debug".to_owned())),
            ("APP_POOL_MAX_SIZE", Some("4".to_owned())),
        ]);

        let settings = load_from_empty_args();
        assert_eq!(settings.mode(), Ok(DeploymentMode::Production));
        assert_eq!(
            settings.bind_addr().expect("configured address"),
            SocketAddr::from(([127, 0, 0, 1], 8080))
        );
        assert_eq!(settings.api_scope(), "/api/v2");
        assert_eq!(settings.database_url(), Some("postgres://localhost/app"));
        assert_eq!(settings.unique_field_fallback(), "value");
        assert_eq!(settings.log_level(), "debug");
        assert_eq!(settings.pool_max_size(), 4);
    }

    #[rstest]
    #[case("Development", DeploymentMode::Development)]
    #[case("prod", DeploymentMode::Production)]
    #[case(" test ", DeploymentMode::Test)]
    fn mode_names_are_forgiving(#[case] raw: &str, #[case] expected: DeploymentMode) {
        assert_eq!(raw.parse::<DeploymentMode>(), Ok(expected));
    }

    #[rstest]
    fn unknown_mode_is_an_error_not_development() {
        let settings = AppSettings {
            env: Some("devel0pment".into()),
            host: None,
            port: 3000,
            api_prefix: None,
            database_url: None,
            unique_field_fallback: None,
            log_level: None,
            pool_max_size: 10,
        };
        assert!(settings.mode().is_err());
    }
}
