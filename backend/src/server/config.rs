//! HTTP server configuration object and helpers.

use std::net::SocketAddr;
use std::sync::Arc;

use mockable::{Clock, DefaultClock};

use crate::config::{AppSettings, DEFAULT_API_PREFIX, DeploymentMode, UnknownDeploymentMode};
use crate::domain::{DEFAULT_UNIQUE_FIELD_FALLBACK, ErrorClassifier};
use crate::inbound::http::error::ErrorFormatter;
use crate::outbound::persistence::DbPool;

/// Failures turning [`AppSettings`] into a [`ServerConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ServerConfigError {
    #[error(transparent)]
    Mode(#[from] UnknownDeploymentMode),
    #[error("invalid bind address: {0}")]
    BindAddr(#[from] std::net::AddrParseError),
}

/// Builder-style configuration for creating the HTTP server.
pub struct ServerConfig {
    pub(crate) bind_addr: SocketAddr,
    pub(crate) api_scope: String,
    pub(crate) mode: DeploymentMode,
    pub(crate) unique_field_fallback: String,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) db_pool: Option<DbPool>,
}

impl ServerConfig {
    /// Development defaults bound to `bind_addr`, with no database.
    #[must_use]
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            api_scope: format!("/{DEFAULT_API_PREFIX}"),
            mode: DeploymentMode::default(),
            unique_field_fallback: DEFAULT_UNIQUE_FIELD_FALLBACK.to_owned(),
            clock: Arc::new(DefaultClock),
            db_pool: None,
        }
    }

    /// Configuration derived from loaded settings. The database pool is
    /// attached separately once it has been built.
    ///
    /// # Errors
    ///
    /// Fails when `APP_ENV` names no known mode or the bind address does not
    /// parse.
    pub fn from_settings(settings: &AppSettings) -> Result<Self, ServerConfigError> {
        Ok(Self::new(settings.bind_addr()?)
            .with_mode(settings.mode()?)
            .with_api_scope(settings.api_scope())
            .with_unique_field_fallback(settings.unique_field_fallback()))
    }

    #[must_use]
    pub fn with_mode(mut self, mode: DeploymentMode) -> Self {
        self.mode = mode;
        self
    }

    /// Mount point for the API, e.g. `/api/v1`.
    #[must_use]
    pub fn with_api_scope(mut self, scope: impl Into<String>) -> Self {
        self.api_scope = scope.into();
        self
    }

    #[must_use]
    pub fn with_unique_field_fallback(mut self, word: impl Into<String>) -> Self {
        self.unique_field_fallback = word.into();
        self
    }

    /// Replace the clock used for timestamps and soft-delete stamps.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Attach a database connection pool for persistence adapters.
    ///
    /// Without one the server stores users in memory.
    #[must_use]
    pub fn with_db_pool(mut self, pool: DbPool) -> Self {
        self.db_pool = Some(pool);
        self
    }

    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }

    #[must_use]
    pub fn mode(&self) -> DeploymentMode {
        self.mode
    }

    #[must_use]
    pub fn api_scope(&self) -> &str {
        &self.api_scope
    }

    /// Formatter shared by the error filter.
    pub fn error_formatter(&self) -> ErrorFormatter {
        ErrorFormatter::new(
            ErrorClassifier::new(self.unique_field_fallback.clone()),
            self.mode,
            Arc::clone(&self.clock),
        )
    }
}
