//! Port used by health checks to verify database connectivity.

use async_trait::async_trait;

use super::define_port_error;

define_port_error! {
    /// Failures raised while probing the database.
    pub enum DatabaseProbeError {
        /// The database could not be reached or did not answer the probe.
        Unavailable { message: String } => "database probe failed: {message}",
    }
}

/// Round-trips a trivial query against the database.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DatabaseProbe: Send + Sync {
    async fn ping(&self) -> Result<(), DatabaseProbeError>;
}

/// Probe for deployments running without a database; always succeeds.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureDatabaseProbe;

#[async_trait]
impl DatabaseProbe for FixtureDatabaseProbe {
    async fn ping(&self) -> Result<(), DatabaseProbeError> {
        Ok(())
    }
}
