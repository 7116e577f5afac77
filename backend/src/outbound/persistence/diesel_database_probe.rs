//! Diesel-backed [`DatabaseProbe`] used by the `/health/db` endpoint.

use async_trait::async_trait;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{DatabaseProbe, DatabaseProbeError};

use super::pool::DbPool;

/// Probe that round-trips `SELECT 1` through the pool.
#[derive(Clone)]
pub struct DieselDatabaseProbe {
    pool: DbPool,
}

impl DieselDatabaseProbe {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DatabaseProbe for DieselDatabaseProbe {
    async fn ping(&self) -> Result<(), DatabaseProbeError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| DatabaseProbeError::unavailable(err.to_string()))?;
        diesel::sql_query("SELECT 1")
            .execute(&mut conn)
            .await
            .map_err(|err| DatabaseProbeError::unavailable(err.to_string()))?;
        Ok(())
    }
}
