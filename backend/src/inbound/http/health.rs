//! Health endpoints.
//!
//! `live` and `ready` are orchestration probes answering with an empty body.
//! `health` and `health/db` are JSON status reports for operators; the
//! database report always answers 200 and describes the outage in its body.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use actix_web::{HttpResponse, get, http::header, web};
use chrono::SecondsFormat;
use serde::Serialize;
use tracing::warn;
use utoipa::ToSchema;

use crate::inbound::http::state::HttpState;

/// Shared health state for readiness and liveness checks.
pub struct HealthState {
    ready: AtomicBool,
    live: AtomicBool,
    started: Instant,
}

impl Default for HealthState {
    fn default() -> Self {
        Self {
            ready: AtomicBool::new(false),
            live: AtomicBool::new(true),
            started: Instant::now(),
        }
    }
}

impl HealthState {
    /// Create a new health state starting as not ready but live.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the service as ready.
    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }

    /// Flag the service as unhealthy so liveness checks fail fast during shutdown.
    pub fn mark_unhealthy(&self) {
        self.live.store(false, Ordering::Release);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub fn is_alive(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    /// Seconds since the state was created.
    pub fn uptime(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    fn probe_response(probe_ok: bool) -> HttpResponse {
        let mut response = if probe_ok {
            HttpResponse::Ok()
        } else {
            HttpResponse::ServiceUnavailable()
        };

        response
            .insert_header((header::CACHE_CONTROL, "no-store"))
            .finish()
    }
}

/// Process status report.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthReport {
    #[schema(example = "ok")]
    pub status: &'static str,
    pub timestamp: String,
    /// Seconds since start-up.
    pub uptime: f64,
}

/// Database connectivity report.
#[derive(Debug, Serialize, ToSchema)]
pub struct DatabaseHealthReport {
    /// `ok` or `down`.
    #[schema(example = "ok")]
    pub status: &'static str,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn now(state: &HttpState) -> String {
    state.clock.utc().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Readiness probe. Return 200 when dependencies are initialised and the server can handle traffic; return 503 otherwise.
#[utoipa::path(
    get,
    path = "/health/ready",
    tags = ["health"],
    responses(
        (status = 200, description = "Server is ready to handle traffic"),
        (status = 503, description = "Server is not ready")
    )
)]
#[get("/health/ready")]
pub async fn ready(state: web::Data<HealthState>) -> HttpResponse {
    HealthState::probe_response(state.is_ready())
}

/// Liveness probe. Return 200 while the process is marked alive and 503 once draining.
#[utoipa::path(
    get,
    path = "/health/live",
    tags = ["health"],
    responses(
        (status = 200, description = "Server is alive"),
        (status = 503, description = "Server is shutting down")
    )
)]
#[get("/health/live")]
pub async fn live(state: web::Data<HealthState>) -> HttpResponse {
    HealthState::probe_response(state.is_alive())
}

/// Basic health check.
#[utoipa::path(
    get,
    path = "/api/v1/health",
    tags = ["health"],
    responses((status = 200, description = "Process is up", body = HealthReport))
)]
#[get("/health")]
pub async fn health(
    health: web::Data<HealthState>,
    state: web::Data<HttpState>,
) -> web::Json<HealthReport> {
    web::Json(HealthReport {
        status: "ok",
        timestamp: now(&state),
        uptime: health.uptime(),
    })
}

/// Database health check.
#[utoipa::path(
    get,
    path = "/api/v1/health/db",
    tags = ["health"],
    responses((status = 200, description = "Database status", body = DatabaseHealthReport))
)]
#[get("/health/db")]
pub async fn database_health(state: web::Data<HttpState>) -> web::Json<DatabaseHealthReport> {
    let report = match state.database.ping().await {
        Ok(()) => DatabaseHealthReport {
            status: "ok",
            timestamp: now(&state),
            error: None,
        },
        Err(err) => {
            warn!(error = %err, "database health check failed");
            DatabaseHealthReport {
                status: "down",
                timestamp: now(&state),
                error: Some(err.to_string()),
            }
        }
    };
    web::Json(report)
}
