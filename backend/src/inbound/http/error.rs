//! HTTP rendering of application errors.
//!
//! Every failure leaves the server as an [`ErrorEnvelope`]. The
//! [`ErrorFormatter`] classifies the error, stamps the request context and
//! decides, from the deployment mode, whether diagnostics may be exposed.
//! The `ErrorFilter` middleware drives it for every request; the
//! [`ResponseError`] impl is the fallback when no request is at hand.

use std::sync::Arc;

use actix_web::error::{JsonPayloadError, QueryPayloadError};
use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, ResponseError};
use chrono::SecondsFormat;
use mockable::{Clock, DefaultClock};
use serde::Serialize;
use tracing::{error, warn};
use utoipa::ToSchema;

use crate::config::DeploymentMode;
use crate::domain::{
    AppError, CorrelationId, DataDiagnostics, ErrorClassifier, ErrorMessage, FieldErrors,
    HttpException,
};

/// JSON body of every error response.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEnvelope {
    #[schema(example = 404)]
    pub status_code: u16,
    pub message: ErrorMessage,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "RECORD_NOT_FOUND")]
    pub error_code: Option<String>,
    /// Field issues for validation failures, or the raw `errors` member of
    /// an HTTP exception.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub errors: Option<FieldErrors>,
    /// UTC, millisecond precision.
    #[schema(example = "2024-03-01T09:00:00.000Z")]
    pub timestamp: String,
    /// Request path including the query string.
    pub path: String,
    pub method: String,
    /// Development only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    /// Raw data-layer code and metadata. Development only.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub prisma: Option<DataDiagnostics>,
}

/// The parts of a request echoed in the envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub method: String,
    pub path: String,
}

impl RequestContext {
    /// Capture method and path-with-query from `req`.
    pub fn from_request(req: &HttpRequest) -> Self {
        let path = req
            .uri()
            .path_and_query()
            .map_or_else(|| req.path().to_owned(), |pq| pq.as_str().to_owned());
        Self {
            method: req.method().to_string(),
            path,
        }
    }
}

/// Builds envelopes and responses for failed requests.
#[derive(Clone)]
pub struct ErrorFormatter {
    classifier: ErrorClassifier,
    mode: DeploymentMode,
    clock: Arc<dyn Clock>,
}

impl ErrorFormatter {
    /// Create a formatter.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    ///
    /// use b2b_api::config::DeploymentMode;
    /// use b2b_api::domain::ErrorClassifier;
    /// use b2b_api::inbound::http::error::ErrorFormatter;
    /// use mockable::DefaultClock;
    ///
    /// let formatter = ErrorFormatter::new(
    ///     ErrorClassifier::default(),
    ///     DeploymentMode::Production,
    ///     Arc::new(DefaultClock),
    /// );
    /// assert!(!formatter.mode().is_development());
    /// ```
    pub fn new(classifier: ErrorClassifier, mode: DeploymentMode, clock: Arc<dyn Clock>) -> Self {
        Self {
            classifier,
            mode,
            clock,
        }
    }

    /// Deployment mode deciding whether stacks and diagnostics are exposed.
    pub fn mode(&self) -> DeploymentMode {
        self.mode
    }

    /// Build the envelope for `error` raised while serving `ctx`.
    pub fn envelope(&self, error: &AppError, ctx: &RequestContext) -> ErrorEnvelope {
        let classification = self.classifier.classify(error);
        let development = self.mode.is_development();
        ErrorEnvelope {
            status_code: classification.status,
            message: classification.message,
            error_code: classification.error_code,
            errors: classification.errors,
            timestamp: self
                .clock
                .utc()
                .to_rfc3339_opts(SecondsFormat::Millis, true),
            path: ctx.path.clone(),
            method: ctx.method.clone(),
            stack: development.then(|| error.stack()).flatten(),
            prisma: development.then_some(classification.diagnostics).flatten(),
        }
    }

    /// Render `error` as an HTTP response and log it.
    ///
    /// Server errors are logged at `error` level with the stack; client
    /// errors at `warn`. Statuses below 400 are not logged.
    pub fn render(&self, error: &AppError, ctx: &RequestContext) -> HttpResponse {
        let envelope = self.envelope(error, ctx);
        log_failure(error, &envelope);
        respond(&envelope)
    }
}

fn log_failure(error: &AppError, envelope: &ErrorEnvelope) {
    let correlation_id = CorrelationId::current();
    let correlation_id = correlation_id.as_ref().map(CorrelationId::as_str);
    let status = envelope.status_code;
    if status >= 500 {
        error!(
            correlation_id,
            error = %error,
            stack = error.stack().as_deref(),
            "{} {} - Status: {status}",
            envelope.method,
            envelope.path,
        );
    } else if status >= 400 {
        warn!(
            correlation_id,
            error = %error,
            "{} {} - Status: {status}",
            envelope.method,
            envelope.path,
        );
    }
}

fn respond(envelope: &ErrorEnvelope) -> HttpResponse {
    let status =
        StatusCode::from_u16(envelope.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    HttpResponse::build(status).json(envelope)
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(ErrorClassifier::default().classify(self).status)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn error_response(&self) -> HttpResponse {
        // No request in scope: production rendering, nothing logged. The
        // error filter replaces this response whenever it runs.
        let formatter = ErrorFormatter::new(
            ErrorClassifier::default(),
            DeploymentMode::Production,
            Arc::new(DefaultClock),
        );
        respond(&formatter.envelope(self, &RequestContext::default()))
    }
}

/// Default service for unmatched routes.
///
/// # Errors
///
/// Always fails with a 404 `Cannot {METHOD} {path}` exception.
pub async fn route_not_found(req: HttpRequest) -> Result<HttpResponse, AppError> {
    Err(HttpException::not_found(format!("Cannot {} {}", req.method(), req.path())).into())
}

/// Report malformed JSON bodies as 400 framework exceptions.
pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let status = err.status_code().as_u16();
    AppError::from(HttpException::text(status, err.to_string())).into()
}

/// Report malformed query strings as 400 framework exceptions.
pub fn query_error_handler(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::from(HttpException::bad_request(err.to_string())).into()
}

#[cfg(test)]
mod tests;
