//! Middleware attaching a request-scoped correlation identifier.
//!
//! An inbound `x-correlation-id` header is reused when acceptable, otherwise
//! a UUID is generated. The identifier is placed in task-local storage for
//! the handler and the error filter, and echoed on every response.

use std::task::{Context, Poll};

use actix_web::Error;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::error::InternalError;
use actix_web::http::header::{HeaderMap, HeaderName, HeaderValue};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use tracing::error;

use crate::domain::CorrelationId;

/// Header carrying the correlation identifier in both directions.
pub const CORRELATION_HEADER: &str = "x-correlation-id";

/// Correlation middleware.
///
/// Handlers can read the identifier via [`CorrelationId::current`].
///
/// # Examples
/// ```
/// use actix_web::App;
/// use b2b_api::middleware::Correlation;
///
/// let app = App::new().wrap(Correlation);
/// ```
#[derive(Clone)]
pub struct Correlation;

impl<S, B> Transform<S, ServiceRequest> for Correlation
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = CorrelationMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(CorrelationMiddleware { service }))
    }
}

/// Service wrapper produced by [`Correlation`].
pub struct CorrelationMiddleware<S> {
    service: S,
}

fn inbound_id(req: &ServiceRequest) -> Option<CorrelationId> {
    req.headers()
        .get(CORRELATION_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(CorrelationId::from_header)
}

impl<S, B> Service<ServiceRequest> for CorrelationMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let id = inbound_id(&req).unwrap_or_else(CorrelationId::generate);
        let scoped = id.clone();
        let fut = self.service.call(req);
        Box::pin(CorrelationId::scope(scoped, async move {
            match fut.await {
                Ok(mut res) => {
                    tag(res.response_mut().headers_mut(), &id);
                    Ok(res)
                }
                Err(err) => {
                    let mut response = err.error_response();
                    tag(response.headers_mut(), &id);
                    Err(InternalError::from_response(err, response).into())
                }
            }
        }))
    }
}

/// Echo `id` on an outgoing response.
fn tag(headers: &mut HeaderMap, id: &CorrelationId) {
    match HeaderValue::from_str(id.as_str()) {
        Ok(value) => {
            headers.insert(HeaderName::from_static(CORRELATION_HEADER), value);
        }
        Err(error) => {
            error!(
                %error,
                correlation_id = %id,
                "failed to encode correlation identifier header"
            );
        }
    }
}
