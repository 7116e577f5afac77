//! Middleware rendering every failure as an error envelope.
//!
//! Catches, in one place, errors returned by handlers and extractors,
//! errors raised by inner middleware and panics unwinding out of a handler.
//! Each is converted to an [`AppError`] and rendered with the shared
//! [`ErrorFormatter`], so clients see one response shape regardless of where
//! the failure started.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use actix_web::body::{EitherBody, MessageBody};
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::Error;
use actix_web::error::InternalError;
use futures_util::FutureExt;
use futures_util::future::{LocalBoxFuture, Ready, ready};

use crate::domain::{AppError, HttpException};
use crate::inbound::http::error::{ErrorFormatter, RequestContext};

/// Error-normalising middleware.
///
/// # Examples
/// ```
/// use std::sync::Arc;
///
/// use actix_web::App;
/// use b2b_api::config::DeploymentMode;
/// use b2b_api::domain::ErrorClassifier;
/// use b2b_api::inbound::http::error::ErrorFormatter;
/// use b2b_api::middleware::ErrorFilter;
/// use mockable::DefaultClock;
///
/// let formatter = ErrorFormatter::new(
///     ErrorClassifier::default(),
///     DeploymentMode::Production,
///     Arc::new(DefaultClock),
/// );
/// let app = App::new().wrap(ErrorFilter::new(formatter));
/// ```
#[derive(Clone)]
pub struct ErrorFilter {
    formatter: Arc<ErrorFormatter>,
}

impl ErrorFilter {
    pub fn new(formatter: ErrorFormatter) -> Self {
        Self {
            formatter: Arc::new(formatter),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for ErrorFilter
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = ErrorFilterMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(ErrorFilterMiddleware {
            service,
            formatter: Arc::clone(&self.formatter),
        }))
    }
}

/// Service wrapper produced by [`ErrorFilter`].
pub struct ErrorFilterMiddleware<S> {
    service: S,
    formatter: Arc<ErrorFormatter>,
}

/// Describe a panic payload; only string payloads carry a message.
fn panic_description(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "Unknown error".to_owned())
}

/// Recover the application error behind a framework error, or wrap the
/// framework's own status and message as an HTTP exception.
fn to_app_error(err: &Error) -> AppError {
    err.as_error::<AppError>().cloned().unwrap_or_else(|| {
        let status = err.as_response_error().status_code().as_u16();
        HttpException::text(status, err.to_string()).into()
    })
}

/// Render `error` for a request whose `ServiceRequest` is no longer at hand.
///
/// The envelope rides inside an `InternalError`, whose response the server
/// (and any outer middleware) sends unchanged.
fn detached(formatter: &ErrorFormatter, error: AppError, ctx: &RequestContext) -> Error {
    let response = formatter.render(&error, ctx);
    InternalError::from_response(error, response).into()
}

impl<S, B> Service<ServiceRequest> for ErrorFilterMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    actix_service::forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        // Owned copy only: routing needs sole ownership of the request.
        let ctx = RequestContext::from_request(req.request());
        let formatter = Arc::clone(&self.formatter);
        let fut = match std::panic::catch_unwind(AssertUnwindSafe(|| self.service.call(req))) {
            Ok(fut) => fut,
            Err(payload) => {
                let error = AppError::unknown(panic_description(payload.as_ref()));
                return Box::pin(ready(Err(detached(&formatter, error, &ctx))));
            }
        };

        Box::pin(async move {
            match AssertUnwindSafe(fut).catch_unwind().await {
                Ok(Ok(res)) => match res.response().error().map(to_app_error) {
                    Some(error) => {
                        let (req, _) = res.into_parts();
                        let response = formatter.render(&error, &ctx);
                        Ok(ServiceResponse::new(req, response).map_into_right_body())
                    }
                    None => Ok(res.map_into_left_body()),
                },
                Ok(Err(err)) => Err(detached(&formatter, to_app_error(&err), &ctx)),
                Err(payload) => {
                    let error = AppError::unknown(panic_description(payload.as_ref()));
                    Err(detached(&formatter, error, &ctx))
                }
            }
        })
    }
}
