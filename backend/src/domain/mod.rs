//! Domain primitives, ports and services.
//!
//! Purpose: hold everything that does not depend on a web framework or a
//! database driver. Inbound adapters call the driving ports in [`ports`];
//! outbound adapters implement the driven ones.
//!
//! Public surface:
//! - [`AppError`] and the collaborator error types it wraps.
//! - [`ErrorClassifier`], which turns any [`AppError`] into a
//!   [`Classification`].
//! - [`data_access`], the soft-delete and sensitive-field policy layer.
//! - [`User`] and its request payloads, plus [`UsersService`].

pub mod classifier;
pub mod correlation_id;
pub mod data_access;
pub mod failure;
pub mod ports;
pub mod user;
pub mod user_list_query;
pub mod users_service;

pub use self::classifier::{
    Classification, DEFAULT_UNIQUE_FIELD_FALLBACK, DataDiagnostics, DataErrorMapping,
    ErrorClassifier, FieldErrors, FieldIssue, classifier_order, map_data_error,
};
pub use self::correlation_id::CorrelationId;
pub use self::failure::{
    AppError, DataErrorCode, DataLayerError, ErrorKind, ErrorMessage, HttpException,
    HttpExceptionPayload, IssueCode, PathSegment, SchemaValidationError, ValidationIssue,
};
pub use self::user::{
    CreateUserRequest, NewUser, UpdateUserRequest, User, UserChanges, UserId, UserRole,
};
pub use self::user_list_query::{CreatedBetween, UserListParams, UserListQuery};
pub use self::users_service::UsersService;

/// Convenient handler result alias.
///
/// # Examples
/// ```
/// use actix_web::HttpResponse;
/// use b2b_api::domain::{ApiResult, HttpException};
///
/// fn handler() -> ApiResult<HttpResponse> {
///     Err(HttpException::forbidden("nope").into())
/// }
/// ```
pub type ApiResult<T> = Result<T, AppError>;
