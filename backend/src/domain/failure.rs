//! Failure taxonomy shared by handlers, services and persistence adapters.
//!
//! Every collaborator boundary reports failures through an explicit sum type:
//! the web framework raises [`HttpException`], request schema checks raise
//! [`SchemaValidationError`] and persistence adapters raise
//! [`DataLayerError`]. Handlers return [`AppError`], which wraps whichever of
//! these occurred so the classifier can pattern match instead of probing
//! untyped values.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Client-facing message: a single string or an ordered list of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(untagged)]
pub enum ErrorMessage {
    Single(String),
    List(Vec<String>),
}

impl ErrorMessage {
    /// Render the message as one line, joining list entries with `; `.
    pub fn to_line(&self) -> String {
        match self {
            Self::Single(message) => message.clone(),
            Self::List(messages) => messages.join("; "),
        }
    }
}

impl From<&str> for ErrorMessage {
    fn from(value: &str) -> Self {
        Self::Single(value.to_owned())
    }
}

impl From<String> for ErrorMessage {
    fn from(value: String) -> Self {
        Self::Single(value)
    }
}

impl From<Vec<String>> for ErrorMessage {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

/// Body carried by an [`HttpException`].
#[derive(Debug, Clone, PartialEq)]
pub enum HttpExceptionPayload {
    /// Plain string response.
    Text(String),
    /// Structured response with optional `message` and `errors` members.
    Object {
        message: Option<ErrorMessage>,
        errors: Option<Value>,
    },
}

/// Exception raised through the web layer's own mechanism: an explicit HTTP
/// status plus a response payload.
///
/// # Examples
/// ```
/// use b2b_api::domain::HttpException;
///
/// let err = HttpException::not_found("User 42 not found");
/// assert_eq!(err.status(), 404);
/// assert_eq!(err.to_string(), "User 42 not found");
/// ```
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct HttpException {
    status: u16,
    payload: HttpExceptionPayload,
    message: String,
}

impl HttpException {
    /// Build an exception from its raw parts.
    pub fn new(status: u16, payload: HttpExceptionPayload, message: impl Into<String>) -> Self {
        Self {
            status,
            payload,
            message: message.into(),
        }
    }

    /// Build an exception whose payload is a plain string.
    pub fn text(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            status,
            payload: HttpExceptionPayload::Text(message.clone()),
            message,
        }
    }

    fn with_message(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            status,
            payload: HttpExceptionPayload::Object {
                message: Some(ErrorMessage::Single(message.clone())),
                errors: None,
            },
            message,
        }
    }

    /// 400 Bad Request.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::with_message(400, message)
    }

    /// 401 Unauthorized.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::with_message(401, message)
    }

    /// 403 Forbidden.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::with_message(403, message)
    }

    /// 404 Not Found.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::with_message(404, message)
    }

    /// 409 Conflict.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::with_message(409, message)
    }

    /// Attach an `errors` member to the payload, converting a text payload
    /// into an object payload if needed.
    #[must_use]
    pub fn with_errors(mut self, errors: Value) -> Self {
        self.payload = match self.payload {
            HttpExceptionPayload::Text(text) => HttpExceptionPayload::Object {
                message: Some(ErrorMessage::Single(text)),
                errors: Some(errors),
            },
            HttpExceptionPayload::Object { message, .. } => HttpExceptionPayload::Object {
                message,
                errors: Some(errors),
            },
        };
        self
    }

    /// HTTP status carried by the exception.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Response payload carried by the exception.
    pub fn payload(&self) -> &HttpExceptionPayload {
        &self.payload
    }

    /// The exception's own message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// One segment of a validation issue path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => f.write_str(key),
            Self::Index(index) => write!(f, "{index}"),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(value: &str) -> Self {
        Self::Key(value.to_owned())
    }
}

impl From<usize> for PathSegment {
    fn from(value: usize) -> Self {
        Self::Index(value)
    }
}

/// Machine-readable reason attached to a [`ValidationIssue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    InvalidType,
    InvalidString,
    InvalidEnumValue,
    InvalidDate,
    TooSmall,
    TooBig,
    UnrecognizedKeys,
    Custom,
}

impl IssueCode {
    /// Wire representation of the code.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidType => "invalid_type",
            Self::InvalidString => "invalid_string",
            Self::InvalidEnumValue => "invalid_enum_value",
            Self::InvalidDate => "invalid_date",
            Self::TooSmall => "too_small",
            Self::TooBig => "too_big",
            Self::UnrecognizedKeys => "unrecognized_keys",
            Self::Custom => "custom",
        }
    }
}

impl fmt::Display for IssueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single schema violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub path: Vec<PathSegment>,
    pub message: String,
    pub code: IssueCode,
}

impl ValidationIssue {
    /// Build an issue located at `path`.
    pub fn new(
        path: impl IntoIterator<Item = PathSegment>,
        code: IssueCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into_iter().collect(),
            message: message.into(),
            code,
        }
    }

    /// Build an issue for a top-level field.
    pub fn field(field: &str, code: IssueCode, message: impl Into<String>) -> Self {
        Self::new([PathSegment::from(field)], code, message)
    }

    /// Path segments joined with `.`; empty for issues on the whole input.
    pub fn joined_path(&self) -> String {
        self.path
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(".")
    }
}

/// Failure raised by request schema validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("schema validation failed with {} issue(s)", .issues.len())]
pub struct SchemaValidationError {
    issues: Vec<ValidationIssue>,
}

impl SchemaValidationError {
    /// Wrap the collected issues.
    pub fn new(issues: Vec<ValidationIssue>) -> Self {
        Self { issues }
    }

    /// Issues in the order they were found.
    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }

    /// Consume the error, returning its issues.
    pub fn into_issues(self) -> Vec<ValidationIssue> {
        self.issues
    }
}

/// Stable codes of the data-layer failure taxonomy.
///
/// Raw codes follow the persistence client's published numbering so
/// clients that already key on them keep working.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataErrorCode {
    /// `P2025`: the operation depends on a record that does not exist.
    RecordNotFound,
    /// `P2002`: a unique constraint rejected the write.
    UniqueConstraint,
    /// `P2003`: a foreign key constraint rejected the write.
    ForeignKeyConstraint,
    /// `P2011`: a required column received null.
    NullConstraint,
    /// `P1001`: the database server cannot be reached.
    DatabaseUnreachable,
    /// `P1002`: the database server was reached but timed out.
    DatabaseTimeout,
    /// Any other raw code.
    Other(String),
}

impl DataErrorCode {
    /// Parse a raw code.
    pub fn from_raw(raw: &str) -> Self {
        match raw {
            "P2025" => Self::RecordNotFound,
            "P2002" => Self::UniqueConstraint,
            "P2003" => Self::ForeignKeyConstraint,
            "P2011" => Self::NullConstraint,
            "P1001" => Self::DatabaseUnreachable,
            "P1002" => Self::DatabaseTimeout,
            other => Self::Other(other.to_owned()),
        }
    }

    /// Raw code string.
    pub fn as_raw(&self) -> &str {
        match self {
            Self::RecordNotFound => "P2025",
            Self::UniqueConstraint => "P2002",
            Self::ForeignKeyConstraint => "P2003",
            Self::NullConstraint => "P2011",
            Self::DatabaseUnreachable => "P1001",
            Self::DatabaseTimeout => "P1002",
            Self::Other(raw) => raw,
        }
    }
}

impl fmt::Display for DataErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_raw())
    }
}

/// Failures reported by persistence adapters.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DataLayerError {
    /// Failure carrying a stable code from the data-layer taxonomy.
    #[error("data layer error {code}: {message}")]
    Known {
        code: DataErrorCode,
        message: String,
        meta: Option<Value>,
    },
    /// The request was malformed (unknown field, wrong value type) rather
    /// than rejected by a constraint.
    #[error("invalid data access: {message}")]
    Validation { message: String },
    /// Persistence failure with no stable code.
    #[error("data layer failure: {message}")]
    Unknown { message: String },
}

impl DataLayerError {
    /// Known failure with optional metadata.
    pub fn known(code: DataErrorCode, message: impl Into<String>, meta: Option<Value>) -> Self {
        Self::Known {
            code,
            message: message.into(),
            meta,
        }
    }

    /// `P2025` for an operation whose target record is missing.
    pub fn record_not_found(message: impl Into<String>) -> Self {
        Self::known(DataErrorCode::RecordNotFound, message, None)
    }

    /// `P2002` listing the fields that collided.
    pub fn unique_violation<I, T>(message: impl Into<String>, target: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let target: Vec<String> = target.into_iter().map(Into::into).collect();
        Self::known(
            DataErrorCode::UniqueConstraint,
            message,
            Some(serde_json::json!({ "target": target })),
        )
    }

    /// `P2011` naming the constraint that required a value.
    pub fn null_violation(message: impl Into<String>, constraint: Option<&str>) -> Self {
        let meta = constraint.map(|name| serde_json::json!({ "constraint": name }));
        Self::known(DataErrorCode::NullConstraint, message, meta)
    }

    /// Malformed query shape.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Failure with no stable code.
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::Unknown {
            message: message.into(),
        }
    }

    /// Stable code, if this is a known failure.
    pub fn code(&self) -> Option<&DataErrorCode> {
        match self {
            Self::Known { code, .. } => Some(code),
            _ => None,
        }
    }
}

/// Closed set of classifier kinds. Internal only; never serialised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    FrameworkHttp,
    SchemaValidation,
    DataKnown,
    DataValidation,
    Generic,
    Unknown,
}

/// Error value returned by handlers and services.
///
/// # Examples
/// ```
/// use b2b_api::domain::{AppError, DataLayerError};
///
/// let err: AppError = DataLayerError::record_not_found("no user").into();
/// assert!(matches!(err, AppError::Data(_)));
/// ```
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Http(#[from] HttpException),
    #[error(transparent)]
    Validation(#[from] SchemaValidationError),
    #[error(transparent)]
    Data(#[from] DataLayerError),
    /// Any other error value: its message and the messages of its sources.
    #[error("{message}")]
    Generic { message: String, chain: Vec<String> },
    /// A failure that is not an error value at all, such as a panic payload.
    #[error("{description}")]
    Unknown { description: String },
}

impl AppError {
    /// Capture an arbitrary error with its source chain.
    pub fn from_error<E>(error: &E) -> Self
    where
        E: std::error::Error + ?Sized,
    {
        let mut chain = Vec::new();
        let mut source = error.source();
        while let Some(cause) = source {
            chain.push(cause.to_string());
            source = cause.source();
        }
        Self::Generic {
            message: error.to_string(),
            chain,
        }
    }

    /// Generic failure with a message and no sources.
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
            chain: Vec::new(),
        }
    }

    /// Failure described by something that is not an error value.
    pub fn unknown(description: impl Into<String>) -> Self {
        Self::Unknown {
            description: description.into(),
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Self::Http(_) => "HttpException",
            Self::Validation(_) => "SchemaValidationError",
            Self::Data(_) => "DataLayerError",
            Self::Generic { .. } => "Error",
            Self::Unknown { .. } => "Unknown",
        }
    }

    /// Diagnostic trace: the error's type and message followed by one
    /// `caused by` line per source. `None` for non-error values.
    pub fn stack(&self) -> Option<String> {
        if let Self::Unknown { .. } = self {
            return None;
        }
        let mut stack = format!("{}: {self}", self.type_name());
        if let Self::Generic { chain, .. } = self {
            for cause in chain {
                stack.push_str("\n    caused by: ");
                stack.push_str(cause);
            }
        }
        Some(stack)
    }
}

#[cfg(test)]
mod tests;
