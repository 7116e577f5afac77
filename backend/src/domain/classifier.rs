//! Error classification.
//!
//! [`ErrorClassifier`] turns any [`AppError`] into a [`Classification`]: the
//! kind, HTTP status, client message, optional stable error code and
//! optional field-level issues. Rules are held in an ordered table and the
//! first matching rule wins, so the precedence is data that tests can
//! inspect through [`classifier_order`].
//!
//! Data-layer specifics live in [`map_data_error`]; swapping persistence
//! technology means re-deriving that table, not the classifier.

use serde::Serialize;
use serde_json::Value;

use super::failure::{
    AppError, DataErrorCode, DataLayerError, ErrorKind, ErrorMessage, HttpExceptionPayload,
    SchemaValidationError,
};

/// Word used in the unique-violation message when no field list is known.
pub const DEFAULT_UNIQUE_FIELD_FALLBACK: &str = "field";

/// Field-level issue as rendered in the error envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct FieldIssue {
    /// Dotted path of the offending input field, e.g. `email`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
    /// Machine-readable issue code, e.g. `invalid_string`.
    pub code: String,
}

/// The `errors` member of a classification.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldErrors {
    /// Issues produced by schema validation.
    Issues(Vec<FieldIssue>),
    /// Arbitrary `errors` carried verbatim from an HTTP exception payload.
    Raw(Value),
}

/// Raw data-layer code and metadata, surfaced only in development mode.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataDiagnostics {
    /// Data-layer error code, e.g. `P2002`.
    pub code: String,
    /// Driver metadata such as the violated constraint target.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

/// Normalised view of an error.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub kind: ErrorKind,
    pub status: u16,
    pub message: ErrorMessage,
    pub error_code: Option<String>,
    pub errors: Option<FieldErrors>,
    pub diagnostics: Option<DataDiagnostics>,
}

impl Classification {
    fn new(kind: ErrorKind, status: u16, message: impl Into<ErrorMessage>) -> Self {
        Self {
            kind,
            status,
            message: message.into(),
            error_code: None,
            errors: None,
            diagnostics: None,
        }
    }

    fn with_code(mut self, code: impl Into<String>) -> Self {
        self.error_code = Some(code.into());
        self
    }
}

/// Outcome of the data-layer mapping table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataErrorMapping {
    pub status: u16,
    pub message: String,
    pub error_code: String,
}

type Rule = fn(&ErrorClassifier, &AppError) -> Option<Classification>;

const RULES: [(ErrorKind, Rule); 6] = [
    (ErrorKind::FrameworkHttp, ErrorClassifier::framework_http),
    (ErrorKind::SchemaValidation, ErrorClassifier::schema_validation),
    (ErrorKind::DataKnown, ErrorClassifier::data_known),
    (ErrorKind::DataValidation, ErrorClassifier::data_validation),
    (ErrorKind::Generic, ErrorClassifier::generic),
    (ErrorKind::Unknown, ErrorClassifier::unknown),
];

/// Kinds in the order the classifier tries them.
pub fn classifier_order() -> [ErrorKind; 6] {
    RULES.map(|(kind, _)| kind)
}

/// First-match-wins classifier over the rule table.
#[derive(Debug, Clone)]
pub struct ErrorClassifier {
    unique_field_fallback: String,
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_UNIQUE_FIELD_FALLBACK)
    }
}

impl ErrorClassifier {
    /// Build a classifier using `unique_field_fallback` when a unique
    /// violation does not name its fields.
    pub fn new(unique_field_fallback: impl Into<String>) -> Self {
        Self {
            unique_field_fallback: unique_field_fallback.into(),
        }
    }

    /// Classify `error` by the first rule that accepts it.
    ///
    /// # Examples
    /// ```
    /// use b2b_api::domain::{AppError, DataLayerError, ErrorClassifier, ErrorKind};
    ///
    /// let err: AppError = DataLayerError::unique_violation("dup", ["email"]).into();
    /// let classification = ErrorClassifier::default().classify(&err);
    /// assert_eq!(classification.kind, ErrorKind::DataKnown);
    /// assert_eq!(classification.status, 409);
    /// ```
    pub fn classify(&self, error: &AppError) -> Classification {
        RULES
            .iter()
            .find_map(|(_, rule)| rule(self, error))
            .unwrap_or_else(|| Self::internal(ErrorKind::Unknown))
    }

    fn internal(kind: ErrorKind) -> Classification {
        Classification::new(kind, 500, "Internal server error")
    }

    fn framework_http(&self, error: &AppError) -> Option<Classification> {
        let AppError::Http(exception) = error else {
            return None;
        };
        let (message, errors) = match exception.payload() {
            HttpExceptionPayload::Text(text) => (ErrorMessage::Single(text.clone()), None),
            HttpExceptionPayload::Object { message, errors } => (
                message
                    .clone()
                    .unwrap_or_else(|| ErrorMessage::Single(exception.message().to_owned())),
                errors.clone(),
            ),
        };
        let mut classification =
            Classification::new(ErrorKind::FrameworkHttp, exception.status(), message);
        classification.errors = errors.map(FieldErrors::Raw);
        Some(classification)
    }

    fn schema_validation(&self, error: &AppError) -> Option<Classification> {
        let AppError::Validation(validation) = error else {
            return None;
        };
        let mut classification =
            Classification::new(ErrorKind::SchemaValidation, 400, "Validation error")
                .with_code("VALIDATION_ERROR");
        classification.errors = Some(FieldErrors::Issues(field_issues(validation)));
        Some(classification)
    }

    fn data_known(&self, error: &AppError) -> Option<Classification> {
        let AppError::Data(DataLayerError::Known { code, meta, .. }) = error else {
            return None;
        };
        let mapping = map_data_error(code, meta.as_ref(), &self.unique_field_fallback);
        let mut classification =
            Classification::new(ErrorKind::DataKnown, mapping.status, mapping.message)
                .with_code(mapping.error_code);
        classification.diagnostics = Some(DataDiagnostics {
            code: code.as_raw().to_owned(),
            meta: meta.clone(),
        });
        Some(classification)
    }

    fn data_validation(&self, error: &AppError) -> Option<Classification> {
        let AppError::Data(DataLayerError::Validation { .. }) = error else {
            return None;
        };
        Some(
            Classification::new(ErrorKind::DataValidation, 400, "Database validation error")
                .with_code("DATABASE_VALIDATION_ERROR"),
        )
    }

    fn generic(&self, error: &AppError) -> Option<Classification> {
        match error {
            AppError::Generic { message, .. }
            | AppError::Data(DataLayerError::Unknown { message }) => Some(Classification::new(
                ErrorKind::Generic,
                500,
                message.clone(),
            )),
            _ => None,
        }
    }

    fn unknown(&self, _error: &AppError) -> Option<Classification> {
        Some(Self::internal(ErrorKind::Unknown))
    }
}

fn field_issues(error: &SchemaValidationError) -> Vec<FieldIssue> {
    error
        .issues()
        .iter()
        .map(|issue| FieldIssue {
            field: issue.joined_path(),
            message: issue.message.clone(),
            code: issue.code.as_str().to_owned(),
        })
        .collect()
}

fn meta_text(meta: Option<&Value>, key: &str) -> Option<String> {
    match meta?.get(key)? {
        Value::String(text) => Some(text.clone()),
        Value::Array(items) => {
            let names: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
            (!names.is_empty()).then(|| names.join(", "))
        }
        _ => None,
    }
}

/// Map a data-layer code and its metadata to status, message and error code.
///
/// `fallback` names the fields of a unique or null violation whose metadata
/// does not.
pub fn map_data_error(
    code: &DataErrorCode,
    meta: Option<&Value>,
    fallback: &str,
) -> DataErrorMapping {
    let (status, message, error_code) = match code {
        DataErrorCode::RecordNotFound => (
            404,
            "Record not found".to_owned(),
            "RECORD_NOT_FOUND".to_owned(),
        ),
        DataErrorCode::UniqueConstraint => {
            let fields = meta_text(meta, "target").unwrap_or_else(|| fallback.to_owned());
            (
                409,
                format!("A record with that {fields} already exists"),
                "UNIQUE_CONSTRAINT_VIOLATION".to_owned(),
            )
        }
        DataErrorCode::ForeignKeyConstraint => (
            400,
            "Invalid reference to related record".to_owned(),
            "FOREIGN_KEY_CONSTRAINT_VIOLATION".to_owned(),
        ),
        DataErrorCode::NullConstraint => {
            let constraint = meta_text(meta, "constraint").unwrap_or_else(|| fallback.to_owned());
            (
                400,
                format!("The field {constraint} is required"),
                "NULL_CONSTRAINT_VIOLATION".to_owned(),
            )
        }
        DataErrorCode::DatabaseUnreachable | DataErrorCode::DatabaseTimeout => (
            503,
            "Cannot connect to database".to_owned(),
            "DATABASE_CONNECTION_ERROR".to_owned(),
        ),
        DataErrorCode::Other(raw) => (
            500,
            "Database error".to_owned(),
            format!("PRISMA_ERROR_{raw}"),
        ),
    };
    DataErrorMapping {
        status,
        message,
        error_code,
    }
}

#[cfg(test)]
mod tests {
    //! Classifier precedence and mapping table coverage.

    use super::*;
    use crate::domain::failure::{HttpException, IssueCode, PathSegment, ValidationIssue};
    use rstest::{fixture, rstest};
    use serde_json::json;

    #[fixture]
    fn classifier() -> ErrorClassifier {
        ErrorClassifier::default()
    }

    #[rstest]
    fn order_is_fixed() {
        assert_eq!(
            classifier_order(),
            [
                ErrorKind::FrameworkHttp,
                ErrorKind::SchemaValidation,
                ErrorKind::DataKnown,
                ErrorKind::DataValidation,
                ErrorKind::Generic,
                ErrorKind::Unknown,
            ]
        );
    }

    #[rstest]
    fn framework_payload_message_and_errors_are_used(classifier: ErrorClassifier) {
        let err = AppError::from(
            HttpException::bad_request("Invalid id").with_errors(json!({ "id": "not a uuid" })),
        );
        let classification = classifier.classify(&err);
        assert_eq!(classification.kind, ErrorKind::FrameworkHttp);
        assert_eq!(classification.status, 400);
        assert_eq!(classification.message, ErrorMessage::from("Invalid id"));
        assert_eq!(classification.error_code, None);
        assert_eq!(
            classification.errors,
            Some(FieldErrors::Raw(json!({ "id": "not a uuid" })))
        );
    }

    #[rstest]
    fn framework_object_without_message_falls_back_to_exception_message(
        classifier: ErrorClassifier,
    ) {
        let exception = HttpException::new(
            418,
            HttpExceptionPayload::Object {
                message: None,
                errors: None,
            },
            "I'm a teapot",
        );
        let classification = classifier.classify(&exception.into());
        assert_eq!(classification.status, 418);
        assert_eq!(classification.message, ErrorMessage::from("I'm a teapot"));
    }

    #[rstest]
    fn schema_validation_is_400_with_one_entry_per_issue(classifier: ErrorClassifier) {
        let err = SchemaValidationError::new(vec![
            ValidationIssue::field("email", IssueCode::InvalidString, "Invalid email"),
            ValidationIssue::new(
                [PathSegment::from("address"), PathSegment::from(0), PathSegment::from("zip")],
                IssueCode::TooSmall,
                "Too short",
            ),
        ]);
        let classification = classifier.classify(&err.into());
        assert_eq!(classification.status, 400);
        assert_eq!(classification.message, ErrorMessage::from("Validation error"));
        assert_eq!(classification.error_code.as_deref(), Some("VALIDATION_ERROR"));
        assert_eq!(
            classification.errors,
            Some(FieldErrors::Issues(vec![
                FieldIssue {
                    field: "email".to_owned(),
                    message: "Invalid email".to_owned(),
                    code: "invalid_string".to_owned(),
                },
                FieldIssue {
                    field: "address.0.zip".to_owned(),
                    message: "Too short".to_owned(),
                    code: "too_small".to_owned(),
                },
            ]))
        );
    }

    #[rstest]
    #[case(DataErrorCode::RecordNotFound, None, 404, "RECORD_NOT_FOUND", "Record not found")]
    #[case(
        DataErrorCode::UniqueConstraint,
        Some(json!({ "target": ["email"] })),
        409,
        "UNIQUE_CONSTRAINT_VIOLATION",
        "A record with that email already exists"
    )]
    #[case(
        DataErrorCode::UniqueConstraint,
        Some(json!({ "target": ["tenant_id", "email"] })),
        409,
        "UNIQUE_CONSTRAINT_VIOLATION",
        "A record with that tenant_id, email already exists"
    )]
    #[case(
        DataErrorCode::UniqueConstraint,
        None,
        409,
        "UNIQUE_CONSTRAINT_VIOLATION",
        "A record with that field already exists"
    )]
    #[case(
        DataErrorCode::ForeignKeyConstraint,
        None,
        400,
        "FOREIGN_KEY_CONSTRAINT_VIOLATION",
        "Invalid reference to related record"
    )]
    #[case(
        DataErrorCode::NullConstraint,
        Some(json!({ "constraint": "email" })),
        400,
        "NULL_CONSTRAINT_VIOLATION",
        "The field email is required"
    )]
    #[case(
        DataErrorCode::DatabaseUnreachable,
        None,
        503,
        "DATABASE_CONNECTION_ERROR",
        "Cannot connect to database"
    )]
    #[case(
        DataErrorCode::DatabaseTimeout,
        None,
        503,
        "DATABASE_CONNECTION_ERROR",
        "Cannot connect to database"
    )]
    #[case(
        DataErrorCode::Other("P2034".to_owned()),
        None,
        500,
        "PRISMA_ERROR_P2034",
        "Database error"
    )]
    fn data_layer_table(
        #[case] code: DataErrorCode,
        #[case] meta: Option<Value>,
        #[case] status: u16,
        #[case] error_code: &str,
        #[case] message: &str,
    ) {
        let mapping = map_data_error(&code, meta.as_ref(), DEFAULT_UNIQUE_FIELD_FALLBACK);
        assert_eq!(mapping.status, status);
        assert_eq!(mapping.error_code, error_code);
        assert_eq!(mapping.message, message);
    }

    #[rstest]
    fn unique_fallback_word_is_configurable() {
        let classifier = ErrorClassifier::new("campo");
        let err: AppError =
            DataLayerError::known(DataErrorCode::UniqueConstraint, "dup", None).into();
        let classification = classifier.classify(&err);
        assert_eq!(
            classification.message,
            ErrorMessage::from("A record with that campo already exists")
        );
    }

    #[rstest]
    fn known_data_errors_carry_diagnostics(classifier: ErrorClassifier) {
        let err: AppError = DataLayerError::unique_violation("dup", ["email"]).into();
        let classification = classifier.classify(&err);
        assert_eq!(
            classification.diagnostics,
            Some(DataDiagnostics {
                code: "P2002".to_owned(),
                meta: Some(json!({ "target": ["email"] })),
            })
        );
    }

    #[rstest]
    fn data_validation_has_fixed_message(classifier: ErrorClassifier) {
        let err: AppError = DataLayerError::validation("unknown field `nickname`").into();
        let classification = classifier.classify(&err);
        assert_eq!(classification.kind, ErrorKind::DataValidation);
        assert_eq!(classification.status, 400);
        assert_eq!(
            classification.message,
            ErrorMessage::from("Database validation error")
        );
        assert_eq!(
            classification.error_code.as_deref(),
            Some("DATABASE_VALIDATION_ERROR")
        );
        assert!(classification.diagnostics.is_none());
    }

    #[rstest]
    #[case(AppError::generic("hash failure"), "hash failure")]
    #[case(AppError::from(DataLayerError::unknown("connection reset")), "connection reset")]
    fn generic_errors_expose_their_message(
        classifier: ErrorClassifier,
        #[case] err: AppError,
        #[case] message: &str,
    ) {
        let classification = classifier.classify(&err);
        assert_eq!(classification.kind, ErrorKind::Generic);
        assert_eq!(classification.status, 500);
        assert_eq!(classification.message, ErrorMessage::from(message));
        assert_eq!(classification.error_code, None);
    }

    #[rstest]
    fn unknown_values_get_fixed_message(classifier: ErrorClassifier) {
        let classification = classifier.classify(&AppError::unknown("explicit panic"));
        assert_eq!(classification.kind, ErrorKind::Unknown);
        assert_eq!(classification.status, 500);
        assert_eq!(
            classification.message,
            ErrorMessage::from("Internal server error")
        );
    }
}
