//! Tests for the failure taxonomy.

use super::*;
use rstest::rstest;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
#[error("pool exhausted")]
struct PoolExhausted;

#[derive(Debug, thiserror::Error)]
#[error("could not load user")]
struct LoadFailed(#[source] PoolExhausted);

#[rstest]
#[case(vec![PathSegment::from("email")], "email")]
#[case(vec![PathSegment::from("address"), PathSegment::from("street")], "address.street")]
#[case(vec![PathSegment::from("tags"), PathSegment::from(2), PathSegment::from("name")], "tags.2.name")]
#[case(Vec::new(), "")]
fn joined_path_uses_dots(#[case] path: Vec<PathSegment>, #[case] expected: &str) {
    let issue = ValidationIssue::new(path, IssueCode::Custom, "bad");
    assert_eq!(issue.joined_path(), expected);
}

#[rstest]
#[case("P2025", DataErrorCode::RecordNotFound)]
#[case("P2002", DataErrorCode::UniqueConstraint)]
#[case("P1002", DataErrorCode::DatabaseTimeout)]
#[case("P2024", DataErrorCode::Other("P2024".to_owned()))]
fn raw_codes_parse_to_taxonomy(#[case] raw: &str, #[case] expected: DataErrorCode) {
    let code = DataErrorCode::from_raw(raw);
    assert_eq!(code, expected);
    assert_eq!(code.as_raw(), raw);
}

#[rstest]
fn unique_violation_records_target_fields() {
    let err = DataLayerError::unique_violation("duplicate", ["email"]);
    match err {
        DataLayerError::Known { code, meta, .. } => {
            assert_eq!(code, DataErrorCode::UniqueConstraint);
            assert_eq!(meta, Some(json!({ "target": ["email"] })));
        }
        other => panic!("expected known error, got {other:?}"),
    }
}

#[rstest]
fn from_error_captures_source_chain() {
    let err = AppError::from_error(&LoadFailed(PoolExhausted));
    assert_eq!(
        err,
        AppError::Generic {
            message: "could not load user".to_owned(),
            chain: vec!["pool exhausted".to_owned()],
        }
    );
    let stack = err.stack().expect("generic errors carry a stack");
    assert_eq!(stack, "Error: could not load user\n    caused by: pool exhausted");
}

#[rstest]
fn unknown_values_have_no_stack() {
    assert!(AppError::unknown("panic payload").stack().is_none());
}

#[rstest]
fn with_errors_promotes_text_payload() {
    let err = HttpException::text(422, "rejected").with_errors(json!([{ "field": "x" }]));
    assert_eq!(
        err.payload(),
        &HttpExceptionPayload::Object {
            message: Some(ErrorMessage::Single("rejected".to_owned())),
            errors: Some(json!([{ "field": "x" }])),
        }
    );
    assert_eq!(err.message(), "rejected");
}

#[rstest]
fn error_message_serialises_untagged() {
    let single = serde_json::to_value(ErrorMessage::from("one")).expect("serialise");
    let list = serde_json::to_value(ErrorMessage::from(vec!["a".to_owned(), "b".to_owned()]))
        .expect("serialise");
    assert_eq!(single, json!("one"));
    assert_eq!(list, json!(["a", "b"]));
}
