//! Tests for the domain user model and payload validation.

use super::*;
use crate::domain::data_access::PASSWORD_FIELD;
use rstest::{fixture, rstest};
use serde_json::json;

#[fixture]
fn valid_create() -> CreateUserRequest {
    CreateUserRequest {
        email: Some("ada@example.com".into()),
        password: Some("Password123!".into()),
        first_name: Some("Ada".into()),
        last_name: Some("Lovelace".into()),
        profile_picture: None,
        role: None,
    }
}

fn fields(err: &SchemaValidationError) -> Vec<String> {
    err.issues().iter().map(ValidationIssue::joined_path).collect()
}

#[rstest]
fn valid_create_defaults_role_to_user(valid_create: CreateUserRequest) {
    let user = valid_create.validate().expect("payload is valid");
    assert_eq!(user.role, UserRole::User);
    assert_eq!(user.email, "ada@example.com");
}

#[rstest]
fn missing_members_are_reported_as_required() {
    let err = CreateUserRequest::default()
        .validate()
        .expect_err("empty payload");
    assert_eq!(fields(&err), ["email", "firstName", "lastName", "password"]);
    assert!(err.issues().iter().all(|issue| issue.message == "Required"));
    assert!(
        err.issues()
            .iter()
            .all(|issue| issue.code == IssueCode::InvalidType)
    );
}

#[rstest]
#[case::no_upper("password123", "Password must contain")]
#[case::no_digit("Passwordxyz", "Password must contain")]
#[case::short("Pa1", "at least 8 characters")]
fn weak_passwords_are_rejected(
    mut valid_create: CreateUserRequest,
    #[case] password: &str,
    #[case] expected: &str,
) {
    valid_create.password = Some(password.into());
    let err = valid_create.validate().expect_err("weak password");
    assert!(
        err.issues()
            .iter()
            .any(|issue| issue.joined_path() == "password" && issue.message.contains(expected))
    );
}

#[rstest]
#[case::digits("R2D2")]
#[case::symbols("O'Brien")]
#[case::too_long(&"a".repeat(51))]
fn names_outside_the_alphabet_or_length_are_rejected(
    mut valid_create: CreateUserRequest,
    #[case] name: &str,
) {
    valid_create.last_name = Some(name.into());
    let err = valid_create.validate().expect_err("bad name");
    assert!(fields(&err).iter().all(|field| field == "lastName"));
}

#[rstest]
fn accented_names_are_accepted(mut valid_create: CreateUserRequest) {
    valid_create.first_name = Some("José María".into());
    assert!(valid_create.validate().is_ok());
}

#[rstest]
#[case::ftp("ftp://example.com/a.png")]
#[case::relative("/avatar.png")]
fn profile_picture_must_be_a_web_url(mut valid_create: CreateUserRequest, #[case] url: &str) {
    valid_create.profile_picture = Some(url.into());
    let err = valid_create.validate().expect_err("bad url");
    assert_eq!(err.issues()[0].message, "Invalid image URL");
}

#[rstest]
fn unknown_role_lists_the_allowed_values(mut valid_create: CreateUserRequest) {
    valid_create.role = Some("OWNER".into());
    let err = valid_create.validate().expect_err("bad role");
    let issue = &err.issues()[0];
    assert_eq!(issue.code, IssueCode::InvalidEnumValue);
    assert_eq!(
        issue.message,
        "Invalid enum value. Expected 'ADMIN' | 'USER', received 'OWNER'"
    );
}

#[rstest]
fn new_user_record_holds_hash_not_plaintext(valid_create: CreateUserRequest) {
    let record = valid_create
        .validate()
        .expect("valid")
        .into_record("hashed".into());
    assert_eq!(record.get(PASSWORD_FIELD), Some(&json!("hashed")));
    assert_eq!(record.get("role"), Some(&json!("USER")));
    assert_eq!(record.get("profilePicture"), Some(&json!(null)));
}

#[rstest]
fn update_only_touches_supplied_members() {
    let request: UpdateUserRequest =
        serde_json::from_value(json!({ "firstName": "Grace", "profilePicture": null }))
            .expect("deserialise");
    let changes = request.validate().expect("valid update");
    let record = changes.into_record(None);
    assert_eq!(
        Value::Object(record),
        json!({ "firstName": "Grace", "profilePicture": null })
    );
}

#[rstest]
fn update_with_absent_picture_leaves_it_alone() {
    let request: UpdateUserRequest =
        serde_json::from_value(json!({ "isActive": false })).expect("deserialise");
    let changes = request.validate().expect("valid update");
    assert_eq!(changes.profile_picture, None);
    assert_eq!(changes.is_active, Some(false));
}

#[rstest]
fn user_decodes_from_a_stored_record() {
    let record = json!({
        "id": "3fa85f64-5717-4562-b3fc-2c963f66afa6",
        "email": "ada@example.com",
        "firstName": "Ada",
        "lastName": "Lovelace",
        "profilePicture": null,
        "role": "ADMIN",
        "isActive": true,
        "emailVerifiedAt": null,
        "createdAt": "2024-01-15T10:30:00.000Z",
        "updatedAt": "2024-01-15T10:30:00.000Z",
        "deletedAt": null,
    });
    let user = User::from_record(record.as_object().cloned().expect("object"))
        .expect("decodes");
    assert_eq!(user.role, UserRole::Admin);
    assert!(user.deleted_at.is_none());
}

#[rstest]
fn malformed_records_surface_as_unknown_data_errors() {
    let err = User::from_record(Record::new()).expect_err("empty record");
    assert!(matches!(err, DataLayerError::Unknown { .. }));
}

#[rstest]
#[case("3fa85f64-5717-4562-b3fc-2c963f66afa6", true)]
#[case("42", false)]
#[case("", false)]
fn user_id_parsing(#[case] raw: &str, #[case] ok: bool) {
    assert_eq!(UserId::parse(raw).is_ok(), ok);
}
