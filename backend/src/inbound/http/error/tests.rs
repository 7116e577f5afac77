//! Tests for error envelope rendering.

use super::*;
use crate::domain::{
    DataLayerError, IssueCode, SchemaValidationError, ValidationIssue,
};
use crate::test_support::FixtureClock;
use std::io;
use std::sync::Mutex;

use actix_web::body::to_bytes;
use actix_web::test::TestRequest;
use chrono::{TimeZone, Utc};
use rstest::{fixture, rstest};
use serde_json::{Value, json};
use tracing_subscriber::fmt::MakeWriter;

fn formatter(mode: DeploymentMode) -> ErrorFormatter {
    let now = Utc
        .with_ymd_and_hms(2024, 3, 1, 9, 0, 0)
        .single()
        .expect("valid timestamp");
    ErrorFormatter::new(
        ErrorClassifier::default(),
        mode,
        Arc::new(FixtureClock::new(now)),
    )
}

#[fixture]
fn ctx() -> RequestContext {
    RequestContext {
        method: "POST".to_owned(),
        path: "/api/v1/users?notify=true".to_owned(),
    }
}

fn duplicate_email() -> AppError {
    DataLayerError::unique_violation("Unique constraint failed on the fields: (`email`)", ["email"])
        .into()
}

async fn body_json(response: HttpResponse) -> Value {
    let bytes = to_bytes(response.into_body())
        .await
        .expect("reading response body succeeds");
    serde_json::from_slice(&bytes).expect("envelope JSON")
}

#[rstest]
fn development_envelope_exposes_stack_and_diagnostics(ctx: RequestContext) {
    let envelope = formatter(DeploymentMode::Development).envelope(&duplicate_email(), &ctx);
    assert_eq!(envelope.status_code, 409);
    assert_eq!(
        envelope.error_code.as_deref(),
        Some("UNIQUE_CONSTRAINT_VIOLATION")
    );
    assert!(
        envelope
            .stack
            .as_deref()
            .is_some_and(|stack| stack.starts_with("DataLayerError: "))
    );
    assert_eq!(
        envelope.prisma,
        Some(DataDiagnostics {
            code: "P2002".to_owned(),
            meta: Some(json!({ "target": ["email"] })),
        })
    );
}

fn generic_failure() -> AppError {
    AppError::generic("connection reset")
}

fn framework_failure() -> AppError {
    HttpException::text(413, "payload too large").into()
}

#[rstest]
#[case(duplicate_email())]
#[case(generic_failure())]
#[case(framework_failure())]
fn development_exposes_a_stack_for_every_error_kind(
    #[case] err: AppError,
    ctx: RequestContext,
) {
    let envelope = formatter(DeploymentMode::Development).envelope(&err, &ctx);
    assert!(envelope.stack.is_some());
}

#[rstest]
fn other_modes_hide_stack_and_diagnostics(
    #[values(DeploymentMode::Production, DeploymentMode::Staging, DeploymentMode::Test)]
    mode: DeploymentMode,
    #[values(duplicate_email(), generic_failure(), framework_failure())] err: AppError,
    ctx: RequestContext,
) {
    let expected_status = formatter(DeploymentMode::Development)
        .envelope(&err, &ctx)
        .status_code;
    let envelope = formatter(mode).envelope(&err, &ctx);
    assert!(envelope.stack.is_none());
    assert!(envelope.prisma.is_none());
    assert_eq!(envelope.status_code, expected_status);
}

#[rstest]
fn envelope_echoes_request_and_clock(ctx: RequestContext) {
    let envelope = formatter(DeploymentMode::Production).envelope(&duplicate_email(), &ctx);
    assert_eq!(envelope.timestamp, "2024-03-01T09:00:00.000Z");
    assert_eq!(envelope.method, "POST");
    assert_eq!(envelope.path, "/api/v1/users?notify=true");
}

#[rstest]
#[actix_web::test]
async fn rendered_body_omits_absent_members(ctx: RequestContext) {
    let err: AppError = HttpException::not_found("User with id 42 not found").into();
    let response = formatter(DeploymentMode::Production).render(&err, &ctx);
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = body_json(response).await;
    assert_eq!(
        body,
        json!({
            "statusCode": 404,
            "message": "User with id 42 not found",
            "timestamp": "2024-03-01T09:00:00.000Z",
            "path": "/api/v1/users?notify=true",
            "method": "POST",
        })
    );
}

#[rstest]
#[actix_web::test]
async fn validation_issues_render_as_field_list(ctx: RequestContext) {
    let err: AppError = SchemaValidationError::new(vec![ValidationIssue::field(
        "email",
        IssueCode::InvalidString,
        "Invalid email",
    )])
    .into();
    let body = body_json(formatter(DeploymentMode::Production).render(&err, &ctx)).await;
    assert_eq!(body["statusCode"], json!(400));
    assert_eq!(body["errorCode"], json!("VALIDATION_ERROR"));
    assert_eq!(
        body["errors"],
        json!([{ "field": "email", "message": "Invalid email", "code": "invalid_string" }])
    );
}

#[rstest]
#[actix_web::test]
async fn unknown_failures_never_leak_their_description(ctx: RequestContext) {
    let err = AppError::unknown("thread panicked at secret.rs:12");
    let response = formatter(DeploymentMode::Development).render(&err, &ctx);
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["message"], json!("Internal server error"));
    assert!(body.get("stack").is_none());
}

#[rstest]
fn request_context_keeps_query_string() {
    let req = TestRequest::get()
        .uri("/api/v1/users?page=2&pageSize=10")
        .to_http_request();
    let ctx = RequestContext::from_request(&req);
    assert_eq!(ctx.method, "GET");
    assert_eq!(ctx.path, "/api/v1/users?page=2&pageSize=10");
}

#[rstest]
#[case(HttpException::conflict("taken").into(), StatusCode::CONFLICT)]
#[case(DataLayerError::record_not_found("gone").into(), StatusCode::NOT_FOUND)]
#[case(DataLayerError::validation("bad field").into(), StatusCode::BAD_REQUEST)]
#[case(AppError::generic("boom"), StatusCode::INTERNAL_SERVER_ERROR)]
fn response_error_status_follows_classification(
    #[case] err: AppError,
    #[case] expected: StatusCode,
) {
    assert_eq!(ResponseError::status_code(&err), expected);
}

#[rstest]
#[actix_web::test]
async fn fallback_response_uses_production_rendering() {
    let response = ResponseError::error_response(&duplicate_email());
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert_eq!(body["errorCode"], json!("UNIQUE_CONSTRAINT_VIOLATION"));
    assert!(body.get("prisma").is_none());
}

#[rstest]
#[actix_web::test]
async fn unmatched_routes_name_method_and_path() {
    let req = TestRequest::delete().uri("/nowhere").to_http_request();
    let err = route_not_found(req).await.expect_err("always fails");
    let AppError::Http(exception) = err else {
        panic!("expected framework exception");
    };
    assert_eq!(exception.status(), 404);
    assert_eq!(exception.message(), "Cannot DELETE /nowhere");
}

#[derive(Clone, Default)]
struct LogSink(Arc<Mutex<Vec<u8>>>);

struct LogSinkWriter(Arc<Mutex<Vec<u8>>>);

impl<'a> MakeWriter<'a> for LogSink {
    type Writer = LogSinkWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogSinkWriter(Arc::clone(&self.0))
    }
}

impl io::Write for LogSinkWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .map_err(|_| io::Error::other("log sink poisoned"))?
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Levels of the JSON log lines emitted while rendering `err`.
fn logged_levels(err: &AppError, ctx: &RequestContext) -> Vec<String> {
    let sink = LogSink::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(sink.clone())
        .json()
        .with_max_level(tracing::Level::TRACE)
        .finish();
    tracing::subscriber::with_default(subscriber, || {
        formatter(DeploymentMode::Production).render(err, ctx);
    });
    let bytes = sink.0.lock().expect("log sink").clone();
    String::from_utf8(bytes)
        .expect("utf8 log output")
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let parsed: Value = serde_json::from_str(line).expect("json log line");
            parsed["level"].as_str().unwrap_or_default().to_owned()
        })
        .collect()
}

#[rstest]
#[case(generic_failure(), &["ERROR"])]
#[case(AppError::unknown("boom"), &["ERROR"])]
#[case(duplicate_email(), &["WARN"])]
#[case(HttpException::not_found("gone").into(), &["WARN"])]
#[case(HttpException::text(302, "moved").into(), &[])]
fn log_severity_follows_status(
    #[case] err: AppError,
    #[case] expected: &[&str],
    ctx: RequestContext,
) {
    assert_eq!(logged_levels(&err, &ctx), expected);
}
