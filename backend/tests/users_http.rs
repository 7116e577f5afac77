//! End-to-end tests for the users API over the in-memory stack.

use std::net::SocketAddr;
use std::sync::Arc;

use actix_web::test as actix_test;
use actix_web::web;
use b2b_api::config::DeploymentMode;
use b2b_api::inbound::http::health::HealthState;
use b2b_api::server::{AppDependencies, ServerConfig, build_app, build_http_state};
use b2b_api::test_support::FixtureClock;
use chrono::{TimeZone, Utc};
use rstest::{fixture, rstest};
use serde_json::{Value, json};

#[fixture]
fn deps() -> AppDependencies {
    let clock = Arc::new(FixtureClock::new(
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0)
            .single()
            .expect("valid timestamp"),
    ));
    let config = ServerConfig::new(SocketAddr::from(([127, 0, 0, 1], 0)))
        .with_mode(DeploymentMode::Test)
        .with_clock(clock);
    AppDependencies {
        health_state: web::Data::new(HealthState::new()),
        http_state: web::Data::new(build_http_state(&config)),
        formatter: config.error_formatter(),
        api_scope: config.api_scope().to_owned(),
    }
}

fn new_user(email: &str, first_name: &str) -> Value {
    json!({
        "email": email,
        "password": "Password123!",
        "firstName": first_name,
        "lastName": "Tester",
    })
}

macro_rules! create_user {
    ($app:expr, $email:expr, $first:expr) => {{
        let created: Value = actix_test::call_and_read_body_json(
            &$app,
            actix_test::TestRequest::post()
                .uri("/api/v1/users")
                .set_json(new_user($email, $first))
                .to_request(),
        )
        .await;
        created["id"].as_str().expect("created id").to_owned()
    }};
}

#[rstest]
#[actix_web::test]
async fn lists_are_sorted_filtered_and_paginated(deps: AppDependencies) {
    let app = actix_test::init_service(build_app(deps)).await;
    create_user!(app, "carol@example.com", "Carol");
    create_user!(app, "alice@example.com", "Alice");
    create_user!(app, "bob@example.com", "Bob");

    let page: Value = actix_test::call_and_read_body_json(
        &app,
        actix_test::TestRequest::get()
            .uri("/api/v1/users?sort=email&sortDirection=asc&pageSize=10")
            .to_request(),
    )
    .await;
    let emails: Vec<&str> = page["data"]
        .as_array()
        .expect("data array")
        .iter()
        .filter_map(|user| user["email"].as_str())
        .collect();
    assert_eq!(
        emails,
        ["alice@example.com", "bob@example.com", "carol@example.com"]
    );
    assert_eq!(page["meta"]["total"], json!(3));
    assert_eq!(page["meta"]["hasNext"], json!(false));

    let searched: Value = actix_test::call_and_read_body_json(
        &app,
        actix_test::TestRequest::get()
            .uri("/api/v1/users?search=BO")
            .to_request(),
    )
    .await;
    assert_eq!(searched["meta"]["total"], json!(1));
    assert_eq!(searched["data"][0]["firstName"], json!("Bob"));
}

#[rstest]
#[actix_web::test]
async fn unsupported_page_sizes_are_rejected(deps: AppDependencies) {
    let app = actix_test::init_service(build_app(deps)).await;
    let res = actix_test::call_service(
        &app,
        actix_test::TestRequest::get()
            .uri("/api/v1/users?pageSize=7")
            .to_request(),
    )
    .await;
    assert_eq!(res.status().as_u16(), 400);
    let body: Value = actix_test::read_body_json(res).await;
    assert_eq!(body["errorCode"], json!("VALIDATION_ERROR"));
}

#[rstest]
#[actix_web::test]
async fn deleted_users_can_be_restored(deps: AppDependencies) {
    let app = actix_test::init_service(build_app(deps)).await;
    let id = create_user!(app, "ada@example.com", "Ada");

    let res = actix_test::call_service(
        &app,
        actix_test::TestRequest::delete()
            .uri(&format!("/api/v1/users/{id}"))
            .to_request(),
    )
    .await;
    assert_eq!(res.status().as_u16(), 204);

    let restored: Value = actix_test::call_and_read_body_json(
        &app,
        actix_test::TestRequest::post()
            .uri(&format!("/api/v1/users/{id}/restore"))
            .to_request(),
    )
    .await;
    assert_eq!(restored["id"], json!(id));
    assert!(restored.get("password").is_none());

    let res = actix_test::call_service(
        &app,
        actix_test::TestRequest::get()
            .uri(&format!("/api/v1/users/{id}"))
            .to_request(),
    )
    .await;
    assert_eq!(res.status().as_u16(), 200);
}

#[rstest]
#[actix_web::test]
async fn restoring_a_live_user_is_not_found(deps: AppDependencies) {
    let app = actix_test::init_service(build_app(deps)).await;
    let id = create_user!(app, "grace@example.com", "Grace");

    let res = actix_test::call_service(
        &app,
        actix_test::TestRequest::post()
            .uri(&format!("/api/v1/users/{id}/restore"))
            .to_request(),
    )
    .await;
    assert_eq!(res.status().as_u16(), 404);
}

#[rstest]
#[actix_web::test]
async fn purged_users_are_gone_for_good(deps: AppDependencies) {
    let app = actix_test::init_service(build_app(deps)).await;
    let id = create_user!(app, "alan@example.com", "Alan");

    let res = actix_test::call_service(
        &app,
        actix_test::TestRequest::delete()
            .uri(&format!("/api/v1/users/{id}/purge"))
            .to_request(),
    )
    .await;
    assert_eq!(res.status().as_u16(), 204);

    let res = actix_test::call_service(
        &app,
        actix_test::TestRequest::post()
            .uri(&format!("/api/v1/users/{id}/restore"))
            .to_request(),
    )
    .await;
    assert_eq!(res.status().as_u16(), 404);

    // The email is free again once the row is gone.
    create_user!(app, "alan@example.com", "Alan");
}

#[rstest]
#[actix_web::test]
async fn updates_change_only_the_given_fields(deps: AppDependencies) {
    let app = actix_test::init_service(build_app(deps)).await;
    let id = create_user!(app, "edsger@example.com", "Edsger");

    let updated: Value = actix_test::call_and_read_body_json(
        &app,
        actix_test::TestRequest::patch()
            .uri(&format!("/api/v1/users/{id}"))
            .set_json(json!({ "lastName": "Dijkstra" }))
            .to_request(),
    )
    .await;
    assert_eq!(updated["firstName"], json!("Edsger"));
    assert_eq!(updated["lastName"], json!("Dijkstra"));
    assert!(updated.get("password").is_none());
}

#[rstest]
#[actix_web::test]
async fn malformed_ids_are_bad_requests(deps: AppDependencies) {
    let app = actix_test::init_service(build_app(deps)).await;
    let res = actix_test::call_service(
        &app,
        actix_test::TestRequest::get()
            .uri("/api/v1/users/not-a-uuid")
            .to_request(),
    )
    .await;
    assert_eq!(res.status().as_u16(), 400);
}
