use super::*;
use actix_rt::System;
use rstest::rstest;

#[rstest]
fn port_error_constructors_accept_borrowed_messages() {
    let err = DatabaseProbeError::unavailable("connection refused");
    assert_eq!(
        err,
        DatabaseProbeError::Unavailable {
            message: "connection refused".to_owned()
        }
    );
    assert_eq!(err.to_string(), "database probe failed: connection refused");
}

#[rstest]
fn password_hash_error_renders_its_message() {
    let err = PasswordHashError::hash("salt too short");
    assert_eq!(err.to_string(), "password hashing failed: salt too short");
}

#[rstest]
fn fixture_probe_always_answers() {
    System::new().block_on(async {
        FixtureDatabaseProbe.ping().await.expect("fixture probe succeeds");
    });
}

#[rstest]
fn fixture_hasher_never_returns_the_plaintext() {
    let hash = FixturePasswordHasher
        .hash("Password123!")
        .expect("fixture hash");
    assert_ne!(hash, "Password123!");
    assert!(hash.ends_with("Password123!"));
}
