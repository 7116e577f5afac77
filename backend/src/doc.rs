//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] registers every HTTP endpoint from the inbound layer together
//! with the request, response and error envelope schemas. The document is
//! served by Swagger UI at `/api/docs` in debug builds and exported by
//! `cargo run --bin openapi-dump` for external tooling.

use utoipa::OpenApi;

use crate::domain::{CreateUserRequest, UpdateUserRequest, User, UserRole};
use crate::inbound::http::error::ErrorEnvelope;
use crate::inbound::http::health::{DatabaseHealthReport, HealthReport};

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "B2B API",
        description = "User management with soft deletion and a uniform error envelope."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    paths(
        crate::inbound::http::users::create_user,
        crate::inbound::http::users::list_users,
        crate::inbound::http::users::get_user,
        crate::inbound::http::users::update_user,
        crate::inbound::http::users::delete_user,
        crate::inbound::http::users::restore_user,
        crate::inbound::http::users::purge_user,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
        crate::inbound::http::health::health,
        crate::inbound::http::health::database_health,
    ),
    components(schemas(
        User,
        UserRole,
        CreateUserRequest,
        UpdateUserRequest,
        ErrorEnvelope,
        HealthReport,
        DatabaseHealthReport,
    )),
    tags(
        (name = "users", description = "User management"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    //! Tests verifying OpenAPI path and schema registration.

    use super::*;
    use rstest::rstest;
    use utoipa::openapi::RefOr;
    use utoipa::openapi::schema::Schema;

    /// Assert that an Object schema contains a field with the given name.
    fn assert_object_schema_has_field(schema: &RefOr<Schema>, field: &str) {
        match schema {
            RefOr::T(Schema::Object(obj)) => {
                assert!(
                    obj.properties.contains_key(field),
                    "schema should have field '{field}'"
                );
            }
            _ => panic!("expected Object schema"),
        }
    }

    #[rstest]
    #[case("/api/v1/users")]
    #[case("/api/v1/users/{id}")]
    #[case("/api/v1/users/{id}/restore")]
    #[case("/api/v1/users/{id}/purge")]
    #[case("/api/v1/health/db")]
    #[case("/health/ready")]
    fn paths_are_registered(#[case] path: &str) {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key(path), "missing path {path}");
    }

    #[rstest]
    fn error_envelope_schema_uses_wire_names() {
        let doc = ApiDoc::openapi();
        let schemas = &doc.components.as_ref().expect("components").schemas;
        let envelope = schemas.get("ErrorEnvelope").expect("ErrorEnvelope schema");
        for field in ["statusCode", "message", "errorCode", "timestamp", "path", "method"] {
            assert_object_schema_has_field(envelope, field);
        }
    }

    #[rstest]
    fn user_schema_omits_the_password() {
        let doc = ApiDoc::openapi();
        let schemas = &doc.components.as_ref().expect("components").schemas;
        let user = schemas.get("User").expect("User schema");
        assert_object_schema_has_field(user, "email");
        assert_object_schema_has_field(user, "deletedAt");
        if let RefOr::T(Schema::Object(obj)) = user {
            assert!(!obj.properties.contains_key("password"));
        }
    }
}
