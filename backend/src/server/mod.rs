//! Server construction and middleware wiring.
//!
//! Route layout:
//!
//! ```text
//! /health/live, /health/ready      orchestration probes
//! {api_scope}/health, /health/db   JSON status reports
//! {api_scope}/users/...            users API
//! /api/docs                        Swagger UI (debug builds)
//! anything else                    404 error envelope
//! ```

mod config;
mod state_builders;

pub use config::{ServerConfig, ServerConfigError};
pub use state_builders::{build_http_state, build_users_state};

use actix_web::body::MessageBody;
use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

#[cfg(debug_assertions)]
use crate::doc::ApiDoc;
use crate::inbound::http::error::{
    ErrorFormatter, json_error_handler, query_error_handler, route_not_found,
};
use crate::inbound::http::health::{HealthState, database_health, health, live, ready};
use crate::inbound::http::state::HttpState;
use crate::inbound::http::users;
use crate::middleware::{Correlation, ErrorFilter};

/// Everything a worker needs to build its [`App`].
#[derive(Clone)]
pub struct AppDependencies {
    pub health_state: web::Data<HealthState>,
    pub http_state: web::Data<HttpState>,
    pub formatter: ErrorFormatter,
    pub api_scope: String,
}

/// Assemble the application: routes, extractor error handlers and the
/// middleware chain.
pub fn build_app(
    deps: AppDependencies,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let AppDependencies {
        health_state,
        http_state,
        formatter,
        api_scope,
    } = deps;

    let api = web::scope(&api_scope)
        .service(health)
        .service(database_health)
        .configure(users::configure);

    let app = App::new()
        .app_data(health_state)
        .app_data(http_state)
        .app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .app_data(web::QueryConfig::default().error_handler(query_error_handler))
        .wrap(ErrorFilter::new(formatter))
        .wrap(Correlation)
        .service(ready)
        .service(live)
        .service(api);

    #[cfg(debug_assertions)]
    let app = app.service(
        SwaggerUi::new("/api/docs/{_:.*}").url("/api/docs/openapi.json", ApiDoc::openapi()),
    );

    app.default_service(web::to(route_not_found))
}

/// Construct an Actix HTTP server using the provided health state and configuration.
///
/// # Errors
///
/// Propagates [`std::io::Error`] when binding the socket fails.
pub fn create_server(
    health_state: web::Data<HealthState>,
    config: ServerConfig,
) -> std::io::Result<Server> {
    let http_state = web::Data::new(build_http_state(&config));
    let formatter = config.error_formatter();
    let api_scope = config.api_scope.clone();
    let server_health_state = health_state.clone();

    let server = HttpServer::new(move || {
        build_app(AppDependencies {
            health_state: server_health_state.clone(),
            http_state: http_state.clone(),
            formatter: formatter.clone(),
            api_scope: api_scope.clone(),
        })
    })
    .bind(config.bind_addr)?
    .run();

    health_state.mark_ready();
    Ok(server)
}
