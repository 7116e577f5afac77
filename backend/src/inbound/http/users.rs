//! Users API handlers.
//!
//! ```text
//! POST   /api/v1/users                {"email":"ada@example.com", ...}
//! GET    /api/v1/users?page=1&pageSize=10&sort=-createdAt
//! GET    /api/v1/users/{id}
//! PATCH  /api/v1/users/{id}
//! DELETE /api/v1/users/{id}
//! POST   /api/v1/users/{id}/restore
//! DELETE /api/v1/users/{id}/purge
//! ```
//!
//! Handlers only parse and validate; the `UsersQuery` and `UsersCommand`
//! ports do the rest.

use actix_web::{HttpResponse, delete, get, patch, post, web};
use pagination::Paginated;

use crate::domain::{
    ApiResult, CreateUserRequest, UpdateUserRequest, User, UserId, UserListParams, UserListQuery,
};
use crate::inbound::http::error::ErrorEnvelope;
use crate::inbound::http::state::HttpState;

fn user_id(path: &web::Path<String>) -> ApiResult<UserId> {
    Ok(UserId::parse(path.as_str())?)
}

/// Create a user.
#[utoipa::path(
    post,
    path = "/api/v1/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 400, description = "Invalid input data", body = ErrorEnvelope),
        (status = 409, description = "Email already registered", body = ErrorEnvelope),
        (status = 500, description = "Internal server error", body = ErrorEnvelope)
    ),
    tags = ["users"],
    operation_id = "createUser"
)]
#[post("/users")]
pub async fn create_user(
    state: web::Data<HttpState>,
    payload: web::Json<CreateUserRequest>,
) -> ApiResult<HttpResponse> {
    let new_user = payload.into_inner().validate()?;
    let user = state.users_command.create(new_user).await?;
    Ok(HttpResponse::Created().json(user))
}

/// List users that have not been deleted.
///
/// # Examples
/// ```
/// use actix_web::App;
/// use b2b_api::inbound::http::users::list_users;
///
/// let app = App::new().service(list_users);
/// ```
#[utoipa::path(
    get,
    path = "/api/v1/users",
    params(UserListParams),
    responses(
        (status = 200, description = "One page of users", body = Paginated<User>),
        (status = 400, description = "Invalid query parameters", body = ErrorEnvelope),
        (status = 500, description = "Internal server error", body = ErrorEnvelope)
    ),
    tags = ["users"],
    operation_id = "listUsers"
)]
#[get("/users")]
pub async fn list_users(
    state: web::Data<HttpState>,
    params: web::Query<UserListParams>,
) -> ApiResult<web::Json<Paginated<User>>> {
    let query = UserListQuery::try_from(params.into_inner())?;
    Ok(web::Json(state.users.list(query).await?))
}

/// Fetch one user.
#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    params(("id" = String, Path, description = "User id (UUID)")),
    responses(
        (status = 200, description = "User found", body = User),
        (status = 400, description = "Malformed id", body = ErrorEnvelope),
        (status = 404, description = "User not found", body = ErrorEnvelope)
    ),
    tags = ["users"],
    operation_id = "getUser"
)]
#[get("/users/{id}")]
pub async fn get_user(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<web::Json<User>> {
    let id = user_id(&path)?;
    Ok(web::Json(state.users.get(id).await?))
}

/// Change some of a user's fields.
#[utoipa::path(
    patch,
    path = "/api/v1/users/{id}",
    params(("id" = String, Path, description = "User id (UUID)")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = User),
        (status = 400, description = "Invalid input data", body = ErrorEnvelope),
        (status = 404, description = "User not found", body = ErrorEnvelope),
        (status = 409, description = "Email already registered", body = ErrorEnvelope)
    ),
    tags = ["users"],
    operation_id = "updateUser"
)]
#[patch("/users/{id}")]
pub async fn update_user(
    state: web::Data<HttpState>,
    path: web::Path<String>,
    payload: web::Json<UpdateUserRequest>,
) -> ApiResult<web::Json<User>> {
    let id = user_id(&path)?;
    let changes = payload.into_inner().validate()?;
    Ok(web::Json(state.users_command.update(id, changes).await?))
}

/// Soft delete a user.
#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}",
    params(("id" = String, Path, description = "User id (UUID)")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 404, description = "User not found", body = ErrorEnvelope)
    ),
    tags = ["users"],
    operation_id = "deleteUser"
)]
#[delete("/users/{id}")]
pub async fn delete_user(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let id = user_id(&path)?;
    state.users_command.delete(id).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Bring back a soft-deleted user.
#[utoipa::path(
    post,
    path = "/api/v1/users/{id}/restore",
    params(("id" = String, Path, description = "User id (UUID)")),
    responses(
        (status = 200, description = "User restored", body = User),
        (status = 404, description = "No deleted user with that id", body = ErrorEnvelope)
    ),
    tags = ["users"],
    operation_id = "restoreUser"
)]
#[post("/users/{id}/restore")]
pub async fn restore_user(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<web::Json<User>> {
    let id = user_id(&path)?;
    Ok(web::Json(state.users_command.restore(id).await?))
}

/// Permanently remove a user, deleted or not.
#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}/purge",
    params(("id" = String, Path, description = "User id (UUID)")),
    responses(
        (status = 204, description = "User removed"),
        (status = 404, description = "User not found", body = ErrorEnvelope)
    ),
    tags = ["users"],
    operation_id = "purgeUser"
)]
#[delete("/users/{id}/purge")]
pub async fn purge_user(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let id = user_id(&path)?;
    state.users_command.purge(id).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Register every users route on `cfg`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(create_user)
        .service(list_users)
        .service(get_user)
        .service(update_user)
        .service(purge_user)
        .service(delete_user)
        .service(restore_user);
}
