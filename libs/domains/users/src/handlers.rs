//! HTTP handlers for the users API

use axum::{
    Extension, Router,
    extract::{Path, Query, State, rejection::QueryRejection},
    middleware,
    routing::{get, post},
};
use axum_helpers::{
    ApiResponse, AppError, ValidatedJson,
    errors::responses::{
        InternalServerErrorResponse, NotFoundResponse, UnauthorizedResponse,
        ValidationErrorResponse,
    },
    require_bearer,
};
use std::sync::Arc;
use utoipa::OpenApi;
use validator::Validate;

use crate::auth::AuthService;
use crate::events::{NotificationSink, UserEvent};
use crate::models::{
    AuthenticatedUser, CreateUser, LoginRequest, LoginResponse, PageMeta, RefreshTokenRequest,
    SortField, TokenResponse, UpdateUser, UserFilter, UserListing, UserResponse,
};
use crate::oauth::TokenServer;
use crate::repository::UserRepository;
use crate::service::UserService;

/// OpenAPI documentation for the users API
#[derive(OpenApi)]
#[openapi(
    paths(
        create_user,
        login,
        refresh,
        logout,
        restore_user,
        get_self,
        list_users,
        get_user,
        update_user,
        delete_user,
        crate::oauth::endpoint::issue_token,
    ),
    components(
        schemas(
            UserResponse, CreateUser, UpdateUser, UserFilter, SortField, UserListing,
            PageMeta, LoginRequest, RefreshTokenRequest, LoginResponse, TokenResponse,
            crate::oauth::TokenRequest, crate::oauth::error::OAuthErrorBody,
        ),
        responses(
            UnauthorizedResponse,
            NotFoundResponse,
            ValidationErrorResponse,
            InternalServerErrorResponse
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "users", description = "User directory"),
        (name = "auth", description = "Login, token refresh and logout"),
        (name = "oauth", description = "Token endpoint")
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl utoipa::Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};

        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

/// Everything the users handlers need
pub struct UsersState<R: UserRepository> {
    pub users: UserService<R>,
    pub auth: AuthService<R>,
    pub notifier: Arc<dyn NotificationSink>,
}

type SharedState<R> = State<Arc<UsersState<R>>>;
type ApiResult<T> = Result<ApiResponse<T>, AppError>;

/// Users routes, to be nested under `/api`.
///
/// Everything except create, login and refresh requires a bearer token
/// accepted by `guard`.
pub fn router<R: UserRepository + 'static>(state: UsersState<R>, guard: TokenServer<R>) -> Router {
    let state = Arc::new(state);

    let public = Router::new()
        .route("/user", post(create_user::<R>))
        .route("/user/login", post(login::<R>))
        .route("/user/refresh", post(refresh::<R>));

    let protected = Router::new()
        .route("/user", get(list_users::<R>))
        .route("/user/logout", post(logout::<R>))
        .route("/user/restore/{username}", post(restore_user::<R>))
        .route("/user/get/self", get(get_self::<R>))
        .route(
            "/user/{username}",
            get(get_user::<R>)
                .put(update_user::<R>)
                .delete(delete_user::<R>),
        )
        .route_layer(middleware::from_fn_with_state(
            guard,
            require_bearer::<TokenServer<R>>,
        ));

    public.merge(protected).with_state(state)
}

/// Create a user
#[utoipa::path(
    post,
    path = "/user",
    tag = "users",
    request_body = CreateUser,
    responses(
        (status = 200, description = "Successfully created record.", body = ApiResponse<UserResponse>),
        (status = 422, response = ValidationErrorResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn create_user<R: UserRepository>(
    State(state): SharedState<R>,
    ValidatedJson(input): ValidatedJson<CreateUser>,
) -> ApiResult<UserResponse> {
    let user = state.users.create_user(input).await?;
    state.notifier.notify(UserEvent::Created(user.clone()));
    Ok(ApiResponse::success("Successfully created record.", user))
}

/// Exchange a username (or email) and password for tokens
#[utoipa::path(
    post,
    path = "/user/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Successfully logged in", body = ApiResponse<LoginResponse>),
        (status = 401, response = UnauthorizedResponse),
        (status = 422, response = ValidationErrorResponse)
    )
)]
async fn login<R: UserRepository>(
    State(state): SharedState<R>,
    ValidatedJson(input): ValidatedJson<LoginRequest>,
) -> ApiResult<LoginResponse> {
    let response = state.auth.login(&input.username, &input.password).await?;
    Ok(ApiResponse::success("Successfully logged in", response).with_slug("login_success"))
}

/// Exchange a refresh token for a new token pair
#[utoipa::path(
    post,
    path = "/user/refresh",
    tag = "auth",
    request_body = RefreshTokenRequest,
    responses(
        (status = 200, description = "Tokens refreshed", body = ApiResponse<TokenResponse>),
        (status = 401, response = UnauthorizedResponse),
        (status = 422, response = ValidationErrorResponse)
    )
)]
async fn refresh<R: UserRepository>(
    State(state): SharedState<R>,
    ValidatedJson(input): ValidatedJson<RefreshTokenRequest>,
) -> ApiResult<TokenResponse> {
    let tokens = state.auth.refresh(&input.refresh_token).await?;
    Ok(ApiResponse::success("Tokens refreshed", tokens))
}

/// Revoke the current access token and its refresh tokens
#[utoipa::path(
    post,
    path = "/user/logout",
    tag = "auth",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Successfully logged out", body = ApiResponse<UserResponse>),
        (status = 401, response = UnauthorizedResponse)
    )
)]
async fn logout<R: UserRepository>(
    State(state): SharedState<R>,
    Extension(identity): Extension<AuthenticatedUser>,
) -> ApiResult<UserResponse> {
    let user = state.auth.logout(&identity).await?;
    Ok(ApiResponse::success("Successfully logged out", user).with_slug("logout_success"))
}

/// The authenticated user
#[utoipa::path(
    get,
    path = "/user/get/self",
    tag = "users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Successfully fetched record.", body = ApiResponse<UserResponse>),
        (status = 401, response = UnauthorizedResponse)
    )
)]
async fn get_self<R: UserRepository>(
    State(state): SharedState<R>,
    Extension(identity): Extension<AuthenticatedUser>,
) -> ApiResult<UserResponse> {
    let user = UserResponse::from(identity.user);
    state.notifier.notify(UserEvent::Fetched(user.clone()));
    Ok(ApiResponse::success("Successfully fetched record.", user))
}

/// Search and list active users
#[utoipa::path(
    get,
    path = "/user",
    tag = "users",
    security(("bearer" = [])),
    params(UserFilter),
    responses(
        (status = 200, description = "Successfully collected record.", body = ApiResponse<UserListing>),
        (status = 401, response = UnauthorizedResponse),
        (status = 422, response = ValidationErrorResponse)
    )
)]
async fn list_users<R: UserRepository>(
    State(state): SharedState<R>,
    filter: Result<Query<UserFilter>, QueryRejection>,
) -> ApiResult<UserListing> {
    let Query(filter) = filter.map_err(|e| AppError::validation(e.body_text()))?;
    filter.validate()?;

    let listing = state.users.list_users(&filter).await?;
    state
        .notifier
        .notify(UserEvent::Collected { count: listing.len() });
    Ok(ApiResponse::success("Successfully collected record.", listing))
}

/// Fetch one active user
#[utoipa::path(
    get,
    path = "/user/{username}",
    tag = "users",
    security(("bearer" = [])),
    params(("username" = String, Path, description = "Username")),
    responses(
        (status = 200, description = "Successfully fetched record.", body = ApiResponse<UserResponse>),
        (status = 401, response = UnauthorizedResponse),
        (status = 404, response = NotFoundResponse)
    )
)]
async fn get_user<R: UserRepository>(
    State(state): SharedState<R>,
    Path(username): Path<String>,
) -> ApiResult<UserResponse> {
    let user = state.users.get_user(&username).await?;
    state.notifier.notify(UserEvent::Fetched(user.clone()));
    Ok(ApiResponse::success("Successfully fetched record.", user))
}

/// Update a user
#[utoipa::path(
    put,
    path = "/user/{username}",
    tag = "users",
    security(("bearer" = [])),
    params(("username" = String, Path, description = "Username")),
    request_body = UpdateUser,
    responses(
        (status = 200, description = "Successfully updated record.", body = ApiResponse<UserResponse>),
        (status = 401, response = UnauthorizedResponse),
        (status = 404, response = NotFoundResponse),
        (status = 422, response = ValidationErrorResponse)
    )
)]
async fn update_user<R: UserRepository>(
    State(state): SharedState<R>,
    Path(username): Path<String>,
    ValidatedJson(input): ValidatedJson<UpdateUser>,
) -> ApiResult<UserResponse> {
    let user = state.users.update_user(&username, input).await?;
    state.notifier.notify(UserEvent::Updated(user.clone()));
    Ok(ApiResponse::success("Successfully updated record.", user))
}

/// Soft-delete a user
#[utoipa::path(
    delete,
    path = "/user/{username}",
    tag = "users",
    security(("bearer" = [])),
    params(("username" = String, Path, description = "Username")),
    responses(
        (status = 200, description = "Successfully deleted record.", body = ApiResponse<UserResponse>),
        (status = 401, response = UnauthorizedResponse),
        (status = 404, response = NotFoundResponse)
    )
)]
async fn delete_user<R: UserRepository>(
    State(state): SharedState<R>,
    Path(username): Path<String>,
) -> ApiResult<UserResponse> {
    let user = state.users.delete_user(&username).await?;
    state.notifier.notify(UserEvent::Deleted(user.clone()));
    Ok(ApiResponse::success("Successfully deleted record.", user))
}

/// Restore a soft-deleted user
#[utoipa::path(
    post,
    path = "/user/restore/{username}",
    tag = "users",
    security(("bearer" = [])),
    params(("username" = String, Path, description = "Username")),
    responses(
        (status = 200, description = "Successfully restored record.", body = ApiResponse<UserResponse>),
        (status = 401, response = UnauthorizedResponse),
        (status = 404, response = NotFoundResponse),
        (status = 422, response = ValidationErrorResponse)
    )
)]
async fn restore_user<R: UserRepository>(
    State(state): SharedState<R>,
    Path(username): Path<String>,
) -> ApiResult<UserResponse> {
    let user = state.users.restore_user(&username).await?;
    state.notifier.notify(UserEvent::Restored(user.clone()));
    Ok(ApiResponse::success("Successfully restored record.", user))
}
