use anyhow::Context;
use axum::{
  extract::State,
  http::{header, HeaderName, HeaderValue, StatusCode},
  middleware::from_fn_with_state,
  Extension, Json,
};
use secrecy::SecretBox;
use serde::{Deserialize, Serialize};
use tower_cookies::{
  cookie::{time::Duration, SameSite},
  Cookie,
};
use tracing::{debug, instrument};
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};
use validator::Validate;

use crate::{
  entities::user::User,
  error::ApiResult,
  handlers::auth::{auth_guard, encode_jwt, AUTH_COOKIE_NAME},
  service::mutation,
  AppJson, AppState,
};

const USERS_TAG: &str = "users";

type SetCookie = [(HeaderName, HeaderValue); 1];

pub fn init_users_routes(state: AppState) -> OpenApiRouter<AppState> {
  let public_routes = OpenApiRouter::new()
    .routes(routes!(register))
    .routes(routes!(login));

  let protected_routes = OpenApiRouter::new()
    .routes(routes!(get_me, delete_me))
    .routes(routes!(logout))
    .layer(from_fn_with_state(state, auth_guard));

  public_routes.merge(protected_routes)
}

#[derive(Debug, Validate, Deserialize, ToSchema)]
pub struct RegisterUser {
  #[validate(email)]
  email: String,
  #[validate(length(min = 8))]
  password: String,
  first_name: Option<String>,
  last_name: Option<String>,
}

#[utoipa::path(
  post,
  path = "/register",
  tag = USERS_TAG,
  request_body = RegisterUser,
  responses(
    (status = 201, description = "User registered", body = User),
    (status = 400, description = "Validation error"),
    (status = 409, description = "Email already registered")
  )
)]
#[instrument(skip(state, input))]
async fn register(
  State(state): State<AppState>,
  AppJson(input): AppJson<RegisterUser>,
) -> ApiResult<(StatusCode, Json<User>)> {
  input.validate()?;

  let params = mutation::users::CreateUserParams {
    email: input.email,
    password: SecretBox::new(Box::new(input.password)),
    first_name: input.first_name,
    last_name: input.last_name,
  };

  debug!("Register new user with request: {:?}", params);

  let user = mutation::users::create(&state.pool, params).await?;

  Ok((StatusCode::CREATED, Json(user)))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginUser {
  #[validate(email)]
  email: String,
  #[validate(length(min = 1))]
  password: String,
}

#[derive(Debug, Serialize, ToSchema)]
struct LoginResponse {
  status: String,
  token: String,
}

#[utoipa::path(
  post,
  path = "/login",
  tag = USERS_TAG,
  request_body = LoginUser,
  responses(
    (status = 200, description = "Login successful", body = LoginResponse),
    (status = 400, description = "Validation error"),
    (status = 401, description = "Invalid credentials")
  )
)]
#[instrument(skip(state, input))]
async fn login(
  State(state): State<AppState>,
  AppJson(input): AppJson<LoginUser>,
) -> ApiResult<(SetCookie, Json<LoginResponse>)> {
  input.validate()?;

  let params = mutation::users::LoginParams {
    email: input.email,
    password: SecretBox::new(Box::new(input.password)),
  };

  debug!("Try login user with params {:?}", params);

  let user = mutation::users::login(&state.pool, params).await?;
  let token = encode_jwt(&state.keys, user.id)?;

  let cookie = set_auth_cookie(token.clone(), Duration::minutes(state.keys.max_age.num_minutes()))?;

  Ok((
    cookie,
    Json(LoginResponse {
      status: "success".to_string(),
      token,
    }),
  ))
}

#[utoipa::path(
  get,
  path = "/me",
  tag = USERS_TAG,
  responses(
    (status = OK, description = "Return current logged user", body = User),
    (status = 401, description = "Unauthorized")
  )
)]
async fn get_me(Extension(user): Extension<User>) -> ApiResult<Json<User>> {
  Ok(Json(user))
}

#[utoipa::path(
  delete,
  path = "/me",
  tag = USERS_TAG,
  responses(
    (status = 204, description = "Account and everything it owns deleted"),
    (status = 401, description = "Unauthorized")
  )
)]
#[instrument(skip(state, user), fields(user_id = %user.id))]
async fn delete_me(
  State(state): State<AppState>,
  Extension(user): Extension<User>,
) -> ApiResult<(StatusCode, SetCookie)> {
  mutation::users::delete(&state.pool, user.id).await?;

  Ok((StatusCode::NO_CONTENT, set_auth_cookie(String::new(), Duration::ZERO)?))
}

#[utoipa::path(
  post,
  path = "/logout",
  tag = USERS_TAG,
  responses(
    (status = 200, description = "Logout successful")
  )
)]
async fn logout() -> ApiResult<(SetCookie, Json<serde_json::Value>)> {
  Ok((
    set_auth_cookie(String::new(), Duration::ZERO)?,
    Json(serde_json::json!({"status": "success"})),
  ))
}

/// An empty token with zero max age clears the cookie on the client.
fn set_auth_cookie(token: String, max_age: Duration) -> ApiResult<SetCookie> {
  let cookie = Cookie::build((AUTH_COOKIE_NAME, token))
    .path("/")
    .max_age(max_age)
    .same_site(SameSite::Lax)
    .http_only(true)
    .build();

  let value = HeaderValue::from_str(&cookie.to_string()).context("auth cookie is not a valid header value")?;

  Ok([(header::SET_COOKIE, value)])
}
