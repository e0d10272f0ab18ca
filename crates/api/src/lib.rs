use std::sync::Arc;

use axum::{
  extract::{FromRequest, State},
  http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
  },
  response::IntoResponse,
  routing::get,
  Router,
};
use error::ApiError;
use secrecy::ExposeSecret;
use serde_json::json;
use sqlx::SqlitePool;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::info;
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_swagger_ui::SwaggerUi;

use handlers::{
  auth::Keys, comments::init_comments_routes, invitations::init_invitations_routes,
  memberships::init_memberships_routes, projects::init_projects_routes, tasks::init_tasks_routes,
  users::init_users_routes,
};

pub mod config;
pub mod entities;
pub mod error;
mod handlers;
pub mod service;

pub use config::Config;

const PLANHIVE_TAG: &str = "planhive";

#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
struct AppJson<T>(T);

/// Shared state of every handler: the store and the token keys.
#[derive(Clone)]
pub struct AppState {
  pub pool: SqlitePool,
  keys: Arc<Keys>,
}

impl AppState {
  pub fn new(pool: SqlitePool, jwt_secret: &[u8], jwt_maxage_minutes: i64) -> Self {
    Self {
      pool,
      keys: Arc::new(Keys::new(jwt_secret, jwt_maxage_minutes)),
    }
  }

  pub fn from_config(pool: SqlitePool, config: &Config) -> Self {
    Self::new(pool, config.jwt_secret.expose_secret().as_bytes(), config.jwt_maxage)
  }
}

/// Applies the bundled schema migrations.
pub async fn migrate(pool: &SqlitePool) -> anyhow::Result<()> {
  sqlx::migrate!("./migrations").run(pool).await?;

  Ok(())
}

/// Handle health check requests
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
  let res = sqlx::query("SELECT 1").execute(&state.pool).await;
  match res {
    Ok(_) => json!({
      "code": "200",
      "success": true,
    })
    .to_string(),
    Err(_) => json!({
      "code": "500",
      "success": false,
    })
    .to_string(),
  }
}

/// Builds the application router with OpenAPI docs mounted at `/swagger-ui`.
pub fn router(state: AppState) -> Router {
  #[derive(OpenApi)]
  #[openapi(
    tags(
      (name = PLANHIVE_TAG, description = "Project management API")
    )
  )]
  struct ApiDoc;

  let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
    .route("/health", get(health_handler))
    .nest("/api/users", init_users_routes(state.clone()))
    .nest("/api/projects", init_projects_routes(state.clone()))
    .nest("/api/memberships", init_memberships_routes(state.clone()))
    .nest("/api/tasks", init_tasks_routes(state.clone()))
    .nest("/api/comments", init_comments_routes(state.clone()))
    .nest("/api/invitations", init_invitations_routes(state.clone()))
    .with_state(state)
    .split_for_parts();

  router.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api))
}

pub async fn run(config: &Config, state: AppState, cancel_token: CancellationToken) -> anyhow::Result<()> {
  let server_url = config.server_url();

  // Initialize cors settings
  let cors = CorsLayer::new()
    .allow_origin(config.cors_origin.parse::<HeaderValue>()?)
    .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE])
    .allow_credentials(true)
    .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE]);

  let router = router(state).layer(cors);

  info!("Starting api server on {}...", server_url);

  let listener = TcpListener::bind(&server_url).await?;
  axum::serve(listener, router.into_make_service())
    .with_graceful_shutdown(Box::pin(async move { cancel_token.cancelled().await }))
    .await?;

  info!("Stopped api server");

  Ok(())
}
