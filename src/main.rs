use anyhow::{Context, Result};
use planhive_api::{AppState, Config};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
  dotenvy::dotenv().ok();

  let config = Config::from_env()?;

  let env_filter = EnvFilter::from_default_env().add_directive(config.log_level.parse()?);

  // Initialize tracing subscriber with the environment filter
  tracing_subscriber::fmt().with_env_filter(env_filter).init();

  let cancel_token = CancellationToken::new();

  // Start task for catching interrupt
  tokio::spawn({
    let cancel_token = cancel_token.clone();
    async move {
      let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
          error!("Failed to install Ctrl+C handler: {}", err);
          std::future::pending::<()>().await;
        }
      };

      #[cfg(unix)]
      let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
          Ok(mut sigterm) => {
            sigterm.recv().await;
          },
          Err(err) => {
            error!("Failed to install SIGTERM handler: {}", err);
            std::future::pending::<()>().await;
          },
        }
      };

      #[cfg(not(unix))]
      let terminate = std::future::pending::<()>();

      tokio::select! {
        _ = ctrl_c => {
          info!("Received Ctrl-C, shutting down...");
          cancel_token.cancel()
        },
        _ = terminate => {
          info!("Received terminate, shutting down...");
          cancel_token.cancel()
        },
      }
    }
  });

  let connect_options = config
    .database_url
    .parse::<SqliteConnectOptions>()
    .context("DATABASE_URL is not a valid sqlite url")?
    .create_if_missing(true);

  let pool = SqlitePoolOptions::new()
    .max_connections(100)
    .min_connections(5)
    .connect_with(connect_options)
    .await
    .context("Database connection failed")?;

  planhive_api::migrate(&pool).await.context("Database migration failed")?;

  let state = AppState::from_config(pool.clone(), &config);

  if let Err(err) = planhive_api::run(&config, state, cancel_token).await {
    error!("Api server stopped with error: {:?}", err);
  }

  pool.close().await;

  Ok(())
}
