use std::env;

use anyhow::{Context, Result};
use secrecy::SecretString;

const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3000";

/// Runtime settings read from the environment (and `.env`, loaded by the binary).
#[derive(Debug)]
pub struct Config {
  pub log_level: String,
  pub database_url: String,
  pub host: String,
  pub port: u16,
  pub jwt_secret: SecretString,
  /// Token lifetime in minutes.
  pub jwt_maxage: i64,
  pub cors_origin: String,
}

impl Config {
  pub fn from_env() -> Result<Self> {
    Self::from_lookup(|key| env::var(key).ok())
  }

  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    let required = |key: &str| lookup(key).with_context(|| format!("{key} is not set in .env file"));

    let port = required("PORT")?;
    let jwt_maxage = required("JWT_MAXAGE")?;

    Ok(Self {
      log_level: required("PLANHIVE_LOG_LEVEL")?,
      database_url: required("DATABASE_URL")?,
      host: required("HOST")?,
      port: port.parse().with_context(|| format!("PORT `{port}` is not a valid port"))?,
      jwt_secret: SecretString::from(required("JWT_SECRET")?),
      jwt_maxage: jwt_maxage
        .parse()
        .with_context(|| format!("JWT_MAXAGE `{jwt_maxage}` is not a number of minutes"))?,
      cors_origin: lookup("CORS_ORIGIN").unwrap_or_else(|| DEFAULT_CORS_ORIGIN.to_string()),
    })
  }

  pub fn server_url(&self) -> String {
    format!("{}:{}", self.host, self.port)
  }
}
