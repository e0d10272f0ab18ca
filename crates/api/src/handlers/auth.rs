use axum::{
  extract::{Request, State},
  http::header,
  middleware::Next,
  response::IntoResponse,
};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::service::query;
use crate::AppState;

pub const AUTH_COOKIE_NAME: &str = "token";

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
  pub sub: String, // User associated with token
  pub iat: usize,  // Issued at time of the token
  pub exp: usize,  // Expiry time of the token
}

pub struct Keys {
  pub encoding: EncodingKey,
  pub decoding: DecodingKey,
  pub max_age: chrono::Duration,
}

impl Keys {
  pub fn new(secret: &[u8], max_age_minutes: i64) -> Self {
    Self {
      encoding: EncodingKey::from_secret(secret),
      decoding: DecodingKey::from_secret(secret),
      max_age: chrono::Duration::minutes(max_age_minutes),
    }
  }
}

pub fn encode_jwt(keys: &Keys, user_id: Uuid) -> ApiResult<String> {
  let now = chrono::Utc::now();
  let iat = now.timestamp() as usize;
  let exp = (now + keys.max_age).timestamp() as usize;
  let claims: Claims = Claims {
    sub: user_id.to_string(),
    exp,
    iat,
  };

  encode(&Header::default(), &claims, &keys.encoding)
    .map_err(|_| ApiError::Anyhow(anyhow::anyhow!("Can't encode token")))
}

fn decode_jwt(keys: &Keys, token: &str) -> ApiResult<Uuid> {
  let claims = decode::<Claims>(token, &keys.decoding, &Validation::default())
    .map_err(|_| ApiError::Unauthorized("Invalid token".to_string()))?
    .claims;

  Uuid::parse_str(&claims.sub).map_err(|_| ApiError::Unauthorized("Invalid token".to_string()))
}

/// Resolves the `token` cookie or bearer header to a [`crate::entities::user::User`]
/// and stores it in the request extensions.
pub async fn auth_guard(
  cookie_jar: CookieJar,
  State(state): State<AppState>,
  mut req: Request,
  next: Next,
) -> ApiResult<impl IntoResponse> {
  let token = cookie_jar
    .get(AUTH_COOKIE_NAME)
    .map(|cookie| cookie.value().to_string())
    .filter(|token| !token.is_empty())
    .or_else(|| {
      req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|auth_header| auth_header.to_str().ok())
        .and_then(|auth_value| {
          auth_value
            .strip_prefix("Bearer ")
            .map(|auth_value| auth_value.to_owned())
        })
    })
    .ok_or_else(|| ApiError::Unauthorized("You are not logged in, please provide token".to_string()))?;

  let user_id = decode_jwt(&state.keys, &token)?;

  let user = query::users::find_by_id(&state.pool, user_id)
    .await?
    .ok_or_else(|| ApiError::Unauthorized("The user belonging to this token no longer exists".to_string()))?;

  debug!("fetch user model from db {:?}", user);

  req.extensions_mut().insert(user);
  Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_token_round_trips_user_id() {
    let keys = Keys::new(b"secret", 60);
    let user_id = Uuid::new_v4();

    let token = encode_jwt(&keys, user_id).unwrap();

    assert_eq!(decode_jwt(&keys, &token).unwrap(), user_id);
  }

  #[test]
  fn test_token_signed_with_other_secret_is_rejected() {
    let token = encode_jwt(&Keys::new(b"other", 60), Uuid::new_v4()).unwrap();

    let err = decode_jwt(&Keys::new(b"secret", 60), &token).unwrap_err();

    assert!(matches!(err, ApiError::Unauthorized(_)));
  }

  #[test]
  fn test_expired_token_is_rejected() {
    let token = encode_jwt(&Keys::new(b"secret", -10), Uuid::new_v4()).unwrap();

    assert!(decode_jwt(&Keys::new(b"secret", 60), &token).is_err());
  }
}
