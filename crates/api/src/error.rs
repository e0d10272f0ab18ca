use axum::extract::rejection::JsonRejection;
use axum::response::{IntoResponse, Response};
use axum::{http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use sqlx::Error as SqlxError;
use thiserror::Error;

pub type ApiResult<T = ()> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
  #[error("Invalid credentials")]
  InvalidCredentials,
  #[error("Not authenticated: {0}")]
  Unauthorized(String),
  #[error("Access denied: {0}")]
  Forbidden(String),
  #[error("User with email `{0}` already exists")]
  UserAlreadyExist(String),
  #[error("Entity `{0}` is not found")]
  ResourceNotFound(String),
  #[error("Conflict: {0}")]
  Conflict(String),
  #[error("Invalid input: {0}")]
  InvalidInput(String),
  #[error("Database error: {0}")]
  DatabaseError(SqlxError),
  #[error(transparent)]
  JsonRejection(JsonRejection),
  #[error(transparent)]
  InvalidInputError(#[from] validator::ValidationErrors),
  #[error("an internal server error occurred")]
  Anyhow(#[from] anyhow::Error),
}

impl ApiError {
  pub fn status_code(&self) -> StatusCode {
    use ApiError::*;

    match self {
      InvalidCredentials | Unauthorized(_) => StatusCode::UNAUTHORIZED,
      Forbidden(_) => StatusCode::FORBIDDEN,
      ResourceNotFound(_) => StatusCode::NOT_FOUND,
      UserAlreadyExist(_) | Conflict(_) => StatusCode::CONFLICT,
      InvalidInput(_) | JsonRejection(_) | InvalidInputError(_) => StatusCode::BAD_REQUEST,
      DatabaseError(_) | Anyhow(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  pub fn response(self) -> (StatusCode, AppResponseError) {
    use ApiError::*;
    let message = self.to_string();
    let status_code = self.status_code();

    let (kind, details) = match self {
      JsonRejection(rejection) => (
        "INVALID_INPUT_ERROR",
        vec![(rejection.status().to_string(), vec![rejection.body_text()])],
      ),
      InvalidInputError(err) => (
        "INVALID_INPUT_ERROR",
        err
          .field_errors()
          .into_iter()
          .map(|(p, e)| {
            (
              p.to_string(),
              e.iter().map(|err| err.code.to_string()).collect::<Vec<String>>(),
            )
          })
          .collect(),
      ),
      InvalidInput(_) => ("INVALID_INPUT_ERROR", vec![]),
      InvalidCredentials => ("INVALID_CREDENTIALS", vec![]),
      Unauthorized(_) => ("UNAUTHORIZED", vec![]),
      Forbidden(_) => ("FORBIDDEN", vec![]),
      ResourceNotFound(_) => ("RESOURCE_NOT_FOUND", vec![]),
      UserAlreadyExist(_) | Conflict(_) => ("CONFLICT", vec![]),
      DatabaseError(ref e) => {
        tracing::error!("Database error: {:?}", e);

        ("INTERNAL_SERVER_ERROR", vec![])
      },
      Anyhow(ref e) => {
        tracing::error!("Generic error: {:?}", e);

        ("INTERNAL_SERVER_ERROR", vec![])
      },
    };

    // Internal failures never leak their source to the client
    let message = if status_code == StatusCode::INTERNAL_SERVER_ERROR {
      "an internal server error occurred".to_string()
    } else {
      message
    };

    (status_code, AppResponseError::new(kind, message, None, details))
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status_code, body) = self.response();
    (status_code, Json(body)).into_response()
  }
}

impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self {
    Self::JsonRejection(rejection)
  }
}

impl From<SqlxError> for ApiError {
  fn from(error: SqlxError) -> Self {
    match &error {
      SqlxError::Database(db_error) if db_error.is_unique_violation() => {
        Self::Conflict(format!("duplicate entry: {}", db_error.message()))
      },
      _ => Self::DatabaseError(error),
    }
  }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct AppResponseError {
  pub kind: String,
  pub error_message: String,
  pub code: Option<i32>,
  pub details: Vec<(String, Vec<String>)>,
}

impl AppResponseError {
  pub fn new(
    kind: impl Into<String>,
    message: impl Into<String>,
    code: Option<i32>,
    details: Vec<(String, Vec<String>)>,
  ) -> Self {
    Self {
      kind: kind.into(),
      error_message: message.into(),
      code,
      details,
    }
  }
}
