use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Serialize, Deserialize, FromRow, Debug, Clone, ToSchema)]
pub struct User {
  pub id: Uuid,
  pub email: String,
  #[serde(skip_serializing)]
  #[schema(ignore)]
  pub password: String,
  pub first_name: Option<String>,
  pub last_name: Option<String>,
  pub created_at: DateTime<Utc>,
}
