use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use super::user::User;

#[derive(Serialize, Deserialize, FromRow, Debug, Clone, ToSchema)]
pub struct ProjectRow {
  pub id: Uuid,
  pub name: String,
  pub final_deadline: Option<DateTime<Utc>>,
  pub owner_id: Uuid,
  pub created_at: DateTime<Utc>,
}

/// Project with its owner joined in.
#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct Project {
  pub id: Uuid,
  pub name: String,
  pub final_deadline: Option<DateTime<Utc>>,
  pub owner_id: Uuid,
  pub owner: User,
  pub created_at: DateTime<Utc>,
}
