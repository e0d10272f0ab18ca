use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Serialize, Deserialize, FromRow, Debug, Clone, ToSchema)]
pub struct Comment {
  pub id: Uuid,
  pub text: String,
  pub created_at: DateTime<Utc>,
  pub author_id: Uuid,
  pub task_id: Uuid,
}
