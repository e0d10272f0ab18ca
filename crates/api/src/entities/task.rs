use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use super::user::User;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
pub enum TaskStatus {
  #[default]
  New,
  InProgress,
  UnderReview,
  Completed,
  Overdue,
}

impl fmt::Display for TaskStatus {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      TaskStatus::New => write!(f, "New"),
      TaskStatus::InProgress => write!(f, "InProgress"),
      TaskStatus::UnderReview => write!(f, "UnderReview"),
      TaskStatus::Completed => write!(f, "Completed"),
      TaskStatus::Overdue => write!(f, "Overdue"),
    }
  }
}

#[derive(Serialize, Deserialize, FromRow, Debug, Clone, ToSchema)]
pub struct TaskRow {
  pub id: Uuid,
  pub name: String,
  pub description: Option<String>,
  pub deadline: Option<DateTime<Utc>>,
  pub status: TaskStatus,
  pub project_id: Option<Uuid>,
  pub parent_task_id: Option<Uuid>,
  pub assigned_to_id: Option<Uuid>,
  pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct Task {
  pub id: Uuid,
  pub name: String,
  pub description: Option<String>,
  pub deadline: Option<DateTime<Utc>>,
  pub status: TaskStatus,
  pub project_id: Option<Uuid>,
  pub parent_task_id: Option<Uuid>,
  pub assigned_to_id: Option<Uuid>,
  pub assigned_to: Option<User>,
  pub created_at: DateTime<Utc>,
}
