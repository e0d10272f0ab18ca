use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{membership::MembershipRole, project::ProjectRow, user::User};

/// Lifecycle of an invitation. `Accepted` and `Declined` are terminal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum InvitationStatus {
  #[default]
  Pending,
  Accepted,
  Declined,
}

impl InvitationStatus {
  pub fn is_terminal(self) -> bool {
    !matches!(self, InvitationStatus::Pending)
  }
}

impl fmt::Display for InvitationStatus {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      InvitationStatus::Pending => write!(f, "pending"),
      InvitationStatus::Accepted => write!(f, "accepted"),
      InvitationStatus::Declined => write!(f, "declined"),
    }
  }
}

#[derive(Serialize, Deserialize, FromRow, Debug, Clone, ToSchema)]
pub struct InvitationRow {
  pub id: Uuid,
  pub project_id: Uuid,
  pub inviter_id: Uuid,
  pub invitee_id: Uuid,
  pub role: MembershipRole,
  pub status: InvitationStatus,
  pub created_at: DateTime<Utc>,
}

/// Invitation with project, inviter and invitee joined for display.
#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct Invitation {
  pub id: Uuid,
  pub project_id: Uuid,
  pub inviter_id: Uuid,
  pub invitee_id: Uuid,
  pub role: MembershipRole,
  pub status: InvitationStatus,
  pub created_at: DateTime<Utc>,
  pub project: ProjectRow,
  pub inviter: User,
  pub invitee: User,
}
