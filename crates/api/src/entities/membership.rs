use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use super::user::User;

/// Role of a non-owner participant. Ownership is tracked on the project itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum MembershipRole {
  #[default]
  Member,
  Leader,
}

impl fmt::Display for MembershipRole {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      MembershipRole::Member => write!(f, "member"),
      MembershipRole::Leader => write!(f, "leader"),
    }
  }
}

#[derive(Serialize, Deserialize, FromRow, Debug, Clone, ToSchema)]
pub struct MembershipRow {
  pub id: Uuid,
  pub user_id: Uuid,
  pub project_id: Uuid,
  pub role: MembershipRole,
}

#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct Membership {
  pub id: Uuid,
  pub project_id: Uuid,
  pub role: MembershipRole,
  pub user: User,
}
