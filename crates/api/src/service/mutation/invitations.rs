use chrono::Utc;
use serde::Deserialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;
use uuid::Uuid;

use crate::{
  entities::{
    invitation::{Invitation, InvitationRow, InvitationStatus},
    membership::{Membership, MembershipRole},
    user::User,
  },
  error::{ApiError, ApiResult},
  service::{
    ledger,
    mutation::memberships::add_member,
    policy::{ProjectAction, Standing},
    query::{self, users::normalize_email},
  },
};

const FIND_USER_BY_EMAIL: &str = "SELECT * FROM users WHERE email = ?1";
const FIND_INVITATION: &str = "SELECT * FROM project_invitations WHERE id = ?1";
const FIND_PENDING_INVITATION: &str = r#"
  SELECT * FROM project_invitations
  WHERE project_id = ?1 AND invitee_id = ?2 AND status = 'pending'
"#;
const INSERT_INVITATION: &str = r#"
  INSERT INTO project_invitations (id, project_id, inviter_id, invitee_id, role, status, created_at)
  VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
  RETURNING *
"#;
const UPDATE_INVITATION_STATUS: &str = "UPDATE project_invitations SET status = ?1 WHERE id = ?2 RETURNING *";

#[derive(Debug, Deserialize)]
pub struct CreateInvitationParams {
  pub project_id: Uuid,
  pub invitee_email: String,
  #[serde(default)]
  pub role: MembershipRole,
}

/// Invites a registered user into a project
///
/// # Errors
/// - ResourceNotFound if the project or the invitee email doesn't exist
/// - Forbidden if the inviter is neither owner nor leader
/// - Conflict if the invitee is the inviter, the owner, already a member, or already invited
pub async fn create(pool: &SqlitePool, inviter_id: Uuid, params: CreateInvitationParams) -> ApiResult<Invitation> {
  let mut tx = pool.begin().await?;

  ledger::authorize(&mut tx, params.project_id, inviter_id, ProjectAction::Invite).await?;

  let invitee = sqlx::query_as::<_, User>(FIND_USER_BY_EMAIL)
    .bind(normalize_email(&params.invitee_email))
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| ApiError::ResourceNotFound(format!("user {}", params.invitee_email)))?;

  if invitee.id == inviter_id {
    return Err(ApiError::Conflict("cannot invite yourself".to_string()));
  }

  let standing = ledger::standing(&mut tx, params.project_id, invitee.id).await?;
  if standing.is_some_and(Standing::can_access) {
    return Err(ApiError::Conflict(
      "user is already the owner or a member of the project".to_string(),
    ));
  }

  let pending = sqlx::query_as::<_, InvitationRow>(FIND_PENDING_INVITATION)
    .bind(params.project_id)
    .bind(invitee.id)
    .fetch_optional(&mut *tx)
    .await?;
  if pending.is_some() {
    return Err(ApiError::Conflict(
      "user already has a pending invitation to the project".to_string(),
    ));
  }

  let invitation = sqlx::query_as::<_, InvitationRow>(INSERT_INVITATION)
    .bind(Uuid::new_v4())
    .bind(params.project_id)
    .bind(inviter_id)
    .bind(invitee.id)
    .bind(params.role)
    .bind(InvitationStatus::Pending)
    .bind(Utc::now())
    .fetch_one(&mut *tx)
    .await
    .map_err(|err| match ApiError::from(err) {
      ApiError::Conflict(_) => ApiError::Conflict("user already has a pending invitation to the project".to_string()),
      other => other,
    })?;
  let invitation = load_invitation(&mut tx, invitation.id).await?;

  tx.commit().await?;

  info!(
    "User {} invited to project {} as {} by {}",
    invitee.id, params.project_id, params.role, inviter_id
  );

  Ok(invitation)
}

/// Accepts a pending invitation and records the membership in one transaction
///
/// # Errors
/// - ResourceNotFound if the invitation doesn't exist or is no longer pending
/// - Forbidden if the caller is not the invitee
/// - Conflict if the invitee already holds a membership; the invitation stays pending
pub async fn accept(pool: &SqlitePool, id: Uuid, user_id: Uuid) -> ApiResult<Membership> {
  let mut tx = pool.begin().await?;

  let invitation = pending_for(&mut tx, id, user_id).await?;
  let membership = add_member(&mut tx, invitation.project_id, invitation.invitee_id, invitation.role).await?;
  set_status(&mut tx, id, InvitationStatus::Accepted).await?;
  let membership = query::memberships::find(&mut tx, membership.id)
    .await?
    .ok_or_else(|| ApiError::ResourceNotFound(membership.id.to_string()))?;

  tx.commit().await?;

  info!(
    "User {} joined project {} as {}",
    user_id, invitation.project_id, invitation.role
  );

  Ok(membership)
}

/// Declines a pending invitation
///
/// # Errors
/// - ResourceNotFound if the invitation doesn't exist or is no longer pending
/// - Forbidden if the caller is not the invitee
pub async fn decline(pool: &SqlitePool, id: Uuid, user_id: Uuid) -> ApiResult<Invitation> {
  let mut tx = pool.begin().await?;

  pending_for(&mut tx, id, user_id).await?;
  set_status(&mut tx, id, InvitationStatus::Declined).await?;
  let invitation = load_invitation(&mut tx, id).await?;

  tx.commit().await?;

  info!("Invitation {} declined by {}", id, user_id);

  Ok(invitation)
}

async fn pending_for(conn: &mut SqliteConnection, id: Uuid, user_id: Uuid) -> ApiResult<InvitationRow> {
  let invitation = sqlx::query_as::<_, InvitationRow>(FIND_INVITATION)
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .filter(|invitation| !invitation.status.is_terminal())
    .ok_or_else(|| ApiError::ResourceNotFound(format!("pending invitation {id}")))?;

  if invitation.invitee_id != user_id {
    return Err(ApiError::Forbidden("invitation is addressed to another user".to_string()));
  }

  Ok(invitation)
}

async fn set_status(conn: &mut SqliteConnection, id: Uuid, status: InvitationStatus) -> ApiResult<InvitationRow> {
  sqlx::query_as::<_, InvitationRow>(UPDATE_INVITATION_STATUS)
    .bind(status)
    .bind(id)
    .fetch_one(&mut *conn)
    .await
    .map_err(Into::into)
}

async fn load_invitation(conn: &mut SqliteConnection, id: Uuid) -> ApiResult<Invitation> {
  query::invitations::find(conn, id)
    .await?
    .ok_or_else(|| ApiError::ResourceNotFound(id.to_string()))
}
