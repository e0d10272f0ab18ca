use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;
use uuid::Uuid;

use crate::{
  entities::membership::{Membership, MembershipRole, MembershipRow},
  error::{ApiError, ApiResult},
  service::{
    ledger,
    policy::{self, ProjectAction},
    query,
  },
};

const FIND_MEMBERSHIP: &str = "SELECT * FROM project_memberships WHERE id = ?1";
const INSERT_MEMBERSHIP: &str = r#"
  INSERT INTO project_memberships (id, user_id, project_id, role)
  VALUES (?1, ?2, ?3, ?4)
  RETURNING *
"#;
const DELETE_MEMBERSHIP: &str = "DELETE FROM project_memberships WHERE id = ?1";
const UPDATE_MEMBERSHIP_ROLE: &str = "UPDATE project_memberships SET role = ?1 WHERE id = ?2 RETURNING *";

/// Records a membership. Callers must make sure `user_id` is not the project owner.
///
/// # Errors
/// - Conflict if the user already holds a membership in the project
pub async fn add_member(
  conn: &mut SqliteConnection,
  project_id: Uuid,
  user_id: Uuid,
  role: MembershipRole,
) -> ApiResult<MembershipRow> {
  sqlx::query_as::<_, MembershipRow>(INSERT_MEMBERSHIP)
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(project_id)
    .bind(role)
    .fetch_one(&mut *conn)
    .await
    .map_err(|err| match ApiError::from(err) {
      ApiError::Conflict(_) => ApiError::Conflict("user is already a member of the project".to_string()),
      other => other,
    })
}

/// Removes a member from a project
///
/// # Errors
/// - ResourceNotFound if the membership doesn't exist
/// - Forbidden if the caller is neither owner nor leader of the project
/// - Conflict if the membership belongs to the project owner
pub async fn kick(pool: &SqlitePool, membership_id: Uuid, user_id: Uuid) -> ApiResult<()> {
  let mut tx = pool.begin().await?;

  let membership = guard_membership_change(&mut tx, membership_id, user_id, ProjectAction::Kick).await?;
  sqlx::query(DELETE_MEMBERSHIP)
    .bind(membership_id)
    .execute(&mut *tx)
    .await?;

  tx.commit().await?;

  info!(
    "User {} removed from project {} by {}",
    membership.user_id, membership.project_id, user_id
  );

  Ok(())
}

/// Changes the role of a member
///
/// # Errors
/// - ResourceNotFound if the membership doesn't exist
/// - Forbidden if the caller is neither owner nor leader of the project
/// - Conflict if the membership belongs to the project owner
pub async fn set_role(pool: &SqlitePool, membership_id: Uuid, user_id: Uuid, role: MembershipRole) -> ApiResult<Membership> {
  let mut tx = pool.begin().await?;

  guard_membership_change(&mut tx, membership_id, user_id, ProjectAction::ChangeRole).await?;
  sqlx::query_as::<_, MembershipRow>(UPDATE_MEMBERSHIP_ROLE)
    .bind(role)
    .bind(membership_id)
    .fetch_one(&mut *tx)
    .await?;
  let membership = query::memberships::find(&mut tx, membership_id)
    .await?
    .ok_or_else(|| ApiError::ResourceNotFound(membership_id.to_string()))?;

  tx.commit().await?;

  info!("Membership {} role set to {} by {}", membership_id, role, user_id);

  Ok(membership)
}

async fn guard_membership_change(
  conn: &mut SqliteConnection,
  membership_id: Uuid,
  user_id: Uuid,
  action: ProjectAction,
) -> ApiResult<MembershipRow> {
  let membership = sqlx::query_as::<_, MembershipRow>(FIND_MEMBERSHIP)
    .bind(membership_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| ApiError::ResourceNotFound(membership_id.to_string()))?;

  ledger::authorize(conn, membership.project_id, user_id, action).await?;

  let owner_id = ledger::owner_of(conn, membership.project_id)
    .await?
    .ok_or_else(|| ApiError::ResourceNotFound(membership.project_id.to_string()))?;
  if !policy::can_alter_membership(owner_id, membership.user_id) {
    return Err(ApiError::Conflict("project owner membership cannot be changed".to_string()));
  }

  Ok(membership)
}
