//! Membership ledger: ownership and membership-role facts, and the guards built on them.

use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::{
  entities::{membership::MembershipRole, task::TaskRow},
  error::{ApiError, ApiResult},
  service::policy::{self, ProjectAction, Standing},
};

const FIND_PROJECT_OWNER: &str = "SELECT owner_id FROM projects WHERE id = ?1";
const FIND_MEMBERSHIP_ROLE: &str = "SELECT role FROM project_memberships WHERE project_id = ?1 AND user_id = ?2";

/// Returns the owner of a project, or `None` when the project does not exist.
pub async fn owner_of(conn: &mut SqliteConnection, project_id: Uuid) -> ApiResult<Option<Uuid>> {
  let owner: Option<(Uuid,)> = sqlx::query_as(FIND_PROJECT_OWNER)
    .bind(project_id)
    .fetch_optional(&mut *conn)
    .await?;

  Ok(owner.map(|(owner_id,)| owner_id))
}

pub async fn role_of(conn: &mut SqliteConnection, project_id: Uuid, user_id: Uuid) -> ApiResult<Option<MembershipRole>> {
  let role: Option<(MembershipRole,)> = sqlx::query_as(FIND_MEMBERSHIP_ROLE)
    .bind(project_id)
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;

  Ok(role.map(|(role,)| role))
}

/// Loads the user's standing in a project, `None` when the project does not exist.
pub async fn standing(conn: &mut SqliteConnection, project_id: Uuid, user_id: Uuid) -> ApiResult<Option<Standing>> {
  let Some(owner_id) = owner_of(conn, project_id).await? else {
    return Ok(None);
  };
  let role = role_of(conn, project_id, user_id).await?;

  Ok(Some(Standing::resolve(owner_id, user_id, role)))
}

pub async fn is_owner(conn: &mut SqliteConnection, project_id: Uuid, user_id: Uuid) -> ApiResult<bool> {
  Ok(owner_of(conn, project_id).await? == Some(user_id))
}

pub async fn is_member(conn: &mut SqliteConnection, project_id: Uuid, user_id: Uuid) -> ApiResult<bool> {
  Ok(role_of(conn, project_id, user_id).await?.is_some())
}

pub async fn is_owner_or_leader(conn: &mut SqliteConnection, project_id: Uuid, user_id: Uuid) -> ApiResult<bool> {
  Ok(
    standing(conn, project_id, user_id)
      .await?
      .is_some_and(Standing::is_owner_or_leader),
  )
}

pub async fn can_access(conn: &mut SqliteConnection, project_id: Uuid, user_id: Uuid) -> ApiResult<bool> {
  Ok(standing(conn, project_id, user_id).await?.is_some_and(Standing::can_access))
}

/// Checks `action` for the user and returns their standing.
///
/// # Errors
/// - ResourceNotFound if the project doesn't exist
/// - Forbidden if the project exists but the action is not permitted
pub async fn authorize(
  conn: &mut SqliteConnection,
  project_id: Uuid,
  user_id: Uuid,
  action: ProjectAction,
) -> ApiResult<Standing> {
  let standing = standing(conn, project_id, user_id)
    .await?
    .ok_or_else(|| ApiError::ResourceNotFound(format!("project {project_id}")))?;

  if !policy::permits(standing, action) {
    return Err(ApiError::Forbidden(action.denial().to_string()));
  }

  Ok(standing)
}

/// Standing of the user in the task's project; `None` for a detached task.
pub async fn task_standing(conn: &mut SqliteConnection, task: &TaskRow, user_id: Uuid) -> ApiResult<Option<Standing>> {
  let Some(project_id) = task.project_id else {
    return Ok(None);
  };

  standing(conn, project_id, user_id)
    .await?
    .map(Some)
    .ok_or_else(|| ApiError::ResourceNotFound(format!("project {project_id}")))
}

/// Guards view/edit/delete/comment access to a task.
pub async fn authorize_task(conn: &mut SqliteConnection, task: &TaskRow, user_id: Uuid) -> ApiResult<Option<Standing>> {
  let standing = task_standing(conn, task, user_id).await?;

  if !policy::can_touch_task(standing) {
    return Err(ApiError::Forbidden("task is not accessible".to_string()));
  }

  Ok(standing)
}

/// Fails with Conflict unless the user is the project owner or a member.
pub async fn ensure_eligible_assignee(conn: &mut SqliteConnection, project_id: Uuid, assignee_id: Uuid) -> ApiResult<()> {
  let standing = standing(conn, project_id, assignee_id)
    .await?
    .ok_or_else(|| ApiError::ResourceNotFound(format!("project {project_id}")))?;

  if !policy::is_eligible_assignee(standing) {
    return Err(ApiError::Conflict(
      "assignee must be a project member or owner".to_string(),
    ));
  }

  Ok(())
}
