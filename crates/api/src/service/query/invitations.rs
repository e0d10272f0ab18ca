use sqlx::{sqlite::SqliteRow, Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::{
  entities::{invitation::Invitation, project::ProjectRow},
  error::ApiResult,
  service::{ledger, policy::ProjectAction, query::users::read_prefixed_user},
};

const INVITATION_COLUMNS_QUERY: &str = r#"
  SELECT
    i.id as invitation_id,
    i.project_id as invitation_project_id,
    i.inviter_id as invitation_inviter_id,
    i.invitee_id as invitation_invitee_id,
    i.role as invitation_role,
    i.status as invitation_status,
    i.created_at as invitation_created_at,
    p.id as project_id,
    p.name as project_name,
    p.final_deadline as project_final_deadline,
    p.owner_id as project_owner_id,
    p.created_at as project_created_at,
    inviter.id as inviter_id,
    inviter.email as inviter_email,
    inviter.password as inviter_password,
    inviter.first_name as inviter_first_name,
    inviter.last_name as inviter_last_name,
    inviter.created_at as inviter_created_at,
    invitee.id as invitee_id,
    invitee.email as invitee_email,
    invitee.password as invitee_password,
    invitee.first_name as invitee_first_name,
    invitee.last_name as invitee_last_name,
    invitee.created_at as invitee_created_at
  FROM project_invitations AS i
  INNER JOIN projects AS p ON i.project_id = p.id
  INNER JOIN users AS inviter ON i.inviter_id = inviter.id
  INNER JOIN users AS invitee ON i.invitee_id = invitee.id
"#;

/// Pending invitations addressed to the user, newest first
pub async fn list_by_invitee(pool: &SqlitePool, user_id: Uuid) -> ApiResult<Vec<Invitation>> {
  let sql = format!(
    "{INVITATION_COLUMNS_QUERY} WHERE i.invitee_id = ?1 AND i.status = 'pending' \
     ORDER BY i.created_at DESC, i.rowid DESC"
  );

  let invitations = sqlx::query(&sql)
    .bind(user_id)
    .try_map(|row: SqliteRow| map_invitation(&row))
    .fetch_all(pool)
    .await?;

  Ok(invitations)
}

/// All invitations of a project in any status, newest first
///
/// # Errors
/// - ResourceNotFound if project doesn't exist
/// - Forbidden if the caller is neither owner nor leader
pub async fn list_by_project(pool: &SqlitePool, project_id: Uuid, user_id: Uuid) -> ApiResult<Vec<Invitation>> {
  let mut conn = pool.acquire().await?;

  ledger::authorize(&mut conn, project_id, user_id, ProjectAction::ViewInvitations).await?;

  let sql = format!("{INVITATION_COLUMNS_QUERY} WHERE i.project_id = ?1 ORDER BY i.created_at DESC, i.rowid DESC");
  let invitations = sqlx::query(&sql)
    .bind(project_id)
    .try_map(|row: SqliteRow| map_invitation(&row))
    .fetch_all(&mut *conn)
    .await?;

  Ok(invitations)
}

pub(crate) async fn find(conn: &mut SqliteConnection, id: Uuid) -> ApiResult<Option<Invitation>> {
  let sql = format!("{INVITATION_COLUMNS_QUERY} WHERE i.id = ?1");
  let invitation = sqlx::query(&sql)
    .bind(id)
    .try_map(|row: SqliteRow| map_invitation(&row))
    .fetch_optional(&mut *conn)
    .await?;

  Ok(invitation)
}

fn map_invitation(row: &SqliteRow) -> Result<Invitation, sqlx::Error> {
  let project = ProjectRow {
    id: row.try_get("project_id")?,
    name: row.try_get("project_name")?,
    final_deadline: row.try_get("project_final_deadline")?,
    owner_id: row.try_get("project_owner_id")?,
    created_at: row.try_get("project_created_at")?,
  };

  Ok(Invitation {
    id: row.try_get("invitation_id")?,
    project_id: row.try_get("invitation_project_id")?,
    inviter_id: row.try_get("invitation_inviter_id")?,
    invitee_id: row.try_get("invitation_invitee_id")?,
    role: row.try_get("invitation_role")?,
    status: row.try_get("invitation_status")?,
    created_at: row.try_get("invitation_created_at")?,
    project,
    inviter: read_prefixed_user(row, "inviter")?,
    invitee: read_prefixed_user(row, "invitee")?,
  })
}
