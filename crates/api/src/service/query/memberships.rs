use sqlx::{sqlite::SqliteRow, Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::{
  entities::membership::Membership,
  error::ApiResult,
  service::{ledger, policy::ProjectAction, query::users::read_prefixed_user},
};

const LIST_PROJECT_MEMBERS_QUERY: &str = r#"
  SELECT
    m.id as membership_id,
    m.project_id as membership_project_id,
    m.role as membership_role,
    u.id as user_id,
    u.email as user_email,
    u.password as user_password,
    u.first_name as user_first_name,
    u.last_name as user_last_name,
    u.created_at as user_created_at
  FROM project_memberships AS m
  INNER JOIN users AS u ON m.user_id = u.id
  WHERE m.project_id = ?1
  ORDER BY m.role ASC, m.id ASC
"#;

const FIND_MEMBERSHIP_QUERY: &str = r#"
  SELECT
    m.id as membership_id,
    m.project_id as membership_project_id,
    m.role as membership_role,
    u.id as user_id,
    u.email as user_email,
    u.password as user_password,
    u.first_name as user_first_name,
    u.last_name as user_last_name,
    u.created_at as user_created_at
  FROM project_memberships AS m
  INNER JOIN users AS u ON m.user_id = u.id
  WHERE m.id = ?1
"#;

/// Lists the members of a project ordered by role (leaders first), then membership id
///
/// # Errors
/// - ResourceNotFound if project doesn't exist
/// - Forbidden if the caller cannot access the project
pub async fn list_by_project(pool: &SqlitePool, project_id: Uuid, user_id: Uuid) -> ApiResult<Vec<Membership>> {
  let mut conn = pool.acquire().await?;

  ledger::authorize(&mut conn, project_id, user_id, ProjectAction::ListMembers).await?;

  sqlx::query(LIST_PROJECT_MEMBERS_QUERY)
    .bind(project_id)
    .try_map(|row: SqliteRow| map_membership(&row))
    .fetch_all(&mut *conn)
    .await
    .map_err(Into::into)
}

pub(crate) async fn find(conn: &mut SqliteConnection, id: Uuid) -> ApiResult<Option<Membership>> {
  sqlx::query(FIND_MEMBERSHIP_QUERY)
    .bind(id)
    .try_map(|row: SqliteRow| map_membership(&row))
    .fetch_optional(&mut *conn)
    .await
    .map_err(Into::into)
}

fn map_membership(row: &SqliteRow) -> Result<Membership, sqlx::Error> {
  Ok(Membership {
    id: row.try_get("membership_id")?,
    project_id: row.try_get("membership_project_id")?,
    role: row.try_get("membership_role")?,
    user: read_prefixed_user(row, "user")?,
  })
}
