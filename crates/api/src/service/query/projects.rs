use sqlx::{sqlite::SqliteRow, Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::{
  entities::project::Project,
  error::{ApiError, ApiResult},
  service::{
    ledger,
    policy::ProjectAction,
    query::users::read_prefixed_user,
  },
};

const FIND_PROJECT_QUERY: &str = r#"
  SELECT
    p.id as project_id,
    p.name as project_name,
    p.final_deadline as project_final_deadline,
    p.owner_id as project_owner_id,
    p.created_at as project_created_at,
    u.id as owner_id,
    u.email as owner_email,
    u.password as owner_password,
    u.first_name as owner_first_name,
    u.last_name as owner_last_name,
    u.created_at as owner_created_at
  FROM projects AS p
  INNER JOIN users AS u ON p.owner_id = u.id
  WHERE p.id = ?1
"#;

const LIST_ACCESSIBLE_PROJECTS_QUERY: &str = r#"
  SELECT
    p.id as project_id,
    p.name as project_name,
    p.final_deadline as project_final_deadline,
    p.owner_id as project_owner_id,
    p.created_at as project_created_at,
    u.id as owner_id,
    u.email as owner_email,
    u.password as owner_password,
    u.first_name as owner_first_name,
    u.last_name as owner_last_name,
    u.created_at as owner_created_at
  FROM projects AS p
  INNER JOIN users AS u ON p.owner_id = u.id
  WHERE p.owner_id = ?1
    OR EXISTS (SELECT 1 FROM project_memberships AS m WHERE m.project_id = p.id AND m.user_id = ?1)
  ORDER BY p.created_at DESC, p.rowid DESC
"#;

/// Fetches a project the user can access
///
/// # Errors
/// - ResourceNotFound if project doesn't exist
/// - Forbidden if the user is neither owner nor member
pub async fn get(pool: &SqlitePool, id: Uuid, user_id: Uuid) -> ApiResult<Project> {
  let mut conn = pool.acquire().await?;

  ledger::authorize(&mut conn, id, user_id, ProjectAction::View).await?;

  find(&mut conn, id)
    .await?
    .ok_or_else(|| ApiError::ResourceNotFound(id.to_string()))
}

/// Lists every project the user owns or is a member of, newest first
pub async fn list_accessible(pool: &SqlitePool, user_id: Uuid) -> ApiResult<Vec<Project>> {
  sqlx::query(LIST_ACCESSIBLE_PROJECTS_QUERY)
    .bind(user_id)
    .try_map(|row: SqliteRow| map_row_to_project(&row))
    .fetch_all(pool)
    .await
    .map_err(Into::into)
}

pub(crate) async fn find(conn: &mut SqliteConnection, id: Uuid) -> ApiResult<Option<Project>> {
  sqlx::query(FIND_PROJECT_QUERY)
    .bind(id)
    .try_map(|row: SqliteRow| map_row_to_project(&row))
    .fetch_optional(&mut *conn)
    .await
    .map_err(Into::into)
}

fn map_row_to_project(row: &SqliteRow) -> Result<Project, sqlx::Error> {
  Ok(Project {
    id: row.try_get("project_id")?,
    name: row.try_get("project_name")?,
    final_deadline: row.try_get("project_final_deadline")?,
    owner_id: row.try_get("project_owner_id")?,
    owner: read_prefixed_user(row, "owner")?,
    created_at: row.try_get("project_created_at")?,
  })
}
