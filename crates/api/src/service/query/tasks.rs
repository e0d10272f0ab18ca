use sqlx::{sqlite::SqliteRow, Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::{
  entities::task::{Task, TaskRow},
  error::{ApiError, ApiResult},
  service::{ledger, policy::ProjectAction, query::users::read_prefixed_user},
};

const FIND_TASK_ROW_QUERY: &str = "SELECT * FROM tasks WHERE id = ?1";

const FIND_TASK_QUERY: &str = r#"
  SELECT
    t.id as task_id,
    t.name as task_name,
    t.description as task_description,
    t.deadline as task_deadline,
    t.status as task_status,
    t.project_id as task_project_id,
    t.parent_task_id as task_parent_task_id,
    t.assigned_to_id as task_assigned_to_id,
    t.created_at as task_created_at,
    a.id as assignee_id,
    a.email as assignee_email,
    a.password as assignee_password,
    a.first_name as assignee_first_name,
    a.last_name as assignee_last_name,
    a.created_at as assignee_created_at
  FROM tasks AS t
  LEFT OUTER JOIN users AS a ON t.assigned_to_id = a.id
  WHERE t.id = ?1
"#;

const LIST_PROJECT_TASKS_QUERY: &str = r#"
  SELECT
    t.id as task_id,
    t.name as task_name,
    t.description as task_description,
    t.deadline as task_deadline,
    t.status as task_status,
    t.project_id as task_project_id,
    t.parent_task_id as task_parent_task_id,
    t.assigned_to_id as task_assigned_to_id,
    t.created_at as task_created_at,
    a.id as assignee_id,
    a.email as assignee_email,
    a.password as assignee_password,
    a.first_name as assignee_first_name,
    a.last_name as assignee_last_name,
    a.created_at as assignee_created_at
  FROM tasks AS t
  LEFT OUTER JOIN users AS a ON t.assigned_to_id = a.id
  WHERE t.project_id = ?1
  ORDER BY t.created_at DESC, t.rowid DESC
"#;

/// Fetches a task the user can see
///
/// # Errors
/// - ResourceNotFound if task doesn't exist
/// - Forbidden if the task belongs to a project the user cannot access
pub async fn get(pool: &SqlitePool, id: Uuid, user_id: Uuid) -> ApiResult<Task> {
  let mut conn = pool.acquire().await?;

  let row = find_row(&mut conn, id)
    .await?
    .ok_or_else(|| ApiError::ResourceNotFound(id.to_string()))?;
  ledger::authorize_task(&mut conn, &row, user_id).await?;

  find(&mut conn, id)
    .await?
    .ok_or_else(|| ApiError::ResourceNotFound(id.to_string()))
}

/// Lists the tasks of a project, newest first
///
/// # Errors
/// - ResourceNotFound if project doesn't exist
/// - Forbidden if the user cannot access the project
pub async fn list_by_project(pool: &SqlitePool, project_id: Uuid, user_id: Uuid) -> ApiResult<Vec<Task>> {
  let mut conn = pool.acquire().await?;

  ledger::authorize(&mut conn, project_id, user_id, ProjectAction::ListTasks).await?;

  sqlx::query(LIST_PROJECT_TASKS_QUERY)
    .bind(project_id)
    .try_map(|row: SqliteRow| map_task(&row))
    .fetch_all(&mut *conn)
    .await
    .map_err(Into::into)
}

pub(crate) async fn find_row(conn: &mut SqliteConnection, id: Uuid) -> ApiResult<Option<TaskRow>> {
  sqlx::query_as::<_, TaskRow>(FIND_TASK_ROW_QUERY)
    .bind(id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(Into::into)
}

pub(crate) async fn find(conn: &mut SqliteConnection, id: Uuid) -> ApiResult<Option<Task>> {
  sqlx::query(FIND_TASK_QUERY)
    .bind(id)
    .try_map(|row: SqliteRow| map_task(&row))
    .fetch_optional(&mut *conn)
    .await
    .map_err(Into::into)
}

fn map_task(row: &SqliteRow) -> Result<Task, sqlx::Error> {
  let assignee_id: Option<Uuid> = row.try_get("assignee_id")?;
  let assigned_to = match assignee_id {
    Some(_) => Some(read_prefixed_user(row, "assignee")?),
    None => None,
  };

  Ok(Task {
    id: row.try_get("task_id")?,
    name: row.try_get("task_name")?,
    description: row.try_get("task_description")?,
    deadline: row.try_get("task_deadline")?,
    status: row.try_get("task_status")?,
    project_id: row.try_get("task_project_id")?,
    parent_task_id: row.try_get("task_parent_task_id")?,
    assigned_to_id: row.try_get("task_assigned_to_id")?,
    assigned_to,
    created_at: row.try_get("task_created_at")?,
  })
}
