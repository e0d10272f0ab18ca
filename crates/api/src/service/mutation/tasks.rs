use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
  entities::task::{Task, TaskRow, TaskStatus},
  error::{ApiError, ApiResult},
  service::{
    cascade, ledger,
    policy::{self, ProjectAction},
    query,
  },
};

// SQL Query Constants
const INSERT_TASK: &str = r#"
  INSERT INTO tasks (id, name, description, deadline, status, project_id, parent_task_id, assigned_to_id, created_at)
  VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
  RETURNING *
"#;

const UPDATE_TASK: &str = r#"
  UPDATE tasks
  SET name = COALESCE(?1, name),
    description = COALESCE(?2, description),
    deadline = COALESCE(?3, deadline),
    parent_task_id = COALESCE(?4, parent_task_id),
    assigned_to_id = CASE WHEN ?5 THEN ?6 ELSE assigned_to_id END
  WHERE id = ?7
  RETURNING *
"#;

const UPDATE_TASK_STATUS: &str = "UPDATE tasks SET status = ?1 WHERE id = ?2 RETURNING *";

#[derive(Debug, Deserialize, Default)]
pub struct CreateTaskParams {
  pub name: String,
  pub description: Option<String>,
  pub deadline: Option<DateTime<Utc>>,
  pub project_id: Option<Uuid>,
  pub parent_task_id: Option<Uuid>,
  pub assigned_to_id: Option<Uuid>,
}

/// Creates a task in a project the caller can access
///
/// The task is assigned to the caller unless `assigned_to_id` names someone else.
///
/// # Errors
/// - InvalidInput if no project is given
/// - ResourceNotFound if the project or the parent task doesn't exist
/// - Forbidden if the caller cannot access the project or the parent task
/// - Conflict if the assignee is neither owner nor member of the project,
///   or the parent task belongs to another project
pub async fn create(pool: &SqlitePool, user_id: Uuid, params: CreateTaskParams) -> ApiResult<Task> {
  let project_id = params
    .project_id
    .ok_or_else(|| ApiError::InvalidInput("project_id is required".to_string()))?;

  let mut tx = pool.begin().await?;

  ledger::authorize(&mut tx, project_id, user_id, ProjectAction::CreateTask).await?;

  let assignee = params.assigned_to_id.unwrap_or(user_id);
  ledger::ensure_eligible_assignee(&mut tx, project_id, assignee).await?;

  if let Some(parent_id) = params.parent_task_id {
    let parent = load_task_row(&mut tx, parent_id).await?;
    ledger::authorize_task(&mut tx, &parent, user_id).await?;
    ensure_same_project(&parent, Some(project_id))?;
  }

  let task = create_task_row(&mut tx, project_id, assignee, &params).await?;
  let task = load_task(&mut tx, task.id).await?;

  tx.commit().await?;

  info!("Task {} created in project {} by {}", task.id, project_id, user_id);

  Ok(task)
}

/// Partial task update: only supplied fields are applied.
///
/// `assigned_to_id` distinguishes "not supplied" (`None`) from "unassign" (`Some(None)`).
#[derive(Debug, Deserialize, Default)]
pub struct UpdateTaskParams {
  pub name: Option<String>,
  pub description: Option<String>,
  pub deadline: Option<DateTime<Utc>>,
  pub parent_task_id: Option<Uuid>,
  pub assigned_to_id: Option<Option<Uuid>>,
}

/// Updates an existing task by ID
///
/// # Errors
/// - ResourceNotFound if task (or the new parent) doesn't exist
/// - Forbidden if the caller cannot access the task or the new parent, or reassigns without owner/leader standing
/// - Conflict if the new assignee is not a member/owner, or the new parent lives in another project
///   or would create a cycle
pub async fn update(pool: &SqlitePool, id: Uuid, user_id: Uuid, params: UpdateTaskParams) -> ApiResult<Task> {
  let mut tx = pool.begin().await?;

  let task = load_task_row(&mut tx, id).await?;
  let standing = ledger::authorize_task(&mut tx, &task, user_id).await?;

  let reassignment = params
    .assigned_to_id
    .filter(|assignee| *assignee != task.assigned_to_id);
  if let Some(assignee) = reassignment {
    if !policy::can_reassign_task(standing) {
      return Err(ApiError::Forbidden(
        "only project owner or leader can reassign task".to_string(),
      ));
    }

    if let (Some(assignee), Some(project_id)) = (assignee, task.project_id) {
      ledger::ensure_eligible_assignee(&mut tx, project_id, assignee).await?;
    }
  }

  if let Some(parent_id) = params.parent_task_id {
    ensure_valid_parent(&mut tx, &task, parent_id, user_id).await?;
  }

  update_task_row(&mut tx, id, &params, reassignment).await?;
  let task = load_task(&mut tx, id).await?;

  tx.commit().await?;

  Ok(task)
}

/// Changes the status of a task
///
/// # Errors
/// - ResourceNotFound if task doesn't exist
/// - Forbidden unless the caller is the assignee or owner/leader of the task's project
pub async fn change_status(pool: &SqlitePool, id: Uuid, user_id: Uuid, status: TaskStatus) -> ApiResult<Task> {
  let mut tx = pool.begin().await?;

  let task = load_task_row(&mut tx, id).await?;
  let standing = ledger::task_standing(&mut tx, &task, user_id).await?;

  if !policy::can_change_task_status(standing, task.assigned_to_id, user_id) {
    return Err(ApiError::Forbidden(
      "only task assignee or project owner/leader can change status".to_string(),
    ));
  }

  sqlx::query_as::<_, TaskRow>(UPDATE_TASK_STATUS)
    .bind(status)
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;
  let task = load_task(&mut tx, id).await?;

  tx.commit().await?;

  debug!("Task {} moved to {} by {}", id, status, user_id);

  Ok(task)
}

/// Deletes a task together with all its subtasks and their comments
///
/// # Errors
/// - ResourceNotFound if task doesn't exist
/// - Forbidden if the caller cannot access the task's project
pub async fn delete(pool: &SqlitePool, id: Uuid, user_id: Uuid) -> ApiResult<()> {
  let mut tx = pool.begin().await?;

  let task = load_task_row(&mut tx, id).await?;
  ledger::authorize_task(&mut tx, &task, user_id).await?;
  let removed = cascade::purge_task_tree(&mut tx, id).await?;

  tx.commit().await?;

  info!("Task {} deleted by {} ({} tasks removed)", id, user_id, removed);

  Ok(())
}

async fn ensure_valid_parent(
  conn: &mut SqliteConnection,
  task: &TaskRow,
  parent_id: Uuid,
  user_id: Uuid,
) -> ApiResult<()> {
  let parent = load_task_row(conn, parent_id).await?;
  ledger::authorize_task(conn, &parent, user_id).await?;
  ensure_same_project(&parent, task.project_id)?;

  let subtree = cascade::collect_subtree(conn, &[task.id]).await?;
  if subtree.contains(&parent_id) {
    return Err(ApiError::Conflict(
      "task cannot become a subtask of itself or of its descendants".to_string(),
    ));
  }

  Ok(())
}

fn ensure_same_project(parent: &TaskRow, project_id: Option<Uuid>) -> ApiResult<()> {
  if parent.project_id != project_id {
    return Err(ApiError::Conflict(
      "parent task belongs to another project".to_string(),
    ));
  }

  Ok(())
}

async fn load_task_row(conn: &mut SqliteConnection, id: Uuid) -> ApiResult<TaskRow> {
  query::tasks::find_row(conn, id)
    .await?
    .ok_or_else(|| ApiError::ResourceNotFound(id.to_string()))
}

async fn load_task(conn: &mut SqliteConnection, id: Uuid) -> ApiResult<Task> {
  query::tasks::find(conn, id)
    .await?
    .ok_or_else(|| ApiError::ResourceNotFound(id.to_string()))
}

async fn create_task_row(
  conn: &mut SqliteConnection,
  project_id: Uuid,
  assignee: Uuid,
  params: &CreateTaskParams,
) -> ApiResult<TaskRow> {
  sqlx::query_as::<_, TaskRow>(INSERT_TASK)
    .bind(Uuid::new_v4())
    .bind(&params.name)
    .bind(&params.description)
    .bind(params.deadline)
    .bind(TaskStatus::New)
    .bind(project_id)
    .bind(params.parent_task_id)
    .bind(assignee)
    .bind(Utc::now())
    .fetch_one(&mut *conn)
    .await
    .map_err(Into::into)
}

async fn update_task_row(
  conn: &mut SqliteConnection,
  id: Uuid,
  params: &UpdateTaskParams,
  reassignment: Option<Option<Uuid>>,
) -> ApiResult<TaskRow> {
  sqlx::query_as::<_, TaskRow>(UPDATE_TASK)
    .bind(&params.name)
    .bind(&params.description)
    .bind(params.deadline)
    .bind(params.parent_task_id)
    .bind(reassignment.is_some())
    .bind(reassignment.flatten())
    .bind(id)
    .fetch_one(&mut *conn)
    .await
    .map_err(Into::into)
}
