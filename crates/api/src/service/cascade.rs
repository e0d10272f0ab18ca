//! Explicit cascade deletion.
//!
//! Tasks form a tree through `parent_task_id`. Subtrees are collected iteratively
//! and deleted children-first, inside the caller's transaction.

use std::collections::{HashSet, VecDeque};

use sqlx::SqliteConnection;
use tracing::debug;
use uuid::Uuid;

use crate::error::ApiResult;

const FIND_CHILD_TASKS: &str = "SELECT id FROM tasks WHERE parent_task_id = ?1";
const FIND_PROJECT_TASKS: &str = "SELECT id FROM tasks WHERE project_id = ?1";
const DELETE_TASK_COMMENTS: &str = "DELETE FROM comments WHERE task_id = ?1";
const DELETE_TASK: &str = "DELETE FROM tasks WHERE id = ?1";
const DELETE_PROJECT_INVITATIONS: &str = "DELETE FROM project_invitations WHERE project_id = ?1";
const DELETE_PROJECT_MEMBERSHIPS: &str = "DELETE FROM project_memberships WHERE project_id = ?1";
const DELETE_PROJECT: &str = "DELETE FROM projects WHERE id = ?1";

/// Returns `roots` and all their descendants, parents before children.
pub async fn collect_subtree(conn: &mut SqliteConnection, roots: &[Uuid]) -> ApiResult<Vec<Uuid>> {
  let mut visited: HashSet<Uuid> = HashSet::new();
  let mut ordered = Vec::new();
  let mut queue: VecDeque<Uuid> = roots.iter().copied().collect();

  while let Some(id) = queue.pop_front() {
    if !visited.insert(id) {
      continue;
    }
    ordered.push(id);

    let children: Vec<(Uuid,)> = sqlx::query_as(FIND_CHILD_TASKS)
      .bind(id)
      .fetch_all(&mut *conn)
      .await?;
    queue.extend(children.into_iter().map(|(child,)| child));
  }

  Ok(ordered)
}

/// Deletes the task, its descendants and their comments. Returns the number of tasks removed.
pub async fn purge_task_tree(conn: &mut SqliteConnection, root: Uuid) -> ApiResult<usize> {
  let subtree = collect_subtree(conn, &[root]).await?;
  purge_tasks(conn, &subtree).await?;

  Ok(subtree.len())
}

/// Deletes a project with its tasks, memberships and invitations.
pub async fn purge_project(conn: &mut SqliteConnection, project_id: Uuid) -> ApiResult<()> {
  let roots: Vec<Uuid> = sqlx::query_as::<_, (Uuid,)>(FIND_PROJECT_TASKS)
    .bind(project_id)
    .fetch_all(&mut *conn)
    .await?
    .into_iter()
    .map(|(id,)| id)
    .collect();

  let tasks = collect_subtree(conn, &roots).await?;
  purge_tasks(conn, &tasks).await?;

  sqlx::query(DELETE_PROJECT_INVITATIONS)
    .bind(project_id)
    .execute(&mut *conn)
    .await?;
  sqlx::query(DELETE_PROJECT_MEMBERSHIPS)
    .bind(project_id)
    .execute(&mut *conn)
    .await?;
  sqlx::query(DELETE_PROJECT).bind(project_id).execute(&mut *conn).await?;

  debug!("Purged project {} with {} tasks", project_id, tasks.len());

  Ok(())
}

async fn purge_tasks(conn: &mut SqliteConnection, parents_first: &[Uuid]) -> ApiResult<()> {
  for &id in parents_first.iter().rev() {
    sqlx::query(DELETE_TASK_COMMENTS).bind(id).execute(&mut *conn).await?;
    sqlx::query(DELETE_TASK).bind(id).execute(&mut *conn).await?;
  }

  Ok(())
}
