use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
  entities::comment::Comment,
  error::{ApiError, ApiResult},
  service::{ledger, query},
};

const LIST_TASK_COMMENTS_QUERY: &str = r#"
  SELECT * FROM comments
  WHERE task_id = ?1
  ORDER BY created_at ASC, rowid ASC
"#;

/// Lists the comments of a task, oldest first
///
/// # Errors
/// - ResourceNotFound if task doesn't exist
/// - Forbidden if the task is not accessible to the user
pub async fn list_by_task(pool: &SqlitePool, task_id: Uuid, user_id: Uuid) -> ApiResult<Vec<Comment>> {
  let mut conn = pool.acquire().await?;

  let task = query::tasks::find_row(&mut conn, task_id)
    .await?
    .ok_or_else(|| ApiError::ResourceNotFound(task_id.to_string()))?;
  ledger::authorize_task(&mut conn, &task, user_id).await?;

  sqlx::query_as::<_, Comment>(LIST_TASK_COMMENTS_QUERY)
    .bind(task_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(Into::into)
}
