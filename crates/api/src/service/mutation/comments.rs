use chrono::Utc;
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::{
  entities::comment::Comment,
  error::{ApiError, ApiResult},
  service::{ledger, query},
};

const INSERT_COMMENT: &str = r#"
  INSERT INTO comments (id, text, created_at, author_id, task_id)
  VALUES (?1, ?2, ?3, ?4, ?5)
  RETURNING *
"#;

#[derive(Debug, Deserialize)]
pub struct CreateCommentParams {
  pub text: String,
  pub task_id: Uuid,
}

/// Adds a comment to a task on behalf of `author_id`
///
/// # Errors
/// - ResourceNotFound if task doesn't exist
/// - Forbidden if the task is not accessible to the author
pub async fn create(pool: &SqlitePool, author_id: Uuid, params: CreateCommentParams) -> ApiResult<Comment> {
  let mut tx = pool.begin().await?;

  let task = query::tasks::find_row(&mut tx, params.task_id)
    .await?
    .ok_or_else(|| ApiError::ResourceNotFound(params.task_id.to_string()))?;
  ledger::authorize_task(&mut tx, &task, author_id).await?;

  let comment = sqlx::query_as::<_, Comment>(INSERT_COMMENT)
    .bind(Uuid::new_v4())
    .bind(&params.text)
    .bind(Utc::now())
    .bind(author_id)
    .bind(params.task_id)
    .fetch_one(&mut *tx)
    .await?;

  tx.commit().await?;

  debug!("Comment {} added to task {} by {}", comment.id, comment.task_id, author_id);

  Ok(comment)
}
