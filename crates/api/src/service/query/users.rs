use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use uuid::Uuid;

use crate::{entities::user::User, error::ApiResult};

const FIND_USER_BY_ID_QUERY: &str = "SELECT * FROM users WHERE id = ?1";
const FIND_USER_BY_EMAIL_QUERY: &str = "SELECT * FROM users WHERE email = ?1";

/// Finds a user by their ID
///
/// # Arguments
/// * `pool` - Database connection pool
/// * `id` - User UUID to search for
///
/// # Returns
/// Optional User if found
pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> ApiResult<Option<User>> {
  sqlx::query_as::<_, User>(FIND_USER_BY_ID_QUERY)
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(Into::into)
}

/// Finds a user by email. Emails are stored lowercase, so lookup is case-insensitive.
pub async fn find_by_email(pool: &SqlitePool, email: &str) -> ApiResult<Option<User>> {
  sqlx::query_as::<_, User>(FIND_USER_BY_EMAIL_QUERY)
    .bind(normalize_email(email))
    .fetch_optional(pool)
    .await
    .map_err(Into::into)
}

/// Reads a user joined into a wider row under `{prefix}_*` column aliases.
pub(crate) fn read_prefixed_user(row: &SqliteRow, prefix: &str) -> Result<User, sqlx::Error> {
  let column = |name: &str| format!("{prefix}_{name}");

  Ok(User {
    id: row.try_get(column("id").as_str())?,
    email: row.try_get(column("email").as_str())?,
    password: row.try_get(column("password").as_str())?,
    first_name: row.try_get(column("first_name").as_str())?,
    last_name: row.try_get(column("last_name").as_str())?,
    created_at: row.try_get(column("created_at").as_str())?,
  })
}

pub(crate) fn normalize_email(email: &str) -> String {
  email.trim().to_ascii_lowercase()
}
