use anyhow::{anyhow, Context};
use argon2::password_hash::SaltString;
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};
use chrono::Utc;
use rand_core::OsRng;
use secrecy::{ExposeSecret, SecretBox};
use serde::Deserialize;
use sqlx::SqlitePool;
use tokio::task;
use tracing::{error, info};
use uuid::Uuid;

use crate::entities::user::User;
use crate::error::{ApiError, ApiResult};
use crate::service::{cascade, query::users::normalize_email};

const FIND_USER_BY_EMAIL: &str = "SELECT * FROM users WHERE email = ?1";
const FIND_USER_BY_ID: &str = "SELECT * FROM users WHERE id = ?1";
const CREATE_USER: &str = r#"
  INSERT INTO users (id, email, password, first_name, last_name, created_at)
  VALUES (?1, ?2, ?3, ?4, ?5, ?6)
  RETURNING *
"#;
const FIND_OWNED_PROJECTS: &str = "SELECT id FROM projects WHERE owner_id = ?1";
const UNASSIGN_TASKS: &str = "UPDATE tasks SET assigned_to_id = NULL WHERE assigned_to_id = ?1";
const DELETE_USER_INVITATIONS: &str = "DELETE FROM project_invitations WHERE inviter_id = ?1 OR invitee_id = ?1";
const DELETE_USER_MEMBERSHIPS: &str = "DELETE FROM project_memberships WHERE user_id = ?1";
const DELETE_USER_COMMENTS: &str = "DELETE FROM comments WHERE author_id = ?1";
const DELETE_USER: &str = "DELETE FROM users WHERE id = ?1";

#[derive(Debug, Deserialize)]
pub struct LoginParams {
  pub email: String,
  pub password: SecretBox<String>,
}

/// Verifies an email/password pair and returns the matching user
///
/// # Errors
/// - InvalidCredentials if the email is unknown or the password does not verify
pub async fn login(pool: &SqlitePool, params: LoginParams) -> ApiResult<User> {
  let user = find_user_by_email(pool, &params.email).await?;
  verify_password(SecretBox::from(Box::new(user.password.to_owned())), params.password).await?;
  Ok(user)
}

#[derive(Debug, Deserialize)]
pub struct CreateUserParams {
  pub email: String,
  pub password: SecretBox<String>,
  pub first_name: Option<String>,
  pub last_name: Option<String>,
}

/// Registers a new user
///
/// # Errors
/// - UserAlreadyExist if the email is already registered
/// - DatabaseError for any database-related issues
pub async fn create(pool: &SqlitePool, mut params: CreateUserParams) -> ApiResult<User> {
  params.email = normalize_email(&params.email);

  if (check_user_exists(pool, &params.email).await?).is_some() {
    return Err(ApiError::UserAlreadyExist(params.email));
  }

  let password = std::mem::take(&mut params.password);
  let hashed_password = hash_password(password).await?;
  create_new_user(pool, params, &hashed_password).await
}

/// Deletes a user account together with everything it owns.
///
/// Owned projects (with their tasks, memberships and invitations), memberships,
/// authored comments and any invitation sent or received by the user are removed.
/// Tasks assigned to the user stay in place but become unassigned.
///
/// # Errors
/// - ResourceNotFound if user doesn't exist
/// - DatabaseError for any database-related issues
pub async fn delete(pool: &SqlitePool, id: Uuid) -> ApiResult<()> {
  ensure_user_exists(pool, id).await?;

  let mut tx = pool.begin().await?;

  let owned: Vec<(Uuid,)> = sqlx::query_as(FIND_OWNED_PROJECTS)
    .bind(id)
    .fetch_all(&mut *tx)
    .await?;
  for (project_id,) in owned {
    cascade::purge_project(&mut tx, project_id).await?;
  }

  sqlx::query(UNASSIGN_TASKS).bind(id).execute(&mut *tx).await?;
  sqlx::query(DELETE_USER_INVITATIONS).bind(id).execute(&mut *tx).await?;
  sqlx::query(DELETE_USER_MEMBERSHIPS).bind(id).execute(&mut *tx).await?;
  sqlx::query(DELETE_USER_COMMENTS).bind(id).execute(&mut *tx).await?;
  sqlx::query(DELETE_USER).bind(id).execute(&mut *tx).await?;

  tx.commit().await?;

  info!("Deleted user {}", id);

  Ok(())
}

async fn create_new_user(pool: &SqlitePool, params: CreateUserParams, hashed_password: &str) -> ApiResult<User> {
  sqlx::query_as::<_, User>(CREATE_USER)
    .bind(Uuid::new_v4())
    .bind(params.email)
    .bind(hashed_password)
    .bind(params.first_name)
    .bind(params.last_name)
    .bind(Utc::now())
    .fetch_one(pool)
    .await
    .map_err(Into::into)
}

async fn hash_password(password: SecretBox<String>) -> ApiResult<String> {
  task::spawn_blocking(move || {
    let salt = SaltString::generate(&mut OsRng);
    let params = Params::new(15000, 2, 1, None).map_err(|err| anyhow!("invalid argon2 params: {err}"))?;
    let argon2_config = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    argon2_config
      .hash_password(password.expose_secret().as_bytes(), &salt)
      .map_err(|err| {
        error!("Failed to hash password: {}", err);
        ApiError::Anyhow(anyhow!("failed to hash password"))
      })
      .map(|hash| hash.to_string())
  })
  .await
  .context("panic in hash_password()")?
}

async fn verify_password(
  expected_password_hash: SecretBox<String>,
  password_candidate: SecretBox<String>,
) -> ApiResult<()> {
  task::spawn_blocking(move || {
    let parsed_hash = PasswordHash::new(expected_password_hash.expose_secret()).map_err(|err| {
      info!("Failed to parse password hash: {}", err);
      ApiError::InvalidCredentials
    })?;

    Argon2::default()
      .verify_password(password_candidate.expose_secret().as_bytes(), &parsed_hash)
      .map_err(|_| ApiError::InvalidCredentials)
  })
  .await
  .context("panic in verify_password()")?
}

async fn find_user_by_email(pool: &SqlitePool, email: &str) -> ApiResult<User> {
  sqlx::query_as::<_, User>(FIND_USER_BY_EMAIL)
    .bind(normalize_email(email))
    .fetch_optional(pool)
    .await?
    .ok_or(ApiError::InvalidCredentials)
}

async fn check_user_exists(pool: &SqlitePool, email: &str) -> ApiResult<Option<User>> {
  sqlx::query_as::<_, User>(FIND_USER_BY_EMAIL)
    .bind(email)
    .fetch_optional(pool)
    .await
    .map_err(Into::into)
}

async fn ensure_user_exists(pool: &SqlitePool, id: Uuid) -> ApiResult<()> {
  let user_exists = sqlx::query_as::<_, User>(FIND_USER_BY_ID)
    .bind(id)
    .fetch_optional(pool)
    .await?;

  match user_exists {
    Some(_) => Ok(()),
    None => Err(ApiError::ResourceNotFound(id.to_string())),
  }
}
