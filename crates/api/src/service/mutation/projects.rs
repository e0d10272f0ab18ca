use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;
use uuid::Uuid;

use crate::{
  entities::project::{Project, ProjectRow},
  error::{ApiError, ApiResult},
  service::{cascade, ledger, policy::ProjectAction, query},
};

// SQL Query Constants
const INSERT_PROJECT: &str = r#"
    INSERT INTO projects (id, name, final_deadline, owner_id, created_at)
    VALUES (?1, ?2, ?3, ?4, ?5)
    RETURNING *
"#;
const UPDATE_PROJECT: &str = r#"
    UPDATE projects
    SET name = COALESCE(?1, name), final_deadline = COALESCE(?2, final_deadline)
    WHERE id = ?3
    RETURNING *
"#;

#[derive(Debug, Deserialize)]
pub struct CreateProjectParams {
  pub name: String,
  pub final_deadline: Option<DateTime<Utc>>,
  pub owner_id: Uuid,
}

/// Creates a new project owned by `params.owner_id`
///
/// # Errors
/// - DatabaseError for any database-related issues
pub async fn create(pool: &SqlitePool, params: CreateProjectParams) -> ApiResult<Project> {
  let mut tx = pool.begin().await?;

  let project = create_project_row(&mut tx, &params).await?;
  let project = load_project(&mut tx, project.id).await?;

  tx.commit().await?;

  info!("Project {} created by {}", project.id, project.owner_id);

  Ok(project)
}

/// Only supplied fields are applied.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct UpdateProjectParams {
  pub name: Option<String>,
  pub final_deadline: Option<DateTime<Utc>>,
}

/// Updates an existing project by ID
///
/// # Errors
/// - ResourceNotFound if project doesn't exist
/// - Forbidden if the caller is not the project owner
/// - DatabaseError for any database-related issues
pub async fn update(pool: &SqlitePool, id: Uuid, user_id: Uuid, params: UpdateProjectParams) -> ApiResult<Project> {
  let mut tx = pool.begin().await?;

  ledger::authorize(&mut tx, id, user_id, ProjectAction::Edit).await?;
  update_project_row(&mut tx, id, params).await?;
  let project = load_project(&mut tx, id).await?;

  tx.commit().await?;

  Ok(project)
}

/// Deletes a project by ID with all its tasks, memberships and invitations
///
/// # Errors
/// - ResourceNotFound if project doesn't exist
/// - Forbidden if the caller is not the project owner
/// - DatabaseError for any database-related issues
pub async fn delete(pool: &SqlitePool, id: Uuid, user_id: Uuid) -> ApiResult<()> {
  let mut tx = pool.begin().await?;

  ledger::authorize(&mut tx, id, user_id, ProjectAction::Delete).await?;
  cascade::purge_project(&mut tx, id).await?;

  tx.commit().await?;

  info!("Project {} deleted by {}", id, user_id);

  Ok(())
}

async fn load_project(conn: &mut SqliteConnection, id: Uuid) -> ApiResult<Project> {
  query::projects::find(conn, id)
    .await?
    .ok_or_else(|| ApiError::ResourceNotFound(id.to_string()))
}

async fn create_project_row(conn: &mut SqliteConnection, params: &CreateProjectParams) -> ApiResult<ProjectRow> {
  sqlx::query_as::<_, ProjectRow>(INSERT_PROJECT)
    .bind(Uuid::new_v4())
    .bind(&params.name)
    .bind(params.final_deadline)
    .bind(params.owner_id)
    .bind(Utc::now())
    .fetch_one(&mut *conn)
    .await
    .map_err(Into::into)
}

async fn update_project_row(conn: &mut SqliteConnection, id: Uuid, params: UpdateProjectParams) -> ApiResult<ProjectRow> {
  sqlx::query_as::<_, ProjectRow>(UPDATE_PROJECT)
    .bind(params.name)
    .bind(params.final_deadline)
    .bind(id)
    .fetch_one(&mut *conn)
    .await
    .map_err(Into::into)
}
