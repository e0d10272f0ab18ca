use axum::{
  extract::{Path, State},
  http::StatusCode,
  middleware::from_fn_with_state,
  Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};
use uuid::Uuid;
use validator::Validate;

use crate::{
  entities::{
    invitation::Invitation,
    membership::{Membership, MembershipRole},
    project::Project,
    task::Task,
    user::User,
  },
  error::ApiResult,
  service::{mutation, query},
  AppJson, AppState,
};

use super::auth::auth_guard;

const PROJECTS_TAG: &str = "projects";

pub fn init_projects_routes(state: AppState) -> OpenApiRouter<AppState> {
  OpenApiRouter::new()
    .routes(routes!(list_projects, create_project))
    .routes(routes!(get_project, update_project, delete_project))
    .routes(routes!(list_members))
    .routes(routes!(list_project_tasks))
    .routes(routes!(list_project_invitations, create_invitation))
    .layer(from_fn_with_state(state, auth_guard))
}

#[utoipa::path(
  get,
  path = "/",
  tag = PROJECTS_TAG,
  responses(
    (status = 200, description = "Projects the caller owns or is a member of", body = [Project]),
    (status = 401, description = "Unauthorized")
  )
)]
#[instrument(skip(state, user), fields(user_id = %user.id))]
async fn list_projects(State(state): State<AppState>, Extension(user): Extension<User>) -> ApiResult<Json<Vec<Project>>> {
  let projects = query::projects::list_accessible(&state.pool, user.id).await?;

  Ok(Json(projects))
}

#[derive(Debug, Validate, Deserialize, Serialize, ToSchema)]
pub struct CreateProject {
  #[validate(length(min = 1, max = 255))]
  name: String,
  final_deadline: Option<DateTime<Utc>>,
}

#[utoipa::path(
  post,
  path = "/",
  tag = PROJECTS_TAG,
  request_body = CreateProject,
  responses(
    (status = 201, description = "Project created successfully", body = Project),
    (status = 400, description = "Validation error"),
    (status = 401, description = "Unauthorized")
  )
)]
#[instrument(skip(state, user, input), fields(user_id = %user.id))]
async fn create_project(
  State(state): State<AppState>,
  Extension(user): Extension<User>,
  AppJson(input): AppJson<CreateProject>,
) -> ApiResult<(StatusCode, Json<Project>)> {
  debug!("Register new project with request: {:?}", input);

  input.validate()?;

  let project = mutation::projects::create(
    &state.pool,
    mutation::projects::CreateProjectParams {
      name: input.name,
      final_deadline: input.final_deadline,
      owner_id: user.id,
    },
  )
  .await?;

  Ok((StatusCode::CREATED, Json(project)))
}

#[utoipa::path(
  get,
  path = "/{id}",
  tag = PROJECTS_TAG,
  params(
    ("id" = Uuid, Path, description = "Project id")
  ),
  responses(
    (status = 200, description = "Project found", body = Project),
    (status = 403, description = "Caller is neither owner nor member"),
    (status = 404, description = "Project not found")
  )
)]
#[instrument(skip(state, user), fields(project_id = %id))]
async fn get_project(
  State(state): State<AppState>,
  Extension(user): Extension<User>,
  Path(id): Path<Uuid>,
) -> ApiResult<Json<Project>> {
  let project = query::projects::get(&state.pool, id, user.id).await?;

  Ok(Json(project))
}

#[derive(Debug, Validate, Deserialize, Serialize, ToSchema)]
pub struct UpdateProject {
  #[validate(length(min = 1, max = 255))]
  name: Option<String>,
  final_deadline: Option<DateTime<Utc>>,
}

#[utoipa::path(
  put,
  path = "/{id}",
  tag = PROJECTS_TAG,
  params(
    ("id" = Uuid, Path, description = "Project id")
  ),
  request_body = UpdateProject,
  responses(
    (status = 200, description = "Project updated successfully", body = Project),
    (status = 403, description = "Caller is not the owner"),
    (status = 404, description = "Project not found")
  )
)]
#[instrument(skip(state, user, input), fields(project_id = %id))]
async fn update_project(
  State(state): State<AppState>,
  Extension(user): Extension<User>,
  Path(id): Path<Uuid>,
  AppJson(input): AppJson<UpdateProject>,
) -> ApiResult<Json<Project>> {
  debug!("Update project with id {} and params {:?}", id, input);

  input.validate()?;

  let project = mutation::projects::update(
    &state.pool,
    id,
    user.id,
    mutation::projects::UpdateProjectParams {
      name: input.name,
      final_deadline: input.final_deadline,
    },
  )
  .await?;

  Ok(Json(project))
}

#[utoipa::path(
  delete,
  path = "/{id}",
  tag = PROJECTS_TAG,
  params(
    ("id" = Uuid, Path, description = "Project id")
  ),
  responses(
    (status = 204, description = "Project and its contents deleted"),
    (status = 403, description = "Caller is not the owner"),
    (status = 404, description = "Project not found")
  )
)]
#[instrument(skip(state, user), fields(project_id = %id))]
async fn delete_project(
  State(state): State<AppState>,
  Extension(user): Extension<User>,
  Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
  debug!("Remove project with id {}", id);

  mutation::projects::delete(&state.pool, id, user.id).await?;

  Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
  get,
  path = "/{id}/members",
  tag = PROJECTS_TAG,
  params(
    ("id" = Uuid, Path, description = "Project id")
  ),
  responses(
    (status = 200, description = "Project members", body = [Membership]),
    (status = 403, description = "Caller is neither owner nor member"),
    (status = 404, description = "Project not found")
  )
)]
#[instrument(skip(state, user), fields(project_id = %id))]
async fn list_members(
  State(state): State<AppState>,
  Extension(user): Extension<User>,
  Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<Membership>>> {
  let members = query::memberships::list_by_project(&state.pool, id, user.id).await?;

  Ok(Json(members))
}

#[utoipa::path(
  get,
  path = "/{id}/tasks",
  tag = PROJECTS_TAG,
  params(
    ("id" = Uuid, Path, description = "Project id")
  ),
  responses(
    (status = 200, description = "Project tasks, newest first", body = [Task]),
    (status = 403, description = "Caller is neither owner nor member"),
    (status = 404, description = "Project not found")
  )
)]
#[instrument(skip(state, user), fields(project_id = %id))]
async fn list_project_tasks(
  State(state): State<AppState>,
  Extension(user): Extension<User>,
  Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<Task>>> {
  let tasks = query::tasks::list_by_project(&state.pool, id, user.id).await?;

  Ok(Json(tasks))
}

#[utoipa::path(
  get,
  path = "/{id}/invitations",
  tag = PROJECTS_TAG,
  params(
    ("id" = Uuid, Path, description = "Project id")
  ),
  responses(
    (status = 200, description = "All invitations of the project, newest first", body = [Invitation]),
    (status = 403, description = "Caller is neither owner nor leader"),
    (status = 404, description = "Project not found")
  )
)]
#[instrument(skip(state, user), fields(project_id = %id))]
async fn list_project_invitations(
  State(state): State<AppState>,
  Extension(user): Extension<User>,
  Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<Invitation>>> {
  let invitations = query::invitations::list_by_project(&state.pool, id, user.id).await?;

  Ok(Json(invitations))
}

#[derive(Debug, Validate, Deserialize, Serialize, ToSchema)]
pub struct CreateInvitation {
  #[validate(email)]
  invitee_email: String,
  #[serde(default)]
  role: MembershipRole,
}

#[utoipa::path(
  post,
  path = "/{id}/invitations",
  tag = PROJECTS_TAG,
  params(
    ("id" = Uuid, Path, description = "Project id")
  ),
  request_body = CreateInvitation,
  responses(
    (status = 201, description = "Invitation sent", body = Invitation),
    (status = 403, description = "Caller is neither owner nor leader"),
    (status = 404, description = "Project or invitee not found"),
    (status = 409, description = "Invitee is the caller, already in the project or already invited")
  )
)]
#[instrument(skip(state, user, input), fields(project_id = %id))]
async fn create_invitation(
  State(state): State<AppState>,
  Extension(user): Extension<User>,
  Path(id): Path<Uuid>,
  AppJson(input): AppJson<CreateInvitation>,
) -> ApiResult<(StatusCode, Json<Invitation>)> {
  input.validate()?;

  let invitation = mutation::invitations::create(
    &state.pool,
    user.id,
    mutation::invitations::CreateInvitationParams {
      project_id: id,
      invitee_email: input.invitee_email,
      role: input.role,
    },
  )
  .await?;

  Ok((StatusCode::CREATED, Json(invitation)))
}
