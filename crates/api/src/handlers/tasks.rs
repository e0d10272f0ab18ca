use axum::{
  extract::{Path, State},
  http::StatusCode,
  middleware::from_fn_with_state,
  Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use tracing::{debug, instrument};
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};
use uuid::Uuid;
use validator::Validate;

use crate::{
  entities::{
    comment::Comment,
    task::{Task, TaskStatus},
    user::User,
  },
  error::ApiResult,
  service::{mutation, query},
  AppJson, AppState,
};

use super::auth::auth_guard;

const TASKS_TAG: &str = "tasks";

pub fn init_tasks_routes(state: AppState) -> OpenApiRouter<AppState> {
  OpenApiRouter::new()
    .routes(routes!(create_task))
    .routes(routes!(get_task, update_task, delete_task))
    .routes(routes!(change_task_status))
    .routes(routes!(list_task_comments))
    .layer(from_fn_with_state(state, auth_guard))
}

/// Maps a present field (even `null`) to `Some`, so an absent field stays `None`.
fn deserialize_present<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
  T: Deserialize<'de>,
  D: Deserializer<'de>,
{
  T::deserialize(deserializer).map(Some)
}

#[derive(Debug, Validate, Deserialize, ToSchema)]
pub struct CreateTask {
  #[validate(length(min = 1, max = 255))]
  name: String,
  description: Option<String>,
  deadline: Option<DateTime<Utc>>,
  project_id: Option<Uuid>,
  parent_task_id: Option<Uuid>,
  assigned_to_id: Option<Uuid>,
}

#[utoipa::path(
  post,
  path = "/",
  tag = TASKS_TAG,
  request_body = CreateTask,
  responses(
    (status = 201, description = "Task created", body = Task),
    (status = 400, description = "Missing project or validation error"),
    (status = 403, description = "Project or parent task is not accessible"),
    (status = 404, description = "Project or parent task not found"),
    (status = 409, description = "Assignee does not belong to the project")
  )
)]
#[instrument(skip(state, user, input), fields(user_id = %user.id))]
async fn create_task(
  State(state): State<AppState>,
  Extension(user): Extension<User>,
  AppJson(input): AppJson<CreateTask>,
) -> ApiResult<(StatusCode, Json<Task>)> {
  debug!("Register new task with request: {:?}", input);

  input.validate()?;

  let task = mutation::tasks::create(
    &state.pool,
    user.id,
    mutation::tasks::CreateTaskParams {
      name: input.name,
      description: input.description,
      deadline: input.deadline,
      project_id: input.project_id,
      parent_task_id: input.parent_task_id,
      assigned_to_id: input.assigned_to_id,
    },
  )
  .await?;

  Ok((StatusCode::CREATED, Json(task)))
}

#[utoipa::path(
  get,
  path = "/{id}",
  tag = TASKS_TAG,
  params(
    ("id" = Uuid, Path, description = "Task id")
  ),
  responses(
    (status = 200, description = "Task found", body = Task),
    (status = 403, description = "Task is not accessible"),
    (status = 404, description = "Task not found")
  )
)]
#[instrument(skip(state, user), fields(task_id = %id))]
async fn get_task(
  State(state): State<AppState>,
  Extension(user): Extension<User>,
  Path(id): Path<Uuid>,
) -> ApiResult<Json<Task>> {
  let task = query::tasks::get(&state.pool, id, user.id).await?;

  Ok(Json(task))
}

#[derive(Debug, Validate, Deserialize, ToSchema)]
pub struct UpdateTask {
  #[validate(length(min = 1, max = 255))]
  name: Option<String>,
  description: Option<String>,
  deadline: Option<DateTime<Utc>>,
  parent_task_id: Option<Uuid>,
  /// Absent keeps the assignee, `null` unassigns.
  #[serde(default, deserialize_with = "deserialize_present")]
  #[schema(value_type = Option<Uuid>)]
  assigned_to_id: Option<Option<Uuid>>,
}

#[utoipa::path(
  patch,
  path = "/{id}",
  tag = TASKS_TAG,
  params(
    ("id" = Uuid, Path, description = "Task id")
  ),
  request_body = UpdateTask,
  responses(
    (status = 200, description = "Task updated", body = Task),
    (status = 403, description = "Task is not accessible or caller may not reassign"),
    (status = 404, description = "Task or parent not found"),
    (status = 409, description = "Assignee outside the project or parent would form a cycle")
  )
)]
#[instrument(skip(state, user, input), fields(task_id = %id))]
async fn update_task(
  State(state): State<AppState>,
  Extension(user): Extension<User>,
  Path(id): Path<Uuid>,
  AppJson(input): AppJson<UpdateTask>,
) -> ApiResult<Json<Task>> {
  debug!("Update task with id {} and params {:?}", id, input);

  input.validate()?;

  let task = mutation::tasks::update(
    &state.pool,
    id,
    user.id,
    mutation::tasks::UpdateTaskParams {
      name: input.name,
      description: input.description,
      deadline: input.deadline,
      parent_task_id: input.parent_task_id,
      assigned_to_id: input.assigned_to_id,
    },
  )
  .await?;

  Ok(Json(task))
}

#[utoipa::path(
  delete,
  path = "/{id}",
  tag = TASKS_TAG,
  params(
    ("id" = Uuid, Path, description = "Task id")
  ),
  responses(
    (status = 204, description = "Task and its subtasks deleted"),
    (status = 403, description = "Task is not accessible"),
    (status = 404, description = "Task not found")
  )
)]
#[instrument(skip(state, user), fields(task_id = %id))]
async fn delete_task(
  State(state): State<AppState>,
  Extension(user): Extension<User>,
  Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
  debug!("Remove task with id {}", id);

  mutation::tasks::delete(&state.pool, id, user.id).await?;

  Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChangeStatus {
  status: TaskStatus,
}

#[utoipa::path(
  patch,
  path = "/{id}/status",
  tag = TASKS_TAG,
  params(
    ("id" = Uuid, Path, description = "Task id")
  ),
  request_body = ChangeStatus,
  responses(
    (status = 200, description = "Status changed", body = Task),
    (status = 403, description = "Caller is neither assignee nor owner/leader"),
    (status = 404, description = "Task not found")
  )
)]
#[instrument(skip(state, user), fields(task_id = %id))]
async fn change_task_status(
  State(state): State<AppState>,
  Extension(user): Extension<User>,
  Path(id): Path<Uuid>,
  AppJson(input): AppJson<ChangeStatus>,
) -> ApiResult<Json<Task>> {
  let task = mutation::tasks::change_status(&state.pool, id, user.id, input.status).await?;

  Ok(Json(task))
}

#[utoipa::path(
  get,
  path = "/{id}/comments",
  tag = TASKS_TAG,
  params(
    ("id" = Uuid, Path, description = "Task id")
  ),
  responses(
    (status = 200, description = "Task comments, oldest first", body = [Comment]),
    (status = 403, description = "Task is not accessible"),
    (status = 404, description = "Task not found")
  )
)]
#[instrument(skip(state, user), fields(task_id = %id))]
async fn list_task_comments(
  State(state): State<AppState>,
  Extension(user): Extension<User>,
  Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<Comment>>> {
  let comments = query::comments::list_by_task(&state.pool, id, user.id).await?;

  Ok(Json(comments))
}
