use axum::{extract::State, http::StatusCode, middleware::from_fn_with_state, Extension, Json};
use serde::Deserialize;
use tracing::instrument;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};
use uuid::Uuid;
use validator::Validate;

use crate::{
  entities::{comment::Comment, user::User},
  error::ApiResult,
  service::mutation,
  AppJson, AppState,
};

use super::auth::auth_guard;

const COMMENTS_TAG: &str = "comments";

pub fn init_comments_routes(state: AppState) -> OpenApiRouter<AppState> {
  OpenApiRouter::new()
    .routes(routes!(create_comment))
    .layer(from_fn_with_state(state, auth_guard))
}

#[derive(Debug, Validate, Deserialize, ToSchema)]
pub struct CreateComment {
  #[validate(length(min = 1))]
  text: String,
  task_id: Uuid,
}

#[utoipa::path(
  post,
  path = "/",
  tag = COMMENTS_TAG,
  request_body = CreateComment,
  responses(
    (status = 201, description = "Comment added", body = Comment),
    (status = 403, description = "Task is not accessible"),
    (status = 404, description = "Task not found")
  )
)]
#[instrument(skip(state, user, input), fields(user_id = %user.id))]
async fn create_comment(
  State(state): State<AppState>,
  Extension(user): Extension<User>,
  AppJson(input): AppJson<CreateComment>,
) -> ApiResult<(StatusCode, Json<Comment>)> {
  input.validate()?;

  let comment = mutation::comments::create(
    &state.pool,
    user.id,
    mutation::comments::CreateCommentParams {
      text: input.text,
      task_id: input.task_id,
    },
  )
  .await?;

  Ok((StatusCode::CREATED, Json(comment)))
}
