use axum::{
  extract::{Path, State},
  http::StatusCode,
  middleware::from_fn_with_state,
  Extension, Json,
};
use serde::Deserialize;
use tracing::instrument;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};
use uuid::Uuid;

use crate::{
  entities::{
    membership::{Membership, MembershipRole},
    user::User,
  },
  error::ApiResult,
  service::mutation,
  AppJson, AppState,
};

use super::auth::auth_guard;

const MEMBERSHIPS_TAG: &str = "memberships";

pub fn init_memberships_routes(state: AppState) -> OpenApiRouter<AppState> {
  OpenApiRouter::new()
    .routes(routes!(kick_member))
    .routes(routes!(set_member_role))
    .layer(from_fn_with_state(state, auth_guard))
}

#[utoipa::path(
  delete,
  path = "/{id}",
  tag = MEMBERSHIPS_TAG,
  params(
    ("id" = Uuid, Path, description = "Membership id")
  ),
  responses(
    (status = 204, description = "Member removed from the project"),
    (status = 403, description = "Caller is neither owner nor leader"),
    (status = 404, description = "Membership not found"),
    (status = 409, description = "Membership belongs to the project owner")
  )
)]
#[instrument(skip(state, user), fields(membership_id = %id))]
async fn kick_member(
  State(state): State<AppState>,
  Extension(user): Extension<User>,
  Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
  mutation::memberships::kick(&state.pool, id, user.id).await?;

  Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetRole {
  role: MembershipRole,
}

#[utoipa::path(
  patch,
  path = "/{id}/role",
  tag = MEMBERSHIPS_TAG,
  params(
    ("id" = Uuid, Path, description = "Membership id")
  ),
  request_body = SetRole,
  responses(
    (status = 200, description = "Role changed", body = Membership),
    (status = 403, description = "Caller is neither owner nor leader"),
    (status = 404, description = "Membership not found"),
    (status = 409, description = "Membership belongs to the project owner")
  )
)]
#[instrument(skip(state, user), fields(membership_id = %id))]
async fn set_member_role(
  State(state): State<AppState>,
  Extension(user): Extension<User>,
  Path(id): Path<Uuid>,
  AppJson(input): AppJson<SetRole>,
) -> ApiResult<Json<Membership>> {
  let membership = mutation::memberships::set_role(&state.pool, id, user.id, input.role).await?;

  Ok(Json(membership))
}
