use axum::{
  extract::{Path, State},
  middleware::from_fn_with_state,
  Extension, Json,
};
use tracing::instrument;
use utoipa_axum::{router::OpenApiRouter, routes};
use uuid::Uuid;

use crate::{
  entities::{invitation::Invitation, membership::Membership, user::User},
  error::ApiResult,
  service::{mutation, query},
  AppState,
};

use super::auth::auth_guard;

const INVITATIONS_TAG: &str = "invitations";

pub fn init_invitations_routes(state: AppState) -> OpenApiRouter<AppState> {
  OpenApiRouter::new()
    .routes(routes!(list_my_invitations))
    .routes(routes!(accept_invitation))
    .routes(routes!(decline_invitation))
    .layer(from_fn_with_state(state, auth_guard))
}

#[utoipa::path(
  get,
  path = "/",
  tag = INVITATIONS_TAG,
  responses(
    (status = 200, description = "Pending invitations addressed to the caller", body = [Invitation]),
    (status = 401, description = "Unauthorized")
  )
)]
#[instrument(skip(state, user), fields(user_id = %user.id))]
async fn list_my_invitations(
  State(state): State<AppState>,
  Extension(user): Extension<User>,
) -> ApiResult<Json<Vec<Invitation>>> {
  let invitations = query::invitations::list_by_invitee(&state.pool, user.id).await?;

  Ok(Json(invitations))
}

#[utoipa::path(
  post,
  path = "/{id}/accept",
  tag = INVITATIONS_TAG,
  params(
    ("id" = Uuid, Path, description = "Invitation id")
  ),
  responses(
    (status = 200, description = "Invitation accepted, membership created", body = Membership),
    (status = 403, description = "Invitation is addressed to another user"),
    (status = 404, description = "Invitation not found or no longer pending"),
    (status = 409, description = "Caller already belongs to the project")
  )
)]
#[instrument(skip(state, user), fields(invitation_id = %id))]
async fn accept_invitation(
  State(state): State<AppState>,
  Extension(user): Extension<User>,
  Path(id): Path<Uuid>,
) -> ApiResult<Json<Membership>> {
  let membership = mutation::invitations::accept(&state.pool, id, user.id).await?;

  Ok(Json(membership))
}

#[utoipa::path(
  post,
  path = "/{id}/decline",
  tag = INVITATIONS_TAG,
  params(
    ("id" = Uuid, Path, description = "Invitation id")
  ),
  responses(
    (status = 200, description = "Invitation declined", body = Invitation),
    (status = 403, description = "Invitation is addressed to another user"),
    (status = 404, description = "Invitation not found or no longer pending")
  )
)]
#[instrument(skip(state, user), fields(invitation_id = %id))]
async fn decline_invitation(
  State(state): State<AppState>,
  Extension(user): Extension<User>,
  Path(id): Path<Uuid>,
) -> ApiResult<Json<Invitation>> {
  let invitation = mutation::invitations::decline(&state.pool, id, user.id).await?;

  Ok(Json(invitation))
}
