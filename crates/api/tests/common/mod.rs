#![allow(dead_code)]

use planhive_api::{
  entities::{
    membership::{Membership, MembershipRole},
    project::Project,
    task::Task,
    user::User,
  },
  service::mutation,
};
use secrecy::SecretBox;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use uuid::Uuid;

pub const PASSWORD: &str = "correct horse battery";

/// In-memory store with the schema applied. One connection keeps the database alive.
pub async fn pool() -> SqlitePool {
  let pool = SqlitePoolOptions::new()
    .max_connections(1)
    .idle_timeout(None)
    .max_lifetime(None)
    .connect("sqlite::memory:")
    .await
    .expect("in-memory sqlite");

  planhive_api::migrate(&pool).await.expect("migrations apply");

  pool
}

pub async fn user(pool: &SqlitePool, email: &str) -> User {
  mutation::users::create(
    pool,
    mutation::users::CreateUserParams {
      email: email.to_string(),
      password: SecretBox::new(Box::new(PASSWORD.to_string())),
      first_name: None,
      last_name: None,
    },
  )
  .await
  .expect("user is created")
}

pub async fn project(pool: &SqlitePool, owner: &User) -> Project {
  mutation::projects::create(
    pool,
    mutation::projects::CreateProjectParams {
      name: "Apollo".to_string(),
      final_deadline: None,
      owner_id: owner.id,
    },
  )
  .await
  .expect("project is created")
}

/// Invites `invitee` on behalf of `inviter` and accepts the invitation.
pub async fn join(
  pool: &SqlitePool,
  project: &Project,
  inviter: &User,
  invitee: &User,
  role: MembershipRole,
) -> Membership {
  let invitation = mutation::invitations::create(
    pool,
    inviter.id,
    mutation::invitations::CreateInvitationParams {
      project_id: project.id,
      invitee_email: invitee.email.clone(),
      role,
    },
  )
  .await
  .expect("invitation is created");

  mutation::invitations::accept(pool, invitation.id, invitee.id)
    .await
    .expect("invitation is accepted")
}

pub async fn task(pool: &SqlitePool, creator: &User, project: &Project, parent: Option<Uuid>) -> Task {
  mutation::tasks::create(
    pool,
    creator.id,
    mutation::tasks::CreateTaskParams {
      name: "Write report".to_string(),
      project_id: Some(project.id),
      parent_task_id: parent,
      ..Default::default()
    },
  )
  .await
  .expect("task is created")
}

pub async fn count(pool: &SqlitePool, sql: &str, id: Uuid) -> i64 {
  let (count,): (i64,) = sqlx::query_as(sql).bind(id).fetch_one(pool).await.expect("count query");
  count
}
