mod common;

use planhive_api::{
  entities::{invitation::InvitationStatus, membership::MembershipRole},
  error::ApiError,
  service::{ledger, mutation, query},
};
use sqlx::SqlitePool;
use uuid::Uuid;

const COUNT_INVITATIONS: &str = "SELECT COUNT(*) FROM project_invitations WHERE project_id = ?1";
const COUNT_MEMBERSHIPS: &str = "SELECT COUNT(*) FROM project_memberships WHERE project_id = ?1";

async fn invite(
  pool: &SqlitePool,
  project_id: Uuid,
  inviter_id: Uuid,
  email: &str,
) -> Result<planhive_api::entities::invitation::Invitation, ApiError> {
  mutation::invitations::create(
    pool,
    inviter_id,
    mutation::invitations::CreateInvitationParams {
      project_id,
      invitee_email: email.to_string(),
      role: MembershipRole::Member,
    },
  )
  .await
}

#[tokio::test]
async fn invitation_accept_creates_membership_once() {
  let pool = common::pool().await;
  let alice = common::user(&pool, "alice@example.com").await;
  let bob = common::user(&pool, "bob@example.com").await;
  let project = common::project(&pool, &alice).await;

  let invitation = invite(&pool, project.id, alice.id, "bob@example.com").await.unwrap();
  assert_eq!(invitation.status, InvitationStatus::Pending);
  assert_eq!(invitation.invitee.id, bob.id);
  assert_eq!(invitation.inviter.id, alice.id);
  assert_eq!(invitation.project.id, project.id);

  let membership = mutation::invitations::accept(&pool, invitation.id, bob.id).await.unwrap();
  assert_eq!(membership.project_id, project.id);
  assert_eq!(membership.user.id, bob.id);
  assert_eq!(membership.role, MembershipRole::Member);
  assert_eq!(common::count(&pool, COUNT_MEMBERSHIPS, project.id).await, 1);

  let listed = query::invitations::list_by_project(&pool, project.id, alice.id).await.unwrap();
  assert_eq!(listed[0].status, InvitationStatus::Accepted);

  let again = mutation::invitations::accept(&pool, invitation.id, bob.id).await;
  assert!(matches!(again, Err(ApiError::ResourceNotFound(_))));
  let decline = mutation::invitations::decline(&pool, invitation.id, bob.id).await;
  assert!(matches!(decline, Err(ApiError::ResourceNotFound(_))));
  assert_eq!(common::count(&pool, COUNT_MEMBERSHIPS, project.id).await, 1);
}

#[tokio::test]
async fn invitation_decline_creates_no_membership() {
  let pool = common::pool().await;
  let alice = common::user(&pool, "alice@example.com").await;
  let bob = common::user(&pool, "bob@example.com").await;
  let project = common::project(&pool, &alice).await;
  let invitation = invite(&pool, project.id, alice.id, "bob@example.com").await.unwrap();

  let declined = mutation::invitations::decline(&pool, invitation.id, bob.id).await.unwrap();

  assert_eq!(declined.status, InvitationStatus::Declined);
  assert_eq!(common::count(&pool, COUNT_MEMBERSHIPS, project.id).await, 0);
  assert!(query::invitations::list_by_invitee(&pool, bob.id).await.unwrap().is_empty());

  // A declined invitation does not block a new one.
  invite(&pool, project.id, alice.id, "bob@example.com").await.unwrap();
}

#[tokio::test]
async fn only_invitee_may_answer() {
  let pool = common::pool().await;
  let alice = common::user(&pool, "alice@example.com").await;
  common::user(&pool, "bob@example.com").await;
  let carol = common::user(&pool, "carol@example.com").await;
  let project = common::project(&pool, &alice).await;
  let invitation = invite(&pool, project.id, alice.id, "bob@example.com").await.unwrap();

  let accept = mutation::invitations::accept(&pool, invitation.id, carol.id).await;
  assert!(matches!(accept, Err(ApiError::Forbidden(_))));
  let decline = mutation::invitations::decline(&pool, invitation.id, alice.id).await;
  assert!(matches!(decline, Err(ApiError::Forbidden(_))));

  let missing = mutation::invitations::accept(&pool, Uuid::new_v4(), carol.id).await;
  assert!(matches!(missing, Err(ApiError::ResourceNotFound(_))));
}

#[tokio::test]
async fn conflicting_invitations_create_no_rows() {
  let pool = common::pool().await;
  let alice = common::user(&pool, "alice@example.com").await;
  let bob = common::user(&pool, "bob@example.com").await;
  common::user(&pool, "carol@example.com").await;
  let project = common::project(&pool, &alice).await;
  common::join(&pool, &project, &alice, &bob, MembershipRole::Leader).await;
  invite(&pool, project.id, alice.id, "carol@example.com").await.unwrap();
  let before = common::count(&pool, COUNT_INVITATIONS, project.id).await;

  for (inviter, email) in [
    (alice.id, "alice@example.com"),
    (alice.id, "bob@example.com"),
    (alice.id, "carol@example.com"),
    (bob.id, "CAROL@example.com"),
    (bob.id, "alice@example.com"),
  ] {
    let result = invite(&pool, project.id, inviter, email).await;
    assert!(matches!(result, Err(ApiError::Conflict(_))), "{email}: {result:?}");
  }

  assert_eq!(common::count(&pool, COUNT_INVITATIONS, project.id).await, before);
}

#[tokio::test]
async fn invitation_guards_check_project_then_permission_then_invitee() {
  let pool = common::pool().await;
  let alice = common::user(&pool, "alice@example.com").await;
  let bob = common::user(&pool, "bob@example.com").await;
  common::user(&pool, "carol@example.com").await;
  let project = common::project(&pool, &alice).await;
  common::join(&pool, &project, &alice, &bob, MembershipRole::Member).await;

  let missing_project = invite(&pool, Uuid::new_v4(), alice.id, "carol@example.com").await;
  assert!(matches!(missing_project, Err(ApiError::ResourceNotFound(_))));

  let by_member = invite(&pool, project.id, bob.id, "nobody@example.com").await;
  assert!(matches!(by_member, Err(ApiError::Forbidden(_))));

  let unknown = invite(&pool, project.id, alice.id, "nobody@example.com").await;
  assert!(matches!(unknown, Err(ApiError::ResourceNotFound(_))));

  let listing = query::invitations::list_by_project(&pool, project.id, bob.id).await;
  assert!(matches!(listing, Err(ApiError::Forbidden(_))));
}

#[tokio::test]
async fn accept_rolls_back_when_membership_already_exists() {
  let pool = common::pool().await;
  let alice = common::user(&pool, "alice@example.com").await;
  let bob = common::user(&pool, "bob@example.com").await;
  let project = common::project(&pool, &alice).await;
  let invitation = invite(&pool, project.id, alice.id, "bob@example.com").await.unwrap();

  // Bob joins by some other path while the invitation is still pending.
  sqlx::query("INSERT INTO project_memberships (id, user_id, project_id, role) VALUES (?1, ?2, ?3, 'member')")
    .bind(Uuid::new_v4())
    .bind(bob.id)
    .bind(project.id)
    .execute(&pool)
    .await
    .unwrap();

  let result = mutation::invitations::accept(&pool, invitation.id, bob.id).await;
  assert!(matches!(result, Err(ApiError::Conflict(_))));

  let pending = query::invitations::list_by_invitee(&pool, bob.id).await.unwrap();
  assert_eq!(pending.len(), 1);
  assert_eq!(pending[0].status, InvitationStatus::Pending);
  assert_eq!(common::count(&pool, COUNT_MEMBERSHIPS, project.id).await, 1);
}

#[tokio::test]
async fn invitee_sees_pending_invitations_newest_first() {
  let pool = common::pool().await;
  let alice = common::user(&pool, "alice@example.com").await;
  let bob = common::user(&pool, "bob@example.com").await;
  let first = common::project(&pool, &alice).await;
  let second = common::project(&pool, &alice).await;
  invite(&pool, first.id, alice.id, "bob@example.com").await.unwrap();
  invite(&pool, second.id, alice.id, "bob@example.com").await.unwrap();

  let pending = query::invitations::list_by_invitee(&pool, bob.id).await.unwrap();

  let projects: Vec<Uuid> = pending.iter().map(|invitation| invitation.project_id).collect();
  assert_eq!(projects, vec![second.id, first.id]);

  let mut conn = pool.acquire().await.unwrap();
  assert!(!ledger::is_member(&mut conn, first.id, bob.id).await.unwrap());
}
