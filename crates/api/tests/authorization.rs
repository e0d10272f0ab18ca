mod common;

use planhive_api::{
  entities::membership::MembershipRole,
  error::ApiError,
  service::{ledger, mutation, policy::Standing, query},
};
use rstest::rstest;
use uuid::Uuid;

#[tokio::test]
async fn owner_has_access_without_membership_row() {
  let pool = common::pool().await;
  let alice = common::user(&pool, "alice@example.com").await;
  let project = common::project(&pool, &alice).await;
  let mut conn = pool.acquire().await.unwrap();

  assert!(ledger::is_owner(&mut conn, project.id, alice.id).await.unwrap());
  assert!(!ledger::is_member(&mut conn, project.id, alice.id).await.unwrap());
  assert!(ledger::can_access(&mut conn, project.id, alice.id).await.unwrap());
  assert_eq!(ledger::role_of(&mut conn, project.id, alice.id).await.unwrap(), None);
  assert_eq!(
    ledger::standing(&mut conn, project.id, alice.id).await.unwrap(),
    Some(Standing::Owner)
  );
}

#[tokio::test]
async fn access_follows_ownership_or_membership() {
  let pool = common::pool().await;
  let alice = common::user(&pool, "alice@example.com").await;
  let bob = common::user(&pool, "bob@example.com").await;
  let carol = common::user(&pool, "carol@example.com").await;
  let project = common::project(&pool, &alice).await;
  common::join(&pool, &project, &alice, &bob, MembershipRole::Member).await;
  let mut conn = pool.acquire().await.unwrap();

  assert!(ledger::can_access(&mut conn, project.id, bob.id).await.unwrap());
  assert!(!ledger::is_owner_or_leader(&mut conn, project.id, bob.id).await.unwrap());
  assert!(!ledger::can_access(&mut conn, project.id, carol.id).await.unwrap());
  assert_eq!(
    ledger::standing(&mut conn, Uuid::new_v4(), alice.id).await.unwrap(),
    None
  );
}

#[tokio::test]
async fn get_project_reports_missing_and_denied_separately() {
  let pool = common::pool().await;
  let alice = common::user(&pool, "alice@example.com").await;
  let carol = common::user(&pool, "carol@example.com").await;
  let project = common::project(&pool, &alice).await;

  let fetched = query::projects::get(&pool, project.id, alice.id).await.unwrap();
  assert_eq!(fetched.owner.id, alice.id);

  let denied = query::projects::get(&pool, project.id, carol.id).await;
  assert!(matches!(denied, Err(ApiError::Forbidden(_))));

  let missing = query::projects::get(&pool, Uuid::new_v4(), alice.id).await;
  assert!(matches!(missing, Err(ApiError::ResourceNotFound(_))));
}

#[tokio::test]
async fn project_list_contains_owned_and_joined_projects() {
  let pool = common::pool().await;
  let alice = common::user(&pool, "alice@example.com").await;
  let bob = common::user(&pool, "bob@example.com").await;
  let owned = common::project(&pool, &bob).await;
  let joined = common::project(&pool, &alice).await;
  let foreign = common::project(&pool, &alice).await;
  common::join(&pool, &joined, &alice, &bob, MembershipRole::Member).await;

  let ids: Vec<Uuid> = query::projects::list_accessible(&pool, bob.id)
    .await
    .unwrap()
    .into_iter()
    .map(|project| project.id)
    .collect();

  assert_eq!(ids.len(), 2);
  assert!(ids.contains(&owned.id));
  assert!(ids.contains(&joined.id));
  assert!(!ids.contains(&foreign.id));
}

#[tokio::test]
async fn project_list_breaks_timestamp_ties_by_insertion() {
  let pool = common::pool().await;
  let alice = common::user(&pool, "alice@example.com").await;
  let first = common::project(&pool, &alice).await;
  let second = common::project(&pool, &alice).await;
  let third = common::project(&pool, &alice).await;

  sqlx::query("UPDATE projects SET created_at = ?1")
    .bind(first.created_at)
    .execute(&pool)
    .await
    .unwrap();

  let ids: Vec<Uuid> = query::projects::list_accessible(&pool, alice.id)
    .await
    .unwrap()
    .into_iter()
    .map(|project| project.id)
    .collect();

  assert_eq!(ids, vec![third.id, second.id, first.id]);
}

#[rstest]
#[case::leader(MembershipRole::Leader)]
#[case::member(MembershipRole::Member)]
#[tokio::test]
async fn only_owner_edits_and_deletes_project(#[case] role: MembershipRole) {
  let pool = common::pool().await;
  let alice = common::user(&pool, "alice@example.com").await;
  let bob = common::user(&pool, "bob@example.com").await;
  let project = common::project(&pool, &alice).await;
  common::join(&pool, &project, &alice, &bob, role).await;

  let params = mutation::projects::UpdateProjectParams {
    name: Some("Gemini".to_string()),
    ..Default::default()
  };
  let denied = mutation::projects::update(&pool, project.id, bob.id, params.clone()).await;
  assert!(matches!(denied, Err(ApiError::Forbidden(_))));
  let denied = mutation::projects::delete(&pool, project.id, bob.id).await;
  assert!(matches!(denied, Err(ApiError::Forbidden(_))));

  let updated = mutation::projects::update(&pool, project.id, alice.id, params).await.unwrap();
  assert_eq!(updated.name, "Gemini");
  assert_eq!(updated.final_deadline, project.final_deadline);
}

#[tokio::test]
async fn member_cannot_kick_but_owner_can() {
  let pool = common::pool().await;
  let alice = common::user(&pool, "alice@example.com").await;
  let bob = common::user(&pool, "bob@example.com").await;
  let dave = common::user(&pool, "dave@example.com").await;
  let project = common::project(&pool, &alice).await;
  let bob_membership = common::join(&pool, &project, &alice, &bob, MembershipRole::Member).await;
  let dave_membership = common::join(&pool, &project, &alice, &dave, MembershipRole::Member).await;

  let denied = mutation::memberships::kick(&pool, dave_membership.id, bob.id).await;
  assert!(matches!(denied, Err(ApiError::Forbidden(_))));

  mutation::memberships::kick(&pool, bob_membership.id, alice.id).await.unwrap();
  let mut conn = pool.acquire().await.unwrap();
  assert!(!ledger::can_access(&mut conn, project.id, bob.id).await.unwrap());
  drop(conn);

  let again = mutation::memberships::kick(&pool, bob_membership.id, alice.id).await;
  assert!(matches!(again, Err(ApiError::ResourceNotFound(_))));
}

#[tokio::test]
async fn leader_manages_members() {
  let pool = common::pool().await;
  let alice = common::user(&pool, "alice@example.com").await;
  let bob = common::user(&pool, "bob@example.com").await;
  let dave = common::user(&pool, "dave@example.com").await;
  let project = common::project(&pool, &alice).await;
  let bob_membership = common::join(&pool, &project, &alice, &bob, MembershipRole::Member).await;

  let promoted = mutation::memberships::set_role(&pool, bob_membership.id, alice.id, MembershipRole::Leader)
    .await
    .unwrap();
  assert_eq!(promoted.role, MembershipRole::Leader);
  assert_eq!(promoted.user.id, bob.id);

  let dave_membership = common::join(&pool, &project, &bob, &dave, MembershipRole::Member).await;
  mutation::memberships::kick(&pool, dave_membership.id, bob.id).await.unwrap();

  let members = query::memberships::list_by_project(&pool, project.id, alice.id).await.unwrap();
  assert_eq!(members.len(), 1);
  assert_eq!(members[0].user.id, bob.id);
}

#[tokio::test]
async fn owner_membership_cannot_be_altered() {
  let pool = common::pool().await;
  let alice = common::user(&pool, "alice@example.com").await;
  let project = common::project(&pool, &alice).await;

  // An owner row can only exist through direct writes to the store.
  let stray = Uuid::new_v4();
  sqlx::query("INSERT INTO project_memberships (id, user_id, project_id, role) VALUES (?1, ?2, ?3, 'member')")
    .bind(stray)
    .bind(alice.id)
    .bind(project.id)
    .execute(&pool)
    .await
    .unwrap();

  let kick = mutation::memberships::kick(&pool, stray, alice.id).await;
  assert!(matches!(kick, Err(ApiError::Conflict(_))));

  let set_role = mutation::memberships::set_role(&pool, stray, alice.id, MembershipRole::Leader).await;
  assert!(matches!(set_role, Err(ApiError::Conflict(_))));
}

#[tokio::test]
async fn deleting_project_removes_everything_in_it() {
  let pool = common::pool().await;
  let alice = common::user(&pool, "alice@example.com").await;
  let bob = common::user(&pool, "bob@example.com").await;
  let carol = common::user(&pool, "carol@example.com").await;
  let project = common::project(&pool, &alice).await;
  common::join(&pool, &project, &alice, &bob, MembershipRole::Member).await;
  mutation::invitations::create(
    &pool,
    alice.id,
    mutation::invitations::CreateInvitationParams {
      project_id: project.id,
      invitee_email: carol.email.clone(),
      role: MembershipRole::Member,
    },
  )
  .await
  .unwrap();
  let parent = common::task(&pool, &alice, &project, None).await;
  let child = common::task(&pool, &bob, &project, Some(parent.id)).await;
  mutation::comments::create(
    &pool,
    bob.id,
    mutation::comments::CreateCommentParams {
      text: "on it".to_string(),
      task_id: child.id,
    },
  )
  .await
  .unwrap();

  mutation::projects::delete(&pool, project.id, alice.id).await.unwrap();

  for sql in [
    "SELECT COUNT(*) FROM projects WHERE id = ?1",
    "SELECT COUNT(*) FROM tasks WHERE project_id = ?1",
    "SELECT COUNT(*) FROM project_memberships WHERE project_id = ?1",
    "SELECT COUNT(*) FROM project_invitations WHERE project_id = ?1",
  ] {
    assert_eq!(common::count(&pool, sql, project.id).await, 0, "{sql}");
  }
  assert_eq!(
    common::count(&pool, "SELECT COUNT(*) FROM comments WHERE task_id = ?1", child.id).await,
    0
  );
}

#[tokio::test]
async fn deleting_user_removes_owned_projects_and_unassigns_tasks() {
  let pool = common::pool().await;
  let alice = common::user(&pool, "alice@example.com").await;
  let bob = common::user(&pool, "bob@example.com").await;
  let alices_project = common::project(&pool, &alice).await;
  let bobs_project = common::project(&pool, &bob).await;
  common::join(&pool, &alices_project, &alice, &bob, MembershipRole::Member).await;
  let assigned = common::task(&pool, &bob, &alices_project, None).await;
  assert_eq!(assigned.assigned_to_id, Some(bob.id));

  mutation::users::delete(&pool, bob.id).await.unwrap();

  assert!(query::users::find_by_id(&pool, bob.id).await.unwrap().is_none());
  assert_eq!(
    common::count(&pool, "SELECT COUNT(*) FROM projects WHERE id = ?1", bobs_project.id).await,
    0
  );
  assert_eq!(
    common::count(&pool, "SELECT COUNT(*) FROM project_memberships WHERE user_id = ?1", bob.id).await,
    0
  );

  let task = query::tasks::get(&pool, assigned.id, alice.id).await.unwrap();
  assert_eq!(task.assigned_to_id, None);
  assert!(task.assigned_to.is_none());
}

#[tokio::test]
async fn deleting_unknown_user_is_not_found() {
  let pool = common::pool().await;

  let result = mutation::users::delete(&pool, Uuid::new_v4()).await;

  assert!(matches!(result, Err(ApiError::ResourceNotFound(_))));
}
