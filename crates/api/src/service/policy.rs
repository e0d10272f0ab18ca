//! Pure authorization decisions.
//!
//! Nothing here touches the database: every function decides from a caller's
//! [`Standing`] in a project, which [`super::ledger`] loads from stored facts.

use uuid::Uuid;

use crate::entities::membership::MembershipRole;

/// Position of a user relative to one project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Standing {
  Owner,
  Leader,
  Member,
  Outsider,
}

impl Standing {
  /// Ownership wins over any membership row, so an owner is never reported as a member.
  pub fn resolve(owner_id: Uuid, user_id: Uuid, role: Option<MembershipRole>) -> Self {
    if owner_id == user_id {
      return Standing::Owner;
    }

    match role {
      Some(MembershipRole::Leader) => Standing::Leader,
      Some(MembershipRole::Member) => Standing::Member,
      None => Standing::Outsider,
    }
  }

  pub fn is_owner(self) -> bool {
    self == Standing::Owner
  }

  pub fn is_member(self) -> bool {
    matches!(self, Standing::Leader | Standing::Member)
  }

  pub fn role(self) -> Option<MembershipRole> {
    match self {
      Standing::Leader => Some(MembershipRole::Leader),
      Standing::Member => Some(MembershipRole::Member),
      Standing::Owner | Standing::Outsider => None,
    }
  }

  pub fn is_owner_or_leader(self) -> bool {
    matches!(self, Standing::Owner | Standing::Leader)
  }

  pub fn can_access(self) -> bool {
    self.is_owner() || self.is_member()
  }
}

/// Project-scoped operations guarded by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectAction {
  View,
  ListTasks,
  ListMembers,
  CreateTask,
  Edit,
  Delete,
  Invite,
  ViewInvitations,
  Kick,
  ChangeRole,
}

impl ProjectAction {
  pub fn denial(self) -> &'static str {
    match self {
      ProjectAction::View | ProjectAction::ListTasks | ProjectAction::ListMembers => "project is not accessible",
      ProjectAction::CreateTask => "cannot create tasks in this project",
      ProjectAction::Edit => "only project owner can edit project",
      ProjectAction::Delete => "only project owner can delete project",
      ProjectAction::Invite => "only project owner or leader can invite members",
      ProjectAction::ViewInvitations => "only project owner or leader can view invitations",
      ProjectAction::Kick => "only project owner or leader can remove members",
      ProjectAction::ChangeRole => "only project owner or leader can change roles",
    }
  }
}

pub fn permits(standing: Standing, action: ProjectAction) -> bool {
  match action {
    ProjectAction::View | ProjectAction::ListTasks | ProjectAction::ListMembers | ProjectAction::CreateTask => {
      standing.can_access()
    },
    ProjectAction::Edit | ProjectAction::Delete => standing.is_owner(),
    ProjectAction::Invite | ProjectAction::ViewInvitations | ProjectAction::Kick | ProjectAction::ChangeRole => {
      standing.is_owner_or_leader()
    },
  }
}

/// Memberships held by the owner's identity can never be kicked or re-roled.
pub fn can_alter_membership(owner_id: Uuid, target_user_id: Uuid) -> bool {
  owner_id != target_user_id
}

/// Viewing, editing, deleting or commenting on a task. `None` means the task is
/// detached from any project and only authentication is required.
pub fn can_touch_task(standing: Option<Standing>) -> bool {
  standing.is_none_or(Standing::can_access)
}

/// Reassignment needs owner or leader standing; detached tasks cannot be reassigned.
pub fn can_reassign_task(standing: Option<Standing>) -> bool {
  standing.is_some_and(Standing::is_owner_or_leader)
}

/// A task may be assigned only to the project owner or one of its members.
pub fn is_eligible_assignee(assignee: Standing) -> bool {
  assignee.can_access()
}

pub fn can_change_task_status(standing: Option<Standing>, assignee_id: Option<Uuid>, caller_id: Uuid) -> bool {
  assignee_id == Some(caller_id) || can_reassign_task(standing)
}
