use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use super::role::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Create,
    Update,
    Delete,
    /// Self-service `user -> author`.
    Upgrade,
    /// Admin-service `* -> admin`.
    Promote,
    Like,
    View,
    ListAll,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::Upgrade => "upgrade",
            Action::Promote => "promote",
            Action::Like => "like",
            Action::View => "view",
            Action::ListAll => "list_all",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Blog,
    Comment,
    /// A user profile, tagged with the role the account currently holds.
    Account(Role),
    /// Collection-wide listings (all users, all blogs).
    Directory,
}

/// The authenticated identity asking for something.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subject {
    pub id: Uuid,
    pub role: Role,
}

/// What the request touches and who owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    pub kind: ResourceKind,
    pub owner_id: Option<Uuid>,
}

impl Target {
    pub fn blog(owner_id: Uuid) -> Self {
        Self { kind: ResourceKind::Blog, owner_id: Some(owner_id) }
    }

    pub fn comment(owner_id: Uuid) -> Self {
        Self { kind: ResourceKind::Comment, owner_id: Some(owner_id) }
    }

    /// An account is owned by itself.
    pub fn account(user_id: Uuid, role: Role) -> Self {
        Self { kind: ResourceKind::Account(role), owner_id: Some(user_id) }
    }

    pub fn directory() -> Self {
        Self { kind: ResourceKind::Directory, owner_id: None }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DenyReason {
    #[error("you can only modify your own resources")]
    NotOwner,
    #[error("admin accounts cannot be deleted")]
    ProtectedAccount,
    #[error("account already holds this role or a higher one")]
    AlreadyPrivileged,
    #[error("your role does not permit this action")]
    InsufficientRole,
}

impl DenyReason {
    pub fn code(self) -> &'static str {
        match self {
            DenyReason::NotOwner => "not_owner",
            DenyReason::ProtectedAccount => "protected_account",
            DenyReason::AlreadyPrivileged => "already_privileged",
            DenyReason::InsufficientRole => "insufficient_role",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        matches!(self, Decision::Allow)
    }

    pub fn into_result(self) -> Result<(), DenyReason> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(reason) => Err(reason),
        }
    }
}

impl From<Result<Role, DenyReason>> for Decision {
    fn from(transition: Result<Role, DenyReason>) -> Self {
        match transition {
            Ok(_) => Decision::Allow,
            Err(reason) => Decision::Deny(reason),
        }
    }
}

/// Decides whether `subject` may perform `action` on `target`.
///
/// Role transitions (`Upgrade`, `Promote`) are checked against the role state
/// machine first. Everything else goes through, in order: admin override,
/// ownership, role gates, and finally a `NotOwner` denial.
pub fn authorize(subject: Subject, target: Target, action: Action) -> Decision {
    let owns = target.owner_id == Some(subject.id);

    match action {
        Action::Upgrade => {
            return match target.kind {
                ResourceKind::Account(_) if owns => subject.role.upgrade().into(),
                _ => Decision::Deny(DenyReason::NotOwner),
            };
        }
        Action::Promote => {
            if subject.role != Role::Admin {
                return Decision::Deny(DenyReason::InsufficientRole);
            }
            return match target.kind {
                ResourceKind::Account(current) => current.promote().into(),
                // only accounts carry a role
                _ => Decision::Deny(DenyReason::NotOwner),
            };
        }
        _ => {}
    }

    if subject.role == Role::Admin {
        let deletes_other_admin = action == Action::Delete
            && target.kind == ResourceKind::Account(Role::Admin)
            && !owns;
        if deletes_other_admin {
            return Decision::Deny(DenyReason::ProtectedAccount);
        }
        return Decision::Allow;
    }

    if owns && matches!(action, Action::Update | Action::Delete) {
        return Decision::Allow;
    }

    match (action, target.kind) {
        (Action::Create, ResourceKind::Blog) if subject.role.can_author() => Decision::Allow,
        (Action::Create, ResourceKind::Comment) => Decision::Allow,
        (Action::Create, _) => Decision::Deny(DenyReason::InsufficientRole),
        (Action::Like | Action::View, _) => Decision::Allow,
        (Action::ListAll, _) => Decision::Deny(DenyReason::InsufficientRole),
        _ => Decision::Deny(DenyReason::NotOwner),
    }
}
