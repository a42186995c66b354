//! Membership transitions on a room aggregate.
//!
//! Every function here mutates an in-memory `Room` only. Callers are responsible for the
//! ownership check (see `auth::auth`) and for saving the aggregate.

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::room::{Membership, Role, Room};

#[derive(Debug, Error, PartialEq)]
pub enum TransitionError {
    #[error("User '{0}' has no membership in this room")]
    NoEntry(String),

    #[error("User '{user_id}' is '{actual}', expected '{expected}'")]
    UnexpectedRole {
        user_id: String,
        expected: &'static str,
        actual: Role,
    },

    #[error("The room owner cannot be kicked")]
    OwnerNotKickable,

    #[error("The room owner's role can only change by transferring ownership")]
    OwnerRoleFixed,

    #[error("Role '{0}' cannot be assigned")]
    UnassignableRole(Role),
}

/// Result of a join call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// The creator joined their own room for the first time
    Owner,
    /// A new request is awaiting the owner's decision
    Pending,
    /// The user already had an entry; nothing changed
    Existing(Role),
}

impl JoinOutcome {
    pub fn role(&self) -> Role {
        match self {
            JoinOutcome::Owner => Role::Owner,
            JoinOutcome::Pending => Role::Pending,
            JoinOutcome::Existing(role) => *role,
        }
    }

    pub fn mutated(&self) -> bool {
        !matches!(self, JoinOutcome::Existing(_))
    }
}

/// Result of a role change
#[derive(Debug, Clone, PartialEq)]
pub struct RoleChange {
    pub user_id: String,
    pub previous: Role,
    pub current: Role,
    /// Set when ownership moved; holds the demoted previous owner
    pub previous_owner: Option<String>,
}

impl RoleChange {
    pub fn mutated(&self) -> bool {
        self.previous != self.current || self.previous_owner.is_some()
    }
}

impl Room {
    /// Join after the room credential has been verified.
    pub fn join(&mut self, user_id: &str, now: DateTime<Utc>) -> JoinOutcome {
        if let Some(existing) = self.membership(user_id) {
            return JoinOutcome::Existing(existing.role);
        }

        let (role, outcome) = if self.is_owner(user_id) {
            (Role::Owner, JoinOutcome::Owner)
        } else {
            (Role::Pending, JoinOutcome::Pending)
        };
        self.members.push(Membership {
            user_id: user_id.to_string(),
            role,
            added_at: now,
        });
        outcome
    }

    pub fn approve(&mut self, user_id: &str) -> Result<(), TransitionError> {
        let entry = self
            .membership_mut(user_id)
            .ok_or_else(|| TransitionError::NoEntry(user_id.to_string()))?;
        if entry.role != Role::Pending {
            return Err(TransitionError::UnexpectedRole {
                user_id: user_id.to_string(),
                expected: "pending",
                actual: entry.role,
            });
        }
        entry.role = Role::Member;
        Ok(())
    }

    pub fn reject(&mut self, user_id: &str) -> Result<Membership, TransitionError> {
        let idx = self.position(user_id)?;
        let role = self.members[idx].role;
        if role != Role::Pending {
            return Err(TransitionError::UnexpectedRole {
                user_id: user_id.to_string(),
                expected: "pending",
                actual: role,
            });
        }
        Ok(self.members.remove(idx))
    }

    pub fn kick(&mut self, user_id: &str) -> Result<Membership, TransitionError> {
        let idx = self.position(user_id)?;
        let role = self.members[idx].role;
        match role {
            Role::Owner => Err(TransitionError::OwnerNotKickable),
            Role::Pending => Err(TransitionError::UnexpectedRole {
                user_id: user_id.to_string(),
                expected: "member, editor or viewer",
                actual: Role::Pending,
            }),
            _ if self.is_owner(user_id) => Err(TransitionError::OwnerNotKickable),
            _ => Ok(self.members.remove(idx)),
        }
    }

    /// Overwrite a member's role in place.
    ///
    /// Assigning `owner` moves `owner_id` and demotes the previous owner's entry to `member` in the
    /// same aggregate. A pending entry may be assigned any role directly.
    pub fn change_role(&mut self, user_id: &str, new_role: Role) -> Result<RoleChange, TransitionError> {
        if new_role == Role::Pending {
            return Err(TransitionError::UnassignableRole(new_role));
        }
        let idx = self.position(user_id)?;
        let previous = self.members[idx].role;

        if self.is_owner(user_id) {
            if new_role == Role::Owner {
                // Repairs an entry that drifted from owner_id as a side effect.
                self.members[idx].role = Role::Owner;
                return Ok(RoleChange {
                    user_id: user_id.to_string(),
                    previous,
                    current: Role::Owner,
                    previous_owner: None,
                });
            }
            return Err(TransitionError::OwnerRoleFixed);
        }

        let mut previous_owner = None;
        if new_role == Role::Owner {
            let old_owner = std::mem::replace(&mut self.owner_id, user_id.to_string());
            if let Some(old_entry) = self.membership_mut(&old_owner) {
                old_entry.role = Role::Member;
            }
            previous_owner = Some(old_owner);
        }
        self.members[idx].role = new_role;

        Ok(RoleChange {
            user_id: user_id.to_string(),
            previous,
            current: new_role,
            previous_owner,
        })
    }

    fn position(&self, user_id: &str) -> Result<usize, TransitionError> {
        self.members
            .iter()
            .position(|m| m.user_id == user_id)
            .ok_or_else(|| TransitionError::NoEntry(user_id.to_string()))
    }
}
