use serde::{Deserialize, Serialize};
use sqlx::prelude::{FromRow, Type};
use uuid::Uuid;

use crate::api::error;
use crate::modules::relation::state::RelationState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(type_name = "relation_state", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    None,
    FollowPending,
    Following,
    FriendPending,
    Friends,
    Blocked,
}

/// One row per unordered user pair, `user_a < user_b`. `initiated_by` is the
/// follower, requester or blocker depending on `state`; `prior_follower`
/// keeps the follow edge to restore when a friend request is declined or
/// cancelled. `created_at` is written once and never updated.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct RelationEntity {
    pub user_a: Uuid,
    pub user_b: Uuid,
    pub state: RelationKind,
    pub initiated_by: Option<Uuid>,
    pub prior_follower: Option<Uuid>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

pub fn normalize_pair(a: &Uuid, b: &Uuid) -> (Uuid, Uuid) {
    if a <= b {
        (*a, *b)
    } else {
        (*b, *a)
    }
}

impl RelationEntity {
    pub fn state(&self) -> Result<RelationState, error::SystemError> {
        let corrupt =
            || error::SystemError::DatabaseError("relation row has inconsistent columns".into());

        Ok(match self.state {
            RelationKind::None => RelationState::None,
            RelationKind::FollowPending => {
                RelationState::FollowPending { follower: self.initiated_by.ok_or_else(corrupt)? }
            }
            RelationKind::Following => {
                RelationState::Following { follower: self.initiated_by.ok_or_else(corrupt)? }
            }
            RelationKind::FriendPending => RelationState::FriendPending {
                requested_by: self.initiated_by.ok_or_else(corrupt)?,
                follower: self.prior_follower,
            },
            RelationKind::Friends => RelationState::Friends,
            RelationKind::Blocked => {
                RelationState::Blocked { blocked_by: self.initiated_by.ok_or_else(corrupt)? }
            }
        })
    }
}

/// Column triple `(state, initiated_by, prior_follower)` for persisting a
/// state.
pub fn state_columns(state: &RelationState) -> (RelationKind, Option<Uuid>, Option<Uuid>) {
    match state {
        RelationState::None => (RelationKind::None, None, None),
        RelationState::FollowPending { follower } => {
            (RelationKind::FollowPending, Some(*follower), None)
        }
        RelationState::Following { follower } => (RelationKind::Following, Some(*follower), None),
        RelationState::FriendPending { requested_by, follower } => {
            (RelationKind::FriendPending, Some(*requested_by), *follower)
        }
        RelationState::Friends => (RelationKind::Friends, None, None),
        RelationState::Blocked { blocked_by } => (RelationKind::Blocked, Some(*blocked_by), None),
    }
}
