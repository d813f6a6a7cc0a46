use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

use crate::modules::relation::schema::{RelationEntity, RelationKind};
use crate::modules::relation::state::RelationState;

/// Keyset cursor over `(created_at DESC, user_id DESC)`. Serialized as
/// `<rfc3339 timestamp>~<uuid>` so ties on the timestamp paginate stably.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationCursor {
    pub created_at: DateTime<Utc>,
    pub user_id: Uuid,
}

impl FromStr for RelationCursor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (date_str, user_str) = s.split_once('~').ok_or("invalid cursor format")?;

        let created_at = date_str.parse::<DateTime<Utc>>().map_err(|e| e.to_string())?;
        let user_id = Uuid::parse_str(user_str).map_err(|e| e.to_string())?;

        Ok(RelationCursor { created_at, user_id })
    }
}

impl fmt::Display for RelationCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let created_at = self.created_at.to_rfc3339_opts(SecondsFormat::Micros, true);
        write!(f, "{}~{}", created_at, self.user_id)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    pub cursor: Option<String>,
    #[validate(range(min = 1, max = 100))]
    pub page_size: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T: Serialize> {
    pub items: Vec<T>,
    /// Present iff a full page came back; feed it into the next request.
    pub next_cursor: Option<String>,
}

/// The other side of an edge plus the edge timestamp, as listed in friend
/// and pending-request pages.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RelationPeer {
    pub user_id: Uuid,
    pub username: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PendingCounts {
    pub friend_requests: i64,
    pub follow_requests: i64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TargetBody {
    pub target_id: Uuid,
}

/// Relationship between the caller and another user, from the caller's
/// point of view. An absent edge row is reported as `none`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationStatusResponse {
    pub state: RelationKind,
    pub is_friend: bool,
    /// Caller follows the other user.
    pub is_following: bool,
    /// The other user follows the caller.
    pub is_followed_by: bool,
    /// Caller blocked the other user.
    pub is_blocked: bool,
    pub request_pending: bool,
    pub requested_by_me: bool,
    pub created_at: Option<DateTime<Utc>>,
}

impl RelationStatusResponse {
    pub fn none() -> Self {
        RelationStatusResponse {
            state: RelationKind::None,
            is_friend: false,
            is_following: false,
            is_followed_by: false,
            is_blocked: false,
            request_pending: false,
            requested_by_me: false,
            created_at: None,
        }
    }

    pub fn from_entity(
        me: Uuid,
        entity: &RelationEntity,
    ) -> Result<Self, crate::api::error::SystemError> {
        let state = entity.state()?;

        let mut res = RelationStatusResponse::none();
        res.state = entity.state;
        res.created_at = Some(entity.created_at);

        match state {
            RelationState::None => {}
            RelationState::FollowPending { follower } => {
                res.request_pending = true;
                res.requested_by_me = follower == me;
            }
            RelationState::Following { follower } => {
                res.is_following = follower == me;
                res.is_followed_by = follower != me;
            }
            RelationState::FriendPending { requested_by, follower } => {
                res.request_pending = true;
                res.requested_by_me = requested_by == me;
                res.is_following = follower == Some(me);
                res.is_followed_by = follower.is_some() && follower != Some(me);
            }
            RelationState::Friends => res.is_friend = true,
            RelationState::Blocked { blocked_by } => res.is_blocked = blocked_by == me,
        }

        Ok(res)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_roundtrips_through_string_form() {
        let cursor = RelationCursor {
            created_at: "2026-08-01T10:30:00.123456Z".parse().unwrap(),
            user_id: Uuid::new_v7(uuid::Timestamp::now(uuid::NoContext)),
        };

        let parsed: RelationCursor = cursor.to_string().parse().unwrap();
        assert_eq!(parsed, cursor);
    }

    #[test]
    fn malformed_cursors_are_rejected() {
        assert!("not-a-cursor".parse::<RelationCursor>().is_err());
        assert!("2026-08-01T10:30:00Z~not-a-uuid".parse::<RelationCursor>().is_err());
        assert!("yesterday~00000000-0000-0000-0000-000000000000"
            .parse::<RelationCursor>()
            .is_err());
    }

    #[test]
    fn status_reflects_direction_of_follow() {
        let me = Uuid::new_v7(uuid::Timestamp::now(uuid::NoContext));
        let other = Uuid::new_v7(uuid::Timestamp::now(uuid::NoContext));
        let (user_a, user_b) = crate::modules::relation::schema::normalize_pair(&me, &other);
        let now = chrono::Utc::now();

        let entity = RelationEntity {
            user_a,
            user_b,
            state: RelationKind::Following,
            initiated_by: Some(me),
            prior_follower: None,
            created_at: now,
            updated_at: now,
        };

        let mine = RelationStatusResponse::from_entity(me, &entity).unwrap();
        assert!(mine.is_following && !mine.is_followed_by);

        let theirs = RelationStatusResponse::from_entity(other, &entity).unwrap();
        assert!(!theirs.is_following && theirs.is_followed_by);
    }
}
