use uuid::Uuid;

use crate::api::error;
use crate::modules::relation::model::{PendingCounts, RelationCursor, RelationPeer};
use crate::modules::relation::schema::RelationEntity;
use crate::modules::relation::state::RelationOp;

/// Which pending edges a request listing covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingKind {
    FriendRequests,
    FollowRequests,
}

/// Persistence of relationship edges keyed by the normalized (sorted)
/// unordered pair. Implementations normalize argument order themselves; no
/// business rules live here.
#[async_trait::async_trait]
pub trait RelationRepository {
    async fn find_by_pair(
        &self,
        user_id_a: &Uuid,
        user_id_b: &Uuid,
    ) -> Result<Option<RelationEntity>, error::SystemError>;

    /// Full teardown of the edge row. Facet removal (unfollow, unfriend,
    /// unblock) goes through `transition_atomic` and resets to `none`
    /// instead.
    async fn delete_by_pair(
        &self,
        user_id_a: &Uuid,
        user_id_b: &Uuid,
    ) -> Result<bool, error::SystemError>;

    /// Claims the pair's row (so first contact is lockable), loads it under
    /// a row lock, applies `op` for `actor` and persists the result, all in
    /// one transaction. `created_at` on an existing row is never touched.
    /// Retries once internally on serialization or deadlock failures.
    async fn transition_atomic(
        &self,
        user_id_a: &Uuid,
        user_id_b: &Uuid,
        actor: &Uuid,
        op: RelationOp,
    ) -> Result<RelationEntity, error::SystemError>;
}

#[async_trait::async_trait]
pub trait RelationQueryRepository {
    async fn list_friends(
        &self,
        user_id: &Uuid,
        cursor: Option<&RelationCursor>,
        page_size: i64,
    ) -> Result<Vec<RelationPeer>, error::SystemError>;

    /// Incoming pending requests of the given kind, ordered
    /// `(created_at DESC, user_id DESC)`.
    async fn list_pending(
        &self,
        user_id: &Uuid,
        kind: PendingKind,
        cursor: Option<&RelationCursor>,
        page_size: i64,
    ) -> Result<Vec<RelationPeer>, error::SystemError>;

    async fn count_pending(&self, user_id: &Uuid) -> Result<PendingCounts, error::SystemError>;
}

pub trait RelationRepo: RelationRepository + RelationQueryRepository + Send + Sync {}

impl<T: RelationRepository + RelationQueryRepository + Send + Sync> RelationRepo for T {}
