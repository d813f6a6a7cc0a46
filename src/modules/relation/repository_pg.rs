use uuid::Uuid;

use crate::api::error;
use crate::modules::relation::model::{PendingCounts, RelationCursor, RelationPeer};
use crate::modules::relation::repository::{
    PendingKind, RelationQueryRepository, RelationRepository,
};
use crate::modules::relation::schema::{normalize_pair, state_columns, RelationEntity};
use crate::modules::relation::state::RelationOp;

#[derive(Clone)]
pub struct RelationRepositoryPg {
    pool: sqlx::PgPool,
}

impl RelationRepositoryPg {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }

    async fn try_transition(
        &self,
        user_a: &Uuid,
        user_b: &Uuid,
        actor: &Uuid,
        op: RelationOp,
    ) -> Result<RelationEntity, error::SystemError> {
        let mut tx = self.pool.begin().await?;

        // Claim the pair row before reading. A bare SELECT ... FOR UPDATE
        // locks nothing when the row does not exist yet, so two first-contact
        // writers would both read `none` and the later commit would overwrite
        // the earlier one. The claiming insert makes the row lockable; a
        // writer racing an uncommitted claim waits here and then sees the
        // committed state. Rolls back with the transaction if the op is
        // rejected.
        sqlx::query(
            r#"
            INSERT INTO relations (user_a, user_b)
            VALUES ($1, $2)
            ON CONFLICT (user_a, user_b) DO NOTHING
            "#,
        )
        .bind(user_a)
        .bind(user_b)
        .execute(&mut *tx)
        .await?;

        let existing = sqlx::query_as::<_, RelationEntity>(
            "SELECT * FROM relations WHERE user_a = $1 AND user_b = $2 FOR UPDATE",
        )
        .bind(user_a)
        .bind(user_b)
        .fetch_one(&mut *tx)
        .await?;

        let next = existing
            .state()?
            .apply(*actor, op)
            .map_err(error::SystemError::from)?;
        let (kind, initiated_by, prior_follower) = state_columns(&next);

        // created_at is deliberately absent from the update list.
        let row = sqlx::query_as::<_, RelationEntity>(
            r#"
            UPDATE relations
            SET state = $3,
                initiated_by = $4,
                prior_follower = $5,
                updated_at = now()
            WHERE user_a = $1 AND user_b = $2
            RETURNING *
            "#,
        )
        .bind(user_a)
        .bind(user_b)
        .bind(kind)
        .bind(initiated_by)
        .bind(prior_follower)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(row)
    }
}

#[async_trait::async_trait]
impl RelationRepository for RelationRepositoryPg {
    async fn find_by_pair(
        &self,
        user_id_a: &Uuid,
        user_id_b: &Uuid,
    ) -> Result<Option<RelationEntity>, error::SystemError> {
        let (user_a, user_b) = normalize_pair(user_id_a, user_id_b);

        let relation = sqlx::query_as::<_, RelationEntity>(
            "SELECT * FROM relations WHERE user_a = $1 AND user_b = $2",
        )
        .bind(user_a)
        .bind(user_b)
        .fetch_optional(&self.pool)
        .await?;

        Ok(relation)
    }

    async fn delete_by_pair(
        &self,
        user_id_a: &Uuid,
        user_id_b: &Uuid,
    ) -> Result<bool, error::SystemError> {
        let (user_a, user_b) = normalize_pair(user_id_a, user_id_b);

        let rows = sqlx::query("DELETE FROM relations WHERE user_a = $1 AND user_b = $2")
            .bind(user_a)
            .bind(user_b)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(rows > 0)
    }

    async fn transition_atomic(
        &self,
        user_id_a: &Uuid,
        user_id_b: &Uuid,
        actor: &Uuid,
        op: RelationOp,
    ) -> Result<RelationEntity, error::SystemError> {
        let (user_a, user_b) = normalize_pair(user_id_a, user_id_b);

        match self.try_transition(&user_a, &user_b, actor, op).await {
            Err(err) if err.is_retryable() => {
                log::warn!("retrying relation transition on pair ({user_a}, {user_b}): {err}");
                self.try_transition(&user_a, &user_b, actor, op).await
            }
            other => other,
        }
    }
}

#[async_trait::async_trait]
impl RelationQueryRepository for RelationRepositoryPg {
    async fn list_friends(
        &self,
        user_id: &Uuid,
        cursor: Option<&RelationCursor>,
        page_size: i64,
    ) -> Result<Vec<RelationPeer>, error::SystemError> {
        let peers = sqlx::query_as::<_, RelationPeer>(
            r#"
            SELECT
                u.id AS user_id,
                u.username,
                u.display_name,
                u.avatar_url,
                r.created_at
            FROM relations r
            JOIN users u
                ON u.id = CASE
                    WHEN r.user_a = $1 THEN r.user_b
                    ELSE r.user_a
                END
            WHERE (r.user_a = $1 OR r.user_b = $1)
              AND r.state = 'friends'
              AND u.deleted_at IS NULL
              AND ($2::timestamptz IS NULL OR (r.created_at, u.id) < ($2, $3::uuid))
            ORDER BY r.created_at DESC, u.id DESC
            LIMIT $4
            "#,
        )
        .bind(user_id)
        .bind(cursor.map(|c| c.created_at))
        .bind(cursor.map(|c| c.user_id))
        .bind(page_size)
        .fetch_all(&self.pool)
        .await?;

        Ok(peers)
    }

    async fn list_pending(
        &self,
        user_id: &Uuid,
        kind: PendingKind,
        cursor: Option<&RelationCursor>,
        page_size: i64,
    ) -> Result<Vec<RelationPeer>, error::SystemError> {
        let state = match kind {
            PendingKind::FriendRequests => "friend_pending",
            PendingKind::FollowRequests => "follow_pending",
        };

        let peers = sqlx::query_as::<_, RelationPeer>(
            r#"
            SELECT
                u.id AS user_id,
                u.username,
                u.display_name,
                u.avatar_url,
                r.created_at
            FROM relations r
            JOIN users u ON u.id = r.initiated_by
            WHERE (r.user_a = $1 OR r.user_b = $1)
              AND r.state = $2::relation_state
              AND r.initiated_by <> $1
              AND u.deleted_at IS NULL
              AND ($3::timestamptz IS NULL OR (r.created_at, u.id) < ($3, $4::uuid))
            ORDER BY r.created_at DESC, u.id DESC
            LIMIT $5
            "#,
        )
        .bind(user_id)
        .bind(state)
        .bind(cursor.map(|c| c.created_at))
        .bind(cursor.map(|c| c.user_id))
        .bind(page_size)
        .fetch_all(&self.pool)
        .await?;

        Ok(peers)
    }

    async fn count_pending(&self, user_id: &Uuid) -> Result<PendingCounts, error::SystemError> {
        // same sender filters as list_pending, or the badge count could
        // exceed what a page walk returns
        let counts = sqlx::query_as::<_, PendingCounts>(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE r.state = 'friend_pending') AS friend_requests,
                COUNT(*) FILTER (WHERE r.state = 'follow_pending') AS follow_requests
            FROM relations r
            JOIN users u ON u.id = r.initiated_by AND u.deleted_at IS NULL
            WHERE (r.user_a = $1 OR r.user_b = $1)
              AND r.initiated_by <> $1
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(counts)
    }
}
