use std::sync::Arc;

use uuid::Uuid;

use crate::{
    api::error,
    constants::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE},
    modules::{
        relation::{
            model::{
                Page, PageQuery, PendingCounts, RelationCursor, RelationPeer,
                RelationStatusResponse,
            },
            repository::{PendingKind, RelationRepo},
            state::RelationOp,
        },
        user::repository::UserRepository,
    },
};

#[derive(Clone)]
pub struct RelationService<R, U>
where
    R: RelationRepo + Send + Sync,
    U: UserRepository + Send + Sync,
{
    relation_repo: Arc<R>,
    user_repo: Arc<U>,
}

impl<R, U> RelationService<R, U>
where
    R: RelationRepo + Send + Sync,
    U: UserRepository + Send + Sync,
{
    pub fn with_dependencies(relation_repo: Arc<R>, user_repo: Arc<U>) -> Self {
        RelationService { relation_repo, user_repo }
    }

    fn ensure_other(me: Uuid, other: Uuid) -> Result<(), error::SystemError> {
        if me == other {
            return Err(error::SystemError::CannotActOnSelf);
        }
        Ok(())
    }

    async fn ensure_target_exists(&self, target: &Uuid) -> Result<bool, error::SystemError> {
        let user = self
            .user_repo
            .find_by_id(target)
            .await?
            .ok_or_else(|| error::SystemError::not_found("Target user not found"))?;
        Ok(user.is_private)
    }

    async fn transition(
        &self,
        me: Uuid,
        other: Uuid,
        op: RelationOp,
    ) -> Result<RelationStatusResponse, error::SystemError> {
        Self::ensure_other(me, other)?;
        let row = self.relation_repo.transition_atomic(&me, &other, &me, op).await?;
        RelationStatusResponse::from_entity(me, &row)
    }

    pub async fn follow(
        &self,
        me: Uuid,
        target: Uuid,
    ) -> Result<RelationStatusResponse, error::SystemError> {
        Self::ensure_other(me, target)?;
        let requires_approval = self.ensure_target_exists(&target).await?;
        self.transition(me, target, RelationOp::Follow { requires_approval }).await
    }

    pub async fn accept_follow_request(
        &self,
        me: Uuid,
        other: Uuid,
    ) -> Result<RelationStatusResponse, error::SystemError> {
        self.transition(me, other, RelationOp::AcceptFollow).await
    }

    pub async fn decline_follow_request(
        &self,
        me: Uuid,
        other: Uuid,
    ) -> Result<(), error::SystemError> {
        self.transition(me, other, RelationOp::DeclineFollow).await?;
        Ok(())
    }

    pub async fn unfollow(&self, me: Uuid, other: Uuid) -> Result<(), error::SystemError> {
        self.transition(me, other, RelationOp::Unfollow).await?;
        Ok(())
    }

    pub async fn send_friend_request(
        &self,
        me: Uuid,
        recipient: Uuid,
    ) -> Result<RelationStatusResponse, error::SystemError> {
        Self::ensure_other(me, recipient)?;
        self.ensure_target_exists(&recipient).await?;
        self.transition(me, recipient, RelationOp::SendFriendRequest).await
    }

    pub async fn accept_friend_request(
        &self,
        me: Uuid,
        other: Uuid,
    ) -> Result<RelationStatusResponse, error::SystemError> {
        self.transition(me, other, RelationOp::AcceptFriendRequest).await
    }

    pub async fn decline_friend_request(
        &self,
        me: Uuid,
        other: Uuid,
    ) -> Result<(), error::SystemError> {
        self.transition(me, other, RelationOp::DeclineFriendRequest).await?;
        Ok(())
    }

    pub async fn cancel_friend_request(
        &self,
        me: Uuid,
        other: Uuid,
    ) -> Result<(), error::SystemError> {
        self.transition(me, other, RelationOp::CancelFriendRequest).await?;
        Ok(())
    }

    pub async fn unfriend(&self, me: Uuid, other: Uuid) -> Result<(), error::SystemError> {
        self.transition(me, other, RelationOp::Unfriend).await?;
        Ok(())
    }

    pub async fn block(
        &self,
        me: Uuid,
        target: Uuid,
    ) -> Result<RelationStatusResponse, error::SystemError> {
        Self::ensure_other(me, target)?;
        self.ensure_target_exists(&target).await?;
        self.transition(me, target, RelationOp::Block).await
    }

    pub async fn unblock(&self, me: Uuid, other: Uuid) -> Result<(), error::SystemError> {
        self.transition(me, other, RelationOp::Unblock).await?;
        Ok(())
    }

    /// Current edge state with respect to the caller. An absent row reads as
    /// `none`, not as an error.
    pub async fn get_relation(
        &self,
        me: Uuid,
        other: Uuid,
    ) -> Result<RelationStatusResponse, error::SystemError> {
        Self::ensure_other(me, other)?;

        match self.relation_repo.find_by_pair(&me, &other).await? {
            Some(entity) => RelationStatusResponse::from_entity(me, &entity),
            None => Ok(RelationStatusResponse::none()),
        }
    }

    /// Full teardown of the edge row, history included.
    pub async fn delete_relation(&self, me: Uuid, other: Uuid) -> Result<(), error::SystemError> {
        Self::ensure_other(me, other)?;
        self.relation_repo.delete_by_pair(&me, &other).await?;
        Ok(())
    }

    pub async fn list_friends(
        &self,
        me: Uuid,
        query: &PageQuery,
    ) -> Result<Page<RelationPeer>, error::SystemError> {
        let (cursor, page_size) = parse_page(query)?;
        let items =
            self.relation_repo.list_friends(&me, cursor.as_ref(), page_size).await?;
        Ok(to_page(items, page_size))
    }

    pub async fn list_pending_requests(
        &self,
        me: Uuid,
        kind: PendingKind,
        query: &PageQuery,
    ) -> Result<Page<RelationPeer>, error::SystemError> {
        let (cursor, page_size) = parse_page(query)?;
        let items =
            self.relation_repo.list_pending(&me, kind, cursor.as_ref(), page_size).await?;
        Ok(to_page(items, page_size))
    }

    pub async fn pending_counts(&self, me: Uuid) -> Result<PendingCounts, error::SystemError> {
        self.relation_repo.count_pending(&me).await
    }
}

fn parse_page(query: &PageQuery) -> Result<(Option<RelationCursor>, i64), error::SystemError> {
    let cursor = query
        .cursor
        .as_deref()
        .map(str::parse::<RelationCursor>)
        .transpose()
        .map_err(|_| error::SystemError::bad_request("Malformed cursor"))?;

    let page_size = query.page_size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);

    Ok((cursor, page_size))
}

fn to_page(items: Vec<RelationPeer>, page_size: i64) -> Page<RelationPeer> {
    let next_cursor = if items.len() as i64 == page_size {
        items
            .last()
            .map(|peer| RelationCursor { created_at: peer.created_at, user_id: peer.user_id }
                .to_string())
    } else {
        None
    };

    Page { items, next_cursor }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, Utc};
    use std::collections::HashMap;
    use std::sync::Mutex;

    use crate::modules::relation::repository::{RelationQueryRepository, RelationRepository};
    use crate::modules::relation::schema::{
        normalize_pair, state_columns, RelationEntity, RelationKind,
    };
    use crate::modules::relation::state::RelationState;
    use crate::modules::user::schema::{UserEntity, UserRole};

    fn user(id: Uuid, is_private: bool) -> UserEntity {
        let now = Utc::now();
        UserEntity {
            id,
            username: format!("user-{}", &id.simple().to_string()[..8]),
            display_name: format!("User {}", &id.simple().to_string()[..4]),
            avatar_url: None,
            role: UserRole::User,
            is_private,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    struct InMemoryUserRepo {
        users: Mutex<HashMap<Uuid, UserEntity>>,
    }

    impl InMemoryUserRepo {
        fn with_users(users: impl IntoIterator<Item = UserEntity>) -> Self {
            InMemoryUserRepo {
                users: Mutex::new(users.into_iter().map(|u| (u.id, u)).collect()),
            }
        }
    }

    #[async_trait::async_trait]
    impl UserRepository for InMemoryUserRepo {
        async fn find_by_id(&self, id: &Uuid) -> Result<Option<UserEntity>, error::SystemError> {
            Ok(self.users.lock().unwrap().get(id).cloned())
        }

        async fn find_by_username(
            &self,
            username: &str,
        ) -> Result<Option<UserEntity>, error::SystemError> {
            Ok(self
                .users
                .lock()
                .unwrap()
                .values()
                .find(|u| u.username == username)
                .cloned())
        }

        async fn search_users(
            &self,
            query: &str,
            limit: i32,
        ) -> Result<Vec<UserEntity>, error::SystemError> {
            Ok(self
                .users
                .lock()
                .unwrap()
                .values()
                .filter(|u| u.username.contains(query))
                .take(limit as usize)
                .cloned()
                .collect())
        }
    }

    /// Mirrors the Postgres repository: one row per normalized pair, the
    /// pair's row lock claimed before the state is read and held across the
    /// write, `created_at` written once.
    struct InMemoryRelationRepo {
        rows: Mutex<HashMap<(Uuid, Uuid), RelationEntity>>,
        row_locks: Mutex<HashMap<(Uuid, Uuid), Arc<tokio::sync::Mutex<()>>>>,
        users: Mutex<HashMap<Uuid, UserEntity>>,
        tick: Mutex<i64>,
    }

    impl InMemoryRelationRepo {
        fn new(users: impl IntoIterator<Item = UserEntity>) -> Self {
            InMemoryRelationRepo {
                rows: Mutex::new(HashMap::new()),
                row_locks: Mutex::new(HashMap::new()),
                users: Mutex::new(users.into_iter().map(|u| (u.id, u)).collect()),
                tick: Mutex::new(0),
            }
        }

        fn mark_deleted(&self, id: &Uuid) {
            self.users.lock().unwrap().get_mut(id).unwrap().deleted_at = Some(Utc::now());
        }

        fn next_timestamp(&self) -> DateTime<Utc> {
            let mut tick = self.tick.lock().unwrap();
            *tick += 1;
            "2026-01-01T00:00:00Z".parse::<DateTime<Utc>>().unwrap() + Duration::seconds(*tick)
        }

        fn set_timestamp(&self, a: &Uuid, b: &Uuid, at: DateTime<Utc>) {
            let key = normalize_pair(a, b);
            self.rows.lock().unwrap().get_mut(&key).unwrap().created_at = at;
        }

        fn peer(&self, user_id: Uuid, created_at: DateTime<Utc>) -> RelationPeer {
            let users = self.users.lock().unwrap();
            let u = users.get(&user_id).unwrap();
            RelationPeer {
                user_id,
                username: u.username.clone(),
                display_name: u.display_name.clone(),
                avatar_url: u.avatar_url.clone(),
                created_at,
            }
        }

        fn is_live(&self, id: &Uuid) -> bool {
            self.users.lock().unwrap().get(id).is_some_and(|u| u.deleted_at.is_none())
        }

        fn collect_pending(
            &self,
            me: &Uuid,
            kind: RelationKind,
        ) -> Vec<(DateTime<Utc>, Uuid)> {
            self.rows
                .lock()
                .unwrap()
                .values()
                .filter(|r| r.user_a == *me || r.user_b == *me)
                .filter(|r| r.state == kind)
                .filter(|r| r.initiated_by != Some(*me))
                .map(|r| (r.created_at, r.initiated_by.unwrap()))
                .filter(|(_, sender)| self.is_live(sender))
                .collect()
        }
    }

    fn page_filter(
        mut edges: Vec<(DateTime<Utc>, Uuid)>,
        cursor: Option<&RelationCursor>,
        page_size: i64,
    ) -> Vec<(DateTime<Utc>, Uuid)> {
        edges.sort_by(|a, b| b.cmp(a));
        edges
            .into_iter()
            .filter(|(created_at, user_id)| match cursor {
                Some(c) => (*created_at, *user_id) < (c.created_at, c.user_id),
                None => true,
            })
            .take(page_size as usize)
            .collect()
    }

    #[async_trait::async_trait]
    impl RelationRepository for InMemoryRelationRepo {
        async fn find_by_pair(
            &self,
            user_id_a: &Uuid,
            user_id_b: &Uuid,
        ) -> Result<Option<RelationEntity>, error::SystemError> {
            let key = normalize_pair(user_id_a, user_id_b);
            Ok(self.rows.lock().unwrap().get(&key).cloned())
        }

        async fn delete_by_pair(
            &self,
            user_id_a: &Uuid,
            user_id_b: &Uuid,
        ) -> Result<bool, error::SystemError> {
            let key = normalize_pair(user_id_a, user_id_b);
            Ok(self.rows.lock().unwrap().remove(&key).is_some())
        }

        async fn transition_atomic(
            &self,
            user_id_a: &Uuid,
            user_id_b: &Uuid,
            actor: &Uuid,
            op: RelationOp,
        ) -> Result<RelationEntity, error::SystemError> {
            let key = normalize_pair(user_id_a, user_id_b);

            // claim the pair's lock before reading, like the claiming insert;
            // holding it across read and write is what keeps concurrent first
            // contacts from overwriting each other
            let row_lock = {
                let mut locks = self.row_locks.lock().unwrap();
                locks.entry(key).or_default().clone()
            };
            let _row = row_lock.lock().await;

            let current = match self.rows.lock().unwrap().get(&key) {
                Some(entity) => entity.state()?,
                None => RelationState::None,
            };

            let next = current.apply(*actor, op).map_err(error::SystemError::from)?;
            let (kind, initiated_by, prior_follower) = state_columns(&next);

            // the window between the locking read and the write
            tokio::task::yield_now().await;

            let created_at = self.next_timestamp();
            let mut rows = self.rows.lock().unwrap();
            let entity = rows
                .entry(key)
                .and_modify(|row| {
                    row.state = kind;
                    row.initiated_by = initiated_by;
                    row.prior_follower = prior_follower;
                    row.updated_at = created_at;
                })
                .or_insert(RelationEntity {
                    user_a: key.0,
                    user_b: key.1,
                    state: kind,
                    initiated_by,
                    prior_follower,
                    created_at,
                    updated_at: created_at,
                });

            Ok(entity.clone())
        }
    }

    #[async_trait::async_trait]
    impl RelationQueryRepository for InMemoryRelationRepo {
        async fn list_friends(
            &self,
            user_id: &Uuid,
            cursor: Option<&RelationCursor>,
            page_size: i64,
        ) -> Result<Vec<RelationPeer>, error::SystemError> {
            let edges: Vec<_> = self
                .rows
                .lock()
                .unwrap()
                .values()
                .filter(|r| r.user_a == *user_id || r.user_b == *user_id)
                .filter(|r| r.state == RelationKind::Friends)
                .map(|r| {
                    let other = if r.user_a == *user_id { r.user_b } else { r.user_a };
                    (r.created_at, other)
                })
                .filter(|(_, other)| self.is_live(other))
                .collect();

            Ok(page_filter(edges, cursor, page_size)
                .into_iter()
                .map(|(created_at, other)| self.peer(other, created_at))
                .collect())
        }

        async fn list_pending(
            &self,
            user_id: &Uuid,
            kind: PendingKind,
            cursor: Option<&RelationCursor>,
            page_size: i64,
        ) -> Result<Vec<RelationPeer>, error::SystemError> {
            let state = match kind {
                PendingKind::FriendRequests => RelationKind::FriendPending,
                PendingKind::FollowRequests => RelationKind::FollowPending,
            };
            let edges = self.collect_pending(user_id, state);

            Ok(page_filter(edges, cursor, page_size)
                .into_iter()
                .map(|(created_at, other)| self.peer(other, created_at))
                .collect())
        }

        async fn count_pending(
            &self,
            user_id: &Uuid,
        ) -> Result<PendingCounts, error::SystemError> {
            Ok(PendingCounts {
                friend_requests: self.collect_pending(user_id, RelationKind::FriendPending).len()
                    as i64,
                follow_requests: self.collect_pending(user_id, RelationKind::FollowPending).len()
                    as i64,
            })
        }
    }

    type Service = RelationService<InMemoryRelationRepo, InMemoryUserRepo>;

    fn service_with_users(users: Vec<UserEntity>) -> Service {
        let relation_repo = Arc::new(InMemoryRelationRepo::new(users.clone()));
        let user_repo = Arc::new(InMemoryUserRepo::with_users(users));
        RelationService::with_dependencies(relation_repo, user_repo)
    }

    fn two_users() -> (Service, Uuid, Uuid) {
        let a = Uuid::new_v7(uuid::Timestamp::now(uuid::NoContext));
        let b = Uuid::new_v7(uuid::Timestamp::now(uuid::NoContext));
        let service = service_with_users(vec![user(a, false), user(b, false)]);
        (service, a, b)
    }

    #[tokio::test]
    async fn self_actions_are_rejected() {
        let (service, a, _) = two_users();

        assert!(matches!(
            service.follow(a, a).await,
            Err(error::SystemError::CannotActOnSelf)
        ));
        assert!(matches!(
            service.send_friend_request(a, a).await,
            Err(error::SystemError::CannotActOnSelf)
        ));
        assert!(matches!(service.block(a, a).await, Err(error::SystemError::CannotActOnSelf)));
        assert!(matches!(
            service.get_relation(a, a).await,
            Err(error::SystemError::CannotActOnSelf)
        ));
    }

    #[tokio::test]
    async fn lookup_is_order_independent() {
        let (service, a, b) = two_users();
        service.follow(a, b).await.unwrap();

        let ab = service.relation_repo.find_by_pair(&a, &b).await.unwrap().unwrap();
        let ba = service.relation_repo.find_by_pair(&b, &a).await.unwrap().unwrap();
        assert_eq!(ab.user_a, ba.user_a);
        assert_eq!(ab.user_b, ba.user_b);
        assert_eq!(ab.state, ba.state);
    }

    #[tokio::test]
    async fn follow_to_friends_happy_path() {
        let (service, a, b) = two_users();

        let status = service.follow(a, b).await.unwrap();
        assert!(status.is_following);

        service.send_friend_request(a, b).await.unwrap();
        let status = service.accept_friend_request(b, a).await.unwrap();
        assert!(status.is_friend);

        let mine = service.get_relation(a, b).await.unwrap();
        assert_eq!(mine.state, RelationKind::Friends);
    }

    #[tokio::test]
    async fn follow_private_account_requires_approval() {
        let a = Uuid::new_v7(uuid::Timestamp::now(uuid::NoContext));
        let b = Uuid::new_v7(uuid::Timestamp::now(uuid::NoContext));
        let service = service_with_users(vec![user(a, false), user(b, true)]);

        let status = service.follow(a, b).await.unwrap();
        assert_eq!(status.state, RelationKind::FollowPending);
        assert!(status.request_pending && status.requested_by_me);

        let accepted = service.accept_follow_request(b, a).await.unwrap();
        assert_eq!(accepted.state, RelationKind::Following);
        assert!(accepted.is_followed_by);
    }

    #[tokio::test]
    async fn follow_unknown_target_is_not_found() {
        let (service, a, _) = two_users();
        let stranger = Uuid::new_v7(uuid::Timestamp::now(uuid::NoContext));

        assert!(matches!(
            service.follow(a, stranger).await,
            Err(error::SystemError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn duplicate_follow_conflicts() {
        let (service, a, b) = two_users();
        service.follow(a, b).await.unwrap();

        assert!(matches!(
            service.follow(a, b).await,
            Err(error::SystemError::RelationAlreadyExists)
        ));
    }

    #[tokio::test]
    async fn block_wipes_friendship_and_unblock_resets_to_none() {
        let (service, a, b) = two_users();
        service.send_friend_request(a, b).await.unwrap();
        service.accept_friend_request(b, a).await.unwrap();

        let blocked = service.block(a, b).await.unwrap();
        assert!(blocked.is_blocked);
        assert!(!blocked.is_friend && !blocked.is_following && !blocked.request_pending);

        assert!(matches!(
            service.unblock(b, a).await,
            Err(error::SystemError::InvalidTransition(_))
        ));
        service.unblock(a, b).await.unwrap();

        let after = service.get_relation(a, b).await.unwrap();
        assert_eq!(after.state, RelationKind::None);
        assert!(!after.is_friend && !after.is_following);
    }

    #[tokio::test]
    async fn friend_request_on_blocked_pair_is_invalid() {
        let (service, a, b) = two_users();
        service.block(a, b).await.unwrap();

        assert!(matches!(
            service.send_friend_request(b, a).await,
            Err(error::SystemError::InvalidTransition(_))
        ));
        assert!(matches!(
            service.follow(b, a).await,
            Err(error::SystemError::InvalidTransition(_))
        ));
    }

    #[tokio::test]
    async fn created_at_survives_every_transition() {
        let (service, a, b) = two_users();

        service.follow(a, b).await.unwrap();
        let first = service.relation_repo.find_by_pair(&a, &b).await.unwrap().unwrap();

        service.send_friend_request(a, b).await.unwrap();
        service.accept_friend_request(b, a).await.unwrap();
        service.unfriend(a, b).await.unwrap();

        let last = service.relation_repo.find_by_pair(&a, &b).await.unwrap().unwrap();
        assert_eq!(last.created_at, first.created_at);
        assert_eq!(last.state, RelationKind::None);
    }

    #[tokio::test]
    async fn decline_restores_the_previous_follow() {
        let (service, a, b) = two_users();
        service.follow(a, b).await.unwrap();
        service.send_friend_request(a, b).await.unwrap();

        service.decline_friend_request(b, a).await.unwrap();

        let status = service.get_relation(a, b).await.unwrap();
        assert_eq!(status.state, RelationKind::Following);
        assert!(status.is_following);
    }

    #[tokio::test]
    async fn delete_relation_removes_the_row() {
        let (service, a, b) = two_users();
        service.follow(a, b).await.unwrap();

        service.delete_relation(b, a).await.unwrap();
        assert!(service.relation_repo.find_by_pair(&a, &b).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn pending_request_pages_are_exhaustive_and_stable() {
        let me = Uuid::new_v7(uuid::Timestamp::now(uuid::NoContext));
        let mut users = vec![user(me, false)];
        let senders: Vec<Uuid> = (0..25)
            .map(|_| Uuid::new_v7(uuid::Timestamp::now(uuid::NoContext)))
            .collect();
        users.extend(senders.iter().map(|id| user(*id, false)));

        let service = service_with_users(users);
        for sender in &senders {
            service.send_friend_request(*sender, me).await.unwrap();
        }
        // force timestamp ties so the user-id tiebreaker matters
        let tie = "2026-01-02T00:00:00Z".parse().unwrap();
        for sender in senders.iter().take(5) {
            service.relation_repo.set_timestamp(sender, &me, tie);
        }

        let mut seen = Vec::new();
        let mut cursor: Option<String> = None;
        let mut pages = 0;
        loop {
            let query = PageQuery { cursor: cursor.clone(), page_size: Some(10) };
            let page = service
                .list_pending_requests(me, PendingKind::FriendRequests, &query)
                .await
                .unwrap();

            pages += 1;
            seen.extend(page.items.iter().map(|p| p.user_id));

            // descending (created_at, user_id) within and across pages
            let keys: Vec<_> =
                page.items.iter().map(|p| (p.created_at, p.user_id)).collect();
            let mut sorted = keys.clone();
            sorted.sort_by(|x, y| y.cmp(x));
            assert_eq!(keys, sorted);

            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        assert_eq!(pages, 3);
        assert_eq!(seen.len(), 25);
        let mut unique = seen.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), 25, "pages must not repeat items");

        let mut expected: Vec<Uuid> = senders.clone();
        expected.sort();
        assert_eq!(unique, expected, "pages must cover the whole pending set");
    }

    #[tokio::test]
    async fn pending_counts_split_by_kind() {
        let me = Uuid::new_v7(uuid::Timestamp::now(uuid::NoContext));
        let friend_sender = Uuid::new_v7(uuid::Timestamp::now(uuid::NoContext));
        let follower = Uuid::new_v7(uuid::Timestamp::now(uuid::NoContext));

        let service = service_with_users(vec![
            user(me, true),
            user(friend_sender, false),
            user(follower, false),
        ]);

        service.send_friend_request(friend_sender, me).await.unwrap();
        service.follow(follower, me).await.unwrap();

        let counts = service.pending_counts(me).await.unwrap();
        assert_eq!(counts.friend_requests, 1);
        assert_eq!(counts.follow_requests, 1);

        // requests I sent never show up in my own counts
        let counts = service.pending_counts(friend_sender).await.unwrap();
        assert_eq!(counts.friend_requests, 0);
    }

    #[tokio::test]
    async fn pending_counts_and_pages_skip_deleted_senders() {
        let me = Uuid::new_v7(uuid::Timestamp::now(uuid::NoContext));
        let kept = Uuid::new_v7(uuid::Timestamp::now(uuid::NoContext));
        let gone = Uuid::new_v7(uuid::Timestamp::now(uuid::NoContext));
        let service =
            service_with_users(vec![user(me, false), user(kept, false), user(gone, false)]);

        service.send_friend_request(kept, me).await.unwrap();
        service.send_friend_request(gone, me).await.unwrap();
        service.relation_repo.mark_deleted(&gone);

        let counts = service.pending_counts(me).await.unwrap();
        assert_eq!(counts.friend_requests, 1);

        let query = PageQuery { cursor: None, page_size: None };
        let page = service
            .list_pending_requests(me, PendingKind::FriendRequests, &query)
            .await
            .unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].user_id, kept, "count and page walk must agree");
    }

    #[tokio::test]
    async fn malformed_cursor_is_a_bad_request() {
        let (service, a, _) = two_users();
        let query = PageQuery { cursor: Some("garbage".into()), page_size: None };

        assert!(matches!(
            service.list_friends(a, &query).await,
            Err(error::SystemError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn concurrent_mutations_leave_one_consistent_state() {
        let (service, a, b) = two_users();
        let service = Arc::new(service);

        let s1 = service.clone();
        let s2 = service.clone();
        let block = tokio::spawn(async move { s1.block(a, b).await });
        let request = tokio::spawn(async move { s2.send_friend_request(b, a).await });

        let block_res = block.await.unwrap();
        let request_res = request.await.unwrap();

        // block always wins the pair; the friend request either landed first
        // (and was then wiped) or lost with a transition error
        assert!(block_res.is_ok());
        let final_state = service.get_relation(a, b).await.unwrap();
        assert_eq!(final_state.state, RelationKind::Blocked);
        assert!(final_state.is_blocked);

        if let Err(err) = request_res {
            assert!(matches!(err, error::SystemError::InvalidTransition(_)));
        }
    }

    #[tokio::test]
    async fn concurrent_first_contact_never_loses_a_block() {
        let (service, a, b) = two_users();
        let service = Arc::new(service);

        let s1 = service.clone();
        let s2 = service.clone();
        let block = tokio::spawn(async move { s1.block(a, b).await });
        let follow = tokio::spawn(async move { s2.follow(b, a).await });

        assert!(block.await.unwrap().is_ok());
        let follow_res = follow.await.unwrap();

        // the follow either landed first and was wiped by the block, or
        // serialized after it and was rejected; it must never overwrite the
        // committed block with a state computed from the empty pair
        let status = service.get_relation(a, b).await.unwrap();
        assert_eq!(status.state, RelationKind::Blocked);
        if let Err(err) = follow_res {
            assert!(matches!(err, error::SystemError::InvalidTransition(_)));
        }
    }

    #[tokio::test]
    async fn concurrent_duplicate_follows_commit_exactly_once() {
        let (service, a, b) = two_users();
        let service = Arc::new(service);

        let s1 = service.clone();
        let s2 = service.clone();
        let first = tokio::spawn(async move { s1.follow(a, b).await });
        let second = tokio::spawn(async move { s2.follow(a, b).await });

        let results = [first.await.unwrap(), second.await.unwrap()];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(error::SystemError::RelationAlreadyExists))));

        let status = service.get_relation(a, b).await.unwrap();
        assert_eq!(status.state, RelationKind::Following);
        assert!(status.is_following);
    }
}
