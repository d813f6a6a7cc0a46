use uuid::Uuid;

/// One state per unordered user pair. Directional facts (who follows, who
/// requested, who blocked) live inside the variant, so inconsistent flag
/// combinations cannot be stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationState {
    None,
    FollowPending { follower: Uuid },
    Following { follower: Uuid },
    FriendPending { requested_by: Uuid, follower: Option<Uuid> },
    Friends,
    Blocked { blocked_by: Uuid },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationOp {
    Follow { requires_approval: bool },
    AcceptFollow,
    DeclineFollow,
    Unfollow,
    SendFriendRequest,
    AcceptFriendRequest,
    DeclineFriendRequest,
    CancelFriendRequest,
    Unfriend,
    Block,
    Unblock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionError {
    /// An active edge of the same kind already exists.
    AlreadyExists,
    Invalid(&'static str),
}

impl RelationState {
    pub fn is_blocked(&self) -> bool {
        matches!(self, RelationState::Blocked { .. })
    }

    /// Computes the state after `actor` performs `op`, or rejects the
    /// transition. Pure; the caller is responsible for persisting the result
    /// atomically. `actor == other` must be rejected before reaching here.
    pub fn apply(&self, actor: Uuid, op: RelationOp) -> Result<RelationState, TransitionError> {
        use RelationOp as Op;
        use RelationState as S;
        use TransitionError::{AlreadyExists, Invalid};

        match (self, op) {
            // Block wins over every other state. Unblock always lands on
            // None, never on the pre-block state.
            (S::Blocked { blocked_by }, Op::Unblock) if *blocked_by == actor => Ok(S::None),
            (S::Blocked { .. }, Op::Unblock) => {
                Err(Invalid("only the user who blocked can unblock"))
            }
            (S::Blocked { blocked_by }, Op::Block) if *blocked_by == actor => Err(AlreadyExists),
            (S::Blocked { .. }, _) => Err(Invalid("relationship is blocked")),
            (_, Op::Block) => Ok(S::Blocked { blocked_by: actor }),
            (_, Op::Unblock) => Err(Invalid("relationship is not blocked")),

            (S::None, Op::Follow { requires_approval: true }) => {
                Ok(S::FollowPending { follower: actor })
            }
            (S::None, Op::Follow { requires_approval: false }) => {
                Ok(S::Following { follower: actor })
            }
            (S::FollowPending { follower } | S::Following { follower }, Op::Follow { .. })
                if *follower == actor =>
            {
                Err(AlreadyExists)
            }
            (S::FollowPending { .. } | S::Following { .. }, Op::Follow { .. }) => {
                Err(Invalid("pair already has an active follow in the other direction"))
            }
            (_, Op::Follow { .. }) => Err(Invalid("cannot follow from the current state")),

            (S::FollowPending { follower }, Op::AcceptFollow) if *follower != actor => {
                Ok(S::Following { follower: *follower })
            }
            (S::FollowPending { .. }, Op::AcceptFollow) => {
                Err(Invalid("cannot accept your own follow request"))
            }
            (_, Op::AcceptFollow) => Err(Invalid("no pending follow request")),

            (S::FollowPending { follower }, Op::DeclineFollow) if *follower != actor => Ok(S::None),
            (S::FollowPending { .. }, Op::DeclineFollow) => {
                Err(Invalid("cannot decline your own follow request"))
            }
            (_, Op::DeclineFollow) => Err(Invalid("no pending follow request")),

            (S::FollowPending { follower } | S::Following { follower }, Op::Unfollow)
                if *follower == actor =>
            {
                Ok(S::None)
            }
            (_, Op::Unfollow) => Err(Invalid("not following this user")),

            (S::None, Op::SendFriendRequest) => {
                Ok(S::FriendPending { requested_by: actor, follower: None })
            }
            (S::Following { follower }, Op::SendFriendRequest) => {
                Ok(S::FriendPending { requested_by: actor, follower: Some(*follower) })
            }
            (S::FriendPending { .. } | S::Friends, Op::SendFriendRequest) => Err(AlreadyExists),
            (S::FollowPending { .. }, Op::SendFriendRequest) => {
                Err(Invalid("follow request is still pending"))
            }

            (S::FriendPending { requested_by, .. }, Op::AcceptFriendRequest)
                if *requested_by != actor =>
            {
                Ok(S::Friends)
            }
            (S::FriendPending { .. }, Op::AcceptFriendRequest) => {
                Err(Invalid("cannot accept your own friend request"))
            }
            (_, Op::AcceptFriendRequest) => Err(Invalid("no pending friend request")),

            // Declining or cancelling restores the follow that existed
            // before the request was sent, if any.
            (S::FriendPending { requested_by, follower }, Op::DeclineFriendRequest)
                if *requested_by != actor =>
            {
                Ok(follower.map_or(S::None, |f| S::Following { follower: f }))
            }
            (S::FriendPending { .. }, Op::DeclineFriendRequest) => {
                Err(Invalid("cannot decline your own friend request"))
            }
            (_, Op::DeclineFriendRequest) => Err(Invalid("no pending friend request")),

            (S::FriendPending { requested_by, follower }, Op::CancelFriendRequest)
                if *requested_by == actor =>
            {
                Ok(follower.map_or(S::None, |f| S::Following { follower: f }))
            }
            (S::FriendPending { .. }, Op::CancelFriendRequest) => {
                Err(Invalid("only the sender can cancel a friend request"))
            }
            (_, Op::CancelFriendRequest) => Err(Invalid("no pending friend request")),

            (S::Friends, Op::Unfriend) => Ok(S::None),
            (_, Op::Unfriend) => Err(Invalid("users are not friends")),
        }
    }
}
