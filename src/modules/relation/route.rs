use crate::modules::relation::handle::*;
use actix_web::web::{scope, ServiceConfig};

pub fn configure(cfg: &mut ServiceConfig) {
    // static segments before the catch-all `/{user_id}` routes
    cfg.service(
        scope("/relations")
            .service(follow)
            .service(accept_follow_request)
            .service(decline_follow_request)
            .service(unfollow)
            .service(send_friend_request)
            .service(accept_friend_request)
            .service(decline_friend_request)
            .service(cancel_friend_request)
            .service(unfriend)
            .service(block_user)
            .service(unblock_user)
            .service(list_friends)
            .service(list_friend_requests)
            .service(list_follow_requests)
            .service(count_pending_requests)
            .service(get_relation)
            .service(delete_relation),
    );
}
