use crate::modules::user::handle::*;
use actix_web::web::{scope, ServiceConfig};

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/users")
            .service(get_me)
            .service(search_users)
            .service(get_user_by_username)
            .service(get_user),
    );
}
