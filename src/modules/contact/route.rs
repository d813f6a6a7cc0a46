use crate::modules::contact::handle::*;
use actix_web::web::{scope, ServiceConfig};

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/contacts")
            .service(get_recommendations)
            .service(sync_contacts)
            .service(clear_contacts)
            .service(get_contacts),
    );
}
