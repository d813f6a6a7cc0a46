use actix_web::{delete, get, put, web, HttpRequest};

use crate::{
    api::{error, success},
    configs::RedisCache,
    middlewares::get_extensions,
    modules::contact::{
        model::{ContactRecommendation, SyncContactsBody},
        repository_pg::ContactRepositoryPg,
        service::ContactService,
    },
    utils::{Claims, ValidatedJson},
};

pub type ContactSvc = ContactService<ContactRepositoryPg, RedisCache>;

#[put("")]
pub async fn sync_contacts(
    contact_service: web::Data<ContactSvc>,
    body: ValidatedJson<SyncContactsBody>,
    req: HttpRequest,
) -> Result<success::Success<()>, error::Error> {
    let me = get_extensions::<Claims>(&req)?.sub;
    contact_service.sync_contacts(me, body.0.hashed_phone_numbers).await?;

    Ok(success::Success::no_content())
}

#[delete("")]
pub async fn clear_contacts(
    contact_service: web::Data<ContactSvc>,
    req: HttpRequest,
) -> Result<success::Success<()>, error::Error> {
    let me = get_extensions::<Claims>(&req)?.sub;
    contact_service.clear_contacts(me).await?;

    Ok(success::Success::no_content())
}

#[get("")]
pub async fn get_contacts(
    contact_service: web::Data<ContactSvc>,
    req: HttpRequest,
) -> Result<success::Success<Vec<String>>, error::Error> {
    let me = get_extensions::<Claims>(&req)?.sub;
    let contacts = contact_service.get_contacts(me).await?;

    Ok(success::Success::ok(Some(contacts)))
}

#[get("/recommendations")]
pub async fn get_recommendations(
    contact_service: web::Data<ContactSvc>,
    req: HttpRequest,
) -> Result<success::Success<Vec<ContactRecommendation>>, error::Error> {
    let me = get_extensions::<Claims>(&req)?.sub;
    let recommendations = contact_service.get_recommendations(me).await?;

    Ok(success::Success::ok(Some(recommendations)))
}
