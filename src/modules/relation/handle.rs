use actix_web::{delete, get, post, web, HttpRequest};
use uuid::Uuid;

use crate::{
    api::{error, success},
    middlewares::get_extensions,
    modules::{
        relation::{
            model::{
                Page, PageQuery, PendingCounts, RelationPeer, RelationStatusResponse, TargetBody,
            },
            repository::PendingKind,
            repository_pg::RelationRepositoryPg,
            service::RelationService,
        },
        user::repository_pg::UserRepositoryPg,
    },
    utils::{Claims, ValidatedJson, ValidatedQuery},
};

pub type RelationSvc = RelationService<RelationRepositoryPg, UserRepositoryPg>;

#[post("/follow")]
pub async fn follow(
    relation_service: web::Data<RelationSvc>,
    body: ValidatedJson<TargetBody>,
    req: HttpRequest,
) -> Result<success::Success<RelationStatusResponse>, error::Error> {
    let me = get_extensions::<Claims>(&req)?.sub;
    let status = relation_service.follow(me, body.0.target_id).await?;

    Ok(success::Success::created(Some(status)))
}

#[post("/follow/accept")]
pub async fn accept_follow_request(
    relation_service: web::Data<RelationSvc>,
    body: ValidatedJson<TargetBody>,
    req: HttpRequest,
) -> Result<success::Success<RelationStatusResponse>, error::Error> {
    let me = get_extensions::<Claims>(&req)?.sub;
    let status = relation_service.accept_follow_request(me, body.0.target_id).await?;

    Ok(success::Success::ok(Some(status)).message("Follow request accepted"))
}

#[post("/follow/decline")]
pub async fn decline_follow_request(
    relation_service: web::Data<RelationSvc>,
    body: ValidatedJson<TargetBody>,
    req: HttpRequest,
) -> Result<success::Success<()>, error::Error> {
    let me = get_extensions::<Claims>(&req)?.sub;
    relation_service.decline_follow_request(me, body.0.target_id).await?;

    Ok(success::Success::no_content())
}

#[delete("/follow/{user_id}")]
pub async fn unfollow(
    relation_service: web::Data<RelationSvc>,
    user_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<()>, error::Error> {
    let me = get_extensions::<Claims>(&req)?.sub;
    relation_service.unfollow(me, *user_id).await?;

    Ok(success::Success::no_content())
}

#[post("/requests")]
pub async fn send_friend_request(
    relation_service: web::Data<RelationSvc>,
    body: ValidatedJson<TargetBody>,
    req: HttpRequest,
) -> Result<success::Success<RelationStatusResponse>, error::Error> {
    let me = get_extensions::<Claims>(&req)?.sub;
    let status = relation_service.send_friend_request(me, body.0.target_id).await?;

    Ok(success::Success::created(Some(status)).message("Friend request sent successfully"))
}

#[post("/requests/accept")]
pub async fn accept_friend_request(
    relation_service: web::Data<RelationSvc>,
    body: ValidatedJson<TargetBody>,
    req: HttpRequest,
) -> Result<success::Success<RelationStatusResponse>, error::Error> {
    let me = get_extensions::<Claims>(&req)?.sub;
    let status = relation_service.accept_friend_request(me, body.0.target_id).await?;

    Ok(success::Success::ok(Some(status)).message("Friend request accepted successfully"))
}

#[post("/requests/decline")]
pub async fn decline_friend_request(
    relation_service: web::Data<RelationSvc>,
    body: ValidatedJson<TargetBody>,
    req: HttpRequest,
) -> Result<success::Success<()>, error::Error> {
    let me = get_extensions::<Claims>(&req)?.sub;
    relation_service.decline_friend_request(me, body.0.target_id).await?;

    Ok(success::Success::no_content())
}

#[post("/requests/cancel")]
pub async fn cancel_friend_request(
    relation_service: web::Data<RelationSvc>,
    body: ValidatedJson<TargetBody>,
    req: HttpRequest,
) -> Result<success::Success<()>, error::Error> {
    let me = get_extensions::<Claims>(&req)?.sub;
    relation_service.cancel_friend_request(me, body.0.target_id).await?;

    Ok(success::Success::no_content())
}

#[delete("/friends/{user_id}")]
pub async fn unfriend(
    relation_service: web::Data<RelationSvc>,
    user_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<()>, error::Error> {
    let me = get_extensions::<Claims>(&req)?.sub;
    relation_service.unfriend(me, *user_id).await?;

    Ok(success::Success::no_content())
}

#[post("/block")]
pub async fn block_user(
    relation_service: web::Data<RelationSvc>,
    body: ValidatedJson<TargetBody>,
    req: HttpRequest,
) -> Result<success::Success<RelationStatusResponse>, error::Error> {
    let me = get_extensions::<Claims>(&req)?.sub;
    let status = relation_service.block(me, body.0.target_id).await?;

    Ok(success::Success::ok(Some(status)).message("User blocked"))
}

#[post("/unblock")]
pub async fn unblock_user(
    relation_service: web::Data<RelationSvc>,
    body: ValidatedJson<TargetBody>,
    req: HttpRequest,
) -> Result<success::Success<()>, error::Error> {
    let me = get_extensions::<Claims>(&req)?.sub;
    relation_service.unblock(me, body.0.target_id).await?;

    Ok(success::Success::no_content())
}

#[get("/friends")]
pub async fn list_friends(
    relation_service: web::Data<RelationSvc>,
    query: ValidatedQuery<PageQuery>,
    req: HttpRequest,
) -> Result<success::Success<Page<RelationPeer>>, error::Error> {
    let me = get_extensions::<Claims>(&req)?.sub;
    let page = relation_service.list_friends(me, &query.0).await?;

    Ok(success::Success::ok(Some(page)))
}

#[get("/requests/friends")]
pub async fn list_friend_requests(
    relation_service: web::Data<RelationSvc>,
    query: ValidatedQuery<PageQuery>,
    req: HttpRequest,
) -> Result<success::Success<Page<RelationPeer>>, error::Error> {
    let me = get_extensions::<Claims>(&req)?.sub;
    let page =
        relation_service.list_pending_requests(me, PendingKind::FriendRequests, &query.0).await?;

    Ok(success::Success::ok(Some(page)))
}

#[get("/requests/follows")]
pub async fn list_follow_requests(
    relation_service: web::Data<RelationSvc>,
    query: ValidatedQuery<PageQuery>,
    req: HttpRequest,
) -> Result<success::Success<Page<RelationPeer>>, error::Error> {
    let me = get_extensions::<Claims>(&req)?.sub;
    let page =
        relation_service.list_pending_requests(me, PendingKind::FollowRequests, &query.0).await?;

    Ok(success::Success::ok(Some(page)))
}

#[get("/requests/count")]
pub async fn count_pending_requests(
    relation_service: web::Data<RelationSvc>,
    req: HttpRequest,
) -> Result<success::Success<PendingCounts>, error::Error> {
    let me = get_extensions::<Claims>(&req)?.sub;
    let counts = relation_service.pending_counts(me).await?;

    Ok(success::Success::ok(Some(counts)))
}

#[get("/{user_id}")]
pub async fn get_relation(
    relation_service: web::Data<RelationSvc>,
    user_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<RelationStatusResponse>, error::Error> {
    let me = get_extensions::<Claims>(&req)?.sub;
    let status = relation_service.get_relation(me, *user_id).await?;

    Ok(success::Success::ok(Some(status)))
}

#[delete("/{user_id}")]
pub async fn delete_relation(
    relation_service: web::Data<RelationSvc>,
    user_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<()>, error::Error> {
    let me = get_extensions::<Claims>(&req)?.sub;
    relation_service.delete_relation(me, *user_id).await?;

    Ok(success::Success::no_content())
}
