use actix_web::{get, web, HttpRequest};
use uuid::Uuid;

use crate::{
    api::{error, success},
    middlewares::get_extensions,
    modules::user::{
        model::{SearchQuery, UserResponse},
        service::UserService,
    },
    utils::{Claims, ValidatedQuery},
};

#[get("/me")]
pub async fn get_me(
    user_service: web::Data<UserService>,
    req: HttpRequest,
) -> Result<success::Success<UserResponse>, error::Error> {
    let user_id = get_extensions::<Claims>(&req)?.sub;
    let user = user_service.get_by_id(user_id).await?;

    Ok(success::Success::ok(Some(user)))
}

#[get("/search")]
pub async fn search_users(
    user_service: web::Data<UserService>,
    query: ValidatedQuery<SearchQuery>,
) -> Result<success::Success<Vec<UserResponse>>, error::Error> {
    let users = user_service.search(&query.0.q, query.0.limit.unwrap_or(20)).await?;

    Ok(success::Success::ok(Some(users)))
}

#[get("/by-username/{username}")]
pub async fn get_user_by_username(
    user_service: web::Data<UserService>,
    username: web::Path<String>,
) -> Result<success::Success<UserResponse>, error::Error> {
    let user = user_service.get_by_username(&username).await?;

    Ok(success::Success::ok(Some(user)))
}

#[get("/{user_id}")]
pub async fn get_user(
    user_service: web::Data<UserService>,
    user_id: web::Path<Uuid>,
) -> Result<success::Success<UserResponse>, error::Error> {
    let user = user_service.get_by_id(*user_id).await?;

    Ok(success::Success::ok(Some(user)))
}
