/// User API endpoints
use crate::{
    context::AppContext,
    db::models::{UserPatch, UserRow},
    error::WaypointResult,
    users::CreateUser,
};
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

/// Build user routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/users", post(create_user))
        .route("/users/:user_id", get(get_user).patch(update_user))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub nickname: String,
    pub phone: Option<String>,
    pub qq: Option<String>,
    pub wechat: Option<String>,
}

async fn create_user(
    State(ctx): State<AppContext>,
    Json(req): Json<CreateUserRequest>,
) -> WaypointResult<Json<UserRow>> {
    let user = ctx
        .users
        .create_user(CreateUser {
            nickname: req.nickname,
            phone: req.phone,
            qq: req.qq,
            wechat: req.wechat,
        })
        .await?;
    Ok(Json(user))
}

async fn get_user(
    State(ctx): State<AppContext>,
    Path(user_id): Path<String>,
) -> WaypointResult<Json<UserRow>> {
    let user = ctx.users.get_user(&user_id).await?;
    Ok(Json(user))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub nickname: Option<String>,
    pub phone: Option<String>,
    pub qq: Option<String>,
    pub wechat: Option<String>,
}

async fn update_user(
    State(ctx): State<AppContext>,
    Path(user_id): Path<String>,
    Json(req): Json<UpdateUserRequest>,
) -> WaypointResult<Json<UserRow>> {
    let user = ctx
        .users
        .update_user(
            &user_id,
            UserPatch {
                nickname: req.nickname,
                phone: req.phone,
                qq: req.qq,
                wechat: req.wechat,
            },
        )
        .await?;
    Ok(Json(user))
}
