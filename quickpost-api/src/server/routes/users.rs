use crate::server::{Result, ServerError, ServerRouter, auth::AuthenticatedUser, json::Json};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use quickpost_common::model::{
    Id,
    user::{User, UserMarker},
};
use quickpost_db::client::DbClient;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(list_users)
        .typed_get(get_user)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users", rejection(ServerError))]
struct UsersPath();

#[derive(Serialize)]
struct UserList {
    users: Vec<User>,
    total: usize,
}

async fn list_users(
    UsersPath(): UsersPath,
    State(db): State<Arc<DbClient>>,
    _: AuthenticatedUser,
) -> Json<UserList> {
    let users = db.fetch_users();

    Json(UserList {
        total: users.len(),
        users,
    })
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/{id}", rejection(ServerError))]
struct UserPath {
    id: String,
}

#[derive(Serialize)]
struct UserResponse {
    user: User,
}

async fn get_user(
    UserPath { id }: UserPath,
    State(db): State<Arc<DbClient>>,
    _: AuthenticatedUser,
) -> Result<Json<UserResponse>> {
    let id: Id<UserMarker> = id.parse().map_err(|_| ServerError::InvalidUserId)?;
    let user = db.fetch_user(id).ok_or(ServerError::UserByIdNotFound(id))?;

    Ok(Json(UserResponse { user }))
}
