use crate::server::ServerRouter;
use axum::Router;

mod auth;
mod posts;
mod system;
mod users;

/// Listed in the body of every unknown-route reply.
pub const AVAILABLE_ROUTES: &[&str] = &[
    "GET /",
    "GET /health",
    "POST /auth/register",
    "POST /auth/login",
    "GET /users",
    "GET /users/{id}",
    "GET /posts",
    "GET /posts/{id}",
    "POST /posts",
    "PUT /posts/{id}",
    "DELETE /posts/{id}",
    "POST /reset",
    "POST /clear",
];

pub fn routes() -> ServerRouter {
    Router::new()
        .merge(system::routes())
        .merge(auth::routes())
        .merge(users::routes())
        .merge(posts::routes())
}
