use crate::{
    server::{
        Result, ServerError, ServerRouter,
        json::{Created, Json, lenient_string},
    },
    service::accounts::{self, Session},
};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use quickpost_common::model::{
    auth::{AuthToken, TokenService},
    user::User,
};
use quickpost_db::client::DbClient;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::task::spawn_blocking;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_post(register)
        .typed_post(login)
}

/// Missing, `null` and non-string fields deserialize as empty so that
/// validation reports them.
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
struct RegisterRequest {
    #[serde(deserialize_with = "lenient_string")]
    username: String,
    #[serde(deserialize_with = "lenient_string")]
    email: String,
    #[serde(deserialize_with = "lenient_string")]
    password: String,
}

#[derive(Clone, Default, Deserialize)]
#[serde(default)]
struct LoginRequest {
    #[serde(deserialize_with = "lenient_string")]
    username: String,
    #[serde(deserialize_with = "lenient_string")]
    password: String,
}

#[derive(Clone, Debug, Serialize)]
struct SessionResponse {
    message: &'static str,
    user: User,
    token: AuthToken,
}

impl SessionResponse {
    fn new(message: &'static str, Session { user, token }: Session) -> Self {
        Self {
            message,
            user,
            token,
        }
    }
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/auth/register", rejection(ServerError))]
struct RegisterPath();

async fn register(
    RegisterPath(): RegisterPath,
    State(db): State<Arc<DbClient>>,
    State(tokens): State<Arc<TokenService>>,
    Json(request): Json<RegisterRequest>,
) -> Result<Created<SessionResponse>> {
    // Argon2 blocks the thread.
    let session = spawn_blocking(move || {
        accounts::register(
            &db,
            &tokens,
            &request.username,
            &request.email,
            &request.password,
        )
    })
    .await??;

    Ok(Created(SessionResponse::new(
        "User registered successfully",
        session,
    )))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/auth/login", rejection(ServerError))]
struct LoginPath();

async fn login(
    LoginPath(): LoginPath,
    State(db): State<Arc<DbClient>>,
    State(tokens): State<Arc<TokenService>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<SessionResponse>> {
    let session =
        spawn_blocking(move || accounts::login(&db, &tokens, &request.username, &request.password))
            .await??;

    Ok(Json(SessionResponse::new("Login successful", session)))
}
