use crate::{
    config::AppMode,
    service::{
        access::{AuthError, PostAccessError},
        accounts::AccountError,
    },
};
use axum::{
    Router,
    extract::{
        FromRef, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{Method, StatusCode, Uri},
    middleware,
    response::{IntoResponse, Response},
};
use json::Json;
use quickpost_common::{
    error::{AuthFailure, ErrorKind},
    model::{Id, auth::TokenService, user::UserMarker},
};
use quickpost_db::{client::DbClient, seed::SeedError};
use serde::Serialize;
use std::{sync::Arc, time::Instant};
use thiserror::Error;
use tokio::task::JoinError;
use tower_http::trace::TraceLayer;
use tracing::{debug, error};

mod auth;
mod json;
mod query;
mod routes;

pub use routes::AVAILABLE_ROUTES;

pub type ServerRouter = Router<ServerState>;

#[derive(Copy, Clone, Debug)]
pub struct ServerInfo {
    pub mode: AppMode,
    pub started_at: Instant,
}

impl ServerInfo {
    #[must_use]
    pub fn new(mode: AppMode) -> Self {
        Self {
            mode,
            started_at: Instant::now(),
        }
    }
}

#[derive(Clone, Debug, FromRef)]
pub struct ServerState {
    pub db_client: Arc<DbClient>,
    pub tokens: Arc<TokenService>,
    pub info: ServerInfo,
}

/// The complete application, ready to be served.
pub fn app(state: ServerState) -> Router {
    finish(routes::routes(), state)
}

fn finish(router: ServerRouter, state: ServerState) -> Router {
    router
        .fallback(fallback)
        .method_not_allowed_fallback(fallback)
        .layer(middleware::map_response_with_state(
            state.info,
            reveal_internal_detail,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn fallback(method: Method, uri: Uri) -> ServerError {
    ServerError::UnknownRoute(method, uri)
}

pub type Result<T, E = ServerError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Route {0} {1} not found.")]
    UnknownRoute(Method, Uri),
    #[error("Path rejected: {0}")]
    PathRejection(#[from] PathRejection),
    #[error("Incoming JSON rejected: {0}")]
    JsonRejection(#[from] JsonRejection),
    #[error("Query string rejected: {0}")]
    QueryRejection(#[from] QueryRejection),
    #[error("JSON response could not be serialized: {0}")]
    JsonResponse(#[from] serde_json::Error),
    #[error("Post ID must be a valid number.")]
    InvalidPostId,
    #[error("User ID must be a valid number.")]
    InvalidUserId,
    #[error("Author ID must be a valid number.")]
    InvalidAuthorId,
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Account(#[from] AccountError),
    #[error(transparent)]
    PostAccess(#[from] PostAccessError),
    #[error("User with ID {0} does not exist.")]
    UserByIdNotFound(Id<UserMarker>),
    #[error("Resetting the demo data failed: {0}")]
    Seed(#[from] SeedError),
    #[error("Blocking task failed: {0}")]
    BlockingTask(#[from] JoinError),
}

const INTERNAL_ERROR_TITLE: &str = "Internal server error";
const INTERNAL_ERROR_MESSAGE: &str = "Something went wrong.";

impl ServerError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServerError::UnknownRoute(..) | ServerError::UserByIdNotFound(_) => ErrorKind::NotFound,
            ServerError::PathRejection(_)
            | ServerError::JsonRejection(_)
            | ServerError::QueryRejection(_)
            | ServerError::InvalidPostId
            | ServerError::InvalidUserId
            | ServerError::InvalidAuthorId => ErrorKind::InvalidInput,
            ServerError::Auth(error) => error.kind(),
            ServerError::Account(error) => error.kind(),
            ServerError::PostAccess(error) => error.kind(),
            ServerError::JsonResponse(_) | ServerError::Seed(_) | ServerError::BlockingTask(_) => {
                ErrorKind::Internal
            }
        }
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::InvalidCredentials | ErrorKind::Unauthenticated(_) => {
                StatusCode::UNAUTHORIZED
            }
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label for the `error` field of the response body.
    fn title(&self) -> &'static str {
        match self {
            ServerError::UnknownRoute(..) => "Not found",
            ServerError::PathRejection(_)
            | ServerError::JsonRejection(_)
            | ServerError::QueryRejection(_) => "Bad request",
            ServerError::InvalidPostId => "Invalid post ID",
            ServerError::InvalidUserId => "Invalid user ID",
            ServerError::InvalidAuthorId => "Invalid author ID",
            ServerError::Auth(error) => match error.failure() {
                AuthFailure::NoToken => "Access denied",
                AuthFailure::Expired => "Token expired",
                AuthFailure::Malformed => "Invalid token",
                AuthFailure::UnknownUser => "User not found",
            },
            ServerError::Account(error) => match error {
                AccountError::MissingCredentials | AccountError::InvalidCredentials => {
                    "Authentication error"
                }
                AccountError::InvalidRegistration(_) | AccountError::Conflict => {
                    "Validation error"
                }
                AccountError::PasswordHash(_) | AccountError::TokenEncode(_) => {
                    INTERNAL_ERROR_TITLE
                }
            },
            ServerError::PostAccess(PostAccessError::NotFound(_)) => "Post not found",
            ServerError::PostAccess(_) => "Validation error",
            ServerError::UserByIdNotFound(_) => "User not found",
            ServerError::JsonResponse(_) | ServerError::Seed(_) | ServerError::BlockingTask(_) => {
                INTERNAL_ERROR_TITLE
            }
        }
    }

    /// What the client is told. Internal details stay in the logs.
    fn public_message(&self) -> String {
        match self {
            ServerError::Auth(error) => match error.failure() {
                AuthFailure::NoToken => {
                    "No token provided. Include Authorization header with Bearer token."
                }
                AuthFailure::Expired => "Please login again.",
                AuthFailure::Malformed => "Token format is invalid.",
                AuthFailure::UnknownUser => "Token user does not exist.",
            }
            .to_owned(),
            error if error.kind() == ErrorKind::Internal => INTERNAL_ERROR_MESSAGE.to_owned(),
            error => error.to_string(),
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorResponse {
    status: u16,
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    available_routes: Option<&'static [&'static str]>,
}

/// Full text of an internal error, attached to the response so that
/// [`reveal_internal_detail`] can decide whether the client may see it.
#[derive(Clone, Debug)]
struct InternalErrorDetail(String);

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let internal = !self.kind().is_client_error();

        if internal {
            error!(error = %self, %status, "Replying with internal error");
        } else {
            debug!(error = %self, %status, "Replying with client error");
        }

        let available_routes =
            matches!(self, ServerError::UnknownRoute(..)).then_some(AVAILABLE_ROUTES);
        let error_response = ErrorResponse {
            status: status.as_u16(),
            error: self.title(),
            message: self.public_message(),
            available_routes,
        };

        let mut response = (status, Json(error_response)).into_response();
        if internal {
            response
                .extensions_mut()
                .insert(InternalErrorDetail(self.to_string()));
        }
        response
    }
}

async fn reveal_internal_detail(State(info): State<ServerInfo>, mut response: Response) -> Response {
    let Some(InternalErrorDetail(detail)) = response.extensions_mut().remove() else {
        return response;
    };
    if info.mode != AppMode::Development {
        return response;
    }

    let status = response.status();
    let error_response = ErrorResponse {
        status: status.as_u16(),
        error: INTERNAL_ERROR_TITLE,
        message: detail,
        available_routes: None,
    };
    (status, Json(error_response)).into_response()
}
