//! Who is calling, and may they touch this post.

use quickpost_common::{
    error::{AuthFailure, ErrorKind},
    model::{
        Id,
        auth::{TokenError, TokenService},
        post::{Post, PostMarker, PostValidationError},
        user::{User, UserMarker},
    },
};
use quickpost_db::client::DbClient;
use std::fmt::{Display, Formatter};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("No token provided. Include Authorization header with Bearer token.")]
    NoToken,
    #[error("Authorization header is not a bearer token.")]
    InvalidAuthorizationHeader,
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error("Token user {0} does not exist.")]
    UnknownUser(Id<UserMarker>),
}

impl AuthError {
    #[must_use]
    pub fn failure(&self) -> AuthFailure {
        match self {
            AuthError::NoToken => AuthFailure::NoToken,
            AuthError::InvalidAuthorizationHeader => AuthFailure::Malformed,
            AuthError::Token(error) => error.failure(),
            AuthError::UnknownUser(_) => AuthFailure::UnknownUser,
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Unauthenticated(self.failure())
    }
}

/// Verifies the bearer token and re-resolves its user, who may have vanished
/// since the token was issued.
pub fn authenticate(
    db: &DbClient,
    tokens: &TokenService,
    bearer: Option<&str>,
) -> Result<User, AuthError> {
    let token = bearer.ok_or(AuthError::NoToken)?;
    let claims = tokens.verify(token)?;

    db.fetch_user(claims.user_id())
        .ok_or(AuthError::UnknownUser(claims.user_id()))
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub enum PostAction {
    Edit,
    Delete,
}

impl Display for PostAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            PostAction::Edit => f.write_str("edit"),
            PostAction::Delete => f.write_str("delete"),
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Error)]
pub enum PostAccessError {
    #[error("Post with ID {0} does not exist.")]
    NotFound(Id<PostMarker>),
    #[error("You can only {0} your own posts.")]
    Forbidden(PostAction),
    #[error(transparent)]
    Invalid(#[from] PostValidationError),
}

impl PostAccessError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            PostAccessError::NotFound(_) => ErrorKind::NotFound,
            PostAccessError::Forbidden(_) => ErrorKind::Forbidden,
            PostAccessError::Invalid(error) => error.kind(),
        }
    }
}

pub fn authorize_owner_mutation(
    post: &Post,
    user_id: Id<UserMarker>,
    action: PostAction,
) -> Result<(), PostAccessError> {
    if post.author_id == user_id {
        Ok(())
    } else {
        Err(PostAccessError::Forbidden(action))
    }
}
