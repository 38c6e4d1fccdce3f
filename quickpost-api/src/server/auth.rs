use crate::{
    server::ServerError,
    service::access::{AuthError, authenticate},
};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use quickpost_common::model::{
    Id,
    auth::TokenService,
    user::{User, UserMarker},
};
use quickpost_db::client::DbClient;
use std::sync::Arc;
use tracing::debug;

type AuthorizationHeader = TypedHeader<Authorization<Bearer>>;

/// `Authorization: Bearer` with nothing after the scheme carries no token.
fn is_bare_bearer(parts: &Parts) -> bool {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| {
            let mut words = value.split_whitespace();
            matches!(
                (words.next(), words.next()),
                (Some(scheme), None) if scheme.eq_ignore_ascii_case("bearer")
            )
        })
}

/// The caller, resolved from a bearer token to a user that still exists.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct AuthenticatedUser(User);

impl AuthenticatedUser {
    #[must_use]
    pub fn user_id(&self) -> Id<UserMarker> {
        self.0.id
    }

    #[must_use]
    pub fn user(&self) -> &User {
        &self.0
    }
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Arc<DbClient>: FromRef<S>,
    Arc<TokenService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let header = match AuthorizationHeader::from_request_parts(parts, state).await {
            Ok(header) => Some(header),
            Err(_) if is_bare_bearer(parts) => None,
            Err(rejection) if rejection.is_missing() => None,
            Err(rejection) => {
                debug!(%rejection, "Unusable authorization header");
                return Err(AuthError::InvalidAuthorizationHeader.into());
            }
        };

        let db = Arc::<DbClient>::from_ref(state);
        let tokens = Arc::<TokenService>::from_ref(state);
        let token = header
            .as_ref()
            .map(|header| header.token().trim())
            .filter(|token| !token.is_empty());
        let user = authenticate(&db, &tokens, token)?;

        Ok(Self(user))
    }
}
