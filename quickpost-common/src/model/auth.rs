//! Stateless identity tokens.
//!
//! Tokens are compact JWS strings (`header.claims.signature`, unpadded
//! base64url) signed with HMAC-SHA256. Nothing is stored server side: a token
//! is valid while its signature checks out and its expiry has not passed.

use crate::{
    error::{AuthFailure, ErrorKind},
    model::{Id, user::UserMarker},
};
use base64::{DecodeError, Engine, prelude::BASE64_URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt::{Debug, Formatter};
use thiserror::Error;
use time::{Duration, OffsetDateTime};

pub const DEFAULT_TOKEN_LIFETIME: Duration = Duration::hours(24);
pub const MAX_TOKEN_LIFETIME: Duration = Duration::days(3650);
pub const TOKEN_ALGORITHM: &str = "HS256";

type HmacSha256 = Hmac<Sha256>;

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Error)]
pub enum InvalidTokenLifetimeError {
    #[error("Token lifetime must be positive, got {0}")]
    NotPositive(Duration),
    #[error("Token lifetime must be at most 3650 days, got {0}")]
    TooLong(Duration),
}

/// How long an issued token stays valid. Positive and at most
/// [`MAX_TOKEN_LIFETIME`].
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub struct TokenLifetime(Duration);

impl TokenLifetime {
    pub const DEFAULT: Self = Self(DEFAULT_TOKEN_LIFETIME);

    pub fn new(duration: Duration) -> Result<Self, InvalidTokenLifetimeError> {
        if duration > MAX_TOKEN_LIFETIME {
            Err(InvalidTokenLifetimeError::TooLong(duration))
        } else if duration.is_positive() {
            Ok(Self(duration))
        } else {
            Err(InvalidTokenLifetimeError::NotPositive(duration))
        }
    }

    pub fn from_hours(hours: u32) -> Result<Self, InvalidTokenLifetimeError> {
        Self::new(Duration::hours(i64::from(hours)))
    }

    #[must_use]
    pub fn get(self) -> Duration {
        self.0
    }
}

impl Default for TokenLifetime {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Error)]
pub enum SigningKeyError {
    #[error("The token signing secret must not be empty")]
    Empty,
    #[error("The token signing secret was rejected")]
    Rejected,
}

#[derive(Debug, Error)]
pub enum MalformedTokenError {
    #[error("Expected three parts separated by '.'")]
    WrongPartCount,
    #[error("Decoding base64 failed: {0}")]
    Decode(#[from] DecodeError),
    #[error("Token section is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unsupported token algorithm {0:?}")]
    UnsupportedAlgorithm(String),
    #[error("Signature does not match")]
    BadSignature,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Token expired")]
    Expired,
    #[error("Token format is invalid: {0}")]
    Malformed(#[from] MalformedTokenError),
}

impl TokenError {
    #[must_use]
    pub fn failure(&self) -> AuthFailure {
        match self {
            TokenError::Expired => AuthFailure::Expired,
            TokenError::Malformed(_) => AuthFailure::Malformed,
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Unauthenticated(self.failure())
    }
}

#[derive(Debug, Error)]
pub enum TokenEncodeError {
    #[error("Token claims could not be encoded: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Token expiry is out of range when issued at {0}")]
    ExpiryOutOfRange(OffsetDateTime),
}

#[derive(Clone, Eq, PartialEq, Debug, Deserialize)]
struct Header {
    alg: String,
}

/// Identity asserted by a token. Times are Unix seconds.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize, Deserialize)]
pub struct Claims {
    pub id: Id<UserMarker>,
    pub username: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    #[must_use]
    pub fn user_id(&self) -> Id<UserMarker> {
        self.id
    }

    #[must_use]
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        now.unix_timestamp() > self.exp
    }
}

/// An encoded token as handed to clients.
#[derive(Clone, Eq, PartialEq, Hash, Serialize)]
#[serde(transparent)]
pub struct AuthToken(String);

impl AuthToken {
    #[must_use]
    pub fn as_token_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Debug for AuthToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("AuthToken").field(&"[redacted]").finish()
    }
}

/// Issues and verifies tokens with one process-wide key.
#[derive(Clone)]
pub struct TokenService {
    mac: HmacSha256,
    lifetime: TokenLifetime,
    encoded_header: String,
}

impl TokenService {
    pub fn new(secret: &[u8], lifetime: TokenLifetime) -> Result<Self, SigningKeyError> {
        if secret.is_empty() {
            return Err(SigningKeyError::Empty);
        }
        let mac = HmacSha256::new_from_slice(secret).map_err(|_| SigningKeyError::Rejected)?;

        let header = format!(r#"{{"alg":"{TOKEN_ALGORITHM}","typ":"JWT"}}"#);
        let encoded_header = BASE64_URL_SAFE_NO_PAD.encode(header);

        Ok(Self {
            mac,
            lifetime,
            encoded_header,
        })
    }

    #[must_use]
    pub fn lifetime(&self) -> TokenLifetime {
        self.lifetime
    }

    pub fn issue(
        &self,
        user_id: Id<UserMarker>,
        username: &str,
    ) -> Result<AuthToken, TokenEncodeError> {
        self.issue_at(user_id, username, OffsetDateTime::now_utc())
    }

    pub fn issue_at(
        &self,
        user_id: Id<UserMarker>,
        username: &str,
        now: OffsetDateTime,
    ) -> Result<AuthToken, TokenEncodeError> {
        let expires_at = now
            .checked_add(self.lifetime.get())
            .ok_or(TokenEncodeError::ExpiryOutOfRange(now))?;
        let claims = Claims {
            id: user_id,
            username: username.to_owned(),
            iat: now.unix_timestamp(),
            exp: expires_at.unix_timestamp(),
        };
        let encoded_claims = BASE64_URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims)?);
        let signing_input = format!("{}.{encoded_claims}", self.encoded_header);

        let mut mac = self.mac.clone();
        mac.update(signing_input.as_bytes());
        let signature = BASE64_URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(AuthToken(format!("{signing_input}.{signature}")))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, OffsetDateTime::now_utc())
    }

    /// Checks structure and signature first, then expiry. Does not check that
    /// the user still exists.
    pub fn verify_at(&self, token: &str, now: OffsetDateTime) -> Result<Claims, TokenError> {
        let mut parts = token.split('.');
        let (Some(header_part), Some(claims_part), Some(signature_part), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(MalformedTokenError::WrongPartCount.into());
        };

        let header: Header = decode_section(header_part)?;
        if header.alg != TOKEN_ALGORITHM {
            return Err(MalformedTokenError::UnsupportedAlgorithm(header.alg).into());
        }

        let signature = BASE64_URL_SAFE_NO_PAD
            .decode(signature_part)
            .map_err(MalformedTokenError::from)?;
        let mut mac = self.mac.clone();
        mac.update(header_part.as_bytes());
        mac.update(b".");
        mac.update(claims_part.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| MalformedTokenError::BadSignature)?;

        let claims: Claims = decode_section(claims_part)?;

        if claims.is_expired_at(now) {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}

fn decode_section<T: for<'de> Deserialize<'de>>(part: &str) -> Result<T, MalformedTokenError> {
    let json = BASE64_URL_SAFE_NO_PAD.decode(part)?;
    Ok(serde_json::from_slice(&json)?)
}

impl Debug for TokenService {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("key", &"[redacted]")
            .field("lifetime", &self.lifetime)
            .finish_non_exhaustive()
    }
}
