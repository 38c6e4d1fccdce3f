//! Transport-independent classification of failures.
//!
//! Every error type in the workspace can report one of these kinds, so request
//! handlers pick a status code by matching on the kind instead of on each
//! concrete error.

use serde::Serialize;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AuthFailure {
    NoToken,
    Expired,
    Malformed,
    UnknownUser,
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub enum ErrorKind {
    /// Missing or malformed input. The caller can fix the request.
    InvalidInput,
    /// Uniqueness violation.
    Conflict,
    /// Login failed. Never says whether the user exists.
    InvalidCredentials,
    Unauthenticated(AuthFailure),
    /// Authenticated, but the resource belongs to somebody else.
    Forbidden,
    NotFound,
    Internal,
}

impl ErrorKind {
    #[must_use]
    pub fn is_client_error(self) -> bool {
        !matches!(self, ErrorKind::Internal)
    }
}
