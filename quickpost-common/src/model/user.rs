use crate::{error::ErrorKind, model::Id};
use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;

pub const USERNAME_MIN_LEN: usize = 3;
pub const PASSWORD_MIN_LEN: usize = 6;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct UserMarker;

/// Public view of an account. The password hash is kept by the store and is
/// never part of this type.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Id<UserMarker>,
    pub username: Username,
    pub email: Email,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Errors from [`Registration::new`], declared in the order they are checked.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
pub enum RegistrationError {
    #[error("Username, email, and password are required.")]
    MissingFields,
    #[error(
        "Username must be at least 3 characters long and contain only letters, numbers, and underscores."
    )]
    InvalidUsername,
    #[error("Please provide a valid email address.")]
    InvalidEmail,
    #[error("Password must be at least 6 characters long.")]
    PasswordTooShort,
}

impl RegistrationError {
    #[must_use]
    pub fn kind(self) -> ErrorKind {
        ErrorKind::InvalidInput
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize)]
#[serde(transparent)]
pub struct Username(String);

impl Username {
    pub fn new(username: String) -> Result<Self, RegistrationError> {
        let valid = username.chars().count() >= USERNAME_MIN_LEN
            && username
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_');

        if valid {
            Ok(Self(username))
        } else {
            Err(RegistrationError::InvalidUsername)
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    /// Accepts the `local@domain.tld` shape: no whitespace, a single `@` with
    /// text on both sides, and a dot inside the domain.
    pub fn new(email: String) -> Result<Self, RegistrationError> {
        if is_email_shaped(&email) {
            Ok(Self(email))
        } else {
            Err(RegistrationError::InvalidEmail)
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

fn is_email_shaped(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }

    domain
        .char_indices()
        .any(|(index, c)| c == '.' && index > 0 && index + 1 < domain.len())
}

/// A validated sign-up request. The password is still in plain text here and
/// is hashed by the account service.
#[derive(Clone, Eq, PartialEq)]
pub struct Registration {
    pub username: Username,
    pub email: Email,
    pub password: String,
}

impl Registration {
    /// Validates the raw fields. An empty string counts as a missing field.
    pub fn new(username: &str, email: &str, password: &str) -> Result<Self, RegistrationError> {
        if username.is_empty() || email.is_empty() || password.is_empty() {
            return Err(RegistrationError::MissingFields);
        }

        let username = Username::new(username.to_owned())?;
        let email = Email::new(email.to_owned())?;

        if password.chars().count() < PASSWORD_MIN_LEN {
            return Err(RegistrationError::PasswordTooShort);
        }

        Ok(Self {
            username,
            email,
            password: password.to_owned(),
        })
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"[redacted]")
            .finish()
    }
}
