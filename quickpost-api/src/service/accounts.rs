use quickpost_common::{
    error::ErrorKind,
    model::{
        auth::{AuthToken, TokenEncodeError, TokenService},
        password::{PasswordHash, PasswordHashError},
        user::{Registration, RegistrationError, User},
    },
};
use quickpost_db::client::DbClient;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum AccountError {
    #[error(transparent)]
    InvalidRegistration(#[from] RegistrationError),
    #[error("Username and password are required.")]
    MissingCredentials,
    #[error("Username or email is already taken.")]
    Conflict,
    /// Unknown user and wrong password share this variant.
    #[error("Username or password is incorrect.")]
    InvalidCredentials,
    #[error(transparent)]
    PasswordHash(#[from] PasswordHashError),
    #[error(transparent)]
    TokenEncode(#[from] TokenEncodeError),
}

impl AccountError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            AccountError::InvalidRegistration(error) => error.kind(),
            AccountError::MissingCredentials => ErrorKind::InvalidInput,
            AccountError::Conflict => ErrorKind::Conflict,
            AccountError::InvalidCredentials => ErrorKind::InvalidCredentials,
            AccountError::PasswordHash(_) | AccountError::TokenEncode(_) => ErrorKind::Internal,
        }
    }
}

/// A user together with a freshly issued token.
#[derive(Clone, Debug)]
pub struct Session {
    pub user: User,
    pub token: AuthToken,
}

/// Validates the fields, checks that neither the username nor the email is in
/// use, stores the user and issues a token.
pub fn register(
    db: &DbClient,
    tokens: &TokenService,
    username: &str,
    email: &str,
    password: &str,
) -> Result<Session, AccountError> {
    let registration = Registration::new(username, email, password)?;

    if db.is_identity_taken(&registration.username, &registration.email) {
        debug!(username, "Registration refused, identity taken");
        return Err(AccountError::Conflict);
    }

    let password_hash = PasswordHash::generate(&registration.password)?;
    let user = db
        .create_user(registration.username, registration.email, password_hash)
        .map_err(|_| AccountError::Conflict)?;
    let token = tokens.issue(user.id, user.username.get())?;

    info!(user_id = %user.id, username = user.username.get(), "Registered user");
    Ok(Session { user, token })
}

/// `identifier` may be a username or an email.
pub fn login(
    db: &DbClient,
    tokens: &TokenService,
    identifier: &str,
    password: &str,
) -> Result<Session, AccountError> {
    if identifier.is_empty() || password.is_empty() {
        return Err(AccountError::MissingCredentials);
    }

    let Some(stored) = db.fetch_credentials(identifier) else {
        debug!(identifier, "Login failed, unknown user");
        return Err(AccountError::InvalidCredentials);
    };
    if !stored.password_hash.verify(password) {
        debug!(identifier, "Login failed, wrong password");
        return Err(AccountError::InvalidCredentials);
    }

    let user = stored.user;
    let token = tokens.issue(user.id, user.username.get())?;

    debug!(user_id = %user.id, "Logged in");
    Ok(Session { user, token })
}

#[cfg(test)]
mod tests {
    use crate::{
        service::accounts::{AccountError, login, register},
        test_support::{seeded_db, token_service},
    };
    use quickpost_common::{
        error::ErrorKind,
        model::{Id, user::RegistrationError},
    };
    use quickpost_db::{client::DbClient, seed::DEMO_PASSWORD};
    use rstest::rstest;

    #[rstest]
    #[case("new_user", "new@example.com", "secret1")]
    #[case("A_1", "a@b.co", "123456")]
    #[case("UPPER_case_99", "first.last@mail.example.org", "a much longer password")]
    fn register_then_login_yields_the_same_user(
        #[case] username: &str,
        #[case] email: &str,
        #[case] password: &str,
    ) {
        let db = DbClient::new();
        let tokens = token_service();

        let registered = register(&db, &tokens, username, email, password).unwrap();
        let logged_in = login(&db, &tokens, username, password).unwrap();

        assert_eq!(logged_in.user, registered.user);
        let claims = tokens.verify(logged_in.token.as_token_str()).unwrap();
        assert_eq!(claims.user_id(), registered.user.id);
        assert_eq!(claims.username, username);

        let by_email = login(&db, &tokens, email, password).unwrap();
        assert_eq!(by_email.user.id, registered.user.id);
    }

    #[test]
    fn registration_assigns_the_next_id() {
        let db = seeded_db();
        let session = register(
            &db,
            &token_service(),
            "new_user",
            "new@example.com",
            "password",
        )
        .unwrap();

        assert_eq!(session.user.id, Id::new(4));
        assert_eq!(
            token_service()
                .verify(session.token.as_token_str())
                .unwrap()
                .user_id(),
            Id::new(4)
        );
    }

    #[rstest]
    #[case("john_doe", "fresh@example.com")]
    #[case("fresh_name", "john@example.com")]
    fn registration_conflicts_on_taken_identity(#[case] username: &str, #[case] email: &str) {
        let db = seeded_db();
        let error = register(&db, &token_service(), username, email, "password").unwrap_err();

        assert!(matches!(error, AccountError::Conflict));
        assert_eq!(error.kind(), ErrorKind::Conflict);
        assert_eq!(error.to_string(), "Username or email is already taken.");
        assert_eq!(db.counts().users, 3);
    }

    #[test]
    fn registration_validates_before_checking_uniqueness() {
        let db = seeded_db();
        let error = register(&db, &token_service(), "john_doe", "bad-email", "password")
            .unwrap_err();

        assert!(matches!(
            error,
            AccountError::InvalidRegistration(RegistrationError::InvalidEmail)
        ));
        assert_eq!(error.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn second_registration_with_same_username_conflicts() {
        let db = DbClient::new();
        let tokens = token_service();
        register(&db, &tokens, "twin", "one@example.com", "password").unwrap();

        assert!(matches!(
            register(&db, &tokens, "twin", "two@example.com", "password"),
            Err(AccountError::Conflict)
        ));
        assert!(matches!(
            register(&db, &tokens, "other", "one@example.com", "password"),
            Err(AccountError::Conflict)
        ));
    }

    #[rstest]
    #[case("", DEMO_PASSWORD)]
    #[case("john_doe", "")]
    fn login_requires_both_fields(#[case] identifier: &str, #[case] password: &str) {
        let error = login(&seeded_db(), &token_service(), identifier, password).unwrap_err();

        assert!(matches!(error, AccountError::MissingCredentials));
        assert_eq!(error.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn unknown_user_and_wrong_password_look_identical() {
        let db = seeded_db();
        let tokens = token_service();

        let unknown = login(&db, &tokens, "nobody", DEMO_PASSWORD).unwrap_err();
        let wrong = login(&db, &tokens, "john_doe", "wrong-password").unwrap_err();

        assert_eq!(unknown.to_string(), wrong.to_string());
        assert_eq!(unknown.kind(), ErrorKind::InvalidCredentials);
        assert_eq!(wrong.kind(), ErrorKind::InvalidCredentials);
    }
}
