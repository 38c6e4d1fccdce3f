//! Fixed demo records for trying the API by hand.

use crate::{
    client::DbClient,
    record::{DuplicateUserError, StoreCounts, Tables},
};
use quickpost_common::model::{
    password::{PasswordHash, PasswordHashError},
    post::{PostContent, PostValidationError},
    user::{Email, RegistrationError, Username},
};
use thiserror::Error;
use time::{OffsetDateTime, macros::datetime};
use tracing::info;

/// Password shared by every demo account.
pub const DEMO_PASSWORD: &str = "password123";

#[derive(Debug, Error)]
pub enum SeedError {
    #[error(transparent)]
    PasswordHash(#[from] PasswordHashError),
    #[error("Demo user is invalid: {0}")]
    User(#[from] RegistrationError),
    #[error("Demo post is invalid: {0}")]
    Post(#[from] PostValidationError),
    #[error("Demo user collides with an existing user: {0}")]
    Duplicate(#[from] DuplicateUserError),
}

struct DemoUser {
    username: &'static str,
    email: &'static str,
    created_at: OffsetDateTime,
}

struct DemoPost {
    title: &'static str,
    content: &'static str,
    /// Index into [`DEMO_USERS`].
    author: usize,
    created_at: OffsetDateTime,
}

const DEMO_USERS: [DemoUser; 3] = [
    DemoUser {
        username: "john_doe",
        email: "john@example.com",
        created_at: datetime!(2024-01-01 00:00 UTC),
    },
    DemoUser {
        username: "jane_smith",
        email: "jane@example.com",
        created_at: datetime!(2024-01-02 00:00 UTC),
    },
    DemoUser {
        username: "bob_wilson",
        email: "bob@example.com",
        created_at: datetime!(2024-01-03 00:00 UTC),
    },
];

const DEMO_POSTS: [DemoPost; 3] = [
    DemoPost {
        title: "Getting Started with APIs",
        content: "This is a comprehensive guide to understanding REST APIs and how to work with them effectively.",
        author: 0,
        created_at: datetime!(2024-01-05 00:00 UTC),
    },
    DemoPost {
        title: "Authentication Best Practices",
        content: "Learn about JWT tokens, password hashing, and secure authentication patterns.",
        author: 0,
        created_at: datetime!(2024-01-06 00:00 UTC),
    },
    DemoPost {
        title: "Testing Your API",
        content: "A guide to testing REST APIs using various tools and frameworks.",
        author: 1,
        created_at: datetime!(2024-01-07 00:00 UTC),
    },
];

/// Demo records with the password already hashed, ready to be inserted
/// while holding the lock.
struct DemoData {
    password_hash: PasswordHash,
    users: Vec<(Username, Email, OffsetDateTime)>,
    posts: Vec<(PostContent, usize, OffsetDateTime)>,
}

impl DemoData {
    fn prepare() -> Result<Self, SeedError> {
        let password_hash = PasswordHash::generate(DEMO_PASSWORD)?;

        let users = DEMO_USERS
            .iter()
            .map(|user| {
                Ok((
                    Username::new(user.username.to_owned())?,
                    Email::new(user.email.to_owned())?,
                    user.created_at,
                ))
            })
            .collect::<Result<_, RegistrationError>>()?;
        let posts = DEMO_POSTS
            .iter()
            .map(|post| {
                Ok((
                    PostContent::new(post.title, post.content)?,
                    post.author,
                    post.created_at,
                ))
            })
            .collect::<Result<_, PostValidationError>>()?;

        Ok(Self {
            password_hash,
            users,
            posts,
        })
    }

    fn apply(self, tables: &mut Tables) -> Result<(), SeedError> {
        let mut user_ids = Vec::with_capacity(self.users.len());
        for (username, email, created_at) in self.users {
            let user =
                tables.insert_user(username, email, self.password_hash.clone(), created_at)?;
            user_ids.push(user.id);
        }

        for (content, author, created_at) in self.posts {
            tables.insert_post(content, user_ids[author], created_at);
        }

        Ok(())
    }
}

impl DbClient {
    /// Adds the demo users and posts next to whatever is stored. Either all
    /// of them are added or, on a collision, none.
    pub fn seed_demo_data(&self) -> Result<StoreCounts, SeedError> {
        let demo = DemoData::prepare()?;

        let mut tables = self.tables.write();
        let mut staged = tables.clone();
        demo.apply(&mut staged)?;
        *tables = staged;
        let counts = tables.counts();
        drop(tables);

        info!(users = counts.users, posts = counts.posts, "Seeded demo data");
        Ok(counts)
    }

    /// Clears the store and seeds the demo data as one atomic step.
    pub fn reset_with_demo_data(&self) -> Result<StoreCounts, SeedError> {
        let demo = DemoData::prepare()?;

        let mut staged = Tables::default();
        demo.apply(&mut staged)?;
        let counts = staged.counts();
        *self.tables.write() = staged;

        info!(users = counts.users, posts = counts.posts, "Store reset with demo data");
        Ok(counts)
    }
}
