use quickpost_common::model::{
    Id,
    password::PasswordHash,
    post::{Post, PostContent},
    user::{Email, User, UserMarker, Username},
};
use thiserror::Error;
use time::OffsetDateTime;

/// A user together with the credentials only the store may see.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct StoredUser {
    pub user: User,
    pub password_hash: PasswordHash,
}

impl StoredUser {
    /// Whether `identifier` is this user's username or email.
    #[must_use]
    pub fn matches_identifier(&self, identifier: &str) -> bool {
        self.user.username.get() == identifier || self.user.email.get() == identifier
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Error)]
#[error("Username {} or email {} is already taken", .username.get(), .email.get())]
pub struct DuplicateUserError {
    pub username: Username,
    pub email: Email,
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct StoreCounts {
    pub users: usize,
    pub posts: usize,
}

/// Both collections and their id counters.
#[derive(Clone, Debug)]
pub(crate) struct Tables {
    pub users: Vec<StoredUser>,
    pub posts: Vec<Post>,
    pub next_user_id: u64,
    pub next_post_id: u64,
}

impl Default for Tables {
    fn default() -> Self {
        Self {
            users: Vec::new(),
            posts: Vec::new(),
            next_user_id: 1,
            next_post_id: 1,
        }
    }
}

impl Tables {
    pub fn find_user_by_identifier(&self, identifier: &str) -> Option<&StoredUser> {
        self.users
            .iter()
            .find(|stored| stored.matches_identifier(identifier))
    }

    /// A new account collides when its username or its email already appears
    /// as any user's username or email.
    pub fn is_identity_taken(&self, username: &Username, email: &Email) -> bool {
        self.find_user_by_identifier(username.get()).is_some()
            || self.find_user_by_identifier(email.get()).is_some()
    }

    pub fn counts(&self) -> StoreCounts {
        StoreCounts {
            users: self.users.len(),
            posts: self.posts.len(),
        }
    }

    pub fn insert_user(
        &mut self,
        username: Username,
        email: Email,
        password_hash: PasswordHash,
        created_at: OffsetDateTime,
    ) -> Result<User, DuplicateUserError> {
        if self.is_identity_taken(&username, &email) {
            return Err(DuplicateUserError { username, email });
        }

        let user = User {
            id: Id::new(self.next_user_id),
            username,
            email,
            created_at,
        };
        self.next_user_id += 1;
        self.users.push(StoredUser {
            user: user.clone(),
            password_hash,
        });

        Ok(user)
    }

    pub fn insert_post(
        &mut self,
        content: PostContent,
        author_id: Id<UserMarker>,
        created_at: OffsetDateTime,
    ) -> Post {
        let (title, content) = content.into_parts();
        let post = Post {
            id: Id::new(self.next_post_id),
            title,
            content,
            author_id,
            created_at,
            updated_at: created_at,
        };
        self.next_post_id += 1;
        self.posts.push(post.clone());

        post
    }
}
