use crate::record::{DuplicateUserError, StoreCounts, StoredUser, Tables};
use parking_lot::RwLock;
use quickpost_common::model::{
    Id,
    password::PasswordHash,
    post::{Post, PostContent, PostMarker},
    user::{Email, User, UserMarker, Username},
};
use std::convert::Infallible;
use time::{Duration, OffsetDateTime};
use tracing::{debug, info};

/// Users and posts behind one reader-writer lock.
///
/// Writers hold the lock only for the in-memory change. Readers clone what
/// they return, so they never see a half-applied mutation.
#[derive(Debug, Default)]
pub struct DbClient {
    pub(crate) tables: RwLock<Tables>,
}

impl DbClient {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a new user under the next id. Fails if the username or email is
    /// already in use, even if the caller checked beforehand.
    pub fn create_user(
        &self,
        username: Username,
        email: Email,
        password_hash: PasswordHash,
    ) -> Result<User, DuplicateUserError> {
        self.create_user_at(username, email, password_hash, OffsetDateTime::now_utc())
    }

    pub fn create_user_at(
        &self,
        username: Username,
        email: Email,
        password_hash: PasswordHash,
        created_at: OffsetDateTime,
    ) -> Result<User, DuplicateUserError> {
        let user = self
            .tables
            .write()
            .insert_user(username, email, password_hash, created_at)?;

        debug!(user_id = %user.id, username = user.username.get(), "Created user");
        Ok(user)
    }

    #[must_use]
    pub fn fetch_user(&self, user_id: Id<UserMarker>) -> Option<User> {
        self.tables
            .read()
            .users
            .iter()
            .find(|stored| stored.user.id == user_id)
            .map(|stored| stored.user.clone())
    }

    /// Looks a user up by exact username or email.
    #[must_use]
    pub fn fetch_user_by_identifier(&self, identifier: &str) -> Option<User> {
        self.tables
            .read()
            .find_user_by_identifier(identifier)
            .map(|stored| stored.user.clone())
    }

    #[must_use]
    pub fn fetch_credentials(&self, identifier: &str) -> Option<StoredUser> {
        self.tables
            .read()
            .find_user_by_identifier(identifier)
            .cloned()
    }

    #[must_use]
    pub fn fetch_users(&self) -> Vec<User> {
        self.tables
            .read()
            .users
            .iter()
            .map(|stored| stored.user.clone())
            .collect()
    }

    #[must_use]
    pub fn is_identity_taken(&self, username: &Username, email: &Email) -> bool {
        self.tables.read().is_identity_taken(username, email)
    }

    pub fn create_post(&self, content: PostContent, author_id: Id<UserMarker>) -> Post {
        self.create_post_at(content, author_id, OffsetDateTime::now_utc())
    }

    pub fn create_post_at(
        &self,
        content: PostContent,
        author_id: Id<UserMarker>,
        created_at: OffsetDateTime,
    ) -> Post {
        let post = self
            .tables
            .write()
            .insert_post(content, author_id, created_at);

        debug!(post_id = %post.id, %author_id, "Created post");
        post
    }

    #[must_use]
    pub fn fetch_post(&self, post_id: Id<PostMarker>) -> Option<Post> {
        self.tables
            .read()
            .posts
            .iter()
            .find(|post| post.id == post_id)
            .cloned()
    }

    /// All posts in insertion order, optionally only those by `author_id`.
    #[must_use]
    pub fn fetch_posts(&self, author_id: Option<Id<UserMarker>>) -> Vec<Post> {
        self.tables
            .read()
            .posts
            .iter()
            .filter(|post| author_id.is_none_or(|author_id| post.author_id == author_id))
            .cloned()
            .collect()
    }

    /// Replaces title and content. Returns `None` for an unknown id.
    pub fn update_post(&self, post_id: Id<PostMarker>, content: PostContent) -> Option<Post> {
        let Ok(post) = self.update_post_with(post_id, |_| Ok::<_, Infallible>(content));
        post
    }

    /// Looks the post up and applies the content returned by `prepare`, all
    /// under one write lock. If `prepare` fails nothing is changed.
    pub fn update_post_with<E>(
        &self,
        post_id: Id<PostMarker>,
        prepare: impl FnOnce(&Post) -> Result<PostContent, E>,
    ) -> Result<Option<Post>, E> {
        let mut tables = self.tables.write();
        let Some(post) = tables.posts.iter_mut().find(|post| post.id == post_id) else {
            return Ok(None);
        };

        let (title, content) = prepare(post)?.into_parts();
        post.title = title;
        post.content = content;
        post.updated_at = next_update_time(post.updated_at, OffsetDateTime::now_utc());

        debug!(%post_id, "Updated post");
        Ok(Some(post.clone()))
    }

    pub fn delete_post(&self, post_id: Id<PostMarker>) -> bool {
        let Ok(removed) = self.delete_post_with(post_id, |_| Ok::<_, Infallible>(()));
        removed.is_some()
    }

    /// Removes the post if `check` allows it, under one write lock. Returns the
    /// removed post, or `None` for an unknown id.
    pub fn delete_post_with<E>(
        &self,
        post_id: Id<PostMarker>,
        check: impl FnOnce(&Post) -> Result<(), E>,
    ) -> Result<Option<Post>, E> {
        let mut tables = self.tables.write();
        let Some(index) = tables.posts.iter().position(|post| post.id == post_id) else {
            return Ok(None);
        };

        check(&tables.posts[index])?;
        let post = tables.posts.remove(index);

        debug!(%post_id, "Deleted post");
        Ok(Some(post))
    }

    #[must_use]
    pub fn counts(&self) -> StoreCounts {
        self.tables.read().counts()
    }

    /// Drops every user and post and restarts both id counters at 1.
    pub fn reset(&self) {
        *self.tables.write() = Tables::default();
        info!("Store reset");
    }
}

/// `updated_at` strictly advances on every edit, even if the clock did not.
fn next_update_time(previous: OffsetDateTime, now: OffsetDateTime) -> OffsetDateTime {
    now.max(previous + Duration::NANOSECOND)
}
