use crate::{
    error::ErrorKind,
    model::{Id, user::UserMarker},
};
use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;

pub const TITLE_MIN_LEN: usize = 3;
pub const CONTENT_MIN_LEN: usize = 10;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostMarker;

/// A stored post. `updated_at` is never earlier than `created_at`.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Id<PostMarker>,
    pub title: String,
    pub content: String,
    pub author_id: Id<UserMarker>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
pub enum PostValidationError {
    #[error("Title and content are required.")]
    MissingFields,
    #[error("Title must be at least 3 characters long.")]
    TitleTooShort,
    #[error("Content must be at least 10 characters long.")]
    ContentTooShort,
}

impl PostValidationError {
    #[must_use]
    pub fn kind(self) -> ErrorKind {
        ErrorKind::InvalidInput
    }
}

/// Title and body of a post, trimmed and checked against the minimum lengths.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct PostContent {
    title: String,
    content: String,
}

impl PostContent {
    pub fn new(title: &str, content: &str) -> Result<Self, PostValidationError> {
        if title.is_empty() || content.is_empty() {
            return Err(PostValidationError::MissingFields);
        }

        let title = title.trim();
        let content = content.trim();

        if title.chars().count() < TITLE_MIN_LEN {
            return Err(PostValidationError::TitleTooShort);
        }
        if content.chars().count() < CONTENT_MIN_LEN {
            return Err(PostValidationError::ContentTooShort);
        }

        Ok(Self {
            title: title.to_owned(),
            content: content.to_owned(),
        })
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    #[must_use]
    pub fn into_parts(self) -> (String, String) {
        (self.title, self.content)
    }
}
