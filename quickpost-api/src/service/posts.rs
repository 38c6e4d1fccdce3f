use crate::service::access::{PostAccessError, PostAction, authorize_owner_mutation};
use quickpost_common::model::{
    Id,
    page::{Page, PageRequest, paginate},
    post::{Post, PostContent, PostMarker},
    user::UserMarker,
};
use quickpost_db::client::DbClient;

pub fn create_post(
    db: &DbClient,
    author_id: Id<UserMarker>,
    title: &str,
    content: &str,
) -> Result<Post, PostAccessError> {
    let content = PostContent::new(title, content)?;
    Ok(db.create_post(content, author_id))
}

#[must_use]
pub fn list_posts(db: &DbClient, author_id: Option<Id<UserMarker>>, page: PageRequest) -> Page<Post> {
    paginate(db.fetch_posts(author_id), page)
}

/// Fails with, in this order: not found, not the author, invalid input. The
/// checks and the write happen under one lock.
pub fn update_own_post(
    db: &DbClient,
    post_id: Id<PostMarker>,
    user_id: Id<UserMarker>,
    title: &str,
    content: &str,
) -> Result<Post, PostAccessError> {
    db.update_post_with(post_id, |post| -> Result<_, PostAccessError> {
        authorize_owner_mutation(post, user_id, PostAction::Edit)?;
        Ok(PostContent::new(title, content)?)
    })?
    .ok_or(PostAccessError::NotFound(post_id))
}

/// Returns the removed post.
pub fn delete_own_post(
    db: &DbClient,
    post_id: Id<PostMarker>,
    user_id: Id<UserMarker>,
) -> Result<Post, PostAccessError> {
    db.delete_post_with(post_id, |post| {
        authorize_owner_mutation(post, user_id, PostAction::Delete)
    })?
    .ok_or(PostAccessError::NotFound(post_id))
}
