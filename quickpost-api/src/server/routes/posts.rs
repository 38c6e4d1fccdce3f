use crate::{
    server::{
        Result, ServerError, ServerRouter,
        auth::AuthenticatedUser,
        json::{Created, Json, lenient_string},
        query::Query,
    },
    service::{access::PostAccessError, posts},
};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use quickpost_common::model::{
    Id,
    page::{PageInfo, PageRequest},
    post::{Post, PostMarker},
    user::{Email, User, UserMarker, Username},
};
use quickpost_db::client::DbClient;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(list_posts)
        .typed_post(create_post)
        .typed_get(get_post)
        .typed_put(update_post)
        .typed_delete(delete_post)
}

#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
struct Author {
    username: Username,
    email: Email,
}

impl From<&User> for Author {
    fn from(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            email: user.email.clone(),
        }
    }
}

/// A post as sent to clients. `author` is `null` once the author is gone.
#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
struct PostView {
    #[serde(flatten)]
    post: Post,
    author: Option<Author>,
}

impl PostView {
    fn new(post: Post, author: Option<&User>) -> Self {
        Self {
            post,
            author: author.map(Author::from),
        }
    }

    fn resolve(post: Post, users: &[User]) -> Self {
        let author = users.iter().find(|user| user.id == post.author_id);
        Self::new(post, author)
    }
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts", rejection(ServerError))]
struct PostsPath();

#[derive(Clone, Default, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListPostsQuery {
    page: Option<String>,
    limit: Option<String>,
    author_id: Option<String>,
}

impl ListPostsQuery {
    /// An empty `authorId` means no filter.
    fn author_id(&self) -> Result<Option<Id<UserMarker>>> {
        self.author_id
            .as_deref()
            .filter(|raw| !raw.is_empty())
            .map(str::parse)
            .transpose()
            .map_err(|_| ServerError::InvalidAuthorId)
    }

    fn page_request(&self) -> PageRequest {
        PageRequest::from_query(self.page.as_deref(), self.limit.as_deref())
    }
}

#[derive(Serialize)]
struct PostList {
    posts: Vec<PostView>,
    pagination: PageInfo,
}

async fn list_posts(
    PostsPath(): PostsPath,
    State(db): State<Arc<DbClient>>,
    _: AuthenticatedUser,
    Query(query): Query<ListPostsQuery>,
) -> Result<Json<PostList>> {
    let author_id = query.author_id()?;
    let page = posts::list_posts(&db, author_id, query.page_request());

    let users = db.fetch_users();
    let posts = page
        .items
        .into_iter()
        .map(|post| PostView::resolve(post, &users))
        .collect();

    Ok(Json(PostList {
        posts,
        pagination: page.info,
    }))
}

/// Any JSON object is accepted so that ownership is checked before the fields.
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
struct PostRequest {
    #[serde(deserialize_with = "lenient_string")]
    title: String,
    #[serde(deserialize_with = "lenient_string")]
    content: String,
}

#[derive(Serialize)]
struct PostMessage {
    message: &'static str,
    post: PostView,
}

async fn create_post(
    PostsPath(): PostsPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
    Json(request): Json<PostRequest>,
) -> Result<Created<PostMessage>> {
    let post = posts::create_post(&db, user.user_id(), &request.title, &request.content)?;

    Ok(Created(PostMessage {
        message: "Post created successfully",
        post: PostView::new(post, Some(user.user())),
    }))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}", rejection(ServerError))]
struct PostPath {
    id: String,
}

impl PostPath {
    fn post_id(&self) -> Result<Id<PostMarker>> {
        self.id.parse().map_err(|_| ServerError::InvalidPostId)
    }
}

#[derive(Serialize)]
struct PostResponse {
    post: PostView,
}

async fn get_post(path: PostPath, State(db): State<Arc<DbClient>>) -> Result<Json<PostResponse>> {
    let id = path.post_id()?;
    let post = db.fetch_post(id).ok_or(PostAccessError::NotFound(id))?;
    let author = db.fetch_user(post.author_id);

    Ok(Json(PostResponse {
        post: PostView::new(post, author.as_ref()),
    }))
}

async fn update_post(
    path: PostPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
    Json(request): Json<PostRequest>,
) -> Result<Json<PostMessage>> {
    let post = posts::update_own_post(
        &db,
        path.post_id()?,
        user.user_id(),
        &request.title,
        &request.content,
    )?;

    Ok(Json(PostMessage {
        message: "Post updated successfully",
        post: PostView::new(post, Some(user.user())),
    }))
}

#[derive(Serialize)]
struct DeletedPost {
    id: Id<PostMarker>,
    title: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DeleteResponse {
    message: &'static str,
    deleted_post: DeletedPost,
}

async fn delete_post(
    path: PostPath,
    State(db): State<Arc<DbClient>>,
    user: AuthenticatedUser,
) -> Result<Json<DeleteResponse>> {
    let post = posts::delete_own_post(&db, path.post_id()?, user.user_id())?;

    Ok(Json(DeleteResponse {
        message: "Post deleted successfully",
        deleted_post: DeletedPost {
            id: post.id,
            title: post.title,
        },
    }))
}

#[cfg(test)]
mod tests {
    use crate::test_support::{TestRequest, bearer_for, test_app};
    use axum::http::StatusCode;
    use quickpost_common::model::{Id, post::PostContent};
    use rstest::rstest;
    use serde_json::json;

    #[tokio::test]
    async fn listing_includes_authors_and_pagination() {
        let (app, state) = test_app();

        let (status, body) = TestRequest::get("/posts?page=1&limit=2")
            .authorization(&bearer_for(&state, "bob_wilson"))
            .send(&app)
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["pagination"],
            json!({"page": 1, "limit": 2, "total": 3, "totalPages": 2})
        );
        let posts = body["posts"].as_array().unwrap();
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0]["authorId"], 1);
        assert_eq!(
            posts[0]["author"],
            json!({"username": "john_doe", "email": "john@example.com"})
        );
    }

    #[rstest]
    #[case("/posts?authorId=2", 1)]
    #[case("/posts?authorId=999", 0)]
    #[case("/posts?authorId=", 3)]
    #[case("/posts?page=abc&limit=-5", 3)]
    #[case("/posts?page=0&limit=0", 3)]
    #[case("/posts?page=9", 0)]
    #[tokio::test]
    async fn listing_filters_and_falls_back(#[case] uri: &str, #[case] expected: usize) {
        let (app, state) = test_app();

        let (status, body) = TestRequest::get(uri)
            .authorization(&bearer_for(&state, "john_doe"))
            .send(&app)
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["posts"].as_array().unwrap().len(), expected);
    }

    #[tokio::test]
    async fn non_numeric_author_ids_are_rejected() {
        let (app, state) = test_app();

        let (status, body) = TestRequest::get("/posts?authorId=abc")
            .authorization(&bearer_for(&state, "john_doe"))
            .send(&app)
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid author ID");
        assert_eq!(body["message"], "Author ID must be a valid number.");
    }

    #[tokio::test]
    async fn single_posts_need_no_token() {
        let (app, _) = test_app();

        let (status, body) = TestRequest::get("/posts/3").send(&app).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["post"]["title"], "Testing Your API");
        assert_eq!(body["post"]["author"]["username"], "jane_smith");
        assert_eq!(body["post"]["createdAt"], body["post"]["updatedAt"]);
    }

    #[tokio::test]
    async fn posts_of_vanished_authors_have_no_author() {
        let (app, state) = test_app();
        state.db_client.reset();
        let post = state.db_client.create_post(
            PostContent::new("Orphan", "Nobody wrote this post.").unwrap(),
            Id::new(42),
        );

        let (status, body) = TestRequest::get(&format!("/posts/{}", post.id))
            .send(&app)
            .await;

        assert_eq!(status, StatusCode::OK);
        assert!(body["post"]["author"].is_null());
    }

    #[rstest]
    #[case("/posts/999999", StatusCode::NOT_FOUND, "Post with ID 999999 does not exist.")]
    #[case("/posts/abc", StatusCode::BAD_REQUEST, "Post ID must be a valid number.")]
    #[tokio::test]
    async fn bad_post_ids_are_reported(
        #[case] uri: &str,
        #[case] expected: StatusCode,
        #[case] message: &str,
    ) {
        let (app, _) = test_app();

        let (status, body) = TestRequest::get(uri).send(&app).await;

        assert_eq!(status, expected);
        assert_eq!(body["message"], message);
    }

    #[tokio::test]
    async fn creating_requires_a_token() {
        let (app, state) = test_app();

        let (status, _) = TestRequest::post("/posts")
            .json(&json!({"title": "A Title", "content": "Plenty of content."}))
            .send(&app)
            .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(state.db_client.counts().posts, 3);
    }

    #[tokio::test]
    async fn created_posts_are_returned_with_their_author() {
        let (app, state) = test_app();

        let (status, body) = TestRequest::post("/posts")
            .authorization(&bearer_for(&state, "jane_smith"))
            .json(&json!({"title": "  Spaced Title  ", "content": "Plenty of content."}))
            .send(&app)
            .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["message"], "Post created successfully");
        assert_eq!(body["post"]["id"], 4);
        assert_eq!(body["post"]["title"], "Spaced Title");
        assert_eq!(body["post"]["authorId"], 2);
        assert_eq!(body["post"]["author"]["email"], "jane@example.com");
    }

    #[rstest]
    #[case(json!({"title": "Hi", "content": "too short"}), "Title must be at least 3 characters long.")]
    #[case(json!({"title": "Valid Title", "content": "short"}), "Content must be at least 10 characters long.")]
    #[case(json!({"content": "Plenty of content."}), "Title and content are required.")]
    #[case(json!({"title": null, "content": "Plenty of content."}), "Title and content are required.")]
    #[case(json!({"title": 123, "content": "Plenty of content."}), "Title and content are required.")]
    #[tokio::test]
    async fn invalid_posts_are_rejected(#[case] request: serde_json::Value, #[case] message: &str) {
        let (app, state) = test_app();

        let (status, body) = TestRequest::post("/posts")
            .authorization(&bearer_for(&state, "john_doe"))
            .json(&request)
            .send(&app)
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Validation error");
        assert_eq!(body["message"], message);
    }

    #[tokio::test]
    async fn authors_can_update_their_posts() {
        let (app, state) = test_app();

        let (status, body) = TestRequest::put("/posts/1")
            .authorization(&bearer_for(&state, "john_doe"))
            .json(&json!({"title": "Updated Title", "content": "Updated content here."}))
            .send(&app)
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Post updated successfully");
        assert_eq!(body["post"]["title"], "Updated Title");
        assert_eq!(body["post"]["createdAt"], "2024-01-05T00:00:00Z");
        assert_ne!(body["post"]["updatedAt"], body["post"]["createdAt"]);
    }

    #[rstest]
    #[case(json!({"title": "Updated Title", "content": "Updated content here."}))]
    #[case(json!({"title": "Hi", "content": "short"}))]
    #[case(json!({}))]
    #[case(json!({"title": null, "content": null}))]
    #[case(json!({"title": 123, "content": ["not", "text"]}))]
    #[tokio::test]
    async fn other_users_cannot_update(#[case] request: serde_json::Value) {
        let (app, state) = test_app();
        let before = state.db_client.fetch_post(Id::new(1));

        let (status, body) = TestRequest::put("/posts/1")
            .authorization(&bearer_for(&state, "jane_smith"))
            .json(&request)
            .send(&app)
            .await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], "You can only edit your own posts.");
        assert_eq!(state.db_client.fetch_post(Id::new(1)), before);
    }

    #[tokio::test]
    async fn updating_a_missing_post_is_not_found() {
        let (app, state) = test_app();

        let (status, body) = TestRequest::put("/posts/999999")
            .authorization(&bearer_for(&state, "jane_smith"))
            .json(&json!({"title": "Updated Title", "content": "Updated content here."}))
            .send(&app)
            .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Post not found");
    }

    #[tokio::test]
    async fn authors_can_delete_their_posts() {
        let (app, state) = test_app();
        let authorization = bearer_for(&state, "jane_smith");

        let (status, body) = TestRequest::delete("/posts/3")
            .authorization(&authorization)
            .send(&app)
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "message": "Post deleted successfully",
                "deletedPost": {"id": 3, "title": "Testing Your API"},
            })
        );

        let (status, _) = TestRequest::get("/posts/3").send(&app).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn other_users_cannot_delete() {
        let (app, state) = test_app();

        let (status, body) = TestRequest::delete("/posts/3")
            .authorization(&bearer_for(&state, "john_doe"))
            .send(&app)
            .await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], "You can only delete your own posts.");
        assert_eq!(state.db_client.counts().posts, 3);
    }
}
