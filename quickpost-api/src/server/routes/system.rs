use crate::server::{Result, ServerError, ServerInfo, ServerRouter, json::Json};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use quickpost_db::{client::DbClient, record::StoreCounts, seed::DEMO_PASSWORD};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::task::spawn_blocking;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(index)
        .typed_get(health)
        .typed_post(reset)
        .typed_post(clear)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/", rejection(ServerError))]
struct IndexPath();

async fn index(IndexPath(): IndexPath) -> Json<Value> {
    Json(json!({
        "name": "QuickPost API",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "A small REST API for testing and learning",
        "endpoints": {
            "auth": {
                "POST /auth/register": "Register a new user",
                "POST /auth/login": "Login user",
            },
            "users": {
                "GET /users": "Get all users (requires auth)",
                "GET /users/{id}": "Get user by ID (requires auth)",
            },
            "posts": {
                "GET /posts": "Get all posts (requires auth)",
                "GET /posts/{id}": "Get post by ID",
                "POST /posts": "Create new post (requires auth)",
                "PUT /posts/{id}": "Update post (requires auth)",
                "DELETE /posts/{id}": "Delete post (requires auth)",
            },
            "utility": {
                "GET /health": "Health check",
                "POST /reset": "Reset all data to initial state",
                "POST /clear": "Remove all data",
            },
        },
        "testCredentials": {
            "username": "john_doe",
            "password": DEMO_PASSWORD,
        },
    }))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/health", rejection(ServerError))]
struct HealthPath();

#[derive(Serialize)]
struct Health {
    status: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    timestamp: OffsetDateTime,
    /// Seconds since startup.
    uptime: f64,
    users: usize,
    posts: usize,
}

async fn health(
    HealthPath(): HealthPath,
    State(db): State<Arc<DbClient>>,
    State(info): State<ServerInfo>,
) -> Json<Health> {
    let StoreCounts { users, posts } = db.counts();

    Json(Health {
        status: "OK",
        timestamp: OffsetDateTime::now_utc(),
        uptime: info.started_at.elapsed().as_secs_f64(),
        users,
        posts,
    })
}

#[derive(Serialize)]
struct ResetResponse {
    message: &'static str,
    users: usize,
    posts: usize,
}

impl ResetResponse {
    fn new(message: &'static str, StoreCounts { users, posts }: StoreCounts) -> Self {
        Self {
            message,
            users,
            posts,
        }
    }
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/reset", rejection(ServerError))]
struct ResetPath();

async fn reset(ResetPath(): ResetPath, State(db): State<Arc<DbClient>>) -> Result<Json<ResetResponse>> {
    let counts = spawn_blocking(move || db.reset_with_demo_data()).await??;

    Ok(Json(ResetResponse::new("Data reset successfully", counts)))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/clear", rejection(ServerError))]
struct ClearPath();

async fn clear(ClearPath(): ClearPath, State(db): State<Arc<DbClient>>) -> Json<ResetResponse> {
    db.reset();

    Json(ResetResponse::new("Data cleared successfully", db.counts()))
}

#[cfg(test)]
mod tests {
    use crate::test_support::{TestRequest, bearer_for, test_app};
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn index_describes_the_api() {
        let (app, _) = test_app();

        let (status, body) = TestRequest::get("/").send(&app).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "QuickPost API");
        assert_eq!(
            body["testCredentials"],
            json!({"username": "john_doe", "password": "password123"})
        );
    }

    #[tokio::test]
    async fn health_reports_counts() {
        let (app, _) = test_app();

        let (status, body) = TestRequest::get("/health").send(&app).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "OK");
        assert_eq!(body["users"], 3);
        assert_eq!(body["posts"], 3);
        assert!(body["uptime"].as_f64().is_some_and(|uptime| uptime >= 0.0));
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn clear_empties_the_store() {
        let (app, state) = test_app();

        let (status, body) = TestRequest::post("/clear").send(&app).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"message": "Data cleared successfully", "users": 0, "posts": 0})
        );
        assert!(state.db_client.fetch_posts(None).is_empty());
    }

    #[tokio::test]
    async fn reset_restores_the_demo_data() {
        let (app, state) = test_app();
        let authorization = bearer_for(&state, "jane_smith");
        TestRequest::delete("/posts/3")
            .authorization(&authorization)
            .send(&app)
            .await;
        TestRequest::post("/clear").send(&app).await;

        let (status, body) = TestRequest::post("/reset").send(&app).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"message": "Data reset successfully", "users": 3, "posts": 3})
        );
        let (status, _) = TestRequest::get("/posts/3").send(&app).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn posts_created_after_a_clear_start_at_one() {
        let (app, state) = test_app();
        TestRequest::post("/clear").send(&app).await;

        let (_, registered) = TestRequest::post("/auth/register")
            .json(&json!({
                "username": "fresh_user",
                "email": "fresh@example.com",
                "password": "secret1",
            }))
            .send(&app)
            .await;
        let token = registered["token"].as_str().unwrap();

        let (status, body) = TestRequest::post("/posts")
            .authorization(&format!("Bearer {token}"))
            .json(&json!({"title": "First Post", "content": "The very first post."}))
            .send(&app)
            .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(registered["user"]["id"], 1);
        assert_eq!(body["post"]["id"], 1);
        assert_eq!(state.db_client.counts().posts, 1);
    }
}
