//! Fixtures shared by the unit tests of this crate.

use crate::{
    config::AppMode,
    server::{ServerInfo, ServerState, app},
};
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
    response::Response,
};
use quickpost_common::model::auth::{TokenLifetime, TokenService};
use quickpost_db::client::DbClient;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

pub const TEST_SECRET: &[u8] = b"quickpost-test-secret";

pub fn token_service() -> TokenService {
    TokenService::new(TEST_SECRET, TokenLifetime::default()).unwrap()
}

/// A store holding the demo users and posts.
pub fn seeded_db() -> DbClient {
    let db = DbClient::new();
    db.seed_demo_data().unwrap();
    db
}

pub fn test_state(mode: AppMode) -> ServerState {
    ServerState {
        db_client: Arc::new(seeded_db()),
        tokens: Arc::new(token_service()),
        info: ServerInfo::new(mode),
    }
}

pub fn test_app() -> (Router, ServerState) {
    let state = test_state(AppMode::Development);
    (app(state.clone()), state)
}

/// Bearer token for a seeded user.
pub fn bearer_for(state: &ServerState, username: &str) -> String {
    let user = state.db_client.fetch_user_by_identifier(username).unwrap();
    let token = state.tokens.issue(user.id, user.username.get()).unwrap();
    format!("Bearer {}", token.as_token_str())
}

pub struct TestRequest {
    builder: axum::http::request::Builder,
    body: Body,
}

impl TestRequest {
    pub fn new(method: Method, uri: &str) -> Self {
        Self {
            builder: Request::builder().method(method).uri(uri),
            body: Body::empty(),
        }
    }

    pub fn get(uri: &str) -> Self {
        Self::new(Method::GET, uri)
    }

    pub fn post(uri: &str) -> Self {
        Self::new(Method::POST, uri)
    }

    pub fn put(uri: &str) -> Self {
        Self::new(Method::PUT, uri)
    }

    pub fn delete(uri: &str) -> Self {
        Self::new(Method::DELETE, uri)
    }

    pub fn authorization(mut self, value: &str) -> Self {
        self.builder = self.builder.header(header::AUTHORIZATION, value);
        self
    }

    pub fn json(self, body: &Value) -> Self {
        self.raw_json(&body.to_string())
    }

    pub fn raw_json(mut self, body: &str) -> Self {
        self.builder = self
            .builder
            .header(header::CONTENT_TYPE, "application/json");
        self.body = Body::from(body.to_owned());
        self
    }

    /// Sends the request through `app` and decodes the JSON reply.
    pub async fn send(self, app: &Router) -> (StatusCode, Value) {
        let request = self.builder.body(self.body).unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        read_json(response).await
    }
}

pub async fn read_json(response: Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap();
    (status, value)
}
