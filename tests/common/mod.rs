#![allow(dead_code)]

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, Response, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use parley_api::app::{app, AppState};
use parley_api::auth::TokenKeys;
use parley_api::models::User;
use parley_api::services::memory::InMemoryPlatform;

/// One router over a fresh in-memory platform. Each test builds its own so
/// state never leaks across tests.
pub struct TestApp {
    pub router: Router,
    pub platform: Arc<InMemoryPlatform>,
}

pub fn spawn_app() -> TestApp {
    let keys = TokenKeys::from_secret("parley-test-secret").expect("test signing keys");
    let (state, platform) = AppState::in_memory(keys);
    TestApp { router: app(state), platform }
}

impl TestApp {
    /// Seed a user and open a session; returns the profile and a bearer token.
    pub fn signed_in(&self, username: &str) -> (User, String) {
        let user =
            self.platform.seed_user(username, &format!("{username}@parley.test"), username);
        let pair = self.platform.open_session(&user);
        (user, pair.access_token)
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.expect("router is infallible")
    }

    pub async fn request(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");
        self.send(request).await
    }

    pub async fn get(&self, path: &str, token: &str) -> Response<Body> {
        self.request(Method::GET, path, Some(token), None).await
    }

    pub async fn post(&self, path: &str, token: &str, body: Value) -> Response<Body> {
        self.request(Method::POST, path, Some(token), Some(body)).await
    }

    pub async fn put(&self, path: &str, token: &str, body: Value) -> Response<Body> {
        self.request(Method::PUT, path, Some(token), Some(body)).await
    }

    pub async fn delete(&self, path: &str, token: &str) -> Response<Body> {
        self.request(Method::DELETE, path, Some(token), None).await
    }
}

pub async fn read_json(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}

pub async fn read_text(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

/// Assert the failure envelope and its stable code.
pub fn assert_error(body: &Value, code: &str) {
    assert_eq!(body["success"], false, "expected failure envelope, got {body}");
    assert_eq!(body["error"]["code"], code, "unexpected error code in {body}");
}

/// Unwrap the success envelope.
pub fn data(body: &Value) -> &Value {
    assert_eq!(body["success"], true, "expected success envelope, got {body}");
    &body["data"]
}

pub fn uuid_of(value: &Value) -> Uuid {
    value.as_str().and_then(|s| Uuid::parse_str(s).ok()).expect("uuid field")
}

// -- fixture shortcuts built through the public API --

pub async fn create_workspace(app: &TestApp, token: &str, name: &str) -> Uuid {
    let response =
        app.post("/workspaces", token, json!({ "name": name, "description": "" })).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json(response).await;
    uuid_of(&data(&body)["id"])
}

/// Create a chat and return its id. Task-family types materialize a board
/// task as a side effect.
pub async fn create_chat(
    app: &TestApp,
    token: &str,
    workspace_id: Uuid,
    chat_type: &str,
    name: &str,
) -> Uuid {
    let response = app
        .post(
            &format!("/workspaces/{workspace_id}/chats"),
            token,
            json!({ "name": name, "type": chat_type, "is_public": true }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json(response).await;
    uuid_of(&data(&body)["id"])
}
