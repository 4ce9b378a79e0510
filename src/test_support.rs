//! Shared helpers for the router-level tests.

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use crate::{
    app::build_app,
    auth::{
        jwt::JwtKeys,
        repo::UserRepo,
        repo_types::{User, UserChanges},
        services::{create_user, NewUserInput},
    },
    state::AppState,
};

pub const TEST_PASSWORD: &str = "testpass123";

pub struct TestApp {
    app: Router,
    pub state: AppState,
}

impl TestApp {
    pub fn new() -> Self {
        let state = AppState::fake();
        Self {
            app: build_app(state.clone()),
            state,
        }
    }

    pub fn router(&self) -> Router {
        self.app.clone()
    }
}

pub async fn make_user(app: &TestApp, email: &str) -> User {
    create_user(app.state.store.as_ref(), NewUserInput::new(email, Some(TEST_PASSWORD)))
        .await
        .expect("create test user")
}

pub async fn make_staff(app: &TestApp, email: &str) -> User {
    let user = make_user(app, email).await;
    app.state
        .store
        .update_user(
            user.id,
            UserChanges {
                is_staff: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap()
}

pub fn bearer(app: &TestApp, user: &User) -> String {
    JwtKeys::from(&app.state.config.jwt)
        .sign_access(user.id)
        .unwrap()
}

/// Sends a JSON request and returns the status with the parsed body (`Null` when empty).
pub async fn send(
    app: &TestApp,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(t) = token {
        req = req.header(header::AUTHORIZATION, format!("Bearer {t}"));
    }
    let req = match body {
        Some(json) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string())),
        None => req.body(Body::empty()),
    }
    .unwrap();

    let resp = app.router().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, value)
}
