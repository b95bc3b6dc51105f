//! Shared helpers for the HTTP integration tests.

#![allow(dead_code)]

use axum::http::header::{COOKIE, SET_COOKIE};
use axum_test::{TestResponse, TestServer};
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use std::sync::Arc;

use voy_auth::config::{AuthConfig, ServerConfig};
use voy_auth::web::{create_app, AppState};
use voy_auth::{Database, ManualClock};

pub const TEST_SECRET: &str = "test-secret-key-for-testing-only";
pub const COOKIE_NAME: &str = "voy_auth";
pub const PASSWORD: &str = "password123";

/// A running app on an in-memory database with a controllable clock.
pub struct TestApp {
    pub server: TestServer,
    pub clock: ManualClock,
    pub db: Database,
    pub state: Arc<AppState>,
}

pub async fn create_test_app() -> TestApp {
    create_test_app_with(AuthConfig {
        jwt_secret: TEST_SECRET.to_string(),
        token_ttl_secs: 3600,
        ..AuthConfig::default()
    })
    .await
}

pub async fn create_test_app_with(auth: AuthConfig) -> TestApp {
    let db = Database::open_in_memory()
        .await
        .expect("Failed to create test database");
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap());

    let state = Arc::new(
        AppState::from_config(db.clone(), Arc::new(clock.clone()), &auth)
            .expect("Failed to build app state"),
    );
    let router = create_app(state.clone(), &ServerConfig::default());
    let server = TestServer::new(router).expect("Failed to create test server");

    TestApp {
        server,
        clock,
        db,
        state,
    }
}

/// Pull the session token out of a `Set-Cookie` header.
pub fn session_token(response: &TestResponse) -> String {
    let set_cookie = response
        .headers()
        .get(SET_COOKIE)
        .expect("response has no Set-Cookie header")
        .to_str()
        .unwrap()
        .to_string();
    let prefix = format!("{}=", COOKIE_NAME);
    set_cookie
        .split(';')
        .next()
        .and_then(|pair| pair.strip_prefix(&prefix))
        .expect("Set-Cookie is not the session cookie")
        .to_string()
}

pub fn cookie_header(token: &str) -> String {
    format!("{}={}", COOKIE_NAME, token)
}

pub async fn register(server: &TestServer, email: &str, full_name: &str) -> TestResponse {
    server
        .post("/api/auth/register")
        .json(&json!({
            "email": email,
            "password": PASSWORD,
            "full_name": full_name
        }))
        .await
}

/// Register and return the session token.
pub async fn register_user(server: &TestServer, email: &str) -> String {
    let response = register(server, email, "Test User").await;
    response.assert_status(axum::http::StatusCode::CREATED);
    session_token(&response)
}

pub async fn login(server: &TestServer, email: &str, password: &str) -> TestResponse {
    server
        .post("/api/auth/login")
        .json(&json!({
            "email": email,
            "password": password
        }))
        .await
}

/// Log in and return the session token.
pub async fn login_user(server: &TestServer, email: &str) -> String {
    let response = login(server, email, PASSWORD).await;
    response.assert_status_ok();
    session_token(&response)
}

pub async fn me_with_cookie(server: &TestServer, token: &str) -> TestResponse {
    server
        .get("/api/auth/me")
        .add_header(COOKIE, cookie_header(token))
        .await
}

pub fn data(response: &TestResponse) -> Value {
    response.json::<Value>()["data"].clone()
}
