//! Router configuration for the auth API.

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, timeout::TimeoutLayer, trace::TraceLayer};

use super::handlers::{
    change_password, health_check, login, logout, me, register, update_profile, AppState,
};
use super::middleware::{create_cors_layer, require_session, security_headers};
use super::openapi::create_swagger_router;
use crate::config::ServerConfig;

/// Create the `/api` router.
pub fn create_router(state: Arc<AppState>, config: &ServerConfig) -> Router {
    let public_routes = Router::new()
        .route("/register", post(register))
        .route("/login", post(login));

    let protected_routes = Router::new()
        .route("/logout", post(logout))
        .route("/me", get(me))
        .route("/profile", put(update_profile))
        .route("/password", put(change_password))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_session,
        ));

    let auth_routes = Router::new().merge(public_routes).merge(protected_routes);

    Router::new()
        .nest("/api/auth", auth_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(Duration::from_secs(
                    config.request_timeout_secs,
                )))
                .layer(create_cors_layer(&config.cors_origins))
                .layer(middleware::from_fn(security_headers)),
        )
        .with_state(state)
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

/// The complete application: API, health check and API docs.
pub fn create_app(state: Arc<AppState>, config: &ServerConfig) -> Router {
    create_router(state, config)
        .merge(create_health_router())
        .merge(create_swagger_router())
        .layer(CompressionLayer::new())
}
