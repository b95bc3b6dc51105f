//! Middleware for the auth API.

pub mod auth;
pub mod client;
pub mod cors;
pub mod security;

pub use auth::{extract_token, require_session, AuthUser};
pub use client::{client_info, client_ip};
pub use cors::create_cors_layer;
pub use security::security_headers;
