//! HTTP API for voy-auth.
//!
//! JSON endpoints under `/api/auth`, a health probe and the OpenAPI docs.

pub mod cookie;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod router;
pub mod server;

pub use cookie::CookieSettings;
pub use error::ApiError;
pub use handlers::AppState;
pub use router::{create_app, create_router};
pub use server::WebServer;
