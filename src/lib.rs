//! voy-auth - authentication service for the Voy platform.
//!
//! User accounts, server-side sessions and signed access tokens, exposed
//! over a small JSON API.

pub mod auth;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod web;

pub use auth::{
    hash_password, verify_password, AuthError, AuthService, ClientInfo, Credentials, Identity,
    IssuedSession, Registration, SessionGuard, TokenIssuer, TokenVerifier,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use db::{Database, NewSession, NewUser, Session, SessionRepository, User, UserRepository};
pub use error::{Result, VoyError};
