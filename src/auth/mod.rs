//! Authentication core for voy-auth.
//!
//! Password hashing, token issuing and verification, the per-request session
//! guard, and the session lifecycle (including the expiry sweep).

pub mod cleanup;
mod error;
mod guard;
mod password;
mod service;
mod token;

pub use error::AuthError;
pub use guard::{Identity, SessionGuard};
pub use password::{hash_password, verify_password, PasswordError};
pub use service::{AuthService, ClientInfo, Credentials, IssuedSession, Registration};
pub use token::{hash_token, Claims, TokenError, TokenIssuer, TokenVerifier};
