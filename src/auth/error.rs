//! Error kinds surfaced by the authentication core.

use thiserror::Error;

/// Authentication errors.
///
/// Closed set: the HTTP layer maps each kind to a status without looking at
/// messages.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Unknown email or wrong password. Deliberately indistinguishable.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// Registration for an email that is already taken.
    #[error("user already exists")]
    UserExists,

    /// Missing, invalid, expired or revoked token.
    #[error("authentication required")]
    Unauthenticated,

    /// A referenced entity is gone.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Wrong current password on password change.
    #[error("current password is incorrect")]
    InvalidPassword,

    /// Storage or crypto failure. Details are logged, not returned.
    #[error("internal error")]
    Internal,
}
