//! Session guard: decides whether a presented token is still good.

use std::sync::Arc;

use serde::Serialize;

use super::error::AuthError;
use super::token::{hash_token, TokenError, TokenVerifier};
use crate::clock::Clock;
use crate::db::SessionRepository;
use crate::Database;

/// Identity attached to an authenticated request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    /// User ID.
    pub user_id: i64,
    /// Email carried in the token.
    pub email: String,
    /// Session the token belongs to.
    pub session_id: String,
}

/// Verifies tokens and cross-checks the backing session.
#[derive(Debug, Clone)]
pub struct SessionGuard {
    verifier: TokenVerifier,
    db: Database,
    clock: Arc<dyn Clock>,
}

impl SessionGuard {
    /// Create a guard.
    pub fn new(verifier: TokenVerifier, db: Database, clock: Arc<dyn Clock>) -> Self {
        Self {
            verifier,
            db,
            clock,
        }
    }

    /// Authenticate a raw token.
    ///
    /// The signature and expiry must verify, and the session it names must
    /// be active, unexpired and issued for exactly this token. Every failure
    /// is `Unauthenticated`, including a storage failure during the lookup.
    pub async fn authenticate(&self, token: &str) -> Result<Identity, AuthError> {
        let now = self.clock.now();

        let claims = self.verifier.verify(token, now).map_err(|e| {
            match e {
                TokenError::Expired => tracing::debug!("Rejected expired token"),
                other => tracing::debug!(error = %other, "Rejected invalid token"),
            }
            AuthError::Unauthenticated
        })?;

        let session = SessionRepository::new(self.db.pool())
            .find_live(claims.user_id, &claims.session_id, &hash_token(token), now)
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    user_id = claims.user_id,
                    session_id = %claims.session_id,
                    "Session lookup failed"
                );
                AuthError::Unauthenticated
            })?;

        if session.is_none() {
            tracing::debug!(
                user_id = claims.user_id,
                session_id = %claims.session_id,
                "Session inactive, expired or unknown"
            );
            return Err(AuthError::Unauthenticated);
        }

        Ok(Identity {
            user_id: claims.user_id,
            email: claims.email,
            session_id: claims.session_id,
        })
    }
}
