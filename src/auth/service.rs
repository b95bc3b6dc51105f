//! Session lifecycle: registration, login, logout and account upkeep.
//!
//! Every timestamp written here comes from the injected clock; the storage
//! layer never stamps anything on its own.

use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use super::error::AuthError;
use super::password::{hash_password, verify_password};
use super::token::{hash_token, TokenIssuer};
use crate::clock::Clock;
use crate::db::{NewSession, NewUser, Session, SessionRepository, User, UserRepository, UserUpdate};
use crate::{Database, VoyError};

/// Registration input.
#[derive(Debug, Clone)]
pub struct Registration {
    /// Login email.
    pub email: String,
    /// Plaintext password.
    pub password: String,
    /// Display name.
    pub full_name: String,
}

/// Login input.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Login email.
    pub email: String,
    /// Plaintext password.
    pub password: String,
}

/// Client details recorded on the session row for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    /// `User-Agent` header.
    pub user_agent: String,
    /// Client IP address.
    pub ip_address: String,
}

/// Result of a successful login or registration.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    /// The authenticated user.
    pub user: User,
    /// The freshly created session.
    pub session: Session,
    /// Signed token bound to `session`.
    pub token: String,
}

/// Session lifecycle manager.
#[derive(Debug)]
pub struct AuthService {
    db: Database,
    issuer: TokenIssuer,
    clock: Arc<dyn Clock>,
    token_ttl: Duration,
}

/// Hash checked when the login email is unknown.
fn dummy_hash() -> Option<&'static str> {
    static DUMMY: OnceLock<Option<String>> = OnceLock::new();
    DUMMY
        .get_or_init(|| hash_password("voy-auth-unknown-account").ok())
        .as_deref()
}

/// Log a storage failure with context and collapse it to `Internal`.
fn internal(context: &'static str) -> impl FnOnce(VoyError) -> AuthError {
    move |e| {
        tracing::error!(error = %e, "{}", context);
        AuthError::Internal
    }
}

impl AuthService {
    /// Create the service.
    pub fn new(db: Database, issuer: TokenIssuer, clock: Arc<dyn Clock>, token_ttl: Duration) -> Self {
        Self {
            db,
            issuer,
            clock,
            token_ttl,
        }
    }

    fn expiry(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, AuthError> {
        now.checked_add_signed(self.token_ttl).ok_or_else(|| {
            tracing::error!(ttl_secs = self.token_ttl.num_seconds(), "Session expiry overflows");
            AuthError::Internal
        })
    }

    /// Register a new user and open their first session.
    pub async fn register(
        &self,
        registration: &Registration,
        client: &ClientInfo,
    ) -> Result<IssuedSession, AuthError> {
        let users = UserRepository::new(self.db.pool());

        if users
            .email_exists(&registration.email)
            .await
            .map_err(internal("Failed to check email availability"))?
        {
            tracing::debug!("Registration rejected: email already registered");
            return Err(AuthError::UserExists);
        }

        let password_hash = hash_password(&registration.password).map_err(|e| {
            tracing::error!(error = %e, "Failed to hash password");
            AuthError::Internal
        })?;

        let now = self.clock.now();
        let expires_at = self.expiry(now)?;
        let new_user = NewUser::new(
            &registration.email,
            password_hash,
            &registration.full_name,
            now,
        );

        // The pre-check can race with a concurrent registration.
        let user = match users.create(&new_user).await {
            Ok(user) => user,
            Err(VoyError::Conflict(_)) => return Err(AuthError::UserExists),
            Err(e) => return Err(internal("Failed to create user")(e)),
        };

        tracing::info!(user_id = user.id, "User registered");

        self.open_session(user, client, now, expires_at).await
    }

    /// Authenticate with email and password and open a new session.
    ///
    /// Unknown email and wrong password fail identically.
    pub async fn login(
        &self,
        credentials: &Credentials,
        client: &ClientInfo,
    ) -> Result<IssuedSession, AuthError> {
        let user = UserRepository::new(self.db.pool())
            .get_by_email(&credentials.email)
            .await
            .map_err(internal("Failed to look up user"))?;

        let Some(user) = user else {
            // Burn the same Argon2 work as a real check.
            if let Some(hash) = dummy_hash() {
                let _ = verify_password(&credentials.password, hash);
            }
            tracing::debug!("Login failed: unknown email");
            return Err(AuthError::InvalidCredentials);
        };

        if !verify_password(&credentials.password, &user.password_hash) {
            tracing::debug!(user_id = user.id, "Login failed: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let now = self.clock.now();
        let expires_at = self.expiry(now)?;
        let issued = self.open_session(user, client, now, expires_at).await?;
        tracing::info!(
            user_id = issued.user.id,
            session_id = %issued.session.id,
            "User logged in"
        );
        Ok(issued)
    }

    async fn open_session(
        &self,
        user: User,
        client: &ClientInfo,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<IssuedSession, AuthError> {
        let session_id = Uuid::new_v4().to_string();

        let token = self
            .issuer
            .issue(user.id, &user.email, &session_id, now, expires_at)
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to sign token");
                AuthError::Internal
            })?;

        let session = SessionRepository::new(self.db.pool())
            .create(&NewSession {
                id: session_id,
                user_id: user.id,
                token_hash: hash_token(&token),
                user_agent: client.user_agent.clone(),
                ip_address: client.ip_address.clone(),
                expires_at,
                created_at: now,
            })
            .await
            .map_err(internal("Failed to create session"))?;

        Ok(IssuedSession {
            user,
            session,
            token,
        })
    }

    /// End one session, or every session of the user when `all` is set.
    ///
    /// Idempotent. Returns how many sessions were deactivated.
    pub async fn logout(&self, user_id: i64, session_id: &str, all: bool) -> Result<u64, AuthError> {
        let sessions = SessionRepository::new(self.db.pool());
        let now = self.clock.now();

        let revoked = if all {
            sessions.deactivate_all(user_id, now).await
        } else {
            sessions.deactivate(user_id, session_id, now).await
        }
        .map_err(internal("Failed to deactivate session"))?;

        tracing::info!(user_id, session_id, all, revoked, "User logged out");
        Ok(revoked)
    }

    /// Delete every session that expired before now.
    pub async fn cleanup_expired(&self) -> Result<u64, AuthError> {
        SessionRepository::new(self.db.pool())
            .delete_expired(self.clock.now())
            .await
            .map_err(internal("Failed to delete expired sessions"))
    }

    /// Fetch the user's profile.
    pub async fn profile(&self, user_id: i64) -> Result<User, AuthError> {
        UserRepository::new(self.db.pool())
            .get_by_id(user_id)
            .await
            .map_err(internal("Failed to load user"))?
            .ok_or(AuthError::NotFound("user"))
    }

    /// Change the user's display name.
    pub async fn update_profile(&self, user_id: i64, full_name: &str) -> Result<User, AuthError> {
        let update = UserUpdate::new().full_name(full_name);
        UserRepository::new(self.db.pool())
            .update(user_id, &update, self.clock.now())
            .await
            .map_err(internal("Failed to update user"))?
            .ok_or(AuthError::NotFound("user"))
    }

    /// Replace the user's password after checking the current one.
    ///
    /// Existing sessions stay valid.
    pub async fn change_password(
        &self,
        user_id: i64,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let user = self.profile(user_id).await?;

        if !verify_password(current_password, &user.password_hash) {
            tracing::debug!(user_id, "Password change rejected: wrong current password");
            return Err(AuthError::InvalidPassword);
        }

        let password_hash = hash_password(new_password).map_err(|e| {
            tracing::error!(error = %e, "Failed to hash password");
            AuthError::Internal
        })?;

        UserRepository::new(self.db.pool())
            .update(
                user_id,
                &UserUpdate::new().password_hash(password_hash),
                self.clock.now(),
            )
            .await
            .map_err(internal("Failed to update password"))?
            .ok_or(AuthError::NotFound("user"))?;

        tracing::info!(user_id, "Password changed");
        Ok(())
    }
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use super::*;
    use crate::auth::guard::SessionGuard;
    use crate::auth::token::TokenVerifier;
    use crate::clock::ManualClock;
    use chrono::TimeZone;

    const SECRET: &str = "service-test-secret";

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    struct Fixture {
        db: Database,
        clock: ManualClock,
        service: AuthService,
        guard: SessionGuard,
    }

    async fn fixture() -> Fixture {
        let db = Database::open_in_memory().await.unwrap();
        let clock = ManualClock::new(t0());
        let service = AuthService::new(
            db.clone(),
            TokenIssuer::new(SECRET),
            Arc::new(clock.clone()),
            Duration::hours(24),
        );
        let guard = SessionGuard::new(
            TokenVerifier::new(SECRET),
            db.clone(),
            Arc::new(clock.clone()),
        );
        Fixture {
            db,
            clock,
            service,
            guard,
        }
    }

    fn registration(email: &str) -> Registration {
        Registration {
            email: email.to_string(),
            password: "password123".to_string(),
            full_name: "Test User".to_string(),
        }
    }

    fn credentials(email: &str, password: &str) -> Credentials {
        Credentials {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    fn client() -> ClientInfo {
        ClientInfo {
            user_agent: "unit-test".to_string(),
            ip_address: "10.0.0.1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_opens_session() {
        let f = fixture().await;
        let issued = f
            .service
            .register(&registration("a@example.com"), &client())
            .await
            .unwrap();

        assert_eq!(issued.user.email, "a@example.com");
        assert_eq!(issued.user.full_name, "Test User");
        assert_ne!(issued.user.password_hash, "password123");
        assert_eq!(issued.session.user_id, issued.user.id);
        assert_eq!(issued.session.expires_at, t0() + Duration::hours(24));
        assert_eq!(issued.session.user_agent, "unit-test");
        assert_eq!(issued.session.ip_address, "10.0.0.1");
        assert!(issued.session.is_active);
        assert_eq!(issued.session.token_hash, hash_token(&issued.token));
        assert!(Uuid::parse_str(&issued.session.id).is_ok());

        let identity = f.guard.authenticate(&issued.token).await.unwrap();
        assert_eq!(identity.user_id, issued.user.id);
        assert_eq!(identity.session_id, issued.session.id);
    }

    #[tokio::test]
    async fn test_register_duplicate_leaves_user_unchanged() {
        let f = fixture().await;
        let first = f
            .service
            .register(&registration("a@example.com"), &client())
            .await
            .unwrap();

        f.clock.advance(Duration::minutes(5));
        let mut again = registration("a@example.com");
        again.password = "different-password".to_string();
        again.full_name = "Impostor".to_string();

        assert_eq!(
            f.service.register(&again, &client()).await.unwrap_err(),
            AuthError::UserExists
        );

        let user = f.service.profile(first.user.id).await.unwrap();
        assert_eq!(user.full_name, "Test User");
        assert_eq!(user.password_hash, first.user.password_hash);
        assert_eq!(user.updated_at, t0());
    }

    #[tokio::test]
    async fn test_login_then_guard_yields_same_identity() {
        let f = fixture().await;
        f.service
            .register(&registration("a@example.com"), &client())
            .await
            .unwrap();

        let issued = f
            .service
            .login(&credentials("a@example.com", "password123"), &client())
            .await
            .unwrap();

        let identity = f.guard.authenticate(&issued.token).await.unwrap();
        assert_eq!(identity.user_id, issued.user.id);
        assert_eq!(identity.session_id, issued.session.id);
        assert_eq!(identity.email, "a@example.com");
    }

    #[tokio::test]
    async fn test_login_failures_are_uniform() {
        let f = fixture().await;
        f.service
            .register(&registration("a@example.com"), &client())
            .await
            .unwrap();

        let wrong_password = f
            .service
            .login(&credentials("a@example.com", "wrong-password"), &client())
            .await
            .unwrap_err();
        let unknown_email = f
            .service
            .login(&credentials("nobody@example.com", "password123"), &client())
            .await
            .unwrap_err();

        assert_eq!(wrong_password, AuthError::InvalidCredentials);
        assert_eq!(unknown_email, AuthError::InvalidCredentials);
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
    }

    #[test]
    fn test_dummy_hash_is_stable_and_rejects() {
        let hash = dummy_hash().unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(std::ptr::eq(hash, dummy_hash().unwrap()));
        assert!(!verify_password("password123", hash));
    }

    #[tokio::test]
    async fn test_overflowing_ttl_creates_nothing() {
        let f = fixture().await;
        let service = AuthService::new(
            f.db.clone(),
            TokenIssuer::new(SECRET),
            Arc::new(f.clock.clone()),
            Duration::seconds(1_000_000_000_000_000),
        );

        assert_eq!(
            service
                .register(&registration("a@example.com"), &client())
                .await
                .unwrap_err(),
            AuthError::Internal
        );
        let users = UserRepository::new(f.db.pool());
        assert!(!users.email_exists("a@example.com").await.unwrap());

        // A sane lifetime can still register the same email afterwards.
        f.service
            .register(&registration("a@example.com"), &client())
            .await
            .unwrap();
        assert_eq!(
            service
                .login(&credentials("a@example.com", "password123"), &client())
                .await
                .unwrap_err(),
            AuthError::Internal
        );
    }

    #[tokio::test]
    async fn test_register_then_login_gives_distinct_sessions() {
        let f = fixture().await;
        let s1 = f
            .service
            .register(&registration("a@example.com"), &client())
            .await
            .unwrap();
        f.clock.advance(Duration::seconds(10));
        let s2 = f
            .service
            .login(&credentials("a@example.com", "password123"), &client())
            .await
            .unwrap();

        assert_ne!(s1.session.id, s2.session.id);
        assert_ne!(s1.token, s2.token);
        assert!(f.guard.authenticate(&s1.token).await.is_ok());
        assert!(f.guard.authenticate(&s2.token).await.is_ok());
    }

    #[tokio::test]
    async fn test_logout_one_keeps_siblings() {
        let f = fixture().await;
        let s1 = f
            .service
            .register(&registration("a@example.com"), &client())
            .await
            .unwrap();
        let s2 = f
            .service
            .login(&credentials("a@example.com", "password123"), &client())
            .await
            .unwrap();

        let revoked = f
            .service
            .logout(s1.user.id, &s1.session.id, false)
            .await
            .unwrap();
        assert_eq!(revoked, 1);

        assert_eq!(
            f.guard.authenticate(&s1.token).await,
            Err(AuthError::Unauthenticated)
        );
        assert!(f.guard.authenticate(&s2.token).await.is_ok());

        let sessions = SessionRepository::new(f.db.pool())
            .list_by_user(s1.user.id)
            .await
            .unwrap();
        let active: Vec<_> = sessions.iter().filter(|s| s.is_active).collect();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, s2.session.id);
    }

    #[tokio::test]
    async fn test_logout_is_idempotent() {
        let f = fixture().await;
        let s1 = f
            .service
            .register(&registration("a@example.com"), &client())
            .await
            .unwrap();

        assert_eq!(f.service.logout(s1.user.id, &s1.session.id, false).await, Ok(1));
        assert_eq!(f.service.logout(s1.user.id, &s1.session.id, false).await, Ok(0));
        assert_eq!(f.service.logout(s1.user.id, "unknown", false).await, Ok(0));
    }

    #[tokio::test]
    async fn test_logout_all_revokes_every_session() {
        let f = fixture().await;
        let s1 = f
            .service
            .register(&registration("a@example.com"), &client())
            .await
            .unwrap();
        let s2 = f
            .service
            .login(&credentials("a@example.com", "password123"), &client())
            .await
            .unwrap();
        let s3 = f
            .service
            .login(&credentials("a@example.com", "password123"), &client())
            .await
            .unwrap();
        let other = f
            .service
            .register(&registration("b@example.com"), &client())
            .await
            .unwrap();

        let revoked = f
            .service
            .logout(s2.user.id, &s2.session.id, true)
            .await
            .unwrap();
        assert_eq!(revoked, 3);

        for token in [&s1.token, &s2.token, &s3.token] {
            assert_eq!(
                f.guard.authenticate(token).await,
                Err(AuthError::Unauthenticated)
            );
        }
        // Other users are untouched.
        assert!(f.guard.authenticate(&other.token).await.is_ok());
    }

    #[tokio::test]
    async fn test_token_expires_with_clock() {
        let f = fixture().await;
        let issued = f
            .service
            .register(&registration("a@example.com"), &client())
            .await
            .unwrap();

        f.clock.advance(Duration::hours(24) - Duration::seconds(1));
        assert!(f.guard.authenticate(&issued.token).await.is_ok());

        f.clock.advance(Duration::seconds(1));
        assert_eq!(
            f.guard.authenticate(&issued.token).await,
            Err(AuthError::Unauthenticated)
        );
    }

    #[tokio::test]
    async fn test_cleanup_removes_only_expired() {
        let f = fixture().await;
        let old = f
            .service
            .register(&registration("a@example.com"), &client())
            .await
            .unwrap();
        f.service.logout(old.user.id, &old.session.id, false).await.unwrap();

        f.clock.advance(Duration::hours(12));
        let fresh = f
            .service
            .login(&credentials("a@example.com", "password123"), &client())
            .await
            .unwrap();

        f.clock.advance(Duration::hours(13));
        assert_eq!(f.service.cleanup_expired().await.unwrap(), 1);

        let sessions = SessionRepository::new(f.db.pool());
        assert!(sessions.get_by_id(&old.session.id).await.unwrap().is_none());
        assert!(sessions.get_by_id(&fresh.session.id).await.unwrap().is_some());
        assert!(f.guard.authenticate(&fresh.token).await.is_ok());

        assert_eq!(f.service.cleanup_expired().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_profile_and_update() {
        let f = fixture().await;
        let issued = f
            .service
            .register(&registration("a@example.com"), &client())
            .await
            .unwrap();

        f.clock.advance(Duration::minutes(1));
        let updated = f
            .service
            .update_profile(issued.user.id, "Renamed User")
            .await
            .unwrap();
        assert_eq!(updated.full_name, "Renamed User");
        assert_eq!(updated.updated_at, t0() + Duration::minutes(1));
        assert_eq!(updated.created_at, t0());

        assert_eq!(
            f.service.profile(issued.user.id).await.unwrap().full_name,
            "Renamed User"
        );
    }

    #[tokio::test]
    async fn test_profile_missing_user() {
        let f = fixture().await;
        assert_eq!(
            f.service.profile(42).await.unwrap_err(),
            AuthError::NotFound("user")
        );
        assert_eq!(
            f.service.update_profile(42, "Nobody").await.unwrap_err(),
            AuthError::NotFound("user")
        );
    }

    #[tokio::test]
    async fn test_change_password() {
        let f = fixture().await;
        let issued = f
            .service
            .register(&registration("a@example.com"), &client())
            .await
            .unwrap();

        assert_eq!(
            f.service
                .change_password(issued.user.id, "wrong-current", "newpassword456")
                .await,
            Err(AuthError::InvalidPassword)
        );

        f.service
            .change_password(issued.user.id, "password123", "newpassword456")
            .await
            .unwrap();

        assert_eq!(
            f.service
                .login(&credentials("a@example.com", "password123"), &client())
                .await
                .unwrap_err(),
            AuthError::InvalidCredentials
        );
        assert!(f
            .service
            .login(&credentials("a@example.com", "newpassword456"), &client())
            .await
            .is_ok());

        // Existing sessions survive a password change.
        assert!(f.guard.authenticate(&issued.token).await.is_ok());
    }

    #[tokio::test]
    async fn test_storage_failure_is_internal() {
        let f = fixture().await;
        f.db.close().await;

        assert_eq!(
            f.service
                .login(&credentials("a@example.com", "password123"), &client())
                .await
                .unwrap_err(),
            AuthError::Internal
        );
        assert_eq!(f.service.cleanup_expired().await, Err(AuthError::Internal));
    }
}
