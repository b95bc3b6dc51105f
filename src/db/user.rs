//! User model for voy-auth.

use chrono::{DateTime, Utc};

/// A registered user.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    /// Unique user ID.
    pub id: i64,
    /// Login email (unique, compared exactly as stored).
    pub email: String,
    /// Argon2id PHC hash. Never leaves the service.
    pub password_hash: String,
    /// Display name.
    pub full_name: String,
    /// Account creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
    /// Soft-delete marker.
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Data for creating a new user.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Login email.
    pub email: String,
    /// Password hash (pre-hashed with Argon2id).
    pub password_hash: String,
    /// Display name.
    pub full_name: String,
    /// Creation instant; also used as the initial `updated_at`.
    pub created_at: DateTime<Utc>,
}

impl NewUser {
    /// Create a new user record stamped at `now`.
    pub fn new(
        email: impl Into<String>,
        password_hash: impl Into<String>,
        full_name: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            email: email.into(),
            password_hash: password_hash.into(),
            full_name: full_name.into(),
            created_at: now,
        }
    }
}

/// Partial update of a user. Unset fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    /// New display name.
    pub full_name: Option<String>,
    /// New password hash.
    pub password_hash: Option<String>,
}

impl UserUpdate {
    /// Create an empty update.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the display name.
    pub fn full_name(mut self, full_name: impl Into<String>) -> Self {
        self.full_name = Some(full_name.into());
        self
    }

    /// Set the password hash.
    pub fn password_hash(mut self, password_hash: impl Into<String>) -> Self {
        self.password_hash = Some(password_hash.into());
        self
    }

    /// Whether the update changes nothing.
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none() && self.password_hash.is_none()
    }
}
