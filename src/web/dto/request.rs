//! Request DTOs for the auth API.

use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use super::validation::display_name;
use crate::auth::{Credentials, Registration};

/// User registration request.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    /// Email address, used as the login name.
    #[validate(email(message = "Must be a valid email address"))]
    #[schema(example = "alice@example.com")]
    pub email: String,
    /// Password.
    #[validate(length(
        min = 8,
        max = 128,
        message = "Password must be between 8 and 128 characters"
    ))]
    pub password: String,
    /// Display name.
    #[validate(
        length(max = 100, message = "Full name must be at most 100 characters"),
        custom(function = "display_name")
    )]
    #[schema(example = "Alice Liddell")]
    pub full_name: String,
}

impl From<RegisterRequest> for Registration {
    fn from(req: RegisterRequest) -> Self {
        Registration {
            email: req.email.trim().to_string(),
            password: req.password,
            full_name: req.full_name.trim().to_string(),
        }
    }
}

/// Login request.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    /// Email address.
    #[validate(email(message = "Must be a valid email address"))]
    pub email: String,
    /// Password.
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

impl From<LoginRequest> for Credentials {
    fn from(req: LoginRequest) -> Self {
        Credentials {
            email: req.email.trim().to_string(),
            password: req.password,
        }
    }
}

/// Logout request. The body is optional.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct LogoutRequest {
    /// End every session of the user instead of just this one.
    #[serde(default)]
    pub all: bool,
}

/// Profile update request.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateProfileRequest {
    /// New display name.
    #[validate(
        length(max = 100, message = "Full name must be at most 100 characters"),
        custom(function = "display_name")
    )]
    pub full_name: String,
}

/// Password change request.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ChangePasswordRequest {
    /// Current password.
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,
    /// New password.
    #[validate(length(
        min = 8,
        max = 128,
        message = "Password must be between 8 and 128 characters"
    ))]
    pub new_password: String,
}
