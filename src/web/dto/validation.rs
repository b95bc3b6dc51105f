//! Validated JSON extraction and the custom field rules it relies on.

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationError};

use crate::web::error::ApiError;

/// `Json<T>` followed by `T::validate()`.
///
/// Unparsable bodies are 400; parsed bodies failing validation are 422.
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let payload = match Json::<T>::from_request(req, state).await {
            Ok(Json(payload)) => payload,
            Err(rejection) => {
                tracing::debug!(status = %rejection.status(), "Rejected request body");
                return Err(ApiError::bad_request(rejection.body_text()));
            }
        };

        payload.validate().map_err(ApiError::from_validation_errors)?;
        Ok(Self(payload))
    }
}

fn rule(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(message.into())
}

/// Rejects blank and whitespace-only strings.
pub fn not_empty_trimmed(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(rule("blank", "Must not be blank"));
    }
    Ok(())
}

/// Rejects strings containing control characters.
pub fn no_control_chars(value: &str) -> Result<(), ValidationError> {
    if value.chars().any(char::is_control) {
        return Err(rule("control_chars", "Must not contain control characters"));
    }
    Ok(())
}

/// A display name must be non-blank and free of control characters.
pub fn display_name(value: &str) -> Result<(), ValidationError> {
    not_empty_trimmed(value)?;
    no_control_chars(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_empty_trimmed() {
        assert!(not_empty_trimmed("Alice").is_ok());
        assert!(not_empty_trimmed("  Alice  ").is_ok());
        assert!(not_empty_trimmed("").is_err());
        assert!(not_empty_trimmed("   ").is_err());
        assert!(not_empty_trimmed("\t\n").is_err());
    }

    #[test]
    fn test_no_control_chars() {
        assert!(no_control_chars("Alice Liddell").is_ok());
        assert!(no_control_chars("Alice\x00").is_err());
        assert!(no_control_chars("Line\nBreak").is_err());
    }

    #[test]
    fn test_display_name() {
        assert!(display_name("Alice Liddell").is_ok());
        assert_eq!(display_name("   ").unwrap_err().code, "blank");
        assert_eq!(display_name("Al\x07ice").unwrap_err().code, "control_chars");
    }
}
