//! API error handling.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::collections::HashMap;
use utoipa::ToSchema;

use crate::auth::AuthError;

/// Machine-readable error code carried in every error body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// 400
    BadRequest,
    /// 401
    Unauthorized,
    /// 403
    Forbidden,
    /// 404
    NotFound,
    /// 409
    Conflict,
    /// 422, with per-field details
    ValidationError,
    /// 500
    InternalError,
}

impl ErrorCode {
    /// HTTP status for this code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::ValidationError => StatusCode::UNPROCESSABLE_ENTITY,
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// `{"error": {...}}`
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// The failure.
    pub error: ErrorDetail,
}

/// Code, message and optional field details of a failure.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable code.
    pub code: ErrorCode,
    /// Human-readable message, safe to show to clients.
    pub message: String,
    /// Field name to messages; validation failures only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<FieldErrors>,
}

/// Validation messages keyed by field name.
pub type FieldErrors = HashMap<String, Vec<String>>;

/// Error returned by handlers and extractors.
#[derive(Debug, thiserror::Error)]
#[error("{code:?}: {message}")]
pub struct ApiError {
    code: ErrorCode,
    message: String,
    details: Option<FieldErrors>,
}

impl ApiError {
    /// Error with the given code and message, without field details.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Error code.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Client-facing message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// 400 for bodies that cannot be parsed.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    /// The one rejection used for every failed authentication.
    pub fn unauthenticated() -> Self {
        Self::new(ErrorCode::Unauthorized, "Authentication required")
    }

    /// 500; callers log the cause before building it.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// 422 carrying per-field messages.
    pub fn validation(details: FieldErrors) -> Self {
        Self {
            details: Some(details),
            ..Self::new(ErrorCode::ValidationError, "Validation failed")
        }
    }

    /// Flatten `validator` output into per-field messages.
    pub fn from_validation_errors(errors: validator::ValidationErrors) -> Self {
        let details = errors
            .field_errors()
            .into_iter()
            .map(|(field, failures)| {
                let messages = failures
                    .iter()
                    .map(|failure| match &failure.message {
                        Some(message) => message.to_string(),
                        None => format!("{} is invalid", field),
                    })
                    .collect();
                (field.to_string(), messages)
            })
            .collect();
        Self::validation(details)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
                details: self.details,
            },
        };
        (self.code.status_code(), Json(body)).into_response()
    }
}

// Status is chosen by kind alone. Internal details were already logged
// where the failure happened.
impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => {
                ApiError::new(ErrorCode::Unauthorized, "Invalid email or password")
            }
            AuthError::UserExists => {
                ApiError::new(ErrorCode::Conflict, "User with this email already exists")
            }
            AuthError::Unauthenticated => ApiError::unauthenticated(),
            AuthError::NotFound(what) => {
                ApiError::new(ErrorCode::NotFound, format!("{} not found", what))
            }
            AuthError::InvalidPassword => {
                ApiError::new(ErrorCode::Forbidden, "Current password is incorrect")
            }
            AuthError::Internal => ApiError::internal("An internal error occurred"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Form {
        #[validate(email(message = "Must be a valid email address"))]
        email: String,
        #[validate(length(min = 8))]
        password: String,
    }

    #[test]
    fn test_auth_error_mapping() {
        let cases = [
            (AuthError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (AuthError::UserExists, StatusCode::CONFLICT),
            (AuthError::Unauthenticated, StatusCode::UNAUTHORIZED),
            (AuthError::NotFound("user"), StatusCode::NOT_FOUND),
            (AuthError::InvalidPassword, StatusCode::FORBIDDEN),
            (AuthError::Internal, StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (auth_err, expected) in cases {
            assert_eq!(ApiError::from(auth_err).code().status_code(), expected);
        }
    }

    #[test]
    fn test_unauthenticated_message_is_uniform() {
        let err = ApiError::from(AuthError::Unauthenticated);
        assert_eq!(err.message(), "Authentication required");
        assert_eq!(err.message(), ApiError::unauthenticated().message());
    }

    #[test]
    fn test_internal_message_hides_detail() {
        let err = ApiError::from(AuthError::Internal);
        assert_eq!(err.message(), "An internal error occurred");
    }

    #[test]
    fn test_from_validation_errors() {
        let form = Form {
            email: "nope".to_string(),
            password: "short".to_string(),
        };
        let err = ApiError::from_validation_errors(form.validate().unwrap_err());

        assert_eq!(err.code(), ErrorCode::ValidationError);
        let details = err.details.unwrap();
        assert_eq!(details["email"], vec!["Must be a valid email address".to_string()]);
        assert_eq!(details["password"], vec!["password is invalid".to_string()]);
    }

    #[tokio::test]
    async fn test_into_response_body() {
        use http_body_util::BodyExt;

        let response = ApiError::new(ErrorCode::Conflict, "taken").into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["code"], "CONFLICT");
        assert_eq!(body["error"]["message"], "taken");
        assert!(body["error"].get("details").is_none());
    }
}
