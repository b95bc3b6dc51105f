//! OpenAPI document and Swagger UI.

use axum::Router;
use utoipa::openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::web::dto::{
    AuthResponse, ChangePasswordRequest, LoginRequest, LogoutRequest, LogoutResponse,
    MessageResponse, RegisterRequest, UpdateProfileRequest, UserInfo,
};
use crate::web::error::{ErrorBody, ErrorCode, ErrorDetail};
use crate::web::handlers;

/// Path the OpenAPI JSON is served from.
pub const OPENAPI_PATH: &str = "/api-docs/openapi.json";

#[derive(OpenApi)]
#[openapi(
    info(title = "Voy Auth API", description = "Accounts, sessions and access tokens"),
    paths(
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::logout,
        handlers::auth::me,
        handlers::auth::update_profile,
        handlers::auth::change_password,
        handlers::health::health_check,
    ),
    components(schemas(
        RegisterRequest,
        LoginRequest,
        LogoutRequest,
        UpdateProfileRequest,
        ChangePasswordRequest,
        UserInfo,
        AuthResponse,
        LogoutResponse,
        MessageResponse,
        ErrorBody,
        ErrorDetail,
        ErrorCode,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Registration, login and session management"),
        (name = "health", description = "Liveness")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let Some(components) = openapi.components.as_mut() else {
            return;
        };
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
        components.add_security_scheme(
            "cookie_auth",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new("voy_auth"))),
        );
    }
}

/// Swagger UI at `/swagger-ui` backed by the generated document.
pub fn create_swagger_router() -> Router {
    SwaggerUi::new("/swagger-ui")
        .url(OPENAPI_PATH, ApiDoc::openapi())
        .into()
}
