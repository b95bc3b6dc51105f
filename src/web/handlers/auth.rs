//! Authentication handlers.

use axum::{
    extract::{ConnectInfo, State},
    http::{header::SET_COOKIE, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::{headers::UserAgent, TypedHeader};
use std::net::SocketAddr;
use std::sync::Arc;

use crate::auth::{
    AuthService, Credentials, IssuedSession, Registration, SessionGuard, TokenIssuer,
    TokenVerifier,
};
use crate::clock::Clock;
use crate::config::AuthConfig;
use crate::web::cookie::CookieSettings;
use crate::web::dto::{
    ApiResponse, AuthResponse, ChangePasswordRequest, LoginRequest, LogoutRequest,
    LogoutResponse, MessageResponse, RegisterRequest, UpdateProfileRequest, UserInfo,
    ValidatedJson,
};
use crate::web::error::{ApiError, ErrorBody};
use crate::web::middleware::{client_info, AuthUser};
use crate::{Database, VoyError};

/// Application state shared across handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Session lifecycle.
    pub auth: Arc<AuthService>,
    /// Per-request token check.
    pub guard: SessionGuard,
    /// Session cookie settings.
    pub cookies: CookieSettings,
}

impl AppState {
    /// Create a new application state.
    pub fn new(auth: Arc<AuthService>, guard: SessionGuard, cookies: CookieSettings) -> Self {
        Self {
            auth,
            guard,
            cookies,
        }
    }

    /// Wire the service, guard and cookie settings from one auth config.
    ///
    /// Issuer and verifier share the configured secret. Fails when the
    /// token lifetime does not fit a `chrono::Duration`.
    pub fn from_config(
        db: Database,
        clock: Arc<dyn Clock>,
        config: &AuthConfig,
    ) -> crate::Result<Self> {
        let token_ttl = i64::try_from(config.token_ttl_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .ok_or_else(|| {
                VoyError::Config(format!(
                    "token_ttl_secs out of range: {}",
                    config.token_ttl_secs
                ))
            })?;
        let auth = AuthService::new(
            db.clone(),
            TokenIssuer::new(&config.jwt_secret),
            clock.clone(),
            token_ttl,
        );
        let guard = SessionGuard::new(TokenVerifier::new(&config.jwt_secret), db, clock);

        Ok(Self::new(
            Arc::new(auth),
            guard,
            CookieSettings::from_config(config),
        ))
    }

    fn session_cookie(&self, token: &str) -> Result<HeaderValue, ApiError> {
        self.cookies.session_cookie(token).map_err(|e| {
            tracing::error!(error = %e, "Failed to build session cookie");
            ApiError::internal("Failed to create session")
        })
    }
}

fn auth_response(
    state: &AppState,
    status: StatusCode,
    issued: IssuedSession,
) -> Result<Response, ApiError> {
    let cookie = state.session_cookie(&issued.token)?;
    let body = AuthResponse {
        user: UserInfo::from(&issued.user),
        expires_at: issued.session.expires_at,
    };
    Ok((status, [(SET_COOKIE, cookie)], Json(ApiResponse::new(body))).into_response())
}

/// POST /api/auth/register - Create an account and sign in.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registered; session cookie set", body = AuthResponse),
        (status = 400, description = "Malformed JSON", body = ErrorBody),
        (status = 409, description = "Email already registered", body = ErrorBody),
        (status = 422, description = "Validation failed", body = ErrorBody)
    )
)]
pub async fn register(
    State(state): State<Arc<AppState>>,
    peer: Option<ConnectInfo<SocketAddr>>,
    user_agent: Option<TypedHeader<UserAgent>>,
    headers: HeaderMap,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<Response, ApiError> {
    let client = client_info(
        &headers,
        user_agent.as_ref().map(|TypedHeader(ua)| ua.as_str()),
        peer.map(|ConnectInfo(addr)| addr),
    );

    let registration: Registration = req.into();
    let issued = state.auth.register(&registration, &client).await?;
    auth_response(&state, StatusCode::CREATED, issued)
}

/// POST /api/auth/login - Sign in with email and password.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in; session cookie set", body = AuthResponse),
        (status = 400, description = "Malformed JSON", body = ErrorBody),
        (status = 401, description = "Invalid email or password", body = ErrorBody),
        (status = 422, description = "Validation failed", body = ErrorBody)
    )
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    peer: Option<ConnectInfo<SocketAddr>>,
    user_agent: Option<TypedHeader<UserAgent>>,
    headers: HeaderMap,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<Response, ApiError> {
    let client = client_info(
        &headers,
        user_agent.as_ref().map(|TypedHeader(ua)| ua.as_str()),
        peer.map(|ConnectInfo(addr)| addr),
    );

    let credentials: Credentials = req.into();
    let issued = state.auth.login(&credentials, &client).await?;
    auth_response(&state, StatusCode::OK, issued)
}

/// POST /api/auth/logout - End this session, or all of them.
///
/// A missing or unparsable body is treated as `{"all": false}`.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "auth",
    request_body(content = LogoutRequest, description = "Optional; defaults to this session only"),
    responses(
        (status = 200, description = "Logged out; session cookie cleared", body = LogoutResponse),
        (status = 401, description = "Not authenticated", body = ErrorBody)
    ),
    security(("bearer_auth" = []), ("cookie_auth" = []))
)]
pub async fn logout(
    State(state): State<Arc<AppState>>,
    AuthUser(identity): AuthUser,
    body: Option<Json<LogoutRequest>>,
) -> Result<Response, ApiError> {
    let all = body.map(|Json(req)| req.all).unwrap_or(false);

    let revoked = state
        .auth
        .logout(identity.user_id, &identity.session_id, all)
        .await?;

    let cookie = state.cookies.clear().map_err(|e| {
        tracing::error!(error = %e, "Failed to build clearing cookie");
        ApiError::internal("Failed to clear session")
    })?;

    Ok((
        [(SET_COOKIE, cookie)],
        Json(ApiResponse::new(LogoutResponse { revoked })),
    )
        .into_response())
}

/// GET /api/auth/me - Current user's profile.
#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "auth",
    responses(
        (status = 200, description = "Current user", body = UserInfo),
        (status = 401, description = "Not authenticated", body = ErrorBody),
        (status = 404, description = "User no longer exists", body = ErrorBody)
    ),
    security(("bearer_auth" = []), ("cookie_auth" = []))
)]
pub async fn me(
    State(state): State<Arc<AppState>>,
    AuthUser(identity): AuthUser,
) -> Result<Json<ApiResponse<UserInfo>>, ApiError> {
    let user = state.auth.profile(identity.user_id).await?;
    Ok(Json(ApiResponse::new(UserInfo::from(&user))))
}

/// PUT /api/auth/profile - Change the display name.
#[utoipa::path(
    put,
    path = "/api/auth/profile",
    tag = "auth",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated profile", body = UserInfo),
        (status = 401, description = "Not authenticated", body = ErrorBody),
        (status = 404, description = "User no longer exists", body = ErrorBody),
        (status = 422, description = "Validation failed", body = ErrorBody)
    ),
    security(("bearer_auth" = []), ("cookie_auth" = []))
)]
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    AuthUser(identity): AuthUser,
    ValidatedJson(req): ValidatedJson<UpdateProfileRequest>,
) -> Result<Json<ApiResponse<UserInfo>>, ApiError> {
    let user = state
        .auth
        .update_profile(identity.user_id, req.full_name.trim())
        .await?;
    Ok(Json(ApiResponse::new(UserInfo::from(&user))))
}

/// PUT /api/auth/password - Change the password.
#[utoipa::path(
    put,
    path = "/api/auth/password",
    tag = "auth",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 401, description = "Not authenticated", body = ErrorBody),
        (status = 403, description = "Current password is incorrect", body = ErrorBody),
        (status = 404, description = "User no longer exists", body = ErrorBody),
        (status = 422, description = "Validation failed", body = ErrorBody)
    ),
    security(("bearer_auth" = []), ("cookie_auth" = []))
)]
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    AuthUser(identity): AuthUser,
    ValidatedJson(req): ValidatedJson<ChangePasswordRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state
        .auth
        .change_password(identity.user_id, &req.current_password, &req.new_password)
        .await?;
    Ok(Json(ApiResponse::new(MessageResponse::new(
        "Password changed",
    ))))
}
