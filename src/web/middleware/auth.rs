//! Session authentication middleware.
//!
//! `require_session` runs in front of every protected route. It pulls the
//! token from the session cookie (or a bearer header), hands it to the
//! [`SessionGuard`](crate::auth::SessionGuard) and, on success, stores the
//! resulting [`Identity`] in the request extensions for [`AuthUser`].

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;

use crate::auth::Identity;
use crate::web::error::ApiError;
use crate::web::handlers::AppState;

/// Find the presented token. The cookie wins over the header.
pub fn extract_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    if let Some(cookie) = jar.get(cookie_name) {
        if !cookie.value().is_empty() {
            return Some(cookie.value().to_string());
        }
    }

    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

/// Reject the request unless it carries a token for a live session.
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_token(request.headers(), &state.cookies.name).ok_or_else(|| {
        tracing::debug!(path = %request.uri().path(), "No session token presented");
        ApiError::unauthenticated()
    })?;

    let identity = state.guard.authenticate(&token).await?;

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

/// Extractor for the authenticated caller.
///
/// Only valid on routes behind [`require_session`].
#[derive(Debug, Clone)]
pub struct AuthUser(pub Identity);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .map(AuthUser)
            .ok_or_else(ApiError::unauthenticated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::COOKIE;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn test_extract_token_from_cookie() {
        let map = headers(&[("cookie", "theme=dark; voy_auth=cookie-token")]);
        assert_eq!(extract_token(&map, "voy_auth").as_deref(), Some("cookie-token"));
    }

    #[test]
    fn test_extract_token_from_bearer() {
        let map = headers(&[("authorization", "Bearer header-token")]);
        assert_eq!(extract_token(&map, "voy_auth").as_deref(), Some("header-token"));
    }

    #[test]
    fn test_cookie_takes_precedence() {
        let mut map = headers(&[("authorization", "Bearer header-token")]);
        map.insert(COOKIE, HeaderValue::from_static("voy_auth=cookie-token"));
        assert_eq!(extract_token(&map, "voy_auth").as_deref(), Some("cookie-token"));
    }

    #[test]
    fn test_empty_cookie_falls_back_to_header() {
        let map = headers(&[
            ("cookie", "voy_auth="),
            ("authorization", "Bearer header-token"),
        ]);
        assert_eq!(extract_token(&map, "voy_auth").as_deref(), Some("header-token"));
    }

    #[test]
    fn test_no_token() {
        assert!(extract_token(&HeaderMap::new(), "voy_auth").is_none());

        let map = headers(&[("authorization", "Basic dXNlcjpwYXNz")]);
        assert!(extract_token(&map, "voy_auth").is_none());

        let map = headers(&[("authorization", "Bearer   ")]);
        assert!(extract_token(&map, "voy_auth").is_none());

        let map = headers(&[("cookie", "other=value")]);
        assert!(extract_token(&map, "voy_auth").is_none());
    }
}
