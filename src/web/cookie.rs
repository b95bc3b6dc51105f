//! Session cookie construction.

use axum::http::header::{HeaderValue, InvalidHeaderValue};

use crate::config::AuthConfig;

/// How the session cookie is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieSettings {
    /// Cookie name.
    pub name: String,
    /// Optional `Domain` attribute.
    pub domain: Option<String>,
    /// Add the `Secure` attribute.
    pub secure: bool,
    /// `Max-Age` for a freshly issued cookie, in seconds.
    pub max_age_secs: u64,
}

impl CookieSettings {
    /// Build the settings from the auth configuration.
    pub fn from_config(config: &AuthConfig) -> Self {
        Self {
            name: config.cookie_name.clone(),
            domain: config.cookie_domain.clone(),
            secure: config.cookie_secure,
            max_age_secs: config.token_ttl_secs,
        }
    }

    /// `Set-Cookie` value carrying a freshly issued token.
    pub fn session_cookie(&self, token: &str) -> Result<HeaderValue, InvalidHeaderValue> {
        HeaderValue::from_str(&self.render(token, self.max_age_secs))
    }

    /// `Set-Cookie` value that removes the session cookie.
    pub fn clear(&self) -> Result<HeaderValue, InvalidHeaderValue> {
        HeaderValue::from_str(&self.render("", 0))
    }

    fn render(&self, value: &str, max_age: u64) -> String {
        let mut cookie = format!(
            "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
            self.name, value, max_age
        );
        if let Some(domain) = &self.domain {
            cookie.push_str("; Domain=");
            cookie.push_str(domain);
        }
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }
}
