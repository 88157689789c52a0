//! services/api/src/web/cookies.rs
//!
//! Session cookies for the access and refresh tokens, and the helpers that read
//! tokens back out of a request.

use axum::http::{header, HeaderMap};
use chrono::Duration;

pub const ACCESS_COOKIE: &str = "accessToken";
pub const REFRESH_COOKIE: &str = "refreshToken";

#[derive(Debug, Clone, Copy)]
pub struct CookieSettings {
    pub secure: bool,
}

impl CookieSettings {
    /// An http-only session cookie carrying `value` for `max_age`.
    pub fn session_cookie(&self, name: &str, value: &str, max_age: Duration) -> String {
        format!(
            "{}={}; HttpOnly;{} SameSite=Lax; Path=/; Max-Age={}",
            name,
            value,
            self.secure_attr(),
            max_age.num_seconds()
        )
    }

    /// A cookie that makes the browser drop `name`.
    pub fn cleared_cookie(&self, name: &str) -> String {
        format!(
            "{}=; HttpOnly;{} SameSite=Lax; Path=/; Max-Age=0",
            name,
            self.secure_attr()
        )
    }

    fn secure_attr(&self) -> &'static str {
        if self.secure {
            " Secure;"
        } else {
            ""
        }
    }
}

/// Finds the value of cookie `name` in the request's `Cookie` headers.
pub fn read_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key == name && !value.is_empty()).then_some(value)
        })
}

/// The token of an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
