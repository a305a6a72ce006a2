//! services/api/src/web/middleware.rs
//!
//! The access gate in front of every route.

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error};

use crate::error::ApiError;
use crate::web::session::token_from_cookie_header;
use crate::web::state::AppState;

/// Path prefixes reachable without a session. `/` only matches exactly.
const PUBLIC_PREFIXES: &[&str] = &[
    "/login",
    "/verify",
    "/audio",
    "/api/health",
    "/api/auth/send-otp",
    "/api/auth/verify-otp",
    "/swagger-ui",
    "/api-docs",
];

pub fn is_public_path(path: &str) -> bool {
    path == "/" || PUBLIC_PREFIXES.iter().any(|prefix| path.starts_with(prefix))
}

/// Middleware that validates the session cookie.
///
/// If valid, inserts the `UserSession` into request extensions for handlers to use
/// and reissues the cookie when the session is close to expiring. Otherwise API
/// paths get 401 and page paths are redirected to `/login`.
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    let path = req.uri().path().to_string();
    if is_public_path(&path) {
        return next.run(req).await;
    }

    let session = req
        .headers()
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(token_from_cookie_header)
        .and_then(|token| state.sessions.verify(token));

    let Some(session) = session else {
        debug!("Rejected unauthenticated request to {}", path);
        return if path.starts_with("/api/") {
            ApiError::Unauthorized.into_response()
        } else {
            Redirect::to("/login").into_response()
        };
    };

    let refreshed = if state.sessions.needs_refresh(&session, Utc::now()) {
        match state.sessions.refresh(&session) {
            Ok(token) => Some(state.sessions.session_cookie(&token)),
            Err(e) => {
                error!("Failed to refresh session for {}: {}", session.email, e);
                None
            }
        }
    } else {
        None
    };

    req.extensions_mut().insert(session);
    let mut response = next.run(req).await;

    // A handler that already set the cookie (profile update, logout) wins.
    if let Some(cookie) = refreshed {
        if !response.headers().contains_key(header::SET_COOKIE) {
            if let Ok(value) = HeaderValue::from_str(&cookie) {
                response.headers_mut().insert(header::SET_COOKIE, value);
            }
        }
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_list_covers_auth_and_static_paths() {
        for path in [
            "/",
            "/login",
            "/login/callback",
            "/verify",
            "/audio/q1.wav",
            "/api/health",
            "/api/auth/send-otp",
            "/api/auth/verify-otp",
            "/swagger-ui/index.html",
            "/api-docs/openapi.json",
        ] {
            assert!(is_public_path(path), "{} should be public", path);
        }
    }

    #[test]
    fn everything_else_is_gated() {
        for path in [
            "/dashboard",
            "/api/profile",
            "/api/auth/logout",
            "/api/interview/create",
            "/interview/abc",
        ] {
            assert!(!is_public_path(path), "{} should be gated", path);
        }
    }
}
