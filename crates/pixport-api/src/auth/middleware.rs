//! Gallery password middleware.
//!
//! Every protected route requires the shared gallery password, supplied as
//! `Authorization: Bearer <password>` or `X-Gallery-Password: <password>`.
//! There is no session state; each request carries the credential. The
//! comparison is constant-time.

use crate::error::HttpAppError;
use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use pixport_core::AppError;
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// Auth middleware state: the configured shared secret.
#[derive(Clone)]
pub struct AuthState {
    password: String,
}

impl AuthState {
    pub fn new(password: impl Into<String>) -> Self {
        Self {
            password: password.into(),
        }
    }

    /// Auth is disabled when no password is configured (development only;
    /// config validation refuses an empty password in production).
    pub fn is_enabled(&self) -> bool {
        !self.password.is_empty()
    }

    fn verify(&self, candidate: &str) -> bool {
        self.password.as_bytes().ct_eq(candidate.as_bytes()).into()
    }
}

/// Extract the supplied password from the request headers.
fn extract_credential(headers: &HeaderMap) -> Option<&str> {
    if let Some(authorization) = headers.get("authorization") {
        if let Ok(value) = authorization.to_str() {
            if let Some(token) = value.strip_prefix("Bearer ") {
                return Some(token);
            }
        }
    }
    headers
        .get("x-gallery-password")
        .and_then(|v| v.to_str().ok())
}

/// Gallery password middleware. Rejects with 401 before any quota or storage
/// effect.
pub async fn auth_middleware(
    State(auth): State<Arc<AuthState>>,
    request: Request,
    next: Next,
) -> Response {
    if !auth.is_enabled() {
        return next.run(request).await;
    }

    let credential = extract_credential(request.headers()).map(str::to_string);
    match credential {
        Some(candidate) if auth.verify(&candidate) => next.run(request).await,
        Some(_) => HttpAppError(AppError::Unauthorized(
            "Invalid gallery password".to_string(),
        ))
        .into_response(),
        None => HttpAppError(AppError::Unauthorized(
            "Missing gallery password".to_string(),
        ))
        .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_verify_constant_time_compare() {
        let auth = AuthState::new("hunter2");
        assert!(auth.verify("hunter2"));
        assert!(!auth.verify("hunter3"));
        assert!(!auth.verify(""));
        assert!(!auth.verify("hunter22"));
    }

    #[test]
    fn test_disabled_without_password() {
        assert!(!AuthState::new("").is_enabled());
        assert!(AuthState::new("pw").is_enabled());
    }

    #[test]
    fn test_extract_credential_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer secret"));
        assert_eq!(extract_credential(&headers), Some("secret"));
    }

    #[test]
    fn test_extract_credential_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-gallery-password", HeaderValue::from_static("secret"));
        assert_eq!(extract_credential(&headers), Some("secret"));
    }

    #[test]
    fn test_extract_credential_missing() {
        let headers = HeaderMap::new();
        assert_eq!(extract_credential(&headers), None);

        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Basic abc"));
        assert_eq!(extract_credential(&headers), None);
    }
}
