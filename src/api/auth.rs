// =============================================================================
// Bearer Token Authentication — Axum Extractor
// =============================================================================
//
// When `SCANNER_API_TOKEN` is set at startup, every authenticated endpoint
// requires `Authorization: Bearer <token>`. Without a token the dashboard is
// open, which suits a scanner bound to localhost.
//
// Usage:
//
//   async fn handler(_auth: AuthBearer, State(state): State<Arc<AppState>>) { ... }
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::app_state::AppState;

/// Compare two byte slices in constant time.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

/// Check an `Authorization` header value against the expected token.
/// `None` for `expected` accepts anything.
pub fn authorize(header_value: Option<&str>, expected: Option<&str>) -> Result<(), AuthRejection> {
    let Some(expected) = expected else {
        return Ok(());
    };

    let token = header_value
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(AuthRejection {
            status: StatusCode::UNAUTHORIZED,
            message: "Missing or invalid authorization token",
        })?;

    if !constant_time_eq(token.trim().as_bytes(), expected.as_bytes()) {
        return Err(AuthRejection {
            status: StatusCode::FORBIDDEN,
            message: "Invalid authorization token",
        });
    }
    Ok(())
}

/// Extractor that passes only authorised requests.
pub struct AuthBearer;

#[derive(Debug)]
pub struct AuthRejection {
    status: StatusCode,
    message: &'static str,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": self.message,
        });
        (self.status, axum::Json(body)).into_response()
    }
}

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for AuthBearer {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());

        authorize(header_value, state.api_token.as_deref()).map_err(|rejection| {
            warn!(path = %parts.uri.path(), status = %rejection.status, "request rejected");
            rejection
        })?;

        Ok(AuthBearer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_time_eq_cases() {
        assert!(constant_time_eq(b"hello", b"hello"));
        assert!(!constant_time_eq(b"hello", b"world"));
        assert!(!constant_time_eq(b"short", b"longer_string"));
        assert!(constant_time_eq(b"", b""));
        assert!(!constant_time_eq(b"\x00", b"\x01"));
    }

    #[test]
    fn open_when_no_token_configured() {
        assert!(authorize(None, None).is_ok());
        assert!(authorize(Some("Bearer anything"), None).is_ok());
    }

    #[test]
    fn token_required_when_configured() {
        let expected = Some("s3cret");
        assert!(authorize(Some("Bearer s3cret"), expected).is_ok());
        assert_eq!(authorize(None, expected).unwrap_err().status, StatusCode::UNAUTHORIZED);
        assert_eq!(
            authorize(Some("Basic s3cret"), expected).unwrap_err().status,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            authorize(Some("Bearer wrong!"), expected).unwrap_err().status,
            StatusCode::FORBIDDEN
        );
    }
}
