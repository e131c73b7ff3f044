//! HTTP error responses
//!
//! Every failure leaves the gateway as `{"error": "<generic message>"}`.
//! Provider bodies, parse errors and store diagnostics are logged by the
//! caller and never copied into the response.

use axum::http::StatusCode;
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use hosted_auth::Error as AuthError;

/// A user-facing error: status plus a fixed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: &'static str,
}

impl ApiError {
    pub const MISSING_CODE: ApiError = ApiError {
        status: StatusCode::BAD_REQUEST,
        message: "Missing authorization code",
    };

    pub const AUTHENTICATION_FAILED: ApiError = ApiError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        message: "Authentication failed",
    };

    pub const NOT_AUTHENTICATED: ApiError = ApiError {
        status: StatusCode::UNAUTHORIZED,
        message: "Not authenticated",
    };

    pub const SESSION_UNAVAILABLE: ApiError = ApiError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        message: "Session unavailable",
    };
}

impl From<&AuthError> for ApiError {
    fn from(err: &AuthError) -> Self {
        match err {
            AuthError::MissingCode => ApiError::MISSING_CODE,
            AuthError::Exchange(_) | AuthError::MalformedToken(_) => {
                ApiError::AUTHENTICATION_FAILED
            }
            AuthError::SessionStore(_) => ApiError::SESSION_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            [
                (CONTENT_TYPE, "application/json"),
                (CACHE_CONTROL, "no-store"),
            ],
            serde_json::json!({ "error": self.message }).to_string(),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_maps_to_status_classes() {
        assert_eq!(
            ApiError::from(&AuthError::MissingCode).status,
            StatusCode::BAD_REQUEST
        );
        for err in [
            AuthError::Exchange("x".into()),
            AuthError::MalformedToken("x".into()),
            AuthError::SessionStore("x".into()),
        ] {
            assert!(ApiError::from(&err).status.is_server_error(), "{err}");
        }
    }

    #[tokio::test]
    async fn body_never_contains_internal_detail() {
        let err = AuthError::Exchange("token endpoint returned 400: invalid_grant".into());
        let response = ApiError::from(&err).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(response.into_body(), 1024)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, serde_json::json!({ "error": "Authentication failed" }));
    }
}
