use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;
use std::fmt;

use super::permissions::PermissionError;
use crate::axum_integration::ExtractionError;
use crate::jwt::verifier::VerificationError;

/// Machine-readable denial reason
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthErrorKind {
    AuthorizationHeaderMissing,
    InvalidHeader,
    TokenExpired,
    InvalidClaims,
    Unauthorized,
    KeySetUnavailable,
}

impl AuthErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthErrorKind::AuthorizationHeaderMissing => "authorization_header_missing",
            AuthErrorKind::InvalidHeader => "invalid_header",
            AuthErrorKind::TokenExpired => "token_expired",
            AuthErrorKind::InvalidClaims => "invalid_claims",
            AuthErrorKind::Unauthorized => "unauthorized",
            AuthErrorKind::KeySetUnavailable => "key_set_unavailable",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthErrorKind::AuthorizationHeaderMissing
            | AuthErrorKind::InvalidHeader
            | AuthErrorKind::TokenExpired
            | AuthErrorKind::InvalidClaims => StatusCode::UNAUTHORIZED,
            AuthErrorKind::Unauthorized => StatusCode::FORBIDDEN,
            AuthErrorKind::KeySetUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl fmt::Display for AuthErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized denial handed to the boundary layer: status, kind and a human message
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} ({status}): {message}")]
pub struct AuthError {
    status: StatusCode,
    kind: AuthErrorKind,
    message: String,
}

impl AuthError {
    /// Status follows from the kind
    pub fn new(kind: AuthErrorKind, message: impl Into<String>) -> Self {
        Self {
            status: kind.status_code(),
            kind,
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        self.status
    }

    pub fn kind(&self) -> AuthErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<ExtractionError> for AuthError {
    fn from(err: ExtractionError) -> Self {
        match err {
            ExtractionError::AuthorizationHeaderMissing => AuthError::new(
                AuthErrorKind::AuthorizationHeaderMissing,
                "Authorization header is expected.",
            ),
            ExtractionError::InvalidHeaderFormat(reason) => {
                AuthError::new(AuthErrorKind::InvalidHeader, reason)
            }
        }
    }
}

impl From<VerificationError> for AuthError {
    fn from(err: VerificationError) -> Self {
        use AuthErrorKind::*;

        match err {
            VerificationError::MalformedToken(_) => {
                AuthError::new(InvalidHeader, "Unable to parse authentication token.")
            }
            VerificationError::UnsupportedAlgorithm(alg) => AuthError::new(
                InvalidHeader,
                format!("Token signing algorithm {} is not accepted.", alg),
            ),
            VerificationError::UnknownSigningKey { .. } => {
                AuthError::new(InvalidHeader, "Unable to find the appropriate key.")
            }
            VerificationError::InvalidSignature => {
                AuthError::new(InvalidHeader, "Token signature is invalid.")
            }
            VerificationError::TokenExpired => AuthError::new(TokenExpired, "Token expired."),
            VerificationError::TokenNotYetValid => {
                AuthError::new(InvalidClaims, "Token is not valid yet.")
            }
            VerificationError::MissingClaim(claim) => AuthError::new(
                InvalidClaims,
                format!("Incorrect claims. Missing {} claim.", claim),
            ),
            VerificationError::InvalidIssuer(_) | VerificationError::InvalidAudience(_) => {
                AuthError::new(
                    InvalidClaims,
                    "Incorrect claims. Please, check the audience and issuer.",
                )
            }
            VerificationError::KeySetUnavailable(_) => AuthError::new(
                KeySetUnavailable,
                "Unable to load signing keys from the identity provider.",
            ),
        }
    }
}

impl From<PermissionError> for AuthError {
    fn from(err: PermissionError) -> Self {
        match err {
            PermissionError::PermissionsClaimMissing => AuthError::new(
                AuthErrorKind::Unauthorized,
                "Permissions not included in JWT.",
            ),
            PermissionError::PermissionNotFound { .. } => {
                AuthError::new(AuthErrorKind::Unauthorized, "Permission not found.")
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "success": false,
            "error": self.status.as_u16(),
            "code": self.kind,
            "message": self.message,
        }));
        let mut response = (self.status, body).into_response();

        if self.status == StatusCode::UNAUTHORIZED {
            let challenge = match self.kind {
                AuthErrorKind::AuthorizationHeaderMissing => "Bearer".to_string(),
                kind => format!("Bearer error=\"invalid_token\", error_description=\"{}\"", kind),
            };
            if let Ok(value) = HeaderValue::from_str(&challenge) {
                response.headers_mut().insert(header::WWW_AUTHENTICATE, value);
            }
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::Value;

    #[test]
    fn test_kind_strings() {
        assert_eq!(
            AuthErrorKind::AuthorizationHeaderMissing.as_str(),
            "authorization_header_missing"
        );
        assert_eq!(AuthErrorKind::InvalidHeader.to_string(), "invalid_header");
        assert_eq!(
            serde_json::to_value(AuthErrorKind::KeySetUnavailable).unwrap(),
            "key_set_unavailable"
        );
    }

    #[test]
    fn test_extraction_errors_are_401() {
        let err = AuthError::from(ExtractionError::AuthorizationHeaderMissing);
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.kind(), AuthErrorKind::AuthorizationHeaderMissing);

        let err = AuthError::from(ExtractionError::InvalidHeaderFormat("Token not found.".into()));
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.kind(), AuthErrorKind::InvalidHeader);
        assert_eq!(err.message(), "Token not found.");
    }

    #[test]
    fn test_verification_error_mapping() {
        let cases = vec![
            (VerificationError::MalformedToken("x".into()), AuthErrorKind::InvalidHeader),
            (VerificationError::UnsupportedAlgorithm("HS256".into()), AuthErrorKind::InvalidHeader),
            (
                VerificationError::UnknownSigningKey { kid: "k".into() },
                AuthErrorKind::InvalidHeader,
            ),
            (VerificationError::InvalidSignature, AuthErrorKind::InvalidHeader),
            (VerificationError::TokenExpired, AuthErrorKind::TokenExpired),
            (VerificationError::TokenNotYetValid, AuthErrorKind::InvalidClaims),
            (VerificationError::MissingClaim("exp".into()), AuthErrorKind::InvalidClaims),
            (VerificationError::InvalidIssuer("i".into()), AuthErrorKind::InvalidClaims),
            (VerificationError::InvalidAudience("a".into()), AuthErrorKind::InvalidClaims),
        ];

        for (source, kind) in cases {
            let err = AuthError::from(source);
            assert_eq!(err.kind(), kind);
            assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        }
    }

    #[test]
    fn test_key_set_unavailable_is_server_side() {
        let err = AuthError::from(VerificationError::KeySetUnavailable("timeout".into()));
        assert_eq!(err.kind(), AuthErrorKind::KeySetUnavailable);
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_permission_errors_are_403() {
        let err = AuthError::from(PermissionError::PermissionsClaimMissing);
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(err.kind(), AuthErrorKind::Unauthorized);

        let err = AuthError::from(PermissionError::PermissionNotFound {
            required: "post:actors".into(),
        });
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(err.message(), "Permission not found.");
    }

    #[test]
    fn test_display() {
        let err = AuthError::new(AuthErrorKind::TokenExpired, "Token expired.");
        assert_eq!(err.to_string(), "token_expired (401 Unauthorized): Token expired.");
    }

    #[tokio::test]
    async fn test_response_envelope() {
        let response = AuthError::new(AuthErrorKind::TokenExpired, "Token expired.").into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers()[header::WWW_AUTHENTICATE]
            .to_str()
            .unwrap()
            .contains("token_expired"));

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], 401);
        assert_eq!(body["code"], "token_expired");
        assert_eq!(body["message"], "Token expired.");
    }

    #[tokio::test]
    async fn test_forbidden_response_has_no_challenge() {
        let response = AuthError::from(PermissionError::PermissionsClaimMissing).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(response.headers().get(header::WWW_AUTHENTICATE).is_none());
    }
}
