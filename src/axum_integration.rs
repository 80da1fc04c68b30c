//! Axum integration for the authorization gate
//!
//! This module provides the request-side pieces:
//! - Strict bearer token extraction from the `Authorization` header
//! - `FromRequestParts` extractor for claims verified by the gate
//!
//! # Example
//!
//! ```rust,ignore
//! use axum::{routing::post, Router};
//! use casting_gate::axum_integration::VerifiedClaims;
//!
//! async fn create_actor(claims: VerifiedClaims) -> String {
//!     format!("Created by {:?}", claims.subject())
//! }
//!
//! let app = Router::new()
//!     .route("/actors", post(create_actor).route_layer(gate.require("post:actors")));
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap, StatusCode},
};
use std::ops::Deref;

use crate::jwt::types::{BearerToken, Claims};

/// Why no bearer token could be taken from the request
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractionError {
    #[error("Authorization header is expected")]
    AuthorizationHeaderMissing,

    #[error("Invalid authorization header: {0}")]
    InvalidHeaderFormat(String),
}

/// Extract the bearer token from the Authorization header
///
/// The header must be exactly `Bearer <token>`: two whitespace-separated parts,
/// the first matching `Bearer` case-sensitively. The token is returned verbatim.
///
/// # Example
///
/// ```rust
/// use axum::http::HeaderMap;
/// use casting_gate::axum_integration::extract_bearer_token;
///
/// let mut headers = HeaderMap::new();
/// headers.insert("Authorization", "Bearer my-token".parse().unwrap());
///
/// let token = extract_bearer_token(&headers).unwrap();
/// assert_eq!(token.as_str(), "my-token");
/// ```
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<BearerToken, ExtractionError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(ExtractionError::AuthorizationHeaderMissing)?;

    let value = value.to_str().map_err(|_| {
        ExtractionError::InvalidHeaderFormat("Authorization header is not valid text.".into())
    })?;

    let parts: Vec<&str> = value.split_whitespace().collect();
    match parts.as_slice() {
        ["Bearer", token] => Ok(BearerToken::new(*token)),
        [_, _] => Err(ExtractionError::InvalidHeaderFormat(
            "Authorization header must start with \"Bearer\".".into(),
        )),
        [_] => Err(ExtractionError::InvalidHeaderFormat("Token not found.".into())),
        _ => Err(ExtractionError::InvalidHeaderFormat(
            "Authorization header must be bearer token.".into(),
        )),
    }
}

/// Axum extractor for claims verified by the authorization gate
///
/// The [`RequirePermission`](crate::auth::RequirePermission) layer inserts these
/// into the request extensions; handlers behind it take them as an argument.
#[derive(Debug, Clone)]
pub struct VerifiedClaims(pub Claims);

impl Deref for VerifiedClaims {
    type Target = Claims;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Claims> for VerifiedClaims {
    fn from(claims: Claims) -> Self {
        Self(claims)
    }
}

impl VerifiedClaims {
    /// Get the inner Claims
    pub fn into_inner(self) -> Claims {
        self.0
    }
}

impl<S> FromRequestParts<S> for VerifiedClaims
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<VerifiedClaims>()
            .cloned()
            .ok_or(StatusCode::UNAUTHORIZED)
    }
}
