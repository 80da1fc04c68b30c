//! # Casting Gate
//!
//! Bearer token authorization for the casting agency API.
//!
//! Every protected operation passes through the same gate: the bearer token
//! is taken from the `Authorization` header, its RS256 signature is checked
//! against the identity provider's published key set, its issuer, audience
//! and expiry are validated, and the required permission must appear in the
//! token's `permissions` claim.
//!
//! ## Features
//!
//! - `casting-api` (default): the actors and movies REST surface and the
//!   `casting-server` binary

pub mod auth;
pub mod axum_integration;
pub mod config;
pub mod error;
pub mod jwt;

#[cfg(feature = "casting-api")]
pub mod casting;

#[cfg(test)]
pub(crate) mod testutil;

pub use auth::{AuthDecision, AuthError, AuthErrorKind, AuthorizationGate, RequirePermission};
pub use axum_integration::{extract_bearer_token, VerifiedClaims};
pub use config::{load_config, AuthConfig, CastingConfig};
pub use error::{CastingError, Result};
pub use jwt::{BearerToken, Claims, TokenVerifier, VerificationError};
