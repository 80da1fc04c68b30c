//! The composed authorization entry point

use axum::http::HeaderMap;
use jsonwebtoken::Algorithm;
use std::future::Future;
use std::sync::Arc;

use super::error::AuthError;
use super::middleware::RequirePermission;
use super::permissions::authorize;
use crate::axum_integration::extract_bearer_token;
use crate::config::AuthConfig;
use crate::error::Result;
use crate::jwt::key_set_cache::{HttpKeySetSource, KeySetCache, KeySetSource};
use crate::jwt::types::Claims;
use crate::jwt::verifier::TokenVerifier;

/// Outcome of one authorization check
#[derive(Debug, Clone, PartialEq)]
pub enum AuthDecision {
    Granted(Claims),
    Denied(AuthError),
}

impl AuthDecision {
    pub fn is_granted(&self) -> bool {
        matches!(self, AuthDecision::Granted(_))
    }

    pub fn into_result(self) -> std::result::Result<Claims, AuthError> {
        match self {
            AuthDecision::Granted(claims) => Ok(claims),
            AuthDecision::Denied(err) => Err(err),
        }
    }
}

/// Extract, verify, then enforce a permission, stopping at the first failure
pub struct AuthorizationGate<S = HttpKeySetSource> {
    verifier: Arc<TokenVerifier<S>>,
}

impl<S> Clone for AuthorizationGate<S> {
    fn clone(&self) -> Self {
        Self {
            verifier: Arc::clone(&self.verifier),
        }
    }
}

impl AuthorizationGate<HttpKeySetSource> {
    /// Build a gate fetching keys from the configured identity provider
    pub fn from_config(config: &AuthConfig) -> Result<Self> {
        let algorithm: Algorithm = config.algorithm()?;
        let fetch_timeout = config.fetch_timeout()?;
        let source = HttpKeySetSource::new(config.jwks_url()?, fetch_timeout)?;

        let cache = KeySetCache::new(source, algorithm)
            .with_fetch_timeout(fetch_timeout)
            .with_max_age(config.key_set_max_age());

        Ok(Self::new(TokenVerifier::new(
            Arc::new(cache),
            config.verifier_settings()?,
        )))
    }
}

impl<S: KeySetSource> AuthorizationGate<S> {
    pub fn new(verifier: TokenVerifier<S>) -> Self {
        Self {
            verifier: Arc::new(verifier),
        }
    }

    pub fn verifier(&self) -> &TokenVerifier<S> {
        &self.verifier
    }

    /// Load the signing keys ahead of the first request
    pub async fn prefetch_keys(&self) -> Result<usize> {
        Ok(self.verifier.key_set().prefetch().await?)
    }

    /// Decide whether the request may perform an operation requiring `required_permission`
    pub async fn authorize(&self, headers: &HeaderMap, required_permission: &str) -> AuthDecision {
        match self.check(headers, required_permission).await {
            Ok(claims) => AuthDecision::Granted(claims),
            Err(err) => {
                tracing::warn!(
                    status = err.status_code().as_u16(),
                    kind = %err.kind(),
                    permission = required_permission,
                    "Request denied: {}",
                    err.message()
                );
                AuthDecision::Denied(err)
            }
        }
    }

    async fn check(
        &self,
        headers: &HeaderMap,
        required_permission: &str,
    ) -> std::result::Result<Claims, AuthError> {
        let token = extract_bearer_token(headers)?;
        let claims = self.verifier.verify(&token).await?;
        authorize(&claims, required_permission)?;
        Ok(claims)
    }

    /// Run `operation` with the verified claims, only if the request is authorized
    ///
    /// The operation is called at most once and its output is returned unchanged.
    pub async fn require_authorization<F, Fut, T>(
        &self,
        required_permission: &str,
        headers: &HeaderMap,
        operation: F,
    ) -> std::result::Result<T, AuthError>
    where
        F: FnOnce(Claims) -> Fut,
        Fut: Future<Output = T>,
    {
        let claims = self.authorize(headers, required_permission).await.into_result()?;
        Ok(operation(claims).await)
    }

    /// Tower layer enforcing `permission` in front of a route
    pub fn require(&self, permission: impl Into<String>) -> RequirePermission<S> {
        RequirePermission::new(self.clone(), permission)
    }
}
