use axum::extract::Request;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use tower::Layer;
use tower::Service;

use super::gate::{AuthDecision, AuthorizationGate};
use crate::axum_integration::VerifiedClaims;
use crate::jwt::key_set_cache::{HttpKeySetSource, KeySetSource};

/// Middleware layer that requires a permission granted by a verified bearer token
pub struct RequirePermission<K = HttpKeySetSource> {
    gate: AuthorizationGate<K>,
    permission: Arc<str>,
}

impl<K> RequirePermission<K> {
    /// Create a new RequirePermission middleware enforcing `permission` through `gate`
    pub fn new(gate: AuthorizationGate<K>, permission: impl Into<String>) -> Self {
        Self {
            gate,
            permission: Arc::from(permission.into()),
        }
    }

    pub fn permission(&self) -> &str {
        &self.permission
    }
}

impl<K> Clone for RequirePermission<K> {
    fn clone(&self) -> Self {
        Self {
            gate: self.gate.clone(),
            permission: self.permission.clone(),
        }
    }
}

impl<S, K> Layer<S> for RequirePermission<K> {
    type Service = RequirePermissionMiddleware<S, K>;

    fn layer(&self, inner: S) -> Self::Service {
        RequirePermissionMiddleware {
            inner,
            gate: self.gate.clone(),
            permission: self.permission.clone(),
        }
    }
}

pub struct RequirePermissionMiddleware<S, K = HttpKeySetSource> {
    inner: S,
    gate: AuthorizationGate<K>,
    permission: Arc<str>,
}

impl<S: Clone, K> Clone for RequirePermissionMiddleware<S, K> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            gate: self.gate.clone(),
            permission: self.permission.clone(),
        }
    }
}

impl<S, K> Service<Request> for RequirePermissionMiddleware<S, K>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
    K: KeySetSource,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request) -> Self::Future {
        // The clone is not ready; keep the driven service for this call.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let gate = self.gate.clone();
        let permission = self.permission.clone();

        Box::pin(async move {
            match gate.authorize(request.headers(), &permission).await {
                AuthDecision::Granted(claims) => {
                    request.extensions_mut().insert(VerifiedClaims(claims));
                    inner.call(request).await
                }
                AuthDecision::Denied(err) => Ok(err.into_response()),
            }
        })
    }
}
