//! Permission-based authorization for Axum applications
//!
//! This module composes bearer token extraction, token verification and
//! permission enforcement into a single gate, and exposes it three ways:
//!
//! - [`AuthorizationGate::authorize`] returns an [`AuthDecision`]
//! - [`AuthorizationGate::require_authorization`] wraps an operation
//! - [`RequirePermission`] is a tower layer for routes
//!
//! # Example
//!
//! ```ignore
//! use axum::{routing::post, Router};
//! use casting_gate::auth::AuthorizationGate;
//!
//! let gate = AuthorizationGate::from_config(&auth_config)?;
//! let app = Router::new()
//!     .route("/actors", post(create_actor))
//!     .route_layer(gate.require("post:actors"));
//! ```

pub mod claims;
pub mod error;
pub mod gate;
pub mod middleware;
pub mod permissions;

pub use error::{AuthError, AuthErrorKind};
pub use gate::{AuthDecision, AuthorizationGate};
pub use middleware::{RequirePermission, RequirePermissionMiddleware};
pub use permissions::{authorize, PermissionError};
