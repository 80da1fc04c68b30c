//! Actors and movies API guarded by the authorization gate

pub mod models;
pub mod routes;
pub mod store;

pub use models::{Actor, ActorSummary, Movie, MovieView};
pub use routes::{router, ApiError, AppState};
pub use store::{CastingStore, StoreError};
