//! REST routes for actors and movies
//!
//! Listing is public. Every mutation sits behind the authorization gate and
//! requires its own permission, e.g. `post:actors` or `delete:movies`.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::handler::Handler;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch};
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing;

use super::models::{ActorUpdate, MovieUpdate, NewActor, NewMovie};
use super::store::{CastingStore, StoreError};
use crate::auth::AuthorizationGate;
use crate::axum_integration::VerifiedClaims;
use crate::jwt::key_set_cache::KeySetSource;

#[derive(Clone)]
pub struct AppState {
    pub store: CastingStore,
}

/// Error rendered as `{"success": false, "error": <status>, "message": <text>}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "resource not found")
    }

    pub fn method_not_allowed() -> Self {
        Self::new(StatusCode::METHOD_NOT_ALLOWED, "method not allowed")
    }

    pub fn status_code(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ActorNotFound(_) | StoreError::MovieNotFound(_) => {
                Self::new(StatusCode::NOT_FOUND, err.to_string())
            }
            StoreError::UnknownActor(_) | StoreError::Invalid { .. } => {
                Self::new(StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection.status() {
            StatusCode::UNPROCESSABLE_ENTITY => {
                Self::new(StatusCode::UNPROCESSABLE_ENTITY, rejection.body_text())
            }
            _ => Self::new(StatusCode::BAD_REQUEST, "bad request"),
        }
    }
}

impl From<PathRejection> for ApiError {
    fn from(_: PathRejection) -> Self {
        Self::not_found()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "success": false,
            "error": self.status.as_u16(),
            "message": self.message,
        }));
        (self.status, body).into_response()
    }
}

type ApiResult = Result<Json<Value>, ApiError>;

fn subject(claims: &VerifiedClaims) -> &str {
    claims.subject().unwrap_or("unknown")
}

/// Build the casting router with each mutation guarded by `gate`
pub fn router<K: KeySetSource>(gate: AuthorizationGate<K>, store: CastingStore) -> Router {
    Router::new()
        .route(
            "/actors",
            get(list_actors).post(create_actor.layer(gate.require("post:actors"))),
        )
        .route(
            "/actors/{actor_id}",
            patch(update_actor.layer(gate.require("patch:actors")))
                .delete(delete_actor.layer(gate.require("delete:actors"))),
        )
        .route(
            "/movies",
            get(list_movies).post(create_movie.layer(gate.require("post:movies"))),
        )
        .route(
            "/movies/{movie_id}",
            patch(update_movie.layer(gate.require("patch:movies")))
                .delete(delete_movie.layer(gate.require("delete:movies"))),
        )
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(AppState { store })
}

async fn not_found() -> ApiError {
    ApiError::not_found()
}

async fn method_not_allowed() -> ApiError {
    ApiError::method_not_allowed()
}

async fn list_actors(State(state): State<AppState>) -> ApiResult {
    let actors = state.store.list_actors().await;
    if actors.is_empty() {
        return Err(ApiError::not_found());
    }

    Ok(Json(json!({
        "success": true,
        "actors": actors,
    })))
}

async fn list_movies(State(state): State<AppState>) -> ApiResult {
    let movies = state.store.list_movies().await;
    if movies.is_empty() {
        return Err(ApiError::not_found());
    }

    Ok(Json(json!({
        "success": true,
        "movies": movies,
    })))
}

async fn create_actor(
    State(state): State<AppState>,
    claims: VerifiedClaims,
    payload: Result<Json<NewActor>, JsonRejection>,
) -> ApiResult {
    let Json(input) = payload?;
    let actor = state.store.create_actor(input).await?;
    tracing::info!(subject = subject(&claims), actor_id = actor.id, "Actor created");

    Ok(Json(json!({
        "success": true,
        "actors": actor,
    })))
}

async fn update_actor(
    State(state): State<AppState>,
    claims: VerifiedClaims,
    actor_id: Result<Path<u64>, PathRejection>,
    payload: Result<Json<ActorUpdate>, JsonRejection>,
) -> ApiResult {
    let Path(actor_id) = actor_id?;
    let Json(update) = payload?;
    let actor = state.store.update_actor(actor_id, update).await?;
    tracing::info!(subject = subject(&claims), actor_id, "Actor updated");

    Ok(Json(json!({
        "success": true,
        "actors": [actor],
    })))
}

async fn delete_actor(
    State(state): State<AppState>,
    claims: VerifiedClaims,
    actor_id: Result<Path<u64>, PathRejection>,
) -> ApiResult {
    let Path(actor_id) = actor_id?;
    let deleted = state.store.delete_actor(actor_id).await?;
    tracing::info!(subject = subject(&claims), actor_id, "Actor deleted");

    Ok(Json(json!({
        "success": true,
        "delete": deleted,
    })))
}

async fn create_movie(
    State(state): State<AppState>,
    claims: VerifiedClaims,
    payload: Result<Json<NewMovie>, JsonRejection>,
) -> ApiResult {
    let Json(input) = payload?;
    let movie = state.store.create_movie(input).await?;
    tracing::info!(subject = subject(&claims), movie_id = movie.id, "Movie created");

    Ok(Json(json!({
        "success": true,
        "movies": movie,
    })))
}

async fn update_movie(
    State(state): State<AppState>,
    claims: VerifiedClaims,
    movie_id: Result<Path<u64>, PathRejection>,
    payload: Result<Json<MovieUpdate>, JsonRejection>,
) -> ApiResult {
    let Path(movie_id) = movie_id?;
    let Json(update) = payload?;
    let movie = state.store.update_movie(movie_id, update).await?;
    tracing::info!(subject = subject(&claims), movie_id, "Movie updated");

    Ok(Json(json!({
        "success": true,
        "movies": [movie],
    })))
}

async fn delete_movie(
    State(state): State<AppState>,
    claims: VerifiedClaims,
    movie_id: Result<Path<u64>, PathRejection>,
) -> ApiResult {
    let Path(movie_id) = movie_id?;
    let deleted = state.store.delete_movie(movie_id).await?;
    tracing::info!(subject = subject(&claims), movie_id, "Movie deleted");

    Ok(Json(json!({
        "success": true,
        "delete": deleted,
    })))
}
