//! HTTP API.
//!
//! Thin axum layer over [`Database`]: handlers parse the request, call one
//! core operation on the blocking pool and map its error onto a status code.

mod actor;
mod key_results;
mod okrs;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use perfhub_core::{Database, Error};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use actor::{CurrentActor, ACTOR_HEADER};

pub fn create_router(db: Database) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/okrs", get(okrs::list_okrs).post(okrs::create_okr))
        .route(
            "/api/okrs/{id}",
            get(okrs::get_okr)
                .put(okrs::update_okr)
                .delete(okrs::delete_okr),
        )
        .route("/api/okrs/{id}/assignees", put(okrs::set_assignees))
        .route(
            "/api/okrs/{id}/key-results",
            get(key_results::list_key_results).post(key_results::create_key_result),
        )
        .route(
            "/api/okrs/{id}/key-results/tree",
            get(key_results::key_result_tree),
        )
        .route(
            "/api/key-results/{id}",
            get(key_results::get_key_result)
                .put(key_results::update_key_result)
                .delete(key_results::delete_key_result),
        )
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(db)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Core(#[from] Error),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Core(Error::NotFound { .. }) => StatusCode::NOT_FOUND,
            Self::Core(Error::Validation(_)) => StatusCode::BAD_REQUEST,
            Self::Core(Error::InvalidParent(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Core(Error::CycleDetected(_)) => StatusCode::CONFLICT,
            Self::Core(_) | Self::Join(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::warn!("Request rejected: {}", self);
        }

        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Runs a store call on the blocking pool. The connection lock and SQLite I/O
/// must not hold up an async worker.
pub(crate) async fn blocking<T, F>(db: Database, f: F) -> ApiResult<T>
where
    F: FnOnce(&Database) -> perfhub_core::Result<T> + Send + 'static,
    T: Send + 'static,
{
    Ok(tokio::task::spawn_blocking(move || f(&db)).await??)
}
