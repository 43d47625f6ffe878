//! HTTP API server

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub mod auth;
pub mod error;
pub mod handlers;
pub mod state;

pub use auth::Credentials;
pub use state::AppState;

/// Build the API router using the provided application state
pub fn create_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/customer", post(handlers::upsert_customer))
        .route("/customers/:phone", get(handlers::get_customer))
        .route("/lookup/:phone", get(handlers::lookup))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_basic_auth,
        ));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/incidents/:incident_type", get(handlers::incidents))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
