/// Application routes configuration
use crate::handlers::{calculate, get_catalog, health, preview_track, AppState};
use axum::{
    routing::{get, post},
    Router,
};

/// Build the application router with all routes
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health))
        // Catalogs
        .route("/catalog", get(get_catalog))
        // Flight cost
        .route("/track/preview", post(preview_track))
        .route("/calculate", post(calculate))
        .with_state(state)
}
