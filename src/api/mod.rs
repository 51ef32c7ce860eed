mod handlers;
mod identity;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::engine::SessionRegistry;
use crate::store::FeatureStore;

/// Shared state handed to every handler: the in-memory session engine and
/// the persistent feature store.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SessionRegistry>,
    pub store: FeatureStore,
}

pub fn create_router(registry: Arc<SessionRegistry>, store: FeatureStore) -> Router {
    let api = Router::new()
        // Features
        .route("/features", get(handlers::list_features))
        .route(
            "/features/{feature_id}/session",
            post(handlers::open_session),
        )
        // Sessions
        .route("/sessions/{id}", get(handlers::get_session))
        .route("/sessions/{id}/join", post(handlers::join_session))
        .route("/sessions/{id}/state", get(handlers::session_state))
        .route("/sessions/{id}/vote", post(handlers::submit_vote))
        .route("/sessions/{id}/reveal", post(handlers::reveal_session))
        .route("/sessions/{id}/commit", post(handlers::commit_session))
        // Health
        .route("/health", get(handlers::health));

    Router::new()
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(AppState { registry, store })
}
