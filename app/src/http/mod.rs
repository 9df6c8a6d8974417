mod handlers;

use axum::routing::{get, post, put};
use axum::Router;
use engine::Engine;
use std::sync::Arc;

/// The command surface: every verb here is specified at §6, each handler
/// sharing one `Arc<Engine>` rather than re-parsing topology per request
/// (mirroring the reference engine's `State<WebState>` extractor idiom).
pub fn router(engine: Arc<Engine>) -> Router {
    Router::new()
        .route("/sync", post(handlers::sync))
        .route("/retry/{record_id}", post(handlers::retry))
        .route("/destinations/{name}/config", put(handlers::update_destination_config))
        .route("/status", get(handlers::status))
        .route("/status/{record_id}", get(handlers::record_status))
        .route("/rules", put(handlers::update_rules).get(handlers::get_rules))
        .route("/poll/{name}", post(handlers::poll_once))
        .route("/sync-all", post(handlers::sync_all))
        .route("/destinations", get(handlers::destinations))
        .route("/destinations/{name}/schema", get(handlers::destination_schema))
        .with_state(engine)
}
