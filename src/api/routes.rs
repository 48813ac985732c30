use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let upload_limit = state.config.max_upload_bytes() as usize;

    let mut router = Router::new()
        // Files
        .route("/files", get(handlers::list_files))
        .route(
            "/files/upload",
            post(handlers::upload_file).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/files/:id", get(handlers::get_file))
        .route("/files/:id", put(handlers::update_file))
        .route("/files/:id", delete(handlers::delete_file))
        .route("/files/:id/download", get(handlers::download_file))
        // Folders
        .route("/folders", get(handlers::list_folders))
        .route("/folders", post(handlers::create_folder))
        // Admin
        .route("/admin/stats", get(handlers::admin_stats))
        // Internal
        .route("/_internal/health", get(handlers::health));

    // Test-only routes
    if state.config.test_mode {
        tracing::warn!("Test mode enabled, purge route is available");
        router = router.route("/admin/purge", delete(handlers::admin_purge));
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}
