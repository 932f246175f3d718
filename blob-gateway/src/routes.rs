use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

use crate::handlers::{container, health, listing, upload};
use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    let body_limit = state.config.server.max_upload_bytes;

    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Container routes
        .route(
            "/create/:name",
            get(container::create_container).post(container::create_container),
        )
        .route("/delete/:containerName", delete(container::delete_container))
        // Blob routes
        .route("/upload", post(upload::upload_text))
        .route("/upload-image", post(upload::upload_image))
        .route("/get", get(listing::list_blobs))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                // Cors needs a `Default` response body, so it sits inside the limit
                .layer(RequestBodyLimitLayer::new(body_limit))
                .layer(CorsLayer::permissive())
                .layer(DefaultBodyLimit::disable()),
        )
}
