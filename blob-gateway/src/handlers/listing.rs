use axum::{extract::State, Json};

use crate::error::{ApiError, ApiResult};
use crate::models::BlobEntry;
use crate::AppState;

/// List every blob of the image container with its URL
///
/// GET /get
pub async fn list_blobs(State(state): State<AppState>) -> ApiResult<Json<Vec<BlobEntry>>> {
    let container = &state.config.storage.image_container;

    let items = state
        .store
        .list_blobs(container)
        .await
        .map_err(ApiError::storage("Error listing blobs"))?;

    tracing::debug!(container = %container, count = items.len(), "Blobs listed");

    Ok(Json(
        items
            .into_iter()
            .map(|item| BlobEntry {
                name: item.name,
                thumbnail: item.url,
            })
            .collect(),
    ))
}
