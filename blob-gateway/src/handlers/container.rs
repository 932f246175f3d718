use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::error::{ApiError, ApiResult};
use crate::models::MessageResponse;
use crate::AppState;

const CREATE_FAILED: &str = "Error creating container";
const DELETE_FAILED: &str = "Error deleting container";

/// Create a container named by the path
///
/// GET|POST /create/:name
pub async fn create_container(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<(StatusCode, Json<MessageResponse>)> {
    if state.config.storage.account_name.is_none() {
        return Err(ApiError::MissingConfig {
            context: CREATE_FAILED,
            variable: "AZURE_STORAGE_ACCOUNT_NAME",
        });
    }

    let created = state
        .store
        .create_container(&name)
        .await
        .map_err(ApiError::storage(CREATE_FAILED))?;

    tracing::info!(
        container = %name,
        request_id = created.request_id.as_deref().unwrap_or("-"),
        "Container created"
    );

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new(format!(
            "Container was created successfully.\n\trequestId:{}\n\tURL: {}",
            created.request_id.as_deref().unwrap_or("unknown"),
            created.url
        ))),
    ))
}

/// Delete the container named by the path
///
/// DELETE /delete/:containerName
pub async fn delete_container(
    State(state): State<AppState>,
    Path(container_name): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    state
        .store
        .delete_container(&container_name)
        .await
        .map_err(ApiError::storage(DELETE_FAILED))?;

    tracing::info!(container = %container_name, "Container deleted");

    Ok(Json(MessageResponse::new(format!(
        "Container {} deleted successfully",
        container_name
    ))))
}
