use axum::{
    extract::{
        multipart::MultipartRejection,
        rejection::JsonRejection,
        Multipart, State,
    },
    http::StatusCode,
    Json,
};
use bytes::Bytes;

use crate::error::{ApiError, ApiResult};
use crate::models::{ImageUploadResponse, MessageResponse, TextUploadRequest};
use crate::AppState;

const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";
const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";
const IMAGE_FIELD: &str = "image";
const IMAGE_FAILED: &str = "Error uploading image";
const TEXT_FAILED: &str = "Error uploading file";

/// Store `text` as `<fileName>.txt` in the text container
///
/// POST /upload
pub async fn upload_text(
    State(state): State<AppState>,
    payload: Result<Json<TextUploadRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<MessageResponse>)> {
    let Json(request) = payload.map_err(|e| ApiError::InvalidUpload {
        context: TEXT_FAILED,
        reason: e.body_text(),
    })?;
    let container = &state.config.storage.text_container;
    let blob_name = request.blob_name();

    let uploaded = state
        .store
        .upload_blob(
            container,
            &blob_name,
            Bytes::from(request.text),
            TEXT_CONTENT_TYPE,
        )
        .await
        .map_err(ApiError::storage(TEXT_FAILED))?;

    tracing::info!(container = %container, blob = %blob_name, url = %uploaded.url, "Text uploaded");

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("File uploaded successfully")),
    ))
}

/// An image part pulled out of the multipart body
struct ImageFile {
    file_name: String,
    content_type: String,
    data: Bytes,
}

/// Store the multipart `image` part under its original file name
///
/// POST /upload-image
pub async fn upload_image(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<(StatusCode, Json<ImageUploadResponse>)> {
    let multipart = multipart.map_err(|e| ApiError::InvalidUpload {
        context: IMAGE_FAILED,
        reason: e.body_text(),
    })?;
    let image = read_image(multipart).await?.ok_or(ApiError::MissingFile {
        context: IMAGE_FAILED,
        field: IMAGE_FIELD,
    })?;

    let container = &state.config.storage.image_container;
    let size = image.data.len();

    let uploaded = state
        .store
        .upload_blob(container, &image.file_name, image.data, &image.content_type)
        .await
        .map_err(ApiError::storage(IMAGE_FAILED))?;

    tracing::info!(
        container = %container,
        blob = %image.file_name,
        size,
        content_type = %image.content_type,
        "Image uploaded"
    );

    Ok((
        StatusCode::CREATED,
        Json(ImageUploadResponse {
            message: "Image uploaded successfully".to_string(),
            thumbnail_url: uploaded.url,
        }),
    ))
}

/// First `image` part that carries a non-empty file name; other parts are
/// skipped. Browsers send `filename=""` when no file was picked.
async fn read_image(mut multipart: Multipart) -> ApiResult<Option<ImageFile>> {
    let invalid = |e: axum::extract::multipart::MultipartError| ApiError::InvalidUpload {
        context: IMAGE_FAILED,
        reason: e.to_string(),
    };

    while let Some(field) = multipart.next_field().await.map_err(invalid)? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let Some(file_name) = field
            .file_name()
            .filter(|name| !name.is_empty())
            .map(str::to_string)
        else {
            tracing::debug!("Skipping image part without a file name");
            continue;
        };

        let content_type = field
            .content_type()
            .unwrap_or(FALLBACK_CONTENT_TYPE)
            .to_string();
        let data = field.bytes().await.map_err(invalid)?;

        return Ok(Some(ImageFile {
            file_name,
            content_type,
            data,
        }));
    }

    Ok(None)
}
