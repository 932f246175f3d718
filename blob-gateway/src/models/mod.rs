use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body of every confirmation and error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Request payload for `POST /upload`.
///
/// Absent fields deserialize as empty strings; nothing is validated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextUploadRequest {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub file_name: String,
}

impl TextUploadRequest {
    pub fn blob_name(&self) -> String {
        format!("{}.txt", self.file_name)
    }
}

/// One element of the `GET /get` listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlobEntry {
    pub name: String,
    pub thumbnail: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageUploadResponse {
    pub message: String,
    pub thumbnail_url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}
