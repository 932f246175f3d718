// Storage module for Azure Blob Storage integration

pub mod azure_client;
pub mod connection_string;
pub mod signing;
pub mod xml;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::InvalidHeaderValue;
use thiserror::Error;

pub use azure_client::AzureBlobClient;
pub use connection_string::{ConnectionString, StorageCredential};

/// Storage error types
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid connection string: {0}")]
    InvalidConnectionString(String),

    #[error("Name '{0}' cannot be addressed by URL")]
    InvalidName(String),

    #[error("Request signing failed: {0}")]
    Signing(String),

    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] InvalidHeaderValue),

    #[error("Storage request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Storage service returned HTTP {status} ({}): {message}", .code.as_deref().unwrap_or("no error code"))]
    Service {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("Malformed storage response: {0}")]
    Xml(String),
}

/// Result of a successful container creation
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerCreated {
    pub request_id: Option<String>,
    pub url: String,
}

/// Result of a successful blob upload
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedBlob {
    pub url: String,
    pub etag: Option<String>,
}

/// One entry of a container enumeration
#[derive(Debug, Clone, PartialEq)]
pub struct BlobItem {
    pub name: String,
    pub url: String,
}

/// The storage operations the gateway routes pass through to.
///
/// Every method is exactly one logical call against the storage service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn create_container(&self, name: &str) -> Result<ContainerCreated, StorageError>;

    async fn delete_container(&self, name: &str) -> Result<(), StorageError>;

    async fn upload_blob(
        &self,
        container: &str,
        blob_name: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<UploadedBlob, StorageError>;

    /// Enumerate every blob in `container`, following continuation markers
    /// until the listing is exhausted. Order is the service's order.
    async fn list_blobs(&self, container: &str) -> Result<Vec<BlobItem>, StorageError>;
}
