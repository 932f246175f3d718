//! Azure Blob Storage client
//!
//! Talks to the Blob REST API directly with `reqwest`. Each public method
//! issues one logical operation; listing follows continuation markers until
//! the container is exhausted.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Client, Method, Response};
use tracing::{debug, info};
use url::Url;

use super::xml;
use super::{
    BlobItem, BlobStore, ConnectionString, ContainerCreated, StorageCredential, StorageError,
    UploadedBlob,
};

/// REST API version sent with every request
pub const API_VERSION: &str = "2023-11-03";

pub struct AzureBlobClient {
    http_client: Client,
    account_name: String,
    endpoint: Url,
    credential: StorageCredential,
}

impl AzureBlobClient {
    pub fn new(connection: ConnectionString) -> Result<Self, StorageError> {
        info!(
            "Initializing blob storage client for account {} at {}",
            connection.account_name, connection.blob_endpoint
        );

        // No request timeout: a hung storage call hangs only its own request.
        let http_client = Client::builder().build()?;

        Ok(Self {
            http_client,
            account_name: connection.account_name,
            endpoint: connection.blob_endpoint,
            credential: connection.credential,
        })
    }

    pub fn from_connection_string(raw: &str) -> Result<Self, StorageError> {
        Self::new(ConnectionString::parse(raw)?)
    }

    pub fn account_name(&self) -> &str {
        &self.account_name
    }

    pub fn container_url(&self, container: &str) -> Result<Url, StorageError> {
        self.resource_url(container, std::iter::once(container))
    }

    /// `/` inside a blob name is kept as a virtual directory separator.
    pub fn blob_url(&self, container: &str, blob_name: &str) -> Result<Url, StorageError> {
        if blob_name.is_empty() {
            return Err(StorageError::InvalidName(blob_name.to_string()));
        }
        self.resource_url(
            blob_name,
            std::iter::once(container).chain(blob_name.split('/')),
        )
    }

    /// `.` and `..` segments are rejected: URL normalization would resolve
    /// them and address a different resource.
    fn resource_url<'a>(
        &self,
        name: &str,
        segments: impl IntoIterator<Item = &'a str>,
    ) -> Result<Url, StorageError> {
        let segments: Vec<&str> = segments.into_iter().collect();
        if segments.iter().any(|s| matches!(*s, "." | "..")) {
            return Err(StorageError::InvalidName(name.to_string()));
        }

        let mut url = self.endpoint.clone();
        url.set_query(None);
        // The endpoint was checked to be an http(s) base URL when parsed.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        Ok(url)
    }

    /// Authorize and send one request, turning non-2xx answers into
    /// `StorageError::Service`.
    async fn send(
        &self,
        method: Method,
        mut url: Url,
        mut headers: HeaderMap,
        body: Option<Bytes>,
    ) -> Result<Response, StorageError> {
        headers.insert("x-ms-date", HeaderValue::from_str(&rfc1123_now())?);
        headers.insert("x-ms-version", HeaderValue::from_static(API_VERSION));

        let content_length = body.as_ref().map(Bytes::len).unwrap_or(0);
        if method == Method::PUT || content_length > 0 {
            headers.insert(CONTENT_LENGTH, HeaderValue::from(content_length));
        }

        match &self.credential {
            StorageCredential::SharedKey(credential) => {
                let authorization = credential.authorization(&method, &url, &headers)?;
                headers.insert(AUTHORIZATION, HeaderValue::from_str(&authorization)?);
            }
            StorageCredential::SasToken(token) => append_sas(&mut url, token),
        }

        debug!("{} {}", method, url.path());

        let mut request = self.http_client.request(method, url).headers(headers);
        if let Some(body) = body {
            request = request.body(body);
        }

        let response = request.send().await?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(service_error(response).await)
        }
    }
}

#[async_trait]
impl BlobStore for AzureBlobClient {
    async fn create_container(&self, name: &str) -> Result<ContainerCreated, StorageError> {
        let container_url = self.container_url(name)?;
        let mut url = container_url.clone();
        url.query_pairs_mut().append_pair("restype", "container");

        let response = self.send(Method::PUT, url, HeaderMap::new(), None).await?;
        let request_id = header_string(&response, "x-ms-request-id");

        info!("Container created: {}", name);
        Ok(ContainerCreated {
            request_id,
            url: container_url.to_string(),
        })
    }

    async fn delete_container(&self, name: &str) -> Result<(), StorageError> {
        let mut url = self.container_url(name)?;
        url.query_pairs_mut().append_pair("restype", "container");

        self.send(Method::DELETE, url, HeaderMap::new(), None).await?;

        info!("Container deleted: {}", name);
        Ok(())
    }

    async fn upload_blob(
        &self,
        container: &str,
        blob_name: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<UploadedBlob, StorageError> {
        debug!(
            "Uploading blob {}/{} ({} bytes)",
            container,
            blob_name,
            data.len()
        );

        let url = self.blob_url(container, blob_name)?;
        let mut headers = HeaderMap::new();
        headers.insert("x-ms-blob-type", HeaderValue::from_static("BlockBlob"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_str(content_type)?);

        let response = self.send(Method::PUT, url.clone(), headers, Some(data)).await?;

        info!("Blob uploaded: {}/{}", container, blob_name);
        Ok(UploadedBlob {
            url: url.to_string(),
            etag: header_string(&response, "etag"),
        })
    }

    async fn list_blobs(&self, container: &str) -> Result<Vec<BlobItem>, StorageError> {
        let mut items = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let mut url = self.container_url(container)?;
            {
                let mut query = url.query_pairs_mut();
                query
                    .append_pair("restype", "container")
                    .append_pair("comp", "list");
                if let Some(ref m) = marker {
                    query.append_pair("marker", m);
                }
            }

            let body = self
                .send(Method::GET, url, HeaderMap::new(), None)
                .await?
                .text()
                .await?;
            let page = xml::parse_list_blobs(&body)?;

            debug!(
                "Listed {} blobs from {} (more: {})",
                page.names.len(),
                container,
                page.next_marker.is_some()
            );

            for name in page.names {
                let url = self.blob_url(container, &name)?.to_string();
                items.push(BlobItem { name, url });
            }

            match page.next_marker {
                Some(next) if marker.as_deref() == Some(next.as_str()) => {
                    return Err(StorageError::Xml(format!(
                        "listing of {} repeated continuation marker {}",
                        container, next
                    )));
                }
                Some(next) => marker = Some(next),
                None => break,
            }
        }

        Ok(items)
    }
}

/// Current time in RFC 1123 format, as required by `x-ms-date`
fn rfc1123_now() -> String {
    Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// The token is already percent-encoded and is appended verbatim.
fn append_sas(url: &mut Url, token: &str) {
    let query = match url.query() {
        Some(existing) if !existing.is_empty() => format!("{}&{}", existing, token),
        _ => token.to_string(),
    };
    url.set_query(Some(&query));
}

fn header_string(response: &Response, name: &str) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

async fn service_error(response: Response) -> StorageError {
    let status = response.status();
    let code = header_string(&response, "x-ms-error-code");
    let body = response.text().await.unwrap_or_default();

    let message = xml::parse_error_message(&body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string()
    });

    StorageError::Service {
        status: status.as_u16(),
        code,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::connection_string::DEV_STORAGE_KEY;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{header, header_exists, method, path, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> AzureBlobClient {
        let raw = format!(
            "AccountName=devstoreaccount1;AccountKey={};BlobEndpoint={}/devstoreaccount1",
            DEV_STORAGE_KEY,
            server.uri()
        );
        AzureBlobClient::from_connection_string(&raw).unwrap()
    }

    fn listing(names: &[&str], next_marker: &str) -> String {
        let blobs: String = names
            .iter()
            .map(|n| format!("<Blob><Name>{}</Name><Properties /></Blob>", n))
            .collect();
        format!(
            "<?xml version=\"1.0\" encoding=\"utf-8\"?><EnumerationResults ContainerName=\"images\">\
             <Blobs>{}</Blobs><NextMarker>{}</NextMarker></EnumerationResults>",
            blobs, next_marker
        )
    }

    #[test]
    fn test_urls_on_account_endpoint() {
        let raw = format!("AccountName=acme;AccountKey={}", DEV_STORAGE_KEY);
        let client = AzureBlobClient::from_connection_string(&raw).unwrap();

        assert_eq!(client.account_name(), "acme");
        assert_eq!(
            client.container_url("photos").unwrap().as_str(),
            "https://acme.blob.core.windows.net/photos"
        );
        assert_eq!(
            client.blob_url("photos", "2024/my cat.png").unwrap().as_str(),
            "https://acme.blob.core.windows.net/photos/2024/my%20cat.png"
        );
    }

    #[test]
    fn test_urls_on_emulator_endpoint() {
        let client = AzureBlobClient::from_connection_string("UseDevelopmentStorage=true").unwrap();
        assert_eq!(
            client.blob_url("images", "cat.png").unwrap().as_str(),
            "http://127.0.0.1:10000/devstoreaccount1/images/cat.png"
        );
    }

    #[test]
    fn test_dot_segments_are_rejected() {
        let client = AzureBlobClient::from_connection_string("UseDevelopmentStorage=true").unwrap();

        for name in ["a/../b.png", "..", "./cat.png", "a/."] {
            assert!(
                matches!(client.blob_url("images", name), Err(StorageError::InvalidName(n)) if n == name),
                "{} should be rejected",
                name
            );
        }
        assert!(matches!(client.blob_url("images", ""), Err(StorageError::InvalidName(_))));
        assert!(matches!(client.container_url(".."), Err(StorageError::InvalidName(_))));

        assert_eq!(
            client.blob_url("images", "a..b/.hidden").unwrap().as_str(),
            "http://127.0.0.1:10000/devstoreaccount1/images/a..b/.hidden"
        );
    }

    #[tokio::test]
    async fn test_upload_with_dot_segment_sends_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let err = client_for(&server)
            .upload_blob("images", "a/../b.png", Bytes::from_static(b"x"), "image/png")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidName(_)));
    }

    #[test]
    fn test_append_sas() {
        let mut url = Url::parse("https://acme.blob.core.windows.net/images?restype=container").unwrap();
        append_sas(&mut url, "sv=2022-11-02&sig=abc%2B");
        assert_eq!(url.query(), Some("restype=container&sv=2022-11-02&sig=abc%2B"));

        let mut bare = Url::parse("https://acme.blob.core.windows.net/images/cat.png").unwrap();
        append_sas(&mut bare, "sv=2022-11-02&sig=abc%2B");
        assert_eq!(bare.query(), Some("sv=2022-11-02&sig=abc%2B"));
    }

    #[tokio::test]
    async fn test_create_container_returns_request_id() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/devstoreaccount1/photos"))
            .and(query_param("restype", "container"))
            .and(header_exists("authorization"))
            .and(header("x-ms-version", API_VERSION))
            .respond_with(ResponseTemplate::new(201).insert_header("x-ms-request-id", "req-42"))
            .expect(1)
            .mount(&server)
            .await;

        let created = client_for(&server).create_container("photos").await.unwrap();
        assert_eq!(created.request_id.as_deref(), Some("req-42"));
        assert_eq!(created.url, format!("{}/devstoreaccount1/photos", server.uri()));
    }

    #[tokio::test]
    async fn test_service_error_carries_code_and_message() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/devstoreaccount1/photos"))
            .respond_with(
                ResponseTemplate::new(409)
                    .insert_header("x-ms-error-code", "ContainerAlreadyExists")
                    .set_body_string(
                        "<?xml version=\"1.0\" encoding=\"utf-8\"?><Error><Code>ContainerAlreadyExists</Code>\
                         <Message>The specified container already exists.</Message></Error>",
                    ),
            )
            .mount(&server)
            .await;

        let err = client_for(&server).create_container("photos").await.unwrap_err();
        match err {
            StorageError::Service { status, code, message } => {
                assert_eq!(status, 409);
                assert_eq!(code.as_deref(), Some("ContainerAlreadyExists"));
                assert_eq!(message, "The specified container already exists.");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_upload_blob_sends_block_blob() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/devstoreaccount1/textfiles/notes.txt"))
            .and(header("x-ms-blob-type", "BlockBlob"))
            .and(header("content-type", "text/plain; charset=utf-8"))
            .respond_with(ResponseTemplate::new(201).insert_header("etag", "\"0x8D\""))
            .expect(1)
            .mount(&server)
            .await;

        let uploaded = client_for(&server)
            .upload_blob(
                "textfiles",
                "notes.txt",
                Bytes::from_static(b"hello world"),
                "text/plain; charset=utf-8",
            )
            .await
            .unwrap();

        assert_eq!(
            uploaded.url,
            format!("{}/devstoreaccount1/textfiles/notes.txt", server.uri())
        );
        assert_eq!(uploaded.etag.as_deref(), Some("\"0x8D\""));

        let received = server.received_requests().await.unwrap();
        assert_eq!(received[0].body, b"hello world".to_vec());
    }

    #[tokio::test]
    async fn test_list_blobs_follows_markers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/devstoreaccount1/images"))
            .and(query_param("comp", "list"))
            .and(query_param_is_missing("marker"))
            .respond_with(ResponseTemplate::new(200).set_body_string(listing(&["a.png", "b.png"], "page-2")))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/devstoreaccount1/images"))
            .and(query_param("comp", "list"))
            .and(query_param("marker", "page-2"))
            .respond_with(ResponseTemplate::new(200).set_body_string(listing(&["c.png"], "")))
            .expect(1)
            .mount(&server)
            .await;

        let items = client_for(&server).list_blobs("images").await.unwrap();
        let names: Vec<&str> = items.iter().map(|i| i.name.as_str()).collect();

        assert_eq!(names, vec!["a.png", "b.png", "c.png"]);
        assert_eq!(
            items[2].url,
            format!("{}/devstoreaccount1/images/c.png", server.uri())
        );
    }

    #[tokio::test]
    async fn test_delete_missing_container_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/devstoreaccount1/ghost"))
            .and(query_param("restype", "container"))
            .respond_with(ResponseTemplate::new(404).insert_header("x-ms-error-code", "ContainerNotFound"))
            .mount(&server)
            .await;

        let err = client_for(&server).delete_container("ghost").await.unwrap_err();
        assert!(matches!(err, StorageError::Service { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_list_blobs_stops_on_repeated_marker() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/devstoreaccount1/images"))
            .and(query_param("comp", "list"))
            .respond_with(ResponseTemplate::new(200).set_body_string(listing(&["a.png"], "stuck")))
            .expect(2)
            .mount(&server)
            .await;

        let err = client_for(&server).list_blobs("images").await.unwrap_err();
        assert!(matches!(err, StorageError::Xml(m) if m.contains("stuck")));
    }
}
