//! Shared Key request signing for the Blob REST API
//!
//! `Authorization: SharedKey <account>:<base64(hmac-sha256(key, string-to-sign))>`
//!
//! The string-to-sign is:
//! ```text
//! VERB\n
//! Content-Encoding\n
//! Content-Language\n
//! Content-Length\n        (empty when zero)
//! Content-MD5\n
//! Content-Type\n
//! Date\n                  (empty, x-ms-date is sent instead)
//! If-Modified-Since\n
//! If-Match\n
//! If-None-Match\n
//! If-Unmodified-Since\n
//! Range\n
//! CanonicalizedHeaders    (x-ms-* headers, sorted, one per line)
//! CanonicalizedResource   (/account/encoded-path + sorted query params)
//! ```

use std::collections::BTreeMap;
use std::fmt;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use reqwest::header::HeaderMap;
use reqwest::Method;
use sha2::Sha256;
use url::Url;

use super::StorageError;

type HmacSha256 = Hmac<Sha256>;

/// Account name plus decoded account key
#[derive(Clone)]
pub struct SharedKeyCredential {
    account: String,
    key: Vec<u8>,
}

impl fmt::Debug for SharedKeyCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedKeyCredential")
            .field("account", &self.account)
            .field("key", &"<redacted>")
            .finish()
    }
}

impl SharedKeyCredential {
    pub fn from_base64(account: &str, key: &str) -> Result<Self, StorageError> {
        let key = BASE64_STANDARD.decode(key.trim()).map_err(|e| {
            StorageError::InvalidConnectionString(format!("AccountKey is not valid base64: {}", e))
        })?;

        Ok(Self {
            account: account.to_string(),
            key,
        })
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    /// Value of the `Authorization` header for a request.
    ///
    /// `headers` must already contain every header that will be sent,
    /// including `x-ms-date`, `x-ms-version` and `Content-Length`.
    pub fn authorization(
        &self,
        method: &Method,
        url: &Url,
        headers: &HeaderMap,
    ) -> Result<String, StorageError> {
        let string_to_sign = self.string_to_sign(method, url, headers);

        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|e| StorageError::Signing(format!("HMAC key error: {}", e)))?;
        mac.update(string_to_sign.as_bytes());
        let signature = BASE64_STANDARD.encode(mac.finalize().into_bytes());

        Ok(format!("SharedKey {}:{}", self.account, signature))
    }

    pub fn string_to_sign(&self, method: &Method, url: &Url, headers: &HeaderMap) -> String {
        let content_length = match header_value(headers, "content-length") {
            "0" => "",
            other => other,
        };

        format!(
            "{}\n{}\n{}\n{}\n{}\n{}\n{}\n{}\n{}\n{}\n{}\n{}\n{}{}",
            method.as_str(),
            header_value(headers, "content-encoding"),
            header_value(headers, "content-language"),
            content_length,
            header_value(headers, "content-md5"),
            header_value(headers, "content-type"),
            header_value(headers, "date"),
            header_value(headers, "if-modified-since"),
            header_value(headers, "if-match"),
            header_value(headers, "if-none-match"),
            header_value(headers, "if-unmodified-since"),
            header_value(headers, "range"),
            canonicalized_headers(headers),
            self.canonicalized_resource(url),
        )
    }

    fn canonicalized_resource(&self, url: &Url) -> String {
        let mut resource = format!("/{}{}", self.account, url.path());

        let mut params: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (name, value) in url.query_pairs() {
            params
                .entry(name.to_lowercase())
                .or_default()
                .push(value.into_owned());
        }

        for (name, mut values) in params {
            values.sort();
            resource.push_str(&format!("\n{}:{}", name, values.join(",")));
        }

        resource
    }
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

/// `x-ms-*` headers, lowercase, sorted by name, each terminated by `\n`
fn canonicalized_headers(headers: &HeaderMap) -> String {
    let mut ms_headers: Vec<(&str, &str)> = headers
        .iter()
        .filter(|(name, _)| name.as_str().starts_with("x-ms-"))
        .map(|(name, value)| (name.as_str(), value.to_str().unwrap_or_default().trim()))
        .collect();
    ms_headers.sort_by(|a, b| a.0.cmp(b.0));

    ms_headers
        .iter()
        .map(|(name, value)| format!("{}:{}\n", name, value))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::connection_string::{DEV_STORAGE_ACCOUNT, DEV_STORAGE_KEY};
    use pretty_assertions::assert_eq;
    use reqwest::header::{HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};

    const DATE_VALUE: &str = "Mon, 19 Oct 2026 10:00:00 GMT";

    fn credential() -> SharedKeyCredential {
        SharedKeyCredential::from_base64(DEV_STORAGE_ACCOUNT, DEV_STORAGE_KEY).unwrap()
    }

    fn base_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-ms-date", HeaderValue::from_static(DATE_VALUE));
        headers.insert("x-ms-version", HeaderValue::from_static("2023-11-03"));
        headers
    }

    #[test]
    fn test_string_to_sign_for_container_create() {
        let url = Url::parse("http://127.0.0.1:10000/devstoreaccount1/photos?restype=container")
            .unwrap();
        let mut headers = base_headers();
        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("0"));

        let expected = "PUT\n\n\n\n\n\n\n\n\n\n\n\n\
                        x-ms-date:Mon, 19 Oct 2026 10:00:00 GMT\n\
                        x-ms-version:2023-11-03\n\
                        /devstoreaccount1/devstoreaccount1/photos\n\
                        restype:container";
        assert_eq!(credential().string_to_sign(&Method::PUT, &url, &headers), expected);
    }

    #[test]
    fn test_authorization_for_container_create() {
        let url = Url::parse("http://127.0.0.1:10000/devstoreaccount1/photos?restype=container")
            .unwrap();
        let mut headers = base_headers();
        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("0"));

        let auth = credential()
            .authorization(&Method::PUT, &url, &headers)
            .unwrap();
        assert_eq!(
            auth,
            "SharedKey devstoreaccount1:WtMepfhlKS40LHHO3+/BWn0dHRkX+GcXTcMcWYyD6rY="
        );
    }

    #[test]
    fn test_authorization_for_blob_upload() {
        let url = Url::parse("http://127.0.0.1:10000/devstoreaccount1/textfiles/notes.txt")
            .unwrap();
        let mut headers = base_headers();
        headers.insert("x-ms-blob-type", HeaderValue::from_static("BlockBlob"));
        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("11"));
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );

        let auth = credential()
            .authorization(&Method::PUT, &url, &headers)
            .unwrap();
        assert_eq!(
            auth,
            "SharedKey devstoreaccount1:xdRj7LDnMzIeBM0hFiIfEps22LzSyk1QMQRqO9TYMf8="
        );
    }

    #[test]
    fn test_query_params_are_sorted_and_lowercased() {
        let url = Url::parse(
            "https://acme.blob.core.windows.net/images?restype=container&comp=list&Marker=2!abc",
        )
        .unwrap();
        let cred = SharedKeyCredential::from_base64("acme", "c2VjcmV0").unwrap();
        let signed = cred.string_to_sign(&Method::GET, &url, &base_headers());

        assert!(signed.ends_with("/acme/images\ncomp:list\nmarker:2!abc\nrestype:container"));
    }

    #[test]
    fn test_debug_redacts_key() {
        let rendered = format!("{:?}", credential());
        assert!(rendered.contains("devstoreaccount1"));
        assert!(!rendered.contains(DEV_STORAGE_KEY));
    }
}
