//! Parsing of Azure storage connection strings
//!
//! A connection string is a `;`-separated list of `Key=Value` pairs, e.g.
//! `DefaultEndpointsProtocol=https;AccountName=acme;AccountKey=...;EndpointSuffix=core.windows.net`.
//! Values may themselves contain `=` (base64 account keys), so each pair is
//! split on the first `=` only.

use url::Url;

use super::signing::SharedKeyCredential;
use super::StorageError;

/// Account used by the local storage emulator
pub const DEV_STORAGE_ACCOUNT: &str = "devstoreaccount1";
/// Well-known, publicly documented key of the local storage emulator
pub const DEV_STORAGE_KEY: &str =
    "Eby8vdM02xNOcqFlqUwJPLlmEtlCDXJ1OUzFT50uSRZ6IFsuFq2UVErCz4I6tq/K1SZFPTOtr/KBHBeksoGMGw==";
pub const DEV_STORAGE_BLOB_ENDPOINT: &str = "http://127.0.0.1:10000/devstoreaccount1";

const DEFAULT_PROTOCOL: &str = "https";
const DEFAULT_ENDPOINT_SUFFIX: &str = "core.windows.net";

/// How requests against the account are authorized
#[derive(Debug, Clone)]
pub enum StorageCredential {
    SharedKey(SharedKeyCredential),
    /// SAS token without the leading `?`
    SasToken(String),
}

/// A parsed connection string
#[derive(Debug, Clone)]
pub struct ConnectionString {
    pub account_name: String,
    pub blob_endpoint: Url,
    pub credential: StorageCredential,
}

impl ConnectionString {
    pub fn parse(raw: &str) -> Result<Self, StorageError> {
        let mut protocol = None;
        let mut account_name = None;
        let mut account_key = None;
        let mut endpoint_suffix = None;
        let mut blob_endpoint = None;
        let mut sas_token = None;
        let mut development = false;

        for pair in raw.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').ok_or_else(|| {
                StorageError::InvalidConnectionString(format!(
                    "segment '{}' is not a Key=Value pair",
                    redact(pair)
                ))
            })?;
            let value = value.trim();

            match key.trim().to_ascii_lowercase().as_str() {
                "defaultendpointsprotocol" => protocol = Some(value.to_string()),
                "accountname" => account_name = Some(value.to_string()),
                "accountkey" => account_key = Some(value.to_string()),
                "endpointsuffix" => endpoint_suffix = Some(value.to_string()),
                "blobendpoint" => blob_endpoint = Some(value.to_string()),
                "sharedaccesssignature" => {
                    sas_token = Some(value.trim_start_matches('?').to_string())
                }
                "usedevelopmentstorage" => development = value.eq_ignore_ascii_case("true"),
                // Endpoints for queues, tables and files are irrelevant here.
                _ => {}
            }
        }

        if development {
            let endpoint = parse_endpoint(DEV_STORAGE_BLOB_ENDPOINT)?;
            return Ok(Self {
                account_name: DEV_STORAGE_ACCOUNT.to_string(),
                blob_endpoint: endpoint,
                credential: StorageCredential::SharedKey(SharedKeyCredential::from_base64(
                    DEV_STORAGE_ACCOUNT,
                    DEV_STORAGE_KEY,
                )?),
            });
        }

        let blob_endpoint = match (blob_endpoint, account_name.as_deref()) {
            (Some(explicit), _) => parse_endpoint(&explicit)?,
            (None, Some(account)) => parse_endpoint(&format!(
                "{}://{}.blob.{}",
                protocol.as_deref().unwrap_or(DEFAULT_PROTOCOL),
                account,
                endpoint_suffix.as_deref().unwrap_or(DEFAULT_ENDPOINT_SUFFIX),
            ))?,
            (None, None) => {
                return Err(StorageError::InvalidConnectionString(
                    "either AccountName or BlobEndpoint is required".to_string(),
                ))
            }
        };

        // SAS connection strings usually omit AccountName; fall back to the
        // first label of the endpoint host.
        let account_name = match account_name {
            Some(name) if !name.is_empty() => name,
            _ => blob_endpoint
                .host_str()
                .and_then(|host| host.split('.').next())
                .unwrap_or_default()
                .to_string(),
        };

        let credential = match (account_key, sas_token) {
            (Some(key), _) => StorageCredential::SharedKey(SharedKeyCredential::from_base64(
                &account_name,
                &key,
            )?),
            (None, Some(token)) if !token.is_empty() => StorageCredential::SasToken(token),
            _ => {
                return Err(StorageError::InvalidConnectionString(
                    "either AccountKey or SharedAccessSignature is required".to_string(),
                ))
            }
        };

        Ok(Self {
            account_name,
            blob_endpoint,
            credential,
        })
    }
}

fn parse_endpoint(raw: &str) -> Result<Url, StorageError> {
    let url = Url::parse(raw).map_err(|e| {
        StorageError::InvalidConnectionString(format!("invalid blob endpoint '{}': {}", raw, e))
    })?;

    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(StorageError::InvalidConnectionString(format!(
            "blob endpoint '{}' must be an http(s) URL",
            raw
        )));
    }

    Ok(url)
}

/// Keeps secrets out of error messages
fn redact(segment: &str) -> String {
    segment.chars().take(16).collect::<String>() + "..."
}
