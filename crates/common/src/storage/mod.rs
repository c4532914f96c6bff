//! Object storage access
//!
//! Downloads previously uploaded files given their public storage URL.
//! Download failures are soft: they are logged and reported as `None`.

use crate::config::StorageConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use reqwest::Url;
use std::time::Duration;
use tracing::{debug, warn};

/// Path marker of public object URLs
const PUBLIC_OBJECT_PREFIX: &str = "/storage/v1/object/public/";

/// Trait for fetching uploaded file bytes
#[async_trait]
pub trait BlobFetcher: Send + Sync {
    /// Download the object behind `file_url`, `None` on any failure
    async fn fetch(&self, file_url: &str) -> Option<Vec<u8>>;
}

/// Bucket and object path parsed from a public URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageObject {
    pub bucket: String,
    pub path: String,
}

/// Parse `<origin>/storage/v1/object/public/<bucket>/<path>`
pub fn parse_storage_url(file_url: &str) -> Option<StorageObject> {
    let url = Url::parse(file_url).ok()?;
    let rest = url.path().split_once(PUBLIC_OBJECT_PREFIX)?.1;
    let (bucket, path) = rest.split_once('/')?;

    if bucket.is_empty() || path.is_empty() {
        return None;
    }

    Some(StorageObject {
        bucket: bucket.to_string(),
        path: path.to_string(),
    })
}

/// HTTP client for the storage API
pub struct StorageClient {
    client: reqwest::Client,
    base_url: Option<String>,
    service_key: Option<String>,
}

impl StorageClient {
    pub fn new(config: &StorageConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to create storage HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: config
                .base_url
                .as_ref()
                .map(|b| b.trim_end_matches('/').to_string()),
            service_key: config.service_key.clone(),
        })
    }

    /// Authenticated download URL for an object
    fn object_url(&self, file_url: &str, object: &StorageObject) -> Option<String> {
        let base = match &self.base_url {
            Some(base) => base.clone(),
            None => Url::parse(file_url)
                .ok()?
                .origin()
                .ascii_serialization(),
        };

        Some(format!(
            "{}/storage/v1/object/{}/{}",
            base, object.bucket, object.path
        ))
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let mut request = self.client.get(url);
        if let Some(key) = &self.service_key {
            request = request.bearer_auth(key).header("apikey", key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Storage {
                message: format!("storage responded with {}", status),
            });
        }

        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl BlobFetcher for StorageClient {
    async fn fetch(&self, file_url: &str) -> Option<Vec<u8>> {
        let Some(object) = parse_storage_url(file_url) else {
            warn!(file_url, "Not a public storage URL");
            return None;
        };

        let url = self.object_url(file_url, &object)?;

        match self.download(&url).await {
            Ok(bytes) => {
                debug!(bucket = %object.bucket, path = %object.path, size = bytes.len(), "File downloaded");
                Some(bytes)
            }
            Err(e) => {
                warn!(bucket = %object.bucket, path = %object.path, error = %e, "File download failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(service_key: Option<&str>) -> StorageClient {
        StorageClient::new(&StorageConfig {
            base_url: None,
            service_key: service_key.map(str::to_string),
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[test]
    fn test_parse_storage_url() {
        let object = parse_storage_url(
            "https://abc.example.co/storage/v1/object/public/dispatch-files/2024/11/letture.zip",
        )
        .unwrap();
        assert_eq!(object.bucket, "dispatch-files");
        assert_eq!(object.path, "2024/11/letture.zip");
    }

    #[test]
    fn test_parse_storage_url_rejects_other_shapes() {
        assert!(parse_storage_url("https://abc.example.co/files/letture.zip").is_none());
        assert!(parse_storage_url("https://abc.example.co/storage/v1/object/public/bucket").is_none());
        assert!(parse_storage_url("not a url").is_none());
    }

    #[tokio::test]
    async fn test_fetch_downloads_object() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/storage/v1/object/dispatch-files/2024/letture.zip"))
            .and(header("apikey", "service-key"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"PK\x03\x04".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let url = format!(
            "{}/storage/v1/object/public/dispatch-files/2024/letture.zip",
            server.uri()
        );
        let bytes = client(Some("service-key")).fetch(&url).await;

        assert_eq!(bytes.as_deref(), Some(&b"PK\x03\x04"[..]));
    }

    #[tokio::test]
    async fn test_fetch_returns_none_on_error_status() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let url = format!(
            "{}/storage/v1/object/public/dispatch-files/missing.zip",
            server.uri()
        );
        assert!(client(None).fetch(&url).await.is_none());
    }

    #[tokio::test]
    async fn test_fetch_skips_request_for_foreign_url() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let url = format!("{}/uploads/letture.zip", server.uri());
        assert!(client(None).fetch(&url).await.is_none());
    }
}
