use crate::config::BackendConfig;
use crate::error::{RegistrarError, Result};
use crate::storage::ObjectStore;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Object storage over the hosted service's `storage/v1` API. Uploads are
/// upserts: re-running finalize overwrites the object under the same path.
pub struct HostedObjectStore {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HostedObjectStore {
    pub fn from_config(config: &BackendConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: super::service_key()?,
        })
    }
}

#[async_trait]
impl ObjectStore for HostedObjectStore {
    async fn upload(&self, bucket: &str, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<String> {
        let object_url = format!("{}/storage/v1/object/{}/{}", self.base_url, bucket, path);
        let response = self
            .client
            .post(&object_url)
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", content_type)
            .header("x-upsert", "true")
            .body(bytes)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(RegistrarError::Persistence {
                message: format!("upload of {}/{} failed: {}", bucket, path, response.status()),
            });
        }

        let public_url = format!("{}/storage/v1/object/public/{}/{}", self.base_url, bucket, path);
        debug!(bucket, path, "Uploaded document");
        Ok(public_url)
    }
}
