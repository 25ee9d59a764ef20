use crate::config::BackendConfig;
use crate::constants;
use crate::draft::{JsonMap, StoredRecord};
use crate::error::{RegistrarError, Result};
use crate::storage::RecordStore;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Record store over the hosted service's table REST API
/// (`/rest/v1/<table>` endpoints with `eq.` filters).
pub struct HostedRecordStore {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HostedRecordStore {
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

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn authed(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
    }
}

#[async_trait]
impl RecordStore for HostedRecordStore {
    async fn fetch_by_email(&self, table: &str, email: &str) -> Result<Option<StoredRecord>> {
        let request = self
            .client
            .get(self.table_url(table))
            .query(&[("email", format!("eq.{}", email)), ("limit", "1".to_string())]);
        let response = self.authed(request).send().await?;
        if !response.status().is_success() {
            return Err(RegistrarError::Persistence {
                message: format!("fetch from {} failed: {}", table, response.status()),
            });
        }

        let rows: Vec<JsonMap> = response.json().await?;
        debug!(table, matched = rows.len(), "Fetched records by email");
        Ok(rows.into_iter().next().map(|fields| {
            let id = fields
                .get(constants::ID)
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .unwrap_or_default();
            StoredRecord { id, fields }
        }))
    }

    async fn update(&self, table: &str, id: &str, fields: &JsonMap) -> Result<()> {
        let request = self
            .client
            .patch(self.table_url(table))
            .query(&[("id", format!("eq.{}", id))])
            .json(fields);
        let response = self.authed(request).send().await?;
        if !response.status().is_success() {
            return Err(RegistrarError::Persistence {
                message: format!("update {} in {} failed: {}", id, table, response.status()),
            });
        }
        Ok(())
    }

    async fn insert(&self, table: &str, record: &JsonMap) -> Result<()> {
        // merge-duplicates keys on the table's unique constraint, so
        // re-running finalize upserts instead of duplicating sub-records
        let request = self
            .client
            .post(self.table_url(table))
            .header("Prefer", "resolution=merge-duplicates")
            .json(record);
        let response = self.authed(request).send().await?;
        if !response.status().is_success() {
            return Err(RegistrarError::Persistence {
                message: format!("insert into {} failed: {}", table, response.status()),
            });
        }
        Ok(())
    }
}
