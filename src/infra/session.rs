use crate::config::BackendConfig;
use crate::error::Result;
use crate::storage::{Session, SessionProvider};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: String,
    email: String,
}

/// Session lookup against the hosted auth API (`auth/v1/user`). The access
/// token comes from the environment; a missing or rejected token means the
/// caller is signed out, not an error.
pub struct HostedSessionProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HostedSessionProvider {
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
impl SessionProvider for HostedSessionProvider {
    async fn current_session(&self) -> Result<Option<Session>> {
        let access_token = match std::env::var("REGISTRAR_ACCESS_TOKEN") {
            Ok(token) => token,
            Err(_) => {
                debug!("No access token in environment, treating as signed out");
                return Ok(None);
            }
        };

        let response = self
            .client
            .get(format!("{}/auth/v1/user", self.base_url))
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", access_token))
            .send()
            .await?;
        if !response.status().is_success() {
            debug!(status = %response.status(), "Session lookup rejected");
            return Ok(None);
        }

        let user: UserResponse = response.json().await?;
        Ok(Some(Session {
            user_id: user.id,
            email: user.email,
        }))
    }
}
