// Copyright (c) 2026 SOLARE S.R.O.
//
// This file is part of CarbonION.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

use crate::errors::{HaError, HaResult};
use crate::types::HaEntityState;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Home Assistant REST API client
#[derive(Clone)]
pub struct HomeAssistantClient {
    base_url: String,
    token: String,
    client: Client,
    max_retries: u32,
    retry_delay: Duration,
}

impl HomeAssistantClient {
    /// Create a new HA client with custom configuration
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> HaResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| HaError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into(),
            token: token.into(),
            client,
            max_retries: 3,
            retry_delay: Duration::from_millis(500),
        })
    }

    /// Create HA client using Supervisor API environment variables
    /// This is the standard method for HA addons
    pub fn from_supervisor() -> HaResult<Self> {
        let base_url = "http://supervisor/core";
        let token = std::env::var("SUPERVISOR_TOKEN").map_err(|_| {
            HaError::ConfigError(
                "SUPERVISOR_TOKEN environment variable not set. Are you running as an HA addon?"
                    .to_owned(),
            )
        })?;

        info!("Initializing HA client using Supervisor API");
        Self::new(base_url, token)
    }

    /// Create HA client for development/testing with custom URL
    pub fn from_env() -> HaResult<Self> {
        let base_url =
            std::env::var("HA_BASE_URL").unwrap_or_else(|_| "http://localhost:8123".to_owned());
        let token = std::env::var("HA_TOKEN")
            .map_err(|_| HaError::ConfigError("HA_TOKEN environment variable not set".to_owned()))?;

        info!("Initializing HA client for development: {}", base_url);
        Self::new(base_url, token)
    }

    /// Pick the Supervisor API when running as an addon, env vars otherwise
    pub fn from_environment() -> HaResult<Self> {
        if std::env::var("SUPERVISOR_TOKEN").is_ok() {
            Self::from_supervisor()
        } else {
            Self::from_env()
        }
    }

    /// Get the state of a specific entity
    pub async fn get_state(&self, entity_id: &str) -> HaResult<HaEntityState> {
        let url = format!("{}/api/states/{}", self.base_url, entity_id);
        debug!("🔍 [HA QUERY] Getting state for entity: {}", entity_id);

        let response = self
            .retry_request(|| async { self.client.get(&url).bearer_auth(&self.token).send().await })
            .await?;

        match response.status() {
            StatusCode::OK => {
                let state = response.json::<HaEntityState>().await?;
                debug!("✅ [HA RESULT] Entity: {} = '{}'", entity_id, state.state);
                Ok(state)
            }
            StatusCode::NOT_FOUND => {
                error!("❌ [HA ERROR] Entity not found: {}", entity_id);
                Err(HaError::EntityNotFound(entity_id.to_owned()))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                error!(
                    "❌ [HA ERROR] Authentication failed for entity: {}",
                    entity_id
                );
                Err(HaError::AuthenticationFailed)
            }
            status => {
                let error_text = response.text().await.unwrap_or_default();
                error!("❌ [HA ERROR] Status {}: {}", status, error_text);
                Err(HaError::ApiError {
                    status: status.as_u16(),
                    message: error_text,
                })
            }
        }
    }

    /// Create or update a virtual entity's state.
    ///
    /// POST /api/states/{entity_id} upserts an entity that exists purely in
    /// HA's state machine, which is how the footprint sensors are exposed.
    pub async fn set_state(
        &self,
        entity_id: &str,
        state: impl Into<String>,
        attributes: Value,
    ) -> HaResult<()> {
        let url = format!("{}/api/states/{}", self.base_url, entity_id);
        let payload = serde_json::json!({
            "state": state.into(),
            "attributes": attributes,
        });

        debug!("📤 [HA PUBLISH] Setting state for: {}", entity_id);

        let response = self
            .retry_request(|| async {
                self.client
                    .post(&url)
                    .bearer_auth(&self.token)
                    .json(&payload)
                    .send()
                    .await
            })
            .await?;

        match response.status() {
            // 200 = updated, 201 = created
            StatusCode::OK | StatusCode::CREATED => {
                debug!("✅ [HA PUBLISH] {} updated", entity_id);
                Ok(())
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                error!("❌ [HA PUBLISH] Authentication failed for: {}", entity_id);
                Err(HaError::AuthenticationFailed)
            }
            status => {
                let error_text = response.text().await.unwrap_or_default();
                error!(
                    "❌ [HA PUBLISH] Failed for {} (status {}): {}",
                    entity_id, status, error_text
                );
                Err(HaError::ApiError {
                    status: status.as_u16(),
                    message: error_text,
                })
            }
        }
    }

    /// Health check - ping HA API
    pub async fn ping(&self) -> HaResult<bool> {
        let url = format!("{}/api/", self.base_url);
        debug!("Performing health check");

        match self.client.get(&url).bearer_auth(&self.token).send().await {
            Ok(response) => {
                let is_ok = response.status().is_success();
                if is_ok {
                    debug!("Health check passed");
                } else {
                    warn!("Health check failed: status {}", response.status());
                }
                Ok(is_ok)
            }
            Err(e) => {
                warn!("Health check failed: {}", e);
                Ok(false) // Don't error on health check failure
            }
        }
    }

    /// Retry a request with exponential backoff
    async fn retry_request<F, Fut>(&self, mut request_fn: F) -> HaResult<reqwest::Response>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<reqwest::Response, reqwest::Error>>,
    {
        let mut attempts = 0;
        let mut delay = self.retry_delay;

        loop {
            attempts += 1;
            match request_fn().await {
                Ok(response) => return Ok(response),
                Err(e) if attempts >= self.max_retries => {
                    error!("Request failed after {} attempts: {}", attempts, e);
                    return Err(HaError::HttpError(e));
                }
                Err(e) => {
                    warn!(
                        "Request failed (attempt {}/{}): {}. Retrying in {:?}",
                        attempts, self.max_retries, e, delay
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2; // Exponential backoff
                }
            }
        }
    }

    /// Set custom retry configuration
    pub fn with_retry_config(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_delay = retry_delay;
        self
    }
}
