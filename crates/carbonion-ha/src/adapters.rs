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

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::client::HomeAssistantClient;
use crate::errors::HaError;
use carbonion_core::traits::{SensorDataSource, SensorValue};

/// Home Assistant adapter implementing SensorDataSource
///
/// Collapses a missing entity, the "unknown"/"unavailable" sentinel states,
/// and non-numeric values into `SensorValue::Unavailable`; only transport
/// faults surface as errors.
pub struct HaSensorSource {
    client: Arc<HomeAssistantClient>,
}

impl HaSensorSource {
    pub fn new(client: Arc<HomeAssistantClient>) -> Self {
        Self { client }
    }

    /// Get reference to the underlying HA client
    pub fn client(&self) -> &Arc<HomeAssistantClient> {
        &self.client
    }
}

impl std::fmt::Debug for HaSensorSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HaSensorSource").finish()
    }
}

#[async_trait]
impl SensorDataSource for HaSensorSource {
    async fn read_value(&self, entity_id: &str) -> Result<SensorValue> {
        debug!("📊 [ADAPTER] Reading sensor: {}", entity_id);

        let state = match self.client.get_state(entity_id).await {
            Ok(state) => state,
            Err(HaError::EntityNotFound(_)) => {
                error!("❌ [ADAPTER] Entity {} not found", entity_id);
                return Ok(SensorValue::Unavailable);
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read entity: {}", entity_id));
            }
        };

        match state.state.as_str() {
            "unknown" | "unavailable" => {
                warn!(
                    "⚠️ [ADAPTER] Entity {} has state '{}'",
                    entity_id, state.state
                );
                Ok(SensorValue::Unavailable)
            }
            raw => match raw.parse::<f64>() {
                Ok(value) => {
                    debug!("✅ [ADAPTER] {} = {}", entity_id, value);
                    Ok(SensorValue::Number(value))
                }
                Err(_) => {
                    error!(
                        "❌ [ADAPTER] Unable to convert value of {} to float: '{}'",
                        entity_id, raw
                    );
                    Ok(SensorValue::Unavailable)
                }
            },
        }
    }

    async fn health_check(&self) -> Result<bool> {
        self.client.ping().await.map_err(|e| anyhow::anyhow!(e))
    }

    fn name(&self) -> &str {
        "HomeAssistant"
    }
}
