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

//! Publishes tick results as virtual sensors in Home Assistant.
//!
//! One `sensor.<instance>_total_carbon_footprint` per instance plus one
//! `sensor.<instance>_<source>_carbon_footprint` per tracked energy entity.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

use crate::client::HomeAssistantClient;
use carbonion_core::traits::SensorPublisher;
use carbonion_types::TickData;

const UNIT_KG_CO2: &str = "kg CO2";
const ICON_CARBON: &str = "mdi:molecule-co2";
const STATE_CLASS: &str = "total_increasing";

pub struct HaSensorPublisher {
    client: Arc<HomeAssistantClient>,
}

impl HaSensorPublisher {
    pub fn new(client: Arc<HomeAssistantClient>) -> Self {
        Self { client }
    }
}

impl std::fmt::Debug for HaSensorPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HaSensorPublisher").finish()
    }
}

/// Extract the object id from an entity id
/// (e.g. "sensor.living_room_energy" becomes "living_room_energy")
fn object_id(entity_id: &str) -> &str {
    entity_id.rsplit('.').next().unwrap_or(entity_id)
}

/// Turn an object id into a friendly name
/// (e.g. "living_room_energy" becomes "Living Room Energy")
fn friendly_name(object_id: &str) -> String {
    object_id
        .split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[async_trait]
impl SensorPublisher for HaSensorPublisher {
    async fn publish(&self, instance_id: &str, data: &TickData) -> Result<()> {
        let total_entity = format!("sensor.{}_total_carbon_footprint", instance_id);
        self.client
            .set_state(
                &total_entity,
                format!("{:.6}", data.total_carbon_kg),
                json!({
                    "unit_of_measurement": UNIT_KG_CO2,
                    "state_class": STATE_CLASS,
                    "icon": ICON_CARBON,
                    "friendly_name": "Total Carbon Footprint",
                    "carbon_intensity": data.carbon_intensity,
                    "energy_sensors": data.energy_sensors.len(),
                }),
            )
            .await
            .with_context(|| format!("Failed to publish {}", total_entity))?;

        for (source_entity, reading) in &data.energy_sensors {
            let object = object_id(source_entity);
            let entity_id = format!("sensor.{}_{}_carbon_footprint", instance_id, object);
            self.client
                .set_state(
                    &entity_id,
                    format!("{:.6}", reading.carbon_kg),
                    json!({
                        "unit_of_measurement": UNIT_KG_CO2,
                        "state_class": STATE_CLASS,
                        "icon": ICON_CARBON,
                        "friendly_name": format!("{} Carbon Footprint", friendly_name(object)),
                        "energy_consumption": reading.consumption_kwh,
                        "carbon_intensity": data.carbon_intensity,
                        "source_entity": source_entity,
                    }),
                )
                .await
                .with_context(|| format!("Failed to publish {}", entity_id))?;
        }

        debug!(
            "✅ [PUBLISH] {} sensors updated for instance '{}'",
            data.energy_sensors.len() + 1,
            instance_id
        );

        Ok(())
    }

    fn name(&self) -> &str {
        "HomeAssistant"
    }
}
