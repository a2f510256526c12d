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

//! The update/accumulation routine for one footprint instance.
//!
//! On every tick the coordinator reads the carbon-intensity sensor and each
//! configured energy counter, converts the counter delta since the previous
//! observation into kg of CO2, advances the running totals, and persists the
//! whole state as a single record.

use anyhow::Result;
use carbonion_types::{EnergyReading, FootprintSnapshot, FootprintState, TickData};
use chrono::Utc;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::persistence::FootprintPersistence;
use crate::traits::{SensorDataSource, SensorValue};

/// Aggregates carbon emissions for one set of energy counters.
pub struct FootprintCoordinator {
    instance_id: String,
    carbon_intensity_entity: String,
    energy_entities: Vec<String>,
    state: FootprintState,
    persistence: FootprintPersistence,
    last_data: Option<TickData>,
    last_update_success: bool,
}

impl std::fmt::Debug for FootprintCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FootprintCoordinator")
            .field("instance_id", &self.instance_id)
            .field("carbon_intensity_entity", &self.carbon_intensity_entity)
            .field("energy_entities", &self.energy_entities)
            .field("total_carbon_kg", &self.state.total_carbon_kg)
            .finish()
    }
}

impl FootprintCoordinator {
    pub fn new(
        instance_id: impl Into<String>,
        carbon_intensity_entity: impl Into<String>,
        energy_entities: Vec<String>,
        persistence: FootprintPersistence,
    ) -> Self {
        Self {
            instance_id: instance_id.into(),
            carbon_intensity_entity: carbon_intensity_entity.into(),
            energy_entities,
            state: FootprintState::default(),
            persistence,
            last_data: None,
            last_update_success: false,
        }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn energy_entities(&self) -> &[String] {
        &self.energy_entities
    }

    /// Load previously persisted state, if any.
    ///
    /// The next tick computes deltas relative to the restored baselines
    /// instead of treating every counter as a first observation.
    pub fn restore(&mut self) -> Result<()> {
        self.state = self.persistence.load()?;
        Ok(())
    }

    /// Run one update tick.
    ///
    /// Returns `Ok(None)` when the intensity sensor has no usable value
    /// (nothing is mutated); `Err` for unexpected faults. Committed state is
    /// only advanced after the new record has been persisted, so a failed
    /// tick leaves both memory and disk at the previous tick's values.
    pub async fn refresh(&mut self, source: &dyn SensorDataSource) -> Result<Option<TickData>> {
        let result = self.run_tick(source).await;
        self.last_update_success = matches!(&result, Ok(Some(_)));
        result
    }

    async fn run_tick(&mut self, source: &dyn SensorDataSource) -> Result<Option<TickData>> {
        let intensity = match source.read_value(&self.carbon_intensity_entity).await? {
            SensorValue::Number(v) => v,
            SensorValue::Unavailable => {
                warn!(
                    "[{}] Carbon intensity entity {} has no usable value, skipping tick",
                    self.instance_id, self.carbon_intensity_entity
                );
                return Ok(None);
            }
        };

        // Stage all mutations on a copy; commit only after a successful save
        let mut next = self.state.clone();
        let mut energy_sensors = BTreeMap::new();
        let mut tick_carbon = 0.0;

        for entity_id in &self.energy_entities {
            let value = match source.read_value(entity_id).await? {
                SensorValue::Number(v) => v,
                SensorValue::Unavailable => {
                    warn!(
                        "[{}] Energy entity {} unavailable, skipping this tick",
                        self.instance_id, entity_id
                    );
                    continue;
                }
            };

            let previous = next.previous_energy_values.insert(entity_id.clone(), value);

            let Some(previous) = previous else {
                // Two measurements are needed to calculate consumption
                debug!(
                    "[{}] First observation of {} at {:.3} kWh",
                    self.instance_id, entity_id, value
                );
                energy_sensors.insert(
                    entity_id.clone(),
                    EnergyReading {
                        consumption_kwh: 0.0,
                        carbon_kg: next.entity_carbon_kg.get(entity_id).copied().unwrap_or(0.0),
                    },
                );
                continue;
            };

            // Clamp absorbs counter resets and rollovers
            let consumption = (value - previous).max(0.0);

            // Intensity is g/kWh; totals are kept in kg
            let carbon = consumption * intensity / 1000.0;

            let entity_total = next.entity_carbon_kg.get(entity_id).copied().unwrap_or(0.0) + carbon;
            next.entity_carbon_kg.insert(entity_id.clone(), entity_total);
            tick_carbon += carbon;

            energy_sensors.insert(
                entity_id.clone(),
                EnergyReading {
                    consumption_kwh: consumption,
                    carbon_kg: entity_total,
                },
            );
        }

        next.total_carbon_kg += tick_carbon;

        self.persistence.save(&next)?;
        self.state = next;

        let data = TickData {
            carbon_intensity: intensity,
            energy_sensors,
            total_carbon_kg: self.state.total_carbon_kg,
            fetched_at: Utc::now(),
        };

        debug!(
            "[{}] Tick complete: intensity={} g/kWh, +{:.4} kg CO2, total={:.4} kg CO2",
            self.instance_id, intensity, tick_carbon, data.total_carbon_kg
        );

        self.last_data = Some(data.clone());
        Ok(Some(data))
    }

    /// Clear baselines and accumulated carbon.
    ///
    /// With a target entity only that entity's baseline is removed and its
    /// accumulated carbon zeroed; the grand total and other entities are
    /// untouched. Without a target everything is cleared. The resulting
    /// state is persisted immediately.
    pub fn reset(&mut self, energy_entity_id: Option<&str>) -> Result<()> {
        match energy_entity_id {
            Some(entity_id) => {
                info!("[{}] Resetting counter for {}", self.instance_id, entity_id);
                self.state.previous_energy_values.remove(entity_id);
                if let Some(total) = self.state.entity_carbon_kg.get_mut(entity_id) {
                    *total = 0.0;
                }
            }
            None => {
                info!("[{}] Resetting all counters", self.instance_id);
                self.state.previous_energy_values.clear();
                self.state.entity_carbon_kg.clear();
                self.state.total_carbon_kg = 0.0;
            }
        }

        self.persistence.save(&self.state)
    }

    /// Current totals for read-only exposure.
    ///
    /// Reflects the last committed state; after a failed tick the values
    /// freeze rather than resetting to zero.
    pub fn snapshot(&self) -> FootprintSnapshot {
        FootprintSnapshot {
            id: self.instance_id.clone(),
            total_carbon_kg: self.state.total_carbon_kg,
            entity_carbon_kg: self.state.entity_carbon_kg.clone(),
            carbon_intensity: self.last_data.as_ref().map(|d| d.carbon_intensity),
            last_update: self.last_data.as_ref().map(|d| d.fetched_at),
            last_update_success: self.last_update_success,
        }
    }
}
