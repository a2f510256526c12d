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

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Version of the persisted state record format.
pub const STORAGE_VERSION: u32 = 1;

/// Persisted accumulation state of one footprint instance.
///
/// Holds the last-observed counter value per energy entity (the baseline for
/// the next delta) and the accumulated carbon totals. Saved as a whole
/// record after every mutation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FootprintState {
    #[serde(default = "default_version")]
    pub version: u32,

    /// Grand total of emitted CO2 (kg) across all energy entities
    pub total_carbon_kg: f64,

    /// Accumulated CO2 (kg) per energy entity
    pub entity_carbon_kg: BTreeMap<String, f64>,

    /// Last-observed cumulative counter value (kWh) per energy entity
    pub previous_energy_values: BTreeMap<String, f64>,
}

impl Default for FootprintState {
    fn default() -> Self {
        Self {
            version: STORAGE_VERSION,
            total_carbon_kg: 0.0,
            entity_carbon_kg: BTreeMap::new(),
            previous_energy_values: BTreeMap::new(),
        }
    }
}

fn default_version() -> u32 {
    STORAGE_VERSION
}

/// Per-entity result of one update tick.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct EnergyReading {
    /// Energy consumed since the previous observation (kWh), clamped to >= 0
    pub consumption_kwh: f64,

    /// Accumulated CO2 (kg) for this entity after the tick
    pub carbon_kg: f64,
}

/// Result of one successful update tick.
///
/// Entities that were unavailable this tick are absent from
/// `energy_sensors`; first-ever observations appear with zero consumption.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickData {
    /// Carbon intensity used for this tick (g CO2 per kWh)
    pub carbon_intensity: f64,

    /// Per-entity consumption and running carbon total
    pub energy_sensors: BTreeMap<String, EnergyReading>,

    /// Grand total of emitted CO2 (kg) after the tick
    pub total_carbon_kg: f64,

    /// When this tick completed
    pub fetched_at: DateTime<Utc>,
}

/// Read-only view of an instance for the web layer.
///
/// Always reflects the last good values; a failed tick freezes the snapshot
/// rather than zeroing it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FootprintSnapshot {
    pub id: String,
    pub total_carbon_kg: f64,
    pub entity_carbon_kg: BTreeMap<String, f64>,

    /// Carbon intensity of the last successful tick
    pub carbon_intensity: Option<f64>,

    /// Completion time of the last successful tick
    pub last_update: Option<DateTime<Utc>>,

    /// Whether the most recent scheduled tick produced data
    pub last_update_success: bool,
}
