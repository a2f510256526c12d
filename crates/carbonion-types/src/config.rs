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

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Central configuration for the CarbonION service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Footprint instance configurations (one or more)
    pub footprints: Vec<FootprintConfig>,

    /// System configuration
    #[serde(default)]
    pub system: SystemSettings,

    /// Embedded web API configuration
    #[serde(default)]
    pub web: WebConfig,
}

/// Configuration for a single footprint instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FootprintConfig {
    /// Unique ID for this instance; also the prefix of the published
    /// virtual sensors (e.g. "home" -> sensor.home_total_carbon_footprint)
    pub id: String,

    /// HA entity ID of the grid carbon-intensity sensor (g CO2 per kWh)
    pub carbon_intensity_entity: String,

    /// HA entity IDs of the cumulative energy counters to track (kWh)
    pub energy_entities: Vec<String>,

    /// Override for the state file location.
    /// Defaults to `<system.data_dir>/<id>_footprint.json`.
    #[serde(default)]
    pub state_file: Option<PathBuf>,
}

impl FootprintConfig {
    /// Resolve the state file path for this instance.
    pub fn state_path(&self, data_dir: &str) -> PathBuf {
        self.state_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(data_dir).join(format!("{}_footprint.json", self.id)))
    }
}

/// System configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemSettings {
    /// Seconds between scheduled updates
    #[serde(default = "default_update_interval_secs")]
    pub update_interval_secs: u64,

    /// Directory for persisted state files.
    /// Uses a relative path for portability (works in both dev and HA addon).
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

impl Default for SystemSettings {
    fn default() -> Self {
        Self {
            update_interval_secs: default_update_interval_secs(),
            data_dir: default_data_dir(),
        }
    }
}

/// Embedded web API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    /// Listen address for the HTTP API
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Disable to run headless (scheduler only, no HTTP API)
    #[serde(default = "default_web_enabled")]
    pub enabled: bool,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            enabled: default_web_enabled(),
        }
    }
}

fn default_update_interval_secs() -> u64 {
    60
}

fn default_data_dir() -> String {
    "./data".to_owned()
}

fn default_listen_addr() -> String {
    "0.0.0.0:8099".to_owned()
}

fn default_web_enabled() -> bool {
    true
}
