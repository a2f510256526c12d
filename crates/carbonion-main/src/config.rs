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

use anyhow::{Context, Result, bail};
use carbonion_ha::{HaError, HomeAssistantClient};
use carbonion_types::AppConfig;
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::{info, warn};

const DEFAULT_CONFIG_PATH: &str = "./config.toml";

/// Resolve the config file path (CARBONION_CONFIG overrides the default).
pub fn config_path() -> PathBuf {
    std::env::var("CARBONION_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Load and structurally validate the configuration file.
pub fn load_config() -> Result<AppConfig> {
    let path = config_path();
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;

    let config: AppConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;

    validate_structure(&config)?;
    Ok(config)
}

fn validate_structure(config: &AppConfig) -> Result<()> {
    if config.footprints.is_empty() {
        bail!("Config must define at least one [[footprints]] instance");
    }

    let mut seen = HashSet::new();
    for footprint in &config.footprints {
        if footprint.id.is_empty() {
            bail!("Footprint instance id must not be empty");
        }
        if !seen.insert(footprint.id.as_str()) {
            bail!("Duplicate footprint instance id: '{}'", footprint.id);
        }
        if footprint.carbon_intensity_entity.is_empty() {
            bail!(
                "Footprint '{}' must set carbon_intensity_entity",
                footprint.id
            );
        }
        if footprint.energy_entities.is_empty() {
            bail!(
                "Footprint '{}' must list at least one energy entity",
                footprint.id
            );
        }
    }

    if config.system.update_interval_secs == 0 {
        bail!("system.update_interval_secs must be at least 1");
    }

    Ok(())
}

/// Confirm every configured entity currently resolves in Home Assistant.
///
/// A missing entity is a configuration error and is rejected before the
/// scheduler ever starts; transient API faults only produce a warning so a
/// restart during an HA outage doesn't wedge the addon.
pub async fn validate_entities(client: &HomeAssistantClient, config: &AppConfig) -> Result<()> {
    for footprint in &config.footprints {
        let mut entity_ids = vec![footprint.carbon_intensity_entity.as_str()];
        entity_ids.extend(footprint.energy_entities.iter().map(String::as_str));

        for entity_id in entity_ids {
            match client.get_state(entity_id).await {
                Ok(_) => {}
                Err(HaError::EntityNotFound(_)) => {
                    bail!(
                        "Footprint '{}' references unknown entity '{}'",
                        footprint.id,
                        entity_id
                    );
                }
                Err(e) => {
                    warn!(
                        "Could not verify entity '{}' for footprint '{}': {}",
                        entity_id, footprint.id, e
                    );
                }
            }
        }
        info!(
            "Validated entities for footprint '{}' ({} energy sensors)",
            footprint.id,
            footprint.energy_entities.len()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use carbonion_types::FootprintConfig;

    fn base_config() -> AppConfig {
        AppConfig {
            footprints: vec![FootprintConfig {
                id: "home".to_owned(),
                carbon_intensity_entity: "sensor.ci".to_owned(),
                energy_entities: vec!["sensor.energy".to_owned()],
                state_file: None,
            }],
            system: Default::default(),
            web: Default::default(),
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(validate_structure(&base_config()).is_ok());
    }

    #[test]
    fn empty_footprints_rejected() {
        let mut config = base_config();
        config.footprints.clear();
        assert!(validate_structure(&config).is_err());
    }

    #[test]
    fn duplicate_ids_rejected() {
        let mut config = base_config();
        config.footprints.push(config.footprints[0].clone());
        assert!(validate_structure(&config).is_err());
    }

    #[test]
    fn missing_energy_entities_rejected() {
        let mut config = base_config();
        config.footprints[0].energy_entities.clear();
        assert!(validate_structure(&config).is_err());
    }

    #[test]
    fn zero_interval_rejected() {
        let mut config = base_config();
        config.system.update_interval_secs = 0;
        assert!(validate_structure(&config).is_err());
    }
}
