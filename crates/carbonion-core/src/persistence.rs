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

//! Persistence layer for accumulated footprint state.
//!
//! Handles loading and saving of `FootprintState` to/from disk.

use anyhow::{Context, Result};
use carbonion_types::{FootprintState, STORAGE_VERSION};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Footprint state persistence manager.
#[derive(Debug, Clone)]
pub struct FootprintPersistence {
    /// Path to the state file.
    state_path: PathBuf,
}

impl FootprintPersistence {
    /// Create a new persistence manager with the given path.
    pub fn new(state_path: impl Into<PathBuf>) -> Self {
        Self {
            state_path: state_path.into(),
        }
    }

    /// Get the path being used for persistence.
    pub fn path(&self) -> &Path {
        &self.state_path
    }

    /// Load footprint state from disk.
    ///
    /// Returns the default (empty) state if the file doesn't exist or was
    /// written by an unknown format version.
    pub fn load(&self) -> Result<FootprintState> {
        if !self.state_path.exists() {
            info!(
                "Footprint state file not found at {}, starting empty",
                self.state_path.display()
            );
            return Ok(FootprintState::default());
        }

        let contents = fs::read_to_string(&self.state_path).with_context(|| {
            format!(
                "Failed to read footprint state from {}",
                self.state_path.display()
            )
        })?;

        let state: FootprintState = serde_json::from_str(&contents).with_context(|| {
            format!(
                "Failed to parse footprint state from {}",
                self.state_path.display()
            )
        })?;

        if state.version != STORAGE_VERSION {
            warn!(
                "Footprint state at {} has version {} (expected {}), starting empty",
                self.state_path.display(),
                state.version,
                STORAGE_VERSION
            );
            return Ok(FootprintState::default());
        }

        info!(
            "Loaded footprint state: total={:.3} kg CO2, {} entities tracked",
            state.total_carbon_kg,
            state.previous_energy_values.len()
        );

        Ok(state)
    }

    /// Save footprint state to disk.
    ///
    /// Uses atomic write (temp file + rename) to prevent corruption.
    pub fn save(&self, state: &FootprintState) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = self.state_path.parent()
            && !parent.exists()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let json =
            serde_json::to_string_pretty(state).context("Failed to serialize footprint state")?;

        // Atomic write using temp file
        let temp_path = self.state_path.with_extension("tmp");
        fs::write(&temp_path, &json)
            .with_context(|| format!("Failed to write temp file {}", temp_path.display()))?;
        fs::rename(&temp_path, &self.state_path).with_context(|| {
            format!(
                "Failed to rename temp file to {}",
                self.state_path.display()
            )
        })?;

        Ok(())
    }

    /// Check if a state file exists.
    pub fn exists(&self) -> bool {
        self.state_path.exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_nonexistent_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nonexistent.json");
        let persistence = FootprintPersistence::new(path);

        let state = persistence.load().unwrap();
        assert_eq!(state.total_carbon_kg, 0.0);
        assert!(state.entity_carbon_kg.is_empty());
        assert!(state.previous_energy_values.is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("footprint.json");
        let persistence = FootprintPersistence::new(path);

        let mut state = FootprintState {
            total_carbon_kg: 1.5,
            ..Default::default()
        };
        state
            .entity_carbon_kg
            .insert("sensor.heat_pump_energy".to_owned(), 1.5);
        state
            .previous_energy_values
            .insert("sensor.heat_pump_energy".to_owned(), 42.0);

        persistence.save(&state).unwrap();
        let loaded = persistence.load().unwrap();

        assert_eq!(loaded, state);
    }

    #[test]
    fn test_save_creates_parent_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("data").join("footprint.json");
        let persistence = FootprintPersistence::new(&path);

        persistence.save(&FootprintState::default()).unwrap();
        assert!(persistence.exists());
    }

    #[test]
    fn test_unknown_version_starts_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("footprint.json");

        let state = FootprintState {
            version: 99,
            total_carbon_kg: 7.0,
            ..Default::default()
        };
        fs::write(&path, serde_json::to_string(&state).unwrap()).unwrap();

        let persistence = FootprintPersistence::new(&path);
        let loaded = persistence.load().unwrap();
        assert_eq!(loaded, FootprintState::default());
    }

    #[test]
    fn test_save_overwrites_whole_record() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("footprint.json");
        let persistence = FootprintPersistence::new(path);

        let mut first = FootprintState::default();
        first
            .previous_energy_values
            .insert("sensor.a".to_owned(), 10.0);
        persistence.save(&first).unwrap();

        let second = FootprintState::default();
        persistence.save(&second).unwrap();

        let loaded = persistence.load().unwrap();
        assert!(loaded.previous_energy_values.is_empty());
    }
}
