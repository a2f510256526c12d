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

use anyhow::Result;
use async_trait::async_trait;
use carbonion_types::TickData;

/// Outcome of reading a named sensor.
///
/// `Unavailable` covers a missing entity, the host's `"unknown"` /
/// `"unavailable"` sentinel states, and non-numeric values. The caller
/// decides whether that is recoverable (energy entities) or aborts the tick
/// (the intensity entity).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SensorValue {
    Number(f64),
    Unavailable,
}

impl SensorValue {
    pub fn as_number(self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(v),
            Self::Unavailable => None,
        }
    }
}

/// Generic data source for reading current sensor values
/// Business logic uses this trait, never knows about the HA API details
#[async_trait]
pub trait SensorDataSource: Send + Sync {
    /// Read the current value of a sensor entity.
    ///
    /// Returns `Err` only for unexpected faults (transport failures);
    /// an absent or non-numeric reading is `Ok(SensorValue::Unavailable)`.
    async fn read_value(&self, entity_id: &str) -> Result<SensorValue>;

    /// Check if data source is available
    async fn health_check(&self) -> Result<bool>;

    /// Get data source name for logging
    fn name(&self) -> &str;
}

/// Sink for exposing tick results as read-only sensors
#[async_trait]
pub trait SensorPublisher: Send + Sync {
    /// Publish the result of a successful tick for one instance
    async fn publish(&self, instance_id: &str, data: &TickData) -> Result<()>;

    /// Get publisher name for logging
    fn name(&self) -> &str;
}
