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

//! One wired footprint instance: coordinator + data source + publisher.
//!
//! The binary owns an explicit [`InstanceMap`] and hands it to the web layer
//! by `Arc`; there is no ambient registry. The scheduled tick and the reset
//! command serialize through the per-instance async mutex, so state is never
//! mutated from two callers at once.

use anyhow::{Context, Result};
use carbonion_types::{FootprintSnapshot, TickData};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error};

use crate::coordinator::FootprintCoordinator;
use crate::traits::{SensorDataSource, SensorPublisher};

/// Instance handles keyed by instance id, owned by the top-level process.
pub type InstanceMap = BTreeMap<String, Arc<FootprintInstance>>;

pub struct FootprintInstance {
    id: String,
    coordinator: Mutex<FootprintCoordinator>,
    source: Arc<dyn SensorDataSource>,
    publisher: Option<Arc<dyn SensorPublisher>>,
    /// Cached copy of the latest snapshot so the web layer never has to
    /// wait for an in-flight tick.
    latest: RwLock<FootprintSnapshot>,
}

impl std::fmt::Debug for FootprintInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FootprintInstance")
            .field("id", &self.id)
            .field("source", &self.source.name())
            .finish()
    }
}

impl FootprintInstance {
    pub fn new(
        coordinator: FootprintCoordinator,
        source: Arc<dyn SensorDataSource>,
        publisher: Option<Arc<dyn SensorPublisher>>,
    ) -> Self {
        let id = coordinator.instance_id().to_owned();
        let latest = RwLock::new(coordinator.snapshot());
        Self {
            id,
            coordinator: Mutex::new(coordinator),
            source,
            publisher,
            latest,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Latest known totals, without touching the coordinator lock.
    pub fn snapshot(&self) -> FootprintSnapshot {
        self.latest.read().clone()
    }

    /// Run one tick and publish the result.
    pub async fn run_tick(&self) -> Result<Option<TickData>> {
        let mut coordinator = self.coordinator.lock().await;
        let outcome = coordinator.refresh(self.source.as_ref()).await;
        *self.latest.write() = coordinator.snapshot();
        drop(coordinator);

        let data = outcome?;

        if let Some(data) = &data
            && let Some(publisher) = &self.publisher
        {
            publisher
                .publish(&self.id, data)
                .await
                .with_context(|| format!("Failed to publish footprint sensors for '{}'", self.id))?;
        }

        Ok(data)
    }

    /// Apply a reset, then run an immediate out-of-cadence tick so the
    /// exposed readings reflect the reset promptly.
    pub async fn reset_and_refresh(&self, energy_entity_id: Option<&str>) -> Result<()> {
        {
            let mut coordinator = self.coordinator.lock().await;
            coordinator.reset(energy_entity_id)?;
            *self.latest.write() = coordinator.snapshot();
        }

        match self.run_tick().await {
            Ok(Some(_)) => debug!("[{}] Post-reset refresh complete", self.id),
            Ok(None) => debug!("[{}] Post-reset refresh produced no data", self.id),
            // The reset itself is already committed; the scheduled cadence
            // will retry the refresh.
            Err(e) => error!("[{}] Post-reset refresh failed: {:#}", self.id, e),
        }

        Ok(())
    }
}
