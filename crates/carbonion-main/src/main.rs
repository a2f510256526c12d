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

mod config;

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::FmtSubscriber;

use carbonion_core::{
    FootprintCoordinator, FootprintInstance, FootprintPersistence, InstanceMap, SensorDataSource,
    SensorPublisher,
};
use carbonion_ha::{HaSensorPublisher, HaSensorSource, HomeAssistantClient};
use carbonion_web::AppState;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Handle command line arguments
    let args: Vec<String> = std::env::args().collect();
    if args.len() > 1 {
        match args[1].as_str() {
            "--help" | "-h" => {
                println!("CarbonION - Carbon Footprint Tracking for Home Assistant");
                println!("Version: {}", VERSION);
                println!();
                println!("Usage: carbonion [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -h, --help    Print this help message");
                println!("  -v, --version Print version");
                return Ok(());
            }
            "--version" | "-v" => {
                println!("{}", VERSION);
                return Ok(());
            }
            _ => {
                // Unknown args fall through to normal execution
            }
        }
    }

    // Initialize tracing with env filter support
    // Respects RUST_LOG environment variable
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let config = config::load_config()?;

    info!("🌍 Starting CarbonION - Carbon Footprint Tracking");
    info!("📋 Configuration Summary:");
    info!("   Footprint instances: {}", config.footprints.len());
    for footprint in &config.footprints {
        info!(
            "     - {} ({} energy sensors, intensity from {})",
            footprint.id,
            footprint.energy_entities.len(),
            footprint.carbon_intensity_entity
        );
    }
    info!(
        "   Update interval: {}s",
        config.system.update_interval_secs
    );
    info!("   Data directory: {}", config.system.data_dir);

    let client = Arc::new(
        HomeAssistantClient::from_environment()
            .context("Failed to initialize Home Assistant client")?,
    );

    config::validate_entities(&client, &config).await?;

    let source: Arc<dyn SensorDataSource> = Arc::new(HaSensorSource::new(client.clone()));
    let publisher: Arc<dyn SensorPublisher> = Arc::new(HaSensorPublisher::new(client));

    // The top-level process owns the instance map; the web layer gets a
    // handle, not a global lookup
    let mut instances = InstanceMap::new();
    for footprint in &config.footprints {
        let persistence =
            FootprintPersistence::new(footprint.state_path(&config.system.data_dir));
        let mut coordinator = FootprintCoordinator::new(
            &footprint.id,
            &footprint.carbon_intensity_entity,
            footprint.energy_entities.clone(),
            persistence,
        );
        coordinator
            .restore()
            .with_context(|| format!("Failed to restore state for footprint '{}'", footprint.id))?;

        let instance = Arc::new(FootprintInstance::new(
            coordinator,
            source.clone(),
            Some(publisher.clone()),
        ));
        instances.insert(footprint.id.clone(), instance);
    }
    let instances = Arc::new(instances);

    if config.web.enabled {
        let router = carbonion_web::router(AppState {
            instances: instances.clone(),
        });
        let listen_addr = config.web.listen_addr.clone();
        let listener = tokio::net::TcpListener::bind(&listen_addr)
            .await
            .with_context(|| format!("Failed to bind web API to {listen_addr}"))?;
        info!("🌐 Web API listening on {}", listen_addr);
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                error!("Web API server exited: {}", e);
            }
        });
    }

    // First refresh outside the cadence so sensors appear right away
    run_all_ticks(&instances).await;

    let mut interval =
        tokio::time::interval(Duration::from_secs(config.system.update_interval_secs));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first interval tick fires immediately; the initial refresh above
    // already covered it
    interval.tick().await;

    info!("⏱️ Scheduler running");
    loop {
        tokio::select! {
            _ = interval.tick() => {
                run_all_ticks(&instances).await;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown requested");
                break;
            }
        }
    }

    // Committed totals are persisted after every tick, nothing left to flush
    info!("CarbonION stopped");
    Ok(())
}

async fn run_all_ticks(instances: &InstanceMap) {
    for instance in instances.values() {
        match instance.run_tick().await {
            Ok(Some(data)) => {
                info!(
                    "[{}] Updated: total {:.4} kg CO2 at {} g/kWh",
                    instance.id(),
                    data.total_carbon_kg,
                    data.carbon_intensity
                );
            }
            Ok(None) => {
                warn!(
                    "[{}] No carbon intensity data, keeping previous readings",
                    instance.id()
                );
            }
            Err(e) => {
                error!("[{}] Update failed: {:#}", instance.id(), e);
            }
        }
    }
}
