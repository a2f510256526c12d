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

//! HTTP API for snapshots and the `reset_counter` administrative command.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use carbonion_core::InstanceMap;
use carbonion_types::FootprintSnapshot;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

/// Application state for web handlers
#[derive(Clone, Debug)]
pub struct AppState {
    pub instances: Arc<InstanceMap>,
}

/// Build the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/footprint", get(footprint))
        .route("/api/reset_counter", post(reset_counter))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Response for GET /api/health
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    instances: Vec<InstanceHealth>,
}

#[derive(Serialize)]
struct InstanceHealth {
    id: String,
    last_update_success: bool,
    last_update: Option<String>,
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let instances = state
        .instances
        .values()
        .map(|instance| {
            let snapshot = instance.snapshot();
            InstanceHealth {
                id: snapshot.id,
                last_update_success: snapshot.last_update_success,
                last_update: snapshot.last_update.map(|t| t.to_rfc3339()),
            }
        })
        .collect();

    Json(HealthResponse {
        status: "ok",
        instances,
    })
}

/// Response for GET /api/footprint
#[derive(Serialize)]
struct FootprintResponse {
    footprints: Vec<FootprintSnapshot>,
}

async fn footprint(State(state): State<AppState>) -> impl IntoResponse {
    let footprints = state
        .instances
        .values()
        .map(|instance| instance.snapshot())
        .collect();

    Json(FootprintResponse { footprints })
}

/// Request body for POST /api/reset_counter
#[derive(Debug, Default, Deserialize)]
struct ResetRequest {
    /// Reset only this energy entity; omit to reset everything
    #[serde(default)]
    energy_entity_id: Option<String>,
}

#[derive(Serialize)]
struct ResetResponse {
    reset: Vec<String>,
}

/// Clears baselines and accumulated totals, then refreshes immediately.
///
/// Applies to every configured instance, scoped to one energy entity when
/// `energy_entity_id` is given.
async fn reset_counter(
    State(state): State<AppState>,
    body: axum::body::Bytes,
) -> impl IntoResponse {
    // An empty body means "reset everything"
    let request: ResetRequest = if body.is_empty() {
        ResetRequest::default()
    } else {
        match serde_json::from_slice(&body) {
            Ok(request) => request,
            Err(e) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(serde_json::json!({ "error": format!("Invalid request body: {e}") })),
                )
                    .into_response();
            }
        }
    };
    let target = request.energy_entity_id.as_deref();

    info!(
        "Reset counter requested (target: {})",
        target.unwrap_or("all")
    );

    let mut reset = Vec::new();
    for instance in state.instances.values() {
        match instance.reset_and_refresh(target).await {
            Ok(()) => reset.push(instance.id().to_owned()),
            Err(e) => {
                error!("Reset failed for instance '{}': {:#}", instance.id(), e);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({ "error": format!("{e:#}") })),
                )
                    .into_response();
            }
        }
    }

    (StatusCode::OK, Json(ResetResponse { reset })).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;
    use carbonion_core::coordinator::FootprintCoordinator;
    use carbonion_core::instance::FootprintInstance;
    use carbonion_core::persistence::FootprintPersistence;
    use carbonion_core::traits::{SensorDataSource, SensorValue};
    use parking_lot::Mutex;
    use std::collections::BTreeMap;
    use tempfile::TempDir;
    use tower::ServiceExt;

    struct FakeSource {
        values: Mutex<BTreeMap<String, f64>>,
    }

    #[async_trait]
    impl SensorDataSource for FakeSource {
        async fn read_value(&self, entity_id: &str) -> Result<SensorValue> {
            Ok(self
                .values
                .lock()
                .get(entity_id)
                .map_or(SensorValue::Unavailable, |v| SensorValue::Number(*v)))
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "Fake"
        }
    }

    async fn test_state(dir: &TempDir) -> (AppState, Arc<FakeSource>) {
        let mut values = BTreeMap::new();
        values.insert("sensor.grid_carbon_intensity".to_owned(), 100.0);
        values.insert("sensor.heat_pump_energy".to_owned(), 10.0);
        let source = Arc::new(FakeSource {
            values: Mutex::new(values),
        });

        let coordinator = FootprintCoordinator::new(
            "home",
            "sensor.grid_carbon_intensity",
            vec!["sensor.heat_pump_energy".to_owned()],
            FootprintPersistence::new(dir.path().join("home.json")),
        );
        let instance = Arc::new(FootprintInstance::new(
            coordinator,
            source.clone(),
            None,
        ));

        let mut instances = InstanceMap::new();
        instances.insert(instance.id().to_owned(), instance.clone());

        // Establish a baseline and accumulate one tick of carbon
        instance.run_tick().await.unwrap();
        source
            .values
            .lock()
            .insert("sensor.heat_pump_energy".to_owned(), 15.0);
        instance.run_tick().await.unwrap();

        (
            AppState {
                instances: Arc::new(instances),
            },
            source,
        )
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn footprint_endpoint_returns_snapshots() {
        let dir = TempDir::new().unwrap();
        let (state, _source) = test_state(&dir).await;

        let response = router(state)
            .oneshot(
                axum::http::Request::builder()
                    .uri("/api/footprint")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["footprints"][0]["id"], "home");
        assert_eq!(json["footprints"][0]["total_carbon_kg"], 0.5);
    }

    #[tokio::test]
    async fn health_endpoint_reports_instances() {
        let dir = TempDir::new().unwrap();
        let (state, _source) = test_state(&dir).await;

        let response = router(state)
            .oneshot(
                axum::http::Request::builder()
                    .uri("/api/health")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["instances"][0]["last_update_success"], true);
    }

    #[tokio::test]
    async fn reset_counter_clears_and_refreshes() {
        let dir = TempDir::new().unwrap();
        let (state, _source) = test_state(&dir).await;
        let instances = state.instances.clone();

        let response = router(state)
            .oneshot(
                axum::http::Request::builder()
                    .method("POST")
                    .uri("/api/reset_counter")
                    .header("content-type", "application/json")
                    .body(axum::body::Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["reset"][0], "home");

        // Totals cleared; the immediate post-reset tick re-established the
        // baseline with zero consumption
        let snapshot = instances["home"].snapshot();
        assert_eq!(snapshot.total_carbon_kg, 0.0);
        assert!(snapshot.last_update_success);
    }

    #[tokio::test]
    async fn scoped_reset_targets_one_entity() {
        let dir = TempDir::new().unwrap();
        let (state, _source) = test_state(&dir).await;
        let instances = state.instances.clone();

        let response = router(state)
            .oneshot(
                axum::http::Request::builder()
                    .method("POST")
                    .uri("/api/reset_counter")
                    .header("content-type", "application/json")
                    .body(axum::body::Body::from(
                        r#"{"energy_entity_id": "sensor.heat_pump_energy"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        // Entity total cleared, grand total untouched
        let snapshot = instances["home"].snapshot();
        assert_eq!(snapshot.entity_carbon_kg["sensor.heat_pump_energy"], 0.0);
        assert_eq!(snapshot.total_carbon_kg, 0.5);
    }
}
