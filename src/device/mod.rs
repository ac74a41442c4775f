use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tracing::{info, instrument};

use crate::{auth::extractors::AuthUser, error::ApiError, state::AppState};

pub mod client;
pub mod poller;

use poller::Snapshot;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/device/data", get(telemetry))
        .route("/device/toggle/:id", post(toggle_relay))
        .route("/device/shutdown", post(shutdown))
}

#[derive(Debug, Serialize)]
pub struct TelemetryEnvelope {
    pub success: bool,
    pub data: Snapshot,
    pub history: Vec<Snapshot>,
}

#[derive(Debug, Serialize)]
pub struct DeviceActionEnvelope {
    pub success: bool,
    pub result: serde_json::Value,
}

#[instrument(skip(state))]
pub async fn telemetry(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
) -> Result<Json<TelemetryEnvelope>, ApiError> {
    {
        let telemetry = state.telemetry.read().await;
        if let Some(latest) = &telemetry.latest {
            return Ok(Json(TelemetryEnvelope {
                success: true,
                data: latest.clone(),
                history: telemetry.history.iter().cloned().collect(),
            }));
        }
    }

    // No poll has landed yet; fetch once on demand so the dashboard is not
    // blank for the first interval.
    let reading = state
        .device
        .fetch_data()
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    let mut telemetry = state.telemetry.write().await;
    telemetry.apply(reading, state.config.device.voltage_threshold);
    let latest = telemetry
        .latest
        .clone()
        .ok_or_else(|| ApiError::Internal("telemetry unavailable".into()))?;
    Ok(Json(TelemetryEnvelope {
        success: true,
        data: latest,
        history: telemetry.history.iter().cloned().collect(),
    }))
}

#[instrument(skip(state))]
pub async fn toggle_relay(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<u8>,
) -> Result<Json<DeviceActionEnvelope>, ApiError> {
    let result = state
        .device
        .toggle_relay(id)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    info!(user_id = %user_id, relay = id, "relay toggled");

    // Refresh the derived snapshot right away instead of waiting a tick.
    if let Ok(reading) = state.device.fetch_data().await {
        let mut telemetry = state.telemetry.write().await;
        telemetry.apply(reading, state.config.device.voltage_threshold);
    }

    Ok(Json(DeviceActionEnvelope {
        success: true,
        result,
    }))
}

#[instrument(skip(state))]
pub async fn shutdown(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<DeviceActionEnvelope>, ApiError> {
    let result = state
        .device
        .shutdown()
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    info!(user_id = %user_id, "emergency shutdown requested");

    if let Ok(reading) = state.device.fetch_data().await {
        let mut telemetry = state.telemetry.write().await;
        telemetry.apply(reading, state.config.device.voltage_threshold);
    }

    Ok(Json(DeviceActionEnvelope {
        success: true,
        result,
    }))
}
