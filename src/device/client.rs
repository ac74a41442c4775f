use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::config::DeviceConfig;

/// One relay channel on the board. Relay 4 drives the solar panel switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relay {
    pub id: u8,
    pub state: bool,
}

/// Raw JSON payload returned by the board's `GET /data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorReading {
    #[serde(default)]
    pub voltage1: f64,
    #[serde(default)]
    pub voltage2: f64,
    #[serde(default)]
    pub current: f64,
    #[serde(default)]
    pub power1: f64,
    #[serde(default)]
    pub power2: f64,
    #[serde(default)]
    pub temperature: f64,
    #[serde(default)]
    pub humidity: f64,
    #[serde(default)]
    pub air_quality: f64,
    #[serde(default)]
    pub relays: Vec<Relay>,
}

impl SensorReading {
    pub fn any_relay_on(&self) -> bool {
        self.relays.iter().any(|r| r.state)
    }

    pub fn relay_on(&self, id: u8) -> bool {
        self.relays.iter().any(|r| r.id == id && r.state)
    }
}

/// HTTP client for the ESP32 sensor/actuator service.
#[derive(Clone)]
pub struct DeviceClient {
    http: reqwest::Client,
    base_url: String,
}

impl DeviceClient {
    pub fn new(config: &DeviceConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("build device http client")?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn fetch_data(&self) -> anyhow::Result<SensorReading> {
        let reading = self
            .http
            .get(format!("{}/data", self.base_url))
            .send()
            .await
            .context("device unreachable")?
            .error_for_status()
            .context("device returned an error status")?
            .json::<SensorReading>()
            .await
            .context("device returned malformed data")?;
        Ok(reading)
    }

    /// The board exposes one toggle endpoint per relay: `POST /toggle{id}`.
    pub async fn toggle_relay(&self, relay_id: u8) -> anyhow::Result<serde_json::Value> {
        let body = self
            .http
            .post(format!("{}/toggle{}", self.base_url, relay_id))
            .send()
            .await
            .context("device unreachable")?
            .error_for_status()
            .context("relay toggle failed")?
            .json::<serde_json::Value>()
            .await
            .context("device returned malformed toggle response")?;
        Ok(body)
    }

    pub async fn shutdown(&self) -> anyhow::Result<serde_json::Value> {
        let body = self
            .http
            .post(format!("{}/shutdown", self.base_url))
            .send()
            .await
            .context("device unreachable")?
            .error_for_status()
            .context("shutdown failed")?
            .json::<serde_json::Value>()
            .await
            .context("device returned malformed shutdown response")?;
        Ok(body)
    }
}
