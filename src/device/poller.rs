use std::collections::VecDeque;
use std::sync::Arc;

use serde::Serialize;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::device::client::SensorReading;
use crate::state::AppState;

/// Carbon emission factors, kg CO2 per kWh.
pub const GRID_FACTOR: f64 = 0.475;
pub const SOLAR_FACTOR: f64 = 0.041;

/// Relay channel wired to the solar panel switch.
pub const SOLAR_RELAY_ID: u8 = 4;

const HISTORY_LEN: usize = 20;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CarbonSummary {
    pub total_power_kw: f64,
    /// "Solar" while the solar relay is on, otherwise "Grid".
    pub source: &'static str,
    pub hourly_emissions_kg: f64,
    pub interval_emissions_kg: f64,
    pub total_emissions_kg: f64,
    /// Hourly kg CO2 avoided versus grid power while solar is active.
    pub hourly_savings_kg: f64,
}

/// Latest board reading with the dashboard's derived metrics applied.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(flatten)]
    pub reading: SensorReading,
    pub auto_shutdown: bool,
    pub carbon: CarbonSummary,
    #[serde(with = "time::serde::rfc3339")]
    pub taken_at: OffsetDateTime,
}

/// Shared telemetry state; the poller is the single writer.
#[derive(Debug, Default)]
pub struct Telemetry {
    pub latest: Option<Snapshot>,
    pub history: VecDeque<Snapshot>,
    pub total_emissions_kg: f64,
}

pub type SharedTelemetry = Arc<RwLock<Telemetry>>;

/// Apply the derived-metric rules to a raw reading:
/// over-voltage forces every relay off and zeroes current/power, an idle
/// board (no relay on) also reports zero current/power, and the carbon
/// figures follow from the adjusted power draw.
pub fn derive_snapshot(
    mut reading: SensorReading,
    voltage_threshold: f64,
    interval_secs: f64,
    total_emissions_so_far: f64,
    taken_at: OffsetDateTime,
) -> Snapshot {
    let auto_shutdown =
        reading.voltage1 > voltage_threshold || reading.voltage2 > voltage_threshold;

    if auto_shutdown {
        for relay in &mut reading.relays {
            relay.state = false;
        }
    }
    if auto_shutdown || !reading.any_relay_on() {
        reading.current = 0.0;
        reading.power1 = 0.0;
        reading.power2 = 0.0;
    }

    let solar_active = reading.relay_on(SOLAR_RELAY_ID);
    let total_power_kw = (reading.power1 + reading.power2) / 1000.0;
    let factor = if solar_active { SOLAR_FACTOR } else { GRID_FACTOR };
    let hourly_emissions_kg = total_power_kw * factor;
    let interval_emissions_kg = hourly_emissions_kg * (interval_secs / 3600.0);
    let hourly_savings_kg = if solar_active {
        total_power_kw * (GRID_FACTOR - SOLAR_FACTOR)
    } else {
        0.0
    };

    Snapshot {
        reading,
        auto_shutdown,
        carbon: CarbonSummary {
            total_power_kw,
            source: if solar_active { "Solar" } else { "Grid" },
            hourly_emissions_kg,
            interval_emissions_kg,
            total_emissions_kg: total_emissions_so_far + interval_emissions_kg,
            hourly_savings_kg,
        },
        taken_at,
    }
}

impl Telemetry {
    pub fn apply(&mut self, reading: SensorReading, voltage_threshold: f64) {
        self.apply_at(reading, voltage_threshold, OffsetDateTime::now_utc());
    }

    /// Emissions are charged for the wall time elapsed since the previous
    /// snapshot, so an off-cycle refresh (relay toggle, first request)
    /// between ticks does not add a full poll interval to the total.
    fn apply_at(&mut self, reading: SensorReading, voltage_threshold: f64, now: OffsetDateTime) {
        let elapsed_secs = self
            .latest
            .as_ref()
            .map(|prev| (now - prev.taken_at).as_seconds_f64().max(0.0))
            .unwrap_or(0.0);
        let snapshot = derive_snapshot(
            reading,
            voltage_threshold,
            elapsed_secs,
            self.total_emissions_kg,
            now,
        );
        self.total_emissions_kg = snapshot.carbon.total_emissions_kg;
        if self.history.len() == HISTORY_LEN {
            self.history.pop_front();
        }
        self.history.push_back(snapshot.clone());
        self.latest = Some(snapshot);
    }
}

/// Fixed-interval poll loop. Runs for the life of the process; a failed
/// fetch is logged and the previous snapshot stays current.
pub async fn run(state: AppState) {
    let poll_secs = state.config.device.poll_secs;
    let threshold = state.config.device.voltage_threshold;
    let mut ticker = tokio::time::interval(std::time::Duration::from_secs(poll_secs));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        match state.device.fetch_data().await {
            Ok(reading) => {
                let mut telemetry = state.telemetry.write().await;
                telemetry.apply(reading, threshold);
                debug!("telemetry updated");
            }
            Err(e) => {
                warn!(error = %e, "device poll failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::client::Relay;
    use time::Duration;

    fn reading(voltage1: f64, power1: f64, power2: f64, relays: Vec<Relay>) -> SensorReading {
        SensorReading {
            voltage1,
            voltage2: 0.2,
            current: 1.0,
            power1,
            power2,
            temperature: 25.0,
            humidity: 50.0,
            air_quality: 100.0,
            relays,
        }
    }

    fn relays(states: [bool; 4]) -> Vec<Relay> {
        states
            .iter()
            .enumerate()
            .map(|(i, &state)| Relay {
                id: (i + 1) as u8,
                state,
            })
            .collect()
    }

    #[test]
    fn grid_emissions_from_adjusted_power() {
        let r = reading(0.5, 800.0, 200.0, relays([true, false, false, false]));
        let snap = derive_snapshot(r, 1.0, 5.0, 0.0, OffsetDateTime::UNIX_EPOCH);
        assert!(!snap.auto_shutdown);
        assert_eq!(snap.carbon.source, "Grid");
        assert_eq!(snap.carbon.total_power_kw, 1.0);
        assert!((snap.carbon.hourly_emissions_kg - GRID_FACTOR).abs() < 1e-12);
        assert!((snap.carbon.interval_emissions_kg - GRID_FACTOR * 5.0 / 3600.0).abs() < 1e-12);
        assert_eq!(snap.carbon.hourly_savings_kg, 0.0);
    }

    #[test]
    fn solar_relay_switches_factor_and_reports_savings() {
        let r = reading(0.5, 500.0, 500.0, relays([false, false, false, true]));
        let snap = derive_snapshot(r, 1.0, 5.0, 0.0, OffsetDateTime::UNIX_EPOCH);
        assert_eq!(snap.carbon.source, "Solar");
        assert!((snap.carbon.hourly_emissions_kg - SOLAR_FACTOR).abs() < 1e-12);
        assert!((snap.carbon.hourly_savings_kg - (GRID_FACTOR - SOLAR_FACTOR)).abs() < 1e-12);
    }

    #[test]
    fn over_voltage_forces_relays_off_and_zeroes_power() {
        let r = reading(1.3, 800.0, 200.0, relays([true, true, false, true]));
        let snap = derive_snapshot(r, 1.0, 5.0, 0.0, OffsetDateTime::UNIX_EPOCH);
        assert!(snap.auto_shutdown);
        assert!(snap.reading.relays.iter().all(|relay| !relay.state));
        assert_eq!(snap.reading.current, 0.0);
        assert_eq!(snap.reading.power1, 0.0);
        assert_eq!(snap.reading.power2, 0.0);
        assert_eq!(snap.carbon.hourly_emissions_kg, 0.0);
    }

    #[test]
    fn idle_board_reports_zero_draw() {
        let r = reading(0.5, 800.0, 200.0, relays([false, false, false, false]));
        let snap = derive_snapshot(r, 1.0, 5.0, 0.0, OffsetDateTime::UNIX_EPOCH);
        assert!(!snap.auto_shutdown);
        assert_eq!(snap.reading.power1, 0.0);
        assert_eq!(snap.reading.power2, 0.0);
        assert_eq!(snap.carbon.total_power_kw, 0.0);
    }

    #[test]
    fn emissions_accumulate_per_elapsed_time() {
        let start = OffsetDateTime::UNIX_EPOCH;
        let mut telemetry = Telemetry::default();
        for tick in 0..3 {
            let r = reading(0.5, 500.0, 500.0, relays([true, false, false, false]));
            telemetry.apply_at(r, 1.0, start + Duration::seconds(5 * tick));
        }
        // The first sample has nothing to accumulate against; the two
        // following ticks each charge 5 s of grid draw.
        let expected = 2.0 * GRID_FACTOR * 5.0 / 3600.0;
        assert!((telemetry.total_emissions_kg - expected).abs() < 1e-12);
        assert_eq!(telemetry.history.len(), 3);
    }

    #[test]
    fn off_cycle_refresh_does_not_add_a_full_interval() {
        let start = OffsetDateTime::UNIX_EPOCH;
        let mut telemetry = Telemetry::default();
        let sample = || reading(0.5, 500.0, 500.0, relays([true, false, false, false]));

        telemetry.apply_at(sample(), 1.0, start);
        telemetry.apply_at(sample(), 1.0, start + Duration::seconds(5));
        // Back-to-back refreshes with no elapsed time (relay toggle, first
        // request) must leave the running total unchanged.
        telemetry.apply_at(sample(), 1.0, start + Duration::seconds(5));
        telemetry.apply_at(sample(), 1.0, start + Duration::seconds(5));

        let expected = GRID_FACTOR * 5.0 / 3600.0;
        assert!((telemetry.total_emissions_kg - expected).abs() < 1e-12);
    }

    #[test]
    fn clock_skew_never_subtracts_emissions() {
        let start = OffsetDateTime::UNIX_EPOCH;
        let mut telemetry = Telemetry::default();
        let sample = || reading(0.5, 500.0, 500.0, relays([true, false, false, false]));

        telemetry.apply_at(sample(), 1.0, start + Duration::seconds(10));
        let before = telemetry.total_emissions_kg;
        telemetry.apply_at(sample(), 1.0, start);
        assert!(telemetry.total_emissions_kg >= before);
    }

    #[test]
    fn history_is_bounded() {
        let start = OffsetDateTime::UNIX_EPOCH;
        let mut telemetry = Telemetry::default();
        for tick in 0..(HISTORY_LEN + 10) {
            let r = reading(0.5, 100.0, 0.0, relays([true, false, false, false]));
            telemetry.apply_at(r, 1.0, start + Duration::seconds(5 * tick as i64));
        }
        assert_eq!(telemetry.history.len(), HISTORY_LEN);
    }
}
