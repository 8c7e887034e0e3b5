//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use storage_dispatch::config::{ControllerKind, ScenarioConfig};
use storage_dispatch::sim::types::SimConfig;
use storage_dispatch::storage::{StorageConfig, StorageParams};

/// Lossless storage with unit rates over `[0, 1]`.
pub fn lossless_params(capacity: f64, init: f64) -> StorageParams {
    StorageParams {
        max_capacity: capacity,
        max_charge_rate: 1.0,
        max_discharge_rate: 1.0,
        min_charge_percent: 0.0,
        max_charge_percent: 1.0,
        init_charge_percent: init,
        charge_efficiency: Some(1.0),
        discharge_efficiency: Some(1.0),
        round_trip_efficiency: None,
    }
}

/// Storage of the first reference scenario (capacity 10, full, discharge rate 0.5).
pub fn scenario_one_storage() -> StorageConfig {
    StorageConfig::try_from(StorageParams {
        max_discharge_rate: 0.5,
        ..lossless_params(10.0, 1.0)
    })
    .unwrap()
}

/// Demand `[1; 10]` and inflow `[0, 1, ..., 9]`.
pub fn scenario_one_series() -> (Vec<f64>, Vec<f64>) {
    let demand = vec![1.0; 10];
    let inflow = (0..10).map(f64::from).collect();
    (demand, inflow)
}

/// Storage with 10% to 90% bounds, 90% round trip, half full.
pub fn lossy_storage(capacity: f64, rate: f64) -> StorageConfig {
    StorageConfig::try_from(StorageParams {
        max_charge_rate: rate,
        max_discharge_rate: rate,
        min_charge_percent: 0.1,
        max_charge_percent: 0.9,
        init_charge_percent: 0.5,
        charge_efficiency: None,
        discharge_efficiency: None,
        round_trip_efficiency: Some(0.9),
        ..lossless_params(capacity, 0.5)
    })
    .unwrap()
}

/// Two days of hourly periods in 24-period windows.
pub fn two_day_sim() -> SimConfig {
    SimConfig::new(48, 24, 42).unwrap()
}

/// Square-wave generation: `high` from period 6 to 17 of each day, zero otherwise.
pub fn daytime_generation(n: usize, high: f64) -> Vec<f64> {
    (0..n)
        .map(|t| if (6..18).contains(&(t % 24)) { high } else { 0.0 })
        .collect()
}

/// Baseline scenario shortened to `n` periods and switched to `controller`.
pub fn short_scenario(n: usize, controller: ControllerKind) -> ScenarioConfig {
    let mut cfg = ScenarioConfig::baseline();
    cfg.simulation.n_timesteps = n;
    cfg.simulation.controller = controller;
    cfg
}

pub fn assert_close(actual: &[f64], expected: &[f64], tol: f64) {
    assert_eq!(actual.len(), expected.len(), "length differs");
    for (t, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert!(
            (a - e).abs() <= tol,
            "period {t}: got {a}, expected {e} (tol {tol})"
        );
    }
}
