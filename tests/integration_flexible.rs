//! Integration tests for flexible load shaping and the flexible-demand controller.

mod common;

use storage_dispatch::config::{ControllerKind, ScenarioConfig};
use storage_dispatch::runner::run_scenario;
use storage_dispatch::sim::flexible::{
    FlexibleDemandConfig, FlexibleDemandController, FlexibleLoadShaper,
};
use storage_dispatch::sim::types::Profile;

fn shaping(min_utilization: f64) -> FlexibleDemandConfig {
    FlexibleDemandConfig::new(Profile::Constant(10.0), 0.2, 0.3, 0.3, min_utilization).unwrap()
}

#[test]
fn shaped_profile_respects_turndown_ramps_and_minimum() {
    let cfg = shaping(0.7);
    let shaper = FlexibleLoadShaper::new(&cfg, 24).unwrap();
    let pre_met: Vec<f64> = common::daytime_generation(24, 15.0)
        .into_iter()
        .map(|g| g.min(10.0))
        .collect();

    let shaped = shaper.shape(&pre_met).unwrap();

    assert!(shaped.satisfied);
    assert!(shaped.profile.iter().sum::<f64>() >= shaper.min_total_demand() - 1e-9);
    for &v in &shaped.profile {
        assert!(v >= shaper.min_demand() - 1e-12 && v <= shaper.rated_demand() + 1e-12);
    }
    for w in shaped.profile.windows(2) {
        assert!((w[1] - w[0]).abs() <= 0.3 * 10.0 + 1e-9, "ramp violated: {w:?}");
    }
}

#[test]
fn inflexible_load_settles_against_raw_demand() {
    let demand = vec![10.0; 24];
    let inflow = common::daytime_generation(24, 15.0);
    let result = FlexibleDemandController::new(shaping(1.0))
        .run(&demand, &inflow)
        .unwrap();

    assert!(result.flexible_demand().is_none());
    assert!(result.min_utilization_satisfied());
    let expected: Vec<f64> = inflow.iter().map(|&i| i.min(10.0)).collect();
    common::assert_close(&result.output(), &expected, 1e-12);
    assert!((result.total_unused_commodity() - 12.0 * 5.0).abs() < 1e-9);
}

#[test]
fn storage_buffer_never_increases_unmet_demand() {
    let demand = vec![10.0; 48];
    let inflow = common::daytime_generation(48, 15.0);

    let bare = FlexibleDemandController::new(shaping(0.5))
        .run(&demand, &inflow)
        .unwrap();
    let buffered = FlexibleDemandController::new(shaping(0.5))
        .with_storage(common::lossy_storage(40.0, 5.0))
        .run(&demand, &inflow)
        .unwrap();

    assert_eq!(bare.flexible_demand(), buffered.flexible_demand());
    assert!(buffered.total_unmet_demand() <= bare.total_unmet_demand() + 1e-9);
    assert!(buffered.total_throughput() > 0.0);
}

#[test]
fn flexible_preset_reports_its_profile() {
    let mut cfg = ScenarioConfig::flexible_demand();
    cfg.simulation.n_timesteps = 72;
    let out = run_scenario(&cfg).unwrap();

    assert_eq!(out.controller, ControllerKind::FlexibleDemand);
    assert_eq!(out.commodity, "hydrogen");
    let profile = out.result.flexible_demand().unwrap();
    assert_eq!(profile.len(), 72);
    assert!(profile.iter().all(|&v| (2.4 - 1e-9..=12.0 + 1e-9).contains(&v)));
}
