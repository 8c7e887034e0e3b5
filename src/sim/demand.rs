//! Greedy per-period demand following with a storage buffer.
//!
//! A single linear scan: SOC is the only state carried from one period to the
//! next. Deficits discharge, surpluses charge, and whatever storage cannot
//! absorb or supply shows up as curtailment or unmet demand.

use tracing::info;

use super::trajectory::TrajectoryBuilder;
use super::types::{DispatchRecord, SimulationResult};
use crate::error::{Result, check_len};
use crate::storage::StorageConfig;
use crate::storage::bounds::{available_charge_headroom, available_discharge_headroom};

/// Open-loop controller balancing an inflow against a demand profile.
///
/// # Examples
///
/// ```
/// use storage_dispatch::sim::demand::DemandFollowingDispatcher;
/// use storage_dispatch::storage::{StorageConfig, StorageParams};
///
/// let cfg = StorageConfig::try_from(StorageParams {
///     max_capacity: 10.0,
///     max_charge_rate: 1.0,
///     max_discharge_rate: 0.5,
///     min_charge_percent: 0.0,
///     max_charge_percent: 1.0,
///     init_charge_percent: 1.0,
///     charge_efficiency: Some(1.0),
///     discharge_efficiency: Some(1.0),
///     round_trip_efficiency: None,
/// })
/// .unwrap();
/// let result = DemandFollowingDispatcher::new(cfg)
///     .run(&[1.0, 1.0], &[0.0, 1.0])
///     .unwrap();
/// assert_eq!(result.output(), vec![0.5, 1.0]);
/// ```
#[derive(Debug, Clone)]
pub struct DemandFollowingDispatcher {
    config: StorageConfig,
}

impl DemandFollowingDispatcher {
    pub fn new(config: StorageConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Computes one period from the SOC carried in from the previous period.
    ///
    /// `charge` and `discharge` in the returned record are outside-view
    /// quantities (what left the inflow, what reached the demand).
    pub fn step(&self, soc: f64, demand: f64, inflow: f64) -> DispatchRecord {
        let cfg = &self.config;
        let capacity = cfg.max_capacity();
        let eta_c = cfg.charge_efficiency();
        let eta_d = cfg.discharge_efficiency();

        let available_charge =
            available_charge_headroom(soc, cfg.max_charge_percent(), capacity);
        let available_discharge =
            available_discharge_headroom(soc, cfg.min_charge_percent(), capacity);

        let mut soc = soc;
        let mut record = DispatchRecord::default();

        if demand > inflow {
            // Device-side: losses inflate what has to leave the store.
            let needed = (demand - inflow) / eta_d;
            let discharged = needed
                .min(available_discharge)
                .min(cfg.max_discharge_rate() / eta_d);
            soc -= discharged / capacity;
            record.discharge = discharged * eta_d;
            record.output = inflow + record.discharge;
        } else {
            let surplus = inflow - demand;
            let stored = surplus
                .min(available_charge / eta_c)
                .min(cfg.max_charge_rate())
                * eta_c;
            soc += stored / capacity;
            record.charge = stored / eta_c;
            record.output = demand;
            record.unused_commodity = (surplus - record.charge).max(0.0);
        }

        record.soc = cfg.clamp_soc(soc);
        record.unmet_demand = (demand - record.output).max(0.0);
        record
    }

    /// Builds the trajectory for a full horizon without finishing it.
    pub(crate) fn trajectory(&self, demand: &[f64], inflow: &[f64]) -> Result<TrajectoryBuilder> {
        check_len("inflow", inflow, demand.len())?;

        let rated = demand.iter().copied().fold(0.0, f64::max);
        let mut builder = TrajectoryBuilder::new(demand.len(), rated);
        let mut soc = self.config.init_charge_percent();
        for (&d, &i) in demand.iter().zip(inflow) {
            let record = self.step(soc, d, i);
            soc = record.soc;
            builder.push(record);
        }
        Ok(builder)
    }

    /// Runs the scan over the whole horizon starting from `init_charge_percent`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`](crate::error::Error::DimensionMismatch)
    /// if `demand` and `inflow` differ in length. Nothing fails mid-scan.
    pub fn run(&self, demand: &[f64], inflow: &[f64]) -> Result<SimulationResult> {
        let result = self.trajectory(demand, inflow)?.finish();
        info!(
            periods = result.len(),
            total_output = result.total_output(),
            total_unmet = result.total_unmet_demand(),
            "demand-following dispatch complete"
        );
        Ok(result)
    }
}

/// Trajectory of a plant with no storage and no control: output equals inflow.
pub fn pass_through(inflow: &[f64]) -> SimulationResult {
    let rated = inflow.iter().copied().fold(0.0, f64::max);
    let mut builder = TrajectoryBuilder::new(inflow.len(), rated);
    for &i in inflow {
        builder.push(DispatchRecord {
            output: i,
            ..DispatchRecord::default()
        });
    }
    builder.finish()
}
