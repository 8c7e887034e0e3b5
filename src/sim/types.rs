//! Core simulation types: horizon configuration, profiles, and per-period records.

use std::fmt;

use serde::Deserialize;

use crate::error::{Error, Result, check_len};
use crate::forecast::NaiveForecast;

/// Horizon and windowing parameters shared by every dispatcher.
///
/// # Examples
///
/// ```
/// use storage_dispatch::sim::types::SimConfig;
///
/// let cfg = SimConfig::new(8760, 24, 42).unwrap();
/// assert_eq!(cfg.n_windows(), 365);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    /// Number of periods in the horizon (typically 8760 hourly steps).
    pub n_timesteps: usize,
    /// Number of periods per look-ahead window.
    pub control_window: usize,
    /// Master random seed for synthetic profiles.
    pub seed: u64,
}

impl SimConfig {
    /// Creates a new simulation configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if `n_timesteps` or `control_window` is zero.
    pub fn new(n_timesteps: usize, control_window: usize, seed: u64) -> Result<Self> {
        if n_timesteps == 0 {
            return Err(Error::configuration("simulation.n_timesteps", "must be > 0"));
        }
        if control_window == 0 {
            return Err(Error::configuration("simulation.control_window", "must be > 0"));
        }
        Ok(Self {
            n_timesteps,
            control_window,
            seed,
        })
    }

    /// Number of windows covering the horizon; the last may be partial.
    pub fn n_windows(&self) -> usize {
        self.n_timesteps.div_ceil(self.control_window)
    }

    /// Start index and length of every window, in time order.
    pub fn windows(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..self.n_timesteps)
            .step_by(self.control_window)
            .map(|start| (start, self.control_window.min(self.n_timesteps - start)))
    }
}

/// A scalar or a per-period series, as written in a scenario file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Profile {
    /// Same value every period.
    Constant(f64),
    /// One value per period.
    Series(Vec<f64>),
}

impl Default for Profile {
    fn default() -> Self {
        Self::Constant(0.0)
    }
}

impl Profile {
    /// Expands to exactly `horizon` values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if a series has a different length.
    pub fn broadcast(&self, name: &str, horizon: usize) -> Result<Vec<f64>> {
        match self {
            Self::Constant(v) => Ok(vec![*v; horizon]),
            Self::Series(values) => {
                check_len(name, values, horizon)?;
                Ok(values.clone())
            }
        }
    }

    /// Repeats or truncates the profile to `horizon` values.
    pub fn tile(&self, horizon: usize) -> Vec<f64> {
        match self {
            Self::Constant(v) => vec![*v; horizon],
            Self::Series(values) => NaiveForecast.forecast(values, horizon),
        }
    }
}

/// Outcome of one period, created once and never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DispatchRecord {
    /// SOC after this period (fraction of capacity).
    pub soc: f64,
    /// Commodity charged this period (`>= 0`).
    pub charge: f64,
    /// Commodity discharged this period (`>= 0`).
    pub discharge: f64,
    /// Commodity delivered to demand, outside view.
    pub output: f64,
    /// Demand left unserved.
    pub unmet_demand: f64,
    /// Inflow neither delivered nor stored.
    pub unused_commodity: f64,
}

impl fmt::Display for DispatchRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "out={:>8.3} | chg={:.3} dis={:.3} (SoC={:.1}%) | unmet={:.3} unused={:.3}",
            self.output,
            self.charge,
            self.discharge,
            self.soc * 100.0,
            self.unmet_demand,
            self.unused_commodity,
        )
    }
}

/// Finished trajectory plus scalar summaries, immutable after construction.
///
/// Built by [`TrajectoryBuilder`](super::trajectory::TrajectoryBuilder).
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationResult {
    pub(super) records: Vec<DispatchRecord>,
    pub(super) flexible_demand: Option<Vec<f64>>,
    pub(super) min_utilization_satisfied: bool,
    pub(super) total_output: f64,
    pub(super) total_unmet_demand: f64,
    pub(super) total_unused_commodity: f64,
    pub(super) total_throughput: f64,
    pub(super) capacity_factor: f64,
}

impl SimulationResult {
    pub fn records(&self) -> &[DispatchRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// SOC series (`{commodity}_soc`).
    pub fn soc(&self) -> Vec<f64> {
        self.column(|r| r.soc)
    }

    /// Delivered series (`{commodity}_out`).
    pub fn output(&self) -> Vec<f64> {
        self.column(|r| r.output)
    }

    /// Unserved demand series (`{commodity}_unmet_demand`).
    pub fn unmet_demand(&self) -> Vec<f64> {
        self.column(|r| r.unmet_demand)
    }

    /// Curtailment series (`{commodity}_unused_commodity`).
    pub fn unused_commodity(&self) -> Vec<f64> {
        self.column(|r| r.unused_commodity)
    }

    pub fn charge(&self) -> Vec<f64> {
        self.column(|r| r.charge)
    }

    pub fn discharge(&self) -> Vec<f64> {
        self.column(|r| r.discharge)
    }

    /// Reshaped demand, present only for flexible-demand runs.
    pub fn flexible_demand(&self) -> Option<&[f64]> {
        self.flexible_demand.as_deref()
    }

    /// `false` when minimum-utilization repair ran out of thresholds.
    pub fn min_utilization_satisfied(&self) -> bool {
        self.min_utilization_satisfied
    }

    /// Total delivered commodity (`total_{commodity}_produced`).
    pub fn total_output(&self) -> f64 {
        self.total_output
    }

    pub fn total_unmet_demand(&self) -> f64 {
        self.total_unmet_demand
    }

    pub fn total_unused_commodity(&self) -> f64 {
        self.total_unused_commodity
    }

    /// Sum of charge and discharge over the horizon.
    pub fn total_throughput(&self) -> f64 {
        self.total_throughput
    }

    /// Delivered commodity as a fraction of rated output over the horizon.
    pub fn capacity_factor(&self) -> f64 {
        self.capacity_factor
    }

    fn column(&self, f: impl Fn(&DispatchRecord) -> f64) -> Vec<f64> {
        self.records.iter().map(f).collect()
    }
}
