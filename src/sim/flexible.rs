//! Flexible load shaping under turndown, ramp-rate, and minimum-utilization limits.

use tracing::{debug, warn};

use super::demand::DemandFollowingDispatcher;
use super::trajectory::TrajectoryBuilder;
use super::types::{DispatchRecord, Profile, SimulationResult};
use crate::error::{Result, check_len};
use crate::storage::StorageConfig;
use crate::storage::params::unit_interval;

/// Threshold increment used by minimum-utilization repair, as a fraction of rated demand.
const THRESHOLD_STEP: f64 = 0.05;
/// Exclusive upper end of the repair threshold sweep.
const THRESHOLD_STOP: f64 = 1.05;

/// Validated shaping parameters for one flexible load.
#[derive(Debug, Clone, PartialEq)]
pub struct FlexibleDemandConfig {
    maximum_demand: Profile,
    turndown_ratio: f64,
    ramp_down_rate_fraction: f64,
    ramp_up_rate_fraction: f64,
    min_utilization: f64,
}

impl FlexibleDemandConfig {
    /// # Errors
    ///
    /// Returns [`Error::Configuration`](crate::error::Error::Configuration) if any
    /// fraction lies outside `[0, 1]`.
    pub fn new(
        maximum_demand: Profile,
        turndown_ratio: f64,
        ramp_down_rate_fraction: f64,
        ramp_up_rate_fraction: f64,
        min_utilization: f64,
    ) -> Result<Self> {
        unit_interval("flexible_demand.turndown_ratio", turndown_ratio)?;
        unit_interval("flexible_demand.ramp_down_rate_fraction", ramp_down_rate_fraction)?;
        unit_interval("flexible_demand.ramp_up_rate_fraction", ramp_up_rate_fraction)?;
        unit_interval("flexible_demand.min_utilization", min_utilization)?;
        Ok(Self {
            maximum_demand,
            turndown_ratio,
            ramp_down_rate_fraction,
            ramp_up_rate_fraction,
            min_utilization,
        })
    }

    pub fn maximum_demand(&self) -> &Profile {
        &self.maximum_demand
    }

    pub fn turndown_ratio(&self) -> f64 {
        self.turndown_ratio
    }

    pub fn ramp_down_rate_fraction(&self) -> f64 {
        self.ramp_down_rate_fraction
    }

    pub fn ramp_up_rate_fraction(&self) -> f64 {
        self.ramp_up_rate_fraction
    }

    pub fn min_utilization(&self) -> f64 {
        self.min_utilization
    }
}

/// Reshaped demand and whether the annual minimum-utilization target was met.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapedDemand {
    pub profile: Vec<f64>,
    pub satisfied: bool,
}

/// Turns an as-met profile into a feasible flexible profile.
///
/// All limits are resolved to commodity units once, from the peak of the
/// maximum-demand profile.
#[derive(Debug, Clone)]
pub struct FlexibleLoadShaper {
    horizon: usize,
    turndown_ratio: f64,
    rated_demand: f64,
    min_demand: f64,
    ramp_down_rate: f64,
    ramp_up_rate: f64,
    min_total_demand: f64,
}

impl FlexibleLoadShaper {
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`](crate::error::Error::DimensionMismatch)
    /// if a maximum-demand series does not span `horizon` periods.
    pub fn new(config: &FlexibleDemandConfig, horizon: usize) -> Result<Self> {
        let maximum = config.maximum_demand.broadcast("maximum_demand", horizon)?;
        let rated_demand = maximum.iter().copied().fold(0.0, f64::max);
        Ok(Self {
            horizon,
            turndown_ratio: config.turndown_ratio,
            rated_demand,
            min_demand: rated_demand * config.turndown_ratio,
            ramp_down_rate: rated_demand * config.ramp_down_rate_fraction,
            ramp_up_rate: rated_demand * config.ramp_up_rate_fraction,
            min_total_demand: rated_demand * horizon as f64 * config.min_utilization,
        })
    }

    pub fn rated_demand(&self) -> f64 {
        self.rated_demand
    }

    pub fn min_demand(&self) -> f64 {
        self.min_demand
    }

    /// Total demand the shaped profile must reach over the horizon.
    pub fn min_total_demand(&self) -> f64 {
        self.min_total_demand
    }

    /// Clamps every value into `[min_demand, rated_demand]`.
    pub fn clip_turndown(&self, pre_met: &[f64]) -> Vec<f64> {
        pre_met.iter().map(|&v| self.bound(v)).collect()
    }

    /// Left-to-right ramp-rate recurrence over an already clipped series.
    pub fn apply_ramp_limits(&self, clipped: &[f64]) -> Vec<f64> {
        let mut out = Vec::with_capacity(clipped.len());
        let Some((&first, rest)) = clipped.split_first() else {
            return out;
        };
        out.push(first);
        let mut prev = first;
        for &target in rest {
            let delta = target - prev;
            let next = if delta < -self.ramp_down_rate {
                self.bound(prev - self.ramp_down_rate)
            } else if delta > self.ramp_up_rate {
                self.bound(prev + self.ramp_up_rate)
            } else {
                target
            };
            out.push(next);
            prev = next;
        }
        out
    }

    /// Spreads the remaining shortfall evenly over periods at or below
    /// `threshold`, then re-clips.
    ///
    /// Returns `false` and leaves `profile` untouched when no period qualifies.
    pub fn spread_shortfall(&self, profile: &mut [f64], threshold: f64) -> bool {
        let shortfall = self.min_total_demand - profile.iter().sum::<f64>();
        let eligible = profile.iter().filter(|&&v| v <= threshold).count();
        if eligible == 0 {
            return false;
        }
        let extra = shortfall / eligible as f64;
        for v in profile.iter_mut() {
            if *v <= threshold {
                *v += extra;
            }
            *v = self.bound(*v);
        }
        true
    }

    /// Thresholds from `turndown_ratio` toward `1.05 * rated_demand`, in 5% steps.
    fn thresholds(&self) -> impl Iterator<Item = f64> + '_ {
        let steps = ((THRESHOLD_STOP - self.turndown_ratio) / THRESHOLD_STEP)
            .ceil()
            .max(0.0) as usize;
        (0..steps).map(move |k| {
            (self.turndown_ratio + k as f64 * THRESHOLD_STEP) * self.rated_demand
        })
    }

    /// Full shaping pass: turndown clip, ramp limits, then minimum-utilization repair.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`](crate::error::Error::DimensionMismatch)
    /// if `pre_met` does not span the horizon.
    pub fn shape(&self, pre_met: &[f64]) -> Result<ShapedDemand> {
        check_len("pre_met", pre_met, self.horizon)?;

        let clipped = self.clip_turndown(pre_met);
        let mut profile = self.apply_ramp_limits(&clipped);
        if self.meets_minimum(&profile) {
            return Ok(ShapedDemand {
                profile,
                satisfied: true,
            });
        }

        for threshold in self.thresholds() {
            // Each attempt restarts from the clipped as-met profile.
            let mut candidate = clipped.clone();
            if !self.spread_shortfall(&mut candidate, threshold) {
                continue;
            }
            profile = self.apply_ramp_limits(&candidate);
            debug!(
                threshold,
                total = profile.iter().sum::<f64>(),
                target = self.min_total_demand,
                "minimum-utilization repair attempt"
            );
            if self.meets_minimum(&profile) {
                return Ok(ShapedDemand {
                    profile,
                    satisfied: true,
                });
            }
        }

        warn!(
            total = profile.iter().sum::<f64>(),
            target = self.min_total_demand,
            "minimum utilization not reached; keeping best-effort profile"
        );
        Ok(ShapedDemand {
            profile,
            satisfied: false,
        })
    }

    fn meets_minimum(&self, profile: &[f64]) -> bool {
        profile.iter().sum::<f64>() >= self.min_total_demand
    }

    fn bound(&self, v: f64) -> f64 {
        v.max(self.min_demand).min(self.rated_demand)
    }
}

/// Flexible-demand converter: reshapes demand, then settles the inflow
/// against it, optionally through a storage buffer.
#[derive(Debug, Clone)]
pub struct FlexibleDemandController {
    config: FlexibleDemandConfig,
    storage: Option<StorageConfig>,
}

impl FlexibleDemandController {
    pub fn new(config: FlexibleDemandConfig) -> Self {
        Self {
            config,
            storage: None,
        }
    }

    /// Routes the flexible profile through a demand-following storage buffer.
    pub fn with_storage(mut self, storage: StorageConfig) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Runs the controller over one horizon.
    ///
    /// With `min_utilization == 1` the load is inflexible and the inflow is
    /// settled against `demand` as is. Otherwise the as-met load
    /// (`inflow - curtailed`) is shaped first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`](crate::error::Error::DimensionMismatch)
    /// on length mismatches between `demand`, `inflow`, and the maximum-demand profile.
    pub fn run(&self, demand: &[f64], inflow: &[f64]) -> Result<SimulationResult> {
        check_len("inflow", inflow, demand.len())?;

        if self.config.min_utilization >= 1.0 {
            return self.settle(demand, demand, inflow).map(TrajectoryBuilder::finish);
        }

        let shaper = FlexibleLoadShaper::new(&self.config, demand.len())?;
        let pre_met: Vec<f64> = demand.iter().zip(inflow).map(|(&d, &i)| i.min(d)).collect();
        let shaped = shaper.shape(&pre_met)?;
        let builder = self.settle(demand, &shaped.profile, inflow)?;
        Ok(builder.flexible_demand(shaped.profile, shaped.satisfied).finish())
    }

    fn settle(&self, demand: &[f64], target: &[f64], inflow: &[f64]) -> Result<TrajectoryBuilder> {
        if let Some(storage) = &self.storage {
            let mut builder = DemandFollowingDispatcher::new(storage.clone()).trajectory(target, inflow)?;
            builder.set_rated_output(peak(demand));
            return Ok(builder);
        }

        let mut builder = TrajectoryBuilder::new(target.len(), peak(demand));
        for (&t, &i) in target.iter().zip(inflow) {
            let remaining = t - i;
            let unused_commodity = (-remaining).max(0.0);
            builder.push(DispatchRecord {
                output: i - unused_commodity,
                unmet_demand: remaining.max(0.0),
                unused_commodity,
                ..DispatchRecord::default()
            });
        }
        Ok(builder)
    }
}

fn peak(series: &[f64]) -> f64 {
    series.iter().copied().fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::params::tests::params;

    fn config(turndown: f64, ramp: f64, min_util: f64) -> FlexibleDemandConfig {
        FlexibleDemandConfig::new(Profile::Constant(10.0), turndown, ramp, ramp, min_util).unwrap()
    }

    #[test]
    fn out_of_range_fraction_rejected() {
        assert!(FlexibleDemandConfig::new(Profile::Constant(1.0), 1.2, 0.1, 0.1, 0.5).is_err());
        assert!(FlexibleDemandConfig::new(Profile::Constant(1.0), 0.1, -0.1, 0.1, 0.5).is_err());
    }

    #[test]
    fn turndown_clip_bounds_profile() {
        let shaper = FlexibleLoadShaper::new(&config(0.2, 1.0, 0.0), 4).unwrap();
        assert_eq!(shaper.clip_turndown(&[0.0, 5.0, 12.0, 2.0]), vec![2.0, 5.0, 10.0, 2.0]);
    }

    #[test]
    fn ramp_limits_both_directions() {
        let shaper = FlexibleLoadShaper::new(&config(0.0, 0.1, 0.0), 5).unwrap();
        let out = shaper.apply_ramp_limits(&[0.0, 5.0, 5.0, 0.0, 0.5]);
        assert_eq!(out, vec![0.0, 1.0, 2.0, 1.0, 0.5]);
    }

    #[test]
    fn shape_without_repair_when_target_met() {
        let shaper = FlexibleLoadShaper::new(&config(0.0, 1.0, 0.5), 2).unwrap();
        let shaped = shaper.shape(&[10.0, 10.0]).unwrap();
        assert!(shaped.satisfied);
        assert_eq!(shaped.profile, vec![10.0, 10.0]);
    }

    #[test]
    fn repair_lifts_low_periods() {
        let shaper = FlexibleLoadShaper::new(&config(0.1, 1.0, 0.5), 4).unwrap();
        let shaped = shaper.shape(&[10.0, 1.0, 1.0, 2.0]).unwrap();
        assert!(shaped.satisfied);
        assert_eq!(shaped.profile, vec![10.0, 4.0, 4.0, 2.0]);
    }

    #[test]
    fn unreachable_target_reports_unsatisfied() {
        // The slow ramp drags the second period down to the first.
        let shaper = FlexibleLoadShaper::new(&config(0.0, 0.01, 0.9), 2).unwrap();
        let shaped = shaper.shape(&[0.0, 10.0]).unwrap();
        assert!(!shaped.satisfied);
        assert!(shaped.profile.iter().sum::<f64>() < shaper.min_total_demand());
    }

    #[test]
    fn shape_checks_length() {
        let shaper = FlexibleLoadShaper::new(&config(0.0, 1.0, 0.5), 3).unwrap();
        assert!(shaper.shape(&[1.0]).is_err());
    }

    #[test]
    fn spread_skips_when_nothing_eligible() {
        let shaper = FlexibleLoadShaper::new(&config(0.5, 1.0, 1.0), 2).unwrap();
        let mut profile = vec![10.0, 10.0];
        assert!(!shaper.spread_shortfall(&mut profile, 5.0));
        assert_eq!(profile, vec![10.0, 10.0]);
    }

    #[test]
    fn inflexible_load_settles_directly() {
        let ctl = FlexibleDemandController::new(config(0.0, 1.0, 1.0));
        let result = ctl.run(&[2.0, 2.0], &[3.0, 1.0]).unwrap();
        assert_eq!(result.output(), vec![2.0, 1.0]);
        assert_eq!(result.unmet_demand(), vec![0.0, 1.0]);
        assert_eq!(result.unused_commodity(), vec![1.0, 0.0]);
        assert!(result.flexible_demand().is_none());
    }

    #[test]
    fn flexible_load_absorbs_surplus() {
        let cfg = FlexibleDemandConfig::new(Profile::Constant(4.0), 0.25, 1.0, 1.0, 0.5).unwrap();
        let ctl = FlexibleDemandController::new(cfg);
        let result = ctl.run(&[4.0; 4], &[4.0, 0.0, 0.0, 4.0]).unwrap();
        let profile = result.flexible_demand().unwrap().to_vec();
        assert_eq!(profile.len(), 4);
        assert!(result.min_utilization_satisfied());
        for (t, r) in result.records().iter().enumerate() {
            assert!(r.output <= profile[t] + 1e-9);
        }
    }

    #[test]
    fn storage_buffers_flexible_profile() {
        let storage = StorageConfig::try_from(params(10.0, 0.5)).unwrap();
        let ctl = FlexibleDemandController::new(config(0.95, 1.0, 0.0)).with_storage(storage);
        let result = ctl.run(&[10.0, 10.0], &[10.0, 9.0]).unwrap();
        assert_eq!(result.flexible_demand(), Some(&[10.0, 9.5][..]));
        assert_eq!(result.output(), vec![10.0, 9.5]);
        assert!(result.soc()[1] < 0.5);
    }
}
