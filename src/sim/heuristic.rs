//! Window-based heuristic dispatch in normalized power fractions.
//!
//! Fractions are signed: negative charges, positive discharges, and `1.0`
//! corresponds to `max_capability` per period. Charging is only possible from
//! on-site generation, never from the grid.

use tracing::warn;

use crate::error::{Error, Result, check_len, check_range};
use crate::storage::bounds::clamp_power_fraction;
use crate::storage::{PhysicalStore, StorageConfig};

/// Forecast handed to a dispatcher for one look-ahead window.
#[derive(Debug, Clone, Copy)]
pub struct WindowInputs<'a> {
    /// Index of the first period of the window within the horizon.
    pub start: usize,
    pub generation: &'a [f64],
    pub grid_limit: &'a [f64],
    /// Desired plant output, used by load following.
    pub goal: Option<&'a [f64]>,
}

impl WindowInputs<'_> {
    pub fn len(&self) -> usize {
        self.generation.len()
    }

    pub fn is_empty(&self) -> bool {
        self.generation.is_empty()
    }
}

/// External source of per-period dispatch fractions (an optimizer, a
/// schedule from another tool, a test double).
///
/// Returned fractions must lie in `[-1, 1]` and cover the whole window; they
/// are then bounded exactly like user-supplied ones.
pub trait DispatchPolicy {
    fn solve(&mut self, window: &WindowInputs<'_>) -> Result<Vec<f64>>;
}

/// Where the target fractions come from.
pub enum FractionSource {
    /// User-supplied horizon-long series in `[-1, 1]`.
    Fixed(Vec<f64>),
    /// `(goal - generation) / max_capability`.
    LoadFollowing,
    Policy(Box<dyn DispatchPolicy>),
}

impl std::fmt::Debug for FractionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fixed(v) => f.debug_tuple("Fixed").field(&v.len()).finish(),
            Self::LoadFollowing => f.write_str("LoadFollowing"),
            Self::Policy(_) => f.write_str("Policy(..)"),
        }
    }
}

/// Decisions committed for one window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WindowDispatch {
    /// Bounded signed fractions.
    pub fractions: Vec<f64>,
    pub charge_power: Vec<f64>,
    pub discharge_power: Vec<f64>,
    /// Planned SOC at the end of each period.
    pub soc: Vec<f64>,
}

impl WindowDispatch {
    /// Signed power commands (positive discharges).
    pub fn commands(&self) -> Vec<f64> {
        self.discharge_power
            .iter()
            .zip(&self.charge_power)
            .map(|(d, c)| d - c)
            .collect()
    }
}

#[derive(Debug)]
pub struct HeuristicFractionDispatcher {
    storage: StorageConfig,
    max_capability: f64,
    source: FractionSource,
}

impl HeuristicFractionDispatcher {
    /// Creates a dispatcher rated at the store's `max_capacity` per period.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RangeViolation`] if a fixed series has values outside `[-1, 1]`.
    pub fn new(storage: StorageConfig, source: FractionSource) -> Result<Self> {
        if let FractionSource::Fixed(series) = &source {
            check_range("fixed_dispatch", series, -1.0, 1.0)?;
        }
        let max_capability = storage.max_capacity();
        Ok(Self {
            storage,
            max_capability,
            source,
        })
    }

    /// Overrides the power that a fraction of `1.0` stands for.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] unless `max_capability` is finite and `> 0`.
    pub fn with_max_capability(mut self, max_capability: f64) -> Result<Self> {
        if !max_capability.is_finite() || max_capability <= 0.0 {
            return Err(Error::configuration(
                "heuristic.rated_capability",
                "must be finite and > 0",
            ));
        }
        self.max_capability = max_capability;
        Ok(self)
    }

    /// Checks that a fixed series spans exactly `horizon` periods.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] for a fixed series of any other length.
    pub fn check_horizon(&self, horizon: usize) -> Result<()> {
        match &self.source {
            FractionSource::Fixed(series) => check_len("fixed_dispatch", series, horizon),
            FractionSource::LoadFollowing | FractionSource::Policy(_) => Ok(()),
        }
    }

    pub fn storage(&self) -> &StorageConfig {
        &self.storage
    }

    pub fn max_capability(&self) -> f64 {
        self.max_capability
    }

    /// Charging is capped by available generation.
    pub fn max_charge_fraction(&self, generation: f64) -> f64 {
        clamp_power_fraction(generation / self.max_capability)
    }

    /// Discharging is capped by the grid room left after generation.
    pub fn max_discharge_fraction(&self, generation: f64, grid_limit: f64) -> f64 {
        clamp_power_fraction((grid_limit - generation) / self.max_capability)
    }

    /// Planned SOC after applying `fraction` for one period from `soc0`.
    pub fn update_soc(&self, fraction: f64, soc0: f64) -> f64 {
        let capacity = self.storage.max_capacity();
        let power = fraction.abs() * self.max_capability;
        let soc = if fraction > 0.0 {
            soc0 - (power / self.storage.discharge_efficiency()) / capacity
        } else if fraction < 0.0 {
            soc0 + (power * self.storage.charge_efficiency()) / capacity
        } else {
            soc0
        };
        self.storage.clamp_soc(soc)
    }

    /// SOC reported by `store`, clamped into bounds with a warning if needed.
    pub fn initial_soc(&self, store: &impl PhysicalStore) -> f64 {
        let soc = store.get_state().soc;
        let clamped = self.storage.clamp_soc(soc);
        if clamped != soc {
            warn!(
                device = store.device_type(),
                soc,
                min = self.storage.min_charge_percent(),
                max = self.storage.max_charge_percent(),
                "initial SOC outside bounds; clamping"
            );
        }
        clamped
    }

    /// Target fractions for a window before any bounds are applied.
    fn targets(&mut self, window: &WindowInputs<'_>) -> Result<Vec<f64>> {
        let n = window.len();
        match &mut self.source {
            FractionSource::Fixed(series) => {
                let end = window.start + n;
                series
                    .get(window.start..end)
                    .map(<[f64]>::to_vec)
                    .ok_or_else(|| Error::dimension_mismatch("fixed_dispatch", end, series.len()))
            }
            FractionSource::LoadFollowing => {
                let goal = window.goal.ok_or_else(|| {
                    Error::configuration("heuristic.goal", "load following requires a goal profile")
                })?;
                check_len("goal", goal, n)?;
                Ok(goal
                    .iter()
                    .zip(window.generation)
                    .map(|(g, p)| (g - p) / self.max_capability)
                    .collect())
            }
            FractionSource::Policy(policy) => {
                let fractions = policy.solve(window)?;
                check_len("policy_dispatch", &fractions, n)?;
                check_range("policy_dispatch", &fractions, -1.0, 1.0)?;
                Ok(fractions)
            }
        }
    }

    /// Computes bounded fractions, powers, and planned SOC for one window.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if the window's series differ in
    /// length, or any error raised by an injected policy.
    pub fn dispatch_window(
        &mut self,
        window: &WindowInputs<'_>,
        initial_soc: f64,
    ) -> Result<WindowDispatch> {
        let n = window.len();
        check_len("grid_limit", window.grid_limit, n)?;
        let targets = self.targets(window)?;

        let mut out = WindowDispatch {
            fractions: Vec::with_capacity(n),
            charge_power: Vec::with_capacity(n),
            discharge_power: Vec::with_capacity(n),
            soc: Vec::with_capacity(n),
        };
        let mut soc = initial_soc;
        for (t, target) in targets.into_iter().enumerate() {
            let generation = window.generation[t];
            let fraction = if target > 0.0 {
                target.min(self.max_discharge_fraction(generation, window.grid_limit[t]))
            } else if target < 0.0 {
                -(-target).min(self.max_charge_fraction(generation))
            } else {
                0.0
            };

            let power = fraction.abs() * self.max_capability;
            let (charge, discharge) = if fraction > 0.0 {
                (0.0, power)
            } else if fraction < 0.0 {
                (power, 0.0)
            } else {
                (0.0, 0.0)
            };

            soc = self.update_soc(fraction, soc);
            out.fractions.push(fraction);
            out.charge_power.push(charge);
            out.discharge_power.push(discharge);
            out.soc.push(soc);
        }
        Ok(out)
    }
}
