//! TOML-based scenario configuration and preset definitions.

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;
use toml::Table;

use crate::error::{Error, Result, check_range};
use crate::profiles::SolarProfile;
use crate::sim::flexible::FlexibleDemandConfig;
use crate::sim::types::{Profile, SimConfig};
use crate::storage::{StorageConfig, StorageConfigBuilder};

/// Top-level scenario configuration parsed from TOML.
///
/// Every section has defaults matching the baseline scenario. Load from
/// TOML with [`ScenarioConfig::from_toml_file`] or use
/// [`ScenarioConfig::baseline`] for the built-in default.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Storage parameters, split into shared and controller-specific sets.
    #[serde(default)]
    pub storage: StorageSection,
    #[serde(default)]
    pub demand: DemandConfig,
    /// Inflow to the plant (explicit profile or synthetic solar).
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub flexible_demand: FlexibleDemandSection,
    /// Inputs of the window-based heuristic dispatchers.
    #[serde(default)]
    pub heuristic: HeuristicConfig,
}

/// Which dispatcher drives the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerKind {
    /// Greedy per-period storage dispatch against demand.
    DemandFollowing,
    /// No storage, output equals inflow.
    PassThrough,
    /// Reshaped flexible load, optionally buffered by storage.
    FlexibleDemand,
    /// Windowed dispatch of a user-supplied fraction schedule.
    SimpleHeuristic,
    /// Windowed dispatch toward a goal output.
    LoadFollowingHeuristic,
}

impl ControllerKind {
    pub const ALL: &'static [ControllerKind] = &[
        Self::DemandFollowing,
        Self::PassThrough,
        Self::FlexibleDemand,
        Self::SimpleHeuristic,
        Self::LoadFollowingHeuristic,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::DemandFollowing => "demand_following",
            Self::PassThrough => "pass_through",
            Self::FlexibleDemand => "flexible_demand",
            Self::SimpleHeuristic => "simple_heuristic",
            Self::LoadFollowingHeuristic => "load_following_heuristic",
        }
    }
}

impl fmt::Display for ControllerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ControllerKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = Self::ALL.iter().map(|k| k.as_str()).collect();
                Error::configuration(
                    "simulation.controller",
                    format!("unknown controller \"{s}\", available: {}", names.join(", ")),
                )
            })
    }
}

/// Horizon, windowing, and naming.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Number of periods (must be > 0).
    pub n_timesteps: usize,
    /// Periods per heuristic look-ahead window (must be > 0).
    pub control_window: usize,
    /// Master random seed.
    pub seed: u64,
    pub controller: ControllerKind,
    /// Commodity name used in output column names.
    pub commodity: String,
    pub commodity_units: String,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            n_timesteps: 8760,
            control_window: 24,
            seed: 42,
            controller: ControllerKind::DemandFollowing,
            commodity: "electricity".to_string(),
            commodity_units: "kW".to_string(),
        }
    }
}

/// Storage parameter sets, merged by [`StorageConfigBuilder`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageSection {
    /// Parameters shared with the physical model.
    pub shared_parameters: Table,
    /// Parameters used only by the controller.
    pub control_parameters: Table,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            shared_parameters: table(&[
                ("max_capacity", 40.0),
                ("min_charge_percent", 0.1),
                ("max_charge_percent", 0.9),
                ("init_charge_percent", 0.5),
            ]),
            control_parameters: table(&[
                ("max_charge_rate", 10.0),
                ("max_discharge_rate", 10.0),
                ("round_trip_efficiency", 0.9),
            ]),
        }
    }
}

fn table(entries: &[(&str, f64)]) -> Table {
    entries
        .iter()
        .map(|(k, v)| ((*k).to_string(), toml::Value::Float(*v)))
        .collect()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DemandConfig {
    /// Scalar or per-period demand.
    pub profile: Profile,
}

impl Default for DemandConfig {
    fn default() -> Self {
        Self {
            profile: Profile::Constant(10.0),
        }
    }
}

/// Inflow parameters. An explicit `profile` wins over the synthetic solar model.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GenerationConfig {
    pub profile: Option<Profile>,
    /// Synthetic solar peak.
    pub peak: f64,
    pub steps_per_day: usize,
    /// Sunrise period index (inclusive).
    pub sunrise_idx: usize,
    /// Sunset period index (exclusive).
    pub sunset_idx: usize,
    /// Relative noise standard deviation.
    pub noise_std: f64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            profile: None,
            peak: 30.0,
            steps_per_day: 24,
            sunrise_idx: 6,
            sunset_idx: 18,
            noise_std: 0.05,
        }
    }
}

impl GenerationConfig {
    /// Inflow series for `horizon` periods.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if an explicit series has the wrong length.
    pub fn series(&self, horizon: usize, seed: u64) -> Result<Vec<f64>> {
        match &self.profile {
            Some(p) => p.broadcast("generation.profile", horizon),
            None => Ok(SolarProfile {
                peak: self.peak,
                steps_per_day: self.steps_per_day,
                sunrise_idx: self.sunrise_idx,
                sunset_idx: self.sunset_idx,
                noise_std: self.noise_std,
            }
            .generate(horizon, seed)),
        }
    }
}

/// Flexible-load shaping fractions.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FlexibleDemandSection {
    pub turndown_ratio: f64,
    pub ramp_down_rate_fraction: f64,
    pub ramp_up_rate_fraction: f64,
    /// `1.0` disables shaping.
    pub min_utilization: f64,
    /// Buffer the flexible load with the configured storage.
    pub use_storage: bool,
}

impl Default for FlexibleDemandSection {
    fn default() -> Self {
        Self {
            turndown_ratio: 0.1,
            ramp_down_rate_fraction: 0.5,
            ramp_up_rate_fraction: 0.5,
            min_utilization: 1.0,
            use_storage: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HeuristicConfig {
    /// Interconnect export limit per period.
    pub grid_limit: Profile,
    /// Normalized schedule in `[-1, 1]`; a short series is a daily pattern and repeats.
    pub fixed_dispatch: Profile,
    /// Desired plant output for load following; defaults to the demand profile.
    pub goal: Option<Profile>,
    /// Power represented by a fraction of `1.0`; defaults to storage capacity.
    pub rated_capability: Option<f64>,
}

impl Default for HeuristicConfig {
    fn default() -> Self {
        Self {
            grid_limit: Profile::Constant(50.0),
            fixed_dispatch: Profile::Constant(0.0),
            goal: None,
            rated_capability: None,
        }
    }
}

impl ScenarioConfig {
    /// Returns the baseline scenario: demand following over one year of synthetic solar.
    pub fn baseline() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            storage: StorageSection::default(),
            demand: DemandConfig::default(),
            generation: GenerationConfig::default(),
            flexible_demand: FlexibleDemandSection::default(),
            heuristic: HeuristicConfig::default(),
        }
    }

    /// Returns the flexible-demand preset: a shapeable load with 60% minimum
    /// utilization, buffered by storage.
    pub fn flexible_demand() -> Self {
        Self {
            simulation: SimulationConfig {
                controller: ControllerKind::FlexibleDemand,
                commodity: "hydrogen".to_string(),
                commodity_units: "kg/h".to_string(),
                ..SimulationConfig::default()
            },
            demand: DemandConfig {
                profile: Profile::Constant(12.0),
            },
            flexible_demand: FlexibleDemandSection {
                turndown_ratio: 0.2,
                ramp_down_rate_fraction: 0.25,
                ramp_up_rate_fraction: 0.25,
                min_utilization: 0.6,
                use_storage: true,
            },
            ..Self::baseline()
        }
    }

    /// Returns the load-following preset: windowed heuristic dispatch toward demand.
    pub fn load_following() -> Self {
        Self {
            simulation: SimulationConfig {
                controller: ControllerKind::LoadFollowingHeuristic,
                ..SimulationConfig::default()
            },
            heuristic: HeuristicConfig {
                grid_limit: Profile::Constant(25.0),
                rated_capability: Some(10.0),
                ..HeuristicConfig::default()
            },
            ..Self::baseline()
        }
    }

    /// Available preset names.
    pub const PRESETS: &'static [&'static str] = &["baseline", "flexible_demand", "load_following"];

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self> {
        match name {
            "baseline" => Ok(Self::baseline()),
            "flexible_demand" => Ok(Self::flexible_demand()),
            "load_following" => Ok(Self::load_following()),
            _ => Err(Error::configuration(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a scenario from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::configuration("scenario", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| Error::configuration("toml", e.message()))
    }

    pub fn sim_config(&self) -> Result<SimConfig> {
        let s = &self.simulation;
        SimConfig::new(s.n_timesteps, s.control_window, s.seed)
    }

    /// Merges and validates the storage parameter sets.
    pub fn storage_config(&self) -> Result<StorageConfig> {
        StorageConfigBuilder::new()
            .shared(self.storage.shared_parameters.clone())
            .specific(self.storage.control_parameters.clone())
            .build()
    }

    /// Shaping parameters, with the demand profile as maximum demand.
    pub fn flexible_config(&self) -> Result<FlexibleDemandConfig> {
        let f = &self.flexible_demand;
        FlexibleDemandConfig::new(
            self.demand.profile.clone(),
            f.turndown_ratio,
            f.ramp_down_rate_fraction,
            f.ramp_up_rate_fraction,
            f.min_utilization,
        )
    }

    /// Validates all fields and returns every error found.
    ///
    /// Returns an empty vector if the configuration is valid.
    pub fn validate(&self) -> Vec<Error> {
        let mut errors = Vec::new();
        let s = &self.simulation;

        if let Err(e) = self.sim_config() {
            errors.push(e);
        }
        if s.commodity.trim().is_empty() {
            errors.push(Error::configuration("simulation.commodity", "must not be empty"));
        }

        if let Err(e) = self.storage_config() {
            errors.push(e);
        }
        if let Err(e) = self.flexible_config() {
            errors.push(e);
        }

        if let Profile::Series(values) = &self.demand.profile {
            if values.len() != s.n_timesteps {
                errors.push(Error::dimension_mismatch(
                    "demand.profile",
                    s.n_timesteps,
                    values.len(),
                ));
            }
        }

        let g = &self.generation;
        if g.profile.is_none() {
            if g.sunrise_idx >= g.sunset_idx {
                errors.push(Error::configuration(
                    "generation.sunrise_idx",
                    "must be < generation.sunset_idx",
                ));
            }
            if g.sunset_idx > g.steps_per_day {
                errors.push(Error::configuration(
                    "generation.sunset_idx",
                    "must be <= generation.steps_per_day",
                ));
            }
        }

        let h = &self.heuristic;
        let fixed = match &h.fixed_dispatch {
            Profile::Constant(v) => std::slice::from_ref(v),
            Profile::Series(values) => values.as_slice(),
        };
        if let Err(e) = check_range("heuristic.fixed_dispatch", fixed, -1.0, 1.0) {
            errors.push(e);
        }
        if let Some(cap) = h.rated_capability {
            if !cap.is_finite() || cap <= 0.0 {
                errors.push(Error::configuration(
                    "heuristic.rated_capability",
                    "must be finite and > 0",
                ));
            }
        }

        errors
    }
}
