//! Validated physical and operational parameters for one storage device.

use serde::Deserialize;
use toml::Table;

use crate::error::{Error, Result};

/// Raw storage parameters as they arrive from a scenario file.
///
/// Efficiencies are optional here because they may be given either as a
/// charge/discharge pair or as a single round-trip value. Conversion into a
/// [`StorageConfig`] resolves and validates them.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageParams {
    /// Usable capacity (energy or mass units).
    pub max_capacity: f64,
    /// Maximum charge rate per period, as observed outside the device.
    pub max_charge_rate: f64,
    /// Maximum discharge rate per period, as observed outside the device.
    pub max_discharge_rate: f64,
    /// Lower SOC bound as a fraction of `max_capacity`.
    pub min_charge_percent: f64,
    /// Upper SOC bound as a fraction of `max_capacity`.
    pub max_charge_percent: f64,
    /// SOC at the start of the horizon.
    pub init_charge_percent: f64,
    #[serde(default)]
    pub charge_efficiency: Option<f64>,
    #[serde(default)]
    pub discharge_efficiency: Option<f64>,
    #[serde(default)]
    pub round_trip_efficiency: Option<f64>,
}

/// Immutable, validated storage device record.
///
/// # Invariants
///
/// - `max_capacity > 0`, both rates `>= 0`
/// - `0 <= min_charge_percent <= init_charge_percent <= max_charge_percent <= 1`
/// - both efficiencies in `(0, 1]`
///
/// # Examples
///
/// ```
/// use storage_dispatch::storage::{StorageConfig, StorageParams};
///
/// let cfg = StorageConfig::try_from(StorageParams {
///     max_capacity: 10.0,
///     max_charge_rate: 1.0,
///     max_discharge_rate: 1.0,
///     min_charge_percent: 0.1,
///     max_charge_percent: 0.9,
///     init_charge_percent: 0.5,
///     charge_efficiency: None,
///     discharge_efficiency: None,
///     round_trip_efficiency: Some(0.81),
/// })
/// .unwrap();
/// assert!((cfg.charge_efficiency() - 0.9).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct StorageConfig {
    max_capacity: f64,
    max_charge_rate: f64,
    max_discharge_rate: f64,
    min_charge_percent: f64,
    max_charge_percent: f64,
    init_charge_percent: f64,
    charge_efficiency: f64,
    discharge_efficiency: f64,
}

impl StorageConfig {
    pub fn max_capacity(&self) -> f64 {
        self.max_capacity
    }

    pub fn max_charge_rate(&self) -> f64 {
        self.max_charge_rate
    }

    pub fn max_discharge_rate(&self) -> f64 {
        self.max_discharge_rate
    }

    pub fn min_charge_percent(&self) -> f64 {
        self.min_charge_percent
    }

    pub fn max_charge_percent(&self) -> f64 {
        self.max_charge_percent
    }

    pub fn init_charge_percent(&self) -> f64 {
        self.init_charge_percent
    }

    pub fn charge_efficiency(&self) -> f64 {
        self.charge_efficiency
    }

    pub fn discharge_efficiency(&self) -> f64 {
        self.discharge_efficiency
    }

    /// Product of charge and discharge efficiency.
    pub fn round_trip_efficiency(&self) -> f64 {
        self.charge_efficiency * self.discharge_efficiency
    }

    /// Clamps `soc` into `[min_charge_percent, max_charge_percent]`.
    pub fn clamp_soc(&self, soc: f64) -> f64 {
        soc.clamp(self.min_charge_percent, self.max_charge_percent)
    }
}

impl TryFrom<StorageParams> for StorageConfig {
    type Error = Error;

    fn try_from(p: StorageParams) -> Result<Self> {
        if !p.max_capacity.is_finite() || p.max_capacity <= 0.0 {
            return Err(Error::configuration(
                "storage.max_capacity",
                "must be finite and > 0",
            ));
        }
        non_negative("storage.max_charge_rate", p.max_charge_rate)?;
        non_negative("storage.max_discharge_rate", p.max_discharge_rate)?;
        unit_interval("storage.min_charge_percent", p.min_charge_percent)?;
        unit_interval("storage.max_charge_percent", p.max_charge_percent)?;
        unit_interval("storage.init_charge_percent", p.init_charge_percent)?;
        check_soc_order(
            p.min_charge_percent,
            p.init_charge_percent,
            p.max_charge_percent,
        )?;

        let (charge_efficiency, discharge_efficiency) = resolve_efficiencies(
            p.charge_efficiency,
            p.discharge_efficiency,
            p.round_trip_efficiency,
        )?;

        Ok(Self {
            max_capacity: p.max_capacity,
            max_charge_rate: p.max_charge_rate,
            max_discharge_rate: p.max_discharge_rate,
            min_charge_percent: p.min_charge_percent,
            max_charge_percent: p.max_charge_percent,
            init_charge_percent: p.init_charge_percent,
            charge_efficiency,
            discharge_efficiency,
        })
    }
}

/// Exactly one of `{round_trip}` or `{charge AND discharge}` must be supplied.
fn resolve_efficiencies(
    charge: Option<f64>,
    discharge: Option<f64>,
    round_trip: Option<f64>,
) -> Result<(f64, f64)> {
    match (charge, discharge, round_trip) {
        (None, None, Some(rte)) => {
            efficiency("storage.round_trip_efficiency", rte)?;
            let eta = rte.sqrt();
            Ok((eta, eta))
        }
        (Some(c), Some(d), None) => {
            efficiency("storage.charge_efficiency", c)?;
            efficiency("storage.discharge_efficiency", d)?;
            Ok((c, d))
        }
        (c, d, Some(_)) => {
            let mut given: Vec<&str> = Vec::new();
            if c.is_some() {
                given.push("charge_efficiency");
            }
            if d.is_some() {
                given.push("discharge_efficiency");
            }
            Err(Error::configuration(
                "storage.round_trip_efficiency",
                format!(
                    "`round_trip_efficiency` conflicts with `{}`; provide either \
                     `round_trip_efficiency` or both `charge_efficiency` and \
                     `discharge_efficiency`",
                    given.join("`, `")
                ),
            ))
        }
        _ => Err(Error::configuration(
            "storage.charge_efficiency",
            "provide either `round_trip_efficiency` or both `charge_efficiency` and \
             `discharge_efficiency`",
        )),
    }
}

fn non_negative(field: &str, v: f64) -> Result<()> {
    if !v.is_finite() || v < 0.0 {
        return Err(Error::configuration(field, "must be finite and >= 0"));
    }
    Ok(())
}

/// Fails unless `v` lies in `[0, 1]`.
pub(crate) fn unit_interval(field: &str, v: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&v) {
        return Err(Error::configuration(field, format!("must be in [0, 1], got {v}")));
    }
    Ok(())
}

fn efficiency(field: &str, v: f64) -> Result<()> {
    if !(v > 0.0 && v <= 1.0) {
        return Err(Error::configuration(field, format!("must be in (0, 1], got {v}")));
    }
    Ok(())
}

fn check_soc_order(min: f64, init: f64, max: f64) -> Result<()> {
    if min > max {
        return Err(Error::configuration(
            "storage.min_charge_percent",
            "must be <= storage.max_charge_percent",
        ));
    }
    if !(min..=max).contains(&init) {
        return Err(Error::configuration(
            "storage.init_charge_percent",
            format!("must be in [{min}, {max}], got {init}"),
        ));
    }
    Ok(())
}

/// Merges a shared and a controller-specific parameter set into one
/// [`StorageConfig`].
///
/// A key defined in both sets is rejected rather than silently overridden, and
/// unknown or missing keys are rejected when the merged table is deserialized.
#[derive(Debug, Clone, Default)]
pub struct StorageConfigBuilder {
    shared: Table,
    specific: Table,
}

impl StorageConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for `new().shared(shared).specific(specific).build()`.
    ///
    /// # Errors
    ///
    /// See [`StorageConfigBuilder::build`].
    pub fn from_parameter_sets(shared: Table, specific: Table) -> Result<StorageConfig> {
        Self::new().shared(shared).specific(specific).build()
    }

    /// Sets the parameters shared between performance and control models.
    pub fn shared(mut self, shared: Table) -> Self {
        self.shared = shared;
        self
    }

    /// Sets the parameters specific to the dispatch controller.
    pub fn specific(mut self, specific: Table) -> Self {
        self.specific = specific;
        self
    }

    /// Merges both sets, deserializes, and validates.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] on key collisions, unknown or missing
    /// keys, wrong value types, or any invariant violation.
    pub fn build(self) -> Result<StorageConfig> {
        let mut collisions: Vec<&str> = self
            .specific
            .keys()
            .filter(|k| self.shared.contains_key(k.as_str()))
            .map(String::as_str)
            .collect();
        if !collisions.is_empty() {
            collisions.sort_unstable();
            return Err(Error::configuration(
                "storage",
                format!(
                    "duplicate parameters found: {}; define each parameter only once in the \
                     shared and control parameter sets",
                    collisions.join(", ")
                ),
            ));
        }

        let mut merged = self.specific;
        merged.extend(self.shared);

        let params: StorageParams = toml::Value::Table(merged)
            .try_into()
            .map_err(|e: toml::de::Error| Error::configuration("storage", e.message()))?;
        StorageConfig::try_from(params)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Ideal store used throughout the unit tests.
    pub(crate) fn params(capacity: f64, init: f64) -> StorageParams {
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

    #[test]
    fn round_trip_efficiency_splits_evenly() {
        let cfg = StorageConfig::try_from(StorageParams {
            charge_efficiency: None,
            discharge_efficiency: None,
            round_trip_efficiency: Some(0.81),
            ..params(10.0, 0.5)
        })
        .unwrap();
        assert!((cfg.charge_efficiency() - 0.9).abs() < 1e-9);
        assert!((cfg.discharge_efficiency() - 0.9).abs() < 1e-9);
        assert!((cfg.round_trip_efficiency() - 0.81).abs() < 1e-9);
    }

    #[test]
    fn both_efficiency_forms_rejected() {
        let err = StorageConfig::try_from(StorageParams {
            round_trip_efficiency: Some(0.81),
            ..params(10.0, 0.5)
        })
        .unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn neither_efficiency_form_rejected() {
        let result = StorageConfig::try_from(StorageParams {
            charge_efficiency: None,
            discharge_efficiency: None,
            ..params(10.0, 0.5)
        });
        assert!(result.is_err());
    }

    #[test]
    fn half_pair_rejected() {
        let result = StorageConfig::try_from(StorageParams {
            discharge_efficiency: None,
            ..params(10.0, 0.5)
        });
        assert!(result.is_err());
    }

    #[test]
    fn round_trip_with_single_half_names_the_conflict() {
        let err = StorageConfig::try_from(StorageParams {
            charge_efficiency: None,
            discharge_efficiency: Some(0.9),
            round_trip_efficiency: Some(0.81),
            ..params(10.0, 0.5)
        })
        .unwrap_err();
        match err {
            Error::Configuration { field, message } => {
                assert_eq!(field, "storage.round_trip_efficiency");
                assert!(message.contains("conflicts with `discharge_efficiency`"), "{message}");
                assert!(!message.contains("but not both"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn zero_efficiency_rejected() {
        let result = StorageConfig::try_from(StorageParams {
            charge_efficiency: Some(0.0),
            ..params(10.0, 0.5)
        });
        assert!(result.is_err());
    }

    #[test]
    fn inverted_soc_bounds_rejected() {
        let err = StorageConfig::try_from(StorageParams {
            min_charge_percent: 0.8,
            max_charge_percent: 0.2,
            init_charge_percent: 0.5,
            ..params(10.0, 0.5)
        })
        .unwrap_err();
        assert_eq!(
            err,
            Error::configuration(
                "storage.min_charge_percent",
                "must be <= storage.max_charge_percent"
            )
        );
    }

    #[test]
    fn init_outside_bounds_rejected() {
        let result = StorageConfig::try_from(StorageParams {
            min_charge_percent: 0.2,
            max_charge_percent: 0.8,
            ..params(10.0, 0.9)
        });
        assert!(result.is_err());
    }

    #[test]
    fn percent_above_one_rejected() {
        let result = StorageConfig::try_from(StorageParams {
            max_charge_percent: 1.2,
            ..params(10.0, 0.5)
        });
        assert!(result.is_err());
    }

    #[test]
    fn zero_capacity_rejected() {
        assert!(StorageConfig::try_from(params(0.0, 0.5)).is_err());
    }

    fn table(src: &str) -> Table {
        src.parse::<Table>().unwrap()
    }

    #[test]
    fn builder_merges_disjoint_sets() {
        let cfg = StorageConfigBuilder::new()
            .shared(table(
                "max_capacity = 10.0\nmin_charge_percent = 0.1\nmax_charge_percent = 0.9\n\
                 init_charge_percent = 0.5",
            ))
            .specific(table(
                "max_charge_rate = 2.0\nmax_discharge_rate = 3.0\nround_trip_efficiency = 0.81",
            ))
            .build()
            .unwrap();
        assert_eq!(cfg.max_capacity(), 10.0);
        assert_eq!(cfg.max_discharge_rate(), 3.0);
    }

    #[test]
    fn builder_rejects_collisions() {
        let err = StorageConfigBuilder::new()
            .shared(table("max_capacity = 10.0\nmax_charge_rate = 1.0"))
            .specific(table("max_capacity = 12.0\nmax_charge_rate = 1.0"))
            .build()
            .unwrap_err();
        match err {
            Error::Configuration { message, .. } => {
                assert!(message.contains("max_capacity, max_charge_rate"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn builder_rejects_unknown_keys() {
        let result = StorageConfigBuilder::new()
            .shared(table(
                "max_capacity = 10.0\nmin_charge_percent = 0.1\nmax_charge_percent = 0.9\n\
                 init_charge_percent = 0.5\nbogus = 1.0",
            ))
            .specific(table(
                "max_charge_rate = 2.0\nmax_discharge_rate = 3.0\nround_trip_efficiency = 0.81",
            ))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn from_parameter_sets_matches_builder() {
        let shared = table(
            "max_capacity = 5.0\nmin_charge_percent = 0.0\nmax_charge_percent = 1.0\n\
             init_charge_percent = 0.2",
        );
        let specific = table(
            "max_charge_rate = 1.0\nmax_discharge_rate = 1.0\ncharge_efficiency = 0.9\n\
             discharge_efficiency = 0.8",
        );
        let cfg = StorageConfigBuilder::from_parameter_sets(shared, specific).unwrap();
        assert_eq!(cfg.init_charge_percent(), 0.2);
        assert!((cfg.round_trip_efficiency() - 0.72).abs() < 1e-12);
    }

    #[test]
    fn builder_rejects_missing_keys() {
        let result = StorageConfigBuilder::new()
            .shared(table("max_capacity = 10.0"))
            .build();
        assert!(result.is_err());
    }
}
