//! Error taxonomy for configuration, dispatch inputs, and normalized commands.

use thiserror::Error;

/// Errors raised before any timestep is simulated.
///
/// Per-period clamping of SOC and power fractions is never an error; it is
/// absorbed into the trajectory.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Contradictory or out-of-range configuration.
    #[error("configuration error: {field}: {message}")]
    Configuration {
        /// Dotted field path (e.g. `"storage.charge_efficiency"`).
        field: String,
        /// Human-readable constraint description.
        message: String,
    },

    /// Parallel time series passed to one call have differing lengths.
    #[error("dimension mismatch: `{name}` has length {actual}, expected {expected}")]
    DimensionMismatch {
        /// Name of the offending series.
        name: String,
        /// Length every series must share.
        expected: usize,
        /// Length actually supplied.
        actual: usize,
    },

    /// A caller-supplied normalized value falls outside its allowed range.
    #[error("range violation: `{name}[{index}]` = {value} is outside [{min}, {max}]")]
    RangeViolation {
        /// Name of the offending series.
        name: String,
        /// Index of the first offending value.
        index: usize,
        /// Offending value.
        value: f64,
        /// Inclusive lower bound.
        min: f64,
        /// Inclusive upper bound.
        max: f64,
    },
}

impl Error {
    /// Shorthand for [`Error::Configuration`].
    pub fn configuration(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Shorthand for [`Error::DimensionMismatch`].
    pub fn dimension_mismatch(name: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch {
            name: name.into(),
            expected,
            actual,
        }
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Fails with [`Error::DimensionMismatch`] unless `series.len() == expected`.
pub fn check_len(name: &str, series: &[f64], expected: usize) -> Result<()> {
    if series.len() != expected {
        return Err(Error::dimension_mismatch(name, expected, series.len()));
    }
    Ok(())
}

/// Fails with [`Error::RangeViolation`] at the first value outside `[min, max]`.
pub fn check_range(name: &str, series: &[f64], min: f64, max: f64) -> Result<()> {
    match series
        .iter()
        .position(|v| !(min..=max).contains(v))
    {
        Some(index) => Err(Error::RangeViolation {
            name: name.to_string(),
            index,
            value: series[index],
            min,
            max,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_len_reports_both_lengths() {
        let err = check_len("grid_limit", &[0.0; 47], 48).unwrap_err();
        assert_eq!(err, Error::dimension_mismatch("grid_limit", 48, 47));
    }

    #[test]
    fn check_range_reports_first_offender() {
        let err = check_range("fixed_dispatch", &[0.0, -1.0, 1.5, 2.0], -1.0, 1.0).unwrap_err();
        match err {
            Error::RangeViolation { index, value, .. } => {
                assert_eq!(index, 2);
                assert_eq!(value, 1.5);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn nan_is_out_of_range() {
        assert!(check_range("x", &[f64::NAN], -1.0, 1.0).is_err());
    }

    #[test]
    fn display_names_field() {
        let e = Error::configuration("storage.max_capacity", "must be > 0");
        assert!(e.to_string().contains("storage.max_capacity"));
    }
}
