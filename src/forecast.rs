//! Naive forecasting used to stretch daily patterns over a horizon.

/// "Tomorrow is today" forecaster.
///
/// Repeats or truncates a baseline pattern to the requested length. Used to
/// expand a one-day fixed-dispatch schedule to a full year.
#[derive(Debug, Default, Clone, Copy)]
pub struct NaiveForecast;

impl NaiveForecast {
    /// Produce `horizon` values by cycling through `baseline`.
    ///
    /// An empty baseline forecasts zeros.
    pub fn forecast(&self, baseline: &[f64], horizon: usize) -> Vec<f64> {
        if baseline.is_empty() {
            return vec![0.0; horizon];
        }
        baseline.iter().copied().cycle().take(horizon).collect()
    }
}
