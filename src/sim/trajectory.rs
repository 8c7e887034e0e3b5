//! Append-only trajectory builder producing a finished [`SimulationResult`].

use super::types::{DispatchRecord, SimulationResult};

/// Collects per-period records in time order.
///
/// Records cannot be edited once pushed; the summaries are derived only in
/// [`finish`](Self::finish), after the scan completes.
#[derive(Debug, Clone)]
pub struct TrajectoryBuilder {
    records: Vec<DispatchRecord>,
    rated_output: f64,
    flexible_demand: Option<Vec<f64>>,
    min_utilization_satisfied: bool,
}

impl TrajectoryBuilder {
    /// Creates a builder for a horizon of `n` periods.
    ///
    /// `rated_output` is the per-period output that corresponds to a capacity
    /// factor of one (usually the peak demand).
    pub fn new(n: usize, rated_output: f64) -> Self {
        Self {
            records: Vec::with_capacity(n),
            rated_output,
            flexible_demand: None,
            min_utilization_satisfied: true,
        }
    }

    pub fn push(&mut self, record: DispatchRecord) {
        self.records.push(record);
    }

    /// Number of records pushed so far.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Overrides the per-period output used as the capacity-factor reference.
    pub fn set_rated_output(&mut self, rated_output: f64) {
        self.rated_output = rated_output;
    }

    /// Attaches the reshaped demand profile of a flexible-demand run.
    pub fn flexible_demand(mut self, profile: Vec<f64>, satisfied: bool) -> Self {
        self.flexible_demand = Some(profile);
        self.min_utilization_satisfied = satisfied;
        self
    }

    pub fn finish(self) -> SimulationResult {
        let mut total_output = 0.0;
        let mut total_unmet_demand = 0.0;
        let mut total_unused_commodity = 0.0;
        let mut total_throughput = 0.0;
        for r in &self.records {
            total_output += r.output;
            total_unmet_demand += r.unmet_demand;
            total_unused_commodity += r.unused_commodity;
            total_throughput += r.charge + r.discharge;
        }

        let denom = self.rated_output * self.records.len() as f64;
        let capacity_factor = if denom > 0.0 {
            total_output / denom
        } else {
            0.0
        };

        SimulationResult {
            records: self.records,
            flexible_demand: self.flexible_demand,
            min_utilization_satisfied: self.min_utilization_satisfied,
            total_output,
            total_unmet_demand,
            total_unused_commodity,
            total_throughput,
            capacity_factor,
        }
    }
}
