//! Post-hoc KPI computation from a finished simulation.

use std::fmt;

use super::types::SimulationResult;

/// Aggregate indicators derived from a complete run.
///
/// Computed from the finished [`SimulationResult`] so that the report always
/// agrees with the per-period records.
#[derive(Debug, Clone, PartialEq)]
pub struct KpiReport {
    /// Commodity delivered to demand over the horizon.
    pub total_output: f64,
    pub total_unmet_demand: f64,
    /// Inflow curtailed over the horizon.
    pub total_unused: f64,
    /// Sum of charge and discharge (outside view).
    pub storage_throughput: f64,
    /// Throughput over twice the usable capacity.
    pub equivalent_full_cycles: f64,
    pub capacity_factor: f64,
    pub soc_min: f64,
    pub soc_max: f64,
    /// Periods with any unmet demand.
    pub unmet_periods: usize,
    /// `false` when flexible-demand shaping fell short of minimum utilization.
    pub min_utilization_satisfied: bool,
}

impl KpiReport {
    /// Computes all KPIs.
    ///
    /// # Arguments
    ///
    /// * `result` - Finished simulation
    /// * `storage_capacity` - Usable store capacity for the cycle count (`0` when no store)
    pub fn from_result(result: &SimulationResult, storage_capacity: f64) -> Self {
        let (soc_min, soc_max) = if result.is_empty() {
            (0.0, 0.0)
        } else {
            result
                .records()
                .iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), r| {
                    (lo.min(r.soc), hi.max(r.soc))
                })
        };

        let unmet_periods = result
            .records()
            .iter()
            .filter(|r| r.unmet_demand > 0.0)
            .count();

        let storage_throughput = result.total_throughput();
        let equivalent_full_cycles = if storage_capacity > 0.0 {
            storage_throughput / (2.0 * storage_capacity)
        } else {
            0.0
        };

        Self {
            total_output: result.total_output(),
            total_unmet_demand: result.total_unmet_demand(),
            total_unused: result.total_unused_commodity(),
            storage_throughput,
            equivalent_full_cycles,
            capacity_factor: result.capacity_factor(),
            soc_min,
            soc_max,
            unmet_periods,
            min_utilization_satisfied: result.min_utilization_satisfied(),
        }
    }
}

impl fmt::Display for KpiReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- KPI Report ---")?;
        writeln!(f, "Total output:          {:.3}", self.total_output)?;
        writeln!(
            f,
            "Unmet demand:          {:.3} ({} periods)",
            self.total_unmet_demand, self.unmet_periods
        )?;
        writeln!(f, "Unused commodity:      {:.3}", self.total_unused)?;
        writeln!(f, "Capacity factor:       {:.1}%", self.capacity_factor * 100.0)?;
        writeln!(
            f,
            "Storage throughput:    {:.2} ({:.2} equiv. cycles)",
            self.storage_throughput, self.equivalent_full_cycles
        )?;
        writeln!(
            f,
            "SoC range:             {:.1}% .. {:.1}%",
            self.soc_min * 100.0,
            self.soc_max * 100.0
        )?;
        write!(
            f,
            "Min utilization met:   {}",
            if self.min_utilization_satisfied { "yes" } else { "no" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::trajectory::TrajectoryBuilder;
    use crate::sim::types::DispatchRecord;

    fn result(records: &[DispatchRecord]) -> SimulationResult {
        let mut b = TrajectoryBuilder::new(records.len(), 2.0);
        for r in records {
            b.push(*r);
        }
        b.finish()
    }

    #[test]
    fn empty_result_gives_zero_report() {
        let kpi = KpiReport::from_result(&result(&[]), 10.0);
        assert_eq!(kpi.total_output, 0.0);
        assert_eq!(kpi.soc_min, 0.0);
        assert_eq!(kpi.unmet_periods, 0);
        assert!(kpi.min_utilization_satisfied);
    }

    #[test]
    fn cycles_and_soc_range() {
        let kpi = KpiReport::from_result(
            &result(&[
                DispatchRecord {
                    soc: 0.2,
                    discharge: 5.0,
                    output: 2.0,
                    ..DispatchRecord::default()
                },
                DispatchRecord {
                    soc: 0.7,
                    charge: 5.0,
                    unmet_demand: 1.0,
                    ..DispatchRecord::default()
                },
            ]),
            5.0,
        );
        assert_eq!(kpi.storage_throughput, 10.0);
        assert_eq!(kpi.equivalent_full_cycles, 1.0);
        assert_eq!(kpi.soc_min, 0.2);
        assert_eq!(kpi.soc_max, 0.7);
        assert_eq!(kpi.unmet_periods, 1);
        assert_eq!(kpi.capacity_factor, 0.5);
    }

    #[test]
    fn zero_capacity_gives_zero_cycles() {
        let kpi = KpiReport::from_result(
            &result(&[DispatchRecord {
                charge: 1.0,
                ..DispatchRecord::default()
            }]),
            0.0,
        );
        assert_eq!(kpi.equivalent_full_cycles, 0.0);
    }

    #[test]
    fn display_lists_every_line() {
        let kpi = KpiReport::from_result(&result(&[DispatchRecord::default()]), 1.0);
        let text = kpi.to_string();
        assert!(text.starts_with("--- KPI Report ---"));
        assert_eq!(text.lines().count(), 8);
    }
}
