//! Simulation engine that replays dispatch commands against a physical store.

use tracing::{debug, info};

use super::heuristic::{HeuristicFractionDispatcher, WindowInputs};
use super::trajectory::TrajectoryBuilder;
use super::types::{DispatchRecord, SimConfig, SimulationResult};
use crate::error::{Result, check_len};
use crate::storage::bounds::{
    available_charge_headroom, available_discharge_headroom, effective_limit,
};
use crate::storage::{PhysicalStore, StorageConfig};

/// Realized outcome of one replayed command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Realized {
    /// Power actually delivered (positive) or absorbed (negative).
    pub power: f64,
    /// Store SOC after the period.
    pub soc: f64,
}

/// Horizon-long series driving a windowed run.
#[derive(Debug, Clone, Copy)]
pub struct HorizonInputs<'a> {
    pub demand: &'a [f64],
    pub generation: &'a [f64],
    pub grid_limit: &'a [f64],
    pub goal: Option<&'a [f64]>,
}

/// Simulation engine owning one physical store.
///
/// Generic over `S: PhysicalStore` for static dispatch. The store is driven
/// exclusively by this engine for the lifetime of a run.
pub struct BatterySimulationEngine<S: PhysicalStore> {
    config: StorageConfig,
    store: S,
}

impl<S: PhysicalStore> BatterySimulationEngine<S> {
    pub fn new(config: StorageConfig, store: S) -> Self {
        Self { config, store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Bounds a signed command by nameplate rate, live store limit, and SOC.
    pub fn clamp_command(&self, command: f64) -> f64 {
        let state = self.store.get_state();
        let cfg = &self.config;
        if command > 0.0 {
            let soc_limit = available_discharge_headroom(
                state.soc,
                cfg.min_charge_percent(),
                cfg.max_capacity(),
            ) * cfg.discharge_efficiency();
            command.min(effective_limit(
                cfg.max_discharge_rate(),
                state.dischargeable_limit,
                soc_limit,
            ))
        } else if command < 0.0 {
            let soc_limit = available_charge_headroom(
                state.soc,
                cfg.max_charge_percent(),
                cfg.max_capacity(),
            ) / cfg.charge_efficiency();
            -(-command).min(effective_limit(
                cfg.max_charge_rate(),
                state.chargeable_limit,
                soc_limit,
            ))
        } else {
            0.0
        }
    }

    /// Executes one command and returns what the store realized.
    pub fn step(&mut self, command: f64) -> Realized {
        let bounded = self.clamp_command(command);
        self.store.set_command(bounded);
        self.store.advance_one_period();
        let state = self.store.get_state();
        Realized {
            power: state.power,
            soc: state.soc,
        }
    }

    /// Replays `commands` in time order.
    pub fn replay(&mut self, commands: &[f64]) -> Vec<Realized> {
        commands.iter().map(|&c| self.step(c)).collect()
    }

    /// Runs the horizon in look-ahead windows, re-anchoring each window to
    /// the store's reported SOC.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`](crate::error::Error::DimensionMismatch)
    /// if any input series, or a fixed dispatch series, does not span
    /// `sim.n_timesteps`, or any error the dispatcher raises for a window. No period is simulated on failure of
    /// the up-front checks.
    pub fn run_windowed(
        &mut self,
        dispatcher: &mut HeuristicFractionDispatcher,
        sim: &SimConfig,
        inputs: &HorizonInputs<'_>,
    ) -> Result<SimulationResult> {
        let n = sim.n_timesteps;
        check_len("demand", inputs.demand, n)?;
        check_len("generation", inputs.generation, n)?;
        check_len("grid_limit", inputs.grid_limit, n)?;
        if let Some(goal) = inputs.goal {
            check_len("goal", goal, n)?;
        }
        dispatcher.check_horizon(n)?;

        let rated = inputs.demand.iter().copied().fold(0.0, f64::max);
        let mut builder = TrajectoryBuilder::new(n, rated);

        for (start, len) in sim.windows() {
            let end = start + len;

            // 1. Anchor to the live store
            let initial_soc = dispatcher.initial_soc(&self.store);

            // 2. Plan the window
            let window = WindowInputs {
                start,
                generation: &inputs.generation[start..end],
                grid_limit: &inputs.grid_limit[start..end],
                goal: inputs.goal.map(|g| &g[start..end]),
            };
            let plan = dispatcher.dispatch_window(&window, initial_soc)?;

            // 3. Realize the plan
            let realized = self.replay(&plan.commands());

            // 4. Settle against demand
            for (k, r) in realized.iter().enumerate() {
                let t = start + k;
                let demand = inputs.demand[t];
                let supply = inputs.generation[t] + r.power;
                let output = demand.min(supply).max(0.0);
                builder.push(DispatchRecord {
                    soc: r.soc,
                    charge: (-r.power).max(0.0),
                    discharge: r.power.max(0.0),
                    output,
                    unmet_demand: (demand - output).max(0.0),
                    unused_commodity: (supply - output).max(0.0),
                });
            }

            debug!(
                start,
                len,
                initial_soc,
                final_soc = self.store.get_state().soc,
                "window dispatched"
            );
        }

        let result = builder.finish();
        info!(
            device = self.store.device_type(),
            periods = result.len(),
            windows = sim.n_windows(),
            throughput = result.total_throughput(),
            "windowed dispatch complete"
        );
        Ok(result)
    }
}
