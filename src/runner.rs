//! Config-driven construction and execution of one dispatch run.

use tracing::info;

use crate::config::{ControllerKind, ScenarioConfig};
use crate::error::Result;
use crate::sim::demand::{DemandFollowingDispatcher, pass_through};
use crate::sim::engine::{BatterySimulationEngine, HorizonInputs};
use crate::sim::flexible::FlexibleDemandController;
use crate::sim::heuristic::{FractionSource, HeuristicFractionDispatcher};
use crate::sim::kpi::KpiReport;
use crate::sim::types::SimulationResult;
use crate::storage::Battery;

/// Everything a caller needs to report on a finished run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub controller: ControllerKind,
    /// Commodity name, used for output column names.
    pub commodity: String,
    pub demand: Vec<f64>,
    pub inflow: Vec<f64>,
    pub result: SimulationResult,
    pub kpi: KpiReport,
}

/// Builds the scenario's series and dispatcher, then runs the whole horizon.
///
/// # Errors
///
/// Returns the first configuration, dimension, or range error met while
/// building. Nothing is simulated in that case.
pub fn run_scenario(cfg: &ScenarioConfig) -> Result<RunOutput> {
    let sim = cfg.sim_config()?;
    let n = sim.n_timesteps;
    let controller = cfg.simulation.controller;

    let demand = cfg.demand.profile.broadcast("demand.profile", n)?;
    let inflow = cfg.generation.series(n, sim.seed)?;

    info!(
        %controller,
        periods = n,
        commodity = %cfg.simulation.commodity,
        "starting dispatch run"
    );

    let (result, storage_capacity) = match controller {
        ControllerKind::PassThrough => (pass_through(&inflow), 0.0),
        ControllerKind::DemandFollowing => {
            let storage = cfg.storage_config()?;
            let capacity = storage.max_capacity();
            let result = DemandFollowingDispatcher::new(storage).run(&demand, &inflow)?;
            (result, capacity)
        }
        ControllerKind::FlexibleDemand => {
            let mut ctl = FlexibleDemandController::new(cfg.flexible_config()?);
            let mut capacity = 0.0;
            if cfg.flexible_demand.use_storage {
                let storage = cfg.storage_config()?;
                capacity = storage.max_capacity();
                ctl = ctl.with_storage(storage);
            }
            (ctl.run(&demand, &inflow)?, capacity)
        }
        ControllerKind::SimpleHeuristic | ControllerKind::LoadFollowingHeuristic => {
            let storage = cfg.storage_config()?;
            let capacity = storage.max_capacity();
            let h = &cfg.heuristic;

            let (source, goal) = if controller == ControllerKind::SimpleHeuristic {
                (FractionSource::Fixed(h.fixed_dispatch.tile(n)), None)
            } else {
                let goal = match &h.goal {
                    Some(p) => p.broadcast("heuristic.goal", n)?,
                    None => demand.clone(),
                };
                (FractionSource::LoadFollowing, Some(goal))
            };

            let mut dispatcher = HeuristicFractionDispatcher::new(storage.clone(), source)?;
            if let Some(cap) = h.rated_capability {
                dispatcher = dispatcher.with_max_capability(cap)?;
            }

            let grid_limit = h.grid_limit.broadcast("heuristic.grid_limit", n)?;
            let battery = Battery::new(&storage);
            let mut engine = BatterySimulationEngine::new(storage, battery);
            let result = engine.run_windowed(
                &mut dispatcher,
                &sim,
                &HorizonInputs {
                    demand: &demand,
                    generation: &inflow,
                    grid_limit: &grid_limit,
                    goal: goal.as_deref(),
                },
            )?;
            (result, capacity)
        }
    };

    let kpi = KpiReport::from_result(&result, storage_capacity);
    Ok(RunOutput {
        controller,
        commodity: cfg.simulation.commodity.clone(),
        demand,
        inflow,
        result,
        kpi,
    })
}
