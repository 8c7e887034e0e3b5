/// Demand-following dispatch and the pass-through controller.
pub mod demand;
pub mod engine;
/// Flexible load shaping and the flexible-demand controller.
pub mod flexible;
pub mod heuristic;
pub mod kpi;
pub mod trajectory;
pub mod types;
