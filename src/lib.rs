//! Storage dispatch and flexible demand shaping for hybrid energy plants.

pub mod config;
pub mod error;
pub mod forecast;
pub mod io;
pub mod profiles;
pub mod runner;
/// Dispatchers, the windowed engine, result trajectories, and KPIs.
pub mod sim;
/// Storage parameters, operating bounds, and the physical store seam.
pub mod storage;

pub use error::{Error, Result};
