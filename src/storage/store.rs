//! Physical store capability consumed by the dispatch engine.

use super::bounds::{available_charge_headroom, available_discharge_headroom};
use super::params::StorageConfig;

/// Snapshot reported by a physical store.
///
/// # Power Convention
/// - Positive power: discharging (commodity leaves the store)
/// - Negative power: charging (commodity enters the store)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StoreState {
    /// State of charge as a fraction of capacity.
    pub soc: f64,
    /// Largest charge power the store can currently accept (outside view, >= 0).
    pub chargeable_limit: f64,
    /// Largest discharge power the store can currently deliver (outside view, >= 0).
    pub dischargeable_limit: f64,
    /// Realized power of the most recently advanced period.
    pub power: f64,
}

/// Opaque stateful storage device.
///
/// The engine never looks inside: it reads state, sets a power command, and
/// advances one period. A store is driven by exactly one dispatcher at a time.
pub trait PhysicalStore {
    /// Returns the current state.
    fn get_state(&self) -> StoreState;

    /// Sets the power command applied by the next [`advance_one_period`](Self::advance_one_period).
    ///
    /// The command is held until replaced.
    fn set_command(&mut self, power: f64);

    /// Simulates one period under the held command.
    fn advance_one_period(&mut self);

    /// Returns a human-readable type name for the store.
    fn device_type(&self) -> &'static str;
}

/// Energy-bucket battery with asymmetric charge/discharge efficiency.
///
/// Rates are per period and measured outside the device. Charging by `P`
/// stores `P * eta_c`; discharging by `P` draws `P / eta_d` from the cells.
#[derive(Debug, Clone)]
pub struct Battery {
    capacity: f64,
    soc: f64,
    min_soc: f64,
    max_soc: f64,
    max_charge_rate: f64,
    max_discharge_rate: f64,
    eta_c: f64,
    eta_d: f64,
    command: f64,
    last_power: f64,
}

impl Battery {
    /// Creates a battery at the config's initial SOC.
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            capacity: config.max_capacity(),
            soc: config.init_charge_percent(),
            min_soc: config.min_charge_percent(),
            max_soc: config.max_charge_percent(),
            max_charge_rate: config.max_charge_rate(),
            max_discharge_rate: config.max_discharge_rate(),
            eta_c: config.charge_efficiency(),
            eta_d: config.discharge_efficiency(),
            command: 0.0,
            last_power: 0.0,
        }
    }

    /// Current state of charge.
    pub fn soc(&self) -> f64 {
        self.soc
    }

    fn chargeable_limit(&self) -> f64 {
        let room = available_charge_headroom(self.soc, self.max_soc, self.capacity);
        self.max_charge_rate.min(room / self.eta_c)
    }

    fn dischargeable_limit(&self) -> f64 {
        let held = available_discharge_headroom(self.soc, self.min_soc, self.capacity);
        self.max_discharge_rate.min(held * self.eta_d)
    }
}

impl PhysicalStore for Battery {
    fn get_state(&self) -> StoreState {
        StoreState {
            soc: self.soc,
            chargeable_limit: self.chargeable_limit(),
            dischargeable_limit: self.dischargeable_limit(),
            power: self.last_power,
        }
    }

    fn set_command(&mut self, power: f64) {
        self.command = power;
    }

    fn advance_one_period(&mut self) {
        let power = if self.command > 0.0 {
            let actual = self.command.min(self.dischargeable_limit());
            self.soc -= actual / self.eta_d / self.capacity;
            actual
        } else if self.command < 0.0 {
            let actual = (-self.command).min(self.chargeable_limit());
            self.soc += actual * self.eta_c / self.capacity;
            -actual
        } else {
            0.0
        };
        self.soc = self.soc.clamp(self.min_soc, self.max_soc);
        self.last_power = power;
    }

    fn device_type(&self) -> &'static str {
        "Battery"
    }
}
