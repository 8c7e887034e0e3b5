//! Pure bound enforcement used at every dispatch decision point.
//!
//! A command may never exceed what the nameplate allows, what the physical
//! model currently reports as feasible, or what the present SOC permits.

/// Upper cushion on normalized power fractions, leaving headroom below 100%.
pub const MAX_POWER_FRACTION: f64 = 0.9;

/// Clamps a normalized power fraction to `[0.0, MAX_POWER_FRACTION]`.
///
/// NaN maps to `0.0`.
///
/// # Examples
///
/// ```
/// use storage_dispatch::storage::bounds::clamp_power_fraction;
///
/// assert_eq!(clamp_power_fraction(1.4), 0.9);
/// assert_eq!(clamp_power_fraction(-0.2), 0.0);
/// assert_eq!(clamp_power_fraction(0.3), 0.3);
/// ```
pub fn clamp_power_fraction(x: f64) -> f64 {
    if x.is_nan() {
        return 0.0;
    }
    x.clamp(0.0, MAX_POWER_FRACTION)
}

/// Room left below the upper SOC bound, device-side, floored at zero.
pub fn available_charge_headroom(soc: f64, max_charge_percent: f64, capacity: f64) -> f64 {
    ((max_charge_percent - soc) * capacity).max(0.0)
}

/// Energy held above the lower SOC bound, device-side, floored at zero.
pub fn available_discharge_headroom(soc: f64, min_charge_percent: f64, capacity: f64) -> f64 {
    ((soc - min_charge_percent) * capacity).max(0.0)
}

/// Three-way minimum of the nameplate limit, the live capability, and the
/// SOC-derived limit. Negative live or SOC limits count as zero.
pub fn effective_limit(spec_limit: f64, live_capability_limit: f64, soc_derived_limit: f64) -> f64 {
    spec_limit
        .min(live_capability_limit.max(0.0))
        .min(soc_derived_limit.max(0.0))
}
