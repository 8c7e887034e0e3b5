//! Seeded synthetic generation profiles for scenarios without measured data.

use rand::{Rng, SeedableRng, rngs::StdRng};

/// Draws one zero-mean Gaussian sample via the Box–Muller transform.
///
/// Returns `0.0` when `std_dev <= 0`.
pub fn gaussian_noise(rng: &mut StdRng, std_dev: f64) -> f64 {
    if std_dev <= 0.0 {
        return 0.0;
    }

    let u1: f64 = rng.random::<f64>().clamp(1e-12, 1.0);
    let u2: f64 = rng.random::<f64>();
    let z0 = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    z0 * std_dev
}

/// Half-sine daylight shape in `[0, 1]` for period `t` of a repeating day.
///
/// Zero outside `[sunrise_idx, sunset_idx)`.
pub fn daylight_frac(t: usize, steps_per_day: usize, sunrise_idx: usize, sunset_idx: usize) -> f64 {
    if steps_per_day == 0 || sunrise_idx >= sunset_idx {
        return 0.0;
    }
    let step = t % steps_per_day;
    if step < sunrise_idx || step >= sunset_idx {
        return 0.0;
    }
    let span = (sunset_idx - sunrise_idx) as f64;
    let x = (step - sunrise_idx) as f64 + 0.5;
    (std::f64::consts::PI * x / span).sin()
}

/// Solar-shaped generation with multiplicative noise.
#[derive(Debug, Clone, PartialEq)]
pub struct SolarProfile {
    /// Generation at the top of a clear day.
    pub peak: f64,
    pub steps_per_day: usize,
    /// First daylight period (inclusive).
    pub sunrise_idx: usize,
    /// First night period after daylight (exclusive).
    pub sunset_idx: usize,
    /// Relative noise standard deviation, e.g. `0.05` for about 5%.
    pub noise_std: f64,
}

impl SolarProfile {
    /// Generates `horizon` non-negative values, deterministic for a given `seed`.
    pub fn generate(&self, horizon: usize, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..horizon)
            .map(|t| {
                let frac = daylight_frac(t, self.steps_per_day, self.sunrise_idx, self.sunset_idx);
                if frac <= 0.0 {
                    return 0.0;
                }
                let noise = 1.0 + gaussian_noise(&mut rng, self.noise_std);
                (self.peak * frac * noise).max(0.0)
            })
            .collect()
    }
}
