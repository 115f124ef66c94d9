// Point-source blast in a uniform atmosphere: Sedov-Taylor growth of the front
// and the Rankine-Hugoniot jump across it.

pub const SEA_LEVEL_AIR_DENSITY: f64 = 1.225; // kg/m^3
pub const SEDOV_XI: f64 = 1.03; // dimensionless, gamma = 1.4
pub const GAMMA_AIR: f64 = 1.4;
pub const SPEED_OF_SOUND: f64 = 343.0; // m/s at 20 C
pub const AMBIENT_TEMPERATURE_K: f64 = 288.15;
pub const PASCALS_PER_PSI: f64 = 6894.757;

/// Floor applied to blast times; `t = 0` would make the front velocity infinite.
pub const MIN_BLAST_TIME_S: f64 = 1e-3;

/// Blast radius in meters, `R = xi * (E t^2 / rho)^(1/5)`.
pub fn sedov_taylor_radius(energy_j: f64, time_s: f64, air_density: f64, xi: f64) -> f64 {
    let t = time_s.max(MIN_BLAST_TIME_S);
    let e = energy_j.max(0.0);
    xi * (e * t * t / air_density).powf(0.2)
}

/// Front velocity in m/s, the time derivative of the Sedov-Taylor radius (`dR/dt = 0.4 R / t`).
pub fn shock_front_velocity(radius_m: f64, time_s: f64) -> f64 {
    0.4 * radius_m / time_s.max(MIN_BLAST_TIME_S)
}

/// Overpressure behind a strong shock, in Pascals.
pub fn rankine_hugoniot_overpressure(shock_velocity_ms: f64, air_density: f64, gamma: f64) -> f64 {
    air_density * shock_velocity_ms * shock_velocity_ms * (2.0 * gamma / (gamma + 1.0))
}

/// Post-shock to ambient density ratio. Subsonic inputs are floored to Mach 1.
pub fn density_ratio(mach: f64, gamma: f64) -> f64 {
    let m2 = mach.max(1.0).powi(2);
    (2.0 * gamma * m2) / ((gamma - 1.0) * m2 + 2.0)
}

/// Post-shock to ambient static pressure ratio. Subsonic inputs are floored to Mach 1.
pub fn pressure_ratio(mach: f64, gamma: f64) -> f64 {
    let m2 = mach.max(1.0).powi(2);
    1.0 + (2.0 * gamma / (gamma + 1.0)) * (m2 - 1.0)
}

/// Post-shock to ambient temperature ratio for an ideal gas, 1 at Mach 1.
pub fn temperature_ratio(mach: f64, gamma: f64) -> f64 {
    let m2 = mach.max(1.0).powi(2);
    (2.0 * gamma * m2 - (gamma - 1.0)) * ((gamma - 1.0) * m2 + 2.0) / ((gamma + 1.0).powi(2) * m2)
}

pub fn pascals_to_psi(pa: f64) -> f64 {
    pa / PASCALS_PER_PSI
}
