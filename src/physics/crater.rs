use std::f64::consts::PI;

use crate::io::ImpactEvent;

pub const TARGET_DENSITY_KG_M3: f64 = 2500.0;
pub const SURFACE_GRAVITY: f64 = 9.81;
pub const JOULES_PER_MEGATON: f64 = 4.184e15;

const RIM_CENTER: f32 = 1.0;
const RIM_HALF_WIDTH: f32 = 0.15;
const RIM_SIGMA: f32 = 0.06;
const EJECTA_END: f32 = 2.5;
const EJECTA_TAPER_START: f32 = 2.0;
const EJECTA_DECAY: f32 = 3.0;
const EJECTA_FRACTION: f32 = 0.35;
const SEISMIC_START: f32 = 0.5;
const SEISMIC_END: f32 = 4.0;
const SEISMIC_WAVENUMBER: f32 = 2.0 * std::f32::consts::PI;
const SEISMIC_DECAY: f32 = 1.2;

/// Oscillatory ground motion around the crater. `amplitude` is in the same
/// units as the profile depth; zero once the ground has settled.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SeismicRinging {
    pub amplitude: f32,
    pub phase: f32,
}

impl SeismicRinging {
    pub const SETTLED: Self = Self { amplitude: 0.0, phase: 0.0 };
}

/// Vertical crater morphology as a function of normalized distance
/// (distance from the impact center divided by the crater radius).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CraterProfile {
    pub depth: f32,
    pub rim_height: f32,
    pub ejecta: bool,
    pub ringing: SeismicRinging,
}

impl CraterProfile {
    pub fn settled(depth: f32, rim_height: f32) -> Self {
        Self { depth, rim_height, ejecta: true, ringing: SeismicRinging::SETTLED }
    }

    /// Bowl and rim only, as shown on the close-up crater patch.
    pub fn bowl_and_rim(depth: f32, rim_height: f32) -> Self {
        Self { depth, rim_height, ejecta: false, ringing: SeismicRinging::SETTLED }
    }

    pub fn with_ringing(mut self, ringing: SeismicRinging) -> Self {
        self.ringing = ringing;
        self
    }

    /// Signed displacement; negative is excavation.
    #[inline]
    pub fn displacement(&self, normalized_distance: f32) -> f32 {
        let d = normalized_distance.max(0.0);
        let mut h = 0.0;

        if d < 1.0 {
            h -= self.depth * (1.0 - d * d);
        }

        if (d - RIM_CENTER).abs() <= RIM_HALF_WIDTH {
            let x = (d - RIM_CENTER) / RIM_SIGMA;
            h += self.rim_height * (-x * x).exp();
        }

        if self.ejecta && d > 1.0 && d < EJECTA_END {
            let taper = 1.0 - crate::timeline::smoothstep(EJECTA_TAPER_START, EJECTA_END, d);
            h += self.rim_height * EJECTA_FRACTION * (-(d - 1.0) * EJECTA_DECAY).exp() * taper;
        }

        if self.ringing.amplitude != 0.0 && d > SEISMIC_START && d < SEISMIC_END {
            let x = d - SEISMIC_START;
            h += self.ringing.amplitude
                * (-x * SEISMIC_DECAY).exp()
                * (x * SEISMIC_WAVENUMBER - self.ringing.phase).sin();
        }

        h
    }
}

/// Settled crater profile: parabolic bowl, Gaussian rim and ejecta blanket.
pub fn crater_profile(normalized_distance: f32, crater_depth: f32, rim_height: f32) -> f32 {
    CraterProfile::settled(crater_depth, rim_height).displacement(normalized_distance)
}

/// Physical crater size for a simple (bowl-shaped) crater, all lengths in km.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CraterDimensions {
    pub transient_diameter_km: f64,
    pub final_diameter_km: f64,
    pub depth_km: f64,
    pub rim_height_km: f64,
}

impl CraterDimensions {
    /// Pi-group scaling for the transient crater, then the simple-crater
    /// collapse relations for final diameter, depth and rim height.
    pub fn estimate(event: &ImpactEvent) -> Self {
        let l = event.diameter_km() * 1000.0;
        let v = event.velocity_kms() * 1000.0;
        let theta = event.impact_angle_deg().to_radians();

        let transient_m = 1.161
            * (event.density_kg_m3() / TARGET_DENSITY_KG_M3).powf(1.0 / 3.0)
            * l.powf(0.78)
            * v.powf(0.44)
            * SURFACE_GRAVITY.powf(-0.22)
            * theta.sin().max(0.0).powf(1.0 / 3.0);

        let transient = transient_m / 1000.0;
        let final_diameter = 1.25 * transient;
        let rim_height = if final_diameter > 0.0 {
            0.07 * transient.powi(4) / final_diameter.powi(3)
        } else {
            0.0
        };

        Self {
            transient_diameter_km: transient,
            final_diameter_km: final_diameter,
            depth_km: transient / (2.0 * 2f64.sqrt()),
            rim_height_km: rim_height,
        }
    }

    pub fn final_radius_km(&self) -> f64 {
        self.final_diameter_km / 2.0
    }
}

/// Kinetic energy of a spherical impactor.
pub fn kinetic_energy_joules(diameter_km: f64, velocity_kms: f64, density_kg_m3: f64) -> f64 {
    let d = diameter_km * 1000.0;
    let v = velocity_kms * 1000.0;
    let mass = density_kg_m3 * PI / 6.0 * d.powi(3);
    0.5 * mass * v * v
}

pub fn tnt_megatons(energy_j: f64) -> f64 {
    energy_j / JOULES_PER_MEGATON
}
