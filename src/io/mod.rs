use std::path::Path;

use anyhow::Context;
use bevy::log::info;
use bevy::math::Vec3;
use bevy::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::error::{non_negative, positive, ImpactError};
use crate::geo::{latlon_to_unit, LatLon};
use crate::layers::EffectsConfig;
use crate::physics::crater::kinetic_energy_joules;
use crate::render::QualityTier;

pub const DEFAULT_PRESSURE_THRESHOLDS_PSI: [f32; 3] = [20.0, 5.0, 1.0];
pub const DEFAULT_IMPACTOR_DENSITY: f64 = 3000.0; // kg/m^3, stony
pub const DEFAULT_IMPACT_ANGLE_DEG: f64 = 45.0;

/// One simulated impact. Validated on construction and read-only afterwards;
/// every layer borrows the same instance.
#[derive(Debug, Clone, PartialEq, Serialize, Resource)]
pub struct ImpactEvent {
    position: Vec3,
    energy_joules: f64,
    diameter_km: f64,
    velocity_kms: f64,
    pressure_psi_thresholds: Vec<f32>,
    density_kg_m3: f64,
    impact_angle_deg: f64,
}

impl ImpactEvent {
    pub fn new(
        position: Vec3,
        energy_joules: f64,
        diameter_km: f64,
        velocity_kms: f64,
    ) -> Result<Self, ImpactError> {
        if !position.is_finite() || position.length_squared() <= f32::EPSILON {
            return Err(ImpactError::DegeneratePosition);
        }

        Ok(Self {
            position: position.normalize(),
            energy_joules: non_negative("energy_joules", energy_joules)?,
            diameter_km: non_negative("diameter_km", diameter_km)?,
            velocity_kms: non_negative("velocity_kms", velocity_kms)?,
            pressure_psi_thresholds: DEFAULT_PRESSURE_THRESHOLDS_PSI.to_vec(),
            density_kg_m3: DEFAULT_IMPACTOR_DENSITY,
            impact_angle_deg: DEFAULT_IMPACT_ANGLE_DEG,
        })
    }

    /// Event whose energy is the kinetic energy of a spherical body.
    pub fn from_impactor(
        position: Vec3,
        diameter_km: f64,
        velocity_kms: f64,
        density_kg_m3: f64,
    ) -> Result<Self, ImpactError> {
        let density = positive("density_kg_m3", density_kg_m3)?;
        let energy = kinetic_energy_joules(
            non_negative("diameter_km", diameter_km)?,
            non_negative("velocity_kms", velocity_kms)?,
            density,
        );
        Ok(Self::new(position, energy, diameter_km, velocity_kms)?.with_density_unchecked(density))
    }

    pub fn with_pressure_thresholds(mut self, thresholds: Vec<f32>) -> Result<Self, ImpactError> {
        let ordered = !thresholds.is_empty()
            && thresholds.iter().all(|t| t.is_finite() && *t > 0.0)
            && thresholds.windows(2).all(|w| w[0] > w[1]);
        if !ordered {
            return Err(ImpactError::UnorderedThresholds(thresholds));
        }
        self.pressure_psi_thresholds = thresholds;
        Ok(self)
    }

    pub fn with_density(self, density_kg_m3: f64) -> Result<Self, ImpactError> {
        let density = positive("density_kg_m3", density_kg_m3)?;
        Ok(self.with_density_unchecked(density))
    }

    pub fn with_impact_angle(mut self, degrees: f64) -> Result<Self, ImpactError> {
        if !(degrees.is_finite() && degrees > 0.0 && degrees <= 90.0) {
            return Err(ImpactError::NonPositiveQuantity { name: "impact_angle_deg", value: degrees });
        }
        self.impact_angle_deg = degrees;
        Ok(self)
    }

    fn with_density_unchecked(mut self, density: f64) -> Self {
        self.density_kg_m3 = density;
        self
    }

    /// Unit vector from the globe center to the impact point.
    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn energy_joules(&self) -> f64 {
        self.energy_joules
    }

    pub fn diameter_km(&self) -> f64 {
        self.diameter_km
    }

    pub fn velocity_kms(&self) -> f64 {
        self.velocity_kms
    }

    /// Severity band edges in psi, strictly descending.
    pub fn pressure_psi_thresholds(&self) -> &[f32] {
        &self.pressure_psi_thresholds
    }

    pub fn density_kg_m3(&self) -> f64 {
        self.density_kg_m3
    }

    pub fn impact_angle_deg(&self) -> f64 {
        self.impact_angle_deg
    }
}

fn default_thresholds() -> Vec<f32> {
    DEFAULT_PRESSURE_THRESHOLDS_PSI.to_vec()
}

fn default_density() -> f64 {
    DEFAULT_IMPACTOR_DENSITY
}

fn default_angle() -> f64 {
    DEFAULT_IMPACT_ANGLE_DEG
}

/// On-disk description of a scenario. Energy is derived from the impactor
/// when `energy_joules` is omitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioFile {
    pub name: String,
    pub impact: LatLon,
    pub diameter_km: f64,
    pub velocity_kms: f64,
    #[serde(default)]
    pub energy_joules: Option<f64>,
    #[serde(default = "default_density")]
    pub density_kg_m3: f64,
    #[serde(default = "default_angle")]
    pub impact_angle_deg: f64,
    #[serde(default = "default_thresholds")]
    pub pressure_psi_thresholds: Vec<f32>,
    #[serde(default)]
    pub quality: QualityTier,
    #[serde(default)]
    pub effects: EffectsConfig,
}

/// A loaded, validated scenario ready to hand to the effect stack.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub name: String,
    pub event: ImpactEvent,
    pub quality: QualityTier,
    pub effects: EffectsConfig,
}

impl TryFrom<ScenarioFile> for Scenario {
    type Error = ImpactError;

    fn try_from(file: ScenarioFile) -> Result<Self, Self::Error> {
        let position = latlon_to_unit(file.impact);
        let event = match file.energy_joules {
            Some(energy) => ImpactEvent::new(position, energy, file.diameter_km, file.velocity_kms)?
                .with_density(file.density_kg_m3)?,
            None => ImpactEvent::from_impactor(
                position,
                file.diameter_km,
                file.velocity_kms,
                file.density_kg_m3,
            )?,
        }
        .with_impact_angle(file.impact_angle_deg)?
        .with_pressure_thresholds(file.pressure_psi_thresholds)?;

        Ok(Scenario {
            name: file.name,
            event,
            quality: file.quality,
            effects: file.effects,
        })
    }
}

pub fn parse_scenario(json: &str) -> anyhow::Result<Scenario> {
    let file: ScenarioFile = serde_json::from_str(json).context("malformed scenario JSON")?;
    let name = file.name.clone();
    Scenario::try_from(file).with_context(|| format!("invalid scenario {name:?}"))
}

pub fn load_scenario_from_json(path: impl AsRef<Path>) -> anyhow::Result<Scenario> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to open {:?}", path))?;
    let scenario = parse_scenario(&json)?;
    info!(
        "Loaded scenario {:?}: {:.3e} J, {} km at {} km/s",
        scenario.name,
        scenario.event.energy_joules(),
        scenario.event.diameter_km(),
        scenario.event.velocity_kms()
    );
    Ok(scenario)
}
