//! Effect layers evaluated every frame over the samples of a mesh.
//!
//! Every layer follows the same two-step shape: `frame` turns the shared
//! `(progress, ImpactEvent)` into the handful of uniforms the layer needs, or
//! `None` when the layer is invisible; `shade` then maps one sample to one
//! `EffectOutput` using only those uniforms. Samples never see each other.

pub mod crater_mesh;
pub mod heat_haze;
pub mod pressure;
pub mod shockwave;
pub mod surface;

use std::f32::consts::PI;

use bevy::color::LinearRgba;
use bevy::log::debug;
use bevy::math::Vec3;
use bevy::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::error::{positive, ImpactError};
use crate::io::ImpactEvent;
use crate::physics::blast::{
    sedov_taylor_radius, shock_front_velocity, MIN_BLAST_TIME_S, SEA_LEVEL_AIR_DENSITY, SEDOV_XI,
};
use crate::timeline::{smoothstep, Timeline};

pub use crater_mesh::{CraterMeshLayer, CraterMeshSettings};
pub use heat_haze::{HeatHazeLayer, HeatHazeSettings, HeatState};
pub use pressure::{PressureWaveLayer, PressureWaveSettings};
pub use shockwave::{ShockwaveLayer, ShockwaveSettings};
pub use surface::{SurfaceIntegrationLayer, SurfaceSettings};

/// A point handed over by the mesh being deformed. For the globe layers
/// `position` is on (or near) the sphere; for the crater patch and the haze
/// billboard it is in the patch's local frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceSample {
    pub position: Vec3,
    pub normal: Vec3,
}

impl SurfaceSample {
    pub fn new(position: Vec3, normal: Vec3) -> Self {
        Self { position, normal }
    }

    /// Sample on a sphere centered at the origin.
    pub fn on_sphere(position: Vec3) -> Self {
        Self { position, normal: position.normalize_or_zero() }
    }
}

/// Displacement along the sample normal (scene units) plus an RGBA overlay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectOutput {
    pub displacement: f32,
    pub color: LinearRgba,
}

impl Default for EffectOutput {
    fn default() -> Self {
        Self::NONE
    }
}

impl EffectOutput {
    /// No displacement, fully transparent.
    pub const NONE: Self = Self { displacement: 0.0, color: LinearRgba::NONE };

    pub fn new(displacement: f32, color: LinearRgba) -> Self {
        Self { displacement, color }
    }

    pub fn is_finite(&self) -> bool {
        self.displacement.is_finite()
            && self.color.red.is_finite()
            && self.color.green.is_finite()
            && self.color.blue.is_finite()
            && self.color.alpha.is_finite()
    }

    /// Replaces any non-finite output with `NONE` so a numeric anomaly can
    /// never reach the vertex buffer.
    #[inline]
    pub fn sanitized(self) -> Self {
        if self.is_finite() { self } else { Self::NONE }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerKind {
    Shockwave,
    PressureWave,
    SurfaceIntegration,
    CraterMesh,
    HeatHaze,
}

impl LayerKind {
    pub const ALL: [LayerKind; 5] = [
        LayerKind::Shockwave,
        LayerKind::PressureWave,
        LayerKind::SurfaceIntegration,
        LayerKind::CraterMesh,
        LayerKind::HeatHaze,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            LayerKind::Shockwave => "Shockwave",
            LayerKind::PressureWave => "Pressure wave",
            LayerKind::SurfaceIntegration => "Crater & ejecta",
            LayerKind::CraterMesh => "Crater close-up",
            LayerKind::HeatHaze => "Entry heating",
        }
    }
}

/// Per-layer constants shared by every layer: where it sits on the timeline
/// and how large the globe is in scene units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayerConfig {
    pub delay: f32,
    #[serde(default = "default_end")]
    pub end: f32,
    #[serde(default = "default_radius")]
    pub earth_radius_scene: f32,
}

fn default_end() -> f32 {
    1.0
}

fn default_radius() -> f32 {
    1.0
}

impl LayerConfig {
    pub fn new(delay: f32, earth_radius_scene: f32) -> Result<Self, ImpactError> {
        Self::window(delay, 1.0, earth_radius_scene)
    }

    pub fn window(delay: f32, end: f32, earth_radius_scene: f32) -> Result<Self, ImpactError> {
        let config = Self { delay, end, earth_radius_scene };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ImpactError> {
        let ordered = self.delay.is_finite()
            && self.end.is_finite()
            && self.delay >= 0.0
            && self.delay < self.end
            && self.end <= 1.0;
        if !ordered {
            return Err(ImpactError::InvalidWindow { delay: self.delay, end: self.end });
        }
        positive("earth_radius_scene", self.earth_radius_scene as f64)?;
        Ok(())
    }

    pub fn timeline(&self) -> Timeline {
        Timeline::window(self.delay, self.end)
    }
}

/// One visual effect driven by the shared progress value.
pub trait EffectLayer {
    /// Uniforms computed once per frame and shared by every sample.
    type Frame: Copy;

    fn kind(&self) -> LayerKind;

    fn config(&self) -> &LayerConfig;

    /// `None` when the layer shows nothing at this progress.
    fn frame(&self, progress: f32, event: &ImpactEvent) -> Option<Self::Frame>;

    fn shade(&self, frame: &Self::Frame, sample: &SurfaceSample, event: &ImpactEvent) -> EffectOutput;

    fn is_visible(&self, progress: f32, event: &ImpactEvent) -> bool {
        self.frame(progress, event).is_some()
    }

    fn evaluate(&self, sample: &SurfaceSample, progress: f32, event: &ImpactEvent) -> EffectOutput {
        match self.frame(progress, event) {
            Some(frame) => self.shade(&frame, sample, event).sanitized(),
            None => EffectOutput::NONE,
        }
    }

    /// Evaluates every sample into `out` (paired by index) without allocating.
    /// Returns the layer's visibility for this frame.
    fn evaluate_batch(
        &self,
        samples: &[SurfaceSample],
        progress: f32,
        event: &ImpactEvent,
        out: &mut [EffectOutput],
    ) -> bool {
        let Some(frame) = self.frame(progress, event) else {
            out.fill(EffectOutput::NONE);
            return false;
        };

        let mut anomalies = 0usize;
        for (slot, sample) in out.iter_mut().zip(samples) {
            let shaded = self.shade(&frame, sample, event);
            if !shaded.is_finite() {
                anomalies += 1;
            }
            *slot = shaded.sanitized();
        }
        if anomalies > 0 {
            debug!("{}: {} non-finite samples zeroed at progress {:.3}", self.kind().label(), anomalies, progress);
        }
        true
    }
}

/// Blast front state at one instant, shared by the shockwave and pressure layers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlastFront {
    pub time_s: f64,
    pub radius_m: f64,
    pub velocity_ms: f64,
    /// Displayed front position as an angle from the impact point.
    pub angular_radius: f32,
}

impl BlastFront {
    pub fn at(
        energy_j: f64,
        local_progress: f32,
        simulated_duration_s: f64,
        display_exaggeration: f64,
        earth_radius_km: f64,
    ) -> Self {
        let time_s = (local_progress as f64 * simulated_duration_s).max(MIN_BLAST_TIME_S);
        let radius_m = sedov_taylor_radius(energy_j, time_s, SEA_LEVEL_AIR_DENSITY, SEDOV_XI);
        let angular = radius_m / 1000.0 * display_exaggeration / earth_radius_km;
        Self {
            time_s,
            radius_m,
            velocity_ms: shock_front_velocity(radius_m, time_s),
            angular_radius: (angular as f32).clamp(0.0, PI),
        }
    }

    /// `exp(-|angle - front| * k)`: 1 on the front, decaying on both sides.
    /// Larger `k` gives a thinner front.
    #[inline]
    pub fn intensity(&self, angle_from_impact: f32, decay_k: f32) -> f32 {
        (-(angle_from_impact - self.angular_radius).abs() * decay_k).exp()
    }
}

/// Fades an overlay out at the impact point and at its antipode so the ring
/// never collapses into a hard dot at either pole of the expansion.
#[inline]
pub fn pole_fade(angle_from_impact: f32, center_width: f32, antipode_width: f32) -> f32 {
    smoothstep(0.0, center_width, angle_from_impact)
        * (1.0 - smoothstep(PI - antipode_width, PI, angle_from_impact))
}

/// End-of-life fade for a layer cut off at `cutoff_progress`. It reaches 0 at
/// the local progress the cutoff maps to, so the layer never pops out.
/// `fade_start` is a fraction of that span.
#[inline]
pub(crate) fn cutoff_fade(timeline: &Timeline, fade_start: f32, cutoff_progress: f32, local: f32) -> f32 {
    let end_local = timeline.local(cutoff_progress.min(1.0));
    1.0 - smoothstep(fade_start * end_local, end_local, local)
}

/// Visibility of every layer for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LayerVisibility {
    pub shockwave: bool,
    pub pressure_wave: bool,
    pub surface: bool,
    pub crater_mesh: bool,
    pub heat_haze: bool,
}

impl LayerVisibility {
    pub fn get(&self, kind: LayerKind) -> bool {
        match kind {
            LayerKind::Shockwave => self.shockwave,
            LayerKind::PressureWave => self.pressure_wave,
            LayerKind::SurfaceIntegration => self.surface,
            LayerKind::CraterMesh => self.crater_mesh,
            LayerKind::HeatHaze => self.heat_haze,
        }
    }

    pub fn any(&self) -> bool {
        LayerKind::ALL.iter().any(|k| self.get(*k))
    }
}

/// Settings for every layer, loadable from a scenario file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, Resource)]
#[serde(default)]
pub struct EffectsConfig {
    pub shockwave: ShockwaveSettings,
    pub pressure_wave: PressureWaveSettings,
    pub surface: SurfaceSettings,
    pub crater_mesh: CraterMeshSettings,
    pub heat_haze: HeatHazeSettings,
}

impl EffectsConfig {
    /// Same config with every layer rescaled to a globe of `radius` scene units.
    pub fn with_earth_radius_scene(mut self, radius: f32) -> Self {
        self.shockwave.layer.earth_radius_scene = radius;
        self.pressure_wave.layer.earth_radius_scene = radius;
        self.surface.layer.earth_radius_scene = radius;
        self.crater_mesh.layer.earth_radius_scene = radius;
        self.heat_haze.layer.earth_radius_scene = radius;
        self
    }
}

/// The full effect stack for one scenario, one layer of each kind.
#[derive(Debug, Clone, Resource)]
pub struct ImpactEffects {
    pub shockwave: ShockwaveLayer,
    pub pressure_wave: PressureWaveLayer,
    pub surface: SurfaceIntegrationLayer,
    pub crater_mesh: CraterMeshLayer,
    pub heat_haze: HeatHazeLayer,
}

impl ImpactEffects {
    pub fn new(config: &EffectsConfig) -> Result<Self, ImpactError> {
        Ok(Self {
            shockwave: ShockwaveLayer::new(config.shockwave.clone())?,
            pressure_wave: PressureWaveLayer::new(config.pressure_wave.clone())?,
            surface: SurfaceIntegrationLayer::new(config.surface.clone())?,
            crater_mesh: CraterMeshLayer::new(config.crater_mesh.clone())?,
            heat_haze: HeatHazeLayer::new(config.heat_haze.clone())?,
        })
    }

    pub fn visibility(&self, progress: f32, event: &ImpactEvent) -> LayerVisibility {
        LayerVisibility {
            shockwave: self.shockwave.is_visible(progress, event),
            pressure_wave: self.pressure_wave.is_visible(progress, event),
            surface: self.surface.is_visible(progress, event),
            crater_mesh: self.crater_mesh.is_visible(progress, event),
            heat_haze: self.heat_haze.is_visible(progress, event),
        }
    }
}
