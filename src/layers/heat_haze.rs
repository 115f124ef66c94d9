use bevy::color::LinearRgba;
use bevy::math::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::{positive, ImpactError};
use crate::io::ImpactEvent;
use crate::physics::thermal::{blackbody_color, with_alpha};
use crate::timeline::{smoothstep, Timeline};

use super::{EffectLayer, EffectOutput, LayerConfig, LayerKind, SurfaceSample};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeatHazeSettings {
    /// The atmospheric entry window; the body strikes at `layer.end`.
    pub layer: LayerConfig,
    pub reference_velocity_kms: f64,
    pub base_temperature_k: f32,
    pub temperature_span_k: f32,
    pub emissive_gain: f32,
    pub max_emissive: f32,
    pub haze_gain: f32,
    pub max_haze_alpha: f32,
    pub fade_start: f32,
    /// Starting altitude of the body, in globe radii.
    pub entry_altitude: f32,
    /// Heat shimmer displacement on the haze billboard, in billboard units.
    pub shimmer: f32,
}

impl Default for HeatHazeSettings {
    fn default() -> Self {
        Self {
            layer: LayerConfig { delay: 0.0, end: 0.25, earth_radius_scene: 1.0 },
            reference_velocity_kms: 20.0,
            base_temperature_k: 300.0,
            temperature_span_k: 6000.0,
            emissive_gain: 3.0,
            max_emissive: 4.0,
            haze_gain: 0.6,
            max_haze_alpha: 0.6,
            fade_start: 0.9,
            entry_altitude: 0.6,
            shimmer: 0.02,
        }
    }
}

/// Entry heating of the falling body for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeatState {
    pub atmosphere_progress: f32,
    pub heat_intensity: f32,
    pub temperature_k: f32,
    /// Emissive color for the body's material, strength already clamped.
    pub emissive: LinearRgba,
    pub haze_alpha: f32,
}

/// Glow on the falling body and the translucent haze around it. Keyed to
/// velocity and entry progress only; the impact point plays no part.
#[derive(Debug, Clone)]
pub struct HeatHazeLayer {
    settings: HeatHazeSettings,
    timeline: Timeline,
}

impl HeatHazeLayer {
    pub fn new(settings: HeatHazeSettings) -> Result<Self, ImpactError> {
        settings.layer.validate()?;
        positive("reference_velocity_kms", settings.reference_velocity_kms)?;
        positive("max_emissive", settings.max_emissive as f64)?;
        let timeline = settings.layer.timeline();
        Ok(Self { settings, timeline })
    }

    pub fn settings(&self) -> &HeatHazeSettings {
        &self.settings
    }

    pub fn atmosphere_progress(&self, progress: f32) -> f32 {
        self.timeline.local(progress)
    }

    pub fn heat_state(&self, velocity_kms: f64, atmosphere_progress: f32) -> HeatState {
        let s = &self.settings;
        let atmosphere_progress = atmosphere_progress.clamp(0.0, 1.0);
        let ratio = (velocity_kms.max(0.0) / s.reference_velocity_kms) as f32;
        let heat_intensity = atmosphere_progress * ratio;
        let temperature_k = s.base_temperature_k + heat_intensity * s.temperature_span_k;

        let glow = blackbody_color(temperature_k);
        let strength = (heat_intensity * s.emissive_gain).clamp(0.0, s.max_emissive);

        HeatState {
            atmosphere_progress,
            heat_intensity,
            temperature_k,
            emissive: LinearRgba::new(glow.red * strength, glow.green * strength, glow.blue * strength, 1.0),
            haze_alpha: (heat_intensity * s.haze_gain).clamp(0.0, s.max_haze_alpha),
        }
    }

    /// Height of the body above the surface during entry, in scene units.
    pub fn entry_altitude(&self, atmosphere_progress: f32) -> f32 {
        self.settings.entry_altitude * (1.0 - atmosphere_progress.clamp(0.0, 1.0)) * self.settings.layer.earth_radius_scene
    }

    /// Scene position of the falling body, descending along the impact normal.
    pub fn body_position(&self, progress: f32, event: &ImpactEvent) -> Vec3 {
        let altitude = self.entry_altitude(self.atmosphere_progress(progress));
        event.position() * (self.settings.layer.earth_radius_scene + altitude)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeatFrame {
    pub state: HeatState,
    pub fade: f32,
}

impl EffectLayer for HeatHazeLayer {
    type Frame = HeatFrame;

    fn kind(&self) -> LayerKind {
        LayerKind::HeatHaze
    }

    fn config(&self) -> &LayerConfig {
        &self.settings.layer
    }

    fn frame(&self, progress: f32, event: &ImpactEvent) -> Option<HeatFrame> {
        if !self.timeline.is_active(progress) {
            return None;
        }
        let state = self.heat_state(event.velocity_kms(), self.atmosphere_progress(progress));
        if state.heat_intensity <= 0.0 {
            return None;
        }
        Some(HeatFrame {
            state,
            fade: 1.0 - smoothstep(self.settings.fade_start, 1.0, state.atmosphere_progress),
        })
    }

    /// Samples are billboard-local: the haze disc spans radius 1 in the XY plane.
    fn shade(&self, frame: &HeatFrame, sample: &SurfaceSample, _event: &ImpactEvent) -> EffectOutput {
        let state = &frame.state;
        let r = sample.position.x.hypot(sample.position.y);
        let falloff = 1.0 - smoothstep(0.25, 1.0, r);
        let alpha = state.haze_alpha * falloff * frame.fade;

        let ripple = (r * 24.0 - state.atmosphere_progress * 60.0).sin();
        let displacement = self.settings.shimmer * state.heat_intensity.min(1.0) * ripple * falloff;

        EffectOutput::new(displacement, with_alpha(blackbody_color(state.temperature_k), alpha))
    }
}
