use serde::{Deserialize, Serialize};

use crate::error::{positive, ImpactError};
use crate::geo::{great_circle_distance, EARTH_RADIUS_KM};
use crate::io::ImpactEvent;
use crate::physics::blast::{temperature_ratio, AMBIENT_TEMPERATURE_K, GAMMA_AIR, SPEED_OF_SOUND};
use crate::physics::thermal::{blackbody_color, with_alpha};
use crate::timeline::Timeline;

use super::{cutoff_fade, pole_fade, BlastFront, EffectLayer, EffectOutput, LayerConfig, LayerKind, SurfaceSample};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShockwaveSettings {
    pub layer: LayerConfig,
    /// Simulated seconds covered by the layer's local progress.
    pub simulated_duration_s: f64,
    /// Scale from physical blast radius to displayed radius on the globe.
    pub display_exaggeration: f64,
    pub earth_radius_km: f64,
    pub decay_k: f32,
    /// Global progress at which the front has dissipated.
    pub cutoff_progress: f32,
    /// Fraction of the span before the cutoff at which the end-of-life fade begins.
    pub fade_start: f32,
    /// Peak inward displacement as a fraction of the globe radius.
    pub compression: f32,
    pub max_temperature_k: f32,
}

impl Default for ShockwaveSettings {
    fn default() -> Self {
        Self {
            layer: LayerConfig { delay: 0.25, end: 1.0, earth_radius_scene: 1.0 },
            simulated_duration_s: 60.0,
            display_exaggeration: 1000.0,
            earth_radius_km: EARTH_RADIUS_KM,
            decay_k: 40.0,
            cutoff_progress: 0.98,
            fade_start: 0.85,
            compression: 0.004,
            max_temperature_k: 12_000.0,
        }
    }
}

/// Uniforms for one shockwave frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShockFrame {
    pub local_progress: f32,
    pub front: BlastFront,
    pub temperature_k: f32,
    pub fade: f32,
}

/// Luminous blast front expanding from the impact point, colored by the
/// post-shock temperature.
#[derive(Debug, Clone)]
pub struct ShockwaveLayer {
    settings: ShockwaveSettings,
    timeline: Timeline,
}

impl ShockwaveLayer {
    pub fn new(settings: ShockwaveSettings) -> Result<Self, ImpactError> {
        settings.layer.validate()?;
        positive("simulated_duration_s", settings.simulated_duration_s)?;
        positive("display_exaggeration", settings.display_exaggeration)?;
        positive("earth_radius_km", settings.earth_radius_km)?;
        positive("decay_k", settings.decay_k as f64)?;
        let timeline = settings.layer.timeline();
        Ok(Self { settings, timeline })
    }

    pub fn settings(&self) -> &ShockwaveSettings {
        &self.settings
    }

    /// Displayed front radius (radians) at `progress`, if the front is visible.
    pub fn angular_radius(&self, progress: f32, event: &ImpactEvent) -> Option<f32> {
        self.frame(progress, event).map(|f| f.front.angular_radius)
    }
}

impl EffectLayer for ShockwaveLayer {
    type Frame = ShockFrame;

    fn kind(&self) -> LayerKind {
        LayerKind::Shockwave
    }

    fn config(&self) -> &LayerConfig {
        &self.settings.layer
    }

    fn frame(&self, progress: f32, event: &ImpactEvent) -> Option<ShockFrame> {
        let s = &self.settings;
        if progress >= s.cutoff_progress || !self.timeline.is_active(progress) {
            return None;
        }
        let local = self.timeline.local(progress);

        let front = BlastFront::at(
            event.energy_joules(),
            local,
            s.simulated_duration_s,
            s.display_exaggeration,
            s.earth_radius_km,
        );
        let mach = front.velocity_ms / SPEED_OF_SOUND;
        let temperature = (AMBIENT_TEMPERATURE_K * temperature_ratio(mach, GAMMA_AIR)) as f32;

        Some(ShockFrame {
            local_progress: local,
            front,
            temperature_k: temperature.min(s.max_temperature_k),
            fade: cutoff_fade(&self.timeline, s.fade_start, s.cutoff_progress, local),
        })
    }

    fn shade(&self, frame: &ShockFrame, sample: &SurfaceSample, event: &ImpactEvent) -> EffectOutput {
        let s = &self.settings;
        let angle = great_circle_distance(sample.position, event.position());
        let intensity = frame.front.intensity(angle, s.decay_k);
        let weight = intensity * pole_fade(angle, 0.02, 0.3) * frame.fade;

        let ambient = AMBIENT_TEMPERATURE_K as f32;
        let temperature = ambient + (frame.temperature_k - ambient) * intensity;

        EffectOutput::new(
            -weight * s.compression * s.layer.earth_radius_scene,
            with_alpha(blackbody_color(temperature), weight),
        )
    }
}
