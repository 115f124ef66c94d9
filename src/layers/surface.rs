use std::f32::consts::FRAC_PI_2;

use bevy::color::LinearRgba;
use serde::{Deserialize, Serialize};

use crate::error::{positive, ImpactError};
use crate::geo::{great_circle_distance, EARTH_RADIUS_KM};
use crate::io::ImpactEvent;
use crate::physics::crater::{CraterDimensions, CraterProfile, SeismicRinging};
use crate::physics::thermal::{blackbody_color, mix, with_alpha};
use crate::timeline::{eased_progress, smoothstep, Timeline};

use super::{EffectLayer, EffectOutput, LayerConfig, LayerKind, SurfaceSample};

pub(crate) const SCORCHED_ROCK: LinearRgba = LinearRgba { red: 0.09, green: 0.07, blue: 0.05, alpha: 1.0 };
const COOL_SURFACE_K: f32 = 300.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceSettings {
    pub layer: LayerConfig,
    pub simulated_duration_s: f64,
    pub earth_radius_km: f64,
    /// Scale on the crater radius so a kilometre-scale crater reads on a globe.
    pub horizontal_exaggeration: f64,
    pub vertical_exaggeration: f64,
    pub ease_exponent: f32,
    /// Initial seismic amplitude as a fraction of the crater depth.
    pub ringing_fraction: f32,
    /// Seismic phase speed in radians per simulated second.
    pub ringing_angular_frequency: f32,
    pub melt_temperature_k: f32,
}

impl Default for SurfaceSettings {
    fn default() -> Self {
        Self {
            layer: LayerConfig { delay: 0.25, end: 1.0, earth_radius_scene: 1.0 },
            simulated_duration_s: 60.0,
            earth_radius_km: EARTH_RADIUS_KM,
            horizontal_exaggeration: 40.0,
            vertical_exaggeration: 40.0,
            ease_exponent: 0.6,
            ringing_fraction: 0.08,
            ringing_angular_frequency: 1.5,
            melt_temperature_k: 3500.0,
        }
    }
}

/// Crater size expressed on the displayed globe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CraterScale {
    pub angular_radius: f32,
    pub depth_scene: f32,
    pub rim_height_scene: f32,
}

impl CraterScale {
    pub fn from_event(
        event: &ImpactEvent,
        earth_radius_km: f64,
        earth_radius_scene: f32,
        horizontal_exaggeration: f64,
        vertical_exaggeration: f64,
    ) -> Self {
        let dims = CraterDimensions::estimate(event);
        let km_to_scene = earth_radius_scene as f64 / earth_radius_km;
        Self {
            angular_radius: ((dims.final_radius_km() * horizontal_exaggeration / earth_radius_km) as f32)
                .clamp(0.0, FRAC_PI_2),
            depth_scene: (dims.depth_km * vertical_exaggeration * km_to_scene) as f32,
            rim_height_scene: (dims.rim_height_km * vertical_exaggeration * km_to_scene) as f32,
        }
    }

    /// Crater radius as a length on the globe surface.
    pub fn radius_scene(&self, earth_radius_scene: f32) -> f32 {
        self.angular_radius * earth_radius_scene
    }

    #[inline]
    pub fn normalized_distance(&self, angle_from_impact: f32) -> f32 {
        if self.angular_radius > 0.0 {
            angle_from_impact / self.angular_radius
        } else {
            f32::INFINITY
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceFrame {
    pub local_progress: f32,
    pub growth: f32,
    pub crater: CraterScale,
    pub ringing: SeismicRinging,
}

/// Crater bowl, rim, ejecta blanket and seismic ringing written into the
/// planet surface itself.
#[derive(Debug, Clone)]
pub struct SurfaceIntegrationLayer {
    settings: SurfaceSettings,
    timeline: Timeline,
}

impl SurfaceIntegrationLayer {
    pub fn new(settings: SurfaceSettings) -> Result<Self, ImpactError> {
        settings.layer.validate()?;
        positive("simulated_duration_s", settings.simulated_duration_s)?;
        positive("earth_radius_km", settings.earth_radius_km)?;
        positive("horizontal_exaggeration", settings.horizontal_exaggeration)?;
        positive("vertical_exaggeration", settings.vertical_exaggeration)?;
        positive("ease_exponent", settings.ease_exponent as f64)?;
        let timeline = settings.layer.timeline();
        Ok(Self { settings, timeline })
    }

    pub fn settings(&self) -> &SurfaceSettings {
        &self.settings
    }

    pub fn crater_scale(&self, event: &ImpactEvent) -> CraterScale {
        let s = &self.settings;
        CraterScale::from_event(
            event,
            s.earth_radius_km,
            s.layer.earth_radius_scene,
            s.horizontal_exaggeration,
            s.vertical_exaggeration,
        )
    }

    fn surface_color(&self, frame: &SurfaceFrame, d: f32) -> LinearRgba {
        if d < 1.0 {
            let core = 1.0 - d * d;
            let glow = (1.0 - frame.local_progress) * core;
            let temperature = COOL_SURFACE_K + (self.settings.melt_temperature_k - COOL_SURFACE_K) * glow;
            let color = mix(SCORCHED_ROCK, blackbody_color(temperature), glow);
            with_alpha(color, frame.growth * (0.35 + 0.55 * core))
        } else if d < 2.5 {
            let blanket = (-(d - 1.0) * 3.0).exp() * (1.0 - smoothstep(2.0, 2.5, d));
            with_alpha(SCORCHED_ROCK, 0.55 * frame.growth * blanket)
        } else {
            LinearRgba::NONE
        }
    }
}

impl EffectLayer for SurfaceIntegrationLayer {
    type Frame = SurfaceFrame;

    fn kind(&self) -> LayerKind {
        LayerKind::SurfaceIntegration
    }

    fn config(&self) -> &LayerConfig {
        &self.settings.layer
    }

    fn frame(&self, progress: f32, event: &ImpactEvent) -> Option<SurfaceFrame> {
        if !self.timeline.is_active(progress) {
            return None;
        }
        let s = &self.settings;
        let local = self.timeline.local(progress);
        let crater = self.crater_scale(event);
        let elapsed_s = local * s.simulated_duration_s as f32;

        Some(SurfaceFrame {
            local_progress: local,
            growth: eased_progress(local, s.ease_exponent),
            crater,
            ringing: SeismicRinging {
                amplitude: crater.depth_scene * s.ringing_fraction * (1.0 - local),
                phase: elapsed_s * s.ringing_angular_frequency,
            },
        })
    }

    fn shade(&self, frame: &SurfaceFrame, sample: &SurfaceSample, event: &ImpactEvent) -> EffectOutput {
        let angle = great_circle_distance(sample.position, event.position());
        let d = frame.crater.normalized_distance(angle);

        let profile = CraterProfile::settled(
            frame.crater.depth_scene * frame.growth,
            frame.crater.rim_height_scene * frame.growth,
        )
        .with_ringing(frame.ringing);

        EffectOutput::new(profile.displacement(d), self.surface_color(frame, d))
    }
}
