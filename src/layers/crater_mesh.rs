use bevy::color::LinearRgba;
use bevy::math::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::{positive, ImpactError};
use crate::geo::{surface_orientation, EARTH_RADIUS_KM};
use crate::io::ImpactEvent;
use crate::physics::crater::CraterProfile;
use crate::physics::thermal::{blackbody_color, mix, with_alpha};
use crate::timeline::{eased_progress, smoothstep, Timeline};

use super::surface::{CraterScale, SCORCHED_ROCK};
use super::{EffectLayer, EffectOutput, LayerConfig, LayerKind, SurfaceSample};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CraterMeshSettings {
    pub layer: LayerConfig,
    pub earth_radius_km: f64,
    pub horizontal_exaggeration: f64,
    pub vertical_exaggeration: f64,
    pub ease_exponent: f32,
    /// Fraction of the window over which the bowl is excavated.
    pub excavation_fraction: f32,
    pub fade_start: f32,
    /// Patch half-width in crater radii.
    pub patch_extent: f32,
    pub melt_temperature_k: f32,
}

impl Default for CraterMeshSettings {
    fn default() -> Self {
        Self {
            layer: LayerConfig { delay: 0.32, end: 0.95, earth_radius_scene: 1.0 },
            earth_radius_km: EARTH_RADIUS_KM,
            horizontal_exaggeration: 40.0,
            vertical_exaggeration: 40.0,
            ease_exponent: 0.6,
            excavation_fraction: 0.4,
            fade_start: 0.8,
            patch_extent: 1.6,
            melt_temperature_k: 3500.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CraterMeshFrame {
    pub local_progress: f32,
    pub growth: f32,
    pub fade: f32,
    pub crater: CraterScale,
    pub radius_scene: f32,
}

/// Close-up crater patch: a flat grid in its own frame (+Y up, crater
/// centered at the origin) placed tangent to the globe at the impact point.
#[derive(Debug, Clone)]
pub struct CraterMeshLayer {
    settings: CraterMeshSettings,
    timeline: Timeline,
}

impl CraterMeshLayer {
    pub fn new(settings: CraterMeshSettings) -> Result<Self, ImpactError> {
        settings.layer.validate()?;
        positive("earth_radius_km", settings.earth_radius_km)?;
        positive("horizontal_exaggeration", settings.horizontal_exaggeration)?;
        positive("vertical_exaggeration", settings.vertical_exaggeration)?;
        positive("ease_exponent", settings.ease_exponent as f64)?;
        positive("excavation_fraction", settings.excavation_fraction as f64)?;
        positive("patch_extent", settings.patch_extent as f64)?;
        let timeline = settings.layer.timeline();
        Ok(Self { settings, timeline })
    }

    pub fn settings(&self) -> &CraterMeshSettings {
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

    /// Rotation from the patch's +Y to the impact normal.
    pub fn orientation(&self, event: &ImpactEvent) -> Quat {
        surface_orientation(event.position())
    }

    /// Patch center in scene space.
    pub fn anchor(&self, event: &ImpactEvent) -> Vec3 {
        event.position() * self.settings.layer.earth_radius_scene
    }

    pub fn patch_half_extent(&self, event: &ImpactEvent) -> f32 {
        self.crater_scale(event).radius_scene(self.settings.layer.earth_radius_scene) * self.settings.patch_extent
    }

    fn patch_color(&self, frame: &CraterMeshFrame, d: f32) -> LinearRgba {
        if d < 1.0 {
            let core = 1.0 - d * d;
            let glow = (1.0 - (frame.local_progress / self.settings.fade_start).min(1.0)) * core;
            let temperature = 300.0 + (self.settings.melt_temperature_k - 300.0) * glow;
            with_alpha(mix(SCORCHED_ROCK, blackbody_color(temperature), glow), frame.growth * frame.fade)
        } else {
            let ground = 1.0 - smoothstep(1.15, self.settings.patch_extent, d);
            with_alpha(SCORCHED_ROCK, frame.growth * frame.fade * ground)
        }
    }
}

impl EffectLayer for CraterMeshLayer {
    type Frame = CraterMeshFrame;

    fn kind(&self) -> LayerKind {
        LayerKind::CraterMesh
    }

    fn config(&self) -> &LayerConfig {
        &self.settings.layer
    }

    fn frame(&self, progress: f32, event: &ImpactEvent) -> Option<CraterMeshFrame> {
        if !self.timeline.is_active(progress) {
            return None;
        }
        let s = &self.settings;
        let local = self.timeline.local(progress);
        let crater = self.crater_scale(event);

        Some(CraterMeshFrame {
            local_progress: local,
            growth: eased_progress((local / s.excavation_fraction).min(1.0), s.ease_exponent),
            fade: 1.0 - smoothstep(s.fade_start, 1.0, local),
            crater,
            radius_scene: crater.radius_scene(s.layer.earth_radius_scene),
        })
    }

    fn shade(&self, frame: &CraterMeshFrame, sample: &SurfaceSample, _event: &ImpactEvent) -> EffectOutput {
        let r = sample.position.x.hypot(sample.position.z);
        let d = if frame.radius_scene > 0.0 { r / frame.radius_scene } else { f32::INFINITY };

        let profile = CraterProfile::bowl_and_rim(
            frame.crater.depth_scene * frame.growth,
            frame.crater.rim_height_scene * frame.growth,
        );
        EffectOutput::new(profile.displacement(d), self.patch_color(frame, d))
    }
}
