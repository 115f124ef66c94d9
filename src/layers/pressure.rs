use bevy::color::LinearRgba;
use serde::{Deserialize, Serialize};

use crate::error::{positive, ImpactError};
use crate::geo::{great_circle_distance, EARTH_RADIUS_KM};
use crate::io::ImpactEvent;
use crate::physics::blast::{pascals_to_psi, rankine_hugoniot_overpressure, GAMMA_AIR, SEA_LEVEL_AIR_DENSITY};
use crate::timeline::Timeline;

use super::{cutoff_fade, pole_fade, BlastFront, EffectLayer, EffectOutput, LayerConfig, LayerKind, SurfaceSample};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PressureWaveSettings {
    pub layer: LayerConfig,
    pub simulated_duration_s: f64,
    pub display_exaggeration: f64,
    pub earth_radius_km: f64,
    pub decay_k: f32,
    pub cutoff_progress: f32,
    pub fade_start: f32,
    /// Peak outward displacement as a fraction of the globe radius.
    pub lift: f32,
    /// One RGBA entry per severity band, most severe first.
    pub band_colors: Vec<[f32; 4]>,
}

impl Default for PressureWaveSettings {
    fn default() -> Self {
        Self {
            layer: LayerConfig { delay: 0.28, end: 1.0, earth_radius_scene: 1.0 },
            simulated_duration_s: 60.0,
            display_exaggeration: 1000.0,
            earth_radius_km: EARTH_RADIUS_KM,
            decay_k: 15.0,
            cutoff_progress: 0.98,
            fade_start: 0.8,
            lift: 0.002,
            band_colors: vec![
                [0.9, 0.05, 0.05, 0.75], // > 20 psi: reinforced structures destroyed
                [1.0, 0.45, 0.0, 0.6],   // 5-20 psi: most buildings collapse
                [1.0, 0.85, 0.1, 0.45],  // 1-5 psi: windows shatter
                [0.45, 0.7, 1.0, 0.3],   // < 1 psi: light damage
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PressureFrame {
    pub local_progress: f32,
    pub front: BlastFront,
    pub peak_overpressure_pa: f64,
    pub fade: f32,
}

/// Atmospheric overpressure ring, colored by damage severity band.
#[derive(Debug, Clone)]
pub struct PressureWaveLayer {
    settings: PressureWaveSettings,
    timeline: Timeline,
}

/// Index of the band `psi` falls into; 0 is the most severe.
/// `thresholds` are descending, so a value above the first edge lands in band 0
/// and a value below the last lands in band `thresholds.len()`.
pub fn severity_band(psi: f32, thresholds: &[f32]) -> usize {
    thresholds.iter().position(|edge| psi > *edge).unwrap_or(thresholds.len())
}

pub fn band_label(band: usize, thresholds: &[f32]) -> String {
    match (band, thresholds.len()) {
        (_, 0) => "all pressures".to_string(),
        (0, _) => format!(">{} PSI", thresholds[0]),
        (b, n) if b >= n => format!("<{} PSI", thresholds[n - 1]),
        (b, _) => format!("{}-{} PSI", thresholds[b], thresholds[b - 1]),
    }
}

impl PressureWaveLayer {
    pub fn new(settings: PressureWaveSettings) -> Result<Self, ImpactError> {
        settings.layer.validate()?;
        positive("simulated_duration_s", settings.simulated_duration_s)?;
        positive("display_exaggeration", settings.display_exaggeration)?;
        positive("earth_radius_km", settings.earth_radius_km)?;
        positive("decay_k", settings.decay_k as f64)?;
        if settings.band_colors.is_empty() {
            return Err(ImpactError::SeverityTableSize { expected: 1, actual: 0 });
        }
        let timeline = settings.layer.timeline();
        Ok(Self { settings, timeline })
    }

    pub fn settings(&self) -> &PressureWaveSettings {
        &self.settings
    }

    /// Checks that the color table covers every band the event defines.
    pub fn validate_for(&self, event: &ImpactEvent) -> Result<(), ImpactError> {
        let expected = event.pressure_psi_thresholds().len() + 1;
        let actual = self.settings.band_colors.len();
        if actual != expected {
            return Err(ImpactError::SeverityTableSize { expected, actual });
        }
        Ok(())
    }

    /// Color of the severity band for `psi`. Bands beyond the table reuse its last entry.
    pub fn band_color(&self, psi: f32, thresholds: &[f32]) -> LinearRgba {
        let table = &self.settings.band_colors;
        let band = severity_band(psi, thresholds).min(table.len().saturating_sub(1));
        match table.get(band) {
            Some([r, g, b, a]) => LinearRgba::new(*r, *g, *b, *a),
            None => LinearRgba::NONE,
        }
    }
}

impl EffectLayer for PressureWaveLayer {
    type Frame = PressureFrame;

    fn kind(&self) -> LayerKind {
        LayerKind::PressureWave
    }

    fn config(&self) -> &LayerConfig {
        &self.settings.layer
    }

    fn frame(&self, progress: f32, event: &ImpactEvent) -> Option<PressureFrame> {
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

        Some(PressureFrame {
            local_progress: local,
            front,
            peak_overpressure_pa: rankine_hugoniot_overpressure(front.velocity_ms, SEA_LEVEL_AIR_DENSITY, GAMMA_AIR),
            fade: cutoff_fade(&self.timeline, s.fade_start, s.cutoff_progress, local),
        })
    }

    fn shade(&self, frame: &PressureFrame, sample: &SurfaceSample, event: &ImpactEvent) -> EffectOutput {
        let s = &self.settings;
        let angle = great_circle_distance(sample.position, event.position());
        let intensity = frame.front.intensity(angle, s.decay_k);
        let psi = pascals_to_psi(frame.peak_overpressure_pa * intensity as f64) as f32;

        let band = self.band_color(psi, event.pressure_psi_thresholds());
        let weight = intensity * pole_fade(angle, 0.02, 0.3) * frame.fade;

        EffectOutput::new(
            weight * s.lift * s.layer.earth_radius_scene,
            LinearRgba::new(band.red, band.green, band.blue, band.alpha * weight),
        )
    }
}
