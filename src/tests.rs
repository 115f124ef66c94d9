use std::f32::consts::{FRAC_PI_2, PI};

use bevy::color::LinearRgba;
use bevy::math::{Quat, Vec3};
use bevy::render::mesh::Mesh;

use crate::cache::GridCache;
use crate::error::ImpactError;
use crate::geo::{great_circle_distance, latlon_to_unit, surface_orientation, unit_to_latlon, LatLon};
use crate::io::{parse_scenario, ImpactEvent};
use crate::layers::pressure::{band_label, severity_band};
use crate::layers::{
    EffectLayer, EffectOutput, EffectsConfig, ImpactEffects, LayerConfig, LayerKind, PressureWaveLayer, PressureWaveSettings,
    ShockwaveLayer, ShockwaveSettings, SurfaceSample,
};
use crate::physics::blast::{
    density_ratio, pressure_ratio, rankine_hugoniot_overpressure, sedov_taylor_radius, temperature_ratio, GAMMA_AIR,
    MIN_BLAST_TIME_S, SEA_LEVEL_AIR_DENSITY, SEDOV_XI,
};
use crate::physics::crater::{crater_profile, kinetic_energy_joules, CraterDimensions, CraterProfile, SeismicRinging};
use crate::physics::thermal::blackbody_color;
use crate::render::{create_effect_mesh, write_effect_outputs, GridShape, QualityTier, SampleGrid};
use crate::timeline::{eased_progress, local_progress, Timeline};
use crate::ui::Playback;

fn reference_event() -> ImpactEvent {
    ImpactEvent::new(latlon_to_unit(LatLon { latitude: 20.0, longitude: -30.0 }), 1e15, 1.0, 20.0).unwrap()
}

fn default_effects() -> ImpactEffects {
    ImpactEffects::new(&EffectsConfig::default()).unwrap()
}

/// A point on the globe `angle` radians away from the impact point.
fn point_at_angle(event: &ImpactEvent, angle: f32) -> SurfaceSample {
    let axis = event.position().any_orthonormal_vector();
    SurfaceSample::on_sphere(Quat::from_axis_angle(axis, angle) * event.position())
}

fn max_channel_delta(a: LinearRgba, b: LinearRgba) -> f32 {
    (a.red - b.red).abs().max((a.green - b.green).abs()).max((a.blue - b.blue).abs())
}

#[test]
fn test_great_circle_basic_angles() {
    let x = Vec3::X;
    assert_eq!(great_circle_distance(x, x), 0.0);
    assert!((great_circle_distance(x, Vec3::Y) - FRAC_PI_2).abs() < 1e-6);
    assert!((great_circle_distance(x, -x) - PI).abs() < 1e-6);

    // Unnormalized inputs measure the same angle
    assert!((great_circle_distance(x * 7.0, Vec3::Y * 0.2) - FRAC_PI_2).abs() < 1e-6);
}

#[test]
fn test_great_circle_no_nan_on_drift() {
    // Normalization drift pushes the dot product just past 1
    let a = Vec3::new(0.57735026, 0.57735026, 0.57735026);
    let b = a * 1.0000001;
    let d = great_circle_distance(a, b);
    assert!(d.is_finite());
    assert!(d < 1e-5);

    assert_eq!(great_circle_distance(Vec3::ZERO, Vec3::X), FRAC_PI_2);
}

#[test]
fn test_latlon_round_trip() {
    for (lat, lon) in [(0.0, 0.0), (20.0, -30.0), (-45.0, 120.0), (66.5, 179.0)] {
        let v = latlon_to_unit(LatLon { latitude: lat, longitude: lon });
        assert!((v.length() - 1.0).abs() < 1e-6);
        let back = unit_to_latlon(v);
        assert!((back.latitude - lat).abs() < 1e-4, "lat {lat} -> {}", back.latitude);
        assert!((back.longitude - lon).abs() < 1e-4, "lon {lon} -> {}", back.longitude);
    }

    // 90E sits on -Z
    let east = latlon_to_unit(LatLon { latitude: 0.0, longitude: 90.0 });
    assert!((east - Vec3::NEG_Z).length() < 1e-6);
}

#[test]
fn test_surface_orientation_points_up_at_impact() {
    let event = reference_event();
    let up = surface_orientation(event.position()) * Vec3::Y;
    assert!((up - event.position()).length() < 1e-5);
    assert_eq!(surface_orientation(Vec3::ZERO) * Vec3::Y, Vec3::Y);
}

#[test]
fn test_sedov_taylor_radius_matches_closed_form() {
    let e = 1e15;
    let expected = SEDOV_XI * (e * 1.0 / SEA_LEVEL_AIR_DENSITY).powf(0.2);
    let r = sedov_taylor_radius(e, 1.0, SEA_LEVEL_AIR_DENSITY, SEDOV_XI);
    assert!((r - expected).abs() < 1e-9 * expected);
    // ~1 km after one second for a quarter megaton
    assert!(r > 900.0 && r < 1100.0);

    // t = 0 is floored, never zero or NaN
    let r0 = sedov_taylor_radius(e, 0.0, SEA_LEVEL_AIR_DENSITY, SEDOV_XI);
    assert_eq!(r0, sedov_taylor_radius(e, MIN_BLAST_TIME_S, SEA_LEVEL_AIR_DENSITY, SEDOV_XI));
    assert!(r0 > 0.0);
}

#[test]
fn test_rankine_hugoniot_relations() {
    let p = rankine_hugoniot_overpressure(100.0, 1.225, 1.4);
    assert!((p - 1.225 * 1e4 * (2.8 / 2.4)).abs() < 1e-6);

    // Subsonic inputs are treated as Mach 1
    assert_eq!(density_ratio(0.3, GAMMA_AIR), density_ratio(1.0, GAMMA_AIR));
    assert_eq!(pressure_ratio(0.5, GAMMA_AIR), 1.0);
    assert!((pressure_ratio(2.0, GAMMA_AIR) - 4.5).abs() < 1e-12);
    assert!((temperature_ratio(1.0, GAMMA_AIR) - 1.0).abs() < 1e-12);
    assert!(temperature_ratio(5.0, GAMMA_AIR) > temperature_ratio(2.0, GAMMA_AIR));

    // Strong-shock limit of 2 gamma / (gamma - 1)
    let strong = density_ratio(1e3, GAMMA_AIR);
    assert!(strong > 6.9 && strong < 7.0);
}

#[test]
fn test_blackbody_continuous_at_breakpoints() {
    for t in [3300.0f32, 6600.0] {
        let below = blackbody_color(t - 0.5);
        let above = blackbody_color(t + 0.5);
        assert!(max_channel_delta(below, above) < 1e-3, "jump at {t} K");
    }

    let mut previous = blackbody_color(0.0);
    for step in 1..=1200 {
        let current = blackbody_color(step as f32 * 10.0);
        assert!(max_channel_delta(previous, current) < 0.02);
        previous = current;
    }
}

#[test]
fn test_blackbody_endpoints() {
    let cold = blackbody_color(0.0);
    assert!((cold.red - 0.5).abs() < 1e-6 && cold.blue == 0.0);
    assert_eq!(blackbody_color(10_000.0), LinearRgba::WHITE);
    assert_eq!(blackbody_color(50_000.0), LinearRgba::WHITE);
    assert_eq!(blackbody_color(f32::NAN), cold);
    assert_eq!(blackbody_color(-100.0), cold);
}

#[test]
fn test_crater_profile_shape() {
    let (depth, rim) = (2.0, 0.5);
    assert_eq!(crater_profile(0.0, depth, rim), -depth);
    // Rim crest sits exactly on the crater edge
    assert!((crater_profile(1.0, depth, rim) - rim).abs() < 1e-6);
    // Ejecta blanket is a positive, decaying apron
    let near = crater_profile(1.3, depth, rim);
    let far = crater_profile(1.9, depth, rim);
    assert!(near > far && far > 0.0);

    for d in [2.5, 2.6, 4.0, 10.0, 1e6] {
        assert_eq!(crater_profile(d, depth, rim), 0.0, "d = {d}");
    }
}

#[test]
fn test_seismic_ringing_only_while_active() {
    let settled = CraterProfile::settled(1.0, 0.2);
    let ringing = settled.with_ringing(SeismicRinging { amplitude: 0.1, phase: 0.3 });
    assert_ne!(ringing.displacement(3.0), 0.0);
    assert_eq!(ringing.displacement(4.5), 0.0);
    assert_eq!(settled.displacement(3.0), 0.0);
}

#[test]
fn test_kinetic_energy_and_crater_dimensions() {
    // 1 km stony body at 20 km/s: m = 3000 * pi/6 * 1e9 kg
    let e = kinetic_energy_joules(1.0, 20.0, 3000.0);
    let expected = 0.5 * 3000.0 * std::f64::consts::PI / 6.0 * 1e9 * 4e8;
    assert!((e - expected).abs() < 1e-6 * expected);

    let event = ImpactEvent::from_impactor(Vec3::Y, 1.0, 20.0, 3000.0).unwrap();
    let dims = CraterDimensions::estimate(&event);
    assert!(dims.transient_diameter_km > 5.0 && dims.transient_diameter_km < 30.0);
    assert!((dims.final_diameter_km - 1.25 * dims.transient_diameter_km).abs() < 1e-9);
    assert!(dims.depth_km > dims.rim_height_km);
    assert!(dims.rim_height_km > 0.0);
}

#[test]
fn test_local_progress_bounds() {
    assert_eq!(local_progress(0.1, 0.25), 0.0);
    assert_eq!(local_progress(0.25, 0.25), 0.0);
    assert_eq!(local_progress(1.0, 0.25), 1.0);
    assert!((local_progress(0.625, 0.25) - 0.5).abs() < 1e-6);
    // A delay of 1 never starts rather than dividing by zero
    assert_eq!(local_progress(1.0, 1.0), 0.0);

    assert_eq!(eased_progress(1.0, 0.6), 1.0);
    assert!(eased_progress(0.5, 0.6) > 0.5);
}

#[test]
fn test_timeline_window_is_exclusive_at_both_ends() {
    let window = Timeline::window(0.32, 0.95);
    assert!(!window.is_active(0.32));
    assert!(window.is_active(0.5));
    assert!(!window.is_active(0.95));

    let open = Timeline::starting_at(0.25);
    assert!(open.is_active(1.0));
    assert_eq!(open.local(1.0), 1.0);
}

#[test]
fn test_event_validation() {
    assert_eq!(
        ImpactEvent::new(Vec3::ZERO, 1e15, 1.0, 20.0),
        Err(ImpactError::DegeneratePosition)
    );
    assert!(matches!(
        ImpactEvent::new(Vec3::X, -1.0, 1.0, 20.0),
        Err(ImpactError::NegativeQuantity { name: "energy_joules", .. })
    ));
    assert!(ImpactEvent::new(Vec3::X, f64::NAN, 1.0, 20.0).is_err());
    assert!(ImpactEvent::new(Vec3::X, 1e15, 1.0, f64::INFINITY).is_err());

    let event = ImpactEvent::new(Vec3::new(0.0, 3.0, 4.0), 1e15, 1.0, 20.0).unwrap();
    assert!((event.position().length() - 1.0).abs() < 1e-6);
    assert_eq!(event.pressure_psi_thresholds(), &[20.0, 5.0, 1.0]);

    assert!(matches!(
        event.clone().with_pressure_thresholds(vec![1.0, 5.0, 20.0]),
        Err(ImpactError::UnorderedThresholds(_))
    ));
    assert!(event.clone().with_pressure_thresholds(vec![]).is_err());
    assert!(event.clone().with_impact_angle(0.0).is_err());
    assert!(event.with_density(0.0).is_err());
}

#[test]
fn test_layer_config_validation() {
    assert!(LayerConfig::new(0.25, 1.0).is_ok());
    assert!(matches!(LayerConfig::new(1.2, 1.0), Err(ImpactError::InvalidWindow { .. })));
    assert!(LayerConfig::new(-0.1, 1.0).is_err());
    assert!(LayerConfig::window(0.5, 0.4, 1.0).is_err());
    assert!(LayerConfig::new(0.25, 0.0).is_err());

    let mut settings = ShockwaveSettings::default();
    settings.layer.delay = 1.0;
    assert!(ShockwaveLayer::new(settings).is_err());
}

#[test]
fn test_severity_table_must_cover_thresholds() {
    let layer = PressureWaveLayer::new(PressureWaveSettings::default()).unwrap();
    let event = reference_event();
    assert!(layer.validate_for(&event).is_ok());

    let finer = event.with_pressure_thresholds(vec![50.0, 20.0, 5.0, 1.0]).unwrap();
    assert_eq!(
        layer.validate_for(&finer),
        Err(ImpactError::SeverityTableSize { expected: 5, actual: 4 })
    );
    // Extra bands reuse the last color instead of failing per frame
    assert_eq!(layer.band_color(0.1, finer.pressure_psi_thresholds()), layer.band_color(0.1, &[20.0, 5.0, 1.0]));
}

// Scenario 1: nothing shows before playback starts
#[test]
fn test_all_layers_invisible_at_start() {
    let effects = default_effects();
    let event = reference_event();
    let visibility = effects.visibility(0.0, &event);
    assert!(!visibility.any());

    let sample = SurfaceSample::on_sphere(event.position());
    assert_eq!(effects.shockwave.evaluate(&sample, 0.0, &event), EffectOutput::NONE);
    assert_eq!(effects.surface.evaluate(&sample, 0.0, &event), EffectOutput::NONE);
}

// Scenario 2: the front keeps expanding
#[test]
fn test_shock_front_expands() {
    let effects = default_effects();
    let event = reference_event();
    let early = effects.shockwave.angular_radius(0.3, &event).unwrap();
    let late = effects.shockwave.angular_radius(0.5, &event).unwrap();
    assert!(late > early, "{late} <= {early}");
    assert!(late <= PI);
}

#[test]
fn test_shockwave_gated_by_delay_and_cutoff() {
    let effects = default_effects();
    let event = reference_event();
    assert!(!effects.shockwave.is_visible(0.2, &event));
    assert!(!effects.shockwave.is_visible(0.25, &event));
    assert!(effects.shockwave.is_visible(0.26, &event));
    assert!(effects.shockwave.is_visible(0.97, &event));
    assert!(!effects.shockwave.is_visible(0.98, &event));
    assert!(!effects.pressure_wave.is_visible(0.99, &event));
}

#[test]
fn test_shock_temperature_falls_as_front_slows() {
    let layer = default_effects().shockwave;
    let event = reference_event();
    let hot = layer.frame(0.26, &event).unwrap();
    let cool = layer.frame(0.9, &event).unwrap();
    assert!(hot.temperature_k >= cool.temperature_k);
    assert!(hot.temperature_k <= layer.settings().max_temperature_k);
    assert!(cool.front.velocity_ms < hot.front.velocity_ms);
}

#[test]
fn test_shockwave_sample_on_front_is_lit() {
    let layer = default_effects().shockwave;
    let event = reference_event();
    let frame = layer.frame(0.5, &event).unwrap();

    let on_front = point_at_angle(&event, frame.front.angular_radius);
    let lit = layer.shade(&frame, &on_front, &event);
    let far = layer.shade(&frame, &SurfaceSample::on_sphere(-on_front.position), &event);

    assert!(lit.displacement < 0.0);
    assert!(lit.color.alpha > far.color.alpha);
}

// Scenario 3: settled crater floor sits at full depth
#[test]
fn test_surface_displacement_at_impact_center() {
    let layer = default_effects().surface;
    let event = reference_event();
    let depth = layer.crater_scale(&event).depth_scene;
    assert!(depth > 0.0);

    let out = layer.evaluate(&SurfaceSample::on_sphere(event.position()), 1.0, &event);
    assert!((out.displacement + depth).abs() <= 0.01 * depth, "{} vs -{}", out.displacement, depth);
}

#[test]
fn test_surface_ringing_decays_to_zero() {
    let layer = default_effects().surface;
    let event = reference_event();
    assert!(layer.frame(0.5, &event).unwrap().ringing.amplitude > 0.0);
    assert_eq!(layer.frame(1.0, &event).unwrap().ringing.amplitude, 0.0);
    assert!(layer.frame(0.25, &event).is_none());
}

// Scenario 4: psi values land in the right damage band
#[test]
fn test_pressure_severity_bands() {
    let thresholds = [20.0, 5.0, 1.0];
    assert_eq!(severity_band(25.0, &thresholds), 0);
    assert_eq!(band_label(0, &thresholds), ">20 PSI");
    assert_eq!(severity_band(10.0, &thresholds), 1);
    assert_eq!(band_label(1, &thresholds), "5-20 PSI");
    assert_eq!(severity_band(0.5, &thresholds), 3);
    assert_eq!(band_label(3, &thresholds), "<1 PSI");

    let layer = PressureWaveLayer::new(PressureWaveSettings::default()).unwrap();
    assert_eq!(layer.band_color(25.0, &thresholds), LinearRgba::new(0.9, 0.05, 0.05, 0.75));
}

#[test]
fn test_pressure_peak_decays_over_time() {
    let layer = default_effects().pressure_wave;
    let event = reference_event();
    let early = layer.frame(0.3, &event).unwrap();
    let late = layer.frame(0.6, &event).unwrap();
    assert!(early.peak_overpressure_pa > late.peak_overpressure_pa);
    assert!(layer.frame(0.28, &event).is_none());
}

// Scenario 5: a body at rest does not heat
#[test]
fn test_heat_haze_zero_velocity() {
    let layer = default_effects().heat_haze;
    for atmosphere in [0.0, 0.5, 1.0] {
        let state = layer.heat_state(0.0, atmosphere);
        assert_eq!(state.heat_intensity, 0.0);
        assert_eq!(state.haze_alpha, 0.0);
    }

    let still = ImpactEvent::new(Vec3::X, 1e15, 1.0, 0.0).unwrap();
    let out = layer.evaluate(&SurfaceSample::new(Vec3::ZERO, Vec3::Z), 0.1, &still);
    assert_eq!(out.color.alpha, 0.0);
    assert!(!layer.is_visible(0.1, &still));
}

#[test]
fn test_heat_haze_clamps_emissive() {
    let layer = default_effects().heat_haze;
    let state = layer.heat_state(200.0, 1.0);
    let limit = layer.settings().max_emissive + 1e-5;
    assert!(state.emissive.red <= limit && state.emissive.green <= limit && state.emissive.blue <= limit);
    assert_eq!(state.haze_alpha, layer.settings().max_haze_alpha);
}

#[test]
fn test_heat_haze_window_and_descent() {
    let effects = default_effects();
    let event = reference_event();
    assert!(effects.heat_haze.is_visible(0.1, &event));
    assert!(!effects.heat_haze.is_visible(0.25, &event));
    assert!(!effects.heat_haze.is_visible(0.6, &event));

    let start = effects.heat_haze.body_position(0.0, &event);
    let strike = effects.heat_haze.body_position(0.25, &event);
    assert!((start.length() - 1.6).abs() < 1e-5);
    assert!((strike - event.position()).length() < 1e-5);
}

#[test]
fn test_crater_mesh_window() {
    let layer = default_effects().crater_mesh;
    let event = reference_event();
    assert!(!layer.is_visible(0.3, &event));
    assert!(!layer.is_visible(0.32, &event));
    assert!(layer.is_visible(0.5, &event));
    assert!(!layer.is_visible(0.95, &event));
    assert!(!layer.is_visible(0.99, &event));

    // Bowl fully excavated by 40% of the window
    let frame = layer.frame(0.6, &event).unwrap();
    let center = layer.shade(&frame, &SurfaceSample::new(Vec3::ZERO, Vec3::Y), &event);
    assert!((center.displacement + frame.crater.depth_scene).abs() < 1e-6);

    let edge = SurfaceSample::new(Vec3::new(layer.patch_half_extent(&event), 0.0, 0.0), Vec3::Y);
    assert_eq!(layer.shade(&frame, &edge, &event).displacement, 0.0);
}

#[test]
fn test_evaluate_is_idempotent() {
    let effects = default_effects();
    let event = reference_event();
    let sample = SurfaceSample::on_sphere(Vec3::new(0.3, 0.8, -0.5).normalize());
    for progress in [0.3, 0.5, 0.75] {
        assert_eq!(
            effects.surface.evaluate(&sample, progress, &event),
            effects.surface.evaluate(&sample, progress, &event)
        );
        assert_eq!(
            effects.pressure_wave.evaluate(&sample, progress, &event),
            effects.pressure_wave.evaluate(&sample, progress, &event)
        );
    }
}

#[test]
fn test_batch_matches_single_evaluation() {
    let effects = default_effects();
    let event = reference_event();
    let grid = SampleGrid::build(GridShape::Sphere, QualityTier::Low);
    let mut out = vec![EffectOutput::NONE; grid.len()];

    assert!(effects.shockwave.evaluate_batch(&grid.samples, 0.4, &event, &mut out));
    for (sample, batched) in grid.samples.iter().zip(&out) {
        assert_eq!(*batched, effects.shockwave.evaluate(sample, 0.4, &event));
    }
}

#[test]
fn test_batch_clears_invisible_layer() {
    let effects = default_effects();
    let event = reference_event();
    let grid = SampleGrid::build(GridShape::Sphere, QualityTier::Low);
    let mut out = vec![EffectOutput::new(1.0, LinearRgba::RED); grid.len()];

    assert!(!effects.surface.evaluate_batch(&grid.samples, 0.1, &event, &mut out));
    assert!(out.iter().all(|o| *o == EffectOutput::NONE));
}

#[test]
fn test_quality_only_changes_density() {
    let sizes: Vec<usize> = QualityTier::ALL
        .iter()
        .map(|tier| SampleGrid::build(GridShape::Sphere, *tier).len())
        .collect();
    assert!(sizes.windows(2).all(|w| w[0] < w[1]));

    let low = SampleGrid::build(GridShape::Sphere, QualityTier::Low);
    assert_eq!(low.len(), 49 * 25);
    assert_eq!(low.indices.len(), 48 * 24 * 6);
    assert!(low.samples.iter().all(|s| (s.position.length() - 1.0).abs() < 1e-5));

    // The same point shades the same whichever grid it came from
    let effects = default_effects();
    let event = reference_event();
    let pole = SurfaceSample::on_sphere(Vec3::Y);
    let from_low = low.samples[0];
    let from_high = SampleGrid::build(GridShape::Sphere, QualityTier::High).samples[0];
    assert_eq!(from_low, from_high);
    assert_eq!(
        effects.shockwave.evaluate(&from_low, 0.5, &event),
        effects.shockwave.evaluate(&pole, 0.5, &event)
    );
}

#[test]
fn test_write_outputs_moves_vertices_along_normals() {
    let grid = SampleGrid::build(GridShape::GroundPlane, QualityTier::Low);
    let mut mesh = create_effect_mesh(&grid, 2.0);
    let outputs = vec![EffectOutput::new(0.5, LinearRgba::new(1.0, 0.0, 0.0, 0.25)); grid.len()];
    write_effect_outputs(&mut mesh, &grid, &outputs, 2.0);

    let positions = mesh.attribute(Mesh::ATTRIBUTE_POSITION).and_then(|a| a.as_float3()).unwrap();
    assert_eq!(positions.len(), grid.len());
    let expected = grid.samples[0].position * 2.0 + Vec3::Y * 0.5;
    assert_eq!(positions[0], expected.to_array());
}

#[test]
fn test_grid_cache_reuses_grids() {
    let cache = GridCache::default();
    let first = cache.get_or_build(GridShape::Sphere, QualityTier::Low);
    let second = cache.get_or_build(GridShape::Sphere, QualityTier::Low);
    assert!(std::sync::Arc::ptr_eq(&first, &second));

    cache.get_or_build(GridShape::Billboard, QualityTier::Low);
    let metrics = cache.metrics();
    assert_eq!(metrics.grids_built, 2);
    assert_eq!(metrics.cache_hits, 1);

    cache.clear();
    cache.get_or_build(GridShape::Sphere, QualityTier::Low);
    assert_eq!(cache.metrics().grids_built, 3);
}

#[test]
fn test_playback_advance() {
    let mut playback = Playback::default();
    playback.advance(playback.duration_s / 2.0);
    assert!((playback.progress - 0.5).abs() < 1e-6);

    playback.advance(1000.0);
    assert_eq!(playback.progress, 1.0);
    assert!(!playback.playing);

    // Paused playback does not move
    playback.advance(1.0);
    assert_eq!(playback.progress, 1.0);

    playback.restart();
    playback.looping = true;
    playback.advance(1000.0);
    assert_eq!(playback.progress, 0.0);
    assert!(playback.playing);
}

#[test]
fn test_parse_scenario_defaults_and_overrides() {
    let json = r#"{
        "name": "Equator",
        "impact": { "latitude": 0.0, "longitude": 0.0 },
        "diameter_km": 1.0,
        "velocity_kms": 20.0,
        "quality": "high",
        "effects": { "shockwave": { "decay_k": 25.0 } }
    }"#;
    let scenario = parse_scenario(json).unwrap();
    assert_eq!(scenario.name, "Equator");
    assert_eq!(scenario.quality, QualityTier::High);
    assert!((scenario.event.position() - Vec3::X).length() < 1e-6);

    // Energy derived from the impactor when omitted
    let expected = kinetic_energy_joules(1.0, 20.0, 3000.0);
    assert!((scenario.event.energy_joules() - expected).abs() < 1e-6 * expected);

    assert_eq!(scenario.effects.shockwave.decay_k, 25.0);
    assert_eq!(scenario.effects.shockwave.layer.delay, 0.25);
    assert_eq!(scenario.effects.pressure_wave, PressureWaveSettings::default());
}

#[test]
fn test_parse_scenario_rejects_bad_input() {
    assert!(parse_scenario("{ not json").is_err());

    let negative = r#"{ "name": "x", "impact": { "latitude": 0.0, "longitude": 0.0 },
        "diameter_km": -1.0, "velocity_kms": 20.0 }"#;
    assert!(parse_scenario(negative).is_err());

    let ascending = r#"{ "name": "x", "impact": { "latitude": 0.0, "longitude": 0.0 },
        "diameter_km": 1.0, "velocity_kms": 20.0, "pressure_psi_thresholds": [1.0, 5.0] }"#;
    assert!(parse_scenario(ascending).is_err());
}

#[test]
fn test_blast_rings_fade_out_before_cutoff() {
    let effects = default_effects();
    let event = reference_event();

    let shock_alpha = |progress: f32| {
        let frame = effects.shockwave.frame(progress, &event).unwrap();
        let on_front = point_at_angle(&event, frame.front.angular_radius);
        effects.shockwave.shade(&frame, &on_front, &event).color.alpha
    };
    let pressure_alpha = |progress: f32| {
        let frame = effects.pressure_wave.frame(progress, &event).unwrap();
        let on_front = point_at_angle(&event, frame.front.angular_radius);
        effects.pressure_wave.shade(&frame, &on_front, &event).color.alpha
    };

    // Fully lit mid-run, then down to nothing by the last visible frame
    assert!(shock_alpha(0.6) > 0.9);
    assert!(shock_alpha(0.95) < shock_alpha(0.9));
    assert!(shock_alpha(0.9799) < 1e-3, "shock alpha {}", shock_alpha(0.9799));
    assert!(pressure_alpha(0.95) < pressure_alpha(0.9));
    assert!(pressure_alpha(0.9799) < 1e-3, "pressure alpha {}", pressure_alpha(0.9799));

    assert!(!effects.shockwave.is_visible(0.98, &event));
    assert!(!effects.pressure_wave.is_visible(0.98, &event));
}

#[test]
fn test_sanitized_replaces_non_finite_output() {
    let nan = EffectOutput::new(f32::NAN, LinearRgba::RED);
    assert_eq!(nan.sanitized(), EffectOutput::NONE);

    let infinite = EffectOutput::new(0.1, LinearRgba::new(1.0, f32::INFINITY, 0.0, 1.0));
    assert!(!infinite.is_finite());
    assert_eq!(infinite.sanitized(), EffectOutput::NONE);

    let fine = EffectOutput::new(-0.2, LinearRgba::BLUE);
    assert_eq!(fine.sanitized(), fine);
}

/// Always visible, always shades garbage.
struct NonFiniteLayer {
    config: LayerConfig,
}

impl EffectLayer for NonFiniteLayer {
    type Frame = ();

    fn kind(&self) -> LayerKind {
        LayerKind::Shockwave
    }

    fn config(&self) -> &LayerConfig {
        &self.config
    }

    fn frame(&self, _progress: f32, _event: &ImpactEvent) -> Option<()> {
        Some(())
    }

    fn shade(&self, _frame: &(), sample: &SurfaceSample, _event: &ImpactEvent) -> EffectOutput {
        if sample.position.x > 0.0 {
            EffectOutput::new(f32::NAN, LinearRgba::WHITE)
        } else {
            EffectOutput::new(0.0, LinearRgba::new(f32::INFINITY, 0.0, 0.0, 1.0))
        }
    }
}

#[test]
fn test_non_finite_shading_never_reaches_output() {
    let layer = NonFiniteLayer { config: LayerConfig::new(0.0, 1.0).unwrap() };
    let event = reference_event();

    assert_eq!(layer.evaluate(&SurfaceSample::on_sphere(Vec3::X), 0.5, &event), EffectOutput::NONE);
    assert_eq!(layer.evaluate(&SurfaceSample::on_sphere(Vec3::NEG_X), 0.5, &event), EffectOutput::NONE);

    let grid = SampleGrid::build(GridShape::Sphere, QualityTier::Low);
    let mut out = vec![EffectOutput::new(1.0, LinearRgba::RED); grid.len()];
    assert!(layer.evaluate_batch(&grid.samples, 0.5, &event, &mut out));
    assert!(out.iter().all(|o| *o == EffectOutput::NONE));
}

#[test]
fn test_crater_patch_fades_in_with_excavation() {
    let layer = default_effects().crater_mesh;
    let event = reference_event();
    let center = SurfaceSample::new(Vec3::ZERO, Vec3::Y);

    let opening = layer.frame(0.3201, &event).unwrap();
    let first = layer.shade(&opening, &center, &event);
    assert!(first.color.alpha < 0.02, "alpha {}", first.color.alpha);

    let excavated = layer.frame(0.6, &event).unwrap();
    assert!(layer.shade(&excavated, &center, &event).color.alpha > 0.9);
}

mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn direction() -> impl Strategy<Value = Vec3> {
        (-10.0f32..10.0, -10.0f32..10.0, -10.0f32..10.0)
            .prop_map(|(x, y, z)| Vec3::new(x, y, z))
            .prop_filter("non-degenerate", |v| v.length() > 1e-3)
    }

    proptest! {
        #[test]
        fn great_circle_in_range_and_symmetric(a in direction(), b in direction()) {
            let ab = great_circle_distance(a, b);
            prop_assert!(ab.is_finite());
            prop_assert!((0.0..=PI).contains(&ab));
            prop_assert!((ab - great_circle_distance(b, a)).abs() < 1e-6);
        }

        #[test]
        fn great_circle_identity_and_antipode(a in direction(), k in 0.1f32..10.0) {
            prop_assert!(great_circle_distance(a, a * k) < 1e-5);
            let opposite = great_circle_distance(a, -a * k);
            prop_assert!(opposite.is_finite());
            prop_assert!((opposite - PI).abs() < 1e-5);
        }

        #[test]
        fn sedov_radius_grows_with_time(e in 1e6f64..1e22, t in 0.0f64..120.0, dt in 1e-3f64..60.0) {
            let r1 = sedov_taylor_radius(e, t, SEA_LEVEL_AIR_DENSITY, SEDOV_XI);
            let r2 = sedov_taylor_radius(e, t + dt, SEA_LEVEL_AIR_DENSITY, SEDOV_XI);
            prop_assert!(r2 >= r1);
        }

        #[test]
        fn sedov_radius_grows_with_energy(e in 1e6f64..1e22, factor in 1.0f64..100.0, t in 0.0f64..120.0) {
            let r1 = sedov_taylor_radius(e, t, SEA_LEVEL_AIR_DENSITY, SEDOV_XI);
            let r2 = sedov_taylor_radius(e * factor, t, SEA_LEVEL_AIR_DENSITY, SEDOV_XI);
            prop_assert!(r2 >= r1);
        }

        #[test]
        fn local_progress_stays_in_unit_range(global in -2.0f32..3.0, delay in 0.0f32..1.5) {
            let local = local_progress(global, delay);
            prop_assert!((0.0..=1.0).contains(&local));
            if global <= delay {
                prop_assert_eq!(local, 0.0);
            }
        }

        #[test]
        fn crater_profile_flat_beyond_ejecta(d in 2.5f32..1e4, depth in 0.0f32..10.0, rim in 0.0f32..5.0) {
            prop_assert_eq!(crater_profile(d, depth, rim), 0.0);
        }

        #[test]
        fn layers_never_shade_non_finite(position in direction(), progress in 0.0f32..=1.0) {
            let effects = default_effects();
            let event = reference_event();
            let sample = SurfaceSample::on_sphere(position);

            let outputs = [
                effects.shockwave.frame(progress, &event).map(|f| effects.shockwave.shade(&f, &sample, &event)),
                effects.pressure_wave.frame(progress, &event).map(|f| effects.pressure_wave.shade(&f, &sample, &event)),
                effects.surface.frame(progress, &event).map(|f| effects.surface.shade(&f, &sample, &event)),
                effects.crater_mesh.frame(progress, &event).map(|f| effects.crater_mesh.shade(&f, &sample, &event)),
                effects.heat_haze.frame(progress, &event).map(|f| effects.heat_haze.shade(&f, &sample, &event)),
            ];
            for out in outputs.into_iter().flatten() {
                prop_assert!(out.is_finite(), "{:?} at {}", out, progress);
            }
        }
    }
}
