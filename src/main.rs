use std::path::PathBuf;
use std::sync::Arc;

use bevy::log::{error, info, warn};
use bevy::prelude::*;
use bevy_egui::EguiPlugin;

use impact_effects::cache::GridCache;
use impact_effects::geo::{latlon_to_unit, LatLon};
use impact_effects::io::{load_scenario_from_json, ImpactEvent, Scenario};
use impact_effects::layers::{EffectLayer, EffectOutput, EffectsConfig, ImpactEffects, LayerKind};
use impact_effects::render::{
    create_effect_mesh, write_effect_outputs, write_opaque_tint, GridShape, QualityTier, SampleGrid,
};
use impact_effects::ui::{orbit_camera_system, ui_panel_system, DisplaySettings, OrbitController, Playback};

const GLOBE_RADIUS: f32 = 1.0;
const SHOCK_SHELL: f32 = 1.004;
const PRESSURE_SHELL: f32 = 1.012;
const PATCH_LIFT: f32 = 0.0015;
const HAZE_SIZE: f32 = 0.08;
const BODY_RADIUS: f32 = 0.012;
const GLOBE_TINT: [f32; 3] = [0.16, 0.32, 0.55];

#[derive(Resource)]
struct ScenarioPath(Option<PathBuf>);

/// A mesh whose vertices are rewritten from one effect layer every frame.
/// `outputs` is allocated once with the grid and reused.
#[derive(Component)]
struct LayerSurface {
    kind: LayerKind,
    grid: Arc<SampleGrid>,
    scale: f32,
    outputs: Vec<EffectOutput>,
}

#[derive(Component)]
struct FallingBody;

#[derive(Component)]
struct HazeBillboard;

fn main() {
    let path = std::env::args().nth(1).map(PathBuf::from);

    App::new()
        .add_plugins(DefaultPlugins)
        .add_plugins(EguiPlugin)
        .insert_resource(ScenarioPath(path))
        .init_resource::<Playback>()
        .init_resource::<DisplaySettings>()
        .init_resource::<GridCache>()
        .add_systems(Startup, (load_scenario, setup_scene).chain())
        .add_systems(Update, (
            advance_playback,
            rebuild_on_quality_change,
            update_layer_surfaces,
            update_falling_body,
            face_haze_to_camera,
            orbit_camera_system,
            ui_panel_system,
        ).chain())
        .run();
}

fn default_scenario() -> anyhow::Result<Scenario> {
    let position = latlon_to_unit(LatLon { latitude: 20.0, longitude: -30.0 });
    Ok(Scenario {
        name: "Default 1 km stony impactor".to_string(),
        event: ImpactEvent::from_impactor(position, 1.0, 20.0, 3000.0)?,
        quality: QualityTier::default(),
        effects: EffectsConfig::default(),
    })
}

fn load_scenario(mut commands: Commands, path: Res<ScenarioPath>) {
    let loaded = match &path.0 {
        Some(p) => load_scenario_from_json(p).or_else(|e| {
            warn!("Falling back to the default scenario: {e:#}");
            default_scenario()
        }),
        None => default_scenario(),
    };
    let scenario = match loaded {
        Ok(s) => s,
        Err(e) => {
            error!("No usable scenario: {e:#}");
            return;
        }
    };

    let config = scenario.effects.clone().with_earth_radius_scene(GLOBE_RADIUS);
    let effects = match ImpactEffects::new(&config) {
        Ok(effects) => effects,
        Err(e) => {
            warn!("Invalid effect settings ({e}), using defaults");
            match ImpactEffects::new(&EffectsConfig::default().with_earth_radius_scene(GLOBE_RADIUS)) {
                Ok(effects) => effects,
                Err(e) => {
                    error!("Default effect settings rejected: {e}");
                    return;
                }
            }
        }
    };
    if let Err(e) = effects.pressure_wave.validate_for(&scenario.event) {
        warn!("Pressure bands: {e}; extra bands reuse the last color");
    }

    info!("Scenario {:?} ready ({} quality)", scenario.name, scenario.quality.label());
    commands.insert_resource(OrbitController::looking_at_surface(scenario.event.position()));
    commands.insert_resource(DisplaySettings { quality: scenario.quality });
    commands.insert_resource(scenario.event);
    commands.insert_resource(effects);
}

fn setup_scene(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    grids: Res<GridCache>,
    display: Res<DisplaySettings>,
    event: Option<Res<ImpactEvent>>,
    effects: Option<Res<ImpactEffects>>,
    orbit: Option<Res<OrbitController>>,
) {
    let (Some(event), Some(effects)) = (event, effects) else {
        return;
    };
    let orbit = orbit.map(|o| o.clone()).unwrap_or_default();

    commands.spawn((Camera3d::default(), orbit.transform()));
    commands.spawn((
        DirectionalLight { illuminance: 8000.0, ..default() },
        Transform::from_translation(orbit.transform().translation * 2.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));

    spawn_layer_surfaces(&mut commands, &mut meshes, &mut materials, &grids, display.quality, &event, &effects);

    let body_material = materials.add(StandardMaterial {
        base_color: Color::srgb(0.25, 0.22, 0.2),
        ..default()
    });
    commands.spawn((
        Mesh3d(meshes.add(Sphere::new(BODY_RADIUS))),
        MeshMaterial3d(body_material),
        Transform::from_translation(effects.heat_haze.body_position(0.0, &event)),
        FallingBody,
    ));
}

fn overlay_material(materials: &mut Assets<StandardMaterial>) -> Handle<StandardMaterial> {
    materials.add(StandardMaterial {
        base_color: Color::WHITE,
        alpha_mode: AlphaMode::Blend,
        unlit: true,
        cull_mode: None,
        ..default()
    })
}

fn spawn_layer_surfaces(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    grids: &GridCache,
    quality: QualityTier,
    event: &ImpactEvent,
    effects: &ImpactEffects,
) {
    let sphere = grids.get_or_build(GridShape::Sphere, quality);

    let globe_material = materials.add(StandardMaterial {
        base_color: Color::WHITE,
        perceptual_roughness: 0.9,
        ..default()
    });
    commands.spawn((
        Mesh3d(meshes.add(create_effect_mesh(&sphere, GLOBE_RADIUS))),
        MeshMaterial3d(globe_material),
        Transform::default(),
        layer_surface(LayerKind::SurfaceIntegration, sphere.clone(), GLOBE_RADIUS),
    ));

    for (kind, shell) in [(LayerKind::Shockwave, SHOCK_SHELL), (LayerKind::PressureWave, PRESSURE_SHELL)] {
        commands.spawn((
            Mesh3d(meshes.add(create_effect_mesh(&sphere, GLOBE_RADIUS * shell))),
            MeshMaterial3d(overlay_material(materials)),
            Transform::default(),
            Visibility::Hidden,
            layer_surface(kind, sphere.clone(), GLOBE_RADIUS * shell),
        ));
    }

    // The patch grid is built in crater-local scene units, so it is scaled once per scenario.
    let half_extent = effects.crater_mesh.patch_half_extent(event);
    let patch = Arc::new(grids.get_or_build(GridShape::GroundPlane, quality).scaled(half_extent));
    let anchor = effects.crater_mesh.anchor(event);
    commands.spawn((
        Mesh3d(meshes.add(create_effect_mesh(&patch, 1.0))),
        MeshMaterial3d(overlay_material(materials)),
        Transform::from_translation(anchor + event.position() * PATCH_LIFT)
            .with_rotation(effects.crater_mesh.orientation(event)),
        Visibility::Hidden,
        layer_surface(LayerKind::CraterMesh, patch, 1.0),
    ));

    let billboard = grids.get_or_build(GridShape::Billboard, quality);
    commands.spawn((
        Mesh3d(meshes.add(create_effect_mesh(&billboard, 1.0))),
        MeshMaterial3d(overlay_material(materials)),
        Transform::from_translation(effects.heat_haze.body_position(0.0, event)).with_scale(Vec3::splat(HAZE_SIZE)),
        Visibility::Hidden,
        layer_surface(LayerKind::HeatHaze, billboard, 1.0),
        HazeBillboard,
    ));
}

fn layer_surface(kind: LayerKind, grid: Arc<SampleGrid>, scale: f32) -> LayerSurface {
    let outputs = vec![EffectOutput::NONE; grid.len()];
    LayerSurface { kind, grid, scale, outputs }
}

fn advance_playback(mut playback: ResMut<Playback>, time: Res<Time>) {
    playback.advance(time.delta_secs());
}

fn rebuild_on_quality_change(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    grids: Res<GridCache>,
    display: Res<DisplaySettings>,
    event: Option<Res<ImpactEvent>>,
    effects: Option<Res<ImpactEffects>>,
    surfaces: Query<Entity, With<LayerSurface>>,
    mut current: Local<Option<QualityTier>>,
) {
    let (Some(event), Some(effects)) = (event, effects) else {
        return;
    };
    let previous = current.replace(display.quality);
    if previous.is_none() || previous == Some(display.quality) {
        return;
    }

    let label = display.quality.label();
    info!("Switching to {} quality", label);
    for entity in surfaces.iter() {
        commands.entity(entity).despawn_recursive();
    }
    spawn_layer_surfaces(&mut commands, &mut meshes, &mut materials, &grids, display.quality, &event, &effects);
}

fn update_layer_surfaces(
    playback: Res<Playback>,
    event: Option<Res<ImpactEvent>>,
    effects: Option<Res<ImpactEffects>>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut surfaces: Query<(&mut LayerSurface, &Mesh3d, &mut Visibility)>,
) {
    let (Some(event), Some(effects)) = (event, effects) else {
        return;
    };
    let progress = playback.progress;

    for (mut surface, mesh_handle, mut visibility) in surfaces.iter_mut() {
        let LayerSurface { kind, grid, scale, outputs } = &mut *surface;
        let samples = &grid.samples;
        let visible = match kind {
            LayerKind::Shockwave => effects.shockwave.evaluate_batch(samples, progress, &event, outputs),
            LayerKind::PressureWave => effects.pressure_wave.evaluate_batch(samples, progress, &event, outputs),
            LayerKind::SurfaceIntegration => effects.surface.evaluate_batch(samples, progress, &event, outputs),
            LayerKind::CraterMesh => effects.crater_mesh.evaluate_batch(samples, progress, &event, outputs),
            LayerKind::HeatHaze => effects.heat_haze.evaluate_batch(samples, progress, &event, outputs),
        };

        let Some(mesh) = meshes.get_mut(&mesh_handle.0) else {
            continue;
        };
        write_effect_outputs(mesh, grid, outputs, *scale);

        if *kind == LayerKind::SurfaceIntegration {
            // The globe itself never disappears; it shows the tint over an opaque base.
            write_opaque_tint(mesh, outputs, GLOBE_TINT);
            *visibility = Visibility::Inherited;
        } else {
            *visibility = if visible { Visibility::Inherited } else { Visibility::Hidden };
        }
    }
}

fn update_falling_body(
    playback: Res<Playback>,
    event: Option<Res<ImpactEvent>>,
    effects: Option<Res<ImpactEffects>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut bodies: Query<(&mut Transform, &MeshMaterial3d<StandardMaterial>, &mut Visibility), With<FallingBody>>,
) {
    let (Some(event), Some(effects)) = (event, effects) else {
        return;
    };
    let haze = &effects.heat_haze;
    let progress = playback.progress;
    let state = haze.heat_state(event.velocity_kms(), haze.atmosphere_progress(progress));

    for (mut transform, material, mut visibility) in bodies.iter_mut() {
        transform.translation = haze.body_position(progress, &event);
        *visibility = if progress < haze.config().end { Visibility::Inherited } else { Visibility::Hidden };
        if let Some(material) = materials.get_mut(&material.0) {
            material.emissive = state.emissive;
        }
    }
}

fn face_haze_to_camera(
    playback: Res<Playback>,
    event: Option<Res<ImpactEvent>>,
    effects: Option<Res<ImpactEffects>>,
    cameras: Query<&Transform, (With<Camera3d>, Without<HazeBillboard>)>,
    mut billboards: Query<&mut Transform, With<HazeBillboard>>,
) {
    let (Some(event), Some(effects)) = (event, effects) else {
        return;
    };
    let Ok(camera) = cameras.get_single() else {
        return;
    };
    let position = effects.heat_haze.body_position(playback.progress, &event);
    for mut transform in billboards.iter_mut() {
        transform.translation = position;
        // Billboard normal is +Z; pointing -Z away from the camera turns it toward the viewer.
        transform.look_to(position - camera.translation, Vec3::Y);
    }
}
