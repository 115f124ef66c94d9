use bevy::input::mouse::{MouseMotion, MouseWheel};
use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts};

use crate::cache::GridCache;
use crate::io::ImpactEvent;
use crate::layers::{ImpactEffects, LayerKind};
use crate::physics::crater::{tnt_megatons, CraterDimensions};
use crate::render::QualityTier;

/// Playback clock. Progress only moves forward while playing; restarting is
/// the only way back to zero.
#[derive(Resource, Debug, Clone)]
pub struct Playback {
    pub progress: f32,
    pub playing: bool,
    /// Wall-clock seconds for a full 0 -> 1 run.
    pub duration_s: f32,
    pub looping: bool,
}

impl Default for Playback {
    fn default() -> Self {
        Self { progress: 0.0, playing: true, duration_s: 24.0, looping: false }
    }
}

impl Playback {
    pub fn advance(&mut self, delta_s: f32) {
        if !self.playing || self.duration_s <= 0.0 {
            return;
        }
        self.progress = (self.progress + delta_s / self.duration_s).min(1.0);
        if self.progress >= 1.0 {
            if self.looping {
                self.progress = 0.0;
            } else {
                self.playing = false;
            }
        }
    }

    pub fn restart(&mut self) {
        self.progress = 0.0;
        self.playing = true;
    }
}

#[derive(Resource, Debug, Clone, Default)]
pub struct DisplaySettings {
    pub quality: QualityTier,
}

#[derive(Resource, Debug, Clone)]
pub struct OrbitController {
    pub yaw: f32,
    pub pitch: f32,
    pub distance: f32,
    pub target: Vec3,
}

impl Default for OrbitController {
    fn default() -> Self {
        Self { yaw: 0.0, pitch: 0.3, distance: 3.2, target: Vec3::ZERO }
    }
}

impl OrbitController {
    /// Frames `point` on the unit sphere from above.
    pub fn looking_at_surface(point: Vec3) -> Self {
        let p = point.normalize_or_zero();
        Self {
            yaw: (-p.z).atan2(p.x),
            pitch: p.y.clamp(-1.0, 1.0).asin(),
            ..default()
        }
    }

    pub fn transform(&self) -> Transform {
        let dir = Vec3::new(
            self.pitch.cos() * self.yaw.cos(),
            self.pitch.sin(),
            -self.pitch.cos() * self.yaw.sin(),
        );
        Transform::from_translation(self.target + dir * self.distance).looking_at(self.target, Vec3::Y)
    }
}

pub fn orbit_camera_system(
    mut controller: ResMut<OrbitController>,
    keyboard: Res<ButtonInput<KeyCode>>,
    mouse_button: Res<ButtonInput<MouseButton>>,
    mut mouse_motion: EventReader<MouseMotion>,
    mut scroll_evr: EventReader<MouseWheel>,
    time: Res<Time>,
    mut cameras: Query<&mut Transform, With<Camera3d>>,
    mut contexts: EguiContexts,
) {
    let Some(ctx) = contexts.try_ctx_mut() else {
        return;
    };
    if ctx.wants_pointer_input() {
        mouse_motion.clear();
        scroll_evr.clear();
        return;
    }

    let scroll: f32 = scroll_evr.read().map(|ev| ev.y).sum();
    if scroll != 0.0 {
        controller.distance = (controller.distance * (1.0 - scroll * 0.1)).clamp(1.15, 12.0);
    }

    let speed = 1.2 * time.delta_secs();
    if keyboard.pressed(KeyCode::ArrowLeft) || keyboard.pressed(KeyCode::KeyA) {
        controller.yaw -= speed;
    }
    if keyboard.pressed(KeyCode::ArrowRight) || keyboard.pressed(KeyCode::KeyD) {
        controller.yaw += speed;
    }
    if keyboard.pressed(KeyCode::ArrowUp) || keyboard.pressed(KeyCode::KeyW) {
        controller.pitch += speed;
    }
    if keyboard.pressed(KeyCode::ArrowDown) || keyboard.pressed(KeyCode::KeyS) {
        controller.pitch -= speed;
    }

    if mouse_button.pressed(MouseButton::Left) || mouse_button.pressed(MouseButton::Right) {
        // Slower drag when zoomed in close to the surface.
        let sensitivity = 0.004 * (controller.distance - 1.0).max(0.1);
        for ev in mouse_motion.read() {
            controller.yaw -= ev.delta.x * sensitivity;
            controller.pitch += ev.delta.y * sensitivity;
        }
    } else {
        mouse_motion.clear();
    }

    controller.pitch = controller.pitch.clamp(-1.5, 1.5);

    if let Ok(mut transform) = cameras.get_single_mut() {
        *transform = controller.transform();
    }
}

pub fn ui_panel_system(
    mut contexts: EguiContexts,
    mut playback: ResMut<Playback>,
    mut display: ResMut<DisplaySettings>,
    event: Option<Res<ImpactEvent>>,
    effects: Option<Res<ImpactEffects>>,
    grids: Res<GridCache>,
) {
    let (Some(event), Some(effects)) = (event, effects) else {
        return;
    };
    let Some(ctx) = contexts.try_ctx_mut() else {
        return;
    };

    egui::Window::new("Impact").show(ctx, |ui| {
        ui.heading("Impactor");
        let crater = CraterDimensions::estimate(&event);
        ui.label(format!("Diameter: {:.2} km", event.diameter_km()));
        ui.label(format!("Velocity: {:.1} km/s", event.velocity_kms()));
        ui.label(format!(
            "Energy: {:.3e} J ({:.1} Mt TNT)",
            event.energy_joules(),
            tnt_megatons(event.energy_joules())
        ));
        ui.label(format!(
            "Crater: {:.1} km wide, {:.2} km deep",
            crater.final_diameter_km, crater.depth_km
        ));

        ui.separator();
        ui.heading("Playback");
        ui.horizontal(|ui| {
            let label = if playback.playing { "Pause" } else { "Play" };
            if ui.button(label).clicked() {
                playback.playing = !playback.playing;
            }
            if ui.button("Restart").clicked() {
                playback.restart();
            }
            ui.checkbox(&mut playback.looping, "Loop");
        });
        ui.add(egui::ProgressBar::new(playback.progress).show_percentage());
        ui.add(egui::Slider::new(&mut playback.duration_s, 4.0..=120.0).text("Run length (s)"));

        ui.separator();
        egui::ComboBox::from_label("Quality")
            .selected_text(display.quality.label())
            .show_ui(ui, |ui| {
                for tier in QualityTier::ALL {
                    ui.selectable_value(&mut display.quality, tier, tier.label());
                }
            });

        ui.separator();
        ui.heading("Layers");
        let visibility = effects.visibility(playback.progress, &event);
        for kind in LayerKind::ALL {
            let state = if visibility.get(kind) { "active" } else { "-" };
            ui.label(format!("{}: {}", kind.label(), state));
        }
        if let Some(radius) = effects.shockwave.angular_radius(playback.progress, &event) {
            ui.label(format!("Shock front: {:.1} deg", radius.to_degrees()));
        }

        ui.separator();
        let metrics = grids.metrics();
        ui.label(format!("Grids built: {}  cache hits: {}", metrics.grids_built, metrics.cache_hits));
    });
}
