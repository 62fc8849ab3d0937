//! Windowed viewer: orbit camera around the building, sun light, and
//! hot reload of the building spec file.

use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use bevy::prelude::*;
use bevy::time::common_conditions::on_timer;
use bevy::window::PrimaryWindow;

use facade::PlacementContext;
use rendering::{FacadeDiagnostics, FacadeSource};

use crate::cli::load_spec;

const MIN_PITCH: f32 = 0.05;
const MAX_PITCH: f32 = 1.45;
const ORBIT_SPEED: f32 = 1.2;
const ZOOM_SPEED: f32 = 1.5;
const WINDOW_TITLE: &str = "Facade Viewer";

// ---------------------------------------------------------------------------
// Camera
// ---------------------------------------------------------------------------

/// Orbit around the footprint center.
#[derive(Resource, Debug, Clone, PartialEq)]
pub struct ViewerCamera {
    pub focus: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub distance: f32,
}

impl ViewerCamera {
    /// Frame a footprint of buildings up to `height` tall.
    pub fn framing(placement: &PlacementContext, height: f32) -> Self {
        let mut min = Vec2::splat(f32::INFINITY);
        let mut max = Vec2::splat(f32::NEG_INFINITY);
        for edge in placement.faces.iter().flat_map(|face| face.edges.iter()) {
            min = min.min(edge.start).min(edge.end);
            max = max.max(edge.start).max(edge.end);
        }
        if !min.is_finite() || !max.is_finite() {
            min = Vec2::ZERO;
            max = Vec2::ZERO;
        }
        let center = (min + max) * 0.5;
        let extent = (max - min).length().max(height).max(1.0);
        Self {
            focus: Vec3::new(center.x, placement.base_elevation + height * 0.4, center.y),
            yaw: 0.6,
            pitch: 25f32.to_radians(),
            distance: extent * 1.6,
        }
    }

    pub fn transform(&self) -> Transform {
        let x = self.distance * self.pitch.cos() * self.yaw.sin();
        let y = self.distance * self.pitch.sin();
        let z = self.distance * self.pitch.cos() * self.yaw.cos();
        Transform::from_translation(self.focus + Vec3::new(x, y, z)).looking_at(self.focus, Vec3::Y)
    }
}

fn setup_scene(mut commands: Commands, camera: Res<ViewerCamera>) {
    commands.spawn((Camera3d::default(), camera.transform()));

    commands.insert_resource(AmbientLight {
        color: Color::srgb(0.9, 0.9, 1.0),
        brightness: 300.0,
    });
    commands.spawn((
        DirectionalLight {
            illuminance: 10000.0,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_rotation(Quat::from_euler(
            EulerRot::XYZ,
            -std::f32::consts::FRAC_PI_4,
            std::f32::consts::FRAC_PI_6,
            0.0,
        )),
    ));
}

/// A/D orbit, W/S tilt, Q/E zoom.
fn orbit_keyboard(keys: Res<ButtonInput<KeyCode>>, time: Res<Time>, mut camera: ResMut<ViewerCamera>) {
    let dt = time.delta_secs();
    let mut yaw = 0.0;
    let mut pitch = 0.0;
    let mut zoom = 0.0;
    if keys.pressed(KeyCode::KeyA) || keys.pressed(KeyCode::ArrowLeft) {
        yaw -= 1.0;
    }
    if keys.pressed(KeyCode::KeyD) || keys.pressed(KeyCode::ArrowRight) {
        yaw += 1.0;
    }
    if keys.pressed(KeyCode::KeyW) || keys.pressed(KeyCode::ArrowUp) {
        pitch += 1.0;
    }
    if keys.pressed(KeyCode::KeyS) || keys.pressed(KeyCode::ArrowDown) {
        pitch -= 1.0;
    }
    if keys.pressed(KeyCode::KeyQ) {
        zoom -= 1.0;
    }
    if keys.pressed(KeyCode::KeyE) {
        zoom += 1.0;
    }
    if yaw == 0.0 && pitch == 0.0 && zoom == 0.0 {
        return;
    }
    camera.yaw += yaw * ORBIT_SPEED * dt;
    camera.pitch = (camera.pitch + pitch * ORBIT_SPEED * dt).clamp(MIN_PITCH, MAX_PITCH);
    camera.distance = (camera.distance * (1.0 + zoom * ZOOM_SPEED * dt)).max(2.0);
}

fn apply_viewer_camera(camera: Res<ViewerCamera>, mut query: Query<&mut Transform, With<Camera3d>>) {
    if !camera.is_changed() {
        return;
    }
    let Ok(mut transform) = query.get_single_mut() else {
        return;
    };
    *transform = camera.transform();
}

// ---------------------------------------------------------------------------
// Hot reload
// ---------------------------------------------------------------------------

/// Spec file watched for edits.
#[derive(Resource, Debug)]
pub struct SpecWatch {
    pub path: PathBuf,
    pub modified: Option<SystemTime>,
}

impl SpecWatch {
    pub fn new(path: PathBuf) -> Self {
        let modified = std::fs::metadata(&path).and_then(|m| m.modified()).ok();
        Self { path, modified }
    }

    /// True once per change of the file's modification time.
    pub fn poll(&mut self) -> bool {
        let modified = std::fs::metadata(&self.path).and_then(|m| m.modified()).ok();
        if modified.is_none() || modified == self.modified {
            return false;
        }
        self.modified = modified;
        true
    }
}

fn reload_spec(mut watch: ResMut<SpecWatch>, mut source: ResMut<FacadeSource>) {
    if !watch.poll() {
        return;
    }
    match load_spec(&watch.path) {
        Ok(spec) => {
            info!("reloaded {}", watch.path.display());
            source.set_spec(spec);
        }
        Err(err) => warn!("keeping the previous spec: {err}"),
    }
}

fn show_blocking_error(
    diagnostics: Res<FacadeDiagnostics>,
    mut windows: Query<&mut Window, With<PrimaryWindow>>,
) {
    if !diagnostics.is_changed() {
        return;
    }
    let Ok(mut window) = windows.get_single_mut() else {
        return;
    };
    window.title = match &diagnostics.blocking {
        Some(err) => format!("{WINDOW_TITLE} (rejected: {err})"),
        None if diagnostics.recovered.is_empty() => WINDOW_TITLE.to_string(),
        None => format!("{WINDOW_TITLE} ({} warnings)", diagnostics.recovered.len()),
    };
}

pub struct ViewerPlugin;

impl Plugin for ViewerPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, setup_scene).add_systems(
            Update,
            (
                orbit_keyboard,
                apply_viewer_camera,
                show_blocking_error,
                reload_spec.run_if(on_timer(Duration::from_millis(500))),
            ),
        );
    }
}

pub fn window_title() -> String {
    WINDOW_TITLE.to_string()
}
