use bevy::input::mouse::{MouseScrollUnit, MouseWheel};
use bevy::prelude::*;
use bevy::render::view::RenderLayers;
use std::f32::consts::PI;

use terrain::config::{
    CHUNK_WORLD_SPACE_SIZE, DEFAULT_MAP_CHUNK_COUNT_X, DEFAULT_MAP_CHUNK_COUNT_Z,
    HEIGHTMAP_SCALE_Y,
};
use terrain::editor::EditorState;
use terrain::world::TerrainWorld;

const PAN_SPEED: f32 = 60.0;
const DRAG_PAN_SCALE: f32 = 0.001;
const ZOOM_STEP: f32 = 0.15;
const DISTANCE_RANGE: (f32, f32) = (4.0, 600.0);
const PITCH_RANGE: (f32, f32) = (5.0 * PI / 180.0, 85.0 * PI / 180.0);
const DRAG_ORBIT_SPEED: f32 = 0.005;
const KEY_ORBIT_SPEED: f32 = 1.5;

/// Ground-plane pan direction per key, in camera-relative (right, back) axes.
const PAN_KEYS: [(KeyCode, KeyCode, Vec2); 4] = [
    (KeyCode::KeyW, KeyCode::ArrowUp, Vec2::NEG_Y),
    (KeyCode::KeyS, KeyCode::ArrowDown, Vec2::Y),
    (KeyCode::KeyA, KeyCode::ArrowLeft, Vec2::NEG_X),
    (KeyCode::KeyD, KeyCode::ArrowRight, Vec2::X),
];

/// Identifies a camera as one of the terrain viewports. Chunk culling runs
/// once per viewport, ordered by `index`.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerrainViewport {
    pub index: usize,
}

/// Render layer private to one viewport. Layer 0 stays shared by everything
/// that is not terrain.
pub const fn viewport_render_layer(index: usize) -> usize {
    index + 1
}

/// Layers a viewport camera renders: the shared layer plus its own.
pub fn viewport_camera_layers(index: usize) -> RenderLayers {
    RenderLayers::layer(0).with(viewport_render_layer(index))
}

/// Orbit rig of the primary viewport. The eye sits `distance` away from
/// `focus`, turned `yaw` around Y and raised `pitch` above the ground plane.
#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct OrbitCamera {
    pub focus: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub distance: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        let chunks = Vec2::new(
            DEFAULT_MAP_CHUNK_COUNT_X as f32,
            DEFAULT_MAP_CHUNK_COUNT_Z as f32,
        );
        let center = chunks * CHUNK_WORLD_SPACE_SIZE * 0.5;
        Self {
            focus: Vec3::new(center.x, HEIGHTMAP_SCALE_Y * 0.75, center.y),
            yaw: 0.0,
            pitch: 45f32.to_radians(),
            distance: 120.0,
        }
    }
}

impl OrbitCamera {
    fn rotation(&self) -> Quat {
        Quat::from_euler(EulerRot::YXZ, self.yaw, -self.pitch, 0.0)
    }

    pub fn eye(&self) -> Vec3 {
        self.focus + self.rotation() * Vec3::Z * self.distance
    }

    pub fn transform(&self) -> Transform {
        Transform::from_translation(self.eye()).looking_at(self.focus, Vec3::Y)
    }

    /// Moves the focus along the ground, `offset` given in camera-relative
    /// (right, back) axes. The focus stays over the world, with a chunk of
    /// margin.
    fn pan(&mut self, offset: Vec2, world: &TerrainWorld) {
        let planar = Quat::from_rotation_y(self.yaw) * Vec3::new(offset.x, 0.0, offset.y);
        let margin = CHUNK_WORLD_SPACE_SIZE;
        self.focus.x = (self.focus.x + planar.x).clamp(-margin, world.world_space_width() + margin);
        self.focus.z = (self.focus.z + planar.z).clamp(-margin, world.world_space_depth() + margin);
    }

    fn orbit(&mut self, yaw_delta: f32, pitch_delta: f32) {
        self.yaw += yaw_delta;
        self.pitch = (self.pitch + pitch_delta).clamp(PITCH_RANGE.0, PITCH_RANGE.1);
    }
}

/// Last cursor position of each mouse drag in progress.
#[derive(Resource, Debug, Default)]
pub struct CameraDragState {
    pan_anchor: Option<Vec2>,
    orbit_anchor: Option<Vec2>,
}

/// Cursor movement since the previous frame while `held`. The first frame of
/// a drag only records the anchor.
fn drag_delta(anchor: &mut Option<Vec2>, held: bool, cursor: Option<Vec2>) -> Option<Vec2> {
    match (held, cursor) {
        (true, Some(pos)) => {
            let delta = anchor.map(|last| pos - last);
            *anchor = Some(pos);
            delta
        }
        _ => {
            *anchor = None;
            None
        }
    }
}

pub fn setup_camera(mut commands: Commands) {
    let orbit = OrbitCamera::default();
    commands.spawn((
        Camera3d::default(),
        orbit.transform(),
        TerrainViewport { index: 0 },
        viewport_camera_layers(0),
    ));
    commands.insert_resource(orbit);
}

pub fn apply_orbit_camera(
    orbit: Res<OrbitCamera>,
    mut viewports: Query<(&mut Transform, &TerrainViewport), With<Camera3d>>,
) {
    if !orbit.is_changed() {
        return;
    }
    for (mut transform, viewport) in &mut viewports {
        if viewport.index == 0 {
            *transform = orbit.transform();
        }
    }
}

/// WASD/arrow keys pan relative to the current heading; Q/E orbit.
pub fn camera_keyboard(
    keys: Res<ButtonInput<KeyCode>>,
    time: Res<Time>,
    world: Res<TerrainWorld>,
    mut orbit: ResMut<OrbitCamera>,
) {
    let dir: Vec2 = PAN_KEYS
        .iter()
        .filter(|(key, alt, _)| keys.pressed(*key) || keys.pressed(*alt))
        .map(|(_, _, dir)| *dir)
        .sum();
    if let Some(dir) = dir.try_normalize() {
        let step = PAN_SPEED * orbit.distance / 100.0 * time.delta_secs();
        orbit.pan(dir * step, &world);
    }

    let spin = keys.pressed(KeyCode::KeyE) as i8 - keys.pressed(KeyCode::KeyQ) as i8;
    if spin != 0 {
        orbit.orbit(f32::from(spin) * KEY_ORBIT_SPEED * time.delta_secs(), 0.0);
    }
}

/// Middle drag pans, right drag orbits. The right button belongs to the brush
/// while the height editor is active.
pub fn camera_mouse_drag(
    buttons: Res<ButtonInput<MouseButton>>,
    windows: Query<&Window>,
    editor: Res<EditorState>,
    world: Res<TerrainWorld>,
    mut drag: ResMut<CameraDragState>,
    mut orbit: ResMut<OrbitCamera>,
) {
    let Ok(window) = windows.get_single() else {
        return;
    };
    let cursor = window.cursor_position();

    let panning = buttons.pressed(MouseButton::Middle);
    if let Some(delta) = drag_delta(&mut drag.pan_anchor, panning, cursor) {
        let scale = orbit.distance * DRAG_PAN_SCALE;
        orbit.pan(-delta * scale, &world);
    }

    let orbiting = buttons.pressed(MouseButton::Right) && !editor.is_height_editing();
    if let Some(delta) = drag_delta(&mut drag.orbit_anchor, orbiting, cursor) {
        orbit.orbit(delta.x * DRAG_ORBIT_SPEED, -delta.y * DRAG_ORBIT_SPEED);
    }
}

pub fn camera_zoom(mut wheel: EventReader<MouseWheel>, mut orbit: ResMut<OrbitCamera>) {
    for event in wheel.read() {
        let lines = match event.unit {
            MouseScrollUnit::Line => event.y,
            MouseScrollUnit::Pixel => event.y / 100.0,
        };
        orbit.distance =
            (orbit.distance * (1.0 - lines * ZOOM_STEP)).clamp(DISTANCE_RANGE.0, DISTANCE_RANGE.1);
    }
}
