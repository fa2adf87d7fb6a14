use std::time::Duration;

use bevy::image::{ImageAddressMode, ImageSamplerDescriptor};
use bevy::prelude::*;
use bevy::render::view::screenshot::{save_to_disk, Screenshot};
use bevy::window::PresentMode;
use bevy::winit::{UpdateMode, WinitSettings};
use bevy_egui::EguiPlugin;

use rendering::camera::OrbitCamera;
use rendering::TerrainRenderPlugin;
use save::MapSavePlugin;
use terrain::config::{CHUNK_WORLD_SPACE_SIZE, DEFAULT_MAP_INITIAL_HEIGHT};
use terrain::recalculate::HeightMapRecalculated;
use terrain::TerrainPlugin;

/// Frames rendered between moving the camera and capturing, and after the
/// last capture before exiting.
const SETTLE_FRAMES: u32 = 8;

fn main() {
    let mut app = App::new();

    let window = Window {
        title: "Terrain Editor".to_string(),
        resolution: (1600.0, 900.0).into(),
        present_mode: PresentMode::AutoVsync,
        ..default()
    };
    // Ground textures tile across the whole world.
    let tiling_sampler = ImageSamplerDescriptor {
        address_mode_u: ImageAddressMode::Repeat,
        address_mode_v: ImageAddressMode::Repeat,
        ..ImageSamplerDescriptor::linear()
    };

    app.add_plugins(
        DefaultPlugins
            .set(WindowPlugin {
                primary_window: Some(window),
                ..default()
            })
            .set(ImagePlugin {
                default_sampler: tiling_sampler,
            }),
    )
    .insert_resource(WinitSettings {
        focused_mode: UpdateMode::Continuous,
        unfocused_mode: UpdateMode::reactive_low_power(Duration::from_millis(250)),
    })
    .add_plugins(EguiPlugin)
    .add_plugins((TerrainPlugin, MapSavePlugin, TerrainRenderPlugin));

    if std::env::var_os("TERRAIN_SCREENSHOTS").is_some() {
        info!("Screenshot tour enabled, captures go to /tmp");
        app.insert_resource(ScreenshotTour::new(tour_views()))
            .add_systems(Update, run_screenshot_tour);
    }

    app.run();
}

/// Overview, road close-up and a grazing view along the west edge of the
/// startup map.
fn tour_views() -> Vec<(&'static str, OrbitCamera)> {
    let overview = OrbitCamera::default();
    let ground = DEFAULT_MAP_INITIAL_HEIGHT;
    vec![
        (
            "overview",
            OrbitCamera {
                pitch: 60f32.to_radians(),
                distance: 180.0,
                ..overview
            },
        ),
        (
            "road",
            OrbitCamera {
                focus: Vec3::new(37.0, ground, 8.0),
                yaw: 0.4,
                pitch: 35f32.to_radians(),
                distance: 40.0,
            },
        ),
        (
            "west_edge",
            OrbitCamera {
                focus: Vec3::new(0.0, ground, overview.focus.z),
                yaw: -1.2,
                pitch: 25f32.to_radians(),
                distance: 8.0 * CHUNK_WORLD_SPACE_SIZE,
            },
        ),
    ]
}

#[derive(Resource)]
struct ScreenshotTour {
    views: Vec<(&'static str, OrbitCamera)>,
    next: usize,
    settle: u32,
    terrain_ready: bool,
}

impl ScreenshotTour {
    fn new(views: Vec<(&'static str, OrbitCamera)>) -> Self {
        Self {
            views,
            next: 0,
            settle: SETTLE_FRAMES,
            terrain_ready: false,
        }
    }
}

/// Waits for the first terrain rebuild, then moves the camera to each view,
/// lets it settle and captures the primary window.
fn run_screenshot_tour(
    mut commands: Commands,
    mut rebuilt: EventReader<HeightMapRecalculated>,
    mut tour: ResMut<ScreenshotTour>,
    mut orbit: ResMut<OrbitCamera>,
    mut exit: EventWriter<AppExit>,
) {
    if rebuilt.read().count() > 0 {
        tour.terrain_ready = true;
    }
    if !tour.terrain_ready {
        return;
    }
    if tour.settle > 0 {
        tour.settle -= 1;
        return;
    }

    let Some((name, view)) = tour.views.get(tour.next).copied() else {
        info!("Screenshot tour finished");
        exit.send(AppExit::Success);
        return;
    };
    if *orbit != view {
        *orbit = view;
        tour.settle = SETTLE_FRAMES;
        return;
    }

    let path = format!("/tmp/terrain_{name}.png");
    info!("Capturing {path}");
    commands
        .spawn(Screenshot::primary_window())
        .observe(save_to_disk(path));
    tour.next += 1;
    tour.settle = SETTLE_FRAMES;
}
