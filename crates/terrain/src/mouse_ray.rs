//! Asynchronous cursor-ray hits against the height texture.
//!
//! The input layer submits a ray each frame it has none in flight. The hit is
//! computed off the main thread against a snapshot of the height texture and
//! picked up by the painter on a later frame.

use bevy::prelude::*;

use crate::config::{HEIGHTMAP_SCALE_XZ, HEIGHTMAP_SCALE_Y, MOUSE_RAY_MAX_DISTANCE};
use crate::raster::Raster;
use crate::readback::Readback;

const REFINE_STEPS: usize = 8;

/// Marches `direction` from `origin` until it passes below the surface, then
/// bisects for the crossing. `None` when the ray never reaches the terrain.
pub fn raycast_height_texture(
    height: &Raster,
    origin: Vec3,
    direction: Vec3,
    max_distance: f32,
) -> Option<Vec3> {
    let direction = direction.try_normalize()?;
    let surface = |p: Vec3| {
        height
            .sample_bilinear(p.x / HEIGHTMAP_SCALE_XZ, p.z / HEIGHTMAP_SCALE_XZ)
            .map(|h| h * HEIGHTMAP_SCALE_Y)
    };

    let step = HEIGHTMAP_SCALE_XZ * 0.5;
    let mut previous = 0.0;
    let mut travelled = 0.0;
    while travelled <= max_distance {
        let point = origin + direction * travelled;
        if let Some(h) = surface(point) {
            if point.y <= h {
                let (mut lo, mut hi) = (previous, travelled);
                for _ in 0..REFINE_STEPS {
                    let mid = (lo + hi) * 0.5;
                    let p = origin + direction * mid;
                    match surface(p) {
                        Some(h) if p.y <= h => hi = mid,
                        _ => lo = mid,
                    }
                }
                let hit = origin + direction * hi;
                let y = surface(hit).unwrap_or(hit.y);
                return Some(Vec3::new(hit.x, y, hit.z));
            }
        }
        previous = travelled;
        travelled += step;
    }
    None
}

#[derive(Resource, Debug, Default)]
pub struct MouseRayReadback {
    in_flight: Option<Readback<Option<Vec3>>>,
    latest: Option<Vec3>,
}

impl MouseRayReadback {
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Starts a hit query against a snapshot of `height`.
    pub fn submit(&mut self, height: &Raster, origin: Vec3, direction: Vec3) {
        let snapshot = height.snapshot();
        self.in_flight = Some(Readback::spawn(move || {
            raycast_height_texture(&snapshot, origin, direction, MOUSE_RAY_MAX_DISTANCE)
        }));
    }

    /// Installs an already-computed result.
    pub fn set_result(&mut self, hit: Option<Vec3>) {
        self.in_flight = None;
        self.latest = hit;
    }

    /// Moves a completed query into the latest result.
    pub fn poll(&mut self) {
        let Some(readback) = self.in_flight.as_mut() else {
            return;
        };
        if let Some(hit) = readback.try_get() {
            self.latest = hit;
            self.in_flight = None;
        }
    }

    /// True once a query has completed and hit the terrain.
    pub fn is_ready(&self) -> bool {
        self.latest.is_some()
    }

    pub fn world_position(&self) -> Option<Vec3> {
        self.latest
    }
}
