//! Road centrelines snapped onto the terrain.

use bevy::prelude::*;

use crate::world::TerrainWorld;

/// Curve samples per control-point span before arc-length resampling.
const CURVE_SUBDIVISIONS: usize = 32;

/// Control points of the road laid by default on the startup map.
pub const DEFAULT_ROAD_CONTROL_POINTS: [Vec2; 5] = [
    Vec2::new(26.4136, 11.1253),
    Vec2::new(31.6507, 7.2496),
    Vec2::new(37.1036, 7.7737),
    Vec2::new(41.9232, 4.17412),
    Vec2::new(48.2309, 4.86765),
];

pub const DEFAULT_ROAD_SPACING: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoadCurveType {
    Straight,
    #[default]
    Bezier,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Road {
    pub control_points_2d: Vec<Vec2>,
    pub control_points_3d: Vec<Vec3>,
    /// Centreline in world space, snapped to the terrain surface.
    pub world_points: Vec<Vec3>,
}

impl Road {
    pub fn from_control_points(
        control_points: &[Vec2],
        curve: RoadCurveType,
        spacing: f32,
        world: &TerrainWorld,
    ) -> Self {
        let control_points_3d: Vec<Vec3> = control_points
            .iter()
            .map(|p| snap_to_terrain(world, *p))
            .collect();
        let world_points = match curve {
            RoadCurveType::Straight => control_points_3d.clone(),
            RoadCurveType::Bezier => bezier_points(&control_points_3d, spacing)
                .into_iter()
                .map(|p| snap_to_terrain(world, p.xz()))
                .collect(),
        };
        Self {
            control_points_2d: control_points.to_vec(),
            control_points_3d,
            world_points,
        }
    }

    /// Re-snaps every point after the terrain under the road has changed.
    pub fn resnap(&mut self, world: &TerrainWorld) {
        for p in self.control_points_3d.iter_mut().chain(self.world_points.iter_mut()) {
            *p = snap_to_terrain(world, p.xz());
        }
    }
}

fn snap_to_terrain(world: &TerrainWorld, xz: Vec2) -> Vec3 {
    let y = world.height_at_world_xz(xz.x, xz.y).unwrap_or(0.0);
    Vec3::new(xz.x, y, xz.y)
}

/// Smooth curve through every control point, resampled every `spacing`
/// world units. Each span is a cubic Bézier whose handles follow the
/// neighbouring points, so the curve passes through the control points.
pub fn bezier_points(control_points: &[Vec3], spacing: f32) -> Vec<Vec3> {
    if control_points.len() < 2 || spacing <= 0.0 {
        return control_points.to_vec();
    }

    let last = control_points.len() - 1;
    let mut dense = Vec::with_capacity(last * CURVE_SUBDIVISIONS + 1);
    for i in 0..last {
        let p0 = control_points[i];
        let p3 = control_points[i + 1];
        let before = control_points[i.saturating_sub(1)];
        let after = control_points[(i + 2).min(last)];
        let p1 = p0 + (p3 - before) / 6.0;
        let p2 = p3 - (after - p0) / 6.0;
        for step in 0..CURVE_SUBDIVISIONS {
            let t = step as f32 / CURVE_SUBDIVISIONS as f32;
            dense.push(cubic_bezier(p0, p1, p2, p3, t));
        }
    }
    dense.push(control_points[last]);

    let mut points = vec![dense[0]];
    let mut carried = 0.0;
    for pair in dense.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let length = a.distance(b);
        if length <= f32::EPSILON {
            continue;
        }
        let mut along = spacing - carried;
        while along <= length {
            points.push(a.lerp(b, along / length));
            along += spacing;
        }
        carried = length - (along - spacing);
    }
    if points.last().is_some_and(|p| p.distance(dense[dense.len() - 1]) > spacing * 0.5) {
        points.push(dense[dense.len() - 1]);
    }
    points
}

fn cubic_bezier(p0: Vec3, p1: Vec3, p2: Vec3, p3: Vec3, t: f32) -> Vec3 {
    let u = 1.0 - t;
    p0 * (u * u * u) + p1 * (3.0 * u * u * t) + p2 * (3.0 * u * t * t) + p3 * (t * t * t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bezier_points_on_a_line_are_evenly_spaced() {
        let points = bezier_points(&[Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0)], 1.0);
        assert_eq!(points.len(), 11);
        for pair in points.windows(2) {
            assert!((pair[0].distance(pair[1]) - 1.0).abs() < 1e-3);
        }
        assert!(points[10].distance(Vec3::new(10.0, 0.0, 0.0)) < 1e-3);
    }

    #[test]
    fn test_bezier_points_pass_near_control_points() {
        let controls: Vec<Vec3> = DEFAULT_ROAD_CONTROL_POINTS
            .iter()
            .map(|p| Vec3::new(p.x, 0.0, p.y))
            .collect();
        let points = bezier_points(&controls, 0.25);
        for control in &controls {
            let nearest = points
                .iter()
                .map(|p| p.distance(*control))
                .fold(f32::MAX, f32::min);
            assert!(nearest < 0.25, "control {control} missed by {nearest}");
        }
    }

    #[test]
    fn test_degenerate_inputs_pass_through() {
        assert!(bezier_points(&[], 1.0).is_empty());
        assert_eq!(bezier_points(&[Vec3::ONE], 1.0), vec![Vec3::ONE]);
    }

    #[test]
    fn test_straight_road_keeps_control_points() {
        let world = TerrainWorld::default();
        let road = Road::from_control_points(
            &[Vec2::new(1.0, 1.0), Vec2::new(5.0, 1.0)],
            RoadCurveType::Straight,
            1.0,
            &world,
        );
        assert_eq!(road.world_points.len(), 2);
        assert_eq!(road.world_points[1], Vec3::new(5.0, 0.0, 1.0));
    }
}
