//! Narrowphase collision detection: SAT for boxes plus specialized tests.
//!
//! Every test reports the contact normal pointing from shape A to shape B.

use glam::{Mat3, Vec3};

use crate::ecs::components::physics::ColliderShape;
use crate::ecs::components::transform::Pose;

use super::collider::{box_vertices, plane_normal};
use super::contact::{ContactInfo, ContactSample};

/// Slack allowed when testing whether a vertex lies inside a box.
const VERTEX_INSIDE_TOLERANCE: f32 = 1.0e-3;
/// Contact points closer than this are merged.
const POINT_MERGE_DISTANCE_SQ: f32 = 1.0e-4 * 1.0e-4;
/// Edge axes must beat the best face axis by this factor to be chosen.
const EDGE_AXIS_PREFERENCE: f32 = 0.95;

/// Specialized sphere-sphere intersection test.
pub fn sphere_sphere(radius_a: f32, center_a: Vec3, radius_b: f32, center_b: Vec3) -> Option<ContactInfo> {
    let diff = center_b - center_a;
    let dist_sq = diff.length_squared();
    let min_dist = radius_a + radius_b;

    if dist_sq >= min_dist * min_dist {
        return None;
    }

    let dist = dist_sq.sqrt();
    let normal = if dist > 1e-6 { diff / dist } else { Vec3::Y };

    let penetration = min_dist - dist;
    let point = center_a + normal * (radius_a - penetration * 0.5);

    Some(ContactInfo::single(normal, point, penetration))
}

/// Box against sphere. The normal points from the box to the sphere.
pub fn box_sphere(half: Vec3, box_pose: &Pose, radius: f32, center: Vec3) -> Option<ContactInfo> {
    let local = box_pose.inverse_transform_point(center);
    let closest = local.clamp(-half, half);

    if closest == local {
        // Center inside the box: push out through the nearest face.
        let gaps = half - local.abs();
        let axis = if gaps.x <= gaps.y && gaps.x <= gaps.z {
            0
        } else if gaps.y <= gaps.z {
            1
        } else {
            2
        };
        let sign = if local[axis] < 0.0 { -1.0 } else { 1.0 };
        let mut local_normal = Vec3::ZERO;
        local_normal[axis] = sign;
        let mut surface = local;
        surface[axis] = sign * half[axis];

        return Some(ContactInfo::single(
            box_pose.orientation * local_normal,
            box_pose.transform_point(surface),
            radius + gaps[axis],
        ));
    }

    let diff = local - closest;
    let dist_sq = diff.length_squared();
    if dist_sq >= radius * radius {
        return None;
    }
    let dist = dist_sq.sqrt();
    Some(ContactInfo::single(
        box_pose.orientation * (diff / dist),
        box_pose.transform_point(closest),
        radius - dist,
    ))
}

/// Half-space against sphere. The normal is the plane normal.
pub fn plane_sphere(plane_pose: &Pose, radius: f32, center: Vec3) -> Option<ContactInfo> {
    let normal = plane_normal(plane_pose);
    let depth = radius - (center - plane_pose.position).dot(normal);
    if depth <= 0.0 {
        return None;
    }
    Some(ContactInfo::single(normal, center - normal * radius, depth))
}

/// Half-space against box: one contact per submerged vertex.
pub fn plane_box(plane_pose: &Pose, half: Vec3, box_pose: &Pose) -> Option<ContactInfo> {
    let normal = plane_normal(plane_pose);
    let points: Vec<ContactSample> = box_vertices(half, box_pose)
        .into_iter()
        .filter_map(|v| {
            let d = (v - plane_pose.position).dot(normal);
            (d < 0.0).then_some(ContactSample {
                position: v,
                penetration: -d,
            })
        })
        .collect();

    if points.is_empty() {
        None
    } else {
        Some(ContactInfo { normal, points })
    }
}

/// SAT (Separating Axis Theorem) test for box-box collision.
///
/// Contact points are the vertices of each box found inside the other. When
/// none are (edge-edge contact or deep overlap), a single point on the
/// overlap mid-plane is reported.
pub fn sat_box_box(half_a: Vec3, pose_a: &Pose, half_b: Vec3, pose_b: &Pose) -> Option<ContactInfo> {
    let rot_a = Mat3::from_quat(pose_a.orientation);
    let rot_b = Mat3::from_quat(pose_b.orientation);
    let axes_a = [rot_a.x_axis, rot_a.y_axis, rot_a.z_axis];
    let axes_b = [rot_b.x_axis, rot_b.y_axis, rot_b.z_axis];
    let half_a_arr = half_a.to_array();
    let half_b_arr = half_b.to_array();

    let t = pose_b.position - pose_a.position;

    let mut min_overlap = f32::MAX;
    let mut best_axis = Vec3::ZERO;

    // Face normals of A, then of B
    for axis in axes_a.iter().chain(axes_b.iter()) {
        let overlap = sat_test_axis(*axis, &axes_a, &half_a_arr, &axes_b, &half_b_arr, t)?;
        if overlap < min_overlap {
            min_overlap = overlap;
            best_axis = *axis;
        }
    }

    // Edge-edge cross products
    for edge_a in &axes_a {
        for edge_b in &axes_b {
            let axis = edge_a.cross(*edge_b);
            let len = axis.length();
            if len < 1e-6 {
                continue; // Parallel edges
            }
            let axis = axis / len;
            let overlap = sat_test_axis(axis, &axes_a, &half_a_arr, &axes_b, &half_b_arr, t)?;
            if overlap < min_overlap * EDGE_AXIS_PREFERENCE {
                min_overlap = overlap;
                best_axis = axis;
            }
        }
    }

    // Ensure normal points from A to B
    if best_axis.dot(t) < 0.0 {
        best_axis = -best_axis;
    }
    let normal = best_axis;

    // Extent of A along +n and of B along -n
    let top_a = pose_a.position.dot(normal) + project(normal, &axes_a, &half_a_arr);
    let bottom_b = pose_b.position.dot(normal) - project(normal, &axes_b, &half_b_arr);

    let mut points: Vec<ContactSample> = Vec::with_capacity(8);
    for v in box_vertices(half_b, pose_b) {
        if point_in_box(v, half_a, pose_a) {
            push_unique(&mut points, v, (top_a - v.dot(normal)).max(0.0));
        }
    }
    for v in box_vertices(half_a, pose_a) {
        if point_in_box(v, half_b, pose_b) {
            push_unique(&mut points, v, (v.dot(normal) - bottom_b).max(0.0));
        }
    }

    if points.is_empty() {
        // Anchor on the mid-plane below the smaller box's center.
        let position = if half_b.element_sum() <= half_a.element_sum() {
            pose_b.position - normal * (project(normal, &axes_b, &half_b_arr) - min_overlap * 0.5)
        } else {
            pose_a.position + normal * (project(normal, &axes_a, &half_a_arr) - min_overlap * 0.5)
        };
        points.push(ContactSample {
            position,
            penetration: min_overlap,
        });
    }

    Some(ContactInfo { normal, points })
}

/// Test a single SAT axis. Returns Some(overlap) if overlapping, None if separating.
fn sat_test_axis(
    axis: Vec3,
    axes_a: &[Vec3; 3],
    half_a: &[f32; 3],
    axes_b: &[Vec3; 3],
    half_b: &[f32; 3],
    t: Vec3,
) -> Option<f32> {
    let proj_a = project(axis, axes_a, half_a);
    let proj_b = project(axis, axes_b, half_b);

    let dist = t.dot(axis).abs();
    let overlap = proj_a + proj_b - dist;

    if overlap > 0.0 {
        Some(overlap)
    } else {
        None
    }
}

/// Half-length of a box's projection onto `axis`.
fn project(axis: Vec3, axes: &[Vec3; 3], half: &[f32; 3]) -> f32 {
    axes.iter()
        .zip(half)
        .map(|(a, h)| h * a.dot(axis).abs())
        .sum()
}

fn point_in_box(point: Vec3, half: Vec3, pose: &Pose) -> bool {
    let local = pose.inverse_transform_point(point).abs();
    let limit = half + Vec3::splat(VERTEX_INSIDE_TOLERANCE);
    local.cmple(limit).all()
}

fn push_unique(points: &mut Vec<ContactSample>, position: Vec3, penetration: f32) {
    if points
        .iter()
        .any(|p| (p.position - position).length_squared() < POINT_MERGE_DISTANCE_SQ)
    {
        return;
    }
    points.push(ContactSample {
        position,
        penetration,
    });
}

/// Detect collision between two shapes, dispatching to the specialized tests.
pub fn detect_collision(
    shape_a: &ColliderShape,
    pose_a: &Pose,
    shape_b: &ColliderShape,
    pose_b: &Pose,
) -> Option<ContactInfo> {
    use ColliderShape::{Box, Plane, Sphere};

    match (shape_a, shape_b) {
        (Sphere { radius: ra }, Sphere { radius: rb }) => {
            sphere_sphere(*ra, pose_a.position, *rb, pose_b.position)
        }
        (Box { half_extents }, Sphere { radius }) => {
            box_sphere(*half_extents, pose_a, *radius, pose_b.position)
        }
        (Sphere { radius }, Box { half_extents }) => {
            box_sphere(*half_extents, pose_b, *radius, pose_a.position).map(ContactInfo::flipped)
        }
        (Box { half_extents: ha }, Box { half_extents: hb }) => sat_box_box(*ha, pose_a, *hb, pose_b),
        (Plane, Sphere { radius }) => plane_sphere(pose_a, *radius, pose_b.position),
        (Sphere { radius }, Plane) => {
            plane_sphere(pose_b, *radius, pose_a.position).map(ContactInfo::flipped)
        }
        (Plane, Box { half_extents }) => plane_box(pose_a, *half_extents, pose_b),
        (Box { half_extents }, Plane) => {
            plane_box(pose_b, *half_extents, pose_a).map(ContactInfo::flipped)
        }
        (Plane, Plane) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;

    #[test]
    fn test_sphere_sphere_intersection() {
        let info = sphere_sphere(1.0, Vec3::ZERO, 1.0, Vec3::new(1.5, 0.0, 0.0)).unwrap();

        let eps = 1e-4;
        assert!((info.normal - Vec3::X).length() < eps);
        assert!((info.max_penetration() - 0.5).abs() < eps);
    }

    #[test]
    fn test_sphere_sphere_no_intersection() {
        assert!(sphere_sphere(1.0, Vec3::ZERO, 1.0, Vec3::new(3.0, 0.0, 0.0)).is_none());
    }

    #[test]
    fn test_box_sphere_outside_face() {
        let info = box_sphere(
            Vec3::splat(0.5),
            &Pose::IDENTITY,
            0.25,
            Vec3::new(0.0, 0.7, 0.0),
        )
        .unwrap();

        let eps = 1e-5;
        assert!((info.normal - Vec3::Y).length() < eps);
        assert!((info.points[0].penetration - 0.05).abs() < eps);
        assert!((info.points[0].position - Vec3::new(0.0, 0.5, 0.0)).length() < eps);
    }

    #[test]
    fn test_box_sphere_center_inside() {
        let info = box_sphere(
            Vec3::splat(0.5),
            &Pose::IDENTITY,
            0.1,
            Vec3::new(0.4, 0.0, 0.0),
        )
        .unwrap();
        assert!((info.normal - Vec3::X).length() < 1e-5);
        assert!((info.points[0].penetration - 0.2).abs() < 1e-5);
    }

    #[test]
    fn test_sat_box_box_intersection() {
        let info = sat_box_box(
            Vec3::splat(1.0),
            &Pose::IDENTITY,
            Vec3::splat(1.0),
            &Pose::from_position(Vec3::new(1.5, 0.0, 0.0)),
        )
        .unwrap();
        assert!((info.normal - Vec3::X).length() < 1e-5);
        assert!(info.max_penetration() > 0.0);
    }

    #[test]
    fn test_sat_box_box_no_intersection() {
        let result = sat_box_box(
            Vec3::splat(1.0),
            &Pose::IDENTITY,
            Vec3::splat(1.0),
            &Pose::from_position(Vec3::new(3.0, 0.0, 0.0)),
        );
        assert!(result.is_none());
    }

    #[test]
    fn test_resting_box_gets_four_contacts() {
        // Small box sinking 1cm into a wide slab below it.
        let floor = Pose::from_position(Vec3::new(0.0, -0.1, 0.0));
        let cube = Pose::from_position(Vec3::new(0.0, 0.49, 0.0));
        let info = sat_box_box(Vec3::new(5.0, 0.1, 5.0), &floor, Vec3::splat(0.5), &cube).unwrap();

        assert!((info.normal - Vec3::Y).length() < 1e-5);
        assert_eq!(info.points.len(), 4);
        for p in &info.points {
            assert!((p.penetration - 0.01).abs() < 1e-4);
        }
    }

    #[test]
    fn test_edge_contact_falls_back_to_single_point() {
        let a = Pose::IDENTITY;
        let b = Pose::new(
            Vec3::new(0.0, 1.35, 0.0),
            Quat::from_rotation_x(std::f32::consts::FRAC_PI_4) * Quat::from_rotation_y(std::f32::consts::FRAC_PI_4),
        );
        if let Some(info) = sat_box_box(Vec3::splat(0.5), &a, Vec3::splat(0.5), &b) {
            assert!(!info.points.is_empty());
            assert!(info.normal.dot(Vec3::Y) > 0.0);
        }
    }

    #[test]
    fn test_plane_box_submerged_vertices() {
        let cube = Pose::from_position(Vec3::new(0.0, 0.45, 0.0));
        let info = plane_box(&Pose::IDENTITY, Vec3::splat(0.5), &cube).unwrap();
        assert_eq!(info.normal, Vec3::Y);
        assert_eq!(info.points.len(), 4);
        assert!((info.max_penetration() - 0.05).abs() < 1e-5);
    }

    #[test]
    fn test_plane_sphere() {
        let info = plane_sphere(&Pose::IDENTITY, 0.5, Vec3::new(0.0, 0.4, 0.0)).unwrap();
        assert!((info.max_penetration() - 0.1).abs() < 1e-5);
        assert!(plane_sphere(&Pose::IDENTITY, 0.5, Vec3::new(0.0, 0.6, 0.0)).is_none());
    }

    #[test]
    fn test_detect_collision_dispatch_flips_normal() {
        let sphere = ColliderShape::Sphere { radius: 0.25 };
        let cube = ColliderShape::Box {
            half_extents: Vec3::splat(0.5),
        };
        let sphere_pose = Pose::from_position(Vec3::new(0.0, 0.7, 0.0));

        let ab = detect_collision(&cube, &Pose::IDENTITY, &sphere, &sphere_pose).unwrap();
        let ba = detect_collision(&sphere, &sphere_pose, &cube, &Pose::IDENTITY).unwrap();
        assert!((ab.normal + ba.normal).length() < 1e-5);

        let plane = ColliderShape::Plane;
        assert!(detect_collision(&plane, &Pose::IDENTITY, &plane, &Pose::IDENTITY).is_none());
        let below = detect_collision(&cube, &Pose::from_position(Vec3::new(0.0, 0.4, 0.0)), &plane, &Pose::IDENTITY).unwrap();
        assert_eq!(below.normal, -Vec3::Y);
    }
}
