//! Bounding volumes and world-space geometry helpers for colliders.

use glam::{Mat3, Vec3};

use crate::ecs::components::physics::{Collider, ColliderShape};
use crate::ecs::components::transform::Pose;

/// Axis-aligned bounding box for broadphase collision detection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicsAabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl PhysicsAabb {
    pub fn point(p: Vec3) -> Self {
        Self { min: p, max: p }
    }

    /// Test whether two AABBs overlap.
    #[inline]
    pub fn overlaps(&self, other: &PhysicsAabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    #[inline]
    pub fn union(&self, other: &PhysicsAabb) -> PhysicsAabb {
        PhysicsAabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }
}

impl ColliderShape {
    /// World-space AABB of this shape at `pose`.
    pub fn compute_aabb(&self, pose: &Pose) -> PhysicsAabb {
        match self {
            ColliderShape::Sphere { radius } => PhysicsAabb {
                min: pose.position - Vec3::splat(*radius),
                max: pose.position + Vec3::splat(*radius),
            },
            ColliderShape::Box { half_extents } => {
                // Project the rotated box axes onto the world axes.
                let rot = Mat3::from_quat(pose.orientation);
                let extent = rot.x_axis.abs() * half_extents.x
                    + rot.y_axis.abs() * half_extents.y
                    + rot.z_axis.abs() * half_extents.z;
                PhysicsAabb {
                    min: pose.position - extent,
                    max: pose.position + extent,
                }
            }
            ColliderShape::Plane => PhysicsAabb {
                min: Vec3::NEG_INFINITY,
                max: Vec3::INFINITY,
            },
        }
    }
}

impl Collider {
    /// Union of all part AABBs for a body at `body_pose`.
    pub fn compute_aabb(&self, body_pose: &Pose) -> PhysicsAabb {
        self.parts
            .iter()
            .map(|part| part.shape.compute_aabb(&part.world_pose(body_pose)))
            .reduce(|a, b| a.union(&b))
            .unwrap_or_else(|| PhysicsAabb::point(body_pose.position))
    }
}

/// World-space corners of a box.
pub fn box_vertices(half_extents: Vec3, pose: &Pose) -> [Vec3; 8] {
    let h = half_extents;
    let mut out = [Vec3::ZERO; 8];
    for (i, corner) in out.iter_mut().enumerate() {
        let local = Vec3::new(
            if i & 1 == 0 { -h.x } else { h.x },
            if i & 2 == 0 { -h.y } else { h.y },
            if i & 4 == 0 { -h.z } else { h.z },
        );
        *corner = pose.transform_point(local);
    }
    out
}

/// World-space surface normal of a plane part.
#[inline]
pub fn plane_normal(pose: &Pose) -> Vec3 {
    pose.orientation * Vec3::Y
}
