//! Physics components for body entities.

use glam::{Mat3, Quat, Vec3};

use crate::physics::material::MaterialId;

use super::transform::Pose;

/// Rigid body type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RigidBodyType {
    /// Affected by gravity, contacts and impulses.
    Dynamic,
    /// Infinite mass. Only moves when teleported.
    Static,
}

/// Rigid body component.
#[derive(Debug, Clone)]
pub struct RigidBody {
    pub body_type: RigidBodyType,
    pub mass: f32,
    pub inv_mass: f32,
    /// Inverse of the diagonal body-space inertia tensor.
    pub inv_inertia_local: Vec3,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
    pub force_accumulator: Vec3,
    pub torque_accumulator: Vec3,
    /// Fraction of linear velocity lost per second (default: 0.01).
    pub linear_damping: f32,
    /// Fraction of angular velocity lost per second (default: 0.01).
    pub angular_damping: f32,
    pub material: MaterialId,
}

impl RigidBody {
    /// Create a body for `collider`. A mass of zero (or less) yields a static body.
    pub fn new(mass: f32, collider: &Collider) -> Self {
        if mass <= 0.0 {
            return Self::new_static();
        }
        let inertia = collider.local_inertia(mass);
        let inv = |i: f32| if i > 0.0 { 1.0 / i } else { 0.0 };
        Self {
            body_type: RigidBodyType::Dynamic,
            mass,
            inv_mass: 1.0 / mass,
            inv_inertia_local: Vec3::new(inv(inertia.x), inv(inertia.y), inv(inertia.z)),
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            force_accumulator: Vec3::ZERO,
            torque_accumulator: Vec3::ZERO,
            linear_damping: 0.01,
            angular_damping: 0.01,
            material: MaterialId::DEFAULT,
        }
    }

    pub fn new_static() -> Self {
        Self {
            body_type: RigidBodyType::Static,
            mass: 0.0,
            inv_mass: 0.0,
            inv_inertia_local: Vec3::ZERO,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            force_accumulator: Vec3::ZERO,
            torque_accumulator: Vec3::ZERO,
            linear_damping: 0.0,
            angular_damping: 0.0,
            material: MaterialId::DEFAULT,
        }
    }

    #[inline]
    pub fn is_dynamic(&self) -> bool {
        self.body_type == RigidBodyType::Dynamic
    }

    /// World-space inverse inertia tensor for the given orientation.
    pub fn inv_inertia_world(&self, orientation: Quat) -> Mat3 {
        if !self.is_dynamic() {
            return Mat3::ZERO;
        }
        let r = Mat3::from_quat(orientation);
        r * Mat3::from_diagonal(self.inv_inertia_local) * r.transpose()
    }
}

/// Collider shape in part-local space.
#[derive(Debug, Clone, PartialEq)]
pub enum ColliderShape {
    Sphere { radius: f32 },
    Box { half_extents: Vec3 },
    /// Half-space below the local XZ plane; the surface normal is local +Y.
    /// Only meaningful on static bodies. Its bounds are infinite, so it is
    /// paired with every dynamic body however far from the origin.
    Plane,
}

impl ColliderShape {
    fn volume(&self) -> f32 {
        match self {
            ColliderShape::Sphere { radius } => 4.0 / 3.0 * std::f32::consts::PI * radius.powi(3),
            ColliderShape::Box { half_extents } => 8.0 * half_extents.x * half_extents.y * half_extents.z,
            ColliderShape::Plane => 0.0,
        }
    }

    /// Diagonal inertia about the shape's own center.
    fn inertia(&self, mass: f32) -> Vec3 {
        match self {
            ColliderShape::Sphere { radius } => Vec3::splat(0.4 * mass * radius * radius),
            ColliderShape::Box { half_extents: h } => {
                let (x2, y2, z2) = (h.x * h.x, h.y * h.y, h.z * h.z);
                Vec3::new(y2 + z2, x2 + z2, x2 + y2) * (mass / 3.0)
            }
            ColliderShape::Plane => Vec3::ZERO,
        }
    }
}

/// One convex piece of a collider, placed relative to the body origin.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapePart {
    pub shape: ColliderShape,
    pub offset: Vec3,
    pub rotation: Quat,
}

impl ShapePart {
    pub fn new(shape: ColliderShape) -> Self {
        Self {
            shape,
            offset: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }

    pub fn with_offset(mut self, offset: Vec3) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    /// World pose of this part for a body at `body`.
    #[inline]
    pub fn world_pose(&self, body: &Pose) -> Pose {
        body.mul_pose(&Pose::new(self.offset, self.rotation))
    }
}

/// Collision geometry component: one or more parts sharing a body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Collider {
    pub parts: Vec<ShapePart>,
}

impl Collider {
    pub fn single(shape: ColliderShape) -> Self {
        Self {
            parts: vec![ShapePart::new(shape)],
        }
    }

    pub fn cuboid(half_extents: Vec3) -> Self {
        Self::single(ColliderShape::Box { half_extents })
    }

    pub fn compound(parts: Vec<ShapePart>) -> Self {
        Self { parts }
    }

    pub fn with_part(mut self, part: ShapePart) -> Self {
        self.parts.push(part);
        self
    }

    /// Diagonal inertia about the body origin, mass split by part volume.
    ///
    /// Part rotations are ignored. Bodies without volume fall back to a solid
    /// sphere of radius 0.5.
    pub fn local_inertia(&self, mass: f32) -> Vec3 {
        let total: f32 = self.parts.iter().map(|p| p.shape.volume()).sum();
        if total <= 0.0 {
            return Vec3::splat(0.4 * mass * 0.25);
        }
        self.parts
            .iter()
            .map(|part| {
                let m = mass * part.shape.volume() / total;
                let d = part.offset;
                let parallel = Vec3::new(d.y * d.y + d.z * d.z, d.x * d.x + d.z * d.z, d.x * d.x + d.y * d.y);
                part.shape.inertia(m) + parallel * m
            })
            .sum()
    }
}

/// Sleep state for a dynamic body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SleepState {
    #[default]
    Awake,
    Sleeping,
}

/// Sleep bookkeeping component.
#[derive(Debug, Clone, Copy, Default)]
pub struct SleepInfo {
    pub state: SleepState,
    /// Seconds spent continuously under the sleep thresholds.
    pub timer: f32,
}

impl SleepInfo {
    #[inline]
    pub fn is_sleeping(&self) -> bool {
        self.state == SleepState::Sleeping
    }
}

/// Everything needed to create a body.
#[derive(Debug, Clone)]
pub struct RigidBodyDesc {
    pub mass: f32,
    pub collider: Collider,
    pub material: MaterialId,
    pub pose: Pose,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
}

impl RigidBodyDesc {
    pub fn new(mass: f32, collider: Collider) -> Self {
        Self {
            mass,
            collider,
            material: MaterialId::DEFAULT,
            pose: Pose::IDENTITY,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
        }
    }

    pub fn fixed(collider: Collider) -> Self {
        Self::new(0.0, collider)
    }

    pub fn with_pose(mut self, pose: Pose) -> Self {
        self.pose = pose;
        self
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.pose.position = position;
        self
    }

    pub fn with_material(mut self, material: MaterialId) -> Self {
        self.material = material;
        self
    }

    pub fn with_velocity(mut self, linear: Vec3) -> Self {
        self.linear_velocity = linear;
        self
    }
}
