//! Transform components for ECS entities.

use glam::{Mat4, Quat, Vec3};

/// Position and orientation without scale.
///
/// Physics bodies carry a `Pose` as their only spatial component; visual
/// nodes receive one from the pose synchronizer every frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub orientation: Quat,
}

impl Pose {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        orientation: Quat::IDENTITY,
    };

    pub fn new(position: Vec3, orientation: Quat) -> Self {
        Self {
            position,
            orientation,
        }
    }

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            orientation: Quat::IDENTITY,
        }
    }

    /// Rigid transform matrix (rotation then translation).
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.orientation, self.position)
    }

    /// Map a point from local space into the space this pose lives in.
    #[inline]
    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.position + self.orientation * point
    }

    #[inline]
    pub fn inverse_transform_point(&self, point: Vec3) -> Vec3 {
        self.orientation.inverse() * (point - self.position)
    }

    /// Compose with a pose expressed in this pose's local frame.
    pub fn mul_pose(&self, local: &Pose) -> Pose {
        Pose {
            position: self.transform_point(local.position),
            orientation: (self.orientation * local.orientation).normalize(),
        }
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Local-space transform of a visual node. Scale is set at construction and
/// never touched by pose propagation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    pub fn identity() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::identity()
        }
    }

    pub fn from_pose(pose: Pose) -> Self {
        Self {
            position: pose.position,
            rotation: pose.orientation,
            scale: Vec3::ONE,
        }
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    pub fn pose(&self) -> Pose {
        Pose::new(self.position, self.rotation)
    }

    /// Overwrite position and rotation together, keeping scale.
    #[inline]
    pub fn set_pose(&mut self, pose: Pose) {
        *self = Self {
            position: pose.position,
            rotation: pose.orientation,
            scale: self.scale,
        };
    }

    /// Convert to a 4x4 matrix (translation * rotation * scale).
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

/// World-space transform matrix, refreshed by `transform_system`.
#[derive(Debug, Clone, Copy)]
pub struct GlobalTransform(pub Mat4);

impl Default for GlobalTransform {
    fn default() -> Self {
        Self(Mat4::IDENTITY)
    }
}

/// Reference to a parent entity.
pub struct Parent(pub hecs::Entity);

/// List of child entities.
pub struct Children(pub Vec<hecs::Entity>);
