//! Visual scene components for ECS entities.

use std::sync::Arc;

use glam::Vec3;

/// Opaque geometry handle issued by the render collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshHandle(pub u64);

/// Opaque material handle issued by the render collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialHandle(pub u64);

/// Drawable scene node. ECS equivalent of a scene graph object.
#[derive(Debug, Clone)]
pub struct VisualNode {
    pub name: String,
    pub mesh: Option<MeshHandle>,
    pub material: Option<MaterialHandle>,
    /// Eligible for pointer picking.
    pub pickable: bool,
    /// Hidden nodes are neither drawn nor picked.
    pub hidden: bool,
}

/// Node-local geometry tested by the pointer ray.
#[derive(Debug, Clone, PartialEq)]
pub enum PickShape {
    Box { half_extents: Vec3 },
    Sphere { radius: f32 },
    /// Triangle soup, e.g. the collision proxy of a loaded model.
    Triangles(Arc<[[Vec3; 3]]>),
}

impl PickShape {
    pub fn cuboid(half_extents: Vec3) -> Self {
        Self::Box { half_extents }
    }

    pub fn triangles(triangles: Vec<[Vec3; 3]>) -> Self {
        Self::Triangles(triangles.into())
    }
}
