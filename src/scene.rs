//! Visual scene graph backed by a hecs world.

use glam::{Mat4, Quat, Vec3};
use tracing::debug;

use crate::ecs::components::scene::{MaterialHandle, MeshHandle, PickShape, VisualNode};
use crate::ecs::components::transform::{Children, GlobalTransform, Parent, Pose, Transform};
use crate::ecs::systems::transform_system;

/// Opaque handle to a node in a [`Scene`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) hecs::Entity);

/// Everything needed to spawn a visual node.
#[derive(Debug, Clone)]
pub struct VisualNodeDesc {
    pub name: String,
    pub mesh: Option<MeshHandle>,
    pub material: Option<MaterialHandle>,
    pub transform: Transform,
    pub pickable: bool,
    pub hidden: bool,
    pub pick_shape: Option<PickShape>,
    pub parent: Option<NodeId>,
}

impl VisualNodeDesc {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mesh: None,
            material: None,
            transform: Transform::identity(),
            pickable: false,
            hidden: false,
            pick_shape: None,
            parent: None,
        }
    }

    pub fn with_mesh(mut self, mesh: MeshHandle, material: MaterialHandle) -> Self {
        self.mesh = Some(mesh);
        self.material = Some(material);
        self
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.transform.position = position;
        self
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.transform.rotation = rotation;
        self
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.transform.scale = scale;
        self
    }

    /// Make the node pickable with the given node-local geometry.
    pub fn pickable(mut self, shape: PickShape) -> Self {
        self.pickable = true;
        self.pick_shape = Some(shape);
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn with_parent(mut self, parent: NodeId) -> Self {
        self.parent = Some(parent);
        self
    }
}

/// Visual scene: nodes with local transforms, propagated world matrices and
/// optional pick geometry.
#[derive(Default)]
pub struct Scene {
    world: hecs::World,
    /// Nodes in spawn order; defines picking tie-breaks.
    order: Vec<NodeId>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a node. A parent that no longer exists is ignored.
    pub fn spawn(&mut self, desc: VisualNodeDesc) -> NodeId {
        let node = VisualNode {
            name: desc.name,
            mesh: desc.mesh,
            material: desc.material,
            pickable: desc.pickable,
            hidden: desc.hidden,
        };
        let entity = self.world.spawn((node, desc.transform, GlobalTransform::default()));
        if let Some(shape) = desc.pick_shape {
            let _ = self.world.insert_one(entity, shape);
        }

        if let Some(parent) = desc.parent.filter(|p| self.world.contains(p.0)) {
            let _ = self.world.insert_one(entity, Parent(parent.0));
            let has_children = match self.world.get::<&mut Children>(parent.0) {
                Ok(mut children) => {
                    children.0.push(entity);
                    true
                }
                Err(_) => false,
            };
            if !has_children {
                let _ = self.world.insert_one(parent.0, Children(vec![entity]));
            }
        }

        let id = NodeId(entity);
        self.order.push(id);
        debug!(?entity, "Spawned visual node");
        id
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.world.contains(node.0)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Nodes in spawn order.
    pub fn nodes(&self) -> &[NodeId] {
        &self.order
    }

    pub fn node(&self, node: NodeId) -> Option<VisualNode> {
        self.world.get::<&VisualNode>(node.0).ok().map(|n| (*n).clone())
    }

    pub fn name(&self, node: NodeId) -> Option<String> {
        self.world.get::<&VisualNode>(node.0).ok().map(|n| n.name.clone())
    }

    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.order.iter().copied().find(|id| {
            self.world
                .get::<&VisualNode>(id.0)
                .is_ok_and(|n| n.name == name)
        })
    }

    pub fn transform(&self, node: NodeId) -> Option<Transform> {
        self.world.get::<&Transform>(node.0).ok().map(|t| *t)
    }

    /// World matrix as of the last [`Scene::update_transforms`].
    pub fn global_matrix(&self, node: NodeId) -> Option<Mat4> {
        self.world.get::<&GlobalTransform>(node.0).ok().map(|g| g.0)
    }

    pub fn pick_shape(&self, node: NodeId) -> Option<PickShape> {
        self.world.get::<&PickShape>(node.0).ok().map(|s| (*s).clone())
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.world.get::<&Parent>(node.0).ok().map(|p| NodeId(p.0))
    }

    pub fn set_hidden(&mut self, node: NodeId, hidden: bool) -> bool {
        match self.world.get::<&mut VisualNode>(node.0) {
            Ok(mut n) => {
                n.hidden = hidden;
                true
            }
            Err(_) => false,
        }
    }

    /// Overwrite a node's position and orientation in a single assignment.
    pub(crate) fn set_pose(&mut self, node: NodeId, pose: Pose) -> bool {
        match self.world.get::<&mut Transform>(node.0) {
            Ok(mut transform) => {
                transform.set_pose(pose);
                true
            }
            Err(_) => false,
        }
    }

    /// Pickable, visible nodes that carry pick geometry, in spawn order.
    pub fn pickable_nodes(&self) -> Vec<NodeId> {
        self.order
            .iter()
            .copied()
            .filter(|id| self.is_pick_candidate(*id))
            .collect()
    }

    pub(crate) fn is_pick_candidate(&self, node: NodeId) -> bool {
        let Ok(mut query) = self.world.query_one::<(&VisualNode, &PickShape)>(node.0) else {
            return false;
        };
        query.get().is_some_and(|(n, _)| n.pickable && !n.hidden)
    }

    /// Propagate local transforms into world matrices.
    pub fn update_transforms(&mut self) -> usize {
        transform_system(&mut self.world)
    }

    /// Read-only access to the node store, for render collaborators.
    pub fn world(&self) -> &hecs::World {
        &self.world
    }
}
