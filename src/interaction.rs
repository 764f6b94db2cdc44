//! Click handling: a registration table from visual nodes to reactions.

use std::collections::HashMap;

use glam::Vec3;
use tracing::{debug, info};

use crate::ecs::components::transform::Pose;
use crate::physics::{BodyHandle, PhysicsWorld};
use crate::picking::HoverState;
use crate::scene::{NodeId, Scene};
use crate::sync::PairingTable;

/// What a reaction may touch while it runs.
pub struct ReactionContext<'a> {
    pub physics: &'a mut PhysicsWorld,
    pub scene: &'a Scene,
    pub pairs: &'a PairingTable,
}

impl ReactionContext<'_> {
    /// Body paired with `node`, or with its nearest paired ancestor.
    ///
    /// Clicking a mesh inside an imported model hits a child node while the
    /// body is paired with the model root.
    pub fn body_for(&self, node: NodeId) -> Option<BodyHandle> {
        let mut current = Some(node);
        while let Some(n) = current {
            if let Some(body) = self.pairs.body_for_node(n) {
                return Some(body);
            }
            current = self.scene.parent(n);
        }
        None
    }
}

/// Response to a click on a registered node.
pub trait Reaction: Send {
    fn react(&mut self, node: NodeId, ctx: &mut ReactionContext<'_>);
}

impl<F> Reaction for F
where
    F: FnMut(NodeId, &mut ReactionContext<'_>) + Send,
{
    fn react(&mut self, node: NodeId, ctx: &mut ReactionContext<'_>) {
        self(node, ctx)
    }
}

/// Teleport the clicked node's body to a fixed pose and wake it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResetPose {
    pub pose: Pose,
    pub clear_velocity: bool,
}

impl ResetPose {
    pub fn new(pose: Pose) -> Self {
        Self {
            pose,
            clear_velocity: true,
        }
    }

    pub fn keep_velocity(mut self) -> Self {
        self.clear_velocity = false;
        self
    }
}

impl Reaction for ResetPose {
    fn react(&mut self, node: NodeId, ctx: &mut ReactionContext<'_>) {
        let Some(body) = ctx.body_for(node) else {
            debug!(?node, "Reset clicked on node without a body");
            return;
        };
        ctx.physics.teleport(body, self.pose);
        if self.clear_velocity {
            ctx.physics.set_velocity(body, Vec3::ZERO, Vec3::ZERO);
        }
        info!(?node, ?body, position = ?self.pose.position, "Body reset");
    }
}

/// Kick the clicked node's body through its center of mass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ApplyImpulse {
    pub impulse: Vec3,
}

impl Reaction for ApplyImpulse {
    fn react(&mut self, node: NodeId, ctx: &mut ReactionContext<'_>) {
        let Some(body) = ctx.body_for(node) else {
            return;
        };
        let Some(pose) = ctx.physics.pose(body) else {
            return;
        };
        if ctx.physics.apply_impulse(body, self.impulse, pose.position) {
            info!(?node, ?body, impulse = ?self.impulse, "Impulse applied");
        }
    }
}

/// Dispatches clicks on the hovered node to its registered reaction.
#[derive(Default)]
pub struct InteractionController {
    reactions: HashMap<NodeId, Box<dyn Reaction>>,
}

impl InteractionController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the reaction for `node`.
    pub fn register(&mut self, node: NodeId, reaction: Box<dyn Reaction>) {
        self.reactions.insert(node, reaction);
    }

    /// Register a closure as the reaction for `node`.
    pub fn register_fn<F>(&mut self, node: NodeId, reaction: F)
    where
        F: FnMut(NodeId, &mut ReactionContext<'_>) + Send + 'static,
    {
        self.register(node, Box::new(reaction));
    }

    pub fn unregister(&mut self, node: NodeId) -> bool {
        self.reactions.remove(&node).is_some()
    }

    pub fn is_interactive(&self, node: NodeId) -> bool {
        self.reactions.contains_key(&node)
    }

    pub fn len(&self) -> usize {
        self.reactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reactions.is_empty()
    }

    /// Handle one click. Returns `true` if a reaction ran.
    pub fn on_click(&mut self, hover: HoverState, ctx: &mut ReactionContext<'_>) -> bool {
        let HoverState::Hovering(node) = hover else {
            return false;
        };
        let Some(reaction) = self.reactions.get_mut(&node) else {
            return false;
        };
        reaction.react(node, ctx);
        true
    }
}
