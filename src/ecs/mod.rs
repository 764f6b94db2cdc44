//! Entity Component System integration with hecs.
//!
//! Physics bodies and visual nodes live in separate `hecs::World`s, owned by
//! [`crate::physics::PhysicsWorld`] and [`crate::scene::Scene`].

pub mod components;
pub mod systems;

pub mod prelude {
    pub use super::components::physics::{
        Collider, ColliderShape, RigidBody, RigidBodyDesc, RigidBodyType, ShapePart, SleepInfo,
        SleepState,
    };
    pub use super::components::scene::{MaterialHandle, MeshHandle, PickShape, VisualNode};
    pub use super::components::transform::{Children, GlobalTransform, Parent, Pose, Transform};
    pub use super::systems::transform_system;
}
