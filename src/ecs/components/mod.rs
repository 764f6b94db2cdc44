//! ECS components (transform, scene, physics).

pub mod physics;
pub mod scene;
pub mod transform;

pub use physics::*;
pub use scene::*;
pub use transform::*;
