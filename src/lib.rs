//! Rein lockstep core
//!
//! Keeps a rigid-body simulation and a visual scene graph in step, and
//! resolves pointer input against the visual geometry.
//!
//! # Architecture
//!
//! Leaf-first:
//!
//! 1. **engine::clock** - Frame timing
//! 2. **physics** - Fixed-step rigid bodies, sweep-and-prune broadphase, sequential impulses
//! 3. **sync** - Body/node pairing and per-frame pose propagation
//! 4. **picking** - Pointer rays, nearest-hit picking, hover state machine
//! 5. **interaction** - Click → reaction registration table
//! 6. **engine** - The frame loop tying the above together
//!
//! Supporting modules: **ecs** (hecs components and systems), **scene**
//! (visual node store), **renderer** (cameras), **input**, **assets**
//! (asynchronous load commits) and **config**.

pub mod assets;
pub mod config;
pub mod ecs;
pub mod engine;
pub mod input;
pub mod interaction;
pub mod physics;
pub mod picking;
pub mod renderer;
pub mod scene;
pub mod sync;

// Re-export commonly used types
pub use assets::{AssetInbox, LoadError, LoadResolver, LoadedAsset, ReactionTarget};
pub use config::{ConfigError, LoopConfig};
pub use ecs::prelude::*;
pub use engine::{
    BodyDriver, FixedRateRefresh, FrameClock, FrameLoop, FrameReport, MonotonicClock, NullRender,
    RefreshSource, RenderDispatch, SimulationContext,
};
pub use input::{Click, InputSink, MouseButton};
pub use interaction::{ApplyImpulse, InteractionController, Reaction, ReactionContext, ResetPose};
pub use physics::material::{ContactMaterial, MaterialId};
pub use physics::{BodyHandle, BodyState, PhysicsConfig, PhysicsWorld, StepStats};
pub use picking::{HoverEvent, HoverState, PickHit, PointerPicker, Ray};
pub use renderer::{Camera, Projection, Viewer, Viewport};
pub use scene::{NodeId, Scene, VisualNodeDesc};
pub use sync::{BodyVisualPair, PairSlot, PairingTable, PoseSynchronizer, SlotId, SyncReport};

pub use glam;
