//! Frame loop: clock, physics, pose sync, picking, clicks and render
//! dispatch, once per display refresh.
//!
//! Each [`FrameLoop::tick`] runs:
//! 1. Commit finished asset loads
//! 2. Sample input (latest pointer, queued clicks)
//! 3. Advance the clock and clamp the delta
//! 4. Apply scripted body drivers
//! 5. Step physics
//! 6. Copy body poses onto visual nodes, then propagate transforms
//! 7. Pick under the pointer and update hover state
//! 8. Dispatch clicks to the interaction controller
//! 9. Hand the scene and camera to the render dispatch

pub mod clock;

pub use clock::{FrameClock, MonotonicClock};

use glam::Vec2;
use tracing::debug;

use crate::assets::{AssetInbox, LoadResolver};
use crate::config::{ConfigError, LoopConfig};
use crate::ecs::components::physics::RigidBodyDesc;
use crate::ecs::components::transform::Pose;
use crate::input::{InputSink, MouseButton};
use crate::interaction::{InteractionController, Reaction, ReactionContext};
use crate::physics::{BodyHandle, PhysicsWorld, StepStats};
use crate::picking::{HoverEvent, PointerPicker};
use crate::renderer::viewer::Camera;
use crate::scene::{NodeId, Scene, VisualNodeDesc};
use crate::sync::{BodyVisualPair, PairingTable, PoseSynchronizer, SlotId, SyncReport};

/// Draws the scene. Called once per frame after all updates.
pub trait RenderDispatch {
    fn render(&mut self, scene: &Scene, camera: &Camera);
}

impl<F> RenderDispatch for F
where
    F: FnMut(&Scene, &Camera),
{
    fn render(&mut self, scene: &Scene, camera: &Camera) {
        self(scene, camera)
    }
}

/// Render dispatch that draws nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRender;

impl RenderDispatch for NullRender {
    fn render(&mut self, _scene: &Scene, _camera: &Camera) {}
}

/// Source of display refreshes.
///
/// Yields the host timestamp (seconds) of each refresh, or `None` once the
/// host tears the loop down.
pub trait RefreshSource {
    fn next_refresh(&mut self) -> Option<f64>;
}

impl<F> RefreshSource for F
where
    F: FnMut() -> Option<f64>,
{
    fn next_refresh(&mut self) -> Option<f64> {
        self()
    }
}

/// Evenly spaced timestamps, optionally ending after a frame count.
#[derive(Debug, Clone)]
pub struct FixedRateRefresh {
    period: f64,
    next: f64,
    remaining: Option<u64>,
}

impl FixedRateRefresh {
    pub fn new(rate_hz: f64) -> Self {
        let period = if rate_hz.is_finite() && rate_hz > 0.0 {
            1.0 / rate_hz
        } else {
            1.0 / 60.0
        };
        Self {
            period,
            next: 0.0,
            remaining: None,
        }
    }

    pub fn with_frames(mut self, frames: u64) -> Self {
        self.remaining = Some(frames);
        self
    }
}

impl RefreshSource for FixedRateRefresh {
    fn next_refresh(&mut self) -> Option<f64> {
        if let Some(remaining) = &mut self.remaining {
            if *remaining == 0 {
                return None;
            }
            *remaining -= 1;
        }
        let now = self.next;
        self.next += self.period;
        Some(now)
    }
}

/// Wall-clock refreshes that never end.
impl RefreshSource for MonotonicClock {
    fn next_refresh(&mut self) -> Option<f64> {
        Some(self.now())
    }
}

/// Computes a body's pose from elapsed seconds. Applied as a teleport
/// before each physics step whenever the pose changes.
pub type BodyDriver = Box<dyn FnMut(f64) -> Pose>;

/// All mutable state of a running scene.
pub struct SimulationContext {
    pub clock: FrameClock,
    pub physics: PhysicsWorld,
    pub scene: Scene,
    pub pairs: PairingTable,
    pub picker: PointerPicker,
    pub controller: InteractionController,
    pub camera: Camera,
    /// Pointer position sampled at the start of the current frame.
    pub pointer: Option<Vec2>,
}

/// What one [`FrameLoop::tick`] did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
    pub frame: u64,
    /// Delta measured by the clock.
    pub raw_delta: f64,
    /// Delta handed to the physics step after clamping.
    pub step_delta: f64,
    pub elapsed: f64,
    pub step: StepStats,
    pub sync: SyncReport,
    pub hover: Option<NodeId>,
    pub hover_events: Vec<HoverEvent>,
    pub clicks: usize,
    pub reactions: usize,
    pub committed: Vec<BodyVisualPair>,
    pub failed_loads: usize,
}

/// Orchestrates one frame of the simulation per display refresh.
pub struct FrameLoop<R: RenderDispatch = NullRender> {
    config: LoopConfig,
    context: SimulationContext,
    input: InputSink,
    inbox: AssetInbox,
    synchronizer: PoseSynchronizer,
    drivers: Vec<(BodyHandle, BodyDriver)>,
    render: R,
    frame: u64,
}

impl<R: RenderDispatch> FrameLoop<R> {
    pub fn new(config: LoopConfig, camera: Camera, render: R) -> Result<Self, ConfigError> {
        config.validate()?;
        let context = SimulationContext {
            clock: FrameClock::new(config.first_frame_delta),
            physics: PhysicsWorld::new(config.physics.clone()),
            scene: Scene::new(),
            pairs: PairingTable::new(),
            picker: PointerPicker::new(),
            controller: InteractionController::new(),
            camera,
            pointer: None,
        };
        Ok(Self {
            config,
            context,
            input: InputSink::new(),
            inbox: AssetInbox::new(),
            synchronizer: PoseSynchronizer,
            drivers: Vec::new(),
            render,
            frame: 0,
        })
    }

    pub fn config(&self) -> &LoopConfig {
        &self.config
    }

    /// Handle for input producers.
    pub fn input(&self) -> InputSink {
        self.input.clone()
    }

    pub fn context(&self) -> &SimulationContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut SimulationContext {
        &mut self.context
    }

    /// Camera for the controls collaborator to update between frames.
    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.context.camera
    }

    pub fn render_dispatch(&self) -> &R {
        &self.render
    }

    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    pub fn add_body(&mut self, desc: RigidBodyDesc) -> BodyHandle {
        self.context.physics.add_body(desc)
    }

    pub fn spawn(&mut self, desc: VisualNodeDesc) -> NodeId {
        self.context.scene.spawn(desc)
    }

    /// Pair a body with a node that both already exist.
    pub fn link(&mut self, body: BodyHandle, node: NodeId) -> SlotId {
        self.context.pairs.link(body, node)
    }

    /// Start an asynchronous load. Its result is committed at the start of
    /// the first frame after it resolves.
    pub fn begin_load(&mut self, label: impl Into<String>) -> LoadResolver {
        self.inbox.begin(&mut self.context.pairs, label)
    }

    pub fn register_reaction(&mut self, node: NodeId, reaction: impl Reaction + 'static) {
        self.context.controller.register(node, Box::new(reaction));
    }

    /// Drive `body` along a scripted path of elapsed time.
    pub fn drive_body(&mut self, body: BodyHandle, driver: impl FnMut(f64) -> Pose + 'static) {
        self.drivers.push((body, Box::new(driver)));
    }

    /// Run one frame for a refresh at host time `now` (seconds).
    pub fn tick(&mut self, now: f64) -> FrameReport {
        let ctx = &mut self.context;
        self.frame += 1;
        let mut report = FrameReport {
            frame: self.frame,
            ..Default::default()
        };

        let drained = self
            .inbox
            .drain(&mut ctx.pairs, &mut ctx.physics, &mut ctx.scene, &mut ctx.controller);
        report.committed = drained.committed;
        report.failed_loads = drained.failed;

        let input = self.input.drain();
        ctx.pointer = input.pointer;

        report.raw_delta = ctx.clock.tick(now);
        report.step_delta = report.raw_delta.min(self.config.max_frame_delta);
        if report.step_delta < report.raw_delta {
            debug!(
                raw = report.raw_delta,
                clamped = report.step_delta,
                "Frame delta clamped"
            );
        }
        report.elapsed = ctx.clock.elapsed();

        for (body, driver) in &mut self.drivers {
            let pose = driver(report.elapsed);
            // A teleport wakes everything touching the body; skip it when
            // the driver holds still.
            if ctx.physics.pose(*body) != Some(pose) {
                ctx.physics.teleport(*body, pose);
            }
        }

        report.step = ctx
            .physics
            .step(report.step_delta, self.config.physics.max_substeps);

        report.sync = self.synchronizer.sync(&ctx.pairs, &ctx.physics, &mut ctx.scene);
        ctx.scene.update_transforms();

        let hit = ctx.pointer.and_then(|ndc| {
            let candidates = ctx.scene.pickable_nodes();
            ctx.picker.pick(ndc, &ctx.camera, &ctx.scene, &candidates)
        });
        report.hover = hit.map(|h| h.node);
        report.hover_events = ctx.picker.update(report.hover);

        for click in &input.clicks {
            report.clicks += 1;
            if click.button != MouseButton::Left {
                continue;
            }
            let mut reaction_ctx = ReactionContext {
                physics: &mut ctx.physics,
                scene: &ctx.scene,
                pairs: &ctx.pairs,
            };
            if ctx.controller.on_click(ctx.picker.state(), &mut reaction_ctx) {
                report.reactions += 1;
            }
        }

        self.render.render(&ctx.scene, &ctx.camera);
        report
    }

    /// Tick once per refresh until `source` ends. Returns frames run.
    pub fn run(&mut self, source: &mut impl RefreshSource) -> u64 {
        let mut frames = 0;
        while let Some(now) = source.next_refresh() {
            self.tick(now);
            frames += 1;
        }
        frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::components::physics::Collider;
    use crate::ecs::components::scene::PickShape;
    use glam::Vec3;

    fn camera() -> Camera {
        Camera::new_perspective(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y, 60.0, 1.0, 0.1, 100.0)
    }

    #[test]
    fn test_fixed_rate_refresh_ends() {
        let mut source = FixedRateRefresh::new(50.0).with_frames(3);
        assert_eq!(source.next_refresh(), Some(0.0));
        assert_eq!(source.next_refresh(), Some(0.02));
        assert!(source.next_refresh().is_some());
        assert_eq!(source.next_refresh(), None);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = LoopConfig {
            max_frame_delta: 0.0,
            ..Default::default()
        };
        assert!(FrameLoop::new(config, camera(), NullRender).is_err());
    }

    #[test]
    fn test_delta_clamped_before_step() {
        let mut frame_loop = FrameLoop::new(LoopConfig::default(), camera(), NullRender).unwrap();
        let first = frame_loop.tick(0.0);
        assert_eq!(first.raw_delta, 0.0);
        assert_eq!(first.step.substeps, 0);

        let report = frame_loop.tick(5.0);
        assert_eq!(report.raw_delta, 5.0);
        assert_eq!(report.step_delta, 1.0 / 30.0);
        assert_eq!(report.step.substeps, 2);
    }

    #[test]
    fn test_render_sees_synced_pose() {
        let mut seen = Vec::new();
        {
            let render = |scene: &Scene, _camera: &Camera| {
                if let Some(node) = scene.find_by_name("ball") {
                    seen.push(scene.transform(node).map(|t| t.position.y));
                }
            };
            let mut frame_loop = FrameLoop::new(LoopConfig::default(), camera(), render).unwrap();
            let body = frame_loop.add_body(
                RigidBodyDesc::new(1.0, Collider::cuboid(Vec3::splat(0.5))).with_position(Vec3::new(0.0, 10.0, 0.0)),
            );
            let node = frame_loop.spawn(VisualNodeDesc::new("ball"));
            frame_loop.link(body, node);

            frame_loop.run(&mut FixedRateRefresh::new(60.0).with_frames(10));
            assert_eq!(frame_loop.frame_count(), 10);
        }

        assert_eq!(seen.len(), 10);
        assert_eq!(seen[0], Some(10.0));
        let last = seen[9].unwrap();
        assert!(last < 10.0, "body should fall, y = {last}");
    }

    #[test]
    fn test_right_click_does_not_react() {
        let mut frame_loop = FrameLoop::new(LoopConfig::default(), camera(), NullRender).unwrap();
        let node = frame_loop.spawn(VisualNodeDesc::new("button").pickable(PickShape::cuboid(Vec3::splat(0.5))));
        frame_loop.context_mut().controller.register_fn(node, |_, _| {});

        let input = frame_loop.input();
        input.pointer_moved(Vec2::ZERO);
        input.clicked(MouseButton::Right);
        let report = frame_loop.tick(0.0);
        assert_eq!(report.hover, Some(node));
        assert_eq!(report.clicks, 1);
        assert_eq!(report.reactions, 0);

        input.clicked(MouseButton::Left);
        let report = frame_loop.tick(0.016);
        assert_eq!(report.reactions, 1);
    }
}
