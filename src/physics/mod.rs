//! CPU rigid body simulation with sweep-and-prune broadphase.
//!
//! # Architecture
//!
//! The physics pipeline runs in a fixed timestep loop. Each substep:
//!
//! 1. Refresh broadphase bounds of moving and teleported bodies
//! 2. Apply forces (gravity) and integrate velocities
//! 3. Broadphase collision detection (sweep and prune on X)
//! 4. Narrowphase collision detection per shape part pair
//! 5. Warm-start and solve contact constraints (sequential impulse)
//! 6. Integrate positions
//! 7. Update sleep states
//! 8. Clear force accumulators and teleport marks
//!
//! Nothing in the pipeline reads the wall clock or iterates a hash map, so
//! identical inputs replay identically.

pub mod broadphase;
pub mod collider;
pub mod contact;
pub mod material;
pub mod narrowphase;
pub mod rigid_body;
pub mod solver;

use glam::Vec3;
use serde::Deserialize;
use tracing::{debug, trace};

use crate::ecs::components::physics::{Collider, ColliderShape, RigidBody, RigidBodyDesc, SleepInfo};
use crate::ecs::components::transform::Pose;

use self::broadphase::SweepAndPrune;
use self::contact::{ContactCache, ContactManifold, ContactPoint};
use self::material::{ContactMaterial, MaterialId, MaterialTable};
use self::narrowphase::detect_collision;

/// Configuration for the physics simulation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Gravity vector. Default: (0, -9.82, 0).
    pub gravity: Vec3,
    /// Fixed timestep for physics updates in seconds. Default: 1/60.
    pub fixed_timestep: f64,
    /// Maximum number of sub-steps per frame. Default: 3.
    pub max_substeps: u32,
    /// Number of constraint solver iterations. Default: 10.
    pub solver_iterations: u32,
    /// Whether slow bodies may go to sleep. Default: true.
    pub allow_sleep: bool,
    /// Linear speed below which a body counts as still. Default: 0.1.
    pub sleep_linear_threshold: f32,
    /// Angular speed below which a body counts as still. Default: 0.1.
    pub sleep_angular_threshold: f32,
    /// Seconds a body must stay still before sleeping. Default: 1.
    pub sleep_time_limit: f32,
    /// Friction of the default material. Default: 0.3.
    pub default_friction: f32,
    /// Restitution of the default material. Default: 0.3.
    pub default_restitution: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, -9.82, 0.0),
            fixed_timestep: 1.0 / 60.0,
            max_substeps: 3,
            solver_iterations: 10,
            allow_sleep: true,
            sleep_linear_threshold: 0.1,
            sleep_angular_threshold: 0.1,
            sleep_time_limit: 1.0,
            default_friction: 0.3,
            default_restitution: 0.3,
        }
    }
}

/// Opaque handle to a body owned by a [`PhysicsWorld`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BodyHandle(pub(crate) hecs::Entity);

/// Snapshot of a body's kinematic state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyState {
    pub pose: Pose,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
    pub sleeping: bool,
}

/// Work done by one `step` call, summed over its substeps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepStats {
    pub substeps: u32,
    /// Body integrations performed (one per awake dynamic body per substep).
    pub integrated_bodies: usize,
    pub broadphase_pairs: usize,
    pub manifolds: usize,
    /// Sleeping bodies woken by contacts.
    pub woken: usize,
}

/// The main physics world managing simulation state.
pub struct PhysicsWorld {
    config: PhysicsConfig,
    world: hecs::World,
    accumulator: f64,
    broadphase: SweepAndPrune,
    contacts: Vec<ContactManifold>,
    contact_cache: ContactCache,
    materials: MaterialTable,
    /// Bodies moved by hand since the last substep.
    teleported: Vec<hecs::Entity>,
    last_stats: StepStats,
}

impl PhysicsWorld {
    /// Create a new physics world with the given configuration.
    pub fn new(config: PhysicsConfig) -> Self {
        let materials = MaterialTable::new(config.default_friction, config.default_restitution);
        Self {
            config,
            world: hecs::World::new(),
            accumulator: 0.0,
            broadphase: SweepAndPrune::new(),
            contacts: Vec::new(),
            contact_cache: ContactCache::new(),
            materials,
            teleported: Vec::new(),
            last_stats: StepStats::default(),
        }
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    pub fn body_count(&self) -> usize {
        self.broadphase.len()
    }

    /// Add a body. It takes part in the next substep without rebuilding the
    /// broadphase.
    pub fn add_body(&mut self, desc: RigidBodyDesc) -> BodyHandle {
        let mut rb = RigidBody::new(desc.mass, &desc.collider);
        rb.material = desc.material;
        if rb.is_dynamic() {
            rb.linear_velocity = desc.linear_velocity;
            rb.angular_velocity = desc.angular_velocity;
        }
        let dynamic = rb.is_dynamic();
        let aabb = desc.collider.compute_aabb(&desc.pose);
        let parts = desc.collider.parts.len();

        let entity = self
            .world
            .spawn((desc.pose, rb, desc.collider, SleepInfo::default()));
        self.broadphase.insert(entity, aabb, dynamic);

        debug!(?entity, dynamic, parts, "Added rigid body");
        BodyHandle(entity)
    }

    pub fn contains(&self, handle: BodyHandle) -> bool {
        self.world.contains(handle.0)
    }

    pub fn pose(&self, handle: BodyHandle) -> Option<Pose> {
        self.world.get::<&Pose>(handle.0).ok().map(|p| *p)
    }

    pub fn state(&self, handle: BodyHandle) -> Option<BodyState> {
        let mut query = self
            .world
            .query_one::<(&Pose, &RigidBody, &SleepInfo)>(handle.0)
            .ok()?;
        let (pose, rb, sleep) = query.get()?;
        Some(BodyState {
            pose: *pose,
            linear_velocity: rb.linear_velocity,
            angular_velocity: rb.angular_velocity,
            sleeping: sleep.is_sleeping(),
        })
    }

    pub fn is_sleeping(&self, handle: BodyHandle) -> bool {
        self.world
            .get::<&SleepInfo>(handle.0)
            .is_ok_and(|s| s.is_sleeping())
    }

    /// Write a body's pose directly, bypassing integration.
    ///
    /// The body is woken and its broadphase bounds are refreshed on the next
    /// substep. Sleeping bodies touching either the old or the new bounds are
    /// woken then too. Overlaps this creates are resolved by later steps.
    pub fn teleport(&mut self, handle: BodyHandle, pose: Pose) -> bool {
        let Ok((current, collider)) = self.world.query_one_mut::<(&mut Pose, &Collider)>(handle.0) else {
            return false;
        };
        let from = collider.compute_aabb(current);
        *current = pose;

        rigid_body::wake_body(&mut self.world, handle.0);
        self.broadphase.mark_teleported(handle.0, from);
        if !self.teleported.contains(&handle.0) {
            self.teleported.push(handle.0);
        }
        true
    }

    /// Overwrite a dynamic body's velocities and wake it.
    pub fn set_velocity(&mut self, handle: BodyHandle, linear: Vec3, angular: Vec3) -> bool {
        let Ok(mut rb) = self.world.get::<&mut RigidBody>(handle.0) else {
            return false;
        };
        if !rb.is_dynamic() {
            return false;
        }
        rb.linear_velocity = linear;
        rb.angular_velocity = angular;
        drop(rb);
        rigid_body::wake_body(&mut self.world, handle.0);
        true
    }

    /// Apply an impulse at a world-space point and wake the body.
    pub fn apply_impulse(&mut self, handle: BodyHandle, impulse: Vec3, point: Vec3) -> bool {
        let Ok(mut query) = self
            .world
            .query_one::<(&mut RigidBody, &Pose)>(handle.0)
        else {
            return false;
        };
        let Some((rb, pose)) = query.get() else {
            return false;
        };
        if !rb.is_dynamic() {
            return false;
        }
        let inv_inertia = rb.inv_inertia_world(pose.orientation);
        rb.linear_velocity += impulse * rb.inv_mass;
        rb.angular_velocity += inv_inertia * (point - pose.position).cross(impulse);
        drop(query);

        rigid_body::wake_body(&mut self.world, handle.0);
        true
    }

    pub fn wake(&mut self, handle: BodyHandle) -> bool {
        rigid_body::wake_body(&mut self.world, handle.0)
    }

    pub fn register_material(&mut self, name: impl Into<String>, friction: f32, restitution: f32) -> MaterialId {
        self.materials.register(name, friction, restitution)
    }

    /// Override the coefficients used when materials `a` and `b` touch.
    pub fn set_contact_material(&mut self, a: MaterialId, b: MaterialId, material: ContactMaterial) {
        self.materials.set_contact_material(a, b, material);
    }

    /// Contacts solved by the most recent substep.
    pub fn contacts(&self) -> &[ContactManifold] {
        &self.contacts
    }

    pub fn last_stats(&self) -> StepStats {
        self.last_stats
    }

    /// Step the physics simulation forward by `delta_time` seconds.
    ///
    /// Uses a fixed timestep accumulator and runs at most `max_substeps`
    /// substeps. Negative or non-finite deltas count as zero.
    pub fn step(&mut self, delta_time: f64, max_substeps: u32) -> StepStats {
        let delta_time = if delta_time.is_finite() {
            delta_time.max(0.0)
        } else {
            0.0
        };
        let max_substeps = max_substeps.max(1);
        let h = self.config.fixed_timestep;

        self.accumulator += delta_time;

        let mut stats = StepStats::default();
        while self.accumulator >= h && stats.substeps < max_substeps {
            self.fixed_step(h as f32, &mut stats);
            self.accumulator -= h;
            stats.substeps += 1;
        }

        // Clamp accumulator to avoid spiral of death
        if self.accumulator > h * max_substeps as f64 {
            self.accumulator = 0.0;
        }

        trace!(
            substeps = stats.substeps,
            integrated = stats.integrated_bodies,
            pairs = stats.broadphase_pairs,
            manifolds = stats.manifolds,
            woken = stats.woken,
            "Physics step"
        );
        self.last_stats = stats;
        stats
    }

    fn fixed_step(&mut self, dt: f32, stats: &mut StepStats) {
        // 1. Refresh broadphase bounds, waking sleepers a teleport left behind
        self.broadphase.refresh(&self.world);
        for entity in self.broadphase.take_swept_sleepers() {
            if rigid_body::wake_body(&mut self.world, entity) {
                stats.woken += 1;
            }
        }

        // 2. Apply forces (gravity) and integrate velocities
        rigid_body::apply_gravity(&mut self.world, self.config.gravity);
        stats.integrated_bodies += rigid_body::integrate_velocities(&mut self.world, dt);

        // 3. Broadphase collision detection
        let pairs = self.broadphase.find_pairs();
        stats.broadphase_pairs += pairs.len();

        // 4. Narrowphase collision detection
        self.contacts.clear();
        let to_wake = self.run_narrowphase(&pairs);
        for entity in to_wake {
            if rigid_body::wake_body(&mut self.world, entity) {
                stats.woken += 1;
            }
        }
        stats.manifolds += self.contacts.len();

        // 5. Warm-start from cached impulses, then solve
        self.contact_cache.warm_start(&mut self.contacts);
        solver::solve_contacts(&mut self.contacts, &mut self.world, self.config.solver_iterations, dt);
        self.contact_cache.update(&self.contacts);

        // 6. Integrate positions
        rigid_body::integrate_positions(&mut self.world, dt);

        // 7. Update sleep states
        rigid_body::update_sleep_states(&mut self.world, dt, &self.config);

        // 8. Clear force accumulators and teleport marks
        rigid_body::clear_forces(&mut self.world);
        self.broadphase.clear_teleported();
        self.teleported.clear();
    }

    /// Test every part pair of every candidate pair, appending to `contacts`.
    ///
    /// Returns sleeping bodies that must wake: those touched by a moving body
    /// or by a teleported one.
    fn run_narrowphase(&mut self, pairs: &[(hecs::Entity, hecs::Entity)]) -> Vec<hecs::Entity> {
        let wake_speed_sq = self.config.sleep_linear_threshold * self.config.sleep_linear_threshold;
        let mut to_wake = Vec::new();

        for &(entity_a, entity_b) in pairs {
            let Ok(mut query_a) = self
                .world
                .query_one::<(&Pose, &Collider, &RigidBody, &SleepInfo)>(entity_a)
            else {
                continue;
            };
            let Ok(mut query_b) = self
                .world
                .query_one::<(&Pose, &Collider, &RigidBody, &SleepInfo)>(entity_b)
            else {
                continue;
            };
            let (Some((pose_a, collider_a, rb_a, sleep_a)), Some((pose_b, collider_b, rb_b, sleep_b))) =
                (query_a.get(), query_b.get())
            else {
                continue;
            };

            let coefficients = self.materials.combine(rb_a.material, rb_b.material);
            let before = self.contacts.len();

            for (part_a, shape_a) in collider_a.parts.iter().enumerate() {
                let world_a = shape_a.world_pose(pose_a);
                for (part_b, shape_b) in collider_b.parts.iter().enumerate() {
                    if shape_a.shape == ColliderShape::Plane && shape_b.shape == ColliderShape::Plane {
                        continue;
                    }
                    let world_b = shape_b.world_pose(pose_b);
                    let Some(info) = detect_collision(&shape_a.shape, &world_a, &shape_b.shape, &world_b) else {
                        continue;
                    };
                    self.contacts.push(ContactManifold {
                        body_a: entity_a,
                        body_b: entity_b,
                        part_a,
                        part_b,
                        normal: info.normal,
                        friction: coefficients.friction,
                        restitution: coefficients.restitution,
                        contacts: info
                            .points
                            .iter()
                            .map(|p| ContactPoint::new(p.position, p.penetration))
                            .collect(),
                    });
                }
            }

            if self.contacts.len() == before {
                continue;
            }

            let disturbs = |rb: &RigidBody, sleep: &SleepInfo, entity: hecs::Entity| {
                self.teleported.contains(&entity)
                    || (rb.is_dynamic()
                        && !sleep.is_sleeping()
                        && rb.linear_velocity.length_squared() >= wake_speed_sq)
            };
            if sleep_a.is_sleeping() && disturbs(rb_b, sleep_b, entity_b) {
                to_wake.push(entity_a);
            }
            if sleep_b.is_sleeping() && disturbs(rb_a, sleep_a, entity_a) {
                to_wake.push(entity_b);
            }
        }

        to_wake
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new(PhysicsConfig::default())
    }
}
