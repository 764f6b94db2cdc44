//! Scene builders shared by the benchmarks.

use glam::Vec3;
use rein_lockstep::ecs::components::physics::{Collider, ColliderShape, RigidBody, RigidBodyDesc, ShapePart, SleepInfo};
use rein_lockstep::ecs::components::scene::PickShape;
use rein_lockstep::ecs::components::transform::Pose;
use rein_lockstep::physics::broadphase::SweepAndPrune;
use rein_lockstep::{Camera, FrameLoop, LoopConfig, NullRender, PhysicsConfig, PhysicsWorld, VisualNodeDesc};

/// Deterministic grid position for body `i`: a loose stack of columns.
pub fn grid_position(i: usize, spacing: f32) -> Vec3 {
    let side = 10;
    let x = (i % side) as f32 * spacing;
    let z = ((i / side) % side) as f32 * spacing;
    let y = 1.0 + (i / (side * side)) as f32 * spacing;
    Vec3::new(x, y, z)
}

fn shape_for(i: usize) -> Collider {
    if i % 2 == 0 {
        Collider::cuboid(Vec3::splat(0.5))
    } else {
        Collider::single(ColliderShape::Sphere { radius: 0.5 })
    }
}

/// Bare body store plus a filled sweep-and-prune, for broadphase benches.
pub fn setup_broadphase(n: usize, spacing: f32) -> (hecs::World, SweepAndPrune) {
    let mut world = hecs::World::new();
    let mut broadphase = SweepAndPrune::new();
    for i in 0..n {
        let pose = Pose::from_position(grid_position(i, spacing));
        let collider = shape_for(i);
        let aabb = collider.compute_aabb(&pose);
        let rb = RigidBody::new(1.0, &collider);
        let entity = world.spawn((pose, rb, collider, SleepInfo::default()));
        broadphase.insert(entity, aabb, true);
    }
    (world, broadphase)
}

/// `n` mixed boxes and spheres dropped onto a floor plane.
pub fn setup_physics(n: usize) -> PhysicsWorld {
    let mut physics = PhysicsWorld::new(PhysicsConfig::default());
    physics.add_body(RigidBodyDesc::fixed(Collider::single(ColliderShape::Plane)));
    for i in 0..n {
        physics.add_body(RigidBodyDesc::new(1.0, shape_for(i)).with_position(grid_position(i, 1.2)));
    }
    physics
}

/// Chair-like compound bodies.
pub fn setup_compound(n: usize) -> PhysicsWorld {
    let mut physics = PhysicsWorld::new(PhysicsConfig::default());
    physics.add_body(RigidBodyDesc::fixed(Collider::single(ColliderShape::Plane)));
    for i in 0..n {
        let collider = Collider::compound(vec![
            ShapePart::new(ColliderShape::Box { half_extents: Vec3::new(0.3, 0.05, 0.3) }),
            ShapePart::new(ColliderShape::Box { half_extents: Vec3::new(0.3, 0.3, 0.05) })
                .with_offset(Vec3::new(0.0, 0.3, -0.25)),
            ShapePart::new(ColliderShape::Box { half_extents: Vec3::new(0.3, 0.15, 0.05) })
                .with_offset(Vec3::new(0.0, -0.2, 0.25)),
        ]);
        physics.add_body(RigidBodyDesc::new(1.0, collider).with_position(grid_position(i, 1.5)));
    }
    physics
}

/// Frame loop with `n` paired, pickable bodies in front of the camera.
pub fn setup_frame_loop(n: usize) -> FrameLoop<NullRender> {
    let camera = Camera::new_perspective(
        Vec3::new(5.0, 8.0, 25.0),
        Vec3::new(5.0, 1.0, 5.0),
        Vec3::Y,
        60.0,
        1.0,
        0.1,
        100.0,
    );
    let mut frame_loop =
        FrameLoop::new(LoopConfig::default(), camera, NullRender).expect("default config is valid");
    frame_loop.add_body(RigidBodyDesc::fixed(Collider::single(ColliderShape::Plane)));
    for i in 0..n {
        let position = grid_position(i, 1.2);
        let body = frame_loop.add_body(RigidBodyDesc::new(1.0, shape_for(i)).with_position(position));
        let node = frame_loop.spawn(
            VisualNodeDesc::new(format!("body-{i}"))
                .with_position(position)
                .pickable(PickShape::cuboid(Vec3::splat(0.5))),
        );
        frame_loop.link(body, node);
    }
    frame_loop
}
