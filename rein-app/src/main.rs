//! Headless demo: a rotating room, a box and an asynchronously loaded chair.
//!
//! Run with `RUST_LOG=info cargo run --manifest-path rein-app/Cargo.toml`.

use std::f32::consts::PI;
use std::thread;
use std::time::Duration;

use glam::{Quat, Vec3};
use rein_lockstep::{
    Camera, Collider, ColliderShape, FixedRateRefresh, FrameLoop, LoadResolver, LoadedAsset,
    LoopConfig, MaterialHandle, MaterialId, MeshHandle, MouseButton, PickShape, Pose, ReactionTarget,
    RefreshSource, ResetPose, RigidBodyDesc, Scene, ShapePart, Viewport, VisualNodeDesc,
};

const WIDTH: u32 = 1280;
const HEIGHT: u32 = 720;
const FRAMES: u64 = 600;

// Handles a real renderer would hand out when uploading geometry.
const CUBE_MESH: MeshHandle = MeshHandle(0);
const RED: MaterialHandle = MaterialHandle(0);
const GREY: MaterialHandle = MaterialHandle(1);

fn room_collider() -> Collider {
    let wall = |half_extents: Vec3, offset: Vec3| {
        ShapePart::new(ColliderShape::Box { half_extents }).with_offset(offset)
    };
    Collider::compound(vec![
        // floor
        wall(Vec3::new(2.5, 0.05, 2.5), Vec3::new(0.0, -0.05, 0.0)),
        // roof
        wall(Vec3::new(2.5, 0.05, 2.5), Vec3::new(0.0, 3.05, 0.0)),
        wall(Vec3::new(0.05, 1.5, 2.5), Vec3::new(-2.55, 1.5, 0.0)),
        wall(Vec3::new(0.05, 1.5, 2.5), Vec3::new(2.55, 1.5, 0.0)),
        wall(Vec3::new(2.5, 1.5, 0.05), Vec3::new(0.0, 1.5, -2.55)),
        wall(Vec3::new(2.5, 1.5, 0.05), Vec3::new(0.0, 1.5, 2.55)),
    ])
}

/// Chair parts in metres: (half extents, offset from the body origin).
const CHAIR_PARTS: [(Vec3, Vec3); 3] = [
    // seat
    (Vec3::new(0.25, 0.03, 0.25), Vec3::new(0.0, 0.0, 0.0)),
    // back
    (Vec3::new(0.25, 0.3, 0.03), Vec3::new(0.0, 0.33, -0.22)),
    // front
    (Vec3::new(0.25, 0.2, 0.03), Vec3::new(0.0, -0.23, 0.22)),
];

/// Stand-in for a model loader: the chair is authored in centimetres and
/// scaled down on import.
fn load_chair(resolver: LoadResolver, plastic: MaterialId) {
    thread::sleep(Duration::from_millis(50));

    let collider = Collider::compound(
        CHAIR_PARTS
            .iter()
            .map(|&(half, offset)| ShapePart::new(ColliderShape::Box { half_extents: half }).with_offset(offset))
            .collect(),
    );
    let body = RigidBodyDesc::new(1.0, collider)
        .with_position(Vec3::new(0.0, 2.0, 0.0))
        .with_material(plastic);

    let mut asset = LoadedAsset::new(
        VisualNodeDesc::new("chair")
            .with_position(Vec3::new(0.0, 2.0, 0.0))
            .with_scale(Vec3::splat(0.01)),
        body,
    );
    for (name, (half, offset)) in ["seat", "back", "front"].into_iter().zip(CHAIR_PARTS) {
        asset = asset.with_child(
            VisualNodeDesc::new(name)
                .with_position(offset * 100.0)
                .with_mesh(CUBE_MESH, GREY)
                .pickable(PickShape::cuboid(half * 100.0)),
        );
    }
    let reset = ResetPose::new(Pose::from_position(Vec3::new(0.0, 0.5, 0.0)));
    asset = asset.with_reaction(ReactionTarget::Child(0), reset);

    log::info!("chair loaded on {:?}", thread::current().id());
    resolver.resolve(Ok(asset));
}

fn log_scene(frame: u64, scene: &Scene) {
    let drawn = scene
        .nodes()
        .iter()
        .filter_map(|&id| scene.node(id))
        .filter(|node| !node.hidden && node.mesh.is_some())
        .count();
    log::info!("frame {frame}: {drawn} drawable nodes");
    for name in ["box", "chair"] {
        let Some(node) = scene.find_by_name(name) else {
            continue;
        };
        if let Some(transform) = scene.transform(node) {
            log::info!("frame {frame}: {name} at {:.3}", transform.position);
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => LoopConfig::load(path)?,
        None => LoopConfig::default(),
    };

    let mut camera = Camera::new_perspective(Vec3::new(2.0, 2.0, 2.0), Vec3::ZERO, Vec3::Y, 75.0, 1.0, 0.1, 100.0);
    let viewport = Viewport::new(WIDTH, HEIGHT);
    camera.set_viewport(viewport);

    let mut rendered = 0u64;
    let render = move |scene: &Scene, _camera: &Camera| {
        if rendered % 60 == 0 {
            log_scene(rendered, scene);
        }
        rendered += 1;
    };
    let mut frame_loop = FrameLoop::new(config, camera, render)?;

    let plastic = frame_loop
        .context_mut()
        .physics
        .register_material("plastic", 0.3, 0.3);

    // The room has no visual node; it only exists as moving collision geometry.
    let room = frame_loop.add_body(RigidBodyDesc::fixed(room_collider()));
    frame_loop.drive_body(room, |elapsed| {
        Pose::new(Vec3::ZERO, Quat::from_rotation_z(0.1 * PI * elapsed as f32))
    });

    let red_box = frame_loop.add_body(
        RigidBodyDesc::new(1.0, Collider::cuboid(Vec3::splat(0.25))).with_position(Vec3::new(-0.5, 1.0, 0.0)),
    );
    let box_node = frame_loop.spawn(
        VisualNodeDesc::new("box")
            .with_position(Vec3::new(-0.5, 1.0, 0.0))
            .with_mesh(CUBE_MESH, RED)
            .pickable(PickShape::cuboid(Vec3::splat(0.25))),
    );
    frame_loop.link(red_box, box_node);
    // Clicking the box lifts it back up without stopping it.
    frame_loop.register_reaction(
        box_node,
        ResetPose::new(Pose::from_position(Vec3::new(-0.5, 1.0, 0.0))).keep_velocity(),
    );

    let resolver = frame_loop.begin_load("chair");
    let loader = thread::spawn(move || load_chair(resolver, plastic));

    // Scripted pointer: sweep across the middle row, click once a second.
    let input = frame_loop.input();
    let mut refresh = FixedRateRefresh::new(60.0).with_frames(FRAMES);
    let mut frame = 0u64;
    let mut source = move || {
        let now = refresh.next_refresh()?;
        let x = (frame % 240) as f32 / 240.0 * WIDTH as f32;
        input.pointer_moved_px(x, HEIGHT as f32 * 0.5, viewport);
        if frame % 60 == 59 {
            input.clicked(MouseButton::Left);
        }
        frame += 1;
        Some(now)
    };

    let frames = frame_loop.run(&mut source);
    if loader.join().is_err() {
        anyhow::bail!("chair loader panicked");
    }

    let ctx = frame_loop.context();
    log::info!(
        "ran {frames} frames, {:.2}s simulated, {} bodies, {} pending loads",
        ctx.clock.elapsed(),
        ctx.physics.body_count(),
        ctx.pairs.pending_count()
    );
    Ok(())
}
