//! Physics benchmarks (criterion - wall-clock time).
//!
//! Run all:    cargo bench --manifest-path benchmarks/Cargo.toml --bench physics
//! Filter:     cargo bench --manifest-path benchmarks/Cargo.toml --bench physics -- broadphase

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::{Quat, Vec3};
use rein_lockstep::ecs::components::physics::ColliderShape;
use rein_lockstep::ecs::components::transform::Pose;
use rein_lockstep::physics::narrowphase::{box_sphere, detect_collision, plane_box, sat_box_box, sphere_sphere};
use rein_lockstep_bench::*;

// ---------------------------------------------------------------------------
// Broadphase
// ---------------------------------------------------------------------------

fn bench_broadphase(c: &mut Criterion) {
    {
        let mut group = c.benchmark_group("broadphase/dense");
        for &n in &[100, 500, 1000, 2000] {
            let (_world, mut broadphase) = setup_broadphase(n, 1.1);
            group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
                b.iter(|| broadphase.find_pairs());
            });
        }
        group.finish();
    }

    {
        let mut group = c.benchmark_group("broadphase/sparse");
        for &n in &[100, 500, 1000, 2000] {
            let (_world, mut broadphase) = setup_broadphase(n, 5.0);
            group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
                b.iter(|| broadphase.find_pairs());
            });
        }
        group.finish();
    }

    {
        let mut group = c.benchmark_group("broadphase/refresh");
        for &n in &[500, 2000] {
            let (world, mut broadphase) = setup_broadphase(n, 1.1);
            group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
                b.iter(|| broadphase.refresh(&world));
            });
        }
        group.finish();
    }
}

// ---------------------------------------------------------------------------
// Narrowphase
// ---------------------------------------------------------------------------

fn bench_narrowphase(c: &mut Criterion) {
    {
        let mut group = c.benchmark_group("narrowphase/sphere_sphere");
        group.bench_function("intersecting", |b| {
            b.iter(|| sphere_sphere(1.0, Vec3::ZERO, 1.0, Vec3::new(1.5, 0.0, 0.0)));
        });
        group.bench_function("separated", |b| {
            b.iter(|| sphere_sphere(1.0, Vec3::ZERO, 1.0, Vec3::new(5.0, 0.0, 0.0)));
        });
        group.finish();
    }

    {
        let mut group = c.benchmark_group("narrowphase/box_box");
        let half = Vec3::splat(1.0);
        let pa = Pose::IDENTITY;

        let pb_hit = Pose::from_position(Vec3::new(1.5, 0.0, 0.0));
        group.bench_function("intersecting", |b| {
            b.iter(|| sat_box_box(half, &pa, half, &pb_hit));
        });

        let pb_miss = Pose::from_position(Vec3::new(5.0, 0.0, 0.0));
        group.bench_function("separated", |b| {
            b.iter(|| sat_box_box(half, &pa, half, &pb_miss));
        });

        let pb_rot = Pose::new(Vec3::new(1.5, 0.3, 0.0), Quat::from_rotation_y(0.785));
        group.bench_function("rotated", |b| {
            b.iter(|| sat_box_box(half, &pa, half, &pb_rot));
        });
        group.finish();
    }

    {
        let mut group = c.benchmark_group("narrowphase/box_sphere");
        let half = Vec3::splat(1.0);
        let box_pose = Pose::IDENTITY;
        group.bench_function("intersecting", |b| {
            b.iter(|| box_sphere(half, &box_pose, 1.0, Vec3::new(1.5, 0.0, 0.0)));
        });
        group.bench_function("separated", |b| {
            b.iter(|| box_sphere(half, &box_pose, 1.0, Vec3::new(5.0, 0.0, 0.0)));
        });
        group.finish();
    }

    {
        let mut group = c.benchmark_group("narrowphase/plane_box");
        let plane = Pose::IDENTITY;
        let resting = Pose::from_position(Vec3::new(0.0, 0.49, 0.0));
        group.bench_function("resting", |b| {
            b.iter(|| plane_box(&plane, Vec3::splat(0.5), &resting));
        });
        group.finish();
    }

    {
        let mut group = c.benchmark_group("narrowphase/dispatch");
        let pa = Pose::IDENTITY;
        let pb = Pose::from_position(Vec3::new(1.5, 0.0, 0.0));

        let sphere = ColliderShape::Sphere { radius: 1.0 };
        let cuboid = ColliderShape::Box {
            half_extents: Vec3::splat(1.0),
        };
        group.bench_function("sphere_sphere", |b| {
            b.iter(|| detect_collision(&sphere, &pa, &sphere, &pb));
        });
        group.bench_function("box_box", |b| {
            b.iter(|| detect_collision(&cuboid, &pa, &cuboid, &pb));
        });
        group.bench_function("sphere_box", |b| {
            b.iter(|| detect_collision(&sphere, &pa, &cuboid, &pb));
        });
        group.finish();
    }
}

// ---------------------------------------------------------------------------
// Full pipeline
// ---------------------------------------------------------------------------

fn bench_pipeline(c: &mut Criterion) {
    {
        let mut group = c.benchmark_group("pipeline/step");
        group.sample_size(30);
        for &n in &[50, 100, 500] {
            group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
                b.iter_batched(
                    || setup_physics(n),
                    |mut physics| physics.step(1.0 / 60.0, 3),
                    criterion::BatchSize::LargeInput,
                );
            });
        }
        group.finish();
    }

    {
        let mut group = c.benchmark_group("pipeline/sustained_60steps");
        group.sample_size(10);
        for &n in &[100, 500] {
            group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
                b.iter_batched(
                    || setup_physics(n),
                    |mut physics| {
                        for _ in 0..60 {
                            physics.step(1.0 / 60.0, 3);
                        }
                    },
                    criterion::BatchSize::LargeInput,
                );
            });
        }
        group.finish();
    }

    {
        let mut group = c.benchmark_group("pipeline/compound_60steps");
        group.sample_size(10);
        group.bench_function("100", |b| {
            b.iter_batched(
                || setup_compound(100),
                |mut physics| {
                    for _ in 0..60 {
                        physics.step(1.0 / 60.0, 3);
                    }
                },
                criterion::BatchSize::LargeInput,
            );
        });
        group.finish();
    }
}

criterion_group!(benches, bench_broadphase, bench_narrowphase, bench_pipeline);
criterion_main!(benches);
