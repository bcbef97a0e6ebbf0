//! Benchmarks for stance-physics
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use stance_physics::skeleton::{Skeleton, SkeletonConfig};
use stance_physics::{BalanceConfig, BodyDesc, DeterministicRng, Fix64, PhysicsConfig, PhysicsWorld, Shape, Vec2Fix};

fn crowd(count: i32) -> PhysicsWorld {
    let mut config = PhysicsConfig::default();
    config.world.bounds = None;
    let mut world = PhysicsWorld::new(config).unwrap_or_default();
    let mut rng = DeterministicRng::new(9);
    for i in 0..count {
        let desc = BodyDesc::dynamic(Shape::circle(Fix64::from_ratio(2, 5)), Fix64::ONE)
            .with_position(Vec2Fix::from_int(i % 16, i / 16))
            .with_velocity(Vec2Fix::new(rng.next_signed(Fix64::TWO), rng.next_signed(Fix64::TWO)))
            .with_restitution(Fix64::from_ratio(4, 5));
        let _ = world.create_body(&desc);
    }
    world
}

// ============================================================================
// World step benchmarks
// ============================================================================

fn bench_world_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("world_step");
    let dt = Fix64::from_ratio(1, 60);

    group.bench_function("128_bodies_single_step", |b| {
        let template = crowd(128);
        b.iter_batched(
            || template.clone(),
            |mut world| {
                let _ = world.step(black_box(dt));
                world.drain_collision_events().len()
            },
            criterion::BatchSize::SmallInput,
        );
    });

    group.bench_function("128_bodies_60_steps", |b| {
        b.iter(|| {
            let mut world = crowd(128);
            for _ in 0..60 {
                let _ = world.step(black_box(dt));
                world.drain_collision_events();
            }
            world.checksum()
        });
    });

    group.finish();
}

// ============================================================================
// Skeleton benchmarks
// ============================================================================

fn bench_skeleton(c: &mut Criterion) {
    let mut group = c.benchmark_group("skeleton");
    let dt = Fix64::from_ratio(1, 60);
    let balance = BalanceConfig::default();

    group.bench_function("upright_tick", |b| {
        let mut skeleton = Skeleton::new(Vec2Fix::ZERO, SkeletonConfig::default());
        let mut rng = DeterministicRng::new(1);
        b.iter(|| skeleton.step(black_box(dt), None, &balance, &mut rng));
    });

    group.bench_function("hip_recovery_tick", |b| {
        let mut rng = DeterministicRng::new(1);
        b.iter_batched(
            || {
                let mut s = Skeleton::new(Vec2Fix::ZERO, SkeletonConfig::default());
                s.lean(Fix64::from_ratio(3, 100));
                s
            },
            |mut s| s.step(black_box(dt), None, &balance, &mut rng),
            criterion::BatchSize::SmallInput,
        );
    });

    group.finish();
}

criterion_group!(benches, bench_world_step, bench_skeleton);
criterion_main!(benches);
