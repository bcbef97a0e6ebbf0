#![no_main]
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use stance_physics::{BodyDesc, BodyHandle, Fix64, PhysicsWorld, Shape, Vec2Fix};

#[derive(Debug, Arbitrary)]
enum FuzzShape {
    Circle(u8),
    Capsule(u8, u8),
    Box(u8, u8),
}

#[derive(Debug, Arbitrary)]
struct FuzzBody {
    shape: FuzzShape,
    position: (i16, i16),
    velocity: (i8, i8),
    /// Mass in tenths; 0 makes a static body
    mass: u8,
    restitution: u8,
    layer: u32,
    mask: u32,
}

#[derive(Debug, Arbitrary)]
enum FuzzOp {
    Impulse(u8, i8, i8),
    Force(u8, i8, i8),
    Destroy(u8),
    Step,
    /// Deliberately wrong timestep
    BadStep(u16),
    Drain,
    Skeleton(i8),
    Lean(i8),
}

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    seed: u64,
    bodies: Vec<FuzzBody>,
    ops: Vec<FuzzOp>,
}

fn radius(r: u8) -> Fix64 {
    Fix64::from_ratio(i64::from(r % 40) + 1, 20)
}

fn shape(s: &FuzzShape) -> Shape {
    match *s {
        FuzzShape::Circle(r) => Shape::circle(radius(r)),
        FuzzShape::Capsule(r, l) => Shape::vertical_capsule(radius(r), radius(l)),
        FuzzShape::Box(w, h) => Shape::aabb(Vec2Fix::new(radius(w), radius(h))),
    }
}

// Arbitrary bodies and host calls must never panic, and all diagnostics
// must stay consistent.
fuzz_target!(|input: FuzzInput| {
    let mut world = PhysicsWorld::default();
    world.set_seed(input.seed);
    let dt = world.config().world.fixed_dt;

    let mut handles: Vec<BodyHandle> = Vec::new();
    for b in input.bodies.iter().take(64) {
        let position = Vec2Fix::new(
            Fix64::from_ratio(i64::from(b.position.0), 4096),
            Fix64::from_ratio(i64::from(b.position.1), 4096),
        );
        let mut desc = if b.mass == 0 {
            BodyDesc::fixed(shape(&b.shape))
        } else {
            BodyDesc::dynamic(shape(&b.shape), Fix64::from_ratio(i64::from(b.mass), 10))
        };
        desc = desc
            .with_position(position)
            .with_velocity(Vec2Fix::from_int(i32::from(b.velocity.0), i32::from(b.velocity.1)))
            .with_restitution(Fix64::from_ratio(i64::from(b.restitution), 255))
            .with_filter(b.layer, b.mask);
        if let Ok(h) = world.create_body(&desc) {
            handles.push(h);
        }
    }

    let pick = |i: u8| handles.get(usize::from(i) % handles.len().max(1)).copied();
    for op in input.ops.iter().take(256) {
        match *op {
            FuzzOp::Impulse(i, x, y) => {
                if let Some(h) = pick(i) {
                    let _ = world.apply_impulse(h, Vec2Fix::from_int(i32::from(x), i32::from(y)));
                }
            }
            FuzzOp::Force(i, x, y) => {
                if let Some(h) = pick(i) {
                    let _ = world.apply_force(h, Vec2Fix::from_int(i32::from(x), i32::from(y)));
                }
            }
            FuzzOp::Destroy(i) => {
                if let Some(h) = pick(i) {
                    let _ = world.destroy_body(h);
                }
            }
            FuzzOp::Step => {
                assert!(world.step(dt).is_ok());
            }
            FuzzOp::BadStep(raw) => {
                let bad = Fix64::from_raw(i64::from(raw));
                if bad != dt {
                    assert!(world.step(bad).is_err());
                }
            }
            FuzzOp::Drain => {
                for e in world.drain_collision_events() {
                    assert!(e.body_a < e.body_b);
                    assert!(!e.impulse.is_negative());
                }
            }
            FuzzOp::Skeleton(x) => {
                let _ = world.spawn_skeleton(Vec2Fix::from_int(i32::from(x) / 16, 0), None);
            }
            FuzzOp::Lean(amount) => {
                if let Some(s) = world.skeleton_mut() {
                    s.lean(Fix64::from_ratio(i64::from(amount), 256));
                }
            }
        }
    }

    let quality = world.get_balance_quality();
    assert!((0.0..=1.0).contains(&quality));
    let d = world.diagnostics();
    assert!(d.stale_events <= d.event_overflow);
});
