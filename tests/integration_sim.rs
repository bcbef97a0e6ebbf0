//! Integration tests for stance-physics
//!
//! End-to-end behaviour through the public API only. Determinism checks
//! compare raw fixed-point bits, never approximate values.

use stance_physics::balance::BalanceStrategy;
use stance_physics::prelude::*;

// ============================================================================
// Helpers
// ============================================================================

fn dt() -> Fix64 {
    PhysicsConfig::default().world.fixed_dt
}

fn ball(x: f64, y: f64, vx: f64, vy: f64) -> BodyDesc {
    BodyDesc::dynamic(Shape::circle(Fix64::HALF), Fix64::ONE)
        .with_position(Vec2Fix::from_f64(x, y))
        .with_velocity(Vec2Fix::from_f64(vx, vy))
}

fn raw(v: Vec2Fix) -> (i64, i64) {
    (v.x.raw(), v.y.raw())
}

/// Everything observable after a scripted run
#[derive(Debug, PartialEq)]
struct Trace {
    bodies: Vec<(i64, i64)>,
    joints: Vec<(i64, i64)>,
    events: Vec<CollisionEvent>,
    checksum: SimulationChecksum,
}

fn scripted_run(seed: u64, ticks: u32) -> Trace {
    let mut world = PhysicsWorld::new(PhysicsConfig::default()).unwrap();
    world.set_seed(seed);

    let mut rng = DeterministicRng::new(seed);
    let mut handles = Vec::new();
    for i in 0..12 {
        let x = Fix64::from_int(i % 4 * 2 - 3);
        let y = Fix64::from_int(i / 4 * 2 - 2);
        let v = Vec2Fix::new(rng.next_signed(Fix64::from_int(3)), rng.next_signed(Fix64::from_int(3)));
        let desc = BodyDesc::dynamic(Shape::circle(Fix64::from_ratio(2, 5)), Fix64::ONE)
            .with_position(Vec2Fix::new(x, y))
            .with_velocity(v)
            .with_restitution(Fix64::from_ratio(4, 5));
        handles.push(world.create_body(&desc).unwrap());
    }
    world.spawn_skeleton(Vec2Fix::ZERO, None).unwrap();
    world.skeleton_mut().unwrap().lean(Fix64::from_ratio(4, 100));

    let mut events = Vec::new();
    for tick in 0..ticks {
        if tick % 10 == 0 {
            let target = handles[(tick / 10) as usize % handles.len()];
            let kick = Vec2Fix::new(rng.next_signed(Fix64::TWO), rng.next_signed(Fix64::TWO));
            world.apply_impulse(target, kick).unwrap();
        }
        world.step(dt()).unwrap();
        events.extend(world.drain_collision_events());
    }

    Trace {
        bodies: handles
            .iter()
            .map(|&h| raw(world.get_body_position(h).unwrap()))
            .collect(),
        joints: JointId::ALL
            .iter()
            .map(|&j| raw(world.get_joint_position(j).unwrap()))
            .collect(),
        events,
        checksum: world.checksum(),
    }
}

// ============================================================================
// Determinism
// ============================================================================

#[test]
fn test_identical_runs_are_bit_identical() {
    let first = scripted_run(42, 240);
    let second = scripted_run(42, 240);
    assert!(!first.events.is_empty(), "scenario produced no collisions");
    assert_eq!(first, second);
}

#[test]
fn test_seed_changes_outcome() {
    assert_ne!(scripted_run(1, 120).checksum, scripted_run(2, 120).checksum);
}

#[test]
fn test_snapshot_resumes_in_a_fresh_world() {
    fn scene() -> (PhysicsWorld, Vec<BodyHandle>) {
        let mut world = PhysicsWorld::default();
        world.set_seed(7);
        let handles = (0..6)
            .map(|i| {
                let x = f64::from(i) * 1.5 - 4.0;
                world.create_body(&ball(x, 0.0, 2.0 - f64::from(i), 0.5)).unwrap()
            })
            .collect();
        world.spawn_skeleton(Vec2Fix::ZERO, None).unwrap();
        (world, handles)
    }

    let (mut live, handles) = scene();
    live.skeleton_mut().unwrap().lean(Fix64::from_ratio(3, 100));
    for _ in 0..50 {
        live.step(dt()).unwrap();
        live.drain_collision_events();
    }
    let bytes = live.snapshot().to_bytes();

    let (mut replica, _) = scene();
    replica.restore(&Snapshot::from_bytes(&bytes).unwrap()).unwrap();
    assert_eq!(replica.tick(), 50);
    assert_eq!(replica.checksum(), live.checksum());

    for tick in 0..60 {
        if tick == 20 {
            live.apply_impulse(handles[2], Vec2Fix::from_int(0, 3)).unwrap();
            replica.apply_impulse(handles[2], Vec2Fix::from_int(0, 3)).unwrap();
        }
        live.step(dt()).unwrap();
        replica.step(dt()).unwrap();
        assert_eq!(live.drain_collision_events(), replica.drain_collision_events());
    }
    assert_eq!(replica.checksum(), live.checksum());
}

// ============================================================================
// Collision Pipeline
// ============================================================================

#[test]
fn test_elastic_head_on_scenario() {
    let mut world = PhysicsWorld::default();
    let a = world
        .create_body(&ball(-0.45, 0.0, 1.0, 0.0).with_restitution(Fix64::ONE))
        .unwrap();
    let b = world
        .create_body(&ball(0.45, 0.0, -1.0, 0.0).with_restitution(Fix64::ONE))
        .unwrap();

    world.step(dt()).unwrap();

    let va = world.get_body_velocity(a).unwrap();
    let vb = world.get_body_velocity(b).unwrap();
    assert!((va.x.to_f64() + 1.0).abs() < 1e-6, "va = {va:?}");
    assert!((vb.x.to_f64() - 1.0).abs() < 1e-6, "vb = {vb:?}");

    let events = world.drain_collision_events();
    assert_eq!(events.len(), 1);
    let e = events[0];
    assert_eq!((e.body_a, e.body_b), (a, b));
    assert!((e.impulse.to_f64() - 2.0).abs() < 1e-6, "impulse = {:?}", e.impulse);
    assert!((e.normal.x.to_f64() - 1.0).abs() < 1e-6);
    assert!(e.normal.y.abs() < Fix64::from_f64(1e-6));
}

#[test]
fn test_kinetic_energy_never_increases() {
    let mut world = PhysicsWorld::default();
    let mut rng = DeterministicRng::new(5);
    for i in 0..16 {
        let x = Fix64::from_int(i % 4 * 2 - 3);
        let y = Fix64::from_int(i / 4 * 2 - 3);
        let v = Vec2Fix::new(rng.next_signed(Fix64::from_int(4)), rng.next_signed(Fix64::from_int(4)));
        let restitution = if i % 4 == 0 { Fix64::ONE } else { Fix64::from_ratio(3, 4) };
        world
            .create_body(
                &BodyDesc::dynamic(Shape::circle(Fix64::from_ratio(2, 5)), Fix64::from_int(1 + i % 3))
                    .with_position(Vec2Fix::new(x, y))
                    .with_velocity(v)
                    .with_restitution(restitution),
            )
            .unwrap();
    }

    let tolerance = Fix64::from_f64(1e-6);
    let mut before = world.kinetic_energy();
    let mut collisions = 0;
    for tick in 0..300 {
        world.step(dt()).unwrap();
        collisions += world.drain_collision_events().len();
        let after = world.kinetic_energy();
        assert!(
            after <= before + tolerance,
            "energy rose at tick {tick}: {} -> {}",
            before.to_f64(),
            after.to_f64()
        );
        before = after;
    }
    assert!(collisions > 0);
}

#[test]
fn test_penetration_stays_within_tolerance() {
    let mut world = PhysicsWorld::default();
    world
        .create_body(&BodyDesc::fixed(Shape::aabb(Vec2Fix::from_f64(0.25, 5.0))).with_position(Vec2Fix::from_int(4, 0)))
        .unwrap();
    for i in 0..5 {
        world
            .create_body(&ball(0.0, f64::from(i) * 1.5 - 3.0, 3.0, 0.0).with_restitution(Fix64::ZERO))
            .unwrap();
    }
    world.create_body(&ball(-4.0, 5.0, 2.0, 0.0)).unwrap();
    world.create_body(&ball(-1.0, 5.0, -2.0, 0.0)).unwrap();

    let tolerance = world.config().solver.penetration_tolerance;
    let mut contacts = 0;
    for _ in 0..120 {
        let stats = world.step(dt()).unwrap();
        world.drain_collision_events();
        contacts += stats.manifolds;
        assert!(Fix64::from_raw(stats.max_penetration_raw) <= tolerance);
    }
    assert_eq!(world.diagnostics().deep_contacts, 0);
    assert!(contacts > 0);
}

#[test]
fn test_events_follow_pair_order() {
    fn run() -> Vec<CollisionEvent> {
        let mut world = PhysicsWorld::default();
        // Created right to left so index order differs from spatial order
        for pair in 0..3 {
            let x = 6.0 - f64::from(pair) * 4.0;
            world.create_body(&ball(x - 0.45, 0.0, 1.0, 0.0)).unwrap();
            world.create_body(&ball(x + 0.45, 0.0, -1.0, 0.0)).unwrap();
        }
        world.create_body(&ball(0.0, 4.0, 0.0, 0.0)).unwrap();
        world.create_body(&ball(0.0, 4.9, 0.0, -1.0)).unwrap();
        world.step(dt()).unwrap();
        world.drain_collision_events()
    }

    let events = run();
    assert_eq!(events.len(), 4);
    for e in &events {
        assert!(e.body_a.index() < e.body_b.index());
    }
    for w in events.windows(2) {
        assert!((w[0].body_a, w[0].body_b) < (w[1].body_a, w[1].body_b));
    }
    assert_eq!(events, run());
}

#[test]
fn test_undrained_events_are_discarded_and_counted() {
    let mut world = PhysicsWorld::default();
    world.create_body(&ball(-0.45, 0.0, 1.0, 0.0)).unwrap();
    world.create_body(&ball(0.45, 0.0, -1.0, 0.0)).unwrap();
    world.step(dt()).unwrap();
    world.step(dt()).unwrap();
    assert!(world.diagnostics().event_overflow >= 1);
    assert!(world
        .drain_collision_events()
        .iter()
        .all(|e| e.tick == 1));
}

// ============================================================================
// Sleep
// ============================================================================

#[test]
fn test_sleep_and_wake() {
    let mut world = PhysicsWorld::default();
    let h = world.create_body(&ball(0.0, 0.0, 0.0, 0.0)).unwrap();
    let ticks = world.config().sleep.ticks_to_sleep;

    for _ in 0..ticks / 2 {
        world.step(dt()).unwrap();
    }
    assert_eq!(world.is_body_sleeping(h), Some(false));
    for _ in 0..ticks {
        world.step(dt()).unwrap();
    }
    assert_eq!(world.is_body_sleeping(h), Some(true));
    assert_eq!(world.last_step_stats().sleeping_bodies, 1);

    world.apply_impulse(h, Vec2Fix::from_int(1, 0)).unwrap();
    assert_eq!(world.is_body_sleeping(h), Some(false));
    world.step(dt()).unwrap();
    assert!(world.get_body_position(h).unwrap().x.is_positive());
}

#[test]
fn test_moving_body_wakes_sleeper() {
    let mut world = PhysicsWorld::default();
    let sleeper = world.create_body(&ball(2.0, 0.0, 0.0, 0.0)).unwrap();
    for _ in 0..=world.config().sleep.ticks_to_sleep {
        world.step(dt()).unwrap();
    }
    assert_eq!(world.is_body_sleeping(sleeper), Some(true));

    world.create_body(&ball(0.0, 0.0, 3.0, 0.0)).unwrap();
    for _ in 0..30 {
        world.step(dt()).unwrap();
        world.drain_collision_events();
    }
    assert_eq!(world.is_body_sleeping(sleeper), Some(false));
    assert!(world.get_body_velocity(sleeper).unwrap().x.is_positive());
}

// ============================================================================
// Skeleton and Balance
// ============================================================================

#[test]
fn test_upright_skeleton_stays_in_ankle_strategy() {
    let mut world = PhysicsWorld::default();
    world.spawn_skeleton(Vec2Fix::ZERO, None).unwrap();
    let ankle = world.config().balance.ankle_threshold;

    for _ in 0..300 {
        world.step(dt()).unwrap();
        let state = *world.skeleton().unwrap().balance_state();
        assert_eq!(state.strategy, BalanceStrategy::Ankle);
        assert!(state.offset.abs() < ankle);
    }
    assert!(world.is_foot_grounded(Side::Left));
    assert!(world.is_foot_grounded(Side::Right));
    assert!(world.get_balance_quality() > 0.8);
    assert_eq!(world.diagnostics().bone_violations, 0);
}

#[test]
fn test_hip_band_offset_recovers_monotonically() {
    let mut world = PhysicsWorld::default();
    world.spawn_skeleton(Vec2Fix::ZERO, None).unwrap();
    world.skeleton_mut().unwrap().lean(Fix64::from_ratio(3, 100));
    let ankle = world.config().balance.ankle_threshold;
    let slack = Fix64::from_ratio(1, 500);

    world.step(dt()).unwrap();
    let first = *world.skeleton().unwrap().balance_state();
    assert_eq!(first.strategy, BalanceStrategy::Hip);

    let mut previous = first.offset.abs();
    let mut recovered_at = None;
    for tick in 1..180 {
        world.step(dt()).unwrap();
        let offset = world.skeleton().unwrap().balance_state().offset.abs();
        if offset < ankle {
            recovered_at = Some(tick);
            break;
        }
        assert!(offset <= previous + slack, "offset grew at tick {tick}");
        previous = offset;
    }
    assert!(recovered_at.is_some(), "never reached the ankle band");
    assert!(!world.skeleton().unwrap().is_fallen());
}

#[test]
fn test_stepping_band_offset_recovers() {
    let mut world = PhysicsWorld::default();
    world.spawn_skeleton(Vec2Fix::ZERO, None).unwrap();
    world.skeleton_mut().unwrap().lean(Fix64::from_ratio(4, 100));
    let stepping = world.config().balance.stepping_threshold;

    world.step(dt()).unwrap();
    let first = *world.skeleton().unwrap().balance_state();
    assert_eq!(first.strategy, BalanceStrategy::Stepping);
    assert!(first.offset.abs() >= stepping);
    assert!(first.offset.abs() < stepping * Fix64::TWO, "offset {:?} not near the band edge", first.offset);

    let mut recovered_at = None;
    for tick in 1..300 {
        world.step(dt()).unwrap();
        let strategy = world.skeleton().unwrap().balance_state().strategy;
        if recovered_at.is_none() && matches!(strategy, BalanceStrategy::Hip | BalanceStrategy::Ankle) {
            recovered_at = Some(tick);
        }
    }
    let recovered_at = recovered_at.expect("never left the stepping band");
    assert!(recovered_at <= world.config().balance.fall_after_ticks as usize);
    assert!(!world.skeleton().unwrap().is_fallen());
    assert_eq!(world.diagnostics().fallen_transitions, 0);
}

#[test]
fn test_lean_without_stepping_falls_and_is_counted() {
    let mut config = PhysicsConfig::default();
    config.balance.step_gain = Fix64::ZERO;
    config.balance.step_jitter = Fix64::ZERO;
    let mut world = PhysicsWorld::new(config).unwrap();
    world.spawn_skeleton(Vec2Fix::ZERO, None).unwrap();
    world.skeleton_mut().unwrap().lean(Fix64::from_ratio(1, 10));

    for _ in 0..200 {
        world.step(dt()).unwrap();
    }
    assert!(world.skeleton().unwrap().is_fallen());
    assert_eq!(world.diagnostics().fallen_transitions, 1);

    assert!(world.respawn_skeleton(Vec2Fix::ZERO));
    assert!(!world.skeleton().unwrap().is_fallen());
}

#[test]
fn test_joint_positions_exposed() {
    let mut world = PhysicsWorld::default();
    world.spawn_skeleton(Vec2Fix::from_int(3, 0), None).unwrap();
    let head = world.get_joint_position(JointId::Head).unwrap();
    let toe = world.get_joint_position(JointId::ToeL).unwrap();
    assert!(head.y > toe.y);
    assert!(world.despawn_skeleton().is_some());
    assert_eq!(world.get_joint_position(JointId::Head), None);
}

// ============================================================================
// Combat Bridge
// ============================================================================

#[test]
fn test_blocked_attack_scenario() {
    let mut world = PhysicsWorld::default();
    let attacker = world
        .create_body(&ball(-0.45, 0.0, 2.0, 0.0).with_restitution(Fix64::ONE))
        .unwrap();
    let defender = world
        .create_body(&ball(0.45, 0.0, 0.0, 0.0).with_restitution(Fix64::ONE))
        .unwrap();

    let mut roster = CombatRoster::new();
    let mut hero = Combatant::new(Team::Player, Fix64::from_int(100));
    hero.attacking = true;
    roster.insert(attacker, hero);
    let mut guard = Combatant::new(Team::Enemy, Fix64::from_int(100));
    guard.blocking = true;
    guard.facing = Vec2Fix::from_int(-1, 0);
    roster.insert(defender, guard);

    let mut config = CombatConfig::default();
    config.attack_multiplier = Fix64::ONE;

    world.step(dt()).unwrap();
    let hits = process_events(&mut world, &mut roster, &config);
    assert_eq!(hits.len(), 1);

    let hit = hits[0];
    assert_eq!((hit.attacker, hit.defender), (attacker, defender));
    assert!(hit.result.blocked);
    let impulse = 2.0;
    let expected = 0.2 * (5.0 + 2.5 * impulse);
    assert!((hit.result.damage.to_f64() - expected).abs() < 1e-4, "damage = {:?}", hit.result.damage);
    assert!((hit.remaining_health.to_f64() - (100.0 - expected)).abs() < 1e-4);

    let guard = roster.get(defender).unwrap();
    assert!((guard.stamina.to_f64() - 0.9).abs() < 1e-6);
    assert!(world.get_body_velocity(defender).unwrap().x.to_f64() > 2.0);
    assert!(world.drain_collision_events().is_empty());
}

#[test]
fn test_unblocked_attack_from_behind() {
    let mut world = PhysicsWorld::default();
    let attacker = world.create_body(&ball(-0.45, 0.0, 2.0, 0.0)).unwrap();
    let defender = world.create_body(&ball(0.45, 0.0, 0.0, 0.0)).unwrap();

    let mut roster = CombatRoster::new();
    let mut hero = Combatant::new(Team::Player, Fix64::from_int(100));
    hero.attacking = true;
    roster.insert(attacker, hero);
    let mut guard = Combatant::new(Team::Enemy, Fix64::from_int(100));
    guard.blocking = true;
    guard.facing = Vec2Fix::from_int(1, 0);
    roster.insert(defender, guard);

    world.step(dt()).unwrap();
    let config = world.config().combat;
    let hits = process_events(&mut world, &mut roster, &config);
    assert_eq!(hits.len(), 1);
    assert!(!hits[0].result.blocked);
    assert_eq!(roster.get(defender).unwrap().stamina, Fix64::ONE);
}

// ============================================================================
// Error Sentinels
// ============================================================================

#[test]
fn test_stale_handles_never_panic() {
    let mut world = PhysicsWorld::default();
    let h = world.create_body(&ball(0.0, 0.0, 0.0, 0.0)).unwrap();
    world.destroy_body(h).unwrap();
    world.step(dt()).unwrap();
    let reused = world.create_body(&ball(1.0, 0.0, 0.0, 0.0)).unwrap();

    assert_eq!(reused.index(), h.index());
    assert!(world.apply_impulse(h, Vec2Fix::UNIT_Y).is_err());
    assert_eq!(world.get_body_velocity(reused), Some(Vec2Fix::ZERO));
    assert_eq!(world.get_body_position(h), None);
    assert_eq!(world.diagnostics().invalid_handle_ops, 1);
}

#[test]
fn test_variable_timestep_is_refused() {
    let mut world = PhysicsWorld::default();
    assert!(matches!(
        world.step(Fix64::from_ratio(1, 120)),
        Err(PhysicsError::VariableTimestep { .. })
    ));
    assert_eq!(world.tick(), 0);
}
