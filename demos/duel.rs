//! Two fighters trade blows while a skeleton keeps its balance.
//!
//! Run with: `RUST_LOG=debug cargo run --example duel`

use stance_physics::prelude::*;

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn fighter(x: i32, layer: u32) -> BodyDesc {
    BodyDesc::dynamic(Shape::vertical_capsule(Fix64::from_ratio(3, 10), Fix64::ONE), Fix64::from_int(70))
        .with_position(Vec2Fix::from_int(x, 0))
        .with_filter(layer, layers::ALL)
        .with_restitution(Fix64::from_ratio(1, 5))
}

fn main() -> Result<(), PhysicsError> {
    init_tracing();

    let mut world = PhysicsWorld::new(PhysicsConfig::default())?;
    world.set_seed(2024);
    let dt = world.config().world.fixed_dt;
    let combat = world.config().combat;

    let hero = world.create_body(&fighter(-3, layers::PLAYER))?;
    let brute = world.create_body(&fighter(3, layers::ENEMY))?;
    world.spawn_skeleton(Vec2Fix::from_int(0, 0), None)?;

    let mut roster = CombatRoster::new();
    roster.insert(hero, Combatant::new(Team::Player, Fix64::from_int(100)));
    roster.insert(brute, Combatant::new(Team::Enemy, Fix64::from_int(120)));

    for tick in 0..600u32 {
        // Charge every second, alternating who attacks
        if tick % 60 == 0 {
            let (attacker, target) = if (tick / 60) % 2 == 0 { (hero, brute) } else { (brute, hero) };
            let from = world.get_body_position(attacker).unwrap_or(Vec2Fix::ZERO);
            let to = world.get_body_position(target).unwrap_or(Vec2Fix::ZERO);
            let dir = (to - from).normalize();
            world.apply_impulse(attacker, dir.scale(Fix64::from_int(420)))?;
            if let Some(c) = roster.get_mut(attacker) {
                c.attacking = true;
                c.facing = dir;
            }
            if let Some(c) = roster.get_mut(target) {
                c.attacking = false;
                c.blocking = tick % 180 == 0;
                c.facing = -dir;
            }
        }
        if tick % 120 == 30 {
            if let Some(s) = world.skeleton_mut() {
                s.lean(Fix64::from_ratio(3, 100));
            }
        }

        world.step(dt)?;
        for hit in process_events(&mut world, &mut roster, &combat) {
            tracing::info!(
                tick = hit.tick,
                attacker = hit.attacker.index(),
                defender = hit.defender.index(),
                damage = hit.result.damage.to_f64(),
                blocked = hit.result.blocked,
                health = hit.remaining_health.to_f64(),
                "hit"
            );
        }

        if tick % 60 == 59 {
            let state = world.skeleton().map(|s| *s.balance_state());
            if let Some(state) = state {
                tracing::info!(
                    tick,
                    strategy = ?state.strategy,
                    quality = world.get_balance_quality(),
                    offset = state.offset.to_f64(),
                    "balance"
                );
            }
        }
        if roster.iter().any(|(_, c)| !c.is_alive()) {
            tracing::info!(tick, "knockout");
            break;
        }
    }

    let d = world.diagnostics();
    tracing::info!(
        steps = d.steps,
        overflow = d.event_overflow,
        fallen = d.fallen_transitions,
        checksum = world.checksum().0,
        "done"
    );
    Ok(())
}
