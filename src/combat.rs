//! Combat Bridge
//!
//! Turns drained collision events into gameplay consequences: damage,
//! blocking, stamina cost and knockback.
//!
//! [`evaluate_hit`] is a pure function of one attacker, one defender and
//! the contact. [`process_events`] drains the world's queue exactly once,
//! evaluates every event in FIFO order and writes the results back: health
//! and stamina on the roster, knockback impulses on the world. It never
//! touches shapes, positions or the collision pipeline.

use alloc::collections::BTreeMap;

use crate::body::BodyHandle;
use crate::event::CollisionEvent;
use crate::math::{Fix64, Vec2Fix};
use crate::world::PhysicsWorld;

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

// ============================================================================
// Configuration
// ============================================================================

/// Damage and knockback tuning
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CombatConfig {
    /// Damage of any qualifying contact
    pub base_damage: Fix64,
    /// Extra damage per unit of impulse
    pub impulse_scale: Fix64,
    /// Damage ceiling
    pub max_damage: Fix64,
    /// Multiplier when the source is attacking
    pub attack_multiplier: Fix64,
    /// Minimum `dot(facing, toward_source)` for a block to count
    pub block_cone_dot: Fix64,
    /// Damage multiplier for blocked hits
    pub block_reduction: Fix64,
    /// Stamina spent per blocked hit
    pub block_stamina_cost: Fix64,
    /// Stamina needed to block at all
    pub min_block_stamina: Fix64,
    /// Knockback impulse of any hit
    pub knockback_base: Fix64,
    /// Extra knockback per unit of contact impulse
    pub knockback_impulse_scale: Fix64,
    /// Knockback multiplier for blocked hits
    pub blocked_knockback_scale: Fix64,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            base_damage: Fix64::from_int(5),
            impulse_scale: Fix64::from_ratio(5, 2),
            max_damage: Fix64::from_int(50),
            attack_multiplier: Fix64::from_ratio(3, 2),
            block_cone_dot: Fix64::HALF,
            block_reduction: Fix64::from_ratio(1, 5),
            block_stamina_cost: Fix64::from_ratio(1, 10),
            min_block_stamina: Fix64::from_ratio(1, 20),
            knockback_base: Fix64::HALF,
            knockback_impulse_scale: Fix64::HALF,
            blocked_knockback_scale: Fix64::from_ratio(3, 10),
        }
    }
}

// ============================================================================
// Combatants
// ============================================================================

/// Allegiance; members of the same team never damage each other
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Team {
    Player,
    Enemy,
    Neutral,
}

/// Gameplay state attached to a body
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Combatant {
    pub team: Team,
    /// Direction the combatant faces (any length)
    pub facing: Vec2Fix,
    pub attacking: bool,
    pub blocking: bool,
    pub invulnerable: bool,
    /// Block resource in `[0, 1]`
    pub stamina: Fix64,
    pub health: Fix64,
    /// Deals damage on touch even when not attacking (spikes, hazards)
    pub contact_damage: bool,
}

impl Combatant {
    /// Idle combatant at full stamina facing +X
    #[must_use]
    pub fn new(team: Team, health: Fix64) -> Self {
        Self {
            team,
            facing: Vec2Fix::UNIT_X,
            attacking: false,
            blocking: false,
            invulnerable: false,
            stamina: Fix64::ONE,
            health,
            contact_damage: false,
        }
    }

    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.health.is_positive()
    }

    fn can_hit(&self, other: &Combatant) -> bool {
        self.team != other.team && (self.attacking || self.contact_damage) && !other.invulnerable
    }
}

/// Combatants keyed by body handle, iterated in handle order
#[derive(Clone, Debug, Default)]
pub struct CombatRoster {
    members: BTreeMap<BodyHandle, Combatant>,
}

impl CombatRoster {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach (or replace) the combatant for `body`
    pub fn insert(&mut self, body: BodyHandle, combatant: Combatant) -> Option<Combatant> {
        self.members.insert(body, combatant)
    }

    pub fn remove(&mut self, body: BodyHandle) -> Option<Combatant> {
        self.members.remove(&body)
    }

    #[must_use]
    pub fn get(&self, body: BodyHandle) -> Option<&Combatant> {
        self.members.get(&body)
    }

    pub fn get_mut(&mut self, body: BodyHandle) -> Option<&mut Combatant> {
        self.members.get_mut(&body)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&BodyHandle, &Combatant)> + '_ {
        self.members.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

// ============================================================================
// Hit Evaluation
// ============================================================================

/// Consequence of one attacker hitting one defender
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HitResult {
    pub damage: Fix64,
    pub blocked: bool,
    /// Impulse to apply to the defender
    pub knockback: Vec2Fix,
    /// Stamina the defender spends
    pub stamina_cost: Fix64,
}

/// A hit applied by [`process_events`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HitOutcome {
    pub attacker: BodyHandle,
    pub defender: BodyHandle,
    pub tick: u64,
    pub result: HitResult,
    /// Defender health after the hit
    pub remaining_health: Fix64,
}

/// Evaluate a contact from `attacker` into `defender`.
///
/// `direction` points from the attacker to the defender (the event normal
/// when the attacker is body A). Returns `None` when the contact is not
/// gameplay-relevant.
#[must_use]
pub fn evaluate_hit(
    attacker: &Combatant,
    defender: &Combatant,
    direction: Vec2Fix,
    impulse: Fix64,
    config: &CombatConfig,
) -> Option<HitResult> {
    if !attacker.can_hit(defender) {
        return None;
    }

    let mut raw = config.base_damage + impulse * config.impulse_scale;
    if attacker.attacking {
        raw *= config.attack_multiplier;
    }
    let mut damage = raw.clamp(Fix64::ZERO, config.max_damage);

    let push = direction.normalize();
    let toward_source = -push;
    let blocked = defender.blocking
        && defender.stamina >= config.min_block_stamina
        && defender.facing.normalize().dot(toward_source) >= config.block_cone_dot;

    let mut knock = config.knockback_base + impulse * config.knockback_impulse_scale;
    let mut stamina_cost = Fix64::ZERO;
    if blocked {
        damage *= config.block_reduction;
        knock *= config.blocked_knockback_scale;
        stamina_cost = config.block_stamina_cost;
    }

    Some(HitResult {
        damage,
        blocked,
        knockback: push.scale(knock),
        stamina_cost,
    })
}

/// Drain the world's events and apply every hit they produce.
///
/// Both directions of a contact are evaluated (A into B, then B into A).
/// Outcomes are returned in event order.
pub fn process_events(world: &mut PhysicsWorld, roster: &mut CombatRoster, config: &CombatConfig) -> Vec<HitOutcome> {
    let events = world.drain_collision_events();
    let mut outcomes = Vec::new();
    for event in &events {
        for (attacker, defender, direction) in directions(event) {
            if let Some(outcome) = apply_hit(world, roster, config, attacker, defender, direction, event) {
                outcomes.push(outcome);
            }
        }
    }
    outcomes
}

fn directions(event: &CollisionEvent) -> [(BodyHandle, BodyHandle, Vec2Fix); 2] {
    [
        (event.body_a, event.body_b, event.normal),
        (event.body_b, event.body_a, -event.normal),
    ]
}

fn apply_hit(
    world: &mut PhysicsWorld,
    roster: &mut CombatRoster,
    config: &CombatConfig,
    attacker: BodyHandle,
    defender: BodyHandle,
    direction: Vec2Fix,
    event: &CollisionEvent,
) -> Option<HitOutcome> {
    let source = *roster.get(attacker)?;
    let target = roster.get_mut(defender)?;
    let result = evaluate_hit(&source, target, direction, event.impulse, config)?;

    target.health = (target.health - result.damage).max(Fix64::ZERO);
    target.stamina = (target.stamina - result.stamina_cost).max(Fix64::ZERO);
    let remaining_health = target.health;

    if let Err(err) = world.apply_impulse(defender, result.knockback) {
        tracing::debug!(%err, "knockback skipped");
    }

    Some(HitOutcome {
        attacker,
        defender,
        tick: event.tick,
        result,
        remaining_health,
    })
}
