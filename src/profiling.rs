//! Simulation Diagnostics
//!
//! Counters the host reads to detect a degraded simulation. Nothing in the
//! core fails loudly; instead each soft failure bumps a counter here.
//!
//! # Counters
//!
//! - [`StepStats`]: what the last step did (pairs, manifolds, events, sleep)
//! - [`Diagnostics`]: cumulative totals since the world was created
//!
//! All values are plain integers so they are identical across machines.

/// Per-step counters, overwritten by every successful step
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StepStats {
    /// Tick the stats belong to
    pub tick: u64,
    /// Candidate pairs from the broad-phase
    pub broadphase_pairs: u32,
    /// Pairs that produced a manifold
    pub manifolds: u32,
    /// Collision events pushed to the queue
    pub events_reported: u32,
    /// Non-static bodies awake after the step
    pub awake_bodies: u32,
    /// Non-static bodies asleep after the step
    pub sleeping_bodies: u32,
    /// Deepest remaining overlap after position correction (raw Q32.32)
    pub max_penetration_raw: i64,
}

/// Cumulative counters
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Diagnostics {
    /// Events lost to a full queue or to a missed drain
    pub event_overflow: u64,
    /// Subset of `event_overflow` lost because nobody drained them
    pub stale_events: u64,
    /// Host calls that named a destroyed or unknown body
    pub invalid_handle_ops: u64,
    /// Steps refused because of a mismatched timestep
    pub rejected_steps: u64,
    /// Bones found outside tolerance, summed over ticks
    pub bone_violations: u64,
    /// Times the skeleton transitioned to fallen
    pub fallen_transitions: u64,
    /// Contacts left deeper than the penetration tolerance
    pub deep_contacts: u64,
    /// Body joints removed because a body was destroyed
    pub pruned_joints: u64,
    /// Successful steps
    pub steps: u64,
}

impl Diagnostics {
    /// Fold one step's counters into the totals
    pub fn record_step(&mut self, step: &StepDiagnostics) {
        self.event_overflow += step.events_dropped;
        self.stale_events += step.stale_events;
        self.event_overflow += step.stale_events;
        self.bone_violations += u64::from(step.bone_violations);
        self.deep_contacts += u64::from(step.deep_contacts);
        self.pruned_joints += step.pruned_joints as u64;
        if step.fell {
            self.fallen_transitions += 1;
        }
        self.steps += 1;
    }

    /// True if anything went wrong since creation
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.event_overflow == 0
            && self.invalid_handle_ops == 0
            && self.rejected_steps == 0
            && self.bone_violations == 0
            && self.deep_contacts == 0
    }
}

/// Soft failures observed during one step
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StepDiagnostics {
    /// Events dropped because the queue was full
    pub events_dropped: u64,
    /// Undrained events discarded at the start of the step
    pub stale_events: u64,
    pub bone_violations: u32,
    pub deep_contacts: u32,
    pub pruned_joints: usize,
    /// The skeleton fell this step
    pub fell: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stale_events_count_as_overflow() {
        let mut d = Diagnostics::default();
        d.record_step(&StepDiagnostics {
            events_dropped: 2,
            stale_events: 3,
            ..StepDiagnostics::default()
        });
        assert_eq!(d.event_overflow, 5);
        assert_eq!(d.stale_events, 3);
        assert_eq!(d.steps, 1);
        assert!(!d.is_clean());
    }

    #[test]
    fn test_fallen_and_bones_accumulate() {
        let mut d = Diagnostics::default();
        for _ in 0..3 {
            d.record_step(&StepDiagnostics {
                bone_violations: 2,
                fell: true,
                ..StepDiagnostics::default()
            });
        }
        assert_eq!(d.bone_violations, 6);
        assert_eq!(d.fallen_transitions, 3);
    }

    #[test]
    fn test_default_is_clean() {
        assert!(Diagnostics::default().is_clean());
        assert_eq!(StepStats::default().manifolds, 0);
    }
}
