//! Boss phases: health-threshold-gated action bundles

use bevy::prelude::*;

/// A collection of actions available to the boss within a health range
///
/// Once the boss's health drops to `health_lower_bound` (fraction of max),
/// this phase ends and the next one begins.
#[derive(Debug, Clone)]
pub struct BossPhase {
    pub health_lower_bound: f32,
    /// Indices into the boss's action table
    pub action_ids: Vec<usize>,
    pub entrance: PhaseEntrance,
}

/// What the boss does upon entering a phase
///
/// An entrance attack is performed regardless of utility (overriding the
/// entrance animation if both are set); an entrance animation fires a
/// one-shot trigger and holds arbitration until the animator reports back
/// or the hold window runs out.
#[derive(Debug, Clone, Default)]
pub struct PhaseEntrance {
    pub attack: Option<Entity>,
    pub animation_trigger: Option<String>,
}

impl PhaseEntrance {
    pub fn is_empty(&self) -> bool {
        self.attack.is_none() && self.animation_trigger.is_none()
    }
}

/// Index of the phase matching a health fraction
///
/// Phases must be sorted by descending `health_lower_bound`: the current
/// phase is the first one whose bound is below the health fraction, with
/// the last phase as the catch-all floor. None only for an empty list.
pub fn current_phase_index(phases: &[BossPhase], health_fraction: f32) -> Option<usize> {
    if phases.is_empty() {
        return None;
    }
    for (i, phase) in phases.iter().enumerate() {
        if phase.health_lower_bound < health_fraction {
            return Some(i);
        }
    }
    Some(phases.len() - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phase(bound: f32) -> BossPhase {
        BossPhase {
            health_lower_bound: bound,
            action_ids: Vec::new(),
            entrance: PhaseEntrance::default(),
        }
    }

    #[test]
    fn test_phase_index_selection() {
        let phases = vec![phase(0.75), phase(0.4), phase(0.0)];
        assert_eq!(current_phase_index(&phases, 0.8), Some(0));
        assert_eq!(current_phase_index(&phases, 0.6), Some(1));
        assert_eq!(current_phase_index(&phases, 0.1), Some(2));
        // 0.0 is always the floor, nothing falls through
        assert_eq!(current_phase_index(&phases, 0.0), Some(2));
    }

    #[test]
    fn test_phase_index_empty() {
        assert_eq!(current_phase_index(&[], 0.5), None);
    }

    #[test]
    fn test_single_phase_is_catch_all() {
        let phases = vec![phase(0.0)];
        assert_eq!(current_phase_index(&phases, 1.0), Some(0));
        assert_eq!(current_phase_index(&phases, 0.0), Some(0));
    }
}
