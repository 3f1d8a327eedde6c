//! Actions: selectable boss behaviors and their transition rules

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::utility::factor::FactorSet;

/// The behavior an action commits the boss to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Reflect)]
pub enum BossBehavior {
    Idle,
    Attack,
    MoveToPlayer,
    MoveAwayFromPlayer,
    MoveSpecific,
}

impl BossBehavior {
    /// Whether a committed behavior may hand over to a new one
    ///
    /// Attack may transition to anything including itself (chained
    /// attacks); every other behavior may transition to anything except
    /// itself, so movement commands are not restarted every arbitration
    /// tick while already moving that way.
    pub fn can_transition_to(self, to: BossBehavior) -> bool {
        match self {
            BossBehavior::Attack => true,
            _ => self != to,
        }
    }
}

/// An authored action: behavior + the factor set that scores it
///
/// For `behavior == Attack` the factor set and clamps are ignored:
/// the attack wrapper scores as the best attack (see scoring).
#[derive(Debug, Clone)]
pub struct ActionSpec {
    pub name: String,
    pub behavior: BossBehavior,
    /// Lower clamp on the computed utility
    pub minimum_utility: f32,
    /// Upper clamp on the computed utility
    pub maximum_utility: f32,
    pub factors: FactorSet,
    /// As long as the utility is non-zero, up to this much is added randomly
    pub random_bonus_max: f32,
    /// Once committed, the boss keeps this action at least this long
    pub minimum_perform_time: f32,
    /// Only for MoveSpecific: destination relative to the entry position
    pub relative_destination: Vec2,
}

impl ActionSpec {
    pub fn new(name: &str, behavior: BossBehavior) -> Self {
        Self {
            name: name.to_string(),
            behavior,
            minimum_utility: 0.0,
            maximum_utility: 1.0,
            factors: FactorSet::default(),
            random_bonus_max: 0.01,
            minimum_perform_time: 0.5,
            relative_destination: Vec2::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attack_transitions_to_anything() {
        assert!(BossBehavior::Attack.can_transition_to(BossBehavior::Attack));
        assert!(BossBehavior::Attack.can_transition_to(BossBehavior::Idle));
        assert!(BossBehavior::Attack.can_transition_to(BossBehavior::MoveToPlayer));
    }

    #[test]
    fn test_no_redundant_self_transition() {
        assert!(!BossBehavior::Idle.can_transition_to(BossBehavior::Idle));
        assert!(!BossBehavior::MoveToPlayer.can_transition_to(BossBehavior::MoveToPlayer));
        assert!(BossBehavior::MoveToPlayer.can_transition_to(BossBehavior::MoveAwayFromPlayer));
        assert!(BossBehavior::Idle.can_transition_to(BossBehavior::Attack));
    }
}
