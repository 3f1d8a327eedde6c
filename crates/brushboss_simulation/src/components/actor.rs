//! Base actor components: Player marker and Health

use bevy::prelude::*;

use crate::interfaces::{DamageBlocked, DamageInflicted, DamageTaken};
use crate::logger;

/// Marker for the player entity the boss is fighting
#[derive(Component, Debug, Clone, Copy, Default, Reflect)]
#[reflect(Component)]
pub struct Player;

/// Handle returned by [`Health::add_damage_multiplier`]
///
/// Keep it around and pass it back to `remove_damage_multiplier` when the
/// debuff window ends. Handles stay valid across other add/remove calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MultiplierHandle(usize);

/// Health of an actor
///
/// Invariant: 0.0 <= current <= max
///
/// Incoming damage is scaled by the product of all installed damage
/// multipliers, then dropped entirely while `damage_immune` is set.
#[derive(Component, Debug, Clone)]
pub struct Health {
    pub current: f32,
    pub max: f32,
    /// While true, damage calls are ignored (shield windows, player dodges)
    pub damage_immune: bool,
    // slot-based so handles survive unrelated removals
    multipliers: Vec<Option<f32>>,
}

impl Default for Health {
    fn default() -> Self {
        Self::new(100.0)
    }
}

impl Health {
    pub fn new(max: f32) -> Self {
        Self {
            current: max,
            max,
            damage_immune: false,
            multipliers: Vec::new(),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.current > 0.0
    }

    /// Fraction of maximum health remaining, in [0, 1]
    pub fn fraction(&self) -> f32 {
        if self.max <= 0.0 {
            return 0.0;
        }
        (self.current / self.max).clamp(0.0, 1.0)
    }

    /// Product of all installed damage multipliers
    pub fn damage_multiplier(&self) -> f32 {
        self.multipliers.iter().flatten().product()
    }

    /// Apply damage, returning the amount actually inflicted
    ///
    /// Returns 0.0 while damage-immune.
    pub fn damage(&mut self, amount: f32) -> f32 {
        if self.damage_immune || amount <= 0.0 {
            return 0.0;
        }
        let scaled = amount * self.damage_multiplier();
        let applied = scaled.min(self.current);
        self.current -= applied;
        applied
    }

    /// Install a temporary damage-taken multiplier (> 1 means more damage)
    pub fn add_damage_multiplier(&mut self, mult: f32) -> MultiplierHandle {
        for (i, slot) in self.multipliers.iter_mut().enumerate() {
            if slot.is_none() {
                *slot = Some(mult);
                return MultiplierHandle(i);
            }
        }
        self.multipliers.push(Some(mult));
        MultiplierHandle(self.multipliers.len() - 1)
    }

    /// Remove a previously installed multiplier (no-op for a stale handle)
    pub fn remove_damage_multiplier(&mut self, handle: MultiplierHandle) {
        if let Some(slot) = self.multipliers.get_mut(handle.0) {
            *slot = None;
        }
    }

    /// Drop every installed multiplier (forced attack stop, deactivation)
    pub fn clear_damage_multipliers(&mut self) {
        self.multipliers.clear();
    }
}

/// System: resolve attempted damage against immunity and multipliers
///
/// Damage swallowed by immunity still surfaces as a `DamageBlocked` event
/// so shield windows can count the hits they absorb.
pub fn apply_damage(
    mut inflicted_events: EventReader<DamageInflicted>,
    mut healths: Query<&mut Health>,
    mut taken_w: EventWriter<DamageTaken>,
    mut blocked_w: EventWriter<DamageBlocked>,
) {
    for event in inflicted_events.read() {
        let Ok(mut health) = healths.get_mut(event.target) else {
            logger::log_warning(&format!(
                "damage against {:?} dropped, no Health component",
                event.target
            ));
            continue;
        };
        if health.damage_immune {
            blocked_w.write(DamageBlocked {
                target: event.target,
                amount: event.amount,
            });
            continue;
        }
        let applied = health.damage(event.amount);
        if applied > 0.0 {
            taken_w.write(DamageTaken {
                target: event.target,
                amount: applied,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_damage() {
        let mut health = Health::new(100.0);
        assert_eq!(health.damage(30.0), 30.0);
        assert_eq!(health.current, 70.0);
        assert!(health.is_alive());

        health.damage(100.0); // clamped at zero
        assert_eq!(health.current, 0.0);
        assert!(!health.is_alive());
    }

    #[test]
    fn test_health_fraction() {
        let mut health = Health::new(200.0);
        health.damage(50.0);
        assert_eq!(health.fraction(), 0.75);
    }

    #[test]
    fn test_damage_immune_blocks_everything() {
        let mut health = Health::new(100.0);
        health.damage_immune = true;
        assert_eq!(health.damage(40.0), 0.0);
        assert_eq!(health.current, 100.0);
    }

    #[test]
    fn test_damage_multiplier_stack() {
        let mut health = Health::new(100.0);
        let a = health.add_damage_multiplier(1.5);
        let b = health.add_damage_multiplier(2.0);
        assert_eq!(health.damage_multiplier(), 3.0);

        health.remove_damage_multiplier(a);
        assert_eq!(health.damage_multiplier(), 2.0);

        health.remove_damage_multiplier(b);
        assert_eq!(health.damage_multiplier(), 1.0);

        // stale handle is a no-op
        health.remove_damage_multiplier(a);
        assert_eq!(health.damage_multiplier(), 1.0);
    }

    #[test]
    fn test_multiplier_scales_damage() {
        let mut health = Health::new(100.0);
        let handle = health.add_damage_multiplier(2.0);
        assert_eq!(health.damage(10.0), 20.0);
        health.remove_damage_multiplier(handle);
        assert_eq!(health.damage(10.0), 10.0);
    }
}
