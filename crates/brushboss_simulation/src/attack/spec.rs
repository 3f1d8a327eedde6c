//! Authored attack data: the shared spec plus per-variant parameters

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::components::PaintColor;
use crate::utility::curve::ResponseCurve;
use crate::utility::factor::FactorSet;

/// Maximum time to wait for an animation trigger before it is re-fired
pub const MAXIMUM_WAIT_TRIGGER: f32 = 5.0;
/// Maximum time a dash keeps going without any collision
pub const MAXIMUM_COLLISION_WAIT_TIME: f32 = 10.0;
/// Maximum time to wait for the idle confirmation during recovery
pub const MAXIMUM_IDLE_WAIT: f32 = 4.0;

/// Rotation policy for paint placed by an attack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PaintOrientation {
    /// Rotation is always zero
    #[default]
    Fixed,
    /// Any rotation from 0 to 360
    Random,
    /// Rotation matches the direction of the attack
    PainterAligned,
}

/// How an attack emits paint projectiles at the end of its active frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProjectileEmission {
    #[default]
    None,
    /// One projectile toward the player
    PlayerDir,
    /// Eight projectiles, every 45 degrees
    AllCardinals,
}

/// A paint color with its draw probability, gated to a minimum phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColorChance {
    pub color: PaintColor,
    pub probability: f32,
    /// 1-based phase from which this color becomes available
    pub phase: u32,
}

/// Paint deposition parameters of an attack
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaintParams {
    /// Chance that this attack creates paint at all
    pub probability: f32,
    pub texture: String,
    /// Uniform scale range [min, max] for the placed texture
    pub scale_range: (f32, f32),
    pub orientation: PaintOrientation,
}

impl Default for PaintParams {
    fn default() -> Self {
        Self {
            probability: 0.0,
            texture: String::new(),
            scale_range: (1.0, 1.0),
            orientation: PaintOrientation::default(),
        }
    }
}

/// Dash crash/stun tuning shared by the dash variants
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashParams {
    /// Stun duration after hitting something besides the player
    pub wall_hit_wait: f32,
    pub wall_hit_cam_shake: f32,
    /// Animator bool held while stunned
    pub stun_animation: String,
    /// Extra stun time after slipping on ice into a wall
    pub crash_stun_mod: f32,
    /// Self-damage after slipping on ice into a wall
    pub ice_crash_damage: f32,
    /// Damage-taken multiplier while stunned from an ice crash
    pub ice_crash_damage_mult: f32,
}

impl Default for DashParams {
    fn default() -> Self {
        Self {
            wall_hit_wait: 5.0,
            wall_hit_cam_shake: 200.0,
            stun_animation: "stunned".to_string(),
            crash_stun_mod: 2.0,
            ice_crash_damage: 10.0,
            ice_crash_damage_mult: 1.1,
        }
    }
}

/// Ceiling glob tuning for the paint-fall attack
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobParams {
    /// Seconds a glob takes to fall after being created
    pub drop_time: f32,
    /// Uniform scale of the paint texture a glob places
    pub paint_scale: f32,
    pub texture: String,
    /// Radius of the landing hit pulse
    pub radius: f32,
}

impl Default for GlobParams {
    fn default() -> Self {
        Self {
            drop_time: 1.5,
            paint_scale: 5.0,
            texture: String::new(),
            radius: 1.0,
        }
    }
}

/// Variant-specific behavior and parameters of an attack
#[derive(Debug, Clone)]
pub enum AttackKind {
    /// Basic melee sweep: face the player, lunge, live hitboxes for the
    /// active frames, velocity decay recovery
    ColliderSweep { faces_player: bool },
    /// Rush at the player until something is hit; walls stun
    Dash(DashParams),
    /// Dash in a randomized direction biased toward the player
    RampageDash(DashParams),
    /// Ordered series of sub-attacks driven to completion
    Combo {
        order: Vec<Entity>,
        /// The combo randomly stops at an index within this inclusive range
        stop_range: (u32, u32),
        /// Recovery cooldown after the series (seconds)
        cooldown_time: f32,
        cooldown_animation: Option<String>,
        /// Damage-taken multiplier while recovering
        stun_damage_mult: f32,
    },
    /// Damage-immune window until hit or the active frames elapse
    Shield {
        /// Frame within the active window at which paint is laid down
        paint_frame: u32,
    },
    /// Shield held until a damage threshold is absorbed or time runs out
    SustainedShield {
        damage_threshold: f32,
        /// Damage the boss takes when the shield finally breaks
        break_self_damage: f32,
        /// Maximum seconds to wait for the player to break the shield
        maximum_hit_wait: f32,
    },
    /// Periodically drops paint globs from the ceiling around the player
    PaintFall {
        /// Inclusive range of globs to create
        glob_count: (u32, u32),
        /// Seconds between glob spawns
        spawn_rate: f32,
        /// Maximum distance around the player a glob can land
        attack_radius: f32,
        /// Boss takes no damage while this attack runs
        invincible: bool,
        glob: GlobParams,
    },
}

/// Everything authored about one attack
///
/// Attached to its own entity; runtime state lives in a separate
/// `AttackState` component inserted only while the attack performs.
#[derive(Component, Debug, Clone)]
pub struct AttackSpec {
    pub name: String,
    /// Damage inflicted on the player per hit
    pub damage: f32,
    pub knockback_power: f32,
    /// Consecutive appearances in the recent-history ring before the
    /// utility drops to zero (0 = repetitions are irrelevant)
    pub maximum_consecutive_uses: u32,
    /// Maps normalized usage count to the repetition utility term
    pub rep_curve: ResponseCurve,
    /// Factor sets per 1-based phase number, sorted ascending
    pub phase_factors: Vec<(u32, FactorSet)>,
    pub random_bonus_max: f32,
    pub startup_frames: u32,
    pub active_frames: u32,
    pub recovery_frames: u32,
    /// True if this attack moves the boss on its own
    pub override_movement: bool,
    /// Initial lunge multiplier applied to boss speed
    pub initial_speed_mult: f32,
    pub start_anim_trigger: Option<String>,
    pub end_anim_trigger: Option<String>,
    pub startup_audio: Option<String>,
    pub active_audio: Option<String>,
    pub paint: PaintParams,
    /// Colors this attack can lock in at entry
    pub colors: Vec<ColorChance>,
    pub projectile_emission: ProjectileEmission,
    /// If set, this attack immediately follows regardless of utility
    /// (overrides `transition_action`)
    pub transition_attack: Option<Entity>,
    /// If set, this action (index into the boss action table) immediately
    /// follows regardless of utility
    pub transition_action: Option<usize>,
    pub kind: AttackKind,
}

impl AttackSpec {
    pub fn new(name: &str, kind: AttackKind) -> Self {
        Self {
            name: name.to_string(),
            damage: 10.0,
            knockback_power: 20.0,
            maximum_consecutive_uses: 1,
            rep_curve: ResponseCurve::linear(),
            phase_factors: Vec::new(),
            random_bonus_max: 0.01,
            startup_frames: 20,
            active_frames: 5,
            recovery_frames: 20,
            override_movement: false,
            initial_speed_mult: 4.0,
            start_anim_trigger: None,
            end_anim_trigger: None,
            startup_audio: None,
            active_audio: None,
            paint: PaintParams::default(),
            colors: Vec::new(),
            projectile_emission: ProjectileEmission::None,
            transition_attack: None,
            transition_action: None,
            kind,
        }
    }

    /// Factor set for a 1-based phase number
    ///
    /// Exact match wins; phases with no set of their own fall back to the
    /// highest-numbered configured set. None only for an empty list.
    pub fn factors_for_phase(&self, phase_number: u32) -> Option<&FactorSet> {
        if self.phase_factors.is_empty() {
            return None;
        }
        for (phase, factors) in &self.phase_factors {
            if *phase == phase_number {
                return Some(factors);
            }
        }
        self.phase_factors.last().map(|(_, factors)| factors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factors_for_phase_fallback() {
        let mut spec = AttackSpec::new("swipe", AttackKind::ColliderSweep { faces_player: true });
        let mut fs1 = FactorSet::default();
        fs1.color_factors.push(crate::utility::factor::ColorFactor {
            color: PaintColor::Red,
            weight: 1.0,
            active_utility: 1.0,
            not_active_utility: 0.1,
        });
        let fs3 = FactorSet::default();
        spec.phase_factors = vec![(1, fs1), (3, fs3)];

        assert_eq!(spec.factors_for_phase(1).unwrap().total_factors(), 1);
        // phase 2 has no set of its own: falls back to the highest configured
        assert_eq!(spec.factors_for_phase(2).unwrap().total_factors(), 0);
        assert_eq!(spec.factors_for_phase(3).unwrap().total_factors(), 0);
    }

    #[test]
    fn test_factors_for_phase_empty() {
        let spec = AttackSpec::new("swipe", AttackKind::ColliderSweep { faces_player: true });
        assert!(spec.factors_for_phase(1).is_none());
    }
}
