//! Utility scoring engine
//!
//! Pure functions over a [`UtilityContext`] snapshot so scoring stays
//! testable in isolation from the scheduler. The arbitration system builds
//! one context per boss per tick and feeds it through here.
//!
//! Score shapes:
//! - factor set: weighted sum of member utilities, zeroed entirely when any
//!   single member's post-curve value falls at or below the drop threshold
//! - action: factor sum / factor count, random bonus, clamped to the
//!   action's authored bounds
//! - attack: (repetition term + factor sum) / (factor count + 1), with a
//!   hard lockout once the attack saturates the recent-history ring

use bevy::prelude::*;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::attack::AttackSpec;
use crate::components::PaintColor;
use crate::utility::action::{ActionSpec, BossBehavior};
use crate::utility::factor::{ColorFactor, FactorKind, FactorSet, VariableFactor};

/// If a factor's calculated value is at or below this, the entire action's
/// (or attack's) utility drops to zero
pub const UTILITY_FACTOR_DROP_THRESHOLD: f32 = 0.0001;

/// Snapshot of everything scoring can observe about the fight
#[derive(Debug, Clone)]
pub struct UtilityContext {
    /// Distance between boss and player
    pub player_distance: f32,
    /// Distance at which PlayerDistance normalizes to 1
    pub maximum_player_distance: f32,
    /// Boss health as a fraction of maximum
    pub health_fraction: f32,
    /// Seconds spent near the player within the close-time window
    pub time_close_to_player: f32,
    /// Length of the close-time window
    pub player_close_window: f32,
    /// Damage received per second over the damage-rate window
    pub damage_rate: f32,
    /// Damage rate which normalizes to 1
    pub maximum_damage_rate: f32,
    /// Vector from the boss to the player
    pub to_player: Vec2,
    /// Seconds since the current action was committed
    pub time_in_action: f32,
    /// Attacks performed within the attack-rate window
    pub attacks_in_window: u32,
    /// Attack count which normalizes to 1
    pub max_attacks_in_window: u32,
    /// Paint color currently applied to the boss
    pub paint_color: Option<PaintColor>,
}

/// Normalized [0, 1] observation for a variable factor's kind
pub fn factor_observation(factor: &VariableFactor, ctx: &UtilityContext) -> f32 {
    let value = match factor.kind {
        FactorKind::MyHealth => ctx.health_fraction,
        FactorKind::PlayerDistance => {
            if ctx.maximum_player_distance > 0.0 {
                ctx.player_distance / ctx.maximum_player_distance
            } else {
                0.0
            }
        }
        FactorKind::TimeCloseToPlayer => {
            if ctx.player_close_window > 0.0 {
                ctx.time_close_to_player / ctx.player_close_window
            } else {
                0.0
            }
        }
        FactorKind::DamageReceivedRate => {
            if ctx.maximum_damage_rate > 0.0 {
                ctx.damage_rate / ctx.maximum_damage_rate
            } else {
                0.0
            }
        }
        FactorKind::PlayerDirection => player_direction_observation(ctx.to_player),
        FactorKind::TimeTaken => {
            if factor.max_value > 0.0 {
                ctx.time_in_action / factor.max_value
            } else {
                0.0
            }
        }
        FactorKind::AttackRate => {
            if ctx.max_attacks_in_window > 0 {
                ctx.attacks_in_window as f32 / ctx.max_attacks_in_window as f32
            } else {
                0.0
            }
        }
    };
    value.clamp(0.0, 1.0)
}

/// Fold the signed boss-to-player angle onto one [0, 1] scale
///
/// 0 = directly behind (left axis), wrapping through both signs so the
/// whole circle is covered linearly: negative angles fill [0, 0.5),
/// non-negative angles fill [0.5, 1].
fn player_direction_observation(to_player: Vec2) -> f32 {
    let angle = to_player.y.atan2(to_player.x).to_degrees();
    if angle < 0.0 {
        ((180.0 + angle) / 180.0) * 0.5
    } else {
        (angle / 180.0) * 0.5 + 0.5
    }
}

/// Post-curve (pre-weight) utility of a single variable factor
pub fn variable_factor_utility(factor: &VariableFactor, ctx: &UtilityContext) -> f32 {
    factor.curve.evaluate(factor_observation(factor, ctx))
}

/// Pre-weight utility of a color factor (binary membership test)
pub fn color_factor_utility(factor: &ColorFactor, ctx: &UtilityContext) -> f32 {
    if ctx.paint_color == Some(factor.color) {
        factor.active_utility
    } else {
        factor.not_active_utility
    }
}

/// Weighted utility sum of a factor set
///
/// One disqualifying factor (post-curve value at or below the drop
/// threshold) zeroes the entire set. The sum is not divided by the factor
/// count here; normalization happens one level up.
pub fn factor_set_utility(fs: &FactorSet, ctx: &UtilityContext) -> f32 {
    let mut sum = 0.0;
    for factor in &fs.variable_factors {
        let value = variable_factor_utility(factor, ctx);
        if value <= UTILITY_FACTOR_DROP_THRESHOLD {
            return 0.0;
        }
        sum += value * factor.weight;
    }
    for factor in &fs.color_factors {
        let value = color_factor_utility(factor, ctx);
        if value <= UTILITY_FACTOR_DROP_THRESHOLD {
            return 0.0;
        }
        sum += value * factor.weight;
    }
    sum
}

/// Utility of an action
///
/// For `behavior == Attack` the score is the best attack's score verbatim:
/// attack utility is authored on the attacks themselves, so the wrapper
/// action's own factor set, clamps and random bonus are deliberately
/// bypassed. `best_attack_score` must be the result of [`best_attack`]
/// for the same tick.
pub fn action_utility(
    action: &ActionSpec,
    best_attack_score: Option<f32>,
    ctx: &UtilityContext,
    rng: &mut ChaCha8Rng,
) -> f32 {
    if action.behavior == BossBehavior::Attack {
        if let Some(score) = best_attack_score {
            return score;
        }
    }

    if action.factors.is_empty() {
        return 0.0;
    }
    let numerator = factor_set_utility(&action.factors, ctx);
    let mut u = numerator / action.factors.total_factors() as f32;
    if u > 0.0 {
        u += rng.gen_range(0.0..=action.random_bonus_max.max(0.0));
    }
    u.clamp(action.minimum_utility, action.maximum_utility)
}

/// Utility of an attack for the given 1-based phase number
///
/// `uses_in_history` is how often the attack appears in the recent-history
/// ring. Saturating `maximum_consecutive_uses` is a hard lockout (score 0);
/// below that, the repetition curve contributes a decaying term alongside
/// the phase's factor set.
pub fn attack_utility(
    spec: &AttackSpec,
    uses_in_history: u32,
    phase_number: u32,
    ctx: &UtilityContext,
    rng: &mut ChaCha8Rng,
) -> f32 {
    let mut numerator = 0.0;
    if spec.maximum_consecutive_uses != 0 {
        if uses_in_history >= spec.maximum_consecutive_uses {
            return 0.0;
        }
        let repetition = uses_in_history as f32 / spec.maximum_consecutive_uses as f32;
        numerator += spec.rep_curve.evaluate(repetition);
    }

    let Some(factors) = spec.factors_for_phase(phase_number) else {
        return 0.0;
    };
    let factor_sum = factor_set_utility(factors, ctx);
    if factor_sum == 0.0 {
        // factor disqualification propagates to the whole attack
        return 0.0;
    }
    numerator += factor_sum;

    let mut u = numerator / (factors.total_factors() as f32 + 1.0);
    if u > 0.0 {
        u += rng.gen_range(0.0..=spec.random_bonus_max.max(0.0));
    }
    u.clamp(0.0, 1.0)
}

/// Candidate record for best-attack selection
pub struct AttackCandidate<'a> {
    pub entity: Entity,
    pub spec: &'a AttackSpec,
    pub uses_in_history: u32,
}

/// Find the attack with the best utility
///
/// Stable left-to-right scan: ties resolve to the earliest-listed attack.
/// Returns None for an empty roster.
pub fn best_attack(
    candidates: &[AttackCandidate<'_>],
    phase_number: u32,
    ctx: &UtilityContext,
    rng: &mut ChaCha8Rng,
) -> Option<(Entity, f32)> {
    let mut best: Option<(Entity, f32)> = None;
    for candidate in candidates {
        let utility = attack_utility(
            candidate.spec,
            candidate.uses_in_history,
            phase_number,
            ctx,
            rng,
        );
        match best {
            Some((_, best_utility)) if utility <= best_utility => {}
            _ => best = Some((candidate.entity, utility)),
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attack::{AttackKind, AttackSpec};
    use crate::utility::curve::ResponseCurve;
    use rand::SeedableRng;

    fn test_ctx() -> UtilityContext {
        UtilityContext {
            player_distance: 50.0,
            maximum_player_distance: 100.0,
            health_fraction: 1.0,
            time_close_to_player: 0.0,
            player_close_window: 20.0,
            damage_rate: 0.0,
            maximum_damage_rate: 20.0,
            to_player: Vec2::X,
            time_in_action: 0.0,
            attacks_in_window: 0,
            max_attacks_in_window: 12,
            paint_color: None,
        }
    }

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(42)
    }

    fn health_factor(weight: f32) -> VariableFactor {
        VariableFactor::new(FactorKind::MyHealth, weight, ResponseCurve::linear())
    }

    #[test]
    fn test_player_direction_folding() {
        // directly right of the boss: angle 0 -> 0.5
        assert!((player_direction_observation(Vec2::X) - 0.5).abs() < 1e-5);
        // directly above: +90 degrees -> 0.75
        assert!((player_direction_observation(Vec2::Y) - 0.75).abs() < 1e-5);
        // directly below: -90 degrees -> 0.25
        assert!((player_direction_observation(-Vec2::Y) - 0.25).abs() < 1e-5);
    }

    #[test]
    fn test_factor_set_weighted_sum() {
        let mut fs = FactorSet::default();
        fs.variable_factors.push(health_factor(0.5));
        fs.variable_factors.push(VariableFactor::new(
            FactorKind::PlayerDistance,
            0.5,
            ResponseCurve::linear(),
        ));
        let ctx = test_ctx();
        // health 1.0 * 0.5 + distance 0.5 * 0.5 = 0.75
        assert!((factor_set_utility(&fs, &ctx) - 0.75).abs() < 1e-5);
    }

    #[test]
    fn test_disqualification_dominates() {
        // One zero-valued factor zeroes the set no matter how strong the rest is
        let mut fs = FactorSet::default();
        fs.variable_factors.push(health_factor(0.5));
        fs.variable_factors.push(VariableFactor::new(
            FactorKind::TimeCloseToPlayer,
            0.5,
            ResponseCurve::linear(), // observation 0 -> curve value 0
        ));
        let ctx = test_ctx();
        assert_eq!(factor_set_utility(&fs, &ctx), 0.0);
    }

    #[test]
    fn test_disqualification_checked_before_weighting() {
        // A tiny weight must not disqualify a healthy factor: the threshold
        // applies to the post-curve value, before the weight multiplies it
        let mut fs = FactorSet::default();
        fs.variable_factors.push(health_factor(0.00001));
        let ctx = test_ctx(); // health 1.0, well above the threshold
        let u = factor_set_utility(&fs, &ctx);
        assert!(u > 0.0 && u < 0.0001);
    }

    #[test]
    fn test_empty_factor_set_scores_zero_action() {
        let action = ActionSpec::new("idle", BossBehavior::Idle);
        let ctx = test_ctx();
        assert_eq!(action_utility(&action, None, &ctx, &mut rng()), 0.0);
    }

    #[test]
    fn test_action_clamps() {
        let mut action = ActionSpec::new("retreat", BossBehavior::MoveAwayFromPlayer);
        action.factors.variable_factors.push(health_factor(1.0));
        action.random_bonus_max = 0.0;
        action.minimum_utility = 0.2;
        action.maximum_utility = 0.6;
        let ctx = test_ctx(); // raw score 1.0 -> clamped to 0.6
        assert_eq!(action_utility(&action, None, &ctx, &mut rng()), 0.6);
    }

    #[test]
    fn test_attack_action_bypasses_own_factors() {
        // Deliberate special case: the wrapper action's clamps are ignored
        let mut action = ActionSpec::new("attack", BossBehavior::Attack);
        action.maximum_utility = 0.1;
        let ctx = test_ctx();
        let u = action_utility(&action, Some(0.9), &ctx, &mut rng());
        assert_eq!(u, 0.9);
    }

    fn bare_attack(max_uses: u32) -> AttackSpec {
        let mut spec = AttackSpec::new("swipe", AttackKind::ColliderSweep { faces_player: true });
        spec.maximum_consecutive_uses = max_uses;
        spec.random_bonus_max = 0.0;
        let mut fs = FactorSet::default();
        fs.variable_factors.push(health_factor(1.0));
        spec.phase_factors = vec![(1, fs)];
        spec
    }

    #[test]
    fn test_attack_consecutive_lockout() {
        let spec = bare_attack(2);
        let ctx = test_ctx();
        assert!(attack_utility(&spec, 0, 1, &ctx, &mut rng()) > 0.0);
        assert!(attack_utility(&spec, 1, 1, &ctx, &mut rng()) > 0.0);
        assert_eq!(attack_utility(&spec, 2, 1, &ctx, &mut rng()), 0.0);
        assert_eq!(attack_utility(&spec, 5, 1, &ctx, &mut rng()), 0.0);
    }

    #[test]
    fn test_attack_zero_max_uses_ignores_repetition() {
        let spec = bare_attack(0);
        let ctx = test_ctx();
        // no lockout and no repetition term, even with a saturated history
        assert!(attack_utility(&spec, 5, 1, &ctx, &mut rng()) > 0.0);
    }

    #[test]
    fn test_attack_missing_phase_factors_scores_zero() {
        let mut spec = bare_attack(1);
        spec.phase_factors.clear();
        let ctx = test_ctx();
        assert_eq!(attack_utility(&spec, 0, 1, &ctx, &mut rng()), 0.0);
    }

    #[test]
    fn test_attack_combination_formula() {
        // rep term curve(0/1) = 0, factor sum 1.0 * 1.0, one factor:
        // (0 + 1.0) / (1 + 1) = 0.5
        let spec = bare_attack(1);
        let ctx = test_ctx();
        let u = attack_utility(&spec, 0, 1, &ctx, &mut rng());
        assert!((u - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_best_attack_tie_resolves_left() {
        let spec_a = bare_attack(0);
        let spec_b = bare_attack(0);
        let a = Entity::from_raw(1);
        let b = Entity::from_raw(2);
        let candidates = [
            AttackCandidate {
                entity: a,
                spec: &spec_a,
                uses_in_history: 0,
            },
            AttackCandidate {
                entity: b,
                spec: &spec_b,
                uses_in_history: 0,
            },
        ];
        let ctx = test_ctx();
        let (winner, _) = best_attack(&candidates, 1, &ctx, &mut rng()).unwrap();
        assert_eq!(winner, a);
    }

    #[test]
    fn test_best_attack_deterministic_with_seed() {
        let mut spec_a = bare_attack(0);
        spec_a.random_bonus_max = 0.05;
        let mut spec_b = bare_attack(0);
        spec_b.random_bonus_max = 0.05;
        let a = Entity::from_raw(1);
        let b = Entity::from_raw(2);
        let candidates = [
            AttackCandidate {
                entity: a,
                spec: &spec_a,
                uses_in_history: 0,
            },
            AttackCandidate {
                entity: b,
                spec: &spec_b,
                uses_in_history: 0,
            },
        ];
        let ctx = test_ctx();
        let first = best_attack(&candidates, 1, &ctx, &mut ChaCha8Rng::seed_from_u64(7));
        let second = best_attack(&candidates, 1, &ctx, &mut ChaCha8Rng::seed_from_u64(7));
        assert_eq!(first.map(|(e, _)| e), second.map(|(e, _)| e));
        assert_eq!(first.map(|(_, u)| u), second.map(|(_, u)| u));
    }

    #[test]
    fn test_best_attack_empty_roster() {
        let ctx = test_ctx();
        assert!(best_attack(&[], 1, &ctx, &mut rng()).is_none());
    }
}
