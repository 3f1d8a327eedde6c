//! Hitbox collision reporting for attacks
//!
//! The simulation checks a simple sphere overlap against the player and
//! reports validated contacts as `HitReport` events; level geometry
//! contacts arrive on the same event from the external physics layer.
//! Reports are routed here into damage, knockback and the dash collision
//! classification.

use bevy::prelude::*;

use crate::attack::spec::{AttackKind, AttackSpec};
use crate::attack::state::{AttackState, VariantRun};
use crate::components::{Body, Health, Player};
use crate::interfaces::{DamageInflicted, HitReport, KnockbackCommand};
use crate::logger;

/// Damage-dealing hitbox of an attack, toggled by the attack's active frames
///
/// Positioned relative to the boss body. While enabled, each target is hit
/// at most once per activation.
#[derive(Component, Debug, Clone, Reflect)]
#[reflect(Component)]
pub struct AttackHitbox {
    pub enabled: bool,
    pub radius: f32,
    pub offset: Vec2,
    /// Player already hit during this activation (prevents double-hits)
    pub already_hit: bool,
}

impl Default for AttackHitbox {
    fn default() -> Self {
        Self {
            enabled: false,
            radius: 1.5,
            offset: Vec2::ZERO,
            already_hit: false,
        }
    }
}

impl AttackHitbox {
    pub fn new(radius: f32, offset: Vec2) -> Self {
        Self {
            enabled: false,
            radius,
            offset,
            already_hit: false,
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        if enabled && !self.enabled {
            self.already_hit = false;
        }
        self.enabled = enabled;
    }
}

/// System: sphere-overlap detection between enabled hitboxes and the player
///
/// Contacts with a damage-immune player are discarded here, matching the
/// collision validation contract (immune targets never produce hits).
pub fn detect_hitbox_overlaps(
    mut hitboxes: Query<(Entity, &mut AttackHitbox, &AttackState)>,
    bodies: Query<&Body>,
    players: Query<&Health, With<Player>>,
    mut hit_w: EventWriter<HitReport>,
) {
    for (attack, mut hitbox, state) in hitboxes.iter_mut() {
        if !hitbox.enabled || hitbox.already_hit {
            continue;
        }
        let Ok(boss_body) = bodies.get(state.boss) else {
            continue;
        };
        let Ok(player_body) = bodies.get(state.player) else {
            continue;
        };
        if let Ok(player_health) = players.get(state.player) {
            // a dodging (damage-immune) player is not a valid contact
            if player_health.damage_immune {
                continue;
            }
        }
        let hitbox_pos = boss_body.position + hitbox.offset;
        let distance = hitbox_pos.distance(player_body.position);
        if distance < hitbox.radius {
            hitbox.already_hit = true;
            hit_w.write(HitReport {
                attack,
                target: Some(state.player),
                direction: hitbox_pos - player_body.position,
            });
        }
    }
}

/// System: route validated contacts into damage and run state
///
/// Player contacts deal the attack's damage and knockback and mark the run;
/// geometry contacts feed the dash collision classification: a contact
/// whose direction stays within 90 degrees of the dash direction is behind
/// the boss and forgiven.
pub fn route_hit_reports(
    mut hit_events: EventReader<HitReport>,
    mut attacks: Query<(&AttackSpec, Option<&mut AttackState>)>,
    mut damage_w: EventWriter<DamageInflicted>,
    mut knockback_w: EventWriter<KnockbackCommand>,
) {
    const COLLISION_FORGIVENESS_ANGLE: f32 = 90.0;

    for hit in hit_events.read() {
        let Ok((spec, state)) = attacks.get_mut(hit.attack) else {
            continue;
        };

        if let Some(target) = hit.target {
            damage_w.write(DamageInflicted {
                target,
                amount: spec.damage,
            });
            let Some(mut state) = state else {
                // glob landed after its attack already finished
                continue;
            };
            knockback_w.write(KnockbackCommand {
                target,
                direction: state.to_player,
                power: spec.knockback_power,
            });
            state.last_hit_was_player = true;
            if let VariantRun::Dash(run) | VariantRun::Rampage(run) = &mut state.run {
                run.collided = true;
            }
        } else {
            // level geometry
            let Some(mut state) = state else {
                continue;
            };
            let dash_dir = state.override_direction;
            if let VariantRun::Dash(run) | VariantRun::Rampage(run) = &mut state.run {
                let forgiven = hit.direction != Vec2::ZERO
                    && angle_between_degrees(hit.direction, dash_dir)
                        <= COLLISION_FORGIVENESS_ANGLE;
                if !forgiven {
                    run.collided = true;
                    logger::log_debug(&format!("attack '{}' hit geometry", spec.name));
                }
            }
        }
    }
}

fn angle_between_degrees(a: Vec2, b: Vec2) -> f32 {
    let a = a.normalize_or_zero();
    let b = b.normalize_or_zero();
    if a == Vec2::ZERO || b == Vec2::ZERO {
        return 0.0;
    }
    a.dot(b).clamp(-1.0, 1.0).acos().to_degrees()
}
