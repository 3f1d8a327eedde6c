//! Authored boss configuration: JSON document model, validation, spawning
//!
//! Configs are read-only authored data loaded before the scheduler starts.
//! Validation follows the forgiving contract of the runtime: null-ish or
//! unknown references are dropped with a warning, out-of-range clamps are
//! silently repaired, and only a boss with no phases at all is fatal.

use bevy::prelude::*;
use serde::Deserialize;
use std::collections::HashMap;
use thiserror::Error;

use crate::attack::{
    AttackHitbox, AttackKind, AttackSpec, ColorChance, DashParams, GlobParams, PaintParams,
    ProjectileEmission,
};
use crate::boss::{Boss, BossAssets, BossPhase, PhaseEntrance};
use crate::components::{ActivePaintColor, Body, Health, PaintSurfaceState};
use crate::logger;
use crate::utility::action::{ActionSpec, BossBehavior};
use crate::utility::curve::ResponseCurve;
use crate::utility::factor::FactorSet;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse boss config: {0}")]
    Parse(#[from] serde_json::Error),
    /// A boss without phases has no actions to perform and must not run
    #[error("boss has no phases (no actions to perform)")]
    NoPhases,
}

fn default_true() -> bool {
    true
}

fn default_one() -> f32 {
    1.0
}

fn default_random_bonus() -> f32 {
    0.01
}

// ============================================================================
// Document model
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct BossConfig {
    #[serde(default)]
    pub core: CoreDoc,
    #[serde(default)]
    pub actions: Vec<ActionDoc>,
    #[serde(default)]
    pub attacks: Vec<AttackDoc>,
    pub phases: Vec<PhaseDoc>,
    /// Attacks pushed into the history ring before the fight starts,
    /// de-incentivising their early use
    #[serde(default)]
    pub pre_occupy_history: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CoreDoc {
    pub max_health: f32,
    pub std_speed: f32,
    pub std_acceleration: f32,
    pub ice_speed_mod: f32,
    pub ice_acceleration_mod: f32,
    pub min_action_switch_time: f32,
    pub maximum_player_distance: f32,
    pub player_close_distance: f32,
    pub begin_active: bool,
    pub music: Option<String>,
}

impl Default for CoreDoc {
    fn default() -> Self {
        Self {
            max_health: 100.0,
            std_speed: 20.0,
            std_acceleration: 5.0,
            ice_speed_mod: 2.0,
            ice_acceleration_mod: 0.5,
            min_action_switch_time: 5.0,
            maximum_player_distance: 100.0,
            player_close_distance: 5.0,
            begin_active: true,
            music: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActionDoc {
    pub name: String,
    pub behavior: BossBehavior,
    #[serde(default)]
    pub minimum_utility: f32,
    #[serde(default = "default_one")]
    pub maximum_utility: f32,
    #[serde(default)]
    pub factors: FactorSet,
    #[serde(default = "default_random_bonus")]
    pub random_bonus_max: f32,
    #[serde(default = "default_minimum_perform_time")]
    pub minimum_perform_time: f32,
    #[serde(default)]
    pub relative_destination: [f32; 2],
}

fn default_minimum_perform_time() -> f32 {
    0.5
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhaseFactorsDoc {
    pub phase: u32,
    pub factors: FactorSet,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HitboxDoc {
    pub radius: f32,
    #[serde(default)]
    pub offset: [f32; 2],
}

#[derive(Debug, Clone, Deserialize)]
pub struct AttackDoc {
    pub name: String,
    #[serde(default = "default_damage")]
    pub damage: f32,
    #[serde(default = "default_knockback")]
    pub knockback_power: f32,
    #[serde(default = "default_max_uses")]
    pub maximum_consecutive_uses: u32,
    #[serde(default)]
    pub rep_curve: ResponseCurve,
    #[serde(default)]
    pub phase_factors: Vec<PhaseFactorsDoc>,
    #[serde(default = "default_random_bonus")]
    pub random_bonus_max: f32,
    #[serde(default = "default_startup_frames")]
    pub startup_frames: u32,
    #[serde(default = "default_active_frames")]
    pub active_frames: u32,
    #[serde(default = "default_recovery_frames")]
    pub recovery_frames: u32,
    #[serde(default)]
    pub override_movement: bool,
    #[serde(default = "default_initial_speed_mult")]
    pub initial_speed_mult: f32,
    #[serde(default)]
    pub start_anim_trigger: Option<String>,
    #[serde(default)]
    pub end_anim_trigger: Option<String>,
    #[serde(default)]
    pub startup_audio: Option<String>,
    #[serde(default)]
    pub active_audio: Option<String>,
    #[serde(default)]
    pub paint: PaintParams,
    #[serde(default)]
    pub colors: Vec<ColorChance>,
    #[serde(default)]
    pub projectile_emission: ProjectileEmission,
    #[serde(default)]
    pub transition_action: Option<String>,
    #[serde(default)]
    pub transition_attack: Option<String>,
    #[serde(default)]
    pub hitbox: Option<HitboxDoc>,
    pub kind: AttackKindDoc,
}

fn default_damage() -> f32 {
    10.0
}

fn default_knockback() -> f32 {
    20.0
}

fn default_max_uses() -> u32 {
    1
}

fn default_startup_frames() -> u32 {
    20
}

fn default_active_frames() -> u32 {
    5
}

fn default_recovery_frames() -> u32 {
    20
}

fn default_initial_speed_mult() -> f32 {
    4.0
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AttackKindDoc {
    ColliderSweep {
        #[serde(default = "default_true")]
        faces_player: bool,
    },
    Dash {
        #[serde(default)]
        params: DashParams,
    },
    RampageDash {
        #[serde(default)]
        params: DashParams,
    },
    Combo {
        order: Vec<String>,
        #[serde(default = "default_stop_range")]
        stop_range: (u32, u32),
        #[serde(default = "default_cooldown_time")]
        cooldown_time: f32,
        #[serde(default)]
        cooldown_animation: Option<String>,
        #[serde(default = "default_stun_mult")]
        stun_damage_mult: f32,
    },
    Shield {
        #[serde(default)]
        paint_frame: u32,
    },
    SustainedShield {
        #[serde(default = "default_damage_threshold")]
        damage_threshold: f32,
        #[serde(default = "default_break_damage")]
        break_self_damage: f32,
        #[serde(default = "default_maximum_hit_wait")]
        maximum_hit_wait: f32,
    },
    PaintFall {
        #[serde(default = "default_glob_count")]
        glob_count: (u32, u32),
        #[serde(default = "default_glob_spawn_rate")]
        spawn_rate: f32,
        #[serde(default = "default_glob_radius")]
        attack_radius: f32,
        #[serde(default = "default_true")]
        invincible: bool,
        #[serde(default)]
        glob: GlobParams,
    },
}

fn default_stop_range() -> (u32, u32) {
    (1, 1)
}

fn default_cooldown_time() -> f32 {
    2.0
}

fn default_stun_mult() -> f32 {
    1.1
}

fn default_damage_threshold() -> f32 {
    10.0
}

fn default_break_damage() -> f32 {
    2.0
}

fn default_maximum_hit_wait() -> f32 {
    60.0
}

fn default_glob_count() -> (u32, u32) {
    (1, 1)
}

fn default_glob_spawn_rate() -> f32 {
    2.0
}

fn default_glob_radius() -> f32 {
    4.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhaseDoc {
    pub health_lower_bound: f32,
    pub actions: Vec<String>,
    #[serde(default)]
    pub entrance_attack: Option<String>,
    #[serde(default)]
    pub entrance_animation: Option<String>,
}

// ============================================================================
// Loading & spawning
// ============================================================================

impl BossConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Clamp factor authoring ranges and warn about the weight-sum convention
///
/// Member weights should sum to 1; this is advisory, so a mismatch is only
/// logged, never rejected, and scoring does not renormalize.
fn sanitize_factor_set(owner: &str, fs: &mut FactorSet) {
    for factor in &mut fs.variable_factors {
        factor.weight = factor.weight.clamp(0.001, 1.0);
        factor.max_value = factor.max_value.max(1.0);
    }
    for factor in &mut fs.color_factors {
        factor.weight = factor.weight.clamp(0.001, 1.0);
        factor.active_utility = factor.active_utility.clamp(0.0, 1.0);
        factor.not_active_utility = factor.not_active_utility.clamp(0.0, 1.0);
    }
    if !fs.is_empty() && (fs.weight_sum() - 1.0).abs() > 0.01 {
        logger::log_warning(&format!(
            "factor weights of '{}' sum to {:.3}, convention is 1",
            owner,
            fs.weight_sum()
        ));
    }
}

fn build_action_spec(doc: &ActionDoc) -> ActionSpec {
    let mut spec = ActionSpec::new(&doc.name, doc.behavior);
    spec.minimum_utility = doc.minimum_utility;
    spec.maximum_utility = doc.maximum_utility;
    if spec.maximum_utility < spec.minimum_utility {
        // silently repaired, matching the runtime contract
        logger::log_warning(&format!(
            "action '{}': maximum utility below minimum, minimum reset to 0",
            doc.name
        ));
        spec.minimum_utility = 0.0;
    }
    spec.factors = doc.factors.clone();
    sanitize_factor_set(&doc.name, &mut spec.factors);
    spec.random_bonus_max = doc.random_bonus_max.clamp(0.0, 1.0);
    spec.minimum_perform_time = doc.minimum_perform_time.max(0.0);
    spec.relative_destination = Vec2::new(doc.relative_destination[0], doc.relative_destination[1]);
    spec
}

fn resolve_attack(
    reference: &Option<String>,
    attack_ids: &HashMap<String, Entity>,
    owner: &str,
) -> Option<Entity> {
    let name = reference.as_ref()?;
    let resolved = attack_ids.get(name).copied();
    if resolved.is_none() {
        logger::log_warning(&format!("'{}' references unknown attack '{}'", owner, name));
    }
    resolved
}

fn build_attack_spec(
    doc: &AttackDoc,
    self_entity: Entity,
    attack_ids: &HashMap<String, Entity>,
    action_ids: &HashMap<String, usize>,
) -> AttackSpec {
    let kind = match &doc.kind {
        AttackKindDoc::ColliderSweep { faces_player } => AttackKind::ColliderSweep {
            faces_player: *faces_player,
        },
        AttackKindDoc::Dash { params } => AttackKind::Dash(params.clone()),
        AttackKindDoc::RampageDash { params } => AttackKind::RampageDash(params.clone()),
        AttackKindDoc::Combo {
            order,
            stop_range,
            cooldown_time,
            cooldown_animation,
            stun_damage_mult,
        } => {
            let resolved: Vec<Entity> = order
                .iter()
                .filter_map(|name| {
                    let child = attack_ids.get(name).copied();
                    if child.is_none() {
                        logger::log_warning(&format!(
                            "combo '{}' references unknown attack '{}'",
                            doc.name, name
                        ));
                    }
                    // a combo must not contain itself
                    child.filter(|&c| c != self_entity)
                })
                .collect();
            AttackKind::Combo {
                order: resolved,
                stop_range: *stop_range,
                cooldown_time: *cooldown_time,
                cooldown_animation: cooldown_animation.clone(),
                stun_damage_mult: *stun_damage_mult,
            }
        }
        AttackKindDoc::Shield { paint_frame } => AttackKind::Shield {
            paint_frame: *paint_frame,
        },
        AttackKindDoc::SustainedShield {
            damage_threshold,
            break_self_damage,
            maximum_hit_wait,
        } => AttackKind::SustainedShield {
            damage_threshold: *damage_threshold,
            break_self_damage: *break_self_damage,
            maximum_hit_wait: *maximum_hit_wait,
        },
        AttackKindDoc::PaintFall {
            glob_count,
            spawn_rate,
            attack_radius,
            invincible,
            glob,
        } => AttackKind::PaintFall {
            glob_count: *glob_count,
            spawn_rate: *spawn_rate,
            attack_radius: *attack_radius,
            invincible: *invincible,
            glob: glob.clone(),
        },
    };

    let mut spec = AttackSpec::new(&doc.name, kind);
    spec.damage = doc.damage.max(0.0);
    spec.knockback_power = doc.knockback_power;
    spec.maximum_consecutive_uses = doc
        .maximum_consecutive_uses
        .min(crate::boss::ABSOLUTE_MAX_CONSECUTIVE_ATTACKS as u32);
    spec.rep_curve = doc.rep_curve.clone();
    spec.phase_factors = doc
        .phase_factors
        .iter()
        .map(|pf| {
            let mut fs = pf.factors.clone();
            sanitize_factor_set(&doc.name, &mut fs);
            (pf.phase.max(1), fs)
        })
        .collect();
    spec.phase_factors.sort_by_key(|(phase, _)| *phase);
    spec.random_bonus_max = doc.random_bonus_max.clamp(0.0, 1.0);
    spec.startup_frames = doc.startup_frames;
    spec.active_frames = doc.active_frames;
    spec.recovery_frames = doc.recovery_frames;
    spec.override_movement = doc.override_movement;
    spec.initial_speed_mult = doc.initial_speed_mult;
    spec.start_anim_trigger = doc.start_anim_trigger.clone();
    spec.end_anim_trigger = doc.end_anim_trigger.clone();
    spec.startup_audio = doc.startup_audio.clone();
    spec.active_audio = doc.active_audio.clone();
    spec.paint = doc.paint.clone();
    spec.colors = doc.colors.clone();
    spec.projectile_emission = doc.projectile_emission;
    spec.transition_attack = resolve_attack(&doc.transition_attack, attack_ids, &doc.name);
    spec.transition_action = doc.transition_action.as_ref().and_then(|name| {
        let resolved = action_ids.get(name).copied();
        if resolved.is_none() {
            logger::log_warning(&format!(
                "attack '{}' references unknown action '{}'",
                doc.name, name
            ));
        }
        resolved
    });
    spec
}

/// Build and spawn a boss (and its attack entities) from a validated config
///
/// The only fatal condition is a config with no phases; everything else
/// degrades with a logged warning.
pub fn spawn_boss(
    world: &mut World,
    config: &BossConfig,
    player: Entity,
    position: Vec2,
) -> Result<Entity, ConfigError> {
    if config.phases.is_empty() {
        return Err(ConfigError::NoPhases);
    }

    // action table (shared by reference across phases)
    let mut action_ids: HashMap<String, usize> = HashMap::new();
    let mut actions: Vec<ActionSpec> = Vec::new();
    for doc in &config.actions {
        action_ids.insert(doc.name.clone(), actions.len());
        actions.push(build_action_spec(doc));
    }

    // attack entities: allocate first so combos and transitions can
    // reference each other in any order
    let mut attack_ids: HashMap<String, Entity> = HashMap::new();
    for doc in &config.attacks {
        attack_ids.insert(doc.name.clone(), world.spawn_empty().id());
    }
    for doc in &config.attacks {
        let entity = attack_ids[&doc.name];
        let spec = build_attack_spec(doc, entity, &attack_ids, &action_ids);
        world.entity_mut(entity).insert(spec);
        if let Some(hitbox) = &doc.hitbox {
            world.entity_mut(entity).insert(AttackHitbox::new(
                hitbox.radius,
                Vec2::new(hitbox.offset[0], hitbox.offset[1]),
            ));
        }
    }

    // phases, ordered by descending health lower bound
    let mut phases: Vec<BossPhase> = config
        .phases
        .iter()
        .map(|doc| BossPhase {
            health_lower_bound: doc.health_lower_bound.clamp(0.0, 0.99),
            action_ids: doc
                .actions
                .iter()
                .filter_map(|name| {
                    let id = action_ids.get(name).copied();
                    if id.is_none() {
                        logger::log_warning(&format!("phase references unknown action '{}'", name));
                    }
                    id
                })
                .collect(),
            entrance: PhaseEntrance {
                attack: resolve_attack(&doc.entrance_attack, &attack_ids, "phase entrance"),
                animation_trigger: doc.entrance_animation.clone(),
            },
        })
        .collect();
    phases.sort_by(|a, b| {
        b.health_lower_bound
            .partial_cmp(&a.health_lower_bound)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut boss = Boss::new(player);
    boss.std_speed = config.core.std_speed;
    boss.std_acceleration = config.core.std_acceleration;
    boss.ice_speed_mod = config.core.ice_speed_mod;
    boss.ice_acceleration_mod = config.core.ice_acceleration_mod;
    boss.min_action_switch_time = config.core.min_action_switch_time;
    boss.maximum_player_distance = config.core.maximum_player_distance;
    boss.player_close_distance = config.core.player_close_distance;
    boss.begin_active = config.core.begin_active;
    boss.music = config.core.music.clone();
    boss.attacks = config
        .attacks
        .iter()
        .map(|doc| attack_ids[&doc.name])
        .collect();
    boss.attack_action = actions
        .iter()
        .position(|action| action.behavior == BossBehavior::Attack);
    for name in &config.pre_occupy_history {
        if let Some(&attack) = attack_ids.get(name) {
            boss.history.push(attack);
        } else {
            logger::log_warning(&format!(
                "pre-occupy history references unknown attack '{}'",
                name
            ));
        }
    }

    let entity = world
        .spawn((
            boss,
            BossAssets { actions, phases },
            Health::new(config.core.max_health),
            Body::at(position),
            ActivePaintColor::default(),
            PaintSurfaceState::default(),
        ))
        .id();
    Ok(entity)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{
        "actions": [
            { "name": "idle", "behavior": "Idle" },
            { "name": "attack", "behavior": "Attack" }
        ],
        "attacks": [
            {
                "name": "swipe",
                "kind": { "type": "collider_sweep" },
                "phase_factors": [
                    { "phase": 1, "factors": { "variable_factors": [ { "kind": "MyHealth" } ] } }
                ]
            }
        ],
        "phases": [
            { "health_lower_bound": 0.5, "actions": ["idle", "attack"] },
            { "health_lower_bound": 0.0, "actions": ["attack"] }
        ]
    }"#;

    #[test]
    fn test_parse_minimal_config() {
        let config = BossConfig::from_json(MINIMAL).unwrap();
        assert_eq!(config.actions.len(), 2);
        assert_eq!(config.attacks.len(), 1);
        assert_eq!(config.phases.len(), 2);
        assert_eq!(config.core.max_health, 100.0);
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            BossConfig::from_json("not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_no_phases_is_fatal() {
        let mut config = BossConfig::from_json(MINIMAL).unwrap();
        config.phases.clear();
        let mut world = World::new();
        let player = world.spawn_empty().id();
        let result = spawn_boss(&mut world, &config, player, Vec2::ZERO);
        assert!(matches!(result, Err(ConfigError::NoPhases)));
    }

    #[test]
    fn test_spawn_sorts_phases_descending() {
        let mut config = BossConfig::from_json(MINIMAL).unwrap();
        // authored out of order on purpose
        config.phases.reverse();
        let mut world = World::new();
        let player = world.spawn_empty().id();
        let boss = spawn_boss(&mut world, &config, player, Vec2::ZERO).unwrap();
        let assets = world.get::<BossAssets>(boss).unwrap();
        assert_eq!(assets.phases[0].health_lower_bound, 0.5);
        assert_eq!(assets.phases[1].health_lower_bound, 0.0);
    }

    #[test]
    fn test_bad_clamp_bounds_repaired() {
        let doc = ActionDoc {
            name: "broken".to_string(),
            behavior: BossBehavior::Idle,
            minimum_utility: 0.8,
            maximum_utility: 0.2,
            factors: FactorSet::default(),
            random_bonus_max: 0.01,
            minimum_perform_time: 0.5,
            relative_destination: [0.0, 0.0],
        };
        let spec = build_action_spec(&doc);
        assert_eq!(spec.minimum_utility, 0.0);
        assert_eq!(spec.maximum_utility, 0.2);
    }

    #[test]
    fn test_unknown_phase_action_dropped() {
        let mut config = BossConfig::from_json(MINIMAL).unwrap();
        config.phases[0].actions.push("missing".to_string());
        let mut world = World::new();
        let player = world.spawn_empty().id();
        let boss = spawn_boss(&mut world, &config, player, Vec2::ZERO).unwrap();
        let assets = world.get::<BossAssets>(boss).unwrap();
        assert_eq!(assets.phases[0].action_ids.len(), 2);
    }

    #[test]
    fn test_attack_action_detected() {
        let config = BossConfig::from_json(MINIMAL).unwrap();
        let mut world = World::new();
        let player = world.spawn_empty().id();
        let boss_entity = spawn_boss(&mut world, &config, player, Vec2::ZERO).unwrap();
        let boss = world.get::<Boss>(boss_entity).unwrap();
        assert_eq!(boss.attack_action, Some(1));
        assert_eq!(boss.attacks.len(), 1);
    }
}
