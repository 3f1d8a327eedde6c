//! Attack runtime state and the start/stop protocol
//!
//! An attack entity carries its authored `AttackSpec` permanently and an
//! `AttackState` component only while a run is in flight; presence of the
//! state component is what "active" means. Runs are started and stopped
//! through the `StartAttackRun`/`StopAttack` events so that only one place
//! enforces the stop-then-start rule and the stale-run cancellation.

use bevy::prelude::*;
use rand::Rng;

use crate::attack::hitbox::AttackHitbox;
use crate::attack::spec::{AttackKind, AttackSpec, ColorChance, MAXIMUM_WAIT_TRIGGER};
use crate::boss::{current_phase_index, BossAssets};
use crate::components::{Health, MultiplierHandle, PaintColor};
use crate::interfaces::{AnimationCommand, AnimationCommandKind, AudioCommand};
use crate::logger;
use crate::DeterministicRng;

/// Request to begin (or restart) an attack run
///
/// `retried` marks the one-tick-deferred second attempt after a failed
/// start; a request that fails twice is dropped with an error.
#[derive(Event, Debug, Clone)]
pub struct StartAttackRun {
    pub attack: Entity,
    pub boss: Entity,
    pub player: Entity,
    pub to_player: Vec2,
    /// True when this run claims the boss's single active slot (every other
    /// run of the boss is stopped first). Combo children start non-exclusive
    /// so they do not cancel their parent.
    pub exclusive: bool,
    pub retried: bool,
}

/// Forced stop of an attack run (idempotent; safe on an idle attack)
#[derive(Event, Debug, Clone)]
pub struct StopAttack {
    pub attack: Entity,
}

/// The three sequential phases of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackPhaseKind {
    Startup,
    Active,
    Recovery,
}

/// Bounded wait for the animation-timing signal
///
/// If the signal does not arrive in time the trigger is re-fired once;
/// after a second timeout the wait gives up and the run proceeds.
#[derive(Debug, Clone, Default)]
pub struct TriggerWait {
    pub waited: f32,
    pub retriggered: bool,
}

impl TriggerWait {
    /// Returns true once the wait is over (signal received or given up)
    pub fn tick(
        &mut self,
        signal: bool,
        delta: f32,
        trigger: Option<&str>,
        boss: Entity,
        anim_w: &mut EventWriter<AnimationCommand>,
    ) -> bool {
        let Some(trigger) = trigger else {
            // nothing to synchronize with
            return true;
        };
        if signal {
            return true;
        }
        self.waited += delta;
        if self.waited > MAXIMUM_WAIT_TRIGGER {
            if !self.retriggered {
                anim_w.write(AnimationCommand {
                    boss,
                    kind: AnimationCommandKind::Trigger(trigger.to_string()),
                });
                self.waited = 0.0;
                self.retriggered = true;
            } else {
                // gave up waiting; proceed anyway
                return true;
            }
        }
        false
    }
}

/// Recovery sub-stages of the dash variants
#[derive(Debug, Clone)]
pub enum DashRecoveryStage {
    Slowing,
    Stunned { remaining: f32 },
    IceExtra { remaining: f32 },
    AwaitIdle { remaining: f32 },
}

/// Recovery sub-stages of the combo variant
#[derive(Debug, Clone)]
pub enum ComboRecoveryStage {
    Cooldown { remaining: f32 },
    AwaitIdle { remaining: f32 },
}

#[derive(Debug, Clone, Default)]
pub struct SweepRun {
    pub wait: TriggerWait,
    pub frames_left: u32,
    pub initial_velocity: Vec2,
}

#[derive(Debug, Clone)]
pub struct DashRun {
    pub wait: TriggerWait,
    pub collided: bool,
    pub hit_ice: bool,
    pub slip_triggered: bool,
    pub time_waited: f32,
    pub frames_left: u32,
    pub initial_velocity: Vec2,
    pub recovery: DashRecoveryStage,
}

impl Default for DashRun {
    fn default() -> Self {
        Self {
            wait: TriggerWait::default(),
            collided: false,
            hit_ice: false,
            slip_triggered: false,
            time_waited: 0.0,
            frames_left: 0,
            initial_velocity: Vec2::ZERO,
            recovery: DashRecoveryStage::Slowing,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ComboRun {
    pub frames_left: u32,
    pub stop_index: u32,
    pub index: u32,
    pub child: Option<Entity>,
    pub recovery: ComboRecoveryStage,
}

impl Default for ComboRun {
    fn default() -> Self {
        Self {
            frames_left: 0,
            stop_index: 0,
            index: 0,
            child: None,
            recovery: ComboRecoveryStage::Cooldown { remaining: 0.0 },
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ShieldRun {
    pub wait: TriggerWait,
    pub frame: u32,
    pub was_hit: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SustainedRun {
    pub wait: TriggerWait,
    pub sustained_damage: f32,
    pub time_waiting: f32,
    /// Recovery is two waits: the end trigger, then the roar
    pub roaring: bool,
}

#[derive(Debug, Clone, Default)]
pub struct PaintFallRun {
    pub wait: TriggerWait,
    pub remaining_globs: u32,
    pub next_spawn: f32,
}

/// Per-variant runtime data of one run
#[derive(Debug, Clone)]
pub enum VariantRun {
    Sweep(SweepRun),
    Dash(DashRun),
    Rampage(DashRun),
    Combo(ComboRun),
    Shield(ShieldRun),
    Sustained(SustainedRun),
    PaintFall(PaintFallRun),
}

impl VariantRun {
    pub fn for_kind(kind: &AttackKind) -> Self {
        match kind {
            AttackKind::ColliderSweep { .. } => VariantRun::Sweep(SweepRun::default()),
            AttackKind::Dash(_) => VariantRun::Dash(DashRun::default()),
            AttackKind::RampageDash(_) => VariantRun::Rampage(DashRun::default()),
            AttackKind::Combo { .. } => VariantRun::Combo(ComboRun::default()),
            AttackKind::Shield { .. } => VariantRun::Shield(ShieldRun::default()),
            AttackKind::SustainedShield { .. } => VariantRun::Sustained(SustainedRun::default()),
            AttackKind::PaintFall { .. } => VariantRun::PaintFall(PaintFallRun::default()),
        }
    }
}

/// Runtime state of an in-flight attack run
///
/// Inserted at run start, removed on completion or forced stop. Carries the
/// context locked in at entry (direction, paint color) so variants stay free
/// of hidden coupling to ambient boss state.
#[derive(Component, Debug)]
pub struct AttackState {
    pub boss: Entity,
    pub player: Entity,
    /// Boss-to-player vector captured when the run started
    pub to_player: Vec2,
    /// Movement direction this attack currently applies to the boss
    pub override_direction: Vec2,
    /// Paint color locked in for this run (None = no paint)
    pub color: Option<PaintColor>,
    pub phase: AttackPhaseKind,
    /// False until the driver has run the current phase's entry step
    pub phase_initialized: bool,
    /// Set by the animation-timing signal; gates animation-synced variants
    pub active_frames_trigger: bool,
    /// Set while this run waits for the idle confirmation
    pub waiting_for_idle: bool,
    /// Paint was already deposited this run
    pub paint_done: bool,
    /// The most recent hitbox contact was the player
    pub last_hit_was_player: bool,
    /// Damage multiplier installed by this run, released on stop/finish
    pub multiplier_handle: Option<MultiplierHandle>,
    pub run: VariantRun,
}

impl AttackState {
    pub fn new(
        spec: &AttackSpec,
        boss: Entity,
        player: Entity,
        to_player: Vec2,
        color: Option<PaintColor>,
    ) -> Self {
        Self {
            boss,
            player,
            to_player,
            override_direction: to_player,
            color,
            phase: AttackPhaseKind::Startup,
            phase_initialized: false,
            active_frames_trigger: false,
            waiting_for_idle: false,
            paint_done: false,
            last_hit_was_player: false,
            multiplier_handle: None,
            run: VariantRun::for_kind(&spec.kind),
        }
    }
}

/// Weighted random color draw over a phase-gated color table
///
/// Walks the table in order accumulating probability brackets; the first
/// color whose bracket contains the roll wins. Colors gated to a later
/// phase are skipped without widening the bracket. None when the roll
/// lands past every bracket.
pub fn draw_attack_color(
    colors: &[ColorChance],
    phase_number: u32,
    roll: f32,
) -> Option<PaintColor> {
    let mut cumulative = 0.0;
    for chance in colors {
        if phase_number < chance.phase {
            continue;
        }
        if roll < chance.probability + cumulative {
            return Some(chance.color);
        }
        cumulative += chance.probability;
    }
    None
}

/// Release everything a run holds on the boss without completing it:
/// immunity, installed damage multiplier, stun/cooldown animator bools
fn release_run_effects(
    attack: Entity,
    spec: &AttackSpec,
    state: &mut AttackState,
    health: Option<&mut Health>,
    hitboxes: &mut Query<&mut AttackHitbox>,
    anim_w: &mut EventWriter<AnimationCommand>,
) {
    if let Some(health) = health {
        health.damage_immune = false;
        if let Some(handle) = state.multiplier_handle.take() {
            health.remove_damage_multiplier(handle);
        }
    }
    if let Ok(mut hitbox) = hitboxes.get_mut(attack) {
        hitbox.enabled = false;
    }
    match &spec.kind {
        AttackKind::Dash(params) | AttackKind::RampageDash(params) => {
            anim_w.write(AnimationCommand {
                boss: state.boss,
                kind: AnimationCommandKind::SetBool(params.stun_animation.clone(), false),
            });
        }
        AttackKind::Combo {
            cooldown_animation: Some(animation),
            ..
        } => {
            anim_w.write(AnimationCommand {
                boss: state.boss,
                kind: AnimationCommandKind::SetBool(animation.clone(), false),
            });
        }
        _ => {}
    }
}

/// System: process stop requests, then start requests
///
/// Stops come first so a stop-then-start pair issued the same tick behaves
/// as written. Starting cancels any stale run of the same attack and stops
/// every other active run of the same boss, since only one attack may hold the
/// active slot.
pub fn process_attack_run_requests(
    mut stop_events: EventReader<StopAttack>,
    mut start_events: EventReader<StartAttackRun>,
    mut retries: Local<Vec<StartAttackRun>>,
    mut commands: Commands,
    mut attacks: ParamSet<(
        Query<(Entity, &AttackSpec, &mut AttackState)>,
        Query<&AttackSpec>,
    )>,
    mut bosses: Query<(&BossAssets, &mut Health)>,
    mut hitboxes: Query<&mut AttackHitbox>,
    mut rng: ResMut<DeterministicRng>,
    mut anim_w: EventWriter<AnimationCommand>,
    mut audio_w: EventWriter<AudioCommand>,
) {
    // forced stops (idempotent: a stop for an idle attack is a no-op)
    for stop in stop_events.read() {
        let mut query = attacks.p0();
        let Ok((entity, spec, mut state)) = query.get_mut(stop.attack) else {
            continue;
        };
        let health = bosses.get_mut(state.boss).ok().map(|(_, h)| h);
        release_run_effects(
            entity,
            spec,
            &mut state,
            health.map(|h| h.into_inner()),
            &mut hitboxes,
            &mut anim_w,
        );
        if let Some(trigger) = &spec.end_anim_trigger {
            anim_w.write(AnimationCommand {
                boss: state.boss,
                kind: AnimationCommandKind::Trigger(trigger.clone()),
            });
        }
        commands.entity(entity).remove::<AttackState>();
        logger::log_debug(&format!("attack '{}' force-stopped", spec.name));
    }

    let requests: Vec<StartAttackRun> = retries
        .drain(..)
        .chain(start_events.read().cloned())
        .collect();

    for request in requests {
        // cancel a stale run of the same attack; an exclusive start also
        // stops every other active run of this boss first (only one attack
        // may hold the active slot)
        {
            let mut query = attacks.p0();
            let mut to_remove = Vec::new();
            for (entity, spec, mut state) in query.iter_mut() {
                if state.boss != request.boss {
                    continue;
                }
                let stale_self = entity == request.attack;
                if !stale_self && !request.exclusive {
                    continue;
                }
                let health = bosses.get_mut(state.boss).ok().map(|(_, h)| h);
                release_run_effects(
                    entity,
                    spec,
                    &mut state,
                    health.map(|h| h.into_inner()),
                    &mut hitboxes,
                    &mut anim_w,
                );
                if !stale_self {
                    to_remove.push(entity);
                }
            }
            for entity in to_remove {
                commands.entity(entity).remove::<AttackState>();
            }
        }

        let spec = match attacks.p1().get(request.attack) {
            Ok(spec) => spec.clone(),
            Err(_) => {
                // a failed start defers one tick and retries once
                if !request.retried {
                    logger::log_warning(&format!(
                        "attack start failed for {:?}, retrying next tick",
                        request.attack
                    ));
                    retries.push(StartAttackRun {
                        retried: true,
                        ..request
                    });
                } else {
                    logger::log_error(&format!(
                        "attack start failed twice for {:?}, dropping request",
                        request.attack
                    ));
                }
                continue;
            }
        };

        // lock in this run's paint color
        let phase_number = bosses
            .get(request.boss)
            .ok()
            .and_then(|(assets, health)| current_phase_index(&assets.phases, health.fraction()))
            .map(|i| i as u32 + 1)
            .unwrap_or(1);
        let roll = rng.rng.gen_range(0.0..1.0);
        let color = draw_attack_color(&spec.colors, phase_number, roll);

        let state = AttackState::new(
            &spec,
            request.boss,
            request.player,
            request.to_player,
            color,
        );
        commands.entity(request.attack).insert(state);

        if let Some(trigger) = &spec.start_anim_trigger {
            anim_w.write(AnimationCommand {
                boss: request.boss,
                kind: AnimationCommandKind::Trigger(trigger.clone()),
            });
        }
        if let Some(cue) = &spec.startup_audio {
            audio_w.write(AudioCommand { cue: cue.clone() });
        }
        logger::log_debug(&format!("attack '{}' started", spec.name));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::ecs::system::SystemState;

    fn table() -> Vec<ColorChance> {
        vec![
            ColorChance {
                color: PaintColor::Red,
                probability: 0.5,
                phase: 1,
            },
            ColorChance {
                color: PaintColor::Blue,
                probability: 0.5,
                phase: 1,
            },
        ]
    }

    #[test]
    fn test_color_draw_brackets() {
        let colors = table();
        assert_eq!(draw_attack_color(&colors, 1, 0.3), Some(PaintColor::Red));
        assert_eq!(draw_attack_color(&colors, 1, 0.7), Some(PaintColor::Blue));
    }

    #[test]
    fn test_color_draw_past_all_brackets() {
        let mut colors = table();
        colors[1].probability = 0.4; // probabilities sum to 0.9
        assert_eq!(draw_attack_color(&colors, 1, 0.95), None);
    }

    #[test]
    fn test_color_draw_phase_gating() {
        let mut colors = table();
        colors[0].phase = 2; // red only from phase 2 on
        assert_eq!(draw_attack_color(&colors, 1, 0.3), Some(PaintColor::Blue));
        assert_eq!(draw_attack_color(&colors, 2, 0.3), Some(PaintColor::Red));
    }

    #[test]
    fn test_trigger_wait_without_trigger_is_instant() {
        let mut world = World::new();
        world.init_resource::<Events<AnimationCommand>>();
        let mut system_state: SystemState<EventWriter<AnimationCommand>> =
            SystemState::new(&mut world);
        let mut anim_w = system_state.get_mut(&mut world);

        let mut wait = TriggerWait::default();
        assert!(wait.tick(false, 0.016, None, Entity::PLACEHOLDER, &mut anim_w));
    }

    #[test]
    fn test_trigger_wait_refires_once_then_gives_up() {
        let mut world = World::new();
        world.init_resource::<Events<AnimationCommand>>();
        let mut system_state: SystemState<EventWriter<AnimationCommand>> =
            SystemState::new(&mut world);
        let mut anim_w = system_state.get_mut(&mut world);

        let mut wait = TriggerWait::default();
        let mut ticks = 0;
        // the signal never arrives: one re-fire window, then give up
        while !wait.tick(false, 0.1, Some("swipe"), Entity::PLACEHOLDER, &mut anim_w) {
            ticks += 1;
            assert!(ticks < 200, "trigger wait never gave up");
        }
        assert!(wait.retriggered);
        // two full timeout windows elapsed before giving up
        assert!(ticks as f32 * 0.1 > 2.0 * MAXIMUM_WAIT_TRIGGER);
    }

    #[test]
    fn test_trigger_wait_ends_on_signal() {
        let mut world = World::new();
        world.init_resource::<Events<AnimationCommand>>();
        let mut system_state: SystemState<EventWriter<AnimationCommand>> =
            SystemState::new(&mut world);
        let mut anim_w = system_state.get_mut(&mut world);

        let mut wait = TriggerWait::default();
        assert!(!wait.tick(false, 0.016, Some("swipe"), Entity::PLACEHOLDER, &mut anim_w));
        assert!(wait.tick(true, 0.016, Some("swipe"), Entity::PLACEHOLDER, &mut anim_w));
    }
}
