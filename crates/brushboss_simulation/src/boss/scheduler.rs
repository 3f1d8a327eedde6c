//! Boss scheduling systems
//!
//! The arbitration system re-scores every action of the current phase on a
//! 0.05 s clock and commits the winner under the transition rules; the
//! remaining systems keep the observed variables fresh, run the phase
//! entry protocol, route animator signals, and translate the committed
//! action into movement.

use bevy::prelude::*;

use crate::attack::{AttackKind, AttackSpec, AttackState, StartAttackRun, StopAttack};
use crate::boss::{
    current_phase_index, Boss, BossAssets, PhaseEntrance, PhaseEntrySequence,
    ATTACK_RATE_INTERVAL, DAMAGE_RATE_INTERVAL, MAX_EXPECTED_PLAYER_DAMAGE,
    PATH_NODE_CLOSE_RADIUS, PATH_UPDATE_RATE, PHASE_ENTRY_ANIMATION_HOLD, PHASE_ENTRY_IDLE_WAIT,
    PLAYER_CLOSE_TIME, UTILITY_UPDATE_RATE,
};
use crate::components::{ActivePaintColor, Body, Health, PaintSurfaceState};
use crate::interfaces::{
    AnimationCommand, AnimationCommandKind, AnimationEvent, AnimationEventKind, AttackEnded,
    AudioCommand, CameraCommand, CameraCommandKind, DamageTaken, Pathfinder, PhaseChanged,
    SetBossActive,
};
use crate::logger;
use crate::utility::action::BossBehavior;
use crate::utility::scoring::{action_utility, best_attack, AttackCandidate, UtilityContext};
use crate::DeterministicRng;

/// Snapshot the scoring engine reads this tick
fn build_context(boss: &Boss, health: &Health, color: &ActivePaintColor) -> UtilityContext {
    UtilityContext {
        player_distance: boss.player_distance(),
        maximum_player_distance: boss.maximum_player_distance,
        health_fraction: health.fraction(),
        time_close_to_player: boss.time_close_to_player,
        player_close_window: PLAYER_CLOSE_TIME,
        damage_rate: boss.damage_window.total() / DAMAGE_RATE_INTERVAL,
        maximum_damage_rate: MAX_EXPECTED_PLAYER_DAMAGE * DAMAGE_RATE_INTERVAL,
        to_player: boss.to_player,
        time_in_action: boss.time_in_current_action,
        attacks_in_window: boss.attack_window.count(),
        max_attacks_in_window: Boss::max_attacks_in_window(),
        paint_color: color.0,
    }
}

/// Commit to performing the already-selected best attack
///
/// The history ring and the attack-rate window update in the same step as
/// the commit, so no scoring call ever observes a half-updated ring.
fn commit_attack(
    entity: Entity,
    boss: &mut Boss,
    performing: bool,
    start_w: &mut EventWriter<StartAttackRun>,
) {
    if boss.attacks.is_empty() || performing {
        return;
    }
    let Some(attack) = boss.current_attack else {
        logger::log_warning("attack commit without a selected attack");
        return;
    };
    boss.waiting_for_idle = true;
    boss.history.push(attack);
    boss.attack_window.push(1.0, ATTACK_RATE_INTERVAL);
    start_w.write(StartAttackRun {
        attack,
        boss: entity,
        player: boss.player,
        to_player: boss.to_player,
        exclusive: true,
        retried: false,
    });
}

/// Commit to an action and run its entry behavior
fn commit_action(
    entity: Entity,
    boss: &mut Boss,
    assets: &BossAssets,
    action_id: usize,
    boss_position: Vec2,
    performing: bool,
    start_w: &mut EventWriter<StartAttackRun>,
) {
    boss.current_action = Some(action_id);
    boss.time_in_current_action = 0.0;
    let action = &assets.actions[action_id];
    logger::log_debug(&format!("boss behavior -> {:?}", action.behavior));
    match action.behavior {
        BossBehavior::Attack => commit_attack(entity, boss, performing, start_w),
        BossBehavior::MoveSpecific => boss.ms_start_pos = boss_position,
        BossBehavior::MoveToPlayer => boss.reset_pathfinding(),
        _ => {}
    }
}

/// Begin the one-shot phase entry protocol
fn begin_phase_entry(
    boss: &mut Boss,
    entrance: PhaseEntrance,
    stop_w: &mut EventWriter<StopAttack>,
) {
    if entrance.is_empty() {
        return;
    }
    if let Some(attack) = boss.current_attack {
        stop_w.write(StopAttack { attack });
    }
    // make sure we get back to the idle state first
    boss.waiting_for_idle = true;
    boss.phase_entry = Some(PhaseEntrySequence::AwaitIdle {
        remaining: PHASE_ENTRY_IDLE_WAIT,
        entrance,
    });
}

/// System: activation toggles, including the authored begin-active case
///
/// Deactivation stops the in-flight attack; the first activation runs the
/// first phase's entrance behavior and frames the fight intro.
pub fn handle_boss_activation(
    mut events: EventReader<SetBossActive>,
    mut bosses: Query<(Entity, &mut Boss, &BossAssets)>,
    mut stop_w: EventWriter<StopAttack>,
    mut camera_w: EventWriter<CameraCommand>,
) {
    for (entity, mut boss, assets) in bosses.iter_mut() {
        if boss.begin_active && !boss.has_activated_once {
            set_active(entity, &mut boss, assets, true, &mut stop_w, &mut camera_w);
        }
    }
    for event in events.read() {
        let Ok((entity, mut boss, assets)) = bosses.get_mut(event.boss) else {
            continue;
        };
        set_active(
            entity,
            &mut boss,
            assets,
            event.active,
            &mut stop_w,
            &mut camera_w,
        );
    }
}

fn set_active(
    _entity: Entity,
    boss: &mut Boss,
    assets: &BossAssets,
    active: bool,
    stop_w: &mut EventWriter<StopAttack>,
    camera_w: &mut EventWriter<CameraCommand>,
) {
    boss.active = active;
    if let Some(attack) = boss.current_attack {
        stop_w.write(StopAttack { attack });
    }
    if active {
        if !boss.has_activated_once {
            if let Some(first) = assets.phases.first() {
                begin_phase_entry(boss, first.entrance.clone(), stop_w);
            }
            camera_w.write(CameraCommand {
                kind: CameraCommandKind::FightIntro,
            });
        }
        boss.has_activated_once = true;
    }
}

/// System: react to damage the boss received
///
/// Every hit feeds the damage-rate window; the phase index is recomputed
/// before any transition is evaluated, and a change triggers the phase
/// entry protocol plus the phase-change notification.
pub fn boss_on_damage(
    mut events: EventReader<DamageTaken>,
    mut bosses: Query<(Entity, &mut Boss, &BossAssets, &Health)>,
    mut stop_w: EventWriter<StopAttack>,
    mut phase_w: EventWriter<PhaseChanged>,
) {
    for event in events.read() {
        let Ok((entity, mut boss, assets, health)) = bosses.get_mut(event.target) else {
            continue;
        };
        boss.damage_window.push(event.amount, DAMAGE_RATE_INTERVAL);
        let Some(new_index) = current_phase_index(&assets.phases, health.fraction()) else {
            continue;
        };
        if new_index != boss.last_phase_index {
            begin_phase_entry(&mut boss, assets.phases[new_index].entrance.clone(), &mut stop_w);
            phase_w.write(PhaseChanged {
                boss: entity,
                phase: new_index as u32 + 1,
            });
            logger::log_info(&format!("boss entered phase {}", new_index + 1));
        }
        boss.last_phase_index = new_index;
    }
}

/// System: route animator signals into the boss and its attacks
///
/// The timed event gates the current attack's active frames (combos
/// forward it to their children) and ends an entrance animation hold; the
/// idle confirmation releases every idle wait.
pub fn route_animation_events(
    mut events: EventReader<AnimationEvent>,
    mut bosses: Query<&mut Boss>,
    mut states: Query<(Entity, &AttackSpec, &mut AttackState)>,
) {
    for event in events.read() {
        let Ok(mut boss) = bosses.get_mut(event.boss) else {
            continue;
        };
        match event.kind {
            AnimationEventKind::TimedEvent => {
                if let Some(current) = boss.current_attack {
                    let children: Vec<Entity> = states
                        .get(current)
                        .map(|(_, spec, _)| match &spec.kind {
                            AttackKind::Combo { order, .. } => order.clone(),
                            _ => Vec::new(),
                        })
                        .unwrap_or_default();
                    if let Ok((_, _, mut state)) = states.get_mut(current) {
                        state.active_frames_trigger = true;
                    }
                    for child in children {
                        if let Ok((_, _, mut state)) = states.get_mut(child) {
                            state.active_frames_trigger = true;
                        }
                    }
                }
                // an entrance animation reached its payoff frame
                boss.phase_entry = None;
            }
            AnimationEventKind::IdleReached => {
                boss.waiting_for_idle = false;
                for (_, _, mut state) in states.iter_mut() {
                    if state.boss == event.boss {
                        state.waiting_for_idle = false;
                    }
                }
            }
        }
    }
}

/// System: refresh the variables the utility engine observes
pub fn update_boss_context(
    time: Res<Time<Fixed>>,
    mut bosses: Query<(&mut Boss, &Body)>,
    player_bodies: Query<&Body, Without<Boss>>,
) {
    let delta = time.delta_secs();
    for (mut boss, body) in bosses.iter_mut() {
        if !boss.active {
            continue;
        }
        boss.time_in_current_action += delta;
        let player = boss.player;
        if let Ok(player_body) = player_bodies.get(player) {
            boss.to_player = player_body.position - body.position;
        }
        if boss.player_distance() >= boss.player_close_distance {
            boss.time_close_to_player -= delta;
        } else {
            boss.time_close_to_player += delta;
        }
        boss.time_close_to_player = boss.time_close_to_player.clamp(0.0, PLAYER_CLOSE_TIME);
        boss.damage_window.tick(delta);
        boss.attack_window.tick(delta);
    }
}

/// System: advance the phase entry protocol
pub fn advance_phase_entry(
    time: Res<Time<Fixed>>,
    mut bosses: Query<(Entity, &mut Boss)>,
    mut anim_w: EventWriter<AnimationCommand>,
) {
    let delta = time.delta_secs();
    for (entity, mut boss) in bosses.iter_mut() {
        let Some(sequence) = boss.phase_entry.take() else {
            continue;
        };
        match sequence {
            PhaseEntrySequence::AwaitIdle {
                mut remaining,
                entrance,
            } => {
                remaining -= delta;
                if boss.waiting_for_idle && remaining > 0.0 {
                    boss.phase_entry = Some(PhaseEntrySequence::AwaitIdle {
                        remaining,
                        entrance,
                    });
                    continue;
                }
                // idle reached (or waited long enough): run the entrance
                if let Some(attack) = entrance.attack {
                    boss.queued_attack = Some(attack);
                    boss.phase_entry = Some(PhaseEntrySequence::Hold {
                        remaining: boss.min_action_switch_time,
                    });
                } else if let Some(trigger) = entrance.animation_trigger {
                    boss.waiting_for_idle = true;
                    anim_w.write(AnimationCommand {
                        boss: entity,
                        kind: AnimationCommandKind::Trigger(trigger),
                    });
                    boss.phase_entry = Some(PhaseEntrySequence::Hold {
                        remaining: PHASE_ENTRY_ANIMATION_HOLD,
                    });
                }
            }
            PhaseEntrySequence::Hold { mut remaining } => {
                remaining -= delta;
                if remaining > 0.0 {
                    boss.phase_entry = Some(PhaseEntrySequence::Hold { remaining });
                }
            }
        }
    }
}

/// System: the top-level arbitration loop (0.05 s clock)
///
/// Skips the tick while switching is not allowed (global switch cooldown,
/// the action's own minimum commit time, an attack mid-execution, or an
/// unconfirmed idle). A queued entrance attack bypasses scoring; otherwise
/// every action of the current phase is re-scored and the winner commits
/// under the behavior transition rules, with ties retained by the
/// committed action.
#[allow(clippy::too_many_arguments)]
pub fn boss_utility_arbitration(
    time: Res<Time<Fixed>>,
    mut rng: ResMut<DeterministicRng>,
    mut bosses: Query<(
        Entity,
        &mut Boss,
        &BossAssets,
        &Health,
        &ActivePaintColor,
        &Body,
    )>,
    attack_specs: Query<&AttackSpec>,
    active_states: Query<&AttackState>,
    mut start_w: EventWriter<StartAttackRun>,
    mut audio_w: EventWriter<AudioCommand>,
) {
    let delta = time.delta_secs();
    for (entity, mut boss, assets, health, color, body) in bosses.iter_mut() {
        if !boss.active {
            continue;
        }
        boss.utility_clock -= delta;
        if boss.utility_clock > 0.0 {
            continue;
        }
        boss.utility_clock = UTILITY_UPDATE_RATE;

        // determine if we should/can switch actions
        if boss.time_in_current_action < boss.min_action_switch_time {
            continue;
        }
        if let Some(current) = boss.current_action {
            if boss.time_in_current_action < assets.actions[current].minimum_perform_time {
                continue;
            }
        }
        let performing = active_states.iter().any(|state| state.boss == entity);
        if performing || boss.waiting_for_idle {
            continue;
        }

        if !boss.has_started_music {
            if let Some(music) = &boss.music {
                audio_w.write(AudioCommand { cue: music.clone() });
            }
            boss.has_started_music = true;
        }

        // a queued entrance attack bypasses scoring for one cycle
        if let Some(queued) = boss.queued_attack.take() {
            boss.current_attack = Some(queued);
            if let Some(attack_action) = boss.attack_action {
                commit_action(
                    entity,
                    &mut boss,
                    assets,
                    attack_action,
                    body.position,
                    performing,
                    &mut start_w,
                );
            } else {
                commit_attack(entity, &mut boss, performing, &mut start_w);
            }
            continue;
        }
        if boss.in_phase_entry() {
            continue;
        }

        let Some(phase_idx) = current_phase_index(&assets.phases, health.fraction()) else {
            continue;
        };
        let phase_number = phase_idx as u32 + 1;
        let ctx = build_context(&boss, health, color);

        // the Attack wrapper scores as the best attack of the roster
        let phase = &assets.phases[phase_idx];
        let scoring_attack = phase
            .action_ids
            .iter()
            .chain(boss.current_action.iter())
            .any(|&id| assets.actions[id].behavior == BossBehavior::Attack);
        let best_attack_score = if scoring_attack {
            let candidates: Vec<AttackCandidate> = boss
                .attacks
                .iter()
                .filter_map(|&attack| {
                    attack_specs.get(attack).ok().map(|spec| AttackCandidate {
                        entity: attack,
                        spec,
                        uses_in_history: boss.history.count_of(attack),
                    })
                })
                .collect();
            let best = best_attack(&candidates, phase_number, &ctx, &mut rng.rng);
            if let Some((attack, _)) = best {
                boss.current_attack = Some(attack);
            }
            best.map(|(_, utility)| utility)
        } else {
            None
        };

        // strict maximum over the phase's authored order
        let mut best_action: Option<usize> = None;
        let mut best_utility = -1.0;
        for &action_id in &phase.action_ids {
            let utility =
                action_utility(&assets.actions[action_id], best_attack_score, &ctx, &mut rng.rng);
            if utility > best_utility {
                best_utility = utility;
                best_action = Some(action_id);
            }
        }
        // the committed action retains its slot on ties
        if let Some(current) = boss.current_action {
            let utility =
                action_utility(&assets.actions[current], best_attack_score, &ctx, &mut rng.rng);
            if utility >= best_utility {
                best_action = Some(current);
            }
        }

        let Some(winner) = best_action else {
            continue;
        };
        let allowed = boss
            .current_action
            .map(|current| {
                assets.actions[current]
                    .behavior
                    .can_transition_to(assets.actions[winner].behavior)
            })
            .unwrap_or(true);
        if allowed {
            commit_action(
                entity,
                &mut boss,
                assets,
                winner,
                body.position,
                performing,
                &mut start_w,
            );
        }
    }
}

/// System: apply an attack's configured forced transition when it finishes
///
/// An explicit next attack overrides an explicit next action; both override
/// normal arbitration. Sub-attacks of a combo do not reach here because the
/// boss's committed attack is the combo itself.
pub fn handle_attack_ended(
    mut events: EventReader<AttackEnded>,
    mut bosses: Query<(Entity, &mut Boss, &BossAssets, &Body)>,
    attack_specs: Query<&AttackSpec>,
    active_states: Query<&AttackState>,
    mut start_w: EventWriter<StartAttackRun>,
) {
    for event in events.read() {
        let Ok((entity, mut boss, assets, body)) = bosses.get_mut(event.boss) else {
            continue;
        };
        if boss.current_attack != Some(event.attack) {
            continue;
        }
        let Ok(spec) = attack_specs.get(event.attack) else {
            continue;
        };
        let performing = active_states.iter().any(|state| state.boss == entity);
        if let Some(next_attack) = spec.transition_attack {
            boss.current_attack = Some(next_attack);
            if let Some(attack_action) = boss.attack_action {
                commit_action(
                    entity,
                    &mut boss,
                    assets,
                    attack_action,
                    body.position,
                    performing,
                    &mut start_w,
                );
            } else {
                commit_attack(entity, &mut boss, performing, &mut start_w);
            }
        } else if let Some(action_id) = spec.transition_action {
            commit_action(
                entity,
                &mut boss,
                assets,
                action_id,
                body.position,
                performing,
                &mut start_w,
            );
        }
    }
}

/// System: translate the committed action into movement
///
/// MoveToPlayer follows the planner's waypoints (refreshed at a bounded
/// rate) and falls back to straight-line pursuit; attacks that override
/// movement drive the boss themselves.
pub fn move_boss_from_action(
    time: Res<Time<Fixed>>,
    mut bosses: Query<(
        Entity,
        &mut Boss,
        &mut Body,
        &PaintSurfaceState,
        &BossAssets,
    )>,
    player_bodies: Query<&Body, Without<Boss>>,
    attack_specs: Query<&AttackSpec>,
    active_states: Query<&AttackState>,
    pathfinder: Res<Pathfinder>,
    mut anim_w: EventWriter<AnimationCommand>,
) {
    let delta = time.delta_secs();
    for (entity, mut boss, mut body, surface, assets) in bosses.iter_mut() {
        if !boss.active {
            continue;
        }
        let mut move_dir = Vec2::ZERO;
        let mut stop_after_animation = false;

        if let Some(action_id) = boss.current_action {
            let behavior = assets.actions[action_id].behavior;
            match behavior {
                BossBehavior::MoveToPlayer => {
                    if let Some(planner) = &pathfinder.0 {
                        boss.path_timer -= delta;
                        if boss.path_timer <= 0.0 {
                            if let Ok(player_body) = player_bodies.get(boss.player) {
                                boss.path =
                                    planner.compute_path(body.position, player_body.position);
                                boss.path_index = 1;
                                boss.path_timer = PATH_UPDATE_RATE;
                            }
                        }
                        if boss.path.len() > boss.path_index && boss.path_index > 0 {
                            let next = boss.path[boss.path_index];
                            move_dir = next - boss.path[boss.path_index - 1];
                            if next.distance(body.position) <= PATH_NODE_CLOSE_RADIUS {
                                boss.path_index += 1;
                            }
                        } else {
                            // no usable path, straight-line pursuit
                            move_dir = boss.to_player.normalize_or_zero();
                        }
                    } else {
                        move_dir = boss.to_player.normalize_or_zero();
                    }
                }
                BossBehavior::Attack => {
                    if let Some(attack) = boss.current_attack {
                        if let (Ok(spec), Ok(state)) =
                            (attack_specs.get(attack), active_states.get(attack))
                        {
                            if spec.override_movement {
                                move_dir = state.override_direction;
                                stop_after_animation = true;
                            }
                        }
                    }
                }
                BossBehavior::MoveAwayFromPlayer => {
                    move_dir = -boss.to_player.normalize_or_zero();
                }
                BossBehavior::MoveSpecific => {
                    let current = body.position - boss.ms_start_pos;
                    let destination = assets.actions[action_id].relative_destination;
                    if current.length() < destination.length() {
                        move_dir = destination;
                    }
                }
                BossBehavior::Idle => {}
            }
            anim_w.write(AnimationCommand {
                boss: entity,
                kind: AnimationCommandKind::SetBool(
                    "walking".to_string(),
                    behavior != BossBehavior::Attack && move_dir.length() > 0.0,
                ),
            });
        }
        anim_w.write(AnimationCommand {
            boss: entity,
            kind: AnimationCommandKind::Direction(move_dir),
        });

        let performing = active_states.iter().any(|state| state.boss == entity);
        if stop_after_animation || (boss.in_phase_entry() && !performing) {
            continue;
        }
        let desired = move_dir * boss.acceleration(surface);
        let velocity = body.velocity + desired;
        let speed_cap = boss.speed(surface);
        body.velocity = velocity.normalize_or_zero() * velocity.length().clamp(0.0, speed_cap);
    }
}
