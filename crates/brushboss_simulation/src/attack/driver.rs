//! Attack phase driver
//!
//! Advances every in-flight attack run through Startup -> Active ->
//! Recovery each fixed tick. Transitions are strictly sequential; a phase
//! either finishes instantly or parks at one of the named suspension
//! points (frame counts, timers, animation-timing signal, idle
//! confirmation, collision flags) and resumes on a later tick.
//!
//! Side effects happen at fixed points: the startup audio fires at run
//! start, the active audio and hitboxes at the active transition, paint
//! deposition and projectile emission at the end of the active frames,
//! and the completion notification after recovery.

use bevy::prelude::*;
use rand::Rng;
use std::collections::HashSet;

use crate::attack::glob::CeilingGlob;
use crate::attack::hitbox::AttackHitbox;
use crate::attack::spec::{
    AttackKind, AttackSpec, PaintOrientation, ProjectileEmission, MAXIMUM_COLLISION_WAIT_TIME,
    MAXIMUM_IDLE_WAIT,
};
use crate::attack::state::{
    AttackPhaseKind, AttackState, ComboRecoveryStage, DashRecoveryStage, StartAttackRun,
    TriggerWait, VariantRun,
};
use crate::boss::Boss;
use crate::components::{Body, Health, PaintColor, PaintSurfaceState};
use crate::interfaces::{
    AnimationCommand, AnimationCommandKind, AttackEnded, AudioCommand, CameraCommand,
    CameraCommandKind, DamageBlocked, DamageInflicted, PaintCommand, ProjectileCommand,
};
use crate::logger;
use crate::DeterministicRng;

/// Boss-side access the driver needs every tick
type BossQuery<'w, 's> =
    Query<'w, 's, (&'static Boss, &'static mut Body, &'static mut Health, &'static PaintSurfaceState)>;

/// System: route immunity-blocked damage into the shield variants
///
/// A hit swallowed by the boss's immunity still counts as "the shield was
/// hit": the basic shield drops on the first blocked hit, the sustained
/// shield accumulates blocked damage toward its break threshold.
pub fn route_blocked_damage(
    mut blocked_events: EventReader<DamageBlocked>,
    mut attacks: Query<(&AttackSpec, &mut AttackState)>,
    mut audio_w: EventWriter<AudioCommand>,
) {
    for event in blocked_events.read() {
        for (spec, mut state) in attacks.iter_mut() {
            if state.boss != event.target || state.phase != AttackPhaseKind::Active {
                continue;
            }
            match (&spec.kind, &mut state.run) {
                (AttackKind::Shield { .. }, VariantRun::Shield(run)) => {
                    run.was_hit = true;
                }
                (AttackKind::SustainedShield { .. }, VariantRun::Sustained(run)) => {
                    run.sustained_damage += event.amount;
                    audio_w.write(AudioCommand {
                        cue: "ShellHit".to_string(),
                    });
                }
                _ => {}
            }
        }
    }
}

/// System: advance every in-flight attack run by one tick
#[allow(clippy::too_many_arguments)]
pub fn drive_attack_phases(
    mut commands: Commands,
    time: Res<Time<Fixed>>,
    mut rng: ResMut<DeterministicRng>,
    mut attacks: ParamSet<(
        Query<(Entity, &AttackSpec, &mut AttackState)>,
        Query<Entity, With<AttackState>>,
    )>,
    mut bosses: BossQuery,
    player_bodies: Query<&Body, Without<Boss>>,
    mut hitboxes: Query<&mut AttackHitbox>,
    mut anim_w: EventWriter<AnimationCommand>,
    mut audio_w: EventWriter<AudioCommand>,
    mut camera_w: EventWriter<CameraCommand>,
    mut paint_w: EventWriter<PaintCommand>,
    mut projectile_w: EventWriter<ProjectileCommand>,
    mut ended_w: EventWriter<AttackEnded>,
    mut start_w: EventWriter<StartAttackRun>,
    mut damage_w: EventWriter<DamageInflicted>,
) {
    let delta = time.delta_secs();
    // snapshot of which attacks are mid-run, for combo child tracking
    let running: HashSet<Entity> = attacks.p1().iter().collect();

    let mut query = attacks.p0();
    for (entity, spec, mut state) in query.iter_mut() {
        let state = state.as_mut();
        let boss = state.boss;
        let (boss_position, surface) = match bosses.get(boss) {
            Ok((_, body, _, surface)) => (body.position, *surface),
            Err(_) => (Vec2::ZERO, PaintSurfaceState::default()),
        };
        let player_position = player_bodies
            .get(state.player)
            .map(|b| b.position)
            .unwrap_or(boss_position);

        match state.phase {
            AttackPhaseKind::Startup => {
                if !state.phase_initialized {
                    state.phase_initialized = true;
                    enter_startup(spec, state, entity, &mut bosses, &mut hitboxes, &mut anim_w);
                }
                let done = tick_startup(
                    spec,
                    state,
                    delta,
                    boss_position,
                    player_position,
                    &mut bosses,
                    &mut anim_w,
                );
                if done {
                    state.active_frames_trigger = false;
                    if let Some(cue) = &spec.active_audio {
                        audio_w.write(AudioCommand { cue: cue.clone() });
                    }
                    state.phase = AttackPhaseKind::Active;
                    state.phase_initialized = false;
                }
            }
            AttackPhaseKind::Active => {
                if !state.phase_initialized {
                    state.phase_initialized = true;
                    enter_active(spec, state, entity, &mut rng, &mut bosses, &mut hitboxes);
                }
                let done = tick_active(
                    spec,
                    state,
                    entity,
                    delta,
                    player_position,
                    &surface,
                    &running,
                    &mut rng,
                    &mut commands,
                    &mut bosses,
                    &mut anim_w,
                    &mut audio_w,
                    &mut damage_w,
                    &mut paint_w,
                    &mut start_w,
                );
                if done {
                    if let Ok(mut hitbox) = hitboxes.get_mut(entity) {
                        hitbox.set_enabled(false);
                    }
                    state.active_frames_trigger = false;
                    if let Some(trigger) = &spec.end_anim_trigger {
                        anim_w.write(AnimationCommand {
                            boss,
                            kind: AnimationCommandKind::Trigger(trigger.clone()),
                        });
                    }
                    // paint deposition happens once per run, at the end of
                    // the active frames unless a variant already placed it
                    if !state.paint_done {
                        lay_down_paint(
                            spec,
                            state.color,
                            state.to_player,
                            boss_position,
                            &mut rng,
                            &mut paint_w,
                            &mut audio_w,
                        );
                        state.paint_done = true;
                    }
                    emit_projectiles(spec, state, boss_position, &surface, &mut projectile_w);
                    state.phase = AttackPhaseKind::Recovery;
                    state.phase_initialized = false;
                }
            }
            AttackPhaseKind::Recovery => {
                if !state.phase_initialized {
                    state.phase_initialized = true;
                    enter_recovery(
                        spec,
                        state,
                        &mut bosses,
                        &mut anim_w,
                        &mut audio_w,
                        &mut camera_w,
                        &mut damage_w,
                    );
                }
                let done = tick_recovery(spec, state, delta, &mut bosses, &mut anim_w, &mut camera_w);
                if done {
                    commands.entity(entity).remove::<AttackState>();
                    ended_w.write(AttackEnded {
                        attack: entity,
                        boss,
                    });
                    logger::log_debug(&format!("attack '{}' completed", spec.name));
                }
            }
        }
    }
}

// ============================================================================
// Startup
// ============================================================================

fn enter_startup(
    spec: &AttackSpec,
    state: &mut AttackState,
    entity: Entity,
    bosses: &mut BossQuery,
    hitboxes: &mut Query<&mut AttackHitbox>,
    anim_w: &mut EventWriter<AnimationCommand>,
) {
    match &spec.kind {
        AttackKind::ColliderSweep { faces_player } => {
            if let Ok(mut hitbox) = hitboxes.get_mut(entity) {
                hitbox.set_enabled(false);
            }
            if *faces_player {
                anim_w.write(AnimationCommand {
                    boss: state.boss,
                    kind: AnimationCommandKind::Direction(state.to_player.normalize_or_zero()),
                });
            }
            // initial lunge toward the player
            if let Ok((boss, mut body, _, surface)) = bosses.get_mut(state.boss) {
                let speed = boss.speed(surface) * spec.initial_speed_mult;
                body.velocity = state.to_player.normalize_or_zero() * speed;
            }
        }
        AttackKind::Combo { .. } => {
            if let VariantRun::Combo(run) = &mut state.run {
                run.frames_left = spec.startup_frames;
            }
        }
        _ => {}
    }
}

fn tick_startup(
    spec: &AttackSpec,
    state: &mut AttackState,
    delta: f32,
    boss_position: Vec2,
    player_position: Vec2,
    bosses: &mut BossQuery,
    anim_w: &mut EventWriter<AnimationCommand>,
) -> bool {
    let signal = state.active_frames_trigger;
    let boss = state.boss;
    let trigger = spec.start_anim_trigger.as_deref();
    match (&spec.kind, &mut state.run) {
        (AttackKind::ColliderSweep { .. }, VariantRun::Sweep(run)) => {
            run.wait.tick(signal, delta, trigger, boss, anim_w)
        }
        (AttackKind::Dash(_), VariantRun::Dash(run))
        | (AttackKind::RampageDash(_), VariantRun::Rampage(run)) => {
            let done = run.wait.tick(signal, delta, trigger, boss, anim_w);
            if done {
                // the player moved during the wait; update the aim
                state.to_player = player_position - boss_position;
                state.override_direction = state.to_player.normalize_or_zero();
            }
            done
        }
        (AttackKind::Combo { .. }, VariantRun::Combo(run)) => {
            if run.frames_left > 0 {
                run.frames_left -= 1;
                false
            } else {
                true
            }
        }
        (AttackKind::Shield { .. }, VariantRun::Shield(run)) => {
            run.wait.tick(signal, delta, trigger, boss, anim_w)
        }
        (AttackKind::SustainedShield { .. }, VariantRun::Sustained(run)) => {
            run.wait.tick(signal, delta, trigger, boss, anim_w)
        }
        (AttackKind::PaintFall { invincible, .. }, VariantRun::PaintFall(run)) => {
            let done = run.wait.tick(signal, delta, trigger, boss, anim_w);
            if done && *invincible {
                set_immune(bosses, boss, true);
            }
            done
        }
        _ => true,
    }
}

// ============================================================================
// Active
// ============================================================================

fn enter_active(
    spec: &AttackSpec,
    state: &mut AttackState,
    entity: Entity,
    rng: &mut DeterministicRng,
    bosses: &mut BossQuery,
    hitboxes: &mut Query<&mut AttackHitbox>,
) {
    let boss = state.boss;
    let to_player = state.to_player;
    match (&spec.kind, &mut state.run) {
        (AttackKind::ColliderSweep { .. }, VariantRun::Sweep(run)) => {
            run.frames_left = spec.active_frames;
        }
        (AttackKind::Dash(_), VariantRun::Dash(run)) => {
            run.collided = false;
            run.hit_ice = false;
            run.slip_triggered = false;
            run.time_waited = 0.0;
        }
        (AttackKind::RampageDash(_), VariantRun::Rampage(run)) => {
            // randomize the dash direction, biased toward the player
            let tpn = to_player.normalize_or_zero();
            let x = random_component(rng, tpn.x);
            let y = random_component(rng, tpn.y);
            state.override_direction = Vec2::new(x, y).normalize_or_zero();
            run.collided = false;
            run.time_waited = 0.0;
        }
        (
            AttackKind::Combo {
                order, stop_range, ..
            },
            VariantRun::Combo(run),
        ) => {
            let stop = if stop_range.0 <= stop_range.1 {
                rng.rng.gen_range(stop_range.0..=stop_range.1)
            } else {
                u32::MAX
            };
            // a stop index outside the series means the whole combo runs
            run.stop_index = if (stop as usize) < order.len() {
                stop
            } else {
                u32::MAX
            };
            run.index = 0;
            run.child = None;
        }
        (AttackKind::Shield { .. }, VariantRun::Shield(run)) => {
            run.was_hit = false;
            run.frame = 0;
            set_immune(bosses, boss, true);
        }
        (AttackKind::SustainedShield { .. }, VariantRun::Sustained(run)) => {
            run.sustained_damage = 0.0;
            run.time_waiting = 0.0;
            set_immune(bosses, boss, true);
        }
        (AttackKind::PaintFall { glob_count, .. }, VariantRun::PaintFall(run)) => {
            run.remaining_globs = if glob_count.0 <= glob_count.1 {
                rng.rng.gen_range(glob_count.0..=glob_count.1)
            } else {
                glob_count.0
            };
            run.next_spawn = 0.0;
        }
        _ => {}
    }
    // damage-dealing variants light their hitbox up for the active window
    if matches!(
        spec.kind,
        AttackKind::ColliderSweep { .. } | AttackKind::Dash(_) | AttackKind::RampageDash(_)
    ) {
        if let Ok(mut hitbox) = hitboxes.get_mut(entity) {
            hitbox.set_enabled(true);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn tick_active(
    spec: &AttackSpec,
    state: &mut AttackState,
    entity: Entity,
    delta: f32,
    player_position: Vec2,
    surface: &PaintSurfaceState,
    running: &HashSet<Entity>,
    rng: &mut DeterministicRng,
    commands: &mut Commands,
    bosses: &mut BossQuery,
    anim_w: &mut EventWriter<AnimationCommand>,
    audio_w: &mut EventWriter<AudioCommand>,
    damage_w: &mut EventWriter<DamageInflicted>,
    paint_w: &mut EventWriter<PaintCommand>,
    start_w: &mut EventWriter<StartAttackRun>,
) -> bool {
    let boss = state.boss;
    let override_direction = state.override_direction;
    let color = state.color;
    let player = state.player;
    let to_player = state.to_player;
    let paint_already_done = state.paint_done;
    match (&spec.kind, &mut state.run) {
        (AttackKind::ColliderSweep { .. }, VariantRun::Sweep(run)) => {
            if run.frames_left > 0 {
                run.frames_left -= 1;
                false
            } else {
                true
            }
        }
        (AttackKind::Dash(_), VariantRun::Dash(run)) => {
            if let Ok((boss_data, mut body, _, boss_surface)) = bosses.get_mut(boss) {
                body.velocity =
                    override_direction * boss_data.speed(boss_surface) * spec.initial_speed_mult;
            }
            if surface.in_ice && !run.slip_triggered {
                run.hit_ice = true;
                run.slip_triggered = true;
                anim_w.write(AnimationCommand {
                    boss,
                    kind: AnimationCommandKind::Trigger("slipping".to_string()),
                });
            }
            run.time_waited += delta;
            run.collided || run.time_waited >= MAXIMUM_COLLISION_WAIT_TIME
        }
        (AttackKind::RampageDash(_), VariantRun::Rampage(run)) => {
            if let Ok((boss_data, mut body, _, boss_surface)) = bosses.get_mut(boss) {
                body.velocity =
                    override_direction * boss_data.speed(boss_surface) * spec.initial_speed_mult;
            }
            run.time_waited += delta;
            run.collided || run.time_waited >= MAXIMUM_COLLISION_WAIT_TIME
        }
        (AttackKind::Combo { order, .. }, VariantRun::Combo(run)) => {
            if let Some(child) = run.child {
                if !running.contains(&child) {
                    // the sub-attack finished; move on
                    run.child = None;
                    run.index += 1;
                }
                return false;
            }
            if run.index as usize >= order.len() || run.index == run.stop_index {
                return true;
            }
            let child = order[run.index as usize];
            let boss_position = bosses.get(boss).map(|(_, b, _, _)| b.position).unwrap_or(Vec2::ZERO);
            start_w.write(StartAttackRun {
                attack: child,
                boss,
                player,
                to_player: player_position - boss_position,
                exclusive: false,
                retried: false,
            });
            run.child = Some(child);
            false
        }
        (AttackKind::Shield { paint_frame }, VariantRun::Shield(run)) => {
            if run.frame == *paint_frame && color.is_some() && !paint_already_done {
                let boss_position = bosses.get(boss).map(|(_, b, _, _)| b.position).unwrap_or(Vec2::ZERO);
                lay_down_paint(spec, color, to_player, boss_position, rng, paint_w, audio_w);
                state.paint_done = true;
            }
            run.frame += 1;
            let done = run.frame >= spec.active_frames || run.was_hit;
            if done {
                set_immune(bosses, boss, false);
            }
            done
        }
        (
            AttackKind::SustainedShield {
                damage_threshold,
                break_self_damage,
                maximum_hit_wait,
            },
            VariantRun::Sustained(run),
        ) => {
            run.time_waiting += delta;
            let done =
                run.sustained_damage >= *damage_threshold || run.time_waiting >= *maximum_hit_wait;
            if done {
                set_immune(bosses, boss, false);
                damage_w.write(DamageInflicted {
                    target: boss,
                    amount: *break_self_damage,
                });
                audio_w.write(AudioCommand {
                    cue: "ShellCrack".to_string(),
                });
            }
            done
        }
        (
            AttackKind::PaintFall {
                spawn_rate,
                attack_radius,
                glob,
                ..
            },
            VariantRun::PaintFall(run),
        ) => {
            if run.remaining_globs == 0 {
                set_immune(bosses, boss, false);
                return true;
            }
            run.next_spawn -= delta;
            if run.next_spawn <= 0.0 {
                let offset =
                    Vec2::new(rng.rng.gen_range(-1.0..=1.0), rng.rng.gen_range(-1.0..=1.0))
                        .normalize_or_zero()
                        * rng.rng.gen_range(0.0..=*attack_radius);
                commands.spawn(CeilingGlob {
                    attack: entity,
                    player,
                    target_position: player_position + offset,
                    color,
                    remaining: glob.drop_time,
                    params: glob.clone(),
                });
                audio_w.write(AudioCommand {
                    cue: "CeilingFall".to_string(),
                });
                run.remaining_globs -= 1;
                run.next_spawn = *spawn_rate;
            }
            false
        }
        _ => true,
    }
}

// ============================================================================
// Recovery
// ============================================================================

fn enter_recovery(
    spec: &AttackSpec,
    state: &mut AttackState,
    bosses: &mut BossQuery,
    anim_w: &mut EventWriter<AnimationCommand>,
    audio_w: &mut EventWriter<AudioCommand>,
    camera_w: &mut EventWriter<CameraCommand>,
    damage_w: &mut EventWriter<DamageInflicted>,
) {
    let boss = state.boss;
    let velocity = bosses.get(boss).map(|(_, b, _, _)| b.velocity).unwrap_or(Vec2::ZERO);
    let hit_player = state.last_hit_was_player;
    let mut install_multiplier = None;
    match (&spec.kind, &mut state.run) {
        (AttackKind::ColliderSweep { .. }, VariantRun::Sweep(run)) => {
            run.frames_left = spec.recovery_frames;
            run.initial_velocity = velocity;
        }
        (AttackKind::Dash(params), VariantRun::Dash(run)) => {
            if run.hit_ice && !hit_player {
                damage_w.write(DamageInflicted {
                    target: boss,
                    amount: params.ice_crash_damage,
                });
                audio_w.write(AudioCommand {
                    cue: "WallCrash".to_string(),
                });
            } else if !run.hit_ice {
                audio_w.write(AudioCommand {
                    cue: "WallCrashLight".to_string(),
                });
            }
            run.recovery = DashRecoveryStage::Slowing;
            run.frames_left = spec.recovery_frames;
            run.initial_velocity = velocity;
        }
        (AttackKind::RampageDash(params), VariantRun::Rampage(run)) => {
            if run.hit_ice && !hit_player {
                damage_w.write(DamageInflicted {
                    target: boss,
                    amount: params.ice_crash_damage,
                });
            }
            camera_w.write(CameraCommand {
                kind: CameraCommandKind::Shake(params.wall_hit_cam_shake),
            });
            anim_w.write(AnimationCommand {
                boss,
                kind: AnimationCommandKind::SetBool(params.stun_animation.clone(), true),
            });
            run.frames_left = spec.recovery_frames;
        }
        (
            AttackKind::Combo {
                cooldown_time,
                cooldown_animation,
                stun_damage_mult,
                ..
            },
            VariantRun::Combo(run),
        ) => {
            // vulnerable while winding down from the series
            install_multiplier = Some(*stun_damage_mult);
            if let Some(animation) = cooldown_animation {
                anim_w.write(AnimationCommand {
                    boss,
                    kind: AnimationCommandKind::SetBool(animation.clone(), true),
                });
            }
            run.recovery = ComboRecoveryStage::Cooldown {
                remaining: *cooldown_time,
            };
        }
        (AttackKind::Shield { .. }, VariantRun::Shield(run)) => {
            run.wait = TriggerWait::default();
        }
        (AttackKind::SustainedShield { .. }, VariantRun::Sustained(run)) => {
            run.wait = TriggerWait::default();
            run.roaring = false;
        }
        (AttackKind::PaintFall { .. }, VariantRun::PaintFall(run)) => {
            run.wait = TriggerWait::default();
        }
        _ => {}
    }
    if let Some(mult) = install_multiplier {
        if let Ok((_, _, mut health, _)) = bosses.get_mut(boss) {
            state.multiplier_handle = Some(health.add_damage_multiplier(mult));
        }
    }
}

fn tick_recovery(
    spec: &AttackSpec,
    state: &mut AttackState,
    delta: f32,
    bosses: &mut BossQuery,
    anim_w: &mut EventWriter<AnimationCommand>,
    camera_w: &mut EventWriter<CameraCommand>,
) -> bool {
    let boss = state.boss;
    let signal = state.active_frames_trigger;
    let hit_player = state.last_hit_was_player;
    let waiting_for_idle = state.waiting_for_idle;
    let mut request_idle_wait = false;
    let mut release_multiplier = false;
    let done = match (&spec.kind, &mut state.run) {
        (AttackKind::ColliderSweep { .. }, VariantRun::Sweep(run)) => {
            slow_boss(
                bosses,
                boss,
                run.initial_velocity,
                run.frames_left,
                spec.recovery_frames,
            );
            if run.frames_left > 0 {
                run.frames_left -= 1;
                false
            } else {
                true
            }
        }
        (AttackKind::Dash(params), VariantRun::Dash(run)) => match &mut run.recovery {
            DashRecoveryStage::Slowing => {
                slow_boss(
                    bosses,
                    boss,
                    run.initial_velocity,
                    run.frames_left,
                    spec.recovery_frames,
                );
                if run.frames_left > 0 {
                    run.frames_left -= 1;
                    false
                } else if hit_player {
                    // clean hit; no wall, no stun
                    true
                } else {
                    camera_w.write(CameraCommand {
                        kind: CameraCommandKind::Shake(params.wall_hit_cam_shake),
                    });
                    anim_w.write(AnimationCommand {
                        boss,
                        kind: AnimationCommandKind::SetBool(params.stun_animation.clone(), true),
                    });
                    if run.hit_ice {
                        // more vulnerable while sprawled on the ice
                        release_multiplier = false;
                        if let Ok((_, _, mut health, _)) = bosses.get_mut(boss) {
                            state.multiplier_handle =
                                Some(health.add_damage_multiplier(params.ice_crash_damage_mult));
                        }
                    }
                    run.recovery = DashRecoveryStage::Stunned {
                        remaining: params.wall_hit_wait,
                    };
                    false
                }
            }
            DashRecoveryStage::Stunned { remaining } => {
                *remaining -= delta;
                if *remaining > 0.0 {
                    false
                } else if run.hit_ice {
                    run.recovery = DashRecoveryStage::IceExtra {
                        remaining: params.crash_stun_mod,
                    };
                    false
                } else {
                    anim_w.write(AnimationCommand {
                        boss,
                        kind: AnimationCommandKind::SetBool(params.stun_animation.clone(), false),
                    });
                    request_idle_wait = true;
                    run.recovery = DashRecoveryStage::AwaitIdle {
                        remaining: MAXIMUM_IDLE_WAIT,
                    };
                    false
                }
            }
            DashRecoveryStage::IceExtra { remaining } => {
                *remaining -= delta;
                if *remaining > 0.0 {
                    false
                } else {
                    release_multiplier = true;
                    anim_w.write(AnimationCommand {
                        boss,
                        kind: AnimationCommandKind::SetBool(params.stun_animation.clone(), false),
                    });
                    request_idle_wait = true;
                    run.recovery = DashRecoveryStage::AwaitIdle {
                        remaining: MAXIMUM_IDLE_WAIT,
                    };
                    false
                }
            }
            DashRecoveryStage::AwaitIdle { remaining } => {
                *remaining -= delta;
                !waiting_for_idle || *remaining <= 0.0
            }
        },
        (AttackKind::RampageDash(params), VariantRun::Rampage(run)) => {
            if run.frames_left > 0 {
                run.frames_left -= 1;
                false
            } else {
                anim_w.write(AnimationCommand {
                    boss,
                    kind: AnimationCommandKind::SetBool(params.stun_animation.clone(), false),
                });
                true
            }
        }
        (
            AttackKind::Combo {
                cooldown_animation, ..
            },
            VariantRun::Combo(run),
        ) => match &mut run.recovery {
            ComboRecoveryStage::Cooldown { remaining } => {
                *remaining -= delta;
                if *remaining > 0.0 {
                    false
                } else {
                    if let Some(animation) = cooldown_animation {
                        anim_w.write(AnimationCommand {
                            boss,
                            kind: AnimationCommandKind::SetBool(animation.clone(), false),
                        });
                    }
                    release_multiplier = true;
                    request_idle_wait = true;
                    run.recovery = ComboRecoveryStage::AwaitIdle {
                        remaining: MAXIMUM_IDLE_WAIT,
                    };
                    false
                }
            }
            ComboRecoveryStage::AwaitIdle { remaining } => {
                *remaining -= delta;
                !waiting_for_idle || *remaining <= 0.0
            }
        },
        (AttackKind::Shield { .. }, VariantRun::Shield(run)) => {
            run.wait
                .tick(signal, delta, spec.end_anim_trigger.as_deref(), boss, anim_w)
        }
        (AttackKind::SustainedShield { .. }, VariantRun::Sustained(run)) => {
            if !run.roaring {
                let done =
                    run.wait
                        .tick(signal, delta, spec.end_anim_trigger.as_deref(), boss, anim_w);
                if done {
                    run.roaring = true;
                    run.wait = TriggerWait::default();
                    state.active_frames_trigger = false;
                    anim_w.write(AnimationCommand {
                        boss,
                        kind: AnimationCommandKind::Trigger("roar".to_string()),
                    });
                }
                false
            } else {
                run.wait.tick(signal, delta, Some("roar"), boss, anim_w)
            }
        }
        (AttackKind::PaintFall { .. }, VariantRun::PaintFall(run)) => {
            run.wait
                .tick(signal, delta, spec.end_anim_trigger.as_deref(), boss, anim_w)
        }
        _ => true,
    };

    if request_idle_wait {
        state.waiting_for_idle = true;
    }
    if release_multiplier {
        if let Some(handle) = state.multiplier_handle.take() {
            if let Ok((_, _, mut health, _)) = bosses.get_mut(boss) {
                health.remove_damage_multiplier(handle);
            }
        }
    }
    done
}

// ============================================================================
// Shared helpers
// ============================================================================

fn set_immune(bosses: &mut BossQuery, boss: Entity, immune: bool) {
    if let Ok((_, _, mut health, _)) = bosses.get_mut(boss) {
        health.damage_immune = immune;
    }
}

/// Pseudo-physics slow down over the recovery frames
fn slow_boss(
    bosses: &mut BossQuery,
    boss: Entity,
    initial_velocity: Vec2,
    frames_left: u32,
    total_frames: u32,
) {
    if total_frames == 0 {
        return;
    }
    let progress = 1.0 - frames_left as f32 / total_frames as f32;
    let smooth = progress * progress * (3.0 - 2.0 * progress);
    if let Ok((_, mut body, _, _)) = bosses.get_mut(boss) {
        body.velocity = initial_velocity.lerp(Vec2::ZERO, smooth);
    }
}

/// One leg of the randomized rampage direction, keeping the player's sign
fn random_component(rng: &mut DeterministicRng, toward: f32) -> f32 {
    if toward > 0.0 {
        rng.rng.gen_range(0.01..toward.max(0.02))
    } else {
        rng.rng.gen_range(toward.min(-0.02)..-0.01)
    }
}

fn lay_down_paint(
    spec: &AttackSpec,
    color: Option<PaintColor>,
    to_player: Vec2,
    boss_position: Vec2,
    rng: &mut DeterministicRng,
    paint_w: &mut EventWriter<PaintCommand>,
    audio_w: &mut EventWriter<AudioCommand>,
) {
    let Some(color) = color else {
        return;
    };
    if spec.paint.texture.is_empty() {
        return;
    }
    if rng.rng.gen_range(0.0..1.0) >= spec.paint.probability {
        return;
    }
    let angle = match spec.paint.orientation {
        PaintOrientation::Fixed => 0.0,
        PaintOrientation::Random => rng.rng.gen_range(0.0..360.0),
        // rotation matches the direction of the attack
        PaintOrientation::PainterAligned => to_player.x.atan2(-to_player.y).to_degrees(),
    };
    let (scale_min, scale_max) = spec.paint.scale_range;
    let scale = if scale_max > scale_min {
        rng.rng.gen_range(scale_min..=scale_max)
    } else {
        scale_min
    };
    paint_w.write(PaintCommand {
        position: boss_position,
        angle,
        scale,
        texture: spec.paint.texture.clone(),
        color,
    });
    audio_w.write(AudioCommand {
        cue: "BrushSwingHeavy".to_string(),
    });
}

fn emit_projectiles(
    spec: &AttackSpec,
    state: &AttackState,
    boss_position: Vec2,
    surface: &PaintSurfaceState,
    projectile_w: &mut EventWriter<ProjectileCommand>,
) {
    if !surface.in_lightning {
        return;
    }
    match spec.projectile_emission {
        ProjectileEmission::None => {}
        ProjectileEmission::PlayerDir => {
            projectile_w.write(ProjectileCommand {
                origin: boss_position,
                direction: state.to_player.normalize_or_zero(),
            });
        }
        ProjectileEmission::AllCardinals => {
            let mut angle = 0.0f32;
            while angle < 360.0 {
                let radians = angle.to_radians();
                projectile_w.write(ProjectileCommand {
                    origin: boss_position,
                    direction: Vec2::new(radians.cos(), radians.sin()),
                });
                angle += 45.0;
            }
        }
    }
}
