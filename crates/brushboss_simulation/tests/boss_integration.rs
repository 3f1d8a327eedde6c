//! Boss fight integration tests
//!
//! Headless app, one boss and one scripted player, fixed ticks driven by
//! hand so the fixed-timestep schedule runs exactly once per tick.
//!
//! Covered:
//! - full arbitration cycle: attack commit, history lockout, fallback action
//! - phase transition protocol on a health threshold
//! - restart/stop protocol of the attack state machine

use bevy::prelude::*;
use brushboss_simulation::*;
use std::time::Duration;

const TICK: f64 = 1.0 / 60.0;

/// Advance the simulation by exactly one fixed tick
fn tick(app: &mut App) {
    app.world_mut()
        .resource_mut::<Time<Fixed>>()
        .advance_by(Duration::from_secs_f64(TICK));
    app.world_mut().run_schedule(FixedUpdate);
}

/// The animator of the tests is always idle
fn confirm_idle(app: &mut App, boss: Entity) {
    app.world_mut().send_event(AnimationEvent {
        boss,
        kind: AnimationEventKind::IdleReached,
    });
}

fn create_app(seed: u64) -> App {
    let mut app = create_headless_app(seed);
    app.add_plugins(BossSimulationPlugin);
    app
}

fn spawn_player(app: &mut App, position: Vec2) -> Entity {
    app.world_mut()
        .spawn((Player, Health::new(10.0), Body::at(position)))
        .id()
}

/// Two phases, an idle fallback capped at 0.3 and one attack worth ~0.5
/// that locks out after a single use
fn lockout_config() -> BossConfig {
    BossConfig::from_json(
        r#"{
            "core": { "min_action_switch_time": 0.1 },
            "actions": [
                {
                    "name": "idle",
                    "behavior": "Idle",
                    "maximum_utility": 0.3,
                    "factors": { "variable_factors": [ { "kind": "MyHealth" } ] }
                },
                { "name": "attack", "behavior": "Attack" }
            ],
            "attacks": [
                {
                    "name": "swipe",
                    "kind": { "type": "collider_sweep" },
                    "maximum_consecutive_uses": 1,
                    "active_frames": 2,
                    "recovery_frames": 2,
                    "phase_factors": [
                        { "phase": 1, "factors": { "variable_factors": [ { "kind": "MyHealth" } ] } }
                    ]
                }
            ],
            "phases": [
                { "health_lower_bound": 0.5, "actions": ["idle", "attack"] },
                { "health_lower_bound": 0.0, "actions": ["idle", "attack"] }
            ]
        }"#,
    )
    .unwrap()
}

#[test]
fn test_attack_commit_then_lockout() {
    let mut app = create_app(42);
    let player = spawn_player(&mut app, Vec2::new(10.0, 0.0));
    let config = lockout_config();
    let boss = spawn_boss(app.world_mut(), &config, player, Vec2::ZERO).unwrap();

    for _ in 0..120 {
        tick(&mut app);
        confirm_idle(&mut app, boss);
    }

    let world = app.world_mut();
    let swipe = world.get::<Boss>(boss).unwrap().attacks[0];

    // the swipe was performed exactly once and now sits in the history ring
    let events = world.resource::<Events<AttackEnded>>();
    let mut cursor = events.get_cursor();
    let completions = cursor.read(events).count();
    assert_eq!(completions, 1, "expected exactly one completed attack run");

    let boss_data = world.get::<Boss>(boss).unwrap();
    assert_eq!(boss_data.history.count_of(swipe), 1);
    // with the attack locked out, the capped idle fallback wins arbitration
    assert_eq!(boss_data.current_action, Some(0));
    // no run left in flight
    assert!(world.get::<AttackState>(swipe).is_none());
}

#[test]
fn test_phase_transition_protocol() {
    let mut app = create_app(7);
    let player = spawn_player(&mut app, Vec2::new(10.0, 0.0));
    let mut config = lockout_config();
    config.phases[1].entrance_animation = Some("roar".to_string());
    let boss = spawn_boss(app.world_mut(), &config, player, Vec2::ZERO).unwrap();

    for _ in 0..10 {
        tick(&mut app);
        confirm_idle(&mut app, boss);
    }
    assert_eq!(app.world().get::<Boss>(boss).unwrap().last_phase_index, 0);

    // drop below the 0.5 bound
    app.world_mut().send_event(DamageInflicted {
        target: boss,
        amount: 60.0,
    });
    tick(&mut app);

    {
        let world = app.world();
        let boss_data = world.get::<Boss>(boss).unwrap();
        assert_eq!(boss_data.last_phase_index, 1);
        assert!(boss_data.in_phase_entry(), "phase entry should be running");
        let health = world.get::<Health>(boss).unwrap();
        assert!(health.fraction() < 0.5);

        let events = world.resource::<Events<PhaseChanged>>();
        let mut cursor = events.get_cursor();
        let phases: Vec<u32> = cursor.read(events).map(|event| event.phase).collect();
        assert_eq!(phases, vec![2]);
    }

    // let the entrance animation fire, then signal its payoff frame
    for _ in 0..10 {
        confirm_idle(&mut app, boss);
        tick(&mut app);
    }
    app.world_mut().send_event(AnimationEvent {
        boss,
        kind: AnimationEventKind::TimedEvent,
    });
    tick(&mut app);
    assert!(
        !app.world().get::<Boss>(boss).unwrap().in_phase_entry(),
        "timed animation event should end the entrance hold"
    );
}

#[test]
fn test_restart_cancels_stale_run_without_double_completion() {
    let mut app = create_app(3);
    let player = spawn_player(&mut app, Vec2::new(50.0, 0.0));
    let mut config = lockout_config();
    // keep the scheduler out of the way; drive the run protocol directly
    config.core.begin_active = false;
    config.attacks[0].active_frames = 30;
    let boss = spawn_boss(app.world_mut(), &config, player, Vec2::ZERO).unwrap();
    let swipe = app.world().get::<Boss>(boss).unwrap().attacks[0];

    let request = StartAttackRun {
        attack: swipe,
        boss,
        player,
        to_player: Vec2::X,
        exclusive: true,
        retried: false,
    };
    app.world_mut().send_event(request.clone());
    tick(&mut app);
    assert!(app.world().get::<AttackState>(swipe).is_some());

    // restart mid-run: the stale run is cancelled, not completed
    app.world_mut().send_event(request);
    for _ in 0..90 {
        tick(&mut app);
    }

    let world = app.world_mut();
    assert!(world.get::<AttackState>(swipe).is_none());
    let events = world.resource::<Events<AttackEnded>>();
    let mut cursor = events.get_cursor();
    let completions = cursor.read(events).count();
    assert_eq!(completions, 1, "stale run must not fire its own completion");
}

#[test]
fn test_forced_stop_is_idempotent() {
    let mut app = create_app(5);
    let player = spawn_player(&mut app, Vec2::new(10.0, 0.0));
    let mut config = lockout_config();
    config.core.begin_active = false;
    let boss = spawn_boss(app.world_mut(), &config, player, Vec2::ZERO).unwrap();
    let swipe = app.world().get::<Boss>(boss).unwrap().attacks[0];

    // stopping an idle attack is a no-op
    app.world_mut().send_event(StopAttack { attack: swipe });
    app.world_mut().send_event(StopAttack { attack: swipe });
    for _ in 0..5 {
        tick(&mut app);
    }

    let world = app.world();
    assert!(world.get::<AttackState>(swipe).is_none());
    let health = world.get::<Health>(boss).unwrap();
    assert!(!health.damage_immune);
    assert_eq!(health.damage_multiplier(), 1.0);
}
