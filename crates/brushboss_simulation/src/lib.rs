//! BRUSHBOSS Simulation Core
//!
//! ECS simulation of a paint-world boss fight (strategic layer):
//! utility-scored action arbitration, frame-phased attack state machines,
//! phase transitions, and the event boundary to the engine side.
//!
//! Architecture:
//! - ECS = decision core (scoring, attack lifecycle, windows, timers)
//! - Engine side = rendering, audio playback, physics resolution, the
//!   paint raster and pathfinding internals, reached only through the
//!   events and traits in `interfaces`

use bevy::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

pub mod attack;
pub mod boss;
pub mod components;
pub mod config;
pub mod interfaces;
pub mod logger;
pub mod utility;

// Re-export the working set for convenience
pub use attack::{AttackKind, AttackSpec, AttackState, StartAttackRun, StopAttack};
pub use boss::{Boss, BossAssets, BossPhase};
pub use components::*;
pub use config::{spawn_boss, BossConfig, ConfigError};
pub use interfaces::*;
pub use utility::{ActionSpec, BossBehavior, FactorKind, FactorSet, ResponseCurve};

/// Main simulation plugin (registers every boss subsystem)
///
/// Systems run chained in FixedUpdate (60 Hz) for determinism; within one
/// tick the phase index is recomputed before any transition is evaluated,
/// run requests are processed before the driver advances phases, and hit
/// reports are routed after the driver.
pub struct BossSimulationPlugin;

impl Plugin for BossSimulationPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(Time::<Fixed>::from_hz(60.0));
        // seeded RNG (keep a pre-installed seed if the host set one)
        if app.world().get_resource::<DeterministicRng>().is_none() {
            app.insert_resource(DeterministicRng::new(42));
        }
        app.init_resource::<interfaces::Pathfinder>();

        interfaces::register_interface_events(app);
        app.add_event::<attack::StartAttackRun>()
            .add_event::<attack::StopAttack>();

        app.add_systems(
            FixedUpdate,
            (
                boss::scheduler::handle_boss_activation,
                components::actor::apply_damage,
                boss::scheduler::boss_on_damage,
                boss::scheduler::route_animation_events,
                boss::scheduler::update_boss_context,
                boss::scheduler::advance_phase_entry,
                boss::scheduler::boss_utility_arbitration,
                attack::process_attack_run_requests,
                attack::route_blocked_damage,
                attack::drive_attack_phases,
                boss::scheduler::handle_attack_ended,
                attack::detect_hitbox_overlaps,
                attack::update_ceiling_globs,
                attack::route_hit_reports,
                boss::scheduler::move_boss_from_action,
                components::movement::integrate_bodies,
            )
                .chain(), // sequential execution for determinism
        );
    }
}

/// Seeded RNG resource; every random draw of the simulation goes through it
#[derive(Resource)]
pub struct DeterministicRng {
    pub rng: ChaCha8Rng,
    pub seed: u64,
}

impl DeterministicRng {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }
}

/// Create a minimal Bevy app for headless simulation
///
/// Tests add [`BossSimulationPlugin`] themselves so they can insert their
/// own resources first.
pub fn create_headless_app(seed: u64) -> App {
    let mut app = App::new();
    logger::init_console_logger();
    app.add_plugins(MinimalPlugins)
        .insert_resource(DeterministicRng::new(seed))
        .insert_resource(Time::<Fixed>::from_hz(60.0));
    app
}

/// Debug-format snapshot of one component type, ordered by entity id
///
/// Used by the determinism tests to compare whole runs byte for byte.
pub fn world_snapshot<T: Component + std::fmt::Debug>(world: &mut World) -> Vec<u8> {
    let mut snapshot = Vec::new();
    let mut query = world.query::<(Entity, &T)>();
    let mut entities: Vec<_> = query.iter(world).collect();
    entities.sort_by_key(|(entity, _)| entity.index());
    for (entity, component) in entities {
        snapshot.extend_from_slice(&entity.index().to_le_bytes());
        snapshot.extend_from_slice(format!("{:?}", component).as_bytes());
    }
    snapshot
}
