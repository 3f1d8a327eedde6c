//! Boss orchestration: the entity that owns phases, actions and attacks
//!
//! The `Boss` component carries every runtime variable the utility engine
//! observes; `BossAssets` carries the authored, read-only data loaded from
//! config. The scheduler systems live in `scheduler`.

use bevy::prelude::*;

use crate::components::PaintSurfaceState;
use crate::utility::action::ActionSpec;

pub mod phases;
pub mod scheduler;
pub mod windows;

pub use phases::{current_phase_index, BossPhase, PhaseEntrance};
pub use windows::{AttackHistory, SlidingWindow, ABSOLUTE_MAX_CONSECUTIVE_ATTACKS};

/// Interval that time-close-to-player factors account for (seconds)
pub const PLAYER_CLOSE_TIME: f32 = 20.0;
/// Window over which the damage-received rate is measured (seconds)
pub const DAMAGE_RATE_INTERVAL: f32 = 4.0;
/// Window over which the boss's own attack rate is measured (seconds)
pub const ATTACK_RATE_INTERVAL: f32 = 6.0;
/// Duration of the quickest attack the boss can perform (seconds)
pub const ABSOLUTE_MINIMUM_ATTACK_TIME: f32 = 0.5;
/// Strongest expected player hit, used to normalize the damage rate
pub const MAX_EXPECTED_PLAYER_DAMAGE: f32 = 5.0;
/// How frequently the boss refreshes its movement path (seconds)
pub const PATH_UPDATE_RATE: f32 = 1.0;
/// How close the boss gets to a waypoint before advancing to the next
pub const PATH_NODE_CLOSE_RADIUS: f32 = 0.5;
/// Interval between arbitration checks (seconds)
pub const UTILITY_UPDATE_RATE: f32 = 0.05;
/// How long a phase entry waits for the idle confirmation (seconds)
pub const PHASE_ENTRY_IDLE_WAIT: f32 = 1.0;
/// How long an entrance animation holds arbitration at most (seconds)
pub const PHASE_ENTRY_ANIMATION_HOLD: f32 = 4.0;

/// One-shot sequence run when the boss enters a new phase
///
/// While this is present normal arbitration and movement are suppressed.
#[derive(Debug, Clone)]
pub enum PhaseEntrySequence {
    /// Waiting (bounded) for the animator to confirm idle
    AwaitIdle {
        remaining: f32,
        entrance: PhaseEntrance,
    },
    /// Holding arbitration until the entrance behavior has had its window
    Hold { remaining: f32 },
}

/// Authored, read-only data of one boss: its action table and phase list
///
/// Actions are shared by reference (index); the same action may appear in
/// several phases without being copied.
#[derive(Component, Debug, Clone)]
pub struct BossAssets {
    pub actions: Vec<ActionSpec>,
    /// Sorted by descending health lower bound at load time
    pub phases: Vec<BossPhase>,
}

/// The boss brain: current commitment, timers, windows and flags
#[derive(Component, Debug)]
pub struct Boss {
    /// The player this boss is fighting
    pub player: Entity,

    // authored core variables
    pub std_speed: f32,
    pub std_acceleration: f32,
    /// Speed multiplier while standing in ice paint
    pub ice_speed_mod: f32,
    /// Acceleration multiplier while standing in ice paint
    pub ice_acceleration_mod: f32,
    /// After switching actions, wait at least this long before switching again
    pub min_action_switch_time: f32,
    /// Distance at which the PlayerDistance factor saturates
    pub maximum_player_distance: f32,
    /// Within this distance the boss counts as "close" to the player
    pub player_close_distance: f32,
    /// If false, the boss does nothing until told to activate
    pub begin_active: bool,
    pub music: Option<String>,

    /// Every attack this boss can perform in any phase
    pub attacks: Vec<Entity>,
    /// The action wrapper with Attack behavior, if any phase authored one
    pub attack_action: Option<usize>,

    // runtime state
    pub active: bool,
    pub has_activated_once: bool,
    pub has_started_music: bool,
    /// Vector from the boss to the player, refreshed every tick
    pub to_player: Vec2,
    /// Index into the assets action table
    pub current_action: Option<usize>,
    pub time_in_current_action: f32,
    /// Countdown to the next arbitration check
    pub utility_clock: f32,
    /// The last attack determined to be the best to perform
    pub current_attack: Option<Entity>,
    /// Attack forced by phase entry, committed ahead of arbitration
    pub queued_attack: Option<Entity>,
    /// Set while a state cannot be left before the animator synchronizes
    pub waiting_for_idle: bool,
    pub last_phase_index: usize,
    pub phase_entry: Option<PhaseEntrySequence>,
    /// Where a MoveSpecific action started its displacement
    pub ms_start_pos: Vec2,
    /// In-game time spent near the player within the close window
    pub time_close_to_player: f32,

    pub history: AttackHistory,
    /// Damage received within the damage-rate window
    pub damage_window: SlidingWindow,
    /// Attacks performed within the attack-rate window
    pub attack_window: SlidingWindow,

    // pathfinding state for MoveToPlayer
    pub path: Vec<Vec2>,
    pub path_index: usize,
    pub path_timer: f32,
}

impl Boss {
    pub fn new(player: Entity) -> Self {
        Self {
            player,
            std_speed: 20.0,
            std_acceleration: 5.0,
            ice_speed_mod: 2.0,
            ice_acceleration_mod: 0.5,
            min_action_switch_time: 5.0,
            maximum_player_distance: 100.0,
            player_close_distance: 5.0,
            begin_active: true,
            music: None,
            attacks: Vec::new(),
            attack_action: None,
            active: false,
            has_activated_once: false,
            has_started_music: false,
            to_player: Vec2::Y,
            current_action: None,
            time_in_current_action: 0.0,
            utility_clock: 0.0,
            current_attack: None,
            queued_attack: None,
            waiting_for_idle: false,
            last_phase_index: 0,
            phase_entry: None,
            ms_start_pos: Vec2::ZERO,
            time_close_to_player: 0.0,
            history: AttackHistory::default(),
            damage_window: SlidingWindow::default(),
            attack_window: SlidingWindow::default(),
            path: Vec::new(),
            path_index: 1,
            path_timer: 0.0,
        }
    }

    /// Current applicable speed (ice paint modifies it)
    pub fn speed(&self, surface: &PaintSurfaceState) -> f32 {
        if surface.in_ice {
            self.std_speed * self.ice_speed_mod
        } else {
            self.std_speed
        }
    }

    /// Current applicable acceleration (ice paint modifies it)
    pub fn acceleration(&self, surface: &PaintSurfaceState) -> f32 {
        if surface.in_ice {
            self.std_acceleration * self.ice_acceleration_mod
        } else {
            self.std_acceleration
        }
    }

    pub fn player_distance(&self) -> f32 {
        self.to_player.length()
    }

    /// Absolute maximum attacks performable within the attack-rate window
    pub fn max_attacks_in_window() -> u32 {
        (ATTACK_RATE_INTERVAL / ABSOLUTE_MINIMUM_ATTACK_TIME) as u32
    }

    pub fn in_phase_entry(&self) -> bool {
        self.phase_entry.is_some()
    }

    /// Forget the current path so the next movement tick recomputes it
    pub fn reset_pathfinding(&mut self) {
        self.path.clear();
        self.path_index = 1;
        self.path_timer = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_attacks_in_window() {
        assert_eq!(Boss::max_attacks_in_window(), 12);
    }

    #[test]
    fn test_ice_modifiers() {
        let boss = Boss::new(Entity::PLACEHOLDER);
        let dry = PaintSurfaceState::default();
        let icy = PaintSurfaceState {
            in_ice: true,
            in_lightning: false,
        };
        assert_eq!(boss.speed(&dry), 20.0);
        assert_eq!(boss.speed(&icy), 40.0);
        assert_eq!(boss.acceleration(&dry), 5.0);
        assert_eq!(boss.acceleration(&icy), 2.5);
    }
}
