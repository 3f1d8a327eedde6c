//! Boundary events between the simulation core and the engine side
//!
//! The decision core never touches rendering, audio, physics resolution or
//! the paint raster. Everything it needs from those systems crosses this
//! boundary as events (or, for pathfinding, a resource-held trait object).
//!
//! Outbound: commands the engine executes (paint draws, animation triggers,
//! audio cues, camera impulses, knockback).
//! Inbound: signals the engine reports back (animation timing, validated
//! collision contacts, damage, activation toggles).

use bevy::prelude::*;

use crate::components::PaintColor;

// ============================================================================
// Outbound commands
// ============================================================================

/// Paint the world at a position (the `draw` contract of the paint manager)
#[derive(Event, Debug, Clone)]
pub struct PaintCommand {
    pub position: Vec2,
    /// Rotation of the placed texture in degrees
    pub angle: f32,
    /// Uniform scale of the placed texture
    pub scale: f32,
    /// Name of the authored paint texture
    pub texture: String,
    pub color: PaintColor,
}

/// Spawn a paint projectile travelling in a direction
#[derive(Event, Debug, Clone)]
pub struct ProjectileCommand {
    pub origin: Vec2,
    pub direction: Vec2,
}

/// Drive the boss animator
#[derive(Event, Debug, Clone)]
pub struct AnimationCommand {
    pub boss: Entity,
    pub kind: AnimationCommandKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnimationCommandKind {
    /// Fire a one-shot animation trigger by name
    Trigger(String),
    /// Set a named animator bool (stun, cooldown, walking)
    SetBool(String, bool),
    /// Facing/walk blend direction for movement animation
    Direction(Vec2),
}

/// Play a named audio cue (playback is external)
#[derive(Event, Debug, Clone)]
pub struct AudioCommand {
    pub cue: String,
}

/// Camera feedback requests
#[derive(Event, Debug, Clone)]
pub struct CameraCommand {
    pub kind: CameraCommandKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CameraCommandKind {
    /// Screen shake with the given impulse strength
    Shake(f32),
    /// One-shot fight intro framing on first activation
    FightIntro,
}

/// Push the target away from the attack that damaged it
#[derive(Event, Debug, Clone)]
pub struct KnockbackCommand {
    pub target: Entity,
    pub direction: Vec2,
    pub power: f32,
}

/// The boss entered a new phase (1-based phase number)
#[derive(Event, Debug, Clone)]
pub struct PhaseChanged {
    pub boss: Entity,
    pub phase: u32,
}

/// An attack run finished naturally (completion notification of the
/// attack state machine; forced stops do not fire this)
#[derive(Event, Debug, Clone)]
pub struct AttackEnded {
    pub attack: Entity,
    pub boss: Entity,
}

// ============================================================================
// Inbound signals
// ============================================================================

/// Animation-timing signals reported by the animator
#[derive(Event, Debug, Clone)]
pub struct AnimationEvent {
    pub boss: Entity,
    pub kind: AnimationEventKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationEventKind {
    /// The clip reached the frame where active frames should begin
    TimedEvent,
    /// The animator returned to its idle state
    IdleReached,
}

/// Damage attempted against an entity (player weapons, hazards, self-damage)
///
/// Processed by `apply_damage`; immunity and multipliers are resolved there.
#[derive(Event, Debug, Clone)]
pub struct DamageInflicted {
    pub target: Entity,
    pub amount: f32,
}

/// Damage that actually landed (post immunity/multipliers)
#[derive(Event, Debug, Clone)]
pub struct DamageTaken {
    pub target: Entity,
    pub amount: f32,
}

/// Damage that was swallowed by immunity (shield hit accounting)
#[derive(Event, Debug, Clone)]
pub struct DamageBlocked {
    pub target: Entity,
    pub amount: f32,
}

/// A validated contact reported for an attack's hitbox
///
/// `target` is Some for a hit on a damageable actor, None for level
/// geometry. `direction` points from the contact toward the hitbox
/// (non-normalized).
#[derive(Event, Debug, Clone)]
pub struct HitReport {
    pub attack: Entity,
    pub target: Option<Entity>,
    pub direction: Vec2,
}

/// Enable or disable the boss (engine lifecycle, cutscenes)
#[derive(Event, Debug, Clone)]
pub struct SetBossActive {
    pub boss: Entity,
    pub active: bool,
}

// ============================================================================
// Pathfinding contract
// ============================================================================

/// Contract used by the MoveToPlayer action: given start and goal, return
/// an ordered sequence of waypoints (empty when no path exists)
pub trait PathPlanner: Send + Sync {
    fn compute_path(&self, start: Vec2, goal: Vec2) -> Vec<Vec2>;
}

/// Optional pathfinder installed by the host; the movement system falls
/// back to straight-line pursuit when absent
#[derive(Resource, Default)]
pub struct Pathfinder(pub Option<Box<dyn PathPlanner>>);

/// Register every boundary event on the app
pub fn register_interface_events(app: &mut App) {
    app.add_event::<PaintCommand>()
        .add_event::<ProjectileCommand>()
        .add_event::<AnimationCommand>()
        .add_event::<AudioCommand>()
        .add_event::<CameraCommand>()
        .add_event::<KnockbackCommand>()
        .add_event::<PhaseChanged>()
        .add_event::<AttackEnded>()
        .add_event::<AnimationEvent>()
        .add_event::<DamageInflicted>()
        .add_event::<DamageTaken>()
        .add_event::<DamageBlocked>()
        .add_event::<HitReport>()
        .add_event::<SetBossActive>();
}
