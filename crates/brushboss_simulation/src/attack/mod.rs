//! Frame-phased attack behaviors
//!
//! Each attack is its own entity: the authored `AttackSpec` stays on it
//! permanently, an `AttackState` is inserted only while a run is in
//! flight. The driver advances runs through Startup -> Active -> Recovery;
//! hitboxes report validated contacts; globs are the falling projectiles
//! of the paint-fall variant.

pub mod driver;
pub mod glob;
pub mod hitbox;
pub mod spec;
pub mod state;

pub use driver::{drive_attack_phases, route_blocked_damage};
pub use glob::{update_ceiling_globs, CeilingGlob};
pub use hitbox::{detect_hitbox_overlaps, route_hit_reports, AttackHitbox};
pub use spec::{
    AttackKind, AttackSpec, ColorChance, DashParams, GlobParams, PaintOrientation, PaintParams,
    ProjectileEmission, MAXIMUM_COLLISION_WAIT_TIME, MAXIMUM_IDLE_WAIT, MAXIMUM_WAIT_TRIGGER,
};
pub use state::{
    draw_attack_color, process_attack_run_requests, AttackPhaseKind, AttackState, StartAttackRun,
    StopAttack, VariantRun,
};
