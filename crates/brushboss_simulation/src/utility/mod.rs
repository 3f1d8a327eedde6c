//! Utility-based decision engine
//!
//! Factors feed response curves, factor sets bundle them into one utility
//! contribution, and the scoring functions turn actions and attacks into
//! comparable [0, 1] scores each arbitration tick.

pub mod action;
pub mod curve;
pub mod factor;
pub mod scoring;

pub use action::{ActionSpec, BossBehavior};
pub use curve::ResponseCurve;
pub use factor::{ColorFactor, FactorKind, FactorSet, VariableFactor};
pub use scoring::{
    action_utility, attack_utility, best_attack, factor_set_utility, AttackCandidate,
    UtilityContext, UTILITY_FACTOR_DROP_THRESHOLD,
};
