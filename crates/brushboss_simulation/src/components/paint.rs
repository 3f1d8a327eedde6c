//! Paint state components
//!
//! The paint-texture world is an external collaborator. The simulation only
//! tracks which color currently affects the boss (for color factors) and
//! which paint surfaces the boss is standing in (movement modifiers,
//! projectile emission preconditions).

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Paint colors known to the boss AI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Reflect)]
pub enum PaintColor {
    Red,
    Blue,
    Yellow,
    Purple,
    Ice,
    Lightning,
}

/// The paint color currently applied to the boss (None = unpainted)
///
/// Written by the external paint world, read by color factors.
#[derive(Component, Debug, Clone, Copy, Default, Reflect)]
#[reflect(Component)]
pub struct ActivePaintColor(pub Option<PaintColor>);

/// Which special paint surfaces the boss is currently standing in
///
/// Written by the external paint world. Ice scales speed/acceleration and
/// turns dashes into crashes; lightning gates projectile emission.
#[derive(Component, Debug, Clone, Copy, Default, Reflect)]
#[reflect(Component)]
pub struct PaintSurfaceState {
    pub in_ice: bool,
    pub in_lightning: bool,
}
