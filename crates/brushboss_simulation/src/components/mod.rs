//! ECS components shared by the boss and its collaborators
//!
//! Organized by domain:
//! - actor: Player marker, Health (immunity, damage multipliers)
//! - movement: Body (2D velocity integration)
//! - paint: paint color state owned by the external paint world

pub mod actor;
pub mod movement;
pub mod paint;

// Re-exports for convenient imports
pub use actor::*;
pub use movement::*;
pub use paint::*;
