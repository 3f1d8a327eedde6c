//! Ceiling paint globs spawned by the paint-fall attack

use bevy::prelude::*;

use crate::attack::spec::GlobParams;
use crate::components::{Body, PaintColor};
use crate::interfaces::{AudioCommand, HitReport, PaintCommand};

/// A glob of paint falling from the ceiling
///
/// Spawned by the paint-fall attack's active frames; on landing it paints
/// the floor and pulses a one-tick hit against the player.
#[derive(Component, Debug, Clone)]
pub struct CeilingGlob {
    /// The attack that dropped this glob (hits are attributed to it)
    pub attack: Entity,
    pub player: Entity,
    /// Where the glob will land
    pub target_position: Vec2,
    pub color: Option<PaintColor>,
    /// Seconds until the glob hits the ground
    pub remaining: f32,
    pub params: GlobParams,
}

/// System: advance falling globs, land them, pulse their hit
pub fn update_ceiling_globs(
    mut commands: Commands,
    mut globs: Query<(Entity, &mut CeilingGlob)>,
    bodies: Query<&Body>,
    time: Res<Time<Fixed>>,
    mut paint_w: EventWriter<PaintCommand>,
    mut audio_w: EventWriter<AudioCommand>,
    mut hit_w: EventWriter<HitReport>,
) {
    let delta = time.delta_secs();

    for (entity, mut glob) in globs.iter_mut() {
        glob.remaining -= delta;
        if glob.remaining > 0.0 {
            continue;
        }

        // landed: paint the floor under the glob
        if let Some(color) = glob.color {
            paint_w.write(PaintCommand {
                position: glob.target_position,
                angle: 0.0,
                scale: glob.params.paint_scale,
                texture: glob.params.texture.clone(),
                color,
            });
        }
        audio_w.write(AudioCommand {
            cue: "GlobLand".to_string(),
        });

        // one-tick hit pulse against the player
        if let Ok(player_body) = bodies.get(glob.player) {
            if glob.target_position.distance(player_body.position) < glob.params.radius {
                hit_w.write(HitReport {
                    attack: glob.attack,
                    target: Some(glob.player),
                    direction: glob.target_position - player_body.position,
                });
            }
        }

        commands.entity(entity).despawn();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_countdown() {
        let mut glob = CeilingGlob {
            attack: Entity::PLACEHOLDER,
            player: Entity::PLACEHOLDER,
            target_position: Vec2::ZERO,
            color: Some(PaintColor::Red),
            remaining: 1.5,
            params: GlobParams::default(),
        };
        glob.remaining -= 1.0;
        assert!(glob.remaining > 0.0);
        glob.remaining -= 0.5;
        assert!(glob.remaining <= 0.0);
    }
}
