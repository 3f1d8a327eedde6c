//! Movement components: 2D body with velocity integration

use bevy::prelude::*;

/// Position + velocity of an actor on the fight plane
///
/// Physics resolution lives outside the simulation; this body only
/// integrates velocity so the decision core can reason about distances.
#[derive(Component, Debug, Clone, Copy, Default, Reflect)]
#[reflect(Component)]
pub struct Body {
    pub position: Vec2,
    pub velocity: Vec2,
}

impl Body {
    pub fn at(position: Vec2) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
        }
    }
}

/// System: integrate body velocities each fixed tick
pub fn integrate_bodies(mut bodies: Query<&mut Body>, time: Res<Time<Fixed>>) {
    let delta = time.delta_secs();
    for mut body in bodies.iter_mut() {
        let step = body.velocity * delta;
        body.position += step;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_at() {
        let body = Body::at(Vec2::new(3.0, -2.0));
        assert_eq!(body.position, Vec2::new(3.0, -2.0));
        assert_eq!(body.velocity, Vec2::ZERO);
    }
}
