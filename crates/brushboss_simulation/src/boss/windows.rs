//! History ring and sliding-window counters
//!
//! Small deterministic bookkeeping for the scoring engine: the ring of
//! recently performed attacks (consecutive-use penalties) and decaying
//! counters for damage received and attacks performed.

use bevy::prelude::*;
use std::collections::VecDeque;

/// Capacity of the recent-attack ring; also the absolute cap on
/// `maximum_consecutive_uses`
pub const ABSOLUTE_MAX_CONSECUTIVE_ATTACKS: usize = 5;

/// Fixed-capacity ring of the most recently performed attacks
///
/// Pushing overwrites the oldest slot once full. Updated in the same system
/// step that commits an attack, so scoring never observes a half-updated
/// ring.
#[derive(Debug, Clone, Default, Reflect)]
pub struct AttackHistory {
    slots: [Option<Entity>; ABSOLUTE_MAX_CONSECUTIVE_ATTACKS],
    next: usize,
}

impl AttackHistory {
    pub fn push(&mut self, attack: Entity) {
        self.slots[self.next] = Some(attack);
        self.next = (self.next + 1) % self.slots.len();
    }

    /// How many ring slots currently hold this attack
    pub fn count_of(&self, attack: Entity) -> u32 {
        self.slots
            .iter()
            .filter(|slot| **slot == Some(attack))
            .count() as u32
    }

    pub fn clear(&mut self) {
        self.slots = Default::default();
        self.next = 0;
    }
}

/// Decaying counter over a sliding time window
///
/// Each contribution expires `interval` seconds after it was pushed;
/// `tick` advances the clock and drops expired entries.
#[derive(Debug, Clone, Default)]
pub struct SlidingWindow {
    // (seconds until expiry, amount), oldest first
    entries: VecDeque<(f32, f32)>,
}

impl SlidingWindow {
    pub fn push(&mut self, amount: f32, interval: f32) {
        self.entries.push_back((interval, amount));
    }

    pub fn tick(&mut self, delta: f32) {
        for entry in self.entries.iter_mut() {
            entry.0 -= delta;
        }
        while matches!(self.entries.front(), Some((remaining, _)) if *remaining <= 0.0) {
            self.entries.pop_front();
        }
    }

    /// Sum of all unexpired contributions
    pub fn total(&self) -> f32 {
        self.entries.iter().map(|(_, amount)| amount).sum()
    }

    /// Number of unexpired contributions
    pub fn count(&self) -> u32 {
        self.entries.len() as u32
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_counts() {
        let a = Entity::from_raw(1);
        let b = Entity::from_raw(2);
        let mut history = AttackHistory::default();
        assert_eq!(history.count_of(a), 0);

        history.push(a);
        history.push(b);
        history.push(a);
        assert_eq!(history.count_of(a), 2);
        assert_eq!(history.count_of(b), 1);
    }

    #[test]
    fn test_history_evicts_oldest() {
        let a = Entity::from_raw(1);
        let b = Entity::from_raw(2);
        let mut history = AttackHistory::default();
        history.push(a);
        for _ in 0..ABSOLUTE_MAX_CONSECUTIVE_ATTACKS {
            history.push(b);
        }
        // five pushes of b rolled a out of the ring
        assert_eq!(history.count_of(a), 0);
        assert_eq!(history.count_of(b), 5);
    }

    #[test]
    fn test_history_eviction_timing() {
        // an attack used once stays visible for exactly four subsequent pushes
        let a = Entity::from_raw(1);
        let b = Entity::from_raw(2);
        let mut history = AttackHistory::default();
        history.push(a);
        for i in 0..4 {
            history.push(b);
            assert_eq!(history.count_of(a), 1, "evicted too early after {} pushes", i + 1);
        }
        history.push(b);
        assert_eq!(history.count_of(a), 0);
    }

    #[test]
    fn test_sliding_window_expiry() {
        let mut window = SlidingWindow::default();
        window.push(5.0, 4.0);
        window.tick(2.0);
        window.push(3.0, 4.0);
        assert_eq!(window.total(), 8.0);
        assert_eq!(window.count(), 2);

        window.tick(2.0); // first entry expires exactly now
        assert_eq!(window.total(), 3.0);
        assert_eq!(window.count(), 1);

        window.tick(2.0);
        assert_eq!(window.total(), 0.0);
        assert_eq!(window.count(), 0);
    }
}
