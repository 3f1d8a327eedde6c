//! Utility factors: weighted scoring inputs for actions and attacks
//!
//! A factor set bundles variable factors (tracked boss variables pushed
//! through a response curve) and color factors (binary paint-color
//! membership). Authoring convention: the weights of all members of one
//! factor set should sum to 1. This is advisory, the loader only warns about
//! it but scoring never renormalizes.

use serde::{Deserialize, Serialize};

use crate::components::PaintColor;
use crate::utility::curve::ResponseCurve;

/// Which tracked boss variable feeds a variable factor
///
/// Left end of the curve <-> right end of the curve:
/// - PlayerDistance: close <-> far
/// - MyHealth: no health <-> full health
/// - TimeCloseToPlayer: never near the player <-> near for the whole window
/// - DamageReceivedRate: no recent damage <-> maximum expected damage
/// - PlayerDirection: signed angle folded onto one linear scale
/// - TimeTaken: just entered the action <-> time in action = max_value
/// - AttackRate: not attacking <-> attacking as fast as possible
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FactorKind {
    PlayerDistance,
    MyHealth,
    TimeCloseToPlayer,
    DamageReceivedRate,
    PlayerDirection,
    TimeTaken,
    AttackRate,
}

fn default_weight() -> f32 {
    1.0
}

fn default_max_value() -> f32 {
    1.0
}

/// A factor computed from a tracked boss variable
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableFactor {
    pub kind: FactorKind,
    /// Relative importance against the other factors of the set, (0, 1]
    #[serde(default = "default_weight")]
    pub weight: f32,
    #[serde(default)]
    pub curve: ResponseCurve,
    /// Tracked value which maps to x = 1 on the curve.
    /// Only used by TimeTaken.
    #[serde(default = "default_max_value")]
    pub max_value: f32,
}

impl VariableFactor {
    pub fn new(kind: FactorKind, weight: f32, curve: ResponseCurve) -> Self {
        Self {
            kind,
            weight,
            curve,
            max_value: 1.0,
        }
    }
}

fn default_active_utility() -> f32 {
    1.0
}

fn default_not_active_utility() -> f32 {
    0.1
}

/// A factor keyed on the paint color currently applied to the boss
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColorFactor {
    pub color: PaintColor,
    #[serde(default = "default_weight")]
    pub weight: f32,
    /// Utility while the boss carries this paint color
    #[serde(default = "default_active_utility")]
    pub active_utility: f32,
    /// Utility while it does not
    #[serde(default = "default_not_active_utility")]
    pub not_active_utility: f32,
}

/// Ordered bundle of factors producing one utility contribution
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FactorSet {
    #[serde(default)]
    pub variable_factors: Vec<VariableFactor>,
    #[serde(default)]
    pub color_factors: Vec<ColorFactor>,
}

impl FactorSet {
    /// Total number of factors in this set
    pub fn total_factors(&self) -> usize {
        self.variable_factors.len() + self.color_factors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total_factors() == 0
    }

    /// Sum of all member weights (should be ~1 by authoring convention)
    pub fn weight_sum(&self) -> f32 {
        let variable: f32 = self.variable_factors.iter().map(|f| f.weight).sum();
        let color: f32 = self.color_factors.iter().map(|f| f.weight).sum();
        variable + color
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_factors() {
        let mut fs = FactorSet::default();
        assert!(fs.is_empty());

        fs.variable_factors.push(VariableFactor::new(
            FactorKind::MyHealth,
            0.6,
            ResponseCurve::linear(),
        ));
        fs.color_factors.push(ColorFactor {
            color: PaintColor::Red,
            weight: 0.4,
            active_utility: 1.0,
            not_active_utility: 0.1,
        });
        assert_eq!(fs.total_factors(), 2);
        assert!((fs.weight_sum() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_factor_deserialize_defaults() {
        let json = r#"{ "kind": "PlayerDistance" }"#;
        let factor: VariableFactor = serde_json::from_str(json).unwrap();
        assert_eq!(factor.weight, 1.0);
        assert_eq!(factor.max_value, 1.0);
        assert_eq!(factor.curve, ResponseCurve::linear());
    }
}
