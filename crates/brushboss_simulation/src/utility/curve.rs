//! Response curves for utility factors
//!
//! Authored curves map a normalized [0, 1] observation to a [0, 1] utility.
//! Serde-tagged so curves live directly in boss config documents.

use serde::{Deserialize, Serialize};

/// Evaluable response curve, `[0, 1] -> [0, 1]`
///
/// Inputs are clamped to [0, 1] before evaluation, outputs after.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseCurve {
    /// Always the same value
    Constant { value: f32 },
    /// Straight line from `start` at x=0 to `end` at x=1
    Linear { start: f32, end: f32 },
    /// `x^exponent`, optionally flipped to `1 - x^exponent`
    Power { exponent: f32, invert: bool },
    /// `below` before the threshold, `above` at and after it
    Step { threshold: f32, below: f32, above: f32 },
    /// Hermite smoothstep between `start` and `end`
    Smoothstep { start: f32, end: f32 },
    /// Piecewise-linear through sorted `(x, y)` keyframes
    Points { points: Vec<(f32, f32)> },
}

impl Default for ResponseCurve {
    /// The identity ramp, matching the default authored curve
    fn default() -> Self {
        ResponseCurve::Linear {
            start: 0.0,
            end: 1.0,
        }
    }
}

impl ResponseCurve {
    /// Identity ramp 0 -> 1
    pub fn linear() -> Self {
        Self::default()
    }

    /// Falling ramp 1 -> 0
    pub fn falling() -> Self {
        ResponseCurve::Linear {
            start: 1.0,
            end: 0.0,
        }
    }

    pub fn evaluate(&self, x: f32) -> f32 {
        let x = x.clamp(0.0, 1.0);
        let y = match self {
            ResponseCurve::Constant { value } => *value,
            ResponseCurve::Linear { start, end } => start + (end - start) * x,
            ResponseCurve::Power { exponent, invert } => {
                let p = x.powf(exponent.max(0.0));
                if *invert {
                    1.0 - p
                } else {
                    p
                }
            }
            ResponseCurve::Step {
                threshold,
                below,
                above,
            } => {
                if x < *threshold {
                    *below
                } else {
                    *above
                }
            }
            ResponseCurve::Smoothstep { start, end } => {
                let t = x * x * (3.0 - 2.0 * x);
                start + (end - start) * t
            }
            ResponseCurve::Points { points } => evaluate_points(points, x),
        };
        y.clamp(0.0, 1.0)
    }
}

fn evaluate_points(points: &[(f32, f32)], x: f32) -> f32 {
    if points.is_empty() {
        return 0.0;
    }
    if x <= points[0].0 {
        return points[0].1;
    }
    for pair in points.windows(2) {
        let (x0, y0) = pair[0];
        let (x1, y1) = pair[1];
        if x <= x1 {
            if (x1 - x0).abs() < f32::EPSILON {
                return y1;
            }
            let t = (x - x0) / (x1 - x0);
            return y0 + (y1 - y0) * t;
        }
    }
    points[points.len() - 1].1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_identity() {
        let curve = ResponseCurve::linear();
        assert_eq!(curve.evaluate(0.0), 0.0);
        assert_eq!(curve.evaluate(0.5), 0.5);
        assert_eq!(curve.evaluate(1.0), 1.0);
    }

    #[test]
    fn test_falling_ramp() {
        let curve = ResponseCurve::falling();
        assert_eq!(curve.evaluate(0.0), 1.0);
        assert_eq!(curve.evaluate(1.0), 0.0);
    }

    #[test]
    fn test_input_clamped() {
        let curve = ResponseCurve::linear();
        assert_eq!(curve.evaluate(-3.0), 0.0);
        assert_eq!(curve.evaluate(7.0), 1.0);
    }

    #[test]
    fn test_output_clamped() {
        let curve = ResponseCurve::Constant { value: 4.0 };
        assert_eq!(curve.evaluate(0.5), 1.0);
    }

    #[test]
    fn test_step() {
        let curve = ResponseCurve::Step {
            threshold: 0.5,
            below: 0.1,
            above: 0.9,
        };
        assert_eq!(curve.evaluate(0.49), 0.1);
        assert_eq!(curve.evaluate(0.5), 0.9);
    }

    #[test]
    fn test_points_interpolation() {
        let curve = ResponseCurve::Points {
            points: vec![(0.0, 0.0), (0.5, 1.0), (1.0, 0.0)],
        };
        assert_eq!(curve.evaluate(0.25), 0.5);
        assert_eq!(curve.evaluate(0.5), 1.0);
        assert_eq!(curve.evaluate(0.75), 0.5);
    }

    #[test]
    fn test_points_outside_range() {
        let curve = ResponseCurve::Points {
            points: vec![(0.2, 0.3), (0.8, 0.7)],
        };
        assert_eq!(curve.evaluate(0.0), 0.3);
        assert_eq!(curve.evaluate(1.0), 0.7);
    }

    #[test]
    fn test_serde_round_trip() {
        let curve = ResponseCurve::Power {
            exponent: 2.0,
            invert: true,
        };
        let json = serde_json::to_string(&curve).unwrap();
        let back: ResponseCurve = serde_json::from_str(&json).unwrap();
        assert_eq!(curve, back);
    }
}
