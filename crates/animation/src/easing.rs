use serde::{Deserialize, Serialize};
use std::f32::consts::{FRAC_PI_2, PI};

/// Which end of the curve the core function shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EasingMode {
    #[default]
    EaseIn,
    EaseOut,
    EaseInOut,
}

/// Curve family. Parameterized kinds carry their tuning values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EasingKind {
    Circle,
    Back { amplitude: f32 },
    Bounce { bounces: f32, bounciness: f32 },
    Cubic,
    Elastic { oscillations: f32, springiness: f32 },
    Exponential { exponent: f32 },
    Power { power: f32 },
    Quadratic,
    Quartic,
    Quintic,
    Sine,
    BezierCurve { x1: f32, y1: f32, x2: f32, y2: f32 },
}

impl EasingKind {
    pub fn back() -> Self {
        EasingKind::Back { amplitude: 1.0 }
    }

    pub fn bounce() -> Self {
        EasingKind::Bounce {
            bounces: 3.0,
            bounciness: 2.0,
        }
    }

    pub fn elastic() -> Self {
        EasingKind::Elastic {
            oscillations: 3.0,
            springiness: 3.0,
        }
    }

    pub fn exponential() -> Self {
        EasingKind::Exponential { exponent: 2.0 }
    }

    pub fn power() -> Self {
        EasingKind::Power { power: 2.0 }
    }

    pub fn bezier() -> Self {
        EasingKind::BezierCurve {
            x1: 0.0,
            y1: 0.0,
            x2: 1.0,
            y2: 1.0,
        }
    }

    /// Ease-in shape on `[0, 1]`.
    fn ease_in_core(&self, g: f32) -> f32 {
        match *self {
            EasingKind::Circle => {
                let g = g.clamp(0.0, 1.0);
                1.0 - (1.0 - g * g).sqrt()
            }
            EasingKind::Back { amplitude } => {
                let a = amplitude.max(0.0);
                g.powi(3) - g * a * (PI * g).sin()
            }
            EasingKind::Bounce {
                bounces,
                bounciness,
            } => bounce_core(g, bounces, bounciness),
            EasingKind::Cubic => g * g * g,
            EasingKind::Elastic {
                oscillations,
                springiness,
            } => {
                let osc = oscillations.max(0.0);
                let spring = springiness.max(0.0);
                let expo = if spring == 0.0 {
                    g
                } else {
                    ((spring * g).exp() - 1.0) / (spring.exp() - 1.0)
                };
                expo * ((2.0 * PI * osc + FRAC_PI_2) * g).sin()
            }
            EasingKind::Exponential { exponent } => {
                if exponent <= 0.0 {
                    g
                } else {
                    ((exponent * g).exp() - 1.0) / (exponent.exp() - 1.0)
                }
            }
            EasingKind::Power { power } => g.powf(power.max(0.0)),
            EasingKind::Quadratic => g * g,
            EasingKind::Quartic => g.powi(4),
            EasingKind::Quintic => g.powi(5),
            EasingKind::Sine => 1.0 - (FRAC_PI_2 * (1.0 - g)).sin(),
            EasingKind::BezierCurve { x1, y1, x2, y2 } => bezier_interpolate(g, x1, y1, x2, y2),
        }
    }
}

fn bounce_core(g: f32, bounces: f32, bounciness: f32) -> f32 {
    let bounces = bounces.max(0.0);
    let bounciness = if bounciness <= 1.0 { 1.001 } else { bounciness };
    let pow = bounciness.powf(bounces);
    let one_minus = 1.0 - bounciness;
    let sum_of_units = (1.0 - pow) / one_minus + pow * 0.5;
    let unit_at_t = g * sum_of_units;
    let bounce_at_t = (-unit_at_t * one_minus + 1.0).ln() / bounciness.ln();
    let start = bounce_at_t.floor();
    let end = start + 1.0;
    let start_time = (1.0 - bounciness.powf(start)) / (one_minus * sum_of_units);
    let end_time = (1.0 - bounciness.powf(end)) / (one_minus * sum_of_units);
    let mid_time = (start_time + end_time) * 0.5;
    let time_to_peak = g - mid_time;
    let radius = mid_time - start_time;
    (-(1.0 / bounciness).powf(bounces - start) / (radius * radius))
        * (time_to_peak - radius)
        * (time_to_peak + radius)
}

/// Cubic bezier through (0,0), (x1,y1), (x2,y2), (1,1) evaluated at `t` on
/// the x axis with a few Newton steps.
pub fn bezier_interpolate(t: f32, x1: f32, y1: f32, x2: f32, y2: f32) -> f32 {
    let f0 = 1.0 - 3.0 * x2 + 3.0 * x1;
    let f1 = 3.0 * x2 - 6.0 * x1;
    let f2 = 3.0 * x1;
    let mut refined = t;
    for _ in 0..5 {
        let r2 = refined * refined;
        let r3 = r2 * refined;
        let x = f0 * r3 + f1 * r2 + f2 * refined;
        let slope = 3.0 * f0 * r2 + 2.0 * f1 * refined + f2;
        if slope.abs() < 1e-6 {
            break;
        }
        refined -= (x - t) / slope;
        refined = refined.clamp(0.0, 1.0);
    }
    3.0 * (1.0 - refined).powi(2) * refined * y1
        + 3.0 * (1.0 - refined) * refined * refined * y2
        + refined.powi(3)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EasingFunction {
    pub kind: EasingKind,
    pub mode: EasingMode,
}

impl EasingFunction {
    pub fn new(kind: EasingKind, mode: EasingMode) -> Self {
        Self { kind, mode }
    }

    /// Map a linear gradient in `[0, 1]` onto the eased curve.
    pub fn ease(&self, gradient: f32) -> f32 {
        match self.mode {
            EasingMode::EaseIn => self.kind.ease_in_core(gradient),
            EasingMode::EaseOut => 1.0 - self.kind.ease_in_core(1.0 - gradient),
            EasingMode::EaseInOut => {
                if gradient >= 0.5 {
                    (1.0 - self.kind.ease_in_core((1.0 - gradient) * 2.0)) * 0.5 + 0.5
                } else {
                    self.kind.ease_in_core(gradient * 2.0) * 0.5
                }
            }
        }
    }
}
