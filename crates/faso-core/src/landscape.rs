//! Multimodal test landscapes minimized in optimization mode.

use serde::{Deserialize, Serialize};
use std::f64::consts::{E, PI, SQRT_2, TAU};
use std::fmt;
use std::str::FromStr;

use crate::geometry::Position;

/// Closed-form scalar surfaces with analytic gradients.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum LandscapeFunction {
    /// Separable quartic with four basins; global minimum near (-2.9035, -2.9035).
    #[default]
    StyblinskiTang,
    /// Highly multimodal surface with a single global minimum at the origin.
    Ackley,
    /// Convex bowl `x² + y²`.
    Sphere,
}

const STYBLINSKI_ARGMIN: f64 = -2.903_534_027_771_177_8;

impl LandscapeFunction {
    pub const ALL: [Self; 3] = [Self::StyblinskiTang, Self::Ackley, Self::Sphere];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::StyblinskiTang => "styblinski",
            Self::Ackley => "ackley",
            Self::Sphere => "sphere",
        }
    }

    /// Surface height at `p`.
    #[must_use]
    pub fn value(self, p: Position) -> f64 {
        match self {
            Self::StyblinskiTang => 0.5 * (styblinski_term(p.x) + styblinski_term(p.y)),
            Self::Ackley => {
                let radial = (0.5 * (p.x * p.x + p.y * p.y)).sqrt();
                let wave = 0.5 * ((TAU * p.x).cos() + (TAU * p.y).cos());
                -20.0 * (-0.2 * radial).exp() - wave.exp() + 20.0 + E
            }
            Self::Sphere => p.x * p.x + p.y * p.y,
        }
    }

    /// Analytic gradient `(∂f/∂x, ∂f/∂y)` at `p`.
    #[must_use]
    pub fn gradient(self, p: Position) -> (f64, f64) {
        match self {
            Self::StyblinskiTang => (styblinski_slope(p.x), styblinski_slope(p.y)),
            Self::Ackley => {
                let r = (p.x * p.x + p.y * p.y).sqrt();
                let wave = (0.5 * ((TAU * p.x).cos() + (TAU * p.y).cos())).exp();
                // The radial cone has no derivative at the origin; treat it as flat there.
                let (rx, ry) = if r > 0.0 {
                    let k = 2.0 * SQRT_2 * (-0.2 * r / SQRT_2).exp() / r;
                    (k * p.x, k * p.y)
                } else {
                    (0.0, 0.0)
                };
                (
                    rx + PI * (TAU * p.x).sin() * wave,
                    ry + PI * (TAU * p.y).sin() * wave,
                )
            }
            Self::Sphere => (2.0 * p.x, 2.0 * p.y),
        }
    }

    /// Location and height of the global minimum.
    #[must_use]
    pub fn known_minimum(self) -> (Position, f64) {
        let at = match self {
            Self::StyblinskiTang => Position::new(STYBLINSKI_ARGMIN, STYBLINSKI_ARGMIN),
            Self::Ackley | Self::Sphere => Position::new(0.0, 0.0),
        };
        (at, self.value(at))
    }
}

fn styblinski_term(v: f64) -> f64 {
    v.powi(4) - 16.0 * v * v + 5.0 * v
}

fn styblinski_slope(v: f64) -> f64 {
    2.0 * v.powi(3) - 16.0 * v + 2.5
}

impl fmt::Display for LandscapeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing an unknown landscape name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown landscape `{0}` (expected styblinski, ackley, or sphere)")]
pub struct UnknownLandscape(pub String);

impl FromStr for LandscapeFunction {
    type Err = UnknownLandscape;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "styblinski" | "styblinski-tang" | "styblinski_tang" => Ok(Self::StyblinskiTang),
            "ackley" => Ok(Self::Ackley),
            "sphere" | "bowl" => Ok(Self::Sphere),
            _ => Err(UnknownLandscape(s.to_string())),
        }
    }
}
