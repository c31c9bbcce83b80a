//! Planar math shared by every stage of the swarm.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::SwarmError;

/// Point in the bounded search plane.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    /// Construct a new position.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to `other`.
    #[must_use]
    pub fn distance_sq(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Euclidean distance to `other`.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        self.distance_sq(other).sqrt()
    }

    /// Returns true when both coordinates are neither NaN nor infinite.
    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Tuple form consumed by the neighborhood indices.
    #[must_use]
    pub const fn as_tuple(self) -> (f64, f64) {
        (self.x, self.y)
    }

    /// Translate by `(dx, dy)`.
    #[must_use]
    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// Axis-aligned rectangle every agent is confined to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Bounds {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl Bounds {
    #[must_use]
    pub const fn new(min_x: f64, max_x: f64, min_y: f64, max_y: f64) -> Self {
        Self {
            min_x,
            max_x,
            min_y,
            max_y,
        }
    }

    /// Square domain `[-half, half]²`.
    #[must_use]
    pub const fn symmetric(half: f64) -> Self {
        Self::new(-half, half, -half, half)
    }

    /// Tightest bounds enclosing every position, or `None` for an empty input.
    pub fn enclosing(positions: impl IntoIterator<Item = Position>) -> Option<Self> {
        let mut iter = positions.into_iter();
        let first = iter.next()?;
        let mut bounds = Self::new(first.x, first.x, first.y, first.y);
        for p in iter {
            bounds.min_x = bounds.min_x.min(p.x);
            bounds.max_x = bounds.max_x.max(p.x);
            bounds.min_y = bounds.min_y.min(p.y);
            bounds.max_y = bounds.max_y.max(p.y);
        }
        Some(bounds)
    }

    /// Returns true when the rectangle is well formed (finite, min <= max).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        [self.min_x, self.max_x, self.min_y, self.max_y]
            .iter()
            .all(|v| v.is_finite())
            && self.min_x <= self.max_x
            && self.min_y <= self.max_y
    }

    #[must_use]
    pub fn contains(&self, p: Position) -> bool {
        (self.min_x..=self.max_x).contains(&p.x) && (self.min_y..=self.max_y).contains(&p.y)
    }

    /// Clamp `p` onto the rectangle.
    #[must_use]
    pub fn clamp(&self, p: Position) -> Position {
        Position::new(
            p.x.clamp(self.min_x, self.max_x),
            p.y.clamp(self.min_y, self.max_y),
        )
    }

    /// Uniformly sample a position inside the rectangle (x drawn before y).
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Position {
        let x = sample_range(rng, self.min_x, self.max_x);
        let y = sample_range(rng, self.min_y, self.max_y);
        Position::new(x, y)
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::symmetric(5.0)
    }
}

/// Uniform draw from `[min, max)`; a degenerate range returns `min` without panicking.
pub fn sample_range<R: Rng + ?Sized>(rng: &mut R, min: f64, max: f64) -> f64 {
    let unit: f64 = rng.random();
    min + unit * (max - min)
}

/// Reject a coordinate that would corrupt the simulation.
pub fn ensure_finite(p: Position, stage: &'static str) -> Result<Position, SwarmError> {
    if p.is_finite() {
        Ok(p)
    } else {
        Err(SwarmError::NumericInstability {
            stage,
            x: p.x,
            y: p.y,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::SmallRng};

    #[test]
    fn distance_is_euclidean() {
        let a = Position::new(0.0, 0.0);
        let b = Position::new(3.0, 4.0);
        assert_eq!(a.distance(b), 5.0);
        assert_eq!(b.distance_sq(a), 25.0);
    }

    #[test]
    fn clamp_keeps_points_inside() {
        let bounds = Bounds::new(0.0, 1.0, -1.0, 1.0);
        let clamped = bounds.clamp(Position::new(4.0, -3.0));
        assert_eq!(clamped, Position::new(1.0, -1.0));
        assert!(bounds.contains(clamped));
    }

    #[test]
    fn samples_stay_inside_bounds() {
        let mut rng = SmallRng::seed_from_u64(7);
        let bounds = Bounds::new(-2.0, 3.0, 10.0, 11.0);
        for _ in 0..1_000 {
            assert!(bounds.contains(bounds.sample(&mut rng)));
        }
    }

    #[test]
    fn degenerate_range_returns_min() {
        let mut rng = SmallRng::seed_from_u64(1);
        assert_eq!(sample_range(&mut rng, 2.5, 2.5), 2.5);
        let point = Bounds::new(1.0, 1.0, 2.0, 2.0).sample(&mut rng);
        assert_eq!(point, Position::new(1.0, 2.0));
    }

    #[test]
    fn enclosing_bounds_cover_all_points() {
        let bounds = Bounds::enclosing([
            Position::new(1.0, 5.0),
            Position::new(-2.0, 0.5),
            Position::new(0.0, 7.0),
        ])
        .expect("bounds");
        assert_eq!(bounds, Bounds::new(-2.0, 1.0, 0.5, 7.0));
        assert!(Bounds::enclosing(std::iter::empty()).is_none());
    }

    #[test]
    fn non_finite_coordinates_are_fatal() {
        let err = ensure_finite(Position::new(f64::NAN, 0.0), "test").unwrap_err();
        assert!(matches!(
            err,
            SwarmError::NumericInstability { stage: "test", .. }
        ));
        assert!(ensure_finite(Position::new(f64::INFINITY, 0.0), "test").is_err());
        assert!(ensure_finite(Position::new(1.0, 2.0), "test").is_ok());
    }
}
