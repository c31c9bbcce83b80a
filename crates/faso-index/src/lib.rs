//! Spatial indexing abstractions for radius-bounded neighborhood queries.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Errors emitted by spatial index implementations.
#[derive(Debug, Error, PartialEq)]
pub enum IndexError {
    /// Indicates configuration values that cannot be used (e.g., non-positive cell size).
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
    /// A position handed to `rebuild` was NaN or infinite.
    #[error("non-finite position at index {0}")]
    NonFinitePosition(usize),
}

/// Common behaviour exposed by neighborhood indices.
///
/// Implementations must visit matches in ascending insertion order so that
/// callers relying on "first match wins" semantics observe the same result
/// regardless of the index in use.
pub trait NeighborhoodIndex {
    /// Rebuild internal structures from point positions.
    fn rebuild(&mut self, positions: &[(f64, f64)]) -> Result<(), IndexError>;

    /// Visit every indexed point whose squared distance to `origin` is `<= radius_sq`.
    fn visit_within(
        &self,
        origin: (f64, f64),
        radius_sq: f64,
        visitor: &mut dyn FnMut(usize, OrderedFloat<f64>),
    );

    /// Number of indexed points.
    fn len(&self) -> usize;

    /// Returns true when nothing is indexed.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Collect matching indices in ascending order.
    fn collect_within(&self, origin: (f64, f64), radius_sq: f64) -> Vec<usize> {
        let mut hits = Vec::new();
        self.visit_within(origin, radius_sq, &mut |idx, _| hits.push(idx));
        hits
    }

    /// Count matching points without allocating.
    fn count_within(&self, origin: (f64, f64), radius_sq: f64) -> usize {
        let mut count = 0;
        self.visit_within(origin, radius_sq, &mut |_, _| count += 1);
        count
    }
}

fn distance_sq(a: (f64, f64), b: (f64, f64)) -> f64 {
    let dx = a.0 - b.0;
    let dy = a.1 - b.1;
    dx * dx + dy * dy
}

fn check_finite(positions: &[(f64, f64)]) -> Result<(), IndexError> {
    match positions
        .iter()
        .position(|(x, y)| !x.is_finite() || !y.is_finite())
    {
        Some(idx) => Err(IndexError::NonFinitePosition(idx)),
        None => Ok(()),
    }
}

/// Reference index that scans every point on each query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinearScanIndex {
    #[serde(skip)]
    positions: Vec<(f64, f64)>,
}

impl LinearScanIndex {
    /// Create an empty linear index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl NeighborhoodIndex for LinearScanIndex {
    fn rebuild(&mut self, positions: &[(f64, f64)]) -> Result<(), IndexError> {
        check_finite(positions)?;
        self.positions.clear();
        self.positions.extend_from_slice(positions);
        Ok(())
    }

    fn visit_within(
        &self,
        origin: (f64, f64),
        radius_sq: f64,
        visitor: &mut dyn FnMut(usize, OrderedFloat<f64>),
    ) {
        for (idx, &point) in self.positions.iter().enumerate() {
            let dist_sq = distance_sq(origin, point);
            if dist_sq <= radius_sq {
                visitor(idx, OrderedFloat(dist_sq));
            }
        }
    }

    fn len(&self) -> usize {
        self.positions.len()
    }
}

/// Uniform grid index bucketing points into square cells.
///
/// Candidates gathered from the overlapping cells are sorted by insertion
/// index before visiting, so results match [`LinearScanIndex`] exactly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UniformGridIndex {
    /// Edge length of each grid cell used for bucketing points.
    pub cell_size: f64,
    #[serde(skip)]
    positions: Vec<(f64, f64)>,
    #[serde(skip)]
    buckets: HashMap<(i64, i64), Vec<usize>>,
}

impl UniformGridIndex {
    /// Create a new uniform grid with the provided cell size.
    #[must_use]
    pub fn new(cell_size: f64) -> Self {
        Self {
            cell_size,
            positions: Vec::new(),
            buckets: HashMap::new(),
        }
    }

    fn cell_of(&self, point: (f64, f64)) -> (i64, i64) {
        (
            (point.0 / self.cell_size).floor() as i64,
            (point.1 / self.cell_size).floor() as i64,
        )
    }

    /// Number of non-empty buckets.
    #[must_use]
    pub fn occupied_cells(&self) -> usize {
        self.buckets.len()
    }
}

impl Default for UniformGridIndex {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl NeighborhoodIndex for UniformGridIndex {
    fn rebuild(&mut self, positions: &[(f64, f64)]) -> Result<(), IndexError> {
        if !(self.cell_size.is_finite() && self.cell_size > 0.0) {
            return Err(IndexError::InvalidConfig("cell_size must be positive"));
        }
        check_finite(positions)?;
        self.positions.clear();
        self.positions.extend_from_slice(positions);
        self.buckets.clear();
        for (idx, &point) in positions.iter().enumerate() {
            let cell = self.cell_of(point);
            self.buckets.entry(cell).or_default().push(idx);
        }
        Ok(())
    }

    fn visit_within(
        &self,
        origin: (f64, f64),
        radius_sq: f64,
        visitor: &mut dyn FnMut(usize, OrderedFloat<f64>),
    ) {
        if self.positions.is_empty() || radius_sq < 0.0 || radius_sq.is_nan() {
            return;
        }
        let radius = radius_sq.sqrt();
        let (min_cx, min_cy) = self.cell_of((origin.0 - radius, origin.1 - radius));
        let (max_cx, max_cy) = self.cell_of((origin.0 + radius, origin.1 + radius));

        // A huge radius would walk more cells than exist; every bucket is a candidate then.
        let span = max_cx
            .saturating_sub(min_cx)
            .saturating_add(1)
            .saturating_mul(max_cy.saturating_sub(min_cy).saturating_add(1));
        let mut hits: Vec<(usize, f64)> = Vec::new();
        if span <= 0 || span as u64 > self.buckets.len() as u64 {
            for bucket in self.buckets.values() {
                for &idx in bucket {
                    let dist_sq = distance_sq(origin, self.positions[idx]);
                    if dist_sq <= radius_sq {
                        hits.push((idx, dist_sq));
                    }
                }
            }
        } else {
            for cx in min_cx..=max_cx {
                for cy in min_cy..=max_cy {
                    let Some(bucket) = self.buckets.get(&(cx, cy)) else {
                        continue;
                    };
                    for &idx in bucket {
                        let dist_sq = distance_sq(origin, self.positions[idx]);
                        if dist_sq <= radius_sq {
                            hits.push((idx, dist_sq));
                        }
                    }
                }
            }
        }

        hits.sort_unstable_by_key(|(idx, _)| *idx);
        for (idx, dist_sq) in hits {
            visitor(idx, OrderedFloat(dist_sq));
        }
    }

    fn len(&self) -> usize {
        self.positions.len()
    }
}
