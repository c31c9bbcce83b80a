//! Radius-bounded neighbor search over agents and data points.
//!
//! Agent queries scan the population every time because positions change after
//! every move. The dataset never moves, so it is indexed once per run.

use faso_index::{LinearScanIndex, NeighborhoodIndex, UniformGridIndex};

use crate::SwarmError;
use crate::config::DataIndexKind;
use crate::geometry::Position;
use crate::model::{Agent, DataPoint, Dataset};

/// Neighborhood queries bound to one dataset.
pub struct SpatialQuery {
    data: Dataset,
    index: Box<dyn NeighborhoodIndex + Send + Sync>,
}

impl std::fmt::Debug for SpatialQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpatialQuery")
            .field("data_len", &self.data.len())
            .field("indexed", &self.index.len())
            .finish()
    }
}

impl SpatialQuery {
    /// Index `data` with the requested strategy; grid cells are `cell_size` wide.
    pub fn new(data: Dataset, kind: DataIndexKind, cell_size: f64) -> Result<Self, SwarmError> {
        let positions: Vec<(f64, f64)> = data
            .points()
            .iter()
            .map(|p| p.position().as_tuple())
            .collect();
        let mut index: Box<dyn NeighborhoodIndex + Send + Sync> = match kind {
            DataIndexKind::LinearScan => Box::new(LinearScanIndex::new()),
            DataIndexKind::UniformGrid => Box::new(UniformGridIndex::new(cell_size)),
        };
        index.rebuild(&positions)?;
        Ok(Self { data, index })
    }

    #[must_use]
    pub fn dataset(&self) -> &Dataset {
        &self.data
    }

    #[must_use]
    pub fn data_len(&self) -> usize {
        self.data.len()
    }

    /// Indices of every other agent within `radius` of `agents[idx]`, in population order.
    #[must_use]
    pub fn neighbors(&self, agents: &[Agent], idx: usize, radius: f64) -> Vec<usize> {
        let origin = agents[idx].position;
        let radius_sq = radius * radius;
        agents
            .iter()
            .enumerate()
            .filter(|&(other, agent)| {
                other != idx && origin.distance_sq(agent.position) <= radius_sq
            })
            .map(|(other, _)| other)
            .collect()
    }

    /// Number of other agents within `radius` of `agents[idx]`.
    #[must_use]
    pub fn count_neighbors(&self, agents: &[Agent], idx: usize, radius: f64) -> usize {
        let origin = agents[idx].position;
        let radius_sq = radius * radius;
        agents
            .iter()
            .enumerate()
            .filter(|&(other, agent)| {
                other != idx && origin.distance_sq(agent.position) <= radius_sq
            })
            .count()
    }

    /// Data points within `radius` of `origin`, in dataset order.
    #[must_use]
    pub fn data_within(&self, origin: Position, radius: f64) -> Vec<&DataPoint> {
        let points = self.data.points();
        self.index
            .collect_within(origin.as_tuple(), radius * radius)
            .into_iter()
            .map(|idx| &points[idx])
            .collect()
    }

    /// Number of data points within `radius` of `origin`.
    #[must_use]
    pub fn count_data_within(&self, origin: Position, radius: f64) -> usize {
        self.index.count_within(origin.as_tuple(), radius * radius)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent_at(x: f64, y: f64) -> Agent {
        Agent::spawn(Position::new(x, y), 1.0, 0.2)
    }

    #[test]
    fn neighbors_exclude_self_and_include_boundary() {
        let agents = vec![
            agent_at(0.0, 0.0),
            agent_at(1.0, 0.0),
            agent_at(0.0, 2.0),
            agent_at(0.0, 0.0),
        ];
        let query = SpatialQuery::new(Dataset::empty(), DataIndexKind::LinearScan, 1.0)
            .expect("query");
        assert_eq!(query.neighbors(&agents, 0, 1.0), vec![1, 3]);
        assert_eq!(query.count_neighbors(&agents, 0, 1.0), 2);
        assert_eq!(query.neighbors(&agents, 2, 0.5), Vec::<usize>::new());
    }

    #[test]
    fn data_queries_agree_across_index_kinds() {
        let pairs: Vec<(f64, f64)> = (0..60)
            .map(|i| ((i % 10) as f64 * 0.7, (i / 10) as f64 * 1.3))
            .collect();
        let data = Dataset::from_pairs(&pairs);
        let linear =
            SpatialQuery::new(data.clone(), DataIndexKind::LinearScan, 1.0).expect("linear");
        let grid = SpatialQuery::new(data, DataIndexKind::UniformGrid, 0.9).expect("grid");
        for origin in [Position::new(2.0, 2.0), Position::new(-1.0, 0.0)] {
            for radius in [0.1, 1.0, 2.5, 50.0] {
                assert_eq!(
                    linear.data_within(origin, radius),
                    grid.data_within(origin, radius)
                );
                assert_eq!(
                    linear.count_data_within(origin, radius),
                    grid.count_data_within(origin, radius)
                );
            }
        }
    }

    #[test]
    fn grid_with_bad_cell_size_is_an_error() {
        let data = Dataset::from_pairs(&[(0.0, 0.0)]);
        let err = SpatialQuery::new(data, DataIndexKind::UniformGrid, 0.0).unwrap_err();
        assert!(matches!(err, SwarmError::Index(_)));
    }
}
