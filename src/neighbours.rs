//! Construction of the (sparse) radius neighbourhood graph of a point cloud.
//!
//! The neighbour search itself is delegated to a [NeighborIndex]. The crate provides
//! an approximate index built on hnsw_rs ([HnswIndex](crate::fromhnsw::HnswIndex))
//! and an exact brute force index ([BruteForceIndex]) for small data or checks.
//!
//! With an approximate index the distance graph is **not guaranteed symmetric**:
//! j can be found in the neighbourhood of i but not i in the neighbourhood of j.
//! The graph is not symmetrized here, see [affinity_matrix](crate::affinity::affinity_matrix).

use ndarray::{ArrayView1, ArrayView2};
use num_traits::Float;
use serde::{Deserialize, Serialize};

use crate::error::{GeometryError, Result};
use crate::tools::{coo::CooMat, matrepr::MatRepr};

/// The service we need from a neighbour search structure.
///
/// The index is built by the implementor (see [HnswIndex::build](crate::fromhnsw::HnswIndex::build))
/// over the points it will be queried with, points being identified by their rank.
pub trait NeighborIndex<F> {
    /// number of points indexed
    fn get_nb_points(&self) -> usize;

    /// returns (rank, distance) of points (approximately) within radius of point.
    /// The point itself is reported with distance 0 if it is in the index.
    fn query_radius(&self, point: &[F], radius: F) -> anyhow::Result<Vec<(usize, F)>>;
} // end of trait NeighborIndex

/// What is stored in the neighbourhood graph
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum GraphMode {
    /// entry (i,j) is the distance from i to j
    #[default]
    Distance,
    /// entry (i,j) is 1. for each neighbour j of i
    Connectivity,
}

//=======================================================================================

/// Exact neighbour search by scanning all points. Euclidean distance.
pub struct BruteForceIndex<F> {
    points: ndarray::Array2<F>,
}

impl<F> BruteForceIndex<F>
where
    F: Float,
{
    /// points are rows of the array
    pub fn new(points: &ArrayView2<F>) -> Self {
        log::debug!(
            "BruteForceIndex::new nb points : {}, dim : {}",
            points.nrows(),
            points.ncols()
        );
        BruteForceIndex {
            points: points.to_owned(),
        }
    }
} // end of impl BruteForceIndex

impl<F> NeighborIndex<F> for BruteForceIndex<F>
where
    F: Float,
{
    fn get_nb_points(&self) -> usize {
        self.points.nrows()
    }

    fn query_radius(&self, point: &[F], radius: F) -> anyhow::Result<Vec<(usize, F)>> {
        if point.len() != self.points.ncols() {
            return Err(anyhow::anyhow!(
                "query point has dimension {}, index has dimension {}",
                point.len(),
                self.points.ncols()
            ));
        }
        let query = ArrayView1::from(point);
        let neighbours = self
            .points
            .outer_iter()
            .enumerate()
            .filter_map(|(j, row)| {
                let dist = row
                    .iter()
                    .zip(query.iter())
                    .fold(F::zero(), |acc, (a, b)| acc + (*a - *b) * (*a - *b))
                    .sqrt();
                if dist <= radius {
                    Some((j, dist))
                } else {
                    None
                }
            })
            .collect();
        Ok(neighbours)
    } // end of query_radius
} // end of impl NeighborIndex for BruteForceIndex

//=======================================================================================

/// Builds the sparse graph of points within radius of each other.
///
/// For each point i the index is queried once, and the (j, distance) pairs are accumulated
/// in a global triplet list giving a sparse N x N matrix in [GraphMode::Distance] mode
/// (or a 0/1 matrix in [GraphMode::Connectivity] mode).
///  - the self distance 0. is kept as an explicit entry (if the index reports it).
///  - missing entries must be understood as **infinite** distances, not 0.
///  - the result is not symmetrized.
///
/// Neighbours returned beyond radius by an approximate index are dropped.
pub fn radius_neighbors_graph<F, I>(
    points: &ArrayView2<F>,
    radius: F,
    index: &I,
    mode: GraphMode,
) -> Result<MatRepr<F>>
where
    F: Float,
    I: NeighborIndex<F> + ?Sized,
{
    if !(radius > F::zero()) {
        return Err(GeometryError::invalid("neighbors radius must be > 0."));
    }
    let nb_points = points.nrows();
    if index.get_nb_points() != nb_points {
        return Err(GeometryError::invalid(format!(
            "index has {} points, point cloud has {}",
            index.get_nb_points(),
            nb_points
        )));
    }
    log::debug!(
        "radius_neighbors_graph nb points : {}, radius : {:.3e}, mode : {:?}",
        nb_points,
        radius.to_f64().unwrap_or(f64::NAN),
        mode
    );
    //
    let mut graph = CooMat::<F>::new((nb_points, nb_points));
    let mut nb_beyond = 0usize;
    let mut nb_isolated = 0usize;
    let mut point = Vec::<F>::with_capacity(points.ncols());
    for (i, row) in points.outer_iter().enumerate() {
        point.clear();
        point.extend(row.iter().copied());
        let neighbours = index.query_radius(&point, radius)?;
        if neighbours.is_empty() {
            nb_isolated += 1;
        }
        for (j, dist) in neighbours {
            if j >= nb_points {
                return Err(GeometryError::invalid(format!(
                    "index returned rank {} for a cloud of {} points",
                    j, nb_points
                )));
            }
            if dist > radius {
                nb_beyond += 1;
                continue;
            }
            let value = match mode {
                GraphMode::Distance => dist,
                GraphMode::Connectivity => F::one(),
            };
            graph.push_triplet(i, j, value);
        }
    }
    if nb_beyond > 0 {
        log::trace!("dropped {} neighbours beyond radius", nb_beyond);
    }
    if nb_isolated > 0 {
        log::warn!(
            "radius_neighbors_graph : {} points without any neighbour",
            nb_isolated
        );
    }
    log::info!(
        "radius_neighbors_graph mean number of neighbours : {:.3e}",
        graph.nnz() as f64 / nb_points.max(1) as f64
    );
    //
    Ok(MatRepr::from_coomat(graph))
} // end of radius_neighbors_graph

//=======================================================================================

// end of mod tests
