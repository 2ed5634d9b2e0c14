//! A cache for the radius distance graph of a point cloud.
//!
//! The distance graph is the expensive part of the pipeline, it is computed once for a given radius
//! and served again as long as the radius asked for does not change.

use ndarray::{Array2, ArrayView2};
use num_traits::cast::FromPrimitive;
use num_traits::{Float, NumCast};

use hnsw_rs::prelude::*;

use crate::error::{GeometryError, Result};
use crate::fromhnsw::{HnswIndex, HnswParams};
use crate::neighbours::{radius_neighbors_graph, GraphMode, NeighborIndex};
use crate::tools::matrepr::MatRepr;

/// Owns the point cloud and the neighbour index used to build distance graphs.
///
/// The cached graph is recomputed when there is none or when a radius different from
/// the one used for the cached graph is asked for. Radii are compared by exact equality.
pub struct DistanceMatrix<F, I>
where
    I: NeighborIndex<F>,
{
    points: Array2<F>,
    index: I,
    /// radius of the next computation if none is given
    neighbors_radius: Option<F>,
    /// radius used for the cached graph
    cached_radius: Option<F>,
    distances: Option<MatRepr<F>>,
} // end of struct DistanceMatrix

impl<F, I> DistanceMatrix<F, I>
where
    F: Float,
    I: NeighborIndex<F>,
{
    /// points are the rows of the array, index must have been built on these points.
    pub fn new(points: Array2<F>, index: I, radius: Option<F>) -> Result<Self> {
        if index.get_nb_points() != points.nrows() {
            return Err(GeometryError::invalid(format!(
                "index has {} points, point cloud has {}",
                index.get_nb_points(),
                points.nrows()
            )));
        }
        if let Some(r) = radius {
            check_radius(r)?;
        }
        Ok(DistanceMatrix {
            points,
            index,
            neighbors_radius: radius,
            cached_radius: None,
            distances: None,
        })
    }

    /// radius that will be used if none is given
    pub fn get_neighbors_radius(&self) -> Option<F> {
        self.neighbors_radius
    }

    pub fn get_points(&self) -> ArrayView2<'_, F> {
        self.points.view()
    }

    pub fn get_index(&self) -> &I {
        &self.index
    }

    /// drops the cached graph, the next request recomputes it.
    pub fn invalidate(&mut self) {
        self.cached_radius = None;
        self.distances = None;
    }

    /// radius used when none is given and none was set: 1/dimension of the points.
    pub fn get_default_radius(&self) -> Result<F> {
        let dim = self.points.ncols();
        if dim == 0 {
            return Err(GeometryError::invalid(
                "points of dimension 0, no default neighbors radius",
            ));
        }
        <F as NumCast>::from(dim)
            .map(|d| F::one() / d)
            .ok_or_else(|| GeometryError::invalid("dimension cannot be converted to float"))
    }

    /// returns a copy of the distance graph for radius.
    /// If radius is None the current radius is used, and if there is none the default radius
    /// (see [Self::get_default_radius]).
    pub fn get_distance_matrix(&mut self, radius: Option<F>) -> Result<MatRepr<F>> {
        self.get_distance_matrix_ref(radius).cloned()
    }

    /// same as [Self::get_distance_matrix] without copy.
    pub fn get_distance_matrix_ref(&mut self, radius: Option<F>) -> Result<&MatRepr<F>> {
        let asked = radius.or(self.neighbors_radius);
        let radius = match asked {
            Some(r) => r,
            None => self.get_default_radius()?,
        };
        check_radius(radius)?;
        let recompute = match (&self.distances, self.cached_radius) {
            (Some(_), Some(cached)) => cached != radius,
            _ => true,
        };
        if recompute {
            log::debug!(
                "DistanceMatrix computing graph for radius {:.3e}",
                radius.to_f64().unwrap_or(f64::NAN)
            );
            let graph = radius_neighbors_graph(&self.points.view(), radius, &self.index, GraphMode::Distance)?;
            self.distances = Some(graph);
            self.cached_radius = Some(radius);
        } else {
            log::trace!("DistanceMatrix serving cached graph");
        }
        // the default radius does not become the current radius
        if asked.is_some() {
            self.neighbors_radius = Some(radius);
        }
        self.distances
            .as_ref()
            .ok_or_else(|| GeometryError::invalid("distance graph not computed"))
    } // end of get_distance_matrix_ref
} // end of impl DistanceMatrix

impl<F> DistanceMatrix<F, HnswIndex<F, DistL2>>
where
    F: Float + FromPrimitive + Send + Sync + 'static,
    DistL2: Distance<F>,
{
    /// builds a Hnsw index with L2 distance on the points and its cache.
    pub fn from_hnsw(points: Array2<F>, params: &HnswParams, radius: Option<F>) -> Result<Self> {
        let index = HnswIndex::build(&points.view(), params, DistL2 {});
        DistanceMatrix::new(points, index, radius)
    }
}

fn check_radius<F: Float>(radius: F) -> Result<()> {
    if radius > F::zero() {
        Ok(())
    } else {
        Err(GeometryError::invalid("neighbors radius must be > 0."))
    }
}

//=======================================================================================

#[cfg(test)]
mod tests {

    use super::*;
    use crate::neighbours::BruteForceIndex;
    use ndarray::array;
    use std::cell::Cell;

    fn log_init_test() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    // counts the number of queries to detect recomputations
    struct CountingIndex {
        exact: BruteForceIndex<f64>,
        nb_queries: Cell<usize>,
    }

    impl NeighborIndex<f64> for CountingIndex {
        fn get_nb_points(&self) -> usize {
            self.exact.get_nb_points()
        }
        fn query_radius(&self, point: &[f64], radius: f64) -> anyhow::Result<Vec<(usize, f64)>> {
            self.nb_queries.set(self.nb_queries.get() + 1);
            self.exact.query_radius(point, radius)
        }
    }

    fn counting_cache(radius: Option<f64>) -> DistanceMatrix<f64, CountingIndex> {
        let points = array![[0., 0.], [1., 0.], [0., 1.], [5., 5.]];
        let index = CountingIndex {
            exact: BruteForceIndex::new(&points.view()),
            nb_queries: Cell::new(0),
        };
        DistanceMatrix::new(points, index, radius).unwrap()
    }

    #[test]
    fn test_cache_recompute_on_radius_change() {
        log_init_test();
        let mut cache = counting_cache(Some(1.5));
        let nb_points = 4;
        let g1 = cache.get_distance_matrix(None).unwrap();
        assert_eq!(cache.get_index().nb_queries.get(), nb_points);
        // same radius, explicit or not : cache hit
        let g2 = cache.get_distance_matrix(Some(1.5)).unwrap();
        let _ = cache.get_distance_matrix_ref(None).unwrap();
        assert_eq!(cache.get_index().nb_queries.get(), nb_points);
        assert_eq!(g1.to_dense(f64::INFINITY), g2.to_dense(f64::INFINITY));
        // new radius : recompute and it becomes the current radius
        let g3 = cache.get_distance_matrix(Some(0.5)).unwrap();
        assert_eq!(cache.get_index().nb_queries.get(), 2 * nb_points);
        assert_eq!(cache.get_neighbors_radius(), Some(0.5));
        assert_eq!(g3.get_coo().unwrap().nnz(), nb_points);
        let _ = cache.get_distance_matrix(None).unwrap();
        assert_eq!(cache.get_index().nb_queries.get(), 2 * nb_points);
        // explicit invalidation
        cache.invalidate();
        let _ = cache.get_distance_matrix_ref(None).unwrap();
        assert_eq!(cache.get_index().nb_queries.get(), 3 * nb_points);
    }

    #[test]
    fn test_cache_without_radius() {
        log_init_test();
        let mut cache = counting_cache(None);
        assert!(cache.get_neighbors_radius().is_none());
        // points are in dimension 2, default radius is 0.5 : only self distances
        assert_eq!(cache.get_default_radius().unwrap(), 0.5);
        let graph = cache.get_distance_matrix(None).unwrap();
        assert_eq!(cache.get_index().nb_queries.get(), 4);
        assert_eq!(graph.get_coo().unwrap().nnz(), 4);
        assert!(cache.get_neighbors_radius().is_none());
        // default radius again : cache hit
        let _ = cache.get_distance_matrix_ref(None).unwrap();
        assert_eq!(cache.get_index().nb_queries.get(), 4);
        // the default radius equals the one asked for : cache hit
        let _ = cache.get_distance_matrix(Some(0.5)).unwrap();
        assert_eq!(cache.get_index().nb_queries.get(), 4);
        assert_eq!(cache.get_neighbors_radius(), Some(0.5));
        assert!(cache.get_distance_matrix(Some(-1.)).unwrap_err().is_invalid_parameter());
        let graph = cache.get_distance_matrix(Some(1.5)).unwrap();
        assert_eq!(graph.shape(), [4, 4]);
        assert_eq!(cache.get_points().nrows(), 4);
    }

    #[test]
    fn test_cache_errors_at_construction() {
        log_init_test();
        let points = array![[0., 0.], [1., 0.]];
        let other = array![[0., 0.]];
        let index = BruteForceIndex::new(&other.view());
        let res = DistanceMatrix::new(points.clone(), index, Some(1.));
        assert!(matches!(res, Err(e) if e.is_invalid_parameter()));
        let index = BruteForceIndex::new(&points.view());
        let res = DistanceMatrix::new(points, index, Some(0.));
        assert!(matches!(res, Err(e) if e.is_invalid_parameter()));
        // no default radius in dimension 0
        let empty = Array2::<f64>::zeros((3, 0));
        let index = BruteForceIndex::new(&empty.view());
        let mut cache = DistanceMatrix::new(empty, index, None).unwrap();
        assert!(cache.get_default_radius().unwrap_err().is_invalid_parameter());
        assert!(cache.get_distance_matrix(None).unwrap_err().is_invalid_parameter());
    }

    #[test]
    fn test_from_hnsw() {
        log_init_test();
        let points = Array2::<f32>::from_shape_fn((50, 2), |(i, j)| ((i * 7 + j * 3) % 11) as f32 / 11.);
        let params = HnswParams::default();
        let mut cache = DistanceMatrix::from_hnsw(points, &params, Some(0.3f32)).unwrap();
        assert_eq!(cache.get_index().get_nb_points(), 50);
        let graph = cache.get_distance_matrix_ref(None).unwrap();
        let coo = graph.get_coo().unwrap();
        assert!(coo.values().iter().all(|d| *d <= 0.3));
        assert!(coo.nnz() >= 50);
    }
} // end of mod tests
