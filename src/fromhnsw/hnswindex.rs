//! Approximate radius queries from a Hnsw structure.
//!
//! Hnsw answers k-nearest neighbour queries. A radius query asks for knbn neighbours and
//! doubles knbn as long as all the neighbours returned are within the radius, so the
//! number of points found is only limited by the precision of the Hnsw search.

use num_traits::cast::FromPrimitive;
use num_traits::Float;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

use ndarray::ArrayView2;

use hnsw_rs::prelude::*;

use crate::neighbours::NeighborIndex;

/// Defines parameters to drive ann computations. See the crate [hnsw_rs](https://crates.io/crates/hnsw_rs)
#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct HnswParams {
    /// maximum number of connections within a layer
    max_conn: usize,
    /// width of search in hnsw at construction
    ef_c: usize,
    /// width of search in hnsw at query time, at least the number of neighbours asked for
    ef_search: usize,
    /// number of neighbours asked for in the first search of a radius query
    knbn: usize,
    /// keep pruned edges at insertion (more neighbours found, more memory)
    keeping_pruned: bool,
} // end of struct HnswParams

impl Default for HnswParams {
    fn default() -> Self {
        HnswParams {
            max_conn: 48,
            ef_c: 400,
            ef_search: 64,
            knbn: 16,
            keeping_pruned: true,
        }
    }
}

impl HnswParams {
    pub fn new(max_conn: usize, ef_c: usize, ef_search: usize, knbn: usize) -> Self {
        HnswParams {
            max_conn,
            ef_c,
            ef_search,
            knbn: knbn.max(1),
            keeping_pruned: true,
        }
    }

    pub fn get_max_conn(&self) -> usize {
        self.max_conn
    }

    pub fn get_ef_c(&self) -> usize {
        self.ef_c
    }

    pub fn get_ef_search(&self) -> usize {
        self.ef_search
    }

    pub fn get_knbn(&self) -> usize {
        self.knbn
    }

    pub fn get_keeping_pruned(&self) -> bool {
        self.keeping_pruned
    }

    /// width of search at query time.
    pub fn set_ef_search(&mut self, ef_search: usize) {
        self.ef_search = ef_search;
    }

    /// number of neighbours in the first search, must be >= 1
    pub fn set_knbn(&mut self, knbn: usize) {
        if knbn == 0 {
            log::warn!("not changing knbn, knbn must be >= 1");
            return;
        }
        self.knbn = knbn;
    }

    pub fn set_keeping_pruned(&mut self, keeping_pruned: bool) {
        self.keeping_pruned = keeping_pruned;
    }
} // end impl block HnswParams

//=======================================================================================

/// A [NeighborIndex] built on a [Hnsw] structure.
/// Points are inserted with their rank in the point cloud as DataId.
pub struct HnswIndex<T, D>
where
    T: Clone + Send + Sync + 'static,
    D: Distance<T>,
{
    hnsw: Hnsw<'static, T, D>,
    params: HnswParams,
    nb_points: usize,
} // end of struct HnswIndex

impl<T, D> HnswIndex<T, D>
where
    T: Clone + Send + Sync + 'static,
    D: Distance<T> + Send + Sync,
{
    /// insert the rows of points in a Hnsw structure using distance.
    pub fn build(points: &ArrayView2<T>, params: &HnswParams, distance: D) -> Self {
        let nb_points = points.nrows();
        log::debug!(
            "HnswIndex::build nb points : {}, max_conn : {}, ef_c : {}",
            nb_points,
            params.max_conn,
            params.ef_c
        );
        let nb_layer = 16.min((nb_points as f32).ln().trunc() as usize).max(1);
        let mut hnsw = Hnsw::<T, D>::new(params.max_conn, nb_points.max(1), nb_layer, params.ef_c, distance);
        hnsw.set_keeping_pruned(params.keeping_pruned);
        //
        let data: Vec<Vec<T>> = points.outer_iter().map(|row| row.to_vec()).collect();
        let data_with_id: Vec<(&Vec<T>, usize)> = data.iter().zip(0..data.len()).collect();
        hnsw.parallel_insert(&data_with_id);
        log::info!("HnswIndex::build inserted {} points", hnsw.get_nb_point());
        //
        HnswIndex {
            hnsw,
            params: *params,
            nb_points,
        }
    } // end of build

    pub fn get_hnsw(&self) -> &Hnsw<'static, T, D> {
        &self.hnsw
    }

    pub fn get_params(&self) -> &HnswParams {
        &self.params
    }
} // end of impl block HnswIndex

impl<T, D> NeighborIndex<T> for HnswIndex<T, D>
where
    T: Float + FromPrimitive + Send + Sync + 'static,
    D: Distance<T> + Send + Sync,
{
    fn get_nb_points(&self) -> usize {
        self.nb_points
    }

    fn query_radius(&self, point: &[T], radius: T) -> anyhow::Result<Vec<(usize, T)>> {
        if self.nb_points == 0 {
            return Ok(Vec::new());
        }
        let mut knbn = self.params.knbn.min(self.nb_points);
        loop {
            let ef = self.params.ef_search.max(knbn);
            let neighbours = self.hnsw.search(point, knbn, ef);
            let nb_found = neighbours.len();
            let mut within = Vec::<(usize, T)>::with_capacity(nb_found);
            for n in &neighbours {
                let dist = T::from_f32(n.distance)
                    .ok_or_else(|| anyhow!("cannot convert distance {:.3e}", n.distance))?;
                if dist <= radius {
                    within.push((n.d_id, dist));
                }
            }
            // stop as soon as the search reached beyond radius or got all it could
            if within.len() < nb_found || nb_found < knbn || knbn >= self.nb_points {
                log::trace!(
                    "query_radius got {} neighbours with knbn {}",
                    within.len(),
                    knbn
                );
                return Ok(within);
            }
            knbn = (2 * knbn).min(self.nb_points);
        }
    } // end of query_radius
} // end of impl NeighborIndex for HnswIndex

//=======================================================================================

#[cfg(test)]
mod tests {

    use super::*;
    use crate::neighbours::BruteForceIndex;
    use ndarray::Array2;
    use rand::distributions::Uniform;
    use rand::prelude::*;
    use rand_xoshiro::Xoshiro256PlusPlus;

    fn log_init_test() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn gen_rand_data_f32(nb_elem: usize, dim: usize) -> Array2<f32> {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(4664397);
        let unif = Uniform::<f32>::new(0., 1.);
        Array2::from_shape_fn((nb_elem, dim), |_| rng.sample(unif))
    }

    #[test]
    fn test_hnsw_radius_query() {
        log_init_test();
        //
        let nb_elem = 500;
        let dim = 3;
        let data = gen_rand_data_f32(nb_elem, dim);
        let params = HnswParams::new(24, 200, 64, 4);
        let index = HnswIndex::build(&data.view(), &params, DistL2 {});
        assert_eq!(index.get_nb_points(), nb_elem);
        let exact = BruteForceIndex::new(&data.view());
        //
        let radius = 0.2f32;
        let mut nb_exact = 0;
        let mut nb_approx = 0;
        for i in (0..nb_elem).step_by(25) {
            let point = data.row(i).to_vec();
            let approx = index.query_radius(&point, radius).unwrap();
            let truth = exact.query_radius(&point, radius).unwrap();
            // hnsw distances may round inside the radius, bound by a slightly larger exact query
            let upper = exact.query_radius(&point, radius + 1.0e-5).unwrap();
            assert!(approx.len() <= upper.len());
            // all points returned are within radius and self is found
            assert!(approx.iter().all(|(_, d)| *d <= radius));
            assert!(approx.iter().any(|(j, d)| *j == i && *d <= 1.0e-5));
            // knbn = 4 is much smaller than the neighbourhood size, the doubling must have run
            nb_exact += truth.len();
            nb_approx += approx.len();
        }
        log::info!("exact : {}, approx : {}", nb_exact, nb_approx);
        assert!(nb_approx as f64 >= 0.8 * nb_exact as f64);
    } // end of test_hnsw_radius_query

    #[test]
    fn test_hnsw_params() {
        let mut params = HnswParams::default();
        params.set_knbn(0);
        assert_eq!(params.get_knbn(), 16);
        params.set_knbn(8);
        params.set_ef_search(100);
        assert_eq!(params.get_knbn(), 8);
        assert_eq!(params.get_ef_search(), 100);
        assert!(params.get_keeping_pruned());
    }
} // end of mod tests
