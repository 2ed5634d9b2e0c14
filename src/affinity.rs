//! Heat kernel affinity from a distance graph.
//!
//! A note on symmetrization.
//!
//! The distance graph produced with an approximate index is not guaranteed to be symmetric,
//! so the affinity matrix is symmetrized by default, A <- (A + A^t)/2.
//! In sparse mode this is a sparse addition which eliminates the entries that are 0.,
//! so an explicit zero stored in the sparse affinity does not survive symmetrization.
//! With the heat kernel this only concerns affinities that underflowed to 0.
//! In dense mode symmetrization is an exact elementwise mean and nothing is lost.
//!
//! The laplacian computation ([graph_laplacian](crate::graphlaplace::graph_laplacian)) on the contrary
//! does **not** symmetrize by default.

use num_traits::{Float, NumCast};
use serde::{Deserialize, Serialize};

use crate::error::{GeometryError, Result};
use crate::tools::matrepr::{GraphOps, MatMode, MatRepr};

/// parameters of the affinity computation
#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct AffinityParams {
    /// kernel width, usually the neighbourhood radius used to build the distance graph
    radius: f64,
    /// symmetrize the affinity. default to true
    symmetrize: bool,
}

impl AffinityParams {
    pub fn new(radius: f64) -> Self {
        AffinityParams {
            radius,
            symmetrize: true,
        }
    }

    pub fn get_radius(&self) -> f64 {
        self.radius
    }

    pub fn get_symmetrize(&self) -> bool {
        self.symmetrize
    }

    pub fn set_symmetrize(&mut self, symmetrize: bool) {
        self.symmetrize = symmetrize;
    }
} // end of impl AffinityParams

/// Computes the affinity exp(-d²/radius²) for every (finite) stored distance d.
///
/// - sparse input: values are transformed in place on a copy, the sparsity pattern is kept
///   (before symmetrization).
/// - dense input: missing distances are expected to be +infinity and get affinity 0.
///
/// The diagonal of the result is 1. as the distance of a point to itself is 0.
pub fn affinity_matrix<F>(distances: &MatRepr<F>, radius: F, symmetrize: bool) -> Result<MatRepr<F>>
where
    F: Float,
{
    if !(radius > F::zero()) {
        return Err(GeometryError::invalid("neighbors radius must be > 0."));
    }
    if !distances.is_square() {
        return Err(GeometryError::invalid(format!(
            "distance matrix must be square, got shape {:?}",
            distances.shape()
        )));
    }
    log::debug!(
        "affinity_matrix radius : {:.3e}, symmetrize : {}, sparse : {}",
        radius.to_f64().unwrap_or(f64::NAN),
        symmetrize,
        distances.is_sparse()
    );
    //
    let epsil = radius * radius;
    let kernel = |d: F| (-(d * d) / epsil).exp();
    let mut affinity = distances.clone();
    match affinity.get_data_mut() {
        MatMode::FULL(mat) => {
            mat.map_values(kernel);
            if symmetrize {
                mat.symmetrize();
            }
        }
        MatMode::COO(coo) => {
            mat_values_check(coo.values());
            coo.map_values(kernel);
            if symmetrize {
                let nnz_before = coo.nnz();
                coo.symmetrize();
                log::trace!(
                    "sparse symmetrization nnz : {} -> {}",
                    nnz_before,
                    coo.nnz()
                );
            }
        }
    }
    Ok(affinity)
} // end of affinity_matrix

/// same as [affinity_matrix] with parameters gathered in [AffinityParams]
pub fn affinity_with_params<F>(distances: &MatRepr<F>, params: &AffinityParams) -> Result<MatRepr<F>>
where
    F: Float,
{
    let radius = <F as NumCast>::from(params.radius)
        .ok_or_else(|| GeometryError::invalid("radius cannot be converted to float"))?;
    affinity_matrix(distances, radius, params.symmetrize)
}

// stored sparse distances should be finite
fn mat_values_check<F: Float>(values: &[F]) {
    let nb_infinite = values.iter().filter(|v| !v.is_finite()).count();
    if nb_infinite > 0 {
        log::warn!(
            "affinity_matrix : {} stored distances are not finite, their affinity will be 0 or NaN",
            nb_infinite
        );
    }
}

//========================================================================================

#[cfg(test)]
mod tests {

    use super::*;
    use crate::neighbours::{radius_neighbors_graph, BruteForceIndex, GraphMode};
    use crate::tools::coo::CooMat;
    use ndarray::{array, Array2};

    fn log_init_test() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    // an asymmetric distance graph : 0 -> 1 seen, 1 -> 0 not seen
    fn asymmetric_distances() -> CooMat<f64> {
        CooMat::from_triplets(
            (3, 3),
            vec![0, 1, 2, 0, 1, 2],
            vec![0, 1, 2, 1, 2, 1],
            vec![0., 0., 0., 0.5, 1., 1.],
        )
        .unwrap()
    }

    #[test]
    fn test_affinity_values() {
        log_init_test();
        let dist = MatRepr::from_coomat(asymmetric_distances());
        let radius = 2.;
        let aff = affinity_matrix(&dist, radius, false).unwrap();
        let coo = aff.get_coo().unwrap();
        // pattern kept
        assert_eq!(coo.nnz(), 6);
        assert_eq!(coo.get(0, 0), Some(1.));
        let expected = (-0.25f64 / 4.).exp();
        assert!((coo.get(0, 1).unwrap() - expected).abs() < 1.0e-15);
        assert!(coo.values().iter().all(|v| *v > 0. && *v <= 1.));
        assert!(!aff.is_symmetric(1.0e-12));
    }

    #[test]
    fn test_affinity_symmetrized() {
        log_init_test();
        let sparse = MatRepr::from_coomat(asymmetric_distances());
        let dense = MatRepr::from_array2(sparse.to_dense(f64::INFINITY));
        let radius = 1.;
        let aff_s = affinity_matrix(&sparse, radius, true).unwrap();
        let aff_d = affinity_matrix(&dense, radius, true).unwrap();
        assert!(aff_s.is_sparse());
        assert!(!aff_d.is_sparse());
        assert!(aff_s.is_symmetric(1.0e-15));
        assert!(aff_d.is_symmetric(1.0e-15));
        // both backends agree
        let d_s = aff_s.to_dense(0.);
        let d_d = aff_d.to_dense(0.);
        for (a, b) in d_s.iter().zip(d_d.iter()) {
            assert!((a - b).abs() < 1.0e-12);
        }
        // diagonal is 1
        assert_eq!(aff_d.diagonal().to_vec(), vec![1., 1., 1.]);
        // one sided edge gets half its affinity
        assert!((d_d[[1, 0]] - 0.5 * (-0.25f64).exp()).abs() < 1.0e-15);
    }

    // an affinity which underflows to 0 is an explicit entry before symmetrization,
    // and is removed by the sparse symmetrization. Dense keeps it (as a 0).
    #[test]
    fn test_sparse_symmetrization_drops_zeros() {
        log_init_test();
        let coo = CooMat::from_triplets((2, 2), vec![0, 1, 0], vec![0, 1, 1], vec![0., 0., 1.0e3]).unwrap();
        let dist = MatRepr::from_coomat(coo);
        let aff = affinity_matrix(&dist, 1., false).unwrap();
        assert_eq!(aff.get_coo().unwrap().get(0, 1), Some(0.));
        let aff = affinity_matrix(&dist, 1., true).unwrap();
        let coo = aff.get_coo().unwrap();
        assert_eq!(coo.get(0, 1), None);
        assert_eq!(coo.get(1, 0), None);
        assert_eq!(coo.nnz(), 2);
    }

    #[test]
    fn test_affinity_errors() {
        log_init_test();
        let dist = MatRepr::from_coomat(asymmetric_distances());
        assert!(affinity_matrix(&dist, 0., true).unwrap_err().is_invalid_parameter());
        assert!(affinity_matrix(&dist, -2., true).unwrap_err().is_invalid_parameter());
        let rect = MatRepr::from_array2(Array2::<f64>::zeros((3, 4)));
        assert!(affinity_matrix(&rect, 1., true).unwrap_err().is_invalid_parameter());
        let params = AffinityParams::new(-1.);
        assert!(affinity_with_params(&dist, &params).unwrap_err().is_invalid_parameter());
    }

    #[test]
    fn test_affinity_from_points() {
        log_init_test();
        let points = array![[0., 0.], [0.5, 0.], [3., 0.]];
        let index = BruteForceIndex::new(&points.view());
        let radius = 1.;
        let dist = radius_neighbors_graph(&points.view(), radius, &index, GraphMode::Distance).unwrap();
        let mut params = AffinityParams::new(radius);
        assert!(params.get_symmetrize());
        let aff = affinity_with_params(&dist, &params).unwrap();
        assert!(aff.is_symmetric(1.0e-15));
        // isolated point 2 only has its self affinity
        assert_eq!(aff.row_sums()[2], 1.);
        params.set_symmetrize(false);
        let aff_ns = affinity_with_params(&dist, &params).unwrap();
        assert_eq!(aff_ns.get_coo().unwrap().nnz(), dist.get_coo().unwrap().nnz());
    }
} // end of mod tests
