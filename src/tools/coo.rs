//! A sparse matrix stored as a list of triplets (row, col, value).
//!
//! All sparse arithmetic of the crate is done on this representation: division of rows or columns
//! by a vector and modification of the diagonal only need to walk the triplets, whatever the
//! nonzero pattern is. Conversion to and from the [sprs] formats is provided for interoperability.
//!
//! Entries are **not** required to be unique nor sorted. Duplicated entries add up,
//! as in a coo matrix. Explicit zero values are kept, except by [CooMat::compact].

use ndarray::{Array1, Array2, ArrayView2};
use num_traits::Float;
use sprs::{CsMat, TriMat, TriMatBase};

use crate::error::{GeometryError, Result};

/// sparse matrix as a list of (row, col, value)
#[derive(Clone, Debug)]
pub struct CooMat<F> {
    nbrow: usize,
    nbcol: usize,
    rows: Vec<usize>,
    cols: Vec<usize>,
    values: Vec<F>,
} // end of struct CooMat

impl<F> CooMat<F> {
    /// allocates an empty matrix of shape (nbrow, nbcol)
    pub fn new(shape: (usize, usize)) -> Self {
        CooMat::with_capacity(shape, 0)
    }

    pub fn with_capacity(shape: (usize, usize), capacity: usize) -> Self {
        CooMat {
            nbrow: shape.0,
            nbcol: shape.1,
            rows: Vec::<usize>::with_capacity(capacity),
            cols: Vec::<usize>::with_capacity(capacity),
            values: Vec::<F>::with_capacity(capacity),
        }
    }

    /// builds a matrix from three vectors of the same length. Indexes are checked against shape.
    pub fn from_triplets(
        shape: (usize, usize),
        rows: Vec<usize>,
        cols: Vec<usize>,
        values: Vec<F>,
    ) -> Result<Self> {
        if rows.len() != cols.len() || rows.len() != values.len() {
            return Err(GeometryError::invalid(format!(
                "triplets of unequal lengths, rows : {}, cols : {}, values : {}",
                rows.len(),
                cols.len(),
                values.len()
            )));
        }
        if let Some(r) = rows.iter().find(|&&r| r >= shape.0) {
            return Err(GeometryError::invalid(format!(
                "row index {} out of shape {:?}",
                r, shape
            )));
        }
        if let Some(c) = cols.iter().find(|&&c| c >= shape.1) {
            return Err(GeometryError::invalid(format!(
                "col index {} out of shape {:?}",
                c, shape
            )));
        }
        Ok(CooMat {
            nbrow: shape.0,
            nbcol: shape.1,
            rows,
            cols,
            values,
        })
    } // end of from_triplets

    /// append an entry. (row, col) is checked against shape.
    pub fn add_triplet(&mut self, row: usize, col: usize, value: F) -> Result<()> {
        if row >= self.nbrow || col >= self.nbcol {
            return Err(GeometryError::invalid(format!(
                "triplet ({}, {}) out of shape ({}, {})",
                row, col, self.nbrow, self.nbcol
            )));
        }
        self.push_triplet(row, col, value);
        Ok(())
    }

    // for callers which already know (row, col) is in shape
    pub(crate) fn push_triplet(&mut self, row: usize, col: usize, value: F) {
        debug_assert!(row < self.nbrow && col < self.nbcol);
        self.rows.push(row);
        self.cols.push(col);
        self.values.push(value);
    }

    /// returns (nbrow, nbcol)
    pub fn shape(&self) -> (usize, usize) {
        (self.nbrow, self.nbcol)
    }

    /// number of stored entries, explicit zeros and duplicates included
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    pub fn cols(&self) -> &[usize] {
        &self.cols
    }

    pub fn values(&self) -> &[F] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [F] {
        &mut self.values
    }

    /// iterates on stored entries as (row, col, &value)
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, &F)> {
        self.rows
            .iter()
            .zip(self.cols.iter())
            .zip(self.values.iter())
            .map(|((r, c), v)| (*r, *c, v))
    }
} // end of impl block CooMat

impl<F> CooMat<F>
where
    F: Float,
{
    /// return a transposed copy. Only row and column indexes are swapped.
    pub fn transpose(&self) -> Self {
        CooMat {
            nbrow: self.nbcol,
            nbcol: self.nbrow,
            rows: self.cols.clone(),
            cols: self.rows.clone(),
            values: self.values.clone(),
        }
    }

    /// value at (row, col), duplicates summed. None if there is no stored entry.
    /// This is a scan of all entries, it is meant for checks not for computations.
    pub fn get(&self, row: usize, col: usize) -> Option<F> {
        let mut found: Option<F> = None;
        for (r, c, v) in self.iter() {
            if r == row && c == col {
                found = Some(found.map_or(*v, |acc| acc + *v));
            }
        }
        found
    }

    /// Sort entries by (row, col), sum duplicates and **remove entries whose value is 0.**
    ///
    /// This goes through the csr conversion of sprs, as a sparse addition does,
    /// so a legitimate stored zero (a null distance for example) does not survive this call.
    pub fn compact(&mut self) {
        let csr = self.to_csr();
        let mut compacted = CooMat::<F>::with_capacity(self.shape(), csr.nnz());
        for (v, (i, j)) in csr.iter() {
            if *v != F::zero() {
                compacted.push_triplet(i, j, *v);
            }
        }
        log::trace!(
            "CooMat::compact nnz {} -> {}",
            self.nnz(),
            compacted.nnz()
        );
        *self = compacted;
    } // end of compact

    /// Dense copy of the matrix. Positions without any stored entry are set to fill,
    /// duplicated entries are summed.
    pub fn to_dense(&self, fill: F) -> Array2<F> {
        let mut dense = Array2::<F>::from_elem((self.nbrow, self.nbcol), fill);
        let mut written = Array2::<bool>::from_elem((self.nbrow, self.nbcol), false);
        for (r, c, v) in self.iter() {
            if written[[r, c]] {
                dense[[r, c]] = dense[[r, c]] + *v;
            } else {
                dense[[r, c]] = *v;
                written[[r, c]] = true;
            }
        }
        dense
    } // end of to_dense

    /// Sparse copy of a dense matrix, keeping entries for which keep returns true.
    pub fn from_dense<K>(mat: &ArrayView2<F>, keep: K) -> Self
    where
        K: Fn(F) -> bool,
    {
        let (nbrow, nbcol) = mat.dim();
        let mut coo = CooMat::<F>::new((nbrow, nbcol));
        for ((i, j), v) in mat.indexed_iter() {
            if keep(*v) {
                coo.push_triplet(i, j, *v);
            }
        }
        coo
    }

    /// row sums, duplicates included
    pub fn sum_rows(&self) -> Array1<F> {
        let mut sums = Array1::<F>::zeros(self.nbrow);
        for (r, _, v) in self.iter() {
            sums[r] = sums[r] + *v;
        }
        sums
    }

    /// import from a sprs compressed matrix (csr or csc). Stored zeros are kept.
    pub fn from_csmat(csmat: &CsMat<F>) -> Self {
        let mut coo = CooMat::<F>::with_capacity(csmat.shape(), csmat.nnz());
        for (v, (i, j)) in csmat.iter() {
            coo.push_triplet(i, j, *v);
        }
        coo
    }

    /// import from a sprs triplet matrix. Stored zeros are kept.
    pub fn from_trimat(trimat: &TriMat<F>) -> Self {
        let mut coo = CooMat::<F>::with_capacity(trimat.shape(), trimat.nnz());
        for (v, (i, j)) in trimat.triplet_iter() {
            coo.push_triplet(i, j, *v);
        }
        coo
    }

    /// export to a sprs triplet matrix
    pub fn to_trimat(&self) -> TriMat<F> {
        TriMatBase::<Vec<usize>, Vec<F>>::from_triplets(
            (self.nbrow, self.nbcol),
            self.rows.clone(),
            self.cols.clone(),
            self.values.clone(),
        )
    }

    /// export to a sprs csr matrix, duplicates are summed
    pub fn to_csr(&self) -> CsMat<F> {
        self.to_trimat().to_csr()
    }
} // end of impl block CooMat

//========================================================================================

#[cfg(test)]
mod tests {

    use super::*;

    fn log_init_test() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn small_coo() -> CooMat<f64> {
        CooMat::from_triplets(
            (3, 3),
            vec![0, 0, 1, 2, 0],
            vec![0, 1, 2, 1, 1],
            vec![0., 1., 2., 3., 0.5],
        )
        .unwrap()
    }

    #[test]
    fn test_from_triplets_checks() {
        log_init_test();
        let res = CooMat::<f64>::from_triplets((2, 2), vec![0, 2], vec![0, 1], vec![1., 1.]);
        assert!(res.unwrap_err().is_invalid_parameter());
        let res = CooMat::<f64>::from_triplets((2, 2), vec![0], vec![0, 1], vec![1., 1.]);
        assert!(res.unwrap_err().is_invalid_parameter());
    }

    #[test]
    fn test_add_triplet_checks() {
        log_init_test();
        let mut coo = CooMat::<f64>::new((2, 3));
        assert!(coo.add_triplet(1, 2, 1.).is_ok());
        assert!(coo.add_triplet(2, 0, 1.).unwrap_err().is_invalid_parameter());
        assert!(coo.add_triplet(0, 3, 1.).unwrap_err().is_invalid_parameter());
        assert_eq!(coo.nnz(), 1);
    }

    #[test]
    fn test_duplicates_and_zeros() {
        log_init_test();
        let coo = small_coo();
        assert_eq!(coo.nnz(), 5);
        // explicit zero is an entry
        assert_eq!(coo.get(0, 0), Some(0.));
        assert_eq!(coo.get(1, 1), None);
        assert_eq!(coo.get(0, 1), Some(1.5));
        let dense = coo.to_dense(f64::INFINITY);
        assert_eq!(dense[[0, 0]], 0.);
        assert_eq!(dense[[0, 1]], 1.5);
        assert!(dense[[1, 1]].is_infinite());
        let sums = coo.sum_rows();
        assert_eq!(sums.to_vec(), vec![1.5, 2., 3.]);
    }

    #[test]
    fn test_compact_removes_zeros() {
        log_init_test();
        let mut coo = small_coo();
        coo.compact();
        assert_eq!(coo.nnz(), 3);
        assert_eq!(coo.get(0, 0), None);
        assert_eq!(coo.rows(), &[0, 1, 2]);
        assert_eq!(coo.cols(), &[1, 2, 1]);
        assert_eq!(coo.values(), &[1.5, 2., 3.]);
    }

    #[test]
    fn test_sprs_exchange() {
        log_init_test();
        let coo = small_coo();
        let csr = coo.to_csr();
        assert!(csr.is_csr());
        assert_eq!(csr.shape(), (3, 3));
        let back = CooMat::from_csmat(&csr);
        let d1 = coo.to_dense(0.);
        let d2 = back.to_dense(0.);
        assert_eq!(d1, d2);
        let tri = coo.to_trimat();
        let back = CooMat::from_trimat(&tri);
        assert_eq!(back.nnz(), coo.nnz());
        assert_eq!(back.to_dense(0.), d1);
    }

    #[test]
    fn test_transpose() {
        let coo = small_coo();
        let t = coo.transpose();
        assert_eq!(t.get(2, 1), Some(2.));
        assert_eq!(t.get(1, 2), Some(3.));
        assert_eq!(t.to_dense(0.), coo.to_dense(0.).t().to_owned());
    }
} // end of mod tests
