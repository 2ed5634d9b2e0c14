//! unified matrix representation
//!
//! Distance graphs, affinities and laplacians are stored either as a full `Array2`
//! or as a sparse list of triplets ([CooMat]). The few operations the laplacian variants need
//! are gathered in the trait [GraphOps] which is implemented once for each storage,
//! so that the normalization algorithms are written once.

use ndarray::{Array1, Array2, Axis};

use num_traits::{Float, NumCast, ToPrimitive};

use sprs::{CsMat, TriMat};

use super::coo::CooMat;
use crate::error::{GeometryError, Result};

/// The operations on a weighted graph (given by its adjacency matrix) needed to compute laplacians.
///
/// In sparse mode only stored entries are modified, a missing entry stays missing,
/// except on the diagonal where [GraphOps::shift_diagonal] may have to create an entry.
pub trait GraphOps<F: Float>: Clone {
    /// number of rows
    fn nb_nodes(&self) -> usize;

    /// degrees. sum of each row
    fn row_sums(&self) -> Array1<F>;

    /// entry (i,j) is divided by w\[i\]
    fn divide_rows(&mut self, w: &Array1<F>);

    /// entry (i,j) is divided by w\[j\]
    fn divide_cols(&mut self, w: &Array1<F>);

    /// returns the diagonal
    fn diagonal(&self) -> Array1<F>;

    /// entry (i,i) is incremented by delta\[i\]
    fn shift_diagonal(&mut self, delta: &Array1<F>);

    /// multiplication of all entries by beta
    fn scale(&mut self, beta: F);

    /// replace the matrix by (A + A^t)/2
    fn symmetrize(&mut self);

    /// apply f to all stored values
    fn map_values<G: Fn(F) -> F>(&mut self, f: G);
} // end of trait GraphOps

impl<F> GraphOps<F> for Array2<F>
where
    F: Float,
{
    fn nb_nodes(&self) -> usize {
        self.nrows()
    }

    fn row_sums(&self) -> Array1<F> {
        self.sum_axis(Axis(1))
    }

    fn divide_rows(&mut self, w: &Array1<F>) {
        for (i, mut row) in self.axis_iter_mut(Axis(0)).enumerate() {
            let d = w[i];
            row.mapv_inplace(|v| v / d);
        }
    }

    fn divide_cols(&mut self, w: &Array1<F>) {
        for mut row in self.axis_iter_mut(Axis(0)) {
            for (v, d) in row.iter_mut().zip(w.iter()) {
                *v = *v / *d;
            }
        }
    }

    fn diagonal(&self) -> Array1<F> {
        self.diag().to_owned()
    }

    fn shift_diagonal(&mut self, delta: &Array1<F>) {
        let nbdiag = self.nrows().min(self.ncols());
        for i in 0..nbdiag {
            self[[i, i]] = self[[i, i]] + delta[i];
        }
    }

    fn scale(&mut self, beta: F) {
        self.mapv_inplace(|v| v * beta);
    }

    fn symmetrize(&mut self) {
        let two = F::one() + F::one();
        let transposed = self.t().to_owned();
        let symgraph = (&*self + &transposed).mapv(|v| v / two);
        *self = symgraph;
    }

    fn map_values<G: Fn(F) -> F>(&mut self, f: G) {
        self.mapv_inplace(f);
    }
} // end of impl GraphOps for Array2

impl<F> GraphOps<F> for CooMat<F>
where
    F: Float,
{
    fn nb_nodes(&self) -> usize {
        self.shape().0
    }

    fn row_sums(&self) -> Array1<F> {
        self.sum_rows()
    }

    fn divide_rows(&mut self, w: &Array1<F>) {
        let rows = self.rows().to_vec();
        for (v, r) in self.values_mut().iter_mut().zip(rows) {
            *v = *v / w[r];
        }
    }

    fn divide_cols(&mut self, w: &Array1<F>) {
        let cols = self.cols().to_vec();
        for (v, c) in self.values_mut().iter_mut().zip(cols) {
            *v = *v / w[c];
        }
    }

    fn diagonal(&self) -> Array1<F> {
        let (nbrow, nbcol) = self.shape();
        let mut diag = Array1::<F>::zeros(nbrow.min(nbcol));
        for (r, c, v) in self.iter() {
            if r == c {
                diag[r] = diag[r] + *v;
            }
        }
        diag
    }

    // the first stored entry of each diagonal position receives the shift,
    // a node without diagonal entry gets one if its shift is not null.
    fn shift_diagonal(&mut self, delta: &Array1<F>) {
        let (nbrow, nbcol) = self.shape();
        let nbdiag = nbrow.min(nbcol);
        let mut shifted = vec![false; nbdiag];
        let rows = self.rows().to_vec();
        let cols = self.cols().to_vec();
        for (k, v) in self.values_mut().iter_mut().enumerate() {
            let (r, c) = (rows[k], cols[k]);
            if r == c && !shifted[r] {
                *v = *v + delta[r];
                shifted[r] = true;
            }
        }
        let mut nb_created = 0;
        for (i, done) in shifted.iter().enumerate() {
            if !done && delta[i] != F::zero() {
                self.push_triplet(i, i, delta[i]);
                nb_created += 1;
            }
        }
        if nb_created > 0 {
            log::trace!("shift_diagonal created {} diagonal entries", nb_created);
        }
    } // end of shift_diagonal

    fn scale(&mut self, beta: F) {
        self.map_values(|v| v * beta);
    }

    // We transpose by swapping row and col indexes, add and compact.
    // The compaction drops entries summing to 0, explicit zeros are lost here.
    fn symmetrize(&mut self) {
        let two = F::one() + F::one();
        let transposed = self.transpose();
        let (nbrow, nbcol) = self.shape();
        let mut rows = self.rows().to_vec();
        let mut cols = self.cols().to_vec();
        let mut values = self.values().to_vec();
        rows.extend_from_slice(transposed.rows());
        cols.extend_from_slice(transposed.cols());
        values.extend_from_slice(transposed.values());
        for v in values.iter_mut() {
            *v = *v / two;
        }
        let mut symgraph = CooMat::<F>::new((nbrow.max(nbcol), nbrow.max(nbcol)));
        for ((r, c), v) in rows.into_iter().zip(cols).zip(values) {
            symgraph.push_triplet(r, c, v);
        }
        symgraph.compact();
        *self = symgraph;
    } // end of symmetrize

    fn map_values<G: Fn(F) -> F>(&mut self, f: G) {
        for v in self.values_mut().iter_mut() {
            *v = f(*v);
        }
    }
} // end of impl GraphOps for CooMat

//==================================================================================

/// enum storing the matrix for our 2 types of matrix representation
#[derive(Clone, Debug)]
pub enum MatMode<F> {
    FULL(Array2<F>),
    COO(CooMat<F>),
}

/// A matrix in one of our two representations. The representation drives the
/// choice of the dense or sparse code path in computations.
#[derive(Clone, Debug)]
pub struct MatRepr<F> {
    data: MatMode<F>,
} // end of struct MatRepr

impl<F> MatRepr<F> {
    /// initialize a MatRepr from an Array2
    #[inline]
    pub fn from_array2(mat: Array2<F>) -> MatRepr<F> {
        MatRepr {
            data: MatMode::FULL(mat),
        }
    }

    /// initialize a MatRepr from a triplet list
    #[inline]
    pub fn from_coomat(mat: CooMat<F>) -> MatRepr<F> {
        MatRepr {
            data: MatMode::COO(mat),
        }
    }

    /// a common interface to get matrix dimension. returns [nbrow, nbcolumn]
    pub fn shape(&self) -> [usize; 2] {
        match &self.data {
            MatMode::FULL(mat) => [mat.nrows(), mat.ncols()],
            MatMode::COO(coo) => [coo.shape().0, coo.shape().1],
        }
    } // end of shape

    pub fn is_square(&self) -> bool {
        let shape = self.shape();
        shape[0] == shape[1]
    }

    /// returns true if we have a sparse representation
    pub fn is_sparse(&self) -> bool {
        match &self.data {
            MatMode::FULL(_) => false,
            MatMode::COO(_) => true,
        }
    } // end of is_sparse

    /// returns a reference to full matrix if data is given as full matrix
    pub fn get_full(&self) -> Option<&Array2<F>> {
        match &self.data {
            MatMode::FULL(mat) => Some(mat),
            _ => None,
        }
    }

    pub fn get_full_mut(&mut self) -> Option<&mut Array2<F>> {
        match &mut self.data {
            MatMode::FULL(mat) => Some(mat),
            _ => None,
        }
    }

    /// returns a reference to the triplets if data is sparse
    pub fn get_coo(&self) -> Option<&CooMat<F>> {
        match &self.data {
            MatMode::COO(mat) => Some(mat),
            _ => None,
        }
    }

    pub fn get_coo_mut(&mut self) -> Option<&mut CooMat<F>> {
        match &mut self.data {
            MatMode::COO(mat) => Some(mat),
            _ => None,
        }
    }

    /// consume MatRepr and retrieve the Full mat (if mat is in this format)
    pub fn retrieve_array(self) -> Option<Array2<F>> {
        match self.data {
            MatMode::FULL(mat) => Some(mat),
            _ => None,
        }
    }

    /// consume MatRepr and retrieve the triplets (if mat is in this format)
    pub fn retrieve_coo(self) -> Option<CooMat<F>> {
        match self.data {
            MatMode::COO(mat) => Some(mat),
            _ => None,
        }
    }

    /// get a reference to matrix representation
    pub fn get_data(&self) -> &MatMode<F> {
        &self.data
    }

    /// get a mutable reference to matrix representation
    pub fn get_data_mut(&mut self) -> &mut MatMode<F> {
        &mut self.data
    }
} // end of impl block for MatRepr

impl<F> MatRepr<F>
where
    F: Float,
{
    /// initialize a sparse MatRepr from a sprs compressed matrix
    pub fn from_csmat(mat: &CsMat<F>) -> MatRepr<F> {
        MatRepr::from_coomat(CooMat::from_csmat(mat))
    }

    /// initialize a sparse MatRepr from a sprs triplet matrix
    pub fn from_trimat(mat: &TriMat<F>) -> MatRepr<F> {
        MatRepr::from_coomat(CooMat::from_trimat(mat))
    }

    /// Converts a matrix of another numeric type (typically integers) to F, keeping the representation.
    pub fn promote_from<T>(other: &MatRepr<T>) -> Result<MatRepr<F>>
    where
        T: ToPrimitive + Copy,
    {
        let convert = |v: T| -> Result<F> {
            <F as NumCast>::from(v).ok_or_else(|| GeometryError::invalid("value cannot be converted to float"))
        };
        match other.get_data() {
            MatMode::FULL(mat) => {
                let mut promoted = Array2::<F>::zeros(mat.dim());
                for (dst, src) in promoted.iter_mut().zip(mat.iter()) {
                    *dst = convert(*src)?;
                }
                Ok(MatRepr::from_array2(promoted))
            }
            MatMode::COO(coo) => {
                let values = coo.values().iter().map(|v| convert(*v)).collect::<Result<Vec<F>>>()?;
                let promoted =
                    CooMat::from_triplets(coo.shape(), coo.rows().to_vec(), coo.cols().to_vec(), values)?;
                Ok(MatRepr::from_coomat(promoted))
            }
        }
    } // end of promote_from

    /// dense copy, positions without entry in sparse mode are set to fill.
    pub fn to_dense(&self, fill: F) -> Array2<F> {
        match &self.data {
            MatMode::FULL(mat) => mat.clone(),
            MatMode::COO(coo) => coo.to_dense(fill),
        }
    }

    /// export to csr. A full matrix keeps its non null entries.
    pub fn to_csr(&self) -> CsMat<F> {
        match &self.data {
            MatMode::FULL(mat) => CooMat::from_dense(&mat.view(), |v| v != F::zero()).to_csr(),
            MatMode::COO(coo) => coo.to_csr(),
        }
    }

    /// just multiplication by beta in a unified way
    pub fn scale(&mut self, beta: F) {
        match &mut self.data {
            MatMode::FULL(mat) => mat.scale(beta),
            MatMode::COO(coo) => coo.scale(beta),
        };
    }

    /// row sums in a unified way
    pub fn row_sums(&self) -> Array1<F> {
        match &self.data {
            MatMode::FULL(mat) => mat.row_sums(),
            MatMode::COO(coo) => coo.row_sums(),
        }
    }

    /// returns the diagonal
    pub fn diagonal(&self) -> Array1<F> {
        match &self.data {
            MatMode::FULL(mat) => mat.diagonal(),
            MatMode::COO(coo) => coo.diagonal(),
        }
    }

    /// return a transposed copy
    pub fn transpose_owned(&self) -> Self {
        match &self.data {
            MatMode::FULL(mat) => MatRepr::from_array2(mat.t().to_owned()),
            MatMode::COO(coo) => MatRepr::from_coomat(coo.transpose()),
        }
    }

    /// Check symmetry up to tol. Sparse positions without entry count as 0.
    pub fn is_symmetric(&self, tol: F) -> bool {
        if !self.is_square() {
            return false;
        }
        match &self.data {
            MatMode::FULL(mat) => mat
                .indexed_iter()
                .all(|((i, j), v)| j >= i || (*v - mat[[j, i]]).abs() <= tol),
            MatMode::COO(coo) => {
                let mut compacted = coo.clone();
                compacted.compact();
                let mut entries: Vec<((usize, usize), F)> =
                    compacted.iter().map(|(i, j, v)| ((i, j), *v)).collect();
                entries.sort_unstable_by_key(|e| e.0);
                entries.iter().all(|((i, j), v)| {
                    let vt = match entries.binary_search_by_key(&(*j, *i), |e| e.0) {
                        Ok(k) => entries[k].1,
                        Err(_) => F::zero(),
                    };
                    (*v - vt).abs() <= tol
                })
            }
        }
    } // end of is_symmetric
} // end of impl block for MatRepr

//========================================================================================

// end of mod tests
