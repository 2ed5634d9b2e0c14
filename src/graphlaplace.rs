//! Graph Laplacian stuff
//!
//! Computes a consistent estimate of the Laplace-Beltrami operator from the similarity
//! (adjacency) matrix A of a graph, typically A_ij = exp(-||X_i-X_j||²/ε²)
//! as given by [affinity_matrix](crate::affinity::affinity_matrix).
//!
//! Following the usual convention in analysis the laplacian is div(grad(f)), so the matrices returned
//! are **negative** semi-definite, the opposite of the convention common in machine learning.
//! This is the convention that makes the laplacians converge to the differential operator.
//!
//! With D = diag(A 1) the diagonal matrix of degrees, the variants are:
//!  - unnormalized : L = A - D
//!  - randomwalk : L = D^-1 A - I
//!  - symmetricnormalized : L = D^-1/2 A D^-1/2 - I
//!  - geometric : Ā = D^-1 A D^-1, W = diag(Ā 1), L = W^-1 Ā - I
//!  - renormalized : as geometric with D^-α A D^-α in the first step (Coifman-Lafon α renormalization)
//!
//! For geometric and renormalized the symmetric matrix Ā (lapsym) and the vector w = Ā 1 can be returned,
//! they allow to get the spectrum of L from a symmetric eigen problem (Ā is similar to W^-1/2 Ā W^-1/2).
//!
//! A node with null degree is not an error: the division is done by 1 for this node.
//! Its row and column stay null, and its diagonal too except for randomwalk where -1 is subtracted.
//!
//! Bibilography
//!   - *Diffusion Maps*. Coifman Lafon Appl. Comput. Harmon. Anal. 21 (2006) 5–30
//!   - *Graph Laplacians and their Convergence on Random Neighborhood Graphs* Hein, Audibert, Luxburg JMLR 2007

use std::fmt;
use std::str::FromStr;

use ndarray::Array1;
use num_traits::{Float, NumCast};
use serde::{Deserialize, Serialize};

use crate::error::{GeometryError, Result};
use crate::tools::matrepr::{GraphOps, MatMode, MatRepr};

/// The laplacian variants.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Normalization {
    Unnormalized,
    #[default]
    Geometric,
    RandomWalk,
    SymmetricNormalized,
    Renormalized,
}

impl Normalization {
    /// true if the variant has a symmetric companion matrix (lapsym) and a normalization vector w
    pub fn has_lapsym(&self) -> bool {
        matches!(self, Normalization::Geometric | Normalization::Renormalized)
    }
}

impl FromStr for Normalization {
    type Err = GeometryError;

    /// parsing is case insensitive
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "unnormalized" => Ok(Normalization::Unnormalized),
            "geometric" => Ok(Normalization::Geometric),
            "randomwalk" => Ok(Normalization::RandomWalk),
            "symmetricnormalized" => Ok(Normalization::SymmetricNormalized),
            "renormalized" => Ok(Normalization::Renormalized),
            _ => Err(GeometryError::invalid(format!(
                "normed must be one of unnormalized, geometric, randomwalk, symmetricnormalized, renormalized, got {}",
                s
            ))),
        }
    }
}

impl fmt::Display for Normalization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Normalization::Unnormalized => "unnormalized",
            Normalization::Geometric => "geometric",
            Normalization::RandomWalk => "randomwalk",
            Normalization::SymmetricNormalized => "symmetricnormalized",
            Normalization::Renormalized => "renormalized",
        };
        write!(f, "{}", name)
    }
}

//=====================================================================================

/// The parameters are:
///  - the laplacian variant, default is geometric.
///  - symmetrize : if true the adjacency is replaced by (A + A^t)/2 before anything else. Default is false,
///    and there is **no check** that the adjacency is symmetric.
///  - scaling_epps : if > 0. it should be the radius used as kernel width in the affinity.
///    The laplacian is then multiplied by 4/scaling_epps² to be consistent with the differential operator
///    in the limit of large number of points. Default 0., no scaling.
///  - renormalization_exponent : the α of the renormalized variant, default to 1.
///  - return_diag : return the diagonal of the laplacian.
///  - return_lapsym : for geometric and renormalized return the symmetric matrix and normalization vector.
#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct LaplacianParams {
    normed: Normalization,
    symmetrize: bool,
    scaling_epps: f64,
    renormalization_exponent: f64,
    return_diag: bool,
    return_lapsym: bool,
} // end of LaplacianParams

impl Default for LaplacianParams {
    fn default() -> Self {
        LaplacianParams::new(Normalization::default())
    }
}

impl LaplacianParams {
    pub fn new(normed: Normalization) -> Self {
        LaplacianParams {
            normed,
            symmetrize: false,
            scaling_epps: 0.,
            renormalization_exponent: 1.,
            return_diag: false,
            return_lapsym: false,
        }
    }

    /// parameters with default values and variant given by its name
    pub fn parse(normed: &str) -> Result<Self> {
        Ok(LaplacianParams::new(normed.parse::<Normalization>()?))
    }

    pub fn get_normed(&self) -> Normalization {
        self.normed
    }

    pub fn get_symmetrize(&self) -> bool {
        self.symmetrize
    }

    pub fn get_scaling_epps(&self) -> f64 {
        self.scaling_epps
    }

    pub fn get_renormalization_exponent(&self) -> f64 {
        self.renormalization_exponent
    }

    pub fn get_return_diag(&self) -> bool {
        self.return_diag
    }

    pub fn get_return_lapsym(&self) -> bool {
        self.return_lapsym
    }

    pub fn set_normed(&mut self, normed: Normalization) -> &mut Self {
        self.normed = normed;
        self
    }

    pub fn set_symmetrize(&mut self, symmetrize: bool) -> &mut Self {
        self.symmetrize = symmetrize;
        self
    }

    /// scaling_epps must be >= 0. (0. means no scaling)
    pub fn set_scaling_epps(&mut self, scaling_epps: f64) -> &mut Self {
        if scaling_epps >= 0. {
            self.scaling_epps = scaling_epps;
        } else {
            log::warn!("not changing scaling_epps, scaling_epps should be >= 0.");
        }
        self
    }

    /// natural values are 0. , 1/2 and 1.
    pub fn set_renormalization_exponent(&mut self, exponent: f64) -> &mut Self {
        self.renormalization_exponent = exponent;
        self
    }

    pub fn set_return_diag(&mut self, return_diag: bool) -> &mut Self {
        self.return_diag = return_diag;
        self
    }

    pub fn set_return_lapsym(&mut self, return_lapsym: bool) -> &mut Self {
        self.return_lapsym = return_lapsym;
        self
    }
} // end of impl LaplacianParams

//=====================================================================================

/// The result of a laplacian computation.
/// Optional fields are filled only if asked for in [LaplacianParams].
#[derive(Clone, Debug)]
pub struct Laplacian<F> {
    /// the laplacian, in the representation of the adjacency matrix
    pub laplacian: MatRepr<F>,
    /// diagonal of the laplacian
    pub diag: Option<Array1<F>>,
    /// symmetric matrix before the last (row) normalization (geometric and renormalized)
    pub lapsym: Option<MatRepr<F>>,
    /// the row normalization vector of lapsym (geometric and renormalized)
    pub w: Option<Array1<F>>,
} // end of struct Laplacian

// what the variant algorithm returns for a given storage
struct StorageLaplacian<G, F> {
    laplacian: G,
    diag: Option<Array1<F>>,
    lapsym: Option<G>,
    w: Option<Array1<F>>,
}

/// Return the laplacian of the graph with adjacency matrix adjacency.
///
/// The computation is done in the representation of the adjacency, dense or sparse,
/// both representations giving the same result up to rounding errors.
/// In sparse mode the sparsity pattern is kept, a diagonal entry is created when needed.
///
/// Errors with [GeometryError::InvalidParameter] if the adjacency is not square
/// or if scaling parameters cannot be represented in F.
///
/// Notes:
/// - if the adjacency is not symmetric (and symmetrize is false) the out-degree is used
///   and no warning is raised. This function is not meant for directed graphs.
/// - for integer matrices use [MatRepr::promote_from] first.
pub fn graph_laplacian<F>(adjacency: &MatRepr<F>, params: &LaplacianParams) -> Result<Laplacian<F>>
where
    F: Float,
{
    if !adjacency.is_square() {
        return Err(GeometryError::invalid(format!(
            "adjacency must be a square matrix, got shape {:?}",
            adjacency.shape()
        )));
    }
    let scaling_epps = <F as NumCast>::from(params.scaling_epps)
        .ok_or_else(|| GeometryError::invalid("scaling_epps cannot be converted to float"))?;
    let exponent = <F as NumCast>::from(params.renormalization_exponent).ok_or_else(|| {
        GeometryError::invalid("renormalization_exponent cannot be converted to float")
    })?;
    log::debug!(
        "graph_laplacian normed : {}, sparse : {}, nb nodes : {}",
        params.normed,
        adjacency.is_sparse(),
        adjacency.shape()[0]
    );
    if params.return_lapsym && !params.normed.has_lapsym() {
        log::warn!(
            "return_lapsym ignored, lapsym is only defined for geometric and renormalized, not {}",
            params.normed
        );
    }
    //
    let laplacian = match adjacency.get_data() {
        MatMode::FULL(mat) => {
            let res = laplacian_from_graph(mat.clone(), params, scaling_epps, exponent);
            Laplacian {
                laplacian: MatRepr::from_array2(res.laplacian),
                diag: res.diag,
                lapsym: res.lapsym.map(MatRepr::from_array2),
                w: res.w,
            }
        }
        MatMode::COO(coo) => {
            let res = laplacian_from_graph(coo.clone(), params, scaling_epps, exponent);
            Laplacian {
                laplacian: MatRepr::from_coomat(res.laplacian),
                diag: res.diag,
                lapsym: res.lapsym.map(MatRepr::from_coomat),
                w: res.w,
            }
        }
    };
    Ok(laplacian)
} // end of graph_laplacian

// substitute 1 to null divisors. returns the mask of null divisors
fn nonzero_divisors<F: Float>(w: &Array1<F>) -> (Array1<F>, Vec<bool>) {
    let zeros: Vec<bool> = w.iter().map(|v| *v == F::zero()).collect();
    let divisors = w.mapv(|v| if v == F::zero() { F::one() } else { v });
    (divisors, zeros)
}

// -1 on the diagonal, except for the nodes flagged in null_mask which keep a null diagonal
fn identity_shift<F: Float>(null_mask: &[bool]) -> Array1<F> {
    null_mask
        .iter()
        .map(|z| if *z { F::zero() } else { -F::one() })
        .collect()
}

// The variants are written once, for any storage implementing GraphOps.
fn laplacian_from_graph<F, G>(
    mut lap: G,
    params: &LaplacianParams,
    scaling_epps: F,
    exponent: F,
) -> StorageLaplacian<G, F>
where
    F: Float,
    G: GraphOps<F>,
{
    if params.symmetrize {
        lap.symmetrize();
    }
    let nbnodes = lap.nb_nodes();
    let degrees = lap.row_sums();
    let nb_null_degree = degrees.iter().filter(|d| **d == F::zero()).count();
    if nb_null_degree > 0 {
        log::info!("graph_laplacian : {} nodes with null degree", nb_null_degree);
    }
    let minus_one = Array1::<F>::from_elem(nbnodes, -F::one());
    let mut lapsym: Option<G> = None;
    let mut w_out: Option<Array1<F>> = None;
    //
    match params.normed {
        Normalization::Unnormalized => {
            lap.shift_diagonal(&degrees.mapv(|d| -d));
        }
        Normalization::RandomWalk => {
            let (w, _) = nonzero_divisors(&degrees);
            lap.divide_rows(&w);
            lap.shift_diagonal(&minus_one);
        }
        Normalization::SymmetricNormalized => {
            let (w, w_zeros) = nonzero_divisors(&degrees.mapv(|d| d.sqrt()));
            lap.divide_rows(&w);
            lap.divide_cols(&w);
            lap.shift_diagonal(&identity_shift(&w_zeros));
        }
        Normalization::Geometric | Normalization::Renormalized => {
            // normalize once symmetrically by d (or d^α)
            let first = if params.normed == Normalization::Geometric {
                degrees.clone()
            } else {
                degrees.mapv(|d| d.powf(exponent))
            };
            let (w, first_zeros) = nonzero_divisors(&first);
            lap.divide_rows(&w);
            lap.divide_cols(&w);
            // normalize again asymmetrically
            let w = lap.row_sums();
            if params.return_lapsym {
                lapsym = Some(lap.clone());
            }
            let (divisors, w_zeros) = nonzero_divisors(&w);
            let nb_zeros = w_zeros.iter().filter(|z| **z).count();
            if nb_zeros > 0 {
                log::trace!("second normalization : {} null row sums", nb_zeros);
            }
            lap.divide_rows(&divisors);
            lap.shift_diagonal(&identity_shift(&first_zeros));
            if params.return_lapsym {
                w_out = Some(w);
            }
        }
    }
    //
    if scaling_epps > F::zero() {
        let four = F::one() + F::one() + F::one() + F::one();
        let factor = four / (scaling_epps * scaling_epps);
        log::debug!(
            "scaling laplacian by {:.3e}",
            factor.to_f64().unwrap_or(f64::NAN)
        );
        lap.scale(factor);
    }
    let diag = if params.return_diag {
        Some(lap.diagonal())
    } else {
        None
    };
    //
    StorageLaplacian {
        laplacian: lap,
        diag,
        lapsym,
        w: w_out,
    }
} // end of laplacian_from_graph

//=====================================================================================

// end of mod tests
