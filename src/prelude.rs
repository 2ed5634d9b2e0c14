//! gathers the main types and functions

pub use crate::affinity::{affinity_matrix, affinity_with_params, AffinityParams};
pub use crate::distancematrix::DistanceMatrix;
pub use crate::error::{GeometryError, Result};
pub use crate::fromhnsw::{HnswIndex, HnswParams};
pub use crate::graphlaplace::{graph_laplacian, Laplacian, LaplacianParams, Normalization};
pub use crate::neighbours::{radius_neighbors_graph, BruteForceIndex, GraphMode, NeighborIndex};
pub use crate::tools::coo::CooMat;
pub use crate::tools::matrepr::{GraphOps, MatMode, MatRepr};
