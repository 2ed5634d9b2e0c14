//! Error type shared by the graph, affinity and laplacian computations.

use thiserror::Error;

/// Errors raised by the computations of this crate.
///
/// A node with a null degree is **not** an error: it is handled silently by the laplacian
/// computations (see [graph_laplacian](crate::graphlaplace::graph_laplacian)).
#[derive(Debug, Error)]
pub enum GeometryError {
    /// A parameter or an input matrix does not satisfy the preconditions of the call.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The neighbour index failed to answer a query.
    #[error("neighbour index failure: {0}")]
    NeighborIndex(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl GeometryError {
    pub fn invalid<S: Into<String>>(msg: S) -> Self {
        GeometryError::InvalidParameter(msg.into())
    }

    /// true if error is an [GeometryError::InvalidParameter]
    pub fn is_invalid_parameter(&self) -> bool {
        matches!(self, GeometryError::InvalidParameter(_))
    }
}

impl From<anyhow::Error> for GeometryError {
    fn from(err: anyhow::Error) -> Self {
        GeometryError::NeighborIndex(err.into())
    }
}

pub type Result<T> = std::result::Result<T, GeometryError>;
