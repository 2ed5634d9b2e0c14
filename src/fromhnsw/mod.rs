//! This modules gathers everything coming from hnsw_rs.
//! It provides the approximate neighbour index [HnswIndex] used to build radius graphs.

pub mod hnswindex;

pub use hnswindex::{HnswIndex, HnswParams};
