//! Matrix storage and the operations laplacians are built from.

pub mod coo;
pub mod matrepr;
