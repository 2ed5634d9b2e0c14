//! Graph laplacians of point clouds.
//!
//! The pipeline is: point cloud → radius neighbourhood graph (sparse distances, see [neighbours])
//! → heat kernel affinity ([affinity]) → graph laplacian ([graphlaplace]).
//! Neighbour search is delegated to a [neighbours::NeighborIndex], by default built on hnsw_rs ([fromhnsw]).
//! Distance graphs can be cached per radius with [distancematrix::DistanceMatrix].

// for logging (debug mostly, switched at compile time in cargo.toml)

use lazy_static::lazy_static;

pub mod affinity;
pub mod distancematrix;
pub mod error;
pub mod fromhnsw;
pub mod graphlaplace;
pub mod neighbours;
pub mod prelude;
pub mod tools;

lazy_static! {
    static ref LOG: u64 = init_log();
}

// install a logger facility
fn init_log() -> u64 {
    let _res = env_logger::try_init();
    log::info!("\n ************** initializing logger *****************\n");
    1
}

/// installs the env_logger backend once. Logging is driven by RUST_LOG.
pub fn setup_log() {
    lazy_static::initialize(&LOG);
}

// end of tests
