//! Prometheus metrics for nomos.

mod compliance;
mod registry;
mod server;

pub use compliance::*;
pub use registry::*;
pub use server::*;
