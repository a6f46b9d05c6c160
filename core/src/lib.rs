//! # RedLilium Core
//!
//! Shared building blocks for the RedLilium tessellator:
//!
//! - [`math`]: nalgebra aliases and projection/transform helpers
//! - [`mesh`]: the vertex attribute schema shared by input and output buffers
//! - [`profiling`]: optional Tracy instrumentation macros

pub mod math;
pub mod mesh;
pub mod profiling;

/// Core library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log the crate version once at startup.
pub fn init() {
    log::info!("RedLilium Core v{} initialized", VERSION);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
