//! # RedLilium Tessellator Demos
//!
//! Scenes that drive the tessellator from the command line.
//!
//! ## Available Demos
//!
//! - `tessellation_demo` - Builds a scene, flushes it and logs batch statistics

pub mod scenes;

/// Demos library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
