//! # RedLilium Tessellator
//!
//! Turns shape commands into indexed, GPU-ready vertex batches.
//!
//! ## Overview
//!
//! - [`RenderContext`] - Shape building, style state and flushing
//! - [`InGeometry`] - Raw vertices, stroke edges and curve codes of one shape
//! - [`Tessellator`] - Fill, stroke, curve and point tessellation
//! - [`TessGeometry`] - Polygon, line and point output buffers split into
//!   16-bit [`IndexCache`] segments
//! - [`TexCache`] - Texture runs and draw calls of the polygon buffer
//! - [`depth_sorter`] - Back-to-front triangle ordering without a depth buffer
//!
//! ## Example
//!
//! ```ignore
//! use redlilium_tessellator::{BatchStats, PrimitiveKind, RenderContext, TessConfig};
//!
//! let mut ctx = RenderContext::new(TessConfig::new());
//! ctx.stroke_weight(4.0);
//! ctx.ellipse(100.0, 100.0, 80.0, 80.0)?;
//! let mut stats = BatchStats::default();
//! ctx.flush(&mut stats);
//! ```

pub mod attribs;
pub mod batch;
pub mod config;
pub mod context;
pub mod curve;
pub mod depth_sorter;
pub mod error;
pub mod in_geometry;
pub mod index_cache;
pub mod primitive;
pub mod style;
pub mod tess_geometry;
pub mod tessellator;
pub mod texture_cache;

// Re-export main types for convenience
pub use attribs::{AttribChannels, AttribValues};
pub use batch::{Batch, BatchLayouts, BatchSink, BatchStats, FrameBatch, RetainedShape};
pub use config::{RenderMode, RendererCaps, TessConfig};
pub use context::RenderContext;
pub use curve::CurveMatrices;
pub use depth_sorter::{sort_poly, sort_triangles};
pub use error::{TessError, TessResult};
pub use in_geometry::{ArcMode, InGeometry};
pub use index_cache::{IndexCache, IndexRange};
pub use primitive::{Edge, EdgeKind, PrimitiveKind, VertexCode};
pub use style::{Color, Material, StrokeCap, StrokeJoin, TextureId, VertexStyle};
pub use tess_geometry::{LineBuffer, PointBuffer, PolyBuffer, PolyVertex, TessGeometry};
pub use tessellator::{Tessellator, Transform};
pub use texture_cache::{DrawCall, TexCache, TexEntry};

pub use redlilium_core::math;
pub use redlilium_core::mesh::{AttributeKind, AttributeSchema, GenericAttribute};

/// Tessellator library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log the library versions once at startup.
pub fn init() {
    redlilium_core::init();
    log::info!("RedLilium Tessellator v{} initialized", VERSION);
}
