//! Tessellation output handed to the renderer.
//!
//! - [`Batch`]: the three output buffers of one pass plus the texture runs
//!   of the polygon buffer
//! - [`FrameBatch`]: a borrowed, upload-ready view with draw calls and
//!   vertex layouts
//! - [`BatchSink`]: where a flushed frame goes; [`BatchStats`] just counts
//! - [`RetainedShape`]: a trimmed batch kept across frames

use std::sync::Arc;

use redlilium_core::mesh::{AttributeSchema, VertexLayout};

use crate::tess_geometry::{LineBuffer, PointBuffer, PolyBuffer, TessGeometry};
use crate::texture_cache::{DrawCall, TexCache};

/// Output of one or more tessellation calls.
#[derive(Debug, Clone, Default)]
pub struct Batch {
    pub geometry: TessGeometry,
    pub textures: TexCache,
}

impl Batch {
    pub fn new(attrib_width: usize) -> Self {
        Self {
            geometry: TessGeometry::new(attrib_width),
            textures: TexCache::new(),
        }
    }

    pub fn clear(&mut self) {
        self.geometry.clear();
        self.textures.clear();
    }

    /// Shrink backing storage to the live contents.
    pub fn trim(&mut self) {
        self.geometry.trim();
    }

    pub fn is_empty(&self) -> bool {
        self.geometry.is_empty()
    }

    /// Polygon draw calls, one per texture run and index cache.
    pub fn poly_draw_calls(&self) -> Vec<DrawCall> {
        self.textures.draw_calls(&self.geometry.poly.cache)
    }

    pub fn line_draw_calls(&self) -> Vec<DrawCall> {
        self.geometry.line.cache.draw_calls()
    }

    pub fn point_draw_calls(&self) -> Vec<DrawCall> {
        self.geometry.point.cache.draw_calls()
    }
}

/// Vertex layouts of the three output buffers.
#[derive(Debug, Clone)]
pub struct BatchLayouts {
    pub poly: Arc<VertexLayout>,
    pub line: Arc<VertexLayout>,
    pub point: Arc<VertexLayout>,
}

impl BatchLayouts {
    pub fn new(schema: &AttributeSchema) -> Self {
        Self {
            poly: VertexLayout::poly(schema),
            line: VertexLayout::line(),
            point: VertexLayout::point(),
        }
    }
}

/// A finished batch ready for upload.
#[derive(Debug)]
pub struct FrameBatch<'a> {
    pub poly: &'a PolyBuffer,
    pub line: &'a LineBuffer,
    pub point: &'a PointBuffer,
    pub poly_calls: Vec<DrawCall>,
    pub line_calls: Vec<DrawCall>,
    pub point_calls: Vec<DrawCall>,
    pub layouts: &'a BatchLayouts,
    /// Polygon triangles are in back-to-front order.
    pub depth_sorted: bool,
}

impl<'a> FrameBatch<'a> {
    pub fn new(batch: &'a Batch, layouts: &'a BatchLayouts, depth_sorted: bool) -> Self {
        Self {
            poly: &batch.geometry.poly,
            line: &batch.geometry.line,
            point: &batch.geometry.point,
            poly_calls: batch.poly_draw_calls(),
            line_calls: batch.line_draw_calls(),
            point_calls: batch.point_draw_calls(),
            layouts,
            depth_sorted,
        }
    }

    pub fn draw_call_count(&self) -> usize {
        self.poly_calls.len() + self.line_calls.len() + self.point_calls.len()
    }

    pub fn vertex_count(&self) -> usize {
        self.poly.vertex_count() + self.line.vertex_count() + self.point.vertex_count()
    }

    pub fn index_count(&self) -> usize {
        self.poly.index_count() + self.line.index_count() + self.point.index_count()
    }

    pub fn vertex_bytes(&self) -> usize {
        self.poly.vertex_count() * self.layouts.poly.vertex_size()
            + self.line.vertex_count() * self.layouts.line.vertex_size()
            + self.point.vertex_count() * self.layouts.point.vertex_size()
    }
}

/// Receives finished frames. Implemented by the graphics backend.
pub trait BatchSink {
    fn submit(&mut self, frame: &FrameBatch<'_>);
}

/// Sink that only accumulates counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub frames: usize,
    pub vertices: usize,
    pub indices: usize,
    pub draw_calls: usize,
    pub textured_calls: usize,
    pub sorted_frames: usize,
    /// Vertex bytes a backend would upload, per the batch layouts.
    pub vertex_bytes: usize,
}

impl BatchSink for BatchStats {
    fn submit(&mut self, frame: &FrameBatch<'_>) {
        self.frames += 1;
        self.vertices += frame.vertex_count();
        self.indices += frame.index_count();
        self.vertex_bytes += frame.vertex_bytes();
        self.draw_calls += frame.draw_call_count();
        self.textured_calls += frame
            .poly_calls
            .iter()
            .filter(|c| c.texture.is_some())
            .count();
        if frame.depth_sorted {
            self.sorted_frames += 1;
        }
    }
}

/// Geometry tessellated once in model space and drawn many times.
#[derive(Debug, Clone)]
pub struct RetainedShape {
    batch: Batch,
}

impl RetainedShape {
    pub(crate) fn new(mut batch: Batch) -> Self {
        batch.trim();
        Self { batch }
    }

    pub fn batch(&self) -> &Batch {
        &self.batch
    }

    pub fn is_empty(&self) -> bool {
        self.batch.is_empty()
    }

    /// Hand the shape to `sink`; the renderer applies the modelview.
    pub fn draw(&self, layouts: &BatchLayouts, sink: &mut dyn BatchSink) {
        sink.submit(&FrameBatch::new(&self.batch, layouts, false));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tessellator::stroke_vertex;
    use redlilium_core::math::Vec3;

    fn triangle_batch() -> Batch {
        let mut batch = Batch::new(0);
        let poly = &mut batch.geometry.poly;
        batch.textures.begin_tex(None, poly);
        let cache = poly.cache.reserve(3, false).unwrap();
        for x in [0.0, 1.0, 0.0] {
            poly.push_vertex(&stroke_vertex(Vec3::new(x, 0.0, 0.0), 0, &[]));
        }
        poly.indices.extend_from_slice(&[0, 1, 2]);
        poly.cache.inc_counts(cache, 3, 3);
        batch.textures.end_tex(poly);
        batch
    }

    #[test]
    fn test_stats_sink_counts_frames() {
        let batch = triangle_batch();
        let layouts = BatchLayouts::new(&AttributeSchema::default());
        let mut stats = BatchStats::default();
        stats.submit(&FrameBatch::new(&batch, &layouts, true));
        assert_eq!(stats.frames, 1);
        assert_eq!(stats.vertices, 3);
        assert_eq!(stats.indices, 3);
        assert_eq!(stats.draw_calls, 1);
        assert_eq!(stats.sorted_frames, 1);
        assert_eq!(stats.vertex_bytes, 3 * 68);
    }

    #[test]
    fn test_clear_empties_batch() {
        let mut batch = triangle_batch();
        assert!(!batch.is_empty());
        batch.clear();
        assert!(batch.is_empty());
        assert!(batch.poly_draw_calls().is_empty());
    }

    #[test]
    fn test_retained_shape_is_trimmed() {
        let shape = RetainedShape::new(triangle_batch());
        let poly = &shape.batch().geometry.poly;
        assert_eq!(poly.positions.capacity(), poly.vertex_count());
    }
}
