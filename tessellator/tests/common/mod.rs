//! Shared helpers for the tessellator integration tests.

use redlilium_tessellator::{PolyBuffer, RenderContext, RendererCaps, TessConfig};

/// 2D immediate context with default style.
pub fn context_2d() -> RenderContext {
    RenderContext::new(TessConfig::new())
}

/// 3D context that strokes through the poly buffer.
pub fn context_3d() -> RenderContext {
    let caps = RendererCaps::default()
        .with_shader_lines(false)
        .with_shader_points(false);
    RenderContext::new(TessConfig::new().with_3d(true).with_caps(caps))
}

/// Every polygon triangle as absolute positions, in buffer order.
pub fn poly_triangles(poly: &PolyBuffer) -> Vec<[[f32; 3]; 3]> {
    let mut out = Vec::new();
    for range in poly.cache.iter() {
        let indices = &poly.indices[range.index_offset..range.index_offset + range.index_count];
        for t in indices.chunks_exact(3) {
            out.push(<[u16; 3]>::try_from(t).unwrap().map(|i| {
                let p = poly.positions[range.vertex_offset + i as usize];
                [p[0], p[1], p[2]]
            }));
        }
    }
    out
}
