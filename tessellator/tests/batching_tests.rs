//! Integration tests for index cache splitting and texture batching.
//!
//! Shapes go through the public [`RenderContext`] and the resulting buffers
//! are checked against the 16-bit addressing and draw call guarantees.

mod common;

use rstest::rstest;

use common::{context_2d, context_3d, poly_triangles};
use redlilium_tessellator::config::MAX_VERTEX_INDEX;
use redlilium_tessellator::math::Vec3;
use redlilium_tessellator::{BatchStats, PrimitiveKind, StrokeCap, TessError, TextureId};

fn fan_position(i: usize) -> [f32; 3] {
    [i as f32, (i % 7) as f32, 0.0]
}

// ============================================================================
// Index Cache Tests
// ============================================================================

/// Triangle fans of growing size: every cache stays addressable and the
/// flattened triangles match the fan connectivity.
#[rstest]
#[case::small(100)]
#[case::at_limit(MAX_VERTEX_INDEX)]
#[case::straddling(70_000)]
fn test_fan_split_preserves_connectivity(#[case] n: usize) {
    let mut ctx = context_2d();
    ctx.no_stroke();
    ctx.begin_shape(PrimitiveKind::TriangleFan).unwrap();
    for i in 0..n {
        let [x, y, z] = fan_position(i);
        ctx.vertex(Vec3::new(x, y, z)).unwrap();
    }
    ctx.end_shape(false).unwrap();

    let poly = &ctx.batch().geometry.poly;
    for range in poly.cache.iter() {
        assert!(range.vertex_count <= MAX_VERTEX_INDEX);
        let indices = &poly.indices[range.index_offset..range.index_offset + range.index_count];
        assert!(indices.iter().all(|&i| (i as usize) < range.vertex_count));
    }
    if n > MAX_VERTEX_INDEX {
        assert!(poly.cache.len() >= 2);
    }

    let expected: Vec<[[f32; 3]; 3]> = (1..n - 1)
        .map(|i| [fan_position(0), fan_position(i), fan_position(i + 1)])
        .collect();
    assert_eq!(poly_triangles(poly), expected);
}

#[test]
fn test_draw_calls_cover_all_indices() {
    let mut ctx = context_2d();
    ctx.no_stroke();
    ctx.begin_shape(PrimitiveKind::TriangleStrip).unwrap();
    for i in 0..70_000 {
        ctx.vertex(Vec3::new(i as f32, (i % 2) as f32, 0.0)).unwrap();
    }
    ctx.end_shape(false).unwrap();

    let batch = ctx.batch();
    let calls = batch.poly_draw_calls();
    let covered: usize = calls.iter().map(|c| c.index_count).sum();
    assert_eq!(covered, batch.geometry.poly.index_count());
    assert!(calls.len() >= 2);
}

/// A triangle spanning more vertices than one cache can address aborts the
/// whole shape, including the triangles before it.
#[test]
fn test_unaddressable_triangle_aborts_shape() {
    let mut ctx = context_2d();
    ctx.no_stroke();
    ctx.texture(TextureId(3));
    ctx.rect(0.0, 0.0, 10.0, 10.0).unwrap();
    let poly_before = ctx.batch().geometry.poly.clone();
    let textures_before = ctx.batch().textures.clone();

    ctx.begin_shape(PrimitiveKind::Triangles).unwrap();
    for i in 0..70_004 {
        ctx.vertex(Vec3::new(i as f32, 0.0, 0.0)).unwrap();
    }
    let err = ctx.end_shape_indexed(&[0, 1, 2, 3, 70_003, 4]).unwrap_err();
    assert!(matches!(err, TessError::IndexOverflow { .. }));

    let batch = ctx.batch();
    assert_eq!(batch.geometry.poly, poly_before);
    assert_eq!(batch.textures, textures_before);
    assert_eq!(batch.textures.len(), 1);
}

// ============================================================================
// Texture Batching Tests
// ============================================================================

/// Same-texture runs coalesce; switching texture on every shape does not.
#[rstest]
#[case::same_texture(false, 1)]
#[case::alternating(true, 6)]
fn test_texture_runs(#[case] alternate: bool, #[case] expected: usize) {
    let mut ctx = context_2d();
    ctx.no_stroke();
    for i in 0..6u64 {
        let id = if alternate { i % 2 } else { 0 };
        ctx.texture(TextureId(id));
        ctx.rect(i as f32 * 20.0, 0.0, 10.0, 10.0).unwrap();
    }
    assert_eq!(ctx.batch().textures.len(), expected);
    assert_eq!(ctx.batch().poly_draw_calls().len(), expected);
}

#[test]
fn test_untextured_stroke_splits_texture_run() {
    let mut ctx = context_2d();
    ctx.texture(TextureId(3));
    ctx.rect(0.0, 0.0, 10.0, 10.0).unwrap();
    ctx.rect(20.0, 0.0, 10.0, 10.0).unwrap();
    let entries = ctx.batch().textures.entries();
    // fill, stroke, fill, stroke
    assert_eq!(entries.len(), 4);
    assert_eq!(entries[0].texture, Some(TextureId(3)));
    assert_eq!(entries[1].texture, None);
}

// ============================================================================
// End-to-end Tests
// ============================================================================

/// Fast-path segment ends: projecting caps extend by half the weight,
/// square caps by the gap nudge.
#[rstest]
#[case::project(StrokeCap::Project, 1.0)]
#[case::square(StrokeCap::Square, 0.75)]
fn test_segment_cap_extent(#[case] cap: StrokeCap, #[case] ext: f32) {
    let mut ctx = context_2d();
    ctx.stroke_weight(2.0);
    ctx.stroke_cap(cap);
    ctx.line(Vec3::zeros(), Vec3::new(10.0, 0.0, 0.0)).unwrap();
    let poly = &ctx.batch().geometry.poly;
    assert_eq!(poly.vertex_count(), 4);
    assert_eq!(poly.index_count(), 6);
    let min_x = poly.positions.iter().map(|p| p[0]).fold(f32::MAX, f32::min);
    let max_x = poly.positions.iter().map(|p| p[0]).fold(f32::MIN, f32::max);
    assert_eq!(min_x, -ext);
    assert_eq!(max_x, 10.0 + ext);
}

#[test]
fn test_round_caps_take_outline_path() {
    let mut ctx = context_2d();
    ctx.stroke_weight(10.0);
    ctx.stroke_cap(StrokeCap::Round);
    ctx.line(Vec3::zeros(), Vec3::new(100.0, 0.0, 0.0)).unwrap();
    let poly = &ctx.batch().geometry.poly;
    assert!(poly.vertex_count() > 4);
    let min_x = poly.positions.iter().map(|p| p[0]).fold(f32::MAX, f32::min);
    assert!((min_x + 5.0).abs() < 0.2);
}

#[test]
fn test_bezier_is_deterministic() {
    let draw = || {
        let mut ctx = context_2d();
        ctx.begin_shape(PrimitiveKind::Polygon).unwrap();
        ctx.vertex(Vec3::new(0.0, 0.0, 0.0)).unwrap();
        ctx.bezier_vertex(
            Vec3::new(30.0, 80.0, 0.0),
            Vec3::new(70.0, -80.0, 0.0),
            Vec3::new(100.0, 0.0, 0.0),
        )
        .unwrap();
        ctx.end_shape(true).unwrap();
        ctx.batch().geometry.poly.positions.clone()
    };
    let first = draw();
    assert!(!first.is_empty());
    assert_eq!(first, draw());
}

#[test]
fn test_3d_box_and_sphere_flush() {
    let mut ctx = context_3d();
    ctx.box_shape(Vec3::new(1.0, 1.0, 1.0)).unwrap();
    ctx.no_stroke();
    ctx.sphere(2.0).unwrap();
    let mut stats = BatchStats::default();
    ctx.flush(&mut stats);
    assert_eq!(stats.frames, 1);
    assert!(stats.vertices > 24);
    assert!(ctx.batch().is_empty());
}

#[test]
fn test_points_round_and_square() {
    let mut ctx = context_2d();
    ctx.stroke_weight(4.0);
    ctx.stroke_cap(StrokeCap::Square);
    ctx.point(Vec3::new(5.0, 5.0, 0.0)).unwrap();
    let square = ctx.batch().geometry.poly.vertex_count();
    assert_eq!(square, 5);
    ctx.stroke_cap(StrokeCap::Round);
    ctx.point(Vec3::new(5.0, 5.0, 0.0)).unwrap();
    assert!(ctx.batch().geometry.poly.vertex_count() > square + 5);
}
