//! Demo scenes. Each one only issues drawing calls on a [`RenderContext`].

use std::f32::consts::PI;

use redlilium_tessellator::math::{
    Mat4, Vec3, mat4_from_rotation_z, mat4_from_scale, mat4_from_translation,
};
use redlilium_tessellator::{
    ArcMode, Color, PrimitiveKind, RenderContext, StrokeCap, StrokeJoin, TessResult, TextureId,
};

/// Primitives, caps and joins in 2D.
pub fn shapes_2d(ctx: &mut RenderContext) -> TessResult<()> {
    ctx.fill(Color::rgba(230, 80, 60, 255));
    ctx.stroke(Color::BLACK);
    ctx.stroke_weight(1.0);
    ctx.rect(10.0, 10.0, 80.0, 60.0)?;
    ctx.rounded_rect(110.0, 10.0, 80.0, 60.0, [12.0, 4.0, 12.0, 0.0])?;
    ctx.ellipse(250.0, 40.0, 60.0, 60.0)?;
    ctx.arc(330.0, 40.0, 60.0, 60.0, 0.0, 1.5 * PI, ArcMode::Pie)?;

    ctx.no_fill();
    ctx.stroke_weight(8.0);
    let caps = [StrokeCap::Square, StrokeCap::Project, StrokeCap::Round];
    for (i, cap) in caps.into_iter().enumerate() {
        let y = 100.0 + i as f32 * 20.0;
        ctx.stroke_cap(cap);
        ctx.line(Vec3::new(20.0, y, 0.0), Vec3::new(180.0, y, 0.0))?;
    }

    let joins = [StrokeJoin::Miter, StrokeJoin::Bevel, StrokeJoin::Round];
    for (i, join) in joins.into_iter().enumerate() {
        let x = 220.0 + i as f32 * 60.0;
        ctx.stroke_join(join);
        ctx.begin_shape(PrimitiveKind::LineStrip)?;
        ctx.vertex(Vec3::new(x, 150.0, 0.0))?;
        ctx.vertex(Vec3::new(x + 20.0, 100.0, 0.0))?;
        ctx.vertex(Vec3::new(x + 40.0, 150.0, 0.0))?;
        ctx.end_shape(false)?;
    }

    ctx.stroke_weight(6.0);
    ctx.stroke_cap(StrokeCap::Round);
    for i in 0..5 {
        ctx.point(Vec3::new(20.0 + i as f32 * 15.0, 190.0, 0.0))?;
    }

    // Stretched outline under a non-uniform scale.
    ctx.stroke_weight(2.0);
    ctx.set_modelview(&mat4_from_scale(Vec3::new(2.5, 1.5, 1.0)));
    ctx.rect(100.0, 130.0, 30.0, 20.0)?;
    ctx.set_modelview(&Mat4::identity());
    Ok(())
}

/// Polygons with curves, holes and textured runs.
pub fn curves_and_holes(ctx: &mut RenderContext) -> TessResult<()> {
    ctx.fill(Color::rgba(60, 120, 220, 255));
    ctx.stroke(Color::WHITE);
    ctx.stroke_weight(3.0);
    ctx.stroke_join(StrokeJoin::Round);

    ctx.begin_shape(PrimitiveKind::Polygon)?;
    ctx.vertex(Vec3::new(0.0, 0.0, 0.0))?;
    ctx.bezier_vertex(
        Vec3::new(80.0, -40.0, 0.0),
        Vec3::new(160.0, 40.0, 0.0),
        Vec3::new(200.0, 0.0, 0.0),
    )?;
    ctx.quadratic_vertex(Vec3::new(240.0, 100.0, 0.0), Vec3::new(200.0, 200.0, 0.0))?;
    ctx.vertex(Vec3::new(0.0, 200.0, 0.0))?;
    ctx.begin_contour()?;
    for (x, y) in [(50.0, 50.0), (50.0, 150.0), (150.0, 150.0), (150.0, 50.0)] {
        ctx.vertex(Vec3::new(x, y, 0.0))?;
    }
    ctx.end_contour()?;
    ctx.end_shape(true)?;

    ctx.no_stroke();
    ctx.begin_shape(PrimitiveKind::Polygon)?;
    for i in 0..8 {
        let a = i as f32 * PI / 4.0;
        let r = if i % 2 == 0 { 60.0 } else { 25.0 };
        ctx.curve_vertex(Vec3::new(350.0 + r * a.cos(), 100.0 + r * a.sin(), 0.0))?;
    }
    ctx.end_shape(true)?;

    ctx.texture(TextureId(1));
    for i in 0..4 {
        ctx.rect(20.0 + i as f32 * 50.0, 240.0, 40.0, 40.0)?;
    }
    ctx.no_texture();
    Ok(())
}

/// Lit solids under a rotating modelview.
pub fn solids_3d(ctx: &mut RenderContext, frame: usize) -> TessResult<()> {
    let angle = frame as f32 * 0.05;
    ctx.fill(Color::rgba(200, 200, 200, 255));
    ctx.specular(Color::gray(255));
    ctx.shininess(16.0);

    ctx.set_modelview(&(mat4_from_translation(Vec3::new(-3.0, 0.0, -10.0)) * mat4_from_rotation_z(angle)));
    ctx.stroke_weight(1.0);
    ctx.box_shape(Vec3::new(2.0, 2.0, 2.0))?;

    ctx.no_stroke();
    ctx.set_modelview(&mat4_from_translation(Vec3::new(3.0, 0.0, -12.0)));
    ctx.sphere(1.5)?;

    ctx.set_modelview(&mat4_from_translation(Vec3::new(0.0, 0.0, -8.0)));
    ctx.begin_shape(PrimitiveKind::TriangleStrip)?;
    for i in 0..10 {
        let x = i as f32 * 0.5 - 2.5;
        let z = if i % 2 == 0 { 0.0 } else { -1.0 };
        ctx.vertex(Vec3::new(x, (x + angle).sin(), z))?;
    }
    ctx.end_shape(false)?;
    Ok(())
}

/// A fan large enough to need several index caches.
pub fn stress_fan(ctx: &mut RenderContext, vertices: usize) -> TessResult<()> {
    ctx.no_stroke();
    ctx.fill(Color::rgba(120, 200, 80, 255));
    ctx.begin_shape(PrimitiveKind::TriangleFan)?;
    ctx.vertex(Vec3::new(0.0, 0.0, 0.0))?;
    for i in 1..vertices {
        let a = i as f32 / vertices as f32 * 2.0 * PI;
        ctx.vertex(Vec3::new(100.0 * a.cos(), 100.0 * a.sin(), 0.0))?;
    }
    ctx.end_shape(false)
}
