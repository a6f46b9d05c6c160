//! Render context: the shape-building front door.
//!
//! Owns the style state, the current transforms, one [`InGeometry`] that is
//! refilled for every shape and the [`Batch`] that accumulates tessellated
//! output until [`RenderContext::flush`].
//!
//! ```ignore
//! let mut ctx = RenderContext::new(TessConfig::new());
//! ctx.fill(Color::rgba(255, 0, 0, 255));
//! ctx.begin_shape(PrimitiveKind::Polygon)?;
//! ctx.vertex(Vec3::new(0.0, 0.0, 0.0))?;
//! ctx.bezier_vertex(c1, c2, end)?;
//! ctx.end_shape(true)?;
//! ctx.flush(&mut sink);
//! ```

use redlilium_core::math::{is_unscaled_axis_aligned_2d, Mat4, Vec2, Vec3};
use redlilium_core::profiling::{profile_function, profile_plot};

use crate::attribs::AttribValues;
use crate::batch::{Batch, BatchLayouts, BatchSink, FrameBatch, RetainedShape};
use crate::config::TessConfig;
use crate::depth_sorter::sort_poly;
use crate::error::{TessError, TessResult};
use crate::in_geometry::{ArcMode, InGeometry};
use crate::primitive::{PrimitiveKind, VertexCode};
use crate::style::{Color, StrokeCap, StrokeJoin, TextureId, VertexStyle};
use crate::tessellator::Tessellator;

#[derive(Debug, Clone, Copy)]
struct ShapeState {
    kind: PrimitiveKind,
    normal_set: bool,
    in_contour: bool,
    brk: bool,
}

/// Immediate or retained drawing of shapes into GPU-ready batches.
#[derive(Debug)]
pub struct RenderContext {
    config: TessConfig,
    tess: Tessellator,
    geo: InGeometry,
    batch: Batch,
    layouts: BatchLayouts,
    style: VertexStyle,
    attribs: AttribValues,
    fill_enabled: bool,
    stroke_enabled: bool,
    cap: StrokeCap,
    join: StrokeJoin,
    texture: Option<TextureId>,
    modelview: Mat4,
    projection: Mat4,
    depth_sort: bool,
    shape: Option<ShapeState>,
}

impl RenderContext {
    pub fn new(config: TessConfig) -> Self {
        let width = config.attributes.total_components();
        log::info!(
            "Render context: {:?}, {}, {} generic attribute components",
            config.render_mode,
            if config.is_3d { "3D" } else { "2D" },
            width
        );
        Self {
            tess: Tessellator::new(&config),
            geo: InGeometry::new(width),
            batch: Batch::new(width),
            layouts: BatchLayouts::new(&config.attributes),
            style: VertexStyle::with_attrib_width(width),
            attribs: AttribValues::new(&config.attributes),
            fill_enabled: true,
            stroke_enabled: true,
            cap: StrokeCap::default(),
            join: StrokeJoin::default(),
            texture: None,
            modelview: Mat4::identity(),
            projection: Mat4::identity(),
            depth_sort: false,
            shape: None,
            config,
        }
    }

    pub fn config(&self) -> &TessConfig {
        &self.config
    }

    /// Output accumulated since the last flush.
    pub fn batch(&self) -> &Batch {
        &self.batch
    }

    pub fn layouts(&self) -> &BatchLayouts {
        &self.layouts
    }

    pub fn style(&self) -> &VertexStyle {
        &self.style
    }

    // ------------------------------------------------------------------
    // Style
    // ------------------------------------------------------------------

    pub fn fill(&mut self, color: Color) {
        self.style.fill = color;
        self.fill_enabled = true;
    }

    pub fn no_fill(&mut self) {
        self.fill_enabled = false;
    }

    pub fn stroke(&mut self, color: Color) {
        self.style.stroke = color;
        self.stroke_enabled = true;
    }

    pub fn no_stroke(&mut self) {
        self.stroke_enabled = false;
    }

    pub fn stroke_weight(&mut self, weight: f32) {
        self.style.stroke_weight = weight.max(0.0);
    }

    pub fn stroke_cap(&mut self, cap: StrokeCap) {
        self.cap = cap;
    }

    pub fn stroke_join(&mut self, join: StrokeJoin) {
        self.join = join;
    }

    pub fn texture(&mut self, texture: TextureId) {
        self.texture = Some(texture);
    }

    pub fn no_texture(&mut self) {
        self.texture = None;
    }

    pub fn ambient(&mut self, color: Color) {
        self.style.material.ambient = color;
    }

    pub fn specular(&mut self, color: Color) {
        self.style.material.specular = color;
    }

    pub fn emissive(&mut self, color: Color) {
        self.style.material.emissive = color;
    }

    pub fn shininess(&mut self, shininess: f32) {
        self.style.material.shininess = shininess;
    }

    /// Set the current value of a declared generic attribute.
    pub fn attrib(&mut self, name: &str, value: &[f32]) -> TessResult<()> {
        self.attribs.set(name, value)?;
        self.style.attribs.copy_from_slice(self.attribs.values());
        Ok(())
    }

    pub fn bezier_detail(&mut self, detail: usize) {
        self.tess.curves_mut().set_bezier_detail(detail);
    }

    pub fn curve_detail(&mut self, detail: usize) {
        self.tess.curves_mut().set_curve_detail(detail);
    }

    pub fn curve_tightness(&mut self, tightness: f32) {
        self.tess.curves_mut().set_curve_tightness(tightness);
    }

    pub fn sphere_detail(&mut self, longitude: usize, latitude: usize) {
        self.config.sphere_detail = (longitude.max(3), latitude.max(2));
    }

    // ------------------------------------------------------------------
    // Transforms and hints
    // ------------------------------------------------------------------

    pub fn set_modelview(&mut self, modelview: &Mat4) {
        self.modelview = *modelview;
    }

    pub fn set_projection(&mut self, projection: &Mat4) {
        self.projection = *projection;
    }

    pub fn modelview(&self) -> &Mat4 {
        &self.modelview
    }

    /// Sort polygon triangles back to front on flush.
    pub fn hint_depth_sort(&mut self, enabled: bool) {
        self.depth_sort = enabled;
    }

    // ------------------------------------------------------------------
    // Shape building
    // ------------------------------------------------------------------

    pub fn begin_shape(&mut self, kind: PrimitiveKind) -> TessResult<()> {
        self.ensure_idle("begin_shape")?;
        self.geo.clear();
        self.shape = Some(ShapeState {
            kind,
            normal_set: false,
            in_contour: false,
            brk: false,
        });
        Ok(())
    }

    pub fn vertex(&mut self, position: Vec3) -> TessResult<()> {
        let brk = self.take_break("vertex")?;
        self.geo
            .add_vertex(position, &self.style, Some(VertexCode::Vertex), brk);
        Ok(())
    }

    pub fn vertex_uv(&mut self, position: Vec3, uv: Vec2) -> TessResult<()> {
        let brk = self.take_break("vertex_uv")?;
        self.geo.add_vertex_with(
            position,
            self.style.normal,
            uv,
            &self.style,
            Some(VertexCode::Vertex),
            brk,
        );
        Ok(())
    }

    /// Normal of the following vertices. Disables automatic normals for the
    /// current shape.
    pub fn normal(&mut self, normal: Vec3) {
        self.style.normal = normal;
        if let Some(shape) = self.shape.as_mut() {
            shape.normal_set = true;
        }
    }

    pub fn bezier_vertex(&mut self, c1: Vec3, c2: Vec3, end: Vec3) -> TessResult<()> {
        let brk = self.take_curve_break("bezier_vertex")?;
        self.geo.add_bezier_vertex(c1, c2, end, &self.style, brk);
        Ok(())
    }

    pub fn quadratic_vertex(&mut self, control: Vec3, end: Vec3) -> TessResult<()> {
        let brk = self.take_curve_break("quadratic_vertex")?;
        self.geo
            .add_quadratic_vertex(control, end, &self.style, brk);
        Ok(())
    }

    pub fn curve_vertex(&mut self, position: Vec3) -> TessResult<()> {
        let brk = self.take_curve_break("curve_vertex")?;
        self.geo.add_curve_vertex(position, &self.style, brk);
        Ok(())
    }

    /// Start a hole (or further outline) of the current polygon.
    pub fn begin_contour(&mut self) -> TessResult<()> {
        let shape = self.polygon_shape("begin_contour")?;
        if shape.in_contour {
            return Err(TessError::malformed("begin_contour inside an open contour"));
        }
        shape.in_contour = true;
        shape.brk = true;
        Ok(())
    }

    pub fn end_contour(&mut self) -> TessResult<()> {
        let shape = self.polygon_shape("end_contour")?;
        if !shape.in_contour {
            return Err(TessError::malformed("end_contour without begin_contour"));
        }
        shape.in_contour = false;
        Ok(())
    }

    /// Finish the shape and tessellate it. `close` closes a polygon outline.
    pub fn end_shape(&mut self, close: bool) -> TessResult<()> {
        let shape = self.finish_shape("end_shape")?;
        let kind = shape.kind;
        let stroke = self.stroke_enabled;
        let auto_normals = self.config.is_3d && !shape.normal_set;
        match kind {
            PrimitiveKind::Points | PrimitiveKind::Polygon => {}
            PrimitiveKind::Lines => self.geo.add_lines_edges(),
            PrimitiveKind::LineStrip => self.geo.add_polygon_edges(false),
            PrimitiveKind::LineLoop => self.geo.add_polygon_edges(true),
            PrimitiveKind::Triangles => {
                if stroke {
                    self.geo.add_triangles_edges();
                }
                if auto_normals {
                    self.geo.calc_triangles_normals();
                }
            }
            PrimitiveKind::TriangleFan => {
                if stroke {
                    self.geo.add_triangle_fan_edges();
                }
                if auto_normals {
                    self.geo.calc_triangle_fan_normals();
                }
            }
            PrimitiveKind::TriangleStrip => {
                if stroke {
                    self.geo.add_triangle_strip_edges();
                }
                if auto_normals {
                    self.geo.calc_triangle_strip_normals();
                }
            }
            PrimitiveKind::Quads => {
                if stroke {
                    self.geo.add_quads_edges();
                }
                if auto_normals {
                    self.geo.calc_quads_normals();
                }
            }
            PrimitiveKind::QuadStrip => {
                if stroke {
                    self.geo.add_quad_strip_edges();
                }
                if auto_normals {
                    self.geo.calc_quad_strip_normals();
                }
            }
        }
        self.sync_tessellator(kind == PrimitiveKind::Polygon && auto_normals);
        self.tess.tessellate(&self.geo, kind, close, &mut self.batch)
    }

    /// Finish a `Triangles` shape whose connectivity is given by `indices`.
    pub fn end_shape_indexed(&mut self, indices: &[usize]) -> TessResult<()> {
        let shape = self.finish_shape("end_shape_indexed")?;
        if shape.kind == PrimitiveKind::Triangles && self.stroke_enabled {
            self.geo.add_indexed_triangles_edges(indices);
        }
        self.sync_tessellator(false);
        self.tess
            .tessellate_indexed(&self.geo, shape.kind, indices, &mut self.batch)
    }

    // ------------------------------------------------------------------
    // Primitives
    // ------------------------------------------------------------------

    pub fn point(&mut self, p: Vec3) -> TessResult<()> {
        self.begin_primitive("point")?;
        self.geo.add_point(p, &self.style);
        self.draw(PrimitiveKind::Points)
    }

    pub fn line(&mut self, p0: Vec3, p1: Vec3) -> TessResult<()> {
        self.begin_primitive("line")?;
        self.geo.add_line(p0, p1, &self.style);
        self.draw(PrimitiveKind::Lines)
    }

    pub fn triangle(&mut self, p: [Vec3; 3]) -> TessResult<()> {
        self.begin_primitive("triangle")?;
        self.geo.add_triangle(p, &self.style, self.stroke_enabled);
        if self.config.is_3d {
            self.geo.calc_triangles_normals();
        }
        self.draw(PrimitiveKind::Triangles)
    }

    pub fn quad(&mut self, p: [Vec3; 4]) -> TessResult<()> {
        self.begin_primitive("quad")?;
        self.geo.add_quad(p, &self.style, self.stroke_enabled);
        if self.config.is_3d {
            self.geo.calc_quads_normals();
        }
        self.draw(PrimitiveKind::Quads)
    }

    /// Rectangle with its top-left corner at `(x, y)`. In 2D with pixel
    /// clamping enabled, unrotated unscaled rectangles snap to whole pixels.
    pub fn rect(&mut self, x: f32, y: f32, w: f32, h: f32) -> TessResult<()> {
        self.begin_primitive("rect")?;
        let clamp = self.config.caps.pixel_clamp
            && !self.config.is_3d
            && is_unscaled_axis_aligned_2d(&self.modelview);
        self.geo
            .add_rect(x, y, w, h, &self.style, self.stroke_enabled, clamp);
        self.draw(PrimitiveKind::Quads)
    }

    /// Rectangle with corner radii given clockwise from the top-left.
    pub fn rounded_rect(&mut self, x: f32, y: f32, w: f32, h: f32, radii: [f32; 4]) -> TessResult<()> {
        self.begin_primitive("rounded_rect")?;
        self.geo.add_rounded_rect(x, y, w, h, radii, &self.style);
        self.sync_tessellator(false);
        self.tess
            .tessellate(&self.geo, PrimitiveKind::Polygon, true, &mut self.batch)
    }

    /// Ellipse centered at `(x, y)` with diameters `w` and `h`.
    pub fn ellipse(&mut self, x: f32, y: f32, w: f32, h: f32) -> TessResult<()> {
        self.begin_primitive("ellipse")?;
        let indices = self.geo.add_ellipse(
            x,
            y,
            w,
            h,
            &self.style,
            self.fill_enabled,
            self.stroke_enabled,
            &self.modelview,
        );
        self.draw_indexed(&indices)
    }

    pub fn arc(
        &mut self,
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        start: f32,
        stop: f32,
        mode: ArcMode,
    ) -> TessResult<()> {
        self.begin_primitive("arc")?;
        let indices = self.geo.add_arc(
            x,
            y,
            w,
            h,
            start,
            stop,
            mode,
            &self.style,
            self.fill_enabled,
            self.stroke_enabled,
            &self.modelview,
        );
        self.draw_indexed(&indices)
    }

    pub fn box_shape(&mut self, size: Vec3) -> TessResult<()> {
        self.begin_primitive("box_shape")?;
        self.geo.add_box(size, &self.style, self.stroke_enabled);
        self.draw(PrimitiveKind::Quads)
    }

    pub fn sphere(&mut self, radius: f32) -> TessResult<()> {
        self.begin_primitive("sphere")?;
        let indices = self.geo.add_sphere(
            radius,
            self.config.sphere_detail,
            &self.style,
            self.stroke_enabled,
        );
        self.draw_indexed(&indices)
    }

    // ------------------------------------------------------------------
    // Output
    // ------------------------------------------------------------------

    /// Hand the accumulated batch to `sink` and start a new one.
    pub fn flush(&mut self, sink: &mut dyn BatchSink) {
        if self.batch.is_empty() {
            return;
        }
        profile_function!();
        let sorted = self.depth_sort && !self.config.is_retained();
        if sorted {
            sort_poly(
                &mut self.batch.geometry.poly,
                &mut self.batch.textures,
                &self.projection,
            );
        }
        let frame = FrameBatch::new(&self.batch, &self.layouts, sorted);
        profile_plot!("Flushed vertices", frame.vertex_count());
        log::debug!(
            "Flushing {} vertices, {} indices in {} draw calls",
            frame.vertex_count(),
            frame.index_count(),
            frame.draw_call_count()
        );
        sink.submit(&frame);
        self.batch.clear();
    }

    /// Take everything tessellated so far as a retained shape.
    pub fn take_retained(&mut self) -> RetainedShape {
        let width = self.config.attributes.total_components();
        RetainedShape::new(std::mem::replace(&mut self.batch, Batch::new(width)))
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn ensure_idle(&self, what: &str) -> TessResult<()> {
        if self.shape.is_some() {
            return Err(TessError::malformed(format!(
                "{what} called between begin_shape and end_shape"
            )));
        }
        Ok(())
    }

    fn begin_primitive(&mut self, what: &str) -> TessResult<()> {
        self.ensure_idle(what)?;
        self.geo.clear();
        Ok(())
    }

    fn shape_mut(&mut self, what: &str) -> TessResult<&mut ShapeState> {
        self.shape
            .as_mut()
            .ok_or_else(|| TessError::malformed(format!("{what} called outside begin_shape")))
    }

    fn polygon_shape(&mut self, what: &str) -> TessResult<&mut ShapeState> {
        let shape = self.shape_mut(what)?;
        if shape.kind != PrimitiveKind::Polygon {
            return Err(TessError::malformed(format!(
                "{what} requires a Polygon shape, not {:?}",
                shape.kind
            )));
        }
        Ok(shape)
    }

    fn take_break(&mut self, what: &str) -> TessResult<bool> {
        let shape = self.shape_mut(what)?;
        Ok(std::mem::take(&mut shape.brk))
    }

    fn take_curve_break(&mut self, what: &str) -> TessResult<bool> {
        let shape = self.polygon_shape(what)?;
        Ok(std::mem::take(&mut shape.brk))
    }

    fn finish_shape(&mut self, what: &str) -> TessResult<ShapeState> {
        let shape = self
            .shape
            .take()
            .ok_or_else(|| TessError::malformed(format!("{what} without begin_shape")))?;
        if shape.in_contour {
            return Err(TessError::malformed(format!(
                "{what} with an open contour"
            )));
        }
        Ok(shape)
    }

    fn sync_tessellator(&mut self, auto_normals: bool) {
        self.tess.set_fill(self.fill_enabled);
        self.tess.set_stroke(self.stroke_enabled);
        self.tess.set_stroke_cap(self.cap);
        self.tess.set_stroke_join(self.join);
        self.tess.set_texture(self.texture);
        self.tess.set_auto_normals(auto_normals);
        self.tess.set_transform(&self.modelview);
    }

    fn draw(&mut self, kind: PrimitiveKind) -> TessResult<()> {
        self.sync_tessellator(false);
        self.tess.tessellate(&self.geo, kind, false, &mut self.batch)
    }

    fn draw_indexed(&mut self, indices: &[usize]) -> TessResult<()> {
        self.sync_tessellator(false);
        self.tess.tessellate_indexed(
            &self.geo,
            PrimitiveKind::Triangles,
            indices,
            &mut self.batch,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::BatchStats;
    use crate::config::RenderMode;
    use redlilium_core::math::mat4_from_translation;

    fn ctx() -> RenderContext {
        RenderContext::new(TessConfig::new())
    }

    #[test]
    fn test_projected_line_segment() {
        let mut ctx = ctx();
        ctx.stroke_weight(2.0);
        ctx.stroke_cap(StrokeCap::Project);
        ctx.line(Vec3::zeros(), Vec3::new(10.0, 0.0, 0.0)).unwrap();
        let poly = &ctx.batch().geometry.poly;
        assert_eq!(poly.vertex_count(), 4);
        assert_eq!(poly.index_count(), 6);
        let xs: Vec<f32> = poly.positions.iter().map(|p| p[0]).collect();
        assert!(xs.iter().all(|&x| x == -1.0 || x == 11.0));
        assert!(poly.positions.iter().all(|p| p[1].abs() == 1.0));
    }

    #[test]
    fn test_filled_ellipse_vertex_count() {
        let mut ctx = ctx();
        ctx.no_stroke();
        ctx.ellipse(50.0, 50.0, 100.0, 100.0).unwrap();
        let poly = &ctx.batch().geometry.poly;
        // Bounding box diagonal 141.4 gives 89 subdivisions plus the center.
        assert_eq!(poly.vertex_count(), 90);
        assert_eq!(poly.index_count(), 89 * 3);
    }

    #[test]
    fn test_contour_mismatch_is_malformed() {
        let mut ctx = ctx();
        assert!(matches!(ctx.end_contour(), Err(TessError::MalformedShape(_))));
        ctx.begin_shape(PrimitiveKind::Polygon).unwrap();
        assert!(ctx.end_contour().is_err());
        ctx.begin_contour().unwrap();
        assert!(ctx.end_shape(true).is_err());
        assert!(ctx.end_shape(true).is_err());
    }

    #[test]
    fn test_nested_begin_shape_is_malformed() {
        let mut ctx = ctx();
        ctx.begin_shape(PrimitiveKind::Triangles).unwrap();
        assert!(ctx.begin_shape(PrimitiveKind::Lines).is_err());
        assert!(ctx.rect(0.0, 0.0, 1.0, 1.0).is_err());
        assert!(ctx.bezier_vertex(Vec3::x(), Vec3::y(), Vec3::z()).is_err());
    }

    #[test]
    fn test_polygon_with_hole() {
        let mut ctx = ctx();
        ctx.no_stroke();
        ctx.begin_shape(PrimitiveKind::Polygon).unwrap();
        for (x, y) in [(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)] {
            ctx.vertex(Vec3::new(x, y, 0.0)).unwrap();
        }
        ctx.begin_contour().unwrap();
        for (x, y) in [(3.0, 3.0), (3.0, 7.0), (7.0, 7.0), (7.0, 3.0)] {
            ctx.vertex(Vec3::new(x, y, 0.0)).unwrap();
        }
        ctx.end_contour().unwrap();
        ctx.end_shape(true).unwrap();
        let poly = &ctx.batch().geometry.poly;
        assert_eq!(poly.vertex_count(), 8);
        assert_eq!(poly.index_count(), 8 * 3);
    }

    #[test]
    fn test_same_texture_coalesces() {
        let mut ctx = ctx();
        ctx.no_stroke();
        ctx.texture(TextureId(1));
        for i in 0..3 {
            ctx.rect(i as f32 * 20.0, 0.0, 10.0, 10.0).unwrap();
        }
        assert_eq!(ctx.batch().textures.len(), 1);
        ctx.texture(TextureId(2));
        ctx.rect(0.0, 20.0, 10.0, 10.0).unwrap();
        assert_eq!(ctx.batch().textures.len(), 2);
    }

    #[test]
    fn test_flush_hands_off_and_clears() {
        let mut ctx = ctx();
        ctx.rect(0.0, 0.0, 10.0, 10.0).unwrap();
        let mut stats = BatchStats::default();
        ctx.flush(&mut stats);
        assert_eq!(stats.frames, 1);
        assert!(stats.draw_calls >= 1);
        assert!(ctx.batch().is_empty());
        ctx.flush(&mut stats);
        assert_eq!(stats.frames, 1);
    }

    #[test]
    fn test_depth_sorted_flush() {
        let mut ctx = RenderContext::new(TessConfig::new().with_3d(true));
        ctx.no_stroke();
        ctx.hint_depth_sort(true);
        ctx.triangle([Vec3::zeros(), Vec3::x(), Vec3::y()]).unwrap();
        ctx.triangle([Vec3::new(0.0, 0.0, 1.0), Vec3::new(1.0, 0.0, 1.0), Vec3::new(0.0, 1.0, 1.0)])
            .unwrap();
        let mut stats = BatchStats::default();
        ctx.flush(&mut stats);
        assert_eq!(stats.sorted_frames, 1);
    }

    #[test]
    fn test_auto_normals_in_3d() {
        let mut ctx = RenderContext::new(TessConfig::new().with_3d(true));
        ctx.no_stroke();
        ctx.triangle([Vec3::zeros(), Vec3::x(), Vec3::y()]).unwrap();
        let poly = &ctx.batch().geometry.poly;
        assert!(poly.normals.iter().all(|n| *n == [0.0, 0.0, 1.0]));
    }

    #[test]
    fn test_retained_geometry_is_untransformed() {
        let config = TessConfig::new().with_render_mode(RenderMode::Retained);
        let mut ctx = RenderContext::new(config);
        ctx.no_stroke();
        ctx.set_modelview(&mat4_from_translation(Vec3::new(100.0, 0.0, 0.0)));
        ctx.rect(0.0, 0.0, 10.0, 10.0).unwrap();
        let shape = ctx.take_retained();
        assert!(ctx.batch().is_empty());
        let poly = &shape.batch().geometry.poly;
        assert!(poly.positions.iter().all(|p| p[0] <= 10.0));
        let mut stats = BatchStats::default();
        shape.draw(ctx.layouts(), &mut stats);
        assert_eq!(stats.vertices, 4);
    }

    #[test]
    fn test_unknown_attribute_rejected() {
        let mut ctx = ctx();
        assert!(matches!(ctx.attrib("missing", &[1.0]), Err(TessError::Attribute(_))));
    }
}
