//! Stroke geometry from edge lists.
//!
//! Edges are walked path by path. Each segment becomes one quad; consecutive
//! segments of a path that share an index cache and are not collinear get a
//! bevel made of a center vertex and two triangles. A [`EdgeKind::Close`]
//! marker bevels the last segment back to the first one.

use redlilium_core::math::{is_unscaled_axis_aligned_2d, Vec3};
use redlilium_core::profiling::profile_function;

use super::{split_raw_indices, stroke_outline, stroke_vertex, Tessellator, Transform};
use crate::batch::Batch;
use crate::config::MAX_VERTEX_INDEX;
use crate::error::TessResult;
use crate::in_geometry::InGeometry;
use crate::primitive::{push_polygon_edges, Edge, EdgeKind};
use crate::style::StrokeCap;
use crate::tess_geometry::{LineBuffer, PolyBuffer};

/// Anything that provides stroke topology.
pub(crate) trait StrokeSource {
    fn edges(&self) -> &[Edge];
    fn stroke_position(&self, i: usize) -> Vec3;
    fn stroke_color(&self, i: usize) -> u32;
    fn stroke_weight(&self, i: usize) -> f32;
    fn max_stroke_weight(&self) -> f32;
}

impl StrokeSource for InGeometry {
    fn edges(&self) -> &[Edge] {
        InGeometry::edges(self)
    }

    fn stroke_position(&self, i: usize) -> Vec3 {
        self.position(i)
    }

    fn stroke_color(&self, i: usize) -> u32 {
        InGeometry::stroke_color(self, i)
    }

    fn stroke_weight(&self, i: usize) -> f32 {
        InGeometry::stroke_weight(self, i)
    }

    fn max_stroke_weight(&self) -> f32 {
        InGeometry::max_stroke_weight(self)
    }
}

/// Stroke path rebuilt from flattened polygon contours.
#[derive(Debug, Clone, Default)]
pub(crate) struct StrokePath {
    positions: Vec<Vec3>,
    colors: Vec<u32>,
    weights: Vec<f32>,
    edges: Vec<Edge>,
}

impl StrokePath {
    pub fn push(&mut self, position: Vec3, color: u32, weight: f32) -> usize {
        self.positions.push(position);
        self.colors.push(color);
        self.weights.push(weight);
        self.positions.len() - 1
    }

    /// Connect vertices `first..=last` into one path.
    pub fn add_polyline(&mut self, first: usize, last: usize, closed: bool) {
        push_polygon_edges(&mut self.edges, first, last, closed);
    }
}

impl StrokeSource for StrokePath {
    fn edges(&self) -> &[Edge] {
        &self.edges
    }

    fn stroke_position(&self, i: usize) -> Vec3 {
        self.positions[i]
    }

    fn stroke_color(&self, i: usize) -> u32 {
        self.colors[i]
    }

    fn stroke_weight(&self, i: usize) -> f32 {
        self.weights[i]
    }

    fn max_stroke_weight(&self) -> f32 {
        self.weights.iter().copied().fold(0.0, f32::max)
    }
}

/// One written segment: its cache and the cache-relative index of its first
/// vertex.
#[derive(Debug, Clone, Copy)]
struct Segment {
    cache: usize,
    first: usize,
    dir: Vec3,
}

/// Output buffer receiving stroke segments.
trait SegmentWriter {
    fn segment(&mut self, p0: Vec3, p1: Vec3, c0: u32, c1: u32, weight: f32)
        -> TessResult<Segment>;

    /// Fill the gap between `from` and `to` around the joint `center`.
    fn bevel(&mut self, from: &Segment, to: &Segment, center: Vec3, color: u32);

    fn has_room(&self, cache: usize) -> bool;
}

/// Segments become 2D quads in the poly buffer.
struct PolyQuads<'a> {
    poly: &'a mut PolyBuffer,
    cap: StrokeCap,
    scale: f32,
    /// Snap the endpoints of axis-aligned segments to whole pixels.
    clamp: bool,
    attribs: &'a [f32],
}

/// Round the endpoints of an axis-aligned segment to whole pixels. Segments
/// that would collapse are left as they are.
fn clamp_segment(p0: Vec3, p1: Vec3) -> (Vec3, Vec3) {
    let d = p1 - p0;
    if d.x.abs() > f32::EPSILON && d.y.abs() > f32::EPSILON {
        return (p0, p1);
    }
    let snap = |p: Vec3| Vec3::new(p.x.round(), p.y.round(), p.z);
    let (q0, q1) = (snap(p0), snap(p1));
    if (q1 - q0).norm_squared() <= f32::EPSILON {
        (p0, p1)
    } else {
        (q0, q1)
    }
}

impl SegmentWriter for PolyQuads<'_> {
    fn segment(
        &mut self,
        p0: Vec3,
        p1: Vec3,
        c0: u32,
        c1: u32,
        weight: f32,
    ) -> TessResult<Segment> {
        let (p0, p1) = if self.clamp {
            clamp_segment(p0, p1)
        } else {
            (p0, p1)
        };
        let half = 0.5 * weight * self.scale;
        let d = (p1 - p0).normalize();
        let n = Vec3::new(-d.y, d.x, 0.0)
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(Vec3::x)
            * half;
        let ext = if self.cap == StrokeCap::Project {
            half
        } else {
            half.min(0.75)
        };

        let cache = self.poly.cache.reserve(5, false)?;
        let first = self.poly.cache.vertex_count(cache);
        let a = self.attribs;
        self.poly.push_vertex(&stroke_vertex(p0 + n - d * ext, c0, a));
        self.poly.push_vertex(&stroke_vertex(p0 - n - d * ext, c0, a));
        self.poly.push_vertex(&stroke_vertex(p1 - n + d * ext, c1, a));
        self.poly.push_vertex(&stroke_vertex(p1 + n + d * ext, c1, a));
        for k in [0, 1, 2, 2, 3, 0] {
            self.poly.indices.push((first + k) as u16);
        }
        self.poly.cache.inc_counts(cache, 6, 4);
        Ok(Segment {
            cache,
            first,
            dir: d,
        })
    }

    fn bevel(&mut self, from: &Segment, to: &Segment, center: Vec3, color: u32) {
        let c = self.poly.cache.vertex_count(to.cache);
        self.poly
            .push_vertex(&stroke_vertex(center, color, self.attribs));
        for k in [c, from.first + 3, to.first, c, from.first + 2, to.first + 1] {
            self.poly.indices.push(k as u16);
        }
        self.poly.cache.inc_counts(to.cache, 6, 1);
    }

    fn has_room(&self, cache: usize) -> bool {
        self.poly.cache.vertex_count(cache) < MAX_VERTEX_INDEX
    }
}

/// Segments expanded by the line shader: each vertex carries the direction
/// to the opposite end and a signed half weight.
struct LineQuads<'a> {
    line: &'a mut LineBuffer,
}

impl SegmentWriter for LineQuads<'_> {
    fn segment(
        &mut self,
        p0: Vec3,
        p1: Vec3,
        c0: u32,
        c1: u32,
        weight: f32,
    ) -> TessResult<Segment> {
        let half = 0.5 * weight;
        let dir = p1 - p0;
        let cache = self.line.cache.reserve(5, false)?;
        let first = self.line.cache.vertex_count(cache);
        self.line.push_vertex(p0, c0, dir, half);
        self.line.push_vertex(p0, c0, dir, -half);
        self.line.push_vertex(p1, c1, -dir, -half);
        self.line.push_vertex(p1, c1, -dir, half);
        for k in [0, 2, 1, 2, 3, 1] {
            self.line.indices.push((first + k) as u16);
        }
        self.line.cache.inc_counts(cache, 6, 4);
        Ok(Segment {
            cache,
            first,
            dir: dir.normalize(),
        })
    }

    fn bevel(&mut self, from: &Segment, to: &Segment, center: Vec3, color: u32) {
        let c = self.line.cache.vertex_count(to.cache);
        self.line.push_vertex(center, color, Vec3::zeros(), 0.0);
        // The end vertices of `from` point backwards, so their sides swap.
        for k in [c, from.first + 2, to.first, c, from.first + 3, to.first + 1] {
            self.line.indices.push(k as u16);
        }
        self.line.cache.inc_counts(to.cache, 6, 1);
    }

    fn has_room(&self, cache: usize) -> bool {
        self.line.cache.vertex_count(cache) < MAX_VERTEX_INDEX
    }
}

fn joinable<W: SegmentWriter>(writer: &W, a: &Segment, b: &Segment) -> bool {
    a.cache == b.cache && writer.has_room(b.cache) && a.dir.cross(&b.dir).norm() > 1e-4
}

/// Write every edge of `src` as a quad, with bevels between the segments of
/// each path.
fn walk_edges<S, W>(src: &S, transform: &Transform, writer: &mut W) -> TessResult<()>
where
    S: StrokeSource + ?Sized,
    W: SegmentWriter,
{
    let mut first: Option<Segment> = None;
    let mut prev: Option<Segment> = None;
    for edge in src.edges() {
        if edge.kind == EdgeKind::Close {
            if let (Some(last), Some(head)) = (prev, first) {
                if joinable(writer, &last, &head) {
                    let center = transform.point(&src.stroke_position(edge.end));
                    writer.bevel(&last, &head, center, src.stroke_color(edge.end));
                }
            }
            continue;
        }
        if edge.kind.starts_path() {
            first = None;
            prev = None;
        }

        let p0 = transform.point(&src.stroke_position(edge.start));
        let p1 = transform.point(&src.stroke_position(edge.end));
        if (p1 - p0).norm_squared() <= f32::EPSILON {
            continue;
        }
        let c0 = src.stroke_color(edge.start);
        let segment = writer.segment(
            p0,
            p1,
            c0,
            src.stroke_color(edge.end),
            src.stroke_weight(edge.start),
        )?;
        if let Some(last) = prev {
            if joinable(writer, &last, &segment) {
                writer.bevel(&last, &segment, p0, c0);
            }
        }
        if first.is_none() {
            first = Some(segment);
        }
        prev = Some(segment);
    }
    Ok(())
}

impl Tessellator {
    /// Stroke the edges of `src` with the path suited to the current
    /// dimension, capabilities and stroke weight.
    pub(crate) fn tessellate_edges<S: StrokeSource + ?Sized>(
        &self,
        src: &S,
        out: &mut Batch,
    ) -> TessResult<()> {
        if !self.stroke || src.edges().is_empty() {
            return Ok(());
        }
        profile_function!();
        if self.is_3d && self.caps.shader_lines {
            let mut writer = LineQuads {
                line: &mut out.geometry.line,
            };
            return walk_edges(src, &self.transform, &mut writer);
        }
        if self.is_3d || self.no_caps_joins(src) {
            let poly = &mut out.geometry.poly;
            out.textures.begin_no_tex(poly);
            let mut writer = PolyQuads {
                poly,
                cap: self.cap,
                scale: self.transform.scale(),
                clamp: self.caps.pixel_clamp
                    && !self.is_3d
                    && is_unscaled_axis_aligned_2d(self.transform.matrix()),
                attribs: &self.zero_attribs,
            };
            let result = walk_edges(src, &self.transform, &mut writer);
            out.textures.end_tex(&out.geometry.poly);
            return result;
        }
        self.tessellate_stroke_outline(src, out)
    }

    /// Slow path: stroke outline with real caps and joins, filled as a
    /// polygon.
    fn tessellate_stroke_outline<S: StrokeSource + ?Sized>(
        &self,
        src: &S,
        out: &mut Batch,
    ) -> TessResult<()> {
        let Some(mut source) = stroke_outline::outline(
            src,
            &self.transform,
            self.cap,
            self.join,
            self.tolerance,
            &self.zero_attribs,
        ) else {
            return Ok(());
        };
        let poly = &mut out.geometry.poly;
        out.textures.begin_no_tex(poly);
        let raw: Vec<usize> = source.indices().iter().map(|&i| i as usize).collect();
        let result = split_raw_indices(&raw, &mut source, poly, self.retained);
        out.textures.end_tex(poly);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TessConfig;
    use crate::style::VertexStyle;

    fn segment_geo(weight: f32) -> InGeometry {
        let mut geo = InGeometry::new(0);
        let style = VertexStyle {
            stroke_weight: weight,
            ..VertexStyle::default()
        };
        geo.add_line(Vec3::zeros(), Vec3::new(10.0, 0.0, 0.0), &style);
        geo
    }

    #[test]
    fn test_projected_segment_quad() {
        let mut tess = Tessellator::new(&TessConfig::new());
        tess.set_stroke_cap(StrokeCap::Project);
        let geo = segment_geo(2.0);
        let mut out = Batch::new(0);
        tess.tessellate_edges(&geo, &mut out).unwrap();

        let poly = &out.geometry.poly;
        assert_eq!(poly.vertex_count(), 4);
        assert_eq!(poly.index_count(), 6);
        let xs: Vec<f32> = (0..4).map(|i| poly.position(i).x).collect();
        let ys: Vec<f32> = (0..4).map(|i| poly.position(i).y).collect();
        assert_eq!(xs, vec![-1.0, -1.0, 11.0, 11.0]);
        assert_eq!(ys, vec![1.0, -1.0, -1.0, 1.0]);
        assert_eq!(out.textures.len(), 1);
        assert_eq!(out.textures.entries()[0].texture, None);
    }

    #[test]
    fn test_thin_square_cap_nudge() {
        let mut tess = Tessellator::new(&TessConfig::new());
        tess.set_stroke_cap(StrokeCap::Square);
        let geo = segment_geo(1.0);
        let mut out = Batch::new(0);
        tess.tessellate_edges(&geo, &mut out).unwrap();
        let poly = &out.geometry.poly;
        // Thin strokes always take the fast path, nudged by min(0.75, w/2).
        assert_eq!(poly.position(0).x, -0.5);
        assert_eq!(poly.position(3).x, 10.5);
    }

    #[test]
    fn test_polyline_bevels() {
        let tess = Tessellator::new(&TessConfig::new());
        let mut geo = InGeometry::new(0);
        let style = VertexStyle::default();
        for p in [(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)] {
            geo.add_vertex(Vec3::new(p.0, p.1, 0.0), &style, None, false);
        }
        geo.add_polygon_edges(true);
        let mut out = Batch::new(0);
        tess.tessellate_edges(&geo, &mut out).unwrap();
        // Three quads plus three bevels (two joints and the closing one).
        let poly = &out.geometry.poly;
        assert_eq!(poly.vertex_count(), 3 * 4 + 3);
        assert_eq!(poly.index_count(), 3 * 6 + 3 * 6);
        assert_eq!(poly.cache.len(), 1);
    }

    #[test]
    fn test_collinear_segments_have_no_bevel() {
        let tess = Tessellator::new(&TessConfig::new());
        let mut geo = InGeometry::new(0);
        let style = VertexStyle::default();
        for x in [0.0, 5.0, 10.0] {
            geo.add_vertex(Vec3::new(x, 0.0, 0.0), &style, None, false);
        }
        geo.add_polygon_edges(false);
        let mut out = Batch::new(0);
        tess.tessellate_edges(&geo, &mut out).unwrap();
        assert_eq!(out.geometry.poly.vertex_count(), 8);
    }

    #[test]
    fn test_3d_strokes_use_line_buffer() {
        let tess = Tessellator::new(&TessConfig::new().with_3d(true));
        let geo = segment_geo(4.0);
        let mut out = Batch::new(0);
        tess.tessellate_edges(&geo, &mut out).unwrap();
        let line = &out.geometry.line;
        assert_eq!(line.vertex_count(), 4);
        assert_eq!(line.indices, vec![0, 2, 1, 2, 3, 1]);
        assert_eq!(line.directions[0], [10.0, 0.0, 0.0, 2.0]);
        assert_eq!(line.directions[2], [-10.0, 0.0, 0.0, -2.0]);
        assert_eq!(out.geometry.poly.vertex_count(), 0);
    }

    #[test]
    fn test_axis_aligned_segment_snaps_to_pixels() {
        let mut tess = Tessellator::new(&TessConfig::new());
        tess.set_stroke_cap(StrokeCap::Project);
        let mut geo = InGeometry::new(0);
        let style = VertexStyle {
            stroke_weight: 2.0,
            ..VertexStyle::default()
        };
        geo.add_line(Vec3::new(0.4, 5.3, 0.0), Vec3::new(9.6, 5.3, 0.0), &style);
        let mut out = Batch::new(0);
        tess.tessellate_edges(&geo, &mut out).unwrap();
        let poly = &out.geometry.poly;
        assert_eq!(poly.position(0), Vec3::new(-1.0, 6.0, 0.0));
        assert_eq!(poly.position(2), Vec3::new(11.0, 4.0, 0.0));
    }

    #[test]
    fn test_clamp_leaves_diagonals_alone() {
        let p0 = Vec3::new(0.3, 0.3, 0.0);
        let p1 = Vec3::new(5.7, 2.2, 0.0);
        assert_eq!(clamp_segment(p0, p1), (p0, p1));
        let q = Vec3::new(0.6, 0.0, 0.0);
        assert_eq!(clamp_segment(Vec3::zeros(), Vec3::new(0.2, 0.0, 0.0)).1.x, 0.2);
        assert_eq!(clamp_segment(q, Vec3::new(3.2, 0.0, 0.0)).0.x, 1.0);
    }

    #[test]
    fn test_stroke_path_edges() {
        let mut path = StrokePath::default();
        for i in 0..4 {
            path.push(Vec3::new(i as f32, 0.0, 0.0), 0, 1.0);
        }
        path.add_polyline(0, 3, true);
        assert_eq!(path.edges().len(), 5);
        assert_eq!(path.max_stroke_weight(), 1.0);
    }
}
