//! Input geometry: raw vertices, stroke edges and the vertex code stream.
//!
//! Vertices are stored untransformed, one array per channel. The code stream
//! is allocated only once a shape uses curves or contours; it then holds one
//! entry per anchor vertex plus an extra [`VertexCode::Break`] before every
//! contour start. Control points following a bezier or quadratic code have no
//! entry of their own.

mod shapes;

pub use shapes::{shape_accuracy, ArcMode};

use redlilium_core::math::{Vec2, Vec3};

use crate::attribs::AttribChannels;
use crate::primitive::{push_polygon_edges, Edge, EdgeKind, VertexCode};
use crate::style::VertexStyle;

/// Raw per-shape geometry fed to the tessellator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InGeometry {
    positions: Vec<Vec3>,
    colors: Vec<u32>,
    normals: Vec<Vec3>,
    texcoords: Vec<Vec2>,
    stroke_colors: Vec<u32>,
    stroke_weights: Vec<f32>,
    ambient: Vec<u32>,
    specular: Vec<u32>,
    emissive: Vec<u32>,
    shininess: Vec<f32>,
    attribs: AttribChannels,
    codes: Option<Vec<VertexCode>>,
    edges: Vec<Edge>,
}

impl InGeometry {
    pub fn new(attrib_width: usize) -> Self {
        Self {
            attribs: AttribChannels::new(attrib_width),
            ..Self::default()
        }
    }

    pub fn clear(&mut self) {
        self.positions.clear();
        self.colors.clear();
        self.normals.clear();
        self.texcoords.clear();
        self.stroke_colors.clear();
        self.stroke_weights.clear();
        self.ambient.clear();
        self.specular.clear();
        self.emissive.clear();
        self.shininess.clear();
        self.attribs.clear();
        self.codes = None;
        self.edges.clear();
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn attrib_width(&self) -> usize {
        self.attribs.width()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// The code stream, if any vertex needed one.
    pub fn codes(&self) -> Option<&[VertexCode]> {
        self.codes.as_deref()
    }

    pub fn code_count(&self) -> usize {
        self.codes.as_ref().map_or(0, Vec::len)
    }

    pub fn has_code(&self, code: VertexCode) -> bool {
        self.codes.as_ref().is_some_and(|c| c.contains(&code))
    }

    pub fn position(&self, i: usize) -> Vec3 {
        self.positions[i]
    }

    pub fn color(&self, i: usize) -> u32 {
        self.colors[i]
    }

    pub fn normal(&self, i: usize) -> Vec3 {
        self.normals[i]
    }

    pub fn texcoord(&self, i: usize) -> Vec2 {
        self.texcoords[i]
    }

    pub fn stroke_color(&self, i: usize) -> u32 {
        self.stroke_colors[i]
    }

    pub fn stroke_weight(&self, i: usize) -> f32 {
        self.stroke_weights[i]
    }

    pub fn ambient(&self, i: usize) -> u32 {
        self.ambient[i]
    }

    pub fn specular(&self, i: usize) -> u32 {
        self.specular[i]
    }

    pub fn emissive(&self, i: usize) -> u32 {
        self.emissive[i]
    }

    pub fn shininess(&self, i: usize) -> f32 {
        self.shininess[i]
    }

    pub fn attribs(&self, i: usize) -> &[f32] {
        self.attribs.get(i)
    }

    /// Largest stroke weight of any vertex.
    pub fn max_stroke_weight(&self) -> f32 {
        self.stroke_weights.iter().copied().fold(0.0, f32::max)
    }

    /// Append a vertex using the style's normal and texture coordinate.
    ///
    /// `code` is `None` for bezier/quadratic control points, which do not get
    /// an entry in the code stream. `brk` starts a new contour.
    pub fn add_vertex(
        &mut self,
        position: Vec3,
        style: &VertexStyle,
        code: Option<VertexCode>,
        brk: bool,
    ) -> usize {
        self.add_vertex_with(position, style.normal, style.uv, style, code, brk)
    }

    /// Append a vertex with an explicit normal and texture coordinate.
    pub fn add_vertex_with(
        &mut self,
        position: Vec3,
        normal: Vec3,
        uv: Vec2,
        style: &VertexStyle,
        code: Option<VertexCode>,
        brk: bool,
    ) -> usize {
        self.positions.push(position);
        self.colors.push(style.fill.0);
        self.normals.push(normal);
        self.texcoords.push(uv);
        self.stroke_colors.push(style.stroke.0);
        self.stroke_weights.push(style.stroke_weight);
        self.ambient.push(style.material.ambient.0);
        self.specular.push(style.material.specular.0);
        self.emissive.push(style.material.emissive.0);
        self.shininess.push(style.material.shininess);
        self.attribs.push(&style.attribs);

        let needs_codes = brk
            || matches!(
                code,
                Some(VertexCode::Bezier | VertexCode::Quadratic | VertexCode::Curve)
            );
        if needs_codes && self.codes.is_none() {
            // Everything before the first special vertex was a plain vertex.
            let anchors = self.positions.len() - 1;
            self.codes = Some(vec![VertexCode::Vertex; anchors]);
        }
        if let Some(codes) = self.codes.as_mut() {
            if brk {
                codes.push(VertexCode::Break);
            }
            if let Some(code) = code {
                codes.push(code);
            }
        }
        self.positions.len() - 1
    }

    /// Append a cubic bezier segment from the previous vertex.
    pub fn add_bezier_vertex(
        &mut self,
        c1: Vec3,
        c2: Vec3,
        end: Vec3,
        style: &VertexStyle,
        brk: bool,
    ) -> usize {
        self.add_vertex(c1, style, Some(VertexCode::Bezier), brk);
        self.add_vertex(c2, style, None, false);
        self.add_vertex(end, style, None, false)
    }

    /// Append a quadratic segment from the previous vertex.
    pub fn add_quadratic_vertex(
        &mut self,
        control: Vec3,
        end: Vec3,
        style: &VertexStyle,
        brk: bool,
    ) -> usize {
        self.add_vertex(control, style, Some(VertexCode::Quadratic), brk);
        self.add_vertex(end, style, None, false)
    }

    /// Append a Catmull-Rom control point.
    pub fn add_curve_vertex(&mut self, position: Vec3, style: &VertexStyle, brk: bool) -> usize {
        self.add_vertex(position, style, Some(VertexCode::Curve), brk)
    }

    pub fn set_normal(&mut self, i: usize, normal: Vec3) {
        self.normals[i] = normal;
    }

    // ------------------------------------------------------------------
    // Edges
    // ------------------------------------------------------------------

    pub fn add_edge(&mut self, i: usize, j: usize, start: bool, end: bool) -> usize {
        self.edges
            .push(Edge::new(i, j, EdgeKind::from_flags(start, end)));
        self.edges.len() - 1
    }

    /// Mark the path ending at `i` as closed back to `j`.
    pub fn close_edge(&mut self, i: usize, j: usize) -> usize {
        self.edges.push(Edge::new(i, j, EdgeKind::Close));
        self.edges.len() - 1
    }

    /// Outline `ring` as one closed path.
    fn add_loop_edges(&mut self, ring: &[usize]) {
        let n = ring.len();
        for k in 0..n {
            self.add_edge(ring[k], ring[(k + 1) % n], k == 0, k + 1 == n);
        }
        self.close_edge(ring[n - 1], ring[0]);
    }

    /// One single-segment path per vertex pair.
    pub fn add_lines_edges(&mut self) {
        for i in 0..self.vertex_count() / 2 {
            self.add_edge(2 * i, 2 * i + 1, true, true);
        }
    }

    /// A polyline over all vertices.
    pub fn add_polygon_edges(&mut self, closed: bool) {
        if let Some(last) = self.vertex_count().checked_sub(1) {
            push_polygon_edges(&mut self.edges, 0, last, closed);
        }
    }

    pub fn add_triangles_edges(&mut self) {
        for t in 0..self.vertex_count() / 3 {
            self.add_loop_edges(&[3 * t, 3 * t + 1, 3 * t + 2]);
        }
    }

    pub fn add_triangle_fan_edges(&mut self) {
        for i in 1..self.vertex_count().saturating_sub(1) {
            self.add_loop_edges(&[0, i, i + 1]);
        }
    }

    pub fn add_triangle_strip_edges(&mut self) {
        for i in 1..self.vertex_count().saturating_sub(1) {
            self.add_loop_edges(&strip_triangle(i));
        }
    }

    pub fn add_quads_edges(&mut self) {
        for q in 0..self.vertex_count() / 4 {
            let i = 4 * q;
            self.add_loop_edges(&[i, i + 1, i + 2, i + 3]);
        }
    }

    pub fn add_quad_strip_edges(&mut self) {
        for q in 1..self.vertex_count() / 2 {
            self.add_loop_edges(&quad_strip_quad(q));
        }
    }

    /// Outline every triangle of an explicit index list.
    pub fn add_indexed_triangles_edges(&mut self, indices: &[usize]) {
        for t in indices.chunks_exact(3) {
            self.add_loop_edges(t);
        }
    }

    // ------------------------------------------------------------------
    // Normals
    // ------------------------------------------------------------------

    /// Face normal `normalize((p2 - p1) x (p0 - p1))` written to all three
    /// vertices. Counter-clockwise triangles in a y-up frame face +z.
    pub fn calc_triangle_normal(&mut self, i0: usize, i1: usize, i2: usize) {
        let p0 = self.positions[i0];
        let p1 = self.positions[i1];
        let p2 = self.positions[i2];
        let n = (p2 - p1).cross(&(p0 - p1));
        let n = n.try_normalize(f32::EPSILON).unwrap_or(n);
        self.normals[i0] = n;
        self.normals[i1] = n;
        self.normals[i2] = n;
    }

    pub fn calc_triangles_normals(&mut self) {
        for t in 0..self.vertex_count() / 3 {
            self.calc_triangle_normal(3 * t, 3 * t + 1, 3 * t + 2);
        }
    }

    pub fn calc_triangle_fan_normals(&mut self) {
        for i in 1..self.vertex_count().saturating_sub(1) {
            self.calc_triangle_normal(0, i, i + 1);
        }
    }

    pub fn calc_triangle_strip_normals(&mut self) {
        for i in 1..self.vertex_count().saturating_sub(1) {
            if i % 2 == 0 {
                self.calc_triangle_normal(i + 1, i, i - 1);
            } else {
                self.calc_triangle_normal(i - 1, i, i + 1);
            }
        }
    }

    pub fn calc_quads_normals(&mut self) {
        for q in 0..self.vertex_count() / 4 {
            let i = 4 * q;
            self.calc_triangle_normal(i, i + 1, i + 2);
            self.calc_triangle_normal(i + 2, i + 3, i);
        }
    }

    pub fn calc_quad_strip_normals(&mut self) {
        for q in 1..self.vertex_count() / 2 {
            let [i0, i1, i2, i3] = quad_strip_quad(q);
            self.calc_triangle_normal(i0, i1, i3);
            self.calc_triangle_normal(i1, i2, i3);
        }
    }
}

/// Vertices of the `i`-th triangle of a strip, alternating orientation.
pub(crate) fn strip_triangle(i: usize) -> [usize; 3] {
    if i % 2 == 0 {
        [i, i - 1, i + 1]
    } else {
        [i, i + 1, i - 1]
    }
}

/// Vertices of the `q`-th quad (1-based) of a quad strip, in outline order.
pub(crate) fn quad_strip_quad(q: usize) -> [usize; 4] {
    let i0 = 2 * (q - 1);
    [i0, i0 + 1, 2 * q + 1, 2 * q]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn style() -> VertexStyle {
        VertexStyle::default()
    }

    #[test]
    fn test_vertex_count_matches_calls() {
        let mut geo = InGeometry::new(0);
        let s = style();
        for i in 0..37 {
            let idx = geo.add_vertex(Vec3::new(i as f32, 0.0, 0.0), &s, Some(VertexCode::Vertex), false);
            assert_eq!(idx, i);
        }
        assert_eq!(geo.vertex_count(), 37);
        assert!(geo.codes().is_none());
    }

    #[test]
    fn test_codes_allocated_lazily_and_backfilled() {
        let mut geo = InGeometry::new(0);
        let s = style();
        geo.add_vertex(Vec3::zeros(), &s, Some(VertexCode::Vertex), false);
        geo.add_vertex(Vec3::x(), &s, Some(VertexCode::Vertex), false);
        geo.add_bezier_vertex(Vec3::y(), Vec3::x(), Vec3::z(), &s, false);
        assert_eq!(geo.vertex_count(), 5);
        assert_eq!(
            geo.codes().unwrap(),
            &[VertexCode::Vertex, VertexCode::Vertex, VertexCode::Bezier]
        );
        assert!(geo.has_code(VertexCode::Bezier));
        assert!(!geo.has_code(VertexCode::Curve));
    }

    #[test]
    fn test_break_adds_extra_code() {
        let mut geo = InGeometry::new(0);
        let s = style();
        geo.add_vertex(Vec3::zeros(), &s, Some(VertexCode::Vertex), false);
        geo.add_vertex(Vec3::x(), &s, Some(VertexCode::Vertex), true);
        assert_eq!(geo.vertex_count(), 2);
        assert_eq!(
            geo.codes().unwrap(),
            &[VertexCode::Vertex, VertexCode::Break, VertexCode::Vertex]
        );
    }

    #[test]
    fn test_triangle_normal_winding() {
        let mut geo = InGeometry::new(0);
        let s = style();
        geo.add_vertex(Vec3::new(0.0, 0.0, 0.0), &s, None, false);
        geo.add_vertex(Vec3::new(1.0, 0.0, 0.0), &s, None, false);
        geo.add_vertex(Vec3::new(0.0, 1.0, 0.0), &s, None, false);
        for i in 0..3 {
            geo.set_normal(i, Vec3::zeros());
        }
        geo.calc_triangles_normals();
        assert_eq!(geo.normal(0), Vec3::new(0.0, 0.0, 1.0));
        assert_eq!(geo.normal(2), Vec3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_strip_normals_stay_consistent() {
        let mut geo = InGeometry::new(0);
        let s = style();
        // Zig-zag strip in the XY plane.
        for i in 0..6 {
            let x = (i / 2) as f32;
            let y = (i % 2) as f32;
            geo.add_vertex(Vec3::new(x, y, 0.0), &s, None, false);
        }
        geo.calc_triangle_strip_normals();
        for i in 0..6 {
            assert!((geo.normal(i).z.abs() - 1.0).abs() < 1e-6);
        }
        // Odd and even triangles agree on orientation.
        assert_eq!(geo.normal(1).z, geo.normal(4).z);
    }

    #[test]
    fn test_quads_edges_are_closed_loops() {
        let mut geo = InGeometry::new(0);
        let s = style();
        for _ in 0..8 {
            geo.add_vertex(Vec3::zeros(), &s, None, false);
        }
        geo.add_quads_edges();
        // 4 segments plus a close marker per quad.
        assert_eq!(geo.edge_count(), 10);
        assert_eq!(geo.edges()[0].kind, EdgeKind::Start);
        assert_eq!(geo.edges()[3].kind, EdgeKind::Stop);
        assert_eq!(geo.edges()[4], Edge::new(3, 0, EdgeKind::Close));
        assert_eq!(geo.edges()[5].start, 4);
    }

    #[test]
    fn test_lines_and_polygon_edges() {
        let mut geo = InGeometry::new(0);
        let s = style();
        for _ in 0..5 {
            geo.add_vertex(Vec3::zeros(), &s, None, false);
        }
        geo.add_lines_edges();
        assert_eq!(geo.edge_count(), 2);
        assert!(geo.edges().iter().all(|e| e.kind == EdgeKind::Single));

        geo.clear();
        assert_eq!(geo.edge_count(), 0);
        for _ in 0..4 {
            geo.add_vertex(Vec3::zeros(), &s, None, false);
        }
        geo.add_polygon_edges(true);
        assert_eq!(geo.edge_count(), 5);
        assert_eq!(geo.edges()[4].kind, EdgeKind::Close);
    }

    #[test]
    fn test_strip_triangle_indices() {
        assert_eq!(strip_triangle(1), [1, 2, 0]);
        assert_eq!(strip_triangle(2), [2, 1, 3]);
        assert_eq!(quad_strip_quad(1), [0, 1, 3, 2]);
    }
}
