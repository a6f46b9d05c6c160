//! Built-in shape builders.
//!
//! Each builder appends vertices (and stroke edges when `stroke` is set) to
//! an [`InGeometry`]. Shapes whose fill connectivity is not implied by a
//! primitive kind return their raw triangle indices.

use std::f32::consts::{PI, TAU};

use redlilium_core::math::{transform_point, Mat4, Vec2, Vec3};

use super::InGeometry;
use crate::config::point_accuracy;
use crate::primitive::VertexCode;
use crate::style::VertexStyle;

/// How the open side of an arc is filled and stroked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArcMode {
    /// Pie fill, stroke along the arc only.
    #[default]
    Open,
    /// Fill and stroke closed by the chord between the arc ends.
    Chord,
    /// Fill and stroke closed through the center.
    Pie,
}

/// Subdivision count for a round shape spanning `min..max` in object space,
/// measured after the modelview transform.
pub fn shape_accuracy(modelview: &Mat4, min: Vec2, max: Vec2) -> usize {
    let corners = [
        Vec3::new(min.x, min.y, 0.0),
        Vec3::new(max.x, min.y, 0.0),
        Vec3::new(max.x, max.y, 0.0),
        Vec3::new(min.x, max.y, 0.0),
    ];
    let mut lo = Vec3::repeat(f32::MAX);
    let mut hi = Vec3::repeat(f32::MIN);
    for c in &corners {
        let p = transform_point(modelview, c);
        lo = lo.inf(&p);
        hi = hi.sup(&p);
    }
    point_accuracy((hi - lo).norm())
}

impl InGeometry {
    pub fn add_point(&mut self, p: Vec3, style: &VertexStyle) -> usize {
        self.add_vertex(p, style, Some(VertexCode::Vertex), false)
    }

    pub fn add_line(&mut self, p0: Vec3, p1: Vec3, style: &VertexStyle) {
        let i = self.add_vertex(p0, style, Some(VertexCode::Vertex), false);
        let j = self.add_vertex(p1, style, Some(VertexCode::Vertex), false);
        self.add_edge(i, j, true, true);
    }

    /// Three vertices filled as `Triangles`.
    pub fn add_triangle(&mut self, p: [Vec3; 3], style: &VertexStyle, stroke: bool) {
        let base = self.vertex_count();
        for v in p {
            self.add_vertex(v, style, Some(VertexCode::Vertex), false);
        }
        if stroke {
            self.add_loop_edges(&[base, base + 1, base + 2]);
        }
    }

    /// Four vertices filled as `Quads`.
    pub fn add_quad(&mut self, p: [Vec3; 4], style: &VertexStyle, stroke: bool) {
        let base = self.vertex_count();
        for v in p {
            self.add_vertex(v, style, Some(VertexCode::Vertex), false);
        }
        if stroke {
            self.add_loop_edges(&[base, base + 1, base + 2, base + 3]);
        }
    }

    /// Axis-aligned rectangle with corners `(x, y)` and `(x + w, y + h)`,
    /// filled as `Quads`. `clamp` snaps the corners to whole pixels.
    pub fn add_rect(
        &mut self,
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        style: &VertexStyle,
        stroke: bool,
        clamp: bool,
    ) {
        let (mut x0, mut y0, mut x1, mut y1) = (x, y, x + w, y + h);
        if clamp {
            x0 = x0.ceil();
            y0 = y0.ceil();
            x1 = x1.ceil();
            y1 = y1.ceil();
        }
        let corners = [
            (x0, y0, 0.0, 0.0),
            (x1, y0, 1.0, 0.0),
            (x1, y1, 1.0, 1.0),
            (x0, y1, 0.0, 1.0),
        ];
        let base = self.vertex_count();
        for (px, py, u, v) in corners {
            self.add_vertex_with(
                Vec3::new(px, py, 0.0),
                style.normal,
                Vec2::new(u, v),
                style,
                Some(VertexCode::Vertex),
                false,
            );
        }
        if stroke {
            self.add_loop_edges(&[base, base + 1, base + 2, base + 3]);
        }
    }

    /// Rectangle with quadratic corners, filled as `Polygon`.
    ///
    /// Radii are given clockwise from the top-left corner and clamped to half
    /// the shorter side. Edges are built by the polygon tessellator from the
    /// flattened outline.
    pub fn add_rounded_rect(
        &mut self,
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        radii: [f32; 4],
        style: &VertexStyle,
    ) {
        let max_r = 0.5 * w.abs().min(h.abs());
        let [tl, tr, br, bl] = radii.map(|r| r.clamp(0.0, max_r));
        let (x1, y1) = (x + w, y + h);
        // (corner, entry, exit, radius) walking clockwise.
        let corners = [
            ((x, y), (x, y + tl), (x + tl, y), tl),
            ((x1, y), (x1 - tr, y), (x1, y + tr), tr),
            ((x1, y1), (x1, y1 - br), (x1 - br, y1), br),
            ((x, y1), (x + bl, y1), (x, y1 - bl), bl),
        ];
        let p = |(px, py): (f32, f32)| Vec3::new(px, py, 0.0);
        for (corner, entry, exit, r) in corners {
            if r > 0.0 {
                self.add_vertex(p(entry), style, Some(VertexCode::Vertex), false);
                self.add_quadratic_vertex(p(corner), p(exit), style, false);
            } else {
                self.add_vertex(p(corner), style, Some(VertexCode::Vertex), false);
            }
        }
    }

    /// Ellipse centered at `(x, y)` with diameters `w` and `h`.
    ///
    /// Adds a center vertex when filled followed by `accuracy` perimeter
    /// vertices (no closing duplicate). Returns the fan indices of the fill.
    pub fn add_ellipse(
        &mut self,
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        style: &VertexStyle,
        fill: bool,
        stroke: bool,
        modelview: &Mat4,
    ) -> Vec<usize> {
        let (rx, ry) = (0.5 * w, 0.5 * h);
        let accuracy = shape_accuracy(
            modelview,
            Vec2::new(x - rx, y - ry),
            Vec2::new(x + rx, y + ry),
        );
        let center = fill.then(|| self.ellipse_vertex(x, y, 0.5, 0.5, style));

        let step = TAU / accuracy as f32;
        let first = self.vertex_count();
        for k in 0..accuracy {
            let a = k as f32 * step;
            let (s, c) = a.sin_cos();
            self.ellipse_vertex(x + rx * c, y + ry * s, 0.5 + 0.5 * c, 0.5 + 0.5 * s, style);
        }
        let ring: Vec<usize> = (first..first + accuracy).collect();
        if stroke {
            self.add_loop_edges(&ring);
        }

        let mut indices = Vec::new();
        if let Some(c) = center {
            for k in 0..accuracy {
                indices.extend_from_slice(&[c, ring[k], ring[(k + 1) % accuracy]]);
            }
        }
        indices
    }

    /// Elliptic arc from angle `start` to `stop` (radians, clockwise in a
    /// y-down frame). Sweeps of a full turn or more draw a whole ellipse.
    pub fn add_arc(
        &mut self,
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        start: f32,
        stop: f32,
        mode: ArcMode,
        style: &VertexStyle,
        fill: bool,
        stroke: bool,
        modelview: &Mat4,
    ) -> Vec<usize> {
        if stop < start {
            return Vec::new();
        }
        let sweep = stop - start;
        if sweep >= TAU {
            return self.add_ellipse(x, y, w, h, style, fill, stroke, modelview);
        }

        let (rx, ry) = (0.5 * w, 0.5 * h);
        let accuracy = shape_accuracy(
            modelview,
            Vec2::new(x - rx, y - ry),
            Vec2::new(x + rx, y + ry),
        );
        let steps = ((accuracy as f32 * sweep / TAU).round() as usize).max(1);

        let needs_center = match mode {
            ArcMode::Open => fill,
            ArcMode::Chord => false,
            ArcMode::Pie => fill || stroke,
        };
        let center = needs_center.then(|| self.ellipse_vertex(x, y, 0.5, 0.5, style));

        let first = self.vertex_count();
        for k in 0..=steps {
            let a = start + sweep * k as f32 / steps as f32;
            let (s, c) = a.sin_cos();
            self.ellipse_vertex(x + rx * c, y + ry * s, 0.5 + 0.5 * c, 0.5 + 0.5 * s, style);
        }
        let ring: Vec<usize> = (first..=first + steps).collect();

        if stroke {
            match (mode, center) {
                (ArcMode::Pie, Some(c)) => {
                    let mut pie = Vec::with_capacity(ring.len() + 1);
                    pie.push(c);
                    pie.extend_from_slice(&ring);
                    self.add_loop_edges(&pie);
                }
                (ArcMode::Chord, _) if ring.len() >= 3 => self.add_loop_edges(&ring),
                _ => {
                    for k in 0..steps {
                        self.add_edge(ring[k], ring[k + 1], k == 0, k + 1 == steps);
                    }
                }
            }
        }

        let mut indices = Vec::new();
        if fill {
            match center {
                Some(c) => {
                    for k in 0..steps {
                        indices.extend_from_slice(&[c, ring[k], ring[k + 1]]);
                    }
                }
                None => {
                    for k in 1..steps {
                        indices.extend_from_slice(&[ring[0], ring[k], ring[k + 1]]);
                    }
                }
            }
        }
        indices
    }

    fn ellipse_vertex(&mut self, x: f32, y: f32, u: f32, v: f32, style: &VertexStyle) -> usize {
        self.add_vertex_with(
            Vec3::new(x, y, 0.0),
            style.normal,
            Vec2::new(u, v),
            style,
            Some(VertexCode::Vertex),
            false,
        )
    }

    /// Axis-aligned box centered at the origin, 24 vertices filled as `Quads`
    /// with outward face normals.
    pub fn add_box(&mut self, size: Vec3, style: &VertexStyle, stroke: bool) {
        let h = size * 0.5;
        #[rustfmt::skip]
        const FACES: [([f32; 3], [[f32; 3]; 4]); 6] = [
            ([ 0.0,  0.0,  1.0], [[-1.0, -1.0,  1.0], [ 1.0, -1.0,  1.0], [ 1.0,  1.0,  1.0], [-1.0,  1.0,  1.0]]),
            ([ 0.0,  0.0, -1.0], [[ 1.0, -1.0, -1.0], [-1.0, -1.0, -1.0], [-1.0,  1.0, -1.0], [ 1.0,  1.0, -1.0]]),
            ([ 1.0,  0.0,  0.0], [[ 1.0, -1.0,  1.0], [ 1.0, -1.0, -1.0], [ 1.0,  1.0, -1.0], [ 1.0,  1.0,  1.0]]),
            ([-1.0,  0.0,  0.0], [[-1.0, -1.0, -1.0], [-1.0, -1.0,  1.0], [-1.0,  1.0,  1.0], [-1.0,  1.0, -1.0]]),
            ([ 0.0,  1.0,  0.0], [[-1.0,  1.0,  1.0], [ 1.0,  1.0,  1.0], [ 1.0,  1.0, -1.0], [-1.0,  1.0, -1.0]]),
            ([ 0.0, -1.0,  0.0], [[-1.0, -1.0, -1.0], [ 1.0, -1.0, -1.0], [ 1.0, -1.0,  1.0], [-1.0, -1.0,  1.0]]),
        ];
        const UVS: [[f32; 2]; 4] = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];

        for (normal, corners) in FACES {
            let base = self.vertex_count();
            for (c, uv) in corners.iter().zip(UVS) {
                self.add_vertex_with(
                    Vec3::new(c[0] * h.x, c[1] * h.y, c[2] * h.z),
                    Vec3::from(normal),
                    Vec2::from(uv),
                    style,
                    Some(VertexCode::Vertex),
                    false,
                );
            }
            if stroke {
                self.add_loop_edges(&[base, base + 1, base + 2, base + 3]);
            }
        }
    }

    /// UV sphere of the given radius, `(longitude, latitude)` subdivisions.
    /// Returns the triangle indices, wound outward.
    pub fn add_sphere(
        &mut self,
        radius: f32,
        detail: (usize, usize),
        style: &VertexStyle,
        stroke: bool,
    ) -> Vec<usize> {
        let ures = detail.0.max(3);
        let vres = detail.1.max(2);
        let base = self.vertex_count();
        for i in 0..=vres {
            let theta = PI * i as f32 / vres as f32;
            let (st, ct) = theta.sin_cos();
            for j in 0..=ures {
                let phi = TAU * j as f32 / ures as f32;
                let (sp, cp) = phi.sin_cos();
                let n = Vec3::new(st * sp, ct, st * cp);
                self.add_vertex_with(
                    n * radius,
                    n,
                    Vec2::new(j as f32 / ures as f32, i as f32 / vres as f32),
                    style,
                    Some(VertexCode::Vertex),
                    false,
                );
            }
        }

        let at = |i: usize, j: usize| base + i * (ures + 1) + j;
        let mut indices = Vec::with_capacity(6 * ures * vres);
        for i in 0..vres {
            for j in 0..ures {
                let (a, b, c, d) = (at(i, j), at(i + 1, j), at(i + 1, j + 1), at(i, j + 1));
                // Pole rows collapse one triangle of each quad.
                if i + 1 < vres {
                    indices.extend_from_slice(&[a, b, c]);
                }
                if i > 0 {
                    indices.extend_from_slice(&[a, c, d]);
                }
            }
        }
        if stroke {
            self.add_indexed_triangles_edges(&indices);
        }
        indices
    }
}
