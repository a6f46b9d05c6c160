//! The tessellator: turns input geometry into indexed GPU batches.
//!
//! - [`split`]: raw triangle index partitioning into 16-bit index caches
//! - [`points`]: round and square point sprites
//! - [`edges`]: fast-path stroke quads, 3D line segments and stroke sources
//! - [`polygon`]: curve flattening and polygon fill through `lyon_tessellation`
//! - [`stroke_outline`]: cap/join-aware stroke outlines through `kurbo`

mod edges;
mod points;
mod polygon;
mod split;
mod stroke_outline;

pub(crate) use edges::{StrokePath, StrokeSource};
pub(crate) use split::{split_raw_indices, PolyVertexSource};

use redlilium_core::math::{
    is_unscaled_axis_aligned_2d, normal_matrix, transform_point, transform_scale_2d,
    transform_scale_3d, transform_vector, Mat3, Mat4, Vec2, Vec3,
};
use redlilium_core::profiling::profile_function;

use crate::attribs::AttribValues;
use crate::batch::Batch;
use crate::config::{RendererCaps, TessConfig};
use crate::curve::CurveMatrices;
use crate::error::{TessError, TessResult};
use crate::in_geometry::{quad_strip_quad, strip_triangle, InGeometry};
use crate::primitive::PrimitiveKind;
use crate::style::{Material, StrokeCap, StrokeJoin, TextureId};
use crate::tess_geometry::{PolyBuffer, PolyVertex};

/// Modelview transform applied while writing output vertices.
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    matrix: Mat4,
    normal: Mat3,
    scale: f32,
    identity: bool,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            matrix: Mat4::identity(),
            normal: Mat3::identity(),
            scale: 1.0,
            identity: true,
        }
    }
}

impl Transform {
    pub fn new(matrix: &Mat4, is_3d: bool) -> Self {
        let scale = if is_3d {
            transform_scale_3d(matrix)
        } else {
            transform_scale_2d(matrix)
        };
        Self {
            matrix: *matrix,
            normal: normal_matrix(matrix),
            scale,
            identity: *matrix == Mat4::identity(),
        }
    }

    pub fn matrix(&self) -> &Mat4 {
        &self.matrix
    }

    /// Uniform scale factor applied to stroke weights.
    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn is_identity(&self) -> bool {
        self.identity
    }

    pub fn point(&self, p: &Vec3) -> Vec3 {
        if self.identity {
            *p
        } else {
            transform_point(&self.matrix, p)
        }
    }

    pub fn vector(&self, v: &Vec3) -> Vec3 {
        if self.identity {
            *v
        } else {
            transform_vector(&self.matrix, v)
        }
    }

    /// Normals go through the inverse transpose and are renormalized.
    pub fn normal(&self, n: &Vec3) -> Vec3 {
        if self.identity {
            return *n;
        }
        let t = self.normal * n;
        t.try_normalize(f32::EPSILON).unwrap_or(t)
    }

    /// Transform the normal-typed generic attributes stored in `attribs`.
    fn normal_attribs(&self, attribs: &mut [f32], offsets: &[(usize, usize)]) {
        if self.identity {
            return;
        }
        for &(offset, components) in offsets {
            if components == 3 {
                let n = self.normal(&Vec3::new(
                    attribs[offset],
                    attribs[offset + 1],
                    attribs[offset + 2],
                ));
                attribs[offset..offset + 3].copy_from_slice(n.as_slice());
            }
        }
    }
}

/// Poly-buffer vertex for stroke and point geometry: flat normal, no
/// texture coordinate, default material.
pub(crate) fn stroke_vertex(position: Vec3, color: u32, attribs: &[f32]) -> PolyVertex<'_> {
    let material = Material::default();
    PolyVertex {
        position,
        color,
        normal: Vec3::new(0.0, 0.0, 1.0),
        uv: Vec2::zeros(),
        ambient: material.ambient.0,
        specular: material.specular.0,
        emissive: material.emissive.0,
        shininess: material.shininess,
        attribs,
    }
}

/// Raw triangle indices implied by a triangle primitive kind.
pub fn raw_triangle_indices(kind: PrimitiveKind, vertex_count: usize) -> Vec<usize> {
    let mut raw = Vec::new();
    match kind {
        PrimitiveKind::Triangles => raw.extend(0..vertex_count - vertex_count % 3),
        PrimitiveKind::TriangleFan => {
            for i in 1..vertex_count.saturating_sub(1) {
                raw.extend_from_slice(&[0, i, i + 1]);
            }
        }
        PrimitiveKind::TriangleStrip => {
            for i in 1..vertex_count.saturating_sub(1) {
                raw.extend_from_slice(&strip_triangle(i));
            }
        }
        PrimitiveKind::Quads => {
            for q in 0..vertex_count / 4 {
                let i = 4 * q;
                raw.extend_from_slice(&[i, i + 1, i + 2, i + 2, i + 3, i]);
            }
        }
        PrimitiveKind::QuadStrip => {
            for q in 1..vertex_count / 2 {
                let [i0, i1, i2, i3] = quad_strip_quad(q);
                raw.extend_from_slice(&[i0, i1, i3, i1, i2, i3]);
            }
        }
        _ => {}
    }
    raw
}

/// Input vertices copied into the poly buffer through the current transform.
struct InputSource<'a> {
    geo: &'a InGeometry,
    transform: &'a Transform,
    normal_attribs: &'a [(usize, usize)],
    scratch: Vec<f32>,
}

impl PolyVertexSource for InputSource<'_> {
    fn push_to(&mut self, i: usize, poly: &mut PolyBuffer) {
        let geo = self.geo;
        self.scratch.clear();
        self.scratch.extend_from_slice(geo.attribs(i));
        self.transform
            .normal_attribs(&mut self.scratch, self.normal_attribs);
        poly.push_vertex(&PolyVertex {
            position: self.transform.point(&geo.position(i)),
            color: geo.color(i),
            normal: self.transform.normal(&geo.normal(i)),
            uv: geo.texcoord(i),
            ambient: geo.ambient(i),
            specular: geo.specular(i),
            emissive: geo.emissive(i),
            shininess: geo.shininess(i),
            attribs: &self.scratch,
        });
    }
}

/// Converts [`InGeometry`] into [`Batch`] output.
///
/// Holds the per-shape drawing state (fill/stroke flags, cap, join, bound
/// texture, modelview) and the configuration-derived choices between the
/// fast and slow stroke paths.
#[derive(Debug, Clone)]
pub struct Tessellator {
    is_3d: bool,
    retained: bool,
    caps: RendererCaps,
    tolerance: f32,
    curves: CurveMatrices,
    normal_attribs: Vec<(usize, usize)>,
    zero_attribs: Vec<f32>,
    fill: bool,
    stroke: bool,
    cap: StrokeCap,
    join: StrokeJoin,
    texture: Option<TextureId>,
    auto_normals: bool,
    transform: Transform,
}

impl Tessellator {
    pub fn new(config: &TessConfig) -> Self {
        let attribs = AttribValues::new(&config.attributes);
        Self {
            is_3d: config.is_3d,
            retained: config.is_retained(),
            caps: config.caps,
            tolerance: config.tolerance,
            curves: CurveMatrices::new(
                config.bezier_detail,
                config.curve_detail,
                config.curve_tightness,
            ),
            normal_attribs: attribs.normal_offsets(),
            zero_attribs: vec![0.0; config.attributes.total_components()],
            fill: true,
            stroke: true,
            cap: StrokeCap::default(),
            join: StrokeJoin::default(),
            texture: None,
            auto_normals: false,
            transform: Transform::default(),
        }
    }

    pub fn set_fill(&mut self, fill: bool) {
        self.fill = fill;
    }

    pub fn set_stroke(&mut self, stroke: bool) {
        self.stroke = stroke;
    }

    pub fn set_stroke_cap(&mut self, cap: StrokeCap) {
        self.cap = cap;
    }

    pub fn set_stroke_join(&mut self, join: StrokeJoin) {
        self.join = join;
    }

    pub fn set_texture(&mut self, texture: Option<TextureId>) {
        self.texture = texture;
    }

    /// Replace polygon normals by the polygon's own plane normal.
    pub fn set_auto_normals(&mut self, auto: bool) {
        self.auto_normals = auto;
    }

    /// Set the modelview. Retained geometry is always stored untransformed.
    pub fn set_transform(&mut self, modelview: &Mat4) {
        self.transform = if self.retained {
            Transform::default()
        } else {
            Transform::new(modelview, self.is_3d)
        };
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn curves(&self) -> &CurveMatrices {
        &self.curves
    }

    pub fn curves_mut(&mut self) -> &mut CurveMatrices {
        &mut self.curves
    }

    /// Tessellate one shape of the given kind. `close` closes the outline of
    /// a polygon stroke.
    pub fn tessellate(
        &self,
        geo: &InGeometry,
        kind: PrimitiveKind,
        close: bool,
        out: &mut Batch,
    ) -> TessResult<()> {
        profile_function!();
        log::debug!(
            "Tessellating {:?}: {} vertices, {} edges",
            kind,
            geo.vertex_count(),
            geo.edge_count()
        );
        match kind {
            PrimitiveKind::Points => self.tessellate_points(geo, out),
            PrimitiveKind::Lines | PrimitiveKind::LineStrip | PrimitiveKind::LineLoop => {
                self.tessellate_edges(geo, out)
            }
            PrimitiveKind::Triangles
            | PrimitiveKind::TriangleFan
            | PrimitiveKind::TriangleStrip
            | PrimitiveKind::Quads
            | PrimitiveKind::QuadStrip => {
                if self.fill {
                    let raw = raw_triangle_indices(kind, geo.vertex_count());
                    self.fill_raw(geo, &raw, out)?;
                }
                self.tessellate_edges(geo, out)
            }
            PrimitiveKind::Polygon => self.tessellate_polygon(geo, close, out),
        }
    }

    /// Tessellate triangles with precomputed connectivity.
    pub fn tessellate_indexed(
        &self,
        geo: &InGeometry,
        kind: PrimitiveKind,
        indices: &[usize],
        out: &mut Batch,
    ) -> TessResult<()> {
        profile_function!();
        if kind != PrimitiveKind::Triangles {
            return Err(TessError::malformed(format!(
                "indexed geometry requires Triangles, got {kind:?}"
            )));
        }
        if indices.len() % 3 != 0 {
            return Err(TessError::malformed(format!(
                "index count {} is not a multiple of 3",
                indices.len()
            )));
        }
        if let Some(&bad) = indices.iter().find(|&&i| i >= geo.vertex_count()) {
            return Err(TessError::malformed(format!(
                "index {bad} out of range for {} vertices",
                geo.vertex_count()
            )));
        }
        if self.fill {
            self.fill_raw(geo, indices, out)?;
        }
        self.tessellate_edges(geo, out)
    }

    /// Fill triangles given by raw input indices, recorded under the bound
    /// texture.
    fn fill_raw(&self, geo: &InGeometry, raw: &[usize], out: &mut Batch) -> TessResult<()> {
        let poly = &mut out.geometry.poly;
        out.textures.begin_tex(self.texture, poly);
        let mut source = InputSource {
            geo,
            transform: &self.transform,
            normal_attribs: &self.normal_attribs,
            scratch: Vec::with_capacity(self.zero_attribs.len()),
        };
        let result = split_raw_indices(raw, &mut source, poly, self.retained);
        out.textures.end_tex(poly);
        result
    }

    /// Whether caps and joins can be left out because they would be
    /// invisible: thin strokes, or square-cornered axis-aligned 2D paths at
    /// unit scale.
    pub(crate) fn no_caps_joins<S: StrokeSource + ?Sized>(&self, src: &S) -> bool {
        if self.retained {
            return false;
        }
        let weight = src.max_stroke_weight() * self.transform.scale();
        if weight < self.caps.min_caps_joins_weight {
            return true;
        }
        !self.is_3d
            && is_unscaled_axis_aligned_2d(self.transform.matrix())
            && self.cap != StrokeCap::Round
            && self.join != StrokeJoin::Round
            && src.edges().iter().all(|e| {
                let d = src.stroke_position(e.end) - src.stroke_position(e.start);
                d.x.abs() < f32::EPSILON || d.y.abs() < f32::EPSILON
            })
    }
}
