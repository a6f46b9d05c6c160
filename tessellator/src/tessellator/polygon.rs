//! General polygons: curve flattening and fill.
//!
//! Input vertices and curve steps are packed into flat float records
//! (position, color, normal, uv, material, generic attributes) that double
//! as `lyon` path attributes, so vertices synthesized at self-intersections
//! come back with every channel interpolated.

use lyon_tessellation::math::point;
use lyon_tessellation::path::Path;
use lyon_tessellation::{
    BuffersBuilder, FillOptions, FillRule, FillTessellator, FillVertex, FillVertexConstructor,
    VertexBuffers,
};
use redlilium_core::math::{Vec2, Vec3};
use redlilium_core::profiling::{profile_function, profile_scope};

use super::{split_raw_indices, PolyVertexSource, StrokePath, Tessellator, Transform};
use crate::batch::Batch;
use crate::curve::CurveMatrices;
use crate::error::{TessError, TessResult};
use crate::in_geometry::InGeometry;
use crate::primitive::VertexCode;
use crate::style::Color;
use crate::tess_geometry::{PolyBuffer, PolyVertex};

// Packed record layout.
const POS: usize = 0;
const COLOR: usize = 3;
const NORMAL: usize = 7;
const UV: usize = 10;
const AMBIENT: usize = 12;
const SPECULAR: usize = 16;
const EMISSIVE: usize = 20;
const SHININESS: usize = 24;
const ATTRIBS: usize = 25;

fn read3(v: &[f32], at: usize) -> Vec3 {
    Vec3::new(v[at], v[at + 1], v[at + 2])
}

fn renormalize(v: &mut [f32]) {
    let len = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if len > f32::EPSILON {
        v.iter_mut().for_each(|x| *x /= len);
    }
}

/// Packed vertex records plus the stroke style of each record.
#[derive(Debug, Clone)]
pub(crate) struct PackedVertices {
    stride: usize,
    data: Vec<f32>,
    stroke: Vec<(u32, f32)>,
}

impl PackedVertices {
    fn new(attrib_width: usize) -> Self {
        Self {
            stride: ATTRIBS + attrib_width,
            data: Vec::new(),
            stroke: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.stroke.len()
    }

    pub fn record(&self, i: usize) -> &[f32] {
        &self.data[i * self.stride..(i + 1) * self.stride]
    }

    pub fn position(&self, i: usize) -> Vec3 {
        read3(self.record(i), POS)
    }

    /// Append the channels of input vertex `src`, placed at `position`.
    fn push(&mut self, geo: &InGeometry, src: usize, position: Vec3) -> usize {
        let normal = geo.normal(src);
        let uv = geo.texcoord(src);
        self.data.extend_from_slice(position.as_slice());
        self.data
            .extend_from_slice(&Color(geo.color(src)).to_components());
        self.data.extend_from_slice(normal.as_slice());
        self.data.extend_from_slice(&[uv.x, uv.y]);
        self.data
            .extend_from_slice(&Color(geo.ambient(src)).to_components());
        self.data
            .extend_from_slice(&Color(geo.specular(src)).to_components());
        self.data
            .extend_from_slice(&Color(geo.emissive(src)).to_components());
        self.data.push(geo.shininess(src));
        self.data.extend_from_slice(geo.attribs(src));
        self.stroke
            .push((geo.stroke_color(src), geo.stroke_weight(src)));
        self.len() - 1
    }
}

/// Polygon contours after curve expansion.
#[derive(Debug, Clone)]
pub(crate) struct Flattened {
    pub verts: PackedVertices,
    pub contours: Vec<Vec<usize>>,
}

impl Flattened {
    /// Newell normal of all contours, not normalized.
    pub fn newell_normal(&self) -> Vec3 {
        let mut n = Vec3::zeros();
        for contour in &self.contours {
            for (k, &i) in contour.iter().enumerate() {
                let a = self.verts.position(i);
                let b = self.verts.position(contour[(k + 1) % contour.len()]);
                n.x += (a.y - b.y) * (a.z + b.z);
                n.y += (a.z - b.z) * (a.x + b.x);
                n.z += (a.x - b.x) * (a.y + b.y);
            }
        }
        n
    }

    /// Stroke topology of the contours. The first contour is closed on
    /// request, holes always are.
    pub fn stroke_path(&self, close: bool) -> StrokePath {
        let mut path = StrokePath::default();
        for (k, contour) in self.contours.iter().enumerate() {
            if contour.len() < 2 {
                continue;
            }
            let mut first = None;
            let mut last = 0;
            for &i in contour {
                let (color, weight) = self.verts.stroke[i];
                last = path.push(self.verts.position(i), color, weight);
                if first.is_none() {
                    first = Some(last);
                }
            }
            if let Some(first) = first {
                path.add_polyline(first, last, close || k > 0);
            }
        }
        path
    }
}

struct ContourBuilder<'a> {
    geo: &'a InGeometry,
    verts: PackedVertices,
    contours: Vec<Vec<usize>>,
    current: Vec<usize>,
}

impl ContourBuilder<'_> {
    /// Add a point carrying the channels of input vertex `src`; exact
    /// repeats of the previous point are skipped.
    fn point(&mut self, src: usize, position: Vec3) {
        if let Some(&last) = self.current.last() {
            if self.verts.position(last) == position {
                return;
            }
        }
        let i = self.verts.push(self.geo, src, position);
        self.current.push(i);
    }

    fn last_position(&self) -> Option<Vec3> {
        self.current.last().map(|&i| self.verts.position(i))
    }

    fn finish_contour(&mut self) {
        let mut contour = std::mem::take(&mut self.current);
        if contour.len() > 1
            && self.verts.position(contour[0]) == self.verts.position(contour[contour.len() - 1])
        {
            contour.pop();
        }
        if !contour.is_empty() {
            self.contours.push(contour);
        }
    }
}

fn check_controls(geo: &InGeometry, vi: usize, needed: usize, what: &str) -> TessResult<()> {
    if vi + needed > geo.vertex_count() {
        return Err(TessError::malformed(format!(
            "{what} segment at vertex {vi} is missing control points"
        )));
    }
    Ok(())
}

/// Expand bezier, quadratic and Catmull-Rom segments and split the vertex
/// stream into contours at breaks.
pub(crate) fn flatten(geo: &InGeometry, curves: &CurveMatrices) -> TessResult<Flattened> {
    profile_scope!("flatten_polygon");
    let mut b = ContourBuilder {
        geo,
        verts: PackedVertices::new(geo.attrib_width()),
        contours: Vec::new(),
        current: Vec::new(),
    };
    let p = |i: usize| geo.position(i);

    let Some(codes) = geo.codes() else {
        for i in 0..geo.vertex_count() {
            b.point(i, p(i));
        }
        b.finish_contour();
        return Ok(Flattened {
            verts: b.verts,
            contours: b.contours,
        });
    };

    let mut vi = 0;
    let mut curve: Vec<usize> = Vec::new();
    for &code in codes {
        match code {
            VertexCode::Vertex => {
                check_controls(geo, vi, 1, "vertex")?;
                b.point(vi, p(vi));
                vi += 1;
                curve.clear();
            }
            VertexCode::Break => {
                b.finish_contour();
                curve.clear();
            }
            VertexCode::Bezier => {
                check_controls(geo, vi, 3, "bezier")?;
                let start = b.last_position().ok_or_else(|| {
                    TessError::malformed("bezier_vertex needs a preceding vertex")
                })?;
                for q in curves.bezier_points(&start, &p(vi), &p(vi + 1), &p(vi + 2)) {
                    b.point(vi + 2, q);
                }
                vi += 3;
                curve.clear();
            }
            VertexCode::Quadratic => {
                check_controls(geo, vi, 2, "quadratic")?;
                let start = b.last_position().ok_or_else(|| {
                    TessError::malformed("quadratic_vertex needs a preceding vertex")
                })?;
                for q in curves.quadratic_points(&start, &p(vi), &p(vi + 1)) {
                    b.point(vi + 1, q);
                }
                vi += 2;
                curve.clear();
            }
            VertexCode::Curve => {
                check_controls(geo, vi, 1, "curve")?;
                curve.push(vi);
                vi += 1;
                let k = curve.len();
                if k >= 4 {
                    let c = &curve[k - 4..];
                    let points = curves.curve_points(&p(c[0]), &p(c[1]), &p(c[2]), &p(c[3]));
                    // Later segments start where the previous one ended.
                    let skip = usize::from(k > 4);
                    for q in points.into_iter().skip(skip) {
                        b.point(c[2], q);
                    }
                }
            }
        }
    }
    b.finish_contour();
    Ok(Flattened {
        verts: b.verts,
        contours: b.contours,
    })
}

/// Collects `lyon` output into packed records; the combine step for
/// synthesized vertices renormalizes every normal-typed channel.
struct PackedCtor<'a> {
    data: &'a mut Vec<f32>,
    normal_attribs: &'a [(usize, usize)],
    stride: usize,
}

impl FillVertexConstructor<u32> for PackedCtor<'_> {
    fn new_vertex(&mut self, mut vertex: FillVertex) -> u32 {
        let id = (self.data.len() / self.stride) as u32;
        let synthesized = vertex.as_endpoint_id().is_none();
        let start = self.data.len();
        self.data
            .extend_from_slice(vertex.interpolated_attributes());
        if synthesized {
            let record = &mut self.data[start..];
            renormalize(&mut record[NORMAL..NORMAL + 3]);
            for &(offset, components) in self.normal_attribs {
                let at = ATTRIBS + offset;
                renormalize(&mut record[at..at + components]);
            }
        }
        id
    }
}

/// Packed records copied into the poly buffer through the transform.
struct PackedSource<'a> {
    data: &'a [f32],
    stride: usize,
    transform: &'a Transform,
    normal_attribs: &'a [(usize, usize)],
    scratch: Vec<f32>,
}

impl PolyVertexSource for PackedSource<'_> {
    fn push_to(&mut self, i: usize, poly: &mut PolyBuffer) {
        let v = &self.data[i * self.stride..(i + 1) * self.stride];
        self.scratch.clear();
        self.scratch.extend_from_slice(&v[ATTRIBS..]);
        self.transform
            .normal_attribs(&mut self.scratch, self.normal_attribs);
        poly.push_vertex(&PolyVertex {
            position: self.transform.point(&read3(v, POS)),
            color: Color::from_components(&v[COLOR..COLOR + 4]).0,
            normal: self.transform.normal(&read3(v, NORMAL)),
            uv: Vec2::new(v[UV], v[UV + 1]),
            ambient: Color::from_components(&v[AMBIENT..AMBIENT + 4]).0,
            specular: Color::from_components(&v[SPECULAR..SPECULAR + 4]).0,
            emissive: Color::from_components(&v[EMISSIVE..EMISSIVE + 4]).0,
            shininess: v[SHININESS],
            attribs: &self.scratch,
        });
    }
}

/// Axes of the plane a polygon with normal `n` is projected onto.
fn projection_axes(n: &Vec3) -> (usize, usize) {
    let a = n.abs();
    if a.x > a.y && a.x > a.z {
        (1, 2)
    } else if a.y > a.z {
        (2, 0)
    } else {
        (0, 1)
    }
}

/// Fill closed 2D outlines with the non-zero rule. Returns the vertex
/// positions and triangle indices, or `None` if nothing was produced.
pub(crate) fn fill_outlines(outlines: &[Vec<Vec2>], tolerance: f32) -> Option<(Vec<Vec2>, Vec<u32>)> {
    let mut builder = Path::builder();
    let mut any = false;
    for outline in outlines.iter().filter(|o| o.len() >= 3) {
        builder.begin(point(outline[0].x, outline[0].y));
        for p in &outline[1..] {
            builder.line_to(point(p.x, p.y));
        }
        builder.end(true);
        any = true;
    }
    if !any {
        return None;
    }
    let path = builder.build();

    let mut buffers: VertexBuffers<Vec2, u32> = VertexBuffers::new();
    let options = FillOptions::non_zero().with_tolerance(tolerance);
    let result = FillTessellator::new().tessellate_path(
        &path,
        &options,
        &mut BuffersBuilder::new(&mut buffers, |v: FillVertex| {
            let p = v.position();
            Vec2::new(p.x, p.y)
        }),
    );
    if let Err(e) = result {
        log::warn!("Stroke outline fill failed, stroke dropped: {:?}", e);
        return None;
    }
    (!buffers.indices.is_empty()).then_some((buffers.vertices, buffers.indices))
}

impl Tessellator {
    pub(crate) fn tessellate_polygon(
        &self,
        geo: &InGeometry,
        close: bool,
        out: &mut Batch,
    ) -> TessResult<()> {
        if geo.is_empty() {
            return Ok(());
        }
        profile_function!();
        let flat = flatten(geo, &self.curves)?;
        if self.fill {
            self.fill_polygon(&flat, out)?;
        }
        if self.stroke {
            let path = flat.stroke_path(close);
            self.tessellate_edges(&path, out)?;
        }
        Ok(())
    }

    /// Fill contours with the non-zero rule, or even-odd when there are
    /// holes. A failing fill is logged and dropped.
    fn fill_polygon(&self, flat: &Flattened, out: &mut Batch) -> TessResult<()> {
        let normal = flat.newell_normal();
        let (ax, ay) = projection_axes(&normal);
        let stride = flat.verts.stride;

        let mut builder = Path::builder_with_attributes(stride);
        let mut any = false;
        for contour in flat.contours.iter().filter(|c| c.len() >= 3) {
            let at = |i: usize| {
                let p = flat.verts.position(i);
                point(p[ax], p[ay])
            };
            builder.begin(at(contour[0]), flat.verts.record(contour[0]));
            for &i in &contour[1..] {
                builder.line_to(at(i), flat.verts.record(i));
            }
            builder.end(true);
            any = true;
        }
        if !any {
            return Ok(());
        }
        let path = builder.build();

        let rule = if flat.contours.len() > 1 {
            FillRule::EvenOdd
        } else {
            FillRule::NonZero
        };
        let options = FillOptions::default()
            .with_fill_rule(rule)
            .with_tolerance(self.tolerance);
        let mut data: Vec<f32> = Vec::with_capacity(flat.verts.data.len());
        let mut buffers: VertexBuffers<u32, u32> = VertexBuffers::new();
        let result = {
            let ctor = PackedCtor {
                data: &mut data,
                normal_attribs: &self.normal_attribs,
                stride,
            };
            FillTessellator::new().tessellate_path(
                &path,
                &options,
                &mut BuffersBuilder::new(&mut buffers, ctor),
            )
        };
        if let Err(e) = result {
            log::warn!(
                "Polygon fill failed for {} contours, fill dropped: {:?}",
                flat.contours.len(),
                e
            );
            return Ok(());
        }

        if self.auto_normals {
            if let Some(n) = normal.try_normalize(f32::EPSILON) {
                for record in data.chunks_exact_mut(stride) {
                    record[NORMAL..NORMAL + 3].copy_from_slice(n.as_slice());
                }
            }
        }

        let raw: Vec<usize> = buffers.indices.iter().map(|&i| i as usize).collect();
        let mut source = PackedSource {
            data: &data,
            stride,
            transform: &self.transform,
            normal_attribs: &self.normal_attribs,
            scratch: Vec::with_capacity(stride - ATTRIBS),
        };
        let poly = &mut out.geometry.poly;
        out.textures.begin_tex(self.texture, poly);
        let result = split_raw_indices(&raw, &mut source, poly, self.retained);
        out.textures.end_tex(poly);
        result
    }
}
