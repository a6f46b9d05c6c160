//! Cap and join aware stroke outlines.
//!
//! Edges are regrouped into subpaths, stroked with `kurbo` into a closed
//! outline, flattened and filled with the non-zero rule. Outline vertices
//! take the stroke color of the nearest source segment.

use kurbo::{BezPath, Cap, Join, PathEl, Point, Stroke, StrokeOpts};
use redlilium_core::math::{Vec2, Vec3};
use redlilium_core::profiling::profile_scope;

use super::polygon::fill_outlines;
use super::{stroke_vertex, PolyVertexSource, StrokeSource, Transform};
use crate::primitive::EdgeKind;
use crate::style::{Color, StrokeCap, StrokeJoin};
use crate::tess_geometry::PolyBuffer;

const MITER_LIMIT: f64 = 10.0;

fn kurbo_cap(cap: StrokeCap) -> Cap {
    match cap {
        StrokeCap::Square => Cap::Butt,
        StrokeCap::Project => Cap::Square,
        StrokeCap::Round => Cap::Round,
    }
}

fn kurbo_join(join: StrokeJoin) -> Join {
    match join {
        StrokeJoin::Miter => Join::Miter,
        StrokeJoin::Bevel => Join::Bevel,
        StrokeJoin::Round => Join::Round,
    }
}

/// Vertex indices of one stroke subpath.
#[derive(Debug, Default)]
struct Subpath {
    points: Vec<usize>,
    closed: bool,
}

/// Regroup edges into continuous subpaths; the duplicate point closing a
/// loop is dropped in favour of the close flag.
fn subpaths<S: StrokeSource + ?Sized>(src: &S) -> Vec<Subpath> {
    let mut paths: Vec<Subpath> = Vec::new();
    for edge in src.edges() {
        if edge.kind == EdgeKind::Close {
            if let Some(path) = paths.last_mut() {
                if path.points.len() > 2 && path.points.last() == path.points.first() {
                    path.points.pop();
                }
                path.closed = path.points.len() > 2;
            }
            continue;
        }
        let continues = !edge.kind.starts_path()
            && paths
                .last()
                .is_some_and(|p| !p.closed && p.points.last() == Some(&edge.start));
        if continues {
            if let Some(path) = paths.last_mut() {
                path.points.push(edge.end);
            }
        } else {
            paths.push(Subpath {
                points: vec![edge.start, edge.end],
                closed: false,
            });
        }
    }
    paths
}

/// Transformed source segment used to color outline vertices.
struct ColorSegment {
    p0: Vec2,
    p1: Vec2,
    c0: Color,
    c1: Color,
}

impl ColorSegment {
    /// Squared distance from `q` and the interpolation parameter.
    fn project(&self, q: Vec2) -> (f32, f32) {
        let d = self.p1 - self.p0;
        let len2 = d.norm_squared();
        let t = if len2 > 0.0 {
            ((q - self.p0).dot(&d) / len2).clamp(0.0, 1.0)
        } else {
            0.0
        };
        ((self.p0 + d * t - q).norm_squared(), t)
    }
}

/// Filled stroke outline ready to be split into the poly buffer.
pub(crate) struct OutlineSource<'a> {
    positions: Vec<Vec2>,
    colors: Vec<u32>,
    indices: Vec<u32>,
    attribs: &'a [f32],
}

impl OutlineSource<'_> {
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }
}

impl PolyVertexSource for OutlineSource<'_> {
    fn push_to(&mut self, i: usize, poly: &mut PolyBuffer) {
        let p = self.positions[i];
        poly.push_vertex(&stroke_vertex(
            Vec3::new(p.x, p.y, 0.0),
            self.colors[i],
            self.attribs,
        ));
    }
}

/// Build and fill the stroke outline of `src`. Returns `None` when nothing
/// is left to draw.
pub(crate) fn outline<'a, S: StrokeSource + ?Sized>(
    src: &S,
    transform: &Transform,
    cap: StrokeCap,
    join: StrokeJoin,
    tolerance: f32,
    attribs: &'a [f32],
) -> Option<OutlineSource<'a>> {
    profile_scope!("stroke_outline");
    let first_edge = src.edges().iter().find(|e| e.kind != EdgeKind::Close)?;
    let weight = src.stroke_weight(first_edge.start) * transform.scale();
    if weight <= 0.0 {
        return None;
    }

    let screen = |i: usize| {
        let p = transform.point(&src.stroke_position(i));
        Vec2::new(p.x, p.y)
    };
    let to_point = |p: Vec2| Point::new(p.x as f64, p.y as f64);

    let mut path = BezPath::new();
    let mut segments = Vec::new();
    for sub in subpaths(src) {
        let Some((&head, rest)) = sub.points.split_first() else {
            continue;
        };
        path.move_to(to_point(screen(head)));
        for &i in rest {
            path.line_to(to_point(screen(i)));
        }
        if sub.closed {
            path.close_path();
        }
        let n = sub.points.len();
        let pairs = if sub.closed { n } else { n - 1 };
        for k in 0..pairs {
            let (a, b) = (sub.points[k], sub.points[(k + 1) % n]);
            segments.push(ColorSegment {
                p0: screen(a),
                p1: screen(b),
                c0: Color(src.stroke_color(a)),
                c1: Color(src.stroke_color(b)),
            });
        }
    }

    let style = Stroke::new(weight as f64)
        .with_caps(kurbo_cap(cap))
        .with_join(kurbo_join(join))
        .with_miter_limit(MITER_LIMIT);
    let stroked = kurbo::stroke(path.iter(), &style, &StrokeOpts::default(), tolerance as f64);

    let mut polygons: Vec<Vec<Vec2>> = Vec::new();
    kurbo::flatten(stroked.iter(), tolerance as f64, |el| match el {
        PathEl::MoveTo(p) => polygons.push(vec![Vec2::new(p.x as f32, p.y as f32)]),
        PathEl::LineTo(p) => {
            if let Some(poly) = polygons.last_mut() {
                poly.push(Vec2::new(p.x as f32, p.y as f32));
            }
        }
        _ => {}
    });

    let (positions, indices) = fill_outlines(&polygons, tolerance)?;
    let colors = positions
        .iter()
        .map(|&q| {
            segments
                .iter()
                .map(|s| {
                    let (dist, t) = s.project(q);
                    (dist, s.c0.lerp(s.c1, t))
                })
                .min_by(|a, b| a.0.total_cmp(&b.0))
                .map_or(0, |(_, c)| c.0)
        })
        .collect();

    Some(OutlineSource {
        positions,
        colors,
        indices,
        attribs,
    })
}
