//! Point sprites.
//!
//! Round points are fans whose perimeter resolution follows their size;
//! square points are a center plus four corners. In 3D with shader points
//! the fan goes to the point buffer as a center position plus per-vertex
//! offsets, otherwise the offsets are applied here and the fan goes to the
//! poly buffer.

use std::f32::consts::TAU;

use redlilium_core::math::{Vec2, Vec3};
use redlilium_core::profiling::profile_function;

use super::{stroke_vertex, Tessellator};
use crate::batch::Batch;
use crate::config::point_accuracy;
use crate::error::TessResult;
use crate::in_geometry::InGeometry;
use crate::style::StrokeCap;

/// Corner directions of a square point, counter-clockwise.
#[rustfmt::skip]
const QUAD_POINT_SIGNS: [[f32; 2]; 4] = [
    [-1.0, -1.0],
    [ 1.0, -1.0],
    [ 1.0,  1.0],
    [-1.0,  1.0],
];

/// Perimeter offsets of one point of the given stroke weight.
fn point_offsets(round: bool, weight: f32) -> Vec<Vec2> {
    let r = 0.5 * weight;
    if round {
        let perim = point_accuracy(weight);
        (0..perim)
            .map(|k| {
                let (s, c) = (TAU * k as f32 / perim as f32).sin_cos();
                Vec2::new(r * c, r * s)
            })
            .collect()
    } else {
        QUAD_POINT_SIGNS
            .iter()
            .map(|s| Vec2::new(s[0] * r, s[1] * r))
            .collect()
    }
}

/// Fan indices around vertex 0 with a wrapping perimeter.
fn fan_indices(perim: usize) -> impl Iterator<Item = usize> {
    (0..perim).flat_map(move |k| [0, k + 1, (k + 1) % perim + 1])
}

impl Tessellator {
    pub(crate) fn tessellate_points(&self, geo: &InGeometry, out: &mut Batch) -> TessResult<()> {
        if !self.stroke || geo.is_empty() {
            return Ok(());
        }
        profile_function!();
        let round = self.cap == StrokeCap::Round;

        if self.is_3d && self.caps.shader_points {
            let point = &mut out.geometry.point;
            for i in 0..geo.vertex_count() {
                let center = self.transform.point(&geo.position(i));
                let color = geo.stroke_color(i);
                let offsets = point_offsets(round, geo.stroke_weight(i));
                let perim = offsets.len();
                let cache = point.cache.reserve(perim + 1, false)?;
                let base = point.cache.vertex_count(cache);
                point.push_vertex(center, color, Vec2::zeros());
                for o in &offsets {
                    point.push_vertex(center, color, *o);
                }
                point
                    .indices
                    .extend(fan_indices(perim).map(|k| (base + k) as u16));
                point.cache.inc_counts(cache, 3 * perim, perim + 1);
            }
            return Ok(());
        }

        let scale = self.transform.scale();
        let poly = &mut out.geometry.poly;
        out.textures.begin_no_tex(poly);
        for i in 0..geo.vertex_count() {
            let center = self.transform.point(&geo.position(i));
            let color = geo.stroke_color(i);
            let offsets = point_offsets(round, geo.stroke_weight(i) * scale);
            let perim = offsets.len();
            let cache = match poly.cache.reserve(perim + 1, false) {
                Ok(cache) => cache,
                Err(e) => {
                    out.textures.end_tex(poly);
                    return Err(e);
                }
            };
            let base = poly.cache.vertex_count(cache);
            poly.push_vertex(&stroke_vertex(center, color, &self.zero_attribs));
            for o in &offsets {
                let p = center + Vec3::new(o.x, o.y, 0.0);
                poly.push_vertex(&stroke_vertex(p, color, &self.zero_attribs));
            }
            poly.indices
                .extend(fan_indices(perim).map(|k| (base + k) as u16));
            poly.cache.inc_counts(cache, 3 * perim, perim + 1);
        }
        out.textures.end_tex(poly);
        Ok(())
    }
}
