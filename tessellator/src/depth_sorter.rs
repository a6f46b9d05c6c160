//! Back-to-front triangle ordering for drawing without a depth buffer.
//!
//! Triangles are projected to screen space (`z` grows toward the viewer),
//! sorted by their nearest-to-back extent and then swept pairwise:
//!
//! 1. disjoint depth ranges keep the current order
//! 2. disjoint screen rectangles cannot occlude each other
//! 3. plane-side tests settle overlapping pairs that are ordered correctly
//! 4. anything else swaps the pair once; a triangle that would need a second
//!    swap is drawn where it is
//!
//! The single swap keeps the sweep terminating on interlocked or cyclic
//! input at the cost of a locally wrong order there.

use redlilium_core::math::{project_point, Mat4, Vec3, Vec4};
use redlilium_core::profiling::profile_function;

use crate::index_cache::{IndexCache, IndexRange};
use crate::style::TextureId;
use crate::tess_geometry::PolyBuffer;
use crate::texture_cache::{TexCache, TexEntry};

/// Screen-space triangle.
pub type ScreenTriangle = [Vec3; 3];

#[derive(Debug, Clone, Copy)]
struct Bounds {
    min: Vec3,
    max: Vec3,
}

impl Bounds {
    fn of(t: &ScreenTriangle) -> Self {
        Self {
            min: t[0].inf(&t[1]).inf(&t[2]),
            max: t[0].sup(&t[1]).sup(&t[2]),
        }
    }

    fn overlaps_xy(&self, other: &Bounds) -> bool {
        self.min.x < other.max.x
            && other.min.x < self.max.x
            && self.min.y < other.max.y
            && other.min.y < self.max.y
    }
}

/// Whether every vertex of `tri` lies on the `side` (+1 toward the viewer,
/// -1 away) of the plane through `plane`, within a tolerance relative to
/// the largest vertex distance.
fn is_on_side(tri: &ScreenTriangle, plane: &ScreenTriangle, side: f32) -> bool {
    let mut n = (plane[1] - plane[0]).cross(&(plane[2] - plane[0]));
    if n.norm_squared() < f32::MIN_POSITIVE {
        return true;
    }
    if n.z < 0.0 {
        n = -n;
    }
    let d = tri.map(|p| n.dot(&(p - plane[0])));
    let eps = 0.1 * d.iter().fold(0.0f32, |m, x| m.max(x.abs()));
    d.iter().all(|&x| side * x >= -eps)
}

/// Draw order (back to front) of screen-space triangles.
pub fn sort_triangles(triangles: &[ScreenTriangle]) -> Vec<usize> {
    profile_function!();
    let bounds: Vec<Bounds> = triangles.iter().map(Bounds::of).collect();
    let mut order: Vec<usize> = (0..triangles.len()).collect();
    order.sort_by(|&a, &b| bounds[a].min.z.total_cmp(&bounds[b].min.z).then(a.cmp(&b)));

    let mut swapped = vec![false; triangles.len()];
    let mut marked: Vec<usize> = Vec::new();
    let mut swaps = 0usize;
    let mut active = 0;
    while active < order.len() {
        let a = order[active];
        let mut restart = false;
        for test in active + 1..order.len() {
            let t = order[test];
            if bounds[a].max.z <= bounds[t].min.z && !swapped[t] {
                break;
            }
            if !bounds[a].overlaps_xy(&bounds[t]) {
                continue;
            }
            if is_on_side(&triangles[t], &triangles[a], 1.0)
                || is_on_side(&triangles[a], &triangles[t], -1.0)
            {
                continue;
            }
            if swapped[t] {
                break;
            }
            swapped[a] = true;
            marked.push(a);
            order[active..=test].rotate_right(1);
            swaps += 1;
            restart = true;
            break;
        }
        if !restart {
            active += 1;
            for i in marked.drain(..) {
                swapped[i] = false;
            }
        }
    }
    log::debug!("Depth sorted {} triangles with {} swaps", triangles.len(), swaps);
    order
}

/// Reorder the triangles of `poly` back to front under `projection`.
///
/// Index caches and texture runs are rebuilt to follow the new order: a run
/// breaks wherever consecutive triangles change cache or texture, and every
/// run keeps the vertex range of the cache it came from. The buffer should
/// receive no further geometry afterwards.
pub fn sort_poly(poly: &mut PolyBuffer, textures: &mut TexCache, projection: &Mat4) {
    let count = poly.index_count() / 3;
    if count < 2 {
        return;
    }
    profile_function!();

    let mut tri_cache = vec![0usize; count];
    for (c, range) in poly.cache.iter().enumerate() {
        let first = range.index_offset / 3;
        let last = (range.index_offset + range.index_count) / 3;
        tri_cache[first..last].fill(c);
    }
    let mut tri_texture: Vec<Option<TextureId>> = vec![None; count];
    for e in textures.entries() {
        tri_texture[e.first_index / 3..=e.last_index / 3].fill(e.texture);
    }

    let screen: Vec<ScreenTriangle> = (0..count)
        .map(|k| {
            let base = poly.cache.entry(tri_cache[k]).vertex_offset;
            std::array::from_fn(|j| {
                let p = poly.positions[base + poly.indices[3 * k + j] as usize];
                let ndc = project_point(projection, &Vec4::new(p[0], p[1], p[2], p[3]));
                Vec3::new(ndc.x, ndc.y, -ndc.z)
            })
        })
        .collect();
    let order = sort_triangles(&screen);

    let old_indices = std::mem::take(&mut poly.indices);
    let old_cache = std::mem::take(&mut poly.cache);
    let mut cache = IndexCache::new();
    let mut runs: Vec<Option<TextureId>> = Vec::new();
    let mut current = None;
    poly.indices.reserve(old_indices.len());
    for &k in &order {
        let key = (tri_cache[k], tri_texture[k]);
        if current != Some(key) {
            let source = old_cache.entry(key.0);
            cache.push(IndexRange {
                index_offset: poly.indices.len(),
                index_count: 0,
                vertex_offset: source.vertex_offset,
                vertex_count: source.vertex_count,
            });
            runs.push(key.1);
            current = Some(key);
        }
        poly.indices.extend_from_slice(&old_indices[3 * k..3 * k + 3]);
        cache.inc_counts(cache.len() - 1, 3, 0);
    }
    poly.cache = cache;

    textures.clear();
    let mut pending: Option<TexEntry> = None;
    for (c, (range, texture)) in poly.cache.iter().zip(runs).enumerate() {
        let last_index = range.index_offset + range.index_count - 1;
        match pending.as_mut() {
            Some(e) if e.texture == texture => {
                e.last_index = last_index;
                e.last_cache = c;
            }
            _ => {
                if let Some(done) = pending.take() {
                    textures.push(done);
                }
                pending = Some(TexEntry {
                    texture,
                    first_index: range.index_offset,
                    first_cache: c,
                    last_index,
                    last_cache: c,
                });
            }
        }
    }
    if let Some(done) = pending {
        textures.push(done);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tessellator::stroke_vertex;
    use redlilium_core::math::orthographic_rh;

    fn push_triangle(poly: &mut PolyBuffer, textures: &mut TexCache, tex: Option<TextureId>, t: ScreenTriangle) {
        textures.begin_tex(tex, poly);
        let c = poly.cache.reserve(3, false).unwrap();
        let base = poly.cache.vertex_count(c) as u16;
        for p in t {
            poly.push_vertex(&stroke_vertex(p, 0, &[]));
        }
        poly.indices.extend_from_slice(&[base, base + 1, base + 2]);
        poly.cache.inc_counts(c, 3, 3);
        textures.end_tex(poly);
    }

    fn slanted() -> ScreenTriangle {
        [
            Vec3::new(-10.0, -10.0, -9.0),
            Vec3::new(10.0, -10.0, -0.5),
            Vec3::new(0.0, 10.0, -0.5),
        ]
    }

    fn small_flat() -> ScreenTriangle {
        [
            Vec3::new(-1.0, -1.0, -5.0),
            Vec3::new(1.0, -1.0, -5.0),
            Vec3::new(0.0, 1.0, -5.0),
        ]
    }

    fn projection() -> Mat4 {
        orthographic_rh(-20.0, 20.0, -20.0, 20.0, 0.1, 100.0)
    }

    #[test]
    fn test_disjoint_depths_keep_order() {
        let back = [Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 1.0, 0.0)];
        let front = back.map(|p| p + Vec3::new(0.0, 0.0, 1.0));
        assert_eq!(sort_triangles(&[front, back]), vec![1, 0]);
        assert_eq!(sort_triangles(&[back, front]), vec![0, 1]);
    }

    #[test]
    fn test_triangle_behind_slanted_plane_goes_first() {
        let mut poly = PolyBuffer::new(0);
        let mut textures = TexCache::new();
        push_triangle(&mut poly, &mut textures, None, slanted());
        push_triangle(&mut poly, &mut textures, None, small_flat());
        sort_poly(&mut poly, &mut textures, &projection());
        // The flat triangle's vertices were pushed second.
        assert_eq!(poly.indices, vec![3, 4, 5, 0, 1, 2]);
        assert_eq!(poly.cache.len(), 1);
        assert_eq!(poly.position(poly.indices[0] as usize).z, -5.0);
    }

    #[test]
    fn test_interlocked_pair_terminates() {
        let a = [Vec3::new(-1.0, -1.0, -1.0), Vec3::new(1.0, -1.0, 1.0), Vec3::new(0.0, 1.0, 0.0)];
        let b = [Vec3::new(-1.0, -1.0, 1.0), Vec3::new(1.0, -1.0, -1.0), Vec3::new(0.0, 1.0, 0.0)];
        assert_eq!(sort_triangles(&[a, b]), vec![1, 0]);
    }

    #[test]
    fn test_sort_is_idempotent() {
        let mut poly = PolyBuffer::new(0);
        let mut textures = TexCache::new();
        push_triangle(&mut poly, &mut textures, None, slanted());
        push_triangle(&mut poly, &mut textures, None, small_flat());
        sort_poly(&mut poly, &mut textures, &projection());
        let once = (poly.indices.clone(), poly.cache.clone(), textures.clone());
        sort_poly(&mut poly, &mut textures, &projection());
        assert_eq!((poly.indices.clone(), poly.cache.clone(), textures.clone()), once);
    }

    fn resolved_triangles(poly: &PolyBuffer) -> Vec<[[f32; 3]; 3]> {
        let mut out = Vec::new();
        for range in poly.cache.iter() {
            let indices = &poly.indices[range.index_offset..range.index_offset + range.index_count];
            for t in indices.chunks_exact(3) {
                out.push(<[u16; 3]>::try_from(t).unwrap().map(|i| {
                    assert!((i as usize) < range.vertex_count);
                    let p = poly.positions[range.vertex_offset + i as usize];
                    [p[0], p[1], p[2]]
                }));
            }
        }
        out
    }

    #[test]
    fn test_sort_remaps_multiple_caches() {
        let far = small_flat().map(|p| p + Vec3::new(0.0, 0.0, -45.0));
        let mut poly = PolyBuffer::new(0);
        let mut textures = TexCache::new();
        push_triangle(&mut poly, &mut textures, None, slanted());
        poly.cache.add_new();
        push_triangle(&mut poly, &mut textures, None, small_flat());
        poly.cache.add_new();
        push_triangle(&mut poly, &mut textures, None, far);
        assert_eq!(poly.cache.len(), 3);
        assert_eq!(poly.indices, vec![0, 1, 2, 0, 1, 2, 0, 1, 2]);
        let before = resolved_triangles(&poly);

        sort_poly(&mut poly, &mut textures, &projection());

        let after = resolved_triangles(&poly);
        assert_eq!(after.len(), before.len());
        assert!(before.iter().all(|t| after.contains(t)));
        // Each triangle sits alone in its source cache, so no run merges.
        assert_eq!(poly.cache.len(), 3);
        let mut offsets: Vec<usize> = poly.cache.iter().map(|r| r.vertex_offset).collect();
        offsets.sort_unstable();
        assert_eq!(offsets, vec![0, 3, 6]);

        let calls = textures.draw_calls(&poly.cache);
        assert_eq!(calls.len(), 3);
        for (call, range) in calls.iter().zip(poly.cache.iter()) {
            assert_eq!(call.index_offset, range.index_offset);
            assert_eq!(call.vertex_offset, range.vertex_offset);
        }
    }

    #[test]
    fn test_texture_runs_follow_new_order() {
        let tex = Some(TextureId(7));
        let mut poly = PolyBuffer::new(0);
        let mut textures = TexCache::new();
        push_triangle(&mut poly, &mut textures, tex, slanted());
        push_triangle(&mut poly, &mut textures, None, small_flat());
        sort_poly(&mut poly, &mut textures, &projection());
        let entries = textures.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].texture, None);
        assert_eq!((entries[0].first_index, entries[0].last_index), (0, 2));
        assert_eq!(entries[1].texture, tex);
        assert_eq!((entries[1].first_index, entries[1].last_index), (3, 5));
        assert_eq!(poly.cache.len(), 2);
        let calls = textures.draw_calls(&poly.cache);
        assert_eq!(calls.len(), 2);
        assert!(calls.iter().all(|c| c.index_count == 3 && c.vertex_offset == 0));
    }
}
