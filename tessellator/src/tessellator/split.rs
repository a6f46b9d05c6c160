//! Partitioning of raw triangle indices into 16-bit index caches.
//!
//! Raw indices reference a source numbering (input vertices, or the output
//! of the polygon filler). Triangles are walked in order; each cache copies
//! the contiguous source range it covers plus the few vertices below that
//! range ("duplicates") that straddling triangles still reference.

use crate::config::MAX_CACHE_INDEX;
use crate::error::{TessError, TessResult};
use crate::tess_geometry::PolyBuffer;

/// Something that can copy one of its vertices into a poly buffer.
pub(crate) trait PolyVertexSource {
    fn push_to(&mut self, index: usize, poly: &mut PolyBuffer);
}

#[derive(Debug, Clone, Copy)]
enum Slot {
    Range(usize),
    Dup(usize),
}

struct Plan {
    /// Vertex count of the cache after the triangle.
    total: usize,
    base: usize,
    max: Option<usize>,
    new_dups: Vec<usize>,
}

/// State of the cache currently being filled.
struct CacheSplit {
    cache: usize,
    /// Vertices already in the cache before this batch.
    count0: usize,
    /// Source indices below this were copied by an earlier cache.
    floor: usize,
    base: usize,
    max: Option<usize>,
    /// Sorted source indices copied after the range.
    dups: Vec<usize>,
    pending: Vec<Slot>,
}

impl CacheSplit {
    fn open(poly: &mut PolyBuffer, fresh: bool, floor: usize) -> Self {
        let cache = if fresh {
            poly.cache.add_new()
        } else {
            poly.cache.get_last()
        };
        Self {
            cache,
            count0: poly.cache.vertex_count(cache),
            floor,
            base: floor,
            max: None,
            dups: Vec::new(),
            pending: Vec::new(),
        }
    }

    fn reopen(&mut self, poly: &mut PolyBuffer) {
        self.cache = poly.cache.add_new();
        self.count0 = 0;
    }

    fn range_len(&self) -> usize {
        self.max.map_or(0, |m| m - self.base + 1)
    }

    /// What adding `tri` would do to the cache.
    fn plan(&self, tri: &[usize]) -> Plan {
        let fresh = self.pending.is_empty();
        let base = if fresh {
            tri.iter()
                .copied()
                .filter(|&v| v >= self.floor)
                .min()
                .unwrap_or(self.floor)
        } else {
            self.base
        };
        let mut max = if fresh { None } else { self.max };
        let mut new_dups: Vec<usize> = Vec::new();
        for &v in tri {
            if v >= base {
                max = Some(max.map_or(v, |m| m.max(v)));
            } else if self.dups.binary_search(&v).is_err() && !new_dups.contains(&v) {
                new_dups.push(v);
            }
        }
        let range = max.map_or(0, |m| m - base + 1);
        Plan {
            total: self.count0 + range + self.dups.len() + new_dups.len(),
            base,
            max,
            new_dups,
        }
    }

    /// Add `tri` if its highest cache-relative index stays addressable.
    fn try_add(&mut self, tri: &[usize]) -> bool {
        let plan = self.plan(tri);
        if plan.total > MAX_CACHE_INDEX + 1 {
            return false;
        }
        self.base = plan.base;
        self.max = plan.max;
        for v in plan.new_dups {
            if let Err(pos) = self.dups.binary_search(&v) {
                self.dups.insert(pos, v);
            }
        }
        for &v in tri {
            self.pending.push(if v >= self.base {
                Slot::Range(v)
            } else {
                Slot::Dup(v)
            });
        }
        true
    }

    fn flush<S: PolyVertexSource + ?Sized>(&mut self, source: &mut S, poly: &mut PolyBuffer) {
        if self.pending.is_empty() {
            return;
        }
        let range = self.range_len();
        if let Some(max) = self.max {
            for v in self.base..=max {
                source.push_to(v, poly);
            }
        }
        for &v in &self.dups {
            source.push_to(v, poly);
        }
        for slot in &self.pending {
            let local = match *slot {
                Slot::Range(v) => self.count0 + v - self.base,
                Slot::Dup(v) => {
                    let pos = self.dups.binary_search(&v).unwrap_or_default();
                    self.count0 + range + pos
                }
            };
            poly.indices.push(local as u16);
        }
        poly.cache
            .inc_counts(self.cache, self.pending.len(), range + self.dups.len());

        if let Some(max) = self.max {
            self.floor = self.floor.max(max + 1);
        }
        self.count0 += range + self.dups.len();
        self.max = None;
        self.dups.clear();
        self.pending.clear();
    }
}

/// Copy the triangles of `raw` into `poly`, opening new index caches
/// whenever a triangle would not be addressable with 16-bit indices.
///
/// With `fresh` set the first triangle goes into a new cache, otherwise the
/// last cache is continued. Fails only when a single triangle cannot fit into
/// an empty cache; `poly` is then left as it was on entry.
pub(crate) fn split_raw_indices<S: PolyVertexSource + ?Sized>(
    raw: &[usize],
    source: &mut S,
    poly: &mut PolyBuffer,
    fresh: bool,
) -> TessResult<()> {
    if raw.len() < 3 {
        return Ok(());
    }
    let mark = poly.mark();
    let floor = raw.iter().copied().min().unwrap_or(0);
    let mut split = CacheSplit::open(poly, fresh, floor);

    for tri in raw.chunks_exact(3) {
        loop {
            if split.try_add(tri) {
                break;
            }
            if !split.pending.is_empty() {
                split.flush(source, poly);
                split.reopen(poly);
            } else if split.count0 > 0 {
                split.reopen(poly);
            } else {
                let needed = split.plan(tri).total;
                poly.rollback(mark);
                return Err(TessError::IndexOverflow {
                    needed,
                    max: MAX_CACHE_INDEX + 1,
                });
            }
        }
    }
    split.flush(source, poly);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tess_geometry::PolyVertex;
    use redlilium_core::math::{Vec2, Vec3};

    /// Source whose vertex `i` sits at `(i, 0, 0)`.
    struct Numbered;

    impl PolyVertexSource for Numbered {
        fn push_to(&mut self, index: usize, poly: &mut PolyBuffer) {
            poly.push_vertex(&PolyVertex {
                position: Vec3::new(index as f32, 0.0, 0.0),
                color: 0,
                normal: Vec3::z(),
                uv: Vec2::zeros(),
                ambient: 0,
                specular: 0,
                emissive: 0,
                shininess: 0.0,
                attribs: &[],
            });
        }
    }

    fn resolved(poly: &PolyBuffer) -> Vec<usize> {
        let mut out = Vec::new();
        for range in poly.cache.iter() {
            for k in 0..range.index_count {
                let local = poly.indices[range.index_offset + k] as usize;
                assert!(local < range.vertex_count);
                out.push(poly.position(range.vertex_offset + local).x as usize);
            }
        }
        out
    }

    #[test]
    fn test_small_batch_single_cache() {
        let mut poly = PolyBuffer::new(0);
        let raw = [0, 1, 2, 2, 3, 0];
        split_raw_indices(&raw, &mut Numbered, &mut poly, false).unwrap();
        assert_eq!(poly.cache.len(), 1);
        assert_eq!(poly.vertex_count(), 4);
        assert_eq!(poly.indices, vec![0, 1, 2, 2, 3, 0]);
    }

    #[test]
    fn test_continues_last_cache() {
        let mut poly = PolyBuffer::new(0);
        split_raw_indices(&[0, 1, 2], &mut Numbered, &mut poly, false).unwrap();
        split_raw_indices(&[5, 6, 7], &mut Numbered, &mut poly, false).unwrap();
        assert_eq!(poly.cache.len(), 1);
        assert_eq!(poly.indices, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(resolved(&poly), vec![0, 1, 2, 5, 6, 7]);
    }

    #[test]
    fn test_fresh_opens_new_cache() {
        let mut poly = PolyBuffer::new(0);
        split_raw_indices(&[0, 1, 2], &mut Numbered, &mut poly, true).unwrap();
        split_raw_indices(&[0, 1, 2], &mut Numbered, &mut poly, true).unwrap();
        assert_eq!(poly.cache.len(), 2);
        assert_eq!(poly.cache.entry(1).vertex_offset, 3);
    }

    #[test]
    fn test_fan_duplicates_hub_vertex() {
        let mut poly = PolyBuffer::new(0);
        let n = 70_000;
        let mut raw = Vec::new();
        for i in 1..n - 1 {
            raw.extend_from_slice(&[0, i, i + 1]);
        }
        split_raw_indices(&raw, &mut Numbered, &mut poly, false).unwrap();
        assert_eq!(poly.cache.len(), 2);
        assert_eq!(resolved(&poly), raw);
        // Only the hub and the shared boundary vertex are copied twice.
        assert_eq!(poly.vertex_count(), n + 2);
    }

    #[test]
    fn test_empty_and_short_input() {
        let mut poly = PolyBuffer::new(0);
        split_raw_indices(&[], &mut Numbered, &mut poly, false).unwrap();
        split_raw_indices(&[0, 1], &mut Numbered, &mut poly, false).unwrap();
        assert_eq!(poly.vertex_count(), 0);
    }

    #[test]
    fn test_unaddressable_triangle_fails() {
        let mut poly = PolyBuffer::new(0);
        let raw = [0, 70_000, 1];
        let err = split_raw_indices(&raw, &mut Numbered, &mut poly, false).unwrap_err();
        assert!(matches!(err, TessError::IndexOverflow { .. }));
    }

    #[test]
    fn test_overflow_leaves_buffer_untouched() {
        let mut poly = PolyBuffer::new(0);
        split_raw_indices(&[0, 1, 2], &mut Numbered, &mut poly, false).unwrap();
        let before = poly.clone();

        let raw = [3, 4, 5, 6, 70_006, 7];
        let err = split_raw_indices(&raw, &mut Numbered, &mut poly, false).unwrap_err();
        assert!(matches!(err, TessError::IndexOverflow { .. }));
        assert_eq!(poly, before);
    }
}
