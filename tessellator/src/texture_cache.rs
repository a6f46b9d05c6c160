//! Texture cache: which texture applies to each run of polygon indices.

use crate::index_cache::IndexCache;
use crate::style::TextureId;
use crate::tess_geometry::PolyBuffer;

/// A run of polygon indices drawn with one texture (or none).
///
/// `last_index` is inclusive. Index positions are absolute within the
/// polygon index buffer; the cache fields name the index caches holding the
/// first and last index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TexEntry {
    pub texture: Option<TextureId>,
    pub first_index: usize,
    pub first_cache: usize,
    pub last_index: usize,
    pub last_cache: usize,
}

/// One draw call: a range of indices drawn relative to a base vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawCall {
    pub texture: Option<TextureId>,
    pub index_offset: usize,
    pub index_count: usize,
    pub vertex_offset: usize,
}

/// Ordered, coalesced texture runs of a polygon buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TexCache {
    entries: Vec<TexEntry>,
    pending: Option<(Option<TextureId>, usize)>,
}

impl TexCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[TexEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn has_textures(&self) -> bool {
        self.entries.iter().any(|e| e.texture.is_some())
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.pending = None;
    }

    /// Remember where the indices of the next primitive start.
    pub fn begin_tex(&mut self, texture: Option<TextureId>, poly: &PolyBuffer) {
        self.pending = Some((texture, poly.index_count()));
    }

    /// Start an untextured run (2D strokes).
    pub fn begin_no_tex(&mut self, poly: &PolyBuffer) {
        self.begin_tex(None, poly);
    }

    /// Close the run opened by [`begin_tex`](Self::begin_tex).
    ///
    /// Nothing is recorded when no indices were emitted. A run that continues
    /// the previous entry with the same texture extends it.
    pub fn end_tex(&mut self, poly: &PolyBuffer) {
        let Some((texture, first_index)) = self.pending.take() else {
            return;
        };
        let end = poly.index_count();
        if end <= first_index {
            return;
        }
        let last_index = end - 1;
        let (Some(first_cache), Some(last_cache)) =
            (poly.cache.find(first_index), poly.cache.find(last_index))
        else {
            log::warn!(
                "Texture run {}..={} is not covered by any index cache",
                first_index,
                last_index
            );
            return;
        };

        if let Some(last) = self.entries.last_mut() {
            if last.texture == texture && last.last_index + 1 == first_index {
                last.last_index = last_index;
                last.last_cache = last_cache;
                return;
            }
        }
        self.entries.push(TexEntry {
            texture,
            first_index,
            first_cache,
            last_index,
            last_cache,
        });
    }

    /// Append an entry verbatim (used when rebuilding after depth sorting).
    pub fn push(&mut self, entry: TexEntry) {
        self.entries.push(entry);
    }

    /// Split every run at index cache boundaries into draw calls.
    pub fn draw_calls(&self, cache: &IndexCache) -> Vec<DrawCall> {
        let mut calls = Vec::new();
        for e in &self.entries {
            for n in e.first_cache..=e.last_cache {
                let range = cache.entry(n);
                let start = if n == e.first_cache {
                    e.first_index
                } else {
                    range.index_offset
                };
                let end = if n == e.last_cache {
                    e.last_index + 1
                } else {
                    range.index_offset + range.index_count
                };
                if end > start {
                    calls.push(DrawCall {
                        texture: e.texture,
                        index_offset: start,
                        index_count: end - start,
                        vertex_offset: range.vertex_offset,
                    });
                }
            }
        }
        calls
    }
}

impl IndexCache {
    /// One untextured draw call per non-empty segment.
    pub fn draw_calls(&self) -> Vec<DrawCall> {
        self.iter()
            .filter(|r| r.index_count > 0)
            .map(|r| DrawCall {
                texture: None,
                index_offset: r.index_offset,
                index_count: r.index_count,
                vertex_offset: r.vertex_offset,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emit(poly: &mut PolyBuffer, triangles: usize, new_cache: bool) {
        let cache = if new_cache {
            poly.cache.add_new()
        } else {
            poly.cache.get_last()
        };
        for _ in 0..triangles {
            poly.indices.extend([0, 1, 2]);
        }
        poly.cache.inc_counts(cache, triangles * 3, 3);
    }

    #[test]
    fn test_same_texture_coalesces() {
        let mut poly = PolyBuffer::new(0);
        let mut tex = TexCache::new();
        for _ in 0..5 {
            tex.begin_tex(Some(TextureId(1)), &poly);
            emit(&mut poly, 2, false);
            tex.end_tex(&poly);
        }
        assert_eq!(tex.len(), 1);
        assert_eq!(tex.entries()[0].first_index, 0);
        assert_eq!(tex.entries()[0].last_index, 29);
    }

    #[test]
    fn test_texture_switch_opens_entries() {
        let mut poly = PolyBuffer::new(0);
        let mut tex = TexCache::new();
        for i in 0..4 {
            tex.begin_tex(Some(TextureId(i)), &poly);
            emit(&mut poly, 1, false);
            tex.end_tex(&poly);
        }
        assert_eq!(tex.len(), 4);
        assert!(tex.has_textures());
    }

    #[test]
    fn test_empty_run_is_ignored() {
        let poly = PolyBuffer::new(0);
        let mut tex = TexCache::new();
        tex.begin_no_tex(&poly);
        tex.end_tex(&poly);
        assert!(tex.is_empty());
    }

    #[test]
    fn test_draw_calls_split_at_cache_boundaries() {
        let mut poly = PolyBuffer::new(0);
        let mut tex = TexCache::new();
        tex.begin_tex(Some(TextureId(7)), &poly);
        emit(&mut poly, 2, false);
        emit(&mut poly, 1, true);
        tex.end_tex(&poly);

        tex.begin_no_tex(&poly);
        emit(&mut poly, 1, false);
        tex.end_tex(&poly);

        let calls = tex.draw_calls(&poly.cache);
        assert_eq!(
            calls,
            vec![
                DrawCall {
                    texture: Some(TextureId(7)),
                    index_offset: 0,
                    index_count: 6,
                    vertex_offset: 0
                },
                DrawCall {
                    texture: Some(TextureId(7)),
                    index_offset: 6,
                    index_count: 3,
                    vertex_offset: 3
                },
                DrawCall {
                    texture: None,
                    index_offset: 9,
                    index_count: 3,
                    vertex_offset: 3
                },
            ]
        );
    }
}
