//! Index caches: the segment table of a tessellated buffer.
//!
//! A tessellated buffer stores all of its vertices and 16-bit indices in one
//! contiguous array each. Indices are relative to the vertex offset of the
//! cache they belong to, so every cache addresses at most
//! [`MAX_VERTEX_INDEX`] vertices. Segments are kept as a structure of arrays.

use crate::config::MAX_VERTEX_INDEX;
use crate::error::{TessError, TessResult};

/// One contiguous segment of a tessellated buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IndexRange {
    pub index_offset: usize,
    pub index_count: usize,
    pub vertex_offset: usize,
    pub vertex_count: usize,
}

/// Append-only table of index/vertex segments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexCache {
    index_count: Vec<usize>,
    index_offset: Vec<usize>,
    vertex_count: Vec<usize>,
    vertex_offset: Vec<usize>,
}

impl IndexCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.index_count.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index_count.is_empty()
    }

    pub fn clear(&mut self) {
        self.index_count.clear();
        self.index_offset.clear();
        self.vertex_count.clear();
        self.vertex_offset.clear();
    }

    /// Restore the table to `len` segments, the last one reset to `last`.
    pub fn truncate(&mut self, len: usize, last: Option<IndexRange>) {
        self.index_count.truncate(len);
        self.index_offset.truncate(len);
        self.vertex_count.truncate(len);
        self.vertex_offset.truncate(len);
        if let (Some(i), Some(range)) = (len.checked_sub(1), last) {
            self.index_offset[i] = range.index_offset;
            self.index_count[i] = range.index_count;
            self.vertex_offset[i] = range.vertex_offset;
            self.vertex_count[i] = range.vertex_count;
        }
    }

    pub fn trim(&mut self) {
        self.index_count.shrink_to_fit();
        self.index_offset.shrink_to_fit();
        self.vertex_count.shrink_to_fit();
        self.vertex_offset.shrink_to_fit();
    }

    /// Open a new empty segment that starts where the previous one ends.
    pub fn add_new(&mut self) -> usize {
        let (index_offset, vertex_offset) = match self.len() {
            0 => (0, 0),
            n => (
                self.index_offset[n - 1] + self.index_count[n - 1],
                self.vertex_offset[n - 1] + self.vertex_count[n - 1],
            ),
        };
        self.push(IndexRange {
            index_offset,
            index_count: 0,
            vertex_offset,
            vertex_count: 0,
        })
    }

    /// Append a fully specified segment (used when rebuilding after sorting).
    pub fn push(&mut self, range: IndexRange) -> usize {
        self.index_offset.push(range.index_offset);
        self.index_count.push(range.index_count);
        self.vertex_offset.push(range.vertex_offset);
        self.vertex_count.push(range.vertex_count);
        self.len() - 1
    }

    /// Last segment, created if the table is empty.
    pub fn get_last(&mut self) -> usize {
        match self.len() {
            0 => self.add_new(),
            n => n - 1,
        }
    }

    /// Segment able to take `count` more contiguous vertices.
    ///
    /// With `fresh` set a new segment is always opened (retained shapes start
    /// their own segment). Fails when `count` alone exceeds the 16-bit range.
    pub fn reserve(&mut self, count: usize, fresh: bool) -> TessResult<usize> {
        if count > MAX_VERTEX_INDEX {
            return Err(TessError::IndexOverflow {
                needed: count,
                max: MAX_VERTEX_INDEX,
            });
        }
        let mut index = if fresh { self.add_new() } else { self.get_last() };
        if self.vertex_count[index] + count > MAX_VERTEX_INDEX {
            index = self.add_new();
        }
        Ok(index)
    }

    pub fn inc_counts(&mut self, index: usize, indices: usize, vertices: usize) {
        self.index_count[index] += indices;
        self.vertex_count[index] += vertices;
        debug_assert!(self.vertex_count[index] <= MAX_VERTEX_INDEX);
    }

    pub fn vertex_count(&self, index: usize) -> usize {
        self.vertex_count[index]
    }

    pub fn entry(&self, index: usize) -> IndexRange {
        IndexRange {
            index_offset: self.index_offset[index],
            index_count: self.index_count[index],
            vertex_offset: self.vertex_offset[index],
            vertex_count: self.vertex_count[index],
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = IndexRange> + '_ {
        (0..self.len()).map(|i| self.entry(i))
    }

    /// Segment containing the absolute index position `index`.
    pub fn find(&self, index: usize) -> Option<usize> {
        let n = self.index_offset.partition_point(|&o| o <= index);
        (0..n)
            .rev()
            .find(|&i| index < self.index_offset[i] + self.index_count[i])
    }
}
