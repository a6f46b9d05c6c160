//! Tessellated geometry: GPU-ready polygon, line and point buffers.
//!
//! - [`PolyBuffer`] - filled triangles and 2D strokes
//! - [`LineBuffer`] - 3D strokes expanded by a line shader
//! - [`PointBuffer`] - 3D points expanded by a point shader
//!
//! Every buffer keeps its per-vertex channels in lock-step and partitions its
//! 16-bit indices with an [`IndexCache`].

use redlilium_core::math::{Vec2, Vec3};
use redlilium_core::mesh::AttributeSchema;

use crate::attribs::AttribChannels;
use crate::index_cache::{IndexCache, IndexRange};

/// One vertex about to be written to a [`PolyBuffer`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolyVertex<'a> {
    pub position: Vec3,
    pub color: u32,
    pub normal: Vec3,
    pub uv: Vec2,
    pub ambient: u32,
    pub specular: u32,
    pub emissive: u32,
    pub shininess: f32,
    pub attribs: &'a [f32],
}

/// Sizes of a [`PolyBuffer`] taken with [`PolyBuffer::mark`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolyMark {
    vertices: usize,
    indices: usize,
    caches: usize,
    last: Option<IndexRange>,
}

/// Triangle buffer with full material channels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolyBuffer {
    pub positions: Vec<[f32; 4]>,
    pub colors: Vec<u32>,
    pub normals: Vec<[f32; 3]>,
    pub texcoords: Vec<[f32; 2]>,
    pub ambient: Vec<u32>,
    pub specular: Vec<u32>,
    pub emissive: Vec<u32>,
    pub shininess: Vec<f32>,
    pub attribs: AttribChannels,
    pub indices: Vec<u16>,
    pub cache: IndexCache,
}

impl PolyBuffer {
    pub fn new(attrib_width: usize) -> Self {
        Self {
            attribs: AttribChannels::new(attrib_width),
            ..Self::default()
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn push_vertex(&mut self, v: &PolyVertex<'_>) {
        self.positions
            .push([v.position.x, v.position.y, v.position.z, 1.0]);
        self.colors.push(v.color);
        self.normals.push([v.normal.x, v.normal.y, v.normal.z]);
        self.texcoords.push([v.uv.x, v.uv.y]);
        self.ambient.push(v.ambient);
        self.specular.push(v.specular);
        self.emissive.push(v.emissive);
        self.shininess.push(v.shininess);
        self.attribs.push(v.attribs);
    }

    pub fn mark(&self) -> PolyMark {
        PolyMark {
            vertices: self.vertex_count(),
            indices: self.index_count(),
            caches: self.cache.len(),
            last: self.cache.len().checked_sub(1).map(|i| self.cache.entry(i)),
        }
    }

    /// Drop everything written after `mark` was taken.
    pub fn rollback(&mut self, mark: PolyMark) {
        let n = mark.vertices;
        self.positions.truncate(n);
        self.colors.truncate(n);
        self.normals.truncate(n);
        self.texcoords.truncate(n);
        self.ambient.truncate(n);
        self.specular.truncate(n);
        self.emissive.truncate(n);
        self.shininess.truncate(n);
        self.attribs.truncate(n);
        self.indices.truncate(mark.indices);
        self.cache.truncate(mark.caches, mark.last);
    }

    pub fn position(&self, i: usize) -> Vec3 {
        let p = self.positions[i];
        Vec3::new(p[0], p[1], p[2])
    }

    pub fn clear(&mut self) {
        self.positions.clear();
        self.colors.clear();
        self.normals.clear();
        self.texcoords.clear();
        self.ambient.clear();
        self.specular.clear();
        self.emissive.clear();
        self.shininess.clear();
        self.attribs.clear();
        self.indices.clear();
        self.cache.clear();
    }

    /// Shrink backing storage to the live vertex and index counts.
    pub fn trim(&mut self) {
        self.positions.shrink_to_fit();
        self.colors.shrink_to_fit();
        self.normals.shrink_to_fit();
        self.texcoords.shrink_to_fit();
        self.ambient.shrink_to_fit();
        self.specular.shrink_to_fit();
        self.emissive.shrink_to_fit();
        self.shininess.shrink_to_fit();
        self.attribs.trim();
        self.indices.shrink_to_fit();
        self.cache.trim();
    }

    pub fn positions_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.positions)
    }

    pub fn colors_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.colors)
    }

    pub fn normals_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.normals)
    }

    pub fn texcoords_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.texcoords)
    }

    pub fn indices_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    /// Bytes of every vertex channel in [`VertexLayout::poly`] slot order.
    ///
    /// [`VertexLayout::poly`]: redlilium_core::mesh::VertexLayout::poly
    pub fn channel_bytes(&self, schema: &AttributeSchema) -> Vec<Vec<u8>> {
        let mut channels = vec![
            self.positions_bytes().to_vec(),
            self.colors_bytes().to_vec(),
            self.normals_bytes().to_vec(),
            self.texcoords_bytes().to_vec(),
            bytemuck::cast_slice(&self.ambient).to_vec(),
            bytemuck::cast_slice(&self.specular).to_vec(),
            bytemuck::cast_slice(&self.emissive).to_vec(),
            bytemuck::cast_slice(&self.shininess).to_vec(),
        ];
        channels.extend((0..schema.len()).map(|i| self.attribs.column_bytes(schema, i)));
        channels
    }

    /// Check that every channel holds exactly `vertex_count` entries.
    pub fn is_consistent(&self) -> bool {
        let n = self.positions.len();
        [
            self.colors.len(),
            self.normals.len(),
            self.texcoords.len(),
            self.ambient.len(),
            self.specular.len(),
            self.emissive.len(),
            self.shininess.len(),
            self.attribs.len(),
        ]
        .iter()
        .all(|&len| len == n)
    }
}

/// Stroke buffer for shader-expanded 3D lines.
///
/// `directions` holds the vector towards the opposite segment endpoint in
/// xyz and the signed half stroke weight in w.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineBuffer {
    pub positions: Vec<[f32; 4]>,
    pub colors: Vec<u32>,
    pub directions: Vec<[f32; 4]>,
    pub indices: Vec<u16>,
    pub cache: IndexCache,
}

impl LineBuffer {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn push_vertex(&mut self, position: Vec3, color: u32, direction: Vec3, half_weight: f32) {
        self.positions
            .push([position.x, position.y, position.z, 1.0]);
        self.colors.push(color);
        self.directions
            .push([direction.x, direction.y, direction.z, half_weight]);
    }

    pub fn clear(&mut self) {
        self.positions.clear();
        self.colors.clear();
        self.directions.clear();
        self.indices.clear();
        self.cache.clear();
    }

    pub fn trim(&mut self) {
        self.positions.shrink_to_fit();
        self.colors.shrink_to_fit();
        self.directions.shrink_to_fit();
        self.indices.shrink_to_fit();
        self.cache.trim();
    }

    pub fn channel_bytes(&self) -> Vec<Vec<u8>> {
        vec![
            bytemuck::cast_slice(&self.positions).to_vec(),
            bytemuck::cast_slice(&self.colors).to_vec(),
            bytemuck::cast_slice(&self.directions).to_vec(),
        ]
    }
}

/// Point buffer for shader-expanded 3D points.
///
/// Each point is a fan around its center; `offsets` holds the screen-space
/// displacement of every fan vertex.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointBuffer {
    pub positions: Vec<[f32; 4]>,
    pub colors: Vec<u32>,
    pub offsets: Vec<[f32; 2]>,
    pub indices: Vec<u16>,
    pub cache: IndexCache,
}

impl PointBuffer {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn push_vertex(&mut self, position: Vec3, color: u32, offset: Vec2) {
        self.positions
            .push([position.x, position.y, position.z, 1.0]);
        self.colors.push(color);
        self.offsets.push([offset.x, offset.y]);
    }

    pub fn clear(&mut self) {
        self.positions.clear();
        self.colors.clear();
        self.offsets.clear();
        self.indices.clear();
        self.cache.clear();
    }

    pub fn trim(&mut self) {
        self.positions.shrink_to_fit();
        self.colors.shrink_to_fit();
        self.offsets.shrink_to_fit();
        self.indices.shrink_to_fit();
        self.cache.trim();
    }

    pub fn channel_bytes(&self) -> Vec<Vec<u8>> {
        vec![
            bytemuck::cast_slice(&self.positions).to_vec(),
            bytemuck::cast_slice(&self.colors).to_vec(),
            bytemuck::cast_slice(&self.offsets).to_vec(),
        ]
    }
}

/// The three output buffers of a tessellation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TessGeometry {
    pub poly: PolyBuffer,
    pub line: LineBuffer,
    pub point: PointBuffer,
}

impl TessGeometry {
    pub fn new(attrib_width: usize) -> Self {
        Self {
            poly: PolyBuffer::new(attrib_width),
            line: LineBuffer::default(),
            point: PointBuffer::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.poly.index_count() == 0
            && self.line.index_count() == 0
            && self.point.index_count() == 0
    }

    pub fn clear(&mut self) {
        self.poly.clear();
        self.line.clear();
        self.point.clear();
    }

    pub fn trim(&mut self) {
        self.poly.trim();
        self.line.trim();
        self.point.trim();
    }
}
