//! Storage for generic per-vertex attributes.
//!
//! All components are kept as `f32` while geometry is tessellated so they can
//! be interpolated at synthesized vertices; integer and boolean attributes are
//! converted back when bytes are produced for upload.

use redlilium_core::mesh::{AttributeError, AttributeKind, AttributeSchema};

use crate::error::TessResult;

/// Packed per-vertex generic attribute components.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttribChannels {
    width: usize,
    count: usize,
    data: Vec<f32>,
}

impl AttribChannels {
    /// Create storage for vertices carrying `width` components each.
    pub fn new(width: usize) -> Self {
        Self {
            width,
            count: 0,
            data: Vec::new(),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Append one vertex; missing components are zero, extra ones ignored.
    pub fn push(&mut self, values: &[f32]) {
        let n = values.len().min(self.width);
        self.data.extend_from_slice(&values[..n]);
        self.data.resize(self.data.len() + (self.width - n), 0.0);
        self.count += 1;
    }

    /// Components of vertex `i`.
    pub fn get(&self, i: usize) -> &[f32] {
        &self.data[i * self.width..(i + 1) * self.width]
    }

    pub fn get_mut(&mut self, i: usize) -> &mut [f32] {
        &mut self.data[i * self.width..(i + 1) * self.width]
    }

    pub fn clear(&mut self) {
        self.data.clear();
        self.count = 0;
    }

    /// Drop every vertex from `len` on.
    pub fn truncate(&mut self, len: usize) {
        if len < self.count {
            self.data.truncate(len * self.width);
            self.count = len;
        }
    }

    pub fn trim(&mut self) {
        self.data.shrink_to_fit();
    }

    /// Bytes of one attribute column, converted to its upload format.
    pub fn column_bytes(&self, schema: &AttributeSchema, index: usize) -> Vec<u8> {
        let (Some(attr), Some(&offset)) = (schema.get(index), schema.component_offsets().get(index))
        else {
            return Vec::new();
        };
        let columns = (0..self.count).flat_map(|v| {
            let start = v * self.width + offset;
            self.data[start..start + attr.components].iter().copied()
        });
        match attr.kind {
            AttributeKind::Float => {
                let values: Vec<f32> = columns.collect();
                bytemuck::cast_slice(&values).to_vec()
            }
            AttributeKind::Int | AttributeKind::Bool => {
                let values: Vec<i32> = columns.map(|c| c.round() as i32).collect();
                bytemuck::cast_slice(&values).to_vec()
            }
        }
    }
}

/// Current generic attribute values, set by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttribValues {
    schema: AttributeSchema,
    offsets: Vec<usize>,
    values: Vec<f32>,
}

impl AttribValues {
    pub fn new(schema: &AttributeSchema) -> Self {
        Self {
            schema: schema.clone(),
            offsets: schema.component_offsets(),
            values: vec![0.0; schema.total_components()],
        }
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Set the value of a declared attribute.
    pub fn set(&mut self, name: &str, value: &[f32]) -> TessResult<()> {
        let index = self
            .schema
            .index_of(name)
            .ok_or_else(|| AttributeError::Unknown(name.to_string()))?;
        let components = self.schema.get(index).map_or(0, |a| a.components);
        if value.len() != components {
            return Err(AttributeError::ComponentMismatch {
                name: name.to_string(),
                expected: components,
                actual: value.len(),
            }
            .into());
        }
        let offset = self.offsets[index];
        self.values[offset..offset + components].copy_from_slice(value);
        Ok(())
    }

    /// Component offsets of 3-component attributes declared as normals.
    pub fn normal_offsets(&self) -> Vec<(usize, usize)> {
        self.schema
            .iter()
            .zip(&self.offsets)
            .filter(|(a, _)| a.is_normal)
            .map(|(a, &o)| (o, a.components))
            .collect()
    }
}
