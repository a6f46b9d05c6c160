//! Vertex attribute schema shared by input and tessellated geometry.
//!
//! Tessellated buffers are stored as a structure of arrays: every channel
//! (position, color, normal, ...) lives in its own vertex buffer slot, and
//! generic user attributes are appended after the built-in channels. The
//! layouts here describe that arrangement for the upload side.
//!
//! # Buffer Slots
//!
//! Each vertex buffer is bound to a slot (0, 1, 2, ...). Attributes reference
//! which slot they read from via `buffer_index`.
//!
//! # Example
//!
//! ```ignore
//! let mut schema = AttributeSchema::new();
//! schema.add(GenericAttribute::new("tangent", AttributeKind::Float, 3)?.as_normal())?;
//!
//! let layout = VertexLayout::poly(&schema);
//! assert_eq!(layout.buffer_count(), 9);
//! ```

use std::sync::Arc;

use thiserror::Error;

/// Errors raised while declaring attributes or layouts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AttributeError {
    /// Generic attributes carry between one and four components.
    #[error("attribute '{name}' has {components} components (expected 1-4)")]
    InvalidComponentCount { name: String, components: usize },

    /// Two generic attributes share a name.
    #[error("attribute '{0}' is already declared")]
    DuplicateName(String),

    /// A value was supplied for an attribute that was never declared.
    #[error("attribute '{0}' is not declared")]
    Unknown(String),

    /// A value with the wrong number of components was supplied.
    #[error("attribute '{name}' expects {expected} components, got {actual}")]
    ComponentMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },
}

/// Semantic meaning of a vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexAttributeSemantic {
    /// Homogeneous vertex position (float4).
    Position,
    /// Vertex normal (float3).
    Normal,
    /// Fill or stroke color (packed ARGB, unorm4).
    Color,
    /// Texture coordinates (float2).
    TexCoord0,
    /// Ambient material color (unorm4).
    Ambient,
    /// Specular material color (unorm4).
    Specular,
    /// Emissive material color (unorm4).
    Emissive,
    /// Specular exponent (float).
    Shininess,
    /// Line direction plus signed half weight (float4), line buffer only.
    Direction,
    /// Screen-space corner offset (float2), point buffer only.
    PointOffset,
    /// Generic attribute, indexed into the [`AttributeSchema`].
    Custom(u32),
}

/// Format of a vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexAttributeFormat {
    /// Single 32-bit float.
    Float,
    /// Two 32-bit floats.
    Float2,
    /// Three 32-bit floats.
    Float3,
    /// Four 32-bit floats.
    Float4,
    /// Single 32-bit signed integer.
    Int,
    /// Two 32-bit signed integers.
    Int2,
    /// Three 32-bit signed integers.
    Int3,
    /// Four 32-bit signed integers.
    Int4,
    /// Four 8-bit unsigned integers (normalized to 0.0-1.0).
    Unorm8x4,
}

impl VertexAttributeFormat {
    /// Get the size in bytes of this format.
    pub fn size(&self) -> usize {
        match self {
            Self::Float | Self::Int | Self::Unorm8x4 => 4,
            Self::Float2 | Self::Int2 => 8,
            Self::Float3 | Self::Int3 => 12,
            Self::Float4 | Self::Int4 => 16,
        }
    }

    /// Number of scalar components.
    pub fn components(&self) -> usize {
        match self {
            Self::Float | Self::Int => 1,
            Self::Float2 | Self::Int2 => 2,
            Self::Float3 | Self::Int3 => 3,
            Self::Float4 | Self::Int4 | Self::Unorm8x4 => 4,
        }
    }

    /// GPU format used to upload a generic attribute. Booleans travel as ints.
    pub fn for_generic(kind: AttributeKind, components: usize) -> Self {
        match (kind, components) {
            (AttributeKind::Float, 1) => Self::Float,
            (AttributeKind::Float, 2) => Self::Float2,
            (AttributeKind::Float, 3) => Self::Float3,
            (AttributeKind::Float, _) => Self::Float4,
            (_, 1) => Self::Int,
            (_, 2) => Self::Int2,
            (_, 3) => Self::Int3,
            (_, _) => Self::Int4,
        }
    }
}

/// Describes a single vertex buffer binding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VertexBufferLayout {
    /// Stride in bytes between consecutive elements.
    pub stride: u32,
}

impl VertexBufferLayout {
    /// Create a new vertex buffer layout with the given stride.
    pub fn new(stride: u32) -> Self {
        Self { stride }
    }
}

/// A single vertex attribute description.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    /// Semantic meaning of this attribute.
    pub semantic: VertexAttributeSemantic,
    /// Data format of this attribute.
    pub format: VertexAttributeFormat,
    /// Byte offset within the vertex buffer.
    pub offset: u32,
    /// Index of the vertex buffer this attribute reads from.
    pub buffer_index: u32,
}

impl VertexAttribute {
    /// Create a new vertex attribute.
    pub fn new(
        semantic: VertexAttributeSemantic,
        format: VertexAttributeFormat,
        offset: u32,
        buffer_index: u32,
    ) -> Self {
        Self {
            semantic,
            format,
            offset,
            buffer_index,
        }
    }
}

/// Element type of a generic attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AttributeKind {
    #[default]
    Float,
    Int,
    Bool,
}

/// A named per-vertex attribute declared by the user.
///
/// Values are carried as `f32` components through tessellation so they can be
/// interpolated at synthesized vertices. Attributes flagged with
/// [`as_normal`](Self::as_normal) are renormalized after interpolation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GenericAttribute {
    pub name: String,
    pub kind: AttributeKind,
    pub components: usize,
    pub is_normal: bool,
}

impl GenericAttribute {
    /// Declare a generic attribute with 1-4 components.
    pub fn new(
        name: impl Into<String>,
        kind: AttributeKind,
        components: usize,
    ) -> Result<Self, AttributeError> {
        let name = name.into();
        if !(1..=4).contains(&components) {
            return Err(AttributeError::InvalidComponentCount { name, components });
        }
        Ok(Self {
            name,
            kind,
            components,
            is_normal: false,
        })
    }

    /// Mark this attribute as a direction to be renormalized on interpolation.
    pub fn as_normal(mut self) -> Self {
        self.is_normal = true;
        self
    }

    /// GPU format for this attribute.
    pub fn format(&self) -> VertexAttributeFormat {
        VertexAttributeFormat::for_generic(self.kind, self.components)
    }
}

/// Ordered set of generic attributes carried by every vertex.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct AttributeSchema {
    attributes: Vec<GenericAttribute>,
}

impl AttributeSchema {
    /// Create an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an attribute, returning its index.
    pub fn add(&mut self, attribute: GenericAttribute) -> Result<usize, AttributeError> {
        if self.index_of(&attribute.name).is_some() {
            return Err(AttributeError::DuplicateName(attribute.name));
        }
        self.attributes.push(attribute);
        Ok(self.attributes.len() - 1)
    }

    /// Find an attribute index by name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.attributes.iter().position(|a| a.name == name)
    }

    pub fn get(&self, index: usize) -> Option<&GenericAttribute> {
        self.attributes.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &GenericAttribute> {
        self.attributes.iter()
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Sum of component counts across all attributes.
    pub fn total_components(&self) -> usize {
        self.attributes.iter().map(|a| a.components).sum()
    }

    /// Offset of each attribute within a packed per-vertex component array.
    pub fn component_offsets(&self) -> Vec<usize> {
        let mut offset = 0;
        self.attributes
            .iter()
            .map(|a| {
                let o = offset;
                offset += a.components;
                o
            })
            .collect()
    }
}

/// Describes the layout of vertex data across one or more buffers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VertexLayout {
    /// Descriptions of each vertex buffer binding.
    pub buffers: Vec<VertexBufferLayout>,
    /// The vertex attributes, each referencing a buffer by index.
    pub attributes: Vec<VertexAttribute>,
    /// Optional label for debugging.
    pub label: Option<String>,
}

impl VertexLayout {
    /// Create a new empty vertex layout.
    pub fn new() -> Self {
        Self {
            buffers: Vec::new(),
            attributes: Vec::new(),
            label: None,
        }
    }

    /// Add a vertex buffer binding.
    pub fn with_buffer(mut self, buffer: VertexBufferLayout) -> Self {
        self.buffers.push(buffer);
        self
    }

    /// Add a vertex attribute.
    pub fn with_attribute(mut self, attribute: VertexAttribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Add a buffer holding exactly one attribute (structure-of-arrays slot).
    pub fn with_channel(self, semantic: VertexAttributeSemantic, format: VertexAttributeFormat) -> Self {
        let slot = self.buffers.len() as u32;
        self.with_buffer(VertexBufferLayout::new(format.size() as u32))
            .with_attribute(VertexAttribute::new(semantic, format, 0, slot))
    }

    /// Set a debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Get the number of vertex buffers.
    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    /// Get the stride for a specific buffer.
    pub fn buffer_stride(&self, buffer_index: usize) -> u32 {
        self.buffers
            .get(buffer_index)
            .map(|b| b.stride)
            .unwrap_or(0)
    }

    /// Bytes one vertex occupies across all buffers.
    pub fn vertex_size(&self) -> usize {
        self.buffers.iter().map(|b| b.stride as usize).sum()
    }
}

impl Default for VertexLayout {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tessellated buffer layouts
// ============================================================================

impl VertexLayout {
    /// Layout of the polygon buffer: one slot per built-in channel followed by
    /// one slot per generic attribute.
    pub fn poly(schema: &AttributeSchema) -> Arc<Self> {
        use VertexAttributeFormat as F;
        use VertexAttributeSemantic as S;

        let mut layout = Self::new()
            .with_channel(S::Position, F::Float4)
            .with_channel(S::Color, F::Unorm8x4)
            .with_channel(S::Normal, F::Float3)
            .with_channel(S::TexCoord0, F::Float2)
            .with_channel(S::Ambient, F::Unorm8x4)
            .with_channel(S::Specular, F::Unorm8x4)
            .with_channel(S::Emissive, F::Unorm8x4)
            .with_channel(S::Shininess, F::Float);
        for (i, attr) in schema.iter().enumerate() {
            layout = layout.with_channel(S::Custom(i as u32), attr.format());
        }
        Arc::new(layout.with_label("poly"))
    }

    /// Layout of the line buffer (position, color, direction + half weight).
    pub fn line() -> Arc<Self> {
        use VertexAttributeFormat as F;
        use VertexAttributeSemantic as S;

        Arc::new(
            Self::new()
                .with_channel(S::Position, F::Float4)
                .with_channel(S::Color, F::Unorm8x4)
                .with_channel(S::Direction, F::Float4)
                .with_label("line"),
        )
    }

    /// Layout of the point buffer (position, color, corner offset).
    pub fn point() -> Arc<Self> {
        use VertexAttributeFormat as F;
        use VertexAttributeSemantic as S;

        Arc::new(
            Self::new()
                .with_channel(S::Position, F::Float4)
                .with_channel(S::Color, F::Unorm8x4)
                .with_channel(S::PointOffset, F::Float2)
                .with_label("point"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_attribute_format_size() {
        assert_eq!(VertexAttributeFormat::Float.size(), 4);
        assert_eq!(VertexAttributeFormat::Float3.size(), 12);
        assert_eq!(VertexAttributeFormat::Float4.size(), 16);
        assert_eq!(VertexAttributeFormat::Unorm8x4.size(), 4);
        assert_eq!(VertexAttributeFormat::Int3.components(), 3);
    }

    #[test]
    fn test_generic_attribute_component_range() {
        assert!(GenericAttribute::new("weight", AttributeKind::Float, 1).is_ok());
        assert!(GenericAttribute::new("rgba", AttributeKind::Int, 4).is_ok());
        assert_eq!(
            GenericAttribute::new("empty", AttributeKind::Float, 0),
            Err(AttributeError::InvalidComponentCount {
                name: "empty".to_string(),
                components: 0
            })
        );
        assert!(GenericAttribute::new("wide", AttributeKind::Bool, 5).is_err());
    }

    #[test]
    fn test_generic_format_mapping() {
        let flag = GenericAttribute::new("flag", AttributeKind::Bool, 1).unwrap();
        assert_eq!(flag.format(), VertexAttributeFormat::Int);
        let dir = GenericAttribute::new("dir", AttributeKind::Float, 3)
            .unwrap()
            .as_normal();
        assert!(dir.is_normal);
        assert_eq!(dir.format(), VertexAttributeFormat::Float3);
    }

    #[test]
    fn test_schema_offsets_and_duplicates() {
        let mut schema = AttributeSchema::new();
        schema
            .add(GenericAttribute::new("a", AttributeKind::Float, 2).unwrap())
            .unwrap();
        schema
            .add(GenericAttribute::new("b", AttributeKind::Float, 3).unwrap())
            .unwrap();
        assert_eq!(schema.total_components(), 5);
        assert_eq!(schema.component_offsets(), vec![0, 2]);
        assert_eq!(schema.index_of("b"), Some(1));

        let dup = schema.add(GenericAttribute::new("a", AttributeKind::Int, 1).unwrap());
        assert_eq!(dup, Err(AttributeError::DuplicateName("a".to_string())));
    }

    #[test]
    fn test_poly_layout_has_one_slot_per_channel() {
        let mut schema = AttributeSchema::new();
        schema
            .add(GenericAttribute::new("tangent", AttributeKind::Float, 3).unwrap())
            .unwrap();
        let layout = VertexLayout::poly(&schema);

        assert_eq!(layout.buffer_count(), 9);
        assert_eq!(layout.buffer_stride(0), 16);
        assert_eq!(layout.buffer_stride(1), 4);
        let custom = &layout.attributes[8];
        assert_eq!(custom.semantic, VertexAttributeSemantic::Custom(0));
        assert_eq!(custom.buffer_index, 8);
        assert_eq!(layout.vertex_size(), 16 + 4 + 12 + 8 + 4 * 3 + 4 + 12);
    }

    #[test]
    fn test_line_and_point_layouts() {
        let line = VertexLayout::line();
        assert_eq!(line.attributes[2].semantic, VertexAttributeSemantic::Direction);
        assert!(
            line.attributes
                .iter()
                .all(|a| a.semantic != VertexAttributeSemantic::Normal)
        );
        assert_eq!(line.vertex_size(), 36);

        let point = VertexLayout::point();
        assert_eq!(point.buffer_stride(2), 8);
        assert_eq!(point.label.as_deref(), Some("point"));
    }
}
