//! Vertex schema types.
//!
//! - [`VertexLayout`] - Describes vertex attributes across multiple buffers
//! - [`AttributeSchema`] - User-declared generic attributes carried per vertex
//!
//! These types are re-exported by `redlilium-tessellator` for convenience.

mod layout;

pub use layout::{
    AttributeError, AttributeKind, AttributeSchema, GenericAttribute, VertexAttribute,
    VertexAttributeFormat, VertexAttributeSemantic, VertexBufferLayout, VertexLayout,
};
