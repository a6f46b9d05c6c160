//! Error types for tessellation.

use redlilium_core::mesh::AttributeError;
use thiserror::Error;

/// Errors that abort tessellation of a shape.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TessError {
    /// A single primitive needs more vertices than one index cache can address.
    #[error("primitive needs {needed} vertices in one index cache, at most {max} are addressable")]
    IndexOverflow { needed: usize, max: usize },

    /// Shape-building calls arrived in an invalid order or with invalid data.
    #[error("malformed shape: {0}")]
    MalformedShape(String),

    /// Generic attribute declaration or value error.
    #[error(transparent)]
    Attribute(#[from] AttributeError),
}

impl TessError {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedShape(msg.into())
    }
}

/// Result type for tessellation operations.
pub type TessResult<T> = Result<T, TessError>;
