//! Tessellator configuration and renderer capabilities.
//!
//! Capabilities that depend on the GPU backend (shader-expanded lines and
//! points, pixel snapping) are passed in explicitly through [`RendererCaps`]
//! rather than read from global state.

use redlilium_core::mesh::{AttributeSchema, GenericAttribute};

use crate::error::TessResult;

/// Number of vertices one index cache can address with 16-bit indices.
pub const MAX_VERTEX_INDEX: usize = 65536;

/// Highest cache-relative index the raw index splitter will emit.
pub const MAX_CACHE_INDEX: usize = MAX_VERTEX_INDEX - 3;

/// Lower bound on the number of perimeter vertices of round shapes.
pub const MIN_POINT_ACCURACY: usize = 20;

/// Upper bound on the number of perimeter vertices of round shapes.
pub const MAX_POINT_ACCURACY: usize = 200;

/// Screen-space length covered by one perimeter subdivision.
pub const POINT_ACCURACY_FACTOR: f32 = 10.0;

/// Below this on-screen stroke weight caps and joins are not generated.
pub const MIN_CAPS_JOINS_WEIGHT: f32 = 2.0;

/// Default number of steps per bezier and quadratic segment.
pub const DEFAULT_BEZIER_DETAIL: usize = 20;

/// Default number of steps per Catmull-Rom segment.
pub const DEFAULT_CURVE_DETAIL: usize = 20;

/// Default sphere resolution (longitude, latitude).
pub const DEFAULT_SPHERE_DETAIL: (usize, usize) = (30, 30);

/// Number of perimeter subdivisions for a round shape of the given
/// on-screen diagonal: `clamp(MIN, MAX, round(2π·diag / FACTOR))`.
pub fn point_accuracy(screen_diagonal: f32) -> usize {
    let raw = (std::f32::consts::TAU * screen_diagonal / POINT_ACCURACY_FACTOR).round();
    let raw = if raw.is_finite() && raw > 0.0 { raw as usize } else { 0 };
    raw.clamp(MIN_POINT_ACCURACY, MAX_POINT_ACCURACY)
}

/// How tessellated geometry is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderMode {
    /// Geometry is transformed by the current modelview and flushed per frame.
    #[default]
    Immediate,
    /// Geometry is stored untransformed and kept across frames.
    Retained,
}

/// GPU capabilities that influence which tessellation path is taken.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RendererCaps {
    /// 3D strokes are expanded by a line shader (line buffer).
    pub shader_lines: bool,
    /// 3D points are expanded by a point shader (point buffer).
    pub shader_points: bool,
    /// On-screen weight below which strokes skip caps and joins.
    pub min_caps_joins_weight: f32,
    /// Snap axis-aligned 2D quads and stroke segments to whole pixels.
    pub pixel_clamp: bool,
}

impl Default for RendererCaps {
    fn default() -> Self {
        Self {
            shader_lines: true,
            shader_points: true,
            min_caps_joins_weight: MIN_CAPS_JOINS_WEIGHT,
            pixel_clamp: true,
        }
    }
}

impl RendererCaps {
    pub fn with_shader_lines(mut self, enabled: bool) -> Self {
        self.shader_lines = enabled;
        self
    }

    pub fn with_shader_points(mut self, enabled: bool) -> Self {
        self.shader_points = enabled;
        self
    }

    pub fn with_min_caps_joins_weight(mut self, weight: f32) -> Self {
        self.min_caps_joins_weight = weight;
        self
    }

    pub fn with_pixel_clamp(mut self, enabled: bool) -> Self {
        self.pixel_clamp = enabled;
        self
    }
}

/// Configuration of a tessellator and the render context driving it.
///
/// # Example
///
/// ```ignore
/// let config = TessConfig::new()
///     .with_3d(true)
///     .with_caps(RendererCaps::default().with_shader_lines(false))
///     .with_bezier_detail(32);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct TessConfig {
    pub render_mode: RenderMode,
    pub is_3d: bool,
    pub caps: RendererCaps,
    pub bezier_detail: usize,
    pub curve_detail: usize,
    pub curve_tightness: f32,
    pub sphere_detail: (usize, usize),
    /// Flattening tolerance for stroke outlines and fills, in screen units.
    pub tolerance: f32,
    /// Generic per-vertex attributes.
    pub attributes: AttributeSchema,
}

impl Default for TessConfig {
    fn default() -> Self {
        Self {
            render_mode: RenderMode::Immediate,
            is_3d: false,
            caps: RendererCaps::default(),
            bezier_detail: DEFAULT_BEZIER_DETAIL,
            curve_detail: DEFAULT_CURVE_DETAIL,
            curve_tightness: 0.0,
            sphere_detail: DEFAULT_SPHERE_DETAIL,
            tolerance: 0.1,
            attributes: AttributeSchema::new(),
        }
    }
}

impl TessConfig {
    /// Create a configuration with default settings (immediate, 2D).
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_render_mode(mut self, mode: RenderMode) -> Self {
        self.render_mode = mode;
        self
    }

    pub fn with_3d(mut self, is_3d: bool) -> Self {
        self.is_3d = is_3d;
        self
    }

    pub fn with_caps(mut self, caps: RendererCaps) -> Self {
        self.caps = caps;
        self
    }

    pub fn with_bezier_detail(mut self, detail: usize) -> Self {
        self.bezier_detail = detail.max(1);
        self
    }

    pub fn with_curve_detail(mut self, detail: usize) -> Self {
        self.curve_detail = detail.max(1);
        self
    }

    pub fn with_curve_tightness(mut self, tightness: f32) -> Self {
        self.curve_tightness = tightness;
        self
    }

    pub fn with_sphere_detail(mut self, longitude: usize, latitude: usize) -> Self {
        self.sphere_detail = (longitude.max(3), latitude.max(2));
        self
    }

    pub fn with_tolerance(mut self, tolerance: f32) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Declare a generic per-vertex attribute.
    pub fn with_attribute(mut self, attribute: GenericAttribute) -> TessResult<Self> {
        self.attributes.add(attribute)?;
        Ok(self)
    }

    pub fn is_retained(&self) -> bool {
        self.render_mode == RenderMode::Retained
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use redlilium_core::mesh::AttributeKind;

    #[test]
    fn test_point_accuracy_clamps() {
        assert_eq!(point_accuracy(0.0), MIN_POINT_ACCURACY);
        assert_eq!(point_accuracy(1.0e6), MAX_POINT_ACCURACY);
        assert_eq!(point_accuracy(f32::NAN), MIN_POINT_ACCURACY);
        // 2π·100/10 = 62.8
        assert_eq!(point_accuracy(100.0), 63);
    }

    #[test]
    fn test_builder() {
        let config = TessConfig::new()
            .with_3d(true)
            .with_render_mode(RenderMode::Retained)
            .with_bezier_detail(0)
            .with_caps(RendererCaps::default().with_shader_points(false));
        assert!(config.is_3d);
        assert!(config.is_retained());
        assert_eq!(config.bezier_detail, 1);
        assert!(!config.caps.shader_points);
        assert!(config.caps.shader_lines);
    }

    #[test]
    fn test_duplicate_attribute_rejected() {
        let attr = GenericAttribute::new("weight", AttributeKind::Float, 1).unwrap();
        let config = TessConfig::new().with_attribute(attr.clone()).unwrap();
        assert_eq!(config.attributes.len(), 1);
        assert!(config.with_attribute(attr).is_err());
    }
}
