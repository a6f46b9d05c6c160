//! Colors, stroke styles, materials and the per-vertex style snapshot.

use bytemuck::{Pod, Zeroable};
use redlilium_core::math::{Vec2, Vec3};

/// Packed 32-bit ARGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Pod, Zeroable)]
#[repr(transparent)]
pub struct Color(pub u32);

impl Color {
    pub const WHITE: Self = Self(0xFFFF_FFFF);
    pub const BLACK: Self = Self(0xFF00_0000);
    pub const TRANSPARENT: Self = Self(0);

    /// Build a color from 8-bit channels.
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self(((a as u32) << 24) | ((r as u32) << 16) | ((g as u32) << 8) | b as u32)
    }

    /// Opaque gray.
    pub const fn gray(v: u8) -> Self {
        Self::rgba(v, v, v, 255)
    }

    pub fn a(self) -> u8 {
        (self.0 >> 24) as u8
    }

    pub fn r(self) -> u8 {
        (self.0 >> 16) as u8
    }

    pub fn g(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub fn b(self) -> u8 {
        self.0 as u8
    }

    /// Channels as floats in `[0, 255]`, ordered r, g, b, a.
    pub fn to_components(self) -> [f32; 4] {
        [
            self.r() as f32,
            self.g() as f32,
            self.b() as f32,
            self.a() as f32,
        ]
    }

    /// Inverse of [`to_components`](Self::to_components), rounding and clamping.
    pub fn from_components(c: &[f32]) -> Self {
        let ch = |i: usize| c.get(i).copied().unwrap_or(0.0).round().clamp(0.0, 255.0) as u8;
        Self::rgba(ch(0), ch(1), ch(2), ch(3))
    }

    /// Per-channel linear interpolation.
    pub fn lerp(self, other: Color, t: f32) -> Color {
        let a = self.to_components();
        let b = other.to_components();
        let mixed = [
            a[0] + (b[0] - a[0]) * t,
            a[1] + (b[1] - a[1]) * t,
            a[2] + (b[2] - a[2]) * t,
            a[3] + (b[3] - a[3]) * t,
        ];
        Color::from_components(&mixed)
    }
}

/// Shape of stroke ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StrokeCap {
    /// Flat end exactly at the endpoint.
    Square,
    /// Flat end extended by half the stroke weight.
    Project,
    /// Semicircular end.
    #[default]
    Round,
}

/// Shape of the corner between consecutive stroke segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StrokeJoin {
    #[default]
    Miter,
    Bevel,
    Round,
}

/// Opaque handle of a texture owned by the GPU layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u64);

/// Lighting material terms carried per vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub ambient: Color,
    pub specular: Color,
    pub emissive: Color,
    pub shininess: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            ambient: Color::gray(204),
            specular: Color::gray(125),
            emissive: Color::BLACK,
            shininess: 1.0,
        }
    }
}

/// Snapshot of the style state copied into every input vertex.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexStyle {
    pub fill: Color,
    pub stroke: Color,
    pub stroke_weight: f32,
    pub normal: Vec3,
    pub uv: Vec2,
    pub material: Material,
    /// Current values of the generic attributes, packed in schema order.
    pub attribs: Vec<f32>,
}

impl Default for VertexStyle {
    fn default() -> Self {
        Self {
            fill: Color::WHITE,
            stroke: Color::BLACK,
            stroke_weight: 1.0,
            normal: Vec3::new(0.0, 0.0, 1.0),
            uv: Vec2::zeros(),
            material: Material::default(),
            attribs: Vec::new(),
        }
    }
}

impl VertexStyle {
    /// Default style with zeroed generic attributes of the given width.
    pub fn with_attrib_width(width: usize) -> Self {
        Self {
            attribs: vec![0.0; width],
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_channels() {
        let c = Color::rgba(10, 20, 30, 40);
        assert_eq!(c.0, 0x280A_141E);
        assert_eq!((c.r(), c.g(), c.b(), c.a()), (10, 20, 30, 40));
        assert_eq!(Color::from_components(&c.to_components()), c);
    }

    #[test]
    fn test_color_lerp() {
        let a = Color::rgba(0, 0, 0, 255);
        let b = Color::rgba(200, 100, 50, 255);
        assert_eq!(a.lerp(b, 0.0), a);
        assert_eq!(a.lerp(b, 1.0), b);
        assert_eq!(a.lerp(b, 0.5), Color::rgba(100, 50, 25, 255));
    }

    #[test]
    fn test_color_is_pod() {
        let colors = [Color::WHITE, Color::BLACK];
        let bytes: &[u8] = bytemuck::cast_slice(&colors);
        assert_eq!(bytes.len(), 8);
    }
}
