//! Math type aliases and helper functions.
//!
//! All rendering math is f32. Matrices follow nalgebra's column-vector
//! convention: a point is transformed as `m * p`, and `Mat4::new` takes its
//! arguments in row-major reading order.

pub use nalgebra;

/// 2D vector (f32).
pub type Vec2 = nalgebra::Vector2<f32>;

/// 3D vector (f32).
pub type Vec3 = nalgebra::Vector3<f32>;

/// 4D vector (f32).
pub type Vec4 = nalgebra::Vector4<f32>;

/// 3x3 matrix (f32).
pub type Mat3 = nalgebra::Matrix3<f32>;

/// 4x4 matrix (f32).
pub type Mat4 = nalgebra::Matrix4<f32>;

// ===== Projection and view =====

/// Build a right-handed perspective projection with depth range [0, 1] (wgpu/Vulkan convention).
pub fn perspective_rh(yfov: f32, aspect: f32, znear: f32, zfar: f32) -> Mat4 {
    let f = 1.0 / (yfov / 2.0).tan();
    let nf = 1.0 / (znear - zfar);
    #[rustfmt::skip]
    let result = Mat4::new(
        f / aspect, 0.0,  0.0,              0.0,
        0.0,        f,    0.0,              0.0,
        0.0,        0.0,  zfar * nf,        znear * zfar * nf,
        0.0,        0.0,  -1.0,             0.0,
    );
    result
}

/// Build a right-handed orthographic projection with depth range [0, 1] (wgpu/Vulkan convention).
pub fn orthographic_rh(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4 {
    let rml = right - left;
    let tmb = top - bottom;
    let fmn = far - near;
    #[rustfmt::skip]
    let result = Mat4::new(
        2.0 / rml, 0.0,       0.0,         -(right + left) / rml,
        0.0,       2.0 / tmb, 0.0,         -(top + bottom) / tmb,
        0.0,       0.0,       -1.0 / fmn,  -near / fmn,
        0.0,       0.0,       0.0,          1.0,
    );
    result
}

/// Build a translation-only 4x4 matrix.
pub fn mat4_from_translation(t: Vec3) -> Mat4 {
    Mat4::new_translation(&t)
}

/// Build a non-uniform scale 4x4 matrix.
pub fn mat4_from_scale(s: Vec3) -> Mat4 {
    Mat4::new_nonuniform_scaling(&s)
}

/// Build a rotation around the Z axis (the 2D rotation).
pub fn mat4_from_rotation_z(angle: f32) -> Mat4 {
    Mat4::from_axis_angle(&Vec3::z_axis(), angle)
}

// ===== Point and vector transforms =====

/// Transform a point by an affine matrix (w = 1, no perspective divide).
pub fn transform_point(m: &Mat4, p: &Vec3) -> Vec3 {
    let r = m * Vec4::new(p.x, p.y, p.z, 1.0);
    Vec3::new(r.x, r.y, r.z)
}

/// Transform a direction by the linear part of a matrix (translation ignored).
pub fn transform_vector(m: &Mat4, v: &Vec3) -> Vec3 {
    let linear: Mat3 = m.fixed_view::<3, 3>(0, 0).into_owned();
    linear * v
}

/// Inverse-transpose of the upper 3x3 block, used to carry normals through
/// a modelview transform. Falls back to the linear part when it is singular.
pub fn normal_matrix(m: &Mat4) -> Mat3 {
    let linear: Mat3 = m.fixed_view::<3, 3>(0, 0).into_owned();
    linear
        .try_inverse()
        .map(|inv| inv.transpose())
        .unwrap_or(linear)
}

/// Project a point through a full projection matrix and perform the
/// perspective divide. Points with `w == 0` are returned undivided.
pub fn project_point(m: &Mat4, p: &Vec4) -> Vec3 {
    let r = m * p;
    if r.w != 0.0 {
        Vec3::new(r.x / r.w, r.y / r.w, r.z / r.w)
    } else {
        Vec3::new(r.x, r.y, r.z)
    }
}

/// Uniform scale factor of the XY part of a matrix: `sqrt(|det2|)`.
pub fn transform_scale_2d(m: &Mat4) -> f32 {
    let det = m[(0, 0)] * m[(1, 1)] - m[(0, 1)] * m[(1, 0)];
    det.abs().sqrt()
}

/// Uniform scale factor of the linear part of a matrix: `cbrt(|det3|)`.
pub fn transform_scale_3d(m: &Mat4) -> f32 {
    let linear: Mat3 = m.fixed_view::<3, 3>(0, 0).into_owned();
    linear.determinant().abs().cbrt()
}

/// True when the XY part of the matrix has no rotation/shear and unit scale,
/// so 2D screen-space lengths equal model-space lengths.
pub fn is_unscaled_axis_aligned_2d(m: &Mat4) -> bool {
    const EPS: f32 = 1e-6;
    m[(0, 1)].abs() < EPS
        && m[(1, 0)].abs() < EPS
        && (m[(0, 0)].abs() - 1.0).abs() < EPS
        && (m[(1, 1)].abs() - 1.0).abs() < EPS
}
