//! Curve discretization by forward differencing.
//!
//! Each curve family has a basis matrix; multiplying it by a forward
//! difference matrix for `detail` steps gives a draw matrix whose rows 1-3
//! are the initial first, second and third differences of the polynomial.
//! Stepping then costs three additions per coordinate.

use redlilium_core::math::{Mat4, Vec3, Vec4};

use crate::config::{DEFAULT_BEZIER_DETAIL, DEFAULT_CURVE_DETAIL};

#[rustfmt::skip]
fn bezier_basis() -> Mat4 {
    Mat4::new(
        -1.0,  3.0, -3.0, 1.0,
         3.0, -6.0,  3.0, 0.0,
        -3.0,  3.0,  0.0, 0.0,
         1.0,  0.0,  0.0, 0.0,
    )
}

/// Catmull-Rom basis; tightness 0 gives the standard spline, 1 straight lines.
#[rustfmt::skip]
fn curve_basis(s: f32) -> Mat4 {
    Mat4::new(
        (s - 1.0) / 2.0, (s + 3.0) / 2.0,  (-3.0 - s) / 2.0, (1.0 - s) / 2.0,
        1.0 - s,         (-5.0 - s) / 2.0, s + 2.0,          (s - 1.0) / 2.0,
        (s - 1.0) / 2.0, 0.0,              (1.0 - s) / 2.0,  0.0,
        0.0,             1.0,              0.0,              0.0,
    )
}

/// Forward difference matrix for `detail` uniform steps of a cubic.
fn spline_forward(detail: usize) -> Mat4 {
    let f = 1.0 / detail.max(1) as f32;
    let ff = f * f;
    let fff = ff * f;
    #[rustfmt::skip]
    let m = Mat4::new(
        0.0,         0.0,       0.0, 1.0,
        fff,         ff,        f,   0.0,
        6.0 * fff,   2.0 * ff,  0.0, 0.0,
        6.0 * fff,   0.0,       0.0, 0.0,
    );
    m
}

/// Precomputed draw matrices for bezier and Catmull-Rom segments.
#[derive(Debug, Clone, PartialEq)]
pub struct CurveMatrices {
    bezier_detail: usize,
    curve_detail: usize,
    curve_tightness: f32,
    bezier_draw: Mat4,
    curve_draw: Mat4,
}

impl Default for CurveMatrices {
    fn default() -> Self {
        Self::new(DEFAULT_BEZIER_DETAIL, DEFAULT_CURVE_DETAIL, 0.0)
    }
}

impl CurveMatrices {
    pub fn new(bezier_detail: usize, curve_detail: usize, curve_tightness: f32) -> Self {
        let bezier_detail = bezier_detail.max(1);
        let curve_detail = curve_detail.max(1);
        Self {
            bezier_detail,
            curve_detail,
            curve_tightness,
            bezier_draw: spline_forward(bezier_detail) * bezier_basis(),
            curve_draw: spline_forward(curve_detail) * curve_basis(curve_tightness),
        }
    }

    pub fn bezier_detail(&self) -> usize {
        self.bezier_detail
    }

    pub fn curve_detail(&self) -> usize {
        self.curve_detail
    }

    pub fn curve_tightness(&self) -> f32 {
        self.curve_tightness
    }

    pub fn set_bezier_detail(&mut self, detail: usize) {
        if detail.max(1) != self.bezier_detail {
            *self = Self::new(detail, self.curve_detail, self.curve_tightness);
        }
    }

    pub fn set_curve_detail(&mut self, detail: usize) {
        if detail.max(1) != self.curve_detail {
            *self = Self::new(self.bezier_detail, detail, self.curve_tightness);
        }
    }

    pub fn set_curve_tightness(&mut self, tightness: f32) {
        if tightness != self.curve_tightness {
            *self = Self::new(self.bezier_detail, self.curve_detail, tightness);
        }
    }

    /// Points of a cubic bezier after its start point `p1`; the last one
    /// lands on `p4`.
    pub fn bezier_points(&self, p1: &Vec3, p2: &Vec3, p3: &Vec3, p4: &Vec3) -> Vec<Vec3> {
        step(&self.bezier_draw, [p1, p2, p3, p4], *p1, self.bezier_detail)
    }

    /// Points of a quadratic bezier after `p1`, via its cubic equivalent.
    pub fn quadratic_points(&self, p1: &Vec3, control: &Vec3, p3: &Vec3) -> Vec<Vec3> {
        let c1 = p1 + (control - p1) * (2.0 / 3.0);
        let c2 = p3 + (control - p3) * (2.0 / 3.0);
        self.bezier_points(p1, &c1, &c2, p3)
    }

    /// Points of the Catmull-Rom segment between `p2` and `p3`, starting
    /// with `p2` itself.
    pub fn curve_points(&self, p1: &Vec3, p2: &Vec3, p3: &Vec3, p4: &Vec3) -> Vec<Vec3> {
        let mut points = Vec::with_capacity(self.curve_detail + 1);
        points.push(*p2);
        points.extend(step(
            &self.curve_draw,
            [p1, p2, p3, p4],
            *p2,
            self.curve_detail,
        ));
        points
    }
}

fn step(draw: &Mat4, controls: [&Vec3; 4], start: Vec3, detail: usize) -> Vec<Vec3> {
    let axis = |k: usize| Vec4::new(controls[0][k], controls[1][k], controls[2][k], controls[3][k]);
    let (xs, ys, zs) = (axis(0), axis(1), axis(2));
    let delta = |row: usize| {
        let r = draw.row(row).transpose();
        Vec3::new(r.dot(&xs), r.dot(&ys), r.dot(&zs))
    };
    let mut d1 = delta(1);
    let mut d2 = delta(2);
    let d3 = delta(3);

    let mut p = start;
    let mut points = Vec::with_capacity(detail);
    for _ in 0..detail {
        p += d1;
        d1 += d2;
        d2 += d3;
        points.push(p);
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: &Vec3, b: &Vec3) -> bool {
        (a - b).norm() < 1e-3
    }

    #[test]
    fn test_bezier_ends_on_last_control_point() {
        let curves = CurveMatrices::default();
        let p1 = Vec3::new(0.0, 0.0, 0.0);
        let p4 = Vec3::new(100.0, 0.0, 0.0);
        let points = curves.bezier_points(&p1, &Vec3::new(0.0, 50.0, 0.0), &Vec3::new(100.0, 50.0, 0.0), &p4);
        assert_eq!(points.len(), DEFAULT_BEZIER_DETAIL);
        assert!(close(points.last().unwrap(), &p4));
        // Symmetric control polygon peaks at 3/4 of the control height.
        let mid = points[DEFAULT_BEZIER_DETAIL / 2 - 1];
        assert!(close(&mid, &Vec3::new(50.0, 37.5, 0.0)));
    }

    #[test]
    fn test_bezier_is_deterministic() {
        let curves = CurveMatrices::new(13, 20, 0.0);
        let ctrl = [
            Vec3::new(1.5, -2.0, 0.25),
            Vec3::new(7.0, 9.0, 1.0),
            Vec3::new(-3.0, 4.0, 2.0),
            Vec3::new(10.0, 0.5, -1.0),
        ];
        let a = curves.bezier_points(&ctrl[0], &ctrl[1], &ctrl[2], &ctrl[3]);
        let b = curves.bezier_points(&ctrl[0], &ctrl[1], &ctrl[2], &ctrl[3]);
        let bits = |v: &[Vec3]| v.iter().flat_map(|p| [p.x.to_bits(), p.y.to_bits(), p.z.to_bits()]).collect::<Vec<_>>();
        assert_eq!(bits(&a), bits(&b));
    }

    #[test]
    fn test_quadratic_matches_parabola() {
        let curves = CurveMatrices::new(4, 4, 0.0);
        let points = curves.quadratic_points(
            &Vec3::new(0.0, 0.0, 0.0),
            &Vec3::new(1.0, 2.0, 0.0),
            &Vec3::new(2.0, 0.0, 0.0),
        );
        assert_eq!(points.len(), 4);
        // B(0.5) = 0.25·p1 + 0.5·c + 0.25·p3
        assert!(close(&points[1], &Vec3::new(1.0, 1.0, 0.0)));
        assert!(close(&points[3], &Vec3::new(2.0, 0.0, 0.0)));
    }

    #[test]
    fn test_curve_passes_through_inner_points() {
        let curves = CurveMatrices::new(20, 8, 0.0);
        let p = [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(2.0, 1.0, 0.0),
            Vec3::new(3.0, 0.0, 0.0),
        ];
        let points = curves.curve_points(&p[0], &p[1], &p[2], &p[3]);
        assert_eq!(points.len(), 9);
        assert!(close(&points[0], &p[1]));
        assert!(close(&points[8], &p[2]));
    }

    #[test]
    fn test_detail_change_rebuilds() {
        let mut curves = CurveMatrices::default();
        curves.set_bezier_detail(5);
        assert_eq!(curves.bezier_detail(), 5);
        curves.set_curve_tightness(1.0);
        assert_eq!(curves.curve_tightness(), 1.0);
        // Tightness 1 degenerates to a straight segment.
        let points = curves.curve_points(
            &Vec3::new(-5.0, 3.0, 0.0),
            &Vec3::new(0.0, 0.0, 0.0),
            &Vec3::new(4.0, 0.0, 0.0),
            &Vec3::new(9.0, 7.0, 0.0),
        );
        assert!(points.iter().all(|p| p.y.abs() < 1e-4));
    }
}
