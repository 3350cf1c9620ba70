//! Affine transforms in 3D.
//!
//! `Affine3` stores the upper 3x4 block of a homogeneous 4x4 matrix in
//! row-major order. Points are column vectors, so `a.concatenate(&b)` is the
//! product `a · b` and applies `b` first.

use crate::util::math::norm3;
use crate::util::{ViewFuseError, ViewFuseResult};

mod scaling;

pub use scaling::{
    anisotropy_transform, average_anisotropy, sanitize_factor, scale_bounding_box,
    scale_transform, scale_transform_per_axis, ScaledBox,
};

const SINGULAR_EPS: f64 = 1e-12;

/// 3x4 affine transform mapping `p` to `A·p + t`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Affine3 {
    m: [[f64; 4]; 3],
}

impl Default for Affine3 {
    fn default() -> Self {
        Self::identity()
    }
}

impl Affine3 {
    /// Identity transform.
    pub const fn identity() -> Self {
        Self {
            m: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
            ],
        }
    }

    /// Builds a transform from 12 row-major values `[a00 a01 a02 t0 a10 ...]`.
    pub const fn from_row_major(v: [f64; 12]) -> Self {
        Self {
            m: [
                [v[0], v[1], v[2], v[3]],
                [v[4], v[5], v[6], v[7]],
                [v[8], v[9], v[10], v[11]],
            ],
        }
    }

    /// Returns the 12 row-major values.
    pub fn to_row_major(&self) -> [f64; 12] {
        let m = &self.m;
        [
            m[0][0], m[0][1], m[0][2], m[0][3], m[1][0], m[1][1], m[1][2], m[1][3], m[2][0],
            m[2][1], m[2][2], m[2][3],
        ]
    }

    /// Pure translation.
    pub fn translation(t: [f64; 3]) -> Self {
        let mut out = Self::identity();
        for (row, &value) in out.m.iter_mut().zip(t.iter()) {
            row[3] = value;
        }
        out
    }

    /// Pure per-axis scaling.
    pub fn scaling(s: [f64; 3]) -> Self {
        let mut out = Self::identity();
        for (d, &value) in s.iter().enumerate() {
            out.m[d][d] = value;
        }
        out
    }

    /// Returns the element at `(row, col)`; `col == 3` is the translation.
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.m[row][col]
    }

    /// Returns the translation column.
    pub fn translation_part(&self) -> [f64; 3] {
        [self.m[0][3], self.m[1][3], self.m[2][3]]
    }

    /// Maps a point.
    #[inline]
    pub fn apply(&self, p: [f64; 3]) -> [f64; 3] {
        let m = &self.m;
        [
            m[0][0] * p[0] + m[0][1] * p[1] + m[0][2] * p[2] + m[0][3],
            m[1][0] * p[0] + m[1][1] * p[1] + m[1][2] * p[2] + m[1][3],
            m[2][0] * p[0] + m[2][1] * p[1] + m[2][2] * p[2] + m[2][3],
        ]
    }

    /// Maps a direction (ignores the translation).
    #[inline]
    pub fn apply_linear(&self, v: [f64; 3]) -> [f64; 3] {
        let m = &self.m;
        [
            m[0][0] * v[0] + m[0][1] * v[1] + m[0][2] * v[2],
            m[1][0] * v[0] + m[1][1] * v[1] + m[1][2] * v[2],
            m[2][0] * v[0] + m[2][1] * v[1] + m[2][2] * v[2],
        ]
    }

    /// Returns `self · other` (`other` is applied first).
    pub fn concatenate(&self, other: &Affine3) -> Affine3 {
        let a = &self.m;
        let b = &other.m;
        let mut out = [[0.0; 4]; 3];
        for (r, row) in out.iter_mut().enumerate() {
            for (c, value) in row.iter_mut().enumerate() {
                let mut sum = a[r][0] * b[0][c] + a[r][1] * b[1][c] + a[r][2] * b[2][c];
                if c == 3 {
                    sum += a[r][3];
                }
                *value = sum;
            }
        }
        Affine3 { m: out }
    }

    /// Returns `other · self` (`other` is applied after `self`).
    pub fn preconcatenate(&self, other: &Affine3) -> Affine3 {
        other.concatenate(self)
    }

    /// Determinant of the linear part.
    pub fn determinant(&self) -> f64 {
        let m = &self.m;
        m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
            - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
            + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
    }

    /// Returns the inverse transform.
    pub fn inverse(&self) -> ViewFuseResult<Affine3> {
        let det = self.determinant();
        if !det.is_finite() || det.abs() < SINGULAR_EPS || !self.is_finite() {
            return Err(ViewFuseError::SingularTransform { det });
        }
        let m = &self.m;
        let inv_det = 1.0 / det;
        let mut a = [[0.0; 3]; 3];
        a[0][0] = (m[1][1] * m[2][2] - m[1][2] * m[2][1]) * inv_det;
        a[0][1] = (m[0][2] * m[2][1] - m[0][1] * m[2][2]) * inv_det;
        a[0][2] = (m[0][1] * m[1][2] - m[0][2] * m[1][1]) * inv_det;
        a[1][0] = (m[1][2] * m[2][0] - m[1][0] * m[2][2]) * inv_det;
        a[1][1] = (m[0][0] * m[2][2] - m[0][2] * m[2][0]) * inv_det;
        a[1][2] = (m[0][2] * m[1][0] - m[0][0] * m[1][2]) * inv_det;
        a[2][0] = (m[1][0] * m[2][1] - m[1][1] * m[2][0]) * inv_det;
        a[2][1] = (m[0][1] * m[2][0] - m[0][0] * m[2][1]) * inv_det;
        a[2][2] = (m[0][0] * m[1][1] - m[0][1] * m[1][0]) * inv_det;

        let t = self.translation_part();
        let mut out = [[0.0; 4]; 3];
        for r in 0..3 {
            out[r][..3].copy_from_slice(&a[r]);
            out[r][3] = -(a[r][0] * t[0] + a[r][1] * t[1] + a[r][2] * t[2]);
        }
        Ok(Affine3 { m: out })
    }

    /// Length of each transformed unit axis vector.
    ///
    /// This is the factor by which one input pixel along axis `d` is stretched
    /// in the target space.
    pub fn axis_scaling(&self) -> [f64; 3] {
        let column = |c: usize| [self.m[0][c], self.m[1][c], self.m[2][c]];
        [norm3(column(0)), norm3(column(1)), norm3(column(2))]
    }

    /// Returns `true` when every coefficient is finite.
    pub fn is_finite(&self) -> bool {
        self.m.iter().flatten().all(|v| v.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::Affine3;
    use crate::util::ViewFuseError;

    fn assert_close(a: [f64; 3], b: [f64; 3]) {
        for d in 0..3 {
            assert!((a[d] - b[d]).abs() < 1e-9, "{a:?} vs {b:?}");
        }
    }

    fn sample_affine() -> Affine3 {
        Affine3::from_row_major([
            0.9, -0.2, 0.1, 12.0, 0.25, 1.1, 0.0, -4.0, 0.05, 0.1, 2.5, 7.5,
        ])
    }

    #[test]
    fn inverse_round_trips_points() {
        let a = sample_affine();
        let inv = a.inverse().unwrap();
        let p = [3.0, -2.0, 11.0];
        assert_close(inv.apply(a.apply(p)), p);
        assert_close(a.concatenate(&inv).apply(p), p);
    }

    #[test]
    fn concatenate_applies_right_operand_first() {
        let t = Affine3::translation([1.0, 2.0, 3.0]);
        let s = Affine3::scaling([2.0, 2.0, 2.0]);
        assert_close(s.concatenate(&t).apply([0.0; 3]), [2.0, 4.0, 6.0]);
        assert_close(t.concatenate(&s).apply([0.0; 3]), [1.0, 2.0, 3.0]);
        assert_close(t.preconcatenate(&s).apply([0.0; 3]), [2.0, 4.0, 6.0]);
    }

    #[test]
    fn singular_transform_is_rejected() {
        let flat = Affine3::scaling([1.0, 1.0, 0.0]);
        assert_eq!(
            flat.inverse().err().unwrap(),
            ViewFuseError::SingularTransform { det: 0.0 }
        );
    }

    #[test]
    fn axis_scaling_reports_column_norms() {
        let s = Affine3::scaling([0.5, 2.0, 3.0]);
        assert_close(s.axis_scaling(), [0.5, 2.0, 3.0]);
        let row_major = sample_affine().to_row_major();
        assert_eq!(Affine3::from_row_major(row_major), sample_affine());
    }
}
