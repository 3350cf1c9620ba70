//! Folding downsampling and anisotropy into boxes and transforms.

use crate::bbox::BoundingBox;
use crate::transform::Affine3;

/// Normalizes a scale factor: NaN, infinite, zero or negative values mean
/// "no scaling" and become `1.0`.
pub fn sanitize_factor(factor: f64) -> f64 {
    if factor.is_finite() && factor > 0.0 {
        factor
    } else {
        1.0
    }
}

/// Pre-concatenates a uniform scaling onto `transform`.
pub fn scale_transform(transform: &Affine3, factor: f64) -> Affine3 {
    let f = sanitize_factor(factor);
    transform.preconcatenate(&Affine3::scaling([f, f, f]))
}

/// Pre-concatenates a per-axis scaling onto `transform`.
pub fn scale_transform_per_axis(transform: &Affine3, factors: [f64; 3]) -> Affine3 {
    transform.preconcatenate(&Affine3::scaling(factors.map(sanitize_factor)))
}

/// Compresses z by `1 / anisotropy` (identity for NaN or degenerate factors).
pub fn anisotropy_transform(anisotropy: f64) -> Affine3 {
    Affine3::scaling([1.0, 1.0, 1.0 / sanitize_factor(anisotropy)])
}

/// Ratio of mean z voxel size to mean xy voxel size over all views.
///
/// Returns `1.0` for an empty set or degenerate sizes.
pub fn average_anisotropy(voxel_sizes: &[[f64; 3]]) -> f64 {
    if voxel_sizes.is_empty() {
        return 1.0;
    }
    let n = voxel_sizes.len() as f64;
    let mut sum = [0.0f64; 3];
    for size in voxel_sizes {
        for d in 0..3 {
            sum[d] += size[d];
        }
    }
    let xy = (sum[0] + sum[1]) / (2.0 * n);
    let z = sum[2] / n;
    sanitize_factor(z / xy)
}

/// A bounding box scaled into a resampled grid.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScaledBox {
    /// Integer box in the scaled grid (rounded to nearest).
    pub bbox: BoundingBox,
    /// Fractional part lost when rounding the min corner, per axis.
    pub residual: [f64; 3],
    /// Applied scale factor (after sanitizing).
    pub factor: f64,
}

impl ScaledBox {
    /// Real-valued position of the scaled box origin (`min * factor`).
    pub fn offset(&self) -> [f64; 3] {
        let min = self.bbox.min();
        [
            min[0] as f64 + self.residual[0],
            min[1] as f64 + self.residual[1],
            min[2] as f64 + self.residual[2],
        ]
    }

    /// Maps zero-min pixels of the scaled box back into the source space.
    pub fn to_source(&self) -> Affine3 {
        let inv = 1.0 / self.factor;
        Affine3::scaling([inv, inv, inv]).concatenate(&Affine3::translation(self.offset()))
    }
}

/// Scales `bbox` by `factor`, rounding each corner to the nearest integer.
///
/// The min-corner rounding residual is kept so that `ScaledBox::to_source`
/// maps the scaled origin exactly onto the original min corner.
pub fn scale_bounding_box(bbox: &BoundingBox, factor: f64) -> ScaledBox {
    let factor = sanitize_factor(factor);
    let mut min = [0i64; 3];
    let mut max = [0i64; 3];
    let mut residual = [0.0f64; 3];
    for d in 0..3 {
        let lo = bbox.min()[d] as f64 * factor;
        let hi = bbox.max()[d] as f64 * factor;
        min[d] = lo.round() as i64;
        max[d] = hi.round() as i64;
        residual[d] = lo - min[d] as f64;
    }
    ScaledBox {
        bbox: BoundingBox::from_ordered(min, max),
        residual,
        factor,
    }
}

#[cfg(test)]
mod tests {
    use super::{average_anisotropy, sanitize_factor, scale_bounding_box, scale_transform};
    use crate::bbox::BoundingBox;
    use crate::transform::Affine3;

    #[test]
    fn degenerate_factors_are_identity() {
        assert_eq!(sanitize_factor(f64::NAN), 1.0);
        assert_eq!(sanitize_factor(f64::INFINITY), 1.0);
        assert_eq!(sanitize_factor(0.0), 1.0);
        assert_eq!(sanitize_factor(-2.0), 1.0);
        assert_eq!(sanitize_factor(0.25), 0.25);

        let t = Affine3::translation([1.0, 2.0, 3.0]);
        let scaled = scale_transform(&t, f64::NAN);
        assert_eq!(scaled, t);
        assert!(scaled.is_finite());
    }

    #[test]
    fn scale_transform_scales_after_transform() {
        let t = Affine3::translation([1.0, 2.0, 3.0]);
        let scaled = scale_transform(&t, 0.5);
        assert_eq!(scaled.apply([1.0, 0.0, 0.0]), [1.0, 1.0, 1.5]);
    }

    #[test]
    fn scaled_box_keeps_min_residual() {
        let bbox = BoundingBox::new([-5, 3, 0], [10, 8, 0]).unwrap();
        let scaled = scale_bounding_box(&bbox, 0.5);
        assert_eq!(scaled.bbox.min(), [-3, 2, 0]);
        assert_eq!(scaled.bbox.max(), [5, 4, 0]);
        assert_eq!(scaled.offset(), [-2.5, 1.5, 0.0]);
        assert_eq!(scaled.to_source().apply([0.0; 3]), [-5.0, 3.0, 0.0]);
    }

    #[test]
    fn anisotropy_is_z_over_xy() {
        let sizes = [[0.5, 0.5, 2.0], [0.5, 0.5, 2.0]];
        assert!((average_anisotropy(&sizes) - 4.0).abs() < 1e-12);
        assert_eq!(average_anisotropy(&[]), 1.0);
        assert_eq!(average_anisotropy(&[[0.0, 0.0, 1.0]]), 1.0);
    }
}
