//! Scalar helpers shared by the samplers and weight models.

use std::f64::consts::PI;

/// Cosine ramp from 0 at `t = 0` to 1 at `t = 1`.
///
/// Inputs outside `[0, 1]` are clamped.
pub(crate) fn cosine_ramp(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    ((1.0 - t) * PI).cos().mul_add(0.5, 0.5)
}

/// Maps any signed index into `[0, len)` by mirroring at the borders.
///
/// The edge sample is not repeated: `-1 -> 1`, `len -> len - 2`.
pub(crate) fn mirror_index(index: isize, len: usize) -> usize {
    if len <= 1 {
        return 0;
    }
    let period = 2 * (len as isize - 1);
    let mut i = index.rem_euclid(period);
    if i >= len as isize {
        i = period - i;
    }
    i as usize
}

/// Euclidean length of a 3-vector.
pub(crate) fn norm3(v: [f64; 3]) -> f64 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}
