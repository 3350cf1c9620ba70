//! Separable Gaussian smoothing for `f32` volumes.
//!
//! Each non-singleton axis with a positive sigma is convolved with a
//! normalized 1D kernel of radius `ceil(3 * sigma)`. Borders are mirrored
//! without repeating the edge voxel. Slices are processed in parallel when
//! the `rayon` feature is enabled.

use crate::raster::OwnedVolume;
use crate::util::math::mirror_index;
use crate::util::ViewFuseResult;
#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Computes a normalized 1D Gaussian kernel of length `2 * ceil(3 * sigma) + 1`.
///
/// Non-positive or non-finite sigmas yield the identity kernel `[1.0]`.
pub fn gaussian_kernel_1d(sigma: f64) -> Vec<f32> {
    if !sigma.is_finite() || sigma <= 0.0 {
        return vec![1.0];
    }
    let radius = (3.0 * sigma).ceil() as usize;
    let two_sigma_sq = 2.0 * sigma * sigma;
    let mut kernel: Vec<f64> = (0..=2 * radius)
        .map(|i| {
            let x = i as f64 - radius as f64;
            (-x * x / two_sigma_sq).exp()
        })
        .collect();
    let sum: f64 = kernel.iter().sum();
    for v in &mut kernel {
        *v /= sum;
    }
    kernel.into_iter().map(|v| v as f32).collect()
}

/// Smooths `src` with per-axis standard deviations given in voxels.
pub fn gaussian_blur(src: &OwnedVolume<f32>, sigma: [f64; 3]) -> ViewFuseResult<OwnedVolume<f32>> {
    let dims = src.dims();
    let mut data = src.data().to_vec();
    for axis in 0..3 {
        if dims[axis] <= 1 {
            continue;
        }
        let kernel = gaussian_kernel_1d(sigma[axis]);
        if kernel.len() == 1 {
            continue;
        }
        data = convolve_axis(&data, dims, axis, &kernel);
    }
    OwnedVolume::new(data, dims)
}

fn convolve_axis(input: &[f32], dims: [usize; 3], axis: usize, kernel: &[f32]) -> Vec<f32> {
    let [width, height, _] = dims;
    let slice_len = width * height;
    let stride = [1, width, slice_len][axis];
    let len = dims[axis];
    let radius = (kernel.len() / 2) as isize;
    let mut output = vec![0.0f32; input.len()];

    let convolve_slice = |z: usize, out: &mut [f32]| {
        for y in 0..height {
            for x in 0..width {
                let pos = [x, y, z];
                let base = z * slice_len + y * width + x - pos[axis] * stride;
                let center = pos[axis] as isize;
                let mut sum = 0.0f32;
                for (k, &kval) in kernel.iter().enumerate() {
                    let src = mirror_index(center + k as isize - radius, len);
                    sum += input[base + src * stride] * kval;
                }
                out[y * width + x] = sum;
            }
        }
    };

    #[cfg(feature = "rayon")]
    output
        .par_chunks_mut(slice_len)
        .enumerate()
        .for_each(|(z, out)| convolve_slice(z, out));
    #[cfg(not(feature = "rayon"))]
    output
        .chunks_mut(slice_len)
        .enumerate()
        .for_each(|(z, out)| convolve_slice(z, out));

    output
}

#[cfg(test)]
mod tests {
    use super::{gaussian_blur, gaussian_kernel_1d};
    use crate::raster::OwnedVolume;

    #[test]
    fn kernel_is_normalized_and_symmetric() {
        let kernel = gaussian_kernel_1d(1.5);
        assert_eq!(kernel.len(), 11);
        let sum: f32 = kernel.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        for i in 0..kernel.len() / 2 {
            assert!((kernel[i] - kernel[kernel.len() - 1 - i]).abs() < 1e-7);
        }
        assert_eq!(gaussian_kernel_1d(0.0), vec![1.0]);
        assert_eq!(gaussian_kernel_1d(f64::NAN), vec![1.0]);
    }

    #[test]
    fn constant_volume_is_unchanged() {
        let src = OwnedVolume::new(vec![7.0f32; 6 * 5 * 4], [6, 5, 4]).unwrap();
        let out = gaussian_blur(&src, [1.0, 2.0, 0.7]).unwrap();
        for v in out.data() {
            assert!((v - 7.0).abs() < 1e-4);
        }
    }

    #[test]
    fn impulse_spreads_symmetrically_in_plane() {
        let mut src = OwnedVolume::<f32>::zeros([9, 9, 1]).unwrap();
        src.data_mut()[4 * 9 + 4] = 1.0;
        let out = gaussian_blur(&src, [1.0, 1.0, 5.0]).unwrap();
        let left = *out.get(3, 4, 0).unwrap();
        let right = *out.get(5, 4, 0).unwrap();
        let up = *out.get(4, 3, 0).unwrap();
        assert!(left > 0.0);
        assert!((left - right).abs() < 1e-6);
        assert!((left - up).abs() < 1e-6);
        let total: f32 = out.data().iter().sum();
        assert!((total - 1.0).abs() < 1e-4);
    }
}
