use crate::raster::gauss::gaussian_blur;
use crate::raster::{OwnedVolume, Raster};
use crate::sampler::{interpolate, Interpolation, ViewBounds};
use crate::trace::trace_span;
use crate::util::ViewFuseResult;
use crate::weight::ContentParams;
use std::sync::Arc;

/// Local-contrast confidence of a view.
///
/// The weight volume is `G(sigma2) * (I - G(sigma1) * I)^2`, normalized by
/// its maximum and lifted by `floor`. It is computed once per view and shared
/// between clones.
#[derive(Clone, Debug)]
pub struct ContentWeight {
    weights: Arc<OwnedVolume<f32>>,
    bounds: ViewBounds,
}

impl ContentWeight {
    /// Computes the weight volume of `raster`.
    ///
    /// Sigmas in `params` are divided by the per-axis model `scale`.
    pub fn compute(raster: &dyn Raster, params: &ContentParams, scale: [f64; 3]) -> ViewFuseResult<Self> {
        let dims = raster.dims();
        let _span = trace_span!("content_weights", width = dims[0], height = dims[1], depth = dims[2]).entered();

        let input = OwnedVolume::from_raster(raster)?;
        let sigma1 = [0, 1, 2].map(|d| params.sigma1[d] / scale[d]);
        let sigma2 = [0, 1, 2].map(|d| params.sigma2[d] / scale[d]);

        let smooth = gaussian_blur(&input, sigma1)?;
        let detail: Vec<f32> = input
            .data()
            .iter()
            .zip(smooth.data())
            .map(|(&v, &s)| (v - s) * (v - s))
            .collect();
        let energy = gaussian_blur(&OwnedVolume::new(detail, dims)?, sigma2)?;

        let max = energy.data().iter().copied().fold(0.0f32, f32::max);
        let floor = params.floor;
        let mut data = energy.into_vec();
        for v in &mut data {
            let norm = if max > 0.0 { (*v / max).clamp(0.0, 1.0) } else { 0.0 };
            *v = floor + (1.0 - floor) * norm;
        }

        Ok(Self {
            weights: Arc::new(OwnedVolume::new(data, dims)?),
            bounds: ViewBounds::new(dims, Interpolation::Linear),
        })
    }

    /// The precomputed weight volume.
    pub fn weights(&self) -> &OwnedVolume<f32> {
        &self.weights
    }

    /// Weight at local position `t`, linearly interpolated.
    #[inline]
    pub fn weight(&self, t: [f64; 3]) -> f32 {
        let dims = self.bounds.dims();
        let clamped = [0, 1, 2].map(|d| t[d].clamp(0.0, (dims[d] - 1) as f64));
        interpolate(self.weights.as_ref(), &self.bounds, clamped)
    }
}

#[cfg(test)]
mod tests {
    use super::ContentWeight;
    use crate::raster::OwnedVolume;
    use crate::weight::ContentParams;

    fn half_textured() -> OwnedVolume<f32> {
        let (w, h) = (32usize, 16usize);
        let mut data = vec![100.0f32; w * h];
        for y in 0..h {
            for x in w / 2..w {
                data[y * w + x] = if (x + y) % 2 == 0 { 0.0 } else { 200.0 };
            }
        }
        OwnedVolume::new(data, [w, h, 1]).unwrap()
    }

    fn params() -> ContentParams {
        ContentParams {
            sigma1: [1.0; 3],
            sigma2: [2.0; 3],
            floor: 0.01,
        }
    }

    #[test]
    fn textured_region_outweighs_flat_region() {
        let vol = half_textured();
        let cw = ContentWeight::compute(&vol, &params(), [1.0; 3]).unwrap();
        let flat = cw.weight([2.0, 8.0, 0.0]);
        let textured = cw.weight([26.0, 8.0, 0.0]);
        assert!(textured > 0.5, "textured {textured}");
        assert!(flat < 0.05, "flat {flat}");
        assert!(flat >= 0.01 - 1e-6);
    }

    #[test]
    fn weights_are_normalized() {
        let vol = half_textured();
        let cw = ContentWeight::compute(&vol, &params(), [1.0; 3]).unwrap();
        let max = cw.weights().data().iter().copied().fold(0.0f32, f32::max);
        let min = cw.weights().data().iter().copied().fold(f32::MAX, f32::min);
        assert!((max - 1.0).abs() < 1e-5);
        assert!(min >= 0.01 - 1e-6);
    }

    #[test]
    fn constant_input_yields_floor() {
        let vol = OwnedVolume::new(vec![7u16; 8 * 8 * 3], [8, 8, 3]).unwrap();
        let cw = ContentWeight::compute(&vol, &params(), [1.0; 3]).unwrap();
        assert!(cw.weights().data().iter().all(|&v| (v - 0.01).abs() < 1e-6));
    }

    #[test]
    fn clones_share_weight_volume() {
        let vol = half_textured();
        let cw = ContentWeight::compute(&vol, &params(), [1.0; 3]).unwrap();
        let copy = cw.clone();
        assert!(std::ptr::eq(cw.weights(), copy.weights()));
    }
}
