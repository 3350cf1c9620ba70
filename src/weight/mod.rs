//! Per-view confidence weights.
//!
//! A weight model answers in view-local coordinates that were already
//! accepted by the view's inside rule (`ViewBounds::locate`), so every model
//! is implicitly zero outside the view. `TransformedWeight` wraps a model with
//! the view placement to evaluate it in output pixel coordinates.
//!
//! Border, range and sigma parameters are given in input pixels and are
//! divided by the per-axis scale of the view model (registration, anisotropy
//! and downsampling combined) before use.

use crate::raster::Raster;
use crate::sampler::{Interpolation, OutputSampler, TransformedSampler, ViewBounds};
use crate::transform::{sanitize_factor, Affine3};
use crate::util::{ViewFuseError, ViewFuseResult};

mod blending;
mod content;

pub use blending::BlendingWeight;
pub use content::ContentWeight;

/// Border fall-off parameters, in input pixels per axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BlendingParams {
    /// Distance from the edge where the weight stays 0.
    pub border: [f64; 3],
    /// Length of the cosine ramp from 0 to 1 after the border.
    pub range: [f64; 3],
}

impl Default for BlendingParams {
    fn default() -> Self {
        Self {
            border: [0.0; 3],
            range: [40.0; 3],
        }
    }
}

impl BlendingParams {
    /// Validates that all distances are finite and non-negative.
    pub fn validate(&self) -> ViewFuseResult<()> {
        let ok = |v: &f64| v.is_finite() && *v >= 0.0;
        if !self.border.iter().all(ok) {
            return Err(ViewFuseError::InvalidConfig {
                reason: "blending border must be finite and >= 0",
            });
        }
        if !self.range.iter().all(ok) {
            return Err(ViewFuseError::InvalidConfig {
                reason: "blending range must be finite and >= 0",
            });
        }
        Ok(())
    }
}

/// Content-based weight parameters, in input pixels per axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ContentParams {
    /// Fine Gaussian scale.
    pub sigma1: [f64; 3],
    /// Coarse Gaussian scale used to integrate local contrast.
    pub sigma2: [f64; 3],
    /// Minimum weight inside the view, in `[0, 1]`.
    pub floor: f32,
}

impl Default for ContentParams {
    fn default() -> Self {
        Self {
            sigma1: [20.0; 3],
            sigma2: [40.0; 3],
            floor: 1e-3,
        }
    }
}

impl ContentParams {
    /// Validates sigmas (finite, > 0) and the floor (in `[0, 1]`).
    pub fn validate(&self) -> ViewFuseResult<()> {
        let ok = |v: &f64| v.is_finite() && *v > 0.0;
        if !self.sigma1.iter().all(ok) || !self.sigma2.iter().all(ok) {
            return Err(ViewFuseError::InvalidConfig {
                reason: "content sigmas must be finite and > 0",
            });
        }
        if !(0.0..=1.0).contains(&self.floor) {
            return Err(ViewFuseError::InvalidConfig {
                reason: "content floor must be in [0, 1]",
            });
        }
        Ok(())
    }
}

/// Requested weighting for each view.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub enum WeightSpec {
    /// 1 inside the view, 0 outside.
    #[default]
    Uniform,
    /// Cosine fall-off towards the raster borders.
    Blending(BlendingParams),
    /// Local-contrast confidence.
    ContentBased(ContentParams),
}

impl WeightSpec {
    /// Validates the parameters of this spec.
    pub fn validate(&self) -> ViewFuseResult<()> {
        match self {
            WeightSpec::Uniform => Ok(()),
            WeightSpec::Blending(p) => p.validate(),
            WeightSpec::ContentBased(p) => p.validate(),
        }
    }
}

/// Weight model of one view in view-local coordinates.
#[derive(Clone, Debug)]
pub enum WeightModel {
    /// Constant 1.
    Uniform,
    /// Border blending.
    Blending(BlendingWeight),
    /// Content-based confidence.
    ContentBased(ContentWeight),
    /// Product of several models.
    Product(Vec<WeightModel>),
}

impl WeightModel {
    /// Builds the combined model of `specs` for one view.
    ///
    /// `model` maps view pixels into the output grid; its per-axis scale
    /// converts the input-pixel parameters. An empty list is `Uniform`.
    pub fn build(specs: &[WeightSpec], raster: &dyn Raster, model: &Affine3) -> ViewFuseResult<Self> {
        let scale = model.axis_scaling().map(sanitize_factor);
        let mut parts = Vec::with_capacity(specs.len());
        for spec in specs {
            spec.validate()?;
            match spec {
                WeightSpec::Uniform => {}
                WeightSpec::Blending(params) => parts.push(WeightModel::Blending(
                    BlendingWeight::new(raster.dims(), params, scale),
                )),
                WeightSpec::ContentBased(params) => parts.push(WeightModel::ContentBased(
                    ContentWeight::compute(raster, params, scale)?,
                )),
            }
        }
        Ok(match parts.len() {
            0 => WeightModel::Uniform,
            1 => parts.swap_remove(0),
            _ => WeightModel::Product(parts),
        })
    }

    /// Weight at a local position accepted by the view's inside rule.
    #[inline]
    pub fn weight_local(&self, t: [f64; 3]) -> f32 {
        match self {
            WeightModel::Uniform => 1.0,
            WeightModel::Blending(b) => b.weight(t),
            WeightModel::ContentBased(c) => c.weight(t),
            WeightModel::Product(parts) => parts.iter().map(|m| m.weight_local(t)).product(),
        }
    }
}

/// Weight model evaluated in output pixel coordinates.
#[derive(Clone, Debug)]
pub struct TransformedWeight {
    model: WeightModel,
    to_local: Affine3,
    bounds: ViewBounds,
}

impl TransformedWeight {
    /// Places `model` for a view of size `dims` mapped by `view_model`, with
    /// the output origin at `offset`.
    pub fn new(
        model: WeightModel,
        view_model: &Affine3,
        dims: [usize; 3],
        offset: [f64; 3],
        interpolation: Interpolation,
    ) -> ViewFuseResult<Self> {
        let to_local = view_model
            .inverse()?
            .concatenate(&Affine3::translation(offset));
        Ok(Self {
            model,
            to_local,
            bounds: ViewBounds::new(dims, interpolation),
        })
    }

    /// Places `model` where `sampler` reads its view, sharing its
    /// coordinate transform and inside rule.
    pub fn for_sampler(model: WeightModel, sampler: &TransformedSampler<'_>) -> Self {
        Self {
            model,
            to_local: *sampler.to_local(),
            bounds: *sampler.bounds(),
        }
    }

    /// The wrapped local model.
    pub fn model(&self) -> &WeightModel {
        &self.model
    }
}

impl OutputSampler for TransformedWeight {
    #[inline]
    fn locate(&self, p: [f64; 3]) -> Option<[f64; 3]> {
        self.bounds.locate(self.to_local.apply(p))
    }

    #[inline]
    fn sample_local(&self, t: [f64; 3]) -> f32 {
        self.model.weight_local(t)
    }
}

#[cfg(test)]
mod tests {
    use super::{BlendingParams, ContentParams, TransformedWeight, WeightModel, WeightSpec};
    use crate::raster::OwnedVolume;
    use crate::sampler::{Interpolation, OutputSampler, SamplerConfig, TransformedSampler};
    use crate::transform::Affine3;
    use crate::util::ViewFuseError;

    #[test]
    fn uniform_is_one_inside_and_zero_outside() {
        let vol = OwnedVolume::new(vec![3u8; 5 * 4], [5, 4, 1]).unwrap();
        let model = WeightModel::build(&[], &vol, &Affine3::identity()).unwrap();
        let weight = TransformedWeight::new(
            model,
            &Affine3::translation([10.0, 0.0, 0.0]),
            vol.dims(),
            [0.0; 3],
            Interpolation::Linear,
        )
        .unwrap();
        assert_eq!(weight.sample_at([10.0, 0.0, 0.0]), 1.0);
        assert_eq!(weight.sample_at([14.0, 3.0, 7.0]), 1.0);
        assert_eq!(weight.sample_at([9.0, 0.0, 0.0]), 0.0);
        assert_eq!(weight.sample_at([15.0, 0.0, 0.0]), 0.0);
    }

    #[test]
    fn weight_shares_the_sampler_placement() {
        let vol = OwnedVolume::new(vec![2u16; 12 * 8], [12, 8, 1]).unwrap();
        let placement = Affine3::translation([3.5, -1.0, 0.0]);
        let offset = [1.0, 0.0, 0.0];
        let spec = WeightSpec::Blending(BlendingParams {
            border: [0.0; 3],
            range: [3.0; 3],
        });
        let model = WeightModel::build(&[spec], &vol, &placement).unwrap();
        let sampler =
            TransformedSampler::new(&vol, &placement, offset, SamplerConfig::default()).unwrap();
        let shared = TransformedWeight::for_sampler(model.clone(), &sampler);
        let standalone =
            TransformedWeight::new(model, &placement, vol.dims(), offset, Interpolation::Linear)
                .unwrap();

        for p in [[2.5, 0.0, 0.0], [6.0, 3.0, 4.0], [13.5, 6.0, 0.0], [20.0, 2.0, 0.0]] {
            assert_eq!(shared.sample_at(p), standalone.sample_at(p));
            assert_eq!(shared.locate(p), sampler.locate(p));
        }
        assert!(shared.sample_at([6.0, 3.0, 0.0]) > 0.0);
        assert_eq!(shared.sample_at([20.0, 2.0, 0.0]), 0.0);
    }

    #[test]
    fn specs_combine_into_product() {
        let vol = OwnedVolume::new(vec![1.0f32; 21], [21, 1, 1]).unwrap();
        let blend = BlendingParams {
            border: [0.0; 3],
            range: [4.0; 3],
        };
        let specs = [
            WeightSpec::Blending(blend),
            WeightSpec::Uniform,
            WeightSpec::Blending(blend),
        ];
        let model = WeightModel::build(&specs, &vol, &Affine3::identity()).unwrap();
        assert!(matches!(model, WeightModel::Product(ref parts) if parts.len() == 2));
        let single = WeightModel::build(&specs[..1], &vol, &Affine3::identity()).unwrap();
        let t = [2.0, 0.0, 0.0];
        let w = single.weight_local(t);
        assert!((model.weight_local(t) - w * w).abs() < 1e-6);
    }

    #[test]
    fn invalid_params_are_rejected() {
        let bad = WeightSpec::ContentBased(ContentParams {
            sigma1: [0.0; 3],
            ..ContentParams::default()
        });
        assert!(matches!(
            bad.validate(),
            Err(ViewFuseError::InvalidConfig { .. })
        ));
        let bad = WeightSpec::Blending(BlendingParams {
            border: [-1.0, 0.0, 0.0],
            range: [1.0; 3],
        });
        assert!(bad.validate().is_err());
        assert!(WeightSpec::Uniform.validate().is_ok());
    }
}
