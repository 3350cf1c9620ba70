//! Weighted combination of registered views into one virtual output image.
//!
//! `Fusion` turns a set of views, their registrations and an output bounding
//! box into a lazily evaluated [`FusedImage`]. Nothing is computed until the
//! image is read; [`crate::schedule::materialize`] drives a full evaluation.

use crate::bbox::{union_bounding_box, BoundingBox, RealBounds};
use crate::overlap::{filter_overlapping, Placement, DEFAULT_OVERLAP_MARGIN};
use crate::sampler::{Interpolation, SamplerConfig, TransformedSampler};
use crate::trace::{trace_event, trace_span};
use crate::transform::{anisotropy_transform, sanitize_factor, scale_bounding_box, Affine3};
use crate::util::{ViewFuseError, ViewFuseResult};
use crate::view::{RegistrationProvider, View};
use crate::weight::{TransformedWeight, WeightModel, WeightSpec};

mod cache;
mod image;

pub use cache::CachedImage;
pub use image::FusedImage;
pub(crate) use image::ViewStack;

/// How overlapping view samples are combined.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum FusionPolicy {
    /// Weighted mean; 0 where the weights sum to 0.
    #[default]
    Avg,
    /// Maximum sample of the views containing the pixel; weights are ignored.
    Max,
    /// Sample of the first view (by `ViewId`) with a positive weight.
    FirstWins,
}

/// Fusion configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct FusionConfig {
    /// Combination policy.
    pub policy: FusionPolicy,
    /// Interpolation used to read the views.
    pub interpolation: Interpolation,
    /// Weight models, multiplied together (empty = uniform).
    pub weights: Vec<WeightSpec>,
    /// Output downsampling factor; NaN or degenerate values mean none.
    pub downsampling: f64,
    /// Z anisotropy factor; NaN or degenerate values mean none.
    pub anisotropy: f64,
    /// Margin in output pixels for the overlap filter.
    pub overlap_margin: f64,
    /// Lower clamp applied to every view sample.
    pub min_value: Option<f32>,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            policy: FusionPolicy::Avg,
            interpolation: Interpolation::Linear,
            weights: Vec::new(),
            downsampling: f64::NAN,
            anisotropy: f64::NAN,
            overlap_margin: DEFAULT_OVERLAP_MARGIN,
            min_value: None,
        }
    }
}

impl FusionConfig {
    /// Validates weight parameters, the overlap margin and the clamp value.
    pub fn validate(&self) -> ViewFuseResult<()> {
        for spec in &self.weights {
            spec.validate()?;
        }
        if !self.overlap_margin.is_finite() || self.overlap_margin < 0.0 {
            return Err(ViewFuseError::InvalidConfig {
                reason: "overlap_margin must be finite and >= 0",
            });
        }
        if matches!(self.min_value, Some(v) if v.is_nan()) {
            return Err(ViewFuseError::InvalidConfig {
                reason: "min_value must not be NaN",
            });
        }
        Ok(())
    }

    /// Effective downsampling factor.
    pub fn downsampling_factor(&self) -> f64 {
        sanitize_factor(self.downsampling)
    }

    /// Effective anisotropy factor.
    pub fn anisotropy_factor(&self) -> f64 {
        sanitize_factor(self.anisotropy)
    }

    fn sampler_config(&self) -> SamplerConfig {
        SamplerConfig {
            interpolation: self.interpolation,
            min_value: self.min_value,
            ..SamplerConfig::default()
        }
    }
}

/// Fusion engine.
#[derive(Clone, Debug, Default)]
pub struct Fusion {
    cfg: FusionConfig,
}

impl Fusion {
    /// Creates an engine with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the configuration.
    pub fn with_config(mut self, cfg: FusionConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Returns the configuration.
    pub fn config(&self) -> &FusionConfig {
        &self.cfg
    }

    /// Smallest box in (anisotropy-adjusted) global space covering every
    /// present view.
    pub fn estimate_bounding_box(
        &self,
        views: &[View<'_>],
        provider: &dyn RegistrationProvider,
    ) -> ViewFuseResult<BoundingBox> {
        let snapshot = snapshot_registrations(views, provider)?;
        let aniso = anisotropy_transform(self.cfg.anisotropy_factor());
        let extents: Vec<_> = snapshot
            .iter()
            .map(|(view, model)| (view.dims(), model.preconcatenate(&aniso)))
            .collect();
        union_bounding_box(&extents)
    }

    /// Refreshes the registrations once, snapshots them and builds the
    /// fused image over `bbox`.
    ///
    /// Missing views are skipped; a present view without registration is a
    /// `MissingRegistration` error.
    pub fn fuse<'a>(
        &self,
        views: &[View<'a>],
        provider: &dyn RegistrationProvider,
        bbox: &BoundingBox,
    ) -> ViewFuseResult<FusedImage<'a>> {
        let snapshot = snapshot_registrations(views, provider)?;
        self.fuse_snapshot(&snapshot, bbox)
    }

    /// Builds the fused image from views paired with fixed registrations.
    pub fn fuse_snapshot<'a>(
        &self,
        views: &[(View<'a>, Affine3)],
        bbox: &BoundingBox,
    ) -> ViewFuseResult<FusedImage<'a>> {
        self.cfg.validate()?;
        let _span = trace_span!("fuse", views = views.len()).entered();

        let ds = self.cfg.downsampling_factor();
        let scaled = scale_bounding_box(bbox, 1.0 / ds);
        let aniso = anisotropy_transform(self.cfg.anisotropy_factor());
        let to_output = Affine3::scaling([1.0 / ds; 3]).concatenate(&aniso);

        let present: Vec<&(View<'a>, Affine3)> =
            views.iter().filter(|(view, _)| !view.missing).collect();
        let placements: Vec<Placement> = present
            .iter()
            .map(|(view, reg)| Placement {
                id: view.id,
                dims: view.dims(),
                model: to_output.concatenate(reg),
            })
            .collect();

        let dims = scaled.bbox.dims();
        let offset = scaled.offset();
        let output = RealBounds {
            min: offset,
            max: [0, 1, 2].map(|d| offset[d] + (dims[d] - 1) as f64),
        };
        let kept = filter_overlapping(&output, &placements, self.cfg.overlap_margin);
        trace_event!(
            "views_filtered",
            present = present.len(),
            kept = kept.len()
        );

        let sampler_cfg = self.cfg.sampler_config();
        let mut stacks = Vec::with_capacity(kept.len());
        for idx in kept {
            let (view, _) = present[idx];
            let placement = &placements[idx];
            let sampler = TransformedSampler::new(view.raster, &placement.model, offset, sampler_cfg)?;
            let model = match self.cfg.policy {
                FusionPolicy::Max => WeightModel::Uniform,
                FusionPolicy::Avg | FusionPolicy::FirstWins => {
                    WeightModel::build(&self.cfg.weights, view.raster, &placement.model)?
                }
            };
            let weight = TransformedWeight::for_sampler(model, &sampler);
            stacks.push(ViewStack {
                id: view.id,
                sampler,
                weight,
            });
        }

        let to_global = aniso.inverse()?.concatenate(&scaled.to_source());
        Ok(FusedImage::new(scaled.bbox, stacks, self.cfg.policy, to_global))
    }
}

/// Calls `update` once, then copies the model of every present view.
fn snapshot_registrations<'a>(
    views: &[View<'a>],
    provider: &dyn RegistrationProvider,
) -> ViewFuseResult<Vec<(View<'a>, Affine3)>> {
    provider.update();
    views
        .iter()
        .filter(|view| !view.missing)
        .map(|view| {
            provider
                .registration(view.id)
                .map(|model| (*view, model))
                .ok_or(ViewFuseError::MissingRegistration { view: view.id })
        })
        .collect()
}
