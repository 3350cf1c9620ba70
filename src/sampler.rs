//! Lazy samplers that read an input view in output pixel coordinates.
//!
//! An output position `p` is mapped to view-local coordinates with
//! `t = inverse(model) · (p + offset)`. The view only answers when `t` lies
//! strictly inside its raster on every non-singleton axis; everything else is
//! background and yields the configured outside value. The raster is never
//! extended beyond its bounds.
//!
//! Inside tests per axis with `n` samples:
//! - nearest neighbor: `-0.5 < t < n - 0.5` (the pixel footprint),
//! - linear: `-EDGE_EPSILON < t < n - 1 + EDGE_EPSILON`, then `t` is snapped
//!   into `[0, n - 1]` so the interpolation never reads outside the raster.
//!
//! Singleton axes (depth-1 rasters) are broadcast: they take no part in the
//! inside test and always read index 0.

use crate::raster::{singleton_axes, Raster};
use crate::transform::Affine3;
use crate::util::ViewFuseResult;
use std::fmt;

/// Tolerance that keeps exact edge coordinates inside under linear interpolation.
pub const EDGE_EPSILON: f64 = 1e-6;

/// Interpolation used when reading a view at a real-valued position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Interpolation {
    /// Nearest voxel.
    NearestNeighbor,
    /// Trilinear over the non-singleton axes.
    #[default]
    Linear,
}

/// Capability shared by view samplers and weight models: a value at an
/// output-space position. Implementations are immutable; clones are
/// independent copies for concurrent evaluation.
///
/// `locate` and `sample_local` split the read so that several adapters placed
/// by the same model can share one coordinate transform per pixel.
pub trait OutputSampler: Clone + Send + Sync {
    /// Returns the snapped view-local position of output position `p`, or
    /// `None` when `p` lies outside the view.
    fn locate(&self, p: [f64; 3]) -> Option<[f64; 3]>;

    /// Value at a local position returned by `locate`.
    fn sample_local(&self, t: [f64; 3]) -> f32;

    /// Value reported where `locate` fails.
    fn outside_value(&self) -> f32 {
        0.0
    }

    /// Returns the value at output position `p`.
    #[inline]
    fn sample_at(&self, p: [f64; 3]) -> f32 {
        match self.locate(p) {
            Some(t) => self.sample_local(t),
            None => self.outside_value(),
        }
    }
}

/// Extent of one view raster together with its inside rule.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewBounds {
    dims: [usize; 3],
    singleton: [bool; 3],
    interpolation: Interpolation,
}

impl ViewBounds {
    /// Creates bounds for a raster of size `dims`.
    pub fn new(dims: [usize; 3], interpolation: Interpolation) -> Self {
        Self {
            dims,
            singleton: singleton_axes(dims),
            interpolation,
        }
    }

    /// Raster extent.
    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    /// Axes with a single sample.
    pub fn singleton(&self) -> [bool; 3] {
        self.singleton
    }

    /// Returns the snapped local position if `t` is strictly inside.
    #[inline]
    pub fn locate(&self, t: [f64; 3]) -> Option<[f64; 3]> {
        let mut out = t;
        for d in 0..3 {
            if self.singleton[d] {
                out[d] = 0.0;
                continue;
            }
            let hi = (self.dims[d] - 1) as f64;
            match self.interpolation {
                Interpolation::NearestNeighbor => {
                    if !(t[d] > -0.5 && t[d] < hi + 0.5) {
                        return None;
                    }
                }
                Interpolation::Linear => {
                    if !(t[d] > -EDGE_EPSILON && t[d] < hi + EDGE_EPSILON) {
                        return None;
                    }
                    out[d] = t[d].clamp(0.0, hi);
                }
            }
        }
        Some(out)
    }
}

/// Reads `raster` at a local position already accepted by `ViewBounds::locate`.
pub(crate) fn interpolate(raster: &dyn Raster, bounds: &ViewBounds, t: [f64; 3]) -> f32 {
    let singleton = bounds.singleton;
    match bounds.interpolation {
        Interpolation::NearestNeighbor => {
            let pos = [0, 1, 2].map(|d| if singleton[d] { 0 } else { t[d].round() as usize });
            raster.value(pos)
        }
        Interpolation::Linear => {
            let dims = bounds.dims;
            let mut base = [0usize; 3];
            let mut next = [0usize; 3];
            let mut frac = [0.0f64; 3];
            for d in 0..3 {
                if singleton[d] {
                    continue;
                }
                let floor = t[d].floor();
                base[d] = floor as usize;
                next[d] = (base[d] + 1).min(dims[d] - 1);
                frac[d] = t[d] - floor;
            }

            let mut sum = 0.0f64;
            'corners: for corner in 0..8usize {
                let mut weight = 1.0f64;
                let mut pos = base;
                for d in 0..3 {
                    if corner & (1 << d) != 0 {
                        if frac[d] == 0.0 {
                            continue 'corners;
                        }
                        pos[d] = next[d];
                        weight *= frac[d];
                    } else {
                        weight *= 1.0 - frac[d];
                    }
                }
                if weight == 0.0 {
                    continue;
                }
                sum += weight * f64::from(raster.value(pos));
            }
            sum as f32
        }
    }
}

/// Sampler configuration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SamplerConfig {
    /// Interpolation method.
    pub interpolation: Interpolation,
    /// Value reported outside the view.
    pub outside_value: f32,
    /// Lower clamp applied to inside samples.
    pub min_value: Option<f32>,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            interpolation: Interpolation::Linear,
            outside_value: 0.0,
            min_value: None,
        }
    }
}

/// A view raster resampled into output pixel coordinates.
#[derive(Clone)]
pub struct TransformedSampler<'a> {
    raster: &'a dyn Raster,
    to_local: Affine3,
    bounds: ViewBounds,
    outside_value: f32,
    min_value: Option<f32>,
}

impl<'a> TransformedSampler<'a> {
    /// Creates a sampler for `raster` placed by `model` (view pixels to the
    /// output grid) with the output origin at `offset`.
    pub fn new(
        raster: &'a dyn Raster,
        model: &Affine3,
        offset: [f64; 3],
        cfg: SamplerConfig,
    ) -> ViewFuseResult<Self> {
        let to_local = model
            .inverse()?
            .concatenate(&Affine3::translation(offset));
        Ok(Self {
            raster,
            to_local,
            bounds: ViewBounds::new(raster.dims(), cfg.interpolation),
            outside_value: cfg.outside_value,
            min_value: cfg.min_value,
        })
    }

    /// Transform from output pixel positions to view-local coordinates.
    pub fn to_local(&self) -> &Affine3 {
        &self.to_local
    }

    /// Raster bounds and inside rule.
    pub fn bounds(&self) -> &ViewBounds {
        &self.bounds
    }

    /// Returns the sample at `p`, or `None` outside the view.
    pub fn try_sample(&self, p: [f64; 3]) -> Option<f32> {
        self.locate(p).map(|t| self.sample_local(t))
    }
}

impl OutputSampler for TransformedSampler<'_> {
    #[inline]
    fn locate(&self, p: [f64; 3]) -> Option<[f64; 3]> {
        self.bounds.locate(self.to_local.apply(p))
    }

    #[inline]
    fn sample_local(&self, t: [f64; 3]) -> f32 {
        let value = interpolate(self.raster, &self.bounds, t);
        match self.min_value {
            Some(min) => value.max(min),
            None => value,
        }
    }

    fn outside_value(&self) -> f32 {
        self.outside_value
    }
}

impl fmt::Debug for TransformedSampler<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformedSampler")
            .field("to_local", &self.to_local)
            .field("bounds", &self.bounds)
            .field("outside_value", &self.outside_value)
            .field("min_value", &self.min_value)
            .finish()
    }
}
